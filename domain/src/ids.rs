//! Newtype identifiers for the persisted entities.
//!
//! Each wraps the Postgres `SERIAL`/`BIGSERIAL` primary key for its table.
//! Natural keys (`Project.key`, `Issue.key`, `Author.display_name`) are kept
//! as plain `String`s since they are the external identity, not a storage
//! detail.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                $name(value)
            }
        }

        impl std::ops::Deref for $name {
            type Target = i64;
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(ProjectId);
id_type!(IssueId);
id_type!(AuthorId);
