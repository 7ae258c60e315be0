use serde::{Deserialize, Serialize};

use crate::ids::AuthorId;

/// An upstream user, deduplicated globally by `display_name`.
///
/// The upstream does not expose a stable account id in all payload shapes,
/// so `display_name` is the natural key. `account_id` is carried alongside
/// it so a future migration of the natural key is a data-preserving schema
/// change rather than a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: Option<AuthorId>,
    pub display_name: String,
    pub account_id: Option<String>,
}

impl Author {
    pub fn new(display_name: impl Into<String>) -> Self {
        Author {
            id: None,
            display_name: display_name.into(),
            account_id: None,
        }
    }

    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }
}
