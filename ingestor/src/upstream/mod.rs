//! The upstream issue-tracker HTTP client.
//!
//! A `reqwest::Client` wrapping a fixed `base_url`/`api_version`, JQL built
//! with simple string interpolation, and a single `do_request` choke point
//! that classifies non-2xx responses before the caller sees them.

pub mod wire;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{Issue, Project, UpstreamProjectListing};
use serde::de::DeserializeOwned;

use crate::error::UpstreamError;
use wire::{IssueSearchResponse, ProjectDetailWire, ProjectListingWire};

/// The fixed field selector sent on every issue search, matching
/// `getAllIssues`'s `fields` parameter verbatim.
const ISSUE_FIELDS: &str =
    "summary,description,issuetype,priority,status,creator,assignee,created,updated,resolutiondate,worklog,timetracking";

/// Project metadata as returned directly by upstream, before a `ProjectId`
/// exists — distinct from `domain::ProjectInfo`, which always carries an id
/// assigned by Persistence.
#[derive(Debug, Clone)]
pub struct UpstreamProjectMeta {
    pub key: String,
    pub name: String,
    pub url: String,
}

/// Abstraction over the upstream issue tracker, so the crawl coordinator and
/// ingest service can be exercised against a fake in tests instead of a live
/// HTTP endpoint.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_project_meta(&self, project_key: &str) -> Result<UpstreamProjectMeta, UpstreamError>;

    async fn fetch_issues_count(&self, project_key: &str, since: Option<DateTime<Utc>>) -> Result<u64, UpstreamError>;

    /// Fetch one page of issues. `start_at` is the zero-based row offset;
    /// `page_size` is `maxResults`.
    async fn fetch_issues_page(
        &self,
        project_key: &str,
        since: Option<DateTime<Utc>>,
        start_at: u64,
        page_size: u32,
    ) -> Result<Vec<Issue>, UpstreamError>;

    async fn fetch_project_list(&self) -> Result<Vec<UpstreamProjectListing>, UpstreamError>;
}

pub struct Config {
    pub base_url: String,
    pub api_version: String,
}

pub struct HttpUpstreamClient {
    http: reqwest::Client,
    config: Config,
}

impl HttpUpstreamClient {
    pub fn new(http: reqwest::Client, config: Config) -> Self {
        HttpUpstreamClient { http, config }
    }

    fn search_url(&self) -> String {
        format!("{}{}/search", self.config.base_url, self.config.api_version)
    }

    fn project_url(&self, project_key: &str) -> String {
        format!("{}{}/project/{}?expand=insight,description,lead", self.config.base_url, self.config.api_version, project_key)
    }

    fn project_list_url(&self) -> String {
        format!("{}{}/project", self.config.base_url, self.config.api_version)
    }

    fn project_self_link(&self, project_key: &str) -> String {
        format!("{}/projects/{}", self.config.base_url, project_key)
    }

    fn jql_for(project_key: &str, since: Option<DateTime<Utc>>) -> String {
        match since {
            Some(ts) => format!("project={} AND updated > \"{}\"", project_key, ts.format("%Y/%m/%d")),
            None => format!("project={}", project_key),
        }
    }

    async fn do_request<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::from_status(status.as_u16(), body));
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(UpstreamError::from)
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn fetch_project_meta(&self, project_key: &str) -> Result<UpstreamProjectMeta, UpstreamError> {
        let wire: ProjectDetailWire = self.do_request(&self.project_url(project_key)).await?;
        let url = self.project_self_link(&wire.key);
        Ok(UpstreamProjectMeta { key: wire.key, name: wire.name, url })
    }

    async fn fetch_issues_count(&self, project_key: &str, since: Option<DateTime<Utc>>) -> Result<u64, UpstreamError> {
        #[derive(serde::Deserialize)]
        struct TotalOnly {
            total: u64,
        }
        let jql = Self::jql_for(project_key, since);
        let url = format!("{}?jql={}&maxResults=0", self.search_url(), urlencoding_encode(&jql));
        let result: TotalOnly = self.do_request(&url).await?;
        Ok(result.total)
    }

    async fn fetch_issues_page(
        &self,
        project_key: &str,
        since: Option<DateTime<Utc>>,
        start_at: u64,
        page_size: u32,
    ) -> Result<Vec<Issue>, UpstreamError> {
        let jql = Self::jql_for(project_key, since);
        let url = format!(
            "{}?jql={}&maxResults={}&startAt={}&expand=changelog&fields={}",
            self.search_url(),
            urlencoding_encode(&jql),
            page_size,
            start_at,
            urlencoding_encode(ISSUE_FIELDS),
        );
        let response: IssueSearchResponse = self.do_request(&url).await?;
        Ok(response.issues.into_iter().map(|w| w.into_domain(project_key)).collect())
    }

    async fn fetch_project_list(&self) -> Result<Vec<UpstreamProjectListing>, UpstreamError> {
        let wire: Vec<ProjectListingWire> = self.do_request(&self.project_list_url()).await?;
        Ok(wire.into_iter().map(Into::into).collect())
    }
}

/// Marker type kept only so `domain::Project` construction sites elsewhere
/// read naturally as "an upstream-fetched project" without re-exporting the
/// wire module publicly.
pub type FetchedProject = Project;

/// Rust's `url::Values`-equivalent: percent-encode a single query value the
/// way Go's `url.Values.Encode()` does.
fn urlencoding_encode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jql_without_since_is_project_only() {
        assert_eq!(HttpUpstreamClient::jql_for("ABC", None), "project=ABC");
    }

    #[test]
    fn jql_with_since_includes_updated_clause() {
        let since = DateTime::parse_from_rfc3339("2024-03-05T00:00:00Z").unwrap().with_timezone(&Utc);
        assert_eq!(HttpUpstreamClient::jql_for("ABC", Some(since)), "project=ABC AND updated > \"2024/03/05\"");
    }

    #[test]
    fn urlencoding_escapes_spaces_and_quotes() {
        let encoded = urlencoding_encode("project=ABC AND updated > \"x\"");
        assert!(encoded.contains('+'), "spaces should be encoded: {encoded}");
        assert!(!encoded.contains(' '), "no literal spaces should survive: {encoded}");
        assert!(!encoded.contains('"'), "no literal quotes should survive: {encoded}");
    }

    fn client_against(mock_server: &wiremock::MockServer) -> HttpUpstreamClient {
        HttpUpstreamClient::new(
            reqwest::Client::new(),
            Config { base_url: mock_server.uri(), api_version: "/rest/api/2".to_string() },
        )
    }

    #[tokio::test]
    async fn fetch_project_meta_decodes_and_synthesizes_self_link() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project/DEMO"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "10000",
                "key": "DEMO",
                "name": "Demo Project",
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_against(&mock_server);
        let meta = client.fetch_project_meta("DEMO").await.unwrap();

        assert_eq!(meta.key, "DEMO");
        assert_eq!(meta.name, "Demo Project");
        assert_eq!(meta.url, format!("{}/projects/DEMO", mock_server.uri()));
    }

    #[tokio::test]
    async fn fetch_issues_count_reads_total_field() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/search"))
            .and(query_param("maxResults", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "total": 42 })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = client_against(&mock_server);
        let total = client.fetch_issues_count("DEMO", None).await.unwrap();
        assert_eq!(total, 42);
    }

    #[tokio::test]
    async fn non_2xx_response_is_classified_by_status() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project/MISSING"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&mock_server)
            .await;

        let client = client_against(&mock_server);
        let err = client.fetch_project_meta("MISSING").await.unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Fatal);
    }

    #[tokio::test]
    async fn server_error_is_classified_transient() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/project/DOWN"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&mock_server)
            .await;

        let client = client_against(&mock_server);
        let err = client.fetch_project_meta("DOWN").await.unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Transient);
    }
}
