//! GitHub contents API client.
//!
//! Content hashes are blob shas, revision ids are commit shas, and the last
//! change time is the committer date of the newest commit touching the path.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::{HistoryEntry, RemoteFile, RemoteRevision, RemoteStore};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("geekcal/", env!("CARGO_PKG_VERSION"));

pub struct GitHubClient {
    client: reqwest::Client,
    base_url: Url,
    owner: String,
    repo: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &RemoteConfig) -> SyncResult<Self> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| SyncError::Config(format!("Invalid api_url '{}': {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Config(format!(
                "Invalid api_url '{}'",
                config.api_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(GitHubClient {
            client,
            base_url,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            token: config.token.clone(),
        })
    }

    fn repo_url(&self, tail: &[&str]) -> Url {
        repo_url(&self.base_url, &self.owner, &self.repo, tail)
    }

    fn contents_url(&self, path: &str) -> Url {
        let mut tail = vec!["contents"];
        tail.extend(path.split('/').filter(|s| !s.is_empty()));
        self.repo_url(&tail)
    }

    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        Ok(request.bearer_auth(&self.token).send().await?)
    }

    async fn get_contents(&self, path: &str, git_ref: Option<&str>) -> SyncResult<Option<ContentItem>> {
        let mut request = self.client.get(self.contents_url(path));
        if let Some(git_ref) = git_ref {
            request = request.query(&[("ref", git_ref)]);
        }
        debug!(path, git_ref = ?git_ref, "GET contents");

        let response = self.send(request).await?;
        match disposition(Endpoint::Contents, response.status()) {
            Disposition::Proceed => {}
            Disposition::Absent => return Ok(None),
            Disposition::Conflict | Disposition::Fail => {
                return Err(error_for_response(response).await);
            }
        }

        match response.json::<ContentsResponse>().await? {
            ContentsResponse::Item(item) if item.kind == "file" => Ok(Some(item)),
            ContentsResponse::Item(item) => Err(SyncError::RemoteData(format!(
                "'{path}' is a {}, not a file",
                item.kind
            ))),
            ContentsResponse::Listing(_) => Err(SyncError::RemoteData(format!(
                "'{path}' is a directory, not a file"
            ))),
        }
    }

    async fn list_commits(&self, path: &str, limit: usize) -> SyncResult<Vec<CommitItem>> {
        let per_page = limit.clamp(1, 100).to_string();
        let request = self
            .client
            .get(self.repo_url(&["commits"]))
            .query(&[("path", path), ("per_page", per_page.as_str())]);
        debug!(path, limit, "GET commits");

        let response = self.send(request).await?;
        match disposition(Endpoint::Commits, response.status()) {
            Disposition::Proceed => {}
            Disposition::Absent => return Ok(Vec::new()),
            Disposition::Conflict | Disposition::Fail => {
                return Err(error_for_response(response).await);
            }
        }

        let mut commits: Vec<CommitItem> = response.json().await?;
        commits.truncate(limit);
        Ok(commits)
    }
}

impl RemoteStore for GitHubClient {
    async fn fetch_current(&self, path: &str) -> SyncResult<Option<RemoteFile>> {
        let Some(item) = self.get_contents(path, None).await? else {
            return Ok(None);
        };
        let content = item.decode()?;

        let latest = self.list_commits(path, 1).await?.into_iter().next();
        let revision = RemoteRevision {
            content_hash: item.sha,
            last_change_time: latest.as_ref().and_then(CommitItem::timestamp),
            revision_id: latest.map(|c| c.sha),
        };

        Ok(Some(RemoteFile { revision, content }))
    }

    async fn fetch_history(&self, path: &str, limit: usize) -> SyncResult<Vec<HistoryEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let commits = self.list_commits(path, limit).await?;
        Ok(commits.into_iter().filter_map(CommitItem::into_history_entry).collect())
    }

    async fn fetch_at_revision(&self, path: &str, revision_id: &str) -> SyncResult<String> {
        match self.get_contents(path, Some(revision_id)).await? {
            Some(item) => item.decode(),
            None => Err(SyncError::RemoteData(format!(
                "'{path}' does not exist at revision {revision_id}"
            ))),
        }
    }

    async fn update_content(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_hash: Option<&str>,
    ) -> SyncResult<String> {
        let body = UpdateRequest {
            message,
            content: BASE64.encode(content),
            sha: expected_hash,
        };
        debug!(path, expected_hash = ?expected_hash, "PUT contents");

        let response = self
            .send(self.client.put(self.contents_url(path)).json(&body))
            .await?;
        match disposition(Endpoint::Update, response.status()) {
            Disposition::Proceed => {}
            Disposition::Conflict => return Err(SyncError::ConcurrencyConflict),
            Disposition::Absent | Disposition::Fail => {
                return Err(error_for_response(response).await);
            }
        }

        let updated: UpdateResponse = response.json().await?;
        Ok(updated.commit.sha)
    }
}

fn repo_url(base: &Url, owner: &str, repo: &str, tail: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["repos", owner, repo])
            .extend(tail);
    }
    url
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    /// GET contents of a path.
    Contents,
    /// GET commits touching a path.
    Commits,
    /// PUT contents of a path.
    Update,
}

/// How a response status is handled, before any body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Proceed,
    /// Nothing at this path (or no history yet).
    Absent,
    /// The blob sha sent with an update is stale.
    Conflict,
    /// Classified by [`classify_status`].
    Fail,
}

fn disposition(endpoint: Endpoint, status: StatusCode) -> Disposition {
    if status.is_success() {
        return Disposition::Proceed;
    }
    match (endpoint, status) {
        (Endpoint::Contents, StatusCode::NOT_FOUND) => Disposition::Absent,
        // An empty repository answers 409 for its commit list.
        (Endpoint::Commits, StatusCode::NOT_FOUND | StatusCode::CONFLICT) => Disposition::Absent,
        // 422 when the sha is missing for an existing file or no longer matches.
        (Endpoint::Update, StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY) => {
            Disposition::Conflict
        }
        _ => Disposition::Fail,
    }
}

async fn error_for_response(response: Response) -> SyncError {
    let status = response.status();
    let rate_limited = response
        .headers()
        .get("x-ratelimit-remaining")
        .is_some_and(|v| v.as_bytes() == b"0");
    let body = response.text().await.unwrap_or_default();
    classify_status(status, &body, rate_limited)
}

/// Map a [`Disposition::Fail`] status to the error taxonomy.
fn classify_status(status: StatusCode, body: &str, rate_limited: bool) -> SyncError {
    let detail = api_message(status, body);
    match status {
        StatusCode::UNAUTHORIZED => SyncError::Unauthorized(detail),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if rate_limited => {
            SyncError::Forbidden(format!("rate limit exceeded: {detail}"))
        }
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => SyncError::Forbidden(detail),
        _ => SyncError::Network(detail),
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

fn api_message(status: StatusCode, body: &str) -> String {
    if let Ok(ApiErrorBody { message: Some(message) }) = serde_json::from_str::<ApiErrorBody>(body) {
        return format!("{} ({})", message.trim(), status.as_u16());
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Item(ContentItem),
    Listing(Vec<serde_json::Value>),
}

#[derive(Deserialize)]
struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

impl ContentItem {
    fn decode(&self) -> SyncResult<String> {
        match self.encoding.as_deref() {
            Some("base64") | None => decode_content(self.content.as_deref().unwrap_or_default()),
            Some(other) => Err(SyncError::RemoteData(format!(
                "unsupported content encoding '{other}' (file too large?)"
            ))),
        }
    }
}

/// GitHub wraps base64 content at 60 columns.
fn decode_content(encoded: &str) -> SyncResult<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = BASE64
        .decode(compact)
        .map_err(|e| SyncError::RemoteData(format!("invalid base64 content: {e}")))?;
    String::from_utf8(bytes).map_err(|e| SyncError::RemoteData(format!("content is not UTF-8: {e}")))
}

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    #[serde(default)]
    message: String,
    committer: Option<CommitSignature>,
    author: Option<CommitSignature>,
}

#[derive(Deserialize)]
struct CommitSignature {
    date: DateTime<Utc>,
}

impl CommitItem {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.commit
            .committer
            .as_ref()
            .or(self.commit.author.as_ref())
            .map(|s| s.date)
    }

    fn into_history_entry(self) -> Option<HistoryEntry> {
        let timestamp = self.timestamp()?;
        Some(HistoryEntry {
            revision_id: self.sha,
            timestamp,
            message: self.commit.message,
        })
    }
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct UpdateResponse {
    commit: UpdatedCommit,
}

#[derive(Deserialize)]
struct UpdatedCommit {
    sha: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncErrorKind;
    use pretty_assertions::assert_eq;

    fn config(api_url: &str) -> RemoteConfig {
        RemoteConfig {
            owner: "alice".into(),
            repo: "calendar-data".into(),
            path: "data/calendar.json".into(),
            token: "secret".into(),
            api_url: api_url.into(),
        }
    }

    #[test]
    fn contents_url_keeps_path_segments() {
        let client = GitHubClient::new(&config(DEFAULT_API_URL)).unwrap();
        assert_eq!(
            client.contents_url("data/calendar.json").as_str(),
            "https://api.github.com/repos/alice/calendar-data/contents/data/calendar.json"
        );
    }

    #[test]
    fn repo_url_appends_to_enterprise_prefix() {
        let base = Url::parse("https://github.example.com/api/v3/").unwrap();
        assert_eq!(
            repo_url(&base, "alice", "cal", &["commits"]).as_str(),
            "https://github.example.com/api/v3/repos/alice/cal/commits"
        );
    }

    #[test]
    fn invalid_api_url_is_config_error() {
        let err = GitHubClient::new(&config("not a url")).err().unwrap();
        assert_eq!(err.kind(), SyncErrorKind::Configuration);
    }

    #[test]
    fn decode_content_handles_wrapped_base64() {
        let encoded = "W3sieWVhciI6MjAyNCwibW9udGgiOjAs\nImRheSI6MSwidGV4dCI6ImEifV0=\n";
        assert_eq!(
            decode_content(encoded).unwrap(),
            r#"[{"year":2024,"month":0,"day":1,"text":"a"}]"#
        );
    }

    #[test]
    fn decode_content_rejects_garbage() {
        let err = decode_content("%%%").unwrap_err();
        assert_eq!(err.kind(), SyncErrorKind::RemoteData);
    }

    #[test]
    fn classify_status_distinguishes_auth_failures() {
        let body = r#"{"message": "Bad credentials"}"#;
        let err = classify_status(StatusCode::UNAUTHORIZED, body, false);
        assert!(matches!(err, SyncError::Unauthorized(ref m) if m == "Bad credentials (401)"));

        let err = classify_status(StatusCode::FORBIDDEN, "", true);
        assert!(matches!(err, SyncError::Forbidden(ref m) if m.contains("rate limit")));

        let err = classify_status(StatusCode::TOO_MANY_REQUESTS, "", false);
        assert_eq!(err.kind(), SyncErrorKind::Forbidden);

        let err = classify_status(StatusCode::BAD_GATEWAY, "upstream down", false);
        assert!(matches!(err, SyncError::Network(ref m) if m == "upstream down (502)"));
    }

    #[test]
    fn missing_path_is_absent_only_when_reading() {
        assert_eq!(
            disposition(Endpoint::Contents, StatusCode::NOT_FOUND),
            Disposition::Absent
        );
        assert_eq!(
            disposition(Endpoint::Commits, StatusCode::NOT_FOUND),
            Disposition::Absent
        );
        assert_eq!(
            disposition(Endpoint::Update, StatusCode::NOT_FOUND),
            Disposition::Fail
        );
    }

    #[test]
    fn stale_sha_on_update_is_conflict() {
        assert_eq!(
            disposition(Endpoint::Update, StatusCode::CONFLICT),
            Disposition::Conflict
        );
        assert_eq!(
            disposition(Endpoint::Update, StatusCode::UNPROCESSABLE_ENTITY),
            Disposition::Conflict
        );
        assert_eq!(
            disposition(Endpoint::Contents, StatusCode::UNPROCESSABLE_ENTITY),
            Disposition::Fail
        );
    }

    #[test]
    fn empty_repository_has_no_history() {
        assert_eq!(
            disposition(Endpoint::Commits, StatusCode::CONFLICT),
            Disposition::Absent
        );
        assert_eq!(
            disposition(Endpoint::Contents, StatusCode::CONFLICT),
            Disposition::Fail
        );
    }

    #[test]
    fn success_proceeds_and_auth_failures_fail() {
        for endpoint in [Endpoint::Contents, Endpoint::Commits, Endpoint::Update] {
            assert_eq!(disposition(endpoint, StatusCode::OK), Disposition::Proceed);
            assert_eq!(disposition(endpoint, StatusCode::CREATED), Disposition::Proceed);
            assert_eq!(disposition(endpoint, StatusCode::UNAUTHORIZED), Disposition::Fail);
            assert_eq!(disposition(endpoint, StatusCode::FORBIDDEN), Disposition::Fail);
        }
    }

    #[test]
    fn contents_payload_distinguishes_files_and_directories() {
        let file: ContentsResponse = serde_json::from_str(
            r#"{"type": "file", "sha": "abc", "encoding": "base64", "content": "W10="}"#,
        )
        .unwrap();
        let ContentsResponse::Item(item) = file else {
            panic!("expected a file item");
        };
        assert_eq!(item.sha, "abc");
        assert_eq!(item.decode().unwrap(), "[]");

        let listing: ContentsResponse =
            serde_json::from_str(r#"[{"type": "file", "sha": "abc"}]"#).unwrap();
        assert!(matches!(listing, ContentsResponse::Listing(_)));
    }

    #[test]
    fn commit_payload_becomes_history_entry() {
        let commits: Vec<CommitItem> = serde_json::from_str(
            r#"[{
                "sha": "c0ffee",
                "commit": {
                    "message": "Sync calendar data: Local is newer",
                    "author": {"date": "2024-01-01T10:00:00Z"},
                    "committer": {"date": "2024-01-01T10:05:00Z"}
                }
            }]"#,
        )
        .unwrap();

        let entry = commits.into_iter().next().unwrap().into_history_entry().unwrap();
        assert_eq!(entry.revision_id, "c0ffee");
        assert_eq!(entry.message, "Sync calendar data: Local is newer");
        assert_eq!(entry.timestamp.to_rfc3339(), "2024-01-01T10:05:00+00:00");
    }

    #[test]
    fn update_request_omits_missing_sha() {
        let body = UpdateRequest {
            message: "Initial calendar data",
            content: BASE64.encode("[]"),
            sha: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["content"], "W10=");
        assert!(json.get("sha").is_none());
    }
}
