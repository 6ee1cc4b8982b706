//! Plain request/response calls to the planning service: the crawl options descriptor and
//! the CSV upload parsers.

use crate::data::{FieldDistribution, MatchupMatrix};
use crate::error::ApiError;
use crate::model::{OptionsDescriptor, SessionConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Body returned by both upload endpoints, success or not.
#[derive(Debug, Default, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    matchups: Option<MatchupMatrix>,
    field: Option<FieldDistribution>,
    detail: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum UploadKind {
    Matchups,
    Field,
}

impl UploadKind {
    fn path(self) -> &'static str {
        match self {
            UploadKind::Matchups => "/api/upload/matchups",
            UploadKind::Field => "/api/upload/field",
        }
    }

    fn fallback_detail(self) -> &'static str {
        match self {
            UploadKind::Matchups => "Failed to parse matchups file",
            UploadKind::Field => "Failed to parse field file",
        }
    }
}

impl ApiClient {
    pub fn new(cfg: &SessionConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .connect_timeout(cfg.connect_timeout)
            .build()
            .map_err(|source| ApiError::Transport {
                url: cfg.base_url.clone(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: cfg.base_url.clone(),
        })
    }

    pub async fn fetch_options(&self) -> Result<OptionsDescriptor, ApiError> {
        let url = format!("{}/api/options", self.base_url);
        let transport = |source| ApiError::Transport {
            url: url.clone(),
            source,
        };
        let resp = self.http.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.clone(),
                status: status.as_u16(),
                detail,
            });
        }
        resp.json::<OptionsDescriptor>().await.map_err(transport)
    }

    /// Have the service parse a square matchup CSV (deck names as row and column headers).
    pub async fn upload_matchups(&self, path: &Path) -> Result<MatchupMatrix, ApiError> {
        let resp = self.upload(UploadKind::Matchups, path).await?;
        resp.matchups
            .ok_or_else(|| ApiError::Rejected("response did not contain matchups".into()))
    }

    /// Have the service parse a field CSV (deck index column plus a `pct` column).
    pub async fn upload_field(&self, path: &Path) -> Result<FieldDistribution, ApiError> {
        let resp = self.upload(UploadKind::Field, path).await?;
        resp.field
            .ok_or_else(|| ApiError::Rejected("response did not contain a field".into()))
    }

    async fn upload(&self, kind: UploadKind, path: &Path) -> Result<UploadResponse, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".into());
        let url = format!("{}{}", self.base_url, kind.path());
        let transport = |source| ApiError::Transport {
            url: url.clone(),
            source,
        };

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/csv")
            .map_err(transport)?;
        let form = reqwest::multipart::Form::new().part("file", part);
        debug!(%url, "uploading {kind:?} file");

        let resp = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(transport)?;
        interpret_upload(kind, &url, status, &body)
    }
}

/// Map an upload reply to the parsed payload or the service's rejection reason.
fn interpret_upload(
    kind: UploadKind,
    url: &str,
    status: u16,
    body: &str,
) -> Result<UploadResponse, ApiError> {
    let parsed: Option<UploadResponse> = serde_json::from_str(body).ok();
    match parsed {
        Some(resp) if resp.success && (200..300).contains(&status) => Ok(resp),
        Some(resp) => Err(ApiError::Rejected(
            resp.detail
                .unwrap_or_else(|| kind.fallback_detail().to_string()),
        )),
        None if (200..300).contains(&status) => {
            Err(ApiError::Rejected(kind.fallback_detail().to_string()))
        }
        None => Err(ApiError::Status {
            url: url.to_string(),
            status,
            detail: body.chars().take(200).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_successful_matchups_upload() {
        let body = r#"{"success":true,"matchups":{"deck_names":["A","B"],"values":[[50,55],[45,50]]}}"#;
        let resp = interpret_upload(UploadKind::Matchups, "u", 200, body).unwrap();
        assert_eq!(resp.matchups.unwrap().len(), 2);
    }

    #[test]
    fn surfaces_service_detail() {
        let body = r#"{"detail":"Matchup matrix must be square"}"#;
        match interpret_upload(UploadKind::Matchups, "u", 400, body) {
            Err(ApiError::Rejected(detail)) => assert_eq!(detail, "Matchup matrix must be square"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn falls_back_to_generic_detail() {
        match interpret_upload(UploadKind::Field, "u", 200, r#"{"success":false}"#) {
            Err(ApiError::Rejected(detail)) => assert_eq!(detail, "Failed to parse field file"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn non_json_error_keeps_status() {
        match interpret_upload(UploadKind::Field, "u", 502, "Bad Gateway") {
            Err(ApiError::Status { status, .. }) => assert_eq!(status, 502),
            other => panic!("unexpected {other:?}"),
        }
    }
}
