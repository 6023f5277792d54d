#![doc = "Upload client for Paperless-ngx: tag resolution, document intake and the connectivity check."]
//
//! # Paperless client
//!
//! [`PaperlessClient`] turns settings and a local PDF into requests against the Paperless-ngx
//! REST API and interprets the responses. The actual HTTP exchange goes through an
//! [`HttpTransport`]; production code uses [`ReqwestTransport`], tests use `MockHttpTransport`.
//!
//! ## Failure policy
//! - Invalid settings and missing files abort before any I/O.
//! - Tag resolution never aborts an upload: individual tags that cannot be created are dropped,
//!   and if the tag list cannot be fetched at all the document is uploaded untagged.
//! - A 2xx from the intake endpoint means "accepted for processing". The returned task id is
//!   logged, never polled.
//!
//! Requests are issued one at a time. Tags in particular are created sequentially because the
//! server's create-if-missing flow is not safe under concurrent creates.
//!
//! No timeouts are set here; the transport's defaults apply.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::contract::{
    ConnectionStatus, CreatedTag, DocumentCount, DocumentUpload, ErrorBody, HttpResponse,
    HttpTransport, RemoteTag, TagList, TransportError, UploadAck,
};
use crate::error::{Result, ScanError};
use crate::settings::{Settings, SettingsProvider};

pub const ACCEPT_HEADER: &str = "application/json; version=6";
pub const CLIENT_USER_AGENT: &str = "Paperless-Scanner/1.0";

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn authorised(&self, builder: reqwest::RequestBuilder, token: &str) -> reqwest::RequestBuilder {
        builder
            .header(AUTHORIZATION, format!("Token {token}"))
            .header(ACCEPT, ACCEPT_HEADER)
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }

    async fn finish(response: reqwest::Response) -> HttpResponse {
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(status, error = %e, "Could not read response body");
                String::new()
            }
        };
        HttpResponse { status, body }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str, token: &str) -> std::result::Result<HttpResponse, TransportError> {
        let response = self.authorised(self.client.get(url), token).send().await?;
        Ok(Self::finish(response).await)
    }

    async fn post_json(
        &self,
        url: &str,
        token: &str,
        body: serde_json::Value,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = self
            .authorised(self.client.post(url), token)
            .json(&body)
            .send()
            .await?;
        Ok(Self::finish(response).await)
    }

    async fn post_multipart(
        &self,
        url: &str,
        token: &str,
        document: DocumentUpload,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let part = Part::bytes(document.content)
            .file_name(document.file_name)
            .mime_str("application/pdf")?;
        let form = document
            .tag_ids
            .iter()
            .fold(Form::new().part("document", part), |form, id| {
                form.text("tags", id.to_string())
            });

        let response = self
            .authorised(self.client.post(url), token)
            .multipart(form)
            .send()
            .await?;
        Ok(Self::finish(response).await)
    }
}

pub struct PaperlessClient<T: HttpTransport> {
    settings: Arc<dyn SettingsProvider>,
    transport: T,
}

impl PaperlessClient<ReqwestTransport> {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self::with_transport(settings, ReqwestTransport::default())
    }
}

impl<T: HttpTransport> PaperlessClient<T> {
    pub fn with_transport(settings: Arc<dyn SettingsProvider>, transport: T) -> Self {
        Self {
            settings,
            transport,
        }
    }

    fn validated_settings(&self) -> Result<Settings> {
        let settings = self.settings.get();
        let errors = settings.validate();
        if errors.is_empty() {
            Ok(settings)
        } else {
            Err(ScanError::Configuration(errors))
        }
    }

    /// Checks settings and requests the document listing endpoint.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let settings = match self.validated_settings() {
            Ok(settings) => settings,
            Err(e) => {
                error!(error = %e, "Connection test skipped");
                return ConnectionStatus::failed(e.to_string());
            }
        };

        info!(url = %settings.base_url(), "Testing connection to Paperless-ngx");
        let response = match self
            .transport
            .get(&settings.documents_url(), &settings.paperless_api_token)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Connection test failed");
                return ConnectionStatus::failed(e.to_string());
            }
        };

        if !response.is_success() {
            let mut message = format!("HTTP {}", response.status);
            if !response.body.is_empty() {
                message.push_str(": ");
                message.push_str(&response.body);
            }
            error!(status = response.status, "Connection test failed");
            return ConnectionStatus::failed(message);
        }

        let count = serde_json::from_str::<DocumentCount>(&response.body)
            .map(|c| c.count)
            .unwrap_or(0);
        info!(documents = count, "Connection successful");
        ConnectionStatus::ok()
    }

    /// Maps tag names to remote ids, creating tags that do not exist yet.
    ///
    /// Names that can neither be matched nor created are dropped with a warning. Only a failure
    /// to fetch the tag list itself is an error.
    pub async fn resolve_tag_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<i64>> {
        self.resolve_tags(&self.settings.get(), names).await
    }

    async fn resolve_tags<S: AsRef<str>>(&self, settings: &Settings, names: &[S]) -> Result<Vec<i64>> {
        let tags_url = settings.tags_url();
        let token = settings.paperless_api_token.as_str();

        let response = self
            .transport
            .get(&tags_url, token)
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?;
        if !response.is_success() {
            return Err(ScanError::RemoteService {
                status: response.status,
                message: "failed to fetch tags".to_string(),
            });
        }
        let mut existing: TagList = serde_json::from_str(&response.body)
            .map_err(|e| ScanError::Decode(format!("tag list: {e}")))?;

        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if let Some(tag) = existing.find(name) {
                debug!(tag = %name, id = tag.id, "Matched existing tag");
                ids.push(tag.id);
                continue;
            }

            match self.create_tag(&tags_url, token, name).await {
                Some(id) => {
                    info!(tag = %name, id, "Created new tag");
                    existing.results.push(RemoteTag {
                        id,
                        name: name.to_string(),
                    });
                    ids.push(id);
                }
                None => warn!(tag = %name, "Could not create tag, skipping it"),
            }
        }

        Ok(ids)
    }

    async fn create_tag(&self, tags_url: &str, token: &str, name: &str) -> Option<i64> {
        let response = match self
            .transport
            .post_json(tags_url, token, json!({ "name": name }))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(tag = %name, error = %e, "Error creating tag");
                return None;
            }
        };
        if !response.is_success() {
            warn!(tag = %name, status = response.status, body = %response.body, "Tag creation rejected");
            return None;
        }
        match serde_json::from_str::<CreatedTag>(&response.body) {
            Ok(created) => Some(created.id),
            Err(e) => {
                warn!(tag = %name, error = %e, "Tag creation response had no id");
                None
            }
        }
    }

    /// Submits `file_path` to the intake endpoint, tagged with the configured default tags.
    pub async fn upload(&self, file_path: &Path) -> Result<UploadAck> {
        let settings = self.validated_settings()?;

        if !file_path.exists() {
            return Err(ScanError::NotFound(file_path.display().to_string()));
        }

        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        info!(file = %file_name, "Uploading to Paperless-ngx");
        let content = tokio::fs::read(file_path).await?;

        let mut tag_ids = Vec::new();
        if !settings.default_tags.is_empty() {
            match self.resolve_tags(&settings, &settings.default_tags).await {
                Ok(ids) => {
                    info!(count = ids.len(), "Applied tags to document");
                    tag_ids = ids;
                }
                Err(e) => warn!(error = %e, "Could not resolve tags, uploading without tags"),
            }
        }

        let document = DocumentUpload {
            file_name,
            content,
            tag_ids,
        };
        let response = self
            .transport
            .post_multipart(
                &settings.document_intake_url(),
                &settings.paperless_api_token,
                document,
            )
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        if !response.is_success() {
            debug!(status = response.status, body = %response.body, "API response");
            let err = ScanError::RemoteService {
                status: response.status,
                message: ErrorBody::describe(&response.body),
            };
            error!(error = %err, "Upload rejected");
            return Err(err);
        }

        let ack = UploadAck::from_body(&response.body);
        match ack.task_id() {
            Some(task_id) => info!(task_id, "Upload successful, document queued for processing"),
            None => info!("Upload successful, document queued for processing"),
        }
        Ok(ack)
    }
}
