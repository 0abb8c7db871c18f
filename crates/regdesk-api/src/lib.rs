// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use regdesk_app::display::{template_preview_path, upload_path};
use regdesk_app::{
    Admin, AssetInfo, AuditEntry, Collection, Request, RequestId, Resource, RuntimeConfig,
    SessionUser, TelegramAuthPayload, Template, TemplateId, TemplateUpload, UploadedFile, User,
    UserId,
};
use reqwest::StatusCode;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of submitting a Telegram login payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Accepted(SessionUser),
    /// The backend refused the payload, optionally explaining why.
    Rejected(Option<String>),
}

/// Blocking client for the registration backend's `/api` surface. Session
/// cookies set by the backend are kept for the lifetime of the client.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Duration,
    http: HttpClient,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            bail!("server.base_url must not be empty");
        }
        let parsed = Url::parse(&base_url)
            .with_context(|| format!("server.base_url {base_url:?} is not a valid URL"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "server.base_url must use http or https, got {:?}",
                parsed.scheme()
            );
        }
        if timeout.is_zero() {
            bail!("server.timeout must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn upload_url(&self, file_name: &str) -> String {
        format!("{}{}", self.base_url, upload_path(file_name))
    }

    pub fn template_preview_url(&self, id: TemplateId) -> String {
        format!("{}{}", self.base_url, template_preview_path(id))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.fetch("users")
    }

    pub fn list_admins(&self) -> Result<Vec<Admin>> {
        self.fetch("admins")
    }

    pub fn list_requests(&self) -> Result<Vec<Request>> {
        self.fetch("requests")
    }

    pub fn get_request(&self, id: RequestId) -> Result<Request> {
        self.fetch(&format!("requests/{id}"))
    }

    pub fn list_request_files(&self, id: RequestId) -> Result<Vec<UploadedFile>> {
        self.fetch(&format!("requests/{id}/files"))
    }

    pub fn list_files(&self) -> Result<Vec<UploadedFile>> {
        self.fetch("files")
    }

    pub fn list_audit(&self) -> Result<Vec<AuditEntry>> {
        self.fetch("audit")
    }

    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.fetch("templates")
    }

    pub fn get_template(&self, id: TemplateId) -> Result<Template> {
        self.fetch(&format!("templates/{id}"))
    }

    /// Loads one of the collections shown by the dashboard tabs.
    pub fn list(&self, resource: Resource) -> Result<Collection> {
        Ok(match resource {
            Resource::Users => Collection::Users(self.list_users()?),
            Resource::Admins => Collection::Admins(self.list_admins()?),
            Resource::Requests => Collection::Requests(self.list_requests()?),
            Resource::Templates => Collection::Templates(self.list_templates()?),
        })
    }

    pub fn add_admin(&self, user_id: UserId) -> Result<()> {
        let request = self
            .http
            .post(self.endpoint("admins"))
            .json(&AddAdminBody { user_id });
        self.execute("add admin", request)?;
        Ok(())
    }

    pub fn delete_template(&self, id: TemplateId) -> Result<()> {
        let request = self.http.delete(self.endpoint(&format!("templates/{id}")));
        self.execute("delete template", request)?;
        Ok(())
    }

    pub fn upload_template(&self, upload: &TemplateUpload) -> Result<()> {
        let image = Part::bytes(upload.image.data.clone())
            .file_name(upload.image.file_name.clone())
            .mime_str(&upload.image.mime_type)
            .context("failed to upload template: invalid image MIME type")?;
        let form = Form::new()
            .text("name", upload.name.clone())
            .text("description", upload.description.clone())
            .part("file", image);
        let request = self
            .http
            .post(self.endpoint("templates/upload"))
            .multipart(form);
        self.execute("upload template", request)?;
        Ok(())
    }

    /// Identity probe. An unauthenticated session is `Ok(None)`.
    pub fn current_user(&self) -> Result<Option<SessionUser>> {
        let response = self
            .http
            .get(self.endpoint("auth/me"))
            .send()
            .map_err(|error| self.connection_error("fetch current user", error))?;

        let status = response.status();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            debug!(status = status.as_u16(), "no active session");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(error_response("fetch current user", status, &body));
        }

        let user = response
            .json()
            .context("failed to fetch current user: decode response")?;
        Ok(Some(user))
    }

    pub fn telegram_login(&self, payload: &TelegramAuthPayload) -> Result<LoginOutcome> {
        let response = self
            .http
            .post(self.endpoint("auth/telegram"))
            .json(payload)
            .send()
            .map_err(|error| self.connection_error("sign in with Telegram", error))?;

        let status = response.status();
        let body = response.text().unwrap_or_default();
        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            return Ok(LoginOutcome::Rejected(error_detail(&body)));
        }
        if !status.is_success() {
            return Err(error_response("sign in with Telegram", status, &body));
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .context("failed to sign in with Telegram: decode response")?;
        match (parsed.success, parsed.user) {
            (true, Some(user)) => Ok(LoginOutcome::Accepted(user)),
            _ => Ok(LoginOutcome::Rejected(parsed.detail)),
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.execute("logout", self.http.post(self.endpoint("auth/logout")))?;
        Ok(())
    }

    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        self.fetch("config")
    }

    /// Downloads an uploaded photo to confirm it is servable.
    pub fn fetch_upload(&self, file_name: &str) -> Result<AssetInfo> {
        self.fetch_asset(&format!("fetch upload {file_name}"), self.upload_url(file_name))
    }

    pub fn fetch_template_preview(&self, id: TemplateId) -> Result<AssetInfo> {
        self.fetch_asset(
            &format!("fetch preview of template {id}"),
            self.template_preview_url(id),
        )
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let operation = format!("fetch {path}");
        let response = self.execute(&operation, self.http.get(self.endpoint(path)))?;
        response
            .json()
            .with_context(|| format!("failed to {operation}: decode response"))
    }

    fn fetch_asset(&self, operation: &str, url: String) -> Result<AssetInfo> {
        let response = self.execute(operation, self.http.get(url))?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = response
            .bytes()
            .with_context(|| format!("failed to {operation}: read body"))?;
        if bytes.is_empty() {
            bail!("failed to {operation}: empty body");
        }
        Ok(AssetInfo {
            content_type,
            size_bytes: bytes.len() as u64,
        })
    }

    fn execute(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        debug!(operation, "backend call");
        let response = request
            .send()
            .map_err(|error| self.connection_error(operation, error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(error_response(operation, status, &body));
        }
        Ok(response)
    }

    fn connection_error(&self, operation: &str, error: reqwest::Error) -> anyhow::Error {
        if error.is_timeout() {
            return anyhow!(
                "failed to {operation}: no answer from {} within {:?}",
                self.base_url,
                self.timeout
            );
        }
        anyhow!(
            "failed to {operation}: cannot reach {} -- check server.base_url ({error})",
            self.base_url
        )
    }
}

fn error_response(operation: &str, status: StatusCode, body: &str) -> anyhow::Error {
    if let Some(detail) = error_detail(body) {
        return anyhow!(
            "failed to {operation}: server error ({}): {detail}",
            status.as_u16()
        );
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return anyhow!(
            "failed to {operation}: server error ({}): {trimmed}",
            status.as_u16()
        );
    }

    anyhow!(
        "failed to {operation}: server returned {}",
        status.as_u16()
    )
}

/// Extracts `detail` from an error envelope. Validation errors carry a list
/// of objects with `msg` fields instead of a string.
fn error_detail(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    let detail = match envelope.detail? {
        serde_json::Value::String(text) => text,
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    };
    let detail = detail.trim().to_owned();
    (!detail.is_empty()).then_some(detail)
}

#[derive(Debug, Serialize)]
struct AddAdminBody {
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<SessionUser>,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}
