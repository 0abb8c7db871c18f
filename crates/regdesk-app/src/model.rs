// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestStatus {
    Draft,
    Pending,
    Submitted,
    Approved,
    Rejected,
    Other(String),
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Other(value) => value,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "draft" => Self::Draft,
            "pending" => Self::Pending,
            "submitted" => Self::Submitted,
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for RequestStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<RequestStatus> for String {
    fn from(value: RequestStatus) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileKind {
    AutoPhoto,
    StsPhoto,
    Other(String),
}

impl FileKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AutoPhoto => "auto_photo",
            Self::StsPhoto => "sts_photo",
            Self::Other(value) => value,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "auto_photo" => Self::AutoPhoto,
            "sts_photo" => Self::StsPhoto,
            other => Self::Other(other.to_owned()),
        }
    }

    pub const fn is_photo(&self) -> bool {
        matches!(self, Self::AutoPhoto | Self::StsPhoto)
    }
}

impl From<String> for FileKind {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FileKind> for String {
    fn from(value: FileKind) -> Self {
        value.as_str().to_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TabKind {
    Dashboard,
    Users,
    Admins,
    Requests,
    Templates,
}

impl TabKind {
    pub const ALL: [Self; 5] = [
        Self::Dashboard,
        Self::Users,
        Self::Admins,
        Self::Requests,
        Self::Templates,
    ];

    pub const fn key(self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Users => "users",
            Self::Admins => "admins",
            Self::Requests => "requests",
            Self::Templates => "templates",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dashboard" => Some(Self::Dashboard),
            "users" => Some(Self::Users),
            "admins" => Some(Self::Admins),
            "requests" => Some(Self::Requests),
            "templates" => Some(Self::Templates),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Панель управления",
            Self::Users => "Пользователи",
            Self::Admins => "Администраторы",
            Self::Requests => "Заявки",
            Self::Templates => "Устаревшие макеты",
        }
    }

    /// Collections (re)loaded when this tab becomes active.
    pub const fn load_plan(self) -> &'static [Resource] {
        match self {
            Self::Dashboard => &[
                Resource::Users,
                Resource::Admins,
                Resource::Requests,
                Resource::Templates,
            ],
            Self::Users => &[Resource::Users],
            Self::Admins => &[Resource::Admins, Resource::Users],
            Self::Requests => &[Resource::Requests],
            Self::Templates => &[Resource::Templates],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Users,
    Admins,
    Requests,
    Templates,
}

impl Resource {
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Admins => "admins",
            Self::Requests => "requests",
            Self::Templates => "templates",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tg_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    #[serde(default)]
    pub tg_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub added_at: Option<String>,
    /// Telegram id of the admin who granted the privilege.
    #[serde(default)]
    pub added_by: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub has_brand: Option<bool>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub has_license: Option<bool>,
    #[serde(default)]
    pub license_option: Option<String>,
    #[serde(default)]
    pub selected_template_id: Option<TemplateId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<String>,
    #[serde(default)]
    pub processed_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: FileId,
    pub request_id: RequestId,
    pub kind: FileKind,
    #[serde(default)]
    pub file_id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl UploadedFile {
    /// Final path segment; the only part of the storage path the backend serves by.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub event: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The authenticated operator as reported by `/auth/me` or the login callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub bot_username: Option<String>,
}

/// Metadata of a binary resource fetched for availability checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetInfo {
    pub content_type: Option<String>,
    pub size_bytes: u64,
}

/// Image chosen for a new template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateImage {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateUpload {
    pub name: String,
    pub description: String,
    pub image: TemplateImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Users(Vec<User>),
    Admins(Vec<Admin>),
    Requests(Vec<Request>),
    Templates(Vec<Template>),
}

impl Collection {
    pub const fn resource(&self) -> Resource {
        match self {
            Self::Users(_) => Resource::Users,
            Self::Admins(_) => Resource::Admins,
            Self::Requests(_) => Resource::Requests,
            Self::Templates(_) => Resource::Templates,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Users(rows) => rows.len(),
            Self::Admins(rows) => rows.len(),
            Self::Requests(rows) => rows.len(),
            Self::Templates(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Last loaded collection per resource. A slot stays `None` until its first
/// successful load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataCache {
    pub users: Option<Vec<User>>,
    pub admins: Option<Vec<Admin>>,
    pub requests: Option<Vec<Request>>,
    pub templates: Option<Vec<Template>>,
}

impl DataCache {
    pub fn store(&mut self, collection: Collection) {
        match collection {
            Collection::Users(rows) => self.users = Some(rows),
            Collection::Admins(rows) => self.admins = Some(rows),
            Collection::Requests(mut rows) => {
                rows.sort_by(|left, right| right.id.cmp(&left.id));
                self.requests = Some(rows);
            }
            Collection::Templates(rows) => self.templates = Some(rows),
        }
    }

    pub fn is_loaded(&self, resource: Resource) -> bool {
        match resource {
            Resource::Users => self.users.is_some(),
            Resource::Admins => self.admins.is_some(),
            Resource::Requests => self.requests.is_some(),
            Resource::Templates => self.templates.is_some(),
        }
    }

    pub fn count(&self, resource: Resource) -> usize {
        match resource {
            Resource::Users => self.users.as_ref().map_or(0, Vec::len),
            Resource::Admins => self.admins.as_ref().map_or(0, Vec::len),
            Resource::Requests => self.requests.as_ref().map_or(0, Vec::len),
            Resource::Templates => self.templates.as_ref().map_or(0, Vec::len),
        }
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.as_ref()?.iter().find(|user| user.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Collection, DataCache, FileKind, Request, RequestStatus, Resource, TabKind};
    use crate::{FileId, RequestId, UploadedFile, UserId};

    fn request(id: i64) -> Request {
        Request {
            id: RequestId::new(id),
            user_id: UserId::new(1),
            username: None,
            category: None,
            status: None,
            has_brand: None,
            year: None,
            has_license: None,
            license_option: None,
            selected_template_id: None,
            notes: None,
            created_at: None,
            submitted_at: None,
            processed_at: None,
        }
    }

    #[test]
    fn request_status_keeps_unknown_values() {
        assert_eq!(RequestStatus::parse("approved"), RequestStatus::Approved);
        let other = RequestStatus::parse("archived");
        assert_eq!(other, RequestStatus::Other("archived".to_owned()));
        assert_eq!(other.as_str(), "archived");
    }

    #[test]
    fn request_decodes_backend_payload_with_nulls() {
        let request: Request = serde_json::from_str(
            r#"{"id":7,"user_id":3,"username":"ivan","category":"легковой","status":"submitted",
                "has_brand":null,"year":2019,"has_license":false,"created_at":"2025-03-01T10:00:00",
                "submitted_at":null}"#,
        )
        .expect("decode request");
        assert_eq!(request.id, RequestId::new(7));
        assert_eq!(request.status, Some(RequestStatus::Submitted));
        assert_eq!(request.has_brand, None);
        assert_eq!(request.has_license, Some(false));
        assert_eq!(request.selected_template_id, None);
    }

    #[test]
    fn requests_are_stored_newest_first() {
        let mut cache = DataCache::default();
        cache.store(Collection::Requests(vec![request(2), request(9), request(5)]));
        let ids = cache
            .requests
            .as_ref()
            .expect("requests stored")
            .iter()
            .map(|request| request.id.get())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![9, 5, 2]);
    }

    #[test]
    fn dashboard_plan_covers_every_collection() {
        assert_eq!(TabKind::Dashboard.load_plan().len(), 4);
        assert_eq!(
            TabKind::Admins.load_plan(),
            &[Resource::Admins, Resource::Users]
        );
        assert_eq!(TabKind::Requests.load_plan(), &[Resource::Requests]);
    }

    #[test]
    fn file_name_uses_final_path_segment() {
        let file = UploadedFile {
            id: FileId::new(1),
            request_id: RequestId::new(1),
            kind: FileKind::AutoPhoto,
            file_id: None,
            path: "storage/uploads/abc_123.jpg".to_owned(),
            created_at: None,
        };
        assert_eq!(file.file_name(), "abc_123.jpg");
        assert!(file.kind.is_photo());
        assert!(!FileKind::parse("document").is_photo());
    }
}
