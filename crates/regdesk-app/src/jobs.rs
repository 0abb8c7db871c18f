// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AssetInfo, Collection, FileId, Request, RequestId, Resource, RuntimeConfig, SessionUser,
    TelegramAuthPayload, Template, TemplateId, TemplateUpload, UploadedFile, UserId,
};

/// One backend call the UI wants performed off its own thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    WhoAmI,
    LoadRuntimeConfig,
    LoadCollection(Resource),
    LoadRequest(RequestId),
    LoadRequestFiles(RequestId),
    LoadTemplate(TemplateId),
    ProbePhoto { file_id: FileId, file_name: String },
    ProbeTemplatePreview(TemplateId),
    TelegramLogin(TelegramAuthPayload),
    Logout,
    GrantAdmin(UserId),
    UploadTemplate(TemplateUpload),
    DeleteTemplate(TemplateId),
}

impl Job {
    pub fn describe(&self) -> String {
        match self {
            Self::WhoAmI => "who-am-i".to_owned(),
            Self::LoadRuntimeConfig => "runtime config".to_owned(),
            Self::LoadCollection(resource) => format!("load {}", resource.endpoint()),
            Self::LoadRequest(id) => format!("load request {id}"),
            Self::LoadRequestFiles(id) => format!("load files of request {id}"),
            Self::LoadTemplate(id) => format!("load template {id}"),
            Self::ProbePhoto { file_name, .. } => format!("probe upload {file_name}"),
            Self::ProbeTemplatePreview(id) => format!("probe preview of template {id}"),
            Self::TelegramLogin(_) => "telegram login".to_owned(),
            Self::Logout => "logout".to_owned(),
            Self::GrantAdmin(id) => format!("grant admin to user {id}"),
            Self::UploadTemplate(upload) => format!("upload template {:?}", upload.name),
            Self::DeleteTemplate(id) => format!("delete template {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TicketId(u64);

impl TicketId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: TicketId,
    pub job: Job,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutput {
    Session(Option<SessionUser>),
    RuntimeConfig(RuntimeConfig),
    Collection(Collection),
    Request(Box<Request>),
    Files(Vec<UploadedFile>),
    Template(Template),
    Asset(AssetInfo),
    LoggedIn(SessionUser),
    /// The backend refused the login payload; carries its `detail` if any.
    LoginRejected(Option<String>),
    Done,
}

/// A settled job: ticket plus either its output or the error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub ticket: TicketId,
    pub outcome: Result<JobOutput, String>,
}

impl JobResult {
    pub fn new(ticket: TicketId, outcome: anyhow::Result<JobOutput>) -> Self {
        Self {
            ticket,
            outcome: outcome.map_err(|error| format!("{error:#}")),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct TicketCounter {
    next: u64,
}

impl TicketCounter {
    pub(crate) fn issue(&mut self, job: Job) -> Ticket {
        self.next = self.next.saturating_add(1);
        Ticket {
            id: TicketId(self.next),
            job,
        }
    }
}
