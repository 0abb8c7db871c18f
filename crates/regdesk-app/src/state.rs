// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::{
    Collection, DataCache, FileId, GrantForm, Job, JobOutput, JobResult, RequestDetail, RequestId,
    Resource, SessionStore, TabKind, TelegramAuthPayload, TemplateId, TemplateImage,
    TemplateUploadForm, Ticket, TicketId, UserId,
};
use crate::jobs::TicketCounter;

pub const DEFAULT_BOT_USERNAME: &str = "ndstrbot";
pub const GRANT_FAILED: &str = "Не удалось добавить администратора";
pub const LOGIN_FAILED: &str = "Ошибка авторизации";
pub const DELETE_CONFIRMATION: &str = "Удалить макет? Это действие нельзя отменить.";

/// Login screen state. Payload submission is only honored while mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginScreen {
    pub bot_username: String,
    pub submitting: bool,
    mounted: bool,
}

impl LoginScreen {
    pub fn new(bot_username: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            submitting: false,
            mounted: false,
        }
    }

    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingJob {
    job: Job,
    batch: Option<u64>,
    generation: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Batch {
    id: u64,
    remaining: usize,
}

/// Bookkeeping for jobs the UI is still waiting on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct JobBook {
    tickets: TicketCounter,
    in_flight: BTreeMap<TicketId, PendingJob>,
    latest: BTreeMap<Resource, TicketId>,
    batch: Option<Batch>,
    next_batch: u64,
    next_generation: u64,
}

impl JobBook {
    fn issue(&mut self, job: Job, batch: Option<u64>, generation: Option<u64>) -> Ticket {
        let ticket = self.tickets.issue(job.clone());
        if let Job::LoadCollection(resource) = &job {
            self.latest.insert(*resource, ticket.id);
        }
        debug!(ticket = ticket.id.get(), job = %job.describe(), "job queued");
        self.in_flight.insert(
            ticket.id,
            PendingJob {
                job,
                batch,
                generation,
            },
        );
        ticket
    }

    fn start_batch(&mut self, size: usize) -> u64 {
        self.next_batch = self.next_batch.saturating_add(1);
        self.batch = Some(Batch {
            id: self.next_batch,
            remaining: size,
        });
        self.next_batch
    }

    /// Returns true when the settled job was the last of the current batch.
    fn settle_batch(&mut self, batch: Option<u64>) -> bool {
        let (Some(current), Some(batch)) = (self.batch.as_mut(), batch) else {
            return false;
        };
        if current.id != batch {
            return false;
        }
        current.remaining = current.remaining.saturating_sub(1);
        if current.remaining == 0 {
            self.batch = None;
            return true;
        }
        false
    }

    fn is_latest(&self, resource: Resource, ticket: TicketId) -> bool {
        self.latest.get(&resource) == Some(&ticket)
    }

    fn next_generation(&mut self) -> u64 {
        self.next_generation = self.next_generation.saturating_add(1);
        self.next_generation
    }

    fn forget_all(&mut self) {
        self.in_flight.clear();
        self.latest.clear();
        self.batch = None;
    }

    fn has_pending(&self, predicate: impl Fn(&Job) -> bool) -> bool {
        self.in_flight.values().any(|pending| predicate(&pending.job))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub session: SessionStore,
    pub login: LoginScreen,
    pub active_tab: TabKind,
    pub cache: DataCache,
    pub loading: bool,
    pub selected_request: Option<RequestId>,
    pub detail: Option<RequestDetail>,
    pub grant: GrantForm,
    pub upload: TemplateUploadForm,
    pub pending_delete: Option<TemplateId>,
    pub alert: Option<String>,
    pub status_line: Option<String>,
    jobs: JobBook,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(TabKind::Dashboard, DEFAULT_BOT_USERNAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Start,
    SelectTab(TabKind),
    NextTab,
    PrevTab,
    Refresh,
    OpenRequest(RequestId),
    CloseRequest,
    SelectGrantUser(Option<UserId>),
    GrantAdmin,
    SetTemplateName(String),
    SetTemplateDescription(String),
    SetTemplateImage(Option<TemplateImage>),
    UploadTemplate,
    RequestTemplateDelete(TemplateId),
    ConfirmTemplateDelete,
    CancelTemplateDelete,
    SubmitTelegramAuth(String),
    Logout,
    OpenPhoto(FileId),
    ClosePhoto,
    DismissAlert,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    JobQueued(Ticket),
    TabChanged(TabKind),
    SessionChanged,
    LoginMounted,
    AlertRaised(String),
    AlertDismissed,
    ConfirmRequested(TemplateId),
    StatusUpdated(String),
    StatusCleared,
    CacheUpdated(Resource),
    DetailUpdated,
    FormUpdated,
    LoadingChanged(bool),
}

impl AppState {
    pub fn new(start_tab: TabKind, bot_username: impl Into<String>) -> Self {
        Self {
            session: SessionStore::default(),
            login: LoginScreen::new(bot_username),
            active_tab: start_tab,
            cache: DataCache::default(),
            loading: false,
            selected_request: None,
            detail: None,
            grant: GrantForm::default(),
            upload: TemplateUploadForm::default(),
            pending_delete: None,
            alert: None,
            status_line: None,
            jobs: JobBook::default(),
        }
    }

    pub fn has_pending_jobs(&self) -> bool {
        !self.jobs.in_flight.is_empty()
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Start => {
                self.session.begin_probe();
                vec![AppEvent::JobQueued(self.jobs.issue(Job::WhoAmI, None, None))]
            }
            AppCommand::SelectTab(tab) => self.select_tab(tab),
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::Refresh => self.refresh(),
            AppCommand::OpenRequest(request_id) => self.open_request(request_id),
            AppCommand::CloseRequest => {
                if self.selected_request.take().is_none() {
                    return Vec::new();
                }
                self.detail = None;
                vec![AppEvent::DetailUpdated]
            }
            AppCommand::SelectGrantUser(user_id) => {
                if self.grant.submitting || self.grant.selected_user == user_id {
                    return Vec::new();
                }
                self.grant.selected_user = user_id;
                vec![AppEvent::FormUpdated]
            }
            AppCommand::GrantAdmin => self.grant_admin(),
            AppCommand::SetTemplateName(name) => {
                self.upload.name = name;
                vec![AppEvent::FormUpdated]
            }
            AppCommand::SetTemplateDescription(description) => {
                self.upload.description = description;
                vec![AppEvent::FormUpdated]
            }
            AppCommand::SetTemplateImage(image) => {
                self.upload.image = image;
                vec![AppEvent::FormUpdated]
            }
            AppCommand::UploadTemplate => self.upload_template(),
            AppCommand::RequestTemplateDelete(template_id) => {
                if !self.session.is_authenticated() {
                    return Vec::new();
                }
                self.pending_delete = Some(template_id);
                vec![AppEvent::ConfirmRequested(template_id)]
            }
            AppCommand::ConfirmTemplateDelete => {
                let Some(template_id) = self.pending_delete.take() else {
                    return Vec::new();
                };
                vec![self.queue(Job::DeleteTemplate(template_id))]
            }
            AppCommand::CancelTemplateDelete => {
                if self.pending_delete.take().is_none() {
                    return Vec::new();
                }
                vec![self.set_status("удаление отменено")]
            }
            AppCommand::SubmitTelegramAuth(raw) => self.submit_telegram_auth(&raw),
            AppCommand::Logout => {
                if !self.session.is_authenticated()
                    || self.jobs.has_pending(|job| *job == Job::Logout)
                {
                    return Vec::new();
                }
                vec![self.queue(Job::Logout)]
            }
            AppCommand::OpenPhoto(file_id) => {
                let opened = self
                    .detail
                    .as_mut()
                    .is_some_and(|detail| detail.open_photo(file_id));
                if opened {
                    vec![AppEvent::DetailUpdated]
                } else {
                    Vec::new()
                }
            }
            AppCommand::ClosePhoto => {
                let closed = self.detail.as_mut().is_some_and(RequestDetail::close_photo);
                if closed {
                    vec![AppEvent::DetailUpdated]
                } else {
                    Vec::new()
                }
            }
            AppCommand::DismissAlert => {
                if self.alert.take().is_none() {
                    return Vec::new();
                }
                vec![AppEvent::AlertDismissed]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// Applies a settled job. Results for tickets that are no longer awaited
    /// or no longer match the active selection are dropped.
    pub fn complete(&mut self, result: JobResult) -> Vec<AppEvent> {
        let Some(pending) = self.jobs.in_flight.remove(&result.ticket) else {
            debug!(ticket = result.ticket.get(), "dropping result of forgotten job");
            return Vec::new();
        };

        let mut events = Vec::new();
        if self.jobs.settle_batch(pending.batch) {
            self.loading = false;
            events.push(AppEvent::LoadingChanged(false));
        }

        let outcome = result.outcome;
        match pending.job {
            Job::WhoAmI => events.extend(self.session_probed(outcome)),
            Job::LoadRuntimeConfig => self.runtime_config_loaded(outcome),
            Job::LoadCollection(resource) => {
                if !self.jobs.is_latest(resource, result.ticket) {
                    debug!(
                        resource = resource.endpoint(),
                        ticket = result.ticket.get(),
                        "ignoring superseded load"
                    );
                } else {
                    events.extend(self.collection_loaded(resource, outcome));
                }
            }
            job @ (Job::LoadRequest(_)
            | Job::LoadRequestFiles(_)
            | Job::LoadTemplate(_)
            | Job::ProbePhoto { .. }
            | Job::ProbeTemplatePreview(_)) => {
                events.extend(self.detail_settled(job, pending.generation, outcome));
            }
            Job::TelegramLogin(_) => events.extend(self.login_settled(outcome)),
            Job::Logout => events.extend(self.logout_settled(outcome)),
            Job::GrantAdmin(user_id) => events.extend(self.grant_settled(user_id, outcome)),
            Job::UploadTemplate(_) => events.extend(self.upload_settled(outcome)),
            Job::DeleteTemplate(template_id) => {
                events.extend(self.delete_settled(template_id, outcome));
            }
        }
        events
    }

    fn queue(&mut self, job: Job) -> AppEvent {
        AppEvent::JobQueued(self.jobs.issue(job, None, None))
    }

    fn select_tab(&mut self, tab: TabKind) -> Vec<AppEvent> {
        if !self.session.is_authenticated() || tab == self.active_tab {
            return Vec::new();
        }
        self.active_tab = tab;
        let mut events = vec![AppEvent::TabChanged(tab)];
        events.extend(self.load_tab());
        events
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        let tabs = TabKind::ALL;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.active_tab)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.select_tab(tabs[next])
    }

    /// Issues the active tab's load plan as one batch.
    fn load_tab(&mut self) -> Vec<AppEvent> {
        let plan = self.active_tab.load_plan();
        let batch = self.jobs.start_batch(plan.len());
        let mut events = Vec::with_capacity(plan.len() + 1);
        if !self.loading {
            self.loading = true;
            events.push(AppEvent::LoadingChanged(true));
        }
        for resource in plan {
            let ticket = self
                .jobs
                .issue(Job::LoadCollection(*resource), Some(batch), None);
            events.push(AppEvent::JobQueued(ticket));
        }
        events
    }

    fn reload(&mut self, resource: Resource) -> AppEvent {
        self.queue(Job::LoadCollection(resource))
    }

    fn refresh(&mut self) -> Vec<AppEvent> {
        if !self.session.is_authenticated() {
            return Vec::new();
        }
        let mut events = self.load_tab();
        if let Some(request_id) = self.selected_request {
            self.detail = None;
            events.extend(self.mount_detail(request_id));
        }
        events.push(self.set_status("обновлено"));
        events
    }

    fn open_request(&mut self, request_id: RequestId) -> Vec<AppEvent> {
        if !self.session.is_authenticated() {
            return Vec::new();
        }
        self.selected_request = Some(request_id);
        if self
            .detail
            .as_ref()
            .is_some_and(|detail| detail.request_id() == request_id)
        {
            return Vec::new();
        }
        self.mount_detail(request_id)
    }

    fn mount_detail(&mut self, request_id: RequestId) -> Vec<AppEvent> {
        let generation = self.jobs.next_generation();
        let (detail, jobs) = RequestDetail::open(request_id, generation);
        self.detail = Some(detail);
        let mut events = vec![AppEvent::DetailUpdated];
        events.extend(self.queue_detail_jobs(jobs, generation));
        events
    }

    fn queue_detail_jobs(&mut self, jobs: Vec<Job>, generation: u64) -> Vec<AppEvent> {
        jobs.into_iter()
            .map(|job| AppEvent::JobQueued(self.jobs.issue(job, None, Some(generation))))
            .collect()
    }

    fn grant_admin(&mut self) -> Vec<AppEvent> {
        if !self.session.is_authenticated() || !self.grant.can_submit() {
            return Vec::new();
        }
        let Some(user_id) = self.grant.selected_user else {
            return Vec::new();
        };
        self.grant.submitting = true;
        vec![AppEvent::FormUpdated, self.queue(Job::GrantAdmin(user_id))]
    }

    fn upload_template(&mut self) -> Vec<AppEvent> {
        if !self.session.is_authenticated() || !self.upload.can_submit() {
            return Vec::new();
        }
        let upload = match self.upload.to_upload() {
            Ok(upload) => upload,
            Err(error) => {
                debug!(%error, "template upload not ready");
                return Vec::new();
            }
        };
        self.upload.submitting = true;
        vec![AppEvent::FormUpdated, self.queue(Job::UploadTemplate(upload))]
    }

    fn submit_telegram_auth(&mut self, raw: &str) -> Vec<AppEvent> {
        if !self.session.is_anonymous() || !self.login.mounted || self.login.submitting {
            return Vec::new();
        }
        match TelegramAuthPayload::parse(raw) {
            Ok(payload) => {
                self.login.submitting = true;
                vec![self.queue(Job::TelegramLogin(payload))]
            }
            Err(error) => vec![self.set_status(&format!("{error:#}"))],
        }
    }

    fn mount_login(&mut self) -> Vec<AppEvent> {
        self.login.mounted = true;
        self.login.submitting = false;
        vec![AppEvent::LoginMounted, self.queue(Job::LoadRuntimeConfig)]
    }

    fn enter_dashboard(&mut self) -> Vec<AppEvent> {
        self.login.mounted = false;
        self.login.submitting = false;
        let mut events = vec![AppEvent::SessionChanged];
        events.extend(self.load_tab());
        events
    }

    fn session_probed(&mut self, outcome: Result<JobOutput, String>) -> Vec<AppEvent> {
        let outcome = match outcome {
            Ok(JobOutput::Session(user)) => Ok(user),
            Ok(other) => Err(unexpected_output("who-am-i", &other)),
            Err(error) => Err(error),
        };
        if self.session.probe_settled(outcome) {
            self.enter_dashboard()
        } else {
            let mut events = vec![AppEvent::SessionChanged];
            events.extend(self.mount_login());
            events
        }
    }

    fn runtime_config_loaded(&mut self, outcome: Result<JobOutput, String>) {
        match outcome {
            Ok(JobOutput::RuntimeConfig(config)) => {
                if let Some(name) = config
                    .bot_username
                    .map(|name| name.trim().trim_start_matches('@').to_owned())
                    .filter(|name| !name.is_empty())
                {
                    self.login.bot_username = name;
                }
            }
            Ok(other) => warn!(
                error = %unexpected_output("runtime config", &other),
                "runtime config ignored"
            ),
            Err(error) => warn!(%error, "runtime config unavailable; keeping configured bot"),
        }
    }

    fn collection_loaded(
        &mut self,
        resource: Resource,
        outcome: Result<JobOutput, String>,
    ) -> Vec<AppEvent> {
        match outcome {
            Ok(JobOutput::Collection(collection)) if collection.resource() == resource => {
                debug!(
                    resource = resource.endpoint(),
                    rows = collection.len(),
                    "collection loaded"
                );
                self.store(collection);
                vec![AppEvent::CacheUpdated(resource)]
            }
            Ok(other) => {
                warn!(
                    resource = resource.endpoint(),
                    error = %unexpected_output("collection load", &other),
                    "load failed"
                );
                Vec::new()
            }
            Err(error) => {
                warn!(resource = resource.endpoint(), %error, "load failed");
                Vec::new()
            }
        }
    }

    fn store(&mut self, collection: Collection) {
        let refreshed_users = collection.resource() == Resource::Users;
        self.cache.store(collection);
        // A reloaded user list can drop the user picked for a grant.
        let vanished = self
            .grant
            .selected_user
            .is_some_and(|selected| self.cache.user(selected).is_none());
        if refreshed_users && vanished && !self.grant.submitting {
            self.grant.selected_user = None;
        }
    }

    fn detail_settled(
        &mut self,
        job: Job,
        generation: Option<u64>,
        outcome: Result<JobOutput, String>,
    ) -> Vec<AppEvent> {
        let Some(detail) = self.detail.as_mut() else {
            return Vec::new();
        };
        if generation != Some(detail.generation()) {
            debug!(job = %job.describe(), "ignoring result for a closed request");
            return Vec::new();
        }
        let generation = detail.generation();

        let follow_up = match (job, outcome) {
            (Job::LoadRequest(_), Ok(JobOutput::Request(request))) => {
                detail.request_loaded(Ok(*request))
            }
            (Job::LoadRequest(_), outcome) => detail.request_loaded(Err(failure(outcome))),
            (Job::LoadRequestFiles(_), Ok(JobOutput::Files(files))) => {
                detail.files_loaded(Ok(files))
            }
            (Job::LoadRequestFiles(_), outcome) => detail.files_loaded(Err(failure(outcome))),
            (Job::LoadTemplate(_), Ok(JobOutput::Template(template))) => {
                detail.template_loaded(Ok(template))
            }
            (Job::LoadTemplate(_), outcome) => detail.template_loaded(Err(failure(outcome))),
            (Job::ProbePhoto { file_id, .. }, Ok(JobOutput::Asset(info))) => {
                detail.photo_probed(file_id, Ok(info));
                Vec::new()
            }
            (Job::ProbePhoto { file_id, .. }, outcome) => {
                detail.photo_probed(file_id, Err(failure(outcome)));
                Vec::new()
            }
            (Job::ProbeTemplatePreview(_), Ok(JobOutput::Asset(info))) => {
                detail.preview_probed(Ok(info));
                Vec::new()
            }
            (Job::ProbeTemplatePreview(_), outcome) => {
                detail.preview_probed(Err(failure(outcome)));
                Vec::new()
            }
            (job, _) => {
                debug!(job = %job.describe(), "not a detail job");
                Vec::new()
            }
        };

        let mut events = vec![AppEvent::DetailUpdated];
        events.extend(self.queue_detail_jobs(follow_up, generation));
        events
    }

    fn login_settled(&mut self, outcome: Result<JobOutput, String>) -> Vec<AppEvent> {
        self.login.submitting = false;
        match outcome {
            Ok(JobOutput::LoggedIn(user)) => {
                if self.session.logged_in(user) {
                    self.enter_dashboard()
                } else {
                    Vec::new()
                }
            }
            Ok(JobOutput::LoginRejected(detail)) => {
                let message = detail
                    .filter(|detail| !detail.trim().is_empty())
                    .unwrap_or_else(|| LOGIN_FAILED.to_owned());
                warn!(%message, "telegram login rejected");
                vec![self.raise_alert(message)]
            }
            Ok(other) => {
                error!(error = %unexpected_output("telegram login", &other), "login failed");
                vec![self.raise_alert(LOGIN_FAILED.to_owned())]
            }
            Err(error) => {
                error!(%error, "login failed");
                vec![self.raise_alert(LOGIN_FAILED.to_owned())]
            }
        }
    }

    fn logout_settled(&mut self, outcome: Result<JobOutput, String>) -> Vec<AppEvent> {
        if let Err(error) = outcome {
            error!(%error, "logout failed");
            return vec![self.set_status(&format!("не удалось выйти: {error}"))];
        }

        self.session.logged_out();
        self.jobs.forget_all();
        self.cache = DataCache::default();
        self.active_tab = TabKind::Dashboard;
        self.loading = false;
        self.selected_request = None;
        self.detail = None;
        self.grant = GrantForm::default();
        self.upload = TemplateUploadForm::default();
        self.pending_delete = None;

        let mut events = vec![
            AppEvent::SessionChanged,
            AppEvent::TabChanged(self.active_tab),
            AppEvent::LoadingChanged(false),
        ];
        events.extend(self.mount_login());
        events
    }

    fn grant_settled(
        &mut self,
        user_id: UserId,
        outcome: Result<JobOutput, String>,
    ) -> Vec<AppEvent> {
        self.grant.submitting = false;
        match outcome {
            Ok(_) => {
                info!(%user_id, "admin granted");
                self.grant.selected_user = None;
                vec![
                    AppEvent::FormUpdated,
                    self.reload(Resource::Admins),
                    self.set_status("администратор добавлен"),
                ]
            }
            Err(error) => {
                error!(%user_id, %error, "admin grant failed");
                vec![AppEvent::FormUpdated, self.raise_alert(GRANT_FAILED.to_owned())]
            }
        }
    }

    fn upload_settled(&mut self, outcome: Result<JobOutput, String>) -> Vec<AppEvent> {
        self.upload.submitting = false;
        match outcome {
            Ok(_) => {
                info!("template uploaded");
                self.upload.clear();
                vec![
                    AppEvent::FormUpdated,
                    self.reload(Resource::Templates),
                    self.set_status("макет загружен"),
                ]
            }
            Err(error) => {
                error!(%error, "template upload failed");
                vec![
                    AppEvent::FormUpdated,
                    self.raise_alert(format!("Не удалось загрузить шаблон: {error}")),
                ]
            }
        }
    }

    fn delete_settled(
        &mut self,
        template_id: TemplateId,
        outcome: Result<JobOutput, String>,
    ) -> Vec<AppEvent> {
        match outcome {
            Ok(_) => {
                info!(%template_id, "template deleted");
                vec![
                    self.reload(Resource::Templates),
                    self.set_status("макет удален"),
                ]
            }
            Err(error) => {
                error!(%template_id, %error, "template delete failed");
                vec![self.raise_alert(format!("Не удалось удалить макет: {error}"))]
            }
        }
    }

    fn raise_alert(&mut self, message: String) -> AppEvent {
        self.alert = Some(message.clone());
        AppEvent::AlertRaised(message)
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

fn unexpected_output(operation: &str, output: &JobOutput) -> String {
    format!("unexpected {operation} output: {output:?}")
}

fn failure(outcome: Result<JobOutput, String>) -> String {
    match outcome {
        Ok(other) => unexpected_output("detail", &other),
        Err(error) => error,
    }
}
