// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use regdesk_api::{Client, LoginOutcome};
use regdesk_app::{Job, JobOutput};
use regdesk_testkit::DemoService;

/// Runs UI jobs against the registration backend over HTTP.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl regdesk_tui::AppRuntime for ApiRuntime {
    fn run_job(&self, job: &Job) -> Result<JobOutput> {
        let client = &self.client;
        let output = match job {
            Job::WhoAmI => JobOutput::Session(client.current_user()?),
            Job::LoadRuntimeConfig => JobOutput::RuntimeConfig(client.runtime_config()?),
            Job::LoadCollection(resource) => JobOutput::Collection(client.list(*resource)?),
            Job::LoadRequest(id) => JobOutput::Request(Box::new(client.get_request(*id)?)),
            Job::LoadRequestFiles(id) => JobOutput::Files(client.list_request_files(*id)?),
            Job::LoadTemplate(id) => JobOutput::Template(client.get_template(*id)?),
            Job::ProbePhoto { file_name, .. } => JobOutput::Asset(client.fetch_upload(file_name)?),
            Job::ProbeTemplatePreview(id) => {
                JobOutput::Asset(client.fetch_template_preview(*id)?)
            }
            Job::TelegramLogin(payload) => match client.telegram_login(payload)? {
                LoginOutcome::Accepted(user) => JobOutput::LoggedIn(user),
                LoginOutcome::Rejected(detail) => JobOutput::LoginRejected(detail),
            },
            Job::Logout => {
                client.logout()?;
                JobOutput::Done
            }
            Job::GrantAdmin(user_id) => {
                client.add_admin(*user_id)?;
                JobOutput::Done
            }
            Job::UploadTemplate(upload) => {
                client.upload_template(upload)?;
                JobOutput::Done
            }
            Job::DeleteTemplate(id) => {
                client.delete_template(*id)?;
                JobOutput::Done
            }
        };
        Ok(output)
    }

    fn base_url(&self) -> String {
        self.client.base_url().to_owned()
    }
}

pub const DEMO_BASE_URL: &str = "demo://regdesk";

/// In-process stand-in for the backend, seeded with deterministic data.
pub struct DemoRuntime {
    service: DemoService,
}

impl DemoRuntime {
    pub fn new(seed: u64) -> Self {
        Self {
            service: DemoService::new(seed),
        }
    }
}

impl regdesk_tui::AppRuntime for DemoRuntime {
    fn run_job(&self, job: &Job) -> Result<JobOutput> {
        self.service.run(job)
    }

    fn base_url(&self) -> String {
        DEMO_BASE_URL.to_owned()
    }
}
