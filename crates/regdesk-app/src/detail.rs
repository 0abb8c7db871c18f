// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use tracing::warn;

use crate::{AssetInfo, FileId, Job, Request, RequestId, Template, TemplateId, UploadedFile};

pub const DETAIL_LOAD_FAILED: &str = "Не удалось загрузить детали заявки";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetailPhase {
    Loading,
    Failed(String),
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLookup {
    NotSelected,
    Loading(TemplateId),
    Resolved(Template),
    /// The referenced template could not be fetched; only the id is shown.
    Unresolved(TemplateId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Checking,
    Available(AssetInfo),
    Broken,
}

/// Drill-down state for one request. Loads the request and its files, then
/// resolves the selected template once the request is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetail {
    request_id: RequestId,
    generation: u64,
    phase: DetailPhase,
    request: Option<Request>,
    files: Vec<UploadedFile>,
    pending_request: Option<Result<Request, String>>,
    pending_files: Option<Result<Vec<UploadedFile>, String>>,
    template: TemplateLookup,
    preview: Option<Availability>,
    photos: BTreeMap<FileId, Availability>,
    lightbox: Option<FileId>,
}

impl RequestDetail {
    pub fn open(request_id: RequestId, generation: u64) -> (Self, Vec<Job>) {
        let detail = Self {
            request_id,
            generation,
            phase: DetailPhase::Loading,
            request: None,
            files: Vec::new(),
            pending_request: None,
            pending_files: None,
            template: TemplateLookup::NotSelected,
            preview: None,
            photos: BTreeMap::new(),
            lightbox: None,
        };
        let jobs = vec![
            Job::LoadRequest(request_id),
            Job::LoadRequestFiles(request_id),
        ];
        (detail, jobs)
    }

    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == DetailPhase::Loading
    }

    pub fn is_template_loading(&self) -> bool {
        matches!(self.template, TemplateLookup::Loading(_))
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    pub fn template(&self) -> &TemplateLookup {
        &self.template
    }

    pub fn preview(&self) -> Option<&Availability> {
        self.preview.as_ref()
    }

    /// Attached files that are displayed as photos, in backend order.
    pub fn photos(&self) -> Vec<&UploadedFile> {
        self.files.iter().filter(|file| file.kind.is_photo()).collect()
    }

    pub fn photo_count(&self) -> usize {
        self.files.iter().filter(|file| file.kind.is_photo()).count()
    }

    pub fn availability(&self, file_id: FileId) -> &Availability {
        self.photos.get(&file_id).unwrap_or(&Availability::Checking)
    }

    pub fn is_broken(&self, file_id: FileId) -> bool {
        matches!(self.photos.get(&file_id), Some(Availability::Broken))
    }

    pub fn lightbox(&self) -> Option<&UploadedFile> {
        let id = self.lightbox?;
        self.files.iter().find(|file| file.id == id)
    }

    pub fn open_photo(&mut self, file_id: FileId) -> bool {
        let is_photo = self
            .files
            .iter()
            .any(|file| file.id == file_id && file.kind.is_photo());
        if is_photo {
            self.lightbox = Some(file_id);
        }
        is_photo
    }

    pub fn close_photo(&mut self) -> bool {
        self.lightbox.take().is_some()
    }

    pub fn request_loaded(&mut self, outcome: Result<Request, String>) -> Vec<Job> {
        self.pending_request = Some(outcome);
        self.try_finish()
    }

    pub fn files_loaded(&mut self, outcome: Result<Vec<UploadedFile>, String>) -> Vec<Job> {
        self.pending_files = Some(outcome);
        self.try_finish()
    }

    fn try_finish(&mut self) -> Vec<Job> {
        if self.phase != DetailPhase::Loading
            || self.pending_request.is_none()
            || self.pending_files.is_none()
        {
            return Vec::new();
        }

        let request = self.pending_request.take();
        let files = self.pending_files.take();
        let (request, files) = match (request, files) {
            (Some(Ok(request)), Some(Ok(files))) => (request, files),
            (request, files) => {
                for error in [
                    request.and_then(Result::err),
                    files.and_then(Result::err),
                ]
                .into_iter()
                .flatten()
                {
                    warn!(request_id = %self.request_id, %error, "request detail load failed");
                }
                self.phase = DetailPhase::Failed(DETAIL_LOAD_FAILED.to_owned());
                return Vec::new();
            }
        };

        let mut jobs = Vec::new();
        match request.selected_template_id {
            Some(template_id) => {
                self.template = TemplateLookup::Loading(template_id);
                jobs.push(Job::LoadTemplate(template_id));
            }
            None => self.template = TemplateLookup::NotSelected,
        }

        for file in files.iter().filter(|file| file.kind.is_photo()) {
            self.photos.insert(file.id, Availability::Checking);
            jobs.push(Job::ProbePhoto {
                file_id: file.id,
                file_name: file.file_name().to_owned(),
            });
        }

        self.request = Some(request);
        self.files = files;
        self.phase = DetailPhase::Ready;
        jobs
    }

    /// A failed lookup degrades to the bare id and never fails the page.
    pub fn template_loaded(&mut self, outcome: Result<Template, String>) -> Vec<Job> {
        let TemplateLookup::Loading(template_id) = self.template else {
            return Vec::new();
        };
        match outcome {
            Ok(template) => {
                self.template = TemplateLookup::Resolved(template);
                self.preview = Some(Availability::Checking);
                vec![Job::ProbeTemplatePreview(template_id)]
            }
            Err(error) => {
                warn!(%template_id, %error, "template lookup failed; showing id only");
                self.template = TemplateLookup::Unresolved(template_id);
                Vec::new()
            }
        }
    }

    pub fn photo_probed(&mut self, file_id: FileId, outcome: Result<AssetInfo, String>) {
        let Some(slot) = self.photos.get_mut(&file_id) else {
            return;
        };
        *slot = match outcome {
            Ok(info) => Availability::Available(info),
            Err(error) => {
                warn!(%file_id, %error, "photo unavailable");
                Availability::Broken
            }
        };
    }

    pub fn preview_probed(&mut self, outcome: Result<AssetInfo, String>) {
        if self.preview.is_none() {
            return;
        }
        self.preview = Some(match outcome {
            Ok(info) => Availability::Available(info),
            Err(error) => {
                warn!(%error, "template preview unavailable");
                Availability::Broken
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{Availability, DetailPhase, RequestDetail, TemplateLookup};
    use crate::{
        AssetInfo, FileId, FileKind, Job, Request, RequestId, Template, TemplateId, UploadedFile,
        UserId,
    };

    fn request(template: Option<i64>) -> Request {
        Request {
            id: RequestId::new(5),
            user_id: UserId::new(2),
            username: Some("ivan".to_owned()),
            category: Some("легковой".to_owned()),
            status: None,
            has_brand: Some(true),
            year: Some(2020),
            has_license: None,
            license_option: None,
            selected_template_id: template.map(TemplateId::new),
            notes: None,
            created_at: None,
            submitted_at: None,
            processed_at: None,
        }
    }

    fn file(id: i64, kind: &str) -> UploadedFile {
        UploadedFile {
            id: FileId::new(id),
            request_id: RequestId::new(5),
            kind: FileKind::parse(kind),
            file_id: None,
            path: format!("storage/uploads/{id}.jpg"),
            created_at: None,
        }
    }

    #[test]
    fn open_requests_request_and_files_together() {
        let (detail, jobs) = RequestDetail::open(RequestId::new(5), 1);
        assert!(detail.is_loading());
        assert_eq!(
            jobs,
            vec![
                Job::LoadRequest(RequestId::new(5)),
                Job::LoadRequestFiles(RequestId::new(5)),
            ]
        );
    }

    #[test]
    fn ready_after_both_parts_and_template_follows() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        assert!(detail.files_loaded(Ok(vec![file(1, "auto_photo")])).is_empty());
        assert!(detail.is_loading());

        let jobs = detail.request_loaded(Ok(request(Some(9))));
        assert_eq!(detail.phase(), &DetailPhase::Ready);
        assert!(detail.is_template_loading());
        assert_eq!(
            jobs,
            vec![
                Job::LoadTemplate(TemplateId::new(9)),
                Job::ProbePhoto {
                    file_id: FileId::new(1),
                    file_name: "1.jpg".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn template_failure_degrades_to_id() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        detail.request_loaded(Ok(request(Some(9))));
        detail.files_loaded(Ok(Vec::new()));

        let jobs = detail.template_loaded(Err("404".to_owned()));
        assert!(jobs.is_empty());
        assert_eq!(
            detail.template(),
            &TemplateLookup::Unresolved(TemplateId::new(9))
        );
        assert_eq!(detail.phase(), &DetailPhase::Ready);
    }

    #[test]
    fn template_success_probes_preview() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        detail.request_loaded(Ok(request(Some(9))));
        detail.files_loaded(Ok(Vec::new()));
        let template = Template {
            id: TemplateId::new(9),
            name: "Синий".to_owned(),
            description: None,
            created_at: None,
        };
        let jobs = detail.template_loaded(Ok(template.clone()));
        assert_eq!(jobs, vec![Job::ProbeTemplatePreview(TemplateId::new(9))]);
        assert_eq!(detail.template(), &TemplateLookup::Resolved(template));
        assert_eq!(detail.preview(), Some(&Availability::Checking));
    }

    #[test]
    fn any_part_failure_fails_the_page() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        detail.request_loaded(Ok(request(None)));
        detail.files_loaded(Err("boom".to_owned()));
        assert!(matches!(detail.phase(), DetailPhase::Failed(_)));
    }

    #[test]
    fn photos_filter_kinds_and_track_broken_tiles() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        detail.request_loaded(Ok(request(None)));
        detail.files_loaded(Ok(vec![
            file(1, "auto_photo"),
            file(2, "sts_photo"),
            file(3, "document"),
        ]));
        assert_eq!(detail.photo_count(), 2);

        detail.photo_probed(
            FileId::new(1),
            Ok(AssetInfo {
                content_type: Some("image/jpeg".to_owned()),
                size_bytes: 10,
            }),
        );
        detail.photo_probed(FileId::new(2), Err("404".to_owned()));
        assert!(!detail.is_broken(FileId::new(1)));
        assert!(detail.is_broken(FileId::new(2)));
    }

    #[test]
    fn lightbox_only_opens_for_photos() {
        let (mut detail, _) = RequestDetail::open(RequestId::new(5), 1);
        detail.request_loaded(Ok(request(None)));
        detail.files_loaded(Ok(vec![file(1, "auto_photo"), file(3, "document")]));

        assert!(!detail.open_photo(FileId::new(3)));
        assert!(detail.lightbox().is_none());
        assert!(detail.open_photo(FileId::new(1)));
        assert_eq!(detail.lightbox().map(|file| file.id), Some(FileId::new(1)));
        assert!(detail.close_photo());
        assert!(!detail.close_photo());
    }
}
