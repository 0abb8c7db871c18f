// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use regdesk_app::{
    Admin, AdminId, AssetInfo, AuditEntry, AuditId, Collection, FileId, FileKind, Job, JobOutput,
    Request, RequestId, RequestStatus, Resource, RuntimeConfig, SessionUser, Template, TemplateId,
    TemplateUpload, UploadedFile, User, UserId,
};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use time::macros::{datetime, format_description};
use time::{Duration, PrimitiveDateTime};
use tiny_http::{Header, Response, Server};

const PEOPLE: [(&str, &str); 14] = [
    ("Иван", "Петров"),
    ("Анна", "Смирнова"),
    ("Дмитрий", "Кузнецов"),
    ("Мария", "Попова"),
    ("Сергей", "Васильев"),
    ("Ольга", "Соколова"),
    ("Алексей", "Михайлов"),
    ("Елена", "Новикова"),
    ("Михаил", "Федоров"),
    ("Татьяна", "Морозова"),
    ("Николай", "Волков"),
    ("Ксения", "Алексеева"),
    ("Артем", "Лебедев"),
    ("Дарья", "Семенова"),
];

const HANDLES: [&str; 14] = [
    "ivan_taxi",
    "anna_s",
    "dkuznetsov",
    "masha_p",
    "vasilev_drive",
    "olga_sok",
    "alexm",
    "lena_nov",
    "fedorov_m",
    "tanya_moroz",
    "volkov_nik",
    "ksu_alex",
    "artem_l",
    "dasha_sem",
];

const CATEGORIES: [&str; 5] = ["Эконом", "Комфорт", "Комфорт+", "Бизнес", "Доставка"];

const LICENSE_OPTIONS: [&str; 3] = [
    "Есть лицензия",
    "Оформить через партнера",
    "Оформить самостоятельно",
];

const TEMPLATES: [(&str, Option<&str>); 4] = [
    ("Классический желтый", Some("Желтый кузов с шашечками на дверях")),
    ("Шашки по борту", Some("Полоса из шашек вдоль всего борта")),
    ("Минимализм", None),
    ("Брендированная дверь", Some("Логотип сервиса на передних дверях")),
];

const NOTES: [&str; 5] = [
    "Клиент просит перезвонить после 18:00",
    "Фото СТС размыто, запрошено повторно",
    "Автомобиль после ремонта, проверить год выпуска",
    "Нужна консультация по лицензии",
    "Документы в порядке",
];

const STATUSES: [RequestStatus; 5] = [
    RequestStatus::Draft,
    RequestStatus::Pending,
    RequestStatus::Submitted,
    RequestStatus::Approved,
    RequestStatus::Rejected,
];

/// Template id referenced by a demo request although no such template exists.
pub const DELETED_TEMPLATE_ID: i64 = 99;

const REFERENCE_TIME: PrimitiveDateTime = datetime!(2025-03-01 9:00);

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    fn maybe_bool(&mut self) -> Option<bool> {
        match self.int_n(5) {
            0 => None,
            _ => Some(self.bool()),
        }
    }
}

/// Snapshot of everything the demo backend serves. Mutations mirror what the
/// real backend does for grant, upload and delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoData {
    pub users: Vec<User>,
    pub admins: Vec<Admin>,
    pub requests: Vec<Request>,
    pub files: Vec<UploadedFile>,
    pub templates: Vec<Template>,
    pub audit: Vec<AuditEntry>,
}

impl DemoData {
    pub fn generate(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        let mut rng = DeterministicRng::new(normalized);

        let users = PEOPLE
            .iter()
            .zip(HANDLES)
            .enumerate()
            .map(|(index, ((first, last), handle))| {
                let id = index as i64 + 1;
                let joined = minutes_before(60 * 24 * (30 - index as i64));
                User {
                    id: UserId::new(id),
                    tg_id: 400_000_000 + id * 7_919,
                    username: (index % 5 != 4).then(|| handle.to_owned()),
                    first_name: Some((*first).to_owned()),
                    last_name: (index % 6 != 5).then(|| (*last).to_owned()),
                    created_at: Some(joined),
                    last_seen: Some(minutes_before(rng.int_n(60 * 24 * 3) as i64)),
                }
            })
            .collect::<Vec<_>>();

        let admins = users
            .iter()
            .take(2)
            .enumerate()
            .map(|(index, user)| Admin {
                id: AdminId::new(index as i64 + 1),
                tg_id: Some(user.tg_id),
                username: user.username.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                added_at: user.created_at.clone(),
                added_by: (index > 0).then_some(users[0].tg_id),
            })
            .collect();

        let templates = TEMPLATES
            .iter()
            .enumerate()
            .map(|(index, (name, description))| Template {
                id: TemplateId::new(index as i64 + 1),
                name: (*name).to_owned(),
                description: description.map(str::to_owned),
                created_at: Some(minutes_before(60 * 24 * (60 - index as i64))),
            })
            .collect::<Vec<_>>();

        let mut requests = Vec::new();
        let mut files = Vec::new();
        let mut audit = Vec::new();
        for index in 0..16_usize {
            let id = index as i64 + 1;
            let owner = &users[rng.int_n(users.len())];
            let status = STATUSES[index % STATUSES.len()].clone();
            let created = 60 * (400 - 20 * index as i64);
            let submitted = matches!(
                status,
                RequestStatus::Submitted | RequestStatus::Approved | RequestStatus::Rejected
            );
            let processed = matches!(status, RequestStatus::Approved | RequestStatus::Rejected);
            let selected_template_id = match index {
                5 => Some(TemplateId::new(DELETED_TEMPLATE_ID)),
                _ if rng.int_n(3) == 0 => None,
                _ => Some(templates[rng.int_n(templates.len())].id),
            };

            requests.push(Request {
                id: RequestId::new(id),
                user_id: owner.id,
                username: owner.username.clone(),
                category: Some(CATEGORIES[rng.int_n(CATEGORIES.len())].to_owned()),
                status: Some(status),
                has_brand: rng.maybe_bool(),
                year: (index % 7 != 3).then(|| 2012 + rng.int_n(13) as i32),
                has_license: rng.maybe_bool(),
                license_option: (rng.int_n(3) != 0)
                    .then(|| LICENSE_OPTIONS[rng.int_n(LICENSE_OPTIONS.len())].to_owned()),
                selected_template_id,
                notes: (rng.int_n(3) == 0).then(|| NOTES[rng.int_n(NOTES.len())].to_owned()),
                created_at: Some(minutes_before(created)),
                submitted_at: submitted.then(|| minutes_before(created - 45)),
                processed_at: processed.then(|| minutes_before(created - 600)),
            });

            if submitted {
                let kinds = ["auto_photo", "auto_photo", "sts_photo", "document"];
                let count = 1 + rng.int_n(kinds.len());
                for (slot, kind) in kinds.iter().take(count).enumerate() {
                    let file_id = files.len() as i64 + 1;
                    files.push(UploadedFile {
                        id: FileId::new(file_id),
                        request_id: RequestId::new(id),
                        kind: FileKind::parse(kind),
                        file_id: Some(format!("AgAC{file_id:06}")),
                        path: format!("uploads/req{id}_{slot}_{kind}.jpg"),
                        created_at: Some(minutes_before(created - 30)),
                    });
                }
                audit.push(AuditEntry {
                    id: AuditId::new(audit.len() as i64 + 1),
                    event: "request_submitted".to_owned(),
                    payload: format!(r#"{{"request_id": {id}}}"#),
                    created_at: Some(minutes_before(created - 45)),
                });
            }
        }

        Self {
            users,
            admins,
            requests,
            files,
            templates,
            audit,
        }
    }

    pub fn session_user(&self) -> SessionUser {
        let admin = self.admins.first();
        SessionUser {
            id: admin.and_then(|admin| admin.tg_id).unwrap_or(1),
            username: admin.and_then(|admin| admin.username.clone()),
            first_name: admin.and_then(|admin| admin.first_name.clone()),
            last_name: admin.and_then(|admin| admin.last_name.clone()),
            photo_url: None,
        }
    }

    pub fn request(&self, id: RequestId) -> Result<Request> {
        self.requests
            .iter()
            .find(|request| request.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("request {id} not found"))
    }

    pub fn files_for(&self, id: RequestId) -> Vec<UploadedFile> {
        self.files
            .iter()
            .filter(|file| file.request_id == id)
            .cloned()
            .collect()
    }

    pub fn template(&self, id: TemplateId) -> Result<Template> {
        self.templates
            .iter()
            .find(|template| template.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("template {id} not found"))
    }

    pub fn has_upload(&self, file_name: &str) -> bool {
        self.files.iter().any(|file| file.file_name() == file_name)
    }

    pub fn grant_admin(&mut self, user_id: UserId, granted_by: i64) -> Result<Admin> {
        let Some(user) = self.users.iter().find(|user| user.id == user_id) else {
            bail!("user {user_id} not found");
        };
        if self
            .admins
            .iter()
            .any(|admin| admin.tg_id == Some(user.tg_id))
        {
            bail!("user {user_id} is already an admin");
        }
        let next_id = self.admins.iter().map(|admin| admin.id.get()).max().unwrap_or(0) + 1;
        let admin = Admin {
            id: AdminId::new(next_id),
            tg_id: Some(user.tg_id),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            added_at: Some(format_timestamp(REFERENCE_TIME)),
            added_by: Some(granted_by),
        };
        self.admins.push(admin.clone());
        Ok(admin)
    }

    pub fn add_template(&mut self, upload: &TemplateUpload) -> Template {
        let next_id = self
            .templates
            .iter()
            .map(|template| template.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        let description = upload.description.trim();
        let template = Template {
            id: TemplateId::new(next_id),
            name: upload.name.clone(),
            description: (!description.is_empty()).then(|| description.to_owned()),
            created_at: Some(format_timestamp(REFERENCE_TIME)),
        };
        self.templates.push(template.clone());
        template
    }

    pub fn delete_template(&mut self, id: TemplateId) -> Result<()> {
        let before = self.templates.len();
        self.templates.retain(|template| template.id != id);
        if self.templates.len() == before {
            bail!("template {id} not found");
        }
        Ok(())
    }
}

pub const DEMO_BOT_USERNAME: &str = "regdesk_demo_bot";
pub const DEMO_ACCESS_DENIED: &str = "Доступ запрещен. Требуются права администратора.";

#[derive(Debug)]
struct DemoSession {
    data: DemoData,
    signed_in: bool,
}

/// Answers UI jobs from an in-memory `DemoData`, standing in for the HTTP
/// backend. Mutations change the data so later reloads observe them.
#[derive(Debug)]
pub struct DemoService {
    session: Mutex<DemoSession>,
}

impl DemoService {
    pub fn new(seed: u64) -> Self {
        Self::with_session(DemoData::generate(seed), true)
    }

    pub fn signed_out(seed: u64) -> Self {
        Self::with_session(DemoData::generate(seed), false)
    }

    pub fn with_session(data: DemoData, signed_in: bool) -> Self {
        Self {
            session: Mutex::new(DemoSession { data, signed_in }),
        }
    }

    pub fn snapshot(&self) -> Result<DemoData> {
        Ok(self.lock()?.data.clone())
    }

    pub fn run(&self, job: &Job) -> Result<JobOutput> {
        let mut session = self.lock()?;
        let output = match job {
            Job::WhoAmI => {
                JobOutput::Session(session.signed_in.then(|| session.data.session_user()))
            }
            Job::LoadRuntimeConfig => JobOutput::RuntimeConfig(RuntimeConfig {
                bot_username: Some(DEMO_BOT_USERNAME.to_owned()),
            }),
            Job::LoadCollection(resource) => {
                session.require_signed_in()?;
                let data = &session.data;
                JobOutput::Collection(match resource {
                    Resource::Users => Collection::Users(data.users.clone()),
                    Resource::Admins => Collection::Admins(data.admins.clone()),
                    Resource::Requests => Collection::Requests(data.requests.clone()),
                    Resource::Templates => Collection::Templates(data.templates.clone()),
                })
            }
            Job::LoadRequest(id) => {
                session.require_signed_in()?;
                JobOutput::Request(Box::new(session.data.request(*id)?))
            }
            Job::LoadRequestFiles(id) => {
                session.require_signed_in()?;
                JobOutput::Files(session.data.files_for(*id))
            }
            Job::LoadTemplate(id) => {
                session.require_signed_in()?;
                JobOutput::Template(session.data.template(*id)?)
            }
            Job::ProbePhoto { file_name, .. } => {
                if !session.data.has_upload(file_name) {
                    bail!("upload {file_name} not found");
                }
                JobOutput::Asset(AssetInfo {
                    content_type: Some("image/jpeg".to_owned()),
                    size_bytes: 48_213,
                })
            }
            Job::ProbeTemplatePreview(id) => {
                session.data.template(*id)?;
                JobOutput::Asset(AssetInfo {
                    content_type: Some("image/png".to_owned()),
                    size_bytes: fixture_png().len() as u64,
                })
            }
            Job::TelegramLogin(payload) => {
                let is_admin = session
                    .data
                    .admins
                    .iter()
                    .any(|admin| admin.tg_id == Some(payload.id));
                if is_admin {
                    session.signed_in = true;
                    JobOutput::LoggedIn(session.data.session_user())
                } else {
                    JobOutput::LoginRejected(Some(DEMO_ACCESS_DENIED.to_owned()))
                }
            }
            Job::Logout => {
                session.signed_in = false;
                JobOutput::Done
            }
            Job::GrantAdmin(user_id) => {
                session.require_signed_in()?;
                let granted_by = session.data.session_user().id;
                session.data.grant_admin(*user_id, granted_by)?;
                JobOutput::Done
            }
            Job::UploadTemplate(upload) => {
                session.require_signed_in()?;
                session.data.add_template(upload);
                JobOutput::Done
            }
            Job::DeleteTemplate(id) => {
                session.require_signed_in()?;
                session.data.delete_template(*id)?;
                JobOutput::Done
            }
        };
        Ok(output)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, DemoSession>> {
        self.session
            .lock()
            .map_err(|_| anyhow!("demo backend state poisoned"))
    }
}

impl DemoSession {
    fn require_signed_in(&self) -> Result<()> {
        if !self.signed_in {
            bail!("server error (401): Не авторизован");
        }
        Ok(())
    }
}

fn minutes_before(minutes: i64) -> String {
    format_timestamp(REFERENCE_TIME - Duration::minutes(minutes))
}

fn format_timestamp(value: PrimitiveDateTime) -> String {
    value
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second]"
        ))
        .unwrap_or_default()
}

/// Smallest valid PNG: signature, IHDR, IDAT and IEND for a 1x1 pixel.
pub fn fixture_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Canned answer for one method and path on the mock backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockRoute {
    pub method: String,
    pub path: String,
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl MockRoute {
    pub fn json(method: &str, path: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_owned(),
            status,
            content_type: "application/json".to_owned(),
            body: body.into().into_bytes(),
            headers: Vec::new(),
        }
    }

    pub fn bytes(method: &str, path: &str, content_type: &str, body: Vec<u8>) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_owned(),
            status: 200,
            content_type: content_type.to_owned(),
            body,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    pub cookie: Option<String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// HTTP server on a loopback port answering from a fixed route table and
/// recording every request it sees. Unknown routes get a 404 envelope.
pub struct MockBackend {
    server: Arc<Server>,
    base_url: String,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    worker: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start(routes: Vec<MockRoute>) -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let log = Arc::new(Mutex::new(Vec::new()));

        let worker = {
            let server = Arc::clone(&server);
            let log = Arc::clone(&log);
            thread::spawn(move || serve(&server, &routes, &log))
        };

        Ok(Self {
            server,
            base_url,
            log,
            worker: Some(worker),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| format!("{} {}", request.method, request.path))
            .collect()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(server: &Server, routes: &[MockRoute], log: &Mutex<Vec<RecordedRequest>>) {
    for mut request in server.incoming_requests() {
        let method = request.method().as_str().to_ascii_uppercase();
        let path = request.url().to_owned();
        let header = |name: &'static str| {
            request
                .headers()
                .iter()
                .find(|header| header.field.equiv(name))
                .map(|header| header.value.as_str().to_owned())
        };
        let content_type = header("Content-Type");
        let cookie = header("Cookie");
        let mut body = Vec::new();
        let _ = request.as_reader().read_to_end(&mut body);

        if let Ok(mut log) = log.lock() {
            log.push(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                content_type,
                cookie,
                body,
            });
        }

        let route = routes
            .iter()
            .find(|route| route.method == method && route.path == path);
        let response = match route {
            Some(route) => {
                let mut response =
                    Response::from_data(route.body.clone()).with_status_code(route.status);
                let headers = std::iter::once(("Content-Type", route.content_type.as_str()))
                    .chain(
                        route
                            .headers
                            .iter()
                            .map(|(name, value)| (name.as_str(), value.as_str())),
                    );
                for (name, value) in headers {
                    if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
                        response.add_header(header);
                    }
                }
                response
            }
            None => Response::from_data(br#"{"detail":"Not Found"}"#.to_vec()).with_status_code(404),
        };
        let _ = request.respond(response);
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DELETED_TEMPLATE_ID, DEMO_ACCESS_DENIED, DemoData, DemoService, MockBackend, MockRoute,
    };
    use anyhow::Result;
    use regdesk_app::{
        Job, JobOutput, RequestId, Resource, TelegramAuthPayload, TemplateId, TemplateImage,
        TemplateUpload, UserId,
    };
    use std::io::{Read, Write};
    use std::net::TcpStream;

    #[test]
    fn demo_data_is_deterministic() {
        assert_eq!(DemoData::generate(7), DemoData::generate(7));
        assert_eq!(DemoData::generate(0), DemoData::generate(1));
    }

    #[test]
    fn demo_data_has_photos_and_a_dangling_template() {
        let data = DemoData::generate(1);
        assert_eq!(data.users.len(), 14);
        assert_eq!(data.admins.len(), 2);
        assert!(data.files.iter().any(|file| file.kind.is_photo()));
        assert!(data.requests.iter().any(|request| {
            request.selected_template_id == Some(TemplateId::new(DELETED_TEMPLATE_ID))
        }));
        assert!(data.template(TemplateId::new(DELETED_TEMPLATE_ID)).is_err());

        let with_files = data.files[0].request_id;
        assert!(!data.files_for(with_files).is_empty());
        assert!(data.has_upload(data.files[0].file_name()));
        assert!(data.request(RequestId::new(1)).is_ok());
    }

    #[test]
    fn demo_mutations_follow_backend_rules() -> Result<()> {
        let mut data = DemoData::generate(1);
        let granted_by = data.session_user().id;

        let admin = data.grant_admin(UserId::new(5), granted_by)?;
        assert_eq!(admin.added_by, Some(granted_by));
        assert!(data.grant_admin(UserId::new(5), granted_by).is_err());
        assert!(data.grant_admin(UserId::new(500), granted_by).is_err());

        let template = data.add_template(&TemplateUpload {
            name: "Новый".to_owned(),
            description: "  ".to_owned(),
            image: TemplateImage {
                file_name: "new.png".to_owned(),
                mime_type: "image/png".to_owned(),
                data: super::fixture_png(),
            },
        });
        assert_eq!(template.id, TemplateId::new(5));
        assert_eq!(template.description, None);

        data.delete_template(template.id)?;
        assert!(data.delete_template(template.id).is_err());
        Ok(())
    }

    #[test]
    fn mock_backend_answers_routes_and_records_requests() -> Result<()> {
        let backend = MockBackend::start(vec![MockRoute::json(
            "get",
            "/api/users",
            200,
            "[]",
        )])?;
        let address = backend.base_url().trim_start_matches("http://").to_owned();

        let mut stream = TcpStream::connect(&address)?;
        write!(
            stream,
            "GET /api/users HTTP/1.1\r\nHost: {address}\r\nConnection: close\r\n\r\n"
        )?;
        let mut reply = String::new();
        stream.read_to_string(&mut reply)?;
        assert!(reply.starts_with("HTTP/1.1 200"));
        assert!(reply.ends_with("[]"));

        let mut stream = TcpStream::connect(&address)?;
        write!(
            stream,
            "GET /api/missing HTTP/1.1\r\nHost: {address}\r\nConnection: close\r\n\r\n"
        )?;
        let mut reply = String::new();
        stream.read_to_string(&mut reply)?;
        assert!(reply.starts_with("HTTP/1.1 404"));

        assert_eq!(
            backend.paths(),
            vec!["GET /api/users".to_owned(), "GET /api/missing".to_owned()]
        );
        Ok(())
    }

    #[test]
    fn demo_service_answers_jobs_and_tracks_the_session() -> Result<()> {
        let service = DemoService::signed_out(1);
        assert_eq!(service.run(&Job::WhoAmI)?, JobOutput::Session(None));
        assert!(service.run(&Job::LoadCollection(Resource::Users)).is_err());

        let stranger = TelegramAuthPayload {
            id: 1,
            first_name: None,
            last_name: None,
            username: None,
            photo_url: None,
            auth_date: 1,
            hash: "x".to_owned(),
        };
        assert_eq!(
            service.run(&Job::TelegramLogin(stranger.clone()))?,
            JobOutput::LoginRejected(Some(DEMO_ACCESS_DENIED.to_owned()))
        );

        let admin_id = service.snapshot()?.session_user().id;
        let admin = TelegramAuthPayload {
            id: admin_id,
            ..stranger
        };
        assert!(matches!(
            service.run(&Job::TelegramLogin(admin))?,
            JobOutput::LoggedIn(_)
        ));

        let JobOutput::Collection(users) = service.run(&Job::LoadCollection(Resource::Users))?
        else {
            panic!("collection expected");
        };
        assert_eq!(users.len(), 14);

        service.run(&Job::GrantAdmin(UserId::new(5)))?;
        assert_eq!(service.snapshot()?.admins.len(), 3);
        assert!(service.run(&Job::GrantAdmin(UserId::new(5))).is_err());
        assert!(
            service
                .run(&Job::ProbeTemplatePreview(TemplateId::new(DELETED_TEMPLATE_ID)))
                .is_err()
        );

        service.run(&Job::Logout)?;
        assert_eq!(service.run(&Job::WhoAmI)?, JobOutput::Session(None));
        Ok(())
    }
}
