// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use regdesk_api::{Client, LoginOutcome};
use regdesk_app::{
    Collection, FileKind, RequestId, RequestStatus, Resource, TelegramAuthPayload, TemplateId,
    TemplateImage, TemplateUpload, UserId,
};
use regdesk_testkit::{MockBackend, MockRoute, fixture_png};
use std::net::TcpListener;
use std::time::{Duration, Instant};

fn client(backend: &MockBackend) -> Result<Client> {
    Client::new(backend.base_url(), Duration::from_secs(2))
}

fn payload() -> TelegramAuthPayload {
    TelegramAuthPayload {
        id: 77,
        first_name: Some("Анна".to_owned()),
        last_name: None,
        username: Some("anna".to_owned()),
        photo_url: None,
        auth_date: 1_700_000_000,
        hash: "abc".to_owned(),
    }
}

#[test]
fn unreachable_backend_names_operation_and_remedy() {
    let client = Client::new("http://127.0.0.1:1", Duration::from_millis(200))
        .expect("client should initialize");
    let error = client
        .list_users()
        .expect_err("listing should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(message.starts_with("failed to fetch users:"), "{message}");
}

#[test]
fn silent_backend_times_out_like_any_transport_failure() -> Result<()> {
    // Connections complete in the kernel backlog but nothing ever answers.
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let client = Client::new(&base_url, Duration::from_millis(300))?;

    let started = Instant::now();
    let error = client
        .list_users()
        .expect_err("silent backend should time out");
    assert!(
        error.to_string().starts_with("failed to fetch users:"),
        "{error}"
    );
    assert!(error.to_string().contains("no answer from"), "{error}");
    assert!(started.elapsed() < Duration::from_secs(5));

    let error = client
        .current_user()
        .expect_err("a timed-out identity probe is an error, not a signed-out session");
    assert!(
        error.to_string().starts_with("failed to fetch current user:"),
        "{error}"
    );
    drop(listener);
    Ok(())
}

#[test]
fn collections_decode_with_missing_optional_fields() -> Result<()> {
    let backend = MockBackend::start(vec![
        MockRoute::json(
            "GET",
            "/api/requests",
            200,
            r#"[{"id":1,"user_id":4,"status":"approved","has_brand":null},
                {"id":2,"user_id":4,"status":"archived"}]"#,
        ),
        MockRoute::json(
            "GET",
            "/api/users",
            200,
            r#"[{"id":4,"tg_id":12345,"username":"ivan"}]"#,
        ),
    ])?;
    let client = client(&backend)?;

    let requests = client.list_requests()?;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].status, Some(RequestStatus::Approved));
    assert_eq!(
        requests[1].status,
        Some(RequestStatus::Other("archived".to_owned()))
    );
    assert_eq!(requests[0].has_brand, None);

    let Collection::Users(users) = client.list(Resource::Users)? else {
        panic!("users collection expected");
    };
    assert_eq!(users[0].username.as_deref(), Some("ivan"));
    Ok(())
}

#[test]
fn detail_reads_use_identifier_paths() -> Result<()> {
    let backend = MockBackend::start(vec![
        MockRoute::json("GET", "/api/requests/5", 200, r#"{"id":5,"user_id":1}"#),
        MockRoute::json(
            "GET",
            "/api/requests/5/files",
            200,
            r#"[{"id":1,"request_id":5,"kind":"sts_photo","path":"storage/uploads/x.jpg"}]"#,
        ),
        MockRoute::json("GET", "/api/templates/3", 200, r#"{"id":3,"name":"Синий"}"#),
    ])?;
    let client = client(&backend)?;

    assert_eq!(client.get_request(RequestId::new(5))?.id, RequestId::new(5));
    let files = client.list_request_files(RequestId::new(5))?;
    assert_eq!(files[0].kind, FileKind::StsPhoto);
    assert_eq!(files[0].file_name(), "x.jpg");
    assert_eq!(client.get_template(TemplateId::new(3))?.name, "Синий");

    let error = client
        .get_template(TemplateId::new(4))
        .expect_err("unknown template should fail");
    assert_eq!(
        error.to_string(),
        "failed to fetch templates/4: server error (404): Not Found"
    );
    Ok(())
}

#[test]
fn identity_probe_treats_401_and_403_as_signed_out() -> Result<()> {
    for status in [401, 403] {
        let backend = MockBackend::start(vec![MockRoute::json(
            "GET",
            "/api/auth/me",
            status,
            r#"{"detail":"Не авторизован"}"#,
        )])?;
        assert_eq!(client(&backend)?.current_user()?, None);
    }

    let backend = MockBackend::start(vec![MockRoute::json(
        "GET",
        "/api/auth/me",
        500,
        r#"{"detail":"Ошибка получения информации о пользователе"}"#,
    )])?;
    let error = client(&backend)?
        .current_user()
        .expect_err("500 should be an error");
    assert!(error.to_string().contains("(500)"));
    Ok(())
}

#[test]
fn login_cookie_is_sent_on_later_calls() -> Result<()> {
    let backend = MockBackend::start(vec![
        MockRoute::json(
            "POST",
            "/api/auth/telegram",
            200,
            r#"{"success":true,"user":{"id":77,"username":"anna","first_name":"Анна"}}"#,
        )
        .with_header("Set-Cookie", "tg_user_id=77; HttpOnly; Path=/"),
        MockRoute::json(
            "GET",
            "/api/auth/me",
            200,
            r#"{"id":77,"username":"anna","first_name":"Анна","last_name":null}"#,
        ),
    ])?;
    let client = client(&backend)?;

    let LoginOutcome::Accepted(user) = client.telegram_login(&payload())? else {
        panic!("login should be accepted");
    };
    assert_eq!(user.id, 77);
    assert_eq!(client.current_user()?.map(|user| user.id), Some(77));

    let requests = backend.requests();
    let login_body = requests[0].body_text();
    assert!(login_body.contains(r#""hash":"abc""#));
    assert!(!login_body.contains("photo_url"));
    assert_eq!(requests[1].cookie.as_deref(), Some("tg_user_id=77"));
    Ok(())
}

#[test]
fn rejected_login_carries_backend_detail() -> Result<()> {
    let backend = MockBackend::start(vec![MockRoute::json(
        "POST",
        "/api/auth/telegram",
        403,
        r#"{"detail":"Доступ запрещен. Требуются права администратора."}"#,
    )])?;
    let outcome = client(&backend)?.telegram_login(&payload())?;
    assert_eq!(
        outcome,
        LoginOutcome::Rejected(Some(
            "Доступ запрещен. Требуются права администратора.".to_owned()
        ))
    );
    Ok(())
}

#[test]
fn mutations_hit_their_endpoints() -> Result<()> {
    let backend = MockBackend::start(vec![
        MockRoute::json("POST", "/api/admins", 200, r#"{"success":true}"#),
        MockRoute::json("DELETE", "/api/templates/9", 200, r#"{"success":true}"#),
        MockRoute::json("POST", "/api/auth/logout", 200, r#"{"success":true}"#),
        MockRoute::json("POST", "/api/templates/upload", 200, r#"{"id":10}"#),
    ])?;
    let client = client(&backend)?;

    client.add_admin(UserId::new(3))?;
    client.delete_template(TemplateId::new(9))?;
    client.logout()?;
    client.upload_template(&TemplateUpload {
        name: "Синий".to_owned(),
        description: String::new(),
        image: TemplateImage {
            file_name: "blue.png".to_owned(),
            mime_type: "image/png".to_owned(),
            data: fixture_png(),
        },
    })?;

    let requests = backend.requests();
    assert_eq!(
        backend.paths(),
        vec![
            "POST /api/admins",
            "DELETE /api/templates/9",
            "POST /api/auth/logout",
            "POST /api/templates/upload",
        ]
    );
    assert_eq!(requests[0].body_text(), r#"{"user_id":3}"#);

    let upload = &requests[3];
    assert!(
        upload
            .content_type
            .as_deref()
            .is_some_and(|value| value.starts_with("multipart/form-data"))
    );
    let body = upload.body_text();
    assert!(body.contains(r#"name="name""#));
    assert!(body.contains(r#"name="description""#));
    assert!(body.contains(r#"filename="blue.png""#));
    Ok(())
}

#[test]
fn failed_mutation_reports_status_and_detail() -> Result<()> {
    let backend = MockBackend::start(vec![MockRoute::json(
        "DELETE",
        "/api/templates/9",
        500,
        r#"{"detail":"Error deleting template"}"#,
    )])?;
    let error = client(&backend)?
        .delete_template(TemplateId::new(9))
        .expect_err("500 should fail");
    assert_eq!(
        error.to_string(),
        "failed to delete template: server error (500): Error deleting template"
    );
    Ok(())
}

#[test]
fn assets_report_type_and_size() -> Result<()> {
    let png = fixture_png();
    let backend = MockBackend::start(vec![
        MockRoute::bytes("GET", "/api/uploads/a.jpg", "image/jpeg", vec![0xFF; 32]),
        MockRoute::bytes("GET", "/api/templates/2/preview", "image/png", png.clone()),
        MockRoute::json("GET", "/api/config", 200, r#"{"bot_username":"regbot"}"#),
    ])?;
    let client = client(&backend)?;

    let photo = client.fetch_upload("a.jpg")?;
    assert_eq!(photo.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(photo.size_bytes, 32);

    let preview = client.fetch_template_preview(TemplateId::new(2))?;
    assert_eq!(preview.size_bytes, png.len() as u64);

    assert!(client.fetch_upload("missing.jpg").is_err());
    assert_eq!(
        client.runtime_config()?.bot_username.as_deref(),
        Some("regbot")
    );
    Ok(())
}
