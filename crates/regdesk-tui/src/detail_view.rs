// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regdesk_app::display::{
    byte_size, flag_badge, long_date, or_not_available, status_label, telegram_handle,
    telegram_link, template_preview_path, upload_path, year_label,
};
use regdesk_app::{
    Availability, DetailPhase, FileKind, Request, RequestDetail, RequestStatus, TemplateLookup,
    UploadedFile,
};

pub const BACK_HINT: &str = "← Назад к заявкам";
pub const LOADING_DETAIL: &str = "Загрузка деталей заявки...";
pub const NO_PHOTOS: &str = "К этой заявке нет прикрепленных фотографий";
const UNNAMED_TEMPLATE: &str = "Без названия";

pub fn detail_title(detail: &RequestDetail) -> String {
    format!("Заявка #{}", detail.request_id())
}

/// Body text of the request drill-down. `photo_cursor` indexes the photo
/// list and is ignored when out of range; asset URLs are rooted at
/// `base_url`.
pub fn render_detail_text(detail: &RequestDetail, photo_cursor: usize, base_url: &str) -> String {
    match detail.phase() {
        DetailPhase::Loading => LOADING_DETAIL.to_owned(),
        DetailPhase::Failed(message) => format!("{message}\n\n{BACK_HINT} (esc)"),
        DetailPhase::Ready => match detail.request() {
            Some(request) => ready_text(detail, request, photo_cursor, base_url),
            None => format!("Заявка не найдена\n\n{BACK_HINT} (esc)"),
        },
    }
}

fn ready_text(
    detail: &RequestDetail,
    request: &Request,
    photo_cursor: usize,
    base_url: &str,
) -> String {
    let mut lines = vec![format!("{BACK_HINT} (esc)"), String::new()];

    lines.push("Информация о заявке".to_owned());
    lines.push(field("ID", &request.id.to_string()));
    lines.push(field("ID пользователя", &request.user_id.to_string()));
    lines.push(field("Telegram", &telegram_cell(request.username.as_deref())));
    lines.push(field(
        "Категория",
        &or_not_available(request.category.as_deref()),
    ));
    // The drill-down treats a missing status as pending.
    let status = request.status.clone().unwrap_or(RequestStatus::Pending);
    lines.push(field("Статус", &status_label(Some(&status))));
    lines.push(String::new());

    lines.push("Информация об автомобиле".to_owned());
    lines.push(field("Есть бренд", flag_badge(request.has_brand)));
    lines.push(field("Год выпуска", &year_or_na(request.year)));
    lines.push(field("Есть лицензия", flag_badge(request.has_license)));
    lines.push(field(
        "Опция лицензии",
        &or_not_available(request.license_option.as_deref()),
    ));
    lines.push(field("Выбранный макет", &template_text(detail)));
    if let Some(preview) = preview_text(detail, base_url) {
        lines.push(format!("  {preview}"));
    }
    lines.push(String::new());

    lines.push("Временные метки".to_owned());
    lines.push(field("Создана", &long_date(request.created_at.as_deref())));
    lines.push(field("Отправлена", &long_date(request.submitted_at.as_deref())));
    lines.push(field("Обработана", &long_date(request.processed_at.as_deref())));

    if let Some(notes) = request.notes.as_deref().filter(|notes| !notes.trim().is_empty()) {
        lines.push(String::new());
        lines.push("Примечания".to_owned());
        lines.extend(notes.lines().map(|line| format!("  {line}")));
    }

    lines.push(String::new());
    lines.push(format!("Фотографии ({})", detail.photo_count()));
    let photos = detail.photos();
    if photos.is_empty() {
        lines.push(NO_PHOTOS.to_owned());
    } else {
        for (index, photo) in photos.iter().enumerate() {
            let marker = if index == photo_cursor { ">" } else { " " };
            lines.push(format!(
                "{marker} {}",
                photo_tile(photo, detail.availability(photo.id))
            ));
        }
    }

    lines.join("\n")
}

fn field(label: &str, value: &str) -> String {
    format!("  {label}: {value}")
}

fn telegram_cell(username: Option<&str>) -> String {
    match username.filter(|name| !name.is_empty()) {
        Some(name) => format!("{} ({})", telegram_handle(name), telegram_link(name)),
        None => "Не указан".to_owned(),
    }
}

fn year_or_na(year: Option<i32>) -> String {
    match year {
        Some(year) if year != 0 => year_label(Some(year)),
        _ => "Н/Д".to_owned(),
    }
}

pub fn template_text(detail: &RequestDetail) -> String {
    match detail.template() {
        TemplateLookup::NotSelected => "Не выбрано".to_owned(),
        TemplateLookup::Loading(_) => "Загрузка...".to_owned(),
        TemplateLookup::Resolved(template) => {
            let name = if template.name.trim().is_empty() {
                UNNAMED_TEMPLATE
            } else {
                template.name.as_str()
            };
            format!("#{} — {name}", template.id)
        }
        TemplateLookup::Unresolved(template_id) => format!("#{template_id}"),
    }
}

fn preview_text(detail: &RequestDetail, base_url: &str) -> Option<String> {
    let TemplateLookup::Resolved(template) = detail.template() else {
        return None;
    };
    let url = format!("{base_url}{}", template_preview_path(template.id));
    let state = match detail.preview() {
        None | Some(Availability::Checking) => "проверка...".to_owned(),
        Some(Availability::Available(info)) => asset_summary(info),
        Some(Availability::Broken) => "изображение недоступно".to_owned(),
    };
    Some(format!("превью: {url} [{state}]"))
}

fn kind_label(kind: &FileKind) -> &str {
    match kind {
        FileKind::AutoPhoto => "фото авто",
        FileKind::StsPhoto => "фото СТС",
        FileKind::Other(raw) => raw,
    }
}

/// A broken photo hides its thumbnail and only keeps the marked tile.
fn photo_tile(photo: &UploadedFile, availability: &Availability) -> String {
    match availability {
        Availability::Broken => format!("[✖] {}", kind_label(&photo.kind)),
        Availability::Checking => format!(
            "[…] {} {}",
            kind_label(&photo.kind),
            photo.file_name()
        ),
        Availability::Available(info) => format!(
            "[■] {} {} ({})",
            kind_label(&photo.kind),
            photo.file_name(),
            asset_summary(info)
        ),
    }
}

fn asset_summary(info: &regdesk_app::AssetInfo) -> String {
    match info.content_type.as_deref() {
        Some(content_type) => format!("{content_type}, {}", byte_size(info.size_bytes)),
        None => byte_size(info.size_bytes),
    }
}

/// Full-size photo overlay. Terminals cannot draw the image itself, so the
/// overlay names where it lives and what was retrieved.
pub fn render_lightbox_text(detail: &RequestDetail, base_url: &str) -> Option<String> {
    let photo = detail.lightbox()?;
    let url = format!("{base_url}{}", upload_path(photo.file_name()));
    let mut lines = vec![
        format!("Увеличенное фото: {}", kind_label(&photo.kind)),
        String::new(),
        url,
    ];
    match detail.availability(photo.id) {
        Availability::Available(info) => lines.push(asset_summary(info)),
        Availability::Checking => lines.push("проверка...".to_owned()),
        Availability::Broken => lines.push("изображение недоступно".to_owned()),
    }
    lines.push(String::new());
    lines.push("esc закрыть".to_owned());
    Some(lines.join("\n"))
}
