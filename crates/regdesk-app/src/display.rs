// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

use crate::{RequestStatus, TemplateId, UserId};

pub const DASH: &str = "—";
pub const NOT_AVAILABLE: &str = "Н/Д";

pub fn status_label(status: Option<&RequestStatus>) -> String {
    match status {
        Some(RequestStatus::Submitted) => "Отправлена".to_owned(),
        Some(RequestStatus::Approved) => "Одобрена".to_owned(),
        Some(RequestStatus::Rejected) => "Отклонена".to_owned(),
        Some(RequestStatus::Pending) => "Ожидает".to_owned(),
        Some(RequestStatus::Draft) => "Черновик".to_owned(),
        Some(RequestStatus::Other(raw)) if !raw.is_empty() => raw.clone(),
        Some(RequestStatus::Other(_)) | None => DASH.to_owned(),
    }
}

/// Three-way rendering of nullable flags: `Да`, `Нет`, or a dash for unknown.
pub fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "Да",
        Some(false) => "Нет",
        None => DASH,
    }
}

pub fn flag_badge(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "✅ Да",
        Some(false) => "❌ Нет",
        None => NOT_AVAILABLE,
    }
}

pub fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_owned(),
        _ => DASH.to_owned(),
    }
}

pub fn or_not_available(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.trim().is_empty() => text.to_owned(),
        _ => NOT_AVAILABLE.to_owned(),
    }
}

pub fn year_label(year: Option<i32>) -> String {
    match year {
        Some(year) if year != 0 => year.to_string(),
        _ => DASH.to_owned(),
    }
}

pub fn template_ref(id: Option<TemplateId>) -> String {
    match id {
        Some(id) if id.get() != 0 => format!("#{id}"),
        _ => DASH.to_owned(),
    }
}

/// `@name` regardless of whether the backend stored the leading `@`.
pub fn telegram_handle(username: &str) -> String {
    if username.starts_with('@') {
        username.to_owned()
    } else {
        format!("@{username}")
    }
}

pub fn telegram_link(username: &str) -> String {
    format!("https://t.me/{}", username.trim_start_matches('@'))
}

/// Request owner cell: the numeric id, followed by the handle and its
/// `t.me` link when known.
pub fn request_owner(user_id: UserId, username: Option<&str>) -> String {
    match username {
        Some(name) if !name.is_empty() => format!(
            "{user_id} ({}) {}",
            telegram_handle(name),
            telegram_link(name)
        ),
        _ => user_id.to_string(),
    }
}

/// Option label used by the admin-grant selector.
pub fn grant_option_label(
    first_name: Option<&str>,
    last_name: Option<&str>,
    username: Option<&str>,
    tg_id: i64,
) -> String {
    let handle = match username {
        Some(name) if !name.is_empty() => format!("(@{})", name.trim_start_matches('@')),
        _ => String::new(),
    };
    format!(
        "{} {} {} — TG: {tg_id}",
        first_name.unwrap_or(""),
        last_name.unwrap_or(""),
        handle
    )
}

pub fn full_name(first_name: Option<&str>, last_name: Option<&str>) -> String {
    [first_name, last_name]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Backend-relative path of an uploaded photo.
pub fn upload_path(file_name: &str) -> String {
    format!("/api/uploads/{file_name}")
}

pub fn template_preview_path(id: TemplateId) -> String {
    format!("/api/templates/{id}/preview")
}

pub fn byte_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    match bytes {
        0..KIB => format!("{bytes} Б"),
        KIB..MIB => format!("{:.1} КБ", bytes as f64 / KIB as f64),
        _ => format!("{:.1} МБ", bytes as f64 / MIB as f64),
    }
}

/// `dd.mm.yyyy`; unparseable input is shown as received.
pub fn short_date(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|raw| !raw.trim().is_empty()) else {
        return DASH.to_owned();
    };
    match parse_timestamp(raw) {
        Some(timestamp) => {
            let date = timestamp.date();
            format!(
                "{:02}.{:02}.{}",
                date.day(),
                u8::from(date.month()),
                date.year()
            )
        }
        None => raw.to_owned(),
    }
}

/// `1 мар. 2025 г., 10:05`, or `Н/Д` when missing.
pub fn long_date(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|raw| !raw.trim().is_empty()) else {
        return NOT_AVAILABLE.to_owned();
    };
    match parse_timestamp(raw) {
        Some(timestamp) => format!(
            "{} {} {} г., {:02}:{:02}",
            timestamp.day(),
            short_month(timestamp.month()),
            timestamp.year(),
            timestamp.hour(),
            timestamp.minute()
        ),
        None => raw.to_owned(),
    }
}

/// Backend timestamps are naive ISO-8601; offsets are accepted and dropped.
pub fn parse_timestamp(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    if let Ok(parsed) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(PrimitiveDateTime::new(parsed.date(), parsed.time()));
    }

    let normalized = raw.replacen(' ', "T", 1);
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    if let Ok(parsed) = PrimitiveDateTime::parse(&normalized, naive) {
        return Some(parsed);
    }
    let minutes = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    if let Ok(parsed) = PrimitiveDateTime::parse(&normalized, minutes) {
        return Some(parsed);
    }

    let date_only = format_description!("[year]-[month]-[day]");
    Date::parse(raw, date_only)
        .ok()
        .map(|date| date.midnight())
}

const fn short_month(month: Month) -> &'static str {
    match month {
        Month::January => "янв.",
        Month::February => "февр.",
        Month::March => "мар.",
        Month::April => "апр.",
        Month::May => "мая",
        Month::June => "июн.",
        Month::July => "июл.",
        Month::August => "авг.",
        Month::September => "сент.",
        Month::October => "окт.",
        Month::November => "нояб.",
        Month::December => "дек.",
    }
}
