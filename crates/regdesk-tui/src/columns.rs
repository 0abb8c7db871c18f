// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use regdesk_app::display::{
    or_dash, request_owner, short_date, status_label, template_preview_path, template_ref,
    year_label, yes_no,
};
use regdesk_app::{Admin, Request, Template, TemplateId, User};

use crate::list::{Column, ColumnAction, FieldValue, ListRow};

impl ListRow for User {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "id" => FieldValue::Integer(self.id.get()),
            "tg_id" => FieldValue::Integer(self.tg_id),
            "username" => FieldValue::text(self.username.as_deref()),
            "first_name" => FieldValue::text(self.first_name.as_deref()),
            "last_name" => FieldValue::text(self.last_name.as_deref()),
            "created_at" => FieldValue::text(self.created_at.as_deref()),
            "last_seen" => FieldValue::text(self.last_seen.as_deref()),
            _ => FieldValue::Missing,
        }
    }
}

impl ListRow for Admin {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "id" => FieldValue::Integer(self.id.get()),
            "tg_id" => FieldValue::integer(self.tg_id),
            "username" => FieldValue::text(self.username.as_deref()),
            "first_name" => FieldValue::text(self.first_name.as_deref()),
            "last_name" => FieldValue::text(self.last_name.as_deref()),
            "added_at" => FieldValue::text(self.added_at.as_deref()),
            "added_by" => FieldValue::integer(self.added_by),
            _ => FieldValue::Missing,
        }
    }
}

impl ListRow for Request {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "id" => FieldValue::Integer(self.id.get()),
            "user_id" => FieldValue::Integer(self.user_id.get()),
            "category" => FieldValue::text(self.category.as_deref()),
            "status" => FieldValue::text(self.status.as_ref().map(|status| status.as_str())),
            "has_brand" => FieldValue::flag(self.has_brand),
            "year" => FieldValue::integer(self.year.map(i64::from)),
            "has_license" => FieldValue::flag(self.has_license),
            "selected_template_id" => {
                FieldValue::integer(self.selected_template_id.map(TemplateId::get))
            }
            "created_at" => FieldValue::text(self.created_at.as_deref()),
            _ => FieldValue::Missing,
        }
    }
}

impl ListRow for Template {
    fn row_id(&self) -> i64 {
        self.id.get()
    }

    fn field(&self, key: &str) -> FieldValue<'_> {
        match key {
            "id" => FieldValue::Integer(self.id.get()),
            "name" => FieldValue::Text(&self.name),
            "description" => FieldValue::text(self.description.as_deref()),
            "created_at" => FieldValue::text(self.created_at.as_deref()),
            _ => FieldValue::Missing,
        }
    }
}

pub fn user_columns() -> Vec<Column<User>> {
    vec![
        Column::plain("ID", "id"),
        Column::plain("Telegram ID", "tg_id"),
        Column::plain("Username", "username"),
        Column::plain("First Name", "first_name"),
        Column::plain("Last Name", "last_name"),
        Column::plain("Created At", "created_at"),
        Column::plain("Last Seen", "last_seen"),
    ]
}

pub fn admin_columns() -> Vec<Column<Admin>> {
    vec![
        Column::plain("ID", "id"),
        Column::plain("Telegram ID", "tg_id"),
        Column::plain("Username", "username"),
        Column::plain("First Name", "first_name"),
        Column::plain("Last Name", "last_name"),
        Column::plain("Added At", "added_at"),
        Column::plain("Added By", "added_by"),
    ]
}

pub fn request_columns() -> Vec<Column<Request>> {
    vec![
        Column::plain("ID", "id"),
        Column::rendered("ID пользователя", "user_id", |_, request: &Request| {
            request_owner(request.user_id, request.username.as_deref())
        }),
        Column::plain("Категория", "category"),
        Column::rendered("Статус", "status", |_, request: &Request| {
            status_label(request.status.as_ref())
        }),
        Column::rendered("Бренд", "has_brand", |value, _| {
            yes_no(value.as_flag()).to_owned()
        }),
        Column::rendered("Год", "year", |value, _| {
            year_label(value.as_integer().and_then(|year| i32::try_from(year).ok()))
        }),
        Column::rendered("Лицензия", "has_license", |value, _| {
            yes_no(value.as_flag()).to_owned()
        }),
        Column::rendered("Макет", "selected_template_id", |_, request: &Request| {
            template_ref(request.selected_template_id)
        }),
        Column::rendered("Дата создания", "created_at", |value, _| {
            short_date(value.as_str())
        }),
    ]
}

/// Template catalog columns. Preview cells show the absolute preview URL
/// under `base_url`.
pub fn template_columns(base_url: &str) -> Vec<Column<Template>> {
    let base_url = base_url.to_owned();
    vec![
        Column::plain("ID", "id"),
        Column::plain("Название", "name"),
        Column::rendered("Описание", "description", |value, _| {
            or_dash(value.as_str())
        }),
        Column::rendered("Предпросмотр", "preview", move |_, template: &Template| {
            format!("{base_url}{}", template_preview_path(template.id))
        }),
        Column::action(
            "Действия",
            "actions",
            |_, _| "Удалить".to_owned(),
            ColumnAction::DeleteTemplate,
        ),
    ]
}

/// Placeholder shown by the grant selector when nobody is picked.
pub const GRANT_PLACEHOLDER: &str = "Выберите пользователя";
