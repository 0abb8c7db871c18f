// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;

/// Signed user payload produced by the Telegram login widget. The backend
/// verifies `hash`; this side only forwards it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramAuthPayload {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub auth_date: i64,
    pub hash: String,
}

impl TelegramAuthPayload {
    /// Accepts the widget's JSON object, its redirect query string, or the
    /// full redirect URL.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("login payload is empty -- paste the Telegram widget data and retry");
        }

        if trimmed.starts_with('{') {
            let payload: Self =
                serde_json::from_str(trimmed).context("decode Telegram login JSON")?;
            return payload.validated();
        }

        let query = if trimmed.contains("://") {
            let url = Url::parse(trimmed).context("parse Telegram redirect URL")?;
            url.query()
                .ok_or_else(|| anyhow!("redirect URL has no query string"))?
                .to_owned()
        } else {
            trimmed.trim_start_matches('?').to_owned()
        };
        Self::from_query(&query)?.validated()
    }

    fn from_query(query: &str) -> Result<Self> {
        let mut id = None;
        let mut auth_date = None;
        let mut hash = None;
        let mut payload = Self {
            id: 0,
            first_name: None,
            last_name: None,
            username: None,
            photo_url: None,
            auth_date: 0,
            hash: String::new(),
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "id" => {
                    id = Some(
                        value
                            .parse::<i64>()
                            .with_context(|| format!("invalid Telegram id {value:?}"))?,
                    );
                }
                "auth_date" => {
                    auth_date = Some(
                        value
                            .parse::<i64>()
                            .with_context(|| format!("invalid auth_date {value:?}"))?,
                    );
                }
                "hash" => hash = Some(value.into_owned()),
                "first_name" => payload.first_name = Some(value.into_owned()),
                "last_name" => payload.last_name = Some(value.into_owned()),
                "username" => payload.username = Some(value.into_owned()),
                "photo_url" => payload.photo_url = Some(value.into_owned()),
                _ => {}
            }
        }

        payload.id = id.ok_or_else(|| anyhow!("login payload is missing `id`"))?;
        payload.auth_date =
            auth_date.ok_or_else(|| anyhow!("login payload is missing `auth_date`"))?;
        payload.hash = hash.ok_or_else(|| anyhow!("login payload is missing `hash`"))?;
        Ok(payload)
    }

    fn validated(self) -> Result<Self> {
        if self.id <= 0 {
            bail!("login payload id must be positive");
        }
        if self.hash.trim().is_empty() {
            bail!("login payload hash is empty");
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::TelegramAuthPayload;
    use anyhow::Result;

    #[test]
    fn parses_widget_json() -> Result<()> {
        let payload = TelegramAuthPayload::parse(
            r#"{"id":42,"first_name":"Иван","username":"ivan","auth_date":1700000000,"hash":"abc"}"#,
        )?;
        assert_eq!(payload.id, 42);
        assert_eq!(payload.username.as_deref(), Some("ivan"));
        assert_eq!(payload.last_name, None);
        Ok(())
    }

    #[test]
    fn parses_redirect_url_and_bare_query() -> Result<()> {
        let from_url = TelegramAuthPayload::parse(
            "https://admin.example/login?id=42&first_name=%D0%98%D0%B2%D0%B0%D0%BD&auth_date=1700000000&hash=abc",
        )?;
        assert_eq!(from_url.first_name.as_deref(), Some("Иван"));

        let from_query = TelegramAuthPayload::parse("?id=42&auth_date=1700000000&hash=abc")?;
        assert_eq!(from_query.id, 42);
        assert_eq!(from_query.hash, "abc");
        Ok(())
    }

    #[test]
    fn rejects_missing_fields() {
        let error = TelegramAuthPayload::parse("id=42&auth_date=1")
            .expect_err("missing hash should fail");
        assert!(error.to_string().contains("hash"));

        assert!(TelegramAuthPayload::parse("   ").is_err());
        assert!(TelegramAuthPayload::parse(r#"{"id":0,"auth_date":1,"hash":"x"}"#).is_err());
    }

    #[test]
    fn serializes_without_absent_optionals() -> Result<()> {
        let payload = TelegramAuthPayload::parse("id=5&auth_date=9&hash=h")?;
        let json = serde_json::to_string(&payload)?;
        assert_eq!(json, r#"{"id":5,"auth_date":9,"hash":"h"}"#);
        Ok(())
    }
}
