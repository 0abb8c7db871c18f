// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::{TemplateImage, TemplateUpload, UserId};

/// Picker state for granting admin rights to an existing user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantForm {
    pub selected_user: Option<UserId>,
    pub submitting: bool,
}

impl GrantForm {
    pub fn can_submit(&self) -> bool {
        self.selected_user.is_some() && !self.submitting
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateUploadForm {
    pub name: String,
    pub description: String,
    pub image: Option<TemplateImage>,
    pub submitting: bool,
}

impl TemplateUploadForm {
    pub fn can_submit(&self) -> bool {
        !self.submitting && self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("template name is required -- enter a name and retry");
        }
        if self.image.is_none() {
            bail!("template image is required -- choose a file and retry");
        }
        Ok(())
    }

    pub fn to_upload(&self) -> Result<TemplateUpload> {
        self.validate()?;
        let Some(image) = self.image.clone() else {
            bail!("template image is required -- choose a file and retry");
        };
        Ok(TemplateUpload {
            name: self.name.trim().to_owned(),
            description: self.description.trim().to_owned(),
            image,
        })
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.description.clear();
        self.image = None;
    }
}

impl TemplateImage {
    /// Reads an image from disk, deriving the MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let Some(mime_type) = image_mime_type(&extension) else {
            bail!(
                "{} is not an image -- choose a png, jpg, gif, webp, bmp or svg file",
                path.display()
            );
        };

        let data = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        if data.is_empty() {
            bail!("{} is empty -- choose a file with content and retry", path.display());
        }

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("template")
            .to_owned();
        Ok(Self {
            file_name,
            mime_type: mime_type.to_owned(),
            data,
        })
    }
}

fn image_mime_type(extension: &str) -> Option<&'static str> {
    match extension {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{GrantForm, TemplateUploadForm};
    use crate::{TemplateImage, UserId};
    use std::path::Path;

    fn image() -> TemplateImage {
        TemplateImage {
            file_name: "blue.png".to_owned(),
            mime_type: "image/png".to_owned(),
            data: vec![1, 2, 3],
        }
    }

    #[test]
    fn grant_requires_selection_and_idle_form() {
        let mut form = GrantForm::default();
        assert!(!form.can_submit());
        form.selected_user = Some(UserId::new(3));
        assert!(form.can_submit());
        form.submitting = true;
        assert!(!form.can_submit());
    }

    #[test]
    fn upload_requires_name_and_image() {
        let mut form = TemplateUploadForm {
            name: "   ".to_owned(),
            image: Some(image()),
            ..TemplateUploadForm::default()
        };
        let error = form.validate().expect_err("blank name should fail");
        assert!(error.to_string().contains("name is required"));

        form.name = "Синий".to_owned();
        form.image = None;
        let error = form.validate().expect_err("missing image should fail");
        assert!(error.to_string().contains("image is required"));

        form.image = Some(image());
        form.description = " синий кузов ".to_owned();
        let upload = form.to_upload().expect("valid form");
        assert_eq!(upload.name, "Синий");
        assert_eq!(upload.description, "синий кузов");
    }

    #[test]
    fn submitting_form_cannot_submit_again() {
        let form = TemplateUploadForm {
            name: "Синий".to_owned(),
            image: Some(image()),
            submitting: true,
            ..TemplateUploadForm::default()
        };
        assert!(!form.can_submit());
    }

    #[test]
    fn clear_resets_all_fields() {
        let mut form = TemplateUploadForm {
            name: "Синий".to_owned(),
            description: "d".to_owned(),
            image: Some(image()),
            submitting: false,
        };
        form.clear();
        assert_eq!(form, TemplateUploadForm::default());
    }

    #[test]
    fn image_from_path_rejects_non_images() {
        let error = TemplateImage::from_path(Path::new("/tmp/notes.txt"))
            .expect_err("text file should be rejected");
        assert!(error.to_string().contains("is not an image"));
    }
}
