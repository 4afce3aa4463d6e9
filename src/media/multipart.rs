use std::collections::HashMap;
use std::path::Path;

use axum::extract::Multipart;
use tracing::{debug, warn};

use super::temp::TempUpload;
use crate::error::ApiError;

/// Text fields and spooled file parts of a multipart request.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, TempUpload>,
}

impl UploadForm {
    /// Trimmed value of a text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Untrimmed value, still `None` when blank. For secrets like passwords.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<TempUpload> {
        self.files.remove(name)
    }
}

/// Drains the multipart stream. Parts carrying a file name are written to
/// `tmp_dir`; only the first file per field is kept and empty files are skipped.
pub async fn read_upload_form(mut mp: Multipart, tmp_dir: &Path) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "malformed multipart body");
                return Err(ApiError::Validation {
                    message: "Invalid multipart body".into(),
                    errors: vec![e.body_text()],
                });
            }
        };
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if field.file_name().is_some() {
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field.bytes().await.map_err(|e| ApiError::Validation {
                message: "Invalid multipart body".into(),
                errors: vec![e.body_text()],
            })?;
            if data.is_empty() || form.files.contains_key(&name) {
                continue;
            }
            let upload = TempUpload::write(tmp_dir, &data, &content_type).await?;
            debug!(field = %name, %content_type, size = data.len(), "file part spooled");
            form.files.insert(name, upload);
        } else {
            let value = field.text().await.map_err(|e| ApiError::Validation {
                message: "Invalid multipart body".into(),
                errors: vec![e.body_text()],
            })?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_counts_as_absent() {
        let mut form = UploadForm::default();
        form.fields.insert("fullname".into(), "  Jane Doe ".into());
        form.fields.insert("email".into(), "   ".into());
        assert_eq!(form.text("fullname"), Some("Jane Doe"));
        assert_eq!(form.text("email"), None);
        assert_eq!(form.text("username"), None);
    }
}
