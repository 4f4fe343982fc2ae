//! Buffers a multipart body into named text fields and files.

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// Parts with a file name are files; everything else is read as text.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
        {
            let Some(name) = field.name().map(String::from) else {
                continue;
            };
            let file_name = field.file_name().map(String::from);
            let content_type = field.content_type().map(String::from);

            match file_name {
                Some(file_name) => {
                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
                    form.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data,
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("failed to read {name}: {e}")))?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name).filter(|f| !f.data.is_empty())
    }

    /// A non-blank text field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}
