use serde::Deserialize;

use crate::errors::AppError;
use crate::models::attachment::AttachmentKind;

pub const MAX_FILES: usize = 5;
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;
/// Cap on one text part of the create form and on the JSON body of an update.
pub const MAX_TEXT_BYTES: usize = 2 * 1024 * 1024;

/// Body of `PUT /posts/{id}`; the same three fields arrive as multipart text
/// parts on create. Every field is optional here so a missing one becomes a
/// 400 with our own message instead of a serde rejection.
#[derive(Debug, Default, Deserialize)]
pub struct PostFieldsIn {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

/// Validated title/description/content.
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub description: String,
    pub content: String,
}

impl PostFieldsIn {
    pub fn validate(self) -> Result<PostFields, AppError> {
        fn required(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        match (required(self.title), required(self.description), required(self.content)) {
            (Some(title), Some(description), Some(content)) => Ok(PostFields {
                title,
                description,
                content,
            }),
            _ => Err(AppError::Validation(
                "title, description and content are required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Kind of the file, or `PayloadRejected` for anything outside
    /// image/video/pdf or above the size cap.
    pub fn check(&self) -> Result<AttachmentKind, AppError> {
        let name = self.file_name.as_deref().unwrap_or("file");
        if self.bytes.len() > MAX_FILE_BYTES {
            return Err(AppError::PayloadRejected(format!(
                "{} exceeds the {} MB limit",
                name,
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        AttachmentKind::from_mime(&self.content_type).ok_or_else(|| {
            AppError::PayloadRejected(format!(
                "{} has unsupported type {}; only images, videos and PDFs are allowed",
                name, self.content_type
            ))
        })
    }
}

/// Everything the orchestrator needs to create one post.
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub fields: PostFields,
    pub files: Vec<UploadedFile>,
}

impl CreatePostInput {
    /// Runs every check that must pass before the database is touched.
    pub fn new(fields: PostFieldsIn, files: Vec<UploadedFile>) -> Result<Self, AppError> {
        let fields = fields.validate()?;
        if files.len() > MAX_FILES {
            return Err(AppError::PayloadRejected(format!(
                "at most {} files may be attached",
                MAX_FILES
            )));
        }
        for file in &files {
            file.check()?;
        }
        Ok(Self { fields, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> PostFieldsIn {
        PostFieldsIn {
            title: Some("Hello".into()),
            description: Some("first".into()),
            content: Some("body".into()),
        }
    }

    fn file(content_type: &str, len: usize) -> UploadedFile {
        UploadedFile {
            file_name: Some("upload.bin".into()),
            content_type: content_type.into(),
            bytes: vec![0u8; len],
        }
    }

    #[test]
    fn missing_or_blank_fields_are_validation_errors() {
        let mut missing = fields();
        missing.content = None;
        assert!(matches!(missing.validate(), Err(AppError::Validation(_))));

        let mut blank = fields();
        blank.title = Some("   ".into());
        assert!(matches!(blank.validate(), Err(AppError::Validation(_))));

        assert!(matches!(PostFieldsIn::default().validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn accepts_up_to_five_supported_files() {
        let files = vec![
            file("image/png", 10),
            file("video/mp4", 10),
            file("application/pdf", 10),
            file("image/jpeg", MAX_FILE_BYTES),
            file("image/gif", 0),
        ];
        let input = CreatePostInput::new(fields(), files).unwrap();
        assert_eq!(input.files.len(), 5);
        assert_eq!(input.fields.title, "Hello");
    }

    #[test]
    fn rejects_sixth_file() {
        let files = (0..6).map(|_| file("image/png", 1)).collect();
        assert!(matches!(
            CreatePostInput::new(fields(), files),
            Err(AppError::PayloadRejected(_))
        ));
    }

    #[test]
    fn rejects_oversize_and_unsupported_files() {
        assert!(matches!(
            CreatePostInput::new(fields(), vec![file("image/png", MAX_FILE_BYTES + 1)]),
            Err(AppError::PayloadRejected(_))
        ));
        assert!(matches!(
            CreatePostInput::new(fields(), vec![file("application/zip", 1)]),
            Err(AppError::PayloadRejected(_))
        ));
    }

    #[test]
    fn field_errors_win_over_file_errors() {
        let mut missing = fields();
        missing.description = None;
        assert!(matches!(
            CreatePostInput::new(missing, vec![file("text/plain", 1)]),
            Err(AppError::Validation(_))
        ));
    }
}
