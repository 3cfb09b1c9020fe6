//! Parsed multipart upload input.

use std::fmt;

use sticker_store::ByteStream;

use crate::error::{Result, ServiceError};

/// Form field that carries the sticker file.
pub const FILE_PART: &str = "file";

/// An uploaded file: its original name, declared type and streamed body.
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: ByteStream,
}

impl FilePart {
    pub fn new(filename: impl Into<String>, content: ByteStream) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            content,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// One part of a multipart form.
#[derive(Debug)]
pub enum FormPart {
    File(FilePart),
    Field(String),
}

/// A multipart form as handed over by the boundary layer.
#[derive(Debug, Default)]
pub struct UploadForm {
    parts: Vec<(String, FormPart)>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: impl Into<String>, file: FilePart) -> Self {
        self.parts.push((name.into(), FormPart::File(file)));
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push((name.into(), FormPart::Field(value.into())));
        self
    }

    /// Take the first `file` part, which must be a file.
    pub fn into_file(self) -> Result<FilePart> {
        let part = self
            .parts
            .into_iter()
            .find(|(name, _)| name == FILE_PART)
            .map(|(_, part)| part);
        match part {
            Some(FormPart::File(file)) => Ok(file),
            Some(FormPart::Field(_)) => Err(ServiceError::ClientInput(
                "invalid part of file".into(),
            )),
            None => Err(ServiceError::ClientInput(
                "no file part found in the request".into(),
            )),
        }
    }
}
