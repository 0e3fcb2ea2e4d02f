//! Request bodies.
//!
//! Bodies are built once and kept behind cheap clones so a request can be
//! re-sent after a token refresh without re-reading its source.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use futures_util::stream;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::errors::HttpError;

/// Upload progress callback, called with a percentage in `0..=100`.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// A file to send as `multipart/form-data`.
#[derive(Clone)]
pub struct UploadPayload {
    pub(crate) file_name: String,
    pub(crate) data: Arc<Vec<u8>>,
    pub(crate) comment: String,
}

impl UploadPayload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: Arc::new(data.into()),
            comment: String::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Guessed from the file extension, `application/octet-stream` otherwise.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Build the multipart form, streaming the file in `chunk_size` slices
    /// and reporting progress as each slice is handed to the transport.
    ///
    /// Streaming never reports 100; completion is reported once the server
    /// has answered, so a re-sent upload does not sit at 100 while it runs.
    pub(crate) fn to_form(
        &self,
        chunk_size: usize,
        progress: Option<ProgressFn>,
    ) -> Result<Form, HttpError> {
        let total = self.data.len();
        let data = Arc::clone(&self.data);
        let chunk_size = chunk_size.max(1);
        let reported = Arc::new(AtomicU8::new(0));

        let chunks = stream::iter((0..total).step_by(chunk_size).map(move |start| {
            let end = (start + chunk_size).min(total);
            if let Some(progress) = &progress {
                let percent = sent_percent(end, total);
                // Only ever report forward movement.
                if reported.fetch_max(percent, Ordering::Relaxed) < percent {
                    progress(percent);
                }
            }
            Ok::<_, std::io::Error>(data[start..end].to_vec())
        }));

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), total as u64)
            .file_name(self.file_name.clone())
            .mime_str(&self.mime_type())
            .map_err(|e| HttpError::Network {
                reason: format!("invalid upload part: {e}"),
            })?;

        let mut form = Form::new().part("file", part);
        if !self.comment.is_empty() {
            form = form.text("comment", self.comment.clone());
        }
        Ok(form)
    }
}

/// Share of `total` bytes handed over once `sent` are out, capped at 99.
fn sent_percent(sent: usize, total: usize) -> u8 {
    ((sent * 100 / total).min(99)) as u8
}

impl fmt::Debug for UploadPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadPayload")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .field("comment", &self.comment)
            .finish()
    }
}

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    None,
    Json(Value),
    Upload(UploadPayload),
}
