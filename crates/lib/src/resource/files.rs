//! The signed-in user's file collection.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};
use url::Url;

use super::{Mutation, ResourceManager};
use crate::{
    Result,
    constants::endpoints,
    http::{HttpClient, ProgressFn, UploadPayload},
    models::FileRecord,
    validation::{validate_comment, validate_file_name, validate_upload_size},
};

/// `GET /files/` answers either shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum FileListing {
    Wrapped { files: Vec<FileRecord> },
    Bare(Vec<FileRecord>),
}

impl From<FileListing> for Vec<FileRecord> {
    fn from(listing: FileListing) -> Self {
        match listing {
            FileListing::Wrapped { files } => files,
            FileListing::Bare(files) => files,
        }
    }
}

/// Uploads answer with one entity or several.
#[derive(Deserialize)]
#[serde(untagged)]
enum Uploaded {
    Many(Vec<FileRecord>),
    One(FileRecord),
}

#[derive(Deserialize)]
struct Renamed {
    original_name: Option<String>,
}

/// File operations with their collection state.
#[derive(Debug, Clone)]
pub struct Files {
    http: Arc<HttpClient>,
    state: ResourceManager<FileRecord>,
}

impl Files {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self {
            http,
            state: ResourceManager::new(),
        }
    }

    /// Collection state for rendering.
    pub fn state(&self) -> &ResourceManager<FileRecord> {
        &self.state
    }

    /// Load the signed-in user's files.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.state.list(self.fetch(endpoints::FILES.to_string())).await
    }

    /// Load another user's files into the collection (admin).
    pub async fn list_for_user(&self, user_id: u64) -> Result<Vec<FileRecord>> {
        self.state
            .list(self.fetch(endpoints::files_of_user(user_id)))
            .await
    }

    async fn fetch(&self, path: String) -> Result<Vec<FileRecord>> {
        let listing: FileListing = self.http.get(path).json_response().await?;
        Ok(listing.into())
    }

    /// Upload a file, appending the created entities on success.
    pub async fn upload(
        &self,
        payload: UploadPayload,
        on_progress: Option<ProgressFn>,
    ) -> Result<Vec<FileRecord>> {
        validate_file_name(payload.file_name())?;
        validate_upload_size(payload.len())?;
        validate_comment(payload.comment())?;

        info!(name = payload.file_name(), size = payload.len(), "uploading");
        let http = Arc::clone(&self.http);
        self.state
            .create(on_progress, |report| async move {
                let uploaded: Uploaded = http
                    .post(endpoints::FILE_UPLOAD)
                    .upload(payload)
                    .on_progress(report)
                    .json_response()
                    .await?;
                Ok(match uploaded {
                    Uploaded::Many(files) => files,
                    Uploaded::One(file) => vec![file],
                })
            })
            .await
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        self.state
            .mutate(id, async {
                self.http.delete(endpoints::file(id)).send().await?;
                debug!(id, "file deleted");
                Ok(Mutation::Remove)
            })
            .await
    }

    pub async fn rename(&self, id: u64, name: &str) -> Result<()> {
        validate_file_name(name)?;
        let requested = name.to_string();
        self.state
            .mutate(id, async {
                let renamed: Option<Renamed> = self
                    .http
                    .patch(endpoints::file_rename(id))
                    .json(json!({ "name": requested }))
                    .json_response()
                    .await?;
                let name = renamed
                    .and_then(|r| r.original_name)
                    .unwrap_or(requested);
                Ok(Mutation::Patch(Box::new(move |file: &mut FileRecord| {
                    file.original_name = name;
                })))
            })
            .await
    }

    pub async fn update_comment(&self, id: u64, comment: &str) -> Result<()> {
        validate_comment(comment)?;
        let requested = comment.to_string();
        self.state
            .mutate(id, async {
                let body: Value = self
                    .http
                    .patch(endpoints::file_comment(id))
                    .json(json!({ "comment": requested }))
                    .json_response()
                    .await?;
                Ok(match serde_json::from_value::<FileRecord>(body) {
                    Ok(file) if file.id == id => Mutation::Replace(file),
                    _ => Mutation::Patch(Box::new(move |file: &mut FileRecord| {
                        file.comment = requested;
                    })),
                })
            })
            .await
    }

    /// Fetch a file's contents.
    pub async fn download(&self, id: u64) -> Result<Vec<u8>> {
        let payload = self
            .http
            .get(endpoints::file_download(id))
            .blob()
            .timeout(self.http.config().upload_timeout())
            .send()
            .await?;
        Ok(payload.into_bytes())
    }

    /// Anonymous download URL for a file with a public link.
    pub fn public_url(&self, file: &FileRecord) -> Result<Option<Url>> {
        match file.public_link.as_deref().filter(|l| !l.is_empty()) {
            Some(link) => Ok(Some(
                self.http.config().endpoint(&endpoints::public_download(link))?,
            )),
            None => Ok(None),
        }
    }

    /// Forget the collection, e.g. after logout.
    pub fn reset(&self) {
        self.state.reset();
    }
}
