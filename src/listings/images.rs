use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::error;

use super::domain::{Image, ImageId, PlaceId, RecordStatus};
use super::ident;
use super::repository::{ImageRepository, RepositoryError};

/// Descriptor for an upload already staged by transport middleware. The
/// bytes live under the staging directory keyed by `filename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    pub original_name: String,
    pub content_type: String,
}

/// Read access to the staged-upload directory. File garbage collection is an
/// external process; this side never deletes bytes.
pub trait FileStorage: Send + Sync {
    fn contains(&self, filename: &str) -> bool;
    fn read(&self, filename: &str) -> std::io::Result<Vec<u8>>;
}

#[derive(Debug, thiserror::Error)]
pub enum ImageStoreError {
    #[error("image record not found")]
    NotFound,
    #[error("image persistence failed: {0}")]
    Repository(#[from] RepositoryError),
}

/// Owns uploaded image records and their soft-delete lifecycle.
pub struct ImageStore<I> {
    repository: Arc<I>,
}

impl<I> ImageStore<I>
where
    I: ImageRepository + 'static,
{
    pub fn new(repository: Arc<I>) -> Self {
        Self { repository }
    }

    /// Persists one image record for a listing.
    pub fn create_for_place(
        &self,
        place: &PlaceId,
        file: &UploadedFile,
    ) -> Result<ImageId, ImageStoreError> {
        create_record(self.repository.as_ref(), place, file)
    }

    /// Persists every staged upload concurrently, returning ids in the order
    /// the files were submitted. The step is all-or-nothing: if any record
    /// fails, the records the other tasks created are soft-deleted before
    /// the error surfaces, so a partial set is never attached.
    pub async fn attach_all(
        &self,
        place: &PlaceId,
        files: &[UploadedFile],
    ) -> Result<Vec<ImageId>, ImageStoreError> {
        let mut tasks = JoinSet::new();
        for (position, file) in files.iter().cloned().enumerate() {
            let repository = Arc::clone(&self.repository);
            let place = place.clone();
            tasks.spawn(async move {
                let outcome = create_record(repository.as_ref(), &place, &file);
                (position, outcome)
            });
        }

        let mut created: Vec<Option<ImageId>> = vec![None; files.len()];
        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Ok(id))) => created[position] = Some(id),
                Ok((_, Err(err))) => failure = Some(err),
                Err(join_err) => {
                    failure = Some(ImageStoreError::Repository(RepositoryError::Unavailable(
                        join_err.to_string(),
                    )));
                }
            }
        }

        if let Some(err) = failure {
            for id in created.iter().flatten() {
                if let Err(rollback) = self.soft_delete(id) {
                    error!(image = %id.0, error = %rollback, "image rollback failed after attach failure");
                }
            }
            return Err(err);
        }

        Ok(created.into_iter().flatten().collect())
    }

    /// Marks a record deleted. Deleting an already-deleted record is a
    /// no-op; an unknown id is an error.
    pub fn soft_delete(&self, id: &ImageId) -> Result<(), ImageStoreError> {
        let mut image = self.repository.fetch(id)?.ok_or(ImageStoreError::NotFound)?;
        if !image.status.is_visible() {
            return Ok(());
        }
        image.status = RecordStatus::Deleted;
        self.repository.update(image)?;
        Ok(())
    }

    /// Looks up a record, treating deleted ones as absent. The record stays
    /// in the store for audit either way.
    pub fn fetch_visible(&self, id: &ImageId) -> Result<Option<Image>, ImageStoreError> {
        Ok(self
            .repository
            .fetch(id)?
            .filter(|image| image.status.is_visible()))
    }
}

fn create_record<I: ImageRepository>(
    repository: &I,
    place: &PlaceId,
    file: &UploadedFile,
) -> Result<ImageId, ImageStoreError> {
    let url = format!("/places/{}/images/{}", place.0, file.filename);
    let stored = ident::insert_with_retry(|id| {
        repository.insert(Image {
            id: ImageId(id),
            filename: file.filename.clone(),
            url: url.clone(),
            content_type: file.content_type.clone(),
            status: RecordStatus::Visible,
        })
    })?;
    Ok(stored.id)
}
