use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{
    Identity, ImageId, Place, PlaceId, PlaceView, RecordStatus, Report, ReportKind, Review,
    ReviewId, Role,
};
use super::ident;
use super::images::{FileStorage, ImageStore, ImageStoreError, UploadedFile};
use super::intake::{self, ListingIntakeError, ListingSubmission};
use super::repository::{
    ImageRepository, PlaceRepository, RepositoryError, ReportRepository, ReviewRepository,
};
use super::reports::{ReportError, ReportService};
use super::reviews::{ReviewError, ReviewService};

#[derive(Debug, thiserror::Error)]
pub enum PlaceError {
    #[error(transparent)]
    Intake(#[from] ListingIntakeError),
    #[error("forbidden")]
    Forbidden,
    #[error("place not found")]
    NotFound,
    #[error(transparent)]
    Images(#[from] ImageStoreError),
    #[error(transparent)]
    Reports(#[from] ReportError),
    #[error("file storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Bytes and content type of a served image file.
#[derive(Debug, Clone)]
pub struct ServedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Lifecycle controller orchestrating listing creation, soft-deletion,
/// authorization checks, and the moderation cascades across the image,
/// review, and report subsystems.
pub struct PlaceService<P, I, V, T, S> {
    places: Arc<P>,
    images: ImageStore<I>,
    reviews: ReviewService<V>,
    reports: ReportService<T>,
    storage: Arc<S>,
}

impl<P, I, V, T, S> PlaceService<P, I, V, T, S>
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    pub fn new(
        places: Arc<P>,
        images: Arc<I>,
        reviews: Arc<V>,
        reports: Arc<T>,
        storage: Arc<S>,
    ) -> Self {
        Self {
            places,
            images: ImageStore::new(images),
            reviews: ReviewService::new(reviews),
            reports: ReportService::new(reports),
            storage,
        }
    }

    /// Creates a listing from a validated submission and attaches the
    /// staged uploads. The place row is committed before attachment is
    /// attempted, so a failed attach leaves a listed place with no images
    /// rather than rolling the listing back.
    pub async fn create_place(
        &self,
        requester: &Identity,
        submission: ListingSubmission,
        files: &[UploadedFile],
    ) -> Result<Place, PlaceError> {
        if requester.role != Role::Placeowner {
            return Err(PlaceError::Forbidden);
        }
        intake::validate_image_count(files.len())?;
        let draft = intake::validate(submission)?;

        let mut place = ident::insert_with_retry(|id| {
            self.places.insert(Place {
                id: PlaceId(id),
                owner: requester.id.clone(),
                name: draft.name.clone(),
                kind: draft.kind,
                status: RecordStatus::Visible,
                address: draft.address.clone(),
                price: draft.price,
                listing: draft.listing,
                floors: draft.floors,
                bedrooms: draft.bedrooms,
                bathrooms: draft.bathrooms,
                area: draft.area,
                description: draft.description.clone(),
                coordinates: draft.coordinates,
                images: Vec::new(),
                created_at: Utc::now(),
                updated_at: None,
            })
        })?;

        if !files.is_empty() {
            place.images = self.images.attach_all(&place.id, files).await?;
            self.places.update(place.clone())?;
        }

        info!(place = %place.id.0, owner = %place.owner.0, images = place.images.len(), "listing created");
        Ok(place)
    }

    /// Detail view of a visible place with all derived fields computed.
    pub fn get_place(&self, id: &PlaceId) -> Result<PlaceView, PlaceError> {
        let place = self.fetch_visible(id)?;
        let reviews = self.reviews.visible_for_place(id)?;
        Ok(place.view(&reviews))
    }

    /// Soft-deletes a listing and resolves its open reports as one saga:
    /// reports resolve first, and if the place write then fails they are
    /// reopened so the cascade never half completes.
    pub fn delete_place(&self, requester: &Identity, id: &PlaceId) -> Result<(), PlaceError> {
        let mut place = self.fetch_visible(id)?;
        if place.owner != requester.id && requester.role != Role::Admin {
            return Err(PlaceError::Forbidden);
        }

        let resolved = self.reports.resolve_open_for(id)?;

        place.status = RecordStatus::Deleted;
        place.updated_at = Some(Utc::now());
        if let Err(err) = self.places.update(place) {
            self.reports.reopen(&resolved);
            return Err(err.into());
        }

        info!(place = %id.0, reports_resolved = resolved.len(), "listing soft-deleted");
        Ok(())
    }

    /// Drops an image reference from the listing's collection. The image
    /// record keeps its own status; record removal is a separate path.
    pub fn remove_place_image(
        &self,
        requester: &Identity,
        place_id: &PlaceId,
        image_id: &ImageId,
    ) -> Result<(), PlaceError> {
        let mut place = self.fetch_visible(place_id)?;
        if place.owner != requester.id {
            return Err(PlaceError::Forbidden);
        }
        if !place.images.contains(image_id) {
            return Err(PlaceError::NotFound);
        }
        place.images.retain(|id| id != image_id);
        place.updated_at = Some(Utc::now());
        self.places.update(place)?;
        Ok(())
    }

    /// Soft-deletes an image record and drops its reference from the place
    /// in one step. Owner only.
    pub fn delete_place_image(
        &self,
        requester: &Identity,
        place_id: &PlaceId,
        image_id: &ImageId,
    ) -> Result<(), PlaceError> {
        self.remove_place_image(requester, place_id, image_id)?;
        self.images.soft_delete(image_id)?;
        Ok(())
    }

    /// Bytes and content type for a visible image on the place. A record
    /// whose backing file has gone missing is a deletion discovered late:
    /// the record is soft-deleted, the reference dropped, and the lookup
    /// reports not found.
    pub fn serve_image_file(
        &self,
        place_id: &PlaceId,
        filename: &str,
    ) -> Result<ServedImage, PlaceError> {
        let mut place = self
            .places
            .fetch(place_id)?
            .ok_or(PlaceError::NotFound)?;

        let mut matched = None;
        for id in &place.images {
            if let Some(image) = self.images.fetch_visible(id)? {
                if image.filename == filename {
                    matched = Some(image);
                    break;
                }
            }
        }
        let image = matched.ok_or(PlaceError::NotFound)?;

        if !self.storage.contains(&image.filename) {
            self.images.soft_delete(&image.id)?;
            place.images.retain(|id| *id != image.id);
            place.updated_at = Some(Utc::now());
            self.places.update(place)?;
            info!(image = %image.id.0, filename = %filename, "image file missing from storage, record retired");
            return Err(PlaceError::NotFound);
        }

        let bytes = self.storage.read(&image.filename)?;
        Ok(ServedImage {
            bytes,
            content_type: image.content_type,
        })
    }

    /// Students leave at most one visible review per place.
    pub fn submit_review(
        &self,
        requester: &Identity,
        place: &PlaceId,
        rating: Option<u8>,
        comment: &str,
    ) -> Result<Review, ReviewError> {
        if requester.role != Role::Student {
            return Err(ReviewError::Forbidden);
        }
        self.reviews.submit(place, &requester.id, rating, comment)
    }

    /// Only the author may retire a review; everyone else sees not found.
    pub fn delete_review(&self, requester: &Identity, review: &ReviewId) -> Result<(), ReviewError> {
        self.reviews.delete_own(review, &requester.id)
    }

    /// Any authenticated user may report a place, once.
    pub fn file_report(
        &self,
        requester: &Identity,
        place: &PlaceId,
        kind: ReportKind,
        comment: &str,
    ) -> Result<Report, ReportError> {
        self.reports.file(&requester.id, place, kind, comment)
    }

    fn fetch_visible(&self, id: &PlaceId) -> Result<Place, PlaceError> {
        self.places
            .fetch(id)?
            .filter(|place| place.status.is_visible())
            .ok_or(PlaceError::NotFound)
    }
}
