//! Listing lifecycle and moderation: places and their images, student
//! reviews, and reports against listings.

pub mod domain;
pub mod ident;
pub mod images;
pub mod intake;
pub mod repository;
pub mod reports;
pub mod reviews;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    Address, Coordinates, Identity, Image, ImageId, ListingKind, Place, PlaceId, PlaceKind,
    PlaceView, RecordStatus, Report, ReportId, ReportKind, ReportStatus, Review, ReviewId,
    ReviewView, Role, UserId,
};
pub use images::{FileStorage, ImageStore, ImageStoreError, UploadedFile};
pub use intake::{ListingDraft, ListingIntakeError, ListingSubmission, MAX_LISTING_IMAGES};
pub use repository::{
    ImageRepository, PlaceRepository, ReportRepository, RepositoryError, ReviewRepository,
};
pub use reports::{ReportError, ReportService};
pub use reviews::{average_stars, ReviewError, ReviewService};
pub use router::listing_router;
pub use service::{PlaceError, PlaceService, ServedImage};
