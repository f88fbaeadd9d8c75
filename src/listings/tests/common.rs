use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

pub(super) use crate::infra::{
    InMemoryImageRepository, InMemoryPlaceRepository, InMemoryReportRepository,
    InMemoryReviewRepository,
};
use crate::listings::{
    FileStorage, Identity, Image, ImageRepository, ListingKind, ListingSubmission, Place,
    PlaceKind, PlaceRepository, PlaceService, Report, ReportId, ReportRepository, RepositoryError,
    Role, UploadedFile, UserId,
};

pub(super) fn owner() -> Identity {
    Identity {
        id: UserId("owner-1".to_string()),
        role: Role::Placeowner,
    }
}

pub(super) fn student(id: &str) -> Identity {
    Identity {
        id: UserId(id.to_string()),
        role: Role::Student,
    }
}

pub(super) fn admin() -> Identity {
    Identity {
        id: UserId("admin-1".to_string()),
        role: Role::Admin,
    }
}

pub(super) fn submission() -> ListingSubmission {
    ListingSubmission {
        name: "Casa Verde Dormitory".to_string(),
        kind: PlaceKind::Dormitory,
        listing: ListingKind::Rent,
        number: "214".to_string(),
        street: "Maginhawa St".to_string(),
        subdivision: Some("Teachers Village".to_string()),
        barangay: Some("Central".to_string()),
        city: "Quezon City".to_string(),
        zip_code: Some("1101".to_string()),
        province: "Metro Manila".to_string(),
        price: "4500".to_string(),
        floors: Some("3".to_string()),
        bedrooms: Some("12".to_string()),
        bathrooms: Some("6".to_string()),
        area: None,
        description: "Quiet dorm near the university strip.".to_string(),
        coordinates: "14.6467, 121.0685".to_string(),
    }
}

pub(super) fn uploaded(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        original_name: format!("original-{filename}"),
        content_type: "image/jpeg".to_string(),
    }
}

/// Staged uploads held in memory so serve tests control which files exist.
#[derive(Default)]
pub(super) struct StaticStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl StaticStorage {
    pub(super) fn stage(&self, filename: &str, bytes: &[u8]) {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .insert(filename.to_string(), bytes.to_vec());
    }
}

impl FileStorage for StaticStorage {
    fn contains(&self, filename: &str) -> bool {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .contains_key(filename)
    }

    fn read(&self, filename: &str) -> std::io::Result<Vec<u8>> {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .get(filename)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, filename.to_string()))
    }
}

/// Image repository that refuses to persist one poisoned filename, for
/// exercising the all-or-nothing attach step. Successful inserts are logged
/// so tests can check what the rollback did to them.
#[derive(Default)]
pub(super) struct FlakyImageRepository {
    pub(super) inner: InMemoryImageRepository,
    reject_filename: String,
    inserted: Mutex<Vec<crate::listings::ImageId>>,
}

impl FlakyImageRepository {
    pub(super) fn rejecting(filename: &str) -> Self {
        Self {
            inner: InMemoryImageRepository::default(),
            reject_filename: filename.to_string(),
            inserted: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn inserted_ids(&self) -> Vec<crate::listings::ImageId> {
        self.inserted.lock().expect("flaky mutex poisoned").clone()
    }
}

impl ImageRepository for FlakyImageRepository {
    fn insert(&self, image: Image) -> Result<Image, RepositoryError> {
        if image.filename == self.reject_filename {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        let stored = self.inner.insert(image)?;
        self.inserted
            .lock()
            .expect("flaky mutex poisoned")
            .push(stored.id.clone());
        Ok(stored)
    }

    fn update(&self, image: Image) -> Result<(), RepositoryError> {
        self.inner.update(image)
    }

    fn fetch(&self, id: &crate::listings::ImageId) -> Result<Option<Image>, RepositoryError> {
        self.inner.fetch(id)
    }
}

/// Place repository that remembers inserted ids so tests can read back
/// records created under random identifiers.
#[derive(Default)]
pub(super) struct RecordingPlaceRepository {
    pub(super) inner: InMemoryPlaceRepository,
    inserted: Mutex<Vec<crate::listings::PlaceId>>,
}

impl RecordingPlaceRepository {
    pub(super) fn inserted_ids(&self) -> Vec<crate::listings::PlaceId> {
        self.inserted.lock().expect("recording mutex poisoned").clone()
    }
}

impl PlaceRepository for RecordingPlaceRepository {
    fn insert(&self, place: Place) -> Result<Place, RepositoryError> {
        let stored = self.inner.insert(place)?;
        self.inserted
            .lock()
            .expect("recording mutex poisoned")
            .push(stored.id.clone());
        Ok(stored)
    }

    fn update(&self, place: Place) -> Result<(), RepositoryError> {
        self.inner.update(place)
    }

    fn fetch(
        &self,
        id: &crate::listings::PlaceId,
    ) -> Result<Option<Place>, RepositoryError> {
        self.inner.fetch(id)
    }
}

/// Place repository whose updates can be switched off mid-test, for
/// exercising the delete saga's compensation path.
#[derive(Default)]
pub(super) struct TogglePlaceRepository {
    pub(super) inner: InMemoryPlaceRepository,
    fail_updates: AtomicBool,
}

impl TogglePlaceRepository {
    pub(super) fn fail_updates(&self) {
        self.fail_updates.store(true, Ordering::SeqCst);
    }
}

impl PlaceRepository for TogglePlaceRepository {
    fn insert(&self, place: Place) -> Result<Place, RepositoryError> {
        self.inner.insert(place)
    }

    fn update(&self, place: Place) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("write refused".to_string()));
        }
        self.inner.update(place)
    }

    fn fetch(
        &self,
        id: &crate::listings::PlaceId,
    ) -> Result<Option<Place>, RepositoryError> {
        self.inner.fetch(id)
    }
}

/// Report repository that fails updates for one designated report.
#[derive(Default)]
pub(super) struct FlakyReportRepository {
    pub(super) inner: InMemoryReportRepository,
    fail_on: Mutex<Option<ReportId>>,
}

impl FlakyReportRepository {
    pub(super) fn fail_update_of(&self, id: ReportId) {
        *self.fail_on.lock().expect("flaky mutex poisoned") = Some(id);
    }
}

impl ReportRepository for FlakyReportRepository {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        self.inner.insert(report)
    }

    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        let poisoned = self
            .fail_on
            .lock()
            .expect("flaky mutex poisoned")
            .as_ref()
            .is_some_and(|id| *id == report.id);
        if poisoned {
            return Err(RepositoryError::Unavailable("write refused".to_string()));
        }
        self.inner.update(report)
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn for_author_and_target(
        &self,
        author: &UserId,
        target: &crate::listings::PlaceId,
    ) -> Result<Option<Report>, RepositoryError> {
        self.inner.for_author_and_target(author, target)
    }

    fn open_for_place(
        &self,
        target: &crate::listings::PlaceId,
    ) -> Result<Vec<Report>, RepositoryError> {
        self.inner.open_for_place(target)
    }
}

pub(super) type MemoryPlaceService = PlaceService<
    InMemoryPlaceRepository,
    InMemoryImageRepository,
    InMemoryReviewRepository,
    InMemoryReportRepository,
    StaticStorage,
>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryPlaceService>,
    pub(super) images: Arc<InMemoryImageRepository>,
    pub(super) reports: Arc<InMemoryReportRepository>,
    pub(super) storage: Arc<StaticStorage>,
}

pub(super) fn harness() -> Harness {
    let images = Arc::new(InMemoryImageRepository::default());
    let reports = Arc::new(InMemoryReportRepository::default());
    let storage = Arc::new(StaticStorage::default());
    let service = Arc::new(PlaceService::new(
        Arc::new(InMemoryPlaceRepository::default()),
        images.clone(),
        Arc::new(InMemoryReviewRepository::default()),
        reports.clone(),
        storage.clone(),
    ));
    Harness {
        service,
        images,
        reports,
        storage,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
