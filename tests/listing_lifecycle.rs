use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dormlist::listings::{
    FileStorage, Identity, Image, ImageId, ImageRepository, ListingKind, ListingSubmission, Place,
    PlaceError, PlaceId, PlaceKind, PlaceRepository, PlaceService, RecordStatus, Report, ReportId,
    ReportKind, ReportRepository, ReportStatus, RepositoryError, Review, ReviewError, ReviewId,
    ReviewRepository, Role, UploadedFile, UserId,
};

struct MemoryStore<K, V> {
    records: Mutex<HashMap<K, V>>,
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: std::hash::Hash + Eq + Clone, V: Clone> MemoryStore<K, V> {
    fn insert_new(&self, key: K, value: V) -> Result<V, RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if guard.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(key, value.clone());
        Ok(value)
    }

    fn replace(&self, key: K, value: V) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("store mutex poisoned");
        if !guard.contains_key(&key) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &K) -> Option<V> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .get(key)
            .cloned()
    }

    fn scan<F: FnMut(&V) -> bool>(&self, mut keep: F) -> Vec<V> {
        self.records
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|value| keep(value))
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct Places(MemoryStore<PlaceId, Place>);

impl PlaceRepository for Places {
    fn insert(&self, place: Place) -> Result<Place, RepositoryError> {
        self.0.insert_new(place.id.clone(), place)
    }
    fn update(&self, place: Place) -> Result<(), RepositoryError> {
        self.0.replace(place.id.clone(), place)
    }
    fn fetch(&self, id: &PlaceId) -> Result<Option<Place>, RepositoryError> {
        Ok(self.0.get(id))
    }
}

#[derive(Default)]
struct Images(MemoryStore<ImageId, Image>);

impl ImageRepository for Images {
    fn insert(&self, image: Image) -> Result<Image, RepositoryError> {
        self.0.insert_new(image.id.clone(), image)
    }
    fn update(&self, image: Image) -> Result<(), RepositoryError> {
        self.0.replace(image.id.clone(), image)
    }
    fn fetch(&self, id: &ImageId) -> Result<Option<Image>, RepositoryError> {
        Ok(self.0.get(id))
    }
}

#[derive(Default)]
struct Reviews(MemoryStore<ReviewId, Review>);

impl ReviewRepository for Reviews {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let duplicate = review.status.is_visible()
            && !self
                .0
                .scan(|existing| {
                    existing.place == review.place
                        && existing.author == review.author
                        && existing.status.is_visible()
                })
                .is_empty();
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        self.0.insert_new(review.id.clone(), review)
    }
    fn update(&self, review: Review) -> Result<(), RepositoryError> {
        self.0.replace(review.id.clone(), review)
    }
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Ok(self.0.get(id))
    }
    fn visible_for_place(&self, place: &PlaceId) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .0
            .scan(|review| review.place == *place && review.status.is_visible()))
    }
    fn visible_by_author(
        &self,
        place: &PlaceId,
        author: &UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        Ok(self
            .0
            .scan(|review| {
                review.place == *place && review.author == *author && review.status.is_visible()
            })
            .into_iter()
            .next())
    }
}

#[derive(Default)]
struct Reports(MemoryStore<ReportId, Report>);

impl ReportRepository for Reports {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        let duplicate = !self
            .0
            .scan(|existing| existing.author == report.author && existing.target == report.target)
            .is_empty();
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        self.0.insert_new(report.id.clone(), report)
    }
    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        self.0.replace(report.id.clone(), report)
    }
    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        Ok(self.0.get(id))
    }
    fn for_author_and_target(
        &self,
        author: &UserId,
        target: &PlaceId,
    ) -> Result<Option<Report>, RepositoryError> {
        Ok(self
            .0
            .scan(|report| report.author == *author && report.target == *target)
            .into_iter()
            .next())
    }
    fn open_for_place(&self, target: &PlaceId) -> Result<Vec<Report>, RepositoryError> {
        Ok(self
            .0
            .scan(|report| report.target == *target && report.status.is_open()))
    }
}

#[derive(Default)]
struct StagedFiles {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl StagedFiles {
    fn stage(&self, filename: &str, bytes: &[u8]) {
        self.files
            .lock()
            .expect("storage mutex poisoned")
            .insert(filename.to_string(), bytes.to_vec());
    }
}

impl FileStorage for StagedFiles {
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

struct World {
    service: PlaceService<Places, Images, Reviews, Reports, StagedFiles>,
    images: Arc<Images>,
    reports: Arc<Reports>,
    storage: Arc<StagedFiles>,
}

fn world() -> World {
    let images = Arc::new(Images::default());
    let reports = Arc::new(Reports::default());
    let storage = Arc::new(StagedFiles::default());
    let service = PlaceService::new(
        Arc::new(Places::default()),
        images.clone(),
        Arc::new(Reviews::default()),
        reports.clone(),
        storage.clone(),
    );
    World {
        service,
        images,
        reports,
        storage,
    }
}

fn identity(id: &str, role: Role) -> Identity {
    Identity {
        id: UserId(id.to_string()),
        role,
    }
}

fn submission() -> ListingSubmission {
    ListingSubmission {
        name: "Lighthouse Residences".to_string(),
        kind: PlaceKind::Apartment,
        listing: ListingKind::RentOrSale,
        number: "88".to_string(),
        street: "Katipunan Ave".to_string(),
        subdivision: None,
        barangay: Some("Loyola Heights".to_string()),
        city: "Quezon City".to_string(),
        zip_code: Some("1108".to_string()),
        province: "Metro Manila".to_string(),
        price: "18,500".to_string(),
        floors: Some("5".to_string()),
        bedrooms: Some("2".to_string()),
        bathrooms: Some("1".to_string()),
        area: Some("54 sqm".to_string()),
        description: "Two-bedroom unit across the university gate.".to_string(),
        coordinates: "14.6394, 121.0744".to_string(),
    }
}

fn staged(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        original_name: filename.to_string(),
        content_type: "image/jpeg".to_string(),
    }
}

#[tokio::test]
async fn full_lifecycle_from_creation_to_moderated_deletion() {
    let w = world();
    let owner = identity("owner-77", Role::Placeowner);
    let student_a = identity("student-a", Role::Student);
    let student_b = identity("student-b", Role::Student);
    let admin = identity("mod-desk", Role::Admin);

    // Create with images; price arrives formatted and normalizes.
    let files = [staged("unit.jpg"), staged("lobby.jpg")];
    w.storage.stage("unit.jpg", b"unit-bytes");
    w.storage.stage("lobby.jpg", b"lobby-bytes");
    let place = w
        .service
        .create_place(&owner, submission(), &files)
        .await
        .expect("listing persists");

    assert_eq!(place.status, RecordStatus::Visible);
    assert_eq!(place.price, 18500);
    assert_eq!(place.area, Some(54));
    assert_eq!(place.images.len(), 2);
    assert_eq!(place.id.0.len(), 10);

    // Reviews aggregate on read.
    w.service
        .submit_review(&student_a, &place.id, Some(5), "Bright rooms.")
        .expect("first review");
    w.service
        .submit_review(&student_b, &place.id, Some(3), "Pricey for students.")
        .expect("second review");
    let view = w.service.get_place(&place.id).expect("view");
    assert!((view.stars - 4.0).abs() < f64::EPSILON);
    assert_eq!(view.listing, "Rent/Sale");
    assert_eq!(
        view.full_address,
        "88 Katipunan Ave, Bgy. Loyola Heights, Quezon City, 1108 Metro Manila"
    );

    // Same-author duplicates stay blocked until the author retires theirs.
    match w
        .service
        .submit_review(&student_a, &place.id, Some(1), "Edit: worse now.")
    {
        Err(ReviewError::Duplicate) => {}
        other => panic!("expected duplicate review, got {other:?}"),
    }

    // Serving works while staged, and removing a reference leaves the
    // record's own status alone.
    let served = w
        .service
        .serve_image_file(&place.id, "unit.jpg")
        .expect("file served");
    assert_eq!(served.bytes, b"unit-bytes");

    let dropped = place.images[1].clone();
    w.service
        .remove_place_image(&owner, &place.id, &dropped)
        .expect("reference removed");
    let record = w.images.fetch(&dropped).expect("fetch").expect("kept");
    assert_eq!(record.status, RecordStatus::Visible);

    // Reports: one per author against a target, ever.
    let report = w
        .service
        .file_report(&student_b, &place.id, ReportKind::Misleading, "Old photos.")
        .expect("report filed");
    assert!(w
        .service
        .file_report(&student_b, &place.id, ReportKind::Other, "Again.")
        .is_err());

    // Strangers cannot delete; the admin cascade resolves the open report.
    match w.service.delete_place(&student_a, &place.id) {
        Err(PlaceError::Forbidden) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
    w.service
        .delete_place(&admin, &place.id)
        .expect("admin deletes listing");

    match w.service.get_place(&place.id) {
        Err(PlaceError::NotFound) => {}
        other => panic!("expected not found, got {other:?}"),
    }
    let resolved = w.reports.fetch(&report.id).expect("fetch").expect("kept");
    assert_eq!(resolved.status, ReportStatus::Resolved);
    assert!(resolved.resolved_at.is_some());

    // A report filed once stays counted after resolution.
    match w
        .service
        .file_report(&student_b, &place.id, ReportKind::Other, "Round two.")
    {
        Err(err) => assert!(err.to_string().contains("already")),
        Ok(_) => panic!("resolved report should still block refiling"),
    }
}

#[tokio::test]
async fn serving_unstaged_files_retires_the_record_lazily() {
    let w = world();
    let owner = identity("owner-77", Role::Placeowner);

    let files = [staged("ghost.jpg")];
    let place = w
        .service
        .create_place(&owner, submission(), &files)
        .await
        .expect("listing persists");
    let image_id = place.images[0].clone();

    match w.service.serve_image_file(&place.id, "ghost.jpg") {
        Err(PlaceError::NotFound) => {}
        other => panic!("expected not found, got {other:?}"),
    }

    let record = w.images.fetch(&image_id).expect("fetch").expect("kept");
    assert_eq!(record.status, RecordStatus::Deleted);
    let view = w.service.get_place(&place.id).expect("view");
    assert!(view.images.is_empty());
}
