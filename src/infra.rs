use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::listings::{
    FileStorage, Image, ImageId, ImageRepository, Place, PlaceId, PlaceRepository, Report,
    ReportId, ReportRepository, RepositoryError, Review, ReviewId, ReviewRepository, UserId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPlaceRepository {
    records: Arc<Mutex<HashMap<PlaceId, Place>>>,
}

impl PlaceRepository for InMemoryPlaceRepository {
    fn insert(&self, place: Place) -> Result<Place, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&place.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(place.id.clone(), place.clone());
        Ok(place)
    }

    fn update(&self, place: Place) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&place.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(place.id.clone(), place);
        Ok(())
    }

    fn fetch(&self, id: &PlaceId) -> Result<Option<Place>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryImageRepository {
    records: Arc<Mutex<HashMap<ImageId, Image>>>,
}

impl ImageRepository for InMemoryImageRepository {
    fn insert(&self, image: Image) -> Result<Image, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&image.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(image.id.clone(), image.clone());
        Ok(image)
    }

    fn update(&self, image: Image) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&image.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(image.id.clone(), image);
        Ok(())
    }

    fn fetch(&self, id: &ImageId) -> Result<Option<Image>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReviewRepository {
    records: Arc<Mutex<HashMap<ReviewId, Review>>>,
}

impl ReviewRepository for InMemoryReviewRepository {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&review.id) {
            return Err(RepositoryError::Conflict);
        }
        let duplicate_pair = review.status.is_visible()
            && guard.values().any(|existing| {
                existing.place == review.place
                    && existing.author == review.author
                    && existing.status.is_visible()
            });
        if duplicate_pair {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn update(&self, review: Review) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&review.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(review.id.clone(), review);
        Ok(())
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn visible_for_place(&self, place: &PlaceId) -> Result<Vec<Review>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut reviews: Vec<Review> = guard
            .values()
            .filter(|review| review.place == *place && review.status.is_visible())
            .cloned()
            .collect();
        reviews.sort_by_key(|review| review.created_at);
        Ok(reviews)
    }

    fn visible_by_author(
        &self,
        place: &PlaceId,
        author: &UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|review| {
                review.place == *place && review.author == *author && review.status.is_visible()
            })
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryReportRepository {
    records: Arc<Mutex<HashMap<ReportId, Report>>>,
}

impl ReportRepository for InMemoryReportRepository {
    fn insert(&self, report: Report) -> Result<Report, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&report.id) {
            return Err(RepositoryError::Conflict);
        }
        let duplicate_pair = guard
            .values()
            .any(|existing| existing.author == report.author && existing.target == report.target);
        if duplicate_pair {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(report.id.clone(), report.clone());
        Ok(report)
    }

    fn update(&self, report: Report) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&report.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(report.id.clone(), report);
        Ok(())
    }

    fn fetch(&self, id: &ReportId) -> Result<Option<Report>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn for_author_and_target(
        &self,
        author: &UserId,
        target: &PlaceId,
    ) -> Result<Option<Report>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|report| report.author == *author && report.target == *target)
            .cloned())
    }

    fn open_for_place(&self, target: &PlaceId) -> Result<Vec<Report>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut reports: Vec<Report> = guard
            .values()
            .filter(|report| report.target == *target && report.status.is_open())
            .cloned()
            .collect();
        reports.sort_by_key(|report| report.filed_at);
        Ok(reports)
    }
}

/// Staged uploads on local disk, written there by transport middleware.
pub(crate) struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl FileStorage for DiskStorage {
    fn contains(&self, filename: &str) -> bool {
        self.root.join(filename).is_file()
    }

    fn read(&self, filename: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.root.join(filename))
    }
}
