use std::sync::Arc;

use chrono::Utc;

use super::domain::{PlaceId, RecordStatus, Review, ReviewId, UserId};
use super::ident;
use super::repository::{RepositoryError, ReviewRepository};

pub const COMMENT_MAX_CHARS: usize = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("a comment is required")]
    MissingComment,
    #[error("a star rating is required")]
    MissingRating,
    #[error("comments are limited to {max} characters")]
    CommentTooLong { max: usize },
    #[error("rating must be between 1 and 5 stars, got {value}")]
    InvalidRating { value: u8 },
    #[error("this author has already reviewed this place")]
    Duplicate,
    #[error("only students may review places")]
    Forbidden,
    #[error("review not found")]
    NotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Review subsystem: one visible review per author per place. Ratings are
/// never written back to the place; aggregation happens on read.
pub struct ReviewService<R> {
    repository: Arc<R>,
}

impl<R> ReviewService<R>
where
    R: ReviewRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Validation failures surface in a fixed order; the first violated
    /// rule wins.
    pub fn submit(
        &self,
        place: &PlaceId,
        author: &UserId,
        rating: Option<u8>,
        comment: &str,
    ) -> Result<Review, ReviewError> {
        let comment = comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::MissingComment);
        }
        let rating = rating.ok_or(ReviewError::MissingRating)?;
        if comment.chars().count() > COMMENT_MAX_CHARS {
            return Err(ReviewError::CommentTooLong {
                max: COMMENT_MAX_CHARS,
            });
        }
        if !(1..=5).contains(&rating) {
            return Err(ReviewError::InvalidRating { value: rating });
        }
        if self.repository.visible_by_author(place, author)?.is_some() {
            return Err(ReviewError::Duplicate);
        }

        let review = ident::insert_with_retry(|id| {
            self.repository.insert(Review {
                id: ReviewId(id),
                place: place.clone(),
                author: author.clone(),
                rating,
                comment: comment.to_string(),
                status: RecordStatus::Visible,
                created_at: Utc::now(),
            })
        })
        .map_err(|err| match err {
            // A residual conflict after id retries means the unique
            // (place, author) index caught a concurrent duplicate.
            RepositoryError::Conflict => ReviewError::Duplicate,
            other => ReviewError::Repository(other),
        })?;
        Ok(review)
    }

    /// Soft-deletes the author's own review. A foreign or unknown review
    /// reads as not found; authorship is never disclosed.
    pub fn delete_own(&self, id: &ReviewId, author: &UserId) -> Result<(), ReviewError> {
        let mut review = self.repository.fetch(id)?.ok_or(ReviewError::NotFound)?;
        if review.author != *author {
            return Err(ReviewError::NotFound);
        }
        if !review.status.is_visible() {
            return Ok(());
        }
        review.status = RecordStatus::Deleted;
        self.repository.update(review)?;
        Ok(())
    }

    pub fn visible_for_place(&self, place: &PlaceId) -> Result<Vec<Review>, RepositoryError> {
        self.repository.visible_for_place(place)
    }
}

/// Arithmetic mean of the given ratings; a place without reviews reads 0.
pub fn average_stars(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
    f64::from(total) / reviews.len() as f64
}
