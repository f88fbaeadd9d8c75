use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{Identity, ImageId, PlaceId, ReportKind, ReviewId};
use super::images::{FileStorage, UploadedFile};
use super::intake::ListingSubmission;
use super::repository::{
    ImageRepository, PlaceRepository, ReportRepository, ReviewRepository,
};
use super::reports::ReportError;
use super::reviews::ReviewError;
use super::service::{PlaceError, PlaceService};

/// Router builder exposing the lifecycle commands as JSON endpoints. The
/// requester identity rides in the request body, placed there by the
/// (external) authentication layer.
pub fn listing_router<P, I, V, T, S>(service: Arc<PlaceService<P, I, V, T, S>>) -> Router
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    Router::new()
        .route("/api/v1/places", post(create_handler::<P, I, V, T, S>))
        .route(
            "/api/v1/places/:place_id",
            get(detail_handler::<P, I, V, T, S>).delete(delete_handler::<P, I, V, T, S>),
        )
        .route(
            "/api/v1/places/:place_id/images/:image_ref",
            get(serve_image_handler::<P, I, V, T, S>)
                .delete(remove_image_handler::<P, I, V, T, S>),
        )
        .route(
            "/api/v1/places/:place_id/reviews",
            post(submit_review_handler::<P, I, V, T, S>),
        )
        .route(
            "/api/v1/places/:place_id/reviews/:review_id",
            delete(delete_review_handler::<P, I, V, T, S>),
        )
        .route(
            "/api/v1/places/:place_id/reports",
            post(file_report_handler::<P, I, V, T, S>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatePlaceRequest {
    pub requester: Identity,
    pub listing: ListingSubmission,
    #[serde(default)]
    pub images: Vec<UploadedFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequesterPayload {
    pub requester: Identity,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitReviewRequest {
    pub requester: Identity,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileReportRequest {
    pub requester: Identity,
    pub kind: ReportKind,
    #[serde(default)]
    pub comment: String,
}

async fn create_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Json(request): Json<CreatePlaceRequest>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service
        .create_place(&request.requester, request.listing, &request.images)
        .await
    {
        Ok(place) => (StatusCode::CREATED, Json(place)).into_response(),
        Err(err) => place_error_response(err),
    }
}

async fn detail_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path(place_id): Path<String>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.get_place(&PlaceId(place_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => place_error_response(err),
    }
}

async fn delete_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path(place_id): Path<String>,
    Json(payload): Json<RequesterPayload>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.delete_place(&payload.requester, &PlaceId(place_id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "deleted" }))).into_response(),
        Err(err) => place_error_response(err),
    }
}

async fn remove_image_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path((place_id, image_id)): Path<(String, String)>,
    Json(payload): Json<RequesterPayload>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.remove_place_image(
        &payload.requester,
        &PlaceId(place_id),
        &ImageId(image_id),
    ) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "removed" }))).into_response(),
        Err(err) => place_error_response(err),
    }
}

async fn serve_image_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path((place_id, filename)): Path<(String, String)>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.serve_image_file(&PlaceId(place_id), &filename) {
        Ok(image) => {
            let content_type = image
                .content_type
                .parse::<mime::Mime>()
                .unwrap_or_else(|_| mime_guess::from_path(&filename).first_or_octet_stream());
            (
                [(header::CONTENT_TYPE, content_type.to_string())],
                image.bytes,
            )
                .into_response()
        }
        Err(err) => place_error_response(err),
    }
}

async fn submit_review_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path(place_id): Path<String>,
    Json(request): Json<SubmitReviewRequest>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.submit_review(
        &request.requester,
        &PlaceId(place_id),
        request.rating,
        &request.comment,
    ) {
        Ok(review) => (StatusCode::CREATED, Json(review)).into_response(),
        Err(err) => review_error_response(err),
    }
}

async fn delete_review_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path((_place_id, review_id)): Path<(String, String)>,
    Json(payload): Json<RequesterPayload>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.delete_review(&payload.requester, &ReviewId(review_id)) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "deleted" }))).into_response(),
        Err(err) => review_error_response(err),
    }
}

async fn file_report_handler<P, I, V, T, S>(
    State(service): State<Arc<PlaceService<P, I, V, T, S>>>,
    Path(place_id): Path<String>,
    Json(request): Json<FileReportRequest>,
) -> Response
where
    P: PlaceRepository + 'static,
    I: ImageRepository + 'static,
    V: ReviewRepository + 'static,
    T: ReportRepository + 'static,
    S: FileStorage + 'static,
{
    match service.file_report(
        &request.requester,
        &PlaceId(place_id),
        request.kind,
        &request.comment,
    ) {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(err) => report_error_response(err),
    }
}

fn place_error_response(error: PlaceError) -> Response {
    let status = match &error {
        PlaceError::Intake(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PlaceError::Forbidden => StatusCode::FORBIDDEN,
        PlaceError::NotFound => StatusCode::NOT_FOUND,
        PlaceError::Images(_)
        | PlaceError::Reports(_)
        | PlaceError::Storage(_)
        | PlaceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &error.to_string())
}

fn review_error_response(error: ReviewError) -> Response {
    let status = match &error {
        ReviewError::MissingComment
        | ReviewError::MissingRating
        | ReviewError::CommentTooLong { .. }
        | ReviewError::InvalidRating { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ReviewError::Duplicate => StatusCode::CONFLICT,
        ReviewError::Forbidden => StatusCode::FORBIDDEN,
        ReviewError::NotFound => StatusCode::NOT_FOUND,
        ReviewError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &error.to_string())
}

fn report_error_response(error: ReportError) -> Response {
    let status = match &error {
        ReportError::MissingComment | ReportError::CommentTooLong { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ReportError::Duplicate => StatusCode::CONFLICT,
        ReportError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_body(status, &error.to_string())
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
