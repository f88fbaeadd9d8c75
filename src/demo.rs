use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AppError;
use crate::infra::{
    DiskStorage, InMemoryImageRepository, InMemoryPlaceRepository, InMemoryReportRepository,
    InMemoryReviewRepository,
};
use crate::listings::{
    Identity, ListingKind, ListingSubmission, PlaceError, PlaceKind, ReportKind, ReportRepository,
    Role, UploadedFile, UserId,
};

fn step_failed(err: impl std::fmt::Display) -> AppError {
    AppError::Walkthrough(err.to_string())
}

/// Scripted end-to-end pass over the lifecycle: create a listing with
/// images, review it, report it, retire an image, then soft-delete the
/// place and show the report cascade.
pub(crate) async fn run() -> Result<(), AppError> {
    let reports = Arc::new(InMemoryReportRepository::default());
    let service = Arc::new(crate::listings::PlaceService::new(
        Arc::new(InMemoryPlaceRepository::default()),
        Arc::new(InMemoryImageRepository::default()),
        Arc::new(InMemoryReviewRepository::default()),
        reports.clone(),
        // Deliberately empty staging directory so the serve step can show
        // lazily-discovered image deletion.
        Arc::new(DiskStorage::new(PathBuf::from("uploads"))),
    ));

    let owner = Identity {
        id: UserId("maria-placeowner".to_string()),
        role: Role::Placeowner,
    };
    let student = Identity {
        id: UserId("joel-student".to_string()),
        role: Role::Student,
    };
    let second_student = Identity {
        id: UserId("ana-student".to_string()),
        role: Role::Student,
    };
    let admin = Identity {
        id: UserId("moderation-desk".to_string()),
        role: Role::Admin,
    };

    println!("Listing lifecycle demo");

    let submission = ListingSubmission {
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
        price: "4,500".to_string(),
        floors: Some("3".to_string()),
        bedrooms: Some("12".to_string()),
        bathrooms: Some("6".to_string()),
        area: None,
        description: "Quiet dorm near the university strip.".to_string(),
        coordinates: "14.6467, 121.0685".to_string(),
    };
    let files = vec![
        staged_file("facade.jpg"),
        staged_file("common-area.jpg"),
    ];

    let place = service
        .create_place(&owner, submission, &files)
        .await
        .map_err(step_failed)?;
    println!(
        "\nCreated '{}' ({}) with {} images, price {} pesos",
        place.name,
        place.id.0,
        place.images.len(),
        place.price
    );

    let view = service.get_place(&place.id).map_err(step_failed)?;
    println!("Address: {}", view.full_address);
    println!("Type: {} | Listed for: {}", view.kind, view.listing);
    println!("Stars before reviews: {}", view.stars);

    service
        .submit_review(&student, &place.id, Some(4), "Clean rooms, thin walls.")
        .map_err(step_failed)?;
    service
        .submit_review(&second_student, &place.id, Some(5), "Great landlady.")
        .map_err(step_failed)?;
    match service.submit_review(&student, &place.id, Some(1), "Changed my mind.") {
        Err(err) => println!("Second review by the same student rejected: {err}"),
        Ok(_) => println!("Second review unexpectedly accepted"),
    }
    let view = service.get_place(&place.id).map_err(step_failed)?;
    println!("Stars after reviews: {}", view.stars);

    let report = service
        .file_report(&student, &place.id, ReportKind::Misleading, "Photos are outdated.")
        .map_err(step_failed)?;
    println!("\nReport {} filed ({})", report.id.0, report.kind.label());
    match service.file_report(&student, &place.id, ReportKind::Spam, "Reporting again.") {
        Err(err) => println!("Duplicate report rejected: {err}"),
        Ok(_) => println!("Duplicate report unexpectedly accepted"),
    }

    // No bytes were ever staged for this filename, so serving it retires
    // the record and drops the reference.
    match service.serve_image_file(&place.id, "facade.jpg") {
        Err(PlaceError::NotFound) => {
            let view = service.get_place(&place.id).map_err(step_failed)?;
            println!(
                "\nServing a missing file retired the record; {} image(s) remain",
                view.images.len()
            );
        }
        other => println!("\nUnexpected serve outcome: {other:?}"),
    }

    let view = service.get_place(&place.id).map_err(step_failed)?;
    if let Some(image) = view.images.first() {
        service
            .delete_place_image(&owner, &place.id, image)
            .map_err(step_failed)?;
        println!("Owner removed the remaining image record and reference");
    }

    service.delete_place(&admin, &place.id).map_err(step_failed)?;
    println!("\nAdmin soft-deleted the listing");

    match service.get_place(&place.id) {
        Err(PlaceError::NotFound) => println!("Lookup after delete: not found"),
        other => println!("Unexpected lookup outcome: {other:?}"),
    }

    let report = reports
        .fetch(&report.id)
        .map_err(step_failed)?
        .ok_or_else(|| AppError::Walkthrough("report vanished".to_string()))?;
    println!(
        "Report {} is now {:?} (resolved at {:?})",
        report.id.0, report.status, report.resolved_at
    );

    Ok(())
}

fn staged_file(filename: &str) -> UploadedFile {
    UploadedFile {
        filename: filename.to_string(),
        original_name: filename.to_string(),
        content_type: mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string(),
    }
}
