use serde::{Deserialize, Serialize};

use super::domain::{Address, Coordinates, ListingKind, PlaceKind};

pub const MAX_LISTING_IMAGES: usize = 10;

/// Raw listing submission as delivered by the request layer. Free text
/// arrives already sanitized; numeric fields arrive as the user typed them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSubmission {
    pub name: String,
    pub kind: PlaceKind,
    pub listing: ListingKind,
    pub number: String,
    pub street: String,
    #[serde(default)]
    pub subdivision: Option<String>,
    #[serde(default)]
    pub barangay: Option<String>,
    pub city: String,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub province: String,
    pub price: String,
    #[serde(default)]
    pub floors: Option<String>,
    #[serde(default)]
    pub bedrooms: Option<String>,
    #[serde(default)]
    pub bathrooms: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    pub description: String,
    pub coordinates: String,
}

/// Validated, normalized field set ready to commit as a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingDraft {
    pub name: String,
    pub kind: PlaceKind,
    pub listing: ListingKind,
    pub address: Address,
    pub price: u64,
    pub floors: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area: Option<u32>,
    pub description: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ListingIntakeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {0} must contain only digits")]
    NonNumericField(&'static str),
    #[error("coordinates must be two comma-separated numbers")]
    MalformedCoordinates,
    #[error("a listing can carry at most {limit} images")]
    TooManyImages { limit: usize },
}

pub fn validate_image_count(count: usize) -> Result<(), ListingIntakeError> {
    if count > MAX_LISTING_IMAGES {
        return Err(ListingIntakeError::TooManyImages {
            limit: MAX_LISTING_IMAGES,
        });
    }
    Ok(())
}

/// Checks run in a fixed order; the first violated rule names the field.
///
/// Numeric leniency is deliberately uneven and mirrors upstream behavior:
/// a non-digit anywhere in `zip_code` rejects the submission, while
/// `price`, `floors`, `bedrooms`, `bathrooms`, and `area` are stripped of
/// non-digits before parsing ("1,200" reads as 1200).
pub fn validate(submission: ListingSubmission) -> Result<ListingDraft, ListingIntakeError> {
    let name = required("name", &submission.name)?;
    let number = required("number", &submission.number)?;
    let street = required("street", &submission.street)?;
    let city = required("city", &submission.city)?;
    let province = required("province", &submission.province)?;
    let price_raw = required("price", &submission.price)?;
    let description = required("description", &submission.description)?;
    let coordinates_raw = required("coordinates", &submission.coordinates)?;

    let zip_code = match optional(&submission.zip_code) {
        Some(zip) if zip.bytes().any(|b| !b.is_ascii_digit()) => {
            return Err(ListingIntakeError::NonNumericField("zip_code"));
        }
        other => other,
    };

    let price = digits_of(&price_raw)
        .parse::<u64>()
        .map_err(|_| ListingIntakeError::NonNumericField("price"))?;

    let floors = lenient_count("floors", &submission.floors)?;
    let bedrooms = lenient_count("bedrooms", &submission.bedrooms)?;
    let bathrooms = lenient_count("bathrooms", &submission.bathrooms)?;
    let area = lenient_count("area", &submission.area)?;

    let coordinates = parse_coordinates(&coordinates_raw)?;

    Ok(ListingDraft {
        name,
        kind: submission.kind,
        listing: submission.listing,
        address: Address {
            number,
            street,
            subdivision: optional(&submission.subdivision),
            barangay: optional(&submission.barangay),
            city,
            zip_code,
            province,
        },
        price,
        floors,
        bedrooms,
        bathrooms,
        area,
        description,
        coordinates,
    })
}

fn required(field: &'static str, value: &str) -> Result<String, ListingIntakeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ListingIntakeError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn optional(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

fn digits_of(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Optional counts keep the lenient treatment: non-digits are stripped, and
/// a value with no digits at all is ignored rather than rejected.
fn lenient_count(
    field: &'static str,
    value: &Option<String>,
) -> Result<Option<u32>, ListingIntakeError> {
    match optional(value) {
        Some(raw) => {
            let digits = digits_of(&raw);
            if digits.is_empty() {
                return Ok(None);
            }
            digits
                .parse::<u32>()
                .map(Some)
                .map_err(|_| ListingIntakeError::NonNumericField(field))
        }
        None => Ok(None),
    }
}

fn parse_coordinates(raw: &str) -> Result<Coordinates, ListingIntakeError> {
    let mut parts = raw.split(',');
    let (Some(lat), Some(lng), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ListingIntakeError::MalformedCoordinates);
    };
    let lat = lat
        .trim()
        .parse::<f64>()
        .map_err(|_| ListingIntakeError::MalformedCoordinates)?;
    let lng = lng
        .trim()
        .parse::<f64>()
        .map_err(|_| ListingIntakeError::MalformedCoordinates)?;
    Ok(Coordinates { lat, lng })
}
