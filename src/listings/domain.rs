use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reviews::average_stars;

/// Identifier wrapper for listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceId(pub String);

/// Identifier wrapper for accounts, student and placeowner alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportId(pub String);

/// Account roles as assigned by the (external) authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Placeowner,
    Admin,
}

/// Authenticated requester context. Supplied explicitly with every command
/// rather than read from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub role: Role,
}

/// Soft-delete state shared by places, images, and reviews. Records are
/// never physically erased; a deleted record stays behind for audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Deleted,
    Visible,
}

impl RecordStatus {
    pub const fn is_visible(self) -> bool {
        matches!(self, Self::Visible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceKind {
    BoardingHouse,
    Dormitory,
    Apartment,
    Condominium,
}

impl PlaceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::BoardingHouse => "Boarding House",
            Self::Dormitory => "Dormitory",
            Self::Apartment => "Apartment",
            Self::Condominium => "Condominium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    RentOrSale,
    Rent,
    Sale,
}

impl ListingKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RentOrSale => "Rent/Sale",
            Self::Rent => "Rent",
            Self::Sale => "Sale",
        }
    }
}

/// Philippine-style street address. Subdivision, barangay, and zip code are
/// optional; everything else is required at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub number: String,
    pub street: String,
    pub subdivision: Option<String>,
    pub barangay: Option<String>,
    pub city: String,
    pub zip_code: Option<String>,
    pub province: String,
}

impl Address {
    /// Display form with optional segments skipped, e.g.
    /// "214 Maginhawa St, Teachers Village, Bgy. Central, Quezon City, 1101 Metro Manila".
    pub fn full(&self) -> String {
        let mut segments = vec![format!("{} {}", self.number, self.street)];
        if let Some(subdivision) = &self.subdivision {
            segments.push(subdivision.clone());
        }
        if let Some(barangay) = &self.barangay {
            segments.push(format!("Bgy. {barangay}"));
        }
        segments.push(self.city.clone());
        segments.push(match &self.zip_code {
            Some(zip) => format!("{zip} {}", self.province),
            None => self.province.clone(),
        });
        segments.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A listing. Owner and identifier are fixed at creation; the status only
/// ever moves from visible to deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub owner: UserId,
    pub name: String,
    pub kind: PlaceKind,
    pub status: RecordStatus,
    pub address: Address,
    pub price: u64,
    pub listing: ListingKind,
    pub floors: Option<u32>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub area: Option<u32>,
    pub description: String,
    pub coordinates: Coordinates,
    pub images: Vec<ImageId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Place {
    /// Display projection with every derived field computed from current
    /// state. Nothing here is stored.
    pub fn view(&self, reviews: &[Review]) -> PlaceView {
        PlaceView {
            id: self.id.clone(),
            owner: self.owner.clone(),
            name: self.name.clone(),
            kind: self.kind.label(),
            listing: self.listing.label(),
            full_address: self.address.full(),
            price: self.price,
            floors: self.floors,
            bedrooms: self.bedrooms,
            bathrooms: self.bathrooms,
            area: self.area,
            description: self.description.clone(),
            coordinates: self.coordinates,
            images: self.images.clone(),
            stars: average_stars(reviews),
            reviews: reviews.iter().map(Review::view).collect(),
            listed_on: format_display_date(self.created_at),
            updated_on: self.updated_at.map(format_display_date),
        }
    }
}

/// Serialized detail view of a listing.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceView {
    pub id: PlaceId,
    pub owner: UserId,
    pub name: String,
    pub kind: &'static str,
    pub listing: &'static str,
    pub full_address: String,
    pub price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floors: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<u32>,
    pub description: String,
    pub coordinates: Coordinates,
    pub images: Vec<ImageId>,
    pub stars: f64,
    pub reviews: Vec<ReviewView>,
    pub listed_on: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<String>,
}

/// An uploaded file record. Ownership is by reference from a place's image
/// collection; the record itself never knows its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub filename: String,
    pub url: String,
    pub content_type: String,
    pub status: RecordStatus,
}

/// A rating and comment left by a student on a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub place: PlaceId,
    pub author: UserId,
    pub rating: u8,
    pub comment: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn view(&self) -> ReviewView {
        ReviewView {
            id: self.id.clone(),
            author: self.author.clone(),
            rating: self.rating,
            comment: self.comment.clone(),
            submitted_on: format_display_date(self.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub author: UserId,
    pub rating: u8,
    pub comment: String,
    pub submitted_on: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Fraud,
    Misleading,
    Inappropriate,
    Spam,
    Other,
}

impl ReportKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Fraud => "Fraud",
            Self::Misleading => "Misleading",
            Self::Inappropriate => "Inappropriate",
            Self::Spam => "Spam",
            Self::Other => "Other",
        }
    }
}

/// Reports carry their own state space: they open on filing and resolve
/// only as a cascade of their target being soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Open,
    Resolved,
}

impl ReportStatus {
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// A complaint filed by an authenticated user against a place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub author: UserId,
    pub target: PlaceId,
    pub kind: ReportKind,
    pub comment: String,
    pub status: ReportStatus,
    pub filed_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Long-form display date, e.g. "August 5, 2026".
pub fn format_display_date(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%B %-d, %Y").to_string()
}
