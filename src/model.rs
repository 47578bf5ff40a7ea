//! Data models for the jewellery catalogue
//!
//! This module defines the documents persisted in the store (categories,
//! items, admin users, sessions), the request payloads accepted by the API
//! and the normalisation step that turns a loosely-shaped payload into a
//! validated set of fields.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationErrors};

/// Validation failures reported back to the client as HTTP 400.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum ValidationError {
    #[error("Title and subtitle are required")]
    CategoryFields,
    #[error("Name and description are required")]
    ItemFields,
    #[error("Price must be a positive number")]
    Price,
    #[error("ID is required")]
    MissingId,
    #[error("Invalid ID format")]
    InvalidId,
    #[error("Username and password are required")]
    Credentials,
}

/// Store-generated document identifier
///
/// Twelve bytes rendered as 24 lowercase hex characters:
/// - 4 bytes: big-endian Unix seconds at generation time
/// - 5 bytes: random value fixed for the lifetime of the process
/// - 3 bytes: big-endian counter, seeded randomly
///
/// Identifiers generated by one process therefore sort in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct DocumentId([u8; 12]);

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER: OnceLock<AtomicU32> = OnceLock::new();

impl DocumentId {
    /// Generates a fresh identifier stamped with the current time.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    fn generate_at(now: DateTime<Utc>) -> Self {
        let seconds = now.timestamp().clamp(0, u32::MAX as i64) as u32;
        let unique = PROCESS_UNIQUE.get_or_init(|| rand::rng().random());
        let counter = COUNTER
            .get_or_init(|| AtomicU32::new(rand::rng().random_range(0..0x0080_0000)))
            .fetch_add(1, Ordering::Relaxed)
            & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(unique);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for DocumentId {
    type Err = ValidationError;

    /// Accepts exactly 24 hex digits, in either case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.len() != 24 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidId);
        }

        let mut bytes = [0u8; 12];
        for (slot, pair) in bytes.iter_mut().zip(raw.as_bytes().chunks(2)) {
            // Both bytes are ASCII hex digits, so the pair is valid UTF-8.
            let pair = std::str::from_utf8(pair).map_err(|_| ValidationError::InvalidId)?;
            *slot = u8::from_str_radix(pair, 16).map_err(|_| ValidationError::InvalidId)?;
        }
        Ok(Self(bytes))
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for DocumentId {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

/// Rejects strings made only of whitespace.
fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A named grouping of items, shown as a storefront collection tile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: DocumentId,
    pub title: String,
    pub subtitle: String,
    #[serde(default)]
    pub image_url: String,
    /// Set once at insert time, never rewritten.
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for creating or replacing a category
///
/// # Example
/// ```json
/// { "title": "Rings", "subtitle": "Everyday gold", "imageUrl": "https://..." }
/// ```
#[derive(Deserialize, Validate, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryPayload {
    #[validate(required, length(min = 1), custom(function = "not_blank"))]
    pub title: Option<String>,
    #[validate(required, length(min = 1), custom(function = "not_blank"))]
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
}

/// The mutable fields of a category after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub title: String,
    pub subtitle: String,
    pub image_url: String,
}

impl CategoryPayload {
    pub fn into_fields(self) -> Result<CategoryFields, ValidationError> {
        self.validate().map_err(|_| ValidationError::CategoryFields)?;
        match (self.title, self.subtitle) {
            (Some(title), Some(subtitle)) => Ok(CategoryFields {
                title,
                subtitle,
                image_url: self.image_url.unwrap_or_default(),
            }),
            _ => Err(ValidationError::CategoryFields),
        }
    }
}

impl Category {
    pub fn new(fields: CategoryFields, now: DateTime<Utc>) -> Self {
        Self {
            id: DocumentId::generate_at(now),
            title: fields.title,
            subtitle: fields.subtitle,
            image_url: fields.image_url,
            created_at: now,
            updated_at: None,
        }
    }

    /// Replaces every mutable field; `created_at` is kept.
    pub fn replace(&mut self, fields: CategoryFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.subtitle = fields.subtitle;
        self.image_url = fields.image_url;
        self.updated_at = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// Fixed four-slot image set attached to an item. Empty strings mark unused slots.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Gallery {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub side1: String,
    #[serde(default)]
    pub side2: String,
    #[serde(default)]
    pub side3: String,
}

/// Gallery as it arrives over the wire: any slot may be missing or null.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(default)]
pub struct GalleryPayload {
    pub image: Option<String>,
    pub side1: Option<String>,
    pub side2: Option<String>,
    pub side3: Option<String>,
}

impl From<Option<GalleryPayload>> for Gallery {
    fn from(payload: Option<GalleryPayload>) -> Self {
        let payload = payload.unwrap_or_default();
        Self {
            image: payload.image.unwrap_or_default(),
            side1: payload.side1.unwrap_or_default(),
            side2: payload.side2.unwrap_or_default(),
            side3: payload.side3.unwrap_or_default(),
        }
    }
}

impl Gallery {
    /// Slots in display order: main image first, then the three side views.
    pub fn slots(&self) -> [&str; 4] {
        [&self.image, &self.side1, &self.side2, &self.side3]
    }
}

/// A single jewellery piece.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: DocumentId,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default)]
    pub image_url: String,
    /// Reference to a category id. Not enforced: the category may be gone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub net_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purity: Option<String>,
    #[serde(default)]
    pub gallery: Gallery,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request body for creating or replacing an item
///
/// # Example
/// ```json
/// {
///   "name": "Rajkot Band",
///   "description": "Hand finished 18K band",
///   "price": 18500,
///   "categoryId": "65a1f0c2e4b0a1b2c3d4e5f6",
///   "netWeight": "1.210 gm",
///   "gallery": { "image": "https://..." }
/// }
/// ```
#[derive(Deserialize, Validate, Debug, Default, Clone)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemPayload {
    #[validate(required, length(min = 1), custom(function = "not_blank"))]
    pub name: Option<String>,
    #[validate(required, length(min = 1), custom(function = "not_blank"))]
    pub description: Option<String>,
    #[validate(range(exclusive_min = 0.0))]
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category_id: Option<String>,
    pub article_code: Option<String>,
    pub gross_weight: Option<String>,
    pub net_weight: Option<String>,
    pub design_name: Option<String>,
    pub purity: Option<String>,
    pub gallery: Option<GalleryPayload>,
}

/// `PUT /api/items` body: the item id travels next to the fields.
#[derive(Deserialize, Debug, Default)]
pub struct ItemUpdateRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(flatten)]
    pub fields: ItemPayload,
}

/// `DELETE /api/items` body.
#[derive(Deserialize, Debug, Default)]
pub struct DeleteItemRequest {
    #[serde(default)]
    pub id: Option<String>,
}

/// The mutable fields of an item after validation and gallery normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemFields {
    pub name: String,
    pub description: String,
    pub price: Option<f64>,
    pub image_url: String,
    pub category_id: Option<String>,
    pub article_code: Option<String>,
    pub gross_weight: Option<String>,
    pub net_weight: Option<String>,
    pub design_name: Option<String>,
    pub purity: Option<String>,
    pub gallery: Gallery,
}

/// Missing text fields take precedence over a bad price.
fn item_error(errors: ValidationErrors) -> ValidationError {
    let fields = errors.field_errors();
    if fields.contains_key("name") || fields.contains_key("description") {
        ValidationError::ItemFields
    } else {
        ValidationError::Price
    }
}

impl ItemPayload {
    pub fn into_fields(self) -> Result<ItemFields, ValidationError> {
        self.validate().map_err(item_error)?;
        let (Some(name), Some(description)) = (self.name, self.description) else {
            return Err(ValidationError::ItemFields);
        };

        Ok(ItemFields {
            name,
            description,
            price: self.price,
            image_url: self.image_url.unwrap_or_default(),
            category_id: self.category_id.filter(|id| !id.is_empty()),
            article_code: self.article_code,
            gross_weight: self.gross_weight,
            net_weight: self.net_weight,
            design_name: self.design_name,
            purity: self.purity,
            gallery: Gallery::from(self.gallery),
        })
    }
}

impl Item {
    pub fn new(fields: ItemFields, now: DateTime<Utc>) -> Self {
        let mut item = Self {
            id: DocumentId::generate_at(now),
            name: String::new(),
            description: String::new(),
            price: None,
            image_url: String::new(),
            category_id: None,
            article_code: None,
            gross_weight: None,
            net_weight: None,
            design_name: None,
            purity: None,
            gallery: Gallery::default(),
            created_at: now,
            updated_at: None,
        };
        item.assign(fields);
        item
    }

    /// Replaces every mutable field; `created_at` is kept.
    pub fn replace(&mut self, fields: ItemFields, now: DateTime<Utc>) {
        self.assign(fields);
        self.updated_at = Some(now);
    }

    fn assign(&mut self, fields: ItemFields) {
        self.name = fields.name;
        self.description = fields.description;
        self.price = fields.price;
        self.image_url = fields.image_url;
        self.category_id = fields.category_id;
        self.article_code = fields.article_code;
        self.gross_weight = fields.gross_weight;
        self.net_weight = fields.net_weight;
        self.design_name = fields.design_name;
        self.purity = fields.purity;
        self.gallery = fields.gallery;
    }
}

// ---------------------------------------------------------------------------
// Admin users and sessions
// ---------------------------------------------------------------------------

/// Dashboard account. Only the Argon2 PHC hash of the password is kept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side record behind the `session` cookie.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// `POST /api/login` body.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_id_round_trips_through_display() {
        let id = DocumentId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), 24);
        assert!(text.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()));
        assert_eq!(text.parse::<DocumentId>().unwrap(), id);
    }

    #[test]
    fn document_id_accepts_uppercase_and_rejects_garbage() {
        let id: DocumentId = "65A1F0C2E4B0A1B2C3D4E5F6".parse().unwrap();
        assert_eq!(id.to_string(), "65a1f0c2e4b0a1b2c3d4e5f6");

        for bad in ["", "123", "zz a1f0c2e4b0a1b2c3d4e5f6", "65a1f0c2e4b0a1b2c3d4e5f6aa", "65a1f0c2e4b0a1b2c3d4e5fg"] {
            assert_eq!(bad.parse::<DocumentId>(), Err(ValidationError::InvalidId), "{bad}");
        }
    }

    #[test]
    fn document_ids_from_one_process_increase() {
        let now = Utc::now();
        let first = DocumentId::generate_at(now);
        let second = DocumentId::generate_at(now);
        assert!(second > first);
    }

    #[test]
    fn category_requires_title_and_subtitle() {
        let missing = CategoryPayload {
            title: Some("Rings".into()),
            subtitle: Some("   ".into()),
            image_url: None,
        };
        assert_eq!(missing.into_fields(), Err(ValidationError::CategoryFields));

        let fields = CategoryPayload {
            title: Some("Rings".into()),
            subtitle: Some("Everyday gold".into()),
            image_url: None,
        }
        .into_fields()
        .unwrap();
        assert_eq!(fields.image_url, "");
    }

    #[test]
    fn category_replace_keeps_creation_time() {
        let created = Utc::now();
        let fields = CategoryFields {
            title: "Rings".into(),
            subtitle: "Gold".into(),
            image_url: "https://cdn.example/rings.png".into(),
        };
        let mut category = Category::new(fields, created);

        let later = created + chrono::Duration::minutes(5);
        category.replace(
            CategoryFields {
                title: "Bands".into(),
                subtitle: "Platinum".into(),
                image_url: String::new(),
            },
            later,
        );

        assert_eq!(category.created_at, created);
        assert_eq!(category.updated_at, Some(later));
        assert_eq!(category.image_url, "");
    }

    #[test]
    fn missing_gallery_becomes_four_empty_slots() {
        let payload: ItemPayload = serde_json::from_value(json!({
            "name": "Rajkot",
            "description": "18K band"
        }))
        .unwrap();
        let fields = payload.into_fields().unwrap();
        assert_eq!(fields.gallery, Gallery::default());
        assert_eq!(fields.gallery.slots(), ["", "", "", ""]);
    }

    #[test]
    fn partial_gallery_fills_missing_slots() {
        let payload: ItemPayload = serde_json::from_value(json!({
            "name": "Surat",
            "description": "22K band",
            "gallery": { "image": "/rings/ring_005.jpg", "side2": null }
        }))
        .unwrap();
        let gallery = payload.into_fields().unwrap().gallery;
        assert_eq!(gallery.slots(), ["/rings/ring_005.jpg", "", "", ""]);
    }

    #[test]
    fn item_price_must_be_positive_when_present() {
        for price in [0.0, -12.5] {
            let payload = ItemPayload {
                name: Some("Mumbai".into()),
                description: Some("18K".into()),
                price: Some(price),
                ..Default::default()
            };
            assert_eq!(payload.into_fields(), Err(ValidationError::Price));
        }

        let payload = ItemPayload {
            name: Some("Mumbai".into()),
            description: Some("18K".into()),
            ..Default::default()
        };
        assert_eq!(payload.into_fields().unwrap().price, None);
    }

    #[test]
    fn item_requires_name_and_description() {
        let payload = ItemPayload {
            name: Some("Mumbai".into()),
            ..Default::default()
        };
        assert_eq!(payload.into_fields(), Err(ValidationError::ItemFields));

        let blank = ItemPayload {
            name: Some(" \t".into()),
            description: Some("18K".into()),
            ..Default::default()
        };
        assert_eq!(blank.into_fields(), Err(ValidationError::ItemFields));

        // A bad price does not hide the missing description
        let both = ItemPayload {
            name: Some("Mumbai".into()),
            description: Some(String::new()),
            price: Some(-1.0),
            ..Default::default()
        };
        assert_eq!(both.into_fields(), Err(ValidationError::ItemFields));
    }

    #[test]
    fn empty_category_reference_is_dropped() {
        let payload = ItemPayload {
            name: Some("Mumbai".into()),
            description: Some("18K".into()),
            category_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(payload.into_fields().unwrap().category_id, None);
    }

    #[test]
    fn update_request_reads_id_next_to_fields() {
        let request: ItemUpdateRequest = serde_json::from_value(json!({
            "id": "65a1f0c2e4b0a1b2c3d4e5f6",
            "name": "Rajkot",
            "description": "18K band",
            "netWeight": "1.210 gm"
        }))
        .unwrap();
        assert_eq!(request.id.as_deref(), Some("65a1f0c2e4b0a1b2c3d4e5f6"));
        assert_eq!(request.fields.net_weight.as_deref(), Some("1.210 gm"));
    }

    #[test]
    fn item_serializes_camel_case_with_gallery() {
        let fields = ItemPayload {
            name: Some("Rajkot".into()),
            description: Some("18K band".into()),
            article_code: Some("RK1001".into()),
            ..Default::default()
        }
        .into_fields()
        .unwrap();
        let item = Item::new(fields, Utc::now());
        let value = serde_json::to_value(&item).unwrap();

        assert_eq!(value["articleCode"], "RK1001");
        assert_eq!(value["gallery"], json!({"image": "", "side1": "", "side2": "", "side3": ""}));
        assert!(value.get("price").is_none());
        assert!(value["createdAt"].is_string());
        assert_eq!(value["id"], item.id.to_string());
    }
}
