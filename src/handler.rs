//! HTTP request handlers for the catalogue and item resources
//!
//! - Categories: list, get, create, replace and delete, addressed by path id
//! - Items: list (optionally by category, with storefront filters), get,
//!   create, replace and delete, addressed by path id or by an `id` field
//!   in the request body
//!
//! Reads are public. Writes sit behind `require_admin`, which puts the
//! caller's [`Session`] in the request extensions.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::database::AppState;
use crate::error::ApiError;
use crate::filter::{CatalogueView, Material, SortKey, SortOrder};
use crate::model::{
    Category, CategoryPayload, DeleteItemRequest, DocumentId, Item, ItemPayload,
    ItemUpdateRequest, Session, ValidationError,
};
use crate::repository;

fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    Ok(raw.trim().parse::<DocumentId>()?)
}

/// Liveness probe.
pub async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// `GET /api/catalogue` - every category, newest first.
pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let items = repository::list_categories(&state.db)?;
    debug!(count = items.len(), "listed categories");
    Ok(Json(json!({ "items": items })))
}

/// `GET /api/catalogue/{id}`
///
/// - **400 Bad Request** - id is not 24 hex characters
/// - **404 Not Found** - no category with that id
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let item = repository::get_category(&state.db, &id)?
        .ok_or(ApiError::NotFound("Category not found"))?;
    Ok(Json(json!({ "item": item })))
}

/// Creates a new category
///
/// # Request Body
///
/// ```json
/// { "title": "Rings", "subtitle": "Everyday gold", "imageUrl": "https://..." }
/// ```
///
/// # Response
///
/// - **201 Created** - `{ "success": true, "item": { ... } }`
/// - **400 Bad Request** - title or subtitle missing
pub async fn create_category(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let category = Category::new(payload.into_fields()?, Utc::now());

    repository::insert_category(&state.db, &category)?;
    info!(id = %category.id, by = %session.username, "created category");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "item": category })),
    ))
}

/// Replaces a category's title, subtitle and image
///
/// Omitted optional fields are cleared, not preserved. `createdAt` never
/// changes; `updatedAt` is set to now.
pub async fn update_category(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    payload: Result<Json<CategoryPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let fields = payload.into_fields()?;

    let item = repository::replace_category(&state.db, &id, fields, Utc::now())?
        .ok_or(ApiError::NotFound("Category not found"))?;
    info!(id = %item.id, by = %session.username, "updated category");

    Ok(Json(json!({ "success": true, "item": item })))
}

/// Deletes a category. Items that reference it stay in place.
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    if !repository::delete_category(&state.db, &id)? {
        return Err(ApiError::NotFound("Category not found"));
    }
    info!(id = %id, by = %session.username, "deleted category");

    Ok(Json(json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

/// Query parameters for listing items
///
/// # Example
/// Query string: `?categoryId=65a1f0c2e4b0a1b2c3d4e5f6&search=raj&sort=weight&order=desc`
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsParams {
    /// Exact category reference to match. Empty means "all items".
    pub category_id: Option<String>,
    /// Matches design-name words by prefix, or anywhere in the article code
    pub search: Option<String>,
    pub material: Option<Material>,
    /// Replaces the default newest-first order when present
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
}

impl ListItemsParams {
    fn view(&self) -> CatalogueView {
        CatalogueView {
            material: self.material.unwrap_or_default(),
            search: self.search.clone().unwrap_or_default(),
            sort: self.sort,
            order: self.order.unwrap_or_default(),
        }
    }
}

/// Lists items, newest first
///
/// # Query Parameters
///
/// - `categoryId` (optional) - only items whose `categoryId` equals it
/// - `search`, `material`, `sort` (`name` | `weight`), `order` (`asc` | `desc`)
///
/// A category with no items yields an empty list, never an error.
pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<ListItemsParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    let category_id = params.category_id.as_deref().filter(|id| !id.is_empty());

    let items = repository::list_items(&state.db, category_id)?;
    let items = params.view().apply(items);
    debug!(count = items.len(), category_id = ?category_id, "listed items");

    Ok(Json(json!({ "items": items })))
}

/// `GET /api/items/{id}`
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&id)?;
    let item = repository::get_item(&state.db, &id)?.ok_or(ApiError::NotFound("Item not found"))?;
    Ok(Json(json!({ "item": item })))
}

/// Creates a new item
///
/// `name` and `description` are required; `price` must be positive when
/// given. A missing or partial `gallery` is filled with empty strings.
pub async fn create_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let item = Item::new(payload.into_fields()?, Utc::now());

    repository::insert_item(&state.db, &item)?;
    info!(id = %item.id, category_id = ?item.category_id, by = %session.username, "created item");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "item": item })),
    ))
}

fn replace_item(
    state: &AppState,
    session: &Session,
    raw_id: &str,
    payload: ItemPayload,
) -> Result<Json<serde_json::Value>, ApiError> {
    let fields = payload.into_fields()?;
    let id = parse_id(raw_id)?;

    let item = repository::replace_item(&state.db, &id, fields, Utc::now())?
        .ok_or(ApiError::NotFound("Item not found"))?;
    info!(id = %item.id, by = %session.username, "updated item");

    Ok(Json(json!({ "success": true, "item": item })))
}

fn remove_item(
    state: &AppState,
    session: &Session,
    raw_id: &str,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = parse_id(raw_id)?;
    let item = repository::delete_item(&state.db, &id)?.ok_or(ApiError::NotFound("Item not found"))?;
    info!(id = %item.id, by = %session.username, "deleted item");

    Ok(Json(json!({
        "success": true,
        "message": "Item deleted successfully",
        "deletedId": item.id
    })))
}

fn body_id(id: Option<String>) -> Result<String, ApiError> {
    Ok(id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingId)?)
}

/// Replaces an item whose id travels in the body
///
/// # Request Body
///
/// ```json
/// { "id": "65a1f0c2e4b0a1b2c3d4e5f6", "name": "...", "description": "..." }
/// ```
///
/// # Response
///
/// - **200 OK** - `{ "success": true, "item": { ... } }`
/// - **400 Bad Request** - id missing or malformed, required fields missing
/// - **404 Not Found** - no item with that id
pub async fn update_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<ItemUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let id = body_id(request.id)?;
    replace_item(&state, &session, &id, request.fields)
}

/// `PUT /api/items/{id}`, same semantics as [`update_item`].
pub async fn update_item_by_path(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
    payload: Result<Json<ItemPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    replace_item(&state, &session, &id, payload)
}

/// Deletes an item whose id travels in the body
///
/// # Response
///
/// ```json
/// { "success": true, "message": "Item deleted successfully", "deletedId": "..." }
/// ```
pub async fn delete_item(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    payload: Result<Json<DeleteItemRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let id = body_id(request.id)?;
    remove_item(&state, &session, &id)
}

/// `DELETE /api/items/{id}`, same semantics as [`delete_item`].
pub async fn delete_item_by_path(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    remove_item(&state, &session, &id)
}
