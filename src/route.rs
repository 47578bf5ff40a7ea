//! Route definitions for the catalogue API
//!
//! This module configures all HTTP routes and maps them to their respective handlers.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;

use crate::auth::{login, logout, session_status};
use crate::database::AppState;
use crate::handler::{
    create_category, create_item, delete_category, delete_item, delete_item_by_path,
    get_category, get_item, healthz, list_categories, list_items, update_category, update_item,
    update_item_by_path,
};
use crate::middleware::require_admin;
use crate::upload::{upload_image, UPLOADS_ROUTE};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// Public:
/// - `GET /healthz`
/// - `GET /api/catalogue`, `GET /api/catalogue/{id}`
/// - `GET /api/items`, `GET /api/items/{id}`
/// - `POST /api/login`, `POST /api/logout`, `GET /api/session`
/// - `GET /uploads/{file}`
///
/// Admin session required:
/// - `POST /api/catalogue`, `PUT|DELETE /api/catalogue/{id}`
/// - `POST|PUT|DELETE /api/items`, `PUT|DELETE /api/items/{id}`
/// - `POST /api/upload`
///
/// # Example Usage
///
/// ```no_run
/// # use jewellery_catalogue::config::AppConfig;
/// # use jewellery_catalogue::database::{init_db, AppState};
/// # use jewellery_catalogue::route::create_app;
/// # let db = init_db("data.db").unwrap();
/// let state = AppState::new(db, AppConfig::default());
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD;

    let public_api = Router::new()
        .route("/catalogue", get(list_categories))
        .route("/catalogue/{id}", get(get_category))
        .route("/items", get(list_items))
        .route("/items/{id}", get(get_item))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(session_status));

    // Write routes that require a dashboard session. The guard sits on each
    // method router so unsupported methods still answer 405.
    let guard = middleware::from_fn_with_state(state.clone(), require_admin);
    let admin_api = Router::new()
        .route(
            "/catalogue",
            post(create_category).route_layer(guard.clone()),
        )
        .route(
            "/catalogue/{id}",
            put(update_category)
                .delete(delete_category)
                .route_layer(guard.clone()),
        )
        .route(
            "/items",
            post(create_item)
                .put(update_item)
                .delete(delete_item)
                .route_layer(guard.clone()),
        )
        .route(
            "/items/{id}",
            put(update_item_by_path)
                .delete(delete_item_by_path)
                .route_layer(guard.clone()),
        )
        .route(
            "/upload",
            post(upload_image)
                .layer(DefaultBodyLimit::max(upload_limit))
                .route_layer(guard),
        );

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api", public_api.merge(admin_api))
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&state.config.upload_dir))
        .with_state(state)
}
