//! University Records Backend
//!
//! A REST backend over SQLite for students, instructors, courses,
//! departments and enrollments.

mod api;
mod associations;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod paging;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let (plain_layer, json_layer) = if config.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(plain_layer)
        .with(json_layer)
        .init();

    tracing::info!("Starting University Records Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!("Page size: {}", config.page_size);

    if config.maintenance_key.is_none() {
        tracing::warn!(
            "No maintenance key configured (UNIVERSITY_MAINTENANCE_KEY). Maintenance routes are open!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;

    if config.seed && db::seed_if_empty(&pool).await? {
        tracing::info!("Sample data loaded");
    }

    let repo = Arc::new(Repository::new(pool));

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone the key for the maintenance guard
    let maintenance_key = state.config.maintenance_key.clone();

    // API routes
    let api_routes = Router::new()
        // Students
        .route("/students", get(api::list_students))
        .route("/students", post(api::create_student))
        .route("/students/{id}", get(api::get_student))
        .route("/students/{id}", put(api::update_student))
        .route("/students/{id}", delete(api::delete_student))
        .route("/students/{id}/delete", get(api::confirm_delete_student))
        // Instructors
        .route("/instructors", get(api::list_instructors))
        .route("/instructors", post(api::create_instructor))
        .route("/instructors/new", get(api::new_instructor))
        .route("/instructors/{id}", get(api::get_instructor))
        .route("/instructors/{id}", put(api::update_instructor))
        .route("/instructors/{id}", delete(api::delete_instructor))
        .route("/instructors/{id}/edit", get(api::edit_instructor))
        .route("/instructors/{id}/office", get(api::get_office))
        .route("/instructors/{id}/office", put(api::set_office))
        .route("/instructors/{id}/office", delete(api::delete_office))
        // Courses
        .route("/courses", get(api::list_courses))
        .route("/courses", post(api::create_course))
        .route("/courses/new", get(api::new_course))
        .route(
            "/courses/credits",
            post(api::update_credits).route_layer(middleware::from_fn(move |req, next| {
                auth::maintenance_key_layer(maintenance_key.clone(), req, next)
            })),
        )
        .route("/courses/{id}", get(api::get_course))
        .route("/courses/{id}", put(api::update_course))
        .route("/courses/{id}", delete(api::delete_course))
        .route("/courses/{id}/edit", get(api::edit_course))
        // Departments
        .route("/departments", get(api::list_departments))
        .route("/departments", post(api::create_department))
        .route("/departments/{id}", get(api::get_department))
        .route("/departments/{id}", put(api::update_department))
        .route("/departments/{id}", delete(api::delete_department))
        // Enrollments
        .route("/enrollments", get(api::list_enrollments))
        .route("/enrollments", post(api::create_enrollment))
        .route("/enrollments/{id}", get(api::get_enrollment))
        .route("/enrollments/{id}", put(api::update_enrollment))
        .route("/enrollments/{id}", delete(api::delete_enrollment))
        // Statistics
        .route("/stats/enrollment-dates", get(api::enrollment_dates));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
