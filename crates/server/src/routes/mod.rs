pub mod credentials;
pub mod export;
pub mod extract;
pub mod forms;
pub mod health;
pub mod history;
pub mod metrics;
pub mod recording;
pub mod sessions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

use crate::config::Config;
use crate::state::AppState;

/// Build the API routes
pub fn api_routes(config: &Config) -> Router<AppState> {
    Router::new()
        .route("/forms", get(forms::list))
        .route("/forms/{form}/schema", get(forms::schema))
        .route("/sessions", post(sessions::create))
        .route("/sessions/{id}", get(sessions::read).delete(sessions::remove))
        .route("/sessions/{id}/form", put(sessions::select_form))
        .route("/sessions/{id}/identity", put(sessions::set_identity))
        .route(
            "/sessions/{id}/document",
            get(sessions::document).patch(sessions::edit_field),
        )
        .route(
            "/sessions/{id}/extract",
            post(extract::run)
                .delete(extract::cancel)
                .layer(DefaultBodyLimit::max(config.extract_body_limit())),
        )
        .route("/sessions/{id}/recording/start", post(recording::start))
        .route("/sessions/{id}/recording/chunk", post(recording::chunk))
        .route("/sessions/{id}/recording/stop", post(recording::stop))
        .route("/sessions/{id}/export", get(export::download))
        .route("/sessions/{id}/print", get(export::print))
        .route(
            "/sessions/{id}/history/{entry}/load",
            post(history::load),
        )
        .route("/history", get(history::list))
        .route("/history/stats", get(history::stats))
        .route("/credentials", post(credentials::set))
}
