// src/routes.rs
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderName, HeaderValue, Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::auth::USER_ID_HEADER;
use crate::handlers::{self, AppState};

pub fn create_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/polls", get(handlers::list_polls).post(handlers::create_poll))
        .route("/polls/{id}", get(handlers::get_poll))
        .route("/polls/{id}/vote", post(handlers::vote));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .with_state(state)
}

pub fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(allowed_origin) {
        Ok(value) => AllowOrigin::exact(value),
        Err(_) => AllowOrigin::list(Vec::<HeaderValue>::new()),
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            CONTENT_TYPE,
            AUTHORIZATION,
            HeaderName::from_static(USER_ID_HEADER),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}
