//! Clinic API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//!
//! Route groups and their guards:
//! - public: health, login, guest booking
//! - authenticated: any signed-in staff member
//! - admin: staff accounts and the doctor roster
//! - staff: prescriptions (admins and doctors)

use std::sync::Arc;

use axum::http::{header, HeaderValue};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Maximum accepted request body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Build the clinic API router over shared state.
pub fn clinic_api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);
    build_router(ctx)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin {
        None => CorsLayer::permissive(),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => CorsLayer::new()
                .allow_origin(value)
                .allow_methods(Any)
                .allow_headers(Any),
            Err(e) => {
                tracing::warn!(origin, "Ignoring invalid CORS origin: {e}");
                CorsLayer::new()
            }
        },
    }
}

fn build_router(ctx: ApiContext) -> Router {
    // Middleware uses `Extension<ApiContext>` (outermost layer); handlers use
    // `State<ApiContext>`. Path params use `:param` syntax (axum 0.7).
    let public = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/auth/login", post(endpoints::auth::login))
        .route("/appointments", post(endpoints::appointments::create))
        .with_state(ctx.clone());

    let authenticated = Router::new()
        .route("/auth/me", get(endpoints::auth::me))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/doctors", get(endpoints::doctors::list))
        .route("/appointments", get(endpoints::appointments::list))
        .route(
            "/appointments/:id",
            get(endpoints::appointments::detail)
                .put(endpoints::appointments::update)
                .patch(endpoints::appointments::update)
                .delete(endpoints::appointments::remove),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    let admin = Router::new()
        .route("/auth/register", post(endpoints::auth::register))
        .route("/doctors", post(endpoints::doctors::create))
        .route(
            "/doctors/:id",
            put(endpoints::doctors::update)
                .patch(endpoints::doctors::update)
                .delete(endpoints::doctors::remove),
        )
        .with_state(ctx.clone())
        // Innermost first: the role guard runs after auth
        .layer(axum::middleware::from_fn(middleware::auth::require_admin))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    let staff = Router::new()
        .route(
            "/prescriptions",
            get(endpoints::prescriptions::list).post(endpoints::prescriptions::create),
        )
        .route("/prescriptions/:id", get(endpoints::prescriptions::detail))
        .route("/prescriptions/:id/pdf", get(endpoints::prescriptions::pdf))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::auth::require_staff))
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    let api = public.merge(authenticated).merge(admin).merge(staff);

    Router::new()
        .nest("/api", api)
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(cors_layer(ctx.core.config.cors_origin.as_deref()))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx))
}
