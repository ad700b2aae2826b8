use axum::{middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::admin::settings;
use crate::audit;
use crate::auth::middleware::JwtSecret;
use crate::moderation::{block, unblock};
use crate::roles::{assignment as role_assignment, crud as role_crud};
use crate::state::AppState;
use crate::tags;
use crate::users::registration;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Rate limiting: 5 registrations per minute per IP
    // Uses PeerIpKeyExtractor which reads from ConnectInfo<SocketAddr>
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(12) // 1 token every 12 seconds = 5 per minute
            .burst_size(5)  // Allow burst of 5
            .finish()
            .expect("Failed to build governor config"),
    );
    let governor_limiter = governor_config.limiter().clone();

    // Spawn background task to clean up rate limiter state
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    // Auth routes with rate limiting
    let auth_routes = Router::new()
        .route(
            "/api/auth/register",
            axum::routing::post(registration::register),
        )
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Public routes (no auth required, no rate limiting)
    let public_routes =
        Router::new().route("/api/server/info", axum::routing::get(settings::get_server_info));

    // Admin routes (JWT auth required — Claims extractor validates token)
    let admin_routes = Router::new().route(
        "/api/server/settings",
        axum::routing::put(settings::update_server_settings),
    );

    // Moderation: block placement, revocation, listing, and the audit log
    let moderation_routes = Router::new()
        .route("/api/moderation/block", axum::routing::post(block::block_user))
        .route(
            "/api/moderation/unblock",
            axum::routing::post(unblock::unblock_user),
        )
        .route("/api/moderation/blocks", axum::routing::get(block::list_blocks))
        .route("/api/moderation/log", axum::routing::get(audit::list_log));

    // Rights groups
    let role_routes = Router::new()
        .route("/api/roles", axum::routing::get(role_crud::list_roles))
        .route("/api/roles", axum::routing::post(role_crud::create_role))
        .route("/api/roles/{id}", axum::routing::put(role_crud::update_role))
        .route(
            "/api/roles/{id}",
            axum::routing::delete(role_crud::delete_role),
        )
        .route(
            "/api/roles/assign",
            axum::routing::post(role_assignment::assign_role),
        )
        .route(
            "/api/roles/remove",
            axum::routing::post(role_assignment::remove_role),
        );

    // Tag registry
    let tag_routes = Router::new()
        .route("/api/tags", axum::routing::get(tags::list_tags))
        .route("/api/tags", axum::routing::post(tags::define_tag));

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(public_routes)
        .merge(admin_routes)
        .merge(moderation_routes)
        .merge(role_routes)
        .merge(tag_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
