//! API server initialization
//!
//! One router per service surface, each behind its own admission
//! middleware. Admission therefore runs before any handler body and
//! before any streaming loop attaches to the bus.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::{Json, Router, middleware};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth::AuthState;
use super::auth::middleware::{
    require_access, require_admin, require_competitor, require_super_admin,
};
use super::routes::{admin, auth, competition, superadmin, team};
use crate::core::CoreApp;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    pub async fn start(self) -> Result<()> {
        let app = self.app;
        let pool = app.db.pool().clone();
        let auth_state = AuthState {
            pool: pool.clone(),
            key: app.key.clone(),
        };

        let auth_routes = auth::routes(pool.clone(), app.key.clone(), app.mailer.clone());

        let team_routes = team::routes(app.teams.clone()).layer(
            middleware::from_fn_with_state(auth_state.clone(), require_access),
        );

        let competition_routes = Router::new()
            .merge(
                competition::gated_routes(pool.clone(), app.bus.clone()).layer(
                    middleware::from_fn_with_state(auth_state.clone(), require_competitor),
                ),
            )
            .merge(competition::public_routes(pool.clone(), app.bus.clone()));

        let admin_routes = admin::routes(pool.clone(), app.bus.clone()).layer(
            middleware::from_fn_with_state(auth_state.clone(), require_admin),
        );

        let superadmin_routes = superadmin::routes(pool.clone(), app.bus.clone()).layer(
            middleware::from_fn_with_state(auth_state.clone(), require_super_admin),
        );

        let router = Router::new()
            .route("/health", get(health))
            .nest("/auth", auth_routes)
            .nest("/team", team_routes)
            .nest("/competition", competition_routes)
            .nest("/admin", admin_routes)
            .nest("/superadmin", superadmin_routes)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        let addr = SocketAddr::from(([0, 0, 0, 0], app.config.server.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {}", addr))?;
        tracing::info!(port = app.config.server.port, "Listening");

        axum::serve(listener, router)
            .await
            .context("server terminated")
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
