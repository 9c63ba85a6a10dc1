use std::net::{Ipv6Addr, SocketAddr};

use axum::routing::get;
use context::ServerContext;
use flashmob_collab::Collab;
use log::info;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod admin;
mod auth;
mod context;
mod docs;
mod errors;
mod messages;
mod requests;
mod schemas;
mod serialized;
mod sessions;
mod users;
mod venues;

pub type Router = axum::Router<ServerContext>;

/// Starts the flashmob server, and serves until it fails
pub async fn run_server(collab: Collab, port: u16) -> std::io::Result<()> {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();
    let listener = TcpListener::bind(&addr).await?;

    info!("Listening on {}", addr);

    axum::serve(listener, router(collab)).await
}

/// Builds every route of the server on top of the collab system
pub fn router(collab: Collab) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest(
            "/sessions",
            sessions::router()
                .merge(requests::router())
                .merge(messages::router()),
        )
        .nest("/venues", venues::router())
        .nest("/admin", admin::router());

    Router::new()
        .nest("/v1", version_one_router)
        .route("/health", get(health))
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(ServerContext {
            collab: collab.into(),
        })
}

async fn health() -> &'static str {
    "OK"
}
