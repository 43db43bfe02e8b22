mod middleware;
mod proxy;
mod render_api;

pub use proxy::ProxyState;

use axum::{Router, http::StatusCode, middleware::from_fn, routing::get, routing::post};

use crate::application::render::RenderService;
use crate::config::Settings;
use crate::infra::error::InfraError;

#[derive(Clone)]
pub struct HttpState {
    pub render: RenderService,
    pub proxy: ProxyState,
}

impl HttpState {
    pub fn new(settings: &Settings) -> Result<Self, InfraError> {
        Ok(Self {
            render: RenderService::new(&settings.render),
            proxy: ProxyState::new(&settings.proxy)?,
        })
    }
}

pub fn build_router(state: HttpState, settings: &Settings) -> Router {
    Router::new()
        .route("/render", post(render_api::render_tree))
        .route(&settings.render.proxy_path, get(proxy::proxy_asset))
        .route("/_health", get(health))
        .layer(from_fn(middleware::log_responses))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
