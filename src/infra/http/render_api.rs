use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use metrics::counter;
use serde::Deserialize;
use tracing::debug;

use crate::application::render::RenderEnv;
use crate::domain::blocks::ContentNode;

use super::HttpState;

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub blocks: Vec<ContentNode>,
    #[serde(default)]
    pub env: RenderEnv,
}

/// `POST /render` — render a content tree into a view tree.
///
/// Individual malformed nodes were already tolerated at deserialization
/// (unknown kinds) and inside the walker (missing payloads); the response
/// always carries whatever rendered.
pub async fn render_tree(
    State(state): State<HttpState>,
    Json(request): Json<RenderRequest>,
) -> Response {
    counter!("vitrine_render_request_total").increment(1);
    debug!(
        target = "vitrine::http::render",
        blocks = request.blocks.len(),
        interactive = request.env.interactive,
        "render request"
    );
    let output = state.render.render(&request.blocks, request.env);
    Json(output).into_response()
}
