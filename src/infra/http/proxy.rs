//! Same-origin asset proxy.
//!
//! Streams external media through this origin so browsers never talk to the
//! signed-storage hosts directly. `Range` requests are forwarded and the
//! partial-content headers relayed so large video scrubs correctly.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{ACCEPT_RANGES, CACHE_CONTROL, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE},
    },
    response::{IntoResponse, Response},
};
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::application::error::HttpError;
use crate::config::ProxySettings;
use crate::infra::error::InfraError;

use super::HttpState;

/// Upstream response headers relayed to the client verbatim.
const RELAYED_HEADERS: [axum::http::HeaderName; 4] =
    [CONTENT_TYPE, CONTENT_LENGTH, CONTENT_RANGE, ACCEPT_RANGES];

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    cache_control: HeaderValue,
}

impl ProxyState {
    pub fn new(settings: &ProxySettings) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| {
                InfraError::configuration(format!("failed to build proxy client: {err}"))
            })?;

        let directive = format!(
            "public, s-maxage={}, stale-while-revalidate={}",
            settings.cache_max_age_secs, settings.stale_while_revalidate_secs
        );
        let cache_control = HeaderValue::from_str(&directive).map_err(|err| {
            InfraError::configuration(format!("invalid proxy cache directive: {err}"))
        })?;

        Ok(Self {
            client,
            cache_control,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub src: Option<String>,
}

pub async fn proxy_asset(
    State(state): State<HttpState>,
    Query(query): Query<ProxyQuery>,
    headers: HeaderMap,
) -> Response {
    const SOURCE: &str = "infra::http::proxy::proxy_asset";

    counter!("vitrine_proxy_request_total").increment(1);

    let Some(src) = query.src.filter(|src| !src.is_empty()) else {
        counter!("vitrine_proxy_rejected_total").increment(1);
        return HttpError::new(
            SOURCE,
            StatusCode::BAD_REQUEST,
            "Missing src parameter",
            "proxy request without `src`",
        )
        .into_response();
    };

    match Url::parse(&src) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => {
            counter!("vitrine_proxy_rejected_total").increment(1);
            return HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Unsupported src URL",
                format!("refusing to proxy `{src}`"),
            )
            .into_response();
        }
    }

    let mut upstream_request = state.proxy.client.get(&src);
    if let Some(range) = headers.get(RANGE)
        && let Ok(range) = range.to_str()
    {
        upstream_request = upstream_request.header(RANGE.as_str(), range);
    }

    let upstream = match upstream_request.send().await {
        Ok(upstream) => upstream,
        Err(err) => {
            counter!("vitrine_proxy_upstream_error_total").increment(1);
            warn!(
                target = "vitrine::http::proxy",
                error = %err,
                "upstream fetch failed"
            );
            return HttpError::from_error(
                SOURCE,
                StatusCode::BAD_GATEWAY,
                "Upstream resource unavailable",
                &err,
            )
            .into_response();
        }
    };

    let status =
        StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        counter!("vitrine_proxy_upstream_error_total").increment(1);
        debug!(
            target = "vitrine::http::proxy",
            status = status.as_u16(),
            "relaying upstream error status"
        );
        return status.into_response();
    }

    let mut relayed = HeaderMap::new();
    for name in RELAYED_HEADERS {
        if let Some(value) = upstream.headers().get(name.as_str())
            && let Ok(value) = HeaderValue::from_bytes(value.as_bytes())
        {
            relayed.insert(name, value);
        }
    }
    relayed.insert(CACHE_CONTROL, state.proxy.cache_control.clone());

    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;
    response
}
