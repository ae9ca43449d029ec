use anyhow::{Result, bail};
use axum::http::{HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Browser access for the planner frontend.
///
/// The API only has JSON posts and health reads. An empty list (or `*`)
/// admits any origin. Any other entry must be a valid `scheme://host` origin,
/// otherwise the whole layer is rejected.
pub fn build_cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
        return Ok(layer.allow_origin(AllowOrigin::any()));
    }

    let allowed = origins
        .iter()
        .map(|origin| parse_origin(origin))
        .collect::<Result<Vec<_>>>()?;

    Ok(layer.allow_origin(AllowOrigin::list(allowed)))
}

fn parse_origin(origin: &str) -> Result<HeaderValue> {
    let Some((scheme, host)) = origin.split_once("://") else {
        bail!("Invalid CORS origin {:?}: expected scheme://host", origin);
    };
    if scheme.is_empty()
        || host.is_empty()
        || host.contains(|c: char| c == '/' || c.is_whitespace())
    {
        bail!("Invalid CORS origin {:?}: expected scheme://host", origin);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => Ok(value),
        Err(_) => bail!("Invalid CORS origin {:?}: not a valid header value", origin),
    }
}
