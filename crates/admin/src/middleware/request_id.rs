//! Request correlation IDs for the backoffice.
//!
//! Only a well-formed UUID from upstream is kept; anything else is replaced
//! with a fresh v4. The ID is recorded on the request span, tagged in Sentry
//! and echoed in the response.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

fn upstream_id(request: &Request) -> Option<Uuid> {
    let raw = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(raw.trim()).ok()
}

pub async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = upstream_id(&request).unwrap_or_else(Uuid::new_v4);
    let hyphenated = request_id.hyphenated().to_string();

    Span::current().record("request_id", hyphenated.as_str());
    sentry::configure_scope(|scope| scope.set_tag("request_id", &hyphenated));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&hyphenated) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
