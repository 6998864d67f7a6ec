//! Security headers middleware.
//!
//! The back-office policy is stricter than the storefront's: no map tiles
//! and no geolocation, only the CDN serving htmx.

use axum::{
    extract::Request,
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;

/// CDN serving htmx and its SSE extension.
pub const CDN_ORIGIN: &str = "https://unpkg.com";

/// Build the CSP for one response.
#[must_use]
pub fn content_security_policy(nonce: &str) -> String {
    format!(
        "default-src 'none'; \
         script-src 'nonce-{nonce}' {CDN_ORIGIN}; \
         style-src 'self' 'nonce-{nonce}'; \
         img-src 'self' data: https:; \
         connect-src 'self'; \
         form-action 'self'; \
         base-uri 'none'; \
         frame-ancestors 'none'"
    )
}

/// Add security headers to all responses.
///
/// Pages carry tenant data, so they are also marked `no-store`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let nonce = request
        .extensions()
        .get::<CspNonce>()
        .map(|n| n.value().to_string())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("no-referrer"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    if let Ok(value) = HeaderValue::from_str(&content_security_policy(&nonce)) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), geolocation=(), microphone=(), payment=(), usb=()"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_allows_only_nonce_and_cdn_scripts() {
        let policy = content_security_policy("n0nce");
        assert!(policy.contains("script-src 'nonce-n0nce' https://unpkg.com;"));
        assert!(!policy.contains("'unsafe-inline'"));
        assert!(policy.contains("form-action 'self'"));
    }
}
