//! Authentication middleware and extractors for the back-office.
//!
//! Tenant pages live under `/{slug}/...`. The tenant extractors read the
//! slug from the matched path and only admit staff of that company, so a
//! handler that receives a [`TenantStaff`] never has to re-check ownership.

use axum::{
    extract::{FromRequestParts, RawPathParams, Request},
    http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use cardapio_core::{EmpresaId, Slug};
use tower_sessions::Session;

use crate::error::{SessionExpired, clear_sentry_user, set_sentry_user};
use crate::models::{CurrentUser, session_keys};

/// Login page path.
pub const LOGIN_PATH: &str = "/login";

/// A staff member acting on their own company.
#[derive(Debug, Clone)]
pub struct TenantStaff {
    pub user: CurrentUser,
    pub slug: Slug,
    pub empresa_id: EmpresaId,
}

/// Extractor for pages any tenant role may use (orders, cash register).
pub struct RequireStaff(pub TenantStaff);

/// Extractor for pages restricted to admins and managers.
pub struct RequireManager(pub TenantStaff);

/// Extractor for the company provisioning panel.
pub struct RequireSuperAdmin(pub CurrentUser);

/// Error returned when a request fails an authorization check.
#[derive(Debug)]
pub enum AuthRejection {
    /// Not logged in. HTMX requests get an `HX-Redirect` instead of a 303.
    RedirectToLogin { htmx: bool },
    /// Logged in, but not allowed here.
    Forbidden(&'static str),
    /// The URL does not name a company.
    NotFound,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { htmx: true } => hx_redirect(LOGIN_PATH),
            Self::RedirectToLogin { htmx: false } => Redirect::to(LOGIN_PATH).into_response(),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message).into_response(),
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Whether the request was issued by HTMX.
#[must_use]
pub fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Client-side redirect understood by HTMX.
#[must_use]
pub fn hx_redirect(location: &str) -> Response {
    let mut response = StatusCode::OK.into_response();
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert("hx-redirect", value);
    }
    response
}

async fn current_user(parts: &Parts) -> Result<CurrentUser, AuthRejection> {
    let htmx = is_htmx(&parts.headers);
    let session = parts
        .extensions
        .get::<Session>()
        .ok_or(AuthRejection::RedirectToLogin { htmx })?;

    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
        .ok_or(AuthRejection::RedirectToLogin { htmx })
}

async fn tenant_staff<S>(parts: &mut Parts, state: &S) -> Result<TenantStaff, AuthRejection>
where
    S: Send + Sync,
{
    let user = current_user(parts).await?;

    let params = RawPathParams::from_request_parts(parts, state)
        .await
        .map_err(|_| AuthRejection::NotFound)?;
    let slug = params
        .iter()
        .find(|(key, _)| *key == "slug")
        .and_then(|(_, value)| Slug::parse(value).ok())
        .ok_or(AuthRejection::NotFound)?;

    let empresa_id = user
        .empresa_em(&slug)
        .ok_or(AuthRejection::Forbidden("Você não tem acesso a esta empresa"))?;

    Ok(TenantStaff {
        user,
        slug,
        empresa_id,
    })
}

impl<S> FromRequestParts<S> for RequireStaff
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        tenant_staff(parts, state).await.map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireManager
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let staff = tenant_staff(parts, state).await?;
        if !staff.user.role.can_manage() {
            return Err(AuthRejection::Forbidden(
                "Apenas administradores e gerentes podem acessar esta página",
            ));
        }
        Ok(Self(staff))
    }
}

impl<S> FromRequestParts<S> for RequireSuperAdmin
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = current_user(parts).await?;
        if !user.is_super_admin() {
            return Err(AuthRejection::Forbidden(
                "Apenas super admins podem acessar esta página",
            ));
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_user(parts).await.ok()))
    }
}

/// Store the logged-in user, rotating the session id first.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await?;
    set_sentry_user(user.id.as_i32(), &user.email);
    Ok(())
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

/// Log the user out when a handler reports that the backend refused the
/// session token.
///
/// Must run inside the session layer.
pub async fn session_guard_middleware(session: Session, request: Request, next: Next) -> Response {
    let htmx = is_htmx(request.headers());
    let response = next.run(request).await;

    if response.extensions().get::<SessionExpired>().is_none() {
        return response;
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear expired session");
    }

    if htmx { hx_redirect(LOGIN_PATH) } else { response }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_htmx_login_redirect_uses_header() {
        let response = AuthRejection::RedirectToLogin { htmx: true }.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("hx-redirect").unwrap(), "/login");

        let response = AuthRejection::RedirectToLogin { htmx: false }.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get("location").unwrap(), "/login");
    }

    #[test]
    fn test_forbidden_rejection() {
        let response = AuthRejection::Forbidden("não").into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
