use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use crate::routes::auth::claims::TokenUse;
use crate::utils::jwt::SessionTokenSource;

pub const AUTH_COOKIE: &str = "auth_token";

/// The signed-in user behind a request, taken from the session cookie or a
/// bearer header.
#[derive(Debug, PartialEq)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: Option<String>,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: SessionTokenSource + Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(AUTH_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => bearer_token(parts)
                .ok_or(StatusCode::UNAUTHORIZED)?
                .to_string(),
        };

        let claims = state.session_tokens().verify(&token).map_err(|err| {
            debug!(?err, "session token rejected");
            StatusCode::UNAUTHORIZED
        })?;

        if claims.token_use != TokenUse::Access {
            return Err(StatusCode::UNAUTHORIZED);
        }

        Ok(AuthSession {
            user_id: claims.user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        extract::FromRequestParts,
        http::{header, Method, Request, StatusCode},
    };
    use axum_extra::extract::cookie::Cookie;
    use uuid::Uuid;

    use super::{AuthSession, AUTH_COOKIE};
    use crate::utils::jwt::test_support::{access_token, claims_for, mint, verifier};
    use crate::utils::jwt::{SessionTokenSource, SessionTokenVerifier};

    struct TestState {
        verifier: SessionTokenVerifier,
    }

    impl SessionTokenSource for TestState {
        fn session_tokens(&self) -> &SessionTokenVerifier {
            &self.verifier
        }
    }

    fn state() -> TestState {
        TestState {
            verifier: verifier(),
        }
    }

    async fn extract(
        state: &TestState,
        name: header::HeaderName,
        value: String,
    ) -> Result<AuthSession, StatusCode> {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/")
            .header(name, value)
            .body(())
            .unwrap();
        let mut parts = request.into_parts().0;
        AuthSession::from_request_parts(&mut parts, state).await
    }

    #[tokio::test]
    async fn test_valid_cookie_extracted() {
        let state = state();
        let user_id = Uuid::new_v4();
        let cookie = Cookie::new(AUTH_COOKIE, access_token(user_id));

        let session = extract(&state, header::COOKIE, cookie.to_string())
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.email.as_deref(), Some("test@example.com"));
    }

    #[tokio::test]
    async fn test_bearer_header_extracted() {
        let state = state();
        let user_id = Uuid::new_v4();
        let jwt = access_token(user_id);

        let session = extract(&state, header::AUTHORIZATION, format!("Bearer {jwt}"))
            .await
            .unwrap();
        assert_eq!(session.user_id, user_id);
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let state = state();
        let request = Request::builder().uri("/").body(()).unwrap();
        let mut parts = request.into_parts().0;
        let result = AuthSession::from_request_parts(&mut parts, &state).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_refresh_token_rejected() {
        let state = state();
        let jwt = mint(&claims_for(&Uuid::new_v4().to_string(), "refresh", 3600));
        let result = extract(&state, header::AUTHORIZATION, format!("Bearer {jwt}")).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_uuid_subject_rejected() {
        let state = state();
        let jwt = mint(&claims_for("user_id_123", "access", 3600));
        let cookie = Cookie::new(AUTH_COOKIE, jwt);
        let result = extract(&state, header::COOKIE, cookie.to_string()).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let state = state();
        let jwt = mint(&claims_for(&Uuid::new_v4().to_string(), "access", -60));
        let result = extract(&state, header::AUTHORIZATION, format!("Bearer {jwt}")).await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_rejected() {
        let state = state();
        let result = extract(
            &state,
            header::AUTHORIZATION,
            "Bearer not-a-jwt".to_string(),
        )
        .await;
        assert_eq!(result.unwrap_err(), StatusCode::UNAUTHORIZED);
    }
}
