use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use eventease_core::identity::IdentityProvider;
use eventease_core::{Caller, CoreError, CoreResult, Role};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
    pub exp: usize,
}

// ============================================================================
// Identity Provider
// ============================================================================

/// Verifies HS256 bearer tokens minted by the account service.
pub struct JwtIdentityProvider {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue_token(&self, caller: &Caller, ttl_seconds: u64) -> Result<String, AppError> {
        let claims = Claims {
            sub: caller.id.clone(),
            name: caller.display_name.clone(),
            role: caller.role.as_str().to_owned(),
            exp: (Utc::now() + Duration::seconds(ttl_seconds as i64)).timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: &str) -> CoreResult<Caller> {
        let token_data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|e| CoreError::AuthorizationError(format!("invalid token: {}", e)))?;

        let claims = token_data.claims;
        let role: Role = claims.role.parse()?;
        Ok(Caller {
            id: claims.sub,
            role,
            display_name: claims.name,
        })
    }
}

// ============================================================================
// Caller Authentication Middleware
// ============================================================================

/// Resolves the bearer token into a [`Caller`] and injects it into request
/// extensions. Handlers pass that caller explicitly into the engine.
pub async fn caller_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(Authorization(bearer)) = bearer
        .ok_or_else(|| AppError::AuthenticationError("missing bearer token".to_string()))?;

    let caller = state
        .identity
        .resolve(bearer.token())
        .await
        .map_err(|e| AppError::AuthenticationError(e.to_string()))?;

    tracing::debug!(caller = %caller.id, role = %caller.role, "Caller authenticated");
    req.extensions_mut().insert(caller);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_round_trip() {
        let provider = JwtIdentityProvider::new("test-secret");
        let organizer = Caller::organizer("org-1", "Premium Events Ltd");
        let token = provider.issue_token(&organizer, 60).unwrap();

        let resolved = provider.resolve(&token).await.unwrap();
        assert_eq!(resolved, organizer);
    }

    #[tokio::test]
    async fn test_foreign_signature_rejected() {
        let minted = JwtIdentityProvider::new("other-secret")
            .issue_token(&Caller::admin("admin-1"), 60)
            .unwrap();
        let result = JwtIdentityProvider::new("test-secret").resolve(&minted).await;
        assert!(matches!(result, Err(CoreError::AuthorizationError(_))));
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let provider = JwtIdentityProvider::new("test-secret");
        let claims = Claims {
            sub: "someone".to_string(),
            name: None,
            role: "GUEST".to_string(),
            exp: (Utc::now() + Duration::seconds(60)).timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(provider.resolve(&token).await.is_err());
    }
}
