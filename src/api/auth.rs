use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::value_objects::{Actor, Role, UserId};

use super::{error::ApiError, handlers::AppState};

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: UserId, role: Role, exp: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            user_id: user_id.value(),
            role,
            exp,
        }
    }

    /// Create a new HS256 token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{EncodingKey, Header, encode};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and validate a token (signature and expiry)
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{DecodingKey, Validation, decode};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(UserId::new(self.user_id), self.role)
    }
}

/// 認証済みのアクター
///
/// `Authorization: Bearer <JWT>`ヘッダーから抽出する。
pub struct AuthenticatedActor(pub Actor);

impl AuthenticatedActor {
    /// パスの利用者IDにアクセスできるか確認する
    ///
    /// 本人または職員（司書・管理者）のみ許可する。
    pub fn ensure_can_access(&self, user_id: UserId) -> Result<(), ApiError> {
        if self.0.id == user_id || self.0.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("forbidden".to_string()))
        }
    }

    /// 職員のみ許可する
    pub fn ensure_staff(&self) -> Result<(), ApiError> {
        if self.0.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "{} is not allowed to list all requests",
                self.0.role
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedActor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError::Unauthorized("invalid authorization header format".to_string())
        })?;

        let claims = Claims::from_token(token, &state.jwt_secret)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        Ok(AuthenticatedActor(claims.actor()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_token_round_trip_preserves_actor() {
        let claims = Claims::new(UserId::new(3), Role::Librarian, far_future());
        let token = claims.create_token(SECRET).unwrap();

        let parsed = Claims::from_token(&token, SECRET).unwrap();
        assert_eq!(parsed.actor(), Actor::new(UserId::new(3), Role::Librarian));
        assert_eq!(parsed.sub, "3");
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let claims = Claims::new(UserId::new(3), Role::Member, far_future());
        let token = claims.create_token("other-secret").unwrap();

        assert!(Claims::from_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let expired = chrono::Utc::now().timestamp() - 3600;
        let token = Claims::new(UserId::new(3), Role::Member, expired)
            .create_token(SECRET)
            .unwrap();

        assert!(Claims::from_token(&token, SECRET).is_err());
    }

    #[test]
    fn test_member_can_only_access_own_path() {
        let actor = AuthenticatedActor(Actor::new(UserId::new(1), Role::Member));
        assert!(actor.ensure_can_access(UserId::new(1)).is_ok());
        assert!(actor.ensure_can_access(UserId::new(2)).is_err());
        assert!(actor.ensure_staff().is_err());

        let staff = AuthenticatedActor(Actor::new(UserId::new(9), Role::Administrator));
        assert!(staff.ensure_can_access(UserId::new(2)).is_ok());
        assert!(staff.ensure_staff().is_ok());
    }
}
