use std::sync::Arc;
use std::time::Duration;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{entities::usuario, errors::ServiceError};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub nombre: String,
    pub email: String,
    pub rol: String,
    pub iat: i64,
    pub exp: i64,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, access_token_expiration: Duration) -> Self {
        Self {
            jwt_secret,
            access_token_expiration,
        }
    }
}

/// Issues and validates JWTs and password hashes.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::HashError(e.to_string()))
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ServiceError> {
        let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn issue_token(&self, user: &usuario::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            nombre: user.nombre.clone(),
            email: user.email.clone(),
            rol: user.rol.as_str().to_string(),
            iat: now,
            exp: now + self.config.access_token_expiration.as_secs() as i64,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("failed to sign token: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
    }
}

/// Authenticated user data extracted from the JWT token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub nombre: String,
    pub email: String,
    pub rol: usuario::Rol,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.rol == usuario::Rol::Admin
    }

    /// Admins pass every role gate; everyone else must hold the exact role.
    pub fn require_role(&self, rol: usuario::Rol) -> Result<(), ServiceError> {
        if self.rol == rol || self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "requires role '{}'",
                rol.as_str()
            )))
        }
    }

    pub fn require_staff(&self) -> Result<(), ServiceError> {
        self.require_role(usuario::Rol::Store)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_service = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| ServiceError::InternalError("auth service not configured".into()))?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ServiceError::Unauthorized("missing Authorization header".into()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ServiceError::Unauthorized("expected Bearer token".into()))?;

        let claims = auth_service.validate_token(token)?;

        let user_id = claims
            .sub
            .parse::<i32>()
            .map_err(|_| ServiceError::Unauthorized("malformed token subject".into()))?;
        let rol = usuario::Rol::parse(&claims.rol)
            .ok_or_else(|| ServiceError::Unauthorized("unknown role in token".into()))?;

        Ok(AuthUser {
            user_id,
            nombre: claims.nombre,
            email: claims.email,
            rol,
        })
    }
}
