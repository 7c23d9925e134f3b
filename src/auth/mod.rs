//! Authentication for the warehouse API.
//!
//! Two methods are supported: JWT bearer tokens issued at login, and per-user
//! API keys for service-to-service calls. The authenticated user becomes the
//! acting user recorded on every stock movement.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::user::{self, Column as UserColumn, Entity as User},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub username: String,
    /// Unique identifier for this token
    pub jti: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller, inserted into request extensions by `require_auth`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub is_api_key: bool,
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_duration: Duration,
    pub api_key_prefix: String,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        issuer: String,
        audience: String,
        token_duration: Duration,
        api_key_prefix: String,
    ) -> Result<Self, ServiceError> {
        if jwt_secret.len() < 32 {
            return Err(ServiceError::InternalError(
                "JWT secret must be at least 32 bytes".to_string(),
            ));
        }
        Ok(Self {
            jwt_secret,
            issuer,
            audience,
            token_duration,
            api_key_prefix,
        })
    }
}

/// Service issuing and verifying credentials against the user table
pub struct AuthService {
    config: AuthConfig,
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AuthService {
    pub fn new(config: AuthConfig, db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            config,
            db_pool,
            event_sender,
        }
    }

    /// Register a new user account with a hashed password and a generated
    /// API key.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: String,
        email: String,
        password: String,
    ) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = User::find()
            .filter(
                UserColumn::Username
                    .eq(&username)
                    .or(UserColumn::Email.eq(&email)),
            )
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "username or email already registered".to_string(),
            ));
        }

        let password_hash = hash_password(&password)?;
        let api_key = self.generate_api_key();

        let now = Utc::now();
        let created = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            username: Set(username),
            email: Set(email),
            password_hash: Set(password_hash),
            api_key: Set(Some(api_key)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::UserRegistered(created.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(user_id = %created.id, username = %created.username, "User registered");

        Ok(created)
    }

    /// Verify credentials and issue a JWT. Invalid username, wrong password
    /// and deactivated accounts are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(String, user::Model), ServiceError> {
        let db = &*self.db_pool;

        let user = User::find()
            .filter(UserColumn::Username.eq(username))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::Unauthorized("invalid credentials".to_string()))?;

        if !user.is_active || !verify_password(password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized("invalid credentials".to_string()));
        }

        let token = self.generate_token(&user)?;

        debug!(user_id = %user.id, "Login succeeded");

        Ok((token, user))
    }

    /// Issue a signed JWT for the given user
    pub fn generate_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + self.config.token_duration.as_secs() as i64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::JwtError(e.to_string()))
    }

    /// Verify a JWT's signature and standard claims
    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
    }

    /// Resolve a verified JWT to its active user account
    pub async fn authenticate_token(&self, token: &str) -> Result<user::Model, ServiceError> {
        let claims = self.verify_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("invalid token subject".to_string()))?;

        self.active_user(user_id).await
    }

    /// Resolve an API key to its active user account
    pub async fn authenticate_api_key(&self, api_key: &str) -> Result<user::Model, ServiceError> {
        let db = &*self.db_pool;

        let user = User::find()
            .filter(UserColumn::ApiKey.eq(api_key))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::Unauthorized("invalid API key".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized("account deactivated".to_string()));
        }

        Ok(user)
    }

    /// Fetch a user by id
    pub async fn get_user(&self, id: Uuid) -> Result<Option<user::Model>, ServiceError> {
        let db = &*self.db_pool;

        User::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn active_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        let user = self
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("unknown user".to_string()))?;

        if !user.is_active {
            return Err(ServiceError::Unauthorized("account deactivated".to_string()));
        }

        Ok(user)
    }

    fn generate_api_key(&self) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{}{}", self.config.api_key_prefix, hex::encode(bytes))
    }
}

fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::HashError(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, ServiceError> {
    let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::HashError(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Middleware requiring an authenticated caller.
///
/// Accepts an `X-API-Key` header or an `Authorization: Bearer <jwt>` header,
/// in that order, and inserts the resolved [`AuthUser`] into the request
/// extensions.
pub async fn require_auth(
    State(auth): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if let Some(api_key) = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
    {
        let user = auth.authenticate_api_key(api_key).await?;
        request.extensions_mut().insert(AuthUser {
            user_id: user.id,
            username: user.username,
            is_api_key: true,
        });
        return Ok(next.run(request).await);
    }

    if let Some(token) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        let user = auth.authenticate_token(token).await?;
        request.extensions_mut().insert(AuthUser {
            user_id: user.id,
            username: user.username,
            is_api_key: false,
        });
        return Ok(next.run(request).await);
    }

    Err(ServiceError::Unauthorized(
        "authentication required".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn auth_config_rejects_short_secret() {
        let result = AuthConfig::new(
            "short".to_string(),
            "warehouse-api".to_string(),
            "warehouse-api".to_string(),
            Duration::from_secs(3600),
            "wh_".to_string(),
        );
        assert!(result.is_err());
    }
}
