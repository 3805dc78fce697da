use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::core_types::UserId;
use crate::error::{CoreError, CoreResult};
use crate::registry::{Member, MemberRegistry, UserRole};

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

/// User Registration Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "awa")]
    #[validate(length(min = 3, max = 32, message = "must be 3 to 32 characters"))]
    pub username: String,
    #[schema(example = "awa@example.com")]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[schema(example = "password123")]
    #[validate(length(min = 8, message = "must be at least 8 characters"))]
    pub password: String,
}

/// User Login Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "awa@example.com")]
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    pub password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
    pub email: String,
}

pub struct UserAuthService {
    registry: Arc<MemberRegistry>,
    jwt_secret: String,
    token_ttl_hours: i64,
    /// Emails promoted to the operator role on registration.
    admin_emails: Vec<String>,
}

impl UserAuthService {
    pub fn new(
        registry: Arc<MemberRegistry>,
        jwt_secret: String,
        token_ttl_hours: i64,
        admin_emails: Vec<String>,
    ) -> Self {
        Self {
            registry,
            jwt_secret,
            token_ttl_hours,
            admin_emails,
        }
    }

    /// Register a new member with a hashed password.
    pub fn register(&self, req: RegisterRequest) -> CoreResult<Member> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| CoreError::validation(format!("password not hashable: {e}")))?
            .to_string();

        let member = self
            .registry
            .register(&req.username, &req.email, password_hash)?;

        if self.admin_emails.iter().any(|e| e == &req.email) {
            return self.registry.set_role(member.id, UserRole::Admin);
        }
        Ok(member)
    }

    /// Verify credentials and issue a JWT.
    pub fn login(&self, req: LoginRequest) -> CoreResult<AuthResponse> {
        let invalid = || CoreError::permission_denied("invalid email or password");

        let member = self.registry.find_by_email(&req.email).ok_or_else(invalid)?;
        let parsed_hash = PasswordHash::new(&member.password_hash)
            .map_err(|e| CoreError::validation(format!("stored hash unreadable: {e}")))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| invalid())?;

        let now = Utc::now();
        let expiration = now + Duration::hours(self.token_ttl_hours);
        let claims = Claims {
            sub: member.id.to_string(),
            exp: expiration.timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| CoreError::validation(format!("token not issued: {e}")))?;

        Ok(AuthResponse {
            token,
            user_id: member.id,
            username: member.username,
            email: member.email,
        })
    }

    /// Verify a JWT and return its claims.
    pub fn verify_token(&self, token: &str) -> CoreResult<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| CoreError::permission_denied("invalid or expired token"))?;
        Ok(token_data.claims)
    }

    /// Parse the authenticated user id out of verified claims.
    pub fn claims_user_id(claims: &Claims) -> CoreResult<UserId> {
        claims
            .sub
            .parse()
            .map_err(|_| CoreError::validation("malformed token subject"))
    }
}
