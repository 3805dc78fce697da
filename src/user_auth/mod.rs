//! User authentication: argon2 password hashing + HS256 JWT sessions,
//! backed by the member registry.

pub mod handlers;
pub mod middleware;
pub mod service;

pub use middleware::{AuthUser, jwt_auth_middleware};
pub use service::{AuthResponse, Claims, LoginRequest, RegisterRequest, UserAuthService};
