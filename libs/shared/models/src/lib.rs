pub mod auth;
pub mod error;
pub mod roles;

pub use auth::{JwtClaims, TokenResponse, User};
pub use error::AppError;
pub use roles::UserRole;
