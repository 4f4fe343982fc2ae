pub mod cognito;
pub mod handlers;
pub mod jwt;

pub use jwt::{AuthUser, JwtVerifier};
