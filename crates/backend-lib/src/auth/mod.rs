// ============================
// filedrop-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod credentials;
pub mod password;
pub mod session;
pub mod token;

pub use credentials::{CredentialStore, SqliteCredentials};
pub use password::{hash_password, verify_password};
pub use session::{CurrentUser, AUTH_COOKIE, BEARER_PREFIX};
pub use token::{TokenService, DEFAULT_TOKEN_TTL};
