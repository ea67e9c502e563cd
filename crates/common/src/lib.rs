// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the `filedrop` backend and anything that talks to it.
//! This module defines the persisted records and the session token claims.

use serde::{Deserialize, Serialize};

/// Row identifier type for users and files
pub type RecordId = i64;

/// A registered account
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique row id
    pub id: RecordId,
    /// Unique login name
    pub username: String,
    /// scrypt PHC string; never leaves the server
    #[serde(skip_serializing, default)]
    pub hashed_password: String,
}

/// Ownership record tying an uploaded blob to the user who uploaded it
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Unique row id
    pub id: RecordId,
    /// Name the file was uploaded under
    pub filename: String,
    /// Id of the owning [`User`]
    pub owner_id: RecordId,
}

/// Claims carried inside a session token
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the username the token was issued to
    pub sub: String,
    /// Absolute expiry, unix seconds
    pub exp: i64,
    /// Issue time, unix seconds
    pub iat: i64,
}
