//! Encrypted-at-rest storage for Confluence API tokens.
//!
//! Tokens are encrypted under a key derived from a user password and kept in
//! a JSON file keyed by (Confluence url, username). Neither the token nor the
//! password is ever written to disk.

pub mod crypto;
pub mod error;
pub mod store;

pub use crypto::{decrypt, derive_key, encrypt, EncryptedToken};
pub use error::EncryptionError;
pub use store::{lookup_key, CredentialSummary, StoredCredential, TokenVault};
