//! Credential handling
//!
//! Connection strings and passwords live in a `secrecy` container over a
//! string that is wiped on drop. Debug output shows `[REDACTED]`.
//!
//! ```rust
//! use tidemark::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let password: SecretString = secret_string("my-password".to_string());
//! assert_eq!(password.expose_secret().as_ref(), "my-password");
//! assert!(!format!("{password:?}").contains("my-password"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use zeroize::Zeroize;

/// Zeroizing string payload of a [`SecretString`]
#[derive(Clone, Debug, Serialize, Deserialize, Zeroize)]
#[serde(transparent)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl Deref for SecretValue {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Redacted, zeroizing string used for credentials
pub type SecretString = Secret<SecretValue>;

/// Wrap a string in a [`SecretString`]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue(value))
}
