//! Secure handling of the InfluxDB API token
//!
//! The token is wrapped in `secrecy::Secret` so it is zeroized on drop, redacted
//! from `Debug` output and only reachable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use hastats::config::{secret_string, SecretString};
//! use secrecy::ExposeSecret;
//!
//! let token: SecretString = secret_string("my-influx-token".to_string());
//! assert_eq!(token.expose_secret(), "my-influx-token");
//! assert!(!format!("{token:?}").contains("my-influx-token"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, ExposeSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String newtype satisfying the `secrecy` marker traits.
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

pub type SecretString = Secret<SecretValue>;

#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Value for the InfluxDB `Authorization` header.
pub fn token_header(token: &SecretString) -> String {
    format!("Token {}", token.expose_secret().as_ref())
}

/// Shows the first four characters followed by `***`, for config summaries.
pub fn masked(token: &SecretString) -> String {
    let raw: &str = token.expose_secret().as_ref();
    if raw.chars().count() <= 8 {
        return "***".to_string();
    }
    let prefix: String = raw.chars().take(4).collect();
    format!("{prefix}***")
}
