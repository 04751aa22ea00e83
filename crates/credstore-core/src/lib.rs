//! Core types for credstore.
//!
//! This crate provides a single-use in-memory secret container and the
//! credential value model built on top of it. It is intentionally
//! backend-agnostic: platform keychains, UI prompts and network
//! authenticators consume these types without managing the zeroing
//! discipline themselves.
//!
//! # Modules
//!
//! - [`secret`]: the single-use secret container ([`SecureString`],
//!   [`ConsumptionMode`], [`SecretError`])
//! - [`credential`]: credential values and identity keys ([`Credential`],
//!   [`CredentialAttributes`])
//! - [`store`]: keyed credential storage ([`CredentialStore`],
//!   [`MemoryCredentialStore`])
//! - [`config`]: TOML configuration selecting the enforcement mode
//!
//! # Example
//!
//! ```
//! use credstore_core::{
//!     ConsumptionMode, Credential, CredentialAttributes, CredentialStore,
//!     MemoryCredentialStore, SecureString,
//! };
//!
//! // A backend decodes raw secret bytes; the input buffer is zeroed.
//! let mut raw = b"hunter2".to_vec();
//! let secret = SecureString::from_encoded_bytes_with_mode(
//!     &mut raw,
//!     ConsumptionMode::Strict,
//! ).unwrap();
//! assert!(raw.iter().all(|&b| b == 0));
//!
//! // Keyed storage for later lookup.
//! let store = MemoryCredentialStore::new();
//! let key = CredentialAttributes::new("git.example.com", Some("bob"));
//! store.set(key.clone(), Some(Credential::new(Some("bob"), Some(secret))));
//!
//! // The secret is consumed exactly once at its point of use.
//! let cred = store.get(&key).unwrap();
//! let password = cred.secret_string().unwrap().unwrap();
//! assert_eq!(password.as_str(), "hunter2");
//! assert!(cred.secret_string().is_err());
//! ```

pub mod config;
pub mod credential;
pub mod secret;
pub mod store;

// Re-export commonly used types at the crate root for convenience
pub use config::{Config, ConfigError, SecurityConfig};
pub use credential::{Credential, CredentialAttributes};
pub use secret::{ConsumptionMode, SecretError, SecureString};
pub use store::{CredentialStore, MemoryCredentialStore};
