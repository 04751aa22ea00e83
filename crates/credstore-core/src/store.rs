//! Credential storage interface and in-memory backend.
//!
//! Platform keychain backends implement [`CredentialStore`]; the
//! [`MemoryCredentialStore`] here is the reference implementation, used
//! directly for per-process storage and in tests.
//!
//! # Security
//!
//! The store never logs secret content, only the service name of the key
//! being touched. Entries are dropped on [`clear`](MemoryCredentialStore::clear)
//! and on store drop, at which point each secret's buffer is zeroed by
//! [`SecureString`](crate::secret::SecureString)'s drop handling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use crate::credential::{Credential, CredentialAttributes};

/// Keyed credential storage.
///
/// `get` hands out a shared handle rather than a copy: a secret's buffer
/// must never be aliased into a second owning instance, and the shared
/// handle lets several consumers race on consumption with the atomic
/// marker arbitrating.
pub trait CredentialStore: Send + Sync {
    /// Look up the credential stored under `attributes`.
    fn get(&self, attributes: &CredentialAttributes) -> Option<Arc<Credential>>;

    /// Store a credential under `attributes`, or erase it with `None`.
    fn set(&self, attributes: CredentialAttributes, credential: Option<Credential>);
}

/// In-memory [`CredentialStore`] keyed by [`CredentialAttributes`].
///
/// # Example
///
/// ```
/// use credstore_core::{Credential, CredentialAttributes, CredentialStore, MemoryCredentialStore};
///
/// let store = MemoryCredentialStore::new();
/// let key = CredentialAttributes::new("git.example.com", Some("bob"));
/// store.set(key.clone(), Some(Credential::from_plain(Some("bob"), Some("hunter2"))));
///
/// let cred = store.get(&key).unwrap();
/// assert!(cred.is_fulfilled());
/// ```
#[derive(Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<CredentialAttributes, Arc<Credential>>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored credentials.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether the store holds no credentials.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    /// Whether a credential is stored under `attributes`.
    pub fn contains(&self, attributes: &CredentialAttributes) -> bool {
        self.lock_entries().contains_key(attributes)
    }

    /// Drop all stored credentials; their secrets zero themselves.
    pub fn clear(&self) {
        let mut entries = self.lock_entries();
        let count = entries.len();
        entries.clear();
        debug!(count, "cleared all stored credentials");
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CredentialAttributes, Arc<Credential>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, attributes: &CredentialAttributes) -> Option<Arc<Credential>> {
        let found = self.lock_entries().get(attributes).cloned();
        trace!(
            service = %attributes.service_name(),
            hit = found.is_some(),
            "credential lookup"
        );
        found
    }

    fn set(&self, attributes: CredentialAttributes, credential: Option<Credential>) {
        let mut entries = self.lock_entries();
        match credential {
            Some(credential) => {
                trace!(service = %attributes.service_name(), "storing credential");
                entries.insert(attributes, Arc::new(credential));
            }
            None => {
                let removed = entries.remove(&attributes).is_some();
                if removed {
                    trace!(service = %attributes.service_name(), "erased credential");
                }
            }
        }
    }
}

impl std::fmt::Debug for MemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCredentialStore")
            .field("entries", &self.len())
            .finish()
    }
}
