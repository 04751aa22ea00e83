//! Credential value model.
//!
//! A [`Credential`] pairs an optional username with an optional single-use
//! secret; a [`CredentialAttributes`] is the identity key under which a
//! credential is looked up or stored. Storage backends, UI prompts and
//! network authenticators consume these types without ever managing the
//! zeroing discipline themselves — that lives in
//! [`SecureString`](crate::secret::SecureString).

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::secret::{SecretError, SecureString};

/// An optional username plus an optional single-use secret.
///
/// The username is never an empty string: empty input is normalized to
/// absent at construction. The secret is exclusively owned; no other
/// component may hold a second owning handle to the same buffer.
///
/// # Example
///
/// ```
/// use credstore_core::Credential;
///
/// let cred = Credential::from_plain(Some("bob"), Some("hunter2"));
/// assert!(cred.is_fulfilled());
///
/// let password = cred.secret_string().unwrap().unwrap();
/// assert_eq!(password.as_str(), "hunter2");
/// ```
pub struct Credential {
    user_name: Option<String>,
    secret: Option<SecureString>,
}

impl Credential {
    /// Build a credential from a username and an already-wrapped secret.
    ///
    /// An empty username is normalized to `None`.
    pub fn new(user_name: Option<&str>, secret: Option<SecureString>) -> Self {
        Self {
            user_name: user_name.filter(|u| !u.is_empty()).map(str::to_owned),
            secret,
        }
    }

    /// Convenience: wrap a plain-text password into a permissive-mode secret.
    pub fn from_plain(user_name: Option<&str>, password: Option<&str>) -> Self {
        Self::new(
            user_name,
            password.map(|p| SecureString::new(p.to_owned())),
        )
    }

    /// Convenience: decode a raw password byte buffer into the secret.
    ///
    /// The byte buffer is zeroed by the decode step whether or not it
    /// succeeds, see [`SecureString::from_encoded_bytes`].
    pub fn from_encoded_bytes(
        user_name: Option<&str>,
        password: Option<&mut [u8]>,
    ) -> Result<Self, SecretError> {
        let secret = match password {
            Some(bytes) => Some(SecureString::from_encoded_bytes(bytes)?),
            None => None,
        };
        Ok(Self::new(user_name, secret))
    }

    /// The normalized username, if any.
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// The held secret, if any.
    pub fn secret(&self) -> Option<&SecureString> {
        self.secret.as_ref()
    }

    /// Whether authentication can proceed: both username and secret present.
    pub fn is_fulfilled(&self) -> bool {
        self.user_name.is_some() && self.secret.is_some()
    }

    /// Whether the credential carries nothing at all.
    ///
    /// A username-only credential is neither fulfilled nor empty; it still
    /// identifies a partially known account.
    pub fn is_empty(&self) -> bool {
        self.user_name.is_none() && self.secret.is_none()
    }

    /// Destructively consume the secret, returning its value.
    ///
    /// Returns `Ok(None)` if no secret is held. Consumption semantics are
    /// those of [`SecureString::consume`].
    #[track_caller]
    pub fn secret_string(&self) -> Result<Option<Zeroizing<String>>, SecretError> {
        match &self.secret {
            Some(secret) => Ok(Some(secret.consume()?)),
            None => Ok(None),
        }
    }

    /// Non-destructively read the secret's value.
    ///
    /// Returns `Ok(None)` if no secret is held. Subject to the single-use
    /// rule of [`SecureString::read`] in strict mode.
    #[track_caller]
    pub fn peek_secret(&self) -> Result<Option<Zeroizing<String>>, SecretError> {
        match &self.secret {
            Some(secret) => Ok(Some(secret.read()?)),
            None => Ok(None),
        }
    }
}

impl PartialEq for Credential {
    /// Usernames equal and secret live contents equal.
    ///
    /// Secret comparison is non-destructive and ignores the consumption
    /// markers.
    fn eq(&self, other: &Self) -> bool {
        if self.user_name != other.user_name {
            return false;
        }
        match (&self.secret, &other.secret) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("user_name", &self.user_name)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Identity key for looking up or storing a [`Credential`].
///
/// Pure value type: structural equality and hashing over all three fields,
/// no behavior beyond construction. The service name is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialAttributes {
    service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_name: Option<String>,
    /// Legacy namespacing tag. Never populated by new code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    requestor: Option<String>,
}

impl CredentialAttributes {
    /// Identity for a service, optionally scoped to a username.
    pub fn new(service_name: impl Into<String>, user_name: Option<&str>) -> Self {
        Self {
            service_name: service_name.into(),
            user_name: user_name.map(str::to_owned),
            requestor: None,
        }
    }

    /// Legacy identity derived from a requestor's canonical name.
    ///
    /// The service name becomes the requestor name and the requestor tag is
    /// recorded for lookup compatibility. Kept correct for old call sites;
    /// new code must use [`CredentialAttributes::new`].
    #[deprecated(note = "requestor namespacing is legacy, use CredentialAttributes::new")]
    pub fn for_requestor(requestor_name: &str, user_name: Option<&str>) -> Self {
        Self {
            service_name: requestor_name.to_owned(),
            user_name: user_name.map(str::to_owned),
            requestor: Some(requestor_name.to_owned()),
        }
    }

    /// The service name (primary key).
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// The username this identity is scoped to, if any.
    pub fn user_name(&self) -> Option<&str> {
        self.user_name.as_deref()
    }

    /// The legacy requestor tag, if any.
    pub fn requestor(&self) -> Option<&str> {
        self.requestor.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::ConsumptionMode;

    #[test]
    fn empty_user_name_is_normalized_to_absent() {
        let cred = Credential::from_plain(Some(""), Some("hunter2"));
        assert_eq!(cred.user_name(), None);
        assert!(!cred.is_fulfilled());
    }

    #[test]
    fn fulfilled_requires_both_fields() {
        assert!(Credential::from_plain(Some("bob"), Some("hunter2")).is_fulfilled());
        assert!(!Credential::from_plain(Some("bob"), None).is_fulfilled());
        assert!(!Credential::from_plain(None, Some("hunter2")).is_fulfilled());
        assert!(!Credential::from_plain(None, None).is_fulfilled());
    }

    #[test]
    fn empty_requires_neither_field() {
        let empty = Credential::from_plain(None, None);
        assert!(empty.is_empty());
        assert!(!empty.is_fulfilled());

        // A username-only credential is neither fulfilled nor empty.
        let user_only = Credential::from_plain(Some("bob"), None);
        assert!(!user_only.is_empty());
        assert!(!user_only.is_fulfilled());
    }

    #[test]
    fn secret_string_consumes_destructively() {
        let secret = SecureString::with_mode("hunter2".to_string(), ConsumptionMode::Strict);
        let cred = Credential::new(Some("bob"), Some(secret));

        let value = cred.secret_string().unwrap().unwrap();
        assert_eq!(value.as_str(), "hunter2");
        assert!(cred.secret_string().is_err());
    }

    #[test]
    fn secret_string_without_secret_is_none() {
        let cred = Credential::from_plain(Some("bob"), None);
        assert!(cred.secret_string().unwrap().is_none());
        assert!(cred.peek_secret().unwrap().is_none());
    }

    #[test]
    fn peek_secret_does_not_zero() {
        let cred = Credential::from_plain(Some("bob"), Some("hunter2"));
        assert_eq!(cred.peek_secret().unwrap().unwrap().as_str(), "hunter2");
        assert_eq!(cred.secret_string().unwrap().unwrap().as_str(), "hunter2");
    }

    #[test]
    fn from_encoded_bytes_zeroes_password_input() {
        let mut password = *b"hunter2";
        let cred = Credential::from_encoded_bytes(Some("bob"), Some(&mut password)).unwrap();

        assert!(password.iter().all(|&b| b == 0));
        assert!(cred.is_fulfilled());
        assert_eq!(cred.secret_string().unwrap().unwrap().as_str(), "hunter2");
    }

    #[test]
    fn equality_covers_user_and_secret_content() {
        let a = Credential::from_plain(Some("bob"), Some("hunter2"));
        let b = Credential::from_plain(Some("bob"), Some("hunter2"));
        let c = Credential::from_plain(Some("bob"), Some("other"));
        let d = Credential::from_plain(Some("alice"), Some("hunter2"));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_ne!(a, Credential::from_plain(Some("bob"), None));

        // Comparing did not consume either secret.
        assert_eq!(a.peek_secret().unwrap().unwrap().as_str(), "hunter2");
    }

    #[test]
    fn debug_redacts_secret() {
        let cred = Credential::from_plain(Some("bob"), Some("hunter2"));
        let output = format!("{cred:?}");
        assert!(output.contains("bob"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn attributes_structural_equality() {
        let a = CredentialAttributes::new("svcA", Some("bob"));
        let b = CredentialAttributes::new("svcA", Some("bob"));
        assert_eq!(a, b);

        assert_ne!(a, CredentialAttributes::new("svcB", Some("bob")));
        assert_ne!(a, CredentialAttributes::new("svcA", Some("alice")));
        assert_ne!(a, CredentialAttributes::new("svcA", None));
    }

    #[test]
    fn attributes_hash_agrees_with_equality() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(CredentialAttributes::new("svcA", Some("bob")), 1);
        assert_eq!(
            map.get(&CredentialAttributes::new("svcA", Some("bob"))),
            Some(&1)
        );
        assert_eq!(map.get(&CredentialAttributes::new("svcA", None)), None);
    }

    #[test]
    #[allow(deprecated)]
    fn requestor_attributes_derive_service_name() {
        let attrs = CredentialAttributes::for_requestor("com.example.GitAuth", Some("bob"));
        assert_eq!(attrs.service_name(), "com.example.GitAuth");
        assert_eq!(attrs.user_name(), Some("bob"));
        assert_eq!(attrs.requestor(), Some("com.example.GitAuth"));

        // The tag participates in equality, so legacy lookups stay distinct.
        assert_ne!(attrs, CredentialAttributes::new("com.example.GitAuth", Some("bob")));
    }

    #[test]
    fn attributes_serde_roundtrip() {
        let attrs = CredentialAttributes::new("svcA", Some("bob"));
        let json = serde_json::to_string(&attrs).unwrap();
        assert!(!json.contains("requestor"));

        let parsed: CredentialAttributes = serde_json::from_str(&json).unwrap();
        assert_eq!(attrs, parsed);
    }
}
