//! Single-use in-memory secret container.
//!
//! This module provides [`SecureString`], a wrapper around a mutable
//! character buffer that can be explicitly and verifiably zeroed after use.
//! A secret is meant to be consumed exactly once: the consuming call copies
//! the value out, overwrites the backing buffer with zeros, and records the
//! call site so that a later access can be diagnosed.
//!
//! # Security
//!
//! - The backing buffer is exclusively owned and zeroed on destructive
//!   consumption via [`zeroize`].
//! - The buffer allocation is locked with `memsec::mlock` (best effort) to
//!   prevent the secret from being swapped to disk.
//! - Values handed out by the accessors are wrapped in [`Zeroizing`], so the
//!   exposed copy clears itself when it goes out of scope.
//! - Dropping a `SecureString` zeroes whatever is left in the buffer. This
//!   is defense in depth only; callers remain responsible for consuming the
//!   secret at its declared point of use.
//!
//! # Consumption modes
//!
//! Enforcement of the single-use rule is selected per instance with
//! [`ConsumptionMode`]. Under [`ConsumptionMode::Strict`] any access after a
//! consuming access fails with [`SecretError::AlreadyConsumed`]. Under
//! [`ConsumptionMode::Permissive`] (the default) repeated access is allowed
//! for legacy callers that read a secret more than once; note that a second
//! destructive read observes the already-zeroed buffer and therefore returns
//! an empty value. That is expected, not a bug.
//!
//! # Example
//!
//! ```
//! use credstore_core::{ConsumptionMode, SecureString};
//!
//! let secret = SecureString::with_mode("hunter2".to_string(), ConsumptionMode::Strict);
//! let value = secret.consume().unwrap();
//! assert_eq!(value.as_str(), "hunter2");
//!
//! // The secret is spent: the buffer is zeroed and further access fails.
//! assert!(secret.consume().is_err());
//! ```

use std::fmt;
use std::panic::Location;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use tracing::debug;
use zeroize::{Zeroize, Zeroizing};

/// Enforcement policy for the single-use rule.
///
/// Decided once at startup (see [`crate::config::Config::consumption_mode`])
/// and passed into the constructor, so different contexts (tests vs.
/// production) can hold different policies without global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsumptionMode {
    /// Any access after a consuming access fails with
    /// [`SecretError::AlreadyConsumed`].
    Strict,
    /// Repeated access is tolerated. Kept as the default because enforcing
    /// single use globally breaks legacy call sites that read a secret more
    /// than once for display or retry purposes.
    #[default]
    Permissive,
}

/// Errors produced by [`SecureString`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    /// The secret was accessed after a consuming access (strict mode only).
    ///
    /// Carries the source location of the first consuming call. This is a
    /// programming bug in the caller, never a recoverable runtime condition.
    #[error("secret already consumed at {at}")]
    AlreadyConsumed {
        /// Where the first consuming access happened.
        at: &'static Location<'static>,
    },

    /// The UTF-8 decoder violated an internal invariant.
    ///
    /// Malformed input is NOT an error: bad sequences are replaced with
    /// U+FFFD. This variant only fires if the decoder fails to make
    /// progress, which indicates a bug rather than bad input.
    #[error("secret decoder made no progress at byte {offset}")]
    Decode {
        /// Byte offset into the input at which decoding stalled.
        offset: usize,
    },
}

/// A single-use wrapper around a mutable character buffer.
///
/// The buffer is exclusively owned by this instance until consumed; it must
/// never be aliased into a second owning instance. Sharing a *reference*
/// (e.g. an `Arc<SecureString>`) across threads is fine: the consumption
/// marker is an atomic compare-and-set, so exactly one of several racing
/// destructive consumers wins and the others observe
/// [`SecretError::AlreadyConsumed`].
pub struct SecureString {
    /// Live secret content. The mutex only serializes the copy-then-zero of
    /// a destructive read against concurrent reads, so no interleaving can
    /// observe a partially zeroed value.
    buf: Mutex<Zeroizing<String>>,
    /// Destructive consumption marker. `OnceLock::set` is the atomic
    /// check-and-set; the stored location is the winning call site.
    destroyed: OnceLock<&'static Location<'static>>,
    /// Non-destructive consumption marker, checked in strict mode only.
    read: OnceLock<&'static Location<'static>>,
    mode: ConsumptionMode,
    /// Whether `mlock` succeeded on the backing allocation.
    memory_locked: bool,
}

impl SecureString {
    /// Wrap an owned string as a secret, in [`ConsumptionMode::Permissive`].
    ///
    /// Takes ownership of the buffer; no copy is made. The caller must not
    /// retain another handle to the same data.
    pub fn new(value: String) -> Self {
        Self::with_mode(value, ConsumptionMode::default())
    }

    /// Wrap an owned string as a secret with an explicit enforcement mode.
    pub fn with_mode(value: String, mode: ConsumptionMode) -> Self {
        let mut secret = Self {
            buf: Mutex::new(Zeroizing::new(value)),
            destroyed: OnceLock::new(),
            read: OnceLock::new(),
            mode,
            memory_locked: false,
        };
        secret.try_lock_memory();
        secret
    }

    /// Decode raw UTF-8 bytes into a secret, in
    /// [`ConsumptionMode::Permissive`].
    ///
    /// Malformed or truncated sequences are replaced with U+FFFD rather than
    /// rejected, so corrupted credential bytes degrade into a wrong-but-present
    /// password instead of crashing the caller.
    ///
    /// The input slice may itself hold secret data, so it is overwritten with
    /// zeros before this function returns, whether decoding succeeded or not.
    /// A zero-length input yields an empty secret without touching the
    /// decoder.
    pub fn from_encoded_bytes(bytes: &mut [u8]) -> Result<Self, SecretError> {
        Self::from_encoded_bytes_with_mode(bytes, ConsumptionMode::default())
    }

    /// Decode raw UTF-8 bytes with an explicit enforcement mode.
    ///
    /// See [`SecureString::from_encoded_bytes`] for the decoding and
    /// input-zeroing contract.
    pub fn from_encoded_bytes_with_mode(
        bytes: &mut [u8],
        mode: ConsumptionMode,
    ) -> Result<Self, SecretError> {
        if bytes.is_empty() {
            return Ok(Self::with_mode(String::new(), mode));
        }
        let decoded = decode_utf8_lossy(bytes);
        // The input may be a password; clear it even when decoding failed.
        bytes.zeroize();
        Ok(Self::with_mode(decoded?, mode))
    }

    /// Destructively consume the secret, returning its value.
    ///
    /// The first call copies the value out, overwrites the backing buffer
    /// with zeros (in both modes) and records the call site. In strict mode
    /// any later call fails with [`SecretError::AlreadyConsumed`] carrying
    /// that site; in permissive mode a later call succeeds but observes the
    /// zeroed buffer and returns an empty value.
    #[track_caller]
    pub fn consume(&self) -> Result<Zeroizing<String>, SecretError> {
        let site = Location::caller();
        match self.destroyed.set(site) {
            Ok(()) => {
                let mut buf = self.lock_buf();
                let value = Zeroizing::new(buf.to_string());
                buf.zeroize();
                Ok(value)
            }
            Err(_) => match self.mode {
                ConsumptionMode::Strict => Err(self.destroyed_error(site)),
                ConsumptionMode::Permissive => Ok(Zeroizing::new(self.lock_buf().to_string())),
            },
        }
    }

    /// Non-destructively read the secret's value.
    ///
    /// Never zeroes the buffer. In strict mode this succeeds at most once:
    /// a second non-destructive read fails, as does any read after a
    /// destructive consumption. A destructive [`SecureString::consume`]
    /// after a single `read` still succeeds and zeroes.
    #[track_caller]
    pub fn read(&self) -> Result<Zeroizing<String>, SecretError> {
        self.mark_read(Location::caller())?;
        Ok(Zeroizing::new(self.lock_buf().to_string()))
    }

    /// Destructively consume the secret as UTF-8 bytes.
    ///
    /// Marker semantics are identical to [`SecureString::consume`]. The
    /// character buffer is additionally zeroed after encoding in strict mode
    /// only; permissive callers that re-encode a secret repeatedly keep
    /// getting the full value (source-compatible behavior).
    #[track_caller]
    pub fn consume_bytes(&self) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        let site = Location::caller();
        match self.destroyed.set(site) {
            Ok(()) => {
                let mut buf = self.lock_buf();
                let value = Zeroizing::new(buf.as_bytes().to_vec());
                if self.mode == ConsumptionMode::Strict {
                    buf.zeroize();
                }
                Ok(value)
            }
            Err(_) => match self.mode {
                ConsumptionMode::Strict => Err(self.destroyed_error(site)),
                ConsumptionMode::Permissive => {
                    Ok(Zeroizing::new(self.lock_buf().as_bytes().to_vec()))
                }
            },
        }
    }

    /// Non-destructively read the secret as UTF-8 bytes.
    ///
    /// Same marker semantics as [`SecureString::read`].
    #[track_caller]
    pub fn read_bytes(&self) -> Result<Zeroizing<Vec<u8>>, SecretError> {
        self.mark_read(Location::caller())?;
        Ok(Zeroizing::new(self.lock_buf().as_bytes().to_vec()))
    }

    /// Append the live view to an external builder.
    ///
    /// Fails if the secret has already been destructively consumed (strict
    /// mode), but never zeroes the buffer and never sets either consumption
    /// marker.
    pub fn append_to(&self, out: &mut String) -> Result<(), SecretError> {
        if self.mode == ConsumptionMode::Strict {
            if let Some(at) = self.destroyed.get() {
                return Err(SecretError::AlreadyConsumed { at });
            }
        }
        out.push_str(&self.lock_buf());
        Ok(())
    }

    /// Compare the live content against any string-viewable value.
    ///
    /// Always non-destructive and marker-unaffected: repeated calls never
    /// fail, even after consumption (the comparison then sees the zeroed,
    /// empty content).
    pub fn matches(&self, other: impl AsRef<str>) -> bool {
        self.lock_buf().as_str() == other.as_ref()
    }

    /// Byte length of the live view (zero once destructively consumed).
    pub fn len(&self) -> usize {
        self.lock_buf().len()
    }

    /// Whether the live view is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_buf().is_empty()
    }

    /// The enforcement mode this instance was built with.
    pub fn mode(&self) -> ConsumptionMode {
        self.mode
    }

    /// Whether the secret has been destructively consumed.
    pub fn is_consumed(&self) -> bool {
        self.destroyed.get().is_some()
    }

    /// Check-and-set for non-destructive access (strict mode only).
    fn mark_read(&self, site: &'static Location<'static>) -> Result<(), SecretError> {
        if self.mode == ConsumptionMode::Permissive {
            return Ok(());
        }
        if let Some(at) = self.destroyed.get() {
            return Err(SecretError::AlreadyConsumed { at });
        }
        if self.read.set(site).is_err() {
            let at = self.read.get().copied().unwrap_or(site);
            return Err(SecretError::AlreadyConsumed { at });
        }
        Ok(())
    }

    fn destroyed_error(&self, fallback: &'static Location<'static>) -> SecretError {
        let at = self.destroyed.get().copied().unwrap_or(fallback);
        SecretError::AlreadyConsumed { at }
    }

    fn lock_buf(&self) -> MutexGuard<'_, Zeroizing<String>> {
        // A panic while the lock is held cannot leave the buffer in an
        // invalid state, so a poisoned lock is still usable.
        self.buf.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attempt to lock the backing allocation to prevent swapping.
    ///
    /// The buffer never reallocates after construction, so locking the
    /// current allocation covers the secret's whole lifetime.
    fn try_lock_memory(&mut self) {
        let buf = match self.buf.get_mut() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buf.capacity() == 0 {
            return;
        }
        let ptr = buf.as_ptr() as *mut u8;
        let size = buf.capacity();

        // Safety: locking memory we own; unlocked on drop.
        if unsafe { memsec::mlock(ptr, size) } {
            self.memory_locked = true;
        } else {
            // Common for unprivileged processes (RLIMIT_MEMLOCK).
            debug!("failed to lock secret memory, value may be swapped to disk");
        }
    }
}

impl PartialEq for SecureString {
    /// Live-content equality, independent of the consumption markers.
    fn eq(&self, other: &Self) -> bool {
        let mine = Zeroizing::new(self.lock_buf().to_string());
        other.matches(mine.as_str())
    }
}

impl PartialEq<str> for SecureString {
    fn eq(&self, other: &str) -> bool {
        self.matches(other)
    }
}

impl fmt::Debug for SecureString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureString")
            .field("value", &"[REDACTED]")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

impl Drop for SecureString {
    fn drop(&mut self) {
        let buf = match self.buf.get_mut() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        let ptr = buf.as_ptr() as *mut u8;
        let size = buf.capacity();
        buf.zeroize();

        if self.memory_locked && size > 0 {
            // Safety: unlocking memory we previously locked.
            unsafe {
                memsec::munlock(ptr, size);
            }
        }
    }
}

/// Decode UTF-8, substituting U+FFFD for malformed or truncated sequences.
///
/// Never rejects bad input; `SecretError::Decode` only fires when the
/// decoder fails to make progress, which would be an internal bug.
fn decode_utf8_lossy(bytes: &[u8]) -> Result<String, SecretError> {
    let mut out = String::with_capacity(bytes.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match std::str::from_utf8(&bytes[pos..]) {
            Ok(valid) => {
                out.push_str(valid);
                pos = bytes.len();
            }
            Err(err) => {
                let valid_up_to = err.valid_up_to();
                let valid = std::str::from_utf8(&bytes[pos..pos + valid_up_to])
                    .map_err(|_| SecretError::Decode { offset: pos })?;
                out.push_str(valid);
                out.push(char::REPLACEMENT_CHARACTER);
                let skip = match err.error_len() {
                    Some(len) => valid_up_to + len,
                    // Truncated multi-byte sequence at end of input.
                    None => bytes.len() - pos,
                };
                if skip == 0 {
                    return Err(SecretError::Decode { offset: pos });
                }
                pos += skip;
            }
        }
    }
    Ok(out)
}
