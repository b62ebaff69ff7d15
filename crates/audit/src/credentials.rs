//! Round-robin credential rotation.
//!
//! [`KeyRotationPool`] owns the configured engine credentials and hands one out
//! per extraction call. The cursor is the only state shared between concurrent
//! extractions; it advances with a single atomic update, so no two callers
//! observe the same position within a cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ConfigurationError;

/// An opaque engine credential.
///
/// The secret is never rendered by `Debug` or `Display`; use
/// [`Credential::expose`] at the point where it is bound to a request.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wraps a raw token.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// A redacted form safe for logs: the last four characters only.
    pub fn fingerprint(&self) -> String {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("…{tail}")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Credential({})", self.fingerprint())
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fingerprint())
    }
}

/// A fixed, cyclic set of credentials.
#[derive(Debug)]
pub struct KeyRotationPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl KeyRotationPool {
    /// Creates a pool that starts at the first credential.
    ///
    /// Duplicates are accepted but logged, since they skew the spread across
    /// distinct keys.
    pub fn new<I, T>(tokens: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<str>>,
    {
        let credentials: Vec<Credential> = tokens.into_iter().map(Credential::new).collect();
        if credentials.is_empty() {
            return Err(ConfigurationError::new(
                "at least one engine credential is required",
            ));
        }

        let distinct = credentials
            .iter()
            .collect::<std::collections::HashSet<_>>()
            .len();
        if distinct < credentials.len() {
            tracing::warn!(
                configured = credentials.len(),
                distinct,
                "Credential pool contains duplicate keys"
            );
        }

        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Returns the credential at the cursor and advances it, wrapping at the end.
    pub fn next(&self) -> Credential {
        let len = self.credentials.len();
        let index = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % len))
        {
            Ok(previous) | Err(previous) => previous,
        };
        self.credentials[index].clone()
    }

    /// Number of credentials in the pool (always at least one).
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always `false`; a pool cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
