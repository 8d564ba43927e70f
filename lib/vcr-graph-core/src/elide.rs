//! Elision primitives: deterministic placeholders for secret field values.
//!
//! Elision replaces a secret with `prefix + replacement`, where the prefix is a
//! recognizable sentinel (default `XXX-`) and the replacement is either caller
//! supplied or the content-addressed fallback digest. The prefix check makes
//! every elision idempotent, and the digest makes it deterministic, so a token
//! recorded in a response correlates with the same token in a later request.

use std::fmt;
use std::sync::Arc;

use crate::parse::FormFields;

/// Resolver over a whole parsed field mapping; may read sibling fields.
pub type FieldResolver = Arc<dyn Fn(&dyn FormFields) -> Resolution + Send + Sync>;

/// Resolver for a single token value, as used by the response pipeline.
pub type TokenResolver = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolver for an app-secret proof; receives the proof and the co-located,
/// still-unredacted access token.
pub type ProofResolver = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Outcome of a [`FieldResolver`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Leave the field untouched (e.g. a sibling field the resolver needs is
    /// absent). The elider does not fire at all.
    Skip,
    /// The resolver declines; elide with the fallback digest of the original.
    Fallback,
    /// Use this replacement (stored under the prefix).
    Value(String),
}

/// Hex MD5 digest of the original secret bytes.
///
/// Content-addressed and stable: the same original always maps to the same
/// placeholder, which keeps pagination links and repeated tokens referentially
/// consistent across one recording pass.
#[must_use]
pub fn fallback_digest(orig: &[u8]) -> String {
    format!("{:x}", md5::compute(orig))
}

/// Elides one token value, honoring the already-elided prefix check.
///
/// Used by the response pipeline where tokens are found by pattern rather than
/// by field lookup. A resolver may supply the replacement; an empty or absent
/// resolver result falls back to [`fallback_digest`].
#[must_use]
pub fn elide_token(orig: &str, resolve: Option<&TokenResolver>, prefix: &str) -> String {
    if !prefix.is_empty() && orig.starts_with(prefix) {
        return orig.to_string();
    }
    let replacement = resolve
        .and_then(|resolve| resolve(orig))
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback_digest(orig.as_bytes()));
    format!("{prefix}{replacement}")
}

/// A single-field elider over any [`FormFields`] mapping.
///
/// Fires only when the field is present and not already carrying the prefix;
/// the second pass over an already-scrubbed fixture is therefore a no-op.
#[derive(Clone)]
pub struct Elider {
    field: String,
    prefix: String,
    resolve: Option<FieldResolver>,
}

impl Elider {
    /// An elider that always uses the fallback digest.
    pub fn new(field: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            prefix: prefix.into(),
            resolve: None,
        }
    }

    /// An elider that consults a resolver before falling back.
    pub fn with_resolver(
        field: impl Into<String>,
        prefix: impl Into<String>,
        resolve: FieldResolver,
    ) -> Self {
        Self {
            field: field.into(),
            prefix: prefix.into(),
            resolve: Some(resolve),
        }
    }

    /// Redacts the named field in place, if present and not already redacted.
    pub fn apply(&self, fields: &mut dyn FormFields) {
        let Some(current) = fields.get(&self.field) else {
            return;
        };
        if !self.prefix.is_empty() && current.starts_with(&self.prefix) {
            return;
        }
        let replacement = match &self.resolve {
            Some(resolve) => match resolve(fields) {
                Resolution::Skip => return,
                Resolution::Value(value) if !value.is_empty() => value,
                Resolution::Value(_) | Resolution::Fallback => {
                    fallback_digest(current.as_bytes())
                }
            },
            None => fallback_digest(current.as_bytes()),
        };
        fields.set(&self.field, &format!("{}{replacement}", self.prefix));
    }
}

impl fmt::Debug for Elider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Elider")
            .field("field", &self.field)
            .field("prefix", &self.prefix)
            .field("resolve", &self.resolve.as_ref().map(|_| "..."))
            .finish()
    }
}
