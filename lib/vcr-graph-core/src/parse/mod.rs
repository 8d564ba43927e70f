//! Structural parsers for the payload encodings that carry Graph API credentials.
//!
//! Each parser wraps one raw payload, exposes the fields a filter may want to
//! rewrite, and re-serializes the surrounding structure unchanged. Parsing is
//! explicit-result: `parse` returns a [`ParseError`](crate::ParseError) instead
//! of guessing, and the combinators in [`crate::filter`] translate that error
//! into "pass the raw bytes through untouched".

mod batch;
mod multipart;
mod query;
mod url;

pub use self::batch::Batch;
pub use self::multipart::{MultipartBody, Part};
pub use self::query::QueryString;
pub use self::url::RelativeUrl;

pub(crate) use self::multipart::contains_subslice;

/// Named form fields that an [`Elider`](crate::Elider) can read and rewrite.
///
/// This is the seam shared by [`QueryString`] and [`MultipartBody`]: both hold
/// `name=value` style fields, just under different framing, so a single elider
/// serves query strings, URLs, batch sub-request URLs and multipart bodies.
pub trait FormFields {
    /// Returns the value of the first field with this name, if present.
    fn get(&self, name: &str) -> Option<String>;

    /// Rewrites the value of every field with this name.
    ///
    /// Duplicate fields all receive the new value so that no copy of a secret
    /// survives the rewrite.
    fn set(&mut self, name: &str, value: &str);

    /// Whether a field with this name is present.
    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}
