/// Structural parse failures raised by the payload parsers.
///
/// The filter combinators in [`crate::filter`] treat every variant as "leave the
/// raw bytes alone", so none of these errors escape the recording pipelines.
/// They are public so that callers running a parser directly (strict mode) can
/// propagate them with `?`.
#[derive(Debug, derive_more::Error, derive_more::Display)]
pub enum ParseError {
    /// The body does not open with a `--` boundary line.
    #[display("body does not look like multipart/form-data")]
    NotMultipart,

    /// The body does not start with the sniffed `--boundary` leader.
    #[display("multipart body is missing its leading boundary marker")]
    MissingLeader,

    /// The body does not end with the `--boundary--` terminator.
    #[display("multipart body is missing its terminating boundary marker")]
    MissingTerminator,

    /// Strict query parsing hit a field without a `=` separator.
    #[display("malformed query field: {fragment:?}")]
    MalformedQuery {
        /// The offending `key[=value]` fragment.
        fragment: String,
    },

    /// A percent-escaped component did not decode to valid UTF-8.
    #[display("percent-encoded component is not valid UTF-8")]
    InvalidUtf8,

    /// The batch query parameter does not hold a JSON array.
    #[display("invalid batch JSON: {_0}")]
    BatchJson(serde_json::Error),
}
