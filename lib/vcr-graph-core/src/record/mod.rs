//! The recording pipelines and the cassette-shaped data model they transform.
//!
//! A host recording framework hands this module one request or response at a
//! time, right before persisting it. [`GraphScrubber::before_record`] and
//! [`GraphScrubber::before_record_response`] return sanitized copies; anything
//! not recognized as Graph API traffic passes through verbatim.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::elide::{ProofResolver, TokenResolver};

mod request;
mod response;


/// The sentinel marking an already-elided value; chosen so fixtures stay
/// greppable and a second scrubbing pass recognizes its own output.
pub const DEFAULT_ELIDER_PREFIX: &str = "XXX-";

/// An insertion-ordered, case-insensitive `name -> values` header map.
///
/// Matches the serialized cassette shape: string keys, list-of-string values.
/// Lookups ignore ASCII case while writes keep the recorded casing and
/// position, so untouched headers round-trip byte-identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(IndexMap<String, Vec<String>>);

impl Headers {
    /// An empty header map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All values recorded under this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.0
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, values)| values.as_slice())
    }

    /// The first value recorded under this name.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)?.first().map(String::as_str)
    }

    /// Whether any value is recorded under this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends one value under this name, creating the header as needed.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(&name)) {
            Some((_, values)) => values.push(value),
            None => {
                self.0.insert(name, vec![value]);
            }
        }
    }

    /// Replaces the values under this name in place, keeping the recorded
    /// casing and position; inserts at the end when the header is new.
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        match self.0.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
            Some((_, current)) => *current = values,
            None => {
                self.0.insert(name.to_string(), values);
            }
        }
    }

    /// Removes the header entirely.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|key, _| !key.eq_ignore_ascii_case(name));
    }

    /// Removes one value from the header's list, dropping the header when the
    /// list empties.
    pub fn remove_value(&mut self, name: &str, value: &str) {
        for (key, values) in &mut self.0 {
            if key.eq_ignore_ascii_case(name) {
                values.retain(|candidate| candidate != value);
            }
        }
        self.0.retain(|key, values| {
            !(key.eq_ignore_ascii_case(name) && values.is_empty())
        });
    }

    /// Iterates the headers in recorded order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

impl<N, V> FromIterator<(N, V)> for Headers
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// One recorded HTTP request, as the host recorder hands it to the hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Request method (`GET`, `POST`, ...).
    pub method: String,
    /// Absolute request URL.
    pub url: String,
    /// Request headers.
    pub headers: Headers,
    /// Raw body bytes; the encoding depends on the content type.
    pub body: Vec<u8>,
}

impl Request {
    /// The host component of the request URL, when the URL parses.
    #[must_use]
    pub fn host(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        parsed.host_str().map(str::to_owned)
    }
}

/// One recorded HTTP response, in the serialized cassette shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Response headers.
    pub headers: Headers,
    /// Response body wrapper.
    pub body: ResponseBody,
}

/// The cassette body wrapper: raw bytes under a `string` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseBody {
    /// Raw body bytes.
    pub string: Vec<u8>,
}

/// Scrubs Graph API credentials from recorded requests and responses.
///
/// Built with [`GraphScrubber::builder`]; all configuration is optional. Every
/// transform is a pure function over its input; the scrubber holds no mutable
/// state and is safe to share across threads.
///
/// # Example
///
/// ```rust
/// use vcr_graph_core::{GraphScrubber, Headers, Request};
///
/// let scrubber = GraphScrubber::builder().build();
///
/// let request = Request {
///     method: "GET".to_string(),
///     url: "https://graph.facebook.com/v2.4/me?access_token=AAAAAAAAAAAAAAAAAAAAAAAAAAAA"
///         .to_string(),
///     headers: Headers::new(),
///     body: Vec::new(),
/// };
///
/// let scrubbed = scrubber.before_record(request);
/// assert_eq!(
///     scrubbed.url,
///     "https://graph.facebook.com/v2.4/me?access_token=XXX-35ea99843da5ff0639992be381c5b77a"
/// );
/// ```
#[derive(Clone)]
pub struct GraphScrubber {
    prefix: String,
    appsecret_proof: Option<ProofResolver>,
    access_token: Option<TokenResolver>,
    client_secret: Option<TokenResolver>,
}

impl GraphScrubber {
    /// Starts building a scrubber.
    #[must_use]
    pub fn builder() -> GraphScrubberBuilder {
        GraphScrubberBuilder::default()
    }

    /// The configured elider prefix.
    #[must_use]
    pub fn elider_prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for GraphScrubber {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl fmt::Debug for GraphScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphScrubber")
            .field("prefix", &self.prefix)
            .field("appsecret_proof", &self.appsecret_proof.as_ref().map(|_| "..."))
            .field("access_token", &self.access_token.as_ref().map(|_| "..."))
            .field("client_secret", &self.client_secret.as_ref().map(|_| "..."))
            .finish()
    }
}

/// Builder for [`GraphScrubber`].
///
/// # Default configuration
///
/// - **Elider prefix**: [`DEFAULT_ELIDER_PREFIX`] (`XXX-`)
/// - **Resolvers**: none (secrets elide to their MD5 digest)
#[derive(Default)]
pub struct GraphScrubberBuilder {
    prefix: Option<String>,
    appsecret_proof: Option<ProofResolver>,
    access_token: Option<TokenResolver>,
    client_secret: Option<TokenResolver>,
}

impl GraphScrubberBuilder {
    /// Overrides the prefix that tags (and detects) elided values.
    #[must_use]
    pub fn with_elider_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Supplies a replacement for elided `appsecret_proof` values.
    ///
    /// The resolver receives the proof and the co-located access token, which
    /// is still unredacted at that point in the pipeline. Returning `None` (or
    /// an empty string) falls back to the digest placeholder.
    #[must_use]
    pub fn with_appsecret_proof_resolver(
        mut self,
        resolve: impl Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.appsecret_proof = Some(Arc::new(resolve));
        self
    }

    /// Supplies a replacement for elided `access_token` values.
    #[must_use]
    pub fn with_access_token_resolver(
        mut self,
        resolve: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.access_token = Some(Arc::new(resolve));
        self
    }

    /// Supplies a replacement for elided `client_secret` values.
    #[must_use]
    pub fn with_client_secret_resolver(
        mut self,
        resolve: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.client_secret = Some(Arc::new(resolve));
        self
    }

    /// Builds the scrubber.
    #[must_use]
    pub fn build(self) -> GraphScrubber {
        GraphScrubber {
            prefix: self.prefix.unwrap_or_else(|| DEFAULT_ELIDER_PREFIX.to_string()),
            appsecret_proof: self.appsecret_proof,
            access_token: self.access_token,
            client_secret: self.client_secret,
        }
    }
}

impl fmt::Debug for GraphScrubberBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphScrubberBuilder")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Composes the request scrub with a previously installed `before_record` hook.
///
/// The scrub runs first; the wrapped hook sees only sanitized requests. Use
/// `std::convert::identity`-style closures when no prior hook exists.
pub fn wrap_before_record<F>(
    scrubber: GraphScrubber,
    wrapped: F,
) -> impl Fn(Request) -> Request
where
    F: Fn(Request) -> Request,
{
    move |request| wrapped(scrubber.before_record(request))
}

/// Composes the response scrub with a previously installed
/// `before_record_response` hook.
pub fn wrap_before_record_response<F>(
    scrubber: GraphScrubber,
    wrapped: F,
) -> impl Fn(Response) -> Response
where
    F: Fn(Response) -> Response,
{
    move |response| wrapped(scrubber.before_record_response(&response))
}
