//! The outgoing-request pipeline: body, URL, header and boundary scrubbing.

use std::sync::Arc;

use tracing::debug;

use crate::elide::{Elider, Resolution, TokenResolver, fallback_digest};
use crate::filter::{filter_batch_relative_urls, filter_multipart, filter_query, filter_url};
use crate::parse::{FormFields, MultipartBody, contains_subslice};

use super::{GraphScrubber, Request};

/// Only traffic against this host is scrubbed; everything else passes through.
const GRAPH_HOST: &str = "graph.facebook.com";

/// File-upload parts with content over this many bytes are replaced by their
/// digest, so fixtures do not accumulate binary blobs.
const UPLOAD_DIGEST_THRESHOLD: usize = 100;

/// Replacement boundary pool, truncated to the recorded boundary's length so
/// the content-type header and the body stay consistent. Fixtures recorded at
/// different times then carry identical, diffable boundaries.
const SYNTHETIC_BOUNDARY: &str =
    "xxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARYxxBOUNDARY";

impl GraphScrubber {
    /// Scrubs one outgoing request before it is persisted.
    ///
    /// Requests against hosts other than the Graph API are returned unchanged.
    /// For Graph traffic, in order: the body is filtered (upload digesting and
    /// the three eliders, through the multipart layer or through the batch and
    /// query layers depending on the body's shape), the top-level URL query is
    /// elided, the stale `content-length` header is dropped, and finally the
    /// multipart boundary is normalized. The eliders run before the boundary
    /// substitution so redacted values are captured under the original
    /// framing; only the boundary token changes afterwards.
    #[must_use]
    pub fn before_record(&self, mut request: Request) -> Request {
        if request.host().as_deref() != Some(GRAPH_HOST) {
            return request;
        }
        debug!(url = %request.url, "scrubbing recorded graph request");

        request.body = self.scrub_body(request.body);
        request.url = filter_url(&request.url, |query| self.apply_eliders(query));
        request.headers.remove("content-length");
        self.normalize_multipart_boundary(&mut request);
        request
    }

    /// A multipart body is handled entirely in the multipart domain: the query
    /// filter must never see it, since its strict parse can accept a body with
    /// no `&` as one giant pair and the re-encode would destroy the framing.
    /// Text bodies get the batch and query layers; non-UTF-8 bodies that are
    /// not multipart carry nothing either layer could read and pass through.
    fn scrub_body(&self, body: Vec<u8>) -> Vec<u8> {
        match MultipartBody::parse(&body) {
            Ok(mut parts) => {
                digest_uploads(&mut parts);
                self.apply_eliders(&mut parts);
                parts.to_bytes()
            }
            Err(_) => match String::from_utf8(body) {
                Ok(text) => {
                    let text =
                        filter_batch_relative_urls(&text, |query| self.apply_eliders(query));
                    filter_query(&text, |query| self.apply_eliders(query)).into_bytes()
                }
                Err(not_utf8) => not_utf8.into_bytes(),
            },
        }
    }

    fn apply_eliders(&self, fields: &mut dyn FormFields) {
        for elider in self.eliders() {
            elider.apply(fields);
        }
    }

    /// The three credential eliders, in dependency order: `appsecret_proof`
    /// first, while the sibling `access_token` it may need is still present in
    /// the clear.
    fn eliders(&self) -> [Elider; 3] {
        [
            self.appsecret_proof_elider(),
            self.scalar_elider("access_token", self.access_token.clone()),
            self.scalar_elider("client_secret", self.client_secret.clone()),
        ]
    }

    fn appsecret_proof_elider(&self) -> Elider {
        match self.appsecret_proof.clone() {
            None => Elider::new("appsecret_proof", &self.prefix),
            Some(resolve) => Elider::with_resolver(
                "appsecret_proof",
                &self.prefix,
                Arc::new(move |fields: &dyn FormFields| {
                    let Some(proof) = fields.get("appsecret_proof") else {
                        return Resolution::Skip;
                    };
                    let Some(token) = fields.get("access_token") else {
                        return Resolution::Skip;
                    };
                    match resolve(&proof, &token) {
                        Some(replacement) => Resolution::Value(replacement),
                        None => Resolution::Fallback,
                    }
                }),
            ),
        }
    }

    fn scalar_elider(&self, field: &'static str, resolve: Option<TokenResolver>) -> Elider {
        match resolve {
            None => Elider::new(field, &self.prefix),
            Some(resolve) => Elider::with_resolver(
                field,
                &self.prefix,
                Arc::new(move |fields: &dyn FormFields| {
                    match fields.get(field).and_then(|value| resolve(&value)) {
                        Some(replacement) => Resolution::Value(replacement),
                        None => Resolution::Fallback,
                    }
                }),
            ),
        }
    }

    /// Rewrites the sniffed boundary and the content-type `boundary` parameter
    /// to the synthetic constant, truncated to the recorded length.
    ///
    /// # Panics
    ///
    /// Panics when the declared boundary exceeds the synthetic pool or when
    /// the body's sniffed boundary length disagrees with the declared one;
    /// either would leave the header and body inconsistent in the fixture.
    fn normalize_multipart_boundary(&self, request: &mut Request) {
        let Some(content_type) = request.headers.first("content-type").map(str::to_owned)
        else {
            return;
        };
        let Some((parameter, declared)) = content_type.split_once('=') else {
            return;
        };
        if parameter != "multipart/form-data; boundary" || declared.is_empty() {
            return;
        }
        assert!(
            declared.len() <= SYNTHETIC_BOUNDARY.len(),
            "declared multipart boundary exceeds the synthetic replacement pool"
        );
        let replacement = &SYNTHETIC_BOUNDARY[..declared.len()];

        request
            .headers
            .set("content-type", vec![format!("{parameter}={replacement}")]);
        request.body = filter_multipart(&request.body, |parts| {
            parts.set_boundary(replacement.as_bytes());
        });
    }
}

/// Replaces oversized file-upload content by its hex digest.
///
/// A digested part is 32 bytes of hex, under the threshold, so a second pass
/// leaves it alone.
fn digest_uploads(parts: &mut MultipartBody) {
    for part in parts.parts_mut() {
        if contains_subslice(part.header(), b"; filename=\"")
            && part.content().len() > UPLOAD_DIGEST_THRESHOLD
        {
            let digest = fallback_digest(part.content());
            part.set_content(digest.as_bytes());
        }
    }
}
