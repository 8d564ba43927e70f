//! The incoming-response pipeline: decompression, token redaction and
//! content-length repair.

use std::io::Read as _;
use std::sync::LazyLock;

use flate2::read::GzDecoder;
use regex::{Captures, Regex};
use tracing::debug;

use crate::elide::elide_token;

use super::{GraphScrubber, Response};

/// Responses carrying this header are Graph API traffic; anything else is
/// assumed unrelated and passed through verbatim (never decompress or redact
/// arbitrary third-party responses).
const API_VERSION_HEADER: &str = "facebook-api-version";

// Access tokens only ever surface in two textual shapes inside a response:
// as a JSON string field, and embedded in paging URLs. Two pattern passes
// reach every nesting depth (top level, paged list items, batch sub-response
// bodies) without chasing schema variants, which a JSON tree walk would have
// to special-case one by one.
static JSON_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""access_token":\s*"([^"]+)""#).expect("a valid regex"));
static URL_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"access_token=([^&"]+)"#).expect("a valid regex"));

impl GraphScrubber {
    /// Scrubs one recorded response before it is persisted.
    ///
    /// Responses without the Graph version header are returned as-is. For
    /// Graph traffic the transform works on a copy: gzip bodies are inflated
    /// (dropping the `gzip` encoding marker), every access token occurrence in
    /// the body text is elided, and `content-length` is recomputed from the
    /// final body bytes.
    ///
    /// The response handed back here is both what gets recorded and what the
    /// application sees on the first pass, so tokens are replaced by stable
    /// digests rather than stripped: a paging URL elided in this response
    /// matches the same elided token in the follow-up request's fixture.
    #[must_use]
    pub fn before_record_response(&self, response: &Response) -> Response {
        if !response.headers.contains(API_VERSION_HEADER) {
            return response.clone();
        }
        debug!("scrubbing recorded graph response");

        let mut response = response.clone();
        ungzip(&mut response);
        self.redact_access_tokens(&mut response);
        update_content_length(&mut response);
        response
    }

    fn redact_access_tokens(&self, response: &mut Response) {
        let body = std::mem::take(&mut response.body.string);
        let text = match String::from_utf8(body) {
            Ok(text) => text,
            Err(not_utf8) => {
                debug!("response body is not UTF-8; skipping token redaction");
                response.body.string = not_utf8.into_bytes();
                return;
            }
        };

        let text = JSON_TOKEN_RE.replace_all(&text, |captures: &Captures<'_>| {
            format!(r#""access_token":"{}""#, self.elide(&captures[1]))
        });
        let text = URL_TOKEN_RE.replace_all(&text, |captures: &Captures<'_>| {
            format!("access_token={}", self.elide(&captures[1]))
        });

        response.body.string = text.into_owned().into_bytes();
    }

    fn elide(&self, orig: &str) -> String {
        elide_token(orig, self.access_token.as_ref(), &self.prefix)
    }
}

/// Inflates a gzip body and drops the `gzip` marker from `content-encoding`,
/// removing the header once its list empties.
fn ungzip(response: &mut Response) {
    let is_gzip = response
        .headers
        .get("content-encoding")
        .is_some_and(|values| values.iter().any(|value| value == "gzip"));
    if !is_gzip {
        return;
    }

    let mut inflated = Vec::new();
    let mut decoder = GzDecoder::new(response.body.string.as_slice());
    if let Err(error) = decoder.read_to_end(&mut inflated) {
        debug!(%error, "body declared gzip but did not inflate; leaving it alone");
        return;
    }

    response.body.string = inflated;
    response.headers.remove_value("content-encoding", "gzip");
}

/// Repairs `content-length` to the final body byte count, when present.
fn update_content_length(response: &mut Response) {
    if response.headers.contains("content-length") {
        response
            .headers
            .set("content-length", vec![response.body.string.len().to_string()]);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;
    use crate::record::{Headers, ResponseBody};

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).expect("gzip write should succeed");
        encoder.finish().expect("gzip finish should succeed")
    }

    #[test]
    fn test_ungzip_inflates_and_drops_marker() {
        let mut response = Response {
            headers: Headers::from_iter([
                ("content-encoding", "gzip"),
                ("content-type", "application/json; charset=UTF-8"),
            ]),
            body: ResponseBody {
                string: gzip(b"{\"ok\":true}"),
            },
        };

        ungzip(&mut response);

        assert_eq!(response.body.string, b"{\"ok\":true}");
        assert!(!response.headers.contains("content-encoding"));
        assert!(response.headers.contains("content-type"));
    }

    #[test]
    fn test_ungzip_keeps_other_encodings() {
        let mut response = Response {
            headers: Headers::from_iter([("content-encoding", "gzip")]),
            body: ResponseBody {
                string: gzip(b"payload"),
            },
        };
        response.headers.append("content-encoding", "identity");

        ungzip(&mut response);

        assert_eq!(
            response.headers.get("content-encoding"),
            Some(["identity".to_string()].as_slice())
        );
    }

    #[test]
    fn test_ungzip_keeps_undecodable_body_and_header() {
        let mut response = Response {
            headers: Headers::from_iter([("content-encoding", "gzip")]),
            body: ResponseBody {
                string: b"not actually gzip".to_vec(),
            },
        };

        ungzip(&mut response);

        assert_eq!(response.body.string, b"not actually gzip");
        assert_eq!(
            response.headers.get("content-encoding"),
            Some(["gzip".to_string()].as_slice())
        );
    }

    #[test]
    fn test_ungzip_leaves_undeclared_bodies_alone() {
        let mut response = Response {
            headers: Headers::new(),
            body: ResponseBody {
                string: b"plain".to_vec(),
            },
        };
        ungzip(&mut response);
        assert_eq!(response.body.string, b"plain");
    }

    #[test]
    fn test_update_content_length_matches_body() {
        let mut response = Response {
            headers: Headers::from_iter([("content-length", "1")]),
            body: ResponseBody {
                string: b"twelve bytes".to_vec(),
            },
        };
        update_content_length(&mut response);
        assert_eq!(response.headers.first("content-length"), Some("12"));
    }

    #[test]
    fn test_update_content_length_does_not_invent_the_header() {
        let mut response = Response {
            headers: Headers::new(),
            body: ResponseBody {
                string: b"body".to_vec(),
            },
        };
        update_content_length(&mut response);
        assert!(!response.headers.contains("content-length"));
    }

    #[test]
    fn test_token_patterns_cover_json_and_paging_shapes() {
        let scrubber = GraphScrubber::builder().build();
        let mut response = Response {
            headers: Headers::from_iter([(API_VERSION_HEADER, "v2.4")]),
            body: ResponseBody {
                string: br#"{"access_token": "secret","paging":{"next":"https://graph.facebook.com/v2.4/me?access_token=secret&limit=4"}}"#.to_vec(),
            },
        };

        scrubber.redact_access_tokens(&mut response);

        let text = String::from_utf8(response.body.string).expect("body should stay UTF-8");
        insta::assert_snapshot!(
            text,
            @r#"{"access_token":"XXX-5ebe2294ecd0e0f08eab7690d2a6ee69","paging":{"next":"https://graph.facebook.com/v2.4/me?access_token=XXX-5ebe2294ecd0e0f08eab7690d2a6ee69&limit=4"}}"#
        );
    }
}
