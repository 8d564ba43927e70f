use crate::error::ParseError;

use super::FormFields;

const CRLF: &[u8] = b"\r\n";
const HEADER_DELIMITER: &[u8] = b"\r\n\r\n";

/// A minimally-parsed `multipart/form-data` body.
///
/// This deliberately avoids a full MIME decode: the boundary is sniffed from
/// the first line of the body (the content-type header is not trusted), and
/// each part keeps its raw header and content bytes verbatim. File-upload
/// content is arbitrary binary and must never go through text handling, so the
/// parse is split/join around boundary markers and nothing more.
///
/// Parsing fails structurally when the leading `--boundary` or trailing
/// `--boundary--` markers are absent; the filter layer treats that like any
/// other unparsable payload and passes the bytes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: Vec<u8>,
    parts: Vec<Part>,
}

/// One segment of a multipart body: a raw byte span holding a header block
/// (up to the first blank line) and a content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    bytes: Vec<u8>,
}

impl MultipartBody {
    /// Sniffs the boundary from the first line and splits the body into parts.
    ///
    /// # Errors
    ///
    /// - [`ParseError::NotMultipart`] when the body does not open with `--`;
    /// - [`ParseError::MissingLeader`] / [`ParseError::MissingTerminator`] when
    ///   the framing markers around the parts are absent.
    pub fn parse(raw: &[u8]) -> Result<Self, ParseError> {
        if !raw.starts_with(b"--") {
            return Err(ParseError::NotMultipart);
        }
        let first_line_end = find_subslice(raw, CRLF).ok_or(ParseError::NotMultipart)?;
        let boundary = raw
            .get(2..first_line_end)
            .ok_or(ParseError::NotMultipart)?
            .to_vec();

        let leader = [b"--".as_slice(), boundary.as_slice(), CRLF].concat();
        let terminator = [
            CRLF,
            b"--".as_slice(),
            boundary.as_slice(),
            b"--".as_slice(),
            CRLF,
        ]
        .concat();
        if !raw.starts_with(&leader) {
            return Err(ParseError::MissingLeader);
        }
        if raw.len() < leader.len() + terminator.len() || !raw.ends_with(&terminator) {
            return Err(ParseError::MissingTerminator);
        }

        let interior = &raw[leader.len()..raw.len() - terminator.len()];
        let splitter = [CRLF, b"--".as_slice(), boundary.as_slice(), CRLF].concat();
        let parts = split_on(interior, &splitter)
            .into_iter()
            .map(|bytes| Part { bytes })
            .collect();

        Ok(Self { boundary, parts })
    }

    /// Re-synthesizes the full body around the current boundary and parts.
    ///
    /// Byte-identical to the input when nothing was mutated.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let splitter = [CRLF, b"--".as_slice(), self.boundary.as_slice(), CRLF].concat();
        let interior = self
            .parts
            .iter()
            .map(|part| part.bytes.as_slice())
            .collect::<Vec<_>>()
            .join(splitter.as_slice());
        [
            b"--".as_slice(),
            self.boundary.as_slice(),
            CRLF,
            interior.as_slice(),
            CRLF,
            b"--".as_slice(),
            self.boundary.as_slice(),
            b"--".as_slice(),
            CRLF,
        ]
        .concat()
    }

    /// The sniffed boundary token (without the `--` markers).
    #[must_use]
    pub fn boundary(&self) -> &[u8] {
        &self.boundary
    }

    /// Replaces the boundary token.
    ///
    /// The replacement must have exactly the sniffed boundary's length so the
    /// content-type header and the body stay consistent without rewriting any
    /// part. A mismatch is an invariant violation, not a recoverable state.
    ///
    /// # Panics
    ///
    /// Panics when the replacement length differs from the current boundary.
    pub fn set_boundary(&mut self, boundary: &[u8]) {
        assert_eq!(
            boundary.len(),
            self.boundary.len(),
            "replacement boundary must match the sniffed boundary length"
        );
        self.boundary = boundary.to_vec();
    }

    /// Mutable access to the parts, in body order.
    pub fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }

    /// The parts, in body order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    fn position(&self, name: &str) -> Option<usize> {
        let needle = format!("; name=\"{name}\"");
        self.parts
            .iter()
            .position(|part| contains_subslice(part.header(), needle.as_bytes()))
    }
}

impl FormFields for MultipartBody {
    fn get(&self, name: &str) -> Option<String> {
        let index = self.position(name)?;
        let part = self.parts.get(index)?;
        Some(String::from_utf8_lossy(part.content()).into_owned())
    }

    fn set(&mut self, name: &str, value: &str) {
        if let Some(index) = self.position(name)
            && let Some(part) = self.parts.get_mut(index)
        {
            part.set_content(value.as_bytes());
        }
    }
}

impl Part {
    /// The header block: everything before the first blank line, or the whole
    /// span when the part has no blank-line delimiter.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        match find_subslice(&self.bytes, HEADER_DELIMITER) {
            Some(at) => &self.bytes[..at],
            None => &self.bytes,
        }
    }

    /// The content block: everything after the first blank line.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        match find_subslice(&self.bytes, HEADER_DELIMITER) {
            Some(at) => &self.bytes[at + HEADER_DELIMITER.len()..],
            None => &[],
        }
    }

    /// Replaces the content block, re-synthesizing the part's byte span.
    pub fn set_content(&mut self, content: &[u8]) {
        self.bytes = [self.header(), HEADER_DELIMITER, content].concat();
    }
}

pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

pub(crate) fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    find_subslice(haystack, needle).is_some()
}

fn split_on(haystack: &[u8], splitter: &[u8]) -> Vec<Vec<u8>> {
    let mut segments = Vec::new();
    let mut rest = haystack;
    while let Some(at) = find_subslice(rest, splitter) {
        segments.push(rest[..at].to_vec());
        rest = &rest[at + splitter.len()..];
    }
    segments.push(rest.to_vec());
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_body() -> Vec<u8> {
        b"--xyzBOUNDARY\r\n\
          Content-Disposition: form-data; name=\"access_token\"\r\n\
          \r\n\
          abcde12345abcde12345\r\n\
          --xyzBOUNDARY\r\n\
          Content-Disposition: form-data; name=\"source\"; filename=\"photo.jpg\"\r\n\
          Content-Type: image/jpeg\r\n\
          \r\n\
          \x00\x01\x02binary\xffdata\r\n\
          --xyzBOUNDARY--\r\n"
            .to_vec()
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let raw = sample_body();
        let body = MultipartBody::parse(&raw).expect("should parse");
        assert_eq!(body.to_bytes(), raw);
    }

    #[test]
    fn test_sniffs_boundary_from_first_line() {
        let body = MultipartBody::parse(&sample_body()).expect("should parse");
        assert_eq!(body.boundary(), b"xyzBOUNDARY");
        assert_eq!(body.parts().len(), 2);
    }

    #[test]
    fn test_get_and_set_field() {
        let mut body = MultipartBody::parse(&sample_body()).expect("should parse");
        assert_eq!(
            body.get("access_token").as_deref(),
            Some("abcde12345abcde12345")
        );

        body.set("access_token", "XXX-redacted");
        let reparsed = MultipartBody::parse(&body.to_bytes()).expect("should reparse");
        assert_eq!(reparsed.get("access_token").as_deref(), Some("XXX-redacted"));
    }

    #[test]
    fn test_binary_content_survives_untouched_rewrites() {
        let mut body = MultipartBody::parse(&sample_body()).expect("should parse");
        body.set("access_token", "XXX-redacted");
        let reparsed = MultipartBody::parse(&body.to_bytes()).expect("should reparse");
        let file_part = reparsed
            .parts()
            .iter()
            .find(|part| contains_subslice(part.header(), b"; filename=\""))
            .expect("file part should survive");
        assert_eq!(file_part.content(), b"\x00\x01\x02binary\xffdata");
    }

    #[test]
    fn test_non_multipart_is_rejected() {
        assert!(matches!(
            MultipartBody::parse(b"access_token=abc"),
            Err(ParseError::NotMultipart)
        ));
    }

    #[test]
    fn test_missing_terminator_is_rejected() {
        let mut raw = sample_body();
        raw.truncate(raw.len() - 4);
        assert!(matches!(
            MultipartBody::parse(&raw),
            Err(ParseError::MissingTerminator)
        ));
    }

    #[test]
    fn test_set_boundary_keeps_length() {
        let mut body = MultipartBody::parse(&sample_body()).expect("should parse");
        body.set_boundary(b"xxBOUNDARYx");
        let rewritten = body.to_bytes();
        assert!(rewritten.starts_with(b"--xxBOUNDARYx\r\n"));
        assert!(rewritten.ends_with(b"\r\n--xxBOUNDARYx--\r\n"));
    }

    #[test]
    #[should_panic(expected = "replacement boundary must match")]
    fn test_set_boundary_rejects_length_mismatch() {
        let mut body = MultipartBody::parse(&sample_body()).expect("should parse");
        body.set_boundary(b"short");
    }
}
