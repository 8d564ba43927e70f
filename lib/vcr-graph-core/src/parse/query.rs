use std::fmt;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::ParseError;

use super::FormFields;

/// Characters escaped when re-encoding a query component.
///
/// Everything except alphanumerics and `_ . - ~ /` is percent-escaped, which is
/// the conservative quoting the Graph API fixtures were recorded with. Keeping
/// `/` unescaped matters for the `batch` parameter, whose JSON value embeds
/// relative URLs.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// An ordered, percent-decoded view of a `key=value&key=value` query string.
///
/// Pair order and duplicates are preserved exactly as encountered; both affect
/// byte-stable re-serialization and some Graph endpoints are order-sensitive.
/// Parsing is strict: a field without `=` fails the whole parse, which is what
/// keeps the query filter away from bodies that merely resemble form data.
///
/// # Example
///
/// ```rust
/// use vcr_graph_core::parse::{FormFields, QueryString};
///
/// # fn example() -> Result<(), vcr_graph_core::ParseError> {
/// let mut query = QueryString::parse("fields=name%2Cid&summary=true")?;
/// assert_eq!(query.get("fields").as_deref(), Some("name,id"));
///
/// query.set("summary", "false");
/// assert_eq!(query.to_string(), "fields=name%2Cid&summary=false");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, String)>,
}

impl QueryString {
    /// Parses a raw query string into ordered key/value pairs.
    ///
    /// Blank values are kept (`a=&b=1` yields two pairs) and `+` decodes to a
    /// space, matching how the fixtures were produced.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::MalformedQuery`] for an empty input or a field
    /// without `=`, and [`ParseError::InvalidUtf8`] when a percent-escape does
    /// not decode to UTF-8.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Err(ParseError::MalformedQuery {
                fragment: String::new(),
            });
        }
        let pairs = raw
            .split('&')
            .map(|field| {
                let (key, value) = field.split_once('=').ok_or_else(|| {
                    ParseError::MalformedQuery {
                        fragment: field.to_string(),
                    }
                })?;
                Ok((decode_component(key)?, decode_component(value)?))
            })
            .collect::<Result<Vec<_>, ParseError>>()?;
        Ok(Self { pairs })
    }

    /// Whether the query holds no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The decoded pairs, in encounter order.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

impl FormFields for QueryString {
    fn get(&self, name: &str) -> Option<String> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn set(&mut self, name: &str, value: &str) {
        for (key, current) in &mut self.pairs {
            if key == name {
                *current = value.to_string();
            }
        }
    }
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.pairs {
            if !first {
                f.write_str("&")?;
            }
            first = false;
            write!(
                f,
                "{}={}",
                utf8_percent_encode(key, QUERY_ESCAPE),
                utf8_percent_encode(value, QUERY_ESCAPE)
            )?;
        }
        Ok(())
    }
}

fn decode_component(raw: &str) -> Result<String, ParseError> {
    let unplussed = raw.replace('+', " ");
    percent_decode_str(&unplussed)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ParseError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order_and_blanks() {
        let query = QueryString::parse("b=2&a=&c=3").expect("should parse");
        assert_eq!(
            query.pairs(),
            &[
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), String::new()),
                ("c".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_round_trip_is_stable() {
        let raw = "access_token=abc&fields=name%2Cid&path=a/b";
        let query = QueryString::parse(raw).expect("should parse");
        assert_eq!(query.to_string(), raw);
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let query = QueryString::parse("q=a+b").expect("should parse");
        assert_eq!(query.get("q").as_deref(), Some("a b"));
        insta::assert_snapshot!(query, @"q=a%20b");
    }

    #[test]
    fn test_strict_parse_rejects_bare_field() {
        let result = QueryString::parse("just-some-text");
        assert!(matches!(
            result,
            Err(ParseError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn test_strict_parse_rejects_empty_input() {
        assert!(QueryString::parse("").is_err());
    }

    #[test]
    fn test_set_rewrites_every_duplicate() {
        let mut query = QueryString::parse("token=a&x=1&token=b").expect("should parse");
        query.set("token", "gone");
        assert_eq!(query.to_string(), "token=gone&x=1&token=gone");
    }

    #[test]
    fn test_get_returns_first_occurrence() {
        let query = QueryString::parse("token=a&token=b").expect("should parse");
        assert_eq!(query.get("token").as_deref(), Some("a"));
    }

    #[test]
    fn test_json_value_survives_encoding() {
        let mut query = QueryString::parse("batch=x").expect("should parse");
        query.set("batch", r#"[{"method":"GET","relative_url":"v2.4/me"}]"#);
        insta::assert_snapshot!(
            query,
            @"batch=%5B%7B%22method%22%3A%22GET%22%2C%22relative_url%22%3A%22v2.4/me%22%7D%5D"
        );
    }
}
