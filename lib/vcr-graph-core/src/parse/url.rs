use std::fmt;

use crate::error::ParseError;

use super::QueryString;

/// A URL split into `base?query`, with the query parsed as a [`QueryString`].
///
/// Only the query portion is interpreted; the base is carried verbatim, so this
/// works equally for absolute request URLs and for the relative URLs embedded
/// in batch sub-requests (`v2.4/me?access_token=...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeUrl {
    base: String,
    query: QueryString,
}

impl RelativeUrl {
    /// Splits the URL at the first `?` and parses the query portion.
    ///
    /// # Errors
    ///
    /// Fails when the query portion fails strict parsing; a URL without a
    /// query falls under this (there is nothing to rewrite in it anyway).
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let (base, query) = raw.split_once('?').unwrap_or((raw, ""));
        Ok(Self {
            base: base.to_string(),
            query: QueryString::parse(query)?,
        })
    }

    /// Mutable access to the parsed query pairs.
    pub fn query_mut(&mut self) -> &mut QueryString {
        &mut self.query
    }
}

impl fmt::Display for RelativeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.base)
        } else {
            write!(f, "{}?{}", self.base, self.query)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::FormFields;

    #[test]
    fn test_round_trip() {
        let raw = "https://graph.facebook.com/v2.4/me?access_token=abc&fields=name";
        let url = RelativeUrl::parse(raw).expect("should parse");
        assert_eq!(url.to_string(), raw);
    }

    #[test]
    fn test_rewrite_only_touches_query() {
        let mut url =
            RelativeUrl::parse("v2.4/111?access_token=secret&summary=true").expect("should parse");
        url.query_mut().set("access_token", "XXX-redacted");
        insta::assert_snapshot!(url, @"v2.4/111?access_token=XXX-redacted&summary=true");
    }

    #[test]
    fn test_url_without_query_is_unparsed() {
        assert!(RelativeUrl::parse("https://graph.facebook.com/").is_err());
    }
}
