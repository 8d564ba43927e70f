use std::fmt;

use serde_json::Value;

use crate::error::ParseError;

/// The JSON array of sub-request entries carried in a `batch` query parameter.
///
/// Entries are kept as generic JSON objects so unknown fields round-trip.
/// Re-serialization is compact with sorted object keys (serde_json's default
/// map representation), so repeated runs over unchanged data emit identical
/// bytes and fixtures diff cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    entries: Vec<Value>,
}

impl Batch {
    /// Parses the batch parameter value as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::BatchJson`] when the value is not a JSON array.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let entries = serde_json::from_str::<Vec<Value>>(raw).map_err(ParseError::BatchJson)?;
        Ok(Self { entries })
    }

    /// Mutable access to every entry's embedded `relative_url` string.
    ///
    /// Entries without a string `relative_url` are skipped; a batch entry's
    /// `method` and `body` fields are not this crate's concern.
    pub fn relative_urls_mut(&mut self) -> impl Iterator<Item = &mut String> {
        self.entries
            .iter_mut()
            .filter_map(|entry| match entry.get_mut("relative_url") {
                Some(Value::String(url)) => Some(url),
                _ => None,
            })
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let compact = serde_json::to_string(&self.entries).map_err(|_| fmt::Error)?;
        f.write_str(&compact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserialization_sorts_keys_compactly() {
        let raw = r#"[ {"relative_url": "v2.4/me", "method": "GET"} ]"#;
        let batch = Batch::parse(raw).expect("should parse");
        insta::assert_snapshot!(batch, @r#"[{"method":"GET","relative_url":"v2.4/me"}]"#);
    }

    #[test]
    fn test_relative_urls_are_rewritable() {
        let raw = r#"[{"method":"GET","relative_url":"v2.4/me?access_token=secret"},{"body":"x=1","method":"POST"}]"#;
        let mut batch = Batch::parse(raw).expect("should parse");
        for url in batch.relative_urls_mut() {
            *url = "v2.4/me?access_token=XXX-redacted".to_string();
        }
        insta::assert_snapshot!(
            batch,
            @r#"[{"method":"GET","relative_url":"v2.4/me?access_token=XXX-redacted"},{"body":"x=1","method":"POST"}]"#
        );
    }

    #[test]
    fn test_non_array_is_rejected() {
        assert!(matches!(
            Batch::parse(r#"{"not":"an array"}"#),
            Err(ParseError::BatchJson(_))
        ));
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let raw = r#"[{"headers":[{"name":"If-None-Match","value":"x"}],"method":"GET","relative_url":"v2.4/me"}]"#;
        let batch = Batch::parse(raw).expect("should parse");
        assert_eq!(batch.to_string(), raw);
    }
}
