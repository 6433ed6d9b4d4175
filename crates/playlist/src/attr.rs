//! Attribute-list parsing for tags of the form `#TAG:KEY=VALUE,KEY=VALUE,...`.
//!
//! Splitting happens on top-level commas only; commas inside double-quoted
//! values do not split. Duplicate names keep the last occurrence, unknown
//! names are dropped, and both emit a diagnostic rather than failing.

use std::str::FromStr;

use tracing::{debug, warn};

use crate::error::PlaylistError;
use crate::types::{RawByteRange, Resolution};

/// A parsed attribute list: name -> raw value substring, last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeList<'a> {
    entries: Vec<(&'a str, &'a str)>,
}

impl<'a> AttributeList<'a> {
    /// Parse `input`, keeping only attributes whose names appear in `known`.
    pub fn parse(input: &'a str, known: &[&'static str]) -> Self {
        let mut entries: Vec<(&'a str, &'a str)> = Vec::new();

        for item in split_top_level(input) {
            let Some((name, value)) = item.split_once('=') else {
                debug!("skipping malformed attribute `{item}`");
                continue;
            };
            if !known.contains(&name) {
                debug!("dropping unknown attribute `{name}`");
                continue;
            }
            if let Some(existing) = entries.iter_mut().find(|(n, _)| *n == name) {
                warn!("duplicate attribute `{name}`, keeping the last occurrence");
                existing.1 = value;
            } else {
                entries.push((name, value));
            }
        }

        Self { entries }
    }

    pub fn raw(&self, name: &str) -> Option<&'a str> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Unquoted string value; surrounding double quotes are stripped.
    pub fn string(&self, name: &'static str) -> Option<String> {
        self.raw(name).map(|v| v.trim_matches('"').to_string())
    }

    /// Comma-separated list inside a quoted string, e.g. `CODECS="a,b"`.
    pub fn string_list(&self, name: &'static str) -> Vec<String> {
        match self.string(name) {
            Some(joined) if !joined.is_empty() => {
                joined.split(',').map(|s| s.to_string()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Parse an unquoted scalar value. `Ok(None)` when absent.
    pub fn value<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, PlaylistError> {
        match self.raw(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim_matches('"')
                .parse()
                .map(Some)
                .map_err(|_| PlaylistError::invalid_attribute(name, raw)),
        }
    }

    /// Parse a scalar value that must be present.
    pub fn require<T: FromStr>(&self, name: &'static str) -> Result<T, PlaylistError> {
        self.value(name)?
            .ok_or(PlaylistError::MissingAttribute { name })
    }

    pub fn resolution(&self, name: &'static str) -> Result<Option<Resolution>, PlaylistError> {
        self.value::<Resolution>(name)
    }

    pub fn byte_range(&self, name: &'static str) -> Result<Option<RawByteRange>, PlaylistError> {
        self.value::<RawByteRange>(name)
    }
}

/// Split on commas that are not inside a double-quoted string.
fn split_top_level(input: &str) -> impl Iterator<Item = &str> {
    let mut items = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;

    for (i, b) in input.bytes().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                items.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&input[start..]);
    items.into_iter().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KNOWN: &[&'static str] = &["BANDWIDTH", "CODECS", "RESOLUTION", "BYTERANGE", "URI"];

    #[test]
    fn quoted_commas_do_not_split() {
        let attrs = AttributeList::parse(r#"BANDWIDTH=1280000,CODECS="avc1.4d401f,mp4a.40.2""#, KNOWN);
        assert_eq!(attrs.require::<u64>("BANDWIDTH").unwrap(), 1280000);
        assert_eq!(attrs.string_list("CODECS"), vec!["avc1.4d401f", "mp4a.40.2"]);
    }

    #[test]
    fn unknown_and_malformed_attributes_are_dropped() {
        let attrs = AttributeList::parse("BANDWIDTH=1,PATHWAY-ID=A,garbage", KNOWN);
        assert_eq!(attrs.require::<u64>("BANDWIDTH").unwrap(), 1);
        assert!(attrs.raw("PATHWAY-ID").is_none());
    }

    #[test]
    fn duplicate_names_keep_the_last_occurrence() {
        let attrs = AttributeList::parse("BANDWIDTH=1,BANDWIDTH=2", KNOWN);
        assert_eq!(attrs.require::<u64>("BANDWIDTH").unwrap(), 2);
    }

    #[test]
    fn missing_and_malformed_scalars() {
        let attrs = AttributeList::parse("BANDWIDTH=abc", KNOWN);
        assert!(matches!(
            attrs.require::<u64>("BANDWIDTH"),
            Err(PlaylistError::InvalidAttribute { name: "BANDWIDTH", .. })
        ));
        assert!(matches!(
            attrs.require::<u64>("RESOLUTION"),
            Err(PlaylistError::MissingAttribute { name: "RESOLUTION" })
        ));
        assert_eq!(attrs.value::<u64>("CODECS").unwrap(), None);
    }

    #[test]
    fn typed_helpers() {
        let attrs = AttributeList::parse(r#"RESOLUTION=1280x720,BYTERANGE="500@100",URI="init.mp4""#, KNOWN);
        assert_eq!(
            attrs.resolution("RESOLUTION").unwrap().unwrap(),
            Resolution { width: 1280, height: 720 }
        );
        let range = attrs.byte_range("BYTERANGE").unwrap().unwrap();
        assert_eq!((range.length, range.offset), (500, Some(100)));
        assert_eq!(attrs.string("URI").unwrap(), "init.mp4");
    }
}
