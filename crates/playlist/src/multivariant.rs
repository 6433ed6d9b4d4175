//! Multivariant (top-level) playlist parsing.

use std::collections::HashMap;

use tracing::{debug, warn};
use url::Url;

use crate::attr::AttributeList;
use crate::error::PlaylistError;
use crate::tag::{Tag, TagKind};
use crate::types::Resolution;
use crate::{ParseOptions, header_lines, recover};

/// Attribute names of `#EXT-X-STREAM-INF` this client interprets.
const STREAM_INF_ATTRS: &[&str] = &[
    "BANDWIDTH",
    "AVERAGE-BANDWIDTH",
    "SCORE",
    "CODECS",
    "SUPPLEMENTAL-CODECS",
    "RESOLUTION",
    "FRAME-RATE",
];

/// One variant stream (rendition) of the presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    /// Peak segment bit rate, bits per second. Required by the grammar.
    pub bandwidth: u64,
    pub average_bandwidth: Option<u64>,
    pub score: Option<f64>,
    pub codecs: Vec<String>,
    pub supplemental_codecs: Vec<String>,
    pub resolution: Option<Resolution>,
    pub frame_rate: Option<f64>,
    /// Media playlist URL, resolved against the multivariant playlist URL.
    pub uri: Url,
}

/// A parsed multivariant playlist: an ordered list of variant streams.
///
/// Immutable; replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct MultivariantPlaylist {
    pub version: Option<u32>,
    pub independent_segments: bool,
    /// Streams in source order, never sorted.
    pub streams: Vec<Stream>,
}

impl MultivariantPlaylist {
    pub fn parse(
        bytes: &[u8],
        base_url: &Url,
        options: &ParseOptions,
    ) -> Result<Self, PlaylistError> {
        let lines = header_lines(bytes)?;

        // Last value substring per encountered tag. Seeding the header tag
        // makes a second #EXTM3U a duplicate.
        let mut tags: HashMap<Tag, &str> = HashMap::from([(Tag::ExtM3u, "")]);
        let mut pending_stream_inf = false;
        let mut streams = Vec::new();

        for line in lines {
            if let Some((tag, value)) = Tag::match_line(line) {
                if matches!(tag.kind(), TagKind::MediaPlaylist | TagKind::MediaSegment) {
                    return Err(PlaylistError::UnexpectedMediaTag { tag });
                }
                if tag.is_unique() && tags.contains_key(&tag) {
                    return Err(PlaylistError::DuplicateTag { tag });
                }
                if pending_stream_inf {
                    return Err(PlaylistError::MissingStreamUri);
                }
                if !tag.is_implemented() {
                    warn!("{tag} tag parsing is not implemented");
                }
                tags.insert(tag, value);
                pending_stream_inf = tag == Tag::StreamInf;
            } else if line.starts_with('#') {
                if line.starts_with("#EXT") {
                    // Unknown directive, recoverable in lenient mode.
                    recover::<()>(
                        Err(PlaylistError::UnknownTag {
                            line: line.to_string(),
                        }),
                        options,
                    )?;
                } else {
                    debug!("playlist comment: {line}");
                }
            } else {
                let Some(uri) = recover(
                    base_url
                        .join(line)
                        .map_err(|_| PlaylistError::invalid_uri(line)),
                    options,
                )?
                else {
                    continue;
                };

                // The URI consumes the pending stream attributes; a second
                // URI line needs its own #EXT-X-STREAM-INF.
                let raw = tags
                    .remove(&Tag::StreamInf)
                    .ok_or(PlaylistError::MissingTag { tag: Tag::StreamInf })?;
                streams.push(parse_stream(raw, uri, options)?);
                pending_stream_inf = false;
            }
        }
        if pending_stream_inf {
            return Err(PlaylistError::MissingStreamUri);
        }

        Ok(Self {
            version: parse_version(&tags)?,
            independent_segments: tags.contains_key(&Tag::IndependentSegments),
            streams,
        })
    }
}

fn parse_stream(raw: &str, uri: Url, options: &ParseOptions) -> Result<Stream, PlaylistError> {
    let attrs = AttributeList::parse(raw, STREAM_INF_ATTRS);
    Ok(Stream {
        bandwidth: attrs.require("BANDWIDTH")?,
        average_bandwidth: recover(attrs.value("AVERAGE-BANDWIDTH"), options)?.flatten(),
        score: recover(attrs.value("SCORE"), options)?.flatten(),
        codecs: attrs.string_list("CODECS"),
        supplemental_codecs: attrs.string_list("SUPPLEMENTAL-CODECS"),
        resolution: recover(attrs.resolution("RESOLUTION"), options)?.flatten(),
        frame_rate: recover(attrs.value("FRAME-RATE"), options)?.flatten(),
        uri,
    })
}

pub(crate) fn parse_version(tags: &HashMap<Tag, &str>) -> Result<Option<u32>, PlaylistError> {
    match tags.get(&Tag::Version) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| PlaylistError::invalid_tag_value(Tag::Version, *raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://example.com/main.m3u8").unwrap()
    }

    const CONFORMANCE: &str = "#EXTM3U\n\
#EXT-X-STREAM-INF:BANDWIDTH=1280000,AVERAGE-BANDWIDTH=1000000\n\
http://example.com/low.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=2560000,AVERAGE-BANDWIDTH=2000000\n\
http://example.com/mid.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=7680000,AVERAGE-BANDWIDTH=6000000\n\
http://example.com/hi.m3u8\n\
#EXT-X-STREAM-INF:BANDWIDTH=65000,CODECS=\"mp4a.40.5\"\n\
http://example.com/audio-only.m3u8\n";

    #[test]
    fn conformance_playlist_parses_in_source_order() {
        let pl =
            MultivariantPlaylist::parse(CONFORMANCE.as_bytes(), &base(), &ParseOptions::default())
                .unwrap();
        assert_eq!(pl.streams.len(), 4);
        assert_eq!(pl.streams[1].bandwidth, 2560000);
        assert_eq!(pl.streams[2].average_bandwidth, Some(6000000));
        assert_eq!(pl.streams[3].codecs, vec!["mp4a.40.5"]);
        assert_eq!(pl.streams[0].uri.as_str(), "http://example.com/low.m3u8");
        assert!(!pl.independent_segments);
        assert_eq!(pl.version, None);
    }

    #[test]
    fn parsing_is_idempotent() {
        let opts = ParseOptions::default();
        let a = MultivariantPlaylist::parse(CONFORMANCE.as_bytes(), &base(), &opts).unwrap();
        let b = MultivariantPlaylist::parse(CONFORMANCE.as_bytes(), &base(), &opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn relative_uris_resolve_against_the_playlist_url() {
        let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nrenditions/low.m3u8\n";
        let pl =
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default())
                .unwrap();
        assert_eq!(
            pl.streams[0].uri.as_str(),
            "http://example.com/renditions/low.m3u8"
        );
    }

    #[test]
    fn stream_inf_without_uri_is_fatal() {
        let trailing = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n";
        assert!(matches!(
            MultivariantPlaylist::parse(trailing.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::MissingStreamUri)
        ));

        let interposed = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\n#EXT-X-VERSION:7\nlow.m3u8\n";
        assert!(matches!(
            MultivariantPlaylist::parse(interposed.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::MissingStreamUri)
        ));
    }

    #[test]
    fn uri_without_stream_inf_is_fatal() {
        let input = "#EXTM3U\nlow.m3u8\n";
        assert!(matches!(
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::MissingTag { tag: Tag::StreamInf })
        ));

        // A consumed STREAM-INF does not carry over to a second URI line.
        let two_uris = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8\nlow2.m3u8\n";
        assert!(matches!(
            MultivariantPlaylist::parse(two_uris.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::MissingTag { tag: Tag::StreamInf })
        ));
    }

    #[test]
    fn missing_bandwidth_is_fatal() {
        let input = "#EXTM3U\n#EXT-X-STREAM-INF:AVERAGE-BANDWIDTH=1\nlow.m3u8\n";
        assert!(matches!(
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::MissingAttribute { name: "BANDWIDTH" })
        ));
    }

    #[test]
    fn media_playlist_tags_are_rejected() {
        let input = "#EXTM3U\n#EXT-X-TARGETDURATION:10\n";
        assert!(matches!(
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default()),
            Err(PlaylistError::UnexpectedMediaTag { tag: Tag::TargetDuration })
        ));
    }

    #[test]
    fn duplicate_unique_tag_fails_in_both_modes() {
        let input = "#EXTM3U\n#EXT-X-VERSION:7\n#EXT-X-VERSION:7\n";
        for opts in [ParseOptions::default(), ParseOptions::strict()] {
            assert!(matches!(
                MultivariantPlaylist::parse(input.as_bytes(), &base(), &opts),
                Err(PlaylistError::DuplicateTag { tag: Tag::Version })
            ));
        }
    }

    #[test]
    fn unknown_tags_are_fatal_only_in_strict_mode() {
        let input = "#EXTM3U\n#EXT-X-FANCY:1\n#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8\n";
        let pl =
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default())
                .unwrap();
        assert_eq!(pl.streams.len(), 1);
        assert!(matches!(
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::strict()),
            Err(PlaylistError::UnknownTag { .. })
        ));
    }

    #[test]
    fn malformed_optional_attribute_is_mode_dependent() {
        let input = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1,FRAME-RATE=abc\nlow.m3u8\n";
        let pl =
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default())
                .unwrap();
        assert_eq!(pl.streams[0].frame_rate, None);
        assert!(MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::strict()).is_err());
    }

    #[test]
    fn comments_are_ignored() {
        let input = "#EXTM3U\n# a comment\n#EXT-X-STREAM-INF:BANDWIDTH=1\nlow.m3u8\n";
        let pl =
            MultivariantPlaylist::parse(input.as_bytes(), &base(), &ParseOptions::default())
                .unwrap();
        assert_eq!(pl.streams.len(), 1);
    }
}
