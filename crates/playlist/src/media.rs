//! Media (rendition) playlist parsing.

use std::collections::HashMap;

use tracing::{debug, warn};
use url::Url;

use crate::attr::AttributeList;
use crate::error::PlaylistError;
use crate::multivariant::{MultivariantPlaylist, parse_version};
use crate::tag::{Tag, TagKind};
use crate::types::{ByteRange, RawByteRange};
use crate::{ParseOptions, header_lines, recover};

/// Attribute names of `#EXT-X-MAP` this client interprets.
const MAP_ATTRS: &[&str] = &["URI", "BYTERANGE"];

/// Reference to a media initialization section (`#EXT-X-MAP`).
#[derive(Debug, Clone, PartialEq)]
pub struct InitSectionRef {
    pub uri: Url,
    pub range: Option<ByteRange>,
}

/// One media segment of a rendition.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Duration in seconds, from `#EXTINF`.
    pub duration: f64,
    pub title: Option<String>,
    /// Resolved byte sub-range of `uri`, if the segment is a sub-range.
    pub subrange: Option<ByteRange>,
    pub discontinuity: bool,
    /// Initialization section in effect for this segment.
    pub init_section: Option<InitSectionRef>,
    /// Segment URL, resolved against the media playlist URL.
    pub uri: Url,
}

/// A parsed media playlist: an ordered segment timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPlaylist {
    pub version: Option<u32>,
    pub independent_segments: bool,
    pub target_duration: u64,
    pub media_sequence: Option<u64>,
    pub discontinuity_sequence: Option<u64>,
    pub endlist: bool,
    pub segments: Vec<Segment>,
}

impl MediaPlaylist {
    /// Parse a media playlist.
    ///
    /// `multivariant` is the owning multivariant playlist when there is one;
    /// media playlists may also be parsed standalone.
    /// `independent_segments` is the OR of the playlist's own flag and the
    /// owner's flag.
    pub fn parse(
        bytes: &[u8],
        base_url: &Url,
        multivariant: Option<&MultivariantPlaylist>,
        options: &ParseOptions,
    ) -> Result<Self, PlaylistError> {
        let lines = header_lines(bytes)?;

        let mut tags: HashMap<Tag, &str> = HashMap::from([(Tag::ExtM3u, "")]);
        let mut segments = Vec::new();
        // The immediately preceding segment's URI and resolved range, carried
        // forward for implicit byte-range offsets (legal only when the URI
        // matches and that segment actually had a range).
        let mut previous: Option<(Url, Option<ByteRange>)> = None;

        for line in lines {
            if let Some((tag, value)) = Tag::match_line(line) {
                if tag.kind() == TagKind::Multivariant {
                    return Err(PlaylistError::UnexpectedMultivariantTag { tag });
                }
                if tag.is_unique() && tags.contains_key(&tag) {
                    return Err(PlaylistError::DuplicateTag { tag });
                }
                if tag.is_unique_in_segment() && tags.contains_key(&tag) {
                    // Overwrites the earlier value in lenient mode.
                    recover::<()>(Err(PlaylistError::DuplicateSegmentTag { tag }), options)?;
                }
                if !tag.is_implemented() {
                    warn!("{tag} tag parsing is not implemented");
                }
                tags.insert(tag, value);
            } else if line.starts_with('#') {
                if line.starts_with("#EXT") {
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

                segments.push(finalize_segment(&tags, uri, base_url, &mut previous, options)?);
                for tag in Tag::ALL.iter().filter(|t| t.is_unique_in_segment()) {
                    tags.remove(tag);
                }
            }
        }

        Ok(Self {
            version: parse_version(&tags)?,
            independent_segments: tags.contains_key(&Tag::IndependentSegments)
                || multivariant.is_some_and(|m| m.independent_segments),
            target_duration: require_tag_value(&tags, Tag::TargetDuration)?,
            media_sequence: optional_tag_value(&tags, Tag::MediaSequence)?,
            discontinuity_sequence: optional_tag_value(&tags, Tag::DiscontinuitySequence)?,
            endlist: tags.contains_key(&Tag::Endlist),
            segments,
        })
    }
}

fn finalize_segment(
    tags: &HashMap<Tag, &str>,
    uri: Url,
    base_url: &Url,
    previous: &mut Option<(Url, Option<ByteRange>)>,
    options: &ParseOptions,
) -> Result<Segment, PlaylistError> {
    let (duration, title) = parse_inf(tags)?;
    let subrange = resolve_subrange(tags, &uri, previous)?;
    *previous = Some((uri.clone(), subrange));

    Ok(Segment {
        duration,
        title,
        subrange,
        discontinuity: tags.contains_key(&Tag::Discontinuity),
        init_section: parse_map(tags, base_url, options)?,
        uri,
    })
}

/// `#EXTINF:<duration>[,<title>]`: the duration is required.
fn parse_inf(tags: &HashMap<Tag, &str>) -> Result<(f64, Option<String>), PlaylistError> {
    let raw = tags
        .get(&Tag::Inf)
        .ok_or(PlaylistError::MissingTag { tag: Tag::Inf })?;
    let (duration, title) = match raw.split_once(',') {
        Some((d, t)) => (d, Some(t)),
        None => (*raw, None),
    };
    let duration: f64 = duration
        .parse()
        .map_err(|_| PlaylistError::invalid_tag_value(Tag::Inf, *raw))?;
    Ok((duration, title.filter(|t| !t.is_empty()).map(String::from)))
}

/// Resolve `#EXT-X-BYTERANGE`, inheriting an omitted offset from the end of
/// the previous segment's range when the URIs match.
fn resolve_subrange(
    tags: &HashMap<Tag, &str>,
    uri: &Url,
    previous: &Option<(Url, Option<ByteRange>)>,
) -> Result<Option<ByteRange>, PlaylistError> {
    let Some(raw) = tags.get(&Tag::ByteRange) else {
        return Ok(None);
    };
    let raw: RawByteRange = raw
        .parse()
        .map_err(|_| PlaylistError::invalid_tag_value(Tag::ByteRange, *raw))?;

    let offset = match raw.offset {
        Some(offset) => offset,
        None => match previous {
            Some((prev_uri, Some(prev))) if prev_uri == uri => prev.end(),
            _ => {
                return Err(PlaylistError::ImplicitByteRangeOffset {
                    uri: uri.to_string(),
                });
            }
        },
    };
    Ok(Some(ByteRange {
        length: raw.length,
        offset,
    }))
}

/// `#EXT-X-MAP:URI="...",BYTERANGE="n[@o]"`: the URI is required and the
/// byte-range offset defaults to zero.
fn parse_map(
    tags: &HashMap<Tag, &str>,
    base_url: &Url,
    options: &ParseOptions,
) -> Result<Option<InitSectionRef>, PlaylistError> {
    let Some(raw) = tags.get(&Tag::Map) else {
        return Ok(None);
    };
    let attrs = AttributeList::parse(raw, MAP_ATTRS);
    let uri = attrs
        .string("URI")
        .ok_or(PlaylistError::MissingAttribute { name: "URI" })?;
    let uri = base_url
        .join(&uri)
        .map_err(|_| PlaylistError::invalid_uri(uri))?;
    let range = recover(attrs.byte_range("BYTERANGE"), options)?
        .flatten()
        .map(|raw| ByteRange {
            length: raw.length,
            offset: raw.offset.unwrap_or(0),
        });
    Ok(Some(InitSectionRef { uri, range }))
}

fn require_tag_value(tags: &HashMap<Tag, &str>, tag: Tag) -> Result<u64, PlaylistError> {
    optional_tag_value(tags, tag)?.ok_or(PlaylistError::MissingTag { tag })
}

fn optional_tag_value(tags: &HashMap<Tag, &str>, tag: Tag) -> Result<Option<u64>, PlaylistError> {
    match tags.get(&tag) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| PlaylistError::invalid_tag_value(tag, *raw)),
    }
}
