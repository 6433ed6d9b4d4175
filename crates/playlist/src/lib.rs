//! HLS playlist parsing.
//!
//! Implements the M3U8 tag/attribute grammar of HTTP Live Streaming
//! (draft-pantos-hls-rfc8216bis) for the two playlist kinds a client needs:
//! multivariant playlists (alternative renditions) and media playlists
//! (segment timelines). Parsing is pure: the same bytes always produce a
//! value-equal playlist.

pub mod attr;
pub mod error;
pub mod media;
pub mod multivariant;
pub mod tag;
pub mod types;

pub use error::PlaylistError;
pub use media::{InitSectionRef, MediaPlaylist, Segment};
pub use multivariant::{MultivariantPlaylist, Stream};
pub use tag::{Tag, TagKind};
pub use types::{ByteRange, RawByteRange, Resolution};

/// Per-call parse configuration.
///
/// In strict mode, recoverable conditions (unknown tag, malformed optional
/// attribute, malformed URI) fail the parse instead of being skipped with a
/// diagnostic. Structural violations are fatal in both modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub strict: bool,
}

impl ParseOptions {
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

/// Decode playlist bytes and validate the `#EXTM3U` header line.
///
/// Returns the remaining lines after the header, empty lines removed.
pub(crate) fn header_lines(bytes: &[u8]) -> Result<Vec<&str>, PlaylistError> {
    let text = std::str::from_utf8(bytes).map_err(|source| PlaylistError::InvalidEncoding { source })?;
    let mut lines = text.lines().map(str::trim_end).filter(|line| !line.is_empty());

    match lines.next() {
        Some(first) if first == Tag::ExtM3u.to_string() => {}
        _ => return Err(PlaylistError::MissingHeaderTag),
    }
    Ok(lines.collect())
}

/// Apply the lenient-mode downgrade for a recoverable parse error.
///
/// Strict mode propagates the error; lenient mode logs it and yields `None`.
pub(crate) fn recover<T>(
    result: Result<T, PlaylistError>,
    options: &ParseOptions,
) -> Result<Option<T>, PlaylistError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if options.strict => Err(err),
        Err(err) => {
            tracing::warn!("ignoring recoverable playlist error: {err}");
            Ok(None)
        }
    }
}
