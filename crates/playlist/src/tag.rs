//! Static table of playlist directives.
//!
//! Tag names, their classification, and their uniqueness constraints come
//! straight from draft-pantos-hls-rfc8216bis. The classification restricts
//! which playlist kind may contain a tag; the parsers reject mismatches.

use std::fmt;

/// Which playlist kind a tag may appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Basic,
    MediaOrMultivariant,
    MediaPlaylist,
    MediaSegment,
    MediaMetadata,
    Multivariant,
}

/// A playlist directive identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    // Basic tags.
    ExtM3u,
    Version,
    // Media or multivariant playlist tags.
    IndependentSegments,
    Start,
    Define,
    // Media playlist tags.
    TargetDuration,
    MediaSequence,
    DiscontinuitySequence,
    Endlist,
    PlaylistType,
    IFramesOnly,
    PartInf,
    ServerControl,
    // Media segment tags.
    Inf,
    ByteRange,
    Discontinuity,
    Key,
    Map,
    ProgramDateTime,
    Gap,
    Bitrate,
    Part,
    // Media metadata tags.
    DateRange,
    Skip,
    PreloadHint,
    RenditionReport,
    // Multivariant playlist tags.
    Media,
    StreamInf,
    IFrameStreamInf,
    SessionData,
    SessionKey,
    ContentSteering,
}

impl Tag {
    pub const ALL: [Tag; 32] = [
        Tag::ExtM3u,
        Tag::Version,
        Tag::IndependentSegments,
        Tag::Start,
        Tag::Define,
        Tag::TargetDuration,
        Tag::MediaSequence,
        Tag::DiscontinuitySequence,
        Tag::Endlist,
        Tag::PlaylistType,
        Tag::IFramesOnly,
        Tag::PartInf,
        Tag::ServerControl,
        Tag::Inf,
        Tag::ByteRange,
        Tag::Discontinuity,
        Tag::Key,
        Tag::Map,
        Tag::ProgramDateTime,
        Tag::Gap,
        Tag::Bitrate,
        Tag::Part,
        Tag::DateRange,
        Tag::Skip,
        Tag::PreloadHint,
        Tag::RenditionReport,
        Tag::Media,
        Tag::StreamInf,
        Tag::IFrameStreamInf,
        Tag::SessionData,
        Tag::SessionKey,
        Tag::ContentSteering,
    ];

    /// Tag name without the leading `#`.
    pub fn name(self) -> &'static str {
        match self {
            Tag::ExtM3u => "EXTM3U",
            Tag::Version => "EXT-X-VERSION",
            Tag::IndependentSegments => "EXT-X-INDEPENDENT-SEGMENTS",
            Tag::Start => "EXT-X-START",
            Tag::Define => "EXT-X-DEFINE",
            Tag::TargetDuration => "EXT-X-TARGETDURATION",
            Tag::MediaSequence => "EXT-X-MEDIA-SEQUENCE",
            Tag::DiscontinuitySequence => "EXT-X-DISCONTINUITY-SEQUENCE",
            Tag::Endlist => "EXT-X-ENDLIST",
            Tag::PlaylistType => "EXT-X-PLAYLIST-TYPE",
            Tag::IFramesOnly => "EXT-X-I-FRAMES-ONLY",
            Tag::PartInf => "EXT-X-PART-INF",
            Tag::ServerControl => "EXT-X-SERVER-CONTROL",
            Tag::Inf => "EXTINF",
            Tag::ByteRange => "EXT-X-BYTERANGE",
            Tag::Discontinuity => "EXT-X-DISCONTINUITY",
            Tag::Key => "EXT-X-KEY",
            Tag::Map => "EXT-X-MAP",
            Tag::ProgramDateTime => "EXT-X-PROGRAM-DATE-TIME",
            Tag::Gap => "EXT-X-GAP",
            Tag::Bitrate => "EXT-X-BITRATE",
            Tag::Part => "EXT-X-PART",
            Tag::DateRange => "EXT-X-DATERANGE",
            Tag::Skip => "EXT-X-SKIP",
            Tag::PreloadHint => "EXT-X-PRELOAD-HINT",
            Tag::RenditionReport => "EXT-X-RENDITION-REPORT",
            Tag::Media => "EXT-X-MEDIA",
            Tag::StreamInf => "EXT-X-STREAM-INF",
            Tag::IFrameStreamInf => "EXT-X-I-FRAME-STREAM-INF",
            Tag::SessionData => "EXT-X-SESSION-DATA",
            Tag::SessionKey => "EXT-X-SESSION-KEY",
            Tag::ContentSteering => "EXT-X-CONTENT-STEERING",
        }
    }

    pub fn kind(self) -> TagKind {
        match self {
            Tag::ExtM3u | Tag::Version => TagKind::Basic,
            Tag::IndependentSegments | Tag::Start | Tag::Define => TagKind::MediaOrMultivariant,
            Tag::TargetDuration
            | Tag::MediaSequence
            | Tag::DiscontinuitySequence
            | Tag::Endlist
            | Tag::PlaylistType
            | Tag::IFramesOnly
            | Tag::PartInf
            | Tag::ServerControl => TagKind::MediaPlaylist,
            Tag::Inf
            | Tag::ByteRange
            | Tag::Discontinuity
            | Tag::Key
            | Tag::Map
            | Tag::ProgramDateTime
            | Tag::Gap
            | Tag::Bitrate
            | Tag::Part => TagKind::MediaSegment,
            Tag::DateRange | Tag::Skip | Tag::PreloadHint | Tag::RenditionReport => {
                TagKind::MediaMetadata
            }
            Tag::Media
            | Tag::StreamInf
            | Tag::IFrameStreamInf
            | Tag::SessionData
            | Tag::SessionKey
            | Tag::ContentSteering => TagKind::Multivariant,
        }
    }

    /// Tags that must appear at most once per playlist.
    pub fn is_unique(self) -> bool {
        matches!(
            self,
            Tag::ExtM3u
                | Tag::Version
                | Tag::IndependentSegments
                | Tag::Start
                | Tag::TargetDuration
                | Tag::MediaSequence
                | Tag::DiscontinuitySequence
                | Tag::Endlist
                | Tag::PlaylistType
                | Tag::IFramesOnly
                | Tag::PartInf
                | Tag::ServerControl
                | Tag::Skip
                | Tag::ContentSteering
        )
    }

    /// Tags that must appear at most once per segment block.
    pub fn is_unique_in_segment(self) -> bool {
        matches!(
            self,
            Tag::Inf | Tag::ByteRange | Tag::Discontinuity | Tag::ProgramDateTime | Tag::Gap
        )
    }

    /// Tags this client recognizes but does not interpret.
    ///
    /// Encountering one emits a "not implemented" diagnostic rather than
    /// failing or silently misbehaving.
    pub fn is_implemented(self) -> bool {
        !matches!(
            self,
            Tag::Start
                | Tag::Define
                | Tag::PlaylistType
                | Tag::IFramesOnly
                | Tag::PartInf
                | Tag::ServerControl
                | Tag::Key
                | Tag::ProgramDateTime
                | Tag::Gap
                | Tag::Bitrate
                | Tag::Part
                | Tag::DateRange
                | Tag::Skip
                | Tag::PreloadHint
                | Tag::RenditionReport
                | Tag::Media
                | Tag::IFrameStreamInf
                | Tag::SessionData
                | Tag::SessionKey
                | Tag::ContentSteering
        )
    }

    /// Resolve a directive line (`#NAME` or `#NAME:value`) to its tag and
    /// trailing value. Tag names are case-sensitive.
    pub fn match_line(line: &str) -> Option<(Tag, &str)> {
        let body = line.strip_prefix('#')?;
        for tag in Tag::ALL {
            let name = tag.name();
            if body == name {
                return Some((tag, ""));
            }
            if let Some(rest) = body.strip_prefix(name)
                && let Some(value) = rest.strip_prefix(':')
            {
                return Some((tag, value));
            }
        }
        None
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.name())
    }
}
