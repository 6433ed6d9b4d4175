use crate::tag::Tag;

/// Playlist grammar violations.
///
/// Structural violations (missing header, duplicate unique tag, tag/kind
/// mismatch, missing required tag or attribute, stream-info with no URI) are
/// fatal in both modes; the remaining variants are recoverable in lenient
/// mode.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaylistError {
    #[error("playlist is not valid UTF-8: {source}")]
    InvalidEncoding {
        #[from]
        source: std::str::Utf8Error,
    },

    #[error("playlist does not start with {}", Tag::ExtM3u)]
    MissingHeaderTag,

    #[error("unknown tag line `{line}`")]
    UnknownTag { line: String },

    #[error("multiple occurrences of {tag}")]
    DuplicateTag { tag: Tag },

    #[error("multiple occurrences of {tag} in one segment")]
    DuplicateSegmentTag { tag: Tag },

    #[error("{tag} is not allowed in a multivariant playlist")]
    UnexpectedMediaTag { tag: Tag },

    #[error("{tag} is not allowed in a media playlist")]
    UnexpectedMultivariantTag { tag: Tag },

    #[error("missing required tag {tag}")]
    MissingTag { tag: Tag },

    #[error("malformed value `{value}` for {tag}")]
    InvalidTagValue { tag: Tag, value: String },

    #[error("missing required attribute {name}")]
    MissingAttribute { name: &'static str },

    #[error("malformed value `{value}` for attribute {name}")]
    InvalidAttribute { name: &'static str, value: String },

    #[error("{} directive with no following URI", Tag::StreamInf)]
    MissingStreamUri,

    #[error("malformed URI reference `{input}`")]
    InvalidUri { input: String },

    #[error("byte range for `{uri}` omits its offset and the previous segment uses a different URI")]
    ImplicitByteRangeOffset { uri: String },
}

impl PlaylistError {
    pub fn invalid_tag_value(tag: Tag, value: impl Into<String>) -> Self {
        Self::InvalidTagValue {
            tag,
            value: value.into(),
        }
    }

    pub fn invalid_attribute(name: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name,
            value: value.into(),
        }
    }

    pub fn invalid_uri(input: impl Into<String>) -> Self {
        Self::InvalidUri {
            input: input.into(),
        }
    }
}
