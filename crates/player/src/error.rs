use std::sync::Arc;

use fmp4::DemuxError;
use playlist::PlaylistError;

use crate::fetch::FetchError;

/// Engine-level failure taxonomy. Pipeline failures wrap the originating
/// crate's error; the bare variants are conditions only the engine can
/// detect.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("playlist parse failed: {0}")]
    Playlist(#[from] PlaylistError),

    #[error("demux failed: {0}")]
    Demux(#[from] DemuxError),

    #[error("multivariant playlist lists no streams")]
    NoStreams,

    #[error("media playlist lists no segments")]
    NoSegments,

    #[error("segment has no initialization section")]
    NoInitSection,
}

/// Observable playback state.
///
/// `Finished` and `Error` are terminal for the current item; a new item or a
/// bitrate change restarts the cycle. Failures surface here rather than as
/// return values because the refill pipeline is asynchronous.
#[derive(Debug, Clone, Default)]
pub enum PlaybackState {
    #[default]
    Loading,
    Waiting,
    Finished,
    Error(Arc<PlayerError>),
}

impl PlaybackState {
    /// Terminal states stop the refill loop until `set_item` or
    /// `set_target_bitrate`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
