//! Segment timeline and rendition selection.

use playlist::{MediaPlaylist, Segment, Stream};

use crate::error::PlayerError;

/// A media segment placed on the absolute playback timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSegment {
    /// Prefix sum of prior segment durations, in seconds.
    pub start: f64,
    pub segment: Segment,
}

/// Place every segment of `playlist` on the timeline. Rebuilt wholesale
/// whenever the active media playlist changes.
pub fn build_timeline(playlist: &MediaPlaylist) -> Vec<TimelineSegment> {
    let mut start = 0.0;
    playlist
        .segments
        .iter()
        .map(|segment| {
            let placed = TimelineSegment {
                start,
                segment: segment.clone(),
            };
            start += segment.duration;
            placed
        })
        .collect()
}

/// Pick the highest-bandwidth stream whose `BANDWIDTH` does not exceed
/// `target_bps`, falling back to the lowest-bandwidth stream when none
/// qualifies.
pub fn select_stream(streams: &[Stream], target_bps: u64) -> Result<&Stream, PlayerError> {
    if streams.is_empty() {
        return Err(PlayerError::NoStreams);
    }
    streams
        .iter()
        .filter(|s| s.bandwidth <= target_bps)
        .max_by_key(|s| s.bandwidth)
        .or_else(|| streams.iter().min_by_key(|s| s.bandwidth))
        .ok_or(PlayerError::NoStreams)
}
