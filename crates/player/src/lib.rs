//! Adaptive HLS playback engine.
//!
//! Drives the playlist parsers and the fMP4 demuxer: fetches the
//! multivariant manifest, selects a rendition by target bitrate, walks the
//! segment timeline, and keeps a timestamp-ordered queue of demuxed sample
//! units filled up to a back-pressure ceiling. Consumers drain the queue via
//! [`Player::next_sample`] and observe progress through the
//! [`PlaybackState`] machine.

pub mod engine;
pub mod error;
pub mod fetch;
pub mod queue;
pub mod sink;
pub mod timeline;

pub use engine::{Player, PlayerConfig};
pub use error::{PlaybackState, PlayerError};
pub use fetch::{FetchError, HttpFetcher, MediaFetcher};
pub use sink::{NullSink, RenderSink};
pub use timeline::{TimelineSegment, build_timeline, select_stream};
