//! Fragmented MP4 (ISOBMFF) demuxing.
//!
//! Walks the nested box structure of CMAF/fMP4 segments: decoder
//! configuration out of initialization sections, and per-sample timing plus
//! encoded payload bytes out of media fragments. Uses `Bytes` throughout for
//! zero-copy slicing.

pub mod boxes;
pub mod error;
pub mod fragment;
pub mod init;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use error::DemuxError;
pub use fragment::{DecodedUnit, SampleTiming, demux_fragment};
pub use init::{DecoderConfig, extract_decoder_config};
