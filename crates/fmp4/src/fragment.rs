//! Media fragment demuxing.
//!
//! A segment is a sequence of `moof`+`mdat` pairs. Each `moof` carries the
//! sample-run control boxes (`tfhd`, `tfdt`, `trun`) describing timing and
//! sizes; the matching `mdat` carries the encoded bytes. Only the first run
//! per fragment (the primary, video, track) contributes samples; subsequent
//! runs are parsed to advance the decode-time cursor and otherwise discarded.

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::boxes::{box_at, find_first_box};
use crate::error::DemuxError;

/// Per-sample timing in timescale units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTiming {
    pub duration: u64,
    pub decode_time: u64,
    pub presentation_time: u64,
}

/// Demuxed output for one segment: the concatenated primary-track payload
/// plus per-sample timing and sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedUnit {
    pub payload: Bytes,
    pub sample_sizes: Vec<u32>,
    pub timings: Vec<SampleTiming>,
    pub timescale: u32,
}

impl DecodedUnit {
    pub fn sample_count(&self) -> usize {
        self.sample_sizes.len()
    }

    /// Total duration in seconds.
    pub fn duration(&self) -> f64 {
        let ticks: u64 = self.timings.iter().map(|t| t.duration).sum();
        ticks as f64 / self.timescale as f64
    }
}

/// Track-fragment defaults from `tfhd`.
#[derive(Debug, Clone, Copy, Default)]
struct TrackDefaults {
    sample_duration: u32,
    sample_size: u32,
}

/// One parsed `trun`: byte span inside the following `mdat`, plus per-sample
/// info for the primary run.
struct SampleRun {
    /// Offset into the mdat payload, when the declared data offset resolves.
    mdat_offset: Option<usize>,
    total_size: usize,
    sizes: Vec<u32>,
    timings: Vec<SampleTiming>,
}

/// Demux every fragment of a segment into one [`DecodedUnit`].
///
/// `timescale` comes from the associated initialization section.
pub fn demux_fragment(data: &Bytes, timescale: u32) -> Result<DecodedUnit, DemuxError> {
    let mut payload = BytesMut::new();
    let mut sample_sizes = Vec::new();
    let mut timings = Vec::new();
    // Byte ranges the next mdat must supply, in declaration order.
    let mut pending: Vec<(usize, usize)> = Vec::new();

    let mut offset = 0;
    while let Some(parsed) = box_at(data, offset, data.len()) {
        match &parsed.fourcc {
            b"moof" => {
                let moof_size = parsed.end - offset;
                if let Some(traf) =
                    find_first_box(data, parsed.body_start, parsed.body_end, *b"traf")
                {
                    walk_traf(
                        data,
                        traf.body_start,
                        traf.body_end,
                        moof_size,
                        &mut pending,
                        &mut sample_sizes,
                        &mut timings,
                    );
                }
            }
            b"mdat" => {
                let body = &data[parsed.body_start..parsed.body_end];
                for (start, len) in pending.drain(..) {
                    match body.get(start..start + len) {
                        Some(slice) => payload.extend_from_slice(slice),
                        None => warn!(
                            "sample run {start}+{len} overruns mdat of {} bytes, dropping",
                            body.len()
                        ),
                    }
                }
            }
            _ => {}
        }
        offset = parsed.end;
    }

    if payload.is_empty() {
        return Err(DemuxError::fragment("no sample payload assembled"));
    }
    Ok(DecodedUnit {
        payload: payload.freeze(),
        sample_sizes,
        timings,
        timescale,
    })
}

fn walk_traf(
    data: &Bytes,
    start: usize,
    end: usize,
    moof_size: usize,
    pending: &mut Vec<(usize, usize)>,
    sample_sizes: &mut Vec<u32>,
    timings: &mut Vec<SampleTiming>,
) {
    let mut defaults = TrackDefaults::default();
    // Decode-time cursor, advanced by every run in declaration order.
    let mut decode_time: u64 = 0;
    let mut run_index = 0usize;

    let mut offset = start;
    while let Some(child) = box_at(data, offset, end) {
        let body = &data[child.body_start..child.body_end];
        match &child.fourcc {
            b"tfhd" => defaults = parse_tfhd(body),
            b"tfdt" => decode_time = parse_tfdt(body),
            b"trun" => {
                let run = parse_trun(body, &defaults, &mut decode_time);
                if run_index == 0 {
                    // Primary (video) track run.
                    if let Some(mdat_offset) = run
                        .mdat_offset
                        .or_else(|| {
                            warn!("trun without a resolvable data offset, dropping its payload");
                            None
                        })
                        .and_then(|data_offset| {
                            // Declared relative to the fragment start; the
                            // mdat payload begins past the moof and the
                            // 8-byte mdat header.
                            data_offset.checked_sub(moof_size + 8)
                        })
                    {
                        pending.push((mdat_offset, run.total_size));
                        sample_sizes.extend(run.sizes);
                        timings.extend(run.timings);
                    } else if run.mdat_offset.is_some() {
                        warn!("trun data offset points before the mdat payload, dropping");
                    }
                } else {
                    debug!("discarding secondary sample run {run_index}");
                }
                run_index += 1;
            }
            _ => {}
        }
        offset = child.end;
    }
}

/// `tfhd`: track ID plus optional per-fragment defaults, selected by flags.
fn parse_tfhd(body: &[u8]) -> TrackDefaults {
    let flags = full_box_flags(body);
    // Skip version/flags (4) and track_id (4), then optional fields in
    // declaration order.
    let mut offset = 8;
    if flags & 0x000001 != 0 {
        offset += 8; // base_data_offset
    }
    if flags & 0x000002 != 0 {
        offset += 4; // sample_description_index
    }
    let mut defaults = TrackDefaults::default();
    if flags & 0x000008 != 0 {
        defaults.sample_duration = read_u32(body, &mut offset).unwrap_or(0);
    }
    if flags & 0x000010 != 0 {
        defaults.sample_size = read_u32(body, &mut offset).unwrap_or(0);
    }
    defaults
}

/// `tfdt`: base media decode time, 32-bit in version 0, 64-bit in version 1.
fn parse_tfdt(body: &[u8]) -> u64 {
    let mut offset = 4;
    match body.first() {
        Some(1) => read_u64(body, &mut offset).unwrap_or(0),
        _ => read_u32(body, &mut offset).unwrap_or(0) as u64,
    }
}

/// Parse one `trun`, advancing the decode-time cursor by the run's total
/// duration. Per-sample fields are present or defaulted according to flags.
fn parse_trun(body: &[u8], defaults: &TrackDefaults, decode_time: &mut u64) -> SampleRun {
    let version = body.first().copied().unwrap_or(0);
    let flags = full_box_flags(body);
    let mut offset = 4;
    let sample_count = read_u32(body, &mut offset).unwrap_or(0) as usize;

    let mdat_offset = if flags & 0x000001 != 0 {
        read_u32(body, &mut offset).map(|v| v as i32)
    } else {
        None
    };
    if flags & 0x000004 != 0 {
        offset += 4; // first_sample_flags
    }

    let mut run = SampleRun {
        mdat_offset: mdat_offset.and_then(|v| usize::try_from(v).ok()),
        total_size: 0,
        sizes: Vec::with_capacity(sample_count),
        timings: Vec::with_capacity(sample_count),
    };

    for _ in 0..sample_count {
        let duration = if flags & 0x000100 != 0 {
            match read_u32(body, &mut offset) {
                Some(d) => d,
                None => break, // truncated run table
            }
        } else {
            defaults.sample_duration
        };
        let size = if flags & 0x000200 != 0 {
            match read_u32(body, &mut offset) {
                Some(s) => s,
                None => break,
            }
        } else {
            defaults.sample_size
        };
        if flags & 0x000400 != 0 {
            offset += 4; // sample_flags
        }
        let composition_offset = if flags & 0x000800 != 0 {
            match read_u32(body, &mut offset) {
                Some(raw) if version == 0 => raw as i64,
                Some(raw) => raw as i32 as i64,
                None => break,
            }
        } else {
            0
        };

        let presentation_time = decode_time
            .checked_add_signed(composition_offset)
            .unwrap_or(*decode_time);
        run.timings.push(SampleTiming {
            duration: duration as u64,
            decode_time: *decode_time,
            presentation_time,
        });
        run.sizes.push(size);
        run.total_size += size as usize;
        *decode_time += duration as u64;
    }

    run
}

fn full_box_flags(body: &[u8]) -> u32 {
    match body {
        [_, a, b, c, ..] => u32::from_be_bytes([0, *a, *b, *c]),
        _ => 0,
    }
}

fn read_u32(body: &[u8], offset: &mut usize) -> Option<u32> {
    let bytes: [u8; 4] = body.get(*offset..*offset + 4)?.try_into().ok()?;
    *offset += 4;
    Some(u32::from_be_bytes(bytes))
}

fn read_u64(body: &[u8], offset: &mut usize) -> Option<u64> {
    let bytes: [u8; 8] = body.get(*offset..*offset + 8)?.try_into().ok()?;
    *offset += 8;
    Some(u64::from_be_bytes(bytes))
}
