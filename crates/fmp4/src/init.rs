//! Decoder configuration extraction from fMP4 initialization sections.

use bytes::Bytes;
use tracing::debug;

use crate::boxes::box_path;
use crate::error::DemuxError;

/// Decoder configuration recovered from an initialization section.
///
/// Cached by init-section URI for the lifetime of a playback item; segments
/// sharing an init section must not re-parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Media timescale in units per second, from `mdhd`.
    pub timescale: u32,
    /// H.264 parameter sets (SPS then PPS), from `avcC`.
    pub parameter_sets: Vec<Bytes>,
}

/// Extract the decoder configuration from an initialization section.
///
/// Reads the media timescale from `moov.trak.mdia.mdhd` and the H.264
/// parameter sets from the `avcC` box under the first video sample entry.
/// Truncated parameter-set lists are tolerated: parsing stops early and
/// keeps what was recovered.
pub fn extract_decoder_config(data: &Bytes) -> Result<DecoderConfig, DemuxError> {
    let mdhd = box_path(data, "moov.trak.mdia.mdhd")
        .ok_or(DemuxError::init("no moov.trak.mdia.mdhd box"))?;
    let timescale = mdhd_timescale(&mdhd)?;

    let avcc = box_path(data, "moov.trak.mdia.minf.stbl.stsd.avc1.avcC")
        .or_else(|| box_path(data, "moov.trak.mdia.minf.stbl.stsd.avc3.avcC"))
        .ok_or(DemuxError::init("no avcC box under the sample description"))?;
    let parameter_sets = avcc_parameter_sets(&avcc)?;

    Ok(DecoderConfig {
        timescale,
        parameter_sets,
    })
}

/// `mdhd` is a FullBox; the timescale sits at a version-dependent fixed
/// offset (creation and modification times are 4 bytes each in version 0,
/// 8 bytes each in version 1).
fn mdhd_timescale(body: &[u8]) -> Result<u32, DemuxError> {
    let offset = match body.first() {
        Some(0) => 12,
        Some(1) => 20,
        _ => return Err(DemuxError::init("unsupported mdhd version")),
    };
    let bytes: [u8; 4] = body
        .get(offset..offset + 4)
        .and_then(|s| s.try_into().ok())
        .ok_or(DemuxError::init("mdhd box too short"))?;
    Ok(u32::from_be_bytes(bytes))
}

/// Parse an `AVCDecoderConfigurationRecord`: a count byte followed by
/// length-prefixed SPS entries, then the same for PPS.
fn avcc_parameter_sets(body: &[u8]) -> Result<Vec<Bytes>, DemuxError> {
    if body.len() < 6 {
        return Err(DemuxError::init("avcC box too short"));
    }

    let mut sets = Vec::new();
    let sps_count = (body[5] & 0x1F) as usize;
    let mut offset = 6;
    offset = read_parameter_sets(body, offset, sps_count, &mut sets);

    let pps_count = match body.get(offset) {
        Some(&count) => count as usize,
        None => {
            debug!("avcC truncated before the PPS count, keeping {} sets", sets.len());
            return Ok(sets);
        }
    };
    read_parameter_sets(body, offset + 1, pps_count, &mut sets);
    Ok(sets)
}

fn read_parameter_sets(body: &[u8], mut offset: usize, count: usize, out: &mut Vec<Bytes>) -> usize {
    for _ in 0..count {
        let Some(len_bytes) = body.get(offset..offset + 2) else {
            debug!("avcC parameter-set list truncated, stopping early");
            break;
        };
        let len = u16::from_be_bytes([len_bytes[0], len_bytes[1]]) as usize;
        offset += 2;
        let Some(set) = body.get(offset..offset + len) else {
            debug!("avcC parameter-set entry overruns the box, stopping early");
            break;
        };
        out.push(Bytes::copy_from_slice(set));
        offset += len;
    }
    offset
}
