//! Byte builders for hand-assembling ISOBMFF structures in tests.

use bytes::Bytes;

/// Wrap a payload in a box header: `[u32 size][4cc][payload]`.
pub fn make_box(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend_from_slice(&((8 + payload.len()) as u32).to_be_bytes());
    out.extend_from_slice(fourcc);
    out.extend_from_slice(payload);
    out
}

/// A version-0 `mdhd` box with the given timescale.
pub fn make_mdhd(timescale: u32) -> Vec<u8> {
    let mut body = vec![0u8; 4]; // version + flags
    body.extend_from_slice(&[0u8; 8]); // creation + modification time
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes()); // duration
    body.extend_from_slice(&[0x55, 0xC4, 0, 0]); // language "und" + pre_defined
    make_box(b"mdhd", &body)
}

/// An `avcC` box carrying one SPS and one PPS.
pub fn make_avcc(sps: &[u8], pps: &[u8]) -> Vec<u8> {
    let mut body = vec![
        1,    // configuration version
        0x64, // profile
        0x00, // profile compatibility
        0x1F, // level
        0xFF, // 4-byte NAL length prefix
        0xE1, // reserved bits + 1 SPS
    ];
    body.extend_from_slice(&(sps.len() as u16).to_be_bytes());
    body.extend_from_slice(sps);
    body.push(1); // 1 PPS
    body.extend_from_slice(&(pps.len() as u16).to_be_bytes());
    body.extend_from_slice(pps);
    make_box(b"avcC", &body)
}

/// A minimal initialization section: `ftyp` plus a `moov` whose single track
/// carries the given timescale and H.264 parameter sets.
pub fn make_init_segment(timescale: u32, sps: &[u8], pps: &[u8]) -> Bytes {
    // Visual sample entry: 70-byte fixed header, then the avcC child.
    let mut avc1_body = vec![0u8; 70];
    avc1_body.extend_from_slice(&make_avcc(sps, pps));
    let avc1 = make_box(b"avc1", &avc1_body);

    let mut stsd_body = vec![0u8; 4]; // version + flags
    stsd_body.extend_from_slice(&1u32.to_be_bytes()); // entry count
    stsd_body.extend_from_slice(&avc1);
    let stsd = make_box(b"stsd", &stsd_body);

    let stbl = make_box(b"stbl", &stsd);
    let minf = make_box(b"minf", &stbl);

    let mut mdia_body = make_mdhd(timescale);
    mdia_body.extend_from_slice(&minf);
    let mdia = make_box(b"mdia", &mdia_body);

    let trak = make_box(b"trak", &mdia);
    let moov = make_box(b"moov", &trak);

    let mut out = make_box(b"ftyp", b"isom\x00\x00\x02\x00isomiso6");
    out.extend_from_slice(&moov);
    Bytes::from(out)
}

/// One movie fragment's worth of sample data for [`make_media_segment`].
pub struct FragmentSpec<'a> {
    pub base_decode_time: u64,
    pub default_duration: u32,
    pub samples: &'a [&'a [u8]],
    /// Composition offsets, one per sample.
    pub composition_offsets: &'a [i64],
}

fn make_tfhd(track_id: u32, default_duration: u32) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0x08]; // version 0, default-sample-duration flag
    body.extend_from_slice(&track_id.to_be_bytes());
    body.extend_from_slice(&default_duration.to_be_bytes());
    make_box(b"tfhd", &body)
}

fn make_tfdt(base_decode_time: u64) -> Vec<u8> {
    let mut body = vec![0, 0, 0, 0]; // version 0
    body.extend_from_slice(&(base_decode_time as u32).to_be_bytes());
    make_box(b"tfdt", &body)
}

/// A version-0 `trun` with data offset plus per-sample size and composition
/// offset. Durations come from the `tfhd` default.
fn make_trun(data_offset: u32, entries: &[(u32, i64)]) -> Vec<u8> {
    let mut body = vec![0, 0, 0x0A, 0x01]; // data-offset | size | cto flags
    body.extend_from_slice(&(entries.len() as u32).to_be_bytes());
    body.extend_from_slice(&data_offset.to_be_bytes());
    for (size, cto) in entries {
        body.extend_from_slice(&size.to_be_bytes());
        body.extend_from_slice(&(*cto as u32).to_be_bytes());
    }
    make_box(b"trun", &body)
}

fn make_moof(sequence: u32, traf: &[u8]) -> Vec<u8> {
    let mut mfhd_body = vec![0u8; 4];
    mfhd_body.extend_from_slice(&sequence.to_be_bytes());
    let mut moof_body = make_box(b"mfhd", &mfhd_body);
    moof_body.extend_from_slice(traf);
    make_box(b"moof", &moof_body)
}

/// Sizes of the fixed-layout fragment boxes, used to precompute the trun
/// data offset before the moof is assembled.
const MFHD_SIZE: usize = 16;
const TFHD_SIZE: usize = 20;
const TFDT_SIZE: usize = 16;

fn trun_size(sample_count: usize) -> usize {
    8 + 8 + 4 + sample_count * 8
}

/// Assemble a media segment: one `moof`+`mdat` pair per fragment spec, with
/// trun data offsets pointing at the start of each mdat payload.
pub fn make_media_segment(fragments: &[FragmentSpec<'_>]) -> Bytes {
    let mut out = Vec::new();
    for (index, spec) in fragments.iter().enumerate() {
        assert_eq!(spec.samples.len(), spec.composition_offsets.len());

        let traf_size = 8 + TFHD_SIZE + TFDT_SIZE + trun_size(spec.samples.len());
        let moof_size = 8 + MFHD_SIZE + traf_size;

        let entries: Vec<(u32, i64)> = spec
            .samples
            .iter()
            .zip(spec.composition_offsets)
            .map(|(sample, cto)| (sample.len() as u32, *cto))
            .collect();

        let mut traf = make_tfhd(1, spec.default_duration);
        traf.extend_from_slice(&make_tfdt(spec.base_decode_time));
        traf.extend_from_slice(&make_trun((moof_size + 8) as u32, &entries));
        let traf = make_box(b"traf", &traf);
        debug_assert_eq!(traf.len(), traf_size);

        out.extend_from_slice(&make_moof(index as u32 + 1, &traf));

        let mdat_payload: Vec<u8> = spec.samples.concat();
        out.extend_from_slice(&make_box(b"mdat", &mdat_payload));
    }
    Bytes::from(out)
}

/// A segment whose single traf carries two sample runs: a one-sample video
/// run followed by a one-sample secondary run.
pub fn make_two_run_segment(duration: u32, video: &[u8], secondary: &[u8]) -> Bytes {
    let traf_size = 8 + TFHD_SIZE + TFDT_SIZE + 2 * trun_size(1);
    let moof_size = 8 + MFHD_SIZE + traf_size;

    let mut traf = make_tfhd(1, duration);
    traf.extend_from_slice(&make_tfdt(0));
    traf.extend_from_slice(&make_trun((moof_size + 8) as u32, &[(video.len() as u32, 0)]));
    traf.extend_from_slice(&make_trun(
        (moof_size + 8 + video.len()) as u32,
        &[(secondary.len() as u32, 0)],
    ));
    let traf = make_box(b"traf", &traf);
    debug_assert_eq!(traf.len(), traf_size);

    let mut out = make_moof(1, &traf);
    let mut mdat_payload = video.to_vec();
    mdat_payload.extend_from_slice(secondary);
    out.extend_from_slice(&make_box(b"mdat", &mdat_payload));
    Bytes::from(out)
}
