//! ISOBMFF box scanning primitives.
//!
//! Boxes are `[u32 size][4cc type][payload]` with big-endian fixed-width
//! integers. Sizes are clamped to a minimum of 8 so corrupt input cannot
//! stall a walk.

use bytes::Bytes;

/// Parsed view over a single box inside a parent byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoxView {
    pub(crate) end: usize,
    pub(crate) fourcc: [u8; 4],
    pub(crate) body_start: usize,
    pub(crate) body_end: usize,
}

/// Read a box header: returns `(total_box_size, fourcc)`.
///
/// The declared size is clamped to a minimum of 8 bytes (the header itself)
/// to guarantee forward progress on corrupt input.
pub(crate) fn read_box_header(data: &[u8]) -> Option<(usize, [u8; 4])> {
    if data.len() < 8 {
        return None;
    }
    let size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let fourcc = [data[4], data[5], data[6], data[7]];
    Some((size.max(8), fourcc))
}

/// Parse a single box located at `offset` within `[0..end)`.
pub(crate) fn box_at(data: &Bytes, offset: usize, end: usize) -> Option<BoxView> {
    if offset >= end {
        return None;
    }
    let (size, fourcc) = read_box_header(&data[offset..end])?;
    if offset + size > end {
        return None;
    }
    Some(BoxView {
        end: offset + size,
        fourcc,
        body_start: offset + 8,
        body_end: offset + size,
    })
}

/// Find the first child box with the given FourCC inside `[start..end)`.
pub(crate) fn find_first_box(
    data: &Bytes,
    start: usize,
    end: usize,
    target: [u8; 4],
) -> Option<BoxView> {
    let mut offset = start;
    while offset < end {
        let parsed = box_at(data, offset, end)?;
        if parsed.fourcc == target {
            return Some(parsed);
        }
        offset = parsed.end;
    }
    None
}

/// Fixed number of payload bytes to skip before a box's children begin.
///
/// Not self-describing: `stsd` is a FullBox with an entry count (4 + 4), and
/// visual sample entries carry a 70-byte fixed header after the box header.
fn child_search_offset(fourcc: [u8; 4]) -> usize {
    match &fourcc {
        b"stsd" => 8,
        b"avc1" | b"avc3" | b"hvc1" | b"hev1" => 70,
        _ => 0,
    }
}

/// Depth-first descent along a dotted path (e.g. `moov.trak.mdia.mdhd`),
/// taking the first matching child at each level. Returns the payload of the
/// final box.
pub fn box_path(data: &Bytes, path: &str) -> Option<Bytes> {
    let mut start = 0;
    let mut end = data.len();

    for name in path.split('.') {
        let target: [u8; 4] = name.as_bytes().try_into().ok()?;
        let parsed = find_first_box(data, start, end, target)?;
        start = parsed.body_start + child_search_offset(target);
        end = parsed.body_end;
        if start > end {
            return None;
        }
    }
    Some(data.slice(start..end))
}
