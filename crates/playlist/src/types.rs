use std::fmt;
use std::str::FromStr;

/// Display resolution from a `RESOLUTION=WxH` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.split_once('x').ok_or(())?;
        Ok(Self {
            width: w.parse().map_err(|_| ())?,
            height: h.parse().map_err(|_| ())?,
        })
    }
}

/// A byte sub-range as written in the playlist: `length[@offset]`.
///
/// The offset may be omitted, in which case it is inherited from the end of
/// the previous segment's resolved range (same URI only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawByteRange {
    pub length: u64,
    pub offset: Option<u64>,
}

impl FromStr for RawByteRange {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (length, offset) = match s.split_once('@') {
            Some((l, o)) => (l, Some(o.parse().map_err(|_| ())?)),
            None => (s, None),
        };
        Ok(Self {
            length: length.parse().map_err(|_| ())?,
            offset,
        })
    }
}

/// A fully resolved byte sub-range of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub length: u64,
    pub offset: u64,
}

impl ByteRange {
    /// End offset, exclusive.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.length, self.offset)
    }
}
