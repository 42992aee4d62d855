//! Locates the end of one MessagePack object without decoding it.
//!
//! The scan only reads markers and length prefixes, and can resume where a
//! previous scan ran out of input, so a buffer that grows chunk by chunk is
//! walked once in total.

/// Where a scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanState {
    /// Offset of the next item to read.
    pos: usize,
    /// Items still to be read, including the one at `pos`.
    pending: u64,
}

impl Default for ScanState {
    fn default() -> Self {
        Self { pos: 0, pending: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Scan {
    /// The object occupies this many leading bytes.
    Complete(usize),
    /// More input is needed. The object is at least `needed` bytes long.
    Incomplete { resume: ScanState, needed: usize },
    /// Reserved marker `0xc1`.
    Invalid { offset: usize },
}

enum Step {
    /// Item of a fixed total size.
    Fixed(usize),
    /// Big-endian length prefix of `width` bytes, then `extra + length` bytes.
    Sized { width: usize, extra: usize },
    /// One-byte header followed by this many nested items.
    Nested(u64),
    /// Big-endian count prefix of `width` bytes; each entry is `per_entry` items.
    Counted { width: usize, per_entry: u64 },
}

fn step(marker: u8) -> Option<Step> {
    let step = match marker {
        0x00..=0x7f | 0xc0 | 0xc2 | 0xc3 | 0xe0..=0xff => Step::Fixed(1),
        0x80..=0x8f => Step::Nested(u64::from(marker & 0x0f) * 2),
        0x90..=0x9f => Step::Nested(u64::from(marker & 0x0f)),
        0xa0..=0xbf => Step::Fixed(1 + usize::from(marker & 0x1f)),
        0xc1 => return None,
        0xc4 | 0xd9 => Step::Sized { width: 1, extra: 0 },
        0xc5 | 0xda => Step::Sized { width: 2, extra: 0 },
        0xc6 | 0xdb => Step::Sized { width: 4, extra: 0 },
        0xc7 => Step::Sized { width: 1, extra: 1 },
        0xc8 => Step::Sized { width: 2, extra: 1 },
        0xc9 => Step::Sized { width: 4, extra: 1 },
        0xcc | 0xd0 => Step::Fixed(2),
        0xcd | 0xd1 => Step::Fixed(3),
        0xca | 0xce | 0xd2 => Step::Fixed(5),
        0xcb | 0xcf | 0xd3 => Step::Fixed(9),
        0xd4 => Step::Fixed(3),
        0xd5 => Step::Fixed(4),
        0xd6 => Step::Fixed(6),
        0xd7 => Step::Fixed(10),
        0xd8 => Step::Fixed(18),
        0xdc => Step::Counted { width: 2, per_entry: 1 },
        0xdd => Step::Counted { width: 4, per_entry: 1 },
        0xde => Step::Counted { width: 2, per_entry: 2 },
        0xdf => Step::Counted { width: 4, per_entry: 2 },
    };
    Some(step)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Every pending item takes at least one byte.
fn lower_bound(end: usize, pending: u64) -> usize {
    end.saturating_add(usize::try_from(pending).unwrap_or(usize::MAX))
}

/// Scans `buf` for one complete object, starting from `state`.
pub(crate) fn scan_value(buf: &[u8], mut state: ScanState) -> Scan {
    while state.pending > 0 {
        let start = state.pos;
        let rest = state.pending - 1;
        let incomplete = |end: usize, pending: u64| Scan::Incomplete {
            resume: state,
            needed: lower_bound(end, pending),
        };

        let Some(&marker) = buf.get(start) else {
            return incomplete(start + 1, rest);
        };
        let Some(step) = step(marker) else {
            return Scan::Invalid { offset: start };
        };

        let (end, nested) = match step {
            Step::Fixed(size) => (start.saturating_add(size), 0),
            Step::Nested(count) => (start + 1, count),
            Step::Sized { width, extra } => {
                let header = start + 1 + width;
                if header > buf.len() {
                    return incomplete(header + extra, rest);
                }
                let len = usize::try_from(read_be(&buf[start + 1..header])).unwrap_or(usize::MAX);
                (header.saturating_add(extra).saturating_add(len), 0)
            }
            Step::Counted { width, per_entry } => {
                let header = start + 1 + width;
                if header > buf.len() {
                    return incomplete(header, rest);
                }
                (header, read_be(&buf[start + 1..header]).saturating_mul(per_entry))
            }
        };

        if end > buf.len() {
            return incomplete(end, rest.saturating_add(nested));
        }
        state = ScanState {
            pos: end,
            pending: rest.saturating_add(nested),
        };
    }

    Scan::Complete(state.pos)
}
