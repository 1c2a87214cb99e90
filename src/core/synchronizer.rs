// Stream Synchronizer
// Two-pointer merge of two exchanges' snapshot streams into aligned pairs

use crate::core::types::{AlignedPair, Snapshot};

/// Default alignment window
pub const DEFAULT_TOLERANCE_MS: i64 = 60_000;

/// Position of the merge in both streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    At { a: usize, b: usize },
    Exhausted,
}

/// Lazy, finite sequence of aligned pairs.
///
/// Both inputs must be ordered by strictly increasing timestamp. A pair is
/// emitted when `|t_a - t_b| < tolerance` and both sides then advance, so no
/// snapshot is used twice. Otherwise the side with the older snapshot
/// advances (side A on an exact tie). Once either side runs out the
/// iterator stays exhausted.
#[derive(Debug, Clone)]
pub struct AlignedPairs<'a> {
    stream_a: &'a [Snapshot],
    stream_b: &'a [Snapshot],
    tolerance_ms: i64,
    cursor: Cursor,
}

impl<'a> AlignedPairs<'a> {
    pub fn new(stream_a: &'a [Snapshot], stream_b: &'a [Snapshot], tolerance_ms: i64) -> Self {
        Self {
            stream_a,
            stream_b,
            tolerance_ms,
            cursor: Cursor::At { a: 0, b: 0 },
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Indices of the next snapshots to be compared, if any remain
    pub fn position(&self) -> Option<(usize, usize)> {
        match self.cursor {
            Cursor::At { a, b } => Some((a, b)),
            Cursor::Exhausted => None,
        }
    }
}

impl<'a> Iterator for AlignedPairs<'a> {
    type Item = AlignedPair;

    fn next(&mut self) -> Option<Self::Item> {
        while let Cursor::At { a, b } = self.cursor {
            let (snap_a, snap_b) = match (self.stream_a.get(a), self.stream_b.get(b)) {
                (Some(sa), Some(sb)) => (sa, sb),
                _ => {
                    self.cursor = Cursor::Exhausted;
                    break;
                }
            };

            if (snap_a.timestamp - snap_b.timestamp).abs() < self.tolerance_ms {
                self.cursor = Cursor::At { a: a + 1, b: b + 1 };
                return Some(AlignedPair::new(*snap_a, *snap_b));
            }

            self.cursor = if snap_b.timestamp < snap_a.timestamp {
                Cursor::At { a, b: b + 1 }
            } else {
                Cursor::At { a: a + 1, b }
            };
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            Cursor::At { a, b } => {
                let remaining_a = self.stream_a.len().saturating_sub(a);
                let remaining_b = self.stream_b.len().saturating_sub(b);
                (0, Some(remaining_a.min(remaining_b)))
            }
            Cursor::Exhausted => (0, Some(0)),
        }
    }
}

impl std::iter::FusedIterator for AlignedPairs<'_> {}

/// Convenience wrapper with the crate's default tolerance
pub fn synchronize<'a>(stream_a: &'a [Snapshot], stream_b: &'a [Snapshot]) -> AlignedPairs<'a> {
    AlignedPairs::new(stream_a, stream_b, DEFAULT_TOLERANCE_MS)
}
