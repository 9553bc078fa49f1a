//! Overlap detection for clips sharing a layer and a track.
//!
//! Used at commit time: overlaps on auto-transition layers become
//! transition objects, overlaps anywhere else reject the commit.

use splice_core::TimeRange;

use crate::clip::Clip;
use crate::ids::ClipId;

/// Two clips whose ranges intersect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipOverlap {
    /// The clip that starts first.
    pub first: ClipId,
    pub second: ClipId,
    pub range: TimeRange,
}

/// Find every pairwise overlap of non-zero length. `clips` must be sorted
/// by start; results come out ordered by the first clip, then the second.
pub fn find_overlaps(clips: &[&Clip]) -> Vec<ClipOverlap> {
    let mut overlaps = Vec::new();
    for (i, first) in clips.iter().enumerate() {
        for second in &clips[i + 1..] {
            if second.start() >= first.end() {
                break;
            }
            if let Some(range) = first.range().intersection(second.range()) {
                if !range.duration.is_zero() {
                    overlaps.push(ClipOverlap {
                        first: first.id(),
                        second: second.id(),
                        range,
                    });
                }
            }
        }
    }
    overlaps
}
