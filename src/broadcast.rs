//! Frame matching: reconcile operand shapes into one iteration frame.
//!
//! Every operand contributes its frame axes (all of its axes for ordinary
//! elementwise operators, all but the cell axes for [`View::cells`](crate::View::cells)).
//! By default an operand's axes are right-aligned against the frame, so an
//! operand missing leading axes broadcasts along them. An operand may instead
//! carry an explicit axis map (see [`reframe`](crate::reframe)), in which case
//! operand axis `j` sits on frame axis `map[j]`.
//!
//! On each frame axis, sizes of 1 and undetermined sizes broadcast; every other
//! contributing size must agree exactly.
//!
//! # Example
//!
//! ```rust
//! use strided_frame::broadcast::{match_frames, OperandFrame};
//!
//! let m = match_frames(&[
//!     OperandFrame::from_sizes(&[3, 4]),
//!     OperandFrame::from_sizes(&[4]),
//! ])
//! .unwrap();
//! assert_eq!(m.shape, vec![Some(3), Some(4)]);
//! assert_eq!(m.placements[1], vec![1]);
//! ```

use crate::{Result, StridedError};

/// Shape information one operand contributes to frame matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandFrame {
    /// Size of each operand frame axis; `None` when the operand adapts to
    /// whatever the other operands determine.
    pub sizes: Vec<Option<usize>>,
    /// Explicit frame axis for each operand axis, or `None` to right-align.
    pub map: Option<Vec<usize>>,
}

impl OperandFrame {
    pub fn new(sizes: Vec<Option<usize>>, map: Option<Vec<usize>>) -> Self {
        Self { sizes, map }
    }

    /// Right-aligned operand with fully known sizes.
    pub fn from_sizes(sizes: &[usize]) -> Self {
        Self {
            sizes: sizes.iter().map(|&n| Some(n)).collect(),
            map: None,
        }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }
}

/// Result of frame matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMatch {
    /// Frame size per axis; `None` if no operand determines it.
    pub shape: Vec<Option<usize>>,
    /// For each operand, the frame axis of each of its axes.
    pub placements: Vec<Vec<usize>>,
}

impl FrameMatch {
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Frame sizes, provided every axis is determined.
    pub fn determined_shape(&self) -> Result<Vec<usize>> {
        self.shape
            .iter()
            .enumerate()
            .map(|(axis, n)| n.ok_or(StridedError::UndeterminedFrame { axis }))
            .collect()
    }
}

/// Compute the common frame of `operands` and where each operand's axes land in it.
///
/// # Errors
/// - [`StridedError::RankMismatch`] if an explicit map has a different length
///   than the operand's rank
/// - [`StridedError::InvalidAxis`] if an explicit map names a frame axis past
///   the largest representable rank
/// - [`StridedError::ShapeMismatch`] if two operands disagree on a frame axis
pub fn match_frames(operands: &[OperandFrame]) -> Result<FrameMatch> {
    let mut rank = 0usize;
    for op in operands {
        let r = match &op.map {
            Some(map) => {
                if map.len() != op.rank() {
                    return Err(StridedError::RankMismatch(map.len(), op.rank()));
                }
                match map.iter().max() {
                    None => 0,
                    Some(&m) => m.checked_add(1).ok_or(StridedError::InvalidAxis {
                        axis: m,
                        rank: op.rank(),
                    })?,
                }
            }
            None => op.rank(),
        };
        rank = rank.max(r);
    }

    let placements: Vec<Vec<usize>> = operands
        .iter()
        .map(|op| match &op.map {
            Some(map) => map.clone(),
            None => (rank - op.rank()..rank).collect(),
        })
        .collect();

    let mut shape: Vec<Option<usize>> = vec![None; rank];
    for (op, placement) in operands.iter().zip(&placements) {
        for (&size, &k) in op.sizes.iter().zip(placement) {
            let Some(n) = size else { continue };
            shape[k] = match shape[k] {
                None | Some(1) => Some(n),
                Some(m) if n == 1 || n == m => Some(m),
                Some(m) => {
                    return Err(StridedError::ShapeMismatch {
                        axis: k,
                        expected: m,
                        found: n,
                    })
                }
            };
        }
    }

    tracing::trace!(?shape, ?placements, "matched frames");
    Ok(FrameMatch { shape, placements })
}
