//! Rank-polymorphic strided views with lazy, frame-matched expression evaluation.
//!
//! The crate is organized in layers, leaves first.
//!
//! # Views
//!
//! - [`Axis`]: one `(size, stride)` pair, strides in elements (0 broadcasts,
//!   negative reverses)
//! - [`View`] / [`ViewMut`]: borrowed buffers plus an axis sequence. The axis
//!   container `D` is either `[Axis; N]` (rank known at compile time, see
//!   [`ViewN`]) or `Vec<Axis>` (any rank, see [`ViewD`]); both go through the
//!   [`Dims`] capability.
//!
//! # Expressions
//!
//! - [`combine`] pairs an operator with a tuple of operands and runs frame
//!   matching eagerly ([`match_frames`]): operand axes are right-aligned,
//!   size-1 and missing axes broadcast with stride 0.
//! - [`Expr`] is itself an [`Operand`], so expression trees nest without
//!   materializing intermediates.
//! - [`Scalar`], [`iota`], [`View::cells`] and [`reframe`] are the other operand kinds.
//!
//! # Evaluation
//!
//! - [`ply`] walks the frame outermost-first, fusing trailing axes that are
//!   contiguous for every operand into one inner loop.
//! - [`ply_fold`], [`for_each`], [`assign`], [`reduce`] and [`sum`] are built on top of it.
//! - With the `parallel` feature, `ply_par` splits the outer frame across
//!   rayon workers.
//!
//! # Shape operations
//!
//! [`View::reverse`], [`View::transpose`], [`View::diag`], [`View::reshape`],
//! [`View::stencil`], [`View::explode`] and [`View::collapse`] only rewrite axis
//! metadata; the result borrows the same buffer.
//!
//! # Example
//!
//! ```rust
//! use strided_frame::{assign, combine, ViewD, ViewMut, View};
//!
//! let a_data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let b_data = [10.0, 20.0, 30.0];
//! let mut out_data = [0.0; 6];
//!
//! let a: ViewD<'_, f64> = View::from_shape(&a_data, &[2, 3]).unwrap();
//! let b: ViewD<'_, f64> = View::from_shape(&b_data, &[3]).unwrap();
//! let out: ViewMut<'_, f64> = ViewMut::from_shape(&mut out_data, &[2, 3]).unwrap();
//!
//! let sum = combine(|x: f64, y: f64| x + y, (a, b)).unwrap();
//! assign(out, sum).unwrap();
//! assert_eq!(out_data, [11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
//! ```

mod auxiliary;
mod axis;
pub mod broadcast;
mod expr;
mod fuse;
mod kernel;
mod ops;
mod pod;
mod shape;
#[cfg(feature = "parallel")]
mod threading;
pub mod view;

pub use auxiliary::{c_order_strides, is_ravel_free};
pub use axis::{Axis, Dims};
pub use broadcast::{match_frames, FrameMatch, OperandFrame};
pub use expr::{
    combine, iota, reframe, Apply, Cells, CellsCursor, Cursor, CursorList, Expr, ExprCursor, Iota,
    IotaCursor, Operand, OperandList, Reframe, Scalar, ViewCursor, ViewMutCursor,
};
pub use kernel::{ply, ply_fold};
pub use ops::{assign, for_each, map1, map2, map3, map4, reduce, sum};
#[cfg(feature = "parallel")]
pub use threading::ply_par;
pub use view::{Slot, View, ViewD, ViewMut, ViewMutD, ViewMutN, ViewN};

/// Minimum number of frame elements before `ply_par` splits work across threads.
pub const MIN_THREAD_LENGTH: usize = 1 << 15;

/// Ranks up to this size keep cursor strides inline instead of on the heap.
pub const MAX_INLINE_RANK: usize = 8;

/// Errors that can occur while building views, matching frames or reshaping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StridedError {
    /// Operand sizes disagree on a frame axis.
    #[error("shape mismatch on axis {axis}: expected {expected}, found {found}")]
    ShapeMismatch {
        axis: usize,
        expected: usize,
        found: usize,
    },

    /// Wrong number of axes, axis-map entries or operands.
    #[error("rank mismatch: {0} vs {1}")]
    RankMismatch(usize, usize),

    /// An index (or stencil extent) exceeds the size of an axis.
    #[error("index {index} out of bounds for axis {axis} of size {size}")]
    OutOfBounds {
        axis: usize,
        index: usize,
        size: usize,
    },

    /// Invalid axis index for the given rank.
    #[error("invalid axis {axis} for rank {rank}")]
    InvalidAxis { axis: usize, rank: usize },

    /// Two positions of a mutable view reach the same element through
    /// nonzero strides.
    #[error("axes of a mutable view overlap")]
    OverlappingAxes,

    /// The addressable range of a view leaves its buffer.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,

    /// Reshape placeholder is ambiguous or does not divide the element count.
    #[error("bad reshape placeholder: {0}")]
    BadPlaceholder(&'static str),

    /// The reshape would need a copy of the source.
    #[error("reshape from {from:?} to {to:?} requires a copy")]
    UnsupportedReshape { from: Vec<usize>, to: Vec<usize> },

    /// Explode/collapse stride or alignment violation.
    #[error("misaligned stride: {0}")]
    MisalignedStride(&'static str),

    /// Explode/collapse byte sizes do not line up.
    #[error("size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// No operand determines the size of this frame axis.
    #[error("frame axis {axis} has undetermined size")]
    UndeterminedFrame { axis: usize },
}

/// Result type for strided operations.
pub type Result<T> = std::result::Result<T, StridedError>;
