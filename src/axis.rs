//! Axis descriptors and the fixed/any rank duality.

use std::fmt::Debug;

use crate::{Result, StridedError};

/// One axis of a view: number of positions and the step between them.
///
/// Strides count elements, not bytes. A stride of 0 repeats the same element
/// along the axis (broadcast); a negative stride walks the buffer backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Axis {
    pub size: usize,
    pub stride: isize,
}

impl Axis {
    #[inline]
    pub const fn new(size: usize, stride: isize) -> Self {
        Self { size, stride }
    }

    /// Offset of the last position relative to the first, or 0 for an empty axis.
    #[inline]
    pub fn extent(&self) -> isize {
        if self.size == 0 {
            0
        } else {
            (self.size as isize - 1) * self.stride
        }
    }
}

/// Capability shared by the axis containers a view can carry.
///
/// `[Axis; N]` fixes the rank at compile time and `Vec<Axis>` carries it at
/// run time. Code that only needs `rank()`/`axis(i)` is written against this
/// trait and works for both.
pub trait Dims: Clone + Debug {
    /// Rank when it is part of the type, `None` for any-rank containers.
    const RANK: Option<usize>;

    fn axes(&self) -> &[Axis];

    fn axes_mut(&mut self) -> &mut [Axis];

    /// Build the container from a run-time axis list.
    ///
    /// Fails with [`StridedError::RankMismatch`] when a fixed-rank container
    /// receives the wrong number of axes.
    fn try_from_axes(axes: Vec<Axis>) -> Result<Self>;

    #[inline]
    fn rank(&self) -> usize {
        self.axes().len()
    }

    #[inline]
    fn axis(&self, k: usize) -> Axis {
        self.axes()[k]
    }

    fn into_vec(self) -> Vec<Axis> {
        self.axes().to_vec()
    }
}

impl<const N: usize> Dims for [Axis; N] {
    const RANK: Option<usize> = Some(N);

    #[inline]
    fn axes(&self) -> &[Axis] {
        self
    }

    #[inline]
    fn axes_mut(&mut self) -> &mut [Axis] {
        self
    }

    fn try_from_axes(axes: Vec<Axis>) -> Result<Self> {
        let len = axes.len();
        axes.try_into()
            .map_err(|_| StridedError::RankMismatch(len, N))
    }
}

impl Dims for Vec<Axis> {
    const RANK: Option<usize> = None;

    #[inline]
    fn axes(&self) -> &[Axis] {
        self
    }

    #[inline]
    fn axes_mut(&mut self) -> &mut [Axis] {
        self
    }

    #[inline]
    fn try_from_axes(axes: Vec<Axis>) -> Result<Self> {
        Ok(axes)
    }

    fn into_vec(self) -> Vec<Axis> {
        self
    }
}
