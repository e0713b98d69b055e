//! Reinterpret trailing axes as compound elements and back.
//!
//! [`View::explode`] absorbs the last `group_rank` axes of a view of `T` into
//! one element of a larger plain-old-data type `U` (for example a trailing
//! axis of two `f64` into one `Complex<f64>`). [`View::collapse`] splits each `T` into
//! its `U` components along a new trailing axis. Both only rewrite axis
//! metadata and reinterpret the buffer through `bytemuck`.

use std::mem::size_of;

use bytemuck::Pod;

use crate::auxiliary::{c_order_strides, checked_len};
use crate::axis::{Axis, Dims};
use crate::view::{View, ViewD, ViewMut, ViewMutD};
use crate::{Result, StridedError};

/// Axes, offset and ratio of `T`s per `U` for an explode.
fn explode_axes<T, U>(axes: &[Axis], offset: isize, group_rank: usize) -> Result<(Vec<Axis>, isize, usize)> {
    let rank = axes.len();
    if rank < group_rank {
        return Err(StridedError::RankMismatch(rank, group_rank));
    }
    let (outer, group) = axes.split_at(rank - group_rank);
    let r = checked_len(group.iter().map(|a| a.size))?;
    let bytes = r.checked_mul(size_of::<T>()).ok_or(StridedError::OffsetOverflow)?;
    if r == 0 || bytes != size_of::<U>() {
        return Err(StridedError::SizeMismatch {
            expected: size_of::<U>(),
            found: bytes,
        });
    }

    let sizes: Vec<usize> = group.iter().map(|a| a.size).collect();
    let compact = group
        .iter()
        .zip(c_order_strides(&sizes)?)
        .all(|(a, s)| a.size == 1 || a.stride == s);
    if !compact {
        return Err(StridedError::MisalignedStride(
            "absorbed axes are not compact",
        ));
    }

    let ri = r as isize;
    let mut out = Vec::with_capacity(outer.len());
    for axis in outer {
        if axis.stride % ri != 0 {
            return Err(StridedError::MisalignedStride(
                "stride is not a multiple of the compound size",
            ));
        }
        out.push(Axis::new(axis.size, axis.stride / ri));
    }
    if offset % ri != 0 {
        return Err(StridedError::MisalignedStride(
            "offset is not a multiple of the compound size",
        ));
    }
    Ok((out, offset / ri, r))
}

/// Axes, offset and ratio of `U`s per `T` for a collapse.
fn collapse_axes<T, U>(axes: &[Axis], offset: isize) -> Result<(Vec<Axis>, isize, usize)> {
    let (t, u) = (size_of::<T>(), size_of::<U>());
    if u == 0 || t % u != 0 {
        return Err(StridedError::SizeMismatch {
            expected: t,
            found: u,
        });
    }
    let r = t / u;
    let ri = r as isize;
    let mut out = Vec::with_capacity(axes.len() + 1);
    for axis in axes {
        let stride = axis
            .stride
            .checked_mul(ri)
            .ok_or(StridedError::OffsetOverflow)?;
        out.push(Axis::new(axis.size, stride));
    }
    out.push(Axis::new(r, 1));
    let offset = offset.checked_mul(ri).ok_or(StridedError::OffsetOverflow)?;
    Ok((out, offset, r))
}

fn cast_error(_: bytemuck::PodCastError) -> StridedError {
    StridedError::MisalignedStride("buffer is not aligned for the target type")
}

impl<'a, T: Pod, D: Dims> View<'a, T, D> {
    /// View the last `group_rank` axes as single elements of type `U`.
    ///
    /// # Errors
    /// - [`StridedError::SizeMismatch`] if the absorbed axes do not hold
    ///   exactly `size_of::<U>()` bytes
    /// - [`StridedError::MisalignedStride`] if the absorbed axes are not
    ///   compact, a remaining stride or the offset does not line up with `U`,
    ///   or the buffer is not aligned for `U`
    ///
    /// # Example
    /// ```rust
    /// use num_complex::Complex64;
    /// use strided_frame::{View, ViewD};
    ///
    /// let data = [1.0, 2.0, 3.0, 4.0];
    /// let v: ViewD<'_, f64> = View::from_shape(&data, &[2, 2]).unwrap();
    /// let z = v.explode::<Complex64>(1).unwrap();
    /// assert_eq!(z.shape(), vec![2]);
    /// assert_eq!(*z.at(&[1]), Complex64::new(3.0, 4.0));
    /// ```
    pub fn explode<U: Pod>(&self, group_rank: usize) -> Result<ViewD<'a, U>> {
        let (axes, offset, r) = explode_axes::<T, U>(self.axes(), self.offset, group_rank)?;
        let src = self.data;
        let whole = src.len() - src.len() % r;
        let data: &'a [U] = bytemuck::try_cast_slice(&src[..whole]).map_err(cast_error)?;
        View::new(data, axes, offset)
    }

    /// Split every element into its `U` components along a new last axis.
    pub fn collapse<U: Pod>(&self) -> Result<ViewD<'a, U>> {
        let (axes, offset, _) = collapse_axes::<T, U>(self.axes(), self.offset)?;
        let data: &'a [U] = bytemuck::try_cast_slice(self.data).map_err(cast_error)?;
        View::new(data, axes, offset)
    }
}

impl<'a, T: Pod, D: Dims> ViewMut<'a, T, D> {
    pub fn explode<U: Pod>(self, group_rank: usize) -> Result<ViewMutD<'a, U>> {
        let (axes, offset, r) = explode_axes::<T, U>(self.axes(), self.offset, group_rank)?;
        let src = self.data;
        let whole = src.len() - src.len() % r;
        let data: &'a mut [U] =
            bytemuck::try_cast_slice_mut(&mut src[..whole]).map_err(cast_error)?;
        ViewMut::derived(data, axes, offset)
    }

    pub fn collapse<U: Pod>(self) -> Result<ViewMutD<'a, U>> {
        let (axes, offset, _) = collapse_axes::<T, U>(self.axes(), self.offset)?;
        let data: &'a mut [U] = bytemuck::try_cast_slice_mut(self.data).map_err(cast_error)?;
        ViewMut::derived(data, axes, offset)
    }
}
