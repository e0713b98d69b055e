//! Stride bookkeeping shared by views and shape operations.

use crate::axis::Axis;
use crate::{Result, StridedError};

/// Compute C-order strides (last index varies fastest).
///
/// # Errors
/// [`StridedError::OffsetOverflow`] if a stride does not fit in `isize`.
pub fn c_order_strides(dims: &[usize]) -> Result<Vec<isize>> {
    let mut strides = vec![1isize; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        let n = isize::try_from(dims[i + 1]).map_err(|_| StridedError::OffsetOverflow)?;
        strides[i] = strides[i + 1]
            .checked_mul(n)
            .ok_or(StridedError::OffsetOverflow)?;
    }
    Ok(strides)
}

/// C-order axes for `dims`, every stride multiplied by `scale`.
pub(crate) fn c_order_axes(dims: &[usize], scale: isize) -> Result<Vec<Axis>> {
    dims.iter()
        .zip(c_order_strides(dims)?)
        .map(|(&size, stride)| {
            let stride = stride
                .checked_mul(scale)
                .ok_or(StridedError::OffsetOverflow)?;
            Ok(Axis::new(size, stride))
        })
        .collect()
}

/// Product of `sizes`, or [`StridedError::OffsetOverflow`] if it does not fit.
pub(crate) fn checked_len(sizes: impl IntoIterator<Item = usize>) -> Result<usize> {
    sizes
        .into_iter()
        .try_fold(1usize, |acc, n| acc.checked_mul(n))
        .ok_or(StridedError::OffsetOverflow)
}

/// Whether distinct positions of `axes` always reach distinct elements.
///
/// Axes of size 1 or stride 0 are skipped; they never move the position. The
/// rest, sorted by `|stride|`, must each step past the whole span of the
/// shorter ones. This accepts every C-order, strided, transposed or reversed
/// layout but rejects some interleavings that happen to be injective.
pub(crate) fn is_non_overlapping(axes: &[Axis]) -> bool {
    if axes.iter().any(|a| a.size == 0) {
        return true;
    }
    let mut moving: Vec<(usize, usize)> = axes
        .iter()
        .filter(|a| a.size > 1 && a.stride != 0)
        .map(|a| (a.stride.unsigned_abs(), a.size))
        .collect();
    moving.sort_unstable();
    let mut span = 0usize;
    for (stride, size) in moving {
        if stride <= span {
            return false;
        }
        match stride
            .checked_mul(size - 1)
            .and_then(|extent| extent.checked_add(span))
        {
            Some(next) => span = next,
            None => return false,
        }
    }
    true
}

/// Whether the elements of `axes`, read in axis order, form one evenly
/// strided run of the buffer.
///
/// Size-1 axes never break the run. The run's own step (see [`ravel_stride`])
/// does not need to be 1.
pub fn is_ravel_free(axes: &[Axis]) -> bool {
    let mut r = axes.len();
    while r > 0 && axes[r - 1].size == 1 {
        r -= 1;
    }
    if r == 0 {
        return true;
    }
    let step = |stride: isize, size: usize| {
        isize::try_from(size)
            .ok()
            .and_then(|n| stride.checked_mul(n))
    };
    let mut stride = axes[r - 1].stride;
    let mut size = axes[r - 1].size;
    for axis in axes[..r - 1].iter().rev() {
        if axis.size != 1 {
            match step(stride, size) {
                Some(expected) if axis.stride == expected => {
                    stride = expected;
                    size = axis.size;
                }
                _ => return false,
            }
        }
    }
    true
}

/// Step of the run described by ravel-free `axes`: the stride of the
/// innermost axis with more than one position, or 1 if there is none.
pub(crate) fn ravel_stride(axes: &[Axis]) -> isize {
    axes.iter()
        .rev()
        .find(|a| a.size != 1)
        .map_or(1, |a| a.stride)
}

pub(crate) fn total_len(axes: &[Axis]) -> usize {
    axes.iter().map(|a| a.size).product()
}

pub(crate) fn sizes(axes: &[Axis]) -> Vec<usize> {
    axes.iter().map(|a| a.size).collect()
}

/// Validate that every position reachable through `axes` from `offset`
/// stays within `[0, len)`.
pub(crate) fn validate_bounds(len: usize, axes: &[Axis], offset: isize) -> Result<()> {
    if axes.iter().any(|a| a.size == 0) {
        return Ok(());
    }
    checked_len(axes.iter().map(|a| a.size))?;
    let mut min_offset = offset;
    let mut max_offset = offset;
    for axis in axes {
        if axis.size > 1 {
            let end = isize::try_from(axis.size - 1)
                .ok()
                .and_then(|n| axis.stride.checked_mul(n))
                .ok_or(StridedError::OffsetOverflow)?;
            if end >= 0 {
                max_offset = max_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            } else {
                min_offset = min_offset
                    .checked_add(end)
                    .ok_or(StridedError::OffsetOverflow)?;
            }
        }
    }
    if min_offset < 0 || max_offset < 0 || max_offset as usize >= len {
        return Err(StridedError::OffsetOverflow);
    }
    Ok(())
}

/// Linear offset of `indices` relative to the view's first element, with
/// every index checked against its axis.
pub(crate) fn checked_offset(axes: &[Axis], indices: &[usize]) -> Result<isize> {
    if indices.len() != axes.len() {
        return Err(StridedError::RankMismatch(indices.len(), axes.len()));
    }
    let mut off = 0isize;
    for (k, (axis, &i)) in axes.iter().zip(indices).enumerate() {
        if i >= axis.size {
            return Err(StridedError::OutOfBounds {
                axis: k,
                index: i,
                size: axis.size,
            });
        }
        off += i as isize * axis.stride;
    }
    Ok(off)
}
