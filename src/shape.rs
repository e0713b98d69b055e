//! Shape operations that only rewrite axis metadata.
//!
//! Every operation returns a view over the same buffer as its source. Errors
//! are reported before any view is produced.

use crate::auxiliary::{c_order_axes, checked_len, is_ravel_free, ravel_stride, sizes};
use crate::axis::{Axis, Dims};
use crate::view::{View, ViewD, ViewMut, ViewMutD, ViewN};
use crate::{Result, StridedError};

fn reverse_axis(axes: &mut [Axis], offset: &mut isize, k: usize) -> Result<()> {
    let rank = axes.len();
    let axis = axes
        .get_mut(k)
        .ok_or(StridedError::InvalidAxis { axis: k, rank })?;
    if axis.size != 0 {
        *offset += axis.extent();
        axis.stride = -axis.stride;
    }
    Ok(())
}

/// Axes of the transpose sending source axis `k` to destination `map[k]`.
///
/// Destinations receiving several source axes take the smallest size and the
/// sum of the strides. A destination no source axis maps to becomes a size-1
/// axis.
pub(crate) fn transpose_axes(axes: &[Axis], map: &[usize]) -> Result<Vec<Axis>> {
    if map.len() != axes.len() {
        return Err(StridedError::RankMismatch(map.len(), axes.len()));
    }
    let rank = match map.iter().max() {
        None => 0,
        Some(&m) => m.checked_add(1).ok_or(StridedError::InvalidAxis {
            axis: m,
            rank: axes.len(),
        })?,
    };
    let mut out: Vec<Option<Axis>> = vec![None; rank];
    for (axis, &d) in axes.iter().zip(map) {
        out[d] = Some(match out[d] {
            None => *axis,
            Some(prev) => {
                let stride = prev
                    .stride
                    .checked_add(axis.stride)
                    .ok_or(StridedError::OffsetOverflow)?;
                Axis::new(prev.size.min(axis.size), stride)
            }
        });
    }
    Ok(out
        .into_iter()
        .map(|a| a.unwrap_or(Axis::new(1, 0)))
        .collect())
}

/// Resolve the `-1` placeholder of `shape` against `len` elements.
fn solve_placeholder(len: usize, shape: &[isize]) -> Result<Vec<usize>> {
    let mut out = Vec::with_capacity(shape.len());
    let mut hole = None;
    for (i, &n) in shape.iter().enumerate() {
        match n {
            -1 if hole.is_none() => {
                hole = Some(i);
                out.push(0);
            }
            -1 => return Err(StridedError::BadPlaceholder("more than one placeholder")),
            n if n < 0 => return Err(StridedError::BadPlaceholder("negative size")),
            n => out.push(n as usize),
        }
    }
    if let Some(i) = hole {
        let others = out.iter().enumerate().filter(|&(j, _)| j != i).map(|(_, &n)| n);
        if others.clone().any(|n| n == 0) {
            return Err(StridedError::BadPlaceholder("cannot deduce size next to a zero"));
        }
        let quot = checked_len(others)?;
        if len % quot != 0 {
            return Err(StridedError::BadPlaceholder("size does not divide the element count"));
        }
        out[i] = len / quot;
    }
    Ok(out)
}

/// Axes of `axes` reshaped to `shape`.
///
/// Trailing axes are kept while old and new sizes agree. At the first
/// disagreement the source must be ravel-free and hold at least as many
/// elements as requested; the new shape is then laid out in C order along the
/// source's run. If every source axis matched, remaining leading axes repeat
/// the source with stride 0.
pub(crate) fn reshape_axes(axes: &[Axis], shape: &[isize]) -> Result<Vec<Axis>> {
    let la = checked_len(axes.iter().map(|a| a.size))?;
    let sb = solve_placeholder(la, shape)?;
    let lb = if sb.contains(&0) {
        0
    } else {
        checked_len(sb.iter().copied())?
    };
    let (ra, rb) = (axes.len(), sb.len());

    let mut out = vec![Axis::default(); rb];
    let mut i = 0;
    while i < ra && i < rb {
        let a = axes[ra - 1 - i];
        if a.size != sb[rb - 1 - i] {
            let unsupported = || StridedError::UnsupportedReshape {
                from: sizes(axes),
                to: sb.clone(),
            };
            if !is_ravel_free(axes) || la < lb {
                return Err(unsupported());
            }
            tracing::debug!(from = ?sizes(axes), to = ?sb, "reshape reinterprets ravel-free run");
            return c_order_axes(&sb, ravel_stride(axes));
        }
        out[rb - 1 - i] = a;
        i += 1;
    }
    if i < rb {
        for j in 0..rb - i {
            out[j] = Axis::new(sb[j], 0);
        }
        tracing::debug!(tiled = rb - i, to = ?sb, "reshape tiles leading axes");
    } else if i < ra {
        tracing::debug!(dropped = ra - i, to = ?sb, "reshape selects trailing axes");
    }
    Ok(out)
}

pub(crate) fn stencil_axes(axes: &[Axis], lo: &[usize], hi: &[usize]) -> Result<Vec<Axis>> {
    let rank = axes.len();
    if lo.len() != rank {
        return Err(StridedError::RankMismatch(lo.len(), rank));
    }
    if hi.len() != rank {
        return Err(StridedError::RankMismatch(hi.len(), rank));
    }
    let mut out = Vec::with_capacity(2 * rank);
    let mut windows = Vec::with_capacity(rank);
    for (k, axis) in axes.iter().enumerate() {
        let pad = lo[k].checked_add(hi[k]).ok_or(StridedError::OffsetOverflow)?;
        if axis.size < pad {
            return Err(StridedError::OutOfBounds {
                axis: k,
                index: pad,
                size: axis.size,
            });
        }
        let width = pad.checked_add(1).ok_or(StridedError::OffsetOverflow)?;
        out.push(Axis::new(axis.size - pad, axis.stride));
        windows.push(Axis::new(width, axis.stride));
    }
    out.extend(windows);
    Ok(out)
}

impl<'a, T, D: Dims> View<'a, T, D> {
    /// Reverse axis `k`.
    ///
    /// # Errors
    /// [`StridedError::InvalidAxis`] if `k >= rank`.
    pub fn reverse(&self, k: usize) -> Result<View<'a, T, D>> {
        let mut axes = self.axes.clone();
        let mut offset = self.offset;
        reverse_axis(axes.axes_mut(), &mut offset, k)?;
        Ok(self.with_axes(axes, offset))
    }

    /// Generalized transpose: source axis `k` becomes destination axis `map[k]`.
    ///
    /// Mapping several source axes to one destination walks their diagonal.
    ///
    /// # Example
    /// ```rust
    /// use strided_frame::{Axis, View, ViewD};
    ///
    /// let data = [0.0; 6];
    /// let v: ViewD<'_, f64> = View::from_shape(&data, &[2, 3]).unwrap();
    /// let t = v.transpose(&[1, 0]).unwrap();
    /// assert_eq!(t.axes(), &[Axis::new(3, 1), Axis::new(2, 3)]);
    /// ```
    pub fn transpose(&self, map: &[usize]) -> Result<ViewD<'a, T>> {
        let axes = transpose_axes(self.axes(), map)?;
        Ok(self.with_axes(axes, self.offset))
    }

    /// Main diagonal of a rank-2 view.
    pub fn diag(&self) -> Result<ViewN<'a, T, 1>> {
        if self.rank() != 2 {
            return Err(StridedError::RankMismatch(self.rank(), 2));
        }
        let axes = <[Axis; 1]>::try_from_axes(transpose_axes(self.axes(), &[0, 0])?)?;
        Ok(self.with_axes(axes, self.offset))
    }

    /// Rank-1 view of a ravel-free view, in axis order.
    pub fn ravel_free(&self) -> Result<ViewN<'a, T, 1>> {
        if !is_ravel_free(self.axes()) {
            return Err(StridedError::UnsupportedReshape {
                from: self.shape(),
                to: vec![self.len()],
            });
        }
        let axis = Axis::new(self.len(), ravel_stride(self.axes()));
        Ok(self.with_axes([axis], self.offset))
    }

    /// Reshape to `shape`; one entry may be `-1`, solved from the element count.
    ///
    /// # Errors
    /// - [`StridedError::BadPlaceholder`] for several placeholders, other
    ///   negative sizes, or a placeholder that does not divide evenly
    /// - [`StridedError::UnsupportedReshape`] when the result would need a copy
    ///
    /// # Example
    /// ```rust
    /// use strided_frame::{View, ViewD};
    ///
    /// let data: Vec<i32> = (0..12).collect();
    /// let v: ViewD<'_, i32> = View::from_shape(&data, &[12]).unwrap();
    /// assert_eq!(v.reshape(&[-1, 4]).unwrap().shape(), vec![3, 4]);
    /// assert!(v.reshape(&[-1, 5]).is_err());
    /// ```
    pub fn reshape(&self, shape: &[isize]) -> Result<ViewD<'a, T>> {
        let axes = reshape_axes(self.axes(), shape)?;
        Ok(self.with_axes(axes, self.offset))
    }

    /// Every window of `lo + hi + 1` positions along every axis.
    ///
    /// The result has rank `2 * rank`: the first half of the axes selects the
    /// window, the second half the position inside it. Windows share memory.
    ///
    /// # Errors
    /// [`StridedError::OutOfBounds`] if some axis is shorter than `lo + hi`.
    pub fn stencil(&self, lo: usize, hi: usize) -> Result<ViewD<'a, T>> {
        let rank = self.rank();
        self.stencil_axes(&vec![lo; rank], &vec![hi; rank])
    }

    /// [`stencil`](Self::stencil) with per-axis padding.
    pub fn stencil_axes(&self, lo: &[usize], hi: &[usize]) -> Result<ViewD<'a, T>> {
        let axes = stencil_axes(self.axes(), lo, hi)?;
        Ok(self.with_axes(axes, self.offset))
    }
}

impl<'a, T, D: Dims> ViewMut<'a, T, D> {
    /// Reverse axis `k`. See [`View::reverse`].
    pub fn reverse(self, k: usize) -> Result<ViewMut<'a, T, D>> {
        let mut axes = self.axes.clone();
        let mut offset = self.offset;
        reverse_axis(axes.axes_mut(), &mut offset, k)?;
        Ok(self.with_axes(axes, offset))
    }

    /// Generalized transpose: source axis `k` becomes destination axis `map[k]`.
    ///
    /// A diagonal only selects positions of the source, so the result never
    /// reaches one element through two positions.
    pub fn transpose(self, map: &[usize]) -> Result<ViewMutD<'a, T>> {
        let axes = transpose_axes(self.axes(), map)?;
        let offset = self.offset;
        Ok(self.with_axes(axes, offset))
    }

    /// Reshape to `shape`, with the same placeholder and copy rules as
    /// [`View::reshape`]. Leading axes added by tiling have stride 0.
    pub fn reshape(self, shape: &[isize]) -> Result<ViewMutD<'a, T>> {
        let axes = reshape_axes(self.axes(), shape)?;
        let offset = self.offset;
        Ok(self.with_axes(axes, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(pairs: &[(usize, isize)]) -> Vec<Axis> {
        pairs.iter().map(|&(s, t)| Axis::new(s, t)).collect()
    }

    #[test]
    fn test_reverse() {
        let data: Vec<i32> = (0..6).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[2, 3]).unwrap();
        let r = v.reverse(1).unwrap();
        assert_eq!(r.axes(), &axes(&[(2, 3), (3, -1)])[..]);
        assert_eq!(r.offset(), 2);
        assert_eq!(r.to_vec(), vec![2, 1, 0, 5, 4, 3]);

        let back = r.reverse(1).unwrap();
        assert_eq!(back.axes(), v.axes());
        assert_eq!(back.offset(), v.offset());
    }

    #[test]
    fn test_reverse_empty_axis_is_noop() {
        let data: Vec<i32> = vec![];
        let v: ViewD<'_, i32> = View::from_shape(&data, &[0]).unwrap();
        let r = v.reverse(0).unwrap();
        assert_eq!(r.axes(), v.axes());
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn test_reverse_invalid_axis() {
        let data = [1];
        let v: ViewD<'_, i32> = View::from_shape(&data, &[1]).unwrap();
        assert_eq!(
            v.reverse(1).unwrap_err(),
            StridedError::InvalidAxis { axis: 1, rank: 1 }
        );
    }

    #[test]
    fn test_transpose_rank_mismatch() {
        let data = [0; 6];
        let v: ViewD<'_, i32> = View::from_shape(&data, &[2, 3]).unwrap();
        assert_eq!(
            v.transpose(&[0]).unwrap_err(),
            StridedError::RankMismatch(1, 2)
        );
    }

    #[test]
    fn test_transpose_diagonal_takes_min_and_sums() {
        let t = transpose_axes(&axes(&[(3, 4), (4, 1)]), &[0, 0]).unwrap();
        assert_eq!(t, axes(&[(3, 5)]));
    }

    #[test]
    fn test_transpose_unused_destination() {
        let t = transpose_axes(&axes(&[(3, 1)]), &[1]).unwrap();
        assert_eq!(t, axes(&[(1, 0), (3, 1)]));
        assert!(transpose_axes(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_diag() {
        let data: Vec<i32> = (0..9).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[3, 3]).unwrap();
        assert_eq!(v.diag().unwrap().to_vec(), vec![0, 4, 8]);

        let v: ViewD<'_, i32> = View::from_shape(&data, &[9]).unwrap();
        assert_eq!(v.diag().unwrap_err(), StridedError::RankMismatch(1, 2));
    }

    #[test]
    fn test_ravel_free_view() {
        let data: Vec<i32> = (0..12).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[3, 4]).unwrap();
        let flat = v.ravel_free().unwrap();
        assert_eq!(flat.axes(), &[Axis::new(12, 1)]);

        let t = v.transpose(&[1, 0]).unwrap();
        assert!(matches!(
            t.ravel_free(),
            Err(StridedError::UnsupportedReshape { .. })
        ));
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(solve_placeholder(12, &[-1, 4]).unwrap(), vec![3, 4]);
        assert_eq!(solve_placeholder(12, &[2, -1, 3]).unwrap(), vec![2, 2, 3]);
        assert!(matches!(
            solve_placeholder(12, &[-1, 5]),
            Err(StridedError::BadPlaceholder(_))
        ));
        assert!(matches!(
            solve_placeholder(12, &[-1, -1]),
            Err(StridedError::BadPlaceholder(_))
        ));
        assert!(matches!(
            solve_placeholder(12, &[-2, 6]),
            Err(StridedError::BadPlaceholder(_))
        ));
        assert!(matches!(
            solve_placeholder(0, &[-1, 0]),
            Err(StridedError::BadPlaceholder(_))
        ));
    }

    #[test]
    fn test_overflowing_shapes_are_errors() {
        assert_eq!(
            solve_placeholder(4, &[-1, isize::MAX, 4]),
            Err(StridedError::OffsetOverflow)
        );
        let data = [0u8; 4];
        let v: ViewD<'_, u8> = View::from_shape(&data, &[4]).unwrap();
        assert_eq!(
            v.reshape(&[isize::MAX, 4]).unwrap_err(),
            StridedError::OffsetOverflow
        );
        // The count fits, but it exceeds what the source holds.
        assert_eq!(
            v.reshape(&[isize::MAX, 2]).unwrap_err(),
            StridedError::UnsupportedReshape {
                from: vec![4],
                to: vec![isize::MAX as usize, 2]
            }
        );
        assert_eq!(
            v.stencil_axes(&[usize::MAX], &[1]).unwrap_err(),
            StridedError::OffsetOverflow
        );
    }

    #[test]
    fn test_transpose_destination_overflow() {
        let t = transpose_axes(&axes(&[(3, 1)]), &[usize::MAX]);
        assert_eq!(
            t,
            Err(StridedError::InvalidAxis {
                axis: usize::MAX,
                rank: 1
            })
        );
    }

    #[test]
    fn test_reshape_keeps_matching_trailing_axes() {
        // Padded rows: not ravel-free, but the trailing axis matches and the
        // new leading axis only tiles.
        let a = axes(&[(3, 5), (4, 1)]);
        let r = reshape_axes(&a, &[2, 3, 4]).unwrap();
        assert_eq!(r, axes(&[(2, 0), (3, 5), (4, 1)]));
    }

    #[test]
    fn test_reshape_strided_run() {
        // Every other element of a buffer, reshaped.
        let a = axes(&[(6, 2)]);
        let r = reshape_axes(&a, &[2, 3]).unwrap();
        assert_eq!(r, axes(&[(2, 6), (3, 2)]));
    }

    #[test]
    fn test_reshape_needs_copy() {
        let a = axes(&[(4, 1), (3, 4)]);
        let err = reshape_axes(&a, &[12]).unwrap_err();
        assert_eq!(
            err,
            StridedError::UnsupportedReshape {
                from: vec![4, 3],
                to: vec![12]
            }
        );
    }

    #[test]
    fn test_reshape_more_elements_than_source() {
        let a = axes(&[(6, 1)]);
        assert!(matches!(
            reshape_axes(&a, &[4, 4]),
            Err(StridedError::UnsupportedReshape { .. })
        ));
    }

    #[test]
    fn test_reshape_prefix() {
        let data: Vec<i32> = (0..12).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[12]).unwrap();
        let r = v.reshape(&[2, 5]).unwrap();
        assert_eq!(r.to_vec(), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_reshape_reversed_source() {
        let data: Vec<i32> = (0..4).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[4]).unwrap();
        let r = v.reverse(0).unwrap().reshape(&[2, 2]).unwrap();
        assert_eq!(r.to_vec(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_stencil() {
        let data: Vec<i32> = (0..5).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[5]).unwrap();
        let s = v.stencil(1, 1).unwrap();
        assert_eq!(s.shape(), vec![3, 3]);
        for i in 0..3 {
            for j in 0..3 {
                assert!(std::ptr::eq(s.at(&[i, j]), v.at(&[i + j])));
            }
        }
    }

    #[test]
    fn test_stencil_too_large() {
        let data = [0; 3];
        let v: ViewD<'_, i32> = View::from_shape(&data, &[3]).unwrap();
        assert_eq!(
            v.stencil(2, 2).unwrap_err(),
            StridedError::OutOfBounds {
                axis: 0,
                index: 4,
                size: 3
            }
        );
        // Exactly as long as the padding: no windows.
        assert_eq!(v.stencil(1, 2).unwrap().shape(), vec![0, 4]);
    }

    #[test]
    fn test_stencil_axes_2d() {
        let data: Vec<i32> = (0..20).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[4, 5]).unwrap();
        let s = v.stencil_axes(&[0, 1], &[1, 1]).unwrap();
        assert_eq!(s.shape(), vec![3, 3, 2, 3]);
        assert_eq!(*s.at(&[2, 1, 1, 2]), *v.at(&[3, 3]));
        assert_eq!(
            v.stencil_axes(&[0], &[1, 1]).unwrap_err(),
            StridedError::RankMismatch(1, 2)
        );
    }

    #[test]
    fn test_view_mut_shape_ops() {
        let mut data: Vec<i32> = (0..6).collect();
        let m: ViewMutD<'_, i32> = ViewMut::from_shape(&mut data, &[2, 3]).unwrap();
        let mut t = m.transpose(&[1, 0]).unwrap().reverse(0).unwrap();
        *t.at_mut(&[0, 1]) = 100;
        let mut r = t.reshape(&[3, 2]).unwrap();
        // Transposed source is not ravel-free, but the shape matches exactly.
        *r.at_mut(&[2, 0]) = -1;
        assert_eq!(data, vec![-1, 1, 2, 3, 4, 100]);
    }
}
