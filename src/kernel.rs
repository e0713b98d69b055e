//! The evaluator: walks a frame and drives an operand's cursor.
//!
//! Axes are visited outermost first, so for a single expression the visit order
//! is C order over the frame. The trailing run of axes that every operand can
//! walk contiguously is collapsed into one inner loop along the last axis.

use crate::broadcast::match_frames;
use crate::expr::{Cursor, Operand};
use crate::fuse::fused_split;
use crate::Result;

/// Cursor at frame index zero plus the frame sizes.
pub(crate) fn prepare<O: Operand>(operand: O) -> Result<(O::Cursor, Vec<usize>)> {
    let frame = match_frames(&[operand.operand_frame()])?;
    let dims = frame.determined_shape()?;
    let cursor = operand.into_cursor(&frame.placements[0], dims.len());
    Ok((cursor, dims))
}

/// Evaluate `operand` at every frame index, discarding the items.
///
/// Operators run for their side effects, typically writes through
/// [`Slot`](crate::Slot)s of a [`ViewMut`](crate::ViewMut) operand.
///
/// # Errors
/// [`StridedError::UndeterminedFrame`](crate::StridedError::UndeterminedFrame)
/// if some frame axis has no determined size. Nothing is evaluated in that case.
pub fn ply<O: Operand>(operand: O) -> Result<()> {
    ply_fold(operand, (), |(), _| ())
}

/// Evaluate `operand` at every frame index in C order, folding the items with `g`.
///
/// # Example
/// ```rust
/// use strided_frame::{ply_fold, View, ViewD};
///
/// let data = [1, 2, 3, 4, 5, 6];
/// let v: ViewD<'_, i32> = View::from_shape(&data, &[2, 3]).unwrap();
/// let t = v.transpose(&[1, 0]).unwrap();
/// let seen = ply_fold(t, Vec::new(), |mut acc, x| { acc.push(x); acc }).unwrap();
/// assert_eq!(seen, vec![1, 4, 2, 5, 3, 6]);
/// ```
pub fn ply_fold<O, A, G>(operand: O, init: A, mut g: G) -> Result<A>
where
    O: Operand,
    G: FnMut(A, O::Item) -> A,
{
    let (mut cursor, dims) = prepare(operand)?;
    Ok(run(&mut cursor, &dims, init, &mut g))
}

/// Walk the whole of `dims` starting from the cursor's current position.
///
/// The cursor ends where it started.
pub(crate) fn run<C, A, G>(cursor: &mut C, dims: &[usize], init: A, g: &mut G) -> A
where
    C: Cursor,
    G: FnMut(A, C::Item) -> A,
{
    if dims.contains(&0) {
        return init;
    }
    if dims.is_empty() {
        // SAFETY: a rank-0 frame has exactly one position, the starting one.
        return g(init, unsafe { cursor.get() });
    }
    let (split, inner_len) = fused_split(cursor, dims);
    tracing::debug!(?dims, split, inner_len, "ply plan");
    walk(cursor, dims, 0, split, inner_len, init, g)
}

fn walk<C, A, G>(
    cursor: &mut C,
    dims: &[usize],
    k: usize,
    split: usize,
    inner_len: usize,
    mut acc: A,
    g: &mut G,
) -> A
where
    C: Cursor,
    G: FnMut(A, C::Item) -> A,
{
    if k == split {
        let last = dims.len() - 1;
        for _ in 0..inner_len {
            // SAFETY: axes `split..` are fused, so `inner_len` steps along the
            // last axis stay inside the frame.
            acc = g(acc, unsafe { cursor.get() });
            cursor.step(last, 1);
        }
        cursor.step(last, -(inner_len as isize));
        return acc;
    }
    let n = dims[k];
    for _ in 0..n {
        acc = walk(cursor, dims, k + 1, split, inner_len, acc, g);
        cursor.step(k, 1);
    }
    cursor.step(k, -(n as isize));
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{View, ViewD, ViewN};
    use crate::{combine, Axis, Scalar, StridedError};

    fn collect<O: Operand>(op: O) -> Vec<O::Item> {
        ply_fold(op, Vec::new(), |mut acc, v| {
            acc.push(v);
            acc
        })
        .unwrap()
    }

    #[test]
    fn test_c_order_visit() {
        let data: Vec<i32> = (0..24).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[2, 3, 4]).unwrap();
        assert_eq!(collect(v), data);
    }

    #[test]
    fn test_strided_visit() {
        // Every other column of a [3, 4] buffer.
        let data: Vec<i32> = (0..12).collect();
        let v: ViewN<'_, i32, 2> =
            View::new(&data, [Axis::new(3, 4), Axis::new(2, 2)], 1).unwrap();
        assert_eq!(collect(v), vec![1, 3, 5, 7, 9, 11]);
    }

    #[test]
    fn test_negative_strides() {
        let data: Vec<i32> = (0..6).collect();
        let v: ViewN<'_, i32, 2> =
            View::new(&data, [Axis::new(2, -3), Axis::new(3, -1)], 5).unwrap();
        assert_eq!(collect(v), vec![5, 4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_rank0_frame() {
        assert_eq!(collect(Scalar(3)), vec![3]);
    }

    #[test]
    fn test_empty_frame_visits_nothing() {
        let data: Vec<i32> = vec![];
        let v: ViewD<'_, i32> = View::from_shape(&data, &[3, 0]).unwrap();
        let calls = std::cell::Cell::new(0);
        let e = combine(
            |x: i32| {
                calls.set(calls.get() + 1);
                x
            },
            (v,),
        )
        .unwrap();
        ply(e).unwrap();
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_cursor_returns_to_start() {
        let data: Vec<i32> = (0..12).collect();
        let v: ViewD<'_, i32> = View::from_shape(&data, &[3, 4]).unwrap();
        let (mut c, dims) = prepare(v).unwrap();
        let first = run(&mut c, &dims, 0, &mut |acc, x| acc + x);
        let second = run(&mut c, &dims, 0, &mut |acc, x| acc + x);
        assert_eq!(first, 66);
        assert_eq!(first, second);
    }

    #[test]
    fn test_undetermined_frame_is_rejected_before_evaluation() {
        let e = combine(|i: usize| i, (crate::iota(1),)).unwrap();
        assert_eq!(
            ply(e).unwrap_err(),
            StridedError::UndeterminedFrame { axis: 0 }
        );
    }
}
