//! Parallel evaluation over the outer frame.
//!
//! The frame is split recursively in halves along one axis and the halves run
//! under [`rayon::join`]. Splitting stops once a piece holds at most
//! [`MIN_THREAD_LENGTH`] positions. An axis along which some write cursor
//! stays on one element (stride 0, i.e. a reduction into that element) is
//! never split. Every other axis of a safely built [`ViewMut`](crate::ViewMut)
//! moves to a new element, so no two tasks write the same element.

use crate::auxiliary::checked_len;
use crate::expr::{Cursor, Operand};
use crate::kernel::{prepare, run};
use crate::{Result, MIN_THREAD_LENGTH};

/// Like [`ply`](crate::ply), but runs independent parts of the frame on the
/// rayon thread pool.
///
/// The visit order between parts is unspecified. Operators must not rely on
/// side effects other than writes through their own [`Slot`](crate::Slot).
///
/// # Example
/// ```rust
/// use strided_frame::{combine, ply_par, Slot, View, ViewD, ViewMut, ViewMutD};
///
/// let a_data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
/// let mut out_data = vec![0.0; 1000];
/// let a: ViewD<'_, f64> = View::from_shape(&a_data, &[10, 100]).unwrap();
/// let out: ViewMutD<'_, f64> = ViewMut::from_shape(&mut out_data, &[10, 100]).unwrap();
/// let e = combine(|o: Slot<'_, f64>, x: f64| o.set(2.0 * x), (out, a)).unwrap();
/// ply_par(e).unwrap();
/// assert_eq!(out_data[999], 1998.0);
/// ```
pub fn ply_par<O>(operand: O) -> Result<()>
where
    O: Operand,
    O::Cursor: Clone + Send,
{
    let (cursor, dims) = prepare(operand)?;
    if dims.contains(&0) {
        return Ok(());
    }
    par_walk(cursor, dims, rayon::current_num_threads());
    Ok(())
}

/// Outermost axis with more than one position along which no cursor aliases.
fn find_split_axis<C: Cursor>(cursor: &C, dims: &[usize]) -> Option<usize> {
    (0..dims.len()).find(|&k| dims[k] > 1 && !cursor.aliases_along(k))
}

fn par_walk<C>(mut cursor: C, dims: Vec<usize>, nthreads: usize)
where
    C: Cursor + Clone + Send,
{
    // A frame too large to count is certainly large enough to split.
    let total = checked_len(dims.iter().copied()).unwrap_or(usize::MAX);
    let split = if nthreads <= 1 || total <= MIN_THREAD_LENGTH {
        None
    } else {
        find_split_axis(&cursor, &dims)
    };
    let Some(k) = split else {
        run(&mut cursor, &dims, (), &mut |(), _| ());
        return;
    };

    let n = dims[k];
    let half = n >> 1;
    tracing::debug!(axis = k, size = n, total, nthreads, "splitting frame");

    let mut left_dims = dims;
    let mut right_dims = left_dims.clone();
    left_dims[k] = half;
    right_dims[k] = n - half;

    let mut right = cursor.clone();
    right.step(k, half as isize);

    let left_threads = nthreads >> 1;
    let right_threads = nthreads - left_threads;
    rayon::join(
        || par_walk(cursor, left_dims, left_threads),
        || par_walk(right, right_dims, right_threads),
    );
}
