//! Trailing-axis fusion for the evaluator's inner loop.
//!
//! Frame axes `k` and `k + 1` can run as one loop when, for every cursor,
//! stepping `dims[k + 1]` times along `k + 1` lands where one step along `k`
//! would. For strided leaves that is the C-order contiguity rule
//! `stride[k] == dims[k + 1] * stride[k + 1]`.

use crate::expr::Cursor;

/// Fused trailing run of `dims`: returns `(split, inner_len)` where axes
/// `split..dims.len()` are walked as a single loop of `inner_len` steps along
/// the last axis.
///
/// `dims` must be non-empty.
pub(crate) fn fused_split<C: Cursor>(cursor: &C, dims: &[usize]) -> (usize, usize) {
    let rank = dims.len();
    let mut split = rank - 1;
    let mut inner_len = dims[rank - 1];
    while split > 0 && cursor.fusable(split - 1, dims[split]) {
        split -= 1;
        inner_len *= dims[split];
    }
    (split, inner_len)
}
