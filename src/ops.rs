//! High-level operations built on [`combine`] and [`ply`].

use num_traits::Zero;

use crate::axis::Dims;
use crate::expr::{combine, Apply, Operand, OperandList};
use crate::kernel::{ply, ply_fold};
use crate::view::{Slot, ViewMut};
use crate::{Result, StridedError};

/// Check that a frame matched against a write target is exactly the target's shape.
fn check_target(frame: &[Option<usize>], target: &[usize]) -> Result<()> {
    if frame.len() != target.len() {
        return Err(StridedError::RankMismatch(frame.len(), target.len()));
    }
    for (k, (&n, &size)) in frame.iter().zip(target).enumerate() {
        if n != Some(size) {
            return Err(StridedError::ShapeMismatch {
                axis: k,
                expected: size,
                found: n.unwrap_or(size),
            });
        }
    }
    Ok(())
}

/// Apply `op` at every index of the frame of `operands`, for its side effects.
///
/// # Example
/// ```rust
/// use strided_frame::{for_each, Slot, View, ViewD, ViewMut, ViewMutD};
///
/// // Column sums: the [3] target broadcasts along the rows of `a`.
/// let a_data = [1, 2, 3, 4, 5, 6];
/// let mut sums = [0; 3];
/// let a: ViewD<'_, i32> = View::from_shape(&a_data, &[2, 3]).unwrap();
/// let s: ViewMutD<'_, i32> = ViewMut::from_shape(&mut sums, &[3]).unwrap();
/// for_each(|acc: Slot<'_, i32>, x: i32| acc.update(|v| v + x), (s, a)).unwrap();
/// assert_eq!(sums, [5, 7, 9]);
/// ```
pub fn for_each<F, L>(op: F, operands: L) -> Result<()>
where
    L: OperandList,
    F: Apply<L::Items>,
{
    ply(combine(op, operands)?)
}

/// `dest[i] = src[i]`, with `src` broadcast to the shape of `dest`.
///
/// # Errors
/// [`StridedError::ShapeMismatch`] or [`StridedError::RankMismatch`] if `src`
/// does not broadcast to exactly the shape of `dest`.
pub fn assign<T, D, S>(dest: ViewMut<'_, T, D>, src: S) -> Result<()>
where
    D: Dims,
    S: Operand<Item = T>,
{
    map1(dest, src, |x| x)
}

/// `dest[i] = f(a[i])`.
pub fn map1<T, D, A, F>(dest: ViewMut<'_, T, D>, a: A, f: F) -> Result<()>
where
    D: Dims,
    A: Operand,
    F: Fn(A::Item) -> T,
{
    let target = dest.shape();
    let e = combine(move |o: Slot<'_, T>, x: A::Item| o.set(f(x)), (dest, a))?;
    check_target(e.frame_shape(), &target)?;
    ply(e)
}

/// `dest[i] = f(a[i], b[i])`.
///
/// # Example
/// ```rust
/// use strided_frame::{map2, View, ViewD, ViewMut, ViewMutD};
///
/// let a_data = [1.0, 2.0, 3.0, 4.0];
/// let b_data = [0.5, 0.25];
/// let mut out_data = [0.0; 4];
/// let a: ViewD<'_, f64> = View::from_shape(&a_data, &[2, 2]).unwrap();
/// let b: ViewD<'_, f64> = View::from_shape(&b_data, &[2]).unwrap();
/// let out: ViewMutD<'_, f64> = ViewMut::from_shape(&mut out_data, &[2, 2]).unwrap();
/// map2(out, a, b, |x, y| x * y).unwrap();
/// assert_eq!(out_data, [0.5, 0.5, 1.5, 1.0]);
/// ```
pub fn map2<T, D, A, B, F>(dest: ViewMut<'_, T, D>, a: A, b: B, f: F) -> Result<()>
where
    D: Dims,
    A: Operand,
    B: Operand,
    F: Fn(A::Item, B::Item) -> T,
{
    let target = dest.shape();
    let e = combine(
        move |o: Slot<'_, T>, x: A::Item, y: B::Item| o.set(f(x, y)),
        (dest, a, b),
    )?;
    check_target(e.frame_shape(), &target)?;
    ply(e)
}

/// `dest[i] = f(a[i], b[i], c[i])`.
pub fn map3<T, D, A, B, C, F>(dest: ViewMut<'_, T, D>, a: A, b: B, c: C, f: F) -> Result<()>
where
    D: Dims,
    A: Operand,
    B: Operand,
    C: Operand,
    F: Fn(A::Item, B::Item, C::Item) -> T,
{
    let target = dest.shape();
    let e = combine(
        move |o: Slot<'_, T>, x: A::Item, y: B::Item, z: C::Item| o.set(f(x, y, z)),
        (dest, a, b, c),
    )?;
    check_target(e.frame_shape(), &target)?;
    ply(e)
}

/// `dest[i] = f(a[i], b[i], c[i], d[i])`.
///
/// Four operands plus the destination exceed the arity of [`Apply`], so the
/// fourth source is paired with the third in a nested expression.
pub fn map4<T, D, A, B, C, E, F>(
    dest: ViewMut<'_, T, D>,
    a: A,
    b: B,
    c: C,
    d: E,
    f: F,
) -> Result<()>
where
    D: Dims,
    A: Operand,
    B: Operand,
    C: Operand,
    E: Operand,
    F: Fn(A::Item, B::Item, C::Item, E::Item) -> T,
{
    let target = dest.shape();
    let cd = combine(|z: C::Item, w: E::Item| (z, w), (c, d))?;
    let e = combine(
        move |o: Slot<'_, T>, x: A::Item, y: B::Item, (z, w): (C::Item, E::Item)| o.set(f(x, y, z, w)),
        (dest, a, b, cd),
    )?;
    check_target(e.frame_shape(), &target)?;
    ply(e)
}

/// Full reduction: `reduce_fn` over `map_fn` of every item, in frame order.
///
/// # Example
/// ```rust
/// use strided_frame::{reduce, View, ViewD};
///
/// let data = [3.0, -4.0];
/// let v: ViewD<'_, f64> = View::from_shape(&data, &[2]).unwrap();
/// let norm2 = reduce(v, |x| x * x, |a, b| a + b, 0.0).unwrap();
/// assert_eq!(norm2, 25.0);
/// ```
pub fn reduce<O, M, R, U>(src: O, map_fn: M, reduce_fn: R, init: U) -> Result<U>
where
    O: Operand,
    M: Fn(O::Item) -> U,
    R: Fn(U, U) -> U,
{
    ply_fold(src, init, |acc, x| reduce_fn(acc, map_fn(x)))
}

/// Sum of every item.
pub fn sum<O>(src: O) -> Result<O::Item>
where
    O: Operand,
    O::Item: Zero,
{
    ply_fold(src, <O::Item as Zero>::zero(), |acc, x| acc + x)
}
