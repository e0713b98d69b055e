//! Lazy expressions over strided operands.
//!
//! An [`Expr`] pairs an operator with a tuple of operands. Frame matching runs
//! when the expression is built ([`combine`]); nothing is evaluated until the
//! expression is handed to [`ply`](crate::ply) or one of the helpers built on it.
//!
//! Every operand kind implements [`Operand`]: shape queries for the frame
//! matcher plus [`into_cursor`](Operand::into_cursor), which turns the operand
//! into a [`Cursor`] positioned at frame index zero. An `Expr` is itself an
//! operand, so trees nest without temporaries.
//!
//! | operand            | item per frame index            |
//! |--------------------|---------------------------------|
//! | [`View`]           | the element (`T: Copy`)         |
//! | [`ViewMut`]        | a [`Slot`] write handle         |
//! | [`Cells`]          | a `ViewN<C>` sub-view           |
//! | [`Scalar`]         | a clone of the value            |
//! | [`Iota`]           | the frame index along one axis  |
//! | [`Reframe`]        | whatever the wrapped operand yields |
//! | [`Expr`]           | the operator's output           |

use std::marker::PhantomData;

use smallvec::{smallvec, SmallVec};

use crate::axis::{Axis, Dims};
use crate::broadcast::{match_frames, FrameMatch, OperandFrame};
use crate::view::{Slot, View, ViewMut, ViewN};
use crate::{Result, StridedError, MAX_INLINE_RANK};

type Strides = SmallVec<[isize; MAX_INLINE_RANK]>;

/// Something that can take part in an expression.
pub trait Operand {
    /// Value produced at each frame index.
    type Item;
    type Cursor: Cursor<Item = Self::Item>;

    /// Number of frame axes this operand contributes.
    fn rank(&self) -> usize;

    /// Rank as fixed by the operand's type, if it is.
    fn rank_if_known(&self) -> Option<usize> {
        None
    }

    /// Size of frame axis `k`, or `None` if the operand adapts to any size.
    fn size_if_known(&self, k: usize) -> Option<usize>;

    /// Explicit frame axis per operand axis; `None` right-aligns.
    fn frame_map(&self) -> Option<&[usize]> {
        None
    }

    /// Shape summary handed to [`match_frames`].
    fn operand_frame(&self) -> OperandFrame {
        OperandFrame::new(
            (0..self.rank()).map(|k| self.size_if_known(k)).collect(),
            self.frame_map().map(<[usize]>::to_vec),
        )
    }

    /// Build a cursor over a frame of rank `frame_rank`, with operand axis `j`
    /// moving along frame axis `placement[j]`.
    fn into_cursor(self, placement: &[usize], frame_rank: usize) -> Self::Cursor;
}

/// Position handle of one operand inside a frame.
///
/// A cursor starts at frame index zero and is moved with
/// [`step`](Cursor::step). Moving it never touches memory; only
/// [`get`](Cursor::get) does.
pub trait Cursor {
    type Item;

    /// Move `n` positions along frame axis `k`.
    fn step(&mut self, k: usize, n: isize);

    /// Whether stepping `inner` times along frame axis `k + 1` lands on the
    /// position one step along axis `k`, so the two axes can run as one loop.
    fn fusable(&self, k: usize, inner: usize) -> bool;

    /// Whether this cursor writes to the same element at every position along
    /// frame axis `k`.
    fn aliases_along(&self, _k: usize) -> bool {
        false
    }

    /// Produce the item at the current position.
    ///
    /// # Safety
    /// The cursor must sit on a position inside the frame it was built for.
    unsafe fn get(&mut self) -> Self::Item;
}

/// An operator applicable to a tuple of operand items.
///
/// Implemented for closures of arity 1 through 4.
pub trait Apply<Args> {
    type Output;

    fn apply(&self, args: Args) -> Self::Output;
}

impl<F, A, R> Apply<(A,)> for F
where
    F: Fn(A) -> R,
{
    type Output = R;

    #[inline(always)]
    fn apply(&self, (a,): (A,)) -> R {
        self(a)
    }
}

impl<F, A, B, R> Apply<(A, B)> for F
where
    F: Fn(A, B) -> R,
{
    type Output = R;

    #[inline(always)]
    fn apply(&self, (a, b): (A, B)) -> R {
        self(a, b)
    }
}

impl<F, A, B, C, R> Apply<(A, B, C)> for F
where
    F: Fn(A, B, C) -> R,
{
    type Output = R;

    #[inline(always)]
    fn apply(&self, (a, b, c): (A, B, C)) -> R {
        self(a, b, c)
    }
}

impl<F, A, B, C, D, R> Apply<(A, B, C, D)> for F
where
    F: Fn(A, B, C, D) -> R,
{
    type Output = R;

    #[inline(always)]
    fn apply(&self, (a, b, c, d): (A, B, C, D)) -> R {
        self(a, b, c, d)
    }
}

/// A tuple of operands.
pub trait OperandList {
    type Items;
    type Cursors: CursorList<Items = Self::Items>;

    fn frames(&self) -> Vec<OperandFrame>;

    fn into_cursors(self, placements: &[Vec<usize>], frame_rank: usize) -> Self::Cursors;
}

/// A tuple of cursors moved in lockstep.
pub trait CursorList {
    type Items;

    fn step(&mut self, k: usize, n: isize);

    fn fusable(&self, k: usize, inner: usize) -> bool;

    fn aliases_along(&self, k: usize) -> bool;

    /// # Safety
    /// See [`Cursor::get`].
    unsafe fn get_all(&mut self) -> Self::Items;
}

macro_rules! impl_operand_list {
    ($(($O:ident, $C:ident, $idx:tt)),+) => {
        impl<$($O: Operand),+> OperandList for ($($O,)+) {
            type Items = ($($O::Item,)+);
            type Cursors = ($($O::Cursor,)+);

            fn frames(&self) -> Vec<OperandFrame> {
                vec![$(self.$idx.operand_frame()),+]
            }

            fn into_cursors(self, placements: &[Vec<usize>], frame_rank: usize) -> Self::Cursors {
                ($(self.$idx.into_cursor(&placements[$idx], frame_rank),)+)
            }
        }

        impl<$($C: Cursor),+> CursorList for ($($C,)+) {
            type Items = ($($C::Item,)+);

            #[inline(always)]
            fn step(&mut self, k: usize, n: isize) {
                $(self.$idx.step(k, n);)+
            }

            fn fusable(&self, k: usize, inner: usize) -> bool {
                true $(&& self.$idx.fusable(k, inner))+
            }

            fn aliases_along(&self, k: usize) -> bool {
                false $(|| self.$idx.aliases_along(k))+
            }

            #[inline(always)]
            unsafe fn get_all(&mut self) -> Self::Items {
                ($(self.$idx.get(),)+)
            }
        }
    };
}

impl_operand_list!((A, CA, 0));
impl_operand_list!((A, CA, 0), (B, CB, 1));
impl_operand_list!((A, CA, 0), (B, CB, 1), (C, CC, 2));
impl_operand_list!((A, CA, 0), (B, CB, 1), (C, CC, 2), (D, CD, 3));

/// An operator applied to a tuple of operands over their matched frame.
pub struct Expr<F, L> {
    op: F,
    operands: L,
    frame: FrameMatch,
}

impl<F, L> std::fmt::Debug for Expr<F, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expr").field("frame", &self.frame).finish()
    }
}

/// Build an expression applying `op` to `operands`.
///
/// Frame matching happens here, so shape errors surface before any evaluation.
///
/// # Errors
/// [`StridedError::ShapeMismatch`] or [`StridedError::RankMismatch`] from
/// [`match_frames`].
///
/// # Example
/// ```rust
/// use strided_frame::{combine, ply_fold, View, ViewD};
///
/// let a_data = [1, 2, 3, 4, 5, 6];
/// let b_data = [10, 20, 30];
/// let a: ViewD<'_, i32> = View::from_shape(&a_data, &[2, 3]).unwrap();
/// let b: ViewD<'_, i32> = View::from_shape(&b_data, &[3]).unwrap();
///
/// let e = combine(|x: i32, y: i32| x * y, (a, b)).unwrap();
/// assert_eq!(e.frame_shape(), &[Some(2), Some(3)]);
/// let total = ply_fold(e, 0, |acc, v| acc + v).unwrap();
/// assert_eq!(total, 10 + 40 + 90 + 40 + 100 + 180);
/// ```
pub fn combine<F, L>(op: F, operands: L) -> Result<Expr<F, L>>
where
    L: OperandList,
    F: Apply<L::Items>,
{
    let frame = match_frames(&operands.frames())?;
    Ok(Expr {
        op,
        operands,
        frame,
    })
}

impl<F, L> Expr<F, L> {
    /// Frame size per axis; `None` where no operand determines it.
    pub fn frame_shape(&self) -> &[Option<usize>] {
        &self.frame.shape
    }

    /// Frame axis of every operand axis, per operand.
    pub fn placements(&self) -> &[Vec<usize>] {
        &self.frame.placements
    }
}

impl<F, L> Operand for Expr<F, L>
where
    L: OperandList,
    F: Apply<L::Items>,
{
    type Item = F::Output;
    type Cursor = ExprCursor<F, L::Cursors>;

    fn rank(&self) -> usize {
        self.frame.rank()
    }

    fn size_if_known(&self, k: usize) -> Option<usize> {
        self.frame.shape[k]
    }

    fn into_cursor(self, placement: &[usize], frame_rank: usize) -> Self::Cursor {
        let composed: Vec<Vec<usize>> = self
            .frame
            .placements
            .iter()
            .map(|p| p.iter().map(|&a| placement[a]).collect())
            .collect();
        ExprCursor {
            op: self.op,
            cursors: self.operands.into_cursors(&composed, frame_rank),
        }
    }
}

#[derive(Clone)]
pub struct ExprCursor<F, C> {
    op: F,
    cursors: C,
}

impl<F, C> Cursor for ExprCursor<F, C>
where
    C: CursorList,
    F: Apply<C::Items>,
{
    type Item = F::Output;

    #[inline(always)]
    fn step(&mut self, k: usize, n: isize) {
        self.cursors.step(k, n);
    }

    fn fusable(&self, k: usize, inner: usize) -> bool {
        self.cursors.fusable(k, inner)
    }

    fn aliases_along(&self, k: usize) -> bool {
        self.cursors.aliases_along(k)
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> F::Output {
        self.op.apply(self.cursors.get_all())
    }
}

/// Per-frame-axis strides of a leaf whose axis `j` moves along `placement[j]`.
///
/// Size-1 axes contribute nothing so they broadcast against any frame size;
/// axes sharing a frame axis add up (diagonal access).
fn frame_strides(axes: &[Axis], placement: &[usize], frame_rank: usize) -> Strides {
    let mut strides: Strides = smallvec![0; frame_rank];
    for (axis, &k) in axes.iter().zip(placement) {
        if axis.size != 1 {
            strides[k] += axis.stride;
        }
    }
    strides
}

#[inline]
fn strides_fusable(strides: &[isize], k: usize, inner: usize) -> bool {
    strides[k] == inner as isize * strides[k + 1]
}

impl<'a, T: Copy, D: Dims> Operand for View<'a, T, D> {
    type Item = T;
    type Cursor = ViewCursor<'a, T>;

    fn rank(&self) -> usize {
        View::rank(self)
    }

    fn rank_if_known(&self) -> Option<usize> {
        D::RANK
    }

    fn size_if_known(&self, k: usize) -> Option<usize> {
        Some(self.size(k))
    }

    fn into_cursor(self, placement: &[usize], frame_rank: usize) -> ViewCursor<'a, T> {
        ViewCursor {
            ptr: self.as_ptr(),
            strides: frame_strides(self.axes(), placement, frame_rank),
            _marker: PhantomData,
        }
    }
}

/// Cursor over a shared view.
pub struct ViewCursor<'a, T> {
    ptr: *const T,
    strides: Strides,
    _marker: PhantomData<&'a [T]>,
}

impl<T> Clone for ViewCursor<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

// Only reads through `ptr`, which borrows `&'a [T]`.
unsafe impl<T: Sync> Send for ViewCursor<'_, T> {}

impl<T: Copy> Cursor for ViewCursor<'_, T> {
    type Item = T;

    #[inline(always)]
    fn step(&mut self, k: usize, n: isize) {
        self.ptr = self.ptr.wrapping_offset(n * self.strides[k]);
    }

    fn fusable(&self, k: usize, inner: usize) -> bool {
        strides_fusable(&self.strides, k, inner)
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> T {
        *self.ptr
    }
}

impl<'a, T, D: Dims> Operand for ViewMut<'a, T, D> {
    type Item = Slot<'a, T>;
    type Cursor = ViewMutCursor<'a, T>;

    fn rank(&self) -> usize {
        ViewMut::rank(self)
    }

    fn rank_if_known(&self) -> Option<usize> {
        D::RANK
    }

    fn size_if_known(&self, k: usize) -> Option<usize> {
        Some(self.size(k))
    }

    fn into_cursor(mut self, placement: &[usize], frame_rank: usize) -> ViewMutCursor<'a, T> {
        ViewMutCursor {
            ptr: self.as_mut_ptr(),
            strides: frame_strides(self.axes(), placement, frame_rank),
            _marker: PhantomData,
        }
    }
}

/// Cursor over an exclusive view; yields [`Slot`]s.
pub struct ViewMutCursor<'a, T> {
    ptr: *mut T,
    strides: Strides,
    _marker: PhantomData<&'a mut [T]>,
}

impl<T> Clone for ViewMutCursor<'_, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            strides: self.strides.clone(),
            _marker: PhantomData,
        }
    }
}

// Clones only move to other threads through `ply_par`, which never splits an
// axis along which the cursor aliases.
unsafe impl<T: Send> Send for ViewMutCursor<'_, T> {}

impl<'a, T> Cursor for ViewMutCursor<'a, T> {
    type Item = Slot<'a, T>;

    #[inline(always)]
    fn step(&mut self, k: usize, n: isize) {
        self.ptr = self.ptr.wrapping_offset(n * self.strides[k]);
    }

    fn fusable(&self, k: usize, inner: usize) -> bool {
        strides_fusable(&self.strides, k, inner)
    }

    fn aliases_along(&self, k: usize) -> bool {
        self.strides[k] == 0
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> Slot<'a, T> {
        Slot::new(self.ptr)
    }
}

/// A value broadcast to every frame index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar<T>(pub T);

impl<T: Clone> Operand for Scalar<T> {
    type Item = T;
    type Cursor = Scalar<T>;

    fn rank(&self) -> usize {
        0
    }

    fn rank_if_known(&self) -> Option<usize> {
        Some(0)
    }

    fn size_if_known(&self, _k: usize) -> Option<usize> {
        None
    }

    fn into_cursor(self, _placement: &[usize], _frame_rank: usize) -> Self {
        self
    }
}

impl<T: Clone> Cursor for Scalar<T> {
    type Item = T;

    #[inline(always)]
    fn step(&mut self, _k: usize, _n: isize) {}

    fn fusable(&self, _k: usize, _inner: usize) -> bool {
        true
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> T {
        self.0.clone()
    }
}

/// Frame index along one axis.
///
/// `Iota` never determines a frame size; it takes whatever size the other
/// operands give its axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iota {
    axis: usize,
    map: Vec<usize>,
}

/// Operand yielding the frame index along `axis`.
///
/// # Example
/// ```rust
/// use strided_frame::{assign, combine, iota, ViewMut, ViewMutD};
///
/// let mut data = [0usize; 6];
/// let out: ViewMutD<'_, usize> = ViewMut::from_shape(&mut data, &[2, 3]).unwrap();
/// let e = combine(|i: usize, j: usize| 10 * i + j, (iota(0), iota(1))).unwrap();
/// assign(out, e).unwrap();
/// assert_eq!(data, [0, 1, 2, 10, 11, 12]);
/// ```
pub fn iota(axis: usize) -> Iota {
    Iota {
        axis,
        map: (0..=axis).collect(),
    }
}

impl Operand for Iota {
    type Item = usize;
    type Cursor = IotaCursor;

    fn rank(&self) -> usize {
        self.axis + 1
    }

    fn size_if_known(&self, _k: usize) -> Option<usize> {
        None
    }

    fn frame_map(&self) -> Option<&[usize]> {
        Some(&self.map)
    }

    fn into_cursor(self, placement: &[usize], _frame_rank: usize) -> IotaCursor {
        IotaCursor {
            axis: placement[self.axis],
            index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IotaCursor {
    axis: usize,
    index: isize,
}

impl Cursor for IotaCursor {
    type Item = usize;

    #[inline(always)]
    fn step(&mut self, k: usize, n: isize) {
        if k == self.axis {
            self.index += n;
        }
    }

    fn fusable(&self, k: usize, _inner: usize) -> bool {
        k != self.axis && k + 1 != self.axis
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> usize {
        self.index as usize
    }
}

/// A view split into frame axes and `C` trailing cell axes.
///
/// Each frame index yields the rank-`C` sub-view at that position, so an
/// operator can consume whole rows, matrices and so on.
pub struct Cells<'a, T, const C: usize> {
    data: &'a [T],
    frame: Vec<Axis>,
    cell: [Axis; C],
    offset: isize,
}

impl<T, const C: usize> std::fmt::Debug for Cells<'_, T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cells")
            .field("frame", &self.frame)
            .field("cell", &self.cell)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T, D: Dims> View<'a, T, D> {
    /// Treat the last `C` axes as cells of an operand whose frame is the
    /// remaining leading axes.
    ///
    /// # Errors
    /// [`StridedError::RankMismatch`] if the view has fewer than `C` axes.
    ///
    /// # Example
    /// ```rust
    /// use strided_frame::{combine, ply_fold, View, ViewD, ViewN};
    ///
    /// let data = [1, 2, 3, 4, 5, 6];
    /// let m: ViewD<'_, i32> = View::from_shape(&data, &[2, 3]).unwrap();
    /// let rows = m.cells::<1>().unwrap();
    /// let e = combine(|row: ViewN<'_, i32, 1>| row.to_vec().iter().sum::<i32>(), (rows,)).unwrap();
    /// let sums = ply_fold(e, Vec::new(), |mut acc, s| { acc.push(s); acc }).unwrap();
    /// assert_eq!(sums, vec![6, 15]);
    /// ```
    pub fn cells<const C: usize>(self) -> Result<Cells<'a, T, C>> {
        let rank = self.rank();
        if rank < C {
            return Err(StridedError::RankMismatch(rank, C));
        }
        let axes = self.axes.into_vec();
        let cell = <[Axis; C]>::try_from_axes(axes[rank - C..].to_vec())?;
        Ok(Cells {
            data: self.data,
            frame: axes[..rank - C].to_vec(),
            cell,
            offset: self.offset,
        })
    }
}

impl<'a, T, const C: usize> Operand for Cells<'a, T, C> {
    type Item = ViewN<'a, T, C>;
    type Cursor = CellsCursor<'a, T, C>;

    fn rank(&self) -> usize {
        self.frame.len()
    }

    fn size_if_known(&self, k: usize) -> Option<usize> {
        Some(self.frame[k].size)
    }

    fn into_cursor(self, placement: &[usize], frame_rank: usize) -> CellsCursor<'a, T, C> {
        CellsCursor {
            data: self.data,
            cell: self.cell,
            offset: self.offset,
            strides: frame_strides(&self.frame, placement, frame_rank),
        }
    }
}

pub struct CellsCursor<'a, T, const C: usize> {
    data: &'a [T],
    cell: [Axis; C],
    offset: isize,
    strides: Strides,
}

impl<T, const C: usize> Clone for CellsCursor<'_, T, C> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            cell: self.cell,
            offset: self.offset,
            strides: self.strides.clone(),
        }
    }
}

impl<'a, T, const C: usize> Cursor for CellsCursor<'a, T, C> {
    type Item = ViewN<'a, T, C>;

    #[inline(always)]
    fn step(&mut self, k: usize, n: isize) {
        self.offset += n * self.strides[k];
    }

    fn fusable(&self, k: usize, inner: usize) -> bool {
        strides_fusable(&self.strides, k, inner)
    }

    #[inline(always)]
    unsafe fn get(&mut self) -> ViewN<'a, T, C> {
        View::new_unchecked(self.data, self.cell, self.offset)
    }
}

/// An operand whose axes are placed on explicit frame axes.
#[derive(Debug, Clone)]
pub struct Reframe<O> {
    inner: O,
    map: Vec<usize>,
}

/// Place axis `j` of `operand` on frame axis `map[j]` instead of right-aligning it.
///
/// Several operand axes may share a frame axis; the operand is then read along
/// their diagonal.
///
/// # Errors
/// [`StridedError::RankMismatch`] if `map.len()` differs from the operand's rank.
///
/// # Example
/// ```rust
/// use strided_frame::{assign, combine, reframe, View, ViewD, ViewMut, ViewMutD};
///
/// // Outer product: a on frame axis 0, b on frame axis 1.
/// let a_data = [1, 2];
/// let b_data = [10, 20, 30];
/// let a: ViewD<'_, i32> = View::from_shape(&a_data, &[2]).unwrap();
/// let b: ViewD<'_, i32> = View::from_shape(&b_data, &[3]).unwrap();
/// let mut out_data = [0; 6];
/// let out: ViewMutD<'_, i32> = ViewMut::from_shape(&mut out_data, &[2, 3]).unwrap();
///
/// let e = combine(|x: i32, y: i32| x * y, (reframe(a, vec![0]).unwrap(), b)).unwrap();
/// assign(out, e).unwrap();
/// assert_eq!(out_data, [10, 20, 30, 20, 40, 60]);
/// ```
pub fn reframe<O: Operand>(operand: O, map: Vec<usize>) -> Result<Reframe<O>> {
    if map.len() != operand.rank() {
        return Err(StridedError::RankMismatch(map.len(), operand.rank()));
    }
    Ok(Reframe {
        inner: operand,
        map,
    })
}

impl<O: Operand> Operand for Reframe<O> {
    type Item = O::Item;
    type Cursor = O::Cursor;

    fn rank(&self) -> usize {
        self.inner.rank()
    }

    fn rank_if_known(&self) -> Option<usize> {
        self.inner.rank_if_known()
    }

    fn size_if_known(&self, k: usize) -> Option<usize> {
        self.inner.size_if_known(k)
    }

    fn frame_map(&self) -> Option<&[usize]> {
        Some(&self.map)
    }

    fn into_cursor(self, placement: &[usize], frame_rank: usize) -> O::Cursor {
        self.inner.into_cursor(placement, frame_rank)
    }
}
