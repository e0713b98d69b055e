//! Borrowed strided views.
//!
//! - [`View`]: shared view over a caller-owned buffer
//! - [`ViewMut`]: exclusive view, usable as the write target of an expression
//! - [`Slot`]: the write handle a [`ViewMut`] operand yields per frame index
//!
//! A view never owns its buffer. Its axes are `(size, stride)` pairs in
//! element units; the container type `D` decides whether the rank is part of
//! the type (`[Axis; N]`) or carried at run time (`Vec<Axis>`).

use std::marker::PhantomData;

use crate::auxiliary::{
    c_order_axes, checked_offset, is_non_overlapping, sizes, total_len, validate_bounds,
};
use crate::axis::{Axis, Dims};
use crate::{Result, StridedError};

/// A shared strided view.
///
/// # Example
/// ```rust
/// use strided_frame::{Axis, View, ViewN};
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
/// let v: ViewN<'_, f64, 2> = View::new(&data, [Axis::new(2, 3), Axis::new(3, 1)], 0).unwrap();
/// assert_eq!(*v.at(&[1, 2]), 6.0);
/// ```
pub struct View<'a, T, D: Dims = Vec<Axis>> {
    pub(crate) data: &'a [T],
    pub(crate) axes: D,
    pub(crate) offset: isize,
}

/// View whose rank is fixed at compile time.
pub type ViewN<'a, T, const N: usize> = View<'a, T, [Axis; N]>;

/// View whose rank is carried at run time.
pub type ViewD<'a, T> = View<'a, T, Vec<Axis>>;

/// An exclusive strided view.
///
/// Same layout rules as [`View`], except that distinct positions may only
/// share an element through stride-0 axes. Writes through such an axis land
/// on the shared element in visit order, and the parallel evaluator never
/// splits work along it.
pub struct ViewMut<'a, T, D: Dims = Vec<Axis>> {
    pub(crate) data: &'a mut [T],
    pub(crate) axes: D,
    pub(crate) offset: isize,
}

pub type ViewMutN<'a, T, const N: usize> = ViewMut<'a, T, [Axis; N]>;

pub type ViewMutD<'a, T> = ViewMut<'a, T, Vec<Axis>>;

impl<T, D: Dims> Clone for View<'_, T, D> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            axes: self.axes.clone(),
            offset: self.offset,
        }
    }
}

impl<T, D: Dims> std::fmt::Debug for View<'_, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("axes", &self.axes.axes())
            .field("offset", &self.offset)
            .finish()
    }
}

impl<T, D: Dims> std::fmt::Debug for ViewMut<'_, T, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewMut")
            .field("axes", &self.axes.axes())
            .field("offset", &self.offset)
            .finish()
    }
}

impl<'a, T, D: Dims> View<'a, T, D> {
    /// Create a view from explicit axes and the offset of its first element.
    ///
    /// # Errors
    /// Returns [`StridedError::OffsetOverflow`] if any reachable position
    /// falls outside `data`.
    pub fn new(data: &'a [T], axes: D, offset: isize) -> Result<Self> {
        validate_bounds(data.len(), axes.axes(), offset)?;
        Ok(Self { data, axes, offset })
    }

    /// Create a view without bounds checking.
    ///
    /// # Safety
    /// Every index combination must stay within `data`.
    pub unsafe fn new_unchecked(data: &'a [T], axes: D, offset: isize) -> Self {
        Self { data, axes, offset }
    }

    /// Compact C-order view over the front of `data`.
    pub fn from_shape(data: &'a [T], shape: &[usize]) -> Result<Self> {
        let axes = D::try_from_axes(c_order_axes(shape, 1)?)?;
        Self::new(data, axes, 0)
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.axes.rank()
    }

    /// Rank as fixed by the type, if it is.
    #[inline]
    pub fn rank_if_known(&self) -> Option<usize> {
        D::RANK
    }

    #[inline]
    pub fn size(&self, k: usize) -> usize {
        self.axes.axis(k).size
    }

    #[inline]
    pub fn stride(&self, k: usize) -> isize {
        self.axes.axis(k).stride
    }

    #[inline]
    pub fn axes(&self) -> &[Axis] {
        self.axes.axes()
    }

    pub fn shape(&self) -> Vec<usize> {
        sizes(self.axes())
    }

    /// Total number of positions.
    #[inline]
    pub fn len(&self) -> usize {
        total_len(self.axes())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole borrowed buffer.
    #[inline]
    pub fn data(&self) -> &'a [T] {
        self.data
    }

    /// Offset of the first element inside [`data`](Self::data).
    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    /// Pointer to the first element.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.data.as_ptr().wrapping_offset(self.offset)
    }

    /// Element at `indices`.
    ///
    /// Axis bounds are only checked in debug builds; use [`get`](Self::get)
    /// for a checked lookup. Indexing outside the buffer still panics.
    #[inline]
    pub fn at(&self, indices: &[usize]) -> &'a T {
        debug_assert_eq!(indices.len(), self.rank(), "wrong number of indices");
        let mut idx = self.offset;
        for (k, (&i, axis)) in indices.iter().zip(self.axes()).enumerate() {
            debug_assert!(i < axis.size, "index {} out of bounds for axis {}", i, k);
            idx += i as isize * axis.stride;
        }
        &self.data[idx as usize]
    }

    /// Element at `indices`, reporting [`StridedError::OutOfBounds`] instead of panicking.
    pub fn get(&self, indices: &[usize]) -> Result<&'a T> {
        let off = checked_offset(self.axes(), indices)?;
        Ok(&self.data[(self.offset + off) as usize])
    }

    /// Forget the static rank.
    pub fn into_dyn(self) -> ViewD<'a, T> {
        View {
            data: self.data,
            axes: self.axes.into_vec(),
            offset: self.offset,
        }
    }

    /// Recover a static rank, failing with [`StridedError::RankMismatch`]
    /// if the view has a different number of axes.
    pub fn into_fixed<const N: usize>(self) -> Result<ViewN<'a, T, N>> {
        let axes = <[Axis; N]>::try_from_axes(self.axes.into_vec())?;
        Ok(View {
            data: self.data,
            axes,
            offset: self.offset,
        })
    }

    pub(crate) fn with_axes<E: Dims>(&self, axes: E, offset: isize) -> View<'a, T, E> {
        View {
            data: self.data,
            axes,
            offset,
        }
    }
}

impl<'a, T: Copy, D: Dims> View<'a, T, D> {
    /// Copy the elements out in C order.
    pub fn to_vec(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        let mut idx = vec![0usize; self.rank()];
        if self.is_empty() {
            return out;
        }
        loop {
            out.push(*self.at(&idx));
            let mut k = idx.len();
            loop {
                if k == 0 {
                    return out;
                }
                k -= 1;
                idx[k] += 1;
                if idx[k] < self.size(k) {
                    break;
                }
                idx[k] = 0;
            }
        }
    }
}

impl<'a, T, D: Dims> ViewMut<'a, T, D> {
    /// Create a mutable view from explicit axes and the offset of its first element.
    ///
    /// # Errors
    /// - [`StridedError::OffsetOverflow`] if any reachable position falls
    ///   outside `data`
    /// - [`StridedError::OverlappingAxes`] if two positions reach the same
    ///   element through nonzero strides
    pub fn new(data: &'a mut [T], axes: D, offset: isize) -> Result<Self> {
        validate_bounds(data.len(), axes.axes(), offset)?;
        if !is_non_overlapping(axes.axes()) {
            return Err(StridedError::OverlappingAxes);
        }
        Ok(Self { data, axes, offset })
    }

    /// # Safety
    /// Every index combination must stay within `data`, and positions that
    /// differ along an axis of nonzero stride must reach distinct elements.
    pub unsafe fn new_unchecked(data: &'a mut [T], axes: D, offset: isize) -> Self {
        Self { data, axes, offset }
    }

    /// Bounds-checked view over axes derived from an existing mutable view.
    ///
    /// Shape operations only select, permute, reverse or regroup the
    /// positions of their source, so they keep it free of overlap.
    pub(crate) fn derived(data: &'a mut [T], axes: D, offset: isize) -> Result<Self> {
        validate_bounds(data.len(), axes.axes(), offset)?;
        Ok(Self { data, axes, offset })
    }

    /// Compact C-order view over the front of `data`.
    pub fn from_shape(data: &'a mut [T], shape: &[usize]) -> Result<Self> {
        let axes = D::try_from_axes(c_order_axes(shape, 1)?)?;
        Self::new(data, axes, 0)
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.axes.rank()
    }

    #[inline]
    pub fn rank_if_known(&self) -> Option<usize> {
        D::RANK
    }

    #[inline]
    pub fn size(&self, k: usize) -> usize {
        self.axes.axis(k).size
    }

    #[inline]
    pub fn stride(&self, k: usize) -> isize {
        self.axes.axis(k).stride
    }

    #[inline]
    pub fn axes(&self) -> &[Axis] {
        self.axes.axes()
    }

    pub fn shape(&self) -> Vec<usize> {
        sizes(self.axes())
    }

    #[inline]
    pub fn len(&self) -> usize {
        total_len(self.axes())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.data.as_mut_ptr().wrapping_offset(self.offset)
    }

    /// Shared view of the same elements.
    pub fn as_view(&self) -> View<'_, T, D> {
        View {
            data: &*self.data,
            axes: self.axes.clone(),
            offset: self.offset,
        }
    }

    /// Shorter-lived mutable view of the same elements.
    pub fn reborrow(&mut self) -> ViewMut<'_, T, D> {
        ViewMut {
            data: &mut *self.data,
            axes: self.axes.clone(),
            offset: self.offset,
        }
    }

    /// Element at `indices`; axis bounds are checked in debug builds only.
    #[inline]
    pub fn at_mut(&mut self, indices: &[usize]) -> &mut T {
        debug_assert_eq!(indices.len(), self.rank(), "wrong number of indices");
        let mut idx = self.offset;
        for (k, (&i, axis)) in indices.iter().zip(self.axes.axes()).enumerate() {
            debug_assert!(i < axis.size, "index {} out of bounds for axis {}", i, k);
            idx += i as isize * axis.stride;
        }
        &mut self.data[idx as usize]
    }

    pub fn get_mut(&mut self, indices: &[usize]) -> Result<&mut T> {
        let off = checked_offset(self.axes.axes(), indices)?;
        Ok(&mut self.data[(self.offset + off) as usize])
    }

    pub fn into_dyn(self) -> ViewMutD<'a, T> {
        ViewMut {
            data: self.data,
            axes: self.axes.into_vec(),
            offset: self.offset,
        }
    }

    pub fn into_fixed<const N: usize>(self) -> Result<ViewMutN<'a, T, N>> {
        let axes = <[Axis; N]>::try_from_axes(self.axes.into_vec())?;
        Ok(ViewMut {
            data: self.data,
            axes,
            offset: self.offset,
        })
    }

    pub(crate) fn with_axes<E: Dims>(self, axes: E, offset: isize) -> ViewMut<'a, T, E> {
        ViewMut {
            data: self.data,
            axes,
            offset,
        }
    }
}

impl<T: Copy, D: Dims> ViewMut<'_, T, D> {
    pub fn set(&mut self, indices: &[usize], value: T) -> Result<()> {
        *self.get_mut(indices)? = value;
        Ok(())
    }

    /// Write `value` at every position.
    pub fn fill(&mut self, value: T) {
        let mut idx = vec![0usize; self.rank()];
        if self.is_empty() {
            return;
        }
        loop {
            *self.at_mut(&idx) = value;
            let mut k = idx.len();
            loop {
                if k == 0 {
                    return;
                }
                k -= 1;
                idx[k] += 1;
                if idx[k] < self.size(k) {
                    break;
                }
                idx[k] = 0;
            }
        }
    }
}

/// Write handle to one element of a [`ViewMut`] operand.
///
/// A slot only reads and writes through its pointer; it never hands out a
/// reference, so two slots on the same element (stride 0, overlapping
/// windows) never alias a `&mut`. Slots are neither `Send` nor `Sync`.
pub struct Slot<'a, T> {
    ptr: *mut T,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Slot<'a, T> {
    /// # Safety
    /// `ptr` must point to a live element of a buffer exclusively borrowed for `'a`.
    #[inline]
    pub(crate) unsafe fn new(ptr: *mut T) -> Self {
        Self {
            ptr,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn set(&self, value: T) {
        unsafe { self.ptr.write(value) }
    }

    #[inline]
    pub fn replace(&self, value: T) -> T {
        unsafe { std::ptr::replace(self.ptr, value) }
    }
}

impl<T: Copy> Slot<'_, T> {
    #[inline]
    pub fn get(&self) -> T {
        unsafe { self.ptr.read() }
    }

    #[inline]
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        self.set(f(self.get()));
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for Slot<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Slot").field(&self.get()).finish()
    }
}
