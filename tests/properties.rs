use proptest::prelude::*;
use strided_frame::{Axis, View, ViewD};

fn shape_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..5, 1..5)
}

fn shape_and_axis() -> impl Strategy<Value = (Vec<usize>, usize)> {
    shape_strategy().prop_flat_map(|shape| {
        let rank = shape.len();
        (Just(shape), 0..rank)
    })
}

fn shape_and_permutation() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    shape_strategy().prop_flat_map(|shape| {
        let perm: Vec<usize> = (0..shape.len()).collect();
        (Just(shape), Just(perm).prop_shuffle())
    })
}

/// A shape without unit axes and a second shape with the same element count.
///
/// Unit axes are excluded because their strides are arbitrary and a round
/// trip need not reproduce them.
fn shape_and_refactoring() -> impl Strategy<Value = (Vec<usize>, Vec<usize>)> {
    prop::collection::vec(2usize..5, 1..4).prop_flat_map(|shape| {
        let len: usize = shape.iter().product();
        let divisors: Vec<usize> = (1..=len).filter(|d| len % d == 0).collect();
        (Just(shape), prop::sample::select(divisors)).prop_map(move |(shape, d)| {
            let other = if d == len { vec![len] } else { vec![len / d, d] };
            (shape, other)
        })
    })
}

fn invert(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (k, &p) in perm.iter().enumerate() {
        inv[p] = k;
    }
    inv
}

proptest! {
    #[test]
    fn reverse_is_an_involution((shape, k) in shape_and_axis()) {
        let len: usize = shape.iter().product();
        let data = vec![0u8; len];
        let v: ViewD<'_, u8> = View::from_shape(&data, &shape).unwrap();
        let twice = v.reverse(k).unwrap().reverse(k).unwrap();
        prop_assert_eq!(twice.axes(), v.axes());
        prop_assert_eq!(twice.offset(), v.offset());
    }

    #[test]
    fn transpose_by_inverse_restores((shape, perm) in shape_and_permutation()) {
        let len: usize = shape.iter().product();
        let data: Vec<u32> = (0..len as u32).collect();
        let v: ViewD<'_, u32> = View::from_shape(&data, &shape).unwrap();
        let t = v.transpose(&perm).unwrap();
        for (k, &p) in perm.iter().enumerate() {
            prop_assert_eq!(t.axes()[p], v.axes()[k]);
        }
        let back = t.transpose(&invert(&perm)).unwrap();
        prop_assert_eq!(back.axes(), v.axes());
        prop_assert_eq!(back.to_vec(), v.to_vec());
    }

    #[test]
    fn reshape_round_trip_on_compact_views((shape, other) in shape_and_refactoring()) {
        let len: usize = shape.iter().product();
        let data: Vec<u32> = (0..len as u32).collect();
        let v: ViewD<'_, u32> = View::from_shape(&data, &shape).unwrap();
        let target: Vec<isize> = other.iter().map(|&n| n as isize).collect();
        let r = v.reshape(&target).unwrap();
        prop_assert_eq!(r.to_vec(), data.clone());

        let original: Vec<isize> = shape.iter().map(|&n| n as isize).collect();
        let back = r.reshape(&original).unwrap();
        prop_assert_eq!(back.axes(), v.axes());
    }

    #[test]
    fn reshape_placeholder_solves_leading_axis((shape, other) in shape_and_refactoring()) {
        let len: usize = shape.iter().product();
        let data = vec![0i16; len];
        let v: ViewD<'_, i16> = View::from_shape(&data, &shape).unwrap();
        let mut target: Vec<isize> = other.iter().map(|&n| n as isize).collect();
        target[0] = -1;
        let r = v.reshape(&target).unwrap();
        prop_assert_eq!(r.shape(), other);
    }

    #[test]
    fn stencil_shape(n in 0usize..12, lo in 0usize..4, hi in 0usize..4) {
        let data = vec![0.0f32; n];
        let v: ViewD<'_, f32> = View::from_shape(&data, &[n]).unwrap();
        match v.stencil(lo, hi) {
            Ok(s) => {
                prop_assert!(n >= lo + hi);
                prop_assert_eq!(s.axes(), &[Axis::new(n - lo - hi, 1), Axis::new(lo + hi + 1, 1)][..]);
            }
            Err(_) => prop_assert!(n < lo + hi),
        }
    }
}
