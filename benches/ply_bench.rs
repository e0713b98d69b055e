use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};
use strided_frame::{combine, map1, map2, ply, sum, Slot, View, ViewD, ViewMut, ViewMutD};

fn random_data(len: usize, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

fn bench_add_contiguous(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_contiguous");
    for size in [100usize, 500, 1000] {
        let elements = size * size;
        group.throughput(Throughput::Elements(elements as u64));
        let a = random_data(elements, 1);
        let b = random_data(elements, 2);
        let mut out = vec![0.0; elements];

        group.bench_with_input(BenchmarkId::new("slice", size), &size, |bench, _| {
            bench.iter(|| {
                for ((o, x), y) in out.iter_mut().zip(&a).zip(&b) {
                    *o = x + y;
                }
                black_box(&out);
            })
        });

        group.bench_with_input(BenchmarkId::new("map2", size), &size, |bench, _| {
            bench.iter(|| {
                let va: ViewD<'_, f64> = View::from_shape(&a, &[size, size]).unwrap();
                let vb: ViewD<'_, f64> = View::from_shape(&b, &[size, size]).unwrap();
                let d: ViewMutD<'_, f64> = ViewMut::from_shape(&mut out, &[size, size]).unwrap();
                map2(d, va, vb, |x, y| x + y).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_add_broadcast_row(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_broadcast_row");
    for size in [100usize, 500, 1000] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_data(size * size, 3);
        let row = random_data(size, 4);
        let mut out = vec![0.0; size * size];

        group.bench_with_input(BenchmarkId::new("ply", size), &size, |bench, _| {
            bench.iter(|| {
                let va: ViewD<'_, f64> = View::from_shape(&a, &[size, size]).unwrap();
                let vr: ViewD<'_, f64> = View::from_shape(&row, &[size]).unwrap();
                let d: ViewMutD<'_, f64> = ViewMut::from_shape(&mut out, &[size, size]).unwrap();
                let e = combine(|o: Slot<'_, f64>, x: f64, y: f64| o.set(x + y), (d, va, vr)).unwrap();
                ply(e).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_copy_transposed(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy_transposed");
    for size in [100usize, 500, 1000] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_data(size * size, 5);
        let mut out = vec![0.0; size * size];

        group.bench_with_input(BenchmarkId::new("map1", size), &size, |bench, _| {
            bench.iter(|| {
                let va: ViewD<'_, f64> = View::from_shape(&a, &[size, size]).unwrap();
                let at = va.transpose(&[1, 0]).unwrap();
                let d: ViewMutD<'_, f64> = ViewMut::from_shape(&mut out, &[size, size]).unwrap();
                map1(d, at, |x| x).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_sum(c: &mut Criterion) {
    let mut group = c.benchmark_group("sum");
    for size in [100usize, 500, 1000] {
        group.throughput(Throughput::Elements((size * size) as u64));
        let a = random_data(size * size, 6);

        group.bench_with_input(BenchmarkId::new("contiguous", size), &size, |bench, _| {
            bench.iter(|| {
                let va: ViewD<'_, f64> = View::from_shape(&a, &[size, size]).unwrap();
                black_box(sum(va).unwrap())
            })
        });

        group.bench_with_input(BenchmarkId::new("reversed", size), &size, |bench, _| {
            bench.iter(|| {
                let va: ViewD<'_, f64> = View::from_shape(&a, &[size, size]).unwrap();
                black_box(sum(va.reverse(1).unwrap()).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add_contiguous,
    bench_add_broadcast_row,
    bench_copy_transposed,
    bench_sum
);
criterion_main!(benches);
