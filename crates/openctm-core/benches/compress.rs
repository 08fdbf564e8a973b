use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use openctm_core::{CompressionMethod, Context, ContextMode};

const GRID_SIDES: &[usize] = &[16, 64];

/// Wavy grid of `side * side` vertices with per-vertex normals.
fn wavy_grid(side: usize) -> (Vec<[f32; 3]>, Vec<[u32; 3]>, Vec<[f32; 3]>) {
    let mut vertices = Vec::with_capacity(side * side);
    let mut normals = Vec::with_capacity(side * side);
    for j in 0..side {
        for i in 0..side {
            let x = i as f32 / side as f32;
            let y = j as f32 / side as f32;
            vertices.push([x, y, 0.05 * (8.0 * x).sin() * (8.0 * y).cos()]);
            let n = [-0.4 * (8.0 * x).cos(), 0.4 * (8.0 * y).sin(), 1.0];
            let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
            normals.push([n[0] / len, n[1] / len, n[2] / len]);
        }
    }
    let mut indices = Vec::with_capacity(2 * (side - 1) * (side - 1));
    for j in 0..side - 1 {
        for i in 0..side - 1 {
            let a = (j * side + i) as u32;
            let c = a + side as u32;
            indices.push([a, a + 1, c + 1]);
            indices.push([a, c + 1, c]);
        }
    }
    (vertices, indices, normals)
}

fn export_context(side: usize, method: CompressionMethod) -> Context {
    let (vertices, indices, normals) = wavy_grid(side);
    let mut ctx = Context::new(ContextMode::Export);
    ctx.set_compression_method(method).unwrap();
    ctx.define_mesh(vertices, indices, Some(normals)).unwrap();
    ctx
}

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    for &side in GRID_SIDES {
        for method in [CompressionMethod::Mg1, CompressionMethod::Mg2] {
            let mut ctx = export_context(side, method);
            group.bench_with_input(BenchmarkId::new(method.name(), side * side), &side, |b, _| {
                b.iter(|| black_box(ctx.save_to_vec().unwrap()))
            });
        }
    }
    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    for &side in GRID_SIDES {
        for method in [CompressionMethod::Mg1, CompressionMethod::Mg2] {
            let data = export_context(side, method).save_to_vec().unwrap();
            let mut ctx = Context::new(ContextMode::Import);
            group.bench_with_input(BenchmarkId::new(method.name(), side * side), &data, |b, data| {
                b.iter(|| ctx.load_from_slice(black_box(data)).unwrap())
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
