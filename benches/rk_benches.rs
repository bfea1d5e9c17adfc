use RustedODE::numerical::RK::RK_api::{ExplicitRKODE, RKMethod};
use criterion::{Criterion, criterion_group, criterion_main};
use nalgebra::DVector;

fn solve_oscillator(method: RKMethod, adaptive: bool) {
    let f = Box::new(|_t: f64, y: &DVector<f64>, dy: &mut DVector<f64>| {
        dy[0] = y[1];
        dy[1] = -y[0];
    });
    let y0 = DVector::from_vec(vec![1.0, 0.0]);
    let mut solver = ExplicitRKODE::new(method, f, 0.0, y0, 10.0, 0.01);
    solver.set_adaptive(adaptive);
    solver.solve();
}

fn bench_rk4_fixed(c: &mut Criterion) {
    c.bench_function("RK4 fixed step oscillator", |b| {
        b.iter(|| solve_oscillator(RKMethod::RK4, false))
    });
}

fn bench_tsit5_adaptive(c: &mut Criterion) {
    c.bench_function("Tsit5 adaptive oscillator", |b| {
        b.iter(|| solve_oscillator(RKMethod::Tsit5, true))
    });
}

fn bench_dp5_adaptive(c: &mut Criterion) {
    c.bench_function("DP5 adaptive oscillator", |b| {
        b.iter(|| solve_oscillator(RKMethod::DP5, true))
    });
}

criterion_group!(benches, bench_rk4_fixed, bench_tsit5_adaptive, bench_dp5_adaptive);
criterion_main!(benches);
