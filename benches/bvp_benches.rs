use RustedChebop::numerical::BVP_Spectral::solvebvp::Rhs;
use RustedChebop::numerical::Examples_and_utils::{NonlinEquation, PdeExample};
use RustedChebop::numerical::preferences::{Discretization, Preferences};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_two_point_bvp(c: &mut Criterion) {
    let op = NonlinEquation::TwoPointBVP.chebop().unwrap();
    let mut group = c.benchmark_group("two point BVP");
    for disc in [Discretization::Ultraspherical, Discretization::Collocation] {
        let prefs = Preferences::default().with_discretization(disc);
        group.bench_function(disc.to_string(), |b| {
            b.iter(|| op.solve(black_box(&Rhs::Zero), &prefs).unwrap())
        });
    }
    group.finish();
}

fn bench_poisson(c: &mut Criterion) {
    let op = PdeExample::Poisson.operator().unwrap();
    let f = PdeExample::Poisson.rhs();
    let prefs = Preferences::default();
    c.bench_function("Poisson on the square", |b| {
        b.iter(|| op.solve(black_box(&f), &prefs).unwrap())
    });
}

criterion_group!(benches, bench_two_point_bvp, bench_poisson);
criterion_main!(benches);
