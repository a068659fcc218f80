use criterion::{criterion_group, criterion_main, Criterion};

use goalfit::diagnostics::diagnose;
use goalfit::family::FamilyKind;
use goalfit::model::poisson_fitter::PoissonFitter;
use goalfit_soccer::pipeline::Response;
use goalfit_soccer::sim::{simulate, GoalProcess, SimulationConfig};

fn criterion_benchmark(c: &mut Criterion) {
    let poisson = simulate(&SimulationConfig {
        process: GoalProcess::Poisson,
        ..SimulationConfig::default()
    })
    .unwrap();
    let spec = Response::HomeGoals.spec(FamilyKind::Poisson);
    let fitter = PoissonFitter::default();

    // sanity check
    let model = fitter.fit(&spec, &poisson).unwrap();
    assert!(diagnose(&model).unwrap().degrees_of_freedom > 0);

    c.bench_function("cri_fit_poisson_20_teams", |b| {
        b.iter(|| fitter.fit(&spec, &poisson).unwrap());
    });

    let large = simulate(&SimulationConfig {
        teams: 150,
        matches: 25_000,
        ..SimulationConfig::default()
    })
    .unwrap();
    c.bench_function("cri_fit_poisson_150_teams", |b| {
        b.iter(|| fitter.fit(&spec, &large).unwrap());
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
