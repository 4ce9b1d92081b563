//! Integration benchmarks
//!
//! - Binary and hierarchical triple to a fixed end time per order
//! - Force loop below and above the parallel threshold

use std::sync::Arc;

use ar_symplectic::integrator::TimeTransformedSymplecticIntegrator;
use ar_symplectic::interaction::{Force, Interaction, NewtonianInteraction};
use ar_symplectic::particle::{Particle, ParticleGroup};
use ar_symplectic::symplectic::SymplecticManager;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

type Integrator = TimeTransformedSymplecticIntegrator<NewtonianInteraction>;

fn eccentric_binary(ecc: f64) -> Vec<Particle> {
    let r = 1.0 - ecc;
    let v = ((1.0 + ecc) / r).sqrt();
    vec![
        Particle::new(0, 0.5, [-0.5 * r, 0.0, 0.0], [0.0, -0.5 * v, 0.0]),
        Particle::new(1, 0.5, [0.5 * r, 0.0, 0.0], [0.0, 0.5 * v, 0.0]),
    ]
}

fn hierarchical_triple() -> Vec<Particle> {
    let mut particles = eccentric_binary(0.3);
    particles.push(Particle::new(2, 0.2, [8.0, 0.0, 0.0], [0.0, 0.35, 0.0]));
    particles
}

/// Random bound-ish cloud of `n` equal-mass particles
#[allow(clippy::cast_precision_loss)]
fn random_cloud(n: usize, seed: u64) -> Vec<Particle> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let pos = [
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            ];
            let vel = [
                rng.gen_range(-0.1..0.1),
                rng.gen_range(-0.1..0.1),
                rng.gen_range(-0.1..0.1),
            ];
            Particle::new(i as i64, 1.0 / n as f64, pos, vel)
        })
        .collect()
}

fn integrator(particles: &[Particle], order: usize) -> Integrator {
    let manager = SymplecticManager::new(NewtonianInteraction::new(1.0), order).unwrap();
    let mut integrator = Integrator::new(Arc::new(manager));
    for p in particles {
        integrator.particles.add_member(*p);
    }
    integrator.initial_integration(0.0).unwrap();
    integrator
}

fn bench_binary(c: &mut Criterion) {
    let mut group = c.benchmark_group("binary_e0.9_to_t10");
    let particles = eccentric_binary(0.9);
    for order in [2, 4, 6, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(order), &order, |b, &order| {
            b.iter_batched(
                || integrator(&particles, order),
                |mut integrator| {
                    integrator.integrate_to_time(black_box(10.0)).unwrap();
                    integrator
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_triple(c: &mut Criterion) {
    let particles = hierarchical_triple();
    c.bench_function("triple_to_t20", |b| {
        b.iter_batched(
            || integrator(&particles, 4),
            |mut integrator| {
                integrator.integrate_to_time(black_box(20.0)).unwrap();
                integrator
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_force_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_loop");
    let interaction = NewtonianInteraction::new(1.0);
    for n in [4, 16, 64, 256] {
        let members = ParticleGroup::new(random_cloud(n, 42));
        let cm = *members.cm();
        let mut forces = vec![Force::default(); n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                interaction.calc_acc_pot_and_gt_kick_inv(
                    &mut forces,
                    black_box(members.members()),
                    &cm,
                    &Default::default(),
                    0.0,
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_binary, bench_triple, bench_force_loop);
criterion_main!(benches);
