//! Hierarchical triple: inner binary plus a distant third body
//!
//! This example demonstrates:
//! - Building the Kepler hierarchy of a three-body group
//! - Printing the orbit table and the state table
//! - Integrating with output intervals and checkpointing to memory
//!
//! Run with: cargo run --example hierarchical_triple

use std::io::Write;
use std::sync::Arc;

use ar_symplectic::config::Config;
use ar_symplectic::integrator::TimeTransformedSymplecticIntegrator;
use ar_symplectic::interaction::NewtonianInteraction;
use ar_symplectic::particle::Particle;
use ar_symplectic::symplectic::SymplecticManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Hierarchical Triple ===\n");

    let config = Config::from_toml_str(
        r#"
        [integrator]
        order = 6
        energy_error_relative_max = 1e-12

        [run]
        time_end = 50.0
        output_interval = 10.0
        print_width = 16
        "#,
    )?;

    let manager = Arc::new(config.build_manager()?);
    let mut integrator = TimeTransformedSymplecticIntegrator::new(manager);
    integrator.particles.add_member(Particle::new(0, 1.0, [-0.5, 0.0, 0.0], [0.0, -0.7, 0.0]));
    integrator.particles.add_member(Particle::new(1, 1.0, [0.5, 0.0, 0.0], [0.0, 0.7, 0.0]));
    integrator.particles.add_member(Particle::new(2, 0.5, [12.0, 0.0, 0.0], [0.0, 0.45, 0.0]));
    integrator.initial_integration(config.run.time_start)?;

    let width = config.run.print_width;
    let mut out = std::io::stdout().lock();
    println!("Orbit hierarchy:");
    integrator.print_group_info(&mut out, width)?;
    writeln!(out)?;

    let etot0 = integrator.get_etot();
    TimeTransformedSymplecticIntegrator::<NewtonianInteraction>::print_column_title(
        &mut out,
        width,
        integrator.particles.len(),
    )?;
    writeln!(out)?;

    let mut time = config.run.time_start;
    while time < config.run.time_end {
        time = (time + config.run.output_interval).min(config.run.time_end);
        integrator.integrate_to_time(time)?;
        integrator.print_column(&mut out, width)?;
        writeln!(out)?;
    }

    // round trip through the checkpoint format
    let mut buffer = Vec::new();
    integrator.manager.write_binary(&mut buffer)?;
    integrator.write_binary(&mut buffer)?;
    let mut reader = buffer.as_slice();
    let manager = SymplecticManager::<NewtonianInteraction>::read_binary(&mut reader)?;
    let mut restored = TimeTransformedSymplecticIntegrator::new(Arc::new(manager));
    restored.read_binary(&mut reader)?;

    println!("\n  ✓ dE/E = {:.3e}", (integrator.get_etot() - etot0) / etot0);
    println!("  ✓ Steps: {}", integrator.profile.step_count_total());
    println!(
        "  ✓ Checkpoint: {} bytes, restored time {}",
        buffer.len(),
        restored.get_time()
    );
    Ok(())
}
