use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use ar_symplectic::config::Config;
use ar_symplectic::integrator::TimeTransformedSymplecticIntegrator;
use ar_symplectic::interaction::{InterruptStatus, NewtonianInteraction};
use ar_symplectic::particle::{read_ascii, Particle};
use ar_symplectic::symplectic::{Profile, SymplecticManager};
use ar_symplectic::{executor, logging};
use clap::Parser;
use serde::Serialize;

type Integrator = TimeTransformedSymplecticIntegrator<NewtonianInteraction>;

#[derive(Parser, Debug)]
#[command(author, version, about = "Integrate a few-body group with algorithmic regularization", long_about = None)]
struct Cli {
    /// Particle file: `mass x y z vx vy vz [radius]` per line
    #[arg(value_name = "PARTICLES", required_unless_present = "restart")]
    particles: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Continue from a checkpoint instead of a particle file
    #[arg(long, conflicts_with = "particles")]
    restart: Option<PathBuf>,

    /// End time (overrides run.time_end)
    #[arg(long)]
    time_end: Option<f64>,

    /// Symplectic order (overrides integrator.order)
    #[arg(long)]
    order: Option<usize>,

    /// Output interval (overrides run.output_interval)
    #[arg(long)]
    output_interval: Option<f64>,

    /// Force threads, 0 for all cores (overrides run.threads)
    #[arg(long)]
    threads: Option<usize>,

    /// Write a checkpoint of the final state
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Write the final particles as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print parameters and the orbit table before the run, the orbit
    /// table and step statistics after it
    #[arg(long)]
    group_info: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct FinalState {
    time: f64,
    etot: f64,
    energy_error: f64,
    de_change_interrupt: f64,
    particles: Vec<Particle>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(time_end) = cli.time_end {
        config.run.time_end = time_end;
    }
    if let Some(order) = cli.order {
        config.integrator.order = order;
    }
    if let Some(interval) = cli.output_interval {
        config.run.output_interval = interval;
    }
    if let Some(threads) = cli.threads {
        config.run.threads = threads;
    }
    config.validate()?;
    if let Some(pool) = executor::thread_pool(config.run.threads) {
        tracing::debug!(threads = pool.current_num_threads(), "force pool ready");
    }

    let mut integrator = match (&cli.restart, &cli.particles) {
        (Some(path), _) => restart(path)?,
        (None, Some(path)) => start(path, &config)?,
        (None, None) => anyhow::bail!("either PARTICLES or --restart is required"),
    };

    let width = config.run.print_width;
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if cli.group_info {
        integrator.manager.print(&mut out)?;
        integrator.print_group_info(&mut out, width)?;
    }
    Integrator::print_column_title(&mut out, width, integrator.particles.len())?;
    writeln!(out)?;
    integrator.print_column(&mut out, width)?;
    writeln!(out)?;

    let time_end = config.run.time_end;
    let tolerance = integrator.manager.time_error_max;
    while time_end - integrator.get_time() > tolerance {
        let target = if config.run.output_interval > 0.0 {
            (integrator.get_time() + config.run.output_interval).min(time_end)
        } else {
            time_end
        };
        let interrupt = integrator
            .integrate_to_time(target)
            .with_context(|| format!("Integration failed before time {target}"))?;

        if interrupt.is_interrupted() {
            let n_massive = integrator
                .particles
                .members()
                .iter()
                .filter(|p| p.mass > 0.0)
                .count();
            tracing::info!(
                status = ?interrupt.status,
                time = interrupt.time_now,
                n_massive,
                "group changed"
            );
            if interrupt.status == InterruptStatus::Destroy || n_massive < 2 {
                integrator.print_column(&mut out, width)?;
                writeln!(out)?;
                tracing::info!("no bound pair left, stopping");
                break;
            }
            continue;
        }
        integrator.print_column(&mut out, width)?;
        writeln!(out)?;
    }
    if cli.group_info {
        integrator.print_group_info(&mut out, width)?;
        Profile::print_column_title(&mut out, width)?;
        writeln!(out)?;
        integrator.profile.print_column(&mut out, width)?;
        writeln!(out)?;
    }
    out.flush()?;

    let profile = integrator.profile;
    tracing::info!(
        steps = profile.step_count,
        tsyn = profile.step_count_tsyn,
        rejected = profile.break_error_count,
        interrupts = profile.interrupt_count,
        energy_error = integrator.get_energy_error(),
        "integration finished"
    );

    if let Some(path) = &cli.checkpoint {
        let file = File::create(path)
            .with_context(|| format!("Failed to create checkpoint {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        integrator.manager.write_binary(&mut writer)?;
        integrator.write_binary(&mut writer)?;
        writer.flush()?;
        tracing::info!(path = %path.display(), "checkpoint written");
    }

    if let Some(path) = &cli.json {
        let mut particles = integrator.particles.members().to_vec();
        integrator.write_back_particles_origin_frame(&mut particles);
        let state = FinalState {
            time: integrator.get_time(),
            etot: integrator.get_etot(),
            energy_error: integrator.get_energy_error(),
            de_change_interrupt: integrator.get_de_change_binary_interrupt(),
            particles,
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &state)?;
    }
    Ok(())
}

fn start(path: &Path, config: &Config) -> Result<Integrator> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let particles = read_ascii(BufReader::new(file))
        .with_context(|| format!("Failed to read particles from {}", path.display()))?;
    tracing::info!(n = particles.len(), path = %path.display(), "particles loaded");

    let manager = Arc::new(config.build_manager()?);
    let mut integrator = Integrator::new(manager);
    integrator.reserve_integrator_mem(particles.len());
    for p in particles {
        integrator.particles.add_member(p);
    }
    integrator.initial_integration(config.run.time_start)?;
    Ok(integrator)
}

fn restart(path: &Path) -> Result<Integrator> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let manager = SymplecticManager::<NewtonianInteraction>::read_binary(&mut reader)
        .with_context(|| format!("Failed to read manager from {}", path.display()))?;
    let mut integrator = Integrator::new(Arc::new(manager));
    integrator
        .read_binary(&mut reader)
        .with_context(|| format!("Failed to read state from {}", path.display()))?;
    tracing::info!(time = integrator.get_time(), "restarted from checkpoint");
    Ok(integrator)
}
