use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use sonar_rover::blackboard::{self, Blackboard, snapshot};
use sonar_rover::config::{self, Settings};
use sonar_rover::sim::{self, World};
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{self, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = config::load_settings().context("loading settings")?;
    let world = sim::new_world(&settings.sim);
    let drive_loop = sim::build_drive_loop(&settings, &world)?;
    info!(
        config = ?drive_loop.config(),
        pose = %sim::snapshot(&world).pose,
        "Sonar rover simulation starting."
    );

    let bb: Blackboard = Arc::default();
    let stop = Arc::new(AtomicBool::new(false));
    let (done_tx, done_rx) = oneshot::channel::<()>();

    info!("Spawning control thread...");
    let control = std::thread::Builder::new()
        .name("control".into())
        .spawn({
            let bb = Arc::clone(&bb);
            let stop = Arc::clone(&stop);
            let tick_ms = settings.tick_ms;
            let max_cycles = settings.max_cycles;
            let mut drive_loop = drive_loop;
            move || {
                info!("Control thread started.");
                let result = drive_loop.run_blocking(tick_ms, |result| {
                    blackboard::record(&bb, result);
                    let cycles = bb.read().cycles;
                    let limit_reached = max_cycles.is_some_and(|max| cycles >= max);
                    if stop.load(Ordering::Relaxed) || limit_reached {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                });
                if let Err(e) = &result {
                    error!(error = %e, "Control loop aborted.");
                }
                let _ = done_tx.send(());
                result
            }
        })?;

    supervise(
        tokio::signal::ctrl_c(),
        done_rx,
        &stop,
        Duration::from_millis(settings.report_interval_ms),
        || report_status(&bb, &world, &settings),
    )
    .await?;

    match control.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("control thread panicked"),
    }

    let stats = snapshot(&bb);
    let world = sim::snapshot(&world);
    info!(
        cycles = stats.cycles,
        forward = stats.forward,
        stopped = stats.stopped,
        turned = stats.turned,
        no_echo = stats.no_echo,
        errors = stats.errors,
        odometer_cm = world.odometer_cm,
        bumps = world.bumps,
        pose = %world.pose,
        "Sonar rover simulation finished."
    );
    Ok(())
}

/// Reports status every `report_every` until the control thread signals `done`.
///
/// When `shutdown` resolves the stop flag is raised, and the thread is still awaited.
async fn supervise<F>(
    shutdown: F,
    mut done: oneshot::Receiver<()>,
    stop: &AtomicBool,
    report_every: Duration,
    mut on_report: impl FnMut(),
) -> anyhow::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut report = tokio::time::interval(report_every);
    // One listener for the whole run, so a signal between two ticks is not lost.
    tokio::pin!(shutdown);
    let mut stopping = false;
    loop {
        tokio::select! {
            _ = report.tick() => on_report(),
            signal = &mut shutdown, if !stopping => {
                signal.context("waiting for Ctrl-C")?;
                info!("Ctrl-C received, stopping control loop.");
                stopping = true;
                stop.store(true, Ordering::Relaxed);
            }
            _ = &mut done => return Ok(()),
        }
    }
}

fn report_status(bb: &Blackboard, world: &World, settings: &Settings) {
    let stats = snapshot(bb);
    let age = Instant::now() - stats.last_cycle_ts;
    if age > Duration::from_millis(settings.stall_timeout_ms) {
        warn!(?age, last_cycle_ts = ?stats.last_cycle_ts, "No drive cycle completed recently.");
    }
    let pose = sim::snapshot(world).pose;
    info!(
        cycles = stats.cycles,
        active = stats.active(),
        idle = stats.idle,
        errors = stats.errors,
        last_reading = ?stats.last_reading,
        %pose,
        "Drive loop status"
    );
}
