//! Simulated distributed pipeline update
//!
//! Runs one tokio task per rank (plus one for the client when configured),
//! each owning its own `ProgressCoordinator` over a `LocalFabric`. Ranks walk
//! the same stages at jittered speeds, meet at a barrier the way an executor
//! would before closing the update, and then tear down.

use std::collections::HashMap;
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;

use eyre::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Barrier;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::coordinator::{ClientFrame, CoordinatorConfig, CoordinatorMetrics, ProgressCoordinator};
use crate::display::{ConsoleDisplay, DisplayUpdate, ProgressDisplay, RecordingDisplay};
use crate::domain::{FilterId, ObjectKey, ProcessRole, Rank, Topology};
use crate::transport::{LocalClient, LocalFabric, LocalMessenger};

/// Outcome of a simulated update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Role of each rank, indexed by rank
    pub roles: Vec<ProcessRole>,
    pub root: CoordinatorMetrics,
    pub satellites: Vec<CoordinatorMetrics>,
    /// Updates the client displayed, when a client ran
    pub client_updates: usize,
    /// Last value shown to the user
    pub final_stage: Option<String>,
    pub final_percent: Option<u8>,
}

/// One stage of the simulated pipeline; its address is its identity
#[derive(Debug)]
struct Stage {
    id: FilterId,
    name: String,
}

/// Records every update and optionally draws it on the terminal
struct SimulationDisplay {
    console: Option<ConsoleDisplay<Stdout>>,
    recording: RecordingDisplay,
}

impl SimulationDisplay {
    fn new(label: &str, render: bool) -> Self {
        Self {
            console: render.then(|| ConsoleDisplay::stdout(label)),
            recording: RecordingDisplay::new(),
        }
    }

    fn finish(&mut self) -> (usize, Option<DisplayUpdate>) {
        if let Some(console) = self.console.as_mut() {
            console.finish();
        }
        (self.recording.updates().len(), self.recording.last().cloned())
    }
}

impl ProgressDisplay for SimulationDisplay {
    fn set_local_progress(&mut self, name: &str, percent: u8) {
        if let Some(console) = self.console.as_mut() {
            console.set_local_progress(name, percent);
        }
        self.recording.set_local_progress(name, percent);
    }
}

type SimCoordinator = ProgressCoordinator<LocalMessenger, SimulationDisplay>;

struct RankOutcome {
    role: Option<ProcessRole>,
    metrics: CoordinatorMetrics,
    last: Option<DisplayUpdate>,
}

/// Run one update across `sim.satellites + 1` ranks
///
/// With `render` set, the process the user would watch (the root, or the
/// client when one is configured) draws a progress bar on stdout.
pub async fn run(sim: &SimulationConfig, progress: &CoordinatorConfig, render: bool) -> Result<SimulationReport> {
    let ranks = sim.satellites + 1;
    info!(%ranks, with_client = sim.with_client, "Starting simulated update");

    let mut fabric = LocalFabric::new(ranks);
    if sim.with_client {
        fabric = fabric.with_client();
    }
    let (messengers, client) = fabric.into_parts();

    let stages: Arc<Vec<Stage>> = Arc::new(
        sim.filters
            .iter()
            .enumerate()
            .map(|(index, name)| Stage {
                id: FilterId(index as i32 + 1),
                name: name.clone(),
            })
            .collect(),
    );
    let names: HashMap<FilterId, String> = stages.iter().map(|s| (s.id, s.name.clone())).collect();
    let barrier = Arc::new(Barrier::new(ranks));

    let client_task = client.map(|client| tokio::spawn(run_client(client, progress.clone(), render)));

    let rank_tasks: Vec<_> = messengers
        .into_iter()
        .enumerate()
        .map(|(index, messenger)| {
            let topology = Topology {
                is_client: false,
                is_server: sim.with_client,
                local_rank: Rank(index),
                num_processes: ranks,
            };
            let watching = render && index == 0 && !sim.with_client;
            let coordinator = ProgressCoordinator::new(
                progress.clone(),
                topology,
                messenger,
                SimulationDisplay::new("root", watching),
            )
            .with_names(names.clone());

            tokio::spawn(run_rank(
                coordinator,
                Arc::clone(&stages),
                sim.steps,
                Duration::from_millis(sim.tick_ms),
                Arc::clone(&barrier),
            ))
        })
        .collect();

    let mut outcomes = Vec::with_capacity(ranks);
    for joined in futures::future::join_all(rank_tasks).await {
        outcomes.push(joined.context("Rank task panicked")??);
    }

    let client_outcome = match client_task {
        Some(task) => Some(task.await.context("Client task panicked")??),
        None => None,
    };

    let roles = outcomes.iter().filter_map(|o| o.role).collect();
    let mut outcomes = outcomes.into_iter();
    let root = outcomes.next().ok_or_else(|| eyre::eyre!("Simulation ran no ranks"))?;
    let satellites = outcomes.map(|o| o.metrics).collect();

    let (client_updates, last) = match client_outcome {
        Some((count, last)) if root.role == Some(ProcessRole::ServerRootMpi) => (count, last),
        Some((count, _)) => (count, root.last),
        None => (0, root.last),
    };

    Ok(SimulationReport {
        roles,
        root: root.metrics,
        satellites,
        client_updates,
        final_stage: last.as_ref().map(|u| u.name.clone()),
        final_percent: last.map(|u| u.percent),
    })
}

async fn run_rank(
    mut coordinator: SimCoordinator,
    stages: Arc<Vec<Stage>>,
    steps: u32,
    tick: Duration,
    barrier: Arc<Barrier>,
) -> Result<RankOutcome> {
    let rank = coordinator.topology().local_rank;
    let reported = report_stages(&mut coordinator, &stages, steps, tick).await;

    // Peers block here until every rank arrives, so a failed rank still waits.
    debug!(%rank, "run_rank: waiting for peers");
    barrier.wait().await;
    reported?;

    coordinator
        .cleanup_pending_progress()
        .context("Failed to close update window")?;
    coordinator.shutdown();

    let (_, last) = coordinator.display_mut().finish();
    Ok(RankOutcome {
        role: coordinator.role(),
        metrics: coordinator.metrics().clone(),
        last,
    })
}

/// Open the window and walk every stage from 0 to 100 percent
async fn report_stages(coordinator: &mut SimCoordinator, stages: &[Stage], steps: u32, tick: Duration) -> Result<()> {
    if steps == 0 {
        return Err(eyre::eyre!("Simulation needs at least one step per stage"));
    }

    for stage in stages {
        coordinator.register_progress_event(ObjectKey::of(stage), stage.id);
    }

    coordinator.prepare_progress().context("Failed to open update window")?;

    for stage in stages {
        for step in 0..=steps {
            let percent = (step * 100 / steps) as u8;
            coordinator
                .invoke_progress_event(ObjectKey::of(stage), percent, Some(&stage.name))
                .context("Failed to report progress")?;

            let factor: f64 = rand::rng().random_range(0.5..1.5);
            tokio::time::sleep(tick.mul_f64(factor)).await;
        }
    }
    Ok(())
}

/// Client side: decode frames from the root and hand them to the display
async fn run_client(
    mut link: LocalClient,
    progress: CoordinatorConfig,
    render: bool,
) -> Result<(usize, Option<DisplayUpdate>)> {
    let (mut own, _) = LocalFabric::new(1).into_parts();
    let messenger = own.pop().ok_or_else(|| eyre::eyre!("Client fabric has no endpoint"))?;
    let topology = Topology {
        is_client: true,
        ..Topology::standalone()
    };
    let mut coordinator = ProgressCoordinator::new(progress, topology, messenger, SimulationDisplay::new("client", render));
    let key = ObjectKey::from_raw(0);

    while let Some(envelope) = link.recv().await {
        match ClientFrame::decode(&envelope.bytes) {
            Ok(frame) => coordinator
                .invoke_progress_event(key, frame.percent, Some(&frame.name))
                .context("Client failed to display progress")?,
            Err(e) => warn!(error = %e, "Discarding malformed client frame"),
        }
    }

    Ok(coordinator.display_mut().finish())
}
