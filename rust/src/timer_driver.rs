use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::phase_timer::{Phase, PhaseTimer, TickAction, TimerState};
use crate::selector::{select_random, Selection};
use crate::server::AppState;

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// What the UI needs to render the countdown. Selection fields stay `None`
/// until their reveal point in the cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub enabled: bool,
    pub cycle: u64,
    pub state: TimerState,
    pub seconds_remaining: u32,
    pub elapsed: u32,
    pub phase: Phase,
    pub phase_index: u8,
    pub stage_text: String,
    pub progress_label: String,
    pub progress_percent: f64,
    pub is_waiting: bool,
    pub domain_revealed: bool,
    pub subdomain_revealed: bool,
    pub domain: Option<String>,
    pub subdomain: Option<String>,
    pub missing_piece: Option<String>,
}

impl TimerSnapshot {
    pub fn capture(timer: &PhaseTimer, selection: &Selection, cycle: u64) -> Self {
        let phase = timer.phase();
        Self {
            enabled: true,
            cycle,
            state: timer.state(),
            seconds_remaining: timer.seconds_remaining(),
            elapsed: timer.elapsed(),
            phase,
            phase_index: phase.index(),
            stage_text: timer.stage_text().to_string(),
            progress_label: timer.progress_label().to_string(),
            progress_percent: timer.progress_percent(),
            is_waiting: timer.is_waiting(),
            domain_revealed: timer.domain_revealed(),
            subdomain_revealed: timer.subdomain_revealed(),
            domain: timer
                .domain_revealed()
                .then(|| selection.domain.clone()),
            subdomain: timer
                .subdomain_revealed()
                .then(|| selection.subdomain.clone()),
            missing_piece: (phase == Phase::Synthesis).then(|| selection.missing_piece.clone()),
        }
    }

    pub fn disabled() -> Self {
        let timer = PhaseTimer::new();
        Self {
            enabled: false,
            ..Self::capture(&timer, &Selection::default(), 0)
        }
    }
}

/// Runs the reveal cycle forever: one tick per `tick_interval`, generation
/// spawned off the tick loop, completion fed back through a channel.
pub async fn run_timer(state: Arc<AppState>, tick_interval: Duration) {
    let mut timer = PhaseTimer::new();
    let mut cycle = 1u64;
    let mut selection = draw_selection(&state.catalog);
    let (done_tx, mut done_rx) = mpsc::channel::<()>(1);

    let mut ticker = tokio::time::interval(tick_interval);
    ticker.tick().await;
    state
        .timer
        .send_replace(TimerSnapshot::capture(&timer, &selection, cycle));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match timer.tick() {
                    TickAction::StartGeneration => {
                        spawn_generation(state.clone(), selection.clone(), done_tx.clone());
                    }
                    TickAction::CycleRestarted => {
                        cycle += 1;
                        selection = draw_selection(&state.catalog);
                    }
                    TickAction::None => {}
                }
            }
            Some(()) = done_rx.recv() => {
                timer.generation_finished();
            }
        }

        state
            .timer
            .send_replace(TimerSnapshot::capture(&timer, &selection, cycle));
    }
}

fn draw_selection(catalog: &Catalog) -> Selection {
    select_random(catalog, &mut rand::rng())
}

/// Completion is reported even when the generation task panics.
fn spawn_generation(state: Arc<AppState>, selection: Selection, done: mpsc::Sender<()>) {
    tokio::spawn(async move {
        let generator = state.generator.clone();
        let task = tokio::spawn(async move { generator.generate(&selection).await });

        match task.await {
            Ok(Ok(idea)) => {
                info!("timed generation stored idea {}", idea.id);
                state.ideas_revision.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => error!("timed generation failed: {err}"),
            Err(err) => error!("timed generation task died: {err}"),
        }
        let _ = done.send(()).await;
    });
}
