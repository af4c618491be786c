//! The 60-second countdown that drives the domain, subdomain and synthesis
//! reveal sequence.
//!
//! The machine is pure: the caller feeds it one `tick` per second and a
//! `generation_finished` when an in-flight generation resolves. While a
//! generation is outstanding the countdown stays pinned at the value it had
//! when generation started.

use serde::Serialize;

use crate::CYCLE_SECONDS;

pub const COOLDOWN_SECONDS: u32 = 5;
const DOMAIN_REVEAL_AT: u32 = 20;
const SUBDOMAIN_REVEAL_AT: u32 = 40;
const REVEAL_RESET_BEFORE: u32 = 2;

const STAGE_TEXTS: [&str; 13] = [
    "Looking for domain...",
    "Thinking...",
    "Got few domains selected",
    "Analyzing market trends...",
    "Deep diving into subcategories...",
    "Thinking...",
    "Got few subdomains selected",
    "Analyzing feature requirements...",
    "Crafting unique value proposition...",
    "Thinking...",
    "Got innovative concepts",
    "Polishing the final idea...",
    "Almost ready...",
];

const WAITING_LABEL: &str = "Popping idea on screen...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum TimerState {
    Counting { seconds_remaining: u32 },
    Generating,
    Cooldown { remaining: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Domain,
    Subdomain,
    Synthesis,
}

impl Phase {
    pub fn from_elapsed(elapsed: u32) -> Self {
        if elapsed < DOMAIN_REVEAL_AT {
            Phase::Domain
        } else if elapsed < SUBDOMAIN_REVEAL_AT {
            Phase::Subdomain
        } else {
            Phase::Synthesis
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Phase::Domain => 0,
            Phase::Subdomain => 1,
            Phase::Synthesis => 2,
        }
    }
}

/// What the caller must do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    None,
    StartGeneration,
    CycleRestarted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTimer {
    state: TimerState,
    displayed_seconds: u32,
    domain_revealed: bool,
    subdomain_revealed: bool,
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTimer {
    pub fn new() -> Self {
        let mut timer = Self {
            state: TimerState::Counting {
                seconds_remaining: CYCLE_SECONDS,
            },
            displayed_seconds: CYCLE_SECONDS,
            domain_revealed: false,
            subdomain_revealed: false,
        };
        timer.refresh_reveals();
        timer
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.displayed_seconds
    }

    pub fn elapsed(&self) -> u32 {
        CYCLE_SECONDS.saturating_sub(self.displayed_seconds)
    }

    pub fn phase(&self) -> Phase {
        Phase::from_elapsed(self.elapsed())
    }

    pub fn is_waiting(&self) -> bool {
        !matches!(self.state, TimerState::Counting { .. })
    }

    pub fn domain_revealed(&self) -> bool {
        self.domain_revealed
    }

    pub fn subdomain_revealed(&self) -> bool {
        self.subdomain_revealed
    }

    pub fn stage_text(&self) -> &'static str {
        stage_text(self.elapsed())
    }

    pub fn progress_label(&self) -> &'static str {
        if self.is_waiting() {
            WAITING_LABEL
        } else {
            self.stage_text()
        }
    }

    pub fn progress_percent(&self) -> f64 {
        f64::from(self.elapsed()) / f64::from(CYCLE_SECONDS) * 100.0
    }

    pub fn tick(&mut self) -> TickAction {
        let action = match self.state {
            TimerState::Counting { seconds_remaining } if seconds_remaining > 1 => {
                self.state = TimerState::Counting {
                    seconds_remaining: seconds_remaining - 1,
                };
                self.displayed_seconds = seconds_remaining - 1;
                TickAction::None
            }
            TimerState::Counting { .. } => {
                self.state = TimerState::Generating;
                TickAction::StartGeneration
            }
            TimerState::Generating => TickAction::None,
            TimerState::Cooldown { remaining } if remaining > 1 => {
                self.state = TimerState::Cooldown {
                    remaining: remaining - 1,
                };
                TickAction::None
            }
            TimerState::Cooldown { .. } => {
                self.state = TimerState::Counting {
                    seconds_remaining: CYCLE_SECONDS,
                };
                self.displayed_seconds = CYCLE_SECONDS;
                TickAction::CycleRestarted
            }
        };
        self.refresh_reveals();
        action
    }

    /// Success and failure are treated the same: both lead to the cooldown.
    /// Ignored unless a generation is in flight.
    pub fn generation_finished(&mut self) {
        if self.state == TimerState::Generating {
            self.state = TimerState::Cooldown {
                remaining: COOLDOWN_SECONDS,
            };
        }
    }

    fn refresh_reveals(&mut self) {
        let elapsed = self.elapsed();
        if elapsed == DOMAIN_REVEAL_AT {
            self.domain_revealed = true;
        }
        if elapsed == SUBDOMAIN_REVEAL_AT {
            self.subdomain_revealed = true;
        }
        if elapsed < REVEAL_RESET_BEFORE {
            self.domain_revealed = false;
            self.subdomain_revealed = false;
        }
    }
}

/// Status text for the 5-second bucket containing `elapsed`.
pub fn stage_text(elapsed: u32) -> &'static str {
    let bucket = (elapsed / 5) as usize;
    STAGE_TEXTS[bucket.min(STAGE_TEXTS.len() - 1)]
}
