//! Control-loop lifecycle state.
//!
//! ```text
//!  STARTING ──▶ RUNNING ──[stop requested]──▶ STOPPING ──▶ STOPPED
//!     │            │                              ▲
//!     │            └──────────[fault]─────────────┤
//!     └──────────────────────[fault]──────────────┘
//! ```
//!
//! Every exit from `Running` goes through `Stopping`, which is where the
//! heater is turned off.

use log::{debug, info};

/// Lifecycle phase of a control-loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoopPhase {
    Starting,
    Running,
    Stopping,
    #[default]
    Stopped,
}

impl LoopPhase {
    pub fn name(self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Stopped => "Stopped",
        }
    }
}

/// Mutable state owned by the control loop.
#[derive(Debug, Clone, Default)]
pub struct LoopState {
    phase: LoopPhase,
    running: bool,
    /// Last power actually sent to the heater during this run.
    last_commanded_output: f32,
    /// Completed control iterations during this run.
    iterations: u64,
}

impl LoopState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Starting`: mark running and forget the previous run.
    pub fn begin(&mut self) {
        self.running = true;
        self.last_commanded_output = 0.0;
        self.iterations = 0;
        self.transition(LoopPhase::Starting);
    }

    /// Move to `next`, logging the transition.
    pub fn transition(&mut self, next: LoopPhase) {
        if next == self.phase {
            return;
        }
        info!("RIMS loop: {} -> {}", self.phase.name(), next.name());
        if matches!(next, LoopPhase::Stopping | LoopPhase::Stopped) {
            self.running = false;
        }
        self.phase = next;
    }

    /// Record a power command that reached the heater.
    pub fn record_command(&mut self, power: f32) {
        debug!("RIMS loop: heater commanded to {:.1}%", power);
        self.last_commanded_output = power;
    }

    pub fn complete_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn last_commanded_output(&self) -> f32 {
        self.last_commanded_output
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}
