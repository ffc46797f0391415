//! Capture and pump state machines

use crate::capture::{CaptureOptions, MediaStream};
use std::sync::Arc;

/// Lifecycle phase of a capturer, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// Nothing open, nothing pending
    Idle,

    /// A device open request is in flight
    Opening,

    /// A stream is held and may feed a pump
    Active,
}

impl CapturePhase {
    /// Check if this state transition is valid
    pub fn can_transition_to(&self, target: &CapturePhase) -> bool {
        use CapturePhase::*;

        match (self, target) {
            (Idle, Opening) => true,

            (Opening, Active) => true,
            // open failed or capture stopped while pending
            (Opening, Idle) => true,

            (Active, Idle) => true,

            (Idle, Idle) => true,

            // a new attempt always goes through Idle first
            _ => false,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "Idle",
            CapturePhase::Opening => "Opening",
            CapturePhase::Active => "Active",
        }
    }
}

impl std::fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Capture session state.
///
/// `generation` identifies the attempt that created the session; an open
/// request compares it on completion to detect that it was superseded.
#[derive(Default)]
pub enum CaptureState {
    #[default]
    Idle,

    Opening {
        generation: u64,
        options: CaptureOptions,
    },

    Active {
        generation: u64,
        options: CaptureOptions,
        stream: Arc<dyn MediaStream>,
    },
}

impl CaptureState {
    pub fn phase(&self) -> CapturePhase {
        match self {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Opening { .. } => CapturePhase::Opening,
            CaptureState::Active { .. } => CapturePhase::Active,
        }
    }

    /// A session exists, whether still opening or already active.
    pub fn is_capturing(&self) -> bool {
        !matches!(self, CaptureState::Idle)
    }

    pub fn generation(&self) -> Option<u64> {
        match self {
            CaptureState::Idle => None,
            CaptureState::Opening { generation, .. } | CaptureState::Active { generation, .. } => {
                Some(*generation)
            }
        }
    }

    pub fn is_pending(&self, attempt: u64) -> bool {
        matches!(self, CaptureState::Opening { generation, .. } if *generation == attempt)
    }

    pub fn options(&self) -> Option<&CaptureOptions> {
        match self {
            CaptureState::Idle => None,
            CaptureState::Opening { options, .. } | CaptureState::Active { options, .. } => {
                Some(options)
            }
        }
    }

    pub fn stream(&self) -> Option<&Arc<dyn MediaStream>> {
        match self {
            CaptureState::Active { stream, .. } => Some(stream),
            _ => None,
        }
    }
}

impl std::fmt::Debug for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("CaptureState");
        debug.field("phase", &self.phase());
        if let Some(generation) = self.generation() {
            debug.field("generation", &generation);
        }
        if let Some(stream) = self.stream() {
            debug.field("stream", &stream.id());
        }
        debug.finish()
    }
}

/// Pump state. At most one pump runs per capturer; the pair of generations
/// is the token the running pump checks on every iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PumpState {
    #[default]
    Idle,

    Running {
        stream_generation: u64,
        sender_generation: u64,
    },
}

impl PumpState {
    pub fn is_running(&self) -> bool {
        matches!(self, PumpState::Running { .. })
    }

    pub fn can_transition_to(&self, target: &PumpState) -> bool {
        matches!(
            (self, target),
            (PumpState::Idle, PumpState::Running { .. }) | (PumpState::Running { .. }, PumpState::Idle)
        )
    }
}
