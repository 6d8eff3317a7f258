//! Application phase tracking.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where an [`App`](crate::App) is in its lifecycle.
///
/// ```text
/// Created → Registering → Running → ShuttingDown → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    Created = 0,
    Registering = 1,
    Running = 2,
    ShuttingDown = 3,
    Stopped = 4,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Phase::Created,
            1 => Phase::Registering,
            2 => Phase::Running,
            3 => Phase::ShuttingDown,
            _ => Phase::Stopped,
        }
    }

    /// Whether servers may still be registered.
    pub fn accepts_registration(self) -> bool {
        matches!(self, Phase::Created | Phase::Registering)
    }
}

/// Atomic cell holding a [`Phase`]. Transitions only move forward.
#[derive(Debug)]
pub struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(Phase::Created as u8))
    }

    pub fn get(&self) -> Phase {
        Phase::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Move to `next` if it is later than the current phase.
    ///
    /// Returns the phase observed before the call.
    pub fn advance(&self, next: Phase) -> Phase {
        let previous = self.0.fetch_max(next as u8, Ordering::SeqCst);
        Phase::from_u8(previous)
    }

    /// Move from one of `from` to `next`; fails with the current phase otherwise.
    pub fn transition(&self, from: &[Phase], next: Phase) -> Result<Phase, Phase> {
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            let phase = Phase::from_u8(current);
            if !from.contains(&phase) {
                return Err(phase);
            }
            match self.0.compare_exchange(current, next as u8, Ordering::SeqCst, Ordering::SeqCst) {
                Ok(_) => return Ok(phase),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for PhaseCell {
    fn default() -> Self {
        Self::new()
    }
}
