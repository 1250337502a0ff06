// Advisory turn countdown.
//
// The authority owns turn expiry. Locally we only keep a display counter that
// snaps to every authoritative value and ticks down in between so the clock
// never looks frozen. Nothing here ever produces a command.

use std::fmt;

/// Seconds at or below which the countdown is shown as urgent.
pub const URGENT_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountdownTimer {
    remaining: Option<u32>,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snap to the value carried by an authoritative snapshot. Snapshots
    /// without a time limit leave the counter untouched.
    pub fn sync(&mut self, authoritative: Option<u32>) {
        if let Some(secs) = authoritative {
            self.remaining = Some(secs);
        }
    }

    /// One local cadence elapsed. Decrements only during active play and
    /// holds at zero.
    pub fn tick(&mut self, active: bool) -> Option<u32> {
        if active {
            if let Some(secs) = self.remaining.as_mut() {
                *secs = secs.saturating_sub(1);
            }
        }
        self.remaining
    }

    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    pub fn is_urgent(&self) -> bool {
        self.remaining.is_some_and(|secs| secs <= URGENT_SECS)
    }

    pub fn reset(&mut self) {
        self.remaining = None;
    }
}

impl fmt::Display for CountdownTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.remaining {
            Some(secs) => write!(f, "{}:{:02}", secs / 60, secs % 60),
            None => write!(f, "--:--"),
        }
    }
}
