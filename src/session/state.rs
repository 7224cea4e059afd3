use super::mode::{Mode, ModeProjection};
use crate::api::StatusReport;

/// Number of inventory bins on the sorter.
pub const SLOT_COUNT: usize = 6;

/// Server-derived session state. Only a usable status poll mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    mode: Mode,
    inventory: [bool; SLOT_COUNT],
    projection: ModeProjection,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            inventory: [false; SLOT_COUNT],
            projection: ModeProjection::for_mode(Mode::Idle),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn busy(&self) -> bool {
        self.mode.is_busy()
    }

    pub fn inventory(&self) -> &[bool; SLOT_COUNT] {
        &self.inventory
    }

    /// `slot` is 1-based, matching the backend's keys.
    pub fn slot_occupied(&self, slot: usize) -> bool {
        slot.checked_sub(1)
            .and_then(|idx| self.inventory.get(idx))
            .copied()
            .unwrap_or(false)
    }

    pub fn projection(&self) -> &ModeProjection {
        &self.projection
    }

    /// Overwrite mode, slots and projection from a report. Callers filter out OFFLINE.
    pub(super) fn apply(&mut self, mode: Mode, report: &StatusReport) {
        self.mode = mode;
        for (idx, slot) in self.inventory.iter_mut().enumerate() {
            *slot = report.is_occupied(idx + 1);
        }
        self.projection = ModeProjection::for_mode(mode);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Liveness side signals. Lives next to `SessionState`, never inside it, so an
/// OFFLINE hold cannot disturb the projected state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    heartbeat_failures: u32,
    heartbeat_threshold: u32,
    status_misses: u32,
    offline_after: u32,
    status_seen: bool,
}

impl Connectivity {
    /// `offline_after == 0` keeps the stale flag off forever.
    pub fn new(heartbeat_threshold: u32, offline_after: u32) -> Self {
        Self {
            heartbeat_failures: 0,
            heartbeat_threshold: heartbeat_threshold.max(1),
            status_misses: 0,
            offline_after,
            status_seen: false,
        }
    }

    /// Returns whether the lost-link indicator flipped.
    pub(super) fn record_heartbeat(&mut self, ok: bool) -> bool {
        let before = self.link_lost();
        if ok {
            self.heartbeat_failures = 0;
        } else {
            self.heartbeat_failures = self.heartbeat_failures.saturating_add(1);
        }
        before != self.link_lost()
    }

    /// A miss is a failed poll, an OFFLINE report, or an unknown mode.
    pub(super) fn record_status(&mut self, usable: bool) -> bool {
        let before = (self.status_stale(), self.status_seen);
        if usable {
            self.status_misses = 0;
            self.status_seen = true;
        } else {
            self.status_misses = self.status_misses.saturating_add(1);
        }
        before != (self.status_stale(), self.status_seen)
    }

    pub fn link_lost(&self) -> bool {
        self.heartbeat_failures >= self.heartbeat_threshold
    }

    pub fn status_stale(&self) -> bool {
        self.offline_after > 0 && self.status_misses >= self.offline_after
    }

    /// False until the first usable status report arrives.
    pub fn status_seen(&self) -> bool {
        self.status_seen
    }

    pub fn heartbeat_failures(&self) -> u32 {
        self.heartbeat_failures
    }
}
