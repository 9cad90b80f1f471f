//! # Frame Scheduler
//!
//! Components that declare a tick are registered here after their first
//! `update`. Every frame, each entry is ticked exactly once, in registration
//! order, with the elapsed milliseconds.
//!
//! The scheduler is just a list; there is no ordering by priority, no
//! parallelism, no per-entry rate. An entry is an `(entity, component name)`
//! pair, so a stale entry (its entity despawned) is skipped and pruned.

use crate::app::App;
use crate::ecs::EntityId;
use crate::error::Result;

/// Timing for one scheduler run (diagnostics only).
#[cfg(feature = "diagnostics")]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frames ticked since the app was created.
    pub frame: u64,
    /// Entries ticked during the frame.
    pub ticked: usize,
    /// Wall time spent ticking, in microseconds.
    pub duration_us: f64,
}

/// Ordered list of tick entries.
#[derive(Debug, Default)]
pub struct FrameScheduler {
    entries: Vec<(EntityId, String)>,
    #[cfg(feature = "diagnostics")]
    stats: FrameStats,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tick entry. Registering the same pair twice is a no-op.
    pub fn add(&mut self, entity: EntityId, component: &str) {
        let exists = self
            .entries
            .iter()
            .any(|(e, c)| *e == entity && c == component);
        if !exists {
            self.entries.push((entity, component.to_string()));
        }
    }

    /// Drop every entry of `entity`.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.entries.retain(|(e, _)| *e != entity);
    }

    pub fn entries(&self) -> &[(EntityId, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Statistics for the most recent frame.
    #[cfg(feature = "diagnostics")]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

/// Tick every registered entry once.
///
/// Works on a snapshot of the entry list: entries added while ticking run from
/// the next frame on. The first `Err` aborts the rest of the frame.
pub(crate) fn run_frame(app: &mut App, dt_ms: f32) -> Result<()> {
    let entries = app.scheduler.entries.clone();

    #[cfg(feature = "diagnostics")]
    let start = std::time::Instant::now();

    let mut stale = false;
    let mut ticked = 0;
    for (entity, component) in &entries {
        if !app.is_alive(*entity) {
            stale = true;
            continue;
        }
        app.tick_component(*entity, component, dt_ms)?;
        ticked += 1;
    }

    if stale {
        app.scheduler
            .entries
            .retain(|(e, _)| app.world.is_alive(*e));
    }

    #[cfg(feature = "diagnostics")]
    {
        let stats = &mut app.scheduler.stats;
        stats.frame += 1;
        stats.ticked = ticked;
        stats.duration_us = start.elapsed().as_secs_f64() * 1_000_000.0;
    }
    #[cfg(not(feature = "diagnostics"))]
    let _ = ticked;

    Ok(())
}
