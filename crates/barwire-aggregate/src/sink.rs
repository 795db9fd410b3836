//! Consumers of aggregator output.

use barwire_types::Level;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Bar;

/// Errors raised by a sink while checkpointing.
#[derive(Error, Debug)]
pub enum SinkError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisting the checkpoint failed.
    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Receiver of per-level notifications from an [`Aggregator`](crate::Aggregator).
///
/// Every fed sample yields exactly one call per level: [`Sink::on_close`]
/// when the bar carries new information (a close, or an update that moved
/// an extreme), [`Sink::on_unchanged`] otherwise. A feed that repairs a
/// missed boundary additionally emits one call per level standing in for
/// the missing closing sample.
pub trait Sink {
    /// The bar closed or changed; `bar.complete` tells which.
    fn on_close(&mut self, level: Level, bar: &Bar);

    /// Nothing new for this level; repeat the last output.
    fn on_unchanged(&mut self, level: Level, bar: &Bar);

    /// Flushes buffered output and persists state atomically.
    ///
    /// Safe to call between any two samples.
    ///
    /// # Errors
    ///
    /// Returns an error if the state could not be persisted.
    fn checkpoint(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn on_close(&mut self, level: Level, bar: &Bar) {
        (**self).on_close(level, bar);
    }

    fn on_unchanged(&mut self, level: Level, bar: &Bar) {
        (**self).on_unchanged(level, bar);
    }

    fn checkpoint(&mut self) -> Result<(), SinkError> {
        (**self).checkpoint()
    }
}

/// Discards every notification.
impl Sink for () {
    fn on_close(&mut self, _level: Level, _bar: &Bar) {}

    fn on_unchanged(&mut self, _level: Level, _bar: &Bar) {}
}

/// Kind of notification delivered to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// [`Sink::on_close`].
    Close,
    /// [`Sink::on_unchanged`].
    Unchanged,
}

/// A notification captured by [`RecordingSink`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Level notified.
    pub level: Level,
    /// Which callback fired.
    pub kind: NotificationKind,
    /// Snapshot of the bar at notification time.
    pub bar: Bar,
}

/// Sink that records every notification in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    notifications: Vec<Notification>,
    checkpoints: usize,
}

impl RecordingSink {
    /// Creates an empty recorder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            notifications: Vec::new(),
            checkpoints: 0,
        }
    }

    /// Returns all notifications in delivery order.
    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Returns the notifications delivered for `level`.
    pub fn for_level(&self, level: Level) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().filter(move |n| n.level == level)
    }

    /// Returns the completed bars closed for `level`, in order.
    pub fn closed_bars(&self, level: Level) -> impl Iterator<Item = &Bar> {
        self.for_level(level)
            .filter(|n| n.kind == NotificationKind::Close && n.bar.complete)
            .map(|n| &n.bar)
    }

    /// Returns how many times [`Sink::checkpoint`] was called.
    #[must_use]
    pub const fn checkpoints(&self) -> usize {
        self.checkpoints
    }

    /// Removes and returns all recorded notifications.
    pub fn take(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}

impl Sink for RecordingSink {
    fn on_close(&mut self, level: Level, bar: &Bar) {
        self.notifications.push(Notification {
            level,
            kind: NotificationKind::Close,
            bar: *bar,
        });
    }

    fn on_unchanged(&mut self, level: Level, bar: &Bar) {
        self.notifications.push(Notification {
            level,
            kind: NotificationKind::Unchanged,
            bar: *bar,
        });
    }

    fn checkpoint(&mut self) -> Result<(), SinkError> {
        self.checkpoints += 1;
        Ok(())
    }
}
