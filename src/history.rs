// src/history.rs
use crate::types::{ControllerError, DataPoint};
use std::collections::VecDeque;

/// Points retained for display.
pub const HISTORY_CAPACITY: usize = 50;

/// Bounded FIFO of the most recent scored readings, oldest first.
///
/// Append always succeeds; once full, the oldest point is evicted so the
/// buffer always holds the newest `HISTORY_CAPACITY` points in
/// chronological order.
#[derive(Debug, Default)]
pub struct HistoryBuffer {
    points: VecDeque<DataPoint>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            points: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn append(&mut self, point: DataPoint) {
        if self.points.len() == HISTORY_CAPACITY {
            self.points.pop_front();
        }
        self.points.push_back(point);
        debug_assert!(self.check().is_ok());
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    /// Chronological copy for a published snapshot.
    pub fn to_vec(&self) -> Vec<DataPoint> {
        self.iter().copied().collect()
    }

    /// Defensive capacity check. Unreachable with a correct `append`; tests
    /// assert it never fires.
    pub fn check(&self) -> Result<(), ControllerError> {
        if self.points.len() > HISTORY_CAPACITY {
            return Err(ControllerError::BufferOverCapacity {
                len: self.points.len(),
                capacity: HISTORY_CAPACITY,
            });
        }
        Ok(())
    }
}
