//! Batch numbers and the two-batch sync window

use serde_json::Value;

use crate::models::snapshot::Snapshot;

/// Normalise a raw batch tag value to an integer
///
/// Numbers are truncated toward zero, numeric strings are parsed the same
/// way, booleans map to 0/1 and anything missing or non-numeric becomes 0.
pub fn normalize_batch(value: Option<&Value>) -> i64 {
    let number = match value {
        None | Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        // A one-element array coerces through its element
        Some(Value::Array(items)) if items.len() == 1 => return normalize_batch(items.first()),
        Some(Value::Array(items)) if items.is_empty() => 0.0,
        Some(_) => 0.0,
    };

    if number.is_finite() {
        number.trunc() as i64
    } else {
        0
    }
}

/// The current batch and its predecessor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
    pub current: i64,
    pub previous: i64,
}

impl BatchWindow {
    /// Window whose current batch is `current`
    pub fn new(current: i64) -> Self {
        Self {
            current,
            previous: current.saturating_sub(1),
        }
    }

    /// Canonical decimal form of the current batch
    pub fn current_id(&self) -> String {
        self.current.to_string()
    }

    /// Canonical decimal form of the previous batch
    pub fn previous_id(&self) -> String {
        self.previous.to_string()
    }

    /// Current first, then previous
    pub fn batches(&self) -> [i64; 2] {
        [self.current, self.previous]
    }

    pub fn contains(&self, batch: i64) -> bool {
        batch == self.current || batch == self.previous
    }

    /// Whether a batch is older than the window
    pub fn is_older(&self, batch: i64) -> bool {
        batch < self.previous
    }
}

/// Snapshots grouped by the two batches of a window
#[derive(Debug, Clone)]
pub struct BatchBuckets {
    window: BatchWindow,
    current: Vec<Snapshot>,
    previous: Vec<Snapshot>,
}

impl BatchBuckets {
    pub fn new(window: BatchWindow) -> Self {
        Self {
            window,
            current: Vec::new(),
            previous: Vec::new(),
        }
    }

    pub fn window(&self) -> BatchWindow {
        self.window
    }

    /// Add a snapshot to the bucket for `batch`
    ///
    /// Returns false and drops the snapshot when `batch` is outside the window.
    pub fn push(&mut self, batch: i64, snapshot: Snapshot) -> bool {
        if batch == self.window.current {
            self.current.push(snapshot);
            true
        } else if batch == self.window.previous {
            self.previous.push(snapshot);
            true
        } else {
            false
        }
    }

    /// Snapshots collected for `batch`, in encounter order
    pub fn get(&self, batch: i64) -> &[Snapshot] {
        if batch == self.window.current {
            &self.current
        } else if batch == self.window.previous {
            &self.previous
        } else {
            &[]
        }
    }

    /// Consume the buckets, yielding `(batch, snapshots)` current first
    pub fn into_batches(self) -> [(i64, Vec<Snapshot>); 2] {
        [
            (self.window.current, self.current),
            (self.window.previous, self.previous),
        ]
    }

    /// Total number of collected snapshots
    pub fn len(&self) -> usize {
        self.current.len() + self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
