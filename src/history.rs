//! history.rs — bounded in-memory log of pipeline runs for `/api/v1/runs`.

use std::sync::Mutex;

use crate::pipeline::RunReport;

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<RunReport>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap.min(64))),
            cap,
        }
    }

    pub fn push(&self, report: RunReport) {
        let Ok(mut v) = self.inner.lock() else {
            tracing::warn!("history mutex poisoned; run report dropped");
            return;
        };
        v.push(report);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Newest last.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<RunReport> {
        let Ok(v) = self.inner.lock() else {
            return Vec::new();
        };
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
