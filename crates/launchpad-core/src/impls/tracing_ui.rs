//! TracingUi - tracing にすべての出力を流す Ui
//!
//! Used when no terminal renderer is attached (CI, tests, the demo CLI).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ports::{StatusScope, Ui};

#[derive(Default)]
pub struct TracingUi {
    current: Mutex<Option<Arc<TracingStatus>>>,
}

impl TracingUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ui for TracingUi {
    fn output(&self, msg: &str) {
        tracing::info!(target: "launchpad::ui", "{msg}");
    }

    fn status(&self) -> Arc<dyn StatusScope> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        match current.as_ref() {
            Some(status) if !status.is_closed() => status.clone(),
            _ => {
                let status = Arc::new(TracingStatus::default());
                *current = Some(status.clone());
                status
            }
        }
    }
}

#[derive(Default)]
pub struct TracingStatus {
    closed: AtomicBool,
}

impl TracingStatus {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl StatusScope for TracingStatus {
    fn update(&self, msg: &str) {
        if !self.is_closed() {
            tracing::debug!(target: "launchpad::ui", status = msg);
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}
