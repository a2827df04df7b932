//! Query logging.

use crate::value::Value;
use std::sync::Mutex;

/// Receives a notification for every statement a connection runs.
pub trait QueryLogger: Send + Sync {
    /// Called after a statement completes; `time_ms` is wall-clock milliseconds.
    fn on_query(&self, sql: &str, params: &[Value], time_ms: f64);
}

/// One logged statement.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    pub sql: String,
    pub params: Vec<Value>,
    pub time_ms: f64,
}

/// In-memory logger that keeps every event.
#[derive(Debug, Default)]
pub struct QueryLog {
    events: Mutex<Vec<QueryEvent>>,
}

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<QueryEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn total_queries(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Sum of all recorded statement times, in milliseconds.
    pub fn total_time(&self) -> f64 {
        self.events
            .lock()
            .map(|e| e.iter().map(|ev| ev.time_ms).sum())
            .unwrap_or(0.0)
    }
}

impl QueryLogger for QueryLog {
    fn on_query(&self, sql: &str, params: &[Value], time_ms: f64) {
        if let Ok(mut events) = self.events.lock() {
            events.push(QueryEvent {
                sql: sql.to_string(),
                params: params.to_vec(),
                time_ms,
            });
        }
    }
}
