//! Synthetic application log lines.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::{GenerationError, RecordSource};
use crate::record::{BatchKey, Record, RecordGroup};

const LEVELS: &[(&str, u32)] = &[("INFO", 70), ("DEBUG", 15), ("WARN", 10), ("ERROR", 5)];
const SERVICES: &[&str] = &["api", "auth", "billing", "search", "ingest", "scheduler"];
const METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE"];
const PATHS: &[&str] = &["/users", "/orders", "/items", "/sessions", "/health"];
const STATUSES: &[u16] = &[200, 201, 204, 400, 404, 500, 503];

/// One log record per event into the `events` destination.
///
/// Fields: `id, timestamp_ms, level, service, host, message`.
#[derive(Debug, Clone)]
pub struct LogEventSource {
    hosts: Vec<String>,
    base_ms: u64,
}

impl LogEventSource {
    /// The single destination this source writes.
    pub const DESTINATION: BatchKey = BatchKey::from_static("events");

    /// Creates a source spreading events over `host_count` host names.
    pub fn new(host_count: usize) -> Self {
        let base_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self {
            hosts: (0..host_count).map(|i| format!("node-{i:03}")).collect(),
            base_ms,
        }
    }
}

impl Default for LogEventSource {
    fn default() -> Self {
        Self::new(16)
    }
}

fn pick_level(rng: &mut impl Rng) -> &'static str {
    let total: u32 = LEVELS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.random_range(0..total);
    for &(level, weight) in LEVELS {
        if roll < weight {
            return level;
        }
        roll -= weight;
    }
    LEVELS[0].0
}

impl RecordSource for LogEventSource {
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError> {
        if self.hosts.is_empty() {
            return Err(GenerationError::Malformed("no hosts configured".into()));
        }

        let mut rng = rand::rng();
        let host = &self.hosts[rng.random_range(0..self.hosts.len())];
        let service = SERVICES[rng.random_range(0..SERVICES.len())];
        let message = format!(
            "{} {} {} {}ms",
            METHODS[rng.random_range(0..METHODS.len())],
            PATHS[rng.random_range(0..PATHS.len())],
            STATUSES[rng.random_range(0..STATUSES.len())],
            rng.random_range(1..2_000u32),
        );

        let record = Record::new(vec![
            index.to_string(),
            (self.base_ms + index).to_string(),
            pick_level(&mut rng).to_owned(),
            service.to_owned(),
            host.clone(),
            message,
        ]);
        Ok(vec![(Self::DESTINATION, record)])
    }

    fn name(&self) -> &str {
        "log"
    }
}
