//! Streaming-service activity: every event fans out into four related
//! records for one randomly drawn customer.
//!
//! | destination | fields |
//! |---|---|
//! | `watch_history` | `id, customer_id, title_id, watched_at_ms, seconds, device` |
//! | `ratings` | `id, customer_id, title_id, stars` |
//! | `queue` | `id, customer_id, title_id, position` |
//! | `genre` | `id, customer_id, genre` |

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::{GenerationError, RecordSource};
use crate::record::{BatchKey, Record, RecordGroup};

const COUNTRIES: &[&str] = &["US", "DE", "PL", "JP", "BR", "IN", "FR", "CA"];
const PLANS: &[&str] = &["basic", "standard", "premium"];
const DEVICES: &[&str] = &["tv", "phone", "tablet", "browser", "console"];
const GENRES: &[&str] = &[
    "drama",
    "comedy",
    "documentary",
    "thriller",
    "animation",
    "sci-fi",
    "romance",
];

// ------------------------------------------------------------------------------------------------
// Reference data
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u64,
    pub name: String,
    pub country: &'static str,
    pub plan: &'static str,
}

/// Customer reference table consulted once per event.
#[derive(Debug, Clone, Default)]
pub struct CustomerPool {
    customers: Vec<Customer>,
}

impl CustomerPool {
    pub fn new(customers: Vec<Customer>) -> Self {
        Self { customers }
    }

    /// Builds `count` customers with random country and plan.
    pub fn generate(count: usize) -> Self {
        let mut rng = rand::rng();
        let customers = (0..count as u64)
            .map(|id| Customer {
                id,
                name: format!("customer-{id:06}"),
                country: COUNTRIES[rng.random_range(0..COUNTRIES.len())],
                plan: PLANS[rng.random_range(0..PLANS.len())],
            })
            .collect();
        Self { customers }
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// Draws one customer uniformly at random.
    pub fn pick(&self, rng: &mut impl Rng) -> Result<&Customer, GenerationError> {
        if self.customers.is_empty() {
            return Err(GenerationError::EmptyReferencePool);
        }
        Ok(&self.customers[rng.random_range(0..self.customers.len())])
    }
}

// ------------------------------------------------------------------------------------------------
// Source
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StreamingSource {
    customers: CustomerPool,
    titles: u64,
    base_ms: u64,
}

impl StreamingSource {
    pub const WATCH_HISTORY: BatchKey = BatchKey::from_static("watch_history");
    pub const RATINGS: BatchKey = BatchKey::from_static("ratings");
    pub const QUEUE: BatchKey = BatchKey::from_static("queue");
    pub const GENRE: BatchKey = BatchKey::from_static("genre");

    /// Number of records every event produces.
    pub const RECORDS_PER_EVENT: usize = 4;

    /// Creates a source drawing customers from `customers` and titles from
    /// `[0, titles)`. A `titles` of zero is treated as one.
    pub fn new(customers: CustomerPool, titles: u64) -> Self {
        let base_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64);
        Self {
            customers,
            titles: titles.max(1),
            base_ms,
        }
    }

    pub fn destinations() -> [BatchKey; 4] {
        [Self::WATCH_HISTORY, Self::RATINGS, Self::QUEUE, Self::GENRE]
    }
}

impl RecordSource for StreamingSource {
    fn generate(&self, index: u64) -> Result<RecordGroup, GenerationError> {
        let mut rng = rand::rng();
        let customer = self.customers.pick(&mut rng)?;

        let id = index.to_string();
        let customer_id = customer.id.to_string();
        let title_id = rng.random_range(0..self.titles).to_string();

        let watch = Record::new(vec![
            id.clone(),
            customer_id.clone(),
            title_id.clone(),
            (self.base_ms + index).to_string(),
            rng.random_range(30..10_800u32).to_string(),
            DEVICES[rng.random_range(0..DEVICES.len())].to_owned(),
        ]);
        let rating = Record::new(vec![
            id.clone(),
            customer_id.clone(),
            title_id.clone(),
            rng.random_range(1..=5u8).to_string(),
        ]);
        let queue = Record::new(vec![
            id.clone(),
            customer_id.clone(),
            title_id,
            rng.random_range(1..=50u8).to_string(),
        ]);
        let genre = Record::new(vec![
            id,
            customer_id,
            GENRES[rng.random_range(0..GENRES.len())].to_owned(),
        ]);

        Ok(vec![
            (Self::WATCH_HISTORY, watch),
            (Self::RATINGS, rating),
            (Self::QUEUE, queue),
            (Self::GENRE, genre),
        ])
    }

    fn name(&self) -> &str {
        "streaming"
    }
}
