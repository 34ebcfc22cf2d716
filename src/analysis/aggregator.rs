//! Keyed aggregation and grouping.
//!
//! The keyed aggregator merges a user directory with a transaction log on
//! `user_id`, accumulates lifetime value per user, and emits the users
//! above a threshold sorted by value. Users that only appear in the log
//! are kept as [`Subject::Unresolved`].

use crate::error::{AggregateError, SkipReason};
use crate::models::{Asteroid, RecordId, Status, Transaction, User};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, warn};

/// Display name used for identifiers with no matching user.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Date key used for asteroid rows without a feed date.
pub const UNKNOWN_DATE: &str = "Unknown";

/// The entity an aggregate belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum Subject {
    Known { id: RecordId, name: String },
    Unresolved { id: RecordId },
}

impl Subject {
    pub fn id(&self) -> &RecordId {
        match self {
            Subject::Known { id, .. } | Subject::Unresolved { id } => id,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Subject::Known { name, .. } => name,
            Subject::Unresolved { .. } => UNKNOWN_USER,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Subject::Known { .. })
    }
}

/// Accumulated measure for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub subject: Subject,
    pub measure: f64,
    /// Position in first-creation order; used to break ties.
    pub ordinal: usize,
}

/// Output row in the `{user_id, name, ltv}` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtvRow {
    pub user_id: RecordId,
    pub name: String,
    pub ltv: f64,
}

impl From<&AggregateRecord> for LtvRow {
    fn from(record: &AggregateRecord) -> Self {
        Self {
            user_id: record.subject.id().clone(),
            name: record.subject.display_name().to_string(),
            ltv: record.measure,
        }
    }
}

/// Options controlling a single aggregation pass.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Strict lower bound a measure must exceed to be emitted.
    pub threshold: f64,
    /// Statuses whose amounts count toward the measure.
    pub statuses: BTreeSet<Status>,
    /// Skip events with malformed amounts instead of failing the pass.
    pub skip_malformed: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            threshold: 500.0,
            statuses: BTreeSet::from([Status::Success]),
            skip_malformed: false,
        }
    }
}

/// Number of events skipped per reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub missing_field: usize,
    pub status_filtered: usize,
    pub malformed_amount: usize,
    /// Input records that could not be read as transactions at all.
    pub invalid_record: usize,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::MissingField { .. } => self.missing_field += 1,
            SkipReason::StatusFiltered => self.status_filtered += 1,
            SkipReason::MalformedAmount => self.malformed_amount += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing_field + self.status_filtered + self.malformed_amount + self.invalid_record
    }
}

/// Result of an aggregation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Records above the threshold, highest measure first.
    pub records: Vec<AggregateRecord>,
    pub skipped: SkipCounts,
    /// Records that were accumulated but did not exceed the threshold.
    pub below_threshold: usize,
}

impl Aggregation {
    pub fn rows(&self) -> Vec<LtvRow> {
        self.records.iter().map(LtvRow::from).collect()
    }
}

/// Merges users with transactions and accumulates a measure per user.
///
/// Each call is independent; nothing is cached between passes.
#[derive(Debug, Clone, Default)]
pub struct KeyedAggregator {
    options: AggregateOptions,
}

impl KeyedAggregator {
    pub fn new(options: AggregateOptions) -> Self {
        Self { options }
    }

    /// Run one aggregation pass over fully materialized inputs.
    pub fn aggregate(
        &self,
        users: &[User],
        transactions: &[Transaction],
    ) -> Result<Aggregation, AggregateError> {
        // Later duplicates override earlier ones.
        let index: HashMap<&RecordId, &str> = users
            .iter()
            .map(|u| (&u.user_id, u.name.as_str()))
            .collect();

        let mut positions: HashMap<RecordId, usize> = HashMap::new();
        let mut records: Vec<AggregateRecord> = Vec::new();
        let mut skipped = SkipCounts::default();

        for (i, tx) in transactions.iter().enumerate() {
            let id = match self.qualify(tx) {
                Ok(id) => id,
                Err(reason) => {
                    debug!("Skipping event #{}: {}", i, reason);
                    skipped.record(reason);
                    continue;
                }
            };

            let amount = match tx.amount_value() {
                Some(amount) => amount,
                None if self.options.skip_malformed => {
                    warn!(
                        "Skipping event #{} for user {}: malformed amount {}",
                        i,
                        id,
                        tx.raw_amount()
                    );
                    skipped.record(SkipReason::MalformedAmount);
                    continue;
                }
                None => {
                    return Err(AggregateError::MalformedAmount {
                        user_id: id.to_string(),
                        index: i,
                        raw: tx.raw_amount(),
                    });
                }
            };

            let pos = *positions.entry(id.clone()).or_insert_with(|| {
                let subject = match index.get(id) {
                    Some(name) => Subject::Known {
                        id: id.clone(),
                        name: (*name).to_string(),
                    },
                    None => Subject::Unresolved { id: id.clone() },
                };
                records.push(AggregateRecord {
                    subject,
                    measure: 0.0,
                    ordinal: records.len(),
                });
                records.len() - 1
            });

            records[pos].measure += amount;
        }

        let accumulated = records.len();
        let threshold = self.options.threshold;
        records.retain(|r| r.measure > threshold);
        let below_threshold = accumulated - records.len();

        // Equal measures keep first-creation order.
        records.sort_by(|a, b| {
            b.measure
                .total_cmp(&a.measure)
                .then_with(|| a.ordinal.cmp(&b.ordinal))
        });

        debug!(
            "Aggregated {} subjects, {} above threshold {}, {} events skipped",
            accumulated,
            records.len(),
            threshold,
            skipped.total()
        );

        Ok(Aggregation {
            records,
            skipped,
            below_threshold,
        })
    }

    /// Check the identifier and status of an event.
    fn qualify<'a>(&self, tx: &'a Transaction) -> Result<&'a RecordId, SkipReason> {
        let id = match &tx.user_id {
            Some(id) if !id.is_blank() => id,
            _ => return Err(SkipReason::MissingField { field: "user_id" }),
        };

        match &tx.state {
            None => Err(SkipReason::MissingField { field: "state" }),
            Some(state) if !self.options.statuses.contains(state) => {
                Err(SkipReason::StatusFiltered)
            }
            Some(_) => Ok(id),
        }
    }
}

/// Aggregate with a threshold and status filter, failing on malformed amounts.
#[allow(dead_code)] // Convenience form; the CLI goes through KeyedAggregator
pub fn aggregate(
    users: &[User],
    transactions: &[Transaction],
    threshold: f64,
    statuses: &BTreeSet<Status>,
) -> Result<Vec<AggregateRecord>, AggregateError> {
    let aggregator = KeyedAggregator::new(AggregateOptions {
        threshold,
        statuses: statuses.clone(),
        skip_malformed: false,
    });

    aggregator.aggregate(users, transactions).map(|a| a.records)
}

/// Group asteroid rows by feed date.
///
/// Keys iterate in ascending date order; rows keep their input order
/// within a date.
pub fn group_by_date(asteroids: &[Asteroid]) -> BTreeMap<String, Vec<Asteroid>> {
    let mut grouped: BTreeMap<String, Vec<Asteroid>> = BTreeMap::new();

    for asteroid in asteroids {
        let key = if asteroid.date.trim().is_empty() {
            UNKNOWN_DATE.to_string()
        } else {
            asteroid.date.clone()
        };
        grouped.entry(key).or_default().push(asteroid.clone());
    }

    grouped
}

/// Count hazardous objects.
pub fn hazardous_count(asteroids: &[Asteroid]) -> usize {
    asteroids.iter().filter(|a| a.is_hazardous).count()
}
