//! Console and JSON rendering.
//!
//! Turns asteroid groups, LTV rows and sync outcomes into text tables or
//! pretty-printed JSON.

use crate::analysis::{Aggregation, LtvRow, SyncOutcome};
use crate::models::Asteroid;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Render asteroids grouped by date.
pub fn render_asteroids(groups: &BTreeMap<String, Vec<Asteroid>>) -> String {
    let mut output = String::new();

    if groups.is_empty() {
        output.push_str("No near-earth objects in this window.\n");
        return output;
    }

    for (date, asteroids) in groups {
        output.push_str(&format!("Date: {} \n\n", date));

        for asteroid in asteroids {
            output.push_str(&render_asteroid_line(asteroid));
            output.push('\n');
        }
        output.push('\n');
    }

    output
}

fn render_asteroid_line(asteroid: &Asteroid) -> String {
    format!(
        "Name: {:<30} | Min: {:>8.4} m | Max: {:>8.4} m | {}",
        asteroid.name,
        asteroid.min_diameter_m,
        asteroid.max_diameter_m,
        asteroid.hazard_label()
    )
}

/// Render an LTV table, highest value first.
pub fn render_ltv(aggregation: &Aggregation) -> String {
    let mut output = String::new();
    let rows = aggregation.rows();

    if rows.is_empty() {
        output.push_str("No users above the threshold.\n");
    } else {
        output.push_str(&format!("{:<12} | {:<24} | {:>14}\n", "User ID", "Name", "LTV"));
        output.push_str(&format!("{:-<12}-+-{:-<24}-+-{:->14}\n", "", "", ""));
        for row in &rows {
            output.push_str(&render_ltv_line(row));
            output.push('\n');
        }
    }

    let skipped = &aggregation.skipped;
    if skipped.total() > 0 {
        output.push_str(&format!(
            "\nSkipped events: {} missing field, {} status filtered, {} malformed amount, {} invalid record\n",
            skipped.missing_field,
            skipped.status_filtered,
            skipped.malformed_amount,
            skipped.invalid_record
        ));
    }

    output
}

fn render_ltv_line(row: &LtvRow) -> String {
    format!(
        "{:<12} | {:<24} | {:>14.2}",
        row.user_id.to_string(),
        row.name,
        row.ltv
    )
}

/// Render a catalog sync outcome.
pub fn render_sync(outcome: &SyncOutcome) -> String {
    let mut output = String::new();

    output.push_str(&format!("Synced products: {}\n", outcome.synced.len()));
    for product in &outcome.synced {
        output.push_str(&format!(
            "  {:<12} | {:<24} | {:>10.2}\n",
            product.id.to_string(),
            product.name,
            product.price
        ));
    }

    if !outcome.duplicates.is_empty() {
        output.push_str(&format!(
            "Duplicate ids skipped: {}\n",
            join_ids(&outcome.duplicates)
        ));
    }
    if !outcome.unmatched.is_empty() {
        output.push_str(&format!(
            "Not in catalog: {}\n",
            join_ids(&outcome.unmatched)
        ));
    }

    output
}

fn join_ids<T: ToString>(ids: &[T]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pretty-print any serializable value as JSON.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
