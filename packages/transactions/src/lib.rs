#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-year transaction counts and the year-over-year change metric.
//!
//! Merges raw transaction rows onto point entities as an explicit
//! year-to-count mapping (a left-outer join on the entity key: entities
//! never disappear, rows with unknown keys are dropped), and derives the
//! percentage change between two reference years.

use std::collections::{BTreeMap, BTreeSet};

use hexmap_models::{PointEntity, TransactionRow};

/// Attaches per-year transaction counts to entities.
///
/// For every year present in `rows`, each entity ends up with an explicit
/// count: the number of rows matching its key for that year, or zero when
/// none match. Rows whose key matches no entity are dropped.
#[must_use]
pub fn attach_counts(mut entities: Vec<PointEntity>, rows: &[TransactionRow]) -> Vec<PointEntity> {
    let mut years: BTreeSet<i32> = BTreeSet::new();
    let mut counts: BTreeMap<&str, BTreeMap<i32, u64>> = BTreeMap::new();
    for row in rows {
        years.insert(row.year);
        *counts
            .entry(row.key.as_str())
            .or_default()
            .entry(row.year)
            .or_insert(0) += 1;
    }

    let known: BTreeSet<&str> = entities.iter().map(|e| e.key.as_str()).collect();
    let dropped = rows.iter().filter(|r| !known.contains(r.key.as_str())).count();
    if dropped > 0 {
        log::debug!("Dropped {dropped} of {} rows with unknown keys", rows.len());
    }

    for entity in &mut entities {
        let per_year = counts.get(entity.key.as_str());
        for &year in &years {
            let count = per_year.and_then(|m| m.get(&year)).copied().unwrap_or(0);
            entity.counts.insert(year, count);
        }
    }

    entities
}

/// Derives each entity's percentage change in transaction count from
/// `year_a` to `year_b`.
///
/// The change is `100 * (b - a) / a`. When the base-year count is zero the
/// change is not computable and the entity's delta becomes `None`, the
/// undefined sentinel; it is never reported as `0.0` or infinity.
#[must_use]
pub fn compute_delta(
    mut entities: Vec<PointEntity>,
    year_a: i32,
    year_b: i32,
) -> Vec<PointEntity> {
    for entity in &mut entities {
        let a = entity.count(year_a);
        let b = entity.count(year_b);
        #[allow(clippy::cast_precision_loss)]
        let delta = if a > 0 {
            Some(((b as f64 - a as f64) / a as f64) * 100.0)
        } else {
            None
        };
        entity.delta = delta;
    }
    entities
}
