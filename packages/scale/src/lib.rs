#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Render-ready value scales over aggregated grids.
//!
//! Splits cells into `zero` (hollow outline) and `nonzero` (filled from the
//! scale), and derives the value domain the renderer maps colors from:
//! linear `[0, max]` for count metrics, symmetric `[-abs_max, +abs_max]`
//! for the signed change metric, or one linear domain shared across a facet
//! of several years so their colors stay comparable. When a grid has no
//! nonzero values the domain collapses to `[0, 0]`, which signals
//! nothing-to-render rather than an error.

use std::collections::BTreeMap;

use hexmap_models::{CellClass, HexGrid, Metric, ValueScale};

/// Classifies one aggregated value for rendering.
///
/// `None` (no well-defined aggregate) and an exact `0.0` both classify as
/// [`CellClass::Zero`]; any other defined value, negative included, is
/// [`CellClass::Nonzero`].
#[must_use]
#[allow(clippy::float_cmp)]
pub fn classify(value: Option<f64>) -> CellClass {
    match value {
        Some(v) if v != 0.0 => CellClass::Nonzero,
        _ => CellClass::Zero,
    }
}

/// Classifies every cell of a grid for one metric, keyed by cell index.
#[must_use]
pub fn classify_grid(grid: &HexGrid, metric: Metric) -> BTreeMap<usize, CellClass> {
    grid.cells
        .iter()
        .map(|cell| (cell.index, classify(cell.value(metric))))
        .collect()
}

/// Linear scale for a single count-like metric: `[0, max(nonzero values)]`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn linear_scale(grid: &HexGrid, metric: Metric) -> ValueScale {
    let max = nonzero_values(grid, metric).fold(0.0_f64, f64::max);
    if max == 0.0 {
        log::debug!("No nonzero {metric} values; linear domain collapses to [0, 0]");
    }
    ValueScale::Linear { max }
}

/// Symmetric diverging scale for the signed change metric.
///
/// `abs_max` is the larger magnitude of the two nonzero extremes, so the
/// domain stays symmetric around zero even when every nonzero value shares
/// one sign. With no nonzero values the domain collapses to `[0, 0]`.
#[must_use]
pub fn diverging_scale(grid: &HexGrid, metric: Metric) -> ValueScale {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for value in nonzero_values(grid, metric) {
        any = true;
        min = min.min(value);
        max = max.max(value);
    }
    if !any {
        log::debug!("No nonzero {metric} values; diverging domain collapses to [0, 0]");
        return ValueScale::Diverging { abs_max: 0.0 };
    }
    ValueScale::Diverging {
        abs_max: min.abs().max(max.abs()),
    }
}

/// One linear scale shared across a facet of (grid, metric) pairs.
///
/// The domain is `[0, global max]` over every facet, so the same aggregated
/// value renders as the same color in every year of the comparison. Must be
/// computed over the complete facet before any per-year rendering.
#[must_use]
pub fn shared_linear_scale<'a, I>(facets: I) -> ValueScale
where
    I: IntoIterator<Item = (&'a HexGrid, Metric)>,
{
    let mut max = 0.0_f64;
    for (grid, metric) in facets {
        max = nonzero_values(grid, metric).fold(max, f64::max);
    }
    ValueScale::Linear { max }
}

#[allow(clippy::float_cmp)]
fn nonzero_values(grid: &HexGrid, metric: Metric) -> impl Iterator<Item = f64> + '_ {
    grid.cells
        .iter()
        .filter_map(move |cell| cell.value(metric))
        .filter(|value| *value != 0.0)
}
