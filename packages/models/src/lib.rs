#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared data model for the hexbin density pipeline.
//!
//! Defines the entity, grid, and scale types passed between the pipeline
//! stages: postcode point entities with per-year transaction counts, the
//! hexagonal grid and its cells, boundary polygons for clipping, and the
//! render-ready value scales handed to the presentation layer.

use std::collections::BTreeMap;
use std::fmt;

use geo::{MultiPolygon, Point};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Axis-aligned bounding box in projected coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Western edge.
    pub min_x: f64,
    /// Southern edge.
    pub min_y: f64,
    /// Eastern edge.
    pub max_x: f64,
    /// Northern edge.
    pub max_y: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its corner coordinates.
    #[must_use]
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Horizontal extent.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Vertical extent.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether the box spans a positive area with finite coordinates.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    /// Union bounding box of a point set, or `None` when the set is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Point<f64>>,
    {
        let mut bounds: Option<Self> = None;
        for point in points {
            let b = bounds.get_or_insert(Self::new(point.x(), point.y(), point.x(), point.y()));
            b.min_x = b.min_x.min(point.x());
            b.min_y = b.min_y.min(point.y());
            b.max_x = b.max_x.max(point.x());
            b.max_y = b.max_y.max(point.y());
        }
        bounds
    }
}

/// Identifier for a projected coordinate reference system (e.g. `EPSG:27700`).
///
/// The pipeline compares CRS identifiers to detect mismatched inputs; actual
/// coordinate transforms are supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Crs(String);

impl Crs {
    /// Creates a CRS identifier from an authority code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// British National Grid, the projection the source transaction data
    /// arrives in.
    #[must_use]
    pub fn british_national_grid() -> Self {
        Self::new("EPSG:27700")
    }

    /// The authority code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One upstream transaction record in the shape the core consumes: the
/// postcode it completed in and the completion year, already extracted from
/// the raw price-paid rows by the external ETL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRow {
    /// Postcode the transaction completed in.
    pub key: String,
    /// Completion year.
    pub year: i32,
}

/// One spatial unit of analysis: a postcode centroid with its per-year
/// transaction counts and an optional derived change metric.
#[derive(Debug, Clone, PartialEq)]
pub struct PointEntity {
    /// Unique key (the postcode).
    pub key: String,
    /// Centroid location in the grid's projected CRS.
    pub location: Point<f64>,
    /// Transaction count per year. Years absent from the map count as zero.
    pub counts: BTreeMap<i32, u64>,
    /// Percentage change between two reference years. `None` means the
    /// change is undefined (zero-transaction base year), which is distinct
    /// from a computed change of `0.0`.
    pub delta: Option<f64>,
}

impl PointEntity {
    /// Creates an entity with no counts attached yet.
    #[must_use]
    pub fn new(key: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            key: key.into(),
            location: Point::new(x, y),
            counts: BTreeMap::new(),
            delta: None,
        }
    }

    /// Transaction count for a year; absent years count as zero.
    #[must_use]
    pub fn count(&self, year: i32) -> u64 {
        self.counts.get(&year).copied().unwrap_or(0)
    }
}

/// Metric selected for per-cell aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    /// Transaction count for one year. Always defined; entities with no
    /// activity in the year contribute zero.
    Count(i32),
    /// Year-over-year percentage change. Undefined (`None`) for entities
    /// with a zero-transaction base year.
    Delta,
}

impl Metric {
    /// Value of this metric for an entity, or `None` when undefined.
    #[must_use]
    pub fn value_of(&self, entity: &PointEntity) -> Option<f64> {
        match self {
            #[allow(clippy::cast_precision_loss)]
            Self::Count(year) => Some(entity.count(*year) as f64),
            Self::Delta => entity.delta,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(year) => write!(f, "transactions {year}"),
            Self::Delta => write!(f, "delta"),
        }
    }
}

/// Reduction operator for grouping entity values into a cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AggregateOp {
    /// Total of the contributing values.
    Sum,
    /// Arithmetic mean of the contributing values. Entities whose metric is
    /// undefined are excluded from both numerator and denominator.
    Mean,
}

/// Rendering classification for a cell's aggregated value.
///
/// Zero-valued and no-data cells draw as hollow outlines; nonzero cells fill
/// from the value scale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CellClass {
    /// No aggregated value, or an aggregated value of exactly zero.
    Zero,
    /// A defined, nonzero aggregated value (possibly negative).
    Nonzero,
}

/// Render-ready value domain for a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase", tag = "kind")]
pub enum ValueScale {
    /// Sequential scale over `[0, max]`, for count-like metrics.
    Linear {
        /// Largest nonzero aggregated value.
        max: f64,
    },
    /// Symmetric scale over `[-abs_max, +abs_max]` centered at zero, for
    /// signed change metrics.
    Diverging {
        /// Largest nonzero magnitude across both extremes.
        abs_max: f64,
    },
}

impl ValueScale {
    /// Lower and upper rendering bounds.
    #[must_use]
    pub const fn domain(&self) -> (f64, f64) {
        match self {
            Self::Linear { max } => (0.0, *max),
            Self::Diverging { abs_max } => (-*abs_max, *abs_max),
        }
    }

    /// Whether the domain collapsed to `[0, 0]` (nothing to render).
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_degenerate(&self) -> bool {
        let (lo, hi) = self.domain();
        lo == 0.0 && hi == 0.0
    }
}

/// One tile of the hexagonal grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    /// Column position in the generated grid.
    pub col: usize,
    /// Row position in the generated grid.
    pub row: usize,
    /// Linear index in column-major generation order (row varies fastest).
    pub index: usize,
    /// Hexagon center.
    pub center: Point<f64>,
    /// Cell geometry: the generated hexagon, or its intersection with the
    /// boundary union after clipping.
    pub geometry: MultiPolygon<f64>,
    /// Aggregated value per metric. `None` means no well-defined aggregate
    /// (a mean with no defined contributors), distinct from `Some(0.0)`.
    pub values: BTreeMap<Metric, Option<f64>>,
}

impl HexCell {
    /// Creates a cell with no aggregated values yet.
    #[must_use]
    pub const fn new(
        col: usize,
        row: usize,
        index: usize,
        center: Point<f64>,
        geometry: MultiPolygon<f64>,
    ) -> Self {
        Self {
            col,
            row,
            index,
            center,
            geometry,
            values: BTreeMap::new(),
        }
    }

    /// Aggregated value for a metric; `None` when the metric was never
    /// aggregated or has no well-defined value for this cell.
    #[must_use]
    pub fn value(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied().flatten()
    }
}

/// The hexagonal analysis grid: all cells in generation order plus the
/// parameters they were generated from.
#[derive(Debug, Clone, PartialEq)]
pub struct HexGrid {
    /// Cells in column-major generation order.
    pub cells: Vec<HexCell>,
    /// Center-to-vertex distance each hexagon was generated with.
    pub radius: f64,
    /// Projected CRS all cell geometry is expressed in.
    pub crs: Crs,
    /// Number of generated columns.
    pub cols: usize,
    /// Number of generated rows.
    pub rows: usize,
}

impl HexGrid {
    /// Looks up a cell by its linear index.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<&HexCell> {
        self.cells.iter().find(|c| c.index == index)
    }
}

/// A named administrative region used for clipping and annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    /// Display label (e.g. a borough name).
    pub label: String,
    /// Region geometry.
    pub geometry: MultiPolygon<f64>,
    /// CRS the geometry is expressed in.
    pub crs: Crs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_from_points_covers_all_points() {
        let bbox = BoundingBox::from_points(vec![
            Point::new(3.0, -1.0),
            Point::new(-2.0, 4.0),
            Point::new(0.5, 0.5),
        ])
        .unwrap();
        assert!((bbox.min_x - -2.0).abs() < f64::EPSILON);
        assert!((bbox.min_y - -1.0).abs() < f64::EPSILON);
        assert!((bbox.max_x - 3.0).abs() < f64::EPSILON);
        assert!((bbox.max_y - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bbox_from_no_points_is_none() {
        assert!(BoundingBox::from_points(vec![]).is_none());
    }

    #[test]
    fn single_point_bbox_is_degenerate() {
        let bbox = BoundingBox::from_points(vec![Point::new(1.0, 1.0)]).unwrap();
        assert!(!bbox.is_valid());
    }

    #[test]
    fn absent_year_counts_as_zero() {
        let entity = PointEntity::new("SW1A 1AA", 530_000.0, 179_000.0);
        assert_eq!(entity.count(2020), 0);
    }

    #[test]
    fn count_metric_is_always_defined() {
        let entity = PointEntity::new("E1 6AN", 0.0, 0.0);
        assert_eq!(Metric::Count(2020).value_of(&entity), Some(0.0));
    }

    #[test]
    fn delta_metric_propagates_the_sentinel() {
        let entity = PointEntity::new("E1 6AN", 0.0, 0.0);
        assert_eq!(Metric::Delta.value_of(&entity), None);
    }

    #[test]
    fn diverging_domain_is_symmetric() {
        let scale = ValueScale::Diverging { abs_max: 30.0 };
        assert_eq!(scale.domain(), (-30.0, 30.0));
    }

    #[test]
    fn zero_domains_are_degenerate() {
        assert!(ValueScale::Linear { max: 0.0 }.is_degenerate());
        assert!(ValueScale::Diverging { abs_max: 0.0 }.is_degenerate());
        assert!(!ValueScale::Linear { max: 12.0 }.is_degenerate());
    }

    #[test]
    fn aggregate_op_round_trips_through_strings() {
        assert_eq!(AggregateOp::Sum.to_string(), "sum");
        assert_eq!("mean".parse::<AggregateOp>().unwrap(), AggregateOp::Mean);
    }
}
