#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial index over the hexagonal grid.
//!
//! Builds an R-tree of cell envelopes for fast point-in-hexagon lookups,
//! assigns point entities to the cell containing them, and reduces per-cell
//! metric values with a named operator. Replaces a generic polygon-polygon
//! spatial join: the candidates for any point are the handful of hexagons
//! whose envelopes cover it.

use std::collections::BTreeMap;

use geo::{BoundingRect, Contains, Intersects, MultiPolygon, Point};
use hexmap_models::{AggregateOp, HexGrid, Metric, PointEntity};
use rstar::{AABB, RTree, RTreeObject};

/// A hex cell stored in the R-tree with its linear index.
struct CellEntry {
    index: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for CellEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built R-tree index over a grid's cells.
///
/// Constructed once per grid and reused across years and metrics.
pub struct HexIndex {
    cells: RTree<CellEntry>,
}

impl HexIndex {
    /// Builds the index from a grid's cell geometries.
    #[must_use]
    pub fn build(grid: &HexGrid) -> Self {
        let entries: Vec<CellEntry> = grid
            .cells
            .iter()
            .map(|cell| CellEntry {
                index: cell.index,
                envelope: compute_envelope(&cell.geometry),
                polygon: cell.geometry.clone(),
            })
            .collect();
        log::debug!("Built hex index over {} cells", entries.len());
        Self {
            cells: RTree::bulk_load(entries),
        }
    }

    /// Finds the cell containing a point.
    ///
    /// Interior containment wins outright; the hexagons tile without
    /// overlap, so at most one interior can match. A point lying exactly on
    /// an edge shared between hexagons is inside no interior and is
    /// attributed to the lowest-index candidate whose closed polygon still
    /// touches it, so edge points resolve identically on every run.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<usize> {
        let query_env = AABB::from_point([point.x(), point.y()]);

        let mut on_edge: Option<usize> = None;
        for entry in self.cells.locate_in_envelope_intersecting(&query_env) {
            if entry.polygon.contains(&point) {
                return Some(entry.index);
            }
            if entry.polygon.intersects(&point) {
                on_edge = Some(on_edge.map_or(entry.index, |best| best.min(entry.index)));
            }
        }
        on_edge
    }
}

/// Outcome of assigning an entity set to grid cells.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    /// Entity key to linear cell index, for entities inside the grid.
    pub assigned: BTreeMap<String, usize>,
    /// Keys of entities falling outside every cell.
    pub unassigned: Vec<String>,
}

/// Assigns each entity to the cell containing its location.
///
/// Entities outside every cell are recorded as unassigned and take no part
/// in aggregation.
#[must_use]
pub fn assign(entities: &[PointEntity], index: &HexIndex) -> Assignment {
    let mut assignment = Assignment::default();
    for entity in entities {
        match index.locate(entity.location) {
            Some(cell) => {
                assignment.assigned.insert(entity.key.clone(), cell);
            }
            None => assignment.unassigned.push(entity.key.clone()),
        }
    }
    if assignment.unassigned.is_empty() {
        log::debug!("Assigned all {} entities to cells", entities.len());
    } else {
        log::warn!(
            "{} of {} entities fall outside the grid",
            assignment.unassigned.len(),
            entities.len()
        );
    }
    assignment
}

/// Reduces the selected metric into per-cell values, returning a grid whose
/// cells carry the result under the metric's key.
///
/// Entities whose metric value is undefined are excluded from the reduction
/// entirely (for [`AggregateOp::Mean`] they count toward neither sum nor
/// denominator). Cells with no contributing entities get `Some(0.0)` under
/// [`AggregateOp::Sum`] and `None` under [`AggregateOp::Mean`]. Grouping is
/// keyed on cell index, so identical inputs reduce identically regardless of
/// entity order.
#[must_use]
pub fn aggregate(
    grid: &HexGrid,
    assignment: &Assignment,
    entities: &[PointEntity],
    metric: Metric,
    op: AggregateOp,
) -> HexGrid {
    let by_key: BTreeMap<&str, &PointEntity> =
        entities.iter().map(|e| (e.key.as_str(), e)).collect();

    let mut groups: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (key, &cell) in &assignment.assigned {
        let Some(entity) = by_key.get(key.as_str()) else {
            continue;
        };
        if let Some(value) = metric.value_of(entity) {
            groups.entry(cell).or_default().push(value);
        }
    }

    let mut out = grid.clone();
    for cell in &mut out.cells {
        let value = match (op, groups.get(&cell.index)) {
            (AggregateOp::Sum, Some(values)) => Some(values.iter().sum()),
            (AggregateOp::Sum, None) => Some(0.0),
            (AggregateOp::Mean, Some(values)) => {
                #[allow(clippy::cast_precision_loss)]
                let denominator = values.len() as f64;
                Some(values.iter().sum::<f64>() / denominator)
            }
            (AggregateOp::Mean, None) => None,
        };
        cell.values.insert(metric, value);
    }

    log::debug!(
        "Aggregated {metric} ({op}) into {} of {} cells",
        groups.len(),
        out.cells.len()
    );
    out
}

/// Computes the bounding box envelope for a cell polygon.
fn compute_envelope(geometry: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    geometry.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}
