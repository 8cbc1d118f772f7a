#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hexagonal grid generation.
//!
//! Tiles a bounding box with regular pointy-top hexagons: columns are spaced
//! `1.5 * radius` apart, rows `sqrt(3) * radius` apart, and odd columns are
//! offset vertically by half the row spacing. With that spacing the hexagons
//! tile without gaps or overlaps, and the grid is padded by one extra column
//! and row on each axis so the whole bounding box stays covered despite the
//! stagger offset.

use geo::{LineString, MultiPolygon, Point, Polygon};
use hexmap_models::{BoundingBox, Crs, HexCell, HexGrid};
use thiserror::Error;

/// Horizontal spacing between hexagon column centers, in radii.
const COLUMN_SPACING: f64 = 1.5;

/// Errors rejected before any grid construction happens.
#[derive(Debug, Error)]
pub enum GridError {
    /// The requested center-to-vertex radius is not a positive finite number.
    #[error("invalid hex radius {radius}: must be positive and finite")]
    InvalidRadius {
        /// The rejected radius.
        radius: f64,
    },

    /// The bounding box does not span a positive area.
    #[error("degenerate bounding box ({min_x}, {min_y})-({max_x}, {max_y})")]
    DegenerateBounds {
        /// Western edge.
        min_x: f64,
        /// Southern edge.
        min_y: f64,
        /// Eastern edge.
        max_x: f64,
        /// Northern edge.
        max_y: f64,
    },
}

/// Generates the hexagonal grid covering a bounding box.
///
/// Cells come back in column-major order (row varies fastest), each carrying
/// its `(col, row)` position, linear index, center, and hexagon geometry.
///
/// # Errors
///
/// Returns [`GridError`] if the radius is not positive and finite, or the
/// bounding box does not span a positive area.
pub fn generate(bbox: BoundingBox, radius: f64, crs: Crs) -> Result<HexGrid, GridError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(GridError::InvalidRadius { radius });
    }
    if !bbox.is_valid() {
        return Err(GridError::DegenerateBounds {
            min_x: bbox.min_x,
            min_y: bbox.min_y,
            max_x: bbox.max_x,
            max_y: bbox.max_y,
        });
    }

    let dx = COLUMN_SPACING * radius;
    let dy = 3.0_f64.sqrt() * radius;

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let cols = (bbox.width() / dx).floor() as usize + 2;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rows = (bbox.height() / dy).floor() as usize + 2;

    let mut cells = Vec::with_capacity(cols * rows);
    for col in 0..cols {
        for row in 0..rows {
            #[allow(clippy::cast_precision_loss)]
            let x = bbox.min_x + col as f64 * dx;
            #[allow(clippy::cast_precision_loss)]
            let mut y = bbox.min_y + row as f64 * dy;
            if col % 2 == 1 {
                // Stagger odd columns by half the row spacing
                y += dy / 2.0;
            }
            let center = Point::new(x, y);
            cells.push(HexCell::new(
                col,
                row,
                cells.len(),
                center,
                MultiPolygon(vec![hexagon(center, radius)]),
            ));
        }
    }

    log::debug!(
        "Generated {cols}x{rows} hex grid: {} cells, radius {radius}",
        cells.len()
    );

    Ok(HexGrid {
        cells,
        radius,
        crs,
        cols,
        rows,
    })
}

/// Regular pointy-top hexagon: six vertices at 60 degree steps, starting due
/// east of the center.
fn hexagon(center: Point<f64>, radius: f64) -> Polygon<f64> {
    let vertices: Vec<(f64, f64)> = (0..6)
        .map(|i| {
            let theta = f64::from(i) * std::f64::consts::FRAC_PI_3;
            (
                center.x() + radius * theta.cos(),
                center.y() + radius * theta.sin(),
            )
        })
        .collect();
    Polygon::new(LineString::from(vertices), vec![])
}

#[cfg(test)]
mod tests {
    use geo::{Contains, Coord};
    use hexmap_models::Metric;

    use super::*;

    fn crs() -> Crs {
        Crs::british_national_grid()
    }

    #[test]
    fn grid_dimensions_match_the_spacing_formulas() {
        let bbox = BoundingBox::new(0.0, 0.0, 3000.0, 3000.0);
        let grid = generate(bbox, 1000.0, crs()).unwrap();
        assert_eq!(grid.cols, 4);
        assert_eq!(grid.rows, 3);
        assert_eq!(grid.cells.len(), 12);
    }

    #[test]
    fn cells_are_column_major_with_row_varying_fastest() {
        let bbox = BoundingBox::new(0.0, 0.0, 3000.0, 3000.0);
        let grid = generate(bbox, 1000.0, crs()).unwrap();
        let positions: Vec<(usize, usize)> = grid.cells.iter().map(|c| (c.col, c.row)).collect();
        assert_eq!(positions[0], (0, 0));
        assert_eq!(positions[1], (0, 1));
        assert_eq!(positions[grid.rows], (1, 0));
        for (i, cell) in grid.cells.iter().enumerate() {
            assert_eq!(cell.index, i);
        }
    }

    #[test]
    fn odd_columns_are_staggered_by_half_the_row_spacing() {
        let bbox = BoundingBox::new(0.0, 0.0, 3000.0, 3000.0);
        let grid = generate(bbox, 1000.0, crs()).unwrap();
        let dy = 3.0_f64.sqrt() * 1000.0;
        let even = grid.cells.iter().find(|c| c.col == 0 && c.row == 0).unwrap();
        let odd = grid.cells.iter().find(|c| c.col == 1 && c.row == 0).unwrap();
        assert!((even.center.y() - 0.0).abs() < 1e-9);
        assert!((odd.center.y() - dy / 2.0).abs() < 1e-9);
        assert!((odd.center.x() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn hexagon_vertices_sit_one_radius_from_the_center() {
        let hex = hexagon(Point::new(10.0, 20.0), 5.0);
        let ring = hex.exterior();
        // Closed ring: 6 vertices plus the closing point
        assert_eq!(ring.0.len(), 7);
        for Coord { x, y } in ring.0.iter().copied().take(6) {
            let dist = ((x - 10.0).powi(2) + (y - 20.0).powi(2)).sqrt();
            assert!((dist - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn every_interior_point_falls_inside_some_hexagon() {
        let bbox = BoundingBox::new(0.0, 0.0, 3000.0, 3000.0);
        let grid = generate(bbox, 1000.0, crs()).unwrap();
        let mut y = 10.0;
        while y < 3000.0 {
            let mut x = 10.0;
            while x < 3000.0 {
                let point = Point::new(x, y);
                let covered = grid.cells.iter().any(|c| c.geometry.contains(&point));
                assert!(covered, "point ({x}, {y}) not covered by any hexagon");
                x += 245.0;
            }
            y += 245.0;
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let bbox = BoundingBox::new(-250.0, 100.0, 4100.0, 2900.0);
        let a = generate(bbox, 750.0, crs()).unwrap();
        let b = generate(bbox, 750.0, crs()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn new_cells_carry_no_aggregated_values() {
        let bbox = BoundingBox::new(0.0, 0.0, 3000.0, 3000.0);
        let grid = generate(bbox, 1000.0, crs()).unwrap();
        assert!(grid.cells.iter().all(|c| c.value(Metric::Delta).is_none()));
    }

    #[test]
    fn rejects_non_positive_radius() {
        let bbox = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(matches!(
            generate(bbox, 0.0, crs()),
            Err(GridError::InvalidRadius { .. })
        ));
        assert!(matches!(
            generate(bbox, -5.0, crs()),
            Err(GridError::InvalidRadius { .. })
        ));
        assert!(matches!(
            generate(bbox, f64::NAN, crs()),
            Err(GridError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn rejects_degenerate_bounding_box() {
        let flat = BoundingBox::new(0.0, 50.0, 100.0, 50.0);
        assert!(matches!(
            generate(flat, 10.0, crs()),
            Err(GridError::DegenerateBounds { .. })
        ));
        let inverted = BoundingBox::new(100.0, 0.0, 0.0, 100.0);
        assert!(matches!(
            generate(inverted, 10.0, crs()),
            Err(GridError::DegenerateBounds { .. })
        ));
    }
}
