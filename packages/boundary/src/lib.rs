#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Boundary polygon loading and grid clipping.
//!
//! Parses collaborator-provided `GeoJSON` into labelled boundary polygons
//! and restricts an aggregated grid to their union: each cell keeps only the
//! part of its geometry inside the boundaries, and cells left with nothing
//! are dropped. Aggregated values never change under clipping; only the
//! rendered geometry does.

use geo::{BooleanOps, MultiPolygon};
use geojson::GeoJson;
use hexmap_models::{BoundaryPolygon, Crs, HexGrid};
use thiserror::Error;

/// Errors that can occur while loading boundaries or clipping a grid.
#[derive(Debug, Error)]
pub enum ClipError {
    /// A boundary's CRS differs from the grid's and no reprojector was
    /// supplied to resolve it.
    #[error("boundary `{label}` is in {found} but the grid is in {expected}, and no reprojector was supplied")]
    CrsMismatch {
        /// Boundary label.
        label: String,
        /// The boundary's CRS.
        found: Crs,
        /// The grid's CRS.
        expected: Crs,
    },

    /// The supplied reprojector failed to transform a boundary.
    #[error("failed to reproject boundary `{label}` from {from} to {to}: {message}")]
    Reprojection {
        /// Boundary label.
        label: String,
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
        /// Failure description from the reprojector.
        message: String,
    },

    /// The boundary input is not valid `GeoJSON`.
    #[error("invalid boundary GeoJSON: {0}")]
    Geojson(#[from] geojson::Error),

    /// A boundary feature carried no Polygon or `MultiPolygon` geometry.
    #[error("boundary feature {index} has no polygonal geometry")]
    NotPolygonal {
        /// Position of the offending feature in the input.
        index: usize,
    },
}

/// Coordinate transform seam.
///
/// The core compares CRS identifiers but performs no projection math of its
/// own; callers whose boundaries arrive in a different CRS than the grid
/// supply an implementation of this trait to [`clip`].
pub trait Reproject {
    /// Transforms a polygon set from one CRS to another.
    ///
    /// # Errors
    ///
    /// Returns a message describing the failed transform.
    fn reproject(
        &self,
        geometry: &MultiPolygon<f64>,
        from: &Crs,
        to: &Crs,
    ) -> Result<MultiPolygon<f64>, String>;
}

/// Restricts a grid to the union of the supplied boundaries.
///
/// Boundaries in a different CRS than the grid are reprojected through
/// `reprojector` first. Each cell's geometry is replaced by its intersection
/// with the boundary union; cells whose intersection is empty are dropped
/// from the output. Aggregated values carry over unchanged. An empty
/// boundary slice clips everything away.
///
/// # Errors
///
/// Returns [`ClipError::CrsMismatch`] when a boundary needs reprojection and
/// no reprojector was supplied, or [`ClipError::Reprojection`] when the
/// reprojector fails.
pub fn clip(
    grid: &HexGrid,
    boundaries: &[BoundaryPolygon],
    reprojector: Option<&dyn Reproject>,
) -> Result<HexGrid, ClipError> {
    let mut union: Option<MultiPolygon<f64>> = None;
    for boundary in boundaries {
        let geometry = if boundary.crs == grid.crs {
            boundary.geometry.clone()
        } else {
            let Some(reprojector) = reprojector else {
                return Err(ClipError::CrsMismatch {
                    label: boundary.label.clone(),
                    found: boundary.crs.clone(),
                    expected: grid.crs.clone(),
                });
            };
            log::debug!(
                "Reprojecting boundary `{}` from {} to {}",
                boundary.label,
                boundary.crs,
                grid.crs
            );
            reprojector
                .reproject(&boundary.geometry, &boundary.crs, &grid.crs)
                .map_err(|message| ClipError::Reprojection {
                    label: boundary.label.clone(),
                    from: boundary.crs.clone(),
                    to: grid.crs.clone(),
                    message,
                })?
        };
        union = Some(match union {
            None => geometry,
            Some(accumulated) => accumulated.union(&geometry),
        });
    }

    let mut out = grid.clone();
    out.cells.clear();

    let Some(union) = union else {
        log::warn!("Clipping against no boundaries leaves an empty grid");
        return Ok(out);
    };

    let mut dropped = 0_usize;
    for cell in &grid.cells {
        let clipped = cell.geometry.intersection(&union);
        if clipped.0.is_empty() {
            dropped += 1;
            continue;
        }
        let mut kept = cell.clone();
        kept.geometry = clipped;
        out.cells.push(kept);
    }

    log::debug!(
        "Clipped grid to {} boundaries: kept {} cells, dropped {dropped}",
        boundaries.len(),
        out.cells.len()
    );
    Ok(out)
}

/// Parses collaborator `GeoJSON` into labelled boundary polygons.
///
/// Accepts a `FeatureCollection` (each feature's label read from
/// `label_property`, falling back to the feature's position), a bare
/// feature, or a bare geometry. Geometries must be Polygon or
/// `MultiPolygon`.
///
/// # Errors
///
/// Returns [`ClipError`] if the input is not valid `GeoJSON` or a feature
/// carries non-polygonal geometry.
pub fn boundaries_from_geojson(
    geojson_str: &str,
    label_property: &str,
    crs: &Crs,
) -> Result<Vec<BoundaryPolygon>, ClipError> {
    let parsed: GeoJson = geojson_str.parse()?;
    match parsed {
        GeoJson::FeatureCollection(collection) => collection
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| feature_to_boundary(feature, index, label_property, crs))
            .collect(),
        GeoJson::Feature(feature) => {
            Ok(vec![feature_to_boundary(&feature, 0, label_property, crs)?])
        }
        GeoJson::Geometry(geometry) => {
            let geometry =
                to_multipolygon(&geometry).ok_or(ClipError::NotPolygonal { index: 0 })?;
            Ok(vec![BoundaryPolygon {
                label: "0".to_owned(),
                geometry,
                crs: crs.clone(),
            }])
        }
    }
}

fn feature_to_boundary(
    feature: &geojson::Feature,
    index: usize,
    label_property: &str,
    crs: &Crs,
) -> Result<BoundaryPolygon, ClipError> {
    let label = feature
        .properties
        .as_ref()
        .and_then(|properties| properties.get(label_property))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| index.to_string(), str::to_owned);

    let geometry = feature
        .geometry
        .as_ref()
        .and_then(to_multipolygon)
        .ok_or(ClipError::NotPolygonal { index })?;

    Ok(BoundaryPolygon {
        label,
        geometry,
        crs: crs.clone(),
    })
}

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`], accepting both
/// Polygon and `MultiPolygon` geometry types.
fn to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geometry: geo::Geometry<f64> = geometry.clone().try_into().ok()?;
    match geo_geometry {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}
