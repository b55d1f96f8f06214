use crate::animation;
use crate::config::AppConfig;
use crate::data;
use crate::types::{
    BoundingBox, Canvas, CityMarker, Connector, GeoPoint, GridDot, MapLayout, ProjectedPoint,
    QuadCurve,
};
use anyhow::{anyhow, Result};
use geo::Coord;

/// Linear (equirectangular) mapping from the bounding box onto the canvas.
/// Points outside the box land outside the canvas; nothing is clamped.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    pub bounds: BoundingBox,
    pub canvas: Canvas,
}

impl Projector {
    pub fn new(bounds: BoundingBox, canvas: Canvas) -> Self {
        Self { bounds, canvas }
    }

    pub fn project(&self, lat: f64, lng: f64) -> ProjectedPoint {
        let b = &self.bounds;
        let x = ((lng - b.lng_min) / (b.lng_max - b.lng_min)) * self.canvas.width;
        // Latitude grows northward, pixel y grows downward
        let y = self.canvas.height
            - ((lat - b.lat_min) / (b.lat_max - b.lat_min)) * self.canvas.height;
        Coord { x, y }
    }

    pub fn project_point(&self, point: &GeoPoint) -> ProjectedPoint {
        self.project(point.lat(), point.lng())
    }
}

/// Arc from `from` to `to`, bulging upward by a quarter of the horizontal span.
pub fn curve_between(from: ProjectedPoint, to: ProjectedPoint) -> QuadCurve {
    let control = Coord {
        x: (from.x + to.x) / 2.0,
        y: (from.y + to.y) / 2.0 - (to.x - from.x).abs() * 0.25,
    };
    QuadCurve {
        start: from,
        control,
        end: to,
    }
}

/// One connector from the hub to every other point, in input order.
pub fn connectors(projector: &Projector, points: &[GeoPoint]) -> Result<Vec<Connector>> {
    let hub = points
        .iter()
        .find(|p| p.is_hub)
        .ok_or_else(|| anyhow!("Point set has no hub"))?;
    let hub_pt = projector.project_point(hub);

    Ok(points
        .iter()
        .filter(|p| !p.is_hub)
        .map(|p| Connector {
            target: p.name.clone(),
            curve: curve_between(hub_pt, projector.project_point(p)),
        })
        .collect())
}

/// Uniform `rows x cols` lattice spanning the canvas, row-major.
pub fn background_grid(rows: usize, cols: usize, canvas: Canvas) -> Vec<GridDot> {
    debug_assert!(rows >= 2 && cols >= 2, "grid needs at least 2 rows and 2 columns");
    let mut dots = Vec::with_capacity(rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            dots.push(Coord {
                x: (c as f64 / (cols - 1) as f64) * canvas.width,
                y: (r as f64 / (rows - 1) as f64) * canvas.height,
            });
        }
    }
    dots
}

pub fn build_layout(config: &AppConfig, points: &[GeoPoint]) -> Result<MapLayout> {
    data::validate_points(points)?;

    let projector = Projector::new(config.map.bounding_box(), config.map.canvas());
    let grid = background_grid(config.map.grid_rows, config.map.grid_cols, projector.canvas);
    let connectors = connectors(&projector, points)?;
    let delays = animation::pulse_delays(&config.animation, points.len());

    let markers = points
        .iter()
        .zip(delays)
        .map(|(p, pulse_delay)| CityMarker {
            name: p.name.clone(),
            position: projector.project_point(p),
            is_hub: p.is_hub,
            pulse_delay,
        })
        .collect();

    tracing::info!(
        "Built layout: {} grid dots, {} connectors, {} markers",
        grid.len(),
        connectors.len(),
        points.len()
    );

    Ok(MapLayout {
        canvas: projector.canvas,
        bounds: projector.bounds,
        grid,
        connectors,
        markers,
    })
}
