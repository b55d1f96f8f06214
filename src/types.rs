use geo::{Coord, Point};

/// A named town. `location` is stored as (x = longitude, y = latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct GeoPoint {
    pub name: String,
    pub location: Point<f64>,
    pub is_hub: bool,
}

impl GeoPoint {
    pub fn new(name: impl Into<String>, lat: f64, lng: f64, is_hub: bool) -> Self {
        Self {
            name: name.into(),
            location: Point::new(lng, lat),
            is_hub,
        }
    }

    pub fn lat(&self) -> f64 {
        self.location.y()
    }

    pub fn lng(&self) -> f64 {
        self.location.x()
    }
}

/// Geographic window mapped onto the full canvas.
///
/// Requires `lat_min < lat_max` and `lng_min < lng_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl BoundingBox {
    pub fn new(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Self {
        debug_assert!(lat_min < lat_max, "lat_min must be below lat_max");
        debug_assert!(lng_min < lng_max, "lng_min must be below lng_max");
        Self {
            lat_min,
            lat_max,
            lng_min,
            lng_max,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f64,
    pub height: f64,
}

impl Canvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Pixel position on the canvas; y grows downward.
pub type ProjectedPoint = Coord<f64>;

/// One dot of the decorative background lattice.
pub type GridDot = Coord<f64>;

/// Single-control-point quadratic connector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCurve {
    pub start: ProjectedPoint,
    pub control: ProjectedPoint,
    pub end: ProjectedPoint,
}

#[derive(Debug, Clone)]
pub struct CityMarker {
    pub name: String,
    pub position: ProjectedPoint,
    pub is_hub: bool,
    pub pulse_delay: f64,
}

#[derive(Debug, Clone)]
pub struct Connector {
    pub target: String,
    pub curve: QuadCurve,
}

/// Everything the renderer draws, computed once per point set.
#[derive(Debug, Clone)]
pub struct MapLayout {
    pub canvas: Canvas,
    pub bounds: BoundingBox,
    pub grid: Vec<GridDot>,
    pub connectors: Vec<Connector>,
    pub markers: Vec<CityMarker>,
}

impl MapLayout {
    pub fn hub(&self) -> Option<&CityMarker> {
        self.markers.iter().find(|m| m.is_hub)
    }
}
