use crate::config::AppConfig;
use crate::processing::Projector;
use crate::types::GeoPoint;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Towns served out of Ely.
const CAMBS_TOWNS: &[(&str, f64, f64, bool)] = &[
    ("Ely", 52.3996, 0.2624, true),
    ("Cambridge", 52.2053, 0.1218, false),
    ("Soham", 52.3339, 0.3373, false),
    ("Newmarket", 52.2457, 0.4083, false),
    ("Huntingdon", 52.3320, -0.1836, false),
    ("Littleport", 52.4601, 0.3046, false),
    ("Burwell", 52.2759, 0.3263, false),
    ("Fordham", 52.3121, 0.3868, false),
    ("Sutton", 52.3687, -0.0263, false),
    ("Chatteris", 52.4564, -0.0544, false),
    ("St Ives", 52.3298, -0.0735, false),
    ("March", 52.5533, 0.0884, false),
    ("Sawston", 52.1257, 0.1757, false),
    ("Haverhill", 52.0826, 0.4394, false),
    ("Saffron Walden", 52.0224, 0.2402, false),
    ("Royston", 52.0477, -0.0210, false),
];

pub fn builtin_points() -> Vec<GeoPoint> {
    CAMBS_TOWNS
        .iter()
        .map(|&(name, lat, lng, hub)| GeoPoint::new(name, lat, lng, hub))
        .collect()
}

pub fn load_points(config: &AppConfig) -> Result<Vec<GeoPoint>> {
    let points = match &config.input.points {
        None => builtin_points(),
        Some(path) => {
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|s| s.to_lowercase())
                .ok_or_else(|| anyhow!("Points file has no extension: {:?}", path))?;

            match extension.as_str() {
                "csv" => load_csv_points(path)?,
                "json" | "geojson" => load_geojson_points(path)?,
                _ => return Err(anyhow!("Unsupported points format: {}", extension)),
            }
        }
    };

    validate_points(&points)?;
    tracing::info!("Loaded {} points", points.len());
    Ok(points)
}

/// A usable point set is non-empty, has finite coordinates, unique names
/// and exactly one hub.
pub fn validate_points(points: &[GeoPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(anyhow!("Point set is empty"));
    }

    let mut seen = HashSet::new();
    for p in points {
        if !p.lat().is_finite() || !p.lng().is_finite() {
            return Err(anyhow!(
                "Point '{}' has non-finite coordinates ({}, {})",
                p.name,
                p.lat(),
                p.lng()
            ));
        }
        if !seen.insert(p.name.as_str()) {
            return Err(anyhow!("Duplicate point name: {}", p.name));
        }
    }

    let hubs: Vec<&str> = points
        .iter()
        .filter(|p| p.is_hub)
        .map(|p| p.name.as_str())
        .collect();
    match hubs.len() {
        1 => Ok(()),
        0 => Err(anyhow!("Point set has no hub")),
        n => Err(anyhow!("Point set has {} hubs ({}), expected one", n, hubs.join(", "))),
    }
}

fn parse_hub_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(anyhow!("Invalid hub flag: {:?}", other)),
    }
}

fn load_csv_points(path: &Path) -> Result<Vec<GeoPoint>> {
    let file = File::open(path).with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Column '{}' not found in CSV", name))
    };
    let name_idx = column("name")?;
    let lat_idx = column("lat")?;
    let lng_idx = column("lng")?;
    let hub_idx = headers.iter().position(|h| h.eq_ignore_ascii_case("hub"));

    let mut points = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        let row = line + 2;
        let name = record.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            return Err(anyhow!("Row {} has no name", row));
        }
        let lat: f64 = record
            .get(lat_idx)
            .unwrap_or("")
            .parse()
            .with_context(|| format!("Invalid latitude on row {}", row))?;
        let lng: f64 = record
            .get(lng_idx)
            .unwrap_or("")
            .parse()
            .with_context(|| format!("Invalid longitude on row {}", row))?;
        let hub = match hub_idx {
            Some(idx) => parse_hub_flag(record.get(idx).unwrap_or(""))
                .with_context(|| format!("Row {}", row))?,
            None => false,
        };
        points.push(GeoPoint::new(name, lat, lng, hub));
    }

    Ok(points)
}

fn load_geojson_points(path: &Path) -> Result<Vec<GeoPoint>> {
    tracing::debug!("Loading GeoJSON points from {:?}", path);
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);
    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut points = Vec::new();
    for feature in collection.features {
        let props = feature.properties.as_ref();
        let name = match props.and_then(|p| p.get("name")) {
            Some(serde_json::Value::String(s)) => s.clone(),
            _ => return Err(anyhow!("Feature without a string 'name' property")),
        };
        let hub = match props.and_then(|p| p.get("hub")) {
            None | Some(serde_json::Value::Null) => false,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(other) => return Err(anyhow!("Invalid hub flag on '{}': {}", name, other)),
        };

        let geometry = feature
            .geometry
            .ok_or_else(|| anyhow!("Feature '{}' has no geometry", name))?;
        let geom: geo::Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e| anyhow!("Failed to convert geometry of '{}': {:?}", name, e))?;

        match geom {
            geo::Geometry::Point(pt) => points.push(GeoPoint::new(name, pt.y(), pt.x(), hub)),
            _ => return Err(anyhow!("Feature '{}' is not a Point", name)),
        }
    }

    Ok(points)
}

/// Points as a FeatureCollection, each carrying its projected canvas position.
pub fn to_geojson(points: &[GeoPoint], projector: &Projector) -> GeoJson {
    let features = points
        .iter()
        .map(|p| {
            let projected = projector.project_point(p);
            let mut props = JsonObject::new();
            props.insert("name".to_string(), p.name.clone().into());
            props.insert("hub".to_string(), p.is_hub.into());
            props.insert("x".to_string(), projected.x.into());
            props.insert("y".to_string(), projected.y.into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&p.location))),
                id: None,
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
