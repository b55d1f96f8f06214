use crate::animation::{fmt_num, Animation};
use crate::config::AppConfig;
use crate::data;
use crate::processing::Projector;
use crate::types::{CityMarker, GeoPoint, MapLayout, QuadCurve};
use anyhow::{Context, Result};
use std::fmt::Write;
use std::fs;

const GRID_DOT_RADIUS: f64 = 1.2;
const CONNECTOR_STAGGER: f64 = 0.06;

struct MarkerStyle {
    ring_radius: f64,
    ring_stroke: &'static str,
    dot_radius: f64,
    dot_fill: &'static str,
    dot_delay: f64,
    label_dx: f64,
    label_size: f64,
    label_weight: &'static str,
    label_fill: &'static str,
}

// Hub is drawn larger and darker than every other town
const HUB_STYLE: MarkerStyle = MarkerStyle {
    ring_radius: 14.0,
    ring_stroke: "#374151",
    dot_radius: 6.0,
    dot_fill: "#1f2937",
    dot_delay: 0.0,
    label_dx: 9.0,
    label_size: 11.0,
    label_weight: "700",
    label_fill: "#111827",
};

const TOWN_STYLE: MarkerStyle = MarkerStyle {
    ring_radius: 10.0,
    ring_stroke: "#6b7280",
    dot_radius: 4.0,
    dot_fill: "#4b5563",
    dot_delay: 0.3,
    label_dx: 7.0,
    label_size: 9.0,
    label_weight: "500",
    label_fill: "#374151",
};

/// SVG path data: `M x1 y1 Q mx my x2 y2`.
pub fn path_data(curve: &QuadCurve) -> String {
    format!(
        "M {} {} Q {} {} {} {}",
        fmt_num(curve.start.x),
        fmt_num(curve.start.y),
        fmt_num(curve.control.x),
        fmt_num(curve.control.y),
        fmt_num(curve.end.x),
        fmt_num(curve.end.y),
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

pub fn render_svg(layout: &MapLayout) -> Result<String> {
    let w = layout.canvas.width;
    let h = layout.canvas.height;
    let mut svg = String::new();

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        fmt_num(w),
        fmt_num(h),
        fmt_num(w),
        fmt_num(h)
    )?;

    render_defs(&mut svg, layout)?;

    writeln!(svg, r##"  <rect width="100%" height="100%" fill="#faf9f6"/>"##)?;

    // Dot grid background
    writeln!(svg, r##"  <g fill="#d1d5db" opacity="0.45">"##)?;
    for dot in &layout.grid {
        writeln!(
            svg,
            r#"    <circle cx="{}" cy="{}" r="{}"/>"#,
            fmt_num(dot.x),
            fmt_num(dot.y),
            fmt_num(GRID_DOT_RADIUS)
        )?;
    }
    writeln!(svg, "  </g>")?;

    // Connection arcs from the hub
    for (i, conn) in layout.connectors.iter().enumerate() {
        let fade = Animation::new("opacity", 0.0, 1.0, 1.2)
            .delay(i as f64 * CONNECTOR_STAGGER)
            .ease_out();
        writeln!(
            svg,
            r##"  <path d="{}" fill="none" stroke="#9ca3af" stroke-width="1.2" stroke-dasharray="4 3" opacity="0" data-town="{}">{}</path>"##,
            path_data(&conn.curve),
            escape_xml(&conn.target),
            fade.to_smil()
        )?;
    }

    for marker in &layout.markers {
        render_marker(&mut svg, marker)?;
    }

    writeln!(svg, "</svg>")?;
    Ok(svg)
}

fn render_defs(svg: &mut String, layout: &MapLayout) -> Result<()> {
    let w = layout.canvas.width;
    let h = layout.canvas.height;
    writeln!(svg, "  <defs>")?;
    for (i, conn) in layout.connectors.iter().enumerate() {
        let c = &conn.curve;
        writeln!(
            svg,
            r##"    <linearGradient id="grad-{}" x1="{}" y1="{}" x2="{}" y2="{}" gradientUnits="objectBoundingBox"><stop offset="0%" stop-color="#6b7280"/><stop offset="100%" stop-color="#374151"/></linearGradient>"##,
            i,
            fmt_num(c.start.x / w),
            fmt_num(c.start.y / h),
            fmt_num(c.end.x / w),
            fmt_num(c.end.y / h),
        )?;
    }
    writeln!(
        svg,
        r#"    <filter id="glow"><feGaussianBlur stdDeviation="2" result="blur"/><feMerge><feMergeNode in="blur"/><feMergeNode in="SourceGraphic"/></feMerge></filter>"#
    )?;
    writeln!(svg, "  </defs>")?;
    Ok(())
}

fn render_marker(svg: &mut String, marker: &CityMarker) -> Result<()> {
    let style = if marker.is_hub { &HUB_STYLE } else { &TOWN_STYLE };
    let x = marker.position.x;
    let y = marker.position.y;

    writeln!(svg, r#"  <g class="{}">"#, if marker.is_hub { "hub" } else { "town" })?;

    // Pulse ring
    let grow = Animation::new("r", style.ring_radius * 0.6, style.ring_radius * 1.5, 2.0)
        .delay(marker.pulse_delay)
        .ease_out()
        .forever();
    let fade = Animation::new("opacity", 0.8, 0.0, 2.0)
        .delay(marker.pulse_delay)
        .ease_out()
        .forever();
    writeln!(
        svg,
        r#"    <circle cx="{}" cy="{}" r="{}" fill="none" stroke="{}" stroke-width="1" opacity="0">{}{}</circle>"#,
        fmt_num(x),
        fmt_num(y),
        fmt_num(style.ring_radius),
        style.ring_stroke,
        grow.to_smil(),
        fade.to_smil()
    )?;

    // Main dot
    let appear = Animation::new("r", 0.0, style.dot_radius, 0.4).delay(style.dot_delay);
    let show = Animation::new("opacity", 0.0, 1.0, 0.4).delay(style.dot_delay);
    let filter = if marker.is_hub { r#" filter="url(#glow)""# } else { "" };
    writeln!(
        svg,
        r#"    <circle cx="{}" cy="{}" r="0" fill="{}" opacity="0"{}>{}{}</circle>"#,
        fmt_num(x),
        fmt_num(y),
        style.dot_fill,
        filter,
        appear.to_smil(),
        show.to_smil()
    )?;

    // Label
    let label_in = Animation::new("opacity", 0.0, 1.0, 0.3).delay(0.5);
    writeln!(
        svg,
        r#"    <text x="{}" y="{}" font-size="{}" font-weight="{}" fill="{}" font-family="serif" opacity="0">{}{}</text>"#,
        fmt_num(x + style.label_dx),
        fmt_num(y + 4.0),
        fmt_num(style.label_size),
        style.label_weight,
        style.label_fill,
        escape_xml(&marker.name),
        label_in.to_smil()
    )?;

    writeln!(svg, "  </g>")?;
    Ok(())
}

/// Writes the SVG map and the GeoJSON export into the output directory.
pub fn write_map(config: &AppConfig, layout: &MapLayout, points: &[GeoPoint]) -> Result<()> {
    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output.dir))?;

    let svg = render_svg(layout)?;
    let svg_path = config.output.svg_path();
    fs::write(&svg_path, svg).with_context(|| format!("Failed to write SVG: {:?}", svg_path))?;
    tracing::info!("Wrote map to {:?}", svg_path);

    let projector = Projector::new(layout.bounds, layout.canvas);
    let geojson = data::to_geojson(points, &projector);
    let geojson_path = config.output.geojson_path();
    fs::write(&geojson_path, geojson.to_string())
        .with_context(|| format!("Failed to write GeoJSON: {:?}", geojson_path))?;
    tracing::info!("Wrote points to {:?}", geojson_path);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::build_layout;
    use geo::Coord;

    fn cambs_layout() -> MapLayout {
        build_layout(&AppConfig::default(), &data::builtin_points()).unwrap()
    }

    #[test]
    fn path_data_uses_quadratic_command() {
        let curve = QuadCurve {
            start: Coord { x: 10.0, y: 20.0 },
            control: Coord { x: 15.5, y: 5.0 },
            end: Coord { x: 21.0, y: 20.0 },
        };
        assert_eq!(path_data(&curve), "M 10 20 Q 15.5 5 21 20");
    }

    #[test]
    fn escapes_markup_in_names() {
        assert_eq!(escape_xml("A&B <C>"), "A&amp;B &lt;C&gt;");
    }

    #[test]
    fn svg_contains_every_layer() {
        let layout = cambs_layout();
        let svg = render_svg(&layout).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains(r#"viewBox="0 0 640 420""#));
        assert_eq!(svg.matches(r#"r="1.2"/>"#).count(), 34 * 52);
        assert_eq!(svg.matches("<path ").count(), 15);
        assert_eq!(svg.matches("<linearGradient").count(), 15);
        assert_eq!(svg.matches("<text ").count(), 16);
        assert_eq!(svg.matches(r#"repeatCount="indefinite""#).count(), 16 * 2);
    }

    #[test]
    fn hub_is_visually_dominant() {
        let svg = render_svg(&cambs_layout()).unwrap();
        let hub_group = svg.split(r#"<g class="hub">"#).nth(1).unwrap();
        let hub_group = hub_group.split("</g>").next().unwrap();

        assert!(hub_group.contains(r#"font-weight="700""#));
        assert!(hub_group.contains(">Ely<"));
        assert!(hub_group.contains(r#"to="6""#));
        assert!(hub_group.contains("url(#glow)"));
        assert_eq!(svg.matches(r#"<g class="hub">"#).count(), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let layout = cambs_layout();
        assert_eq!(render_svg(&layout).unwrap(), render_svg(&layout).unwrap());
    }

    #[test]
    fn write_map_creates_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.output.dir = dir.path().join("nested");
        let points = data::builtin_points();
        let layout = build_layout(&config, &points).unwrap();

        write_map(&config, &layout, &points).unwrap();

        let svg = fs::read_to_string(config.output.svg_path()).unwrap();
        assert!(svg.contains("Saffron Walden"));
        let geojson = fs::read_to_string(config.output.geojson_path()).unwrap();
        assert!(geojson.contains("FeatureCollection"));
    }
}
