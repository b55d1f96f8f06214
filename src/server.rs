use crate::config::AppConfig;
use crate::processing::{build_layout, Projector};
use crate::render;
use crate::types::{GeoPoint, MapLayout};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Built once at startup; requests only read it.
pub struct AppState {
    pub points: Vec<GeoPoint>,
    pub layout: MapLayout,
    pub svg: String,
    pub projector: Projector,
}

impl AppState {
    pub fn build(config: &AppConfig, points: Vec<GeoPoint>) -> Result<Self> {
        let layout = build_layout(config, &points)?;
        let svg = render::render_svg(&layout)?;
        let projector = Projector::new(layout.bounds, layout.canvas);
        Ok(Self {
            points,
            layout,
            svg,
            projector,
        })
    }
}

#[derive(Deserialize)]
pub struct LocateParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct LocateResponse {
    x: f64,
    y: f64,
    inside: bool,
}

#[derive(Serialize, Debug)]
pub struct PointResponse {
    name: String,
    lat: f64,
    lng: f64,
    hub: bool,
    x: f64,
    y: f64,
}

pub fn router(state: Arc<AppState>, config: &AppConfig) -> Router {
    Router::new()
        .route("/map.svg", get(map_handler))
        .route("/api/points", get(points_handler))
        .route("/api/locate", get(locate_handler))
        .nest_service("/files", ServeDir::new(&config.output.dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, points: Vec<GeoPoint>) -> Result<()> {
    let state = Arc::new(AppState::build(&config, points)?);

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!("Starting server on http://{}", addr);

    let app = router(state, &config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn map_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], state.svg.clone())
}

async fn points_handler(State(state): State<Arc<AppState>>) -> Json<Vec<PointResponse>> {
    Json(point_rows(&state))
}

async fn locate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LocateParams>,
) -> Json<LocateResponse> {
    Json(locate(&state, params.lat, params.lon))
}

fn point_rows(state: &AppState) -> Vec<PointResponse> {
    state
        .points
        .iter()
        .zip(&state.layout.markers)
        .map(|(p, marker)| PointResponse {
            name: p.name.clone(),
            lat: p.lat(),
            lng: p.lng(),
            hub: p.is_hub,
            x: marker.position.x,
            y: marker.position.y,
        })
        .collect()
}

fn locate(state: &AppState, lat: f64, lon: f64) -> LocateResponse {
    let projected = state.projector.project(lat, lon);
    LocateResponse {
        x: projected.x,
        y: projected.y,
        inside: state.layout.bounds.contains(lat, lon),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = AppConfig::default();
        router(Arc::new(state()), &config)
    }

    async fn get_body(uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    fn state() -> AppState {
        AppState::build(&AppConfig::default(), data::builtin_points()).unwrap()
    }

    #[test]
    fn state_prerenders_the_map() {
        let state = state();
        assert!(state.svg.contains("<svg"));
        assert_eq!(state.layout.grid.len(), 34 * 52);
    }

    #[test]
    fn point_rows_follow_input_order() {
        let rows = point_rows(&state());
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0].name, "Ely");
        assert!(rows[0].hub);
        assert!(rows[1..].iter().all(|r| !r.hub));
    }

    #[test]
    fn locate_reports_box_membership() {
        let state = state();
        let corner = locate(&state, 52.60, -0.30);
        assert_eq!(corner, LocateResponse { x: 0.0, y: 0.0, inside: true });

        let london = locate(&state, 51.5072, -0.1276);
        assert!(!london.inside);
        assert!(london.y > 420.0);
    }

    #[tokio::test]
    async fn map_route_serves_svg() {
        let (status, content_type, body) = get_body("/map.svg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/svg+xml"));
        assert!(body.starts_with("<svg"));
    }

    #[tokio::test]
    async fn locate_route_parses_query() {
        let (status, _, body) = get_body("/api/locate?lat=52.6&lon=-0.3").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["inside"], true);
        assert!(json["x"].as_f64().unwrap().abs() < 1e-9);
        assert!(json["y"].as_f64().unwrap().abs() < 1e-9);
    }

    #[tokio::test]
    async fn locate_route_rejects_missing_params() {
        let (status, _, _) = get_body("/api/locate?lat=52.6").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn points_route_lists_every_town() {
        let (status, _, body) = get_body("/api/points").await;
        assert_eq!(status, StatusCode::OK);

        let rows: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0]["name"], "Ely");
    }
}
