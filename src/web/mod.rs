// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Web UI for the Flare dashboard

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analysis::{emphasis_spans, AnalysisOrchestrator, AnalysisState};
use crate::config::AppConfig;
use crate::geocode::Geocoder;
use crate::incident::{Incident, IncidentDraft};
use crate::map::{self, Marker};
use crate::session::{IncidentRow, ReportSession};
use crate::sheet::BottomSheetController;
use crate::FlareError;

/// Shared application state
pub struct AppState {
    pub session: Mutex<ReportSession>,
    pub sheet: Mutex<BottomSheetController>,
    pub analysis: Arc<AnalysisOrchestrator>,
    pub geocoder: Arc<dyn Geocoder>,
    pub config: AppConfig,
}

impl AppState {
    fn session(&self) -> MutexGuard<'_, ReportSession> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn sheet(&self) -> MutexGuard<'_, BottomSheetController> {
        self.sheet.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(index_page))
        // API endpoints
        .route("/api/incidents", get(api_get_incidents).post(api_submit_incident))
        .route("/api/incidents/location", get(api_location_incidents))
        .route("/api/analysis", get(api_get_analysis).post(api_start_analysis))
        .route("/api/places", get(api_search_places))
        .route("/api/sheet", get(api_get_sheet).post(api_sheet_gesture))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

struct ApiError(FlareError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FlareError::InvalidSubmission(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

// === Page Handlers ===

async fn index_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let rows = state.session().recompute_relative_display(Utc::now());
    Html(render_index(&rows, &state.analysis.state()))
}

// === API Handlers ===

async fn api_get_incidents(State(state): State<Arc<AppState>>) -> Json<Vec<IncidentRow>> {
    Json(state.session().recompute_relative_display(Utc::now()))
}

async fn api_submit_incident(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<IncidentDraft>,
) -> Result<(StatusCode, Json<Incident>), ApiError> {
    let incident = state.session().submit(draft, Utc::now()).map_err(ApiError)?;
    Ok((StatusCode::CREATED, Json(incident)))
}

#[derive(Deserialize)]
struct LocationQuery {
    label: String,
}

async fn api_location_incidents(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LocationQuery>,
) -> Json<Vec<IncidentRow>> {
    let mut session = state.session();
    session.select_location(Some(query.label));
    Json(session.location_rows(Utc::now()))
}

async fn api_get_analysis(State(state): State<Arc<AppState>>) -> Json<AnalysisState> {
    Json(state.analysis.state())
}

/// Start a run in the background; any run already in flight is superseded
async fn api_start_analysis(State(state): State<Arc<AppState>>) -> (StatusCode, Json<AnalysisState>) {
    let incidents = {
        let mut session = state.session();
        session.refresh();
        session.incidents().to_vec()
    };
    let orchestrator = Arc::clone(&state.analysis);
    let mut updates = orchestrator.subscribe();
    tokio::spawn(async move {
        orchestrator.run(&incidents, &Local::now()).await;
    });
    // Respond once the run has published its first change
    let _ = updates.changed().await;
    (StatusCode::ACCEPTED, Json(state.analysis.state()))
}

#[derive(Deserialize)]
struct PlacesQuery {
    q: String,
    #[serde(default)]
    incidents: bool,
}

#[derive(Serialize)]
struct PlacesResponse {
    markers: Vec<Marker>,
}

async fn api_search_places(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PlacesQuery>,
) -> Json<PlacesResponse> {
    let places = map::search_places(state.geocoder.as_ref(), &query.q).await;
    let incidents = state.session().incidents().to_vec();
    Json(PlacesResponse {
        markers: map::markers(&places, &incidents, query.incidents, Utc::now()),
    })
}

/// One gesture event from the client
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum SheetGesture {
    Start,
    /// Total translation since the drag started, positive downwards
    Update { delta: f64 },
    End,
}

#[derive(Serialize)]
struct SnapView {
    from: f64,
    to: f64,
    duration_ms: u128,
}

#[derive(Serialize)]
struct SheetView {
    offset: f64,
    top_edge: f64,
    dragging: bool,
    background: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snap: Option<SnapView>,
}

fn sheet_view(sheet: &BottomSheetController, viewport_height: f64, snap: Option<SnapView>) -> SheetView {
    SheetView {
        offset: sheet.offset(),
        top_edge: sheet.top_edge(viewport_height),
        dragging: sheet.is_dragging(),
        background: sheet.background().css(),
        snap,
    }
}

async fn api_get_sheet(State(state): State<Arc<AppState>>) -> Json<SheetView> {
    let sheet = state.sheet();
    Json(sheet_view(&sheet, state.config.sheet.viewport_height, None))
}

async fn api_sheet_gesture(
    State(state): State<Arc<AppState>>,
    Json(gesture): Json<SheetGesture>,
) -> Json<SheetView> {
    let mut sheet = state.sheet();
    let snap = match gesture {
        SheetGesture::Start => {
            sheet.on_drag_start();
            None
        }
        SheetGesture::Update { delta } => {
            sheet.on_drag_update(delta);
            None
        }
        SheetGesture::End => sheet.on_drag_end().map(|anim| SnapView {
            from: anim.from,
            to: anim.to,
            duration_ms: anim.duration.as_millis(),
        }),
    };
    Json(sheet_view(&sheet, state.config.sheet.viewport_height, snap))
}

// === Template Rendering ===

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn base_template(title: &str, content: &str) -> String {
    format!(r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{} - Flare</title>
    <style>
        :root {{
            --bg-primary: #1a1c38;
            --bg-secondary: #364473;
            --card: #ffe5ef;
            --text-primary: #fefefa;
            --text-muted: #6b6b80;
            --accent: #d0377e;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: linear-gradient(to top, var(--bg-secondary), var(--bg-primary));
            color: var(--text-primary);
            min-height: 100vh;
            line-height: 1.6;
        }}
        .container {{ max-width: 900px; margin: 0 auto; padding: 20px; }}
        h1 {{ color: var(--accent); margin-bottom: 20px; }}
        .card {{
            background: var(--card);
            color: #1a1c38;
            border-radius: 12px;
            padding: 16px;
            margin-bottom: 10px;
            display: flex;
            gap: 14px;
            align-items: flex-start;
        }}
        .card h3 {{ margin-bottom: 4px; }}
        .card .meta {{ color: var(--text-muted); font-size: 0.85em; }}
        .dot {{
            width: 14px;
            height: 14px;
            border-radius: 50%;
            margin-top: 6px;
            flex-shrink: 0;
            border: 1px solid rgba(0,0,0,0.1);
        }}
        .analysis {{
            background: var(--card);
            color: var(--accent);
            border-radius: 15px;
            padding: 20px;
            margin-bottom: 30px;
            white-space: pre-wrap;
        }}
    </style>
</head>
<body>
    <main class="container">
        {}
    </main>
</body>
</html>"#, title, content)
}

fn render_analysis(state: &AnalysisState) -> String {
    if state.pending {
        return "<div class=\"analysis\">Analyzing...</div>".to_string();
    }
    match &state.result_text {
        Some(text) => {
            let body: String = emphasis_spans(text)
                .into_iter()
                .map(|s| if s.bold {
                    format!("<strong>{}</strong>", escape(&s.text))
                } else {
                    escape(&s.text)
                })
                .collect();
            format!("<h2>Risk Analysis</h2><div class=\"analysis\">{}</div>", body)
        }
        None => String::new(),
    }
}

fn render_index(rows: &[IncidentRow], analysis: &AnalysisState) -> String {
    let cards: String = rows.iter()
        .map(|row| format!(r#"
            <div class="card">
                <span class="dot" title="{}" style="background: {}"></span>
                <div>
                    <h3>{}</h3>
                    <p>{}</p>
                    <p class="meta">{} &middot; {}</p>
                </div>
            </div>
        "#,
            row.band,
            row.band.css_color(),
            escape(&row.incident.title),
            escape(&row.incident.description),
            escape(&row.incident.location),
            row.relative,
        ))
        .collect();

    let content = format!(r#"
        <h1>Report</h1>
        {}
        {}
    "#,
        render_analysis(analysis),
        if cards.is_empty() { "<p>No reports yet</p>".to_string() } else { cards },
    );

    base_template("Report", &content)
}

/// Start the web server
pub async fn start_server(state: AppState) -> crate::Result<()> {
    let addr = format!("{}:{}", state.config.web.host, state.config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web UI available at http://{}", addr);

    let router = create_router(Arc::new(state));
    axum::serve(listener, router).await
        .map_err(|e| FlareError::Config(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisBackend, AnalysisPayload};
    use crate::geocode::Place;
    use crate::incident::Coordinate;
    use crate::store::IncidentStore;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct Echo;

    #[async_trait]
    impl AnalysisBackend for Echo {
        async fn analyze(&self, payload: &AnalysisPayload) -> crate::Result<Option<String>> {
            Ok(Some(format!("{} *points*", payload.coordinates.len())))
        }
    }

    struct OnePlace;

    #[async_trait]
    impl Geocoder for OnePlace {
        async fn search(&self, _query: &str) -> crate::Result<Vec<Place>> {
            Ok(vec![Place {
                name: "Bayfront Park".to_string(),
                title: "Bayfront Park, Miami".to_string(),
                coordinate: Coordinate::new(25.7753, -80.186),
            }])
        }
    }

    fn state() -> Arc<AppState> {
        let config = AppConfig::default();
        Arc::new(AppState {
            session: Mutex::new(ReportSession::open(IncidentStore::in_memory("alerts").unwrap())),
            sheet: Mutex::new(BottomSheetController::from_config(&config.sheet).unwrap()),
            analysis: Arc::new(AnalysisOrchestrator::new(Arc::new(Echo))),
            geocoder: Arc::new(OnePlace),
            config,
        })
    }

    fn gesture(body: serde_json::Value) -> Request<Body> {
        Request::post("/api/sheet")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn submit(title: &str, location: &str) -> Request<Body> {
        let draft = serde_json::json!({
            "title": title,
            "description": "details",
            "location": location,
            "latitude": 25.76,
            "longitude": -80.19,
        });
        Request::post("/api/incidents")
            .header("content-type", "application/json")
            .body(Body::from(draft.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_and_list() {
        let state = state();
        let app = create_router(state.clone());

        let response = app.clone().oneshot(submit("Followed", "Main St")).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(Request::get("/api/incidents").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let rows = body_json(response).await;
        assert_eq!(rows[0]["incident"]["title"], "Followed");
        assert_eq!(rows[0]["band"], "CRITICAL");
        assert_eq!(rows[0]["relative"], "Just now");
    }

    #[tokio::test]
    async fn test_blank_submission_rejected() {
        let app = create_router(state());
        let response = app.oneshot(submit("", "Main St")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_location_listing() {
        let state = state();
        let app = create_router(state.clone());
        app.clone().oneshot(submit("A", "Main St")).await.unwrap();
        app.clone().oneshot(submit("B", "Oak Ave")).await.unwrap();

        let response = app
            .oneshot(Request::get("/api/incidents/location?label=main%20st").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let rows = body_json(response).await;
        assert_eq!(rows.as_array().unwrap().len(), 1);
        assert_eq!(rows[0]["incident"]["title"], "A");
        assert_eq!(state.session().selected_location(), Some("main st"));
    }

    #[tokio::test]
    async fn test_analysis_round() {
        let state = state();
        let app = create_router(state.clone());
        app.clone().oneshot(submit("A", "Main St")).await.unwrap();

        let mut updates = state.analysis.subscribe();
        let response = app
            .clone()
            .oneshot(Request::post("/api/analysis").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        updates.wait_for(|s| !s.pending && s.result_text.is_some()).await.unwrap();
        let response = app
            .clone()
            .oneshot(Request::get("/api/analysis").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let analysis = body_json(response).await;
        assert_eq!(analysis["result_text"], "1 *points*");

        let response = app.oneshot(Request::get("/").body(Body::empty()).unwrap()).await.unwrap();
        let html = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(html.to_vec()).unwrap();
        assert!(html.contains("<strong>points</strong>"));
        assert!(html.contains("Main St"));
    }

    #[tokio::test]
    async fn test_places_with_incident_layer() {
        let state = state();
        let app = create_router(state.clone());
        app.clone().oneshot(submit("A", "Main St")).await.unwrap();

        let response = app
            .oneshot(Request::get("/api/places?q=park&incidents=true").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = body_json(response).await;
        let markers = body["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0]["kind"], "place");
        assert_eq!(markers[1]["band"], "CRITICAL");
    }

    #[tokio::test]
    async fn test_sheet_gestures() {
        let state = state();
        let app = create_router(state.clone());
        let (min, max) = {
            let bounds = state.sheet().bounds();
            (bounds.min(), bounds.max())
        };

        let response = app
            .clone()
            .oneshot(Request::get("/api/sheet").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let view = body_json(response).await;
        assert_eq!(view["offset"], min);
        assert_eq!(view["background"], "#364473");
        assert_eq!(view["dragging"], false);

        app.clone().oneshot(gesture(serde_json::json!({ "event": "start" }))).await.unwrap();
        let response = app
            .clone()
            .oneshot(gesture(serde_json::json!({ "event": "update", "delta": -10_000.0 })))
            .await
            .unwrap();
        let view = body_json(response).await;
        assert_eq!(view["offset"], max);
        assert_eq!(view["dragging"], true);

        let response = app.oneshot(gesture(serde_json::json!({ "event": "end" }))).await.unwrap();
        let view = body_json(response).await;
        assert_eq!(view["offset"], max);
        assert_eq!(view["top_edge"], 852.0 - max);
        assert_eq!(view["background"], "#1a1c38");
        assert_eq!(view["snap"]["to"], max);
        assert_eq!(view["snap"]["duration_ms"], 350);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>\"x\" & y</b>"), "&lt;b&gt;&quot;x&quot; &amp; y&lt;/b&gt;");
    }
}
