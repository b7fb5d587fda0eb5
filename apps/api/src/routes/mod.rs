pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::datasets::handlers as datasets;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Datasets
        .route("/api/v1/datasets", get(datasets::handle_list_datasets))
        .route(
            "/api/v1/datasets/:kind",
            put(datasets::handle_put_dataset)
                .post(datasets::handle_upload_dataset)
                .delete(datasets::handle_clear_dataset),
        )
        // Analysis
        .route(
            "/api/v1/analysis",
            post(analysis::handle_run_analysis).get(analysis::handle_get_analysis),
        )
        .route(
            "/api/v1/analysis/recommendations",
            get(analysis::handle_get_recommendations),
        )
        .route("/api/v1/analysis/curves", get(analysis::handle_get_curves))
        .route(
            "/api/v1/analysis/retention",
            get(analysis::handle_get_retention),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::analysis::AverageRatioFitter;
    use crate::config::Config;

    const MMM: &str = "date,role,state,applications\n2024-01-01,Engineer,CA,50\n2024-02-01,Engineer,CA,70\n";
    const SPEND: &str = "date,role,state,spend\n2024-01-01,Engineer,CA,1000\n2024-02-01,Engineer,CA,2000\n";
    const HEADCOUNT: &str = "month,role,state,forecast_headcount,hires_signed\n2024-06,Engineer,CA,50,10\n";
    const ROSTER: &str = "employee_id,role,state,hire_date,termination_date\nE1,Engineer,CA,2023-01-01,2023-02-01\nE2,Engineer,CA,2023-01-01,\n";

    fn ashby() -> String {
        let mut csv = String::from("candidate_id,role,state,applied_at,hired_at,status\n");
        for i in 0..40 {
            let status = if i < 6 { "hired" } else { "screening" };
            csv.push_str(&format!("C{i},Engineer,CA,2024-01-01,,{status}\n"));
        }
        csv
    }

    fn app() -> Router {
        build_router(AppState::new(
            Config::default(),
            Arc::new(AverageRatioFitter),
        ))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Body) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn put_csv(app: &Router, kind: &str, csv: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::PUT,
            &format!("/api/v1/datasets/{kind}"),
            Body::from(csv.to_string()),
        )
        .await
    }

    async fn load_required(app: &Router) {
        for (kind, csv) in [
            ("mmm", MMM.to_string()),
            ("ashby", ashby()),
            ("spend", SPEND.to_string()),
            ("headcount", HEADCOUNT.to_string()),
        ] {
            let (status, _) = put_csv(app, kind, &csv).await;
            assert_eq!(status, StatusCode::OK, "loading {kind}");
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), Method::GET, "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_put_dataset_reports_rows() {
        let app = app();
        let (status, body) = put_csv(&app, "spend", SPEND).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "spend");
        assert_eq!(body["status"], "loaded");
        assert_eq!(body["rows"], 2);
        assert_eq!(body["message"], "2 rows loaded");
        assert_eq!(body["ready"], false);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_404() {
        let (status, body) = put_csv(&app(), "payroll", SPEND).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_schema_failure_clears_slot() {
        let app = app();
        put_csv(&app, "spend", SPEND).await;
        let (status, body) = put_csv(&app, "spend", "date,role,state\n2024-01-01,Engineer,CA").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("spend"));

        let (_, list) = send(&app, Method::GET, "/api/v1/datasets", Body::empty()).await;
        let spend = list["datasets"]
            .as_array()
            .unwrap()
            .iter()
            .find(|d| d["kind"] == "spend")
            .unwrap();
        assert_eq!(spend["status"], "error");
    }

    #[tokio::test]
    async fn test_analysis_requires_all_required_datasets() {
        let app = app();
        put_csv(&app, "mmm", MMM).await;
        let (status, body) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let message = body["error"]["message"].as_str().unwrap();
        assert!(message.contains("ashby"));
        assert!(!message.contains("mmm"));
    }

    #[tokio::test]
    async fn test_no_analysis_yet_is_404() {
        let (status, _) = send(&app(), Method::GET, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_full_flow() {
        let app = app();
        load_required(&app).await;

        let (_, list) = send(&app, Method::GET, "/api/v1/datasets", Body::empty()).await;
        assert_eq!(list["ready"], true);

        let (status, run) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(run["recommendations"][0]["gap"], 43);
        assert_eq!(run["recommendations"][0]["confidence"], "medium");
        assert_eq!(run["recommendations"][0]["recommendation"], "increase");
        assert_eq!(run["conversion_rates"][0]["role"], "Engineer");
        assert_eq!(run["summary"]["total_applications"], 120);
        assert!(run["retention"].is_null());

        let (status, _) = send(&app, Method::GET, "/api/v1/analysis/retention", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, curves) = send(&app, Method::GET, "/api/v1/analysis/curves", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(curves[0]["state"], "CA");

        let (_, latest) = send(&app, Method::GET, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(latest["run_id"], run["run_id"]);
    }

    #[tokio::test]
    async fn test_rerun_replaces_latest_and_roster_unlocks_retention() {
        let app = app();
        load_required(&app).await;
        let (_, first) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;

        put_csv(&app, "roster", ROSTER).await;
        let (_, second) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;
        assert_ne!(first["run_id"], second["run_id"]);

        let (status, retention) =
            send(&app, Method::GET, "/api/v1/analysis/retention", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(retention[0]["retained_90"], 1);
        assert_eq!(retention[0]["total"], 2);
    }

    #[tokio::test]
    async fn test_failed_run_keeps_previous_result() {
        let app = app();
        load_required(&app).await;
        let (_, first) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;

        let (status, _) = send(&app, Method::DELETE, "/api/v1/datasets/mmm", Body::empty()).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::POST, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, latest) = send(&app, Method::GET, "/api/v1/analysis", Body::empty()).await;
        assert_eq!(latest["run_id"], first["run_id"]);
    }

    #[tokio::test]
    async fn test_multipart_upload() {
        let app = app();
        let boundary = "hireplan-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"spend.csv\"\r\nContent-Type: text/csv\r\n\r\n{SPEND}\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/datasets/spend")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
