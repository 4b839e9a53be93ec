//! HTTP router.
//!
//! Every route is served twice: at the root and under `/api/` (the prefix the
//! web frontend calls). Layers, innermost first: body limit → CORS → tracing.

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Upload ceiling, including multipart overhead.
pub const MAX_UPLOAD_BYTES: usize = 55 * 1024 * 1024;

/// Browser origins of the bundled frontend dev server.
const ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

/// Build the application router.
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/analyze", post(endpoints::analyze::analyze))
        .route("/download/risk", get(endpoints::download::risk))
        .route("/download/md", get(endpoints::download::markdown))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx);

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(ALLOWED_ORIGINS.map(HeaderValue::from_static))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Settings;
    use crate::pipeline::artifacts::{AnalysisId, Artifact};
    use crate::pipeline::processor::PolicyPipeline;
    use crate::pipeline::recovery::UNPARSED_NOTE;
    use crate::pipeline::upstage::MockDocumentAi;

    const BOUNDARY: &str = "policy-risk-test-boundary";

    fn risk_json() -> String {
        let finding = json!({
            "title": "제3자 제공 범위 불명확",
            "why_it_matters": "동의 범위를 벗어날 수 있음",
            "evidence_quotes": ["제휴사에 제공할 수 있습니다"],
            "recommendations": ["제공 대상 명시"],
            "severity": "HIGH"
        });
        json!({
            "risk_score": 70,
            "risk_level": "HIGH",
            "top_findings": vec![finding; 5],
            "quick_checklist": ["제공 대상 목록"],
            "assumptions_and_limits": ["본문만 검토"]
        })
        .to_string()
    }

    fn mock() -> MockDocumentAi {
        MockDocumentAi::new()
            .with_document_parse(json!({"content": {"html": "<p>제휴사에 제공할 수 있습니다</p>"}}))
            .with_extraction(r#"{"third_party_sharing_or_outsourcing": ["제휴사"]}"#)
            .with_chat(&risk_json())
    }

    fn test_app(client: MockDocumentAi) -> (tempfile::TempDir, ApiContext, Router) {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::new("key", tmp.path());
        let ctx = ApiContext::new(PolicyPipeline::new(settings, Arc::new(client)));
        let app = api_router(ctx.clone());
        (tmp, ctx, app)
    }

    fn upload_request(uri: &str, field: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"privacy policy.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn seed_report(ctx: &ApiContext, id: &str, report: &Value) {
        let id = AnalysisId::parse(id).unwrap();
        let dir = ctx.store().resolve(Some(&id)).unwrap();
        dir.write_json(Artifact::RiskReport, report).unwrap();
        dir.write_text(Artifact::ReportMarkdown, "# Policy Risk Report\n")
            .unwrap();
    }

    #[tokio::test]
    async fn health_is_served_at_root_and_api_prefix() {
        let (_tmp, _ctx, app) = test_app(mock());
        for uri in ["/health", "/api/health"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            let json = json_body(response).await;
            assert_eq!(json["ok"], true);
            assert_eq!(json["version"], crate::config::APP_VERSION);
        }
    }

    #[tokio::test]
    async fn analyze_runs_pipeline_and_returns_risk() {
        let (_tmp, ctx, app) = test_app(mock());

        let response = app
            .oneshot(upload_request("/api/analyze", "file", b"%PDF-1.4 policy"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["has_md"], true);
        assert_eq!(json["risk"]["risk_score"], 70);
        assert_eq!(json["risk"]["top_findings"].as_array().unwrap().len(), 5);

        let id = AnalysisId::parse(json["analysis_id"].as_str().unwrap()).unwrap();
        let dir = ctx.store().lookup(&id).unwrap();
        for artifact in Artifact::ALL {
            assert!(dir.exists(artifact), "{artifact}");
        }
        let upload = ctx
            .pipeline
            .settings()
            .samples_dir()
            .join(format!("{id}_privacy_policy.pdf"));
        assert!(upload.is_file());
    }

    #[tokio::test]
    async fn analyze_returns_wrapper_for_unparseable_output() {
        let (_tmp, _ctx, app) = test_app(mock().with_chat("죄송합니다, 평가할 수 없습니다."));

        let response = app
            .oneshot(upload_request("/analyze", "file", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["risk"]["raw_text"], "죄송합니다, 평가할 수 없습니다.");
        assert_eq!(json["risk"]["note"], UNPARSED_NOTE);
    }

    #[tokio::test]
    async fn analyze_pipeline_failure_returns_500_with_id() {
        let (_tmp, _ctx, app) = test_app(mock().failing_document_parse(401, "bad key"));

        let response = app
            .oneshot(upload_request("/api/analyze", "file", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["ok"], false);
        assert!(json["analysis_id"].is_string());
        assert!(json["error"].as_str().unwrap().contains("401"));
    }

    #[tokio::test]
    async fn analyze_without_file_field_is_bad_request() {
        let (_tmp, _ctx, app) = test_app(mock());

        let response = app
            .oneshot(upload_request("/api/analyze", "attachment", b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file provided.");
    }

    #[tokio::test]
    async fn download_risk_normalizes_wrapper() {
        let (_tmp, ctx, app) = test_app(mock());
        seed_report(
            &ctx,
            "wrapped",
            &json!({"raw_text": "{\"risk_score\": 40}", "note": UNPARSED_NOTE}),
        );

        let response = app
            .oneshot(get("/api/download/risk?analysis_id=wrapped"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"risk_score": 40}));
    }

    #[tokio::test]
    async fn download_md_is_an_attachment() {
        let (_tmp, ctx, app) = test_app(mock());
        seed_report(&ctx, "done", &json!({"risk_score": 1}));

        let response = app
            .oneshot(get("/download/md?analysis_id=done"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/markdown; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"policy-risk-report-done.md\""
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"# Policy Risk Report\n");
    }

    #[tokio::test]
    async fn downloads_for_unknown_ids_return_404() {
        let (_tmp, _ctx, app) = test_app(mock());
        for uri in [
            "/api/download/risk?analysis_id=missing",
            "/api/download/md?analysis_id=missing",
            "/download/risk?analysis_id=..%2F..%2Fetc",
        ] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let json = json_body(response).await;
            assert_eq!(json["ok"], false);
            assert!(json["error"].as_str().unwrap().contains("not found"));
        }
    }

    #[tokio::test]
    async fn download_md_missing_file_is_404_even_if_dir_exists() {
        let (_tmp, ctx, app) = test_app(mock());
        let id = AnalysisId::parse("partial").unwrap();
        ctx.store().resolve(Some(&id)).unwrap();

        let response = app
            .oneshot(get("/download/md?analysis_id=partial"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await["error"],
            "report.md not found for analysis_id=partial"
        );
    }

    #[tokio::test]
    async fn download_risk_keeps_reports_with_extra_raw_text() {
        let (_tmp, ctx, app) = test_app(mock());
        let report = json!({"risk_score": 50, "risk_level": "MEDIUM", "raw_text": "see appendix"});
        seed_report(&ctx, "annotated", &report);

        let response = app
            .oneshot(get("/download/risk?analysis_id=annotated"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, report);
    }

    #[tokio::test]
    async fn corrupt_artifacts_are_structured_404s() {
        let (_tmp, ctx, app) = test_app(mock());
        let id = AnalysisId::parse("corrupt").unwrap();
        let dir = ctx.store().resolve(Some(&id)).unwrap();
        std::fs::write(dir.artifact_path(Artifact::RiskReport), "{not json").unwrap();
        std::fs::write(dir.artifact_path(Artifact::ReportMarkdown), [0xff, 0xfe, 0x00]).unwrap();

        for (uri, name) in [
            ("/api/download/risk?analysis_id=corrupt", "risk_report.json"),
            ("/api/download/md?analysis_id=corrupt", "report.md"),
        ] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
            let json = json_body(response).await;
            assert_eq!(json["ok"], false);
            assert_eq!(
                json["error"],
                format!("{name} is unreadable for analysis_id=corrupt")
            );
        }
    }

    #[tokio::test]
    async fn download_without_id_is_bad_request() {
        let (_tmp, _ctx, app) = test_app(mock());
        let response = app.oneshot(get("/download/risk")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cors_allows_frontend_origin() {
        let (_tmp, _ctx, app) = test_app(mock());
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (_tmp, _ctx, app) = test_app(mock());
        let response = app.oneshot(get("/nonexistent")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
