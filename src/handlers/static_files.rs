use actix_web::{web, HttpResponse, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::passkey::WebauthnRepository;
use crate::settings::PasskeyStoreSettings;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub active_sessions: usize,
}

/// Health check endpoint
///
/// # Errors
/// Returns an error if health status cannot be determined
pub async fn health(repository: web::Data<WebauthnRepository>) -> Result<HttpResponse> {
    let response = HealthResponse {
        status: "ok".to_string(),
        active_sessions: repository.active_sessions().await,
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Serve static files from the configured static directory
///
/// An empty path serves `index.html`. Paths containing `..` are refused.
///
/// # Errors
///
/// Returns an error if the response cannot be built
pub async fn serve_static(
    path: web::Path<String>,
    settings: web::Data<PasskeyStoreSettings>,
) -> Result<HttpResponse> {
    let requested = path.into_inner();
    let filename = if requested.is_empty() || requested.ends_with('/') {
        format!("{requested}index.html")
    } else {
        requested
    };

    if filename.split('/').any(|segment| segment == "..") {
        debug!("Rejected static path with parent traversal: {filename}");
        return Ok(not_found());
    }

    let file_path = format!("{}/{}", settings.static_files.assets_folder, filename);
    debug!("Attempting to serve static file: {file_path}");

    fs::read(&file_path).map_or_else(
        |_| {
            debug!("Static file not found: {file_path}");
            Ok(not_found())
        },
        |contents| Ok(HttpResponse::Ok().content_type(content_type(&file_path)).body(contents)),
    )
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "error": "not_found",
        "message": "File not found"
    }))
}

fn content_type(file_path: &str) -> &'static str {
    match file_path.split('.').next_back() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::PasskeyRepository;
    use crate::settings::StaticFilesSettings;
    use crate::testing::MemoryStore;
    use actix_web::{test as actix_test, App};
    use std::sync::Arc;

    fn settings_for(dir: &std::path::Path) -> PasskeyStoreSettings {
        PasskeyStoreSettings {
            static_files: StaticFilesSettings {
                assets_folder: dir.display().to_string(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("public/index.html"), "text/html");
        assert_eq!(content_type("public/app.js"), "application/javascript");
        assert_eq!(content_type("public/README"), "text/plain");
    }

    #[actix_web::test]
    async fn test_parent_traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(settings_for(dir.path())))
                .route("/{filename:.*}", web::get().to(serve_static)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/a/../../secret").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_serves_index_for_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>passkeys</h1>").unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(settings_for(dir.path())))
                .route("/{filename:.*}", web::get().to(serve_static)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        let body = actix_test::read_body(resp).await;
        assert_eq!(body.as_ref(), b"<h1>passkeys</h1>");
    }

    #[actix_web::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();

        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(settings_for(dir.path())))
                .route("/{filename:.*}", web::get().to(serve_static)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/nope.js").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_health_reports_sessions() {
        let repo: WebauthnRepository = PasskeyRepository::new(Arc::new(MemoryStore::new()), None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(repo))
                .route("/ping", web::get().to(health)),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/ping").to_request();
        let resp: HealthResponse = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.active_sessions, 0);
    }
}
