use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::StreamExt;
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use tower::ServiceExt;

use emotion_core::capture::camera_session::CameraSession;
use emotion_core::capture::domain::frame_source::FrameSource;
use emotion_core::classification::domain::emotion_classifier::EmotionClassifier;
use emotion_core::detection::domain::face_locator::FaceLocator;
use emotion_core::error::{BoxError, CaptureError};
use emotion_core::pipeline::face_emotion_analyzer::FaceEmotionAnalyzer;
use emotion_core::shared::frame::Frame;
use emotion_core::shared::region::Region;
use emotion_server::{create_router, AppState, StateOptions};

const BOUNDARY: &str = "XTESTBOUNDARY";
const MAX_UPLOAD: usize = 1024 * 1024;

// --- Stubs ---

struct StubLocator(Vec<Region>);

impl FaceLocator for StubLocator {
    fn locate(&self, _gray: &image::GrayImage) -> Result<Vec<Region>, BoxError> {
        Ok(self.0.clone())
    }
}

/// Always "Happy" with 0.9.
struct HappyClassifier;

impl EmotionClassifier for HappyClassifier {
    fn classify(&self, _patch: Array4<f32>) -> Result<Vec<f32>, BoxError> {
        Ok(vec![0.01, 0.01, 0.02, 0.9, 0.02, 0.02, 0.02])
    }
}

/// Hands out one queued score vector per face.
struct QueuedClassifier(Mutex<VecDeque<Vec<f32>>>);

impl EmotionClassifier for QueuedClassifier {
    fn classify(&self, _patch: Array4<f32>) -> Result<Vec<f32>, BoxError> {
        self.0
            .lock()
            .map_err(|_| "classifier poisoned")?
            .pop_front()
            .ok_or_else(|| "no scores queued".into())
    }
}

struct GrayCamera;

impl FrameSource for GrayCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        Ok(Frame::new(vec![100; 64 * 48 * 3], 64, 48, 0))
    }
}

/// Opens fine, then never delivers a frame.
struct UnpluggedCamera;

impl FrameSource for UnpluggedCamera {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        Err(CaptureError::Read("No such device".into()))
    }
}

fn working_camera() -> Arc<CameraSession> {
    Arc::new(CameraSession::new(Box::new(|| {
        Ok(Box::new(GrayCamera) as Box<dyn FrameSource>)
    })))
}

fn missing_camera() -> Arc<CameraSession> {
    Arc::new(CameraSession::new(Box::new(|| {
        Err::<Box<dyn FrameSource>, _>(CaptureError::Open {
            device: "/dev/video0".into(),
            source: "No such file or directory".into(),
        })
    })))
}

fn app_with(regions: Vec<Region>, camera: Arc<CameraSession>, expose_errors: bool) -> Router {
    let analyzer = FaceEmotionAnalyzer::new(Arc::new(StubLocator(regions)), Arc::new(HappyClassifier));
    let state = AppState::new(
        Arc::new(analyzer),
        camera,
        StateOptions {
            expose_errors,
            ..StateOptions::default()
        },
    );
    create_router(state, MAX_UPLOAD)
}

fn app(regions: Vec<Region>) -> Router {
    app_with(regions, working_camera(), false)
}

// --- Request helpers ---

fn png() -> Vec<u8> {
    let img = RgbImage::from_pixel(120, 90, Rgb([140, 120, 100]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn multipart_body(name: &str, file_name: Option<&str>, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match file_name {
        Some(f) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        ),
    }
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/detect-emotion")
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

async fn json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health() {
    let response = app(vec![]).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_ignores_camera_state() {
    let response = app_with(vec![], missing_camera(), false)
        .oneshot(get("/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_index_serves_html() {
    let response = app(vec![]).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert!(content_type.starts_with("text/html"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/detect-emotion"));
    assert!(html.contains("/video_feed"));
}

#[tokio::test]
async fn test_single_face_upload() {
    let response = app(vec![Region::new(20, 20, 50, 50)])
        .oneshot(upload(multipart_body("image", Some("face.png"), &png())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["emotion"], "Happy");
    assert_eq!(body["faces_detected"], 1);
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((confidence - 0.9).abs() < 1e-6);
    assert_eq!(body["all_emotions"].as_array().unwrap().len(), 1);
    assert_eq!(body["all_emotions"][0]["emotion"], "Happy");
}

#[tokio::test]
async fn test_every_face_is_reported() {
    let regions = vec![Region::new(0, 0, 40, 40), Region::new(60, 30, 40, 40)];
    let response = app(regions)
        .oneshot(upload(multipart_body("image", Some("group.png"), &png())))
        .await
        .unwrap();
    let body = json(response).await;
    assert_eq!(body["faces_detected"], 2);
    assert_eq!(body["all_emotions"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_no_face_upload() {
    let response = app(vec![])
        .oneshot(upload(multipart_body("image", Some("wall.png"), &png())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json(response).await,
        serde_json::json!({"emotion": "No face detected", "confidence": 0})
    );
}

#[tokio::test]
async fn test_missing_image_field() {
    let response = app(vec![])
        .oneshot(upload(multipart_body("photo", Some("face.png"), &png())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(response).await,
        serde_json::json!({"error": "No image provided"})
    );
}

#[tokio::test]
async fn test_image_field_without_file_is_not_an_upload() {
    let response = app(vec![])
        .oneshot(upload(multipart_body("image", None, b"hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "No image provided");
}

#[tokio::test]
async fn test_not_multipart_at_all() {
    let request = Request::builder()
        .method("POST")
        .uri("/detect-emotion")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app(vec![]).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json(response).await["error"], "No image provided");
}

#[tokio::test]
async fn test_empty_file_name() {
    let response = app(vec![])
        .oneshot(upload(multipart_body("image", Some(""), b"")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(response).await,
        serde_json::json!({"error": "No image selected"})
    );
}

#[tokio::test]
async fn test_undecodable_upload_is_masked_500() {
    let response = app(vec![])
        .oneshot(upload(multipart_body("image", Some("x.png"), b"not an image")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json(response).await,
        serde_json::json!({"error": "Internal server error"})
    );
}

#[tokio::test]
async fn test_undecodable_upload_exposes_message_when_enabled() {
    let response = app_with(vec![], working_camera(), true)
        .oneshot(upload(multipart_body("image", Some("x.png"), b"not an image")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(response).await;
    assert!(body["error"].as_str().unwrap().contains("decode"));
}

#[tokio::test]
async fn test_video_feed_without_camera_is_503() {
    let response = app_with(vec![], missing_camera(), false)
        .oneshot(get("/video_feed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json(response).await,
        serde_json::json!({"error": "Camera unavailable"})
    );
}

#[tokio::test]
async fn test_video_feed_streams_jpeg_parts() {
    let camera = working_camera();
    let response = app_with(vec![Region::new(10, 10, 30, 30)], camera.clone(), false)
        .oneshot(get("/video_feed"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "multipart/x-mixed-replace; boundary=frame"
    );
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
    assert!(camera.is_streaming());

    let mut body = response.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    let header_bytes = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
    assert!(first.starts_with(header_bytes));
    assert_eq!(&first[header_bytes.len()..header_bytes.len() + 2], &[0xFF, 0xD8]);
    assert!(first.ends_with(b"\r\n"));

    camera.stop();
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app(vec![]).oneshot(request).await.unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let big = vec![0u8; MAX_UPLOAD + 1024];
    let response = app(vec![])
        .oneshot(upload(multipart_body("image", Some("big.png"), &big)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_repeated_upload_gives_same_label() {
    let app = app(vec![Region::new(20, 20, 50, 50)]);
    let mut labels = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(upload(multipart_body("image", Some("face.png"), &png())))
            .await
            .unwrap();
        let body = json(response).await;
        let confidence = body["confidence"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&confidence));
        labels.push(body["emotion"].clone());
    }
    assert_eq!(labels[0], labels[1]);
}

#[tokio::test]
async fn test_video_feed_releases_camera_when_client_leaves_during_failures() {
    let camera = Arc::new(CameraSession::new(Box::new(|| {
        Ok(Box::new(UnpluggedCamera) as Box<dyn FrameSource>)
    })));
    let response = app_with(vec![], camera.clone(), false)
        .oneshot(get("/video_feed"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(camera.is_open());

    drop(response);

    let mut released = false;
    for _ in 0..200 {
        if !camera.is_open() {
            released = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(released);
    assert_eq!(camera.consumers(), 0);
}

#[tokio::test]
async fn test_default_dominant_is_the_first_face() {
    let regions = vec![Region::new(0, 0, 40, 40), Region::new(60, 30, 40, 40)];
    let scores = VecDeque::from([
        vec![0.05, 0.05, 0.05, 0.05, 0.6, 0.1, 0.1],
        vec![0.01, 0.01, 0.02, 0.9, 0.02, 0.02, 0.02],
    ]);
    let analyzer = FaceEmotionAnalyzer::new(
        Arc::new(StubLocator(regions)),
        Arc::new(QueuedClassifier(Mutex::new(scores))),
    );
    let state = AppState::new(Arc::new(analyzer), working_camera(), StateOptions::default());

    let response = create_router(state, MAX_UPLOAD)
        .oneshot(upload(multipart_body("image", Some("pair.png"), &png())))
        .await
        .unwrap();
    let body = json(response).await;

    assert_eq!(body["faces_detected"], 2);
    assert_eq!(body["emotion"], body["all_emotions"][0]["emotion"]);
    assert_eq!(body["emotion"], "Sad");
    assert_eq!(body["all_emotions"][1]["emotion"], "Happy");
    let confidence = body["confidence"].as_f64().unwrap();
    assert!((confidence - 0.6).abs() < 1e-6);
}
