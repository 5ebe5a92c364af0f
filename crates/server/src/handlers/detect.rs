use axum::body::Bytes;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use emotion_core::classification::domain::emotion::{Emotion, EmotionResult};
use emotion_core::pipeline::detect_emotion_use_case::validate_upload;
use emotion_core::pipeline::detection_outcome::DetectionOutcome;
use emotion_core::shared::constants::{NO_FACE_LABEL, NO_IMAGE_PROVIDED};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DetectionResponse {
    Faces {
        emotion: Emotion,
        confidence: f32,
        faces_detected: usize,
        all_emotions: Vec<EmotionResult>,
    },
    NoFace {
        emotion: &'static str,
        confidence: u8,
    },
}

impl From<DetectionOutcome> for DetectionResponse {
    fn from(outcome: DetectionOutcome) -> Self {
        match outcome {
            DetectionOutcome::NoFace => DetectionResponse::NoFace {
                emotion: NO_FACE_LABEL,
                confidence: 0,
            },
            DetectionOutcome::Faces { results, dominant } => DetectionResponse::Faces {
                emotion: dominant.emotion,
                confidence: dominant.confidence,
                faces_detected: results.len(),
                all_emotions: results.into_iter().map(|face| face.result).collect(),
            },
        }
    }
}

/// The `image` file part of an upload form.
struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Classify the faces in an uploaded image.
///
/// POST /detect-emotion (multipart/form-data, field `image`)
pub async fn detect_emotion(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<DetectionResponse>> {
    let upload = match multipart {
        Ok(multipart) => find_image(multipart).await?,
        Err(rejection) => {
            log::debug!("Upload is not multipart: {rejection}");
            None
        }
    };
    validate_upload(upload.as_ref().map(|u| u.file_name.as_str()))
        .map_err(|e| ApiError::from_emotion(e, state.expose_errors))?;
    let Some(upload) = upload else {
        return Err(ApiError::bad_request(NO_IMAGE_PROVIDED));
    };

    let use_case = state.detect.clone();
    let outcome = tokio::task::spawn_blocking(move || use_case.execute(&upload.bytes))
        .await
        .map_err(|e| ApiError::internal(e, state.expose_errors))?
        .map_err(|e| ApiError::from_emotion(e, state.expose_errors))?;

    Ok(Json(outcome.into()))
}

/// Returns the first file part named `image`. Plain form fields with that
/// name do not count as an upload.
async fn find_image(mut multipart: Multipart) -> ApiResult<Option<Upload>> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(e) => return malformed(e),
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        return match field.bytes().await {
            Ok(bytes) => Ok(Some(Upload { file_name, bytes })),
            Err(e) => malformed(e),
        };
    }
}

fn malformed(err: MultipartError) -> ApiResult<Option<Upload>> {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(ApiError::PayloadTooLarge(err.body_text()));
    }
    log::debug!("Malformed multipart body: {err}");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotion_core::pipeline::face_emotion_analyzer::FaceEmotion;
    use emotion_core::shared::region::Region;

    fn result(emotion: Emotion, confidence: f32) -> EmotionResult {
        EmotionResult {
            emotion,
            confidence,
        }
    }

    #[test]
    fn test_no_face_body() {
        let body = serde_json::to_value(DetectionResponse::from(DetectionOutcome::NoFace)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"emotion": "No face detected", "confidence": 0})
        );
    }

    #[test]
    fn test_faces_body() {
        let outcome = DetectionOutcome::Faces {
            results: vec![
                FaceEmotion {
                    region: Region::new(0, 0, 10, 10),
                    result: result(Emotion::Happy, 0.5),
                },
                FaceEmotion {
                    region: Region::new(20, 0, 10, 10),
                    result: result(Emotion::Sad, 0.25),
                },
            ],
            dominant: result(Emotion::Happy, 0.5),
        };
        let body = serde_json::to_value(DetectionResponse::from(outcome)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "emotion": "Happy",
                "confidence": 0.5,
                "faces_detected": 2,
                "all_emotions": [
                    {"emotion": "Happy", "confidence": 0.5},
                    {"emotion": "Sad", "confidence": 0.25}
                ]
            })
        );
    }
}
