//! Shared application state.

use std::sync::Arc;

use emotion_core::annotation::frame_annotator::FrameAnnotator;
use emotion_core::capture::camera_session::CameraSession;
use emotion_core::capture::domain::frame_source::FrameSource;
use emotion_core::capture::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use emotion_core::classification::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use emotion_core::detection::infrastructure::rustface_locator::RustfaceLocator;
use emotion_core::pipeline::detect_emotion_use_case::DetectEmotionUseCase;
use emotion_core::pipeline::detection_outcome::DominantSelection;
use emotion_core::pipeline::face_emotion_analyzer::FaceEmotionAnalyzer;
use emotion_core::pipeline::stream_emotions_use_case::StreamEmotionsUseCase;
use emotion_core::shared::model_resolver;
use emotion_core::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;

use crate::config::ServerConfig;

/// Knobs that shape responses rather than models.
#[derive(Clone, Copy, Debug)]
pub struct StateOptions {
    pub dominant: DominantSelection,
    pub jpeg_quality: u8,
    pub mirror: bool,
    pub expose_errors: bool,
}

impl Default for StateOptions {
    fn default() -> Self {
        Self {
            dominant: DominantSelection::default(),
            jpeg_quality: emotion_core::shared::constants::DEFAULT_JPEG_QUALITY,
            mirror: true,
            expose_errors: false,
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub detect: Arc<DetectEmotionUseCase>,
    pub stream: Arc<StreamEmotionsUseCase>,
    pub camera: Arc<CameraSession>,
    pub expose_errors: bool,
}

impl AppState {
    pub fn new(
        analyzer: Arc<FaceEmotionAnalyzer>,
        camera: Arc<CameraSession>,
        options: StateOptions,
    ) -> Self {
        let detect = DetectEmotionUseCase::new(Arc::clone(&analyzer), options.dominant);
        let stream = StreamEmotionsUseCase::new(
            Arc::clone(&camera),
            analyzer,
            FrameAnnotator::default(),
            Box::new(JpegFrameEncoder::new(options.jpeg_quality)),
            options.mirror,
        );
        Self {
            detect: Arc::new(detect),
            stream: Arc::new(stream),
            camera,
            expose_errors: options.expose_errors,
        }
    }

    /// Resolves and loads both models; the camera stays closed until the
    /// first stream asks for it.
    pub fn from_config(config: &ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let models_dir = Some(config.models_dir.as_path());

        log::info!("Resolving face detector: {}", config.detector_model.display());
        let detector_path = model_resolver::resolve(&config.detector_model, models_dir)?;
        let locator = RustfaceLocator::new(&detector_path, config.detector_params())?;

        log::info!("Resolving emotion model: {}", config.emotion_model.display());
        let emotion_path = model_resolver::resolve(&config.emotion_model, models_dir)?;
        let classifier = OnnxEmotionClassifier::new(&emotion_path)?;

        let analyzer = FaceEmotionAnalyzer::new(Arc::new(locator), Arc::new(classifier));

        let device = config.camera.clone();
        let camera = CameraSession::new(Box::new(move || {
            FfmpegCameraSource::open(&device).map(|source| Box::new(source) as Box<dyn FrameSource>)
        }));

        Ok(Self::new(
            Arc::new(analyzer),
            Arc::new(camera),
            StateOptions {
                dominant: config.dominant,
                jpeg_quality: config.jpeg_quality,
                mirror: config.mirror(),
                expose_errors: config.expose_errors,
            },
        ))
    }
}
