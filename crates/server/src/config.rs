use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;

use emotion_core::detection::domain::face_locator::{
    DetectorParams, DEFAULT_MIN_FACE_SIZE, MIN_SUPPORTED_FACE_SIZE,
};
use emotion_core::pipeline::detection_outcome::DominantSelection;
use emotion_core::shared::constants::{DETECTOR_MODEL_NAME, EMOTION_MODEL_NAME};

/// Facial emotion detection over HTTP, with a live annotated camera feed.
#[derive(Parser, Debug, Clone)]
#[command(name = "emotion-server", version)]
pub struct ServerConfig {
    /// Port to listen on (all interfaces).
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Emotion classification model (ONNX).
    #[arg(long, env = "EMOTION_MODEL", default_value = EMOTION_MODEL_NAME)]
    pub emotion_model: PathBuf,

    /// Face detector parameter file.
    #[arg(long, env = "FACE_DETECTOR_MODEL", default_value = DETECTOR_MODEL_NAME)]
    pub detector_model: PathBuf,

    /// Directory searched for model files given by name only.
    #[arg(long, env = "MODELS_DIR", default_value = "models")]
    pub models_dir: PathBuf,

    /// Capture device: an index ("0" = /dev/video0), a device path or a URL.
    #[arg(long, env = "CAMERA_DEVICE", default_value = "0")]
    pub camera: String,

    /// Image pyramid scale factor (> 1.0).
    #[arg(long, env = "DETECT_SCALE_FACTOR", default_value = "1.3")]
    pub scale_factor: f32,

    /// Smallest face to look for, in pixels.
    #[arg(long, env = "DETECT_MIN_FACE_SIZE", default_value_t = DEFAULT_MIN_FACE_SIZE)]
    pub min_face_size: u32,

    /// Detector score a window needs to count as a face.
    #[arg(long, env = "DETECT_SCORE_THRESHOLD", default_value = "2.0")]
    pub score_threshold: f64,

    /// Sliding window step, in pixels.
    #[arg(long, env = "DETECT_WINDOW_STEP", default_value = "4")]
    pub window_step: u32,

    /// Headline emotion for multi-face uploads: first or confident.
    #[arg(long, env = "DOMINANT_EMOTION", default_value = "first")]
    pub dominant: DominantSelection,

    /// JPEG quality of streamed frames (1-100).
    #[arg(long, env = "STREAM_JPEG_QUALITY", default_value = "80")]
    pub jpeg_quality: u8,

    /// Stream frames as captured instead of mirrored.
    #[arg(long, env = "STREAM_NO_MIRROR")]
    pub no_mirror: bool,

    /// Largest accepted upload, in MiB.
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "16")]
    pub max_upload_mb: usize,

    /// Return internal error messages to clients (development only).
    #[arg(long, env = "EXPOSE_ERRORS")]
    pub expose_errors: bool,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if !(self.scale_factor > 1.0) {
            return Err(format!(
                "Scale factor must be greater than 1.0, got {}",
                self.scale_factor
            )
            .into());
        }
        if self.min_face_size < MIN_SUPPORTED_FACE_SIZE {
            return Err(format!(
                "Minimum face size must be at least {MIN_SUPPORTED_FACE_SIZE}, got {}",
                self.min_face_size
            )
            .into());
        }
        if !(self.score_threshold > 0.0) {
            return Err(format!(
                "Score threshold must be positive, got {}",
                self.score_threshold
            )
            .into());
        }
        if self.window_step == 0 {
            return Err("Window step must be at least 1".into());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(format!(
                "JPEG quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )
            .into());
        }
        if self.max_upload_mb == 0 {
            return Err("Maximum upload size must be at least 1 MiB".into());
        }
        self.detector_params().validate()?;
        Ok(())
    }

    pub fn detector_params(&self) -> DetectorParams {
        DetectorParams {
            scale_factor: self.scale_factor,
            min_face_size: self.min_face_size,
            score_threshold: self.score_threshold,
            window_step: self.window_step,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn mirror(&self) -> bool {
        !self.no_mirror
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["emotion-server"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.port, 5000);
        assert_eq!(config.camera, "0");
        assert_eq!(config.dominant, DominantSelection::FirstDetected);
        assert_eq!(config.jpeg_quality, 80);
        assert!(config.mirror());
        assert!(!config.expose_errors);
        assert_eq!(config.detector_params(), DetectorParams::default());
        assert_eq!(config.max_upload_bytes(), 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_binds_all_interfaces() {
        let config = parse(&["--port", "8080"]);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_dominant_confident() {
        let config = parse(&["--dominant", "confident"]);
        assert_eq!(config.dominant, DominantSelection::HighestConfidence);
    }

    #[test]
    fn test_unknown_dominant_is_a_parse_error() {
        assert!(ServerConfig::try_parse_from(["emotion-server", "--dominant", "loud"]).is_err());
    }

    #[rstest]
    #[case(&["--scale-factor", "1.0"])]
    #[case(&["--scale-factor", "0.5"])]
    #[case(&["--min-face-size", "10"])]
    #[case(&["--score-threshold", "0"])]
    #[case(&["--window-step", "0"])]
    #[case(&["--jpeg-quality", "0"])]
    #[case(&["--max-upload-mb", "0"])]
    fn test_out_of_range_values_are_rejected(#[case] args: &[&str]) {
        assert!(parse(args).validate().is_err());
    }
}
