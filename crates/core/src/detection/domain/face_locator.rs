use image::GrayImage;
use thiserror::Error;

use crate::error::BoxError;
use crate::shared::region::Region;

pub const DEFAULT_SCALE_FACTOR: f32 = 1.3;
pub const DEFAULT_MIN_FACE_SIZE: u32 = 20;
pub const DEFAULT_SCORE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_WINDOW_STEP: u32 = 4;

/// Smallest face the cascade can be asked for.
pub const MIN_SUPPORTED_FACE_SIZE: u32 = 20;

/// Domain interface for face localization.
///
/// Implementations return regions that lie fully inside the image, in the
/// detector's own scan order.
pub trait FaceLocator: Send + Sync {
    fn locate(&self, gray: &GrayImage) -> Result<Vec<Region>, BoxError>;
}

#[derive(Error, Debug, PartialEq)]
pub enum DetectorParamsError {
    #[error("scale factor must be greater than 1.0 and at most 100, got {0}")]
    ScaleFactor(f32),
    #[error("minimum face size must be at least {MIN_SUPPORTED_FACE_SIZE}, got {0}")]
    MinFaceSize(u32),
    #[error("score threshold must be positive, got {0}")]
    ScoreThreshold(f64),
    #[error("window step must be positive")]
    WindowStep,
}

/// Tuning knobs for the cascade detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorParams {
    /// Ratio between consecutive image pyramid levels (> 1).
    pub scale_factor: f32,
    /// Smallest face side, in pixels, the detector searches for.
    pub min_face_size: u32,
    /// Minimum cascade score for a window to count as a face.
    pub score_threshold: f64,
    /// Sliding window step, in pixels, on both axes.
    pub window_step: u32,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_SCALE_FACTOR,
            min_face_size: DEFAULT_MIN_FACE_SIZE,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            window_step: DEFAULT_WINDOW_STEP,
        }
    }
}

impl DetectorParams {
    pub fn validate(&self) -> Result<(), DetectorParamsError> {
        // pyramid step = 1 / scale_factor must stay inside (0.01, 0.99)
        if !(self.scale_factor > 1.0 / 0.99 && self.scale_factor <= 100.0) {
            return Err(DetectorParamsError::ScaleFactor(self.scale_factor));
        }
        if self.min_face_size < MIN_SUPPORTED_FACE_SIZE {
            return Err(DetectorParamsError::MinFaceSize(self.min_face_size));
        }
        if !(self.score_threshold > 0.0) {
            return Err(DetectorParamsError::ScoreThreshold(self.score_threshold));
        }
        if self.window_step == 0 {
            return Err(DetectorParamsError::WindowStep);
        }
        Ok(())
    }

    /// Downscale ratio between pyramid levels, as the cascade expects it.
    pub fn pyramid_step(&self) -> f32 {
        1.0 / self.scale_factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults_are_valid() {
        let params = DetectorParams::default();
        assert_eq!(params.validate(), Ok(()));
        assert_relative_eq!(params.scale_factor, 1.3);
        assert_eq!(params.min_face_size, 20);
    }

    #[test]
    fn test_pyramid_step_inverts_scale_factor() {
        let params = DetectorParams {
            scale_factor: 1.25,
            ..DetectorParams::default()
        };
        assert_relative_eq!(params.pyramid_step(), 0.8);
    }

    #[rstest]
    #[case::scale_one(DetectorParams { scale_factor: 1.0, ..DetectorParams::default() })]
    #[case::scale_below_one(DetectorParams { scale_factor: 0.8, ..DetectorParams::default() })]
    #[case::scale_nan(DetectorParams { scale_factor: f32::NAN, ..DetectorParams::default() })]
    #[case::face_too_small(DetectorParams { min_face_size: 12, ..DetectorParams::default() })]
    #[case::zero_threshold(DetectorParams { score_threshold: 0.0, ..DetectorParams::default() })]
    #[case::zero_step(DetectorParams { window_step: 0, ..DetectorParams::default() })]
    fn test_invalid_params_are_rejected(#[case] params: DetectorParams) {
        assert!(params.validate().is_err());
    }
}
