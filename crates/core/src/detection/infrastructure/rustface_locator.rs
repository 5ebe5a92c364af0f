//! Cascade face locator backed by `rustface` (funnel-structured cascade).
use std::path::Path;
use std::sync::Mutex;

use image::GrayImage;

use crate::detection::domain::face_locator::{DetectorParams, FaceLocator};
use crate::error::BoxError;
use crate::shared::region::Region;

struct CascadeDetector(Box<dyn rustface::Detector>);

// Safety: the detector is only ever touched through the surrounding Mutex,
// so it is never accessed from two threads at once.
unsafe impl Send for CascadeDetector {}

pub struct RustfaceLocator {
    detector: Mutex<CascadeDetector>,
}

impl RustfaceLocator {
    /// Load the cascade parameter file and apply the tuning knobs.
    pub fn new(model_path: &Path, params: DetectorParams) -> Result<Self, Box<dyn std::error::Error>> {
        params.validate()?;

        let path = model_path.to_str().ok_or("Invalid detector model path")?;
        let mut detector = rustface::create_detector(path)
            .map_err(|e| format!("Failed to load face detector {path}: {e}"))?;
        detector.set_min_face_size(params.min_face_size);
        detector.set_score_thresh(params.score_threshold);
        detector.set_pyramid_scale_factor(params.pyramid_step());
        detector.set_slide_window_step(params.window_step, params.window_step);

        log::info!("Loaded face detector from {}", model_path.display());
        Ok(Self {
            detector: Mutex::new(CascadeDetector(detector)),
        })
    }
}

impl FaceLocator for RustfaceLocator {
    fn locate(&self, gray: &GrayImage) -> Result<Vec<Region>, BoxError> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let image = rustface::ImageData::new(gray.as_raw(), width, height);
        let faces = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|e| format!("Lock poisoned: {e}"))?;
            detector.0.detect(&image)
        };

        Ok(faces
            .iter()
            .filter_map(|face| {
                let bbox = face.bbox();
                Region::new(bbox.x(), bbox.y(), bbox.width() as i32, bbox.height() as i32)
                    .clamp_to(width, height)
            })
            .collect())
    }
}
