//! Emotion classifier backed by an ONNX export of the pretrained model.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::classification::domain::emotion::normalize_scores;
use crate::classification::domain::emotion_classifier::EmotionClassifier;
use crate::error::BoxError;

pub struct OnnxEmotionClassifier {
    session: Mutex<ort::session::Session>,
}

impl OnnxEmotionClassifier {
    /// Load the model once; the session is reused for every request.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(platform_accelerators())?
            .commit_from_file(model_path)?;
        log::info!("Loaded emotion model from {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

/// CoreML on macOS, DirectML on Windows. ONNX Runtime falls back to its CPU
/// provider when the list is empty or a provider fails to register.
fn platform_accelerators() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[allow(unused_mut)]
    let mut providers = Vec::new();
    #[cfg(target_os = "macos")]
    providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
    #[cfg(target_os = "windows")]
    providers.push(ort::execution_providers::DirectMLExecutionProvider::default().build());
    providers
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn classify(&self, patch: Array4<f32>) -> Result<Vec<f32>, BoxError> {
        let input_value = ort::value::Tensor::from_array(patch)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        let scores = outputs[0].try_extract_array::<f32>()?;

        // [1, 7] for a single patch
        let mut scores: Vec<f32> = scores.iter().copied().collect();
        normalize_scores(&mut scores);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    fn test_other_platforms_run_on_cpu() {
        assert!(platform_accelerators().is_empty());
    }

    #[test]
    fn test_missing_model_file_is_an_error() {
        let result = OnnxEmotionClassifier::new(Path::new("/nonexistent/emotion_model.onnx"));
        assert!(result.is_err());
    }
}
