pub const APP_DIR_NAME: &str = "emotion-server";

pub const EMOTION_MODEL_NAME: &str = "emotion_model.onnx";
pub const DETECTOR_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";

/// Side length of the square grayscale patch the emotion model expects.
pub const PATCH_SIZE: u32 = 64;

/// Label reported when an upload contains no detectable face.
pub const NO_FACE_LABEL: &str = "No face detected";

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Annotation color for boxes and labels (green).
pub const OVERLAY_COLOR: [u8; 3] = [0, 255, 0];

pub const NO_IMAGE_PROVIDED: &str = "No image provided";
pub const NO_IMAGE_SELECTED: &str = "No image selected";
