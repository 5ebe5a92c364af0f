//! Face location, emotion classification and live-stream annotation.
//!
//! Domain traits live under each area's `domain` module; the engines that
//! implement them (`rustface`, ONNX Runtime, ffmpeg, `image`) live under
//! `infrastructure`. The `pipeline` module wires them into the single-image
//! and streaming use cases.

pub mod error;

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod region;
}

pub mod detection {
    pub mod domain {
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod classification {
    pub mod domain {
        pub mod emotion;
        pub mod emotion_classifier;
        pub mod face_patch;
    }
    pub mod infrastructure;
}

pub mod capture {
    pub mod camera_session;
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure;
}

pub mod annotation {
    pub mod frame_annotator;
    pub mod glyphs;
}

pub mod video {
    pub mod domain {
        pub mod frame_encoder;
        pub mod multipart;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod detect_emotion_use_case;
    pub mod detection_outcome;
    pub mod face_emotion_analyzer;
    pub mod stream_emotions_use_case;
}
