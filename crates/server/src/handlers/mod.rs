//! HTTP request handlers.

pub mod detect;
pub mod health;
pub mod index;
pub mod video_feed;

pub use detect::detect_emotion;
pub use health::health;
pub use index::index;
pub use video_feed::video_feed;
