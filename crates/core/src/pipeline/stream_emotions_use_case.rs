use std::sync::Arc;

use crate::annotation::frame_annotator::FrameAnnotator;
use crate::capture::camera_session::CameraSession;
use crate::error::{CaptureError, EmotionError};
use crate::pipeline::face_emotion_analyzer::FaceEmotionAnalyzer;
use crate::shared::frame::Frame;
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::multipart::jpeg_part;

/// Consecutive failures between two degraded-stream warnings.
const FAILURE_LOG_INTERVAL: usize = 30;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub frames_sent: usize,
    pub frames_skipped: usize,
}

#[derive(Debug, thiserror::Error)]
enum IterationError {
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Analysis(#[from] EmotionError),
}

/// Streaming pipeline: read → mirror → locate/classify → annotate → encode.
///
/// Each iteration produces one multipart part. Failed iterations are
/// skipped without reaching the consumer.
pub struct StreamEmotionsUseCase {
    session: Arc<CameraSession>,
    analyzer: Arc<FaceEmotionAnalyzer>,
    annotator: FrameAnnotator,
    encoder: Box<dyn FrameEncoder>,
    mirror: bool,
}

impl StreamEmotionsUseCase {
    pub fn new(
        session: Arc<CameraSession>,
        analyzer: Arc<FaceEmotionAnalyzer>,
        annotator: FrameAnnotator,
        encoder: Box<dyn FrameEncoder>,
        mirror: bool,
    ) -> Self {
        Self {
            session,
            analyzer,
            annotator,
            encoder,
            mirror,
        }
    }

    /// Runs until the consumer goes away or the session stops streaming.
    ///
    /// The consumer is gone once `is_alive` returns false or `sink` rejects
    /// a part. `is_alive` is checked every iteration, so a stream whose
    /// reads keep failing still ends when its client disconnects.
    ///
    /// The caller must hold a [`StreamLease`](crate::capture::camera_session::StreamLease)
    /// for the duration of the call.
    pub fn run(
        &self,
        is_alive: impl Fn() -> bool,
        mut sink: impl FnMut(Vec<u8>) -> bool,
    ) -> StreamSummary {
        let mut summary = StreamSummary::default();
        let mut consecutive_failures = 0usize;

        while self.session.is_streaming() {
            if !is_alive() {
                log::debug!("Stream consumer went away");
                break;
            }
            match self.next_part() {
                Ok(part) => {
                    if consecutive_failures > 0 {
                        log::info!(
                            "Stream recovered after {consecutive_failures} failed frame(s)"
                        );
                        consecutive_failures = 0;
                    }
                    if !sink(part) {
                        log::debug!("Stream consumer went away");
                        break;
                    }
                    summary.frames_sent += 1;
                }
                Err(e) => {
                    summary.frames_skipped += 1;
                    consecutive_failures += 1;
                    if consecutive_failures % FAILURE_LOG_INTERVAL == 1 {
                        log::warn!(
                            "Skipping stream frame ({consecutive_failures} consecutive failures): {e}"
                        );
                    }
                }
            }
        }

        log::info!(
            "Stream ended: {} frame(s) sent, {} skipped",
            summary.frames_sent,
            summary.frames_skipped
        );
        summary
    }

    fn next_part(&self) -> Result<Vec<u8>, IterationError> {
        let frame = self.session.read_frame()?;
        let jpeg = self.process_frame(frame)?;
        Ok(jpeg_part(&jpeg))
    }

    /// Mirrors, annotates and encodes one frame; returns the JPEG bytes.
    pub fn process_frame(&self, mut frame: Frame) -> Result<Vec<u8>, EmotionError> {
        if self.mirror {
            frame.mirror_horizontal();
        }
        let faces = self.analyzer.analyze(&frame.to_gray())?;
        self.annotator.annotate(&mut frame, &faces);
        self.encoder.encode(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::domain::frame_source::FrameSource;
    use crate::classification::domain::emotion::Emotion;
    use crate::pipeline::face_emotion_analyzer::test_support::*;
    use crate::shared::region::Region;
    use crate::video::infrastructure::jpeg_frame_encoder::JpegFrameEncoder;

    /// Fails every read whose (0-based) position is listed in `fail_at`.
    struct ScriptedSource {
        reads: usize,
        fail_at: Vec<usize>,
    }

    impl FrameSource for ScriptedSource {
        fn read(&mut self) -> Result<Frame, CaptureError> {
            let n = self.reads;
            self.reads += 1;
            if self.fail_at.contains(&n) {
                return Err(CaptureError::Read("device hiccup".into()));
            }
            Ok(Frame::new(vec![90; 80 * 60 * 3], 80, 60, n))
        }
    }

    fn session(fail_at: Vec<usize>) -> Arc<CameraSession> {
        Arc::new(CameraSession::new(Box::new(move || {
            Ok(Box::new(ScriptedSource {
                reads: 0,
                fail_at: fail_at.clone(),
            }) as Box<dyn FrameSource>)
        })))
    }

    fn use_case(session: Arc<CameraSession>, regions: Vec<Region>) -> StreamEmotionsUseCase {
        let analyzer = FaceEmotionAnalyzer::new(
            Arc::new(StubLocator { regions }),
            Arc::new(StubClassifier::always(peaked(Emotion::Happy, 0.973))),
        );
        StreamEmotionsUseCase::new(
            session,
            Arc::new(analyzer),
            FrameAnnotator::default(),
            Box::new(JpegFrameEncoder::default()),
            true,
        )
    }

    #[test]
    fn test_parts_are_multipart_framed_jpegs() {
        let session = session(vec![]);
        let _lease = session.acquire().unwrap();
        let stream = use_case(session.clone(), vec![Region::new(10, 10, 30, 30)]);

        let mut parts = Vec::new();
        let summary = stream.run(|| true, |part| {
            parts.push(part);
            parts.len() < 3
        });

        assert_eq!(summary.frames_sent, 2);
        assert_eq!(parts.len(), 3);
        let header = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n";
        for part in &parts {
            assert!(part.starts_with(header));
            assert!(part.ends_with(b"\r\n"));
            assert_eq!(&part[header.len()..header.len() + 2], &[0xFF, 0xD8]);
        }
    }

    #[test]
    fn test_failed_reads_are_skipped() {
        let session = session(vec![0, 2, 3]);
        let _lease = session.acquire().unwrap();
        let stream = use_case(session.clone(), vec![]);

        let mut sent = 0;
        let summary = stream.run(|| true, |_| {
            sent += 1;
            sent < 2
        });

        assert_eq!(summary.frames_skipped, 3);
        assert_eq!(sent, 2);
    }

    #[test]
    fn test_stop_ends_the_loop() {
        let session = session(vec![]);
        let _lease = session.acquire().unwrap();
        let stream = use_case(session.clone(), vec![]);

        let stopper = session.clone();
        let summary = stream.run(|| true, |_| {
            stopper.stop();
            true
        });
        assert_eq!(summary.frames_sent, 1);
        assert!(!session.is_streaming());
    }

    #[test]
    fn test_not_streaming_means_no_parts() {
        let session = session(vec![]);
        let stream = use_case(session, vec![]);
        let summary = stream.run(|| true, |_| panic!("sink must not be called"));
        assert_eq!(summary, StreamSummary::default());
    }

    #[test]
    fn test_disconnect_ends_the_loop_while_reads_fail() {
        let session = session((0..10_000).collect());
        let lease = session.acquire().unwrap();
        let stream = use_case(session.clone(), vec![]);

        let checks = std::cell::Cell::new(0);
        let summary = stream.run(
            || {
                checks.set(checks.get() + 1);
                checks.get() <= 5
            },
            |_| panic!("no frame ever succeeds"),
        );

        assert_eq!(summary.frames_sent, 0);
        assert_eq!(summary.frames_skipped, 5);
        assert!(session.is_streaming());

        drop(lease);
        assert!(!session.is_open());
    }

    #[test]
    fn test_dead_consumer_sends_nothing() {
        let session = session(vec![]);
        let _lease = session.acquire().unwrap();
        let stream = use_case(session.clone(), vec![]);

        let summary = stream.run(|| false, |_| panic!("consumer already gone"));
        assert_eq!(summary, StreamSummary::default());
    }

    #[test]
    fn test_process_frame_annotates_faces() {
        let session = session(vec![]);
        let with_face = use_case(session.clone(), vec![Region::new(20, 20, 30, 30)]);
        let without = use_case(session, vec![]);
        let frame = Frame::new(vec![90; 80 * 60 * 3], 80, 60, 0);

        let annotated = image::load_from_memory(&with_face.process_frame(frame.clone()).unwrap())
            .unwrap()
            .to_rgb8();
        let plain = image::load_from_memory(&without.process_frame(frame).unwrap())
            .unwrap()
            .to_rgb8();

        // box edge on the left side of the face turns green
        let greenness = |px: &image::Rgb<u8>| px[1] as i32 - px[0] as i32;
        assert!(greenness(annotated.get_pixel(20, 35)) > 50);
        assert!(greenness(plain.get_pixel(20, 35)).abs() < 20);
    }
}
