use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::capture::domain::frame_source::FrameSource;
use crate::error::CaptureError;
use crate::shared::frame::Frame;

/// Opens a fresh [`FrameSource`] each time the session (re)starts.
pub type SourceOpener = Box<dyn Fn() -> Result<Box<dyn FrameSource>, CaptureError> + Send + Sync>;

struct Inner {
    source: Option<Box<dyn FrameSource>>,
    consumers: usize,
}

/// The single shared camera.
///
/// The device is opened lazily by the first [`acquire`](Self::acquire) and
/// released when the last [`StreamLease`] is dropped or [`stop`](Self::stop)
/// is called. Reads are serialized through the session lock.
pub struct CameraSession {
    opener: SourceOpener,
    inner: Mutex<Inner>,
    streaming: AtomicBool,
}

impl CameraSession {
    pub fn new(opener: SourceOpener) -> Self {
        Self {
            opener,
            inner: Mutex::new(Inner {
                source: None,
                consumers: 0,
            }),
            streaming: AtomicBool::new(false),
        }
    }

    /// Registers one streaming consumer, opening the device if needed.
    pub fn acquire(self: &Arc<Self>) -> Result<StreamLease, CaptureError> {
        let mut inner = self.lock()?;
        if inner.source.is_none() {
            inner.source = Some((self.opener)()?);
        }
        inner.consumers += 1;
        self.streaming.store(true, Ordering::SeqCst);
        log::debug!("Camera lease acquired ({} consumers)", inner.consumers);
        Ok(StreamLease {
            session: Arc::clone(self),
        })
    }

    /// Ends every streaming loop at its next iteration and releases the device.
    pub fn stop(&self) {
        self.streaming.store(false, Ordering::SeqCst);
        match self.inner.lock() {
            Ok(mut inner) => {
                if inner.source.take().is_some() {
                    log::info!("Camera session stopped");
                }
            }
            Err(e) => log::error!("Camera session lock poisoned on stop: {e}"),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.source.is_some())
            .unwrap_or(false)
    }

    pub fn consumers(&self) -> usize {
        self.inner.lock().map(|inner| inner.consumers).unwrap_or(0)
    }

    /// Reads one frame, holding the lock for the whole device read.
    pub fn read_frame(&self) -> Result<Frame, CaptureError> {
        let mut inner = self.lock()?;
        let source = inner.source.as_mut().ok_or(CaptureError::NotOpen)?;
        source.read()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, CaptureError> {
        self.inner.lock().map_err(|_| CaptureError::Poisoned)
    }

    fn release(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            log::error!("Camera session lock poisoned on release");
            return;
        };
        inner.consumers = inner.consumers.saturating_sub(1);
        if inner.consumers == 0 {
            if inner.source.take().is_some() {
                log::info!("Last stream closed, releasing camera");
            }
            self.streaming.store(false, Ordering::SeqCst);
        }
    }
}

/// Proof of one active streaming consumer. Dropping it gives the slot back.
pub struct StreamLease {
    session: Arc<CameraSession>,
}

impl Drop for StreamLease {
    fn drop(&mut self) {
        self.session.release();
    }
}
