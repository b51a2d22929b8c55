//! Background thread for crop segmentation.
//!
//! The pixel-level segmentation algorithm (matting from scribbles) is an
//! external collaborator behind the [`Segmenter`] trait. Requests are sent to
//! a worker thread and finished results come back as [`SegmentationEvent`]
//! values; the owning object is only re-merged once its event has been
//! received and applied (see `FrameGroundTruth::apply_event`).

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::model::{Bitmap, ObjectId, Rect, ScribblePoint};

/// Produces a crop's object bitmap from the user's scribbles.
pub trait Segmenter: Send + 'static {
    /// Segment the crop at `position`.
    ///
    /// The returned bitmap must have the crop's width and height.
    fn segment(&mut self, position: Rect, scribbles: &[ScribblePoint]) -> Result<Bitmap, String>;
}

/// Work item for the segmentation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationRequest {
    /// Object owning the crop.
    pub object_id: ObjectId,
    /// Index of the crop within the object's crop list.
    pub crop_index: usize,
    /// Crop position in frame coordinates.
    pub position: Rect,
    /// Scribbles to segment from.
    pub scribbles: Vec<ScribblePoint>,
}

/// Completion notification delivered back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentationEvent {
    /// The crop was segmented.
    Completed {
        object_id: ObjectId,
        crop_index: usize,
        map: Bitmap,
    },
    /// Segmentation failed; the crop keeps its previous map.
    Failed {
        object_id: ObjectId,
        crop_index: usize,
        message: String,
    },
}

impl SegmentationEvent {
    /// Object the event refers to.
    pub fn object_id(&self) -> ObjectId {
        match self {
            SegmentationEvent::Completed { object_id, .. }
            | SegmentationEvent::Failed { object_id, .. } => *object_id,
        }
    }
}

enum ThreadMessage {
    Segment(SegmentationRequest),
    Shutdown,
}

/// Owns the segmentation thread and both ends of its channels.
pub struct SegmentationWorker {
    request_tx: Sender<ThreadMessage>,
    event_rx: Receiver<SegmentationEvent>,
    thread_handle: Option<JoinHandle<()>>,
    pending: usize,
}

impl SegmentationWorker {
    /// Spawn a worker thread running `segmenter`.
    pub fn spawn<S: Segmenter>(segmenter: S) -> std::io::Result<Self> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (event_tx, event_rx) = mpsc::channel::<SegmentationEvent>();

        let thread_handle = thread::Builder::new()
            .name("segmentation".to_string())
            .spawn(move || {
                log::info!("Segmentation thread started");
                Self::thread_loop(segmenter, request_rx, event_tx);
                log::info!("Segmentation thread exiting");
            })?;

        Ok(Self {
            request_tx,
            event_rx,
            thread_handle: Some(thread_handle),
            pending: 0,
        })
    }

    fn thread_loop<S: Segmenter>(
        mut segmenter: S,
        request_rx: Receiver<ThreadMessage>,
        event_tx: Sender<SegmentationEvent>,
    ) {
        while let Ok(message) = request_rx.recv() {
            let request = match message {
                ThreadMessage::Segment(request) => request,
                ThreadMessage::Shutdown => {
                    log::debug!("Received shutdown signal");
                    break;
                }
            };

            let event = Self::run_request(&mut segmenter, request);
            if event_tx.send(event).is_err() {
                log::warn!("Event channel closed, segmentation thread exiting");
                break;
            }
        }
    }

    fn run_request<S: Segmenter>(segmenter: &mut S, request: SegmentationRequest) -> SegmentationEvent {
        let SegmentationRequest {
            object_id,
            crop_index,
            position,
            scribbles,
        } = request;

        log::debug!(
            "Segmenting crop {} of object {} at {:?} ({} scribbles)",
            crop_index,
            object_id,
            position,
            scribbles.len()
        );

        match segmenter.segment(position, &scribbles) {
            Ok(map) if map.dim() == (position.width as usize, position.height as usize) => {
                SegmentationEvent::Completed {
                    object_id,
                    crop_index,
                    map,
                }
            }
            Ok(map) => SegmentationEvent::Failed {
                object_id,
                crop_index,
                message: format!(
                    "segmenter returned {:?} for a {}x{} crop",
                    map.dim(),
                    position.width,
                    position.height
                ),
            },
            Err(message) => SegmentationEvent::Failed {
                object_id,
                crop_index,
                message,
            },
        }
    }

    /// Queue a crop for segmentation.
    ///
    /// Returns `false` if the worker thread is gone.
    pub fn submit(&mut self, request: SegmentationRequest) -> bool {
        if self.request_tx.send(ThreadMessage::Segment(request)).is_err() {
            log::error!("Failed to send segmentation request: channel closed");
            return false;
        }
        self.pending += 1;
        true
    }

    /// Take one finished event without blocking.
    pub fn try_next_event(&mut self) -> Option<SegmentationEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => {
                self.pending = self.pending.saturating_sub(1);
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Segmentation thread disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for the next finished event.
    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<SegmentationEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.pending = self.pending.saturating_sub(1);
                Some(event)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("Segmentation thread disconnected");
                None
            }
        }
    }

    /// Number of submitted requests whose event has not been taken yet.
    pub fn pending_count(&self) -> usize {
        self.pending
    }
}

impl Drop for SegmentationWorker {
    fn drop(&mut self) {
        log::debug!("Shutting down segmentation thread");

        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Segmentation thread panicked: {:?}", e);
            }
        }
    }
}
