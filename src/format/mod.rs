//! Ground truth persistence.
//!
//! A frame's annotation state is stored as a small JSON document plus binary
//! sidecar files for the large payloads (object bitmaps, scribble lists,
//! polygon vertices). See [`GroundTruthCodec`] for the file layout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use gtannot::format::{GroundTruthCodec, WriteOptions};
//!
//! let codec = GroundTruthCodec::with_options(WriteOptions::new().export_frame_map(true));
//! codec.write(&frame, Path::new("clips/frame_0042.png"))?;
//!
//! if let Some((frame, report)) = codec.read(Path::new("clips/frame_0042.png"))? {
//!     // ...
//! }
//! ```

mod codec;
mod document;
mod error;
mod report;
mod sidecar;

#[cfg(test)]
mod tests;

pub use codec::{GroundTruthCodec, GroundTruthPaths};
pub use document::{CropEntry, FrameInfoEntry, GroundTruthDocument, ObjectEntry, SegmentationType};
pub use error::GroundTruthError;
pub use report::{FormatWarning, ReadReport, WarningSeverity, WriteOptions, WriteReport};
