//! GTAnnot - ground truth core of a frame annotation tool.
//!
//! Annotated objects are assembled from independently segmented rectangular
//! crops. This crate merges those crops into one tight object bitmap,
//! denoises bitmaps with a majority filter, and persists a frame's complete
//! annotation state as a JSON document with binary sidecar files.

pub mod config;
pub mod format;
pub mod model;
pub mod segmentation;

pub use format::{GroundTruthCodec, GroundTruthError};
pub use model::{AnnotatedObject, CropRecord, FrameGroundTruth, FrameInfo, Rect};
pub use segmentation::{majority_filter, merge_crops};
