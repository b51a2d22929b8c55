//! Crop merging, denoising and asynchronous segmentation plumbing.

mod filter;
mod merge;
mod worker;

pub use filter::{majority_filter, majority_filter_passes};
pub use merge::{MergedMap, extract_foreground, merge_crops, restore_crop_maps};
pub use worker::{Segmenter, SegmentationEvent, SegmentationRequest, SegmentationWorker};
