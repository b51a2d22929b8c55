//! Data model for frame ground truth.

mod crop;
mod frame;
mod geometry;
mod object;

pub use crop::{CropRecord, ScribbleKind, ScribblePoint};
pub use frame::{FrameGroundTruth, FrameInfo};
pub use geometry::{
    Bitmap, Rect, bitmap_from_rows, bitmap_height, bitmap_width, empty_bitmap, foreground_count,
    foreground_sum,
};
pub use object::{
    AnnotatedObject, MIN_POLYGON_VERTICES, ObjectAttributes, ObjectId, ObjectShape, Occlusion,
    SegmentationSource,
};
