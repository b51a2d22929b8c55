//! Crop records: independently segmented fragments of one object.

use crate::model::geometry::{Bitmap, Rect, bitmap_height, bitmap_width};
use crate::segmentation::majority_filter;

/// What a scribble point tells the segmentation algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScribbleKind {
    /// Hint that the pixel belongs to the background.
    Background,
    /// Hint that the pixel belongs to the object.
    Object,
    /// Eraser stroke removing earlier hints.
    Erase,
}

impl ScribbleKind {
    /// Tag byte used in the scribble sidecar files.
    pub fn to_tag(self) -> u8 {
        match self {
            ScribbleKind::Background => 0,
            ScribbleKind::Object => 1,
            ScribbleKind::Erase => 2,
        }
    }

    /// Parse a sidecar tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ScribbleKind::Background),
            1 => Some(ScribbleKind::Object),
            2 => Some(ScribbleKind::Erase),
            _ => None,
        }
    }
}

/// A single user-placed hint, in crop-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScribblePoint {
    pub x: i32,
    pub y: i32,
    pub kind: ScribbleKind,
}

impl ScribblePoint {
    pub fn new(x: i32, y: i32, kind: ScribbleKind) -> Self {
        Self { x, y, kind }
    }
}

/// One rectangular segmentation fragment of an annotated object.
///
/// `object_map` is `None` until the segmentation collaborator delivers a
/// result, and after reloading from disk (only the merged object map is
/// persisted).
#[derive(Debug, Clone, PartialEq)]
pub struct CropRecord {
    /// Position of the crop in full-frame coordinates.
    pub position: Rect,
    /// User scribbles, passed through untouched.
    pub scribbles: Vec<ScribblePoint>,
    /// Local object bitmap, same size as `position`.
    pub object_map: Option<Bitmap>,
    /// How often the majority filter has been applied to this crop.
    pub filter_counter: u32,
}

impl CropRecord {
    /// Create a crop that has not been segmented yet.
    pub fn new(position: Rect) -> Self {
        Self {
            position,
            scribbles: Vec::new(),
            object_map: None,
            filter_counter: 0,
        }
    }

    /// Attach scribbles.
    pub fn with_scribbles(mut self, scribbles: Vec<ScribblePoint>) -> Self {
        self.scribbles = scribbles;
        self
    }

    /// Attach a segmentation result.
    pub fn with_map(mut self, map: Bitmap) -> Self {
        self.object_map = Some(map);
        self
    }

    /// The object map if it is usable for merging.
    ///
    /// A crop contributes nothing when it has no area, no map, or a map whose
    /// size disagrees with its position.
    pub fn usable_map(&self) -> Option<&Bitmap> {
        if self.position.is_empty() {
            return None;
        }
        let map = self.object_map.as_ref()?;
        if bitmap_width(map) != self.position.width || bitmap_height(map) != self.position.height
        {
            log::warn!(
                "Crop at {:?} has a {}x{} map, expected {}x{}",
                self.position,
                bitmap_width(map),
                bitmap_height(map),
                self.position.width,
                self.position.height
            );
            return None;
        }
        Some(map)
    }

    /// Return a copy with one majority-filter pass applied to the map.
    ///
    /// Crops without a map are returned unchanged, counter included.
    pub fn filtered(&self) -> CropRecord {
        let Some(map) = self.object_map.as_ref() else {
            return self.clone();
        };
        CropRecord {
            position: self.position,
            scribbles: self.scribbles.clone(),
            object_map: Some(majority_filter(map)),
            filter_counter: self.filter_counter + 1,
        }
    }

    /// Forget how often the filter was applied.
    pub fn reset_filter_counter(&mut self) {
        self.filter_counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::bitmap_from_rows;

    #[test]
    fn test_scribble_tags_roundtrip() {
        for kind in [
            ScribbleKind::Background,
            ScribbleKind::Object,
            ScribbleKind::Erase,
        ] {
            assert_eq!(ScribbleKind::from_tag(kind.to_tag()), Some(kind));
        }
        assert_eq!(ScribbleKind::from_tag(7), None);
    }

    #[test]
    fn test_usable_map_checks_shape() {
        let crop = CropRecord::new(Rect::new(0, 0, 2, 2));
        assert!(crop.usable_map().is_none());

        let crop = crop.with_map(bitmap_from_rows(&[&[1, 0, 0]]));
        assert!(crop.usable_map().is_none());

        let crop = CropRecord::new(Rect::new(0, 0, 2, 1)).with_map(bitmap_from_rows(&[&[1, 0]]));
        assert!(crop.usable_map().is_some());
    }

    #[test]
    fn test_filtered_counts_passes() {
        let crop = CropRecord::new(Rect::new(0, 0, 3, 3)).with_map(bitmap_from_rows(&[
            &[0, 0, 0],
            &[0, 1, 0],
            &[0, 0, 0],
        ]));
        let once = crop.filtered();
        let twice = once.filtered();
        assert_eq!(crop.filter_counter, 0);
        assert_eq!(once.filter_counter, 1);
        assert_eq!(twice.filter_counter, 2);
        assert_eq!(once.object_map.as_ref().map(|m| m.sum()), Some(0));

        let mut reset = twice;
        reset.reset_filter_counter();
        assert_eq!(reset.filter_counter, 0);
    }

    #[test]
    fn test_filtered_without_map_is_noop() {
        let crop = CropRecord::new(Rect::new(0, 0, 3, 3));
        assert_eq!(crop.filtered(), crop);
    }
}
