//! Per-frame ground truth: frame attributes plus the object list.

use std::collections::HashSet;

use crate::model::geometry::{Bitmap, Rect, empty_bitmap};
use crate::model::object::{AnnotatedObject, ObjectId};
use crate::segmentation::SegmentationEvent;

/// Frame-level attributes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FrameInfo {
    pub illumination: String,
    pub weather: String,
    pub road_type: String,
    pub road_event: String,
    pub country: String,
    pub wipers_visible: bool,
    pub dirt_visible: bool,
    pub image_distorted: bool,
}

/// Annotation state of one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameGroundTruth {
    pub info: FrameInfo,
    objects: Vec<AnnotatedObject>,
    /// Frame size in pixels, needed to export a frame map.
    pub frame_size: Option<(u32, u32)>,
    /// Full-frame object-id bitmap, if one was loaded.
    pub frame_map: Option<Bitmap>,
}

impl FrameGroundTruth {
    pub fn new(info: FrameInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Objects in commit order.
    pub fn objects(&self) -> &[AnnotatedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn object(&self, id: ObjectId) -> Option<&AnnotatedObject> {
        self.objects.iter().find(|o| o.object_id == Some(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut AnnotatedObject> {
        self.objects.iter_mut().find(|o| o.object_id == Some(id))
    }

    /// Id the next new object will receive: one more than the current maximum.
    ///
    /// When the maximum is `ObjectId::MAX` the smallest unused positive id is
    /// handed out instead.
    pub fn next_object_id(&self) -> ObjectId {
        let Some(max) = self.objects.iter().filter_map(|o| o.object_id).max() else {
            return 1;
        };
        if let Some(next) = max.checked_add(1) {
            return next;
        }

        let used: HashSet<ObjectId> = self.objects.iter().filter_map(|o| o.object_id).collect();
        let free = (1..ObjectId::MAX)
            .find(|id| !used.contains(id))
            .unwrap_or(ObjectId::MAX);
        log::warn!("Object ids exhausted at {}, reusing free id {}", max, free);
        free
    }

    /// Commit an object to the frame.
    ///
    /// Objects without an id get a fresh one and are appended. An object
    /// whose id is already present replaces the stored entry in place.
    pub fn commit(&mut self, mut object: AnnotatedObject) -> ObjectId {
        let id = match object.object_id {
            Some(id) => id,
            None => {
                let id = self.next_object_id();
                object.object_id = Some(id);
                id
            }
        };

        if let Some(slot) = self.object_mut(id) {
            *slot = object;
        } else {
            log::debug!("Committed new object {}", id);
            self.objects.push(object);
        }
        id
    }

    /// Insert an object unless one with the same id exists.
    ///
    /// Returns `false` when the object was dropped as a duplicate. Objects
    /// without an id are always appended.
    pub fn insert_unique(&mut self, object: AnnotatedObject) -> bool {
        if let Some(id) = object.object_id {
            if self.object(id).is_some() {
                return false;
            }
        }
        self.objects.push(object);
        true
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<AnnotatedObject> {
        let index = self.objects.iter().position(|o| o.object_id == Some(id))?;
        Some(self.objects.remove(index))
    }

    /// Drop all objects and any loaded frame map.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.frame_map = None;
    }

    /// Apply a finished segmentation to its object.
    ///
    /// Returns `true` when a crop map was installed and the object re-merged.
    pub fn apply_event(&mut self, event: SegmentationEvent) -> bool {
        match event {
            SegmentationEvent::Completed {
                object_id,
                crop_index,
                map,
            } => {
                let Some(object) = self.object_mut(object_id) else {
                    log::warn!("Segmentation finished for unknown object {}", object_id);
                    return false;
                };
                let applied = object.set_crop_map(crop_index, map);
                if !applied {
                    log::warn!(
                        "Segmentation finished for missing crop {} of object {}",
                        crop_index,
                        object_id
                    );
                }
                applied
            }
            SegmentationEvent::Failed {
                object_id,
                crop_index,
                message,
            } => {
                log::warn!(
                    "Segmentation of crop {} of object {} failed: {}",
                    crop_index,
                    object_id,
                    message
                );
                false
            }
        }
    }

    /// Rasterise all objects into a frame-sized id bitmap.
    ///
    /// Later objects paint over earlier ones. Ids that do not fit in a byte
    /// are left out.
    pub fn render_frame_map(&self, width: u32, height: u32) -> Bitmap {
        let mut map = empty_bitmap(width, height);
        let Some(frame) = Rect::from_edges(0, 0, width as i32, height as i32) else {
            return map;
        };

        for object in &self.objects {
            let Some(id) = object.object_id else {
                continue;
            };
            let Ok(label) = u8::try_from(id) else {
                log::warn!("Object id {} does not fit the frame map, skipping", id);
                continue;
            };
            let Some(area) = object.bounding_rect().and_then(|r| r.intersection(&frame)) else {
                continue;
            };
            for x in area.x..area.right() {
                for y in area.y..area.bottom() {
                    if object.covers(x, y) {
                        map[[x as usize, y as usize]] = label;
                    }
                }
            }
        }
        map
    }
}
