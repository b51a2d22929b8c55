//! Crop merging: combine the crops of one object into a single bitmap.
//!
//! The merge runs in four steps:
//!
//! 1. The outer envelope of all crop rectangles becomes the working canvas.
//! 2. Every foreground cell of every crop is copied onto the canvas, in crop
//!    order. Background never overwrites foreground; a later foreground value
//!    replaces an earlier one.
//! 3. The canvas is scanned for the tight box around all foreground cells.
//! 4. That box is cut out of the canvas and translated back to frame
//!    coordinates.
//!
//! After extraction the foreground sum of the result is compared against the
//! canvas. A mismatch is logged and flagged on the result but never fatal.

use ndarray::s;

use crate::model::{Bitmap, CropRecord, Rect, empty_bitmap, foreground_sum};

/// Result of merging an object's crops.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMap {
    /// Tightly cropped object bitmap.
    pub map: Bitmap,
    /// Position of `map` in frame coordinates.
    pub bbox: Rect,
    /// Whether the extraction self-check passed.
    pub consistent: bool,
}

impl MergedMap {
    /// Wrap an already-tight bitmap, e.g. one loaded from disk.
    pub fn new(map: Bitmap, bbox: Rect) -> Self {
        Self {
            map,
            bbox,
            consistent: true,
        }
    }
}

/// Merge an ordered list of crops.
///
/// Returns `None` when no crop contributes a foreground pixel, including
/// the case where every crop is degenerate or still unsegmented. The crops
/// themselves are never modified.
pub fn merge_crops(crops: &[CropRecord]) -> Option<MergedMap> {
    let usable: Vec<(Rect, &Bitmap)> = crops
        .iter()
        .filter_map(|crop| crop.usable_map().map(|map| (crop.position, map)))
        .collect();

    let envelope = usable
        .iter()
        .map(|(position, _)| *position)
        .reduce(|acc, position| acc.union(&position))?;

    let mut canvas = empty_bitmap(envelope.width, envelope.height);

    for (position, map) in &usable {
        let dx = (i64::from(position.x) - i64::from(envelope.x)) as usize;
        let dy = (i64::from(position.y) - i64::from(envelope.y)) as usize;
        for ((x, y), &value) in map.indexed_iter() {
            if value > 0 {
                canvas[[dx + x, dy + y]] = value;
            }
        }
    }

    let Some((map, bbox)) = extract_foreground(&canvas, envelope) else {
        log::debug!(
            "Merge of {} crop(s) produced no foreground, keeping previous map",
            crops.len()
        );
        return None;
    };

    let canvas_sum = foreground_sum(&canvas);
    let map_sum = foreground_sum(&map);
    let consistent = canvas_sum == map_sum;
    if !consistent {
        log::warn!(
            "Inconsistent crop merge: canvas {:?} holds {} but extracted {:?} holds {}",
            envelope,
            canvas_sum,
            bbox,
            map_sum
        );
    }

    log::trace!(
        "Merged {} crop(s) over {:?} into {:?}",
        usable.len(),
        envelope,
        bbox
    );

    Some(MergedMap {
        map,
        bbox,
        consistent,
    })
}

/// Cut the tight box around all foreground cells out of `canvas`.
///
/// `area` is the frame-space rectangle the canvas covers. Returns the cut
/// bitmap and its frame-space rectangle, or `None` without foreground.
pub fn extract_foreground(canvas: &Bitmap, area: Rect) -> Option<(Bitmap, Rect)> {
    let (canvas_width, canvas_height) = canvas.dim();
    let mut min_x = canvas_width;
    let mut min_y = canvas_height;
    let mut max_x = 0usize;
    let mut max_y = 0usize;
    let mut found = false;
    for ((x, y), &value) in canvas.indexed_iter() {
        if value > 0 {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if !found {
        return None;
    }

    let width = (max_x - min_x + 1).min(canvas_width - min_x);
    let height = (max_y - min_y + 1).min(canvas_height - min_y);
    let map = canvas
        .slice(s![min_x..min_x + width, min_y..min_y + height])
        .to_owned();
    let bbox = Rect::new(
        area.x + min_x as i32,
        area.y + min_y as i32,
        width as u32,
        height as u32,
    );
    Some((map, bbox))
}

/// Give every map-less crop the part of `merged` it covers.
///
/// Each restored map has the crop's size; cells outside the merged box are
/// background. Re-merging the restored crops reproduces `merged`. Returns
/// the number of crops that received a map.
pub fn restore_crop_maps(crops: &mut [CropRecord], merged: &MergedMap) -> usize {
    let mut restored = 0;
    for crop in crops.iter_mut().filter(|c| c.object_map.is_none()) {
        let position = crop.position;
        let mut map = empty_bitmap(position.width, position.height);
        if let Some(overlap) = position.intersection(&merged.bbox) {
            let (w, h) = (overlap.width as usize, overlap.height as usize);
            let src_x = (overlap.x - merged.bbox.x) as usize;
            let src_y = (overlap.y - merged.bbox.y) as usize;
            let dst_x = (overlap.x - position.x) as usize;
            let dst_y = (overlap.y - position.y) as usize;
            map.slice_mut(s![dst_x..dst_x + w, dst_y..dst_y + h])
                .assign(&merged.map.slice(s![src_x..src_x + w, src_y..src_y + h]));
        }
        crop.object_map = Some(map);
        restored += 1;
    }
    restored
}
