//! Annotated objects and their attributes.

use crate::model::crop::CropRecord;
use crate::model::geometry::{Bitmap, Rect};
use crate::segmentation::{
    MergedMap, extract_foreground, majority_filter_passes, merge_crops, restore_crop_maps,
};

/// Stable identifier of an object within a frame.
pub type ObjectId = i64;

/// Minimum number of vertices for a polygon object.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// How much of the object is hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Occlusion {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl Occlusion {
    /// Label stored in ground truth files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Occlusion::None => "false",
            Occlusion::Quarter => "25%",
            Occlusion::Half => "50%",
            Occlusion::ThreeQuarters => "75%",
            Occlusion::Full => "100%",
        }
    }

    /// Parse a stored label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "false" | "" => Some(Occlusion::None),
            "25%" => Some(Occlusion::Quarter),
            "50%" => Some(Occlusion::Half),
            "75%" => Some(Occlusion::ThreeQuarters),
            "100%" | "true" => Some(Occlusion::Full),
            _ => None,
        }
    }

    /// All levels from visible to fully hidden.
    pub fn all() -> &'static [Occlusion] {
        &[
            Occlusion::None,
            Occlusion::Quarter,
            Occlusion::Half,
            Occlusion::ThreeQuarters,
            Occlusion::Full,
        ]
    }
}

/// Who produced the object's geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SegmentationSource {
    #[default]
    Manual,
    Automatic,
}

impl SegmentationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SegmentationSource::Manual => "manual",
            SegmentationSource::Automatic => "automatic",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(SegmentationSource::Manual),
            "automatic" => Some(SegmentationSource::Automatic),
            _ => None,
        }
    }
}

/// User-facing classification of an object.
///
/// `object_type`, `class` and `value` come from a user-configurable taxonomy
/// and are free-form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectAttributes {
    pub object_type: String,
    pub class: String,
    pub value: String,
    pub occlusion: Occlusion,
}

impl ObjectAttributes {
    pub fn new(
        object_type: impl Into<String>,
        class: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            class: class.into(),
            value: value.into(),
            occlusion: Occlusion::None,
        }
    }

    pub fn with_occlusion(mut self, occlusion: Occlusion) -> Self {
        self.occlusion = occlusion;
        self
    }
}

/// Geometry of an object, one variant per segmentation type.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectShape {
    /// Plain rectangle.
    BoundingBox(Rect),
    /// Pixel segmentation assembled from scribble-segmented crops.
    Scribble {
        crops: Vec<CropRecord>,
        /// Cached result of the last successful merge.
        merged: Option<MergedMap>,
    },
    /// Closed polygon in frame coordinates.
    Polygon { vertices: Vec<(i32, i32)> },
}

/// One annotated object of a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedObject {
    /// Assigned when the object is first committed to a frame.
    pub object_id: Option<ObjectId>,
    pub attributes: ObjectAttributes,
    pub source: SegmentationSource,
    shape: ObjectShape,
}

impl AnnotatedObject {
    fn with_shape(shape: ObjectShape, attributes: ObjectAttributes) -> Self {
        Self {
            object_id: None,
            attributes,
            source: SegmentationSource::Manual,
            shape,
        }
    }

    /// Create a bounding box object.
    pub fn bounding_box(rect: Rect, attributes: ObjectAttributes) -> Self {
        Self::with_shape(ObjectShape::BoundingBox(rect), attributes)
    }

    /// Create a scribble object and merge its crops.
    pub fn scribble(crops: Vec<CropRecord>, attributes: ObjectAttributes) -> Self {
        let merged = merge_crops(&crops);
        Self::with_shape(ObjectShape::Scribble { crops, merged }, attributes)
    }

    /// Create a scribble object from an already merged map.
    ///
    /// Used when reloading: crops come back without their local maps, so the
    /// persisted object map is taken as the cached merge result and each
    /// map-less crop gets the part of it that it covers. Later crop edits
    /// then re-merge without losing the loaded pixels.
    pub fn scribble_with_map(
        mut crops: Vec<CropRecord>,
        merged: Option<MergedMap>,
        attributes: ObjectAttributes,
    ) -> Self {
        if let Some(merged) = &merged {
            restore_crop_maps(&mut crops, merged);
        }
        Self::with_shape(ObjectShape::Scribble { crops, merged }, attributes)
    }

    /// Create a polygon object.
    pub fn polygon(vertices: Vec<(i32, i32)>, attributes: ObjectAttributes) -> Self {
        Self::with_shape(ObjectShape::Polygon { vertices }, attributes)
    }

    pub fn with_id(mut self, object_id: ObjectId) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn with_source(mut self, source: SegmentationSource) -> Self {
        self.source = source;
        self
    }

    pub fn shape(&self) -> &ObjectShape {
        &self.shape
    }

    /// Crops of a scribble object, empty for other shapes.
    pub fn crops(&self) -> &[CropRecord] {
        match &self.shape {
            ObjectShape::Scribble { crops, .. } => crops,
            _ => &[],
        }
    }

    /// Cached merge result of a scribble object.
    pub fn merged(&self) -> Option<&MergedMap> {
        match &self.shape {
            ObjectShape::Scribble { merged, .. } => merged.as_ref(),
            _ => None,
        }
    }

    /// Merged object bitmap of a scribble object.
    pub fn object_map(&self) -> Option<&Bitmap> {
        self.merged().map(|m| &m.map)
    }

    /// Frame-space rectangle enclosing the object.
    ///
    /// `None` for scribble objects without a merged map yet and for
    /// polygons without vertices.
    pub fn bounding_rect(&self) -> Option<Rect> {
        match &self.shape {
            ObjectShape::BoundingBox(rect) => Some(*rect),
            ObjectShape::Scribble { merged, .. } => merged.as_ref().map(|m| m.bbox),
            ObjectShape::Polygon { vertices } => Rect::enclosing(vertices),
        }
    }

    /// Replace the rectangle of a bounding box object.
    ///
    /// Returns `false` for other shapes.
    pub fn set_bounding_box(&mut self, rect: Rect) -> bool {
        let ObjectShape::BoundingBox(current) = &mut self.shape else {
            return false;
        };
        *current = rect;
        self.source = SegmentationSource::Manual;
        true
    }

    /// Replace the vertices of a polygon object.
    ///
    /// Returns `false` for other shapes.
    pub fn set_polygon(&mut self, new_vertices: Vec<(i32, i32)>) -> bool {
        let ObjectShape::Polygon { vertices } = &mut self.shape else {
            return false;
        };
        *vertices = new_vertices;
        self.source = SegmentationSource::Manual;
        true
    }

    /// Run `edit` on the crop list and re-merge.
    ///
    /// Returns `None` when the object is not a scribble object.
    fn edit_crops<R>(&mut self, edit: impl FnOnce(&mut Vec<CropRecord>) -> R) -> Option<R> {
        let ObjectShape::Scribble { crops, merged } = &mut self.shape else {
            return None;
        };
        let result = edit(crops);
        if let Some(fresh) = merge_crops(crops) {
            *merged = Some(fresh);
        }
        self.source = SegmentationSource::Manual;
        Some(result)
    }

    /// Append a crop. Returns `false` for non-scribble objects.
    pub fn push_crop(&mut self, crop: CropRecord) -> bool {
        self.edit_crops(|crops| crops.push(crop)).is_some()
    }

    /// Replace the crop at `index`, returning the previous one.
    pub fn replace_crop(&mut self, index: usize, crop: CropRecord) -> Option<CropRecord> {
        self.edit_crops(|crops| {
            crops
                .get_mut(index)
                .map(|slot| std::mem::replace(slot, crop))
        })
        .flatten()
    }

    /// Remove the crop at `index`.
    pub fn remove_crop(&mut self, index: usize) -> Option<CropRecord> {
        self.edit_crops(|crops| (index < crops.len()).then(|| crops.remove(index)))
            .flatten()
    }

    /// Install a segmentation result for the crop at `index`.
    pub fn set_crop_map(&mut self, index: usize, map: Bitmap) -> bool {
        self.edit_crops(|crops| match crops.get_mut(index) {
            Some(crop) => {
                crop.object_map = Some(map);
                true
            }
            None => false,
        })
        .unwrap_or(false)
    }

    /// Apply the majority filter to the merged map `passes` times.
    ///
    /// The filter may clear border foreground, so the result is cut back to
    /// its tight box. Every crop contributing to the merge has its filter
    /// counter raised by `passes`. Returns `false` and leaves the object
    /// untouched when there is no merged map or the filter would clear it
    /// completely.
    pub fn filter_merged_map(&mut self, passes: u32) -> bool {
        let ObjectShape::Scribble {
            crops,
            merged: Some(merged),
        } = &mut self.shape
        else {
            return false;
        };

        let filtered = majority_filter_passes(&merged.map, passes);
        let Some((map, bbox)) = extract_foreground(&filtered, merged.bbox) else {
            log::warn!(
                "Filtering would clear object {:?} completely, keeping its map",
                self.object_id
            );
            return false;
        };

        *merged = MergedMap::new(map, bbox);
        for crop in crops.iter_mut().filter(|c| c.usable_map().is_some()) {
            crop.filter_counter = crop.filter_counter.saturating_add(passes);
        }
        true
    }

    /// Check whether a frame pixel belongs to the object.
    pub fn covers(&self, x: i32, y: i32) -> bool {
        match &self.shape {
            ObjectShape::BoundingBox(rect) => rect.contains(x, y),
            ObjectShape::Scribble { merged, .. } => merged.as_ref().is_some_and(|m| {
                m.bbox.contains(x, y)
                    && m.map[[(x - m.bbox.x) as usize, (y - m.bbox.y) as usize]] > 0
            }),
            ObjectShape::Polygon { vertices } => polygon_covers(vertices, x, y),
        }
    }
}

/// Even-odd test of the pixel centre against the polygon outline.
fn polygon_covers(vertices: &[(i32, i32)], x: i32, y: i32) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }
    let px = f64::from(x) + 0.5;
    let py = f64::from(y) + 0.5;
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (f64::from(vertices[i].0), f64::from(vertices[i].1));
        let (xj, yj) = (f64::from(vertices[j].0), f64::from(vertices[j].1));
        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::geometry::{bitmap_from_rows, foreground_count};

    fn crop(x: i32, y: i32, rows: &[&[u8]]) -> CropRecord {
        let map = bitmap_from_rows(rows);
        let position = Rect::new(x, y, map.nrows() as u32, map.ncols() as u32);
        CropRecord::new(position).with_map(map)
    }

    fn attrs() -> ObjectAttributes {
        ObjectAttributes::new("Vehicle", "Car", "Sedan")
    }

    #[test]
    fn test_occlusion_labels() {
        for level in Occlusion::all() {
            assert_eq!(Occlusion::parse(level.as_str()), Some(*level));
        }
        assert_eq!(Occlusion::parse("FALSE"), Some(Occlusion::None));
        assert_eq!(Occlusion::parse(" 50% "), Some(Occlusion::Half));
        assert_eq!(Occlusion::parse("60%"), None);
    }

    #[test]
    fn test_scribble_object_merges_on_creation() {
        let object = AnnotatedObject::scribble(
            vec![crop(0, 0, &[&[1, 0], &[0, 0]]), crop(1, 1, &[&[0, 0], &[0, 1]])],
            attrs(),
        );
        assert_eq!(object.bounding_rect(), Some(Rect::new(0, 0, 3, 3)));
        assert_eq!(object.object_map().map(foreground_count), Some(2));
    }

    #[test]
    fn test_crop_edits_remerge_and_mark_manual() {
        let mut object = AnnotatedObject::scribble(vec![crop(0, 0, &[&[1]])], attrs())
            .with_source(SegmentationSource::Automatic);

        assert!(object.push_crop(crop(4, 4, &[&[1]])));
        assert_eq!(object.source, SegmentationSource::Manual);
        assert_eq!(object.bounding_rect(), Some(Rect::new(0, 0, 5, 5)));

        let old = object.replace_crop(1, crop(2, 0, &[&[1]]));
        assert_eq!(old.map(|c| c.position), Some(Rect::new(4, 4, 1, 1)));
        assert_eq!(object.bounding_rect(), Some(Rect::new(0, 0, 3, 1)));

        let removed = object.remove_crop(0);
        assert!(removed.is_some());
        assert_eq!(object.bounding_rect(), Some(Rect::new(2, 0, 1, 1)));
        assert!(object.remove_crop(5).is_none());
    }

    #[test]
    fn test_empty_merge_keeps_cached_map() {
        let mut object = AnnotatedObject::scribble(vec![crop(0, 0, &[&[1, 1]])], attrs());
        let before = object.merged().cloned();

        object.replace_crop(0, crop(0, 0, &[&[0, 0]]));
        assert_eq!(object.merged().cloned(), before);
    }

    #[test]
    fn test_unsegmented_scribble_has_no_map() {
        let object = AnnotatedObject::scribble(vec![CropRecord::new(Rect::new(0, 0, 4, 4))], attrs());
        assert!(object.object_map().is_none());
        assert!(object.bounding_rect().is_none());
    }

    #[test]
    fn test_set_crop_map_installs_result() {
        let mut object =
            AnnotatedObject::scribble(vec![CropRecord::new(Rect::new(3, 3, 2, 1))], attrs());
        assert!(object.set_crop_map(0, bitmap_from_rows(&[&[0, 1]])));
        assert_eq!(object.bounding_rect(), Some(Rect::new(4, 3, 1, 1)));
        assert!(!object.set_crop_map(4, bitmap_from_rows(&[&[1]])));
    }

    #[test]
    fn test_shape_specific_edits() {
        let mut bbox = AnnotatedObject::bounding_box(Rect::new(0, 0, 1, 1), attrs());
        assert!(bbox.set_bounding_box(Rect::new(1, 2, 3, 4)));
        assert!(!bbox.push_crop(crop(0, 0, &[&[1]])));
        assert!(!bbox.set_polygon(vec![(0, 0)]));
        assert_eq!(bbox.bounding_rect(), Some(Rect::new(1, 2, 3, 4)));

        let mut poly = AnnotatedObject::polygon(vec![(0, 0), (4, 0), (0, 4)], attrs());
        assert!(poly.set_polygon(vec![(0, 0), (2, 0), (2, 2), (0, 2)]));
        assert_eq!(poly.bounding_rect(), Some(Rect::new(0, 0, 3, 3)));
    }

    #[test]
    fn test_filter_merged_map() {
        let mut object = AnnotatedObject::scribble(
            vec![crop(0, 0, &[&[1, 1, 1], &[1, 0, 1], &[1, 1, 1]])],
            attrs(),
        );
        assert!(object.filter_merged_map(1));
        assert_eq!(object.object_map().map(foreground_count), Some(9));
        assert_eq!(object.crops()[0].filter_counter, 1);

        let mut bbox = AnnotatedObject::bounding_box(Rect::new(0, 0, 1, 1), attrs());
        assert!(!bbox.filter_merged_map(1));
    }

    #[test]
    fn test_covers() {
        let scribble = AnnotatedObject::scribble(vec![crop(2, 2, &[&[1, 0], &[0, 1]])], attrs());
        assert!(scribble.covers(2, 2));
        assert!(!scribble.covers(3, 2));
        assert!(scribble.covers(3, 3));
        assert!(!scribble.covers(0, 0));

        let square = AnnotatedObject::polygon(vec![(0, 0), (4, 0), (4, 4), (0, 4)], attrs());
        assert!(square.covers(0, 0));
        assert!(square.covers(3, 3));
        assert!(!square.covers(4, 4));
        assert!(!square.covers(-1, 2));
    }

    #[test]
    fn test_filter_counts_passes_on_contributing_crops() {
        let mut object = AnnotatedObject::scribble(
            vec![
                crop(0, 0, &[&[1, 1], &[1, 1]]),
                CropRecord::new(Rect::new(8, 8, 2, 2)),
            ],
            attrs(),
        );
        assert!(object.filter_merged_map(2));
        assert_eq!(object.crops()[0].filter_counter, 2);
        assert_eq!(object.crops()[1].filter_counter, 0);

        assert!(object.filter_merged_map(1));
        assert_eq!(object.crops()[0].filter_counter, 3);
    }

    #[test]
    fn test_filter_retightens_box() {
        let mut object = AnnotatedObject::scribble(
            vec![crop(
                10,
                20,
                &[
                    &[1, 0, 0, 0, 0],
                    &[0, 0, 0, 0, 0],
                    &[0, 0, 1, 1, 1],
                    &[0, 0, 1, 1, 1],
                    &[0, 0, 1, 1, 1],
                ],
            )],
            attrs(),
        );
        assert_eq!(object.bounding_rect(), Some(Rect::new(10, 20, 5, 5)));

        assert!(object.filter_merged_map(1));
        assert_eq!(object.bounding_rect(), Some(Rect::new(12, 22, 3, 3)));
        assert_eq!(
            object.object_map(),
            Some(&bitmap_from_rows(&[&[0, 1, 1], &[1, 1, 1], &[1, 1, 1]]))
        );
        let merged = object.merged().unwrap();
        assert_eq!(merged.map.dim(), (3, 3));
        assert!(merged.consistent);
        assert!(!object.covers(10, 20));
        assert!(object.covers(14, 24));
    }

    #[test]
    fn test_filter_that_clears_everything_is_refused() {
        let mut object = AnnotatedObject::scribble(
            vec![crop(0, 0, &[&[1, 0], &[0, 1]])],
            attrs(),
        );
        let before = object.clone();
        assert!(!object.filter_merged_map(1));
        assert_eq!(object, before);
    }

    #[test]
    fn test_edit_after_reload_keeps_loaded_pixels() {
        let merged = MergedMap::new(
            bitmap_from_rows(&[&[1, 0, 0], &[0, 0, 0], &[0, 0, 1]]),
            Rect::new(100, 100, 3, 3),
        );
        let crops = vec![
            CropRecord::new(Rect::new(100, 100, 2, 2)),
            CropRecord::new(Rect::new(101, 101, 2, 2)),
        ];
        let mut object = AnnotatedObject::scribble_with_map(crops, Some(merged.clone()), attrs());
        assert!(object.crops().iter().all(|c| c.object_map.is_some()));
        assert_eq!(merge_crops(object.crops()), Some(merged));

        assert!(object.push_crop(crop(110, 110, &[&[1]])));
        assert_eq!(object.object_map().map(foreground_count), Some(3));
        assert_eq!(object.bounding_rect(), Some(Rect::new(100, 100, 11, 11)));
    }
}
