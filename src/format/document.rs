//! JSON document layout of a `*_GT.json` file.
//!
//! Field names are part of the on-disk contract and must not change.
//! Objects are kept as raw JSON values at the document level so that one
//! malformed object can be skipped without rejecting the whole file.

use serde::{Deserialize, Serialize};

use crate::model::{FrameInfo, ObjectId};

/// Top-level ground truth document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTruthDocument {
    #[serde(rename = "Frame Info")]
    pub frame_info: FrameInfoEntry,

    #[serde(rename = "Objects List", default)]
    pub objects: Vec<serde_json::Value>,
}

/// Frame attributes as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameInfoEntry {
    #[serde(default)]
    pub illumination: String,
    #[serde(default)]
    pub weather: String,
    #[serde(default)]
    pub road_type: String,
    #[serde(default)]
    pub road_event: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub wipers_visible: bool,
    #[serde(default)]
    pub dirt_visible: bool,
    #[serde(default)]
    pub image_distorted: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_map_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<u32>,
}

impl FrameInfoEntry {
    /// Convert in-memory attributes, lower-casing every string.
    pub fn from_info(info: &FrameInfo) -> Self {
        Self {
            illumination: info.illumination.to_lowercase(),
            weather: info.weather.to_lowercase(),
            road_type: info.road_type.to_lowercase(),
            road_event: info.road_event.to_lowercase(),
            country: info.country.to_lowercase(),
            wipers_visible: info.wipers_visible,
            dirt_visible: info.dirt_visible,
            image_distorted: info.image_distorted,
            frame_map_path: None,
            frame_width: None,
            frame_height: None,
        }
    }

    /// Convert to in-memory attributes, capitalizing every string.
    pub fn to_info(&self) -> FrameInfo {
        FrameInfo {
            illumination: capitalize(&self.illumination),
            weather: capitalize(&self.weather),
            road_type: capitalize(&self.road_type),
            road_event: capitalize(&self.road_event),
            country: capitalize(&self.country),
            wipers_visible: self.wipers_visible,
            dirt_visible: self.dirt_visible,
            image_distorted: self.image_distorted,
        }
    }
}

/// Segmentation variants as named on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentationType {
    #[serde(rename = "2D_bounding_box")]
    BoundingBox,
    #[serde(rename = "pixel_segmentation_scribble")]
    Scribble,
    #[serde(rename = "polygon_segmentation")]
    Polygon,
}

/// One entry of the "Objects List".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub object_id: ObjectId,
    pub segmentation_type: SegmentationType,

    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub occluded: String,

    pub position_x: i32,
    pub position_y: i32,
    pub width: u32,
    pub height: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_map_path: Option<String>,

    #[serde(rename = "Crops List", default, skip_serializing_if = "Option::is_none")]
    pub crops: Option<Vec<CropEntry>>,

    #[serde(rename = "xCoordinates", default, skip_serializing_if = "Option::is_none")]
    pub x_coordinates: Option<String>,
    #[serde(rename = "yCoordinates", default, skip_serializing_if = "Option::is_none")]
    pub y_coordinates: Option<String>,
}

/// One entry of an object's "Crops List".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropEntry {
    pub scribble_map_path: String,
    pub position_x: i32,
    pub position_y: i32,
    pub width: u32,
    pub height: u32,
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Join coordinates with single spaces.
pub fn join_coordinates(values: impl IntoIterator<Item = i32>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a space-separated coordinate list.
pub fn parse_coordinates(text: &str) -> Option<Vec<i32>> {
    text.split_whitespace().map(|v| v.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("daylight"), "Daylight");
        assert_eq!(capitalize("heavy rain"), "Heavy rain");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("ä"), "Ä");
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(join_coordinates([1, -2, 30]), "1 -2 30");
        assert_eq!(parse_coordinates("1 -2  30"), Some(vec![1, -2, 30]));
        assert_eq!(parse_coordinates(""), Some(vec![]));
        assert_eq!(parse_coordinates("1 x"), None);
    }

    #[test]
    fn test_segmentation_type_names() {
        let json = serde_json::to_string(&SegmentationType::BoundingBox).unwrap();
        assert_eq!(json, "\"2D_bounding_box\"");
        let parsed: SegmentationType =
            serde_json::from_str("\"pixel_segmentation_scribble\"").unwrap();
        assert_eq!(parsed, SegmentationType::Scribble);
        assert!(serde_json::from_str::<SegmentationType>("\"mesh\"").is_err());
    }

    #[test]
    fn test_optional_fields_not_serialized() {
        let entry = ObjectEntry {
            object_id: 1,
            segmentation_type: SegmentationType::BoundingBox,
            object_type: "vehicle".to_string(),
            class: "car".to_string(),
            value: String::new(),
            occluded: "false".to_string(),
            position_x: 1,
            position_y: 2,
            width: 3,
            height: 4,
            segmentation_source: None,
            object_map_path: None,
            crops: None,
            x_coordinates: None,
            y_coordinates: None,
        };
        let value = serde_json::to_value(&entry).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["type"], "vehicle");
        assert!(!object.contains_key("object_map_path"));
        assert!(!object.contains_key("Crops List"));
        assert!(!object.contains_key("xCoordinates"));
    }

    #[test]
    fn test_missing_objects_list_defaults_to_empty() {
        let doc: GroundTruthDocument =
            serde_json::from_str(r#"{"Frame Info": {"weather": "sunny"}}"#).unwrap();
        assert!(doc.objects.is_empty());
        assert_eq!(doc.frame_info.to_info().weather, "Sunny");
    }
}
