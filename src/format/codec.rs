//! Reading and writing a frame's ground truth file set.
//!
//! For an image `dir/frame_0042.png` the base path is `dir/frame_0042` and
//! the file set is:
//!
//! - `frame_0042_GT.json`: frame attributes and object list
//! - `frame_0042_map_obj_<id>.bin`: merged bitmap of a scribble object
//! - `frame_0042_scribb_<id>_<idx>.ser`: scribbles of one crop
//! - `frame_0042_map_obj_<id>.ser`: vertices of a polygon object
//! - `frame_0042_frame_map.bin`: optional full-frame object-id bitmap
//!
//! Sidecar paths are stored relative to the JSON document's directory.
//!
//! String attributes are lower-cased on write and capitalized on read, so
//! mixed-case input does not survive a round trip. This is a property of the
//! format.

use std::path::{Path, PathBuf};

use crate::format::document::{
    CropEntry, FrameInfoEntry, GroundTruthDocument, ObjectEntry, SegmentationType, capitalize,
    join_coordinates, parse_coordinates,
};
use crate::format::error::GroundTruthError;
use crate::format::report::{
    FormatWarning, ReadReport, WarningSeverity, WriteOptions, WriteReport,
};
use crate::format::sidecar;
use crate::model::{
    AnnotatedObject, CropRecord, FrameGroundTruth, MIN_POLYGON_VERTICES, ObjectAttributes,
    ObjectId, ObjectShape, Occlusion, Rect, SegmentationSource,
};
use crate::segmentation::MergedMap;

/// File names of one frame's ground truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundTruthPaths {
    dir: PathBuf,
    stem: String,
}

impl GroundTruthPaths {
    /// Derive the file set from the frame's image path.
    pub fn for_image(image_path: &Path) -> Self {
        let dir = image_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { dir, stem }
    }

    fn file_name(&self, suffix: &str) -> String {
        format!("{}{}", self.stem, suffix)
    }

    /// Directory holding the file set.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolve a path stored in the document.
    pub fn resolve(&self, stored: &str) -> PathBuf {
        let path = Path::new(stored);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn document(&self) -> PathBuf {
        self.dir.join(self.file_name("_GT.json"))
    }

    pub fn object_map_name(&self, id: ObjectId) -> String {
        self.file_name(&format!("_map_obj_{}.bin", id))
    }

    pub fn polygon_name(&self, id: ObjectId) -> String {
        self.file_name(&format!("_map_obj_{}.ser", id))
    }

    pub fn scribble_name(&self, id: ObjectId, crop_index: usize) -> String {
        self.file_name(&format!("_scribb_{}_{}.ser", id, crop_index))
    }

    pub fn frame_map_name(&self) -> String {
        self.file_name("_frame_map.bin")
    }
}

/// Ground truth reader and writer.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthCodec {
    options: WriteOptions,
}

impl GroundTruthCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    /// Persist `frame` next to `image_path`.
    ///
    /// Sidecars are written first and the JSON document last, so a failed
    /// write never leaves a document pointing at missing files. The frame
    /// itself is never modified; on failure the caller may simply retry.
    pub fn write(
        &self,
        frame: &FrameGroundTruth,
        image_path: &Path,
    ) -> Result<WriteReport, GroundTruthError> {
        let paths = GroundTruthPaths::for_image(image_path);
        log::info!("Writing ground truth to {:?}", paths.document());

        match self.write_files(frame, &paths) {
            Ok(report) => {
                log::info!(
                    "Wrote {} objects ({} files)",
                    report.objects_written,
                    report.files_created.len()
                );
                Ok(report)
            }
            Err(e) => {
                log::error!("Failed to write ground truth {:?}: {}", paths.document(), e);
                Err(e)
            }
        }
    }

    /// Write back a frame that was loaded with [`read`](Self::read).
    ///
    /// When the read skipped objects or crops, writing would delete them from
    /// disk, so this fails with [`GroundTruthError::PartialLoad`] unless
    /// `force` is set. A frame map that was loaded is written again even if
    /// the options do not ask for one.
    pub fn write_back(
        &self,
        frame: &FrameGroundTruth,
        loaded: &ReadReport,
        image_path: &Path,
        force: bool,
    ) -> Result<WriteReport, GroundTruthError> {
        let skipped = loaded
            .warnings
            .iter()
            .filter(|w| matches!(w.severity, WarningSeverity::Error))
            .count();
        if skipped > 0 && !force {
            let path = GroundTruthPaths::for_image(image_path).document();
            log::warn!("Refusing to overwrite partially loaded {:?}", path);
            return Err(GroundTruthError::PartialLoad { path, skipped });
        }

        let keep_frame_map = frame.frame_map.is_some() && frame.frame_size.is_some();
        if keep_frame_map && !self.options.export_frame_map {
            let options = self.options.clone().export_frame_map(true);
            return Self::with_options(options).write(frame, image_path);
        }
        self.write(frame, image_path)
    }

    fn write_files(
        &self,
        frame: &FrameGroundTruth,
        paths: &GroundTruthPaths,
    ) -> Result<WriteReport, GroundTruthError> {
        let mut report = WriteReport::default();
        let mut frame_info = FrameInfoEntry::from_info(&frame.info);

        if self.options.export_frame_map {
            match frame.frame_size {
                Some((width, height)) => {
                    let name = paths.frame_map_name();
                    let path = paths.dir.join(&name);
                    sidecar::write_bitmap(&path, &frame.render_frame_map(width, height))?;
                    report.files_created.push(path);
                    frame_info.frame_map_path = Some(name);
                    frame_info.frame_width = Some(width);
                    frame_info.frame_height = Some(height);
                }
                None => report.add_warning(FormatWarning::warning(
                    "Frame map requested but the frame size is unknown",
                )),
            }
        }

        let mut objects = Vec::with_capacity(frame.len());
        for object in frame.objects() {
            let Some(id) = object.object_id else {
                report.add_warning(FormatWarning::warning(
                    "Skipping object that was never committed (no id)",
                ));
                continue;
            };
            let entry = self.write_object(id, object, paths, &mut report)?;
            objects.push(serde_json::to_value(entry)?);
        }
        report.objects_written = objects.len();

        let document = GroundTruthDocument {
            frame_info,
            objects,
        };
        let json = if self.options.pretty_json {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        let document_path = paths.document();
        std::fs::write(&document_path, json)?;
        report.files_created.push(document_path);

        Ok(report)
    }

    fn write_object(
        &self,
        id: ObjectId,
        object: &AnnotatedObject,
        paths: &GroundTruthPaths,
        report: &mut WriteReport,
    ) -> Result<ObjectEntry, GroundTruthError> {
        let rect = object.bounding_rect().unwrap_or_default();
        let attributes = &object.attributes;
        let mut entry = ObjectEntry {
            object_id: id,
            segmentation_type: SegmentationType::BoundingBox,
            object_type: attributes.object_type.to_lowercase(),
            class: attributes.class.to_lowercase(),
            value: attributes.value.to_lowercase(),
            occluded: attributes.occlusion.as_str().to_string(),
            position_x: rect.x,
            position_y: rect.y,
            width: rect.width,
            height: rect.height,
            segmentation_source: Some(object.source.as_str().to_string()),
            object_map_path: None,
            crops: None,
            x_coordinates: None,
            y_coordinates: None,
        };

        match object.shape() {
            ObjectShape::BoundingBox(_) => {}
            ObjectShape::Scribble { crops, merged } => {
                entry.segmentation_type = SegmentationType::Scribble;
                match merged {
                    Some(merged) => {
                        let name = paths.object_map_name(id);
                        let path = paths.dir.join(&name);
                        sidecar::write_bitmap(&path, &merged.map)?;
                        report.files_created.push(path);
                        entry.object_map_path = Some(name);
                    }
                    None => report.add_warning(
                        FormatWarning::info(format!("Object {} has no merged map yet", id))
                            .with_object(id),
                    ),
                }

                let mut crop_entries = Vec::with_capacity(crops.len());
                for (index, crop) in crops.iter().enumerate() {
                    let name = paths.scribble_name(id, index);
                    let path = paths.dir.join(&name);
                    sidecar::write_scribbles(&path, &crop.scribbles)?;
                    report.files_created.push(path);
                    crop_entries.push(CropEntry {
                        scribble_map_path: name,
                        position_x: crop.position.x,
                        position_y: crop.position.y,
                        width: crop.position.width,
                        height: crop.position.height,
                    });
                }
                entry.crops = Some(crop_entries);
            }
            ObjectShape::Polygon { vertices } => {
                entry.segmentation_type = SegmentationType::Polygon;
                let name = paths.polygon_name(id);
                let path = paths.dir.join(&name);
                sidecar::write_vertices(&path, vertices)?;
                report.files_created.push(path);
                entry.object_map_path = Some(name);
                entry.x_coordinates = Some(join_coordinates(vertices.iter().map(|v| v.0)));
                entry.y_coordinates = Some(join_coordinates(vertices.iter().map(|v| v.1)));
            }
        }

        Ok(entry)
    }

    /// Load the ground truth stored next to `image_path`.
    ///
    /// Returns `None` when there is no ground truth yet.
    pub fn read(
        &self,
        image_path: &Path,
    ) -> Result<Option<(FrameGroundTruth, ReadReport)>, GroundTruthError> {
        let mut frame = FrameGroundTruth::default();
        let report = self.read_into(image_path, &mut frame)?;
        if !report.found {
            return Ok(None);
        }
        Ok(Some((frame, report)))
    }

    /// Load ground truth into an existing frame.
    ///
    /// Frame attributes are replaced; objects are appended unless an object
    /// with the same id is already present, so reading the same file twice
    /// does not duplicate anything. A missing or empty document is a no-op.
    /// Objects or crops whose entries or sidecars are broken are skipped and
    /// reported; only an unreadable document fails the whole read.
    pub fn read_into(
        &self,
        image_path: &Path,
        frame: &mut FrameGroundTruth,
    ) -> Result<ReadReport, GroundTruthError> {
        let paths = GroundTruthPaths::for_image(image_path);
        let document_path = paths.document();
        let mut report = ReadReport::default();

        let is_present = std::fs::metadata(&document_path)
            .map(|m| m.is_file() && m.len() > 0)
            .unwrap_or(false);
        if !is_present {
            log::debug!("No ground truth at {:?}", document_path);
            return Ok(report);
        }

        log::info!("Reading ground truth from {:?}", document_path);
        let json = std::fs::read_to_string(&document_path)?;
        let document: GroundTruthDocument = serde_json::from_str(&json)?;
        report.found = true;

        frame.info = document.frame_info.to_info();
        self.read_frame_map(&document.frame_info, &paths, frame, &mut report);

        for (index, value) in document.objects.into_iter().enumerate() {
            let entry: ObjectEntry = match serde_json::from_value(value) {
                Ok(entry) => entry,
                Err(e) => {
                    report.add_warning(FormatWarning::error(format!(
                        "Skipping malformed object #{}: {}",
                        index, e
                    )));
                    continue;
                }
            };

            let id = entry.object_id;
            if frame.object(id).is_some() {
                log::debug!("Dropping duplicate object {}", id);
                report.duplicates_dropped += 1;
                continue;
            }

            match self.read_object(entry, &paths, &mut report) {
                Ok(object) => {
                    frame.insert_unique(object);
                    report.objects_loaded += 1;
                }
                Err(e) => report.add_warning(
                    FormatWarning::error(format!("Skipping object {}: {}", id, e)).with_object(id),
                ),
            }
        }

        log::info!(
            "Loaded {} objects ({} duplicates dropped, {} warnings)",
            report.objects_loaded,
            report.duplicates_dropped,
            report.warnings.len()
        );
        Ok(report)
    }

    fn read_frame_map(
        &self,
        info: &FrameInfoEntry,
        paths: &GroundTruthPaths,
        frame: &mut FrameGroundTruth,
        report: &mut ReadReport,
    ) {
        let Some(stored) = &info.frame_map_path else {
            return;
        };
        let path = paths.resolve(stored);
        let (Some(width), Some(height)) = (info.frame_width, info.frame_height) else {
            report.add_warning(
                FormatWarning::warning("Frame map present but frame size missing").with_path(path),
            );
            return;
        };
        match sidecar::read_bitmap(&path, width, height) {
            Ok(map) => {
                frame.frame_map = Some(map);
                frame.frame_size = Some((width, height));
            }
            Err(e) => report.add_warning(
                FormatWarning::warning(format!("Skipping frame map: {}", e)).with_path(path),
            ),
        }
    }

    fn read_object(
        &self,
        entry: ObjectEntry,
        paths: &GroundTruthPaths,
        report: &mut ReadReport,
    ) -> Result<AnnotatedObject, GroundTruthError> {
        let id = entry.object_id;
        let occlusion = Occlusion::parse(&entry.occluded).unwrap_or_else(|| {
            report.add_warning(
                FormatWarning::warning(format!(
                    "Object {} has unknown occlusion '{}', using 'false'",
                    id, entry.occluded
                ))
                .with_object(id),
            );
            Occlusion::None
        });
        let attributes = ObjectAttributes {
            object_type: capitalize(&entry.object_type),
            class: capitalize(&entry.class),
            value: capitalize(&entry.value),
            occlusion,
        };
        let source = entry
            .segmentation_source
            .as_deref()
            .and_then(SegmentationSource::parse)
            .unwrap_or_default();
        let rect = Rect::new(entry.position_x, entry.position_y, entry.width, entry.height);

        let object = match entry.segmentation_type {
            SegmentationType::BoundingBox => AnnotatedObject::bounding_box(rect, attributes),
            SegmentationType::Scribble => {
                let merged = match &entry.object_map_path {
                    Some(stored) => {
                        let path = paths.resolve(stored);
                        let map = sidecar::read_bitmap(&path, rect.width, rect.height)?;
                        Some(MergedMap::new(map, rect))
                    }
                    None => None,
                };
                let crop_entries = entry.crops.as_deref().unwrap_or_default();
                let crops = self.read_crops(id, crop_entries, paths, report);
                AnnotatedObject::scribble_with_map(crops, merged, attributes)
            }
            SegmentationType::Polygon => {
                let vertices = self.read_polygon(&entry, paths, report)?;
                AnnotatedObject::polygon(vertices, attributes)
            }
        };

        Ok(object.with_id(id).with_source(source))
    }

    fn read_crops(
        &self,
        id: ObjectId,
        entries: &[CropEntry],
        paths: &GroundTruthPaths,
        report: &mut ReadReport,
    ) -> Vec<CropRecord> {
        let mut crops = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let path = paths.resolve(&entry.scribble_map_path);
            match sidecar::read_scribbles(&path) {
                Ok(scribbles) => crops.push(
                    CropRecord::new(Rect::new(
                        entry.position_x,
                        entry.position_y,
                        entry.width,
                        entry.height,
                    ))
                    .with_scribbles(scribbles),
                ),
                Err(e) => report.add_warning(
                    FormatWarning::error(format!(
                        "Skipping crop {} of object {}: {}",
                        index, id, e
                    ))
                    .with_object(id)
                    .with_path(path),
                ),
            }
        }
        crops
    }

    /// Vertices from the sidecar, falling back to the inline coordinates.
    fn read_polygon(
        &self,
        entry: &ObjectEntry,
        paths: &GroundTruthPaths,
        report: &mut ReadReport,
    ) -> Result<Vec<(i32, i32)>, GroundTruthError> {
        let id = entry.object_id;
        if let Some(stored) = &entry.object_map_path {
            let from_sidecar = sidecar::read_vertices(&paths.resolve(stored)).and_then(|v| {
                if v.len() < MIN_POLYGON_VERTICES {
                    return Err(GroundTruthError::invalid_format(format!(
                        "polygon has only {} vertices",
                        v.len()
                    )));
                }
                Ok(v)
            });
            match from_sidecar {
                Ok(vertices) => return Ok(vertices),
                Err(e) => report.add_warning(
                    FormatWarning::warning(format!(
                        "Polygon sidecar of object {} unreadable, using inline coordinates: {}",
                        id, e
                    ))
                    .with_object(id),
                ),
            }
        }

        let xs = entry
            .x_coordinates
            .as_deref()
            .ok_or_else(|| GroundTruthError::missing_field("xCoordinates"))?;
        let ys = entry
            .y_coordinates
            .as_deref()
            .ok_or_else(|| GroundTruthError::missing_field("yCoordinates"))?;
        let (Some(xs), Some(ys)) = (parse_coordinates(xs), parse_coordinates(ys)) else {
            return Err(GroundTruthError::invalid_format(
                "polygon coordinates are not integers",
            ));
        };
        if xs.len() != ys.len() || xs.len() < MIN_POLYGON_VERTICES {
            return Err(GroundTruthError::invalid_format(format!(
                "polygon has {} x and {} y coordinates",
                xs.len(),
                ys.len()
            )));
        }
        Ok(xs.into_iter().zip(ys).collect())
    }
}
