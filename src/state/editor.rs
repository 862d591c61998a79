//! Crop region editor
//!
//! `CropEditor` turns pointer drags into the two template regions.
//! `TemplateDraft` is the transient copy of a template that the create and
//! edit screens work on; committed drags are serialized straight into it.

use std::path::PathBuf;

use super::data::{Template, TemplateFields};
use super::geometry::{self, Point, Rectangle, RegionKind, Regions};
use crate::error::{EditorError, ValidationError};

/// Pointer state of the editor
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { region: RegionKind, anchor: Point },
}

/// Pointer-driven state machine producing the photo and number regions
#[derive(Debug, Clone, PartialEq)]
pub struct CropEditor {
    active: RegionKind,
    regions: Regions,
    drag: DragState,
}

impl Default for CropEditor {
    fn default() -> Self {
        Self {
            active: RegionKind::Photo,
            regions: Regions::default(),
            drag: DragState::Idle,
        }
    }
}

impl CropEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_region(&self) -> RegionKind {
        self.active
    }

    pub fn region(&self, kind: RegionKind) -> Rectangle {
        self.regions.get(kind)
    }

    pub fn regions(&self) -> &Regions {
        &self.regions
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.drag, DragState::Dragging { .. })
    }

    /// Choose which region subsequent drags redraw
    pub fn set_mode(&mut self, region: RegionKind) -> Result<(), EditorError> {
        if self.is_dragging() {
            return Err(EditorError::DragInProgress);
        }
        self.active = region;
        Ok(())
    }

    pub fn begin_drag(&mut self, point: Point) -> Result<(), EditorError> {
        if self.is_dragging() {
            return Err(EditorError::DragInProgress);
        }
        self.regions.set(self.active, Rectangle::at(point));
        self.drag = DragState::Dragging {
            region: self.active,
            anchor: point,
        };
        Ok(())
    }

    /// Stretch the dragged region to `point`. Ignored when not dragging.
    pub fn update_drag(&mut self, point: Point) {
        if let DragState::Dragging { region, anchor } = self.drag {
            self.regions
                .set(region, Rectangle::from_corners(anchor, point));
        }
    }

    /// Finish the drag. Returns the committed region, or `None` if no drag was active.
    pub fn end_drag(&mut self) -> Option<(RegionKind, Rectangle)> {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging { region, .. } => Some((region, self.regions.get(region))),
            DragState::Idle => None,
        }
    }

    /// Load persisted regions. A corrupt string only clears its own region.
    pub fn hydrate(&mut self, serialized_photo: &str, serialized_number: &str) {
        self.drag = DragState::Idle;
        self.regions.set(
            RegionKind::Photo,
            geometry::deserialize_or_zero(RegionKind::Photo, serialized_photo),
        );
        self.regions.set(
            RegionKind::Number,
            geometry::deserialize_or_zero(RegionKind::Number, serialized_number),
        );
    }

    pub fn validate_for_submit(&self) -> Result<(Rectangle, Rectangle), ValidationError> {
        if let Some(kind) = self.regions.first_undefined() {
            return Err(ValidationError::RegionUndefined(kind));
        }
        Ok((
            self.regions.get(RegionKind::Photo),
            self.regions.get(RegionKind::Number),
        ))
    }
}

/// Size of the template image as shown on the crop canvas
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePreview {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Screen-scoped copy of a template being created or edited
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TemplateDraft {
    pub name: String,
    pub template_img: String,
    pub crop_photo: String,
    pub crop_number: String,
    pub preview: Option<TemplatePreview>,
    pub editor: CropEditor,
}

impl TemplateDraft {
    /// Empty draft for the create screen
    pub fn new() -> Self {
        let editor = CropEditor::new();
        Self {
            crop_photo: geometry::serialize(&editor.region(RegionKind::Photo)),
            crop_number: geometry::serialize(&editor.region(RegionKind::Number)),
            editor,
            ..Self::default()
        }
    }

    /// Draft for the edit screen, hydrated from a stored template
    pub fn from_template(template: &Template) -> Self {
        let mut editor = CropEditor::new();
        editor.hydrate(&template.crop_photo, &template.crop_number);

        Self {
            name: template.name.clone(),
            template_img: template.template_img.clone(),
            crop_photo: geometry::serialize(&editor.region(RegionKind::Photo)),
            crop_number: geometry::serialize(&editor.region(RegionKind::Number)),
            preview: None,
            editor,
        }
    }

    pub fn set_image(&mut self, preview: TemplatePreview) {
        self.template_img = preview.path.to_string_lossy().to_string();
        self.preview = Some(preview);
    }

    /// Finish the current drag and write the region into its template field
    pub fn end_drag(&mut self) -> Option<RegionKind> {
        let (region, rect) = self.editor.end_drag()?;
        let serialized = geometry::serialize(&rect);
        match region {
            RegionKind::Photo => self.crop_photo = serialized,
            RegionKind::Number => self.crop_number = serialized,
        }
        Some(region)
    }

    /// Validate everything and produce the store payload
    pub fn to_fields(&self) -> Result<TemplateFields, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if self.template_img.trim().is_empty() {
            return Err(ValidationError::MissingImage);
        }
        let (photo, number) = self.editor.validate_for_submit()?;

        Ok(TemplateFields {
            name: self.name.trim().to_string(),
            crop_photo: geometry::serialize(&photo),
            crop_number: geometry::serialize(&number),
            template_img: self.template_img.clone(),
        })
    }
}
