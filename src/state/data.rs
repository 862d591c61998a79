//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the template store and the UI layer.

/// Database row id of a template
pub type TemplateId = i64;

/// A stored photo template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    /// Unique database ID
    pub id: TemplateId,
    /// Display name (e.g., "ID Card")
    pub name: String,
    /// Serialized photo region (see `geometry::serialize`)
    pub crop_photo: String,
    /// Serialized number region, empty when the template has none
    pub crop_number: String,
    /// Full path to the saved template image
    pub template_img: String,
    /// Unix timestamp of creation
    pub created_at: i64,
}

#[cfg(test)]
impl Template {
    /// The editable fields of this template
    pub fn fields(&self) -> TemplateFields {
        TemplateFields {
            name: self.name.clone(),
            crop_photo: self.crop_photo.clone(),
            crop_number: self.crop_number.clone(),
            template_img: self.template_img.clone(),
        }
    }
}

/// Payload of create/update calls
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TemplateFields {
    pub name: String,
    pub crop_photo: String,
    pub crop_number: String,
    pub template_img: String,
}
