//! Error types for the template editor, store, and generation pipeline
//!
//! Errors that travel through iced messages must be `Clone`, so backend
//! errors (rusqlite, io, image, zip) are captured as strings at the boundary.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::state::data::TemplateId;
use crate::state::geometry::RegionKind;

/// A serialized rectangle could not be read back
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("malformed rectangle: {0}")]
    Malformed(String),

    #[error("rectangle field '{field}' is not a finite number")]
    NonFinite { field: &'static str },

    #[error("rectangle has negative {field}")]
    Negative { field: &'static str },
}

/// Pointer operations rejected by the crop editor
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorError {
    #[error("a drag is already in progress")]
    DragInProgress,
}

/// Input the user must fix before anything is sent to a collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a template name")]
    MissingName,

    #[error("Please upload a template image")]
    MissingImage,

    #[error("Please draw the {0} region")]
    RegionUndefined(RegionKind),

    #[error("Please select a {0}")]
    MissingInput(InputField),
}

/// Fields required to start a generation job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Template,
    Folder,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputField::Template => write!(f, "template"),
            InputField::Folder => write!(f, "source folder"),
        }
    }
}

/// Reasons a generation job could not be started
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    #[error(transparent)]
    InputValidation(#[from] ValidationError),

    #[error("A generation job is already running")]
    JobInProgress,
}

/// Screen transitions the view state machine refuses
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("cannot go from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },

    #[error("template {0} is not in the loaded list")]
    UnknownTemplate(TemplateId),

    #[error("no template is awaiting deletion")]
    NothingToDelete,
}

/// Template store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Template {0} not found")]
    NotFound(TemplateId),

    #[error("Invalid template: {0}")]
    Validation(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Generation engine failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Error loading template: {0}")]
    Store(#[from] StoreError),

    #[error("Error parsing {field} coordinates: {message}")]
    InvalidCrop {
        field: &'static str,
        message: String,
    },

    #[error("No image files found in {}", .0.display())]
    NoImages(PathBuf),

    #[error("Error processing image {}: {message}", .path.display())]
    Image { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Error creating archive: {0}")]
    Archive(String),

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

impl From<zip::result::ZipError> for EngineError {
    fn from(e: zip::result::ZipError) -> Self {
        EngineError::Archive(e.to_string())
    }
}

/// Archive reveal failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OpenError {
    #[error("Archive file does not exist: {}", .0.display())]
    Missing(PathBuf),

    #[error("Error opening folder: {0}")]
    Opener(String),
}

/// File upload failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("Error saving file: {0}")]
    Io(String),

    #[error("Not a file: {}", .0.display())]
    NotAFile(PathBuf),
}

impl From<std::io::Error> for FileError {
    fn from(e: std::io::Error) -> Self {
        FileError::Io(e.to_string())
    }
}

/// Category used to tag inline notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Store,
    Engine,
    Open,
    File,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::Validation => "Validation",
            ErrorCategory::Store => "Store",
            ErrorCategory::Engine => "Generation",
            ErrorCategory::Open => "Open",
            ErrorCategory::File => "File",
        };
        write!(f, "{}", label)
    }
}

/// Everything that can be surfaced to the user as an inline message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    File(#[from] FileError),
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation(_) | AppError::Generation(_) | AppError::View(_) => {
                ErrorCategory::Validation
            }
            AppError::Store(_) => ErrorCategory::Store,
            AppError::Engine(_) => ErrorCategory::Engine,
            AppError::Open(_) => ErrorCategory::Open,
            AppError::File(_) => ErrorCategory::File,
        }
    }
}
