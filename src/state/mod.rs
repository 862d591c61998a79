/// State management module
///
/// This module handles all application state, including:
/// - The SQLite template store (library.rs)
/// - Shared data structures (data.rs)
/// - Crop rectangles and their persisted form (geometry.rs)
/// - The crop editor and template drafts (editor.rs)
/// - Generation jobs and progress events (generation.rs)
/// - The screen state machine (view.rs)

pub mod data;
pub mod editor;
pub mod generation;
pub mod geometry;
pub mod library;
pub mod view;
