/// Batch image generation
///
/// This module handles:
/// - Loading a template and its crop regions from the store
/// - Finding source images in a folder
/// - Compositing every source image onto the template (compose.rs)
/// - Bundling the results into a ZIP archive (archive.rs)

pub mod archive;
pub mod compose;

use futures::future::BoxFuture;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::EngineError;
use crate::state::generation::{GenerationEngine, GenerationRequest, ProgressReporter};
use crate::state::geometry::{self, Rectangle};
use crate::state::library::Library;

/// Source image extensions picked up from the folder (compared lowercase)
const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "tiff"];

/// Generation engine backed by the template store and the `image` crate
#[derive(Debug, Clone)]
pub struct ImageEngine {
    db_path: PathBuf,
    output_dir: PathBuf,
}

impl ImageEngine {
    pub fn new(db_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            db_path,
            output_dir,
        }
    }
}

impl GenerationEngine for ImageEngine {
    fn generate(
        &self,
        request: GenerationRequest,
        progress: ProgressReporter,
    ) -> BoxFuture<'static, Result<PathBuf, EngineError>> {
        let db_path = self.db_path.clone();
        let output_dir = self.output_dir.clone();

        Box::pin(async move {
            // Spawn blocking because decoding and resizing are CPU-intensive
            tokio::task::spawn_blocking(move || {
                generate_blocking(&db_path, &output_dir, &request, &progress)
            })
            .await
            .map_err(|e| EngineError::Task(e.to_string()))?
        })
    }
}

/// Parsed crop regions of a template
struct Regions {
    photo: Rectangle,
    number: Option<Rectangle>,
}

fn parse_regions(crop_photo: &str, crop_number: &str) -> Result<Regions, EngineError> {
    let photo = geometry::deserialize(crop_photo).map_err(|e| EngineError::InvalidCrop {
        field: "crop_photo",
        message: e.to_string(),
    })?;
    if !photo.is_defined() {
        return Err(EngineError::InvalidCrop {
            field: "crop_photo",
            message: "region has no area".to_string(),
        });
    }

    // An empty number region means the template has no number label
    let number = if crop_number.trim().is_empty() {
        None
    } else {
        Some(
            geometry::deserialize(crop_number).map_err(|e| EngineError::InvalidCrop {
                field: "crop_number",
                message: e.to_string(),
            })?,
        )
    };

    Ok(Regions { photo, number })
}

/// Image files directly inside `folder`, sorted by path
pub fn find_image_files(folder: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut image_files = Vec::new();

    for entry in WalkDir::new(folder).max_depth(1) {
        let entry = entry.map_err(|e| EngineError::Io(format!("Error walking directory: {}", e)))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let supported = entry
            .path()
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()));
        if supported {
            image_files.push(entry.path().to_path_buf());
        }
    }

    image_files.sort();
    Ok(image_files)
}

fn open_image(path: &Path) -> Result<DynamicImage, EngineError> {
    image::open(path).map_err(|e| EngineError::Image {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Percentage reported after finishing image `done` of `total`
fn percent_done(done: usize, total: usize) -> i64 {
    ((done as f64 / total as f64) * 100.0).round() as i64
}

fn generate_blocking(
    db_path: &Path,
    output_dir: &Path,
    request: &GenerationRequest,
    progress: &ProgressReporter,
) -> Result<PathBuf, EngineError> {
    let template = Library::open(db_path)?.get(request.template_id)?;
    let regions = parse_regions(&template.crop_photo, &template.crop_number)?;
    let template_image = open_image(Path::new(&template.template_img))?;

    let image_files = find_image_files(&request.source_folder)?;
    if image_files.is_empty() {
        return Err(EngineError::NoImages(request.source_folder.clone()));
    }

    fs::create_dir_all(output_dir)?;
    log::info!(
        "🔍 Generating {} images with template '{}'",
        image_files.len(),
        template.name
    );

    let total = image_files.len();
    let mut processed_files = Vec::with_capacity(total);

    for (index, image_file) in image_files.iter().enumerate() {
        if request.cancel.is_cancelled() {
            log::info!("Generation cancelled after {} of {} images", index, total);
            return Err(EngineError::Cancelled);
        }

        let source = open_image(image_file)?;
        let photo = compose::fit_within(
            &source,
            regions.photo.width as u32,
            regions.photo.height as u32,
        );
        let mut result = compose::place_photo(&template_image, &photo, &regions.photo);

        let stem = image_file
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image_{}", index + 1));

        if let Some(number_region) = &regions.number {
            let number = compose::extract_number(&stem, index + 1);
            compose::mark_number(&mut result, number_region, &number);
        }

        // JPEG has no alpha channel
        let output_path = output_dir.join(format!("{}_processed.jpg", stem));
        DynamicImage::ImageRgba8(result)
            .to_rgb8()
            .save(&output_path)
            .map_err(|e| EngineError::Image {
                path: output_path.clone(),
                message: e.to_string(),
            })?;
        log::debug!("Generated {}", output_path.display());

        processed_files.push(output_path);
        progress.report(percent_done(index + 1, total));
    }

    archive::create_archive(&processed_files, output_dir)
}
