//! File system helpers: native dialogs, template image uploads, and
//! revealing the generated archive.

use std::path::{Path, PathBuf};

use crate::error::{FileError, OpenError};

const IMAGE_FILTER: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

/// Ask the user for a folder of source photos
pub async fn pick_folder() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select Source Folder")
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}

/// Ask the user for a template image
pub async fn pick_template_image() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select Template Image")
        .add_filter("Images", &IMAGE_FILTER)
        .pick_file()
        .await
        .map(|handle| handle.path().to_path_buf())
}

/// Name under which an upload is stored: `<unix-ts>_<name with '.' replaced>.<ext>`
fn stored_name(source: &Path, timestamp: i64) -> String {
    let file_name = source
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "_"))
        .unwrap_or_else(|| "template".to_string());
    let extension = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_else(|| "jpg".to_string());

    format!("{}_{}.{}", timestamp, file_name, extension)
}

/// Copy an uploaded image into `images_dir` and return the stored path
pub async fn save_template_image(images_dir: PathBuf, source: PathBuf) -> Result<PathBuf, FileError> {
    if !tokio::fs::metadata(&source).await?.is_file() {
        return Err(FileError::NotAFile(source));
    }

    tokio::fs::create_dir_all(&images_dir).await?;
    let target = images_dir.join(stored_name(&source, chrono::Utc::now().timestamp()));
    tokio::fs::copy(&source, &target).await?;

    log::info!("📥 Saved template image {}", target.display());
    Ok(target)
}

/// Pixel size of an image, read from its header
pub async fn image_dimensions(path: PathBuf) -> Result<(u32, u32), FileError> {
    tokio::task::spawn_blocking(move || image::image_dimensions(&path))
        .await
        .map_err(|e| FileError::Io(e.to_string()))?
        .map_err(|e| FileError::Io(e.to_string()))
}

/// Reveal the folder containing a generated archive
pub fn open_archive(path: &Path) -> Result<(), OpenError> {
    if !path.is_file() {
        return Err(OpenError::Missing(path.to_path_buf()));
    }

    let folder = path.parent().unwrap_or(path);
    log::info!("📂 Opening {}", folder.display());
    open::that(folder).map_err(|e| OpenError::Opener(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_stored_name() {
        assert_eq!(
            stored_name(Path::new("/tmp/My Card.PNG"), 1700000000),
            "1700000000_My Card_PNG.png"
        );
        assert_eq!(
            stored_name(Path::new("/tmp/card"), 5),
            "5_card.jpg"
        );
    }

    #[tokio::test]
    async fn test_save_template_image_copies_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("card.png");
        std::fs::write(&source, b"png bytes").unwrap();
        let images_dir = dir.path().join("template_images");

        let stored = save_template_image(images_dir.clone(), source).await.unwrap();
        assert_eq!(stored.parent().unwrap(), images_dir);
        assert!(stored.file_name().unwrap().to_string_lossy().ends_with("_card_png.png"));
        assert_eq!(std::fs::read(&stored).unwrap(), b"png bytes");
    }

    #[tokio::test]
    async fn test_save_template_image_rejects_folder_and_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let images_dir = dir.path().join("template_images");

        assert_eq!(
            save_template_image(images_dir.clone(), dir.path().to_path_buf()).await,
            Err(FileError::NotAFile(dir.path().to_path_buf()))
        );
        assert!(matches!(
            save_template_image(images_dir, dir.path().join("gone.png")).await,
            Err(FileError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        RgbImage::from_pixel(64, 32, Rgb([1, 2, 3])).save(&path).unwrap();

        assert_eq!(image_dimensions(path).await.unwrap(), (64, 32));
    }

    #[test]
    fn test_open_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generated_images.zip");
        assert_eq!(open_archive(&path), Err(OpenError::Missing(path.clone())));
    }
}
