//! ZIP bundling of generated images

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::EngineError;

/// File name of the archive produced in the output directory
pub const ARCHIVE_NAME: &str = "generated_images.zip";

/// Bundle `images` into `<output_dir>/generated_images.zip`, replacing any previous archive.
pub fn create_archive(images: &[PathBuf], output_dir: &Path) -> Result<PathBuf, EngineError> {
    let archive_path = output_dir.join(ARCHIVE_NAME);
    let file = File::create(&archive_path)?;

    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for image_path in images {
        let name = image_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("processed_image.jpg");

        zip.start_file(name, options)?;
        let data = fs::read(image_path)?;
        zip.write_all(&data)?;
        log::trace!("Added {} to archive", name);
    }

    zip.finish()?;
    log::info!(
        "📦 Archived {} images into {}",
        images.len(),
        archive_path.display()
    );

    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn test_archive_contains_every_image() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a_processed.jpg");
        let second = dir.path().join("b_processed.jpg");
        fs::write(&first, b"first").unwrap();
        fs::write(&second, b"second").unwrap();

        let archive_path = create_archive(&[first, second], dir.path()).unwrap();
        assert_eq!(archive_path, dir.path().join(ARCHIVE_NAME));

        let mut archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);

        let mut contents = String::new();
        archive
            .by_name("b_processed.jpg")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "second");
    }

    #[test]
    fn test_missing_input_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = create_archive(&[dir.path().join("gone.jpg")], dir.path());
        assert!(matches!(result, Err(EngineError::Io(_))));
    }
}
