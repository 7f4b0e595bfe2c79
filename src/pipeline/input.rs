//! Input resolution: list eligible images and validate stage directories.
//!
//! Both the Batch Converter and the Layout Engine read a directory of images
//! filtered by the same extension allow-list. Directory-level failures are the
//! only fatal errors in the pipeline, so they are raised here, before any unit
//! of work is dispatched, and never half-way through a batch.

use crate::error::ProxyError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File extensions (lower-case, without dot) accepted as card images.
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "tiff", "bmp"];

/// Whether `path` has an allow-listed image extension (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// List allow-listed image files directly inside `dir`, sorted by file name.
///
/// Sub-directories are ignored. A missing or unreadable directory is fatal
/// for the calling stage.
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, ProxyError> {
    let unreadable = |source| ProxyError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let path = entry.map_err(unreadable)?.path();
        if path.is_file() && is_supported_image(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    debug!("Found {} images in {}", files.len(), dir.display());
    Ok(files)
}

/// Create `dir` if needed and check that files can be created inside it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), ProxyError> {
    let unwritable = |source| ProxyError::OutputDirUnwritable {
        path: dir.to_path_buf(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(unwritable)?;
    // Check with a real file: permissions alone don't cover read-only mounts.
    tempfile::NamedTempFile::new_in(dir).map_err(unwritable)?;
    Ok(())
}

/// Output path for a source image: same stem, `.png` extension.
pub fn normalized_output_path(source: &Path, output_dir: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    let mut name = stem;
    name.push(".png");
    output_dir.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a.PNG")));
        assert!(is_supported_image(Path::new("b.Jpeg")));
        assert!(is_supported_image(Path::new("c.tiff")));
        assert!(is_supported_image(Path::new("d.bmp")));
        assert!(!is_supported_image(Path::new("e.gif")));
        assert!(!is_supported_image(Path::new("f.tif")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["zeta.png", "alpha.JPG", "notes.txt", "mid.bmp"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let names: Vec<String> = list_images(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha.JPG", "mid.bmp", "zeta.png"]);
    }

    #[test]
    fn missing_input_dir_is_fatal() {
        let err = list_images(Path::new("/definitely/not/a/real/dir")).unwrap_err();
        assert!(matches!(err, ProxyError::InputDirUnreadable { .. }));
    }

    #[test]
    fn ensure_output_dir_creates_nested() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/cartas");
        ensure_output_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // The temp file must not be left behind.
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
    }

    #[test]
    fn output_path_keeps_stem() {
        let out = normalized_output_path(Path::new("imagens/(2x)bolt.jpg"), Path::new("cartas"));
        assert_eq!(out, PathBuf::from("cartas/(2x)bolt.png"));
    }
}
