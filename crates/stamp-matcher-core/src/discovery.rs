use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::processing::classify::has_known_extension;
use crate::types::InputAsset;

/// Load assets from files and directories.
///
/// Files named directly are always loaded. Directories are walked
/// recursively and only files with a recognised image extension are taken,
/// sorted by path. Order across arguments follows the argument order.
pub fn load_assets<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<InputAsset>> {
    let mut assets = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }

        if path.is_dir() {
            for file in discover_image_files(path) {
                assets.push(load_asset(&file)?);
            }
        } else {
            assets.push(load_asset(path)?);
        }
    }

    debug!("Loaded {} assets", assets.len());
    Ok(assets)
}

/// Read one file into an asset named after its file name
pub fn load_asset(path: &Path) -> Result<InputAsset> {
    let raw_bytes = fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(InputAsset { name, raw_bytes })
}

/// Image files under `directory`, sorted by path
fn discover_image_files(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", directory.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_image_path(path))
        .collect();

    files.sort();
    files
}

/// Returns if the given path has an image extension
pub fn is_image_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(has_known_extension)
        .unwrap_or(false)
}

// -- Tests --

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn create_test_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
        let file_path = dir.join(name);
        let mut file = File::create(&file_path).unwrap();
        file.write_all(contents).unwrap();
        file_path
    }

    fn setup_test_directory() -> tempfile::TempDir {
        let dir = tempdir().unwrap();

        let subdir_path = dir.path().join("subdir");
        fs::create_dir(&subdir_path).unwrap();

        create_test_file(dir.path(), "b.svg", b"<svg/>");
        create_test_file(dir.path(), "a.png", b"DUMMY IMAGE DATA");
        create_test_file(&subdir_path, "c.jpg", b"DUMMY IMAGE DATA");
        create_test_file(dir.path(), "document.txt", b"NOT AN IMAGE");

        dir
    }

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("test.jpg")));
        assert!(is_image_path(Path::new("test.svg")));
        assert!(is_image_path(Path::new("dir/test.PNG")));
        assert!(!is_image_path(Path::new("test.txt")));
        assert!(!is_image_path(Path::new("test")));
    }

    #[test]
    fn test_directory_is_walked_in_sorted_order() {
        let dir = setup_test_directory();

        let assets = load_assets(&[dir.path()]).unwrap();
        let names: Vec<&str> = assets.iter().map(|a| a.name.as_str()).collect();

        assert_eq!(names, vec!["a.png", "b.svg", "c.jpg"]);
        assert_eq!(assets[1].raw_bytes, b"<svg/>");
    }

    #[test]
    fn test_explicit_files_are_always_loaded() {
        let dir = setup_test_directory();
        let txt = dir.path().join("document.txt");
        let png = dir.path().join("a.png");

        let assets = load_assets(&[txt, png]).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].name, "document.txt");
        assert_eq!(assets[1].name, "a.png");
    }

    #[test]
    fn test_missing_path() {
        let result = load_assets(&[Path::new("/path/that/does/not/exist")]);
        assert!(matches!(result, Err(Error::FileNotFound(_))));
    }
}
