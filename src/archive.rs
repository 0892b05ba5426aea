use std::fs::File;
use std::path::{Path, PathBuf};
use zip::ZipArchive;
use zip::result::ZipError;

/// Suffixes that mark an entry as a page. Matched case-sensitively.
const IMAGE_SUFFIXES: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a readable zip archive: {source}", .path.display())]
    Container { path: PathBuf, source: ZipError },
}

pub fn is_image_name(name: &str) -> bool {
    IMAGE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

fn is_dir_name(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}

/// One page-candidate entry: its position in the zip central directory and its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub archive_index: usize,
    pub name: String,
}

/// Result of the first pass over an archive. Its length sizes the page list.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    pub path: PathBuf,
    pub entries: Vec<ImageEntry>,
}

impl ArchiveIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn open_archive(path: &Path) -> Result<ZipArchive<File>, ArchiveError> {
    let file = File::open(path).map_err(|source| ArchiveError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| ArchiveError::Container {
        path: path.to_path_buf(),
        source,
    })
}

/// Enumerate the image entries of the archive at `path`, in archive order.
pub fn scan_archive(path: &Path) -> Result<ArchiveIndex, ArchiveError> {
    let archive = open_archive(path)?;

    let entries: Vec<ImageEntry> = (0..archive.len())
        .filter_map(|i| {
            let name = archive.name_for_index(i)?;
            if is_dir_name(name) || !is_image_name(name) {
                log::trace!("skipping entry {}", name);
                return None;
            }
            Some(ImageEntry {
                archive_index: i,
                name: name.to_string(),
            })
        })
        .collect();

    log::info!(
        "{}: {} entries, {} pages",
        path.display(),
        archive.len(),
        entries.len()
    );

    Ok(ArchiveIndex {
        path: path.to_path_buf(),
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{png_bytes, write_archive, Entry};

    #[test]
    fn image_suffixes_are_case_sensitive() {
        assert!(is_image_name("001.jpg"));
        assert!(is_image_name("dir/002.jpeg"));
        assert!(is_image_name("003.png"));
        assert!(is_image_name("004.webp"));
        assert!(!is_image_name("005.JPG"));
        assert!(!is_image_name("ComicInfo.xml"));
        assert!(!is_image_name("png"));
    }

    #[test]
    fn scan_counts_only_image_files() {
        let png = png_bytes(4, 4);
        let archive = write_archive(&[
            Entry::Dir("chapter1/"),
            Entry::File("chapter1/01.png", png.clone()),
            Entry::File("ComicInfo.xml", b"<ComicInfo/>".to_vec()),
            Entry::File("chapter1/02.jpg", png.clone()),
            Entry::File("cover.PNG", png.clone()),
            Entry::File("chapter1/03.webp", png),
        ]);

        let index = scan_archive(archive.path()).unwrap();
        let names: Vec<&str> = index.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            ["chapter1/01.png", "chapter1/02.jpg", "chapter1/03.webp"]
        );
        assert_eq!(index.len(), 3);
        assert_eq!(index.entries[0].archive_index, 1);
        assert_eq!(index.entries[2].archive_index, 5);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = scan_archive(&dir.path().join("nope.cbz")).unwrap_err();
        assert!(matches!(err, ArchiveError::Open { .. }));
        assert!(err.to_string().contains("nope.cbz"));
    }

    #[test]
    fn non_zip_is_a_container_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"definitely not a zip").unwrap();
        let err = scan_archive(file.path()).unwrap_err();
        assert!(matches!(err, ArchiveError::Container { .. }));
    }

    #[test]
    fn empty_archive_has_no_pages() {
        let archive = write_archive(&[]);
        let index = scan_archive(archive.path()).unwrap();
        assert!(index.is_empty());
    }
}
