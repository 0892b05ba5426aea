use image::GenericImageView;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use winit::event_loop::EventLoopProxy;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::archive::{open_archive, ArchiveError, ArchiveIndex, ImageEntry};

// ---------------------------------------------------------------------------
// Decoded page data (CPU side, blitted straight into the framebuffer)
// ---------------------------------------------------------------------------

pub struct DecodedPage {
    pub rgba_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub name: String,
    pub format_name: String,
}

impl DecodedPage {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("failed to open entry {name}: {source}")]
    Open { name: String, source: ZipError },
    #[error("failed to read entry {name}: {source}")]
    Read {
        name: String,
        source: std::io::Error,
    },
    #[error("failed to decode {name} as {format}: {source}")]
    Decode {
        name: String,
        format: String,
        source: image::ImageError,
    },
}

/// Decode an entry's bytes, sniffing the format from its content.
pub fn decode_page(name: &str, bytes: &[u8]) -> Result<DecodedPage, PageError> {
    let format_name = image::guess_format(bytes)
        .ok()
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("unknown")
        .to_uppercase();

    let img = image::load_from_memory(bytes).map_err(|source| PageError::Decode {
        name: name.to_string(),
        format: format_name.clone(),
        source,
    })?;

    let (width, height) = img.dimensions();
    Ok(DecodedPage {
        rgba_bytes: img.into_rgba8().into_raw(),
        width,
        height,
        name: name.to_string(),
        format_name,
    })
}

/// Upper bound on the buffer pre-allocated from an entry's declared size.
const MAX_SIZE_HINT: u64 = 64 << 20;

fn read_entry(archive: &mut ZipArchive<File>, entry: &ImageEntry) -> Result<Vec<u8>, PageError> {
    let mut file = archive
        .by_index(entry.archive_index)
        .map_err(|source| PageError::Open {
            name: entry.name.clone(),
            source,
        })?;
    // The declared size comes from the archive and may be garbage
    let mut bytes = Vec::with_capacity(file.size().min(MAX_SIZE_HINT) as usize);
    file.read_to_end(&mut bytes)
        .map_err(|source| PageError::Read {
            name: entry.name.clone(),
            source,
        })?;
    Ok(bytes)
}

// ---------------------------------------------------------------------------
// Page list (shared between the UI and the decoder thread via Mutex)
// ---------------------------------------------------------------------------

/// Fixed-length page list. Each slot is written at most once.
pub struct PageStore {
    slots: Vec<Option<Arc<DecodedPage>>>,
    failed: HashSet<usize>,
}

pub type SharedPages = Arc<Mutex<PageStore>>;

impl PageStore {
    pub fn new(page_count: usize) -> Self {
        Self {
            slots: (0..page_count).map(|_| None).collect(),
            failed: HashSet::new(),
        }
    }

    pub fn shared(page_count: usize) -> SharedPages {
        Arc::new(Mutex::new(Self::new(page_count)))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Arc<DecodedPage>> {
        self.slots.get(idx).and_then(|s| s.clone())
    }

    /// Publish a decoded page. Returns false if the slot is out of range or already taken.
    pub fn insert(&mut self, idx: usize, page: DecodedPage) -> bool {
        match self.slots.get_mut(idx) {
            Some(slot @ None) => {
                *slot = Some(Arc::new(page));
                true
            }
            _ => false,
        }
    }

    pub fn mark_failed(&mut self, idx: usize) {
        if idx < self.slots.len() {
            self.failed.insert(idx);
        }
    }

    pub fn is_failed(&self, idx: usize) -> bool {
        self.failed.contains(&idx)
    }

    pub fn decoded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Cheap copy of the slot handles so drawing can happen without the lock.
    pub fn snapshot(&self) -> Vec<Option<Arc<DecodedPage>>> {
        self.slots.clone()
    }

    pub fn sizes(&self) -> Vec<Option<(u32, u32)>> {
        self.slots
            .iter()
            .map(|s| s.as_ref().map(|p| p.size()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Decode pass
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeSummary {
    pub decoded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Re-open the archive and decode every image entry into the slot of the same
/// ordinal. Per-entry failures are logged and leave their slot empty.
/// `on_page` is called after each slot has been settled.
pub fn decode_archive(
    index: &ArchiveIndex,
    pages: &SharedPages,
    mut on_page: impl FnMut(usize),
) -> Result<DecodeSummary, ArchiveError> {
    let start = Instant::now();
    let mut archive = open_archive(&index.path)?;
    let total = index.len();
    let mut summary = DecodeSummary::default();

    for (slot, entry) in index.entries.iter().enumerate() {
        log::debug!("[{}/{}] {}", slot + 1, total, entry.name);
        let result = read_entry(&mut archive, entry)
            .and_then(|bytes| decode_page(&entry.name, &bytes));

        match result {
            Ok(page) => {
                log::trace!(
                    "{}: {}x{} {}",
                    page.name, page.width, page.height, page.format_name
                );
                if pages.lock().unwrap().insert(slot, page) {
                    summary.decoded += 1;
                } else {
                    log::warn!("slot {} already filled, dropping {}", slot + 1, entry.name);
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                pages.lock().unwrap().mark_failed(slot);
                summary.failed += 1;
            }
        }
        on_page(slot);
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

// ---------------------------------------------------------------------------
// User event for waking the UI from the decoder thread
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum UserEvent {
    PageReady(usize),
    DecodeFinished,
    ArchiveLost(String),
}

pub fn spawn_decoder(
    index: Arc<ArchiveIndex>,
    pages: SharedPages,
    proxy: EventLoopProxy<UserEvent>,
) {
    thread::spawn(move || {
        let result = decode_archive(&index, &pages, |slot| {
            let _ = proxy.send_event(UserEvent::PageReady(slot));
        });

        match result {
            Ok(summary) => {
                log::info!(
                    "Loaded {}/{} pages in {:.2}s ({} failed)",
                    summary.decoded,
                    index.len(),
                    summary.elapsed.as_secs_f64(),
                    summary.failed
                );
                let _ = proxy.send_event(UserEvent::DecodeFinished);
            }
            Err(e) => {
                let _ = proxy.send_event(UserEvent::ArchiveLost(e.to_string()));
            }
        }
    });
}
