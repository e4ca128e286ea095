//! Shares one glyph atlas across renderers with identical configuration.
//!
//! Atlases are keyed by the content hash of their [`AtlasConfig`] and
//! reference counted explicitly: `acquire` bumps the count (creating the
//! atlas on first use), `release` drops it and disposes the atlas when the
//! last owner lets go.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cellgrid_fonts::CellMetrics;
use parking_lot::Mutex;

use super::{AtlasConfig, GlyphRasterizer, TextureAtlas};

/// Shared, lock-guarded atlas. Rasterize+pack+insert must hold the lock for
/// the whole operation; cached lookups take it briefly.
pub type AtlasHandle = Arc<Mutex<TextureAtlas>>;

struct Entry {
    atlas: AtlasHandle,
    refs: usize,
}

/// Content-addressed atlas cache.
#[derive(Default)]
pub struct AtlasInstanceCache {
    entries: HashMap<u64, Entry>,
}

impl AtlasInstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache most renderers share.
    pub fn global() -> &'static Mutex<AtlasInstanceCache> {
        static GLOBAL: OnceLock<Mutex<AtlasInstanceCache>> = OnceLock::new();
        GLOBAL.get_or_init(|| Mutex::new(AtlasInstanceCache::new()))
    }

    /// Get the atlas for a configuration, creating it on first acquire.
    /// The rasterizer factory only runs when a new atlas is built.
    pub fn acquire(
        &mut self,
        config: AtlasConfig,
        metrics: CellMetrics,
        make_rasterizer: impl FnOnce() -> Box<dyn GlyphRasterizer>,
    ) -> AtlasHandle {
        let key = config.content_hash();
        let entry = self.entries.entry(key).or_insert_with(|| {
            log::debug!("creating shared glyph atlas for config {key:#018x}");
            Entry {
                atlas: Arc::new(Mutex::new(TextureAtlas::new(
                    config,
                    metrics,
                    make_rasterizer(),
                ))),
                refs: 0,
            }
        });
        entry.refs += 1;
        Arc::clone(&entry.atlas)
    }

    /// Release one reference to the atlas with this config hash. The atlas
    /// is disposed when the count reaches zero.
    pub fn release(&mut self, config_hash: u64) {
        if let Some(entry) = self.entries.get_mut(&config_hash) {
            entry.refs -= 1;
            if entry.refs == 0 {
                log::debug!("disposing shared glyph atlas for config {config_hash:#018x}");
                self.entries.remove(&config_hash);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current reference count for a config hash (0 when absent).
    pub fn ref_count(&self, config_hash: u64) -> usize {
        self.entries.get(&config_hash).map_or(0, |e| e.refs)
    }
}
