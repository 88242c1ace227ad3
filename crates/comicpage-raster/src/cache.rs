use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::RasterCanvas;
use crate::error::Result;
use crate::halftone::{HalftoneEngine, ScreenAngles};

/// A derived look of an image layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageEffect {
    /// The image as loaded.
    #[default]
    None,
    Greyscale,
    /// Colour halftone: one screen per channel.
    RgbHalftone { cell_size: u32 },
    /// Black and white halftone of the greyscale image.
    BwHalftone { cell_size: u32 },
}

impl ImageEffect {
    /// The same effect with a different halftone cell size; other effects are unchanged.
    pub fn with_cell_size(self, cell_size: u32) -> Self {
        match self {
            ImageEffect::RgbHalftone { .. } => ImageEffect::RgbHalftone { cell_size },
            ImageEffect::BwHalftone { .. } => ImageEffect::BwHalftone { cell_size },
            other => other,
        }
    }

    pub fn is_halftone(self) -> bool {
        matches!(
            self,
            ImageEffect::RgbHalftone { .. } | ImageEffect::BwHalftone { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct EffectKey {
    source: Uuid,
    version: u64,
    effect: ImageEffect,
}

impl EffectKey {
    fn new(source: &RasterCanvas, effect: ImageEffect) -> Self {
        Self {
            source: source.id(),
            version: source.version(),
            effect,
        }
    }
}

/// Memoizes derived images by (source identity, source version, effect).
///
/// A lookup with a newer version of a source drops everything derived from
/// its older versions. Each source version keeps at most its greyscale image
/// and one halftone; storing another halftone replaces the previous one.
/// Sources that disappear from the page are dropped with
/// [`EffectCache::retain_sources`].
#[derive(Debug, Default)]
pub struct EffectCache {
    angles: ScreenAngles,
    entries: HashMap<EffectKey, Arc<RasterCanvas>>,
    hits: u64,
    misses: u64,
}

impl EffectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_angles(angles: ScreenAngles) -> Self {
        Self {
            angles,
            ..Self::default()
        }
    }

    /// Returns `source` with `effect` applied, computing it only on a cache miss.
    pub fn get_or_apply(
        &mut self,
        source: &Arc<RasterCanvas>,
        effect: ImageEffect,
    ) -> Result<Arc<RasterCanvas>> {
        if effect == ImageEffect::None {
            return Ok(Arc::clone(source));
        }
        let key = EffectKey::new(source, effect);
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            log::debug!("Effect cache hit for {:?} of {}", effect, source.id());
            return Ok(Arc::clone(hit));
        }

        self.misses += 1;
        log::debug!("Effect cache miss for {:?} of {}", effect, source.id());
        self.evict_stale(source);
        let derived = match effect {
            ImageEffect::None => return Ok(Arc::clone(source)),
            ImageEffect::Greyscale => source.to_greyscale(),
            ImageEffect::RgbHalftone { cell_size } => {
                HalftoneEngine::new(cell_size)?.with_angles(self.angles).apply(source)?
            }
            ImageEffect::BwHalftone { cell_size } => {
                let engine = HalftoneEngine::new(cell_size)?.with_angles(self.angles);
                let grey = self.get_or_apply(source, ImageEffect::Greyscale)?;
                engine.apply(&grey)?
            }
        };
        Ok(self.insert(key, derived))
    }

    /// Records a result computed elsewhere, e.g. by a background
    /// [`HalftoneTask`](crate::HalftoneTask).
    pub fn store(
        &mut self,
        source: &RasterCanvas,
        effect: ImageEffect,
        derived: RasterCanvas,
    ) -> Arc<RasterCanvas> {
        self.evict_stale(source);
        self.insert(EffectKey::new(source, effect), derived)
    }

    /// Cached result, if any, without computing.
    pub fn get(&self, source: &RasterCanvas, effect: ImageEffect) -> Option<Arc<RasterCanvas>> {
        self.entries.get(&EffectKey::new(source, effect)).cloned()
    }

    /// Drops everything derived from the canvas with this id.
    pub fn forget(&mut self, source: Uuid) {
        self.entries.retain(|key, _| key.source != source);
    }

    /// Drops everything derived from canvases whose id is not in `live`.
    pub fn retain_sources(&mut self, live: &[Uuid]) {
        let before = self.entries.len();
        self.entries.retain(|key, _| live.contains(&key.source));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::debug!("Effect cache dropped {} entries of unused images", dropped);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    fn insert(&mut self, key: EffectKey, derived: RasterCanvas) -> Arc<RasterCanvas> {
        if key.effect.is_halftone() {
            self.entries.retain(|other, _| {
                other.source != key.source
                    || other.version != key.version
                    || !other.effect.is_halftone()
            });
        }
        let derived = Arc::new(derived);
        self.entries.insert(key, Arc::clone(&derived));
        derived
    }

    fn evict_stale(&mut self, source: &RasterCanvas) {
        let (id, version) = (source.id(), source.version());
        self.entries.retain(|key, _| key.source != id || key.version == version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ChannelMode, Color};

    fn photo() -> Arc<RasterCanvas> {
        let data = (0..16 * 16 * 3).map(|i| (i % 256) as u8).collect();
        Arc::new(RasterCanvas::from_raw(16, 16, ChannelMode::Rgb, data).unwrap())
    }

    #[test]
    fn test_none_effect_returns_source() {
        let mut cache = EffectCache::new();
        let source = photo();
        let out = cache.get_or_apply(&source, ImageEffect::None).unwrap();
        assert!(Arc::ptr_eq(&out, &source));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_second_lookup_hits() {
        let mut cache = EffectCache::new();
        let source = photo();
        let effect = ImageEffect::RgbHalftone { cell_size: 4 };
        let first = cache.get_or_apply(&source, effect).unwrap();
        let second = cache.get_or_apply(&source, effect).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_bw_halftone_reuses_greyscale() {
        let mut cache = EffectCache::new();
        let source = photo();
        let bw = cache.get_or_apply(&source, ImageEffect::BwHalftone { cell_size: 4 }).unwrap();
        assert_eq!(bw.mode(), ChannelMode::Grey);
        assert!(cache.get(&source, ImageEffect::Greyscale).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_new_version_evicts_old_entries() {
        let mut cache = EffectCache::new();
        let mut canvas = (*photo()).clone();
        cache.get_or_apply(&Arc::new(canvas.clone()), ImageEffect::Greyscale).unwrap();
        canvas.add_dot(0, 0, Color::WHITE);
        let source = Arc::new(canvas);
        cache.get_or_apply(&source, ImageEffect::Greyscale).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats(), (0, 2));
    }

    #[test]
    fn test_new_halftone_size_replaces_previous() {
        let mut cache = EffectCache::new();
        let source = photo();
        cache.get_or_apply(&source, ImageEffect::RgbHalftone { cell_size: 4 }).unwrap();
        cache.get_or_apply(&source, ImageEffect::RgbHalftone { cell_size: 6 }).unwrap();
        assert_eq!(cache.len(), 1);
        let replaced = ImageEffect::RgbHalftone { cell_size: 4 };
        assert!(cache.get(&source, replaced).is_none());

        // The greyscale base of a black and white halftone survives.
        cache.get_or_apply(&source, ImageEffect::BwHalftone { cell_size: 4 }).unwrap();
        cache.get_or_apply(&source, ImageEffect::BwHalftone { cell_size: 5 }).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&source, ImageEffect::Greyscale).is_some());
        let latest = ImageEffect::BwHalftone { cell_size: 5 };
        assert!(cache.get(&source, latest).is_some());
    }

    #[test]
    fn test_retain_sources_drops_unused_images() {
        let mut cache = EffectCache::new();
        let kept = photo();
        let gone = photo();
        cache.get_or_apply(&kept, ImageEffect::Greyscale).unwrap();
        cache.get_or_apply(&gone, ImageEffect::Greyscale).unwrap();
        assert_eq!(cache.len(), 2);
        cache.retain_sources(&[kept.id()]);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&kept, ImageEffect::Greyscale).is_some());
    }

    #[test]
    fn test_invalid_cell_size_is_reported() {
        let mut cache = EffectCache::new();
        let effect = ImageEffect::RgbHalftone { cell_size: 1 };
        assert!(cache.get_or_apply(&photo(), effect).is_err());
    }

    #[test]
    fn test_store_then_get() {
        let mut cache = EffectCache::new();
        let source = photo();
        let effect = ImageEffect::RgbHalftone { cell_size: 3 };
        let computed = HalftoneEngine::new(3).unwrap().apply(&source).unwrap();
        cache.store(&source, effect, computed);
        assert!(cache.get(&source, effect).is_some());
        cache.forget(source.id());
        assert!(cache.is_empty());
    }
}
