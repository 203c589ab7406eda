use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::{Texture, TextureRef};

/// Process-wide texture cache keyed by logical key (filename or generated
/// key).
///
/// Entries are non-owning: the cache never keeps a texture alive. A lookup
/// that finds an expired entry removes it and reports a miss, so the caller
/// regenerates and re-populates. This is the eviction policy — a texture is
/// gone exactly when the last referencing node is destroyed.
#[derive(Default)]
pub struct TextureCache {
    entries: HashMap<String, Weak<Texture>>,
}

impl TextureCache {
    pub fn new() -> TextureCache {
        TextureCache::default()
    }

    /// Returns the live texture under `key`, pruning an expired entry.
    pub fn lookup(&mut self, key: &str) -> Option<TextureRef> {
        match self.entries.get(key) {
            Some(weak) => match weak.upgrade() {
                Some(tex) => Some(tex),
                None => {
                    self.entries.remove(key);
                    None
                }
            },
            None => None,
        }
    }

    /// Returns the live texture under `key`, or builds one with `make` and
    /// records a weak handle to it.
    pub fn lookup_or_insert_with(
        &mut self,
        key: &str,
        make: impl FnOnce() -> TextureRef,
    ) -> TextureRef {
        if let Some(tex) = self.lookup(key) {
            return tex;
        }
        let tex = make();
        self.entries.insert(key.to_string(), Rc::downgrade(&tex));
        tex
    }

    /// Records a weak handle under the texture's own key.
    pub fn insert(&mut self, tex: &TextureRef) {
        self.entries.insert(tex.key().to_string(), Rc::downgrade(tex));
    }

    /// Drops every entry. Test isolation hook; live textures held by nodes
    /// are unaffected, only the cache forgets them.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static CACHE: state::LocalInitCell<RefCell<TextureCache>> = state::LocalInitCell::new();

/// The process-wide cache (one per thread; the scene graph is
/// single-threaded). Initialized on first use.
pub fn texture_cache() -> &'static RefCell<TextureCache> {
    CACHE.set(|| RefCell::new(TextureCache::new()));
    CACHE.get()
}
