//! Rendered pages shared between the workers and the controller.
//!
//! A page is reusable only when it would come out pixel-identical, so the key
//! carries every parameter that changes the output. Scales are compared in
//! millionths: two layouts that agree to six decimals share an entry.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use super::request::RenderParams;
use super::types::RenderedPage;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// 1-based
    pub page: usize,
    pub scale_millionths: u32,
    pub resolution_boost: u8,
    pub render_text: bool,
}

impl CacheKey {
    #[must_use]
    pub fn from_params(page: usize, params: &RenderParams) -> Self {
        Self {
            page,
            scale_millionths: params.scale_millionths(),
            resolution_boost: params.resolution_boost,
            render_text: params.render_text,
        }
    }
}

/// Bounded store of rendered pages; the least recently used page goes first
pub struct PageCache {
    entries: LruCache<CacheKey, Arc<RenderedPage>>,
}

impl PageCache {
    /// A zero capacity is treated as one
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Look up a page and mark it as recently used
    #[must_use]
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RenderedPage>> {
        self.entries.get(key).map(Arc::clone)
    }

    pub fn insert(&mut self, key: CacheKey, page: RenderedPage) -> Arc<RenderedPage> {
        let shared = Arc::new(page);
        self.entries.put(key, Arc::clone(&shared));
        shared
    }
}

#[cfg(test)]
mod tests {
    use super::super::types::Bitmap;
    use super::*;

    fn at_scale(scale: f32) -> RenderParams {
        RenderParams {
            scale,
            resolution_boost: 1,
            render_text: false,
        }
    }

    fn rendered(page: usize) -> RenderedPage {
        RenderedPage {
            page,
            scale: 1.0,
            resolution_boost: 1,
            bitmap: Bitmap::blank(10, 10),
            text_layer: None,
        }
    }

    #[test]
    fn stored_page_is_shared_not_copied() {
        let mut cache = PageCache::new(4);
        let key = CacheKey::from_params(3, &at_scale(0.75));
        let stored = cache.insert(key.clone(), rendered(3));

        let fetched = cache.get(&key).unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));
        assert_eq!(fetched.page, 3);
    }

    #[test]
    fn least_recently_used_page_is_evicted() {
        let mut cache = PageCache::new(2);
        let key = |page| CacheKey::from_params(page, &at_scale(1.0));
        cache.insert(key(1), rendered(1));
        cache.insert(key(2), rendered(2));
        // Touch page 1 so page 2 becomes the oldest
        let _ = cache.get(&key(1));
        cache.insert(key(3), rendered(3));

        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(3)).is_some());
    }

    #[test]
    fn every_output_parameter_is_part_of_the_key() {
        let base = at_scale(1.0);
        let key = CacheKey::from_params(1, &base);

        assert_eq!(key, CacheKey::from_params(1, &at_scale(1.000_000_1)));
        assert_ne!(key, CacheKey::from_params(1, &at_scale(1.5)));
        assert_ne!(key, CacheKey::from_params(2, &base));
        let boosted = RenderParams {
            resolution_boost: 2,
            ..base
        };
        assert_ne!(key, CacheKey::from_params(1, &boosted));
        let with_text = RenderParams {
            render_text: true,
            ..base
        };
        assert_ne!(key, CacheKey::from_params(1, &with_text));
    }

    #[test]
    fn zero_capacity_still_holds_one_page() {
        let mut cache = PageCache::new(0);
        let first = CacheKey::from_params(1, &at_scale(1.0));
        let second = CacheKey::from_params(2, &at_scale(1.0));
        cache.insert(first.clone(), rendered(1));
        assert!(cache.get(&first).is_some());

        cache.insert(second.clone(), rendered(2));
        assert!(cache.get(&first).is_none());
        assert!(cache.get(&second).is_some());
    }
}
