//! Lazily constructed, key-addressed per-region helper state.
//!
//! Geometry handlers frequently need shared scratch state that outlives a
//! single tile: the height grid itself, a pooled mesh buffer per material,
//! a scatter map for props. Entries are created on first lookup through
//! their key's own factory, memoized for the region's lifetime, and walked
//! through a four-phase lifecycle at fixed points of the build. Keys
//! compare by value, so "one entry per distinct render state" falls out of
//! using the state as the key.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Point2;
use fastrand::Rng;

use crate::meshing::mesh_buf::MeshBuf;
use crate::meshing::region::RegionBuilder;
use crate::rendering::state::RenderState;
use crate::terrain::source::TerrainSource;

/// Context handed to auxiliary-entry factories: the region's geometry and
/// its world-data source, but none of its mutable build state.
pub struct BuildCtx<'a> {
    /// Region origin in global tile coordinates.
    pub ul: Point2<i32>,
    /// Region size in tiles.
    pub sz: Point2<i32>,
    /// World units per tile edge.
    pub tile_size: f32,
    /// The world-data source backing the build.
    pub source: &'a dyn TerrainSource,
}

/// Construction-phase lifecycle hooks.
///
/// All hooks default to no-ops (and `clean` to eviction), so entries
/// implement only the phases they participate in. Hooks run over every
/// cached entry in insertion order at each phase boundary, regardless of
/// which phase created the entry.
pub trait ConsHooks: Any {
    /// Called once all per-tile model contributions are done, before any
    /// ground is laid. Entries seal their primary geometry here.
    fn sfin(&mut self) {}

    /// Called after all lay/transition contributions; entries that own
    /// surface samples compute normals here.
    fn calcnrm(&mut self) {}

    /// Called after normals exist. Entries that emit standalone
    /// renderables (prop meshes) push them onto the builder here, drawing
    /// randomness from the region-level stream.
    fn postcalcnrm(&mut self, m: &mut RegionBuilder<'_>, rng: &mut Rng) {
        let _ = (m, rng);
    }

    /// Called at region freeze. Returning `false` evicts the entry;
    /// `true` retains it as queryable state for the region's lifetime.
    fn clean(&mut self) -> bool {
        false
    }
}

/// A typed auxiliary-entry key carrying its own factory.
///
/// Equality of keys (by value, via `PartialEq`) defines entry identity:
/// two keys comparing equal address the same cached entry even when they
/// are distinct objects.
pub trait AuxKey: PartialEq + 'static {
    /// The entry type this key constructs.
    type Value: ConsHooks + 'static;

    /// Builds the entry on first lookup.
    fn make(&self, ctx: &BuildCtx<'_>) -> Self::Value;
}

trait DynKey {
    fn as_any(&self) -> &dyn Any;
}

struct KeyCell<K: AuxKey>(K);

impl<K: AuxKey> DynKey for KeyCell<K> {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct AuxEntry {
    key: Box<dyn DynKey>,
    value: Rc<dyn Any>,
    hooks: Rc<RefCell<dyn ConsHooks>>,
}

/// Insertion-ordered entry store with linear-scan key lookup.
///
/// Entry counts are small (one per distinct key, typically a handful per
/// region), so a scan beats hashing through a type-erased key.
#[derive(Default)]
pub(crate) struct AuxCache {
    entries: Vec<AuxEntry>,
}

impl AuxCache {
    /// Looks up the entry for `key`, constructing and memoizing it on a
    /// miss.
    pub fn get<K: AuxKey>(&mut self, key: K, ctx: &BuildCtx<'_>) -> Rc<RefCell<K::Value>> {
        if let Some(hit) = self.find(&key) {
            return hit;
        }
        let cell = Rc::new(RefCell::new(key.make(ctx)));
        let value: Rc<dyn Any> = cell.clone();
        let hooks: Rc<RefCell<dyn ConsHooks>> = cell.clone();
        self.entries.push(AuxEntry {
            key: Box::new(KeyCell(key)),
            value,
            hooks,
        });
        cell
    }

    /// Lookup without construction.
    pub fn find<K: AuxKey>(&self, key: &K) -> Option<Rc<RefCell<K::Value>>> {
        for e in &self.entries {
            if let Some(cell) = e.key.as_any().downcast_ref::<KeyCell<K>>() {
                if cell.0 == *key {
                    let hit = e
                        .value
                        .clone()
                        .downcast::<RefCell<K::Value>>()
                        .ok()
                        .expect("aux entry value type is fixed by its key type");
                    return Some(hit);
                }
            }
        }
        None
    }

    /// Snapshot of every entry's lifecycle handle, in insertion order.
    pub fn hooks(&self) -> Vec<Rc<RefCell<dyn ConsHooks>>> {
        self.entries.iter().map(|e| e.hooks.clone()).collect()
    }

    /// Runs `clean` on every entry, dropping those that decline retention.
    pub fn retain_clean(&mut self) {
        self.entries.retain(|e| e.hooks.borrow_mut().clean());
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Pooled free-form geometry buffer for one render state.
///
/// Handlers that emit props or other non-ground geometry during the model
/// phase append into the pool for their material; after normals are
/// finalized the pool freezes once and pushes the result onto the region's
/// extra renderables.
pub struct MatModel {
    state: Rc<RenderState>,
    buf: MeshBuf,
}

impl MatModel {
    /// The pooled buffer; geometry appended here is frozen after the
    /// normal phase.
    pub fn buf(&mut self) -> &mut MeshBuf {
        &mut self.buf
    }

    /// Looks up (or creates) the pool for `state` on the builder.
    pub fn get(m: &mut RegionBuilder<'_>, state: Rc<RenderState>) -> Rc<RefCell<MatModel>> {
        m.data(MatKey(state))
    }
}

impl ConsHooks for MatModel {
    fn postcalcnrm(&mut self, m: &mut RegionBuilder<'_>, _rng: &mut Rng) {
        if self.buf.face_count() == 0 {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        m.push_extra(self.state.clone(), buf.freeze());
    }
}

/// Key of a [`MatModel`] pool: one entry per distinct render state.
pub struct MatKey(
    /// The render state the pooled geometry is drawn with.
    pub Rc<RenderState>,
);

impl PartialEq for MatKey {
    fn eq(&self, other: &Self) -> bool {
        *self.0 == *other.0
    }
}

impl AuxKey for MatKey {
    type Value = MatModel;

    fn make(&self, _ctx: &BuildCtx<'_>) -> MatModel {
        MatModel {
            state: self.0.clone(),
            buf: MeshBuf::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::state::WrapMode;
    use crate::terrain::source::TileId;

    struct NullSource;
    impl TerrainSource for NullSource {
        fn corner_height(&self, _gc: Point2<i32>) -> f32 {
            0.0
        }
        fn height_at(&self, _wc: Point2<f32>) -> f32 {
            0.0
        }
        fn tile_at(&self, _gc: Point2<i32>) -> TileId {
            0
        }
        fn tiler(&self, _id: TileId) -> Option<Rc<dyn crate::terrain::tiler::Tiler>> {
            None
        }
    }

    fn ctx(source: &NullSource) -> BuildCtx<'_> {
        BuildCtx {
            ul: Point2::new(0, 0),
            sz: Point2::new(4, 4),
            tile_size: 11.0,
            source,
        }
    }

    #[derive(PartialEq)]
    struct Counter(u32);

    struct CounterVal {
        made_from: u32,
    }
    impl ConsHooks for CounterVal {}

    impl AuxKey for Counter {
        type Value = CounterVal;
        fn make(&self, _ctx: &BuildCtx<'_>) -> CounterVal {
            CounterVal { made_from: self.0 }
        }
    }

    #[test]
    fn repeated_get_returns_same_entry() {
        let source = NullSource;
        let mut cache = AuxCache::default();
        let a = cache.get(Counter(1), &ctx(&source));
        let b = cache.get(Counter(1), &ctx(&source));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn attribute_equal_key_hits_the_cache() {
        // A fresh key object with equal attributes addresses the same
        // entry; only an unequal key constructs a second one.
        let source = NullSource;
        let mut cache = AuxCache::default();
        let a = cache.get(Counter(7), &ctx(&source));
        let b = cache.get(Counter(7), &ctx(&source));
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(a.borrow().made_from, 7);

        let c = cache.get(Counter(8), &ctx(&source));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clean_evicts_entries_that_decline_retention() {
        let source = NullSource;
        let mut cache = AuxCache::default();
        cache.get(Counter(1), &ctx(&source));
        cache.get(Counter(2), &ctx(&source));
        cache.retain_clean();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn mat_key_compares_render_state_by_value() {
        let s1 = Rc::new(RenderState {
            tex: 4,
            clipped: true,
            wrap: WrapMode::Repeat,
        });
        let s2 = Rc::new(RenderState {
            tex: 4,
            clipped: true,
            wrap: WrapMode::Repeat,
        });
        assert!(MatKey(s1) == MatKey(s2));
    }
}
