//! Region construction: the phase driver and the frozen product.
//!
//! A region build is a fixed, synchronous sequence over one rectangular
//! tile area. No phase starts before the previous one has completed for
//! the whole region:
//!
//! 1. **Model** - every tile's handler makes free-form contributions with
//!    a tile-derived random stream
//! 2. **Seal** - `sfin` on all auxiliary entries
//! 3. **Lay + transition** - ground geometry and neighbor blending, again
//!    with per-tile streams
//! 4. **Normals** - `calcnrm` on all entries
//! 5. **Post-normals** - `postcalcnrm` on all entries (prop emission)
//! 6. **Batch freeze** - one mesh per layer, layers sorted by depth
//! 7. **Derived products** - flat/debug buffers, overlay channels, and
//!    auxiliary retain/evict
//!
//! The result is immutable: batches, extras, overlays and flats never
//! change until the caller releases the region.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Point2;
use fastrand::Rng;
use serde::Deserialize;

use crate::core::rng::with_tile_rng;
use crate::error::{BuildError, BuildResult};
use crate::meshing::aux_data::{AuxCache, AuxKey, BuildCtx, ConsHooks};
use crate::meshing::flat::{self, FlatSet};
use crate::meshing::layer::{Layer, LayerAcc, Shape};
use crate::meshing::mesh_buf::{FrozenMesh, MeshBuf};
use crate::meshing::overlay::{self, OVERLAY_CHANNELS};
use crate::meshing::surface::{GroundKey, GroundSurface};
use crate::meshing::transition;
use crate::rendering::state::{RenderState, StateCache, Texture};
use crate::terrain::source::TerrainSource;
use crate::terrain::tiler::Tiler;

/// World units per tile edge unless overridden in [`BuildParams`].
pub const DEFAULT_TILE_SIZE: f32 = 11.0;

fn default_tile_size() -> f32 {
    DEFAULT_TILE_SIZE
}

/// Inputs of one region build.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildParams {
    /// Seed of the region's deterministic random stream.
    pub seed: u64,
    /// Origin in global tile coordinates (upper-left corner).
    pub ul: Point2<i32>,
    /// Region size in tiles.
    pub sz: Point2<i32>,
    /// World units per tile edge.
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
}

impl BuildParams {
    /// Parameters with the default tile size.
    pub fn new(seed: u64, ul: Point2<i32>, sz: Point2<i32>) -> Self {
        BuildParams {
            seed,
            ul,
            sz,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }

    /// Parses parameters from JSON.
    pub fn from_json(json: &str) -> BuildResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// The immutable geometry of a region, as seen by patch consumers.
#[derive(Debug, Clone, Copy)]
pub struct RegionView {
    /// Origin in global tile coordinates.
    pub ul: Point2<i32>,
    /// Size in tiles.
    pub sz: Point2<i32>,
    /// World units per tile edge.
    pub tile_size: f32,
}

/// A standalone renderable emitted by a post-normal hook (prop geometry
/// outside the ground batches).
pub struct ExtraMesh {
    /// Render state the mesh is drawn with.
    pub state: Rc<RenderState>,
    /// The frozen mesh.
    pub mesh: FrozenMesh,
}

/// Mutable build state handed to terrain handlers during construction.
pub struct RegionBuilder<'a> {
    ul: Point2<i32>,
    sz: Point2<i32>,
    tile_size: f32,
    source: &'a dyn TerrainSource,
    aux: AuxCache,
    layers: Vec<LayerAcc>,
    extras: Vec<ExtraMesh>,
    states: StateCache,
}

impl<'a> RegionBuilder<'a> {
    fn new(source: &'a dyn TerrainSource, params: &BuildParams) -> Self {
        RegionBuilder {
            ul: params.ul,
            sz: params.sz,
            tile_size: params.tile_size,
            source,
            aux: AuxCache::default(),
            layers: Vec::new(),
            extras: Vec::new(),
            states: StateCache::default(),
        }
    }

    /// The world-data source backing this build.
    pub fn source(&self) -> &'a dyn TerrainSource {
        self.source
    }

    /// The region's immutable geometry.
    pub fn view(&self) -> RegionView {
        RegionView {
            ul: self.ul,
            sz: self.sz,
            tile_size: self.tile_size,
        }
    }

    /// Looks up (or lazily constructs) the auxiliary entry for `key`.
    pub fn data<K: AuxKey>(&mut self, key: K) -> Rc<RefCell<K::Value>> {
        let ctx = BuildCtx {
            ul: self.ul,
            sz: self.sz,
            tile_size: self.tile_size,
            source: self.source,
        };
        self.aux.get(key, &ctx)
    }

    /// The region's shared ground surface, constructed on first use.
    pub fn ground(&mut self) -> Rc<RefCell<GroundSurface>> {
        self.data(GroundKey)
    }

    /// Registers `shape` into the layer for `(z, state)`, creating the
    /// layer on first use. The scan over existing layers is linear; layer
    /// counts are bounded by the region's distinct material/depth pairs.
    pub fn register(&mut self, z: i32, state: Rc<RenderState>, shape: Box<dyn Shape>) {
        for l in &mut self.layers {
            if l.z == z && *l.state == *state {
                l.shapes.push(shape);
                return;
            }
        }
        self.layers.push(LayerAcc {
            z,
            state,
            shapes: vec![shape],
        });
    }

    /// Creates (or finds) the layer for `(z, state)` without contributing
    /// a shape. A layer left empty this way fails the build at freeze
    /// time; handlers should only pre-create layers they will fill.
    pub fn ensure_layer(&mut self, z: i32, state: Rc<RenderState>) {
        if !self.layers.iter().any(|l| l.z == z && *l.state == *state) {
            self.layers.push(LayerAcc {
                z,
                state,
                shapes: Vec::new(),
            });
        }
    }

    /// Resolves `tex` to the region's cached render state for it.
    pub fn state_for(&mut self, tex: &Texture, clip: bool) -> BuildResult<Rc<RenderState>> {
        self.states.state_for(tex, clip)
    }

    /// Queues a standalone renderable for the built region.
    pub fn push_extra(&mut self, state: Rc<RenderState>, mesh: FrozenMesh) {
        self.extras.push(ExtraMesh { state, mesh });
    }

    fn hooks(&self) -> Vec<Rc<RefCell<dyn ConsHooks>>> {
        self.aux.hooks()
    }
}

/// A built, immutable region ready for rendering.
pub struct Region {
    /// Origin in global tile coordinates.
    pub ul: Point2<i32>,
    /// Size in tiles.
    pub sz: Point2<i32>,
    /// Seed the region was built from.
    pub seed: u64,
    /// World units per tile edge.
    pub tile_size: f32,
    layers: Vec<Layer>,
    extras: Vec<ExtraMesh>,
    overlays: [Option<FrozenMesh>; OVERLAY_CHANNELS],
    flats: FlatSet,
    data: AuxCache,
    released: bool,
}

impl Region {
    /// Builds the region covering `sz` tiles from origin `ul`, with the
    /// default tile size. See [`Region::build_with`].
    pub fn build(
        source: &dyn TerrainSource,
        seed: u64,
        ul: Point2<i32>,
        sz: Point2<i32>,
    ) -> BuildResult<Region> {
        Region::build_with(source, &BuildParams::new(seed, ul, sz))
    }

    /// Builds a region. All seven construction phases run synchronously;
    /// any fatal error aborts the whole build and no region is returned.
    /// Two builds with equal parameters over unchanged source data produce
    /// bit-identical buffers.
    pub fn build_with(source: &dyn TerrainSource, params: &BuildParams) -> BuildResult<Region> {
        let mut m = RegionBuilder::new(source, params);
        let mut rng = Rng::with_seed(params.seed);
        let (ul, sz) = (params.ul, params.sz);

        // Phase 1: model contributions.
        for_each_tile(ul, sz, |lc, gc| {
            let t = tiler_for(source, gc)?;
            with_tile_rng(&mut rng, lc, |r| t.model(&mut m, r, lc, gc))
        })?;

        // Phase 2: seal primary geometry.
        for h in m.hooks() {
            h.borrow_mut().sfin();
        }

        // Phase 3: lay ground, then blend transitions.
        for_each_tile(ul, sz, |lc, gc| {
            let t = tiler_for(source, gc)?;
            with_tile_rng(&mut rng, lc, |r| {
                t.lay(&mut m, r, lc, gc)?;
                transition::apply(&mut m, r, lc, gc)
            })
        })?;

        // Phase 4: normals.
        for h in m.hooks() {
            h.borrow_mut().calcnrm();
        }

        // Phase 5: post-normal emissions, on the region-level stream.
        let hooks = m.hooks();
        for h in hooks {
            h.borrow_mut().postcalcnrm(&mut m, &mut rng);
        }

        // Phase 6: freeze one mesh per layer, then order by depth.
        let accs = std::mem::take(&mut m.layers);
        let mut layers = Vec::with_capacity(accs.len());
        for acc in accs {
            if acc.shapes.is_empty() {
                return Err(BuildError::EmptyLayer { z: acc.z });
            }
            let mut buf = MeshBuf::new();
            for s in &acc.shapes {
                s.build(&mut buf);
            }
            layers.push(Layer::new(acc.z, acc.state, buf.freeze()));
        }
        layers.sort_by_key(Layer::z);

        // Phase 7: derived products and auxiliary retention.
        let flats = flat::build_flats(&mut m)?;
        let overlays = overlay::build_overlays(&mut m)?;
        m.aux.retain_clean();

        log::debug!(
            "built region {}x{} at ({}, {}): {} layers, {} extras, {} overlay channels",
            sz.x,
            sz.y,
            ul.x,
            ul.y,
            layers.len(),
            m.extras.len(),
            overlays.iter().filter(|o| o.is_some()).count(),
        );

        Ok(Region {
            ul,
            sz,
            seed: params.seed,
            tile_size: params.tile_size,
            layers,
            extras: m.extras,
            overlays,
            flats,
            data: m.aux,
            released: false,
        })
    }

    /// The depth-ordered draw batches.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Standalone renderables emitted by post-normal hooks.
    pub fn extras(&self) -> &[ExtraMesh] {
        &self.extras
    }

    /// The mesh of overlay channel `channel`, if any tile populated it.
    /// Overlay meshes draw at [`order::OVERLAY`](crate::rendering::order).
    ///
    /// # Panics
    /// Panics if `channel >= 32`.
    pub fn overlay(&self, channel: usize) -> Option<&FrozenMesh> {
        self.overlays[channel].as_ref()
    }

    /// The flat/debug mesh variants.
    pub fn flat(&self) -> &FlatSet {
        &self.flats
    }

    /// The retained ground surface, for decal projection.
    pub fn ground(&self) -> Option<Rc<RefCell<GroundSurface>>> {
        self.data.find(&GroundKey)
    }

    /// Looks up a retained auxiliary entry. Only entries whose `clean`
    /// hook opted into retention survive the build.
    pub fn data<K: AuxKey>(&self, key: &K) -> Option<Rc<RefCell<K::Value>>> {
        self.data.find(key)
    }

    /// The region's immutable geometry.
    pub fn view(&self) -> RegionView {
        RegionView {
            ul: self.ul,
            sz: self.sz,
            tile_size: self.tile_size,
        }
    }

    /// Releases every buffer the region owns: batches, extras, overlays,
    /// flat variants, and retained auxiliary state. Must be called exactly
    /// once when the region is discarded; the caller is responsible for
    /// sequencing it against any renderer still reading the buffers. A
    /// second call warns and does nothing.
    pub fn release(&mut self) {
        if self.released {
            log::warn!(
                "region at ({}, {}) released more than once",
                self.ul.x,
                self.ul.y
            );
            return;
        }
        for l in &mut self.layers {
            l.release();
        }
        for e in &mut self.extras {
            e.mesh.release();
        }
        for o in self.overlays.iter_mut().flatten() {
            o.release();
        }
        self.flats.release();
        self.data.clear();
        self.released = true;
    }
}

fn tiler_for(source: &dyn TerrainSource, gc: Point2<i32>) -> BuildResult<Rc<dyn Tiler>> {
    let id = source.tile_at(gc);
    source
        .tiler(id)
        .ok_or(BuildError::MissingTiler { id, x: gc.x, y: gc.y })
}

fn for_each_tile(
    ul: Point2<i32>,
    sz: Point2<i32>,
    mut f: impl FnMut(Point2<i32>, Point2<i32>) -> BuildResult<()>,
) -> BuildResult<()> {
    for y in 0..sz.y {
        for x in 0..sz.x {
            let lc = Point2::new(x, y);
            let gc = Point2::new(ul.x + x, ul.y + y);
            f(lc, gc)?;
        }
    }
    Ok(())
}
