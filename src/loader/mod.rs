//! Loading of complete maps.
//!
//! A map is loaded in a fixed sequence of [stages](Stage).
//! The first failing stage aborts the load, no partially loaded map is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::decoder::{decode_tile_data, Compression, Encoding};
use crate::{
    math, Error, Image, Layer, LayerId, LayerKind, Map, Result, TileData, TileSet, TilesetCache, GID,
    GID_FLIP_MASK,
};

mod tmj;
mod tmx;

/// Settings for a [Loader].
///
/// Can be embedded into the configuration of the host application,
/// missing fields keep their default values.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Maximum nesting depth of group layers. Top level layers have depth 0.
    pub max_group_depth: usize,

    /// Reject maps containing tiles that belong to none of the tilesets.
    pub validate_tile_gids: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self{
            max_group_depth: 64,
            validate_tile_gids: false,
        }
    }
}

impl LoaderOptions {
    pub fn with_max_group_depth(mut self, max_group_depth: usize) -> Self {
        self.max_group_depth = max_group_depth;
        self
    }

    pub fn with_validate_tile_gids(mut self, validate_tile_gids: bool) -> Self {
        self.validate_tile_gids = validate_tile_gids;
        self
    }
}

/// File formats a map can be stored in.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum MapFormat {
    /// XML based format
    Tmx,
    /// JSON based format
    Tmj,
}

impl MapFormat {
    /// Pick the format based on the file extension.
    pub fn detect(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tmx") => Ok(MapFormat::Tmx),
            Some("tmj") | Some("json") => Ok(MapFormat::Tmj),
            _ => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// The steps a map goes through while loading.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum Stage {
    DetectFormat,
    ParseHeader,
    ParseTilesets,
    ParseLayerTree,
    ResolveExternalTilesets,
    FinalizeDerivedFields,
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::DetectFormat => "detect format",
            Stage::ParseHeader => "parse header",
            Stage::ParseTilesets => "parse tilesets",
            Stage::ParseLayerTree => "parse layer tree",
            Stage::ResolveExternalTilesets => "resolve external tilesets",
            Stage::FinalizeDerivedFields => "finalize derived fields",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

pub(crate) fn run_stage<T>(stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    tracing::debug!(%stage, "entering stage");
    f().map_err(|e| {
        tracing::debug!(%stage, error = %e, "stage failed");
        e
    })
}

/// Tileset reference of a map, before external tilesets are loaded.
pub(crate) enum TilesetEntry {
    Embedded(TileSet),
    External{ firstgid: u32, source: String },
}

/// Result of the syntax specific parsing stages.
pub(crate) struct ParsedMap {
    pub map: Map,
    pub tilesets: Vec<TilesetEntry>,
}

/// Builder for the layer arena of a map.
#[derive(Default)]
pub(crate) struct LayerArena {
    layers: Vec<Layer>,
    roots: Vec<LayerId>,
}

impl LayerArena {
    /// Add a layer as last child of `parent`, or as top level layer.
    pub fn push(&mut self, mut layer: Layer, parent: Option<LayerId>) -> LayerId {
        let id = LayerId(self.layers.len());
        layer.parent = parent;
        match parent {
            None => self.roots.push(id),
            Some(parent) => {
                if let LayerKind::Group(group) = &mut self.layers[parent.0].kind {
                    group.children.push(id);
                }
            },
        }
        self.layers.push(layer);
        id
    }

    pub fn install(self, map: &mut Map) {
        map.layers = self.layers;
        map.roots = self.roots;
    }
}

pub(crate) fn check_depth(depth: usize, options: &LoaderOptions) -> Result<()> {
    if depth > options.max_group_depth {
        return Err(Error::DepthExceeded{ limit: options.max_group_depth });
    }
    Ok(())
}

pub(crate) fn check_tile_size(map: &Map) -> Result<()> {
    if map.tile_size.x <= 0 || map.tile_size.y <= 0 {
        return Err(Error::StructureError{
            tag: "map".into(),
            msg: format!("Invalid tile size {}x{}", map.tile_size.x, map.tile_size.y),
        });
    }
    Ok(())
}

pub(crate) fn check_firstgid(firstgid: u32) -> Result<u32> {
    if firstgid == 0 || firstgid > !GID_FLIP_MASK {
        return Err(Error::StructureError{
            tag: "tileset".into(),
            msg: format!("firstgid {} outside of the GID range", firstgid),
        });
    }
    Ok(firstgid)
}

/// Turn raw tile values into cells, checking that they fill a grid of the given size.
pub(crate) fn cells_from_raw(label: &str, raw: Vec<u32>, size: math::ivec2) -> Result<Vec<Option<GID>>> {
    let expected = size.area();
    if raw.len() != expected {
        return Err(Error::LayerSize{ layer: label.to_string(), expected, actual: raw.len() });
    }
    Ok(raw.into_iter().map(GID::new).collect())
}

/// Decode an encoded tile data string into the cells of a grid of the given size.
pub(crate) fn decode_cells(
    label: &str, data: &str, encoding: Encoding, compression: Compression, size: math::ivec2
) -> Result<Vec<Option<GID>>> {
    let raw = decode_tile_data(data, encoding, compression).map_err(|e| match e {
        Error::Decode(msg) => Error::Decode(format!("layer '{}': {}", label, msg)),
        other => other,
    })?;
    cells_from_raw(label, raw, size)
}

/// Loads maps and resolves their external tilesets through a shared [TilesetCache].
///
/// A loader holds no state besides the cache, so it can be shared between threads.
#[derive(Debug, Clone)]
pub struct Loader {
    cache: Arc<TilesetCache>,
    options: LoaderOptions,
}

impl Loader {
    pub fn new(cache: Arc<TilesetCache>) -> Self {
        Self::with_options(cache, LoaderOptions::default())
    }

    pub fn with_options(cache: Arc<TilesetCache>, options: LoaderOptions) -> Self {
        Self{ cache, options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<TilesetCache> {
        &self.cache
    }

    /// Load a map file. The format is chosen based on the file extension:
    /// `.tmx` for XML, `.tmj` or `.json` for JSON.
    ///
    /// The file is read through the [Provider](crate::Provider) of the cache.
    pub fn load_file(&self, path: &Path) -> Result<Map> {
        let span = tracing::debug_span!("load_map", path = %path.display());
        let _enter = span.enter();

        let format = run_stage(Stage::DetectFormat, || MapFormat::detect(path))?;
        let data = self.cache.provider().read(path)?;
        let text = String::from_utf8(data)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        match format {
            MapFormat::Tmx => self.load_tmx_str(&text, base_dir),
            MapFormat::Tmj => self.load_tmj_str(&text, base_dir),
        }
    }

    /// Parse a map from xml data.
    /// Relative paths (tilesets, images) are resolved against `base_dir`.
    pub fn load_tmx_str(&self, tmx: &str, base_dir: &Path) -> Result<Map> {
        let parsed = tmx::parse(tmx, base_dir, &self.options)?;
        self.finish(parsed)
    }

    /// Parse a map from json data.
    /// Relative paths (tilesets, images) are resolved against `base_dir`.
    pub fn load_tmj_str(&self, tmj: &str, base_dir: &Path) -> Result<Map> {
        let parsed = tmj::parse(tmj, base_dir, &self.options)?;
        self.finish(parsed)
    }

    fn finish(&self, parsed: ParsedMap) -> Result<Map> {
        let ParsedMap{ mut map, tilesets } = parsed;

        map.tilesets = run_stage(Stage::ResolveExternalTilesets, || {
            self.resolve_tilesets(tilesets, &map.base_dir)
        })?;

        run_stage(Stage::FinalizeDerivedFields, || {
            for tileset in &mut map.tilesets {
                tileset.update_lastgid()?;
            }
            if self.options.validate_tile_gids {
                validate_tile_gids(&map)?;
            }
            Ok(())
        })?;

        tracing::debug!(
            stage = %Stage::Done,
            layers = map.layers.len(),
            tilesets = map.tilesets.len(),
            "map loaded"
        );
        Ok(map)
    }

    fn resolve_tilesets(&self, entries: Vec<TilesetEntry>, base_dir: &Path) -> Result<Vec<TileSet>> {
        entries.into_iter().map(|entry| match entry {
            TilesetEntry::Embedded(tileset) => Ok(tileset),
            TilesetEntry::External{ firstgid, source } => {
                let path = Image::resolve(base_dir, &source);
                let shared = self.cache.get_tileset(&path).map_err(|e| Error::Reference{
                    path: path.clone(),
                    source: Box::new(e),
                })?;

                // The cached tileset is shared between maps, the map gets its own copy
                let mut tileset = TileSet::clone(&shared);
                tileset.firstgid = firstgid;
                tileset.source = Some(PathBuf::from(source));
                Ok(tileset)
            },
        }).collect()
    }
}

fn validate_tile_gids(map: &Map) -> Result<()> {
    let index = map.gid_index();
    for (layer, _) in map.iter_layers() {
        let tiles = match &layer.kind {
            LayerKind::Tile(tiles) => tiles,
            _ => continue,
        };
        let cells: Box<dyn Iterator<Item=&Option<GID>>> = match &tiles.data {
            TileData::Finite(cells) => Box::new(cells.iter()),
            TileData::Chunked(chunks) => Box::new(chunks.iter().flat_map(|c| c.tiles.iter())),
        };
        for gid in cells.flatten() {
            if index.lookup(gid.as_raw()).is_none() {
                return Err(Error::UnknownGid{ layer: layer.name.clone(), gid: gid.to_id() });
            }
        }
    }
    Ok(())
}
