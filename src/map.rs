use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{
    math, Color, Layer, LayerId, LayerIterator, LayerKind, Loader, Orientation, PropertyContainer,
    Renderorder, Result, TileSet, TilesetCache, Version, GID, GID_DIAGONAL_FLIP_FLAG, GID_FLIP_MASK,
    GID_HORIZONTAL_FLIP_FLAG, GID_VERTICAL_FLIP_FLAG,
};

/// The Map struct is the top level container for all relevant data inside of a Tiled map.
/// A Map consists of [TileSets](TileSet) and [Layers](Layer).
/// Stacking the layers in iteration order creates the final map image.
/// Each layer contains indices ([GIDs](GID)) referencing a specific tile in a tile sets.
///
/// Layers are stored in a flat arena and addressed by [LayerId].
/// Group layers refer to their children by id.
#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub struct Map {
    pub version: Version,
    pub editor_version: Option<Version>,
    pub orientation: Orientation,
    pub renderorder: Renderorder,
    pub class: String,

    /// Size of the map in tiles. Not meaningful for infinite maps.
    pub size: math::ivec2,
    /// Size of a tile in pixels.
    pub tile_size: math::ivec2,
    pub infinite: bool,
    pub next_layer_id: u32,
    pub next_object_id: u32,
    pub parallax_origin: math::fvec2,

    /// Background color of this map.
    /// By default fully transparent.
    pub backgroundcolor: Color,

    /// Tilesets in the order of the file, which is also ascending firstgid order.
    pub tilesets: Vec<TileSet>,

    /// Directory the map was loaded from. Relative paths in the map are resolved against it.
    pub base_dir: PathBuf,

    /// Custom properties contained in this map.
    pub properties: PropertyContainer,

    pub(crate) layers: Vec<Layer>,
    pub(crate) roots: Vec<LayerId>,
}

impl Map {
    /// Load a map file with a private tileset cache.
    /// Use a [Loader] to share tilesets between multiple maps.
    pub fn from_file(path: &Path) -> Result<Self> {
        Loader::new(Arc::new(TilesetCache::new())).load_file(path)
    }

    pub(crate) fn empty(version: Version) -> Self {
        Self{
            version,
            editor_version: None,
            orientation: Orientation::default(),
            renderorder: Renderorder::default(),
            class: String::new(),
            size: math::ivec2::default(),
            tile_size: math::ivec2::default(),
            infinite: false,
            next_layer_id: 0,
            next_object_id: 0,
            parallax_origin: math::fvec2::default(),
            backgroundcolor: Color::default(),
            tilesets: Vec::new(),
            base_dir: PathBuf::new(),
            properties: PropertyContainer::new(),
            layers: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// All layers of the map, in depth first pre-order (the order of the file).
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The top level layers of the map.
    pub fn root_layers(&self) -> &[LayerId] {
        &self.roots
    }

    /// # Panics
    /// The id does not belong to this map.
    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.0]
    }

    pub fn get_layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    /// Find the first layer with the given name.
    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    /// Iterate over all the layers in this map recursively.
    /// All layers are visited in depth-first pre-order manner.
    /// The iterator yields the group layers, as well as all of their sub-layers.
    ///
    /// In addition to the layer, a number of "pops" is also returned with each item.
    /// This is the number of group layers that was left with this iteration step.
    /// Some attributes of group layers affect all containing layers.
    /// If those attributes are accumulated in a stack,
    /// then the number of pops is the number of elemets to remove from the top of the stack.
    ///
    /// # Example
    ///
    /// Rendering layers under consideration of the group opacity:
    ///
    /// ```ignore
    /// let opacities = vec![1.];
    /// for (layer, pops) in map.iter_layers() {
    ///     opacities.truncate(opacities.len() - pops);
    ///     match &layer.kind {
    ///         LayerKind::Group(_) => { opacities.push(opacities.last().unwrap() * layer.opacity) },
    ///         LayerKind::Tile(tiles) => { render_layer(tiles, opacities.last()) }
    ///         _ => {}
    ///     }
    /// }
    /// ```
    pub fn iter_layers(&self) -> LayerIterator<'_> {
        LayerIterator::new(&self.layers, &self.roots)
    }

    /// Find the tileset a GID belongs to.
    /// Flip flags are ignored, tilesets are checked in file order and the first match wins.
    pub fn find_tileset_for_gid(&self, raw: u32) -> Option<&TileSet> {
        let id = raw & !GID_FLIP_MASK;
        if id == 0 {
            return None;
        }
        self.tilesets.iter().find(|t| t.contains(id))
    }

    /// Look up the tileset, local tile id and atlas position of a raw tile value.
    pub fn resolve_gid(&self, raw: u32) -> ResolvedGid<'_> {
        ResolvedGid::new(raw, self.find_tileset_for_gid(raw))
    }

    /// Build a lookup structure for fast GID resolution on maps with many tilesets.
    pub fn gid_index(&self) -> GidIndex {
        GidIndex::new(&self.tilesets)
    }

    /// Fetch the image that belongs to a given GID.
    /// Returns the image path and the pixel coordinates where the tile image is inside of that image.
    ///
    /// Important: To correctly draw the tile,
    ///     inspect the [GID] passed to this function to lookup information if/how the tile should
    ///     be flipped.
    pub fn tile_image(&self, id: GID) -> Option<(&Path, math::Rect)> {
        use math::ivec2;
        let resolved = self.resolve_gid(id.as_raw());
        let tileset = resolved.tileset?;

        match &tileset.image {
            Some(atlas) => {
                let size = tileset.tile_size;
                let stride = tileset.spacing as i32;
                let stride = size + ivec2::new(stride, stride);
                let tile_pos = ivec2::new(resolved.column as i32, resolved.row as i32);
                let upper_left = ivec2::new(tileset.margin as i32, tileset.margin as i32) + tile_pos * stride;
                Some((atlas.source.as_path(), math::Rect::new(upper_left, size)))
            },
            None => {
                let image = tileset.tile(resolved.local_id)?.image.as_ref()?;
                Some((image.source.as_path(), math::Rect::new(ivec2::new(0, 0), image.size)))
            },
        }
    }

    /// Collect every image file the map needs for rendering:
    /// atlas images, images of collection tiles and image layers.
    /// Each path is reported once, in order of first appearance.
    pub fn image_paths(&self) -> Vec<PathBuf> {
        let tileset_images = self.tilesets.iter().flat_map(|tileset| {
            tileset.image.iter()
                .chain(tileset.tiles.iter().filter_map(|t| t.image.as_ref()))
                .map(|image| &image.source)
        });
        let layer_images = self.iter_layers().filter_map(|(layer, _)| match &layer.kind {
            LayerKind::Image(image_layer) => image_layer.image.as_ref(),
            _ => None,
        });

        let mut seen = HashSet::new();
        tileset_images
            .chain(layer_images)
            .filter(|path| seen.insert(path.as_path()))
            .cloned()
            .collect()
    }
}

/// A raw tile value resolved against the tilesets of a map.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct ResolvedGid<'a> {
    /// The tileset containing the tile, None for empty or unknown tiles.
    pub tileset: Option<&'a TileSet>,
    /// Id of the tile inside of its tileset.
    pub local_id: u32,
    /// Column of the tile in the atlas grid.
    pub column: u32,
    /// Row of the tile in the atlas grid.
    pub row: u32,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    pub flip_diagonal: bool,
}

impl<'a> ResolvedGid<'a> {
    fn new(raw: u32, tileset: Option<&'a TileSet>) -> Self {
        let id = raw & !GID_FLIP_MASK;
        let (local_id, column, row) = match tileset {
            Some(tileset) => {
                let local_id = id - tileset.firstgid;
                match tileset.columns {
                    0 => (local_id, local_id, 0),
                    columns => (local_id, local_id % columns, local_id / columns),
                }
            },
            None => (0, 0, 0),
        };
        Self{
            tileset,
            local_id,
            column,
            row,
            flip_horizontal: raw & GID_HORIZONTAL_FLIP_FLAG != 0,
            flip_vertical: raw & GID_VERTICAL_FLIP_FLAG != 0,
            flip_diagonal: raw & GID_DIAGONAL_FLIP_FLAG != 0,
        }
    }

    /// Whether the value belongs to a tileset. False for empty tiles (GID 0).
    pub fn is_valid(&self) -> bool {
        self.tileset.is_some()
    }
}

/// Sorted GID ranges for binary search lookups.
///
/// Gives the same answers as [Map::find_tileset_for_gid]:
/// if the ranges of several tilesets overlap, the tileset appearing first in the map wins.
#[derive(Debug, Clone)]
pub struct GidIndex {
    /// Disjoint ranges (first, last, tileset index), sorted by first
    ranges: Vec<(u32, u32, usize)>,
}

impl GidIndex {
    pub fn new(tilesets: &[TileSet]) -> Self {
        let mut ranges: Vec<(u32, u32, usize)> = Vec::with_capacity(tilesets.len());

        for (index, tileset) in tilesets.iter().enumerate() {
            if tileset.lastgid < tileset.firstgid {
                continue;
            }

            // Only keep the parts not already claimed by an earlier tileset
            let mut cursor = tileset.firstgid;
            let end = tileset.lastgid;
            let mut uncovered = Vec::new();
            for &(first, last, _) in &ranges {
                if last < cursor || first > end {
                    continue;
                }
                if first > cursor {
                    uncovered.push((cursor, first - 1, index));
                }
                cursor = last + 1;
                if cursor > end {
                    break;
                }
            }
            if cursor <= end {
                uncovered.push((cursor, end, index));
            }

            ranges.extend(uncovered);
            ranges.sort_by_key(|r| r.0);
        }

        Self{ ranges }
    }

    /// Index into [Map::tilesets] of the tileset owning the raw tile value.
    pub fn lookup(&self, raw: u32) -> Option<usize> {
        let id = raw & !GID_FLIP_MASK;
        if id == 0 {
            return None;
        }
        let candidate = self.ranges.partition_point(|r| r.0 <= id).checked_sub(1)?;
        let (_, last, index) = self.ranges[candidate];
        (id <= last).then_some(index)
    }

    /// Resolve a raw tile value like [Map::resolve_gid].
    pub fn resolve<'a>(&self, map: &'a Map, raw: u32) -> ResolvedGid<'a> {
        ResolvedGid::new(raw, self.lookup(raw).map(|i| &map.tilesets[i]))
    }
}
