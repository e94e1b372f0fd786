use std::path::PathBuf;

use crate::{math, Color, Object, PropertyContainer, Renderorder, GID};

/// Index of a layer inside of the layer arena of its [Map](crate::Map).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone)]
pub struct LayerId(pub(crate) usize);

impl LayerId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A layer of a map.
/// Fields shared by all kinds of layers are stored here,
/// the kind specific content is found in [Layer::kind].
#[derive(Debug, PartialEq, Clone)]
pub struct Layer {
    pub id: Option<u32>,
    pub name: String,
    pub class: String,
    pub visible: bool,
    pub opacity: f32,

    /// Offset of this layer in pixels.
    pub offset: math::fvec2,

    /// Scrolling speed factor relative to the camera, (1, 1) by default.
    pub parallax: math::fvec2,

    /// Color that is multiplied with the colors of the tiles or images in this layer.
    /// Defaults to opaque white, which acts as a no-op when multiplied.
    ///
    /// *Note:* Multiplication with the raw values of the [Color] struct would
    /// lead to the wrong result! The colors must first be converted to the
    /// invervall [0-1] (division by 255).
    pub tintcolor: Color,

    /// The group layer containing this layer, None for top level layers.
    pub parent: Option<LayerId>,

    pub properties: PropertyContainer,
    pub kind: LayerKind,
}

impl Layer {
    pub(crate) fn new(name: String, kind: LayerKind) -> Self {
        Self{
            id: None,
            name,
            class: String::new(),
            visible: true,
            opacity: 1.,
            offset: math::fvec2::default(),
            parallax: math::fvec2::new(1., 1.),
            tintcolor: Color::WHITE,
            parent: None,
            properties: PropertyContainer::new(),
            kind,
        }
    }

    pub fn as_tile_layer(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tile(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_object_layer(&self) -> Option<&ObjectLayer> {
        match &self.kind {
            LayerKind::Object(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_image_layer(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(layer) => Some(layer),
            _ => None,
        }
    }
}

/// This enum contains the different types of layers that can be found in a map
#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum LayerKind {
    /// A layer containing a grid of tiles
    Tile(TileLayer),

    /// A layer containing objects.
    /// Objects are not aligned to the tile grid.
    /// They can be used for example to mark regions of interest.
    ///
    /// Object layers are also called object  groups.
    Object(ObjectLayer),

    /// A layer showing a single image
    Image(ImageLayer),

    /// A layer grouping mutiple other layer together.
    /// Group Layers may be nested,
    /// forming a tree of layers.
    Group(GroupLayer),
}

#[derive(Debug, PartialEq, Clone)]
pub struct TileLayer {
    /// Size of the layer in tiles.
    pub size: math::ivec2,

    /// Tile coordinate of the upper left corner, only used in infinite maps.
    pub start: math::ivec2,

    pub data: TileData,
}

/// Tiles of a [TileLayer].
/// Finite maps store a single grid, infinite maps store chunks.
#[derive(Debug, PartialEq, Clone)]
pub enum TileData {
    /// Row major grid of `size.x * size.y` tiles, None for empty cells.
    Finite(Vec<Option<GID>>),
    Chunked(Vec<Chunk>),
}

/// A rectangular piece of tile data in an infinite map.
#[derive(Debug, PartialEq, Clone)]
pub struct Chunk {
    /// Position of the upper left tile of the chunk, in tiles.
    pub pos: math::ivec2,
    /// Size of the chunk in tiles.
    pub size: math::ivec2,
    /// Row major grid of `size.x * size.y` tiles.
    pub tiles: Vec<Option<GID>>,
}

impl Chunk {
    pub fn bounds(&self) -> math::Rect {
        math::Rect::new(self.pos, self.size)
    }

    /// Get the tile at a map coordinate, if it lies inside of this chunk.
    pub fn tile(&self, pos: math::ivec2) -> Option<GID> {
        if !self.bounds().contains(pos) {
            return None;
        }
        let local = pos - self.pos;
        self.tiles.get((local.x + local.y * self.size.x) as usize).copied().flatten()
    }
}

impl TileLayer {
    /// Look up the tile at a tile coordinate.
    /// Returns None for empty cells and coordinates outside of the layer.
    pub fn tile(&self, pos: math::ivec2) -> Option<GID> {
        match &self.data {
            TileData::Finite(tiles) => {
                if pos.x < 0 || pos.y < 0 || pos.x >= self.size.x || pos.y >= self.size.y {
                    return None;
                }
                tiles.get((pos.x + pos.y * self.size.x) as usize).copied().flatten()
            },
            TileData::Chunked(chunks) => chunks.iter().find_map(|c| c.tile(pos)),
        }
    }

    /// Total number of cells stored in this layer, including empty ones.
    pub fn cell_count(&self) -> usize {
        match &self.data {
            TileData::Finite(tiles) => tiles.len(),
            TileData::Chunked(chunks) => chunks.iter().map(|c| c.tiles.len()).sum(),
        }
    }

    /// Iterate over the tiles inside of this layer in the order in which they would be rendered.
    /// This iterator yields the xy coordinates and the GID of the tiles in the
    /// layer, with a None GID for empty tiles.
    ///
    /// Chunks of infinite maps are visited one after another,
    /// each of them in the given render order.
    pub fn tiles_in_renderorder(&self, renderorder: Renderorder) -> TileIterator<'_> {
        TileIterator::new(self, renderorder)
    }
}

/// Iterator over the cells of a [TileLayer], see [TileLayer::tiles_in_renderorder].
pub struct TileIterator<'layer> {
    grids: Vec<(math::ivec2, math::ivec2, &'layer [Option<GID>])>,
    renderorder: Renderorder,
    grid: usize,
    step: usize,
}

impl<'layer> TileIterator<'layer> {
    pub(crate) fn new(layer: &'layer TileLayer, renderorder: Renderorder) -> Self {
        let grids = match &layer.data {
            TileData::Finite(tiles) => vec![(math::ivec2::new(0, 0), layer.size, &tiles[..])],
            TileData::Chunked(chunks) => chunks.iter().map(|c| (c.pos, c.size, &c.tiles[..])).collect(),
        };
        Self { grids, renderorder, grid: 0, step: 0 }
    }
}

impl<'layer> Iterator for TileIterator<'layer> {
    type Item = (math::ivec2, Option<GID>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (origin, size, tiles) = *self.grids.get(self.grid)?;
            if self.step >= size.area() {
                self.grid += 1;
                self.step = 0;
                continue;
            }

            let width = size.x as usize;
            let (column, row) = (self.step % width, self.step / width);
            let x = match self.renderorder {
                Renderorder::RightDown | Renderorder::RightUp => column,
                Renderorder::LeftDown | Renderorder::LeftUp => width - 1 - column,
            };
            let y = match self.renderorder {
                Renderorder::RightDown | Renderorder::LeftDown => row,
                Renderorder::RightUp | Renderorder::LeftUp => size.y as usize - 1 - row,
            };
            self.step += 1;

            let local = math::ivec2::new(x as i32, y as i32);
            return Some((origin + local, tiles.get(x + y * width).copied().flatten()));
        }
    }
}

/// Order in which objects of an [ObjectLayer] are drawn.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum DrawOrder {
    /// Sorted by y coordinate
    #[default]
    TopDown,
    /// In the order in which they appear in the layer
    Index,
}

impl std::str::FromStr for DrawOrder {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "topdown" => Ok(DrawOrder::TopDown),
            "index" => Ok(DrawOrder::Index),
            _ => Err(crate::Error::ParseError(format!("Invalid draw order '{}'", s).into())),
        }
    }
}

/// An ObjectLayer is a container of Objects.
/// Objects are not aligned to the tile grid,
/// and can be used to include extra information in a map.
///
/// Check the [Tiled Documentation](https://doc.mapeditor.org/en/stable/manual/objects/)
/// for more information on objects.
#[derive(Debug, PartialEq, Clone)]
pub struct ObjectLayer {
    /// Color that is used to render [Objects](Object) in this layer.
    pub color: Color,
    pub draworder: DrawOrder,

    /// The [Objects](Object) contained in this layer
    pub objects: Vec<Object>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ImageLayer {
    /// Path of the image, resolved against the map directory.
    pub image: Option<PathBuf>,
    pub repeat_x: bool,
    pub repeat_y: bool,
}

/// A layer to group multiple sub-layers
#[derive(Debug, PartialEq, Clone, Default)]
pub struct GroupLayer {
    /// The direct children of this group, in drawing order.
    pub children: Vec<LayerId>,
}

/// Depth first pre-order iterator over the layer tree, see [Map::iter_layers](crate::Map::iter_layers).
pub struct LayerIterator<'a> {
    layers: &'a [Layer],
    iter_stack: Vec<std::slice::Iter<'a, LayerId>>
}

impl<'a> LayerIterator<'a> {
    pub(crate) fn new(layers: &'a [Layer], roots: &'a [LayerId]) -> Self {
        Self { layers, iter_stack: vec![roots.iter()] }
    }
}

impl<'a> Iterator for LayerIterator<'a> {
    type Item = (&'a Layer, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let mut pops = 0;
        while let Some(iter) = self.iter_stack.last_mut() {
            if let Some(id) = iter.next() {
                let layer = &self.layers[id.0];
                if let LayerKind::Group(group) = &layer.kind {
                    self.iter_stack.push(group.children.iter());
                }
                return Some((layer, pops));
            } else {
                pops += 1;
                self.iter_stack.pop();
            }
        }
        None
    }
}
