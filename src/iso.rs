//! Conversion between tile coordinates and screen pixels for isometric maps.
//!
//! The tile at (0, 0) has its top corner at the screen origin,
//! increasing x moves down to the right, increasing y moves down to the left.

use crate::math::{fvec2, ivec2};
use crate::{Layer, Map};

/// Isometric projection with a fixed tile size and offsets.
///
/// `start` is added to tile coordinates before projecting,
/// `offset` and `global_offset` are added to the projected pixels.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct IsoProjection {
    pub tile_size: fvec2,
    pub start: ivec2,
    pub offset: fvec2,
    pub global_offset: fvec2,
}

impl IsoProjection {
    pub fn new(tile_size: fvec2) -> Self {
        Self{
            tile_size,
            start: ivec2::default(),
            offset: fvec2::default(),
            global_offset: fvec2::default(),
        }
    }

    /// Projection using the tile size of the map.
    pub fn for_map(map: &Map) -> Self {
        Self::new(map.tile_size.into())
    }

    /// Projection for the tiles of a single layer, including the layer offset.
    /// Positions yielded by [TileLayer::tiles_in_renderorder](crate::TileLayer::tiles_in_renderorder)
    /// can be passed to it directly, chunk positions are already absolute.
    pub fn for_layer(map: &Map, layer: &Layer) -> Self {
        Self{
            offset: layer.offset,
            ..Self::for_map(map)
        }
    }

    pub fn with_global_offset(mut self, global_offset: fvec2) -> Self {
        self.global_offset = global_offset;
        self
    }

    fn half_tile(&self) -> fvec2 {
        self.tile_size * 0.5
    }

    fn total_offset(&self) -> fvec2 {
        self.offset + self.global_offset
    }

    /// Project a (possibly fractional) tile coordinate to screen pixels.
    pub fn world_to_iso(&self, tile: fvec2) -> fvec2 {
        let shifted = tile + fvec2::from(self.start);
        let half = self.half_tile();
        fvec2::new(
            (shifted.x - shifted.y) * half.x,
            (shifted.x + shifted.y) * half.y,
        ) + self.total_offset()
    }

    /// Screen position of the top corner of a tile.
    pub fn tile_to_screen(&self, tile: ivec2) -> fvec2 {
        self.world_to_iso(tile.into())
    }

    /// Inverse of [IsoProjection::world_to_iso].
    pub fn iso_to_world(&self, screen: fvec2) -> fvec2 {
        let half = self.half_tile();
        let local = screen - self.total_offset();
        let diff = local.x / half.x;
        let sum = local.y / half.y;
        fvec2::new((sum + diff) / 2., (sum - diff) / 2.) - fvec2::from(self.start)
    }

    /// The tile containing a screen position.
    pub fn screen_to_tile(&self, screen: fvec2) -> ivec2 {
        self.iso_to_world(screen).floor()
    }
}
