//! Summary statistics of a loaded map.

use std::collections::BTreeSet;

use crate::{LayerKind, Map, TileData, GID};

/// Counts of the content of a [Map].
///
/// ```no_run
/// let map = tiled_level::Map::from_file(std::path::Path::new("maps/level1.tmx"))?;
/// let census = tiled_level::MapCensus::of(&map);
/// if !census.unowned_gids.is_empty() {
///     println!("tiles without tileset: {:?}", census.unowned_gids);
/// }
/// # Ok::<(),tiled_level::Error>(())
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct MapCensus {
    pub tile_layers: usize,
    pub object_layers: usize,
    pub image_layers: usize,
    pub group_layers: usize,

    /// Cells of all tile layers and chunks, including empty ones.
    pub cells: usize,
    pub non_empty_cells: usize,

    pub objects: usize,
    /// Objects showing a tile.
    pub tile_objects: usize,

    /// Number of non-empty cells per tileset, by tileset name in tileset order.
    pub tileset_usage: Vec<(String, usize)>,

    /// Tile ids (without flip flags) used in tile layers that belong to no tileset, ascending.
    pub unowned_gids: Vec<u32>,
}

impl MapCensus {
    pub fn of(map: &Map) -> Self {
        let index = map.gid_index();
        let mut census = MapCensus{
            tileset_usage: map.tilesets.iter().map(|t| (t.name.clone(), 0)).collect(),
            ..MapCensus::default()
        };
        let mut unowned = BTreeSet::new();

        for (layer, _) in map.iter_layers() {
            match &layer.kind {
                LayerKind::Tile(tiles) => {
                    census.tile_layers += 1;
                    census.cells += tiles.cell_count();

                    let grids: Vec<&[Option<GID>]> = match &tiles.data {
                        TileData::Finite(cells) => vec![&cells[..]],
                        TileData::Chunked(chunks) => chunks.iter().map(|c| &c.tiles[..]).collect(),
                    };
                    for gid in grids.into_iter().flatten().flatten() {
                        census.non_empty_cells += 1;
                        match index.lookup(gid.as_raw()) {
                            Some(tileset) => census.tileset_usage[tileset].1 += 1,
                            None => { unowned.insert(gid.to_id()); },
                        }
                    }
                },
                LayerKind::Object(objects) => {
                    census.object_layers += 1;
                    census.objects += objects.objects.len();
                    census.tile_objects += objects.objects.iter().filter(|o| o.is_tile_object()).count();
                },
                LayerKind::Image(_) => census.image_layers += 1,
                LayerKind::Group(_) => census.group_layers += 1,
            }
        }

        census.unowned_gids = unowned.into_iter().collect();
        census
    }

    pub fn layer_count(&self) -> usize {
        self.tile_layers + self.object_layers + self.image_layers + self.group_layers
    }
}

impl std::fmt::Display for MapCensus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f, "layers: {} ({} tile, {} object, {} image, {} group)",
            self.layer_count(), self.tile_layers, self.object_layers, self.image_layers, self.group_layers
        )?;
        writeln!(f, "cells: {} ({} non-empty)", self.cells, self.non_empty_cells)?;
        writeln!(f, "objects: {} ({} tile objects)", self.objects, self.tile_objects)?;
        for (name, count) in &self.tileset_usage {
            writeln!(f, "tileset '{}': {} cells", name, count)?;
        }
        if !self.unowned_gids.is_empty() {
            writeln!(f, "unowned gids: {:?}", self.unowned_gids)?;
        }
        Ok(())
    }
}
