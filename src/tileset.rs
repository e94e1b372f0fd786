//! Tilesets, either embedded in a map or stored in their own TSX/TSJ file.

use std::path::{Path, PathBuf};

use normalize_path::NormalizePath;
use serde::Deserialize;

use crate::property::JsonProperty;
use crate::{
    attribute, attribute_or, attribute_or_default, child, math, Color, Error, PropertyContainer, Result,
    GID_FLIP_MASK,
};

/// An image file referenced by a tileset, a tile or an image layer.
#[derive(Debug, PartialEq, Clone)]
pub struct Image {
    /// Path of the image, already resolved against the directory of the file referencing it.
    pub source: PathBuf,

    /// Size of the image in pixels, zero if the file does not specify it.
    pub size: math::ivec2,

    /// Color that should be treated as transparent.
    pub trans: Option<Color>,
}

impl Image {
    /// Resolve a path written in a file located in `base_dir`.
    pub(crate) fn resolve(base_dir: &Path, source: &str) -> PathBuf {
        base_dir.join(source).normalize()
    }

    pub(crate) fn from_xml(node: &roxmltree::Node, base_dir: &Path) -> Result<Self> {
        let source = node.attribute("source").ok_or_else(|| Error::StructureError{
            tag: node.tag_name().name().into(),
            msg: "Missing 'source' attribute on image".into(),
        })?;
        Ok(Self{
            source: Self::resolve(base_dir, source),
            size: math::ivec2::from_tmx_or_default(node, "width", "height")?,
            trans: node.attribute("trans").map(Color::parse_lenient).transpose()?,
        })
    }
}

/// A single frame of a tile animation.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Frame {
    /// Local id of the tile shown in this frame.
    pub tile_id: u32,
    /// Duration in milliseconds.
    pub duration: u32,
}

/// Extra information about a single tile of a tileset.
/// Only tiles that carry such information are stored.
#[derive(Debug, PartialEq, Clone)]
pub struct Tile {
    /// Local id of the tile inside of its tileset.
    pub id: u32,
    pub type_: String,
    /// Image of this tile, only set in collection tilesets.
    pub image: Option<Image>,
    pub animation: Vec<Frame>,
    pub properties: PropertyContainer,
}

impl Tile {
    fn from_xml(node: &roxmltree::Node, base_dir: &Path) -> Result<Self> {
        let animation = match child(node, "animation") {
            None => Vec::new(),
            Some(animation) => animation.children()
                .filter(|c| c.tag_name().name() == "frame")
                .map(|frame| Ok(Frame{
                    tile_id: attribute(&frame, "tileid")?,
                    duration: attribute(&frame, "duration")?,
                }))
                .collect::<Result<_>>()?,
        };

        Ok(Self{
            id: attribute(node, "id")?,
            // "type" was renamed to "class" in Tiled 1.9
            type_: node.attribute("class").or_else(|| node.attribute("type")).unwrap_or_default().into(),
            image: child(node, "image").map(|image| Image::from_xml(&image, base_dir)).transpose()?,
            animation,
            properties: PropertyContainer::from_xml(node)?,
        })
    }
}

/// A tileset maps a range of [GIDs](crate::GID) to images.
///
/// Tilesets either slice a single atlas image into a grid of tiles,
/// or are a collection of images, one per tile.
#[derive(Debug, PartialEq, Clone)]
pub struct TileSet {
    /// First GID of this tileset. Assigned by the map referencing the tileset.
    pub firstgid: u32,

    /// Last GID belonging to this tileset (inclusive).
    /// Smaller than `firstgid` if the tileset contains no tiles.
    pub lastgid: u32,

    /// Path of the external tileset file as written in the map, if the tileset is not embedded.
    pub source: Option<PathBuf>,

    pub name: String,
    pub class: String,
    pub tile_size: math::ivec2,
    pub spacing: u32,
    pub margin: u32,
    pub tilecount: u32,
    pub columns: u32,

    /// Offset in pixels that is applied when drawing tiles of this tileset.
    pub tileoffset: math::ivec2,

    /// The atlas image, None for collection tilesets.
    pub image: Option<Image>,

    /// Tiles with extra information, sorted by id.
    pub tiles: Vec<Tile>,

    pub properties: PropertyContainer,
}

impl TileSet {
    /// Load a tileset file. The syntax is chosen by file extension,
    /// `.tsx` for XML and `.tsj` or `.json` for JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse_file_contents(path, &text)
    }

    pub(crate) fn parse_file_contents(path: &Path, text: &str) -> Result<Self> {
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        match path.extension().and_then(|e| e.to_str()) {
            Some("tsx") => Self::from_tsx_str(text, base_dir),
            Some("tsj") | Some("json") => Self::from_tsj_str(text, base_dir),
            _ => Err(Error::UnknownFormat(path.to_path_buf())),
        }
    }

    /// Parse a tileset from TSX (xml) data.
    /// Image paths are resolved relative to `base_dir`.
    pub fn from_tsx_str(tsx: &str, base_dir: &Path) -> Result<Self> {
        let document = roxmltree::Document::parse(tsx)?;
        let root = document.root_element();
        if root.tag_name().name() != "tileset" {
            return Err(Error::StructureError{
                tag: root.tag_name().name().to_string(),
                msg: format!("Expected tag 'tileset' at root level, got '{}'.", root.tag_name().name())
            });
        }
        let mut tileset = Self::from_xml(&root, base_dir)?;
        tileset.update_lastgid()?;
        Ok(tileset)
    }

    /// Parse a tileset from TSJ (json) data.
    /// Image paths are resolved relative to `base_dir`.
    pub fn from_tsj_str(tsj: &str, base_dir: &Path) -> Result<Self> {
        let json: JsonTileset = serde_json::from_str(tsj)?;
        let mut tileset = Self::from_json(json, base_dir)?;
        tileset.update_lastgid()?;
        Ok(tileset)
    }

    /// Parse the tileset content of a `tileset` node.
    /// Works on the root node of tsx files, as well as on tilesets embedded in a map.
    pub(crate) fn from_xml(node: &roxmltree::Node, base_dir: &Path) -> Result<Self> {
        let image = child(node, "image").map(|image| Image::from_xml(&image, base_dir)).transpose()?;

        let mut tiles = node.children()
            .filter(|n| n.tag_name().name() == "tile")
            .map(|n| Tile::from_xml(&n, base_dir))
            .collect::<Result<Vec<_>>>()?;
        tiles.sort_by_key(|t| t.id);

        let tileoffset = match child(node, "tileoffset") {
            Some(offset) => math::ivec2::from_tmx_or_default(&offset, "x", "y")?,
            None => math::ivec2::default(),
        };

        let tileset = Self{
            firstgid: attribute_or(node, "firstgid", 1)?,
            lastgid: 0,
            source: None,
            name: attribute_or_default(node, "name")?,
            class: attribute_or_default(node, "class")?,
            tile_size: math::ivec2::new(
                attribute(node, "tilewidth")?,
                attribute(node, "tileheight")?
            ),
            spacing: attribute_or_default(node, "spacing")?,
            margin: attribute_or_default(node, "margin")?,
            tilecount: attribute_or_default(node, "tilecount")?,
            columns: attribute_or_default(node, "columns")?,
            tileoffset,
            image,
            tiles,
            properties: PropertyContainer::from_xml(node)?,
        };
        tileset.validated()
    }

    pub(crate) fn from_json(json: JsonTileset, base_dir: &Path) -> Result<Self> {
        let image = json.image.as_deref().filter(|s| !s.is_empty()).map(|source| Image{
            source: Image::resolve(base_dir, source),
            size: math::ivec2::new(json.imagewidth, json.imageheight),
            trans: None,
        });
        let image = match (image, json.transparentcolor.as_deref()) {
            (Some(image), Some(trans)) => Some(Image{ trans: Some(Color::parse_lenient(trans)?), ..image }),
            (image, _) => image,
        };

        let mut tiles = json.tiles.into_iter()
            .map(|tile| tile.into_tile(base_dir))
            .collect::<Result<Vec<_>>>()?;
        tiles.sort_by_key(|t| t.id);

        let tileset = Self{
            firstgid: json.firstgid.unwrap_or(1),
            lastgid: 0,
            source: None,
            name: json.name,
            class: json.class,
            tile_size: math::ivec2::new(json.tilewidth, json.tileheight),
            spacing: json.spacing,
            margin: json.margin,
            tilecount: json.tilecount,
            columns: json.columns,
            tileoffset: json.tileoffset.map(|o| math::ivec2::new(o.x, o.y)).unwrap_or_default(),
            image,
            tiles,
            properties: PropertyContainer::from_json(&json.properties)?,
        };
        tileset.validated()
    }

    fn validated(mut self) -> Result<Self> {
        if self.tile_size.x <= 0 || self.tile_size.y <= 0 {
            return Err(Error::StructureError{
                tag: "tileset".into(),
                msg: format!("Tileset '{}' has an invalid tile size {}x{}", self.name, self.tile_size.x, self.tile_size.y),
            });
        }
        if self.columns == 0 {
            if let Some(image) = &self.image {
                self.columns = grid_cells(image.size.x, self.tile_size.x, self.margin, self.spacing);
            }
        }
        Ok(self)
    }

    /// Whether this tileset consists of individual images instead of one atlas.
    pub fn is_collection(&self) -> bool {
        self.image.is_none()
    }

    /// Number of tiles in this tileset.
    /// Uses the declared tile count and falls back to deriving it from
    /// the atlas image or the listed tiles if the count is missing.
    pub fn effective_tilecount(&self) -> u32 {
        if self.tilecount > 0 {
            return self.tilecount;
        }
        match &self.image {
            Some(image) => {
                let rows = grid_cells(image.size.y, self.tile_size.y, self.margin, self.spacing);
                self.columns.saturating_mul(rows)
            },
            None => self.tiles.last().map(|t| t.id.saturating_add(1)).unwrap_or(0),
        }
    }

    /// Recompute [TileSet::lastgid] from the current firstgid and tile count.
    /// Fails if the tiles do not fit into the GID range.
    pub(crate) fn update_lastgid(&mut self) -> Result<()> {
        let count = self.effective_tilecount();
        self.lastgid = match self.firstgid.checked_add(count) {
            Some(end) if count == 0 || end - 1 <= !GID_FLIP_MASK => end.saturating_sub(1),
            _ => return Err(Error::StructureError{
                tag: "tileset".into(),
                msg: format!("Tileset '{}' with {} tiles starting at GID {} exceeds the GID range", self.name, count, self.firstgid),
            }),
        };
        Ok(())
    }

    /// Check if a GID (without flip flags) belongs to this tileset.
    pub fn contains(&self, id: u32) -> bool {
        id != 0 && id >= self.firstgid && id <= self.lastgid
    }

    /// Extra information of a tile, looked up by its local id.
    pub fn tile(&self, local_id: u32) -> Option<&Tile> {
        self.tiles
            .binary_search_by_key(&local_id, |t| t.id)
            .ok()
            .map(|index| &self.tiles[index])
    }
}

/// Number of tiles fitting along one axis of an atlas image.
fn grid_cells(image_extent: i32, tile_extent: i32, margin: u32, spacing: u32) -> u32 {
    let usable = image_extent as i64 - 2 * margin as i64 + spacing as i64;
    let stride = tile_extent as i64 + spacing as i64;
    if usable <= 0 || stride <= 0 {
        return 0;
    }
    (usable / stride) as u32
}

/// Tileset as it appears in TSJ files and in the `tilesets` array of TMJ maps.
/// References to external tilesets only carry `firstgid` and `source`.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct JsonTileset {
    pub firstgid: Option<u32>,
    pub source: Option<String>,
    pub name: String,
    pub class: String,
    pub tilewidth: i32,
    pub tileheight: i32,
    pub spacing: u32,
    pub margin: u32,
    pub tilecount: u32,
    pub columns: u32,
    pub image: Option<String>,
    pub imagewidth: i32,
    pub imageheight: i32,
    pub transparentcolor: Option<String>,
    pub tileoffset: Option<JsonOffset>,
    pub tiles: Vec<JsonTile>,
    pub properties: Vec<JsonProperty>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub(crate) struct JsonOffset {
    x: i32,
    y: i32,
}

#[derive(Deserialize, Debug)]
pub(crate) struct JsonTile {
    id: u32,
    #[serde(default, alias = "class", rename = "type")]
    kind: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    imagewidth: i32,
    #[serde(default)]
    imageheight: i32,
    #[serde(default)]
    animation: Vec<JsonFrame>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize, Debug)]
struct JsonFrame {
    tileid: u32,
    duration: u32,
}

impl JsonTile {
    fn into_tile(self, base_dir: &Path) -> Result<Tile> {
        Ok(Tile{
            id: self.id,
            type_: self.kind,
            image: self.image.map(|source| Image{
                source: Image::resolve(base_dir, &source),
                size: math::ivec2::new(self.imagewidth, self.imageheight),
                trans: None,
            }),
            animation: self.animation.into_iter()
                .map(|f| Frame{ tile_id: f.tileid, duration: f.duration })
                .collect(),
            properties: PropertyContainer::from_json(&self.properties)?,
        })
    }
}
