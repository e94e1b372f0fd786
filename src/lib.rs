//! tiled_level is a library for loading [Tiled](https://mapeditor.org) maps
//! in both of their exchange formats, TMX (XML) and TMJ (JSON),
//! together with external tilesets in TSX or TSJ syntax.
//!
//! Images referenced by maps and tilesets are never loaded.
//! Instead, the paths are reported (see [Map::image_paths]) so the host
//! application can load them in whatever format it prefers.
//!
//! As a starting point,
//! load a map with [Map::from_file] or, if several maps share tilesets,
//! through a [Loader] with a shared [TilesetCache].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! let cache = Arc::new(tiled_level::TilesetCache::new());
//! let loader = tiled_level::Loader::new(cache);
//! let map = loader.load_file(std::path::Path::new("maps/level1.tmx"))?;
//!
//! println!(
//!     "Map is {} by {} pixels.",
//!     map.size.x * map.tile_size.x, map.size.y * map.tile_size.y
//! );
//!
//! let tile = map.resolve_gid(0x8000_0003);
//! if let Some(tileset) = tile.tileset {
//!     println!("{} at column {}, row {}", tileset.name, tile.column, tile.row);
//! }
//! # Ok::<(),tiled_level::Error>(())
//! ```

use core::num::NonZeroU32;

#[macro_use] extern crate impl_ops;

mod errors;
mod property;
mod cache;
mod layer;
mod object;
mod map;
pub mod math;
pub mod decoder;
pub mod tileset;
pub mod loader;
pub mod iso;
pub mod census;

pub use cache::{TilesetCache, Provider, FileProvider};
pub use property::{PropertyContainer, Property, PropertyValue, ObjectReference};
pub use layer::{
    Layer, LayerId, LayerKind, TileLayer, TileData, Chunk, ObjectLayer, DrawOrder, ImageLayer,
    GroupLayer, TileIterator, LayerIterator,
};
pub use object::{Object, ObjectKind, Text, HorizontalAlignment, VerticalAlignment};
pub use map::{Map, ResolvedGid, GidIndex};
pub use tileset::{TileSet, Tile, Image, Frame};
pub use loader::{Loader, LoaderOptions, MapFormat, Stage};
pub use iso::IsoProjection;
pub use census::MapCensus;
pub use errors::{Error, ErrorKind};
pub use errors::Result;

pub const GID_HORIZONTAL_FLIP_FLAG: u32 = 0x80000000;
pub const GID_VERTICAL_FLIP_FLAG: u32   = 0x40000000;
pub const GID_DIAGONAL_FLIP_FLAG: u32   = 0x20000000;

const GID_FLIP_MASK: u32 = GID_HORIZONTAL_FLIP_FLAG | GID_VERTICAL_FLIP_FLAG | GID_DIAGONAL_FLIP_FLAG;

/// Version number consisting out of a MAJOR and MINOR version number, followed by an optional PATCH
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Version(
    /// Major version
    pub u32,
    /// Minor version
    pub u32,
    /// Patch version
    pub Option<u32>
);

impl std::str::FromStr for Version {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut items = s.trim().split('.');

        use Error::ParseError;
        let major = items.next().ok_or_else(|| ParseError("Major version is required but missing".into()))?.parse()?;
        let minor = items.next().ok_or_else(|| ParseError("Minor version is required but missing".into()))?.parse()?;
        let patch = if let Some(content) = items.next() {
            Some(content.parse()?)
        } else { None };

        Ok(Version(major, minor, patch))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.2 {
            Some(patch) => write!(f, "{}.{}.{}", self.0, self.1, patch),
            None => write!(f, "{}.{}", self.0, self.1),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Orientation {
    #[default]
    Orthogonal,
    Isometric,
    Staggered,
    Hexagonal,
}

impl std::str::FromStr for Orientation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use Orientation::*;
        match s {
            "orthogonal" => Ok(Orthogonal),
            "isometric" => Ok(Isometric),
            "staggered" => Ok(Staggered),
            "hexagonal" => Ok(Hexagonal),
            _ => Err(Error::ParseError(format!("Invalid orientation '{}'", s).into()))
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Renderorder {
    #[default]
    RightDown,
    RightUp,
    LeftDown,
    LeftUp,
}

impl std::str::FromStr for Renderorder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        use Renderorder::*;
        match s {
            "right-down" => Ok(RightDown),
            "right-up" => Ok(RightUp),
            "left-down" => Ok(LeftDown),
            "left-up" => Ok(LeftUp),
            _ => Err(Error::ParseError(format!("Invalid render order '{}'", s).into()))
        }
    }
}

/// Parse an orientation or render order, falling back to the default value
/// (orthogonal, right-down) for strings that are not recognized.
pub(crate) fn parse_or_fallback<T>(value: Option<&str>, what: &str) -> T
    where T: Default + std::str::FromStr
{
    match value {
        None => T::default(),
        Some(text) => text.parse().unwrap_or_else(|_| {
            tracing::warn!("unknown {} '{}', using the default", what, text);
            T::default()
        }),
    }
}

/// An 8 bit RGB color with alpha value.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Default, Hash)]
pub struct Color(u32);

impl Color {
    pub const WHITE: Color = Color(0xFFFF_FFFF);

    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> Self {
        Color(
              (a as u32) << 24
            | (r as u32) << 16
            | (g as u32) << 8
            | (b as u32)
        )
    }

    pub fn alpha(&self) -> u8 { ((self.0 >> 24) & 0xFF) as u8 }
    pub fn red(&self)   -> u8 { ((self.0 >> 16) & 0xFF) as u8 }
    pub fn green(&self) -> u8 { ((self.0 >>  8) & 0xFF) as u8 }
    pub fn blue(&self)  -> u8 { (self.0 & 0xFF) as u8 }

    pub fn to_u32(&self) -> u32 { self.0 }

    /// Parse a color that may omit the leading '#',
    /// as used by the `trans` attribute of images.
    pub(crate) fn parse_lenient(s: &str) -> Result<Self> {
        if s.starts_with('#') {
            s.parse()
        } else {
            format!("#{}", s).parse()
        }
    }
}

impl std::str::FromStr for Color {
    type Err = Error;

    /// Parse a color from a hex string.
    ///
    /// ```
    /// let red: tiled_level::Color = "#FF0000".parse()?;
    /// assert_eq!(red.red(), 255);
    /// assert_eq!(red.blue(), 0);
    /// assert_eq!(red.alpha(), 255);
    /// # Ok::<(),tiled_level::Error>(())
    /// ```
    fn from_str(s: &str) -> Result<Self> {
        use Error::*;
        let make_error = || ParseError(format!("Invalid color string, expected #AARRGGBB, got '{}'", s).into());

        let s = s
            .strip_prefix('#')
            .ok_or_else(make_error)?;

        match s.len() {
            8 => {
                let [a, r, g, b] = u32::from_str_radix(s, 16)?.to_be_bytes();
                Ok(Color::from_argb(a, r, g, b))
            },
            6 => {
                let [_, r, g, b] = u32::from_str_radix(s, 16)?.to_be_bytes();
                Ok(Color::from_argb(255, r, g, b))
            },
            _ => Err(make_error())
        }
    }
}

/// Global Tile ID
/// A GID acts as an index into any tileset referenced in the map.
/// The top three bits store how the tile is flipped.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
#[repr(transparent)]
pub struct GID(NonZeroU32);

impl GID {
    /// Wrap a raw 32 bit tile value. Returns None for the empty tile (0).
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(value) => Some(GID(value)),
            None => None,
        }
    }

    /// The raw value including the flip flags.
    pub const fn as_raw(&self) -> u32 {
        self.0.get()
    }

    /// Turn this GID into an u32 for indexing.
    /// This function masks the bits used for tile flipping,
    /// to get the flip information use [GID::flip_horizontal], [GID::flip_vertical] and
    /// [GID::flip_diagonal].
    ///
    /// This is a low level function,
    /// for looking up the tileset of a tile prefer to use [Map::resolve_gid] instead.
    pub const fn to_id(&self) -> u32 {
        self.as_raw() & !GID_FLIP_MASK
    }

    /// Return whether this tile is flipped horizontally or not
    pub fn flip_horizontal(&self) -> bool {
        (self.as_raw() & GID_HORIZONTAL_FLIP_FLAG) == GID_HORIZONTAL_FLIP_FLAG
    }

    /// Return whether this tile is flipped vertically or not
    pub fn flip_vertical(&self) -> bool {
        (self.as_raw() & GID_VERTICAL_FLIP_FLAG) == GID_VERTICAL_FLIP_FLAG
    }

    /// Return whether this tile is flipped diagonally or not
    pub fn flip_diagonal(&self) -> bool {
        (self.as_raw() & GID_DIAGONAL_FLIP_FLAG) == GID_DIAGONAL_FLIP_FLAG
    }
}

impl std::str::FromStr for GID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(GID(s.trim().parse()?))
    }
}

pub(crate) fn child<'a, 'input>(node: &roxmltree::Node<'a, 'input>, name: &str) -> Option<roxmltree::Node<'a, 'input>> {
    node.children().find(|c| c.tag_name().name() == name)
}

pub(crate) fn attribute<T>(node: &roxmltree::Node, name: &str) -> Result<T>
    where T: std::str::FromStr,
          T::Err: std::error::Error + 'static,
          Error: From<<T as std::str::FromStr>::Err>
{
    Ok(node.attribute(name).ok_or_else(||{Error::StructureError{
        tag: node.tag_name().name().to_string(),
        msg: format!("Required attribute '{}' missing", name)
    }})?.parse()?)
}

pub(crate) fn attribute_or<T>(node: &roxmltree::Node, name: &str, alternative: T) -> Result<T>
    where T: std::str::FromStr,
          T::Err: std::error::Error + Send + Sync + 'static
{
    match node.attribute(name) {
        None => Ok(alternative),
        Some(text) => text.parse().map_err(|e: T::Err| Error::ParseError(Box::new(e)))
    }
}

pub(crate) fn attribute_or_default<T>(node: &roxmltree::Node, name: &str) -> Result<T>
    where T: Default + std::str::FromStr,
          T::Err: std::error::Error + Send + Sync + 'static
{
    attribute_or(node, name, T::default())
}

/// Tiled writes booleans in TMX files as "0" and "1".
pub(crate) fn attribute_flag(node: &roxmltree::Node, name: &str, alternative: bool) -> Result<bool> {
    match node.attribute(name) {
        None => Ok(alternative),
        Some("1") => Ok(true),
        Some("0") => Ok(false),
        Some(text) => Ok(text.parse()?),
    }
}

impl math::ivec2 {
    pub(crate) fn from_tmx_or_default(tmx: &roxmltree::Node, x_attr: &str, y_attr: &str) -> Result<Self> {
        Ok(Self::new(
            attribute_or_default(tmx, x_attr)?,
            attribute_or_default(tmx, y_attr)?
        ))
    }
}

impl math::fvec2 {
    pub(crate) fn from_tmx_or_default(tmx: &roxmltree::Node, x_attr: &str, y_attr: &str) -> Result<Self> {
        Ok(Self::new(
            attribute_or_default(tmx, x_attr)?,
            attribute_or_default(tmx, y_attr)?
        ))
    }

    pub(crate) fn from_tmx_or(tmx: &roxmltree::Node, x_attr: &str, y_attr: &str, alternative: f32) -> Result<Self> {
        Ok(Self::new(
            attribute_or(tmx, x_attr, alternative)?,
            attribute_or(tmx, y_attr, alternative)?
        ))
    }
}
