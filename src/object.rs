use crate::{math, Color, PropertyContainer, GID};

/// An element of an [ObjectLayer](crate::ObjectLayer).
/// Objects do not need to be aligned to the normal tile grid.
/// Objects can have different kinds,
/// (e.g. rect, ellipse, text).
/// See [ObjectKind] for more info.
#[derive(Debug, PartialEq, Clone)]
pub struct Object {
    pub id: u32,
    pub name: String,
    /// The class of the object (called "type" before Tiled 1.9)
    pub type_: String,
    pub pos: math::fvec2,
    pub size: math::fvec2,
    /// Rotation in degrees, clockwise
    pub rotation: f32,
    /// Tile objects show the tile with this GID
    pub tile_id: Option<GID>,
    pub visible: bool,
    pub kind: ObjectKind,
    pub properties: PropertyContainer,
}

#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum ObjectKind {
    Rect,
    Ellipse,
    Point,
    Polygon {
        points: Vec<math::fvec2>
    },
    Polyline {
        points: Vec<math::fvec2>
    },
    Text(Text),
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum HorizontalAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl std::str::FromStr for HorizontalAlignment {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        use HorizontalAlignment::*;
        match s {
            "left" => Ok(Left),
            "center" => Ok(Center),
            "right" => Ok(Right),
            "justify" => Ok(Justify),
            _ => Err(crate::Error::ParseError(format!("Invalid horizontal alignment '{}'", s).into())),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

impl std::str::FromStr for VerticalAlignment {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        use VerticalAlignment::*;
        match s {
            "top" => Ok(Top),
            "center" => Ok(Center),
            "bottom" => Ok(Bottom),
            _ => Err(crate::Error::ParseError(format!("Invalid vertical alignment '{}'", s).into())),
        }
    }
}

/// Content and formatting of a text object.
#[derive(Debug, PartialEq, Clone)]
pub struct Text {
    pub content: String,
    pub font_family: String,
    pub pixel_size: u32,
    pub wrap: bool,
    pub color: Color,
    pub bold: bool,
    pub italic: bool,
    pub halign: HorizontalAlignment,
    pub valign: VerticalAlignment,
}

impl Default for Text {
    fn default() -> Self {
        Self{
            content: String::new(),
            font_family: "sans-serif".into(),
            pixel_size: 16,
            wrap: false,
            color: Color::from_argb(255, 0, 0, 0),
            bold: false,
            italic: false,
            halign: HorizontalAlignment::default(),
            valign: VerticalAlignment::default(),
        }
    }
}

impl Object {
    /// Whether this object shows a tile.
    pub fn is_tile_object(&self) -> bool {
        self.tile_id.is_some()
    }
}

pub(crate) trait AsPointListExt { fn as_point_list(&self) -> crate::Result<Vec<math::fvec2>>; }

impl AsPointListExt for &str {
    fn as_point_list(&self) -> crate::Result<Vec<math::fvec2>> {
        let mut points = vec![];
        for point in self.split_ascii_whitespace() {
            let mut coords = point.split(',');
            if let (Some(x), Some(y), None) = (coords.next(), coords.next(), coords.next()) {
                points.push(math::fvec2::new(x.parse()?,y.parse()?));
            } else {
                return Err(crate::Error::ParseError(format!("{} is not a valid point", point).into()));
            }
        }
        Ok(points)
    }
}
