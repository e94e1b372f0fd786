//! Parsing of maps in TMX (XML) syntax.

use std::path::Path;

use roxmltree::{Document, Node};

use super::{
    cells_from_raw, check_depth, check_firstgid, check_tile_size, decode_cells, run_stage, LayerArena,
    LoaderOptions, ParsedMap, Stage, TilesetEntry,
};
use crate::decoder::{Compression, Encoding};
use crate::object::AsPointListExt;
use crate::{
    attribute, attribute_flag, attribute_or, attribute_or_default, child, math, parse_or_fallback, Chunk,
    Color, Error, GroupLayer, Image, ImageLayer, Layer, LayerKind, Map, Object, ObjectKind, ObjectLayer,
    PropertyContainer, Result, Text, TileData, TileLayer, TileSet, Version, GID,
};

const LAYER_TAGS: [&str; 4] = ["layer", "objectgroup", "imagelayer", "group"];

pub(crate) fn parse(tmx: &str, base_dir: &Path, options: &LoaderOptions) -> Result<ParsedMap> {
    let (document, mut map) = run_stage(Stage::ParseHeader, || {
        let document = Document::parse(tmx)?;
        let map = parse_header(&document.root_element(), base_dir)?;
        Ok((document, map))
    })?;
    let root = document.root_element();

    let tilesets = run_stage(Stage::ParseTilesets, || parse_tilesets(&root, base_dir))?;
    let arena = run_stage(Stage::ParseLayerTree, || parse_layer_tree(&root, &map, options))?;
    arena.install(&mut map);

    Ok(ParsedMap{ map, tilesets })
}

fn parse_header(tmx: &Node, base_dir: &Path) -> Result<Map> {
    if tmx.tag_name().name() != "map" {
        return Err(Error::StructureError{
            tag: tmx.tag_name().name().into(),
            msg: "Expected 'map' as root element".into(),
        });
    }

    let mut map = Map::empty(attribute(tmx, "version")?);
    map.editor_version = tmx.attribute("tiledversion").map(str::parse::<Version>).transpose()?;
    map.orientation = parse_or_fallback(tmx.attribute("orientation"), "orientation");
    map.renderorder = parse_or_fallback(tmx.attribute("renderorder"), "render order");
    map.class = attribute_or_default(tmx, "class")?;
    map.size = math::ivec2::new(attribute(tmx, "width")?, attribute(tmx, "height")?);
    map.tile_size = math::ivec2::new(attribute(tmx, "tilewidth")?, attribute(tmx, "tileheight")?);
    map.infinite = attribute_flag(tmx, "infinite", false)?;
    map.next_layer_id = attribute_or_default(tmx, "nextlayerid")?;
    map.next_object_id = attribute_or_default(tmx, "nextobjectid")?;
    map.parallax_origin = math::fvec2::from_tmx_or_default(tmx, "parallaxoriginx", "parallaxoriginy")?;
    map.backgroundcolor = attribute_or_default(tmx, "backgroundcolor")?;
    map.base_dir = base_dir.to_path_buf();
    map.properties = PropertyContainer::from_xml(tmx)?;

    check_tile_size(&map)?;
    Ok(map)
}

fn parse_tilesets(tmx: &Node, base_dir: &Path) -> Result<Vec<TilesetEntry>> {
    tmx.children()
        .filter(|c| c.tag_name().name() == "tileset")
        .map(|node| {
            let firstgid = check_firstgid(attribute(&node, "firstgid")?)?;
            Ok(match node.attribute("source") {
                Some(source) => TilesetEntry::External{ firstgid, source: source.into() },
                None => {
                    let mut tileset = TileSet::from_xml(&node, base_dir)?;
                    tileset.firstgid = firstgid;
                    TilesetEntry::Embedded(tileset)
                },
            })
        })
        .collect()
}

fn layer_children<'a, 'input>(node: &Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
    node.children().filter(|c| LAYER_TAGS.contains(&c.tag_name().name())).collect()
}

/// Walks the layer tree with an explicit stack, so deeply nested groups
/// cannot exhaust the call stack.
fn parse_layer_tree(tmx: &Node, map: &Map, options: &LoaderOptions) -> Result<LayerArena> {
    let mut arena = LayerArena::default();
    let mut pending: Vec<_> = layer_children(tmx).into_iter().rev().map(|n| (n, None, 0)).collect();

    while let Some((node, parent, depth)) = pending.pop() {
        check_depth(depth, options)?;

        let layer = parse_layer(&node, map)?;
        let is_group = matches!(layer.kind, LayerKind::Group(_));
        let id = arena.push(layer, parent);

        if is_group {
            pending.extend(layer_children(&node).into_iter().rev().map(|c| (c, Some(id), depth + 1)));
        }
    }

    Ok(arena)
}

fn parse_layer(tmx: &Node, map: &Map) -> Result<Layer> {
    let name: String = attribute_or_default(tmx, "name")?;

    let kind = match tmx.tag_name().name() {
        "layer" => LayerKind::Tile(parse_tile_layer(tmx, &name, map.infinite)?),
        "objectgroup" => LayerKind::Object(parse_object_layer(tmx)?),
        "imagelayer" => LayerKind::Image(parse_image_layer(tmx, &map.base_dir)?),
        "group" => LayerKind::Group(GroupLayer::default()),
        other => return Err(Error::StructureError{
            tag: other.into(),
            msg: "Not a layer".into(),
        }),
    };

    let mut layer = Layer::new(name, kind);
    layer.id = tmx.attribute("id").map(|t| t.parse()).transpose()?;
    layer.class = attribute_or_default(tmx, "class")?;
    layer.visible = attribute_flag(tmx, "visible", true)?;
    layer.opacity = attribute_or(tmx, "opacity", 1.)?;
    layer.offset = math::fvec2::from_tmx_or_default(tmx, "offsetx", "offsety")?;
    layer.parallax = math::fvec2::from_tmx_or(tmx, "parallaxx", "parallaxy", 1.)?;
    layer.tintcolor = attribute_or(tmx, "tintcolor", Color::WHITE)?;
    layer.properties = PropertyContainer::from_xml(tmx)?;
    Ok(layer)
}

fn parse_tile_layer(tmx: &Node, name: &str, infinite: bool) -> Result<TileLayer> {
    let size = math::ivec2::new(attribute(tmx, "width")?, attribute(tmx, "height")?);
    let data = child(tmx, "data").ok_or_else(|| Error::StructureError{
        tag: "layer".into(),
        msg: format!("Layer '{}' has no data", name),
    })?;

    let encoding = data.attribute("encoding").map(str::parse::<Encoding>).transpose()?;
    let compression = data.attribute("compression")
        .map(str::parse::<Compression>)
        .transpose()?
        .unwrap_or_default();

    if !infinite {
        return Ok(TileLayer{
            size,
            start: math::ivec2::default(),
            data: TileData::Finite(read_cells(&data, name, encoding, compression, size)?),
        });
    }

    let chunks = data.children()
        .filter(|c| c.tag_name().name() == "chunk")
        .map(|node| {
            let pos = math::ivec2::new(attribute(&node, "x")?, attribute(&node, "y")?);
            let size = math::ivec2::new(attribute(&node, "width")?, attribute(&node, "height")?);
            let label = format!("{} (chunk {},{})", name, pos.x, pos.y);
            Ok(Chunk{ pos, size, tiles: read_cells(&node, &label, encoding, compression, size)? })
        })
        .collect::<Result<Vec<_>>>()?;

    let start = chunks.iter().map(|c| c.pos).reduce(|a, b| math::ivec2::new(a.x.min(b.x), a.y.min(b.y)));
    Ok(TileLayer{
        size,
        start: start.unwrap_or_default(),
        data: TileData::Chunked(chunks),
    })
}

/// Read the cells of a `data` or `chunk` element.
fn read_cells(
    node: &Node, label: &str, encoding: Option<Encoding>, compression: Compression, size: math::ivec2
) -> Result<Vec<Option<GID>>> {
    match encoding {
        Some(encoding) => decode_cells(label, node.text().unwrap_or_default(), encoding, compression, size),
        // Without encoding, every cell is a <tile> element
        None => {
            let raw = node.children()
                .filter(|c| c.tag_name().name() == "tile")
                .map(|tile| attribute_or(&tile, "gid", 0u32))
                .collect::<Result<Vec<_>>>()?;
            cells_from_raw(label, raw, size)
        },
    }
}

fn parse_object_layer(tmx: &Node) -> Result<ObjectLayer> {
    let objects = tmx.children()
        .filter(|t| t.tag_name().name() == "object")
        .map(|t| parse_object(&t))
        .collect::<Result<_>>()?;

    Ok(ObjectLayer{
        color: attribute_or(tmx, "color", Color::from_argb(255, 160, 160, 164))?,
        draworder: attribute_or_default(tmx, "draworder")?,
        objects,
    })
}

fn parse_image_layer(tmx: &Node, base_dir: &Path) -> Result<ImageLayer> {
    Ok(ImageLayer{
        image: child(tmx, "image")
            .and_then(|image| image.attribute("source"))
            .filter(|source| !source.is_empty())
            .map(|source| Image::resolve(base_dir, source)),
        repeat_x: attribute_flag(tmx, "repeatx", false)?,
        repeat_y: attribute_flag(tmx, "repeaty", false)?,
    })
}

fn parse_object(tmx: &Node) -> Result<Object> {
    let tile_id = if let Some(txt) = tmx.attribute("gid") {
        GID::new(txt.trim().parse()?)
    } else {
        None
    };

    Ok(Object{
        id: attribute(tmx, "id")?,
        name: attribute_or_default(tmx, "name")?,
        // "type" was renamed to "class" in Tiled 1.9
        type_: tmx.attribute("class").or_else(|| tmx.attribute("type")).unwrap_or_default().into(),
        pos: math::fvec2::from_tmx_or_default(tmx, "x", "y")?,
        size: math::fvec2::from_tmx_or_default(tmx, "width", "height")?,
        rotation: attribute_or_default(tmx, "rotation")?,
        tile_id,
        visible: attribute_flag(tmx, "visible", true)?,
        kind: parse_object_kind(tmx)?,
        properties: PropertyContainer::from_xml(tmx)?,
    })
}

fn parse_object_kind(tmx: &Node) -> Result<ObjectKind> {
    use ObjectKind::*;
    for child in tmx.children() {
        match child.tag_name().name() {
            "ellipse" => return Ok(Ellipse),
            "point" => return Ok(Point),
            poly @ ("polygon" | "polyline") => {
                let points = child
                    .attribute("points")
                    .ok_or_else(|| Error::StructureError{
                        tag: poly.into(),
                        msg: "Missing attribute points".into()
                    })?
                    .as_point_list()?;
                return Ok(if poly == "polygon" { Polygon{ points } } else { Polyline{ points } });
            },
            "text" => return Ok(ObjectKind::Text(parse_text(&child)?)),
            _ => {},
        }
    }
    Ok(Rect)
}

fn parse_text(tmx: &Node) -> Result<Text> {
    let defaults = Text::default();
    Ok(Text{
        content: tmx.text().unwrap_or_default().into(),
        font_family: tmx.attribute("fontfamily").map(String::from).unwrap_or(defaults.font_family),
        pixel_size: attribute_or(tmx, "pixelsize", defaults.pixel_size)?,
        wrap: attribute_flag(tmx, "wrap", false)?,
        color: attribute_or(tmx, "color", defaults.color)?,
        bold: attribute_flag(tmx, "bold", false)?,
        italic: attribute_flag(tmx, "italic", false)?,
        halign: attribute_or_default(tmx, "halign")?,
        valign: attribute_or_default(tmx, "valign")?,
    })
}
