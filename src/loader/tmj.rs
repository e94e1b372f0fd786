//! Parsing of maps in TMJ (JSON) syntax.

use std::path::Path;

use serde::Deserialize;
use serde_json::value::RawValue;

use super::{
    cells_from_raw, check_depth, check_firstgid, check_tile_size, decode_cells, run_stage, LayerArena,
    LoaderOptions, ParsedMap, Stage, TilesetEntry,
};
use crate::decoder::{Compression, Encoding};
use crate::property::JsonProperty;
use crate::tileset::JsonTileset;
use crate::{
    math, parse_or_fallback, Chunk, Color, DrawOrder, Error, GroupLayer, HorizontalAlignment, Image,
    ImageLayer, Layer, LayerId, LayerKind, Map, Object, ObjectKind, ObjectLayer, PropertyContainer, Result,
    Text, TileData, TileLayer, TileSet, Version, VerticalAlignment, GID,
};

fn default_true() -> bool {
    true
}

fn one() -> f32 {
    1.0
}

/// Older files store the version as a number.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum JsonVersion {
    Text(String),
    Number(f64),
}

impl JsonVersion {
    fn parse(&self) -> Result<Version> {
        match self {
            JsonVersion::Text(text) => text.parse(),
            // Debug formatting keeps the minor version of whole numbers (1.0)
            JsonVersion::Number(number) => format!("{:?}", number).parse(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct JsonMap {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    version: JsonVersion,
    #[serde(default)]
    tiledversion: Option<String>,
    #[serde(default)]
    orientation: Option<String>,
    #[serde(default)]
    renderorder: Option<String>,
    #[serde(default)]
    class: String,
    width: i32,
    height: i32,
    tilewidth: i32,
    tileheight: i32,
    #[serde(default)]
    infinite: bool,
    #[serde(default)]
    nextlayerid: u32,
    #[serde(default)]
    nextobjectid: u32,
    #[serde(default)]
    parallaxoriginx: f32,
    #[serde(default)]
    parallaxoriginy: f32,
    #[serde(default)]
    backgroundcolor: Option<String>,
    #[serde(default)]
    tilesets: Vec<JsonTileset>,
    /// Layers are parsed one at a time while walking the layer tree.
    #[serde(default)]
    layers: Vec<Box<RawValue>>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

/// Tile data is either a plain array or an encoded string.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum JsonTileData {
    Raw(Vec<u32>),
    Encoded(String),
}

#[derive(Deserialize, Debug)]
struct JsonChunk {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    data: JsonTileData,
}

#[derive(Deserialize, Debug)]
struct JsonLayer {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<u32>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    class: String,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default = "one")]
    opacity: f32,
    #[serde(default)]
    offsetx: f32,
    #[serde(default)]
    offsety: f32,
    #[serde(default = "one")]
    parallaxx: f32,
    #[serde(default = "one")]
    parallaxy: f32,
    #[serde(default)]
    tintcolor: Option<String>,
    #[serde(default)]
    properties: Vec<JsonProperty>,

    // tile layers
    #[serde(default)]
    width: i32,
    #[serde(default)]
    height: i32,
    #[serde(default)]
    startx: i32,
    #[serde(default)]
    starty: i32,
    #[serde(default)]
    data: Option<JsonTileData>,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    compression: Option<String>,
    #[serde(default)]
    chunks: Vec<JsonChunk>,

    // object groups
    #[serde(default)]
    objects: Vec<JsonObject>,
    #[serde(default)]
    draworder: Option<String>,
    #[serde(default)]
    color: Option<String>,

    // image layers
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    repeatx: bool,
    #[serde(default)]
    repeaty: bool,

    // groups, kept unparsed until the group's depth is checked
    #[serde(default)]
    layers: Vec<Box<RawValue>>,
}

#[derive(Deserialize, Debug)]
struct JsonObject {
    #[serde(default)]
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
    #[serde(default)]
    width: f32,
    #[serde(default)]
    height: f32,
    #[serde(default)]
    rotation: f32,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    gid: Option<u32>,
    #[serde(default)]
    ellipse: bool,
    #[serde(default)]
    point: bool,
    #[serde(default)]
    polygon: Option<Vec<JsonObjectPoint>>,
    #[serde(default)]
    polyline: Option<Vec<JsonObjectPoint>>,
    #[serde(default)]
    text: Option<JsonText>,
    #[serde(default)]
    properties: Vec<JsonProperty>,
}

#[derive(Deserialize, Debug)]
struct JsonObjectPoint {
    x: f32,
    y: f32,
}

#[derive(Deserialize, Debug)]
struct JsonText {
    #[serde(default)]
    text: String,
    #[serde(default)]
    fontfamily: Option<String>,
    #[serde(default)]
    pixelsize: Option<u32>,
    #[serde(default)]
    wrap: bool,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    bold: bool,
    #[serde(default)]
    italic: bool,
    #[serde(default)]
    halign: Option<String>,
    #[serde(default)]
    valign: Option<String>,
}

pub(crate) fn parse(tmj: &str, base_dir: &Path, options: &LoaderOptions) -> Result<ParsedMap> {
    let (json, mut map) = run_stage(Stage::ParseHeader, || {
        let mut json: JsonMap = serde_json::from_str(tmj)?;
        let map = parse_header(&mut json, base_dir)?;
        Ok((json, map))
    })?;

    let JsonMap{ tilesets, layers, .. } = json;
    let tilesets = run_stage(Stage::ParseTilesets, || parse_tilesets(tilesets, base_dir))?;
    let arena = run_stage(Stage::ParseLayerTree, || parse_layer_tree(layers, &map, options))?;
    arena.install(&mut map);

    Ok(ParsedMap{ map, tilesets })
}

fn parse_color(color: Option<&str>, alternative: Color) -> Result<Color> {
    match color {
        None | Some("") => Ok(alternative),
        Some(text) => text.parse(),
    }
}

fn parse_header(json: &mut JsonMap, base_dir: &Path) -> Result<Map> {
    if let Some(kind) = json.kind.as_deref().filter(|kind| *kind != "map") {
        return Err(Error::StructureError{
            tag: "map".into(),
            msg: format!("Expected a map, found type '{}'", kind),
        });
    }

    let mut map = Map::empty(json.version.parse()?);
    map.editor_version = json.tiledversion.as_deref().map(str::parse::<Version>).transpose()?;
    map.orientation = parse_or_fallback(json.orientation.as_deref(), "orientation");
    map.renderorder = parse_or_fallback(json.renderorder.as_deref(), "render order");
    map.class = std::mem::take(&mut json.class);
    map.size = math::ivec2::new(json.width, json.height);
    map.tile_size = math::ivec2::new(json.tilewidth, json.tileheight);
    map.infinite = json.infinite;
    map.next_layer_id = json.nextlayerid;
    map.next_object_id = json.nextobjectid;
    map.parallax_origin = math::fvec2::new(json.parallaxoriginx, json.parallaxoriginy);
    map.backgroundcolor = parse_color(json.backgroundcolor.as_deref(), Color::default())?;
    map.base_dir = base_dir.to_path_buf();
    map.properties = PropertyContainer::from_json(&json.properties)?;

    check_tile_size(&map)?;
    Ok(map)
}

fn parse_tilesets(tilesets: Vec<JsonTileset>, base_dir: &Path) -> Result<Vec<TilesetEntry>> {
    tilesets.into_iter().map(|mut json| {
        let firstgid = json.firstgid.ok_or_else(|| Error::StructureError{
            tag: "tileset".into(),
            msg: "Required attribute 'firstgid' missing".into(),
        })?;
        let firstgid = check_firstgid(firstgid)?;

        Ok(match json.source.take() {
            Some(source) => TilesetEntry::External{ firstgid, source },
            None => {
                let mut tileset = TileSet::from_json(json, base_dir)?;
                tileset.firstgid = firstgid;
                TilesetEntry::Embedded(tileset)
            },
        })
    }).collect()
}

/// Walks the layer tree with an explicit stack, so deeply nested groups
/// cannot exhaust the call stack.
///
/// Every layer is deserialized on its own after its depth was checked,
/// the json parser never descends into nested groups.
fn parse_layer_tree(layers: Vec<Box<RawValue>>, map: &Map, options: &LoaderOptions) -> Result<LayerArena> {
    let mut arena = LayerArena::default();
    let mut pending: Vec<(Box<RawValue>, Option<LayerId>, usize)> =
        layers.into_iter().rev().map(|l| (l, None, 0)).collect();

    while let Some((raw, parent, depth)) = pending.pop() {
        check_depth(depth, options)?;

        let mut json: JsonLayer = serde_json::from_str(raw.get())?;
        let children = std::mem::take(&mut json.layers);
        let layer = parse_layer(json, map)?;
        let is_group = matches!(layer.kind, LayerKind::Group(_));
        let id = arena.push(layer, parent);

        if is_group {
            pending.extend(children.into_iter().rev().map(|c| (c, Some(id), depth + 1)));
        }
    }

    Ok(arena)
}

fn parse_layer(mut json: JsonLayer, map: &Map) -> Result<Layer> {
    let properties = PropertyContainer::from_json(&json.properties)?;
    let tintcolor = parse_color(json.tintcolor.as_deref(), Color::WHITE)?;
    let offset = math::fvec2::new(json.offsetx, json.offsety);
    let parallax = math::fvec2::new(json.parallaxx, json.parallaxy);
    let (id, visible, opacity) = (json.id, json.visible, json.opacity);
    let name = json.name.clone();
    let class = std::mem::take(&mut json.class);
    let layer_type = std::mem::take(&mut json.kind);

    let kind = match layer_type.as_str() {
        "tilelayer" => LayerKind::Tile(parse_tile_layer(json, map.infinite)?),
        "objectgroup" => LayerKind::Object(parse_object_layer(json)?),
        "imagelayer" => LayerKind::Image(ImageLayer{
            image: json.image.as_deref()
                .filter(|source| !source.is_empty())
                .map(|source| Image::resolve(&map.base_dir, source)),
            repeat_x: json.repeatx,
            repeat_y: json.repeaty,
        }),
        "group" => LayerKind::Group(GroupLayer::default()),
        other => return Err(Error::UnsupportedFeature(format!("Unknown layer type '{}'", other))),
    };

    let mut layer = Layer::new(name, kind);
    layer.id = id;
    layer.class = class;
    layer.visible = visible;
    layer.opacity = opacity;
    layer.offset = offset;
    layer.parallax = parallax;
    layer.tintcolor = tintcolor;
    layer.properties = properties;
    Ok(layer)
}

fn read_cells(
    label: &str, data: Option<JsonTileData>, encoding: Encoding, compression: Compression, size: math::ivec2
) -> Result<Vec<Option<GID>>> {
    match data {
        None => cells_from_raw(label, Vec::new(), size),
        Some(JsonTileData::Raw(raw)) => cells_from_raw(label, raw, size),
        Some(JsonTileData::Encoded(text)) => decode_cells(label, &text, encoding, compression, size),
    }
}

fn parse_tile_layer(json: JsonLayer, infinite: bool) -> Result<TileLayer> {
    let size = math::ivec2::new(json.width, json.height);
    let encoding = match json.encoding.as_deref() {
        None => Encoding::Csv,
        Some(encoding) => encoding.parse()?,
    };
    let compression = json.compression.as_deref().map(str::parse::<Compression>).transpose()?.unwrap_or_default();

    if !infinite {
        return Ok(TileLayer{
            size,
            start: math::ivec2::default(),
            data: TileData::Finite(read_cells(&json.name, json.data, encoding, compression, size)?),
        });
    }

    let name = json.name;
    let chunks = json.chunks.into_iter().map(|chunk| {
        let pos = math::ivec2::new(chunk.x, chunk.y);
        let size = math::ivec2::new(chunk.width, chunk.height);
        let label = format!("{} (chunk {},{})", name, pos.x, pos.y);
        Ok(Chunk{ pos, size, tiles: read_cells(&label, Some(chunk.data), encoding, compression, size)? })
    }).collect::<Result<Vec<_>>>()?;

    Ok(TileLayer{
        size,
        start: math::ivec2::new(json.startx, json.starty),
        data: TileData::Chunked(chunks),
    })
}

fn parse_object_layer(json: JsonLayer) -> Result<ObjectLayer> {
    Ok(ObjectLayer{
        color: parse_color(json.color.as_deref(), Color::from_argb(255, 160, 160, 164))?,
        draworder: json.draworder.as_deref().map(str::parse::<DrawOrder>).transpose()?.unwrap_or_default(),
        objects: json.objects.into_iter().map(parse_object).collect::<Result<_>>()?,
    })
}

fn points(points: Vec<JsonObjectPoint>) -> Vec<math::fvec2> {
    points.into_iter().map(|p| math::fvec2::new(p.x, p.y)).collect()
}

fn parse_object(json: JsonObject) -> Result<Object> {
    let kind = if let Some(text) = json.text {
        ObjectKind::Text(parse_text(text)?)
    } else if json.point {
        ObjectKind::Point
    } else if json.ellipse {
        ObjectKind::Ellipse
    } else if let Some(polygon) = json.polygon {
        ObjectKind::Polygon{ points: points(polygon) }
    } else if let Some(polyline) = json.polyline {
        ObjectKind::Polyline{ points: points(polyline) }
    } else {
        ObjectKind::Rect
    };

    Ok(Object{
        id: json.id,
        name: json.name,
        // "type" was renamed to "class" in Tiled 1.9
        type_: if json.class.is_empty() { json.kind } else { json.class },
        pos: math::fvec2::new(json.x, json.y),
        size: math::fvec2::new(json.width, json.height),
        rotation: json.rotation,
        tile_id: json.gid.and_then(GID::new),
        visible: json.visible,
        kind,
        properties: PropertyContainer::from_json(&json.properties)?,
    })
}

fn parse_text(json: JsonText) -> Result<Text> {
    let defaults = Text::default();
    Ok(Text{
        content: json.text,
        font_family: json.fontfamily.unwrap_or(defaults.font_family),
        pixel_size: json.pixelsize.unwrap_or(defaults.pixel_size),
        wrap: json.wrap,
        color: parse_color(json.color.as_deref(), defaults.color)?,
        bold: json.bold,
        italic: json.italic,
        halign: json.halign.as_deref().map(str::parse::<HorizontalAlignment>).transpose()?.unwrap_or_default(),
        valign: json.valign.as_deref().map(str::parse::<VerticalAlignment>).transpose()?.unwrap_or_default(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Orientation;

    fn load(tmj: &str) -> Result<Map> {
        Ok(parse(tmj, Path::new("maps"), &LoaderOptions::default())?.map)
    }

    #[test]
    fn test_header() -> Result<()> {
        let map = load(r##"{
            "type": "map", "version": "1.10", "tiledversion": "1.10.1",
            "orientation": "hexagonal", "renderorder": "right-up",
            "width": 10, "height": 5, "tilewidth": 16, "tileheight": 16,
            "infinite": false, "nextlayerid": 3, "nextobjectid": 7,
            "backgroundcolor": "#80ff0000",
            "properties": [{"name": "difficulty", "type": "int", "value": 3}],
            "layers": [], "tilesets": []
        }"##)?;

        assert_eq!(map.version, Version(1, 10, None));
        assert_eq!(map.orientation, Orientation::Hexagonal);
        assert_eq!(map.renderorder, crate::Renderorder::RightUp);
        assert_eq!(map.size, math::ivec2::new(10, 5));
        assert_eq!(map.next_object_id, 7);
        assert_eq!(map.backgroundcolor, Color::from_argb(0x80, 0xff, 0, 0));
        assert_eq!(map.properties.get_int("difficulty"), Some(3));
        Ok(())
    }

    #[test]
    fn test_numeric_version() -> Result<()> {
        let map = load(r#"{"version": 1.2, "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8}"#)?;
        assert_eq!(map.version, Version(1, 2, None));
        Ok(())
    }

    #[test]
    fn test_wrong_type() {
        let result = load(r#"{"type": "tileset", "version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8}"#);
        assert!(matches!(result, Err(Error::StructureError{ .. })));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(load("{ not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_tileset_entries() -> Result<()> {
        let parsed = parse(r#"{
            "version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
            "tilesets": [
                {"firstgid": 1, "source": "tiles/outdoor.tsj"},
                {"firstgid": 9, "name": "inline", "tilewidth": 8, "tileheight": 8, "tilecount": 4,
                 "columns": 2, "image": "inline.png", "imagewidth": 16, "imageheight": 16}
            ]
        }"#, Path::new("maps"), &LoaderOptions::default())?;

        assert!(matches!(&parsed.tilesets[0], TilesetEntry::External{ firstgid: 1, source } if source == "tiles/outdoor.tsj"));
        match &parsed.tilesets[1] {
            TilesetEntry::Embedded(tileset) => {
                assert_eq!(tileset.firstgid, 9);
                assert_eq!(tileset.name, "inline");
            },
            _ => panic!("expected an embedded tileset"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_firstgid() {
        let result = load(r#"{"version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
            "tilesets": [{"source": "a.tsj"}]}"#);
        assert!(matches!(result, Err(Error::StructureError{ .. })));
    }

    #[test]
    fn test_layers() -> Result<()> {
        let map = load(r##"{
            "version": "1.10", "width": 2, "height": 2, "tilewidth": 8, "tileheight": 8,
            "layers": [
                {"type": "tilelayer", "id": 1, "name": "ground", "width": 2, "height": 2,
                 "data": [1, 0, 0, 2147483650]},
                {"type": "group", "name": "decor", "parallaxx": 0.5, "tintcolor": "#ff0000",
                 "layers": [
                    {"type": "tilelayer", "name": "encoded", "width": 2, "height": 2,
                     "encoding": "base64", "data": "AQAAAAAAAAAAAAAAAgAAAA=="},
                    {"type": "imagelayer", "name": "sky", "image": "../img/sky.png", "repeaty": true}
                 ]},
                {"type": "objectgroup", "name": "things", "draworder": "index", "objects": [
                    {"id": 1, "name": "door", "class": "portal", "x": 4, "y": 4, "width": 8, "height": 8},
                    {"id": 2, "x": 0, "y": 0, "ellipse": true},
                    {"id": 3, "x": 0, "y": 0, "polyline": [{"x": 0, "y": 0}, {"x": 4, "y": 2}]},
                    {"id": 4, "gid": 5, "x": 0, "y": 8, "width": 8, "height": 8},
                    {"id": 5, "x": 0, "y": 0, "text": {"text": "Hi", "bold": true, "valign": "bottom"}}
                 ]}
            ]
        }"##)?;

        let names: Vec<_> = map.iter_layers().map(|(l, _)| l.name.as_str()).collect();
        assert_eq!(names, vec!["ground", "decor", "encoded", "sky", "things"]);

        let ground = map.find_layer("ground").unwrap();
        assert_eq!(ground.id, Some(1));
        let flipped = ground.as_tile_layer().unwrap().tile(math::ivec2::new(1, 1)).unwrap();
        assert!(flipped.flip_horizontal());
        assert_eq!(flipped.to_id(), 2);

        let decor = map.find_layer("decor").unwrap();
        assert_eq!(decor.parallax, math::fvec2::new(0.5, 1.));
        assert_eq!(decor.tintcolor, Color::from_argb(255, 255, 0, 0));

        let encoded = map.find_layer("encoded").unwrap().as_tile_layer().unwrap();
        assert_eq!(encoded.tile(math::ivec2::new(1, 1)), GID::new(2));

        let sky = map.find_layer("sky").unwrap().as_image_layer().unwrap();
        assert_eq!(sky.image.as_deref(), Some(Path::new("img/sky.png")));
        assert!(sky.repeat_y);

        let things = map.find_layer("things").unwrap().as_object_layer().unwrap();
        assert_eq!(things.draworder, DrawOrder::Index);
        let objects = &things.objects;
        assert_eq!(objects[0].type_, "portal");
        assert_eq!(objects[0].kind, ObjectKind::Rect);
        assert_eq!(objects[1].kind, ObjectKind::Ellipse);
        assert!(matches!(&objects[2].kind, ObjectKind::Polyline{ points } if points.len() == 2));
        assert_eq!(objects[3].tile_id, GID::new(5));
        match &objects[4].kind {
            ObjectKind::Text(text) => {
                assert_eq!(text.content, "Hi");
                assert!(text.bold);
                assert_eq!(text.valign, VerticalAlignment::Bottom);
                assert_eq!(text.font_family, "sans-serif");
            },
            other => panic!("expected text, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_unknown_layer_type() {
        let result = load(r#"{"version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
            "layers": [{"type": "hologram", "name": "x"}]}"#);
        assert!(matches!(result, Err(Error::UnsupportedFeature(_))));
    }

    #[test]
    fn test_layer_size_mismatch() {
        let result = load(r#"{"version": "1.10", "width": 2, "height": 2, "tilewidth": 8, "tileheight": 8,
            "layers": [{"type": "tilelayer", "name": "short", "width": 2, "height": 2, "data": [1, 2]}]}"#);
        match result {
            Err(error @ Error::LayerSize{ .. }) => assert!(error.to_string().contains("short")),
            other => panic!("expected a layer size error, got {:?}", other),
        }
    }

    #[test]
    fn test_depth_limit() {
        let tmj = r#"{"version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8,
            "layers": [{"type": "group", "layers": [{"type": "group", "layers": []}]}]}"#;
        let strict = LoaderOptions::default().with_max_group_depth(0);
        assert!(matches!(parse(tmj, Path::new(""), &strict), Err(Error::DepthExceeded{ limit: 0 })));
        assert!(parse(tmj, Path::new(""), &LoaderOptions::default()).is_ok());
    }

    /// A map with `groups` nested groups, the innermost one at depth `groups - 1`.
    fn nested_groups(groups: usize) -> String {
        let layers = (0..groups).fold(String::from("[]"), |inner, i| {
            format!(r#"[{{"type": "group", "name": "g{}", "layers": {}}}]"#, i, inner)
        });
        format!(r#"{{"version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8, "layers": {}}}"#, layers)
    }

    #[test]
    fn test_depth_limit_is_exact() -> Result<()> {
        let options = LoaderOptions::default();
        let limit = options.max_group_depth;

        // deeper than the recursion limit of the json parser
        let parsed = parse(&nested_groups(limit + 1), Path::new(""), &options)?;
        assert_eq!(parsed.map.layers().len(), limit + 1);

        let result = parse(&nested_groups(limit + 2), Path::new(""), &options);
        assert!(matches!(result, Err(Error::DepthExceeded{ limit: 64 })));
        Ok(())
    }

    #[test]
    fn test_depth_limit_with_very_deep_file() {
        let options = LoaderOptions::default().with_max_group_depth(10);
        let result = parse(&nested_groups(200), Path::new(""), &options);
        assert!(matches!(result, Err(Error::DepthExceeded{ limit: 10 })));

        let options = LoaderOptions::default().with_max_group_depth(300);
        assert!(parse(&nested_groups(200), Path::new(""), &options).is_ok());
    }

    #[test]
    fn test_infinite_chunks() -> Result<()> {
        let map = load(r#"{
            "version": "1.10", "width": 0, "height": 0, "tilewidth": 8, "tileheight": 8, "infinite": true,
            "layers": [{"type": "tilelayer", "name": "ground", "width": 32, "height": 16,
                "startx": -16, "starty": 0,
                "chunks": [
                    {"x": -16, "y": 0, "width": 16, "height": 16, "data": [1]},
                    {"x": 0, "y": 0, "width": 16, "height": 16, "data": [2]}
                ]}]
        }"#);
        // chunk data must fill the whole chunk
        assert!(matches!(map, Err(Error::LayerSize{ expected: 256, actual: 1, .. })));

        let map = load(r#"{
            "version": "1.10", "width": 0, "height": 0, "tilewidth": 8, "tileheight": 8, "infinite": true,
            "layers": [{"type": "tilelayer", "name": "ground", "width": 2, "height": 1,
                "startx": -1, "starty": 0,
                "chunks": [
                    {"x": -1, "y": 0, "width": 1, "height": 1, "data": [1]},
                    {"x": 0, "y": 0, "width": 1, "height": 1, "data": [2]}
                ]}]
        }"#)?;
        let layer = map.find_layer("ground").unwrap().as_tile_layer().unwrap();
        assert_eq!(layer.start, math::ivec2::new(-1, 0));
        assert_eq!(layer.tile(math::ivec2::new(-1, 0)), GID::new(1));
        assert_eq!(layer.tile(math::ivec2::new(0, 0)), GID::new(2));
        Ok(())
    }
}
