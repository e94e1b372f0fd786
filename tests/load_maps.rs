use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tiled_level::*;

const TERRAIN_TSX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<tileset version="1.10" tiledversion="1.10.2" name="terrain" tilewidth="16" tileheight="16" tilecount="8" columns="4">
    <image source="../images/terrain.png" width="64" height="32"/>
    <tile id="5" type="water"/>
</tileset>
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn zlib_base64(tiles: &[u32]) -> String {
    let bytes: Vec<u8> = tiles.iter().flat_map(|t| t.to_le_bytes()).collect();
    let mut encoder = libflate::zlib::Encoder::new(Vec::new()).unwrap();
    encoder.write_all(&bytes).unwrap();
    base64::encode(encoder.finish().into_result().unwrap())
}

fn level1_tmx() -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" tiledversion="1.10.2" orientation="isometric" renderorder="right-down"
     width="2" height="2" tilewidth="32" tileheight="16" infinite="0" nextlayerid="4" nextobjectid="1">
    <tileset firstgid="1" source="../tiles/terrain.tsx"/>
    <tileset firstgid="9" name="inline" tilewidth="16" tileheight="16" tilecount="4" columns="2">
        <image source="../images/inline.png" width="32" height="32"/>
    </tileset>
    <layer id="1" name="ground" width="2" height="2">
        <data encoding="base64" compression="zlib">
            {}
        </data>
    </layer>
    <group id="2" name="background">
        <imagelayer id="3" name="sky" parallaxx="0.5">
            <image source="../images/sky.png" width="640" height="480"/>
        </imagelayer>
    </group>
</map>
"#, zlib_base64(&[1, 0x8000_0006, 0, 10]))
}

const LEVEL2_TMJ: &str = r#"{
    "type": "map", "version": "1.10", "tiledversion": "1.10.2",
    "orientation": "orthogonal", "renderorder": "right-down",
    "width": 3, "height": 1, "tilewidth": 16, "tileheight": 16, "infinite": false,
    "tilesets": [{"firstgid": 1, "source": "../tiles/terrain.tsx"}],
    "layers": [
        {"type": "tilelayer", "id": 1, "name": "floor", "width": 3, "height": 1, "data": [2, 3, 4]},
        {"type": "objectgroup", "id": 2, "name": "spawns", "objects": [
            {"id": 1, "name": "player", "x": 8, "y": 8, "point": true}
        ]}
    ]
}"#;

#[test]
fn load_tmx_with_external_tileset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let path = write(dir.path(), "maps/level1.tmx", &level1_tmx());

    let map = Map::from_file(&path)?;

    assert_eq!(map.version, Version(1, 10, None));
    assert_eq!(map.editor_version, Some(Version(1, 10, Some(2))));
    assert_eq!(map.orientation, Orientation::Isometric);
    assert_eq!(map.tile_size, math::ivec2::new(32, 16));
    assert_eq!(map.base_dir, dir.path().join("maps"));

    assert_eq!(map.tilesets.len(), 2);
    let terrain = &map.tilesets[0];
    assert_eq!(terrain.name, "terrain");
    assert_eq!(terrain.source.as_deref(), Some(Path::new("../tiles/terrain.tsx")));
    assert_eq!((terrain.firstgid, terrain.lastgid), (1, 8));
    assert_eq!(map.tilesets[1].source, None);
    assert_eq!((map.tilesets[1].firstgid, map.tilesets[1].lastgid), (9, 12));

    let ground = map.find_layer("ground").unwrap().as_tile_layer().unwrap();
    let flipped = ground.tile(math::ivec2::new(1, 0)).unwrap();
    let resolved = map.resolve_gid(flipped.as_raw());
    assert_eq!(resolved.tileset.map(|t| t.name.as_str()), Some("terrain"));
    assert_eq!((resolved.local_id, resolved.column, resolved.row), (5, 1, 1));
    assert!(resolved.flip_horizontal);
    assert_eq!(resolved.tileset.unwrap().tile(resolved.local_id).unwrap().type_, "water");

    assert_eq!(ground.tile(math::ivec2::new(0, 1)), None);
    let inline = map.resolve_gid(10);
    assert_eq!(inline.tileset.map(|t| t.name.as_str()), Some("inline"));
    assert_eq!((inline.local_id, inline.column, inline.row), (1, 1, 0));

    let (image, rect) = map.tile_image(flipped).unwrap();
    assert_eq!(image, dir.path().join("images/terrain.png"));
    assert_eq!(rect, math::Rect::new(math::ivec2::new(16, 16), math::ivec2::new(16, 16)));

    let sky = map.find_layer("sky").unwrap();
    assert_eq!(sky.parallax, math::fvec2::new(0.5, 1.));
    assert_eq!(map.layer(sky.parent.unwrap()).name, "background");

    assert_eq!(map.image_paths(), vec![
        dir.path().join("images/terrain.png"),
        dir.path().join("images/inline.png"),
        dir.path().join("images/sky.png"),
    ]);
    Ok(())
}

#[test]
fn load_tmj_with_external_tileset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let path = write(dir.path(), "maps/level2.tmj", LEVEL2_TMJ);

    let map = Map::from_file(&path)?;
    assert_eq!(map.orientation, Orientation::Orthogonal);

    let floor = map.find_layer("floor").unwrap().as_tile_layer().unwrap();
    let ids: Vec<_> = floor.tiles_in_renderorder(map.renderorder)
        .map(|(_, gid)| gid.map(|g| map.resolve_gid(g.as_raw()).local_id))
        .collect();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3)]);

    let spawns = map.find_layer("spawns").unwrap().as_object_layer().unwrap();
    assert_eq!(spawns.objects[0].name, "player");
    assert_eq!(spawns.objects[0].kind, ObjectKind::Point);
    Ok(())
}

#[test]
fn shared_tileset_is_parsed_once() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let level1 = write(dir.path(), "maps/level1.tmx", &level1_tmx());
    let level2 = write(dir.path(), "maps/level2.tmj", LEVEL2_TMJ);

    let cache = Arc::new(TilesetCache::new());
    let loader = Loader::new(cache.clone());

    let first = loader.load_file(&level1)?;
    let second = loader.load_file(&level2)?;

    assert_eq!(cache.parse_count(), 1);
    assert_eq!(cache.len(), 1);
    assert!(cache.contains(&dir.path().join("tiles/terrain.tsx")));
    assert_eq!(first.tilesets[0].tile_size, second.tilesets[0].tile_size);
    assert_eq!(first.tilesets[0].image, second.tilesets[0].image);
    Ok(())
}

#[test]
fn concurrent_loads_share_the_cache() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let path = write(dir.path(), "maps/level1.tmx", &level1_tmx());

    let cache = Arc::new(TilesetCache::new());
    let loader = Loader::new(cache.clone());

    let handles: Vec<_> = (0..4).map(|_| {
        let loader = loader.clone();
        let path = path.clone();
        std::thread::spawn(move || loader.load_file(&path).map(|map| map.tilesets.len()))
    }).collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap()?, 2);
    }
    assert_eq!(cache.parse_count(), 1);
    Ok(())
}

#[test]
fn missing_tileset_is_a_reference_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "level.tmx", r#"<map version="1.10" width="1" height="1" tilewidth="8" tileheight="8">
        <tileset firstgid="1" source="missing.tsx"/>
    </map>"#);

    let error = Map::from_file(&path).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Reference);
    match error {
        Error::Reference{ path, source } => {
            assert!(path.ends_with("missing.tsx"));
            assert_eq!(source.kind(), ErrorKind::Io);
        },
        other => panic!("expected a reference error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn layer_size_mismatch_fails_the_load() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "level.tmx", &format!(
        r#"<map version="1.10" width="2" height="2" tilewidth="8" tileheight="8">
            <layer name="walls" width="2" height="2"><data encoding="base64" compression="zlib">{}</data></layer>
        </map>"#,
        zlib_base64(&[1, 2, 3])
    ));

    let error = Map::from_file(&path).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DataIntegrity);
    assert!(error.to_string().contains("walls"));
    Ok(())
}

#[test]
fn malformed_csv_token_shortens_the_layer() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "level.tmx", r#"<map version="1.10" width="2" height="2" tilewidth="8" tileheight="8">
        <layer name="floor" width="2" height="2"><data encoding="csv">1,x,3,4</data></layer>
    </map>"#);

    match Map::from_file(&path) {
        Err(Error::LayerSize{ layer, expected, actual }) => {
            assert_eq!(layer, "floor");
            assert_eq!((expected, actual), (4, 3));
        },
        other => panic!("expected a layer size error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn deep_json_group_nesting_reports_the_depth_limit() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let layers = (0..80).fold(String::from("[]"), |inner, i| {
        format!(r#"[{{"type": "group", "name": "g{}", "layers": {}}}]"#, i, inner)
    });
    let path = write(dir.path(), "deep.tmj", &format!(
        r#"{{"version": "1.10", "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8, "layers": {}}}"#, layers
    ));

    let options = LoaderOptions::default().with_max_group_depth(10);
    let loader = Loader::with_options(Arc::new(TilesetCache::new()), options);
    assert!(matches!(loader.load_file(&path), Err(Error::DepthExceeded{ limit: 10 })));

    let options = LoaderOptions::default().with_max_group_depth(79);
    let map = Loader::with_options(Arc::new(TilesetCache::new()), options).load_file(&path)?;
    assert_eq!(map.layers().len(), 80);
    Ok(())
}

#[test]
fn group_depth_is_limited() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let nested = (0..5).fold(String::new(), |inner, i| format!(r#"<group name="g{}">{}</group>"#, i, inner));
    let path = write(dir.path(), "deep.tmx", &format!(
        r#"<map version="1.10" width="1" height="1" tilewidth="8" tileheight="8">{}</map>"#, nested
    ));

    let options = LoaderOptions::default().with_max_group_depth(3);
    let loader = Loader::with_options(Arc::new(TilesetCache::new()), options);
    assert!(matches!(loader.load_file(&path), Err(Error::DepthExceeded{ limit: 3 })));

    let map = Loader::new(Arc::new(TilesetCache::new())).load_file(&path)?;
    assert_eq!(map.layers().len(), 5);
    Ok(())
}

#[test]
fn unknown_orientation_falls_back_to_orthogonal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "odd.tmj", r#"{
        "version": "1.10", "orientation": "triangular", "renderorder": "spiral",
        "width": 1, "height": 1, "tilewidth": 8, "tileheight": 8
    }"#);

    let map = Map::from_file(&path)?;
    assert_eq!(map.orientation, Orientation::Orthogonal);
    assert_eq!(map.renderorder, Renderorder::RightDown);
    Ok(())
}

#[test]
fn image_paths_include_nested_parallax_layers() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let path = write(dir.path(), "maps/parallax.tmx", r#"<map version="1.10" width="1" height="1" tilewidth="16" tileheight="16">
        <tileset firstgid="1" source="../tiles/terrain.tsx"/>
        <group name="far">
            <group name="farther">
                <imagelayer name="mountains" parallaxx="0.25" parallaxy="0.25" repeatx="1">
                    <image source="./../images/../images/mountains.png"/>
                </imagelayer>
            </group>
        </group>
        <imagelayer name="again" parallaxx="0.25"><image source="../images/mountains.png"/></imagelayer>
        <imagelayer name="empty"/>
    </map>"#);

    let map = Map::from_file(&path)?;
    assert_eq!(map.image_paths(), vec![
        dir.path().join("images/terrain.png"),
        dir.path().join("images/mountains.png"),
    ]);
    Ok(())
}

#[test]
fn infinite_map_with_compressed_chunks() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "endless.tmx", &format!(
        r#"<map version="1.10" width="10" height="10" tilewidth="8" tileheight="8" infinite="1">
            <layer name="ground" width="4" height="2">
                <data encoding="base64" compression="zlib">
                    <chunk x="-2" y="-1" width="2" height="2">{}</chunk>
                    <chunk x="0" y="-1" width="2" height="2">{}</chunk>
                </data>
            </layer>
        </map>"#,
        zlib_base64(&[1, 0, 0, 2]),
        zlib_base64(&[3, 0, 0, 4]),
    ));

    let map = Map::from_file(&path)?;
    assert!(map.infinite);
    let ground = map.find_layer("ground").unwrap().as_tile_layer().unwrap();
    assert_eq!(ground.start, math::ivec2::new(-2, -1));
    assert_eq!(ground.cell_count(), 8);
    assert_eq!(ground.tile(math::ivec2::new(-1, 0)), GID::new(2));
    assert_eq!(ground.tile(math::ivec2::new(0, -1)), GID::new(3));
    assert_eq!(ground.tile(math::ivec2::new(5, 5)), None);

    let census = MapCensus::of(&map);
    assert_eq!(census.non_empty_cells, 4);
    assert_eq!(census.unowned_gids, vec![1, 2, 3, 4]);
    Ok(())
}

#[test]
fn unknown_gids_are_rejected_when_validating() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "tiles/terrain.tsx", TERRAIN_TSX);
    let path = write(dir.path(), "maps/bad.tmj", r#"{
        "version": "1.10", "width": 2, "height": 1, "tilewidth": 16, "tileheight": 16,
        "tilesets": [{"firstgid": 1, "source": "../tiles/terrain.tsx"}],
        "layers": [{"type": "tilelayer", "name": "floor", "width": 2, "height": 1, "data": [1, 42]}]
    }"#);

    // accepted by default
    let map = Map::from_file(&path)?;
    assert!(!map.resolve_gid(42).is_valid());

    let options = LoaderOptions::default().with_validate_tile_gids(true);
    let loader = Loader::with_options(Arc::new(TilesetCache::new()), options);
    match loader.load_file(&path) {
        Err(Error::UnknownGid{ layer, gid }) => {
            assert_eq!(layer, "floor");
            assert_eq!(gid, 42);
        },
        other => panic!("expected an unknown gid error, got {:?}", other),
    }
    Ok(())
}

#[test]
fn unknown_extension_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "level.txt", "not a map");
    assert!(matches!(Map::from_file(&path), Err(Error::UnknownFormat(_))));
    Ok(())
}

#[test]
fn load_from_string_with_custom_provider() -> Result<()> {
    struct Fixed;

    impl Provider for Fixed {
        fn read(&self, path: &Path) -> Result<Vec<u8>> {
            match path.file_name().and_then(|n| n.to_str()) {
                Some("terrain.tsx") => Ok(TERRAIN_TSX.as_bytes().to_vec()),
                _ => Err(std::io::Error::from(std::io::ErrorKind::NotFound).into()),
            }
        }
    }

    let loader = Loader::new(Arc::new(TilesetCache::with_provider(Fixed)));
    let map = loader.load_tmj_str(LEVEL2_TMJ, Path::new("virtual/maps"))?;
    assert_eq!(map.tilesets[0].image.as_ref().unwrap().source, Path::new("virtual/images/terrain.png"));
    assert!(loader.cache().contains(Path::new("virtual/tiles/terrain.tsx")));
    Ok(())
}
