use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [Error].
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ErrorKind {
    /// The document is malformed or uses an unexpected structure.
    Format,
    /// Tile data could not be decoded or does not match the declared size.
    DataIntegrity,
    /// A referenced file (e.g. an external tileset) could not be loaded.
    Reference,
    /// Reading a file failed.
    Io,
}

#[derive(Error, Debug)]
pub enum Error {
    /// An error in the structure of the data, e.g. a required tag is missing.
    #[error(r#"Error in the map data at '{tag}': "{msg}""#)]
    StructureError{ tag: String, msg: String },

    /// An error that happened while parsing a value, e.g. a number attribute is not a number.
    #[error(transparent)]
    ParseError(Box<dyn std::error::Error + Send + Sync>),

    /// The tmx or tsx file is not valid xml.
    #[error("Invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    /// The tmj or tsj file is not valid json, or does not have the expected shape.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not belong to any supported format.
    #[error("Unknown file format for '{}'", .0.display())]
    UnknownFormat(PathBuf),

    /// Group layers are nested deeper than allowed by [LoaderOptions::max_group_depth](crate::LoaderOptions).
    #[error("Group layers are nested deeper than the limit of {limit}")]
    DepthExceeded{ limit: usize },

    /// Encoded tile data could not be decoded or decompressed.
    #[error("Failed to decode tile data: {0}")]
    Decode(String),

    /// The number of tiles in a layer (or chunk) does not match its size.
    #[error("Layer '{layer}' contains {actual} tiles, expected {expected}")]
    LayerSize{ layer: String, expected: usize, actual: usize },

    /// A tile references a GID that no tileset of the map contains.
    #[error("Tile {gid} in layer '{layer}' does not belong to any tileset")]
    UnknownGid{ layer: String, gid: u32 },

    /// An external tileset could not be loaded.
    #[error("Failed to load tileset '{}': {source}", path.display())]
    Reference{ path: PathBuf, source: Box<Error> },

    /// A general IO error, e.g. opening a file failed
    #[error(transparent)]
    IO(#[from] std::io::Error),

    /// Map uses features that are not (yet) supported
    #[error("Feature not supported: {0}")]
    UnsupportedFeature(String)
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            StructureError{..} | ParseError(_) | Xml(_) | Json(_) | UnknownFormat(_)
                | DepthExceeded{..} | UnsupportedFeature(_) => ErrorKind::Format,
            Decode(_) | LayerSize{..} | UnknownGid{..} => ErrorKind::DataIntegrity,
            Reference{..} => ErrorKind::Reference,
            IO(_) => ErrorKind::Io,
        }
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Error::ParseError(Box::new(e))
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(e: std::num::ParseFloatError) -> Self {
        Error::ParseError(Box::new(e))
    }
}

impl From<std::str::ParseBoolError> for Error {
    fn from(e: std::str::ParseBoolError) -> Self {
        Error::ParseError(Box::new(e))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::ParseError(Box::new(e))
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(e: std::convert::Infallible) -> Self {
        match e {}
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let size = Error::LayerSize{ layer: "ground".into(), expected: 4, actual: 3 };
        assert_eq!(size.kind(), ErrorKind::DataIntegrity);
        assert!(size.to_string().contains("ground"));

        let reference = Error::Reference{
            path: "missing.tsx".into(),
            source: Box::new(Error::IO(std::io::Error::from(std::io::ErrorKind::NotFound))),
        };
        assert_eq!(reference.kind(), ErrorKind::Reference);
        assert!(reference.to_string().contains("missing.tsx"));

        assert_eq!(Error::Decode("bad".into()).kind(), ErrorKind::DataIntegrity);
        assert_eq!(Error::DepthExceeded{ limit: 3 }.kind(), ErrorKind::Format);
    }
}
