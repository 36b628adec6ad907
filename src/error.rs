use std::path::PathBuf;
use thiserror::Error;

/// Every failure is operation-fatal: a conversion either completes or is abandoned.
#[derive(Debug, Error)]
pub enum GmlError {
    #[error("unsupported geometry type: {0}")]
    UnsupportedGeometryType(String),

    #[error("unsupported field type: {0}")]
    UnsupportedFieldType(String),

    #[error("schema version mismatch: supported {supported}, document declares {}", .found.as_deref().unwrap_or("nothing"))]
    SchemaVersionMismatch {
        supported: String,
        found: Option<String>,
    },

    #[error("source file does not exist: {}", .0.display())]
    MissingSourceFile(PathBuf),

    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("schema resource not found: {}", .0.display())]
    SchemaNotFound(PathBuf),

    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    #[error("malformed GML document: {0}")]
    MalformedDocument(String),

    #[error("invalid value {value:?} for field {layer}.{field}")]
    InvalidAttributeValue {
        layer: String,
        field: String,
        value: String,
    },

    #[error("feature without geometry in layer {layer}")]
    MissingGeometry { layer: String },

    #[error(transparent)]
    Container(#[from] gdal::errors::GdalError),

    #[error(transparent)]
    XmlTree(#[from] roxmltree::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GmlError>;

impl GmlError {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::MalformedSchema(message.into())
    }

    pub(crate) fn document(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }
}
