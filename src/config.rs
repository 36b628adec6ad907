use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::schema::SchemaModel;

/// Where the structural schema is loaded from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SchemaSource {
    #[default]
    Bundled,
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub schema: SchemaSource,
    /// Replace an existing GML file on export.
    pub overwrite_markup: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            schema: SchemaSource::Bundled,
            overwrite_markup: true,
        }
    }
}

impl ConversionConfig {
    pub fn with_schema_path(path: impl Into<PathBuf>) -> Self {
        Self {
            schema: SchemaSource::Path(path.into()),
            ..Self::default()
        }
    }

    pub fn load_schema(&self) -> Result<SchemaModel> {
        match &self.schema {
            SchemaSource::Bundled => SchemaModel::bundled(),
            SchemaSource::Path(path) => SchemaModel::from_path(path),
        }
    }
}

/// Default GeoPackage path for an imported GML file: `.gml` is replaced by `.gpkg`.
pub fn default_geopackage_path(gml_path: &Path) -> PathBuf {
    gml_path.with_extension("gpkg")
}
