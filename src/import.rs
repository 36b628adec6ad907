//! GML to GeoPackage conversion.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::config::ConversionConfig;
use crate::container::{self, ContainerWriter};
use crate::error::{GmlError, Result};
use crate::events::{ConversionEvent, EventSink, Operation};
use crate::model::{GML_ID_KEY, XSD_VERSION_KEY};
use crate::parser::parse_gml_document;

/// What an import created, in schema order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub layers: Vec<(String, u64)>,
    pub feature_count: u64,
    /// Layers present in the document but unknown to the schema.
    pub skipped_layers: Vec<String>,
}

/// Deletes the destination file when dropped unless disarmed.
///
/// Declared before the dataset so the dataset is closed first on every exit path.
struct PartialOutput<'a> {
    path: &'a Path,
    armed: bool,
}

impl<'a> PartialOutput<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutput<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(self.path) {
            Ok(()) => debug!("Removed partial output {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Could not remove partial output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Builds a new GeoPackage at `gpkg_path` from the GML document at `gml_path`.
///
/// Every schema layer is created, in schema order, whether or not the document
/// has features for it. `gpkg_path` must not exist yet; on failure nothing is
/// left behind at that path.
pub fn import_to_geopackage(
    gml_path: &Path,
    gpkg_path: &Path,
    config: &ConversionConfig,
    sink: &dyn EventSink,
) -> Result<ImportSummary> {
    match run_import(gml_path, gpkg_path, config, sink) {
        Ok(summary) => {
            sink.emit(&ConversionEvent::Completed {
                operation: Operation::Import,
                source: gml_path,
                destination: gpkg_path,
            });
            Ok(summary)
        }
        Err(error) => {
            sink.emit(&ConversionEvent::Failed {
                operation: Operation::Import,
                path: gpkg_path,
                error: &error,
            });
            Err(error)
        }
    }
}

fn run_import(
    gml_path: &Path,
    gpkg_path: &Path,
    config: &ConversionConfig,
    sink: &dyn EventSink,
) -> Result<ImportSummary> {
    if !gml_path.is_file() {
        return Err(GmlError::MissingSourceFile(gml_path.to_path_buf()));
    }
    if gpkg_path.exists() {
        return Err(GmlError::DestinationExists(gpkg_path.to_path_buf()));
    }

    let text = fs::read_to_string(gml_path)?;
    let document = parse_gml_document(&text)?;
    debug!(
        "Document {} holds {} features",
        document.metadata.get(GML_ID_KEY).unwrap_or("without gmlID"),
        document.feature_count()
    );

    let schema = config.load_schema()?;
    sink.emit(&ConversionEvent::SchemaBuilt {
        version: &schema.supported_version,
        layer_count: schema.layer_definitions.len(),
    });

    let guard = PartialOutput::new(gpkg_path);
    let mut dataset = container::create(gpkg_path)?;

    for (key, value) in &document.metadata.entries {
        sink.emit(&ConversionEvent::MetadataRead {
            key,
            value: value.as_deref(),
        });
    }
    let found = document.metadata.get(XSD_VERSION_KEY).map(str::trim);
    if found != Some(schema.supported_version.as_str()) {
        return Err(GmlError::SchemaVersionMismatch {
            supported: schema.supported_version.clone(),
            found: found.map(str::to_string),
        });
    }
    container::write_metadata(&mut dataset, &document.metadata)?;

    let mut summary = ImportSummary::default();
    for name in document.layers.keys() {
        if schema.layer(name).is_none() {
            warn!("Layer {} is not in the schema, its features are skipped", name);
            summary.skipped_layers.push(name.clone());
        }
    }

    let writer = ContainerWriter::new(&schema)?;
    for name in schema.layer_names() {
        let mut layer = writer.create_layer(&mut dataset, name)?;
        for feature in document.layers.get(name).into_iter().flatten() {
            let geometry = feature
                .geometry
                .as_ref()
                .ok_or_else(|| GmlError::MissingGeometry {
                    layer: name.to_string(),
                })?;
            layer.write_feature(&feature.attributes, geometry)?;
            sink.emit(&ConversionEvent::FeatureWritten {
                layer: name,
                gml_id: feature.gml_id.as_deref(),
            });
        }

        let written = layer.feature_count();
        sink.emit(&ConversionEvent::LayerWritten {
            layer: layer.name(),
            feature_count: written,
        });
        summary.feature_count += written;
        summary.layers.push((name.to_string(), written));
    }

    drop(dataset);
    guard.disarm();

    Ok(summary)
}
