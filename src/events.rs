//! Progress and failure events emitted at component boundaries.
//!
//! The conversion functions only talk to an [`EventSink`]; [`TracingSink`]
//! forwards everything to `tracing`.

use std::path::Path;

use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Export,
    Import,
}

impl Operation {
    pub fn label(self) -> &'static str {
        match self {
            Operation::Export => "GML export",
            Operation::Import => "GML import",
        }
    }
}

#[derive(Debug)]
pub enum ConversionEvent<'a> {
    SchemaBuilt {
        version: &'a str,
        layer_count: usize,
    },
    MetadataRead {
        key: &'a str,
        value: Option<&'a str>,
    },
    LayerOrderComputed {
        layers: &'a [String],
    },
    FeatureWritten {
        layer: &'a str,
        gml_id: Option<&'a str>,
    },
    LayerWritten {
        layer: &'a str,
        feature_count: u64,
    },
    Completed {
        operation: Operation,
        source: &'a Path,
        destination: &'a Path,
    },
    /// `path` is the file the failed operation was producing.
    Failed {
        operation: Operation,
        path: &'a Path,
        error: &'a crate::GmlError,
    },
}

pub trait EventSink {
    fn emit(&self, event: &ConversionEvent<'_>);
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &ConversionEvent<'_>) {
        match event {
            ConversionEvent::SchemaBuilt {
                version,
                layer_count,
            } => info!("Schema built: version {}, {} layers", version, layer_count),
            ConversionEvent::MetadataRead { key, value } => {
                info!("Metadata {}: {}", key, value.unwrap_or(""))
            }
            ConversionEvent::LayerOrderComputed { layers } => {
                info!("Layer order: {}", layers.join(", "))
            }
            ConversionEvent::FeatureWritten { layer, gml_id } => {
                debug!("Feature {} written to {}", gml_id.unwrap_or("-"), layer)
            }
            ConversionEvent::LayerWritten {
                layer,
                feature_count,
            } => info!("Layer {} written with {} features", layer, feature_count),
            ConversionEvent::Completed {
                operation,
                source,
                destination,
            } => info!(
                "{} succeeded: {} -> {}",
                operation.label(),
                source.display(),
                destination.display()
            ),
            ConversionEvent::Failed {
                operation,
                path,
                error,
            } => error!(
                "{} failed for {}: {}",
                operation.label(),
                path.display(),
                error
            ),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: &ConversionEvent<'_>) {}
}
