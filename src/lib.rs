pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod export;
pub mod import;
pub mod model;
pub mod parser;
pub mod schema;
pub mod types;
pub mod writer;

pub use config::{default_geopackage_path, ConversionConfig, SchemaSource};
pub use error::{GmlError, Result};
pub use events::{ConversionEvent, EventSink, NullSink, Operation, TracingSink};
pub use export::{export_to_gml, ExportSummary};
pub use import::{import_to_geopackage, ImportSummary};
pub use model::{GeometryValue, LayerDescriptor};
pub use schema::SchemaModel;
pub use writer::GmlWriter;
