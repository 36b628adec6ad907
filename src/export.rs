//! GeoPackage to GML conversion.

use std::fs;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::container::{self, ContainerReader};
use crate::error::{GmlError, Result};
use crate::events::{ConversionEvent, EventSink, Operation};
use crate::model::GEOBJ_ID_FIELD;
use crate::writer::GmlWriter;

/// What an export wrote, layer by layer in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub layers: Vec<(String, u64)>,
    pub feature_count: u64,
}

/// Writes the GeoPackage at `gpkg_path` as an EING GML document at `gml_path`.
///
/// Layers are written in descending `RETEG_ID` order and empty layers are
/// skipped. The document is assembled in memory and written in one go, so a
/// failed export does not touch `gml_path`.
pub fn export_to_gml(
    gpkg_path: &Path,
    gml_path: &Path,
    config: &ConversionConfig,
    sink: &dyn EventSink,
) -> Result<ExportSummary> {
    match run_export(gpkg_path, gml_path, config, sink) {
        Ok(summary) => {
            sink.emit(&ConversionEvent::Completed {
                operation: Operation::Export,
                source: gpkg_path,
                destination: gml_path,
            });
            Ok(summary)
        }
        Err(error) => {
            sink.emit(&ConversionEvent::Failed {
                operation: Operation::Export,
                path: gml_path,
                error: &error,
            });
            Err(error)
        }
    }
}

fn run_export(
    gpkg_path: &Path,
    gml_path: &Path,
    config: &ConversionConfig,
    sink: &dyn EventSink,
) -> Result<ExportSummary> {
    if !gpkg_path.is_file() {
        return Err(GmlError::MissingSourceFile(gpkg_path.to_path_buf()));
    }
    if !config.overwrite_markup && gml_path.exists() {
        return Err(GmlError::DestinationExists(gml_path.to_path_buf()));
    }

    let dataset = container::open(gpkg_path)?;
    let reader = ContainerReader::new(&dataset);

    let mut out = GmlWriter::new(Vec::new());
    out.begin_collection()?;

    let metadata = reader.metadata();
    for (key, value) in &metadata.entries {
        sink.emit(&ConversionEvent::MetadataRead {
            key,
            value: value.as_deref(),
        });
    }
    out.metadata(&metadata)?;

    if let Some(envelope) = reader.dataset_envelope()? {
        out.envelope(&envelope)?;
    }
    out.begin_feature_members()?;

    let order = reader.sorted_layer_order()?;
    let names = order
        .iter()
        .map(|index| reader.layer_name(*index))
        .collect::<Result<Vec<_>>>()?;
    sink.emit(&ConversionEvent::LayerOrderComputed { layers: &names });

    let mut summary = ExportSummary::default();
    let mut new_fid: u64 = 1;
    for (index, name) in order.into_iter().zip(names) {
        let written = reader.try_for_each_feature(index, |record| {
            let gml_id = record
                .attribute(GEOBJ_ID_FIELD)
                .map(|id| id.to_string())
                .unwrap_or_else(|| new_fid.to_string());
            out.feature(&record, &gml_id)?;
            sink.emit(&ConversionEvent::FeatureWritten {
                layer: &name,
                gml_id: Some(&gml_id),
            });
            new_fid += 1;
            Ok(())
        })?;

        sink.emit(&ConversionEvent::LayerWritten {
            layer: &name,
            feature_count: written,
        });
        summary.feature_count += written;
        summary.layers.push((name, written));
    }

    let document = out.finish()?;
    fs::write(gml_path, document)?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::gpkg_available;
    use crate::container::{create, write_metadata, ContainerWriter};
    use crate::events::testing::RecordingSink;
    use crate::model::{GeometryValue, MetadataBlock};
    use crate::schema::SchemaModel;
    use crate::writer::GML_NS;
    use tempfile::TempDir;

    fn attrs(pairs: &[(&str, &str)]) -> Vec<(String, Option<String>)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect()
    }

    /// One polygon layer with two features (one with a hole) and one point layer.
    fn build_scenario(path: &Path) {
        let schema = SchemaModel::bundled().unwrap();
        let writer = ContainerWriter::new(&schema).unwrap();
        let mut dataset = create(path).unwrap();

        let mut metadata = MetadataBlock::default();
        metadata.insert("gmlID", Some("VR-2024-17".to_string()));
        metadata.insert("xsdVersion", Some(schema.supported_version.clone()));
        write_metadata(&mut dataset, &metadata).unwrap();

        let mut parcels = writer.create_layer(&mut dataset, "FOLDRESZLETEK").unwrap();
        parcels
            .write_feature(
                &attrs(&[("GEOBJ_ID", "500"), ("RETEG_ID", "5"), ("HRSZ", "12/3")]),
                &GeometryValue::Polygon(vec![
                    vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)],
                    vec![(2.0, 1.0), (6.0, 1.0), (6.0, 4.0), (2.0, 1.0)],
                ]),
            )
            .unwrap();
        parcels
            .write_feature(
                &attrs(&[("RETEG_ID", "5"), ("HRSZ", "14"), ("TERULET", "1250.5")]),
                &GeometryValue::Polygon(vec![vec![
                    (20.0, 0.0),
                    (30.0, 0.0),
                    (30.0, 5.0),
                    (20.0, 0.0),
                ]]),
            )
            .unwrap();
        drop(parcels);

        let mut points = writer.create_layer(&mut dataset, "RESZLETPONTOK").unwrap();
        points
            .write_feature(
                &attrs(&[("RETEG_ID", "9"), ("PONTSZAM", "101")]),
                &GeometryValue::Point((472300.25, 120.0)),
            )
            .unwrap();
    }

    #[test]
    fn test_export_scenario() {
        if !gpkg_available() {
            eprintln!("Skipping test: GPKG driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let gpkg_path = temp_dir.path().join("scenario.gpkg");
        let gml_path = temp_dir.path().join("scenario.gml");
        build_scenario(&gpkg_path);

        let sink = RecordingSink::default();
        let summary =
            export_to_gml(&gpkg_path, &gml_path, &ConversionConfig::default(), &sink).unwrap();
        assert_eq!(summary.feature_count, 3);
        assert_eq!(
            summary.layers,
            vec![
                ("RESZLETPONTOK".to_string(), 1),
                ("FOLDRESZLETEK".to_string(), 2)
            ]
        );

        let text = fs::read_to_string(&gml_path).unwrap();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));

        let document = roxmltree::Document::parse(&text).unwrap();
        let root = document.root_element();
        let members = root
            .children()
            .find(|n| n.has_tag_name((GML_NS, "featureMembers")))
            .unwrap();
        let features: Vec<_> = members.children().filter(|n| n.is_element()).collect();
        assert_eq!(features.len(), 3);

        let layers: Vec<&str> = features.iter().map(|n| n.tag_name().name()).collect();
        assert_eq!(layers, vec!["RESZLETPONTOK", "FOLDRESZLETEK", "FOLDRESZLETEK"]);

        let ids: Vec<&str> = features
            .iter()
            .map(|n| n.attribute((GML_NS, "id")).unwrap())
            .collect();
        assert_eq!(ids, vec!["fid-1", "fid-500", "fid-3"]);

        let holed = features[1];
        let polygon = holed
            .descendants()
            .find(|n| n.has_tag_name((GML_NS, "Polygon")))
            .unwrap();
        let count = |name: &str| {
            polygon
                .children()
                .filter(|n| n.has_tag_name((GML_NS, name)))
                .count()
        };
        assert_eq!(count("exterior"), 1);
        assert_eq!(count("interior"), 1);

        let pos = features[0]
            .descendants()
            .find(|n| n.has_tag_name((GML_NS, "pos")))
            .unwrap();
        assert_eq!(pos.text(), Some("472300.25 120"));

        let bounds = root
            .children()
            .find(|n| n.has_tag_name((GML_NS, "boundedBy")))
            .unwrap();
        let lower = bounds
            .descendants()
            .find(|n| n.has_tag_name((GML_NS, "lowerCorner")))
            .unwrap();
        assert_eq!(lower.text(), Some("0 0"));

        let events = sink.events.borrow();
        assert!(events.contains(&"order RESZLETPONTOK,FOLDRESZLETEK".to_string()));
        assert!(events.contains(&"feature RESZLETPONTOK 1".to_string()));
        assert!(events.contains(&"feature FOLDRESZLETEK 500".to_string()));
        assert!(events.contains(&"layer FOLDRESZLETEK 2".to_string()));
        assert_eq!(events.last().unwrap(), "completed GML export");
    }

    #[test]
    fn test_export_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let gml_path = temp_dir.path().join("out.gml");
        let sink = RecordingSink::default();

        let result = export_to_gml(
            &temp_dir.path().join("missing.gpkg"),
            &gml_path,
            &ConversionConfig::default(),
            &sink,
        );
        assert!(matches!(result, Err(GmlError::MissingSourceFile(_))));
        assert!(!gml_path.exists());
        assert_eq!(*sink.events.borrow(), vec!["failed GML export".to_string()]);
    }

    #[test]
    fn test_export_respects_overwrite_flag() {
        if !gpkg_available() {
            eprintln!("Skipping test: GPKG driver not available");
            return;
        }
        let temp_dir = TempDir::new().unwrap();
        let gpkg_path = temp_dir.path().join("scenario.gpkg");
        let gml_path = temp_dir.path().join("existing.gml");
        build_scenario(&gpkg_path);
        fs::write(&gml_path, "keep me").unwrap();

        let config = ConversionConfig {
            overwrite_markup: false,
            ..ConversionConfig::default()
        };
        let result = export_to_gml(&gpkg_path, &gml_path, &config, &crate::events::NullSink);
        assert!(matches!(result, Err(GmlError::DestinationExists(_))));
        assert_eq!(fs::read_to_string(&gml_path).unwrap(), "keep me");
    }
}
