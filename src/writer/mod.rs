use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::codec::{encode_geometry, format_position};
use crate::error::{GmlError, Result};
use crate::model::{Envelope, FeatureRecord, MetadataBlock, GEOMETRY_FIELD};

pub const GML_NS: &str = "http://www.opengis.net/gml";
pub const EING_NS: &str = "eing.foldhivatal.hu";
pub const EING_PREFIX: &str = "eing";
pub const SRS_NAME: &str = "urn:x-ogc:def:crs:EPSG:23700";
pub const SRS_DIMENSION: &str = "2";
pub const EPSG_CODE: u32 = 23700;

/// Streaming writer for EING GML documents.
///
/// The caller drives the document structure:
/// `begin_collection`, `metadata`, optional `envelope`, `begin_feature_members`,
/// any number of `feature` calls, then `finish`.
pub struct GmlWriter<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> GmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
        }
    }

    /// Writer without indentation, used for standalone fragments.
    pub fn fragment(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for attr in attrs {
            start.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(start))?;
        Ok(())
    }

    pub fn end(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Element holding only text; `None` writes an empty element.
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: Option<&str>,
    ) -> Result<()> {
        match text {
            Some(text) => {
                self.start(name, attrs)?;
                self.writer
                    .write_event(Event::Text(BytesText::new(text)))?;
                self.end(name)
            }
            None => {
                let mut empty = BytesStart::new(name);
                for attr in attrs {
                    empty.push_attribute(*attr);
                }
                self.writer.write_event(Event::Empty(empty))?;
                Ok(())
            }
        }
    }

    /// XML declaration and the `gml:FeatureCollection` root with its namespaces.
    pub fn begin_collection(&mut self) -> Result<()> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.start(
            "gml:FeatureCollection",
            &[("xmlns:eing", EING_NS), ("xmlns:gml", GML_NS)],
        )
    }

    /// `gml:metaDataProperty/gml:GenericMetaData/MetaDataList` with one child per entry.
    pub fn metadata(&mut self, metadata: &MetadataBlock) -> Result<()> {
        self.start("gml:metaDataProperty", &[])?;
        self.start("gml:GenericMetaData", &[])?;
        self.start("MetaDataList", &[])?;
        for (key, value) in &metadata.entries {
            self.text_element(key, &[], value.as_deref())?;
        }
        self.end("MetaDataList")?;
        self.end("gml:GenericMetaData")?;
        self.end("gml:metaDataProperty")
    }

    /// `gml:boundedBy` with a 2D envelope in the fixed reference system.
    pub fn envelope(&mut self, envelope: &Envelope) -> Result<()> {
        self.start("gml:boundedBy", &[])?;
        self.start(
            "gml:Envelope",
            &[("srsDimension", SRS_DIMENSION), ("srsName", SRS_NAME)],
        )?;
        self.text_element(
            "gml:lowerCorner",
            &[],
            Some(&format_position(envelope.lower_corner())),
        )?;
        self.text_element(
            "gml:upperCorner",
            &[],
            Some(&format_position(envelope.upper_corner())),
        )?;
        self.end("gml:Envelope")?;
        self.end("gml:boundedBy")
    }

    pub fn begin_feature_members(&mut self) -> Result<()> {
        self.start("gml:featureMembers", &[])
    }

    /// One `eing:<layer>` element: envelope, attribute fields, geometry.
    ///
    /// Null attributes are written as empty elements.
    pub fn feature(&mut self, record: &FeatureRecord, gml_id: &str) -> Result<()> {
        let geometry = record
            .geometry
            .as_ref()
            .ok_or_else(|| GmlError::MissingGeometry {
                layer: record.layer.clone(),
            })?;
        let envelope = geometry.envelope().ok_or_else(|| {
            GmlError::document(format!("empty geometry in layer {}", record.layer))
        })?;

        let element = format!("{}:{}", EING_PREFIX, record.layer);
        let fid = format!("fid-{}", gml_id);
        self.start(&element, &[("gml:id", fid.as_str())])?;

        self.envelope(&envelope)?;

        for (name, value) in &record.attributes {
            let text = value.as_ref().map(|v| v.to_string());
            self.text_element(&format!("{}:{}", EING_PREFIX, name), &[], text.as_deref())?;
        }

        let geometry_element = format!("{}:{}", EING_PREFIX, GEOMETRY_FIELD);
        self.start(&geometry_element, &[])?;
        encode_geometry(self, geometry)?;
        self.end(&geometry_element)?;

        self.end(&element)
    }

    /// Closes `gml:featureMembers` and the root element.
    pub fn finish(mut self) -> Result<W> {
        self.end("gml:featureMembers")?;
        self.end("gml:FeatureCollection")?;
        Ok(self.writer.into_inner())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AttributeValue, GeometryValue};

    fn write_document(records: &[FeatureRecord]) -> String {
        let mut metadata = MetadataBlock::default();
        metadata.insert("gmlID", Some("VR-1".to_string()));
        metadata.insert("gmlExportDate", None);

        let mut writer = GmlWriter::new(Vec::new());
        writer.begin_collection().unwrap();
        writer.metadata(&metadata).unwrap();
        writer.begin_feature_members().unwrap();
        for (i, record) in records.iter().enumerate() {
            writer.feature(record, &(i + 1).to_string()).unwrap();
        }
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    fn point_record() -> FeatureRecord {
        FeatureRecord {
            layer: "RESZLETPONTOK".to_string(),
            attributes: vec![
                ("GEOBJ_ID".to_string(), Some(AttributeValue::Integer(77))),
                ("MAGASSAG".to_string(), Some(AttributeValue::Real(101.5))),
                ("PONT_KOD".to_string(), None),
                ("PONTSZAM".to_string(), Some(AttributeValue::Text("12 & 3".into()))),
            ],
            geometry: Some(GeometryValue::Point((650000.0, 240000.125))),
        }
    }

    #[test]
    fn test_document_skeleton() {
        let xml = write_document(&[point_record()]);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(
            r#"<gml:FeatureCollection xmlns:eing="eing.foldhivatal.hu" xmlns:gml="http://www.opengis.net/gml">"#
        ));
        assert!(xml.contains("<gmlID>VR-1</gmlID>"));
        assert!(xml.contains("<gmlExportDate/>"));
        assert!(xml.trim_end().ends_with("</gml:FeatureCollection>"));
    }

    #[test]
    fn test_feature_content() {
        let xml = write_document(&[point_record()]);

        assert!(xml.contains(r#"<eing:RESZLETPONTOK gml:id="fid-1">"#));
        assert!(xml.contains("<eing:MAGASSAG>101.5</eing:MAGASSAG>"));
        assert!(xml.contains("<eing:PONT_KOD/>"));
        assert!(xml.contains("<eing:PONTSZAM>12 &amp; 3</eing:PONTSZAM>"));
        assert!(xml.contains("<gml:lowerCorner>650000 240000.125</gml:lowerCorner>"));
        assert!(xml.contains("<gml:pos>650000 240000.125</gml:pos>"));

        // envelope, then fields, then geometry
        let envelope = xml.find("<gml:boundedBy>").unwrap();
        let field = xml.find("<eing:GEOBJ_ID>").unwrap();
        let geometry = xml.find("<eing:geometry>").unwrap();
        assert!(envelope < field && field < geometry);
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let mut writer = GmlWriter::new(BrokenPipe);
        assert!(matches!(
            writer.begin_collection(),
            Err(GmlError::Io(e)) if e.kind() == std::io::ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn test_feature_without_geometry_fails() {
        let mut record = point_record();
        record.geometry = None;

        let mut writer = GmlWriter::new(Vec::new());
        writer.begin_collection().unwrap();
        assert!(matches!(
            writer.feature(&record, "1"),
            Err(GmlError::MissingGeometry { layer }) if layer == "RESZLETPONTOK"
        ));
    }
}
