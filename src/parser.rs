//! Reading EING GML documents into memory.
//!
//! The document is parsed as a tree; features are grouped by their element
//! name, which is the layer name.

use indexmap::IndexMap;
use roxmltree::{Document, Node};
use tracing::debug;

use crate::codec::decode_geometry;
use crate::error::{GmlError, Result};
use crate::model::{GeometryValue, MetadataBlock, GEOMETRY_FIELD};
use crate::writer::{EING_NS, GML_NS};

/// One feature as it appears in the markup: raw text attributes plus geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GmlFeature {
    pub gml_id: Option<String>,
    /// Child elements in document order; empty elements give `None`.
    pub attributes: Vec<(String, Option<String>)>,
    pub geometry: Option<GeometryValue>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GmlDocument {
    pub metadata: MetadataBlock,
    /// Features grouped by layer, layers in order of first appearance.
    pub layers: IndexMap<String, Vec<GmlFeature>>,
}

impl GmlDocument {
    pub fn feature_count(&self) -> usize {
        self.layers.values().map(Vec::len).sum()
    }
}

pub fn parse_gml_document(text: &str) -> Result<GmlDocument> {
    let document = Document::parse(text)?;
    let root = document.root_element();
    if !is_gml(root, "FeatureCollection") {
        return Err(GmlError::document(format!(
            "root element is {}, expected gml:FeatureCollection",
            root.tag_name().name()
        )));
    }

    let metadata = parse_metadata(root)?;

    let mut layers: IndexMap<String, Vec<GmlFeature>> = IndexMap::new();
    for members in root
        .children()
        .filter(|n| is_gml(*n, "featureMembers") || is_gml(*n, "featureMember"))
    {
        for node in members.children().filter(Node::is_element) {
            let feature = parse_feature(node)?;
            layers
                .entry(node.tag_name().name().to_string())
                .or_default()
                .push(feature);
        }
    }
    debug!(
        "Parsed {} layers with {} features",
        layers.len(),
        layers.values().map(Vec::len).sum::<usize>()
    );

    Ok(GmlDocument { metadata, layers })
}

/// Every child of `MetaDataList`, in document order.
fn parse_metadata(root: Node) -> Result<MetadataBlock> {
    let list = root
        .children()
        .find(|n| is_gml(*n, "metaDataProperty"))
        .and_then(|property| property.children().find(|n| is_gml(*n, "GenericMetaData")))
        .and_then(|generic| {
            generic
                .children()
                .find(|n| n.is_element() && n.tag_name().name() == "MetaDataList")
        })
        .ok_or_else(|| {
            GmlError::document("gml:metaDataProperty/gml:GenericMetaData/MetaDataList is missing")
        })?;

    let mut metadata = MetadataBlock::default();
    for entry in list.children().filter(Node::is_element) {
        metadata.insert(entry.tag_name().name(), element_text(entry));
    }
    Ok(metadata)
}

fn parse_feature(node: Node) -> Result<GmlFeature> {
    if node.tag_name().namespace() != Some(EING_NS) {
        return Err(GmlError::document(format!(
            "feature element {} is outside the eing namespace",
            node.tag_name().name()
        )));
    }

    let mut feature = GmlFeature {
        gml_id: node.attribute((GML_NS, "id")).map(str::to_string),
        attributes: Vec::new(),
        geometry: None,
    };

    // gml:boundedBy and any other gml:* property is derived data
    for child in node
        .children()
        .filter(|n| n.is_element() && n.tag_name().namespace() != Some(GML_NS))
    {
        let name = child.tag_name().name();
        if name == GEOMETRY_FIELD {
            let shape = child.children().find(Node::is_element).ok_or_else(|| {
                GmlError::document(format!(
                    "empty geometry property in {}",
                    node.tag_name().name()
                ))
            })?;
            feature.geometry = Some(decode_geometry(shape)?);
        } else {
            feature.attributes.push((name.to_string(), element_text(child)));
        }
    }

    Ok(feature)
}

fn is_gml(node: Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(GML_NS)
        && node.tag_name().name() == name
}

/// Whitespace-only text counts as no value; any other text is kept as written.
fn element_text(node: Node) -> Option<String> {
    node.text()
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gml:FeatureCollection xmlns:eing="eing.foldhivatal.hu" xmlns:gml="http://www.opengis.net/gml">
  <gml:metaDataProperty>
    <gml:GenericMetaData>
      <MetaDataList>
        <gmlID>VR-7</gmlID>
        <gmlExportDate/>
        <xsdVersion>2.1.0</xsdVersion>
        <kozigazgatasiEgyseg>Szeged</kozigazgatasiEgyseg>
      </MetaDataList>
    </gml:GenericMetaData>
  </gml:metaDataProperty>
  <gml:featureMembers>
    <eing:RESZLETPONTOK gml:id="fid-41">
      <gml:boundedBy>
        <gml:Envelope srsDimension="2" srsName="urn:x-ogc:def:crs:EPSG:23700">
          <gml:lowerCorner>1 2</gml:lowerCorner>
          <gml:upperCorner>1 2</gml:upperCorner>
        </gml:Envelope>
      </gml:boundedBy>
      <eing:GEOBJ_ID>41</eing:GEOBJ_ID>
      <eing:PONT_KOD></eing:PONT_KOD>
      <eing:PONTSZAM> 12/3 </eing:PONTSZAM>
      <eing:geometry>
        <gml:Point srsDimension="2" srsName="urn:x-ogc:def:crs:EPSG:23700">
          <gml:pos>1 2</gml:pos>
        </gml:Point>
      </eing:geometry>
    </eing:RESZLETPONTOK>
    <eing:HATARVONALAK gml:id="fid-2">
      <eing:VONAL_TIPUS>3</eing:VONAL_TIPUS>
      <eing:geometry>
        <gml:LineString srsDimension="2">
          <gml:posList>0 0 5 5</gml:posList>
        </gml:LineString>
      </eing:geometry>
    </eing:HATARVONALAK>
  </gml:featureMembers>
  <gml:featureMember>
    <eing:RESZLETPONTOK>
      <eing:PONTSZAM>13</eing:PONTSZAM>
    </eing:RESZLETPONTOK>
  </gml:featureMember>
</gml:FeatureCollection>
"#;

    #[test]
    fn test_parse_metadata_keeps_every_entry() {
        let document = parse_gml_document(DOCUMENT).unwrap();
        assert_eq!(document.metadata.get("gmlID"), Some("VR-7"));
        assert_eq!(document.metadata.get("gmlExportDate"), None);
        assert_eq!(document.metadata.get("xsdVersion"), Some("2.1.0"));
        assert_eq!(document.metadata.get("kozigazgatasiEgyseg"), Some("Szeged"));
        assert_eq!(document.metadata.entries.len(), 4);
    }

    #[test]
    fn test_parse_features_grouped_by_layer() {
        let document = parse_gml_document(DOCUMENT).unwrap();
        let names: Vec<&str> = document.layers.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["RESZLETPONTOK", "HATARVONALAK"]);
        assert_eq!(document.feature_count(), 3);

        let point = &document.layers["RESZLETPONTOK"][0];
        assert_eq!(point.gml_id.as_deref(), Some("fid-41"));
        assert_eq!(
            point.attributes,
            vec![
                ("GEOBJ_ID".to_string(), Some("41".to_string())),
                ("PONT_KOD".to_string(), None),
                ("PONTSZAM".to_string(), Some(" 12/3 ".to_string())),
            ]
        );
        assert_eq!(point.geometry, Some(GeometryValue::Point((1.0, 2.0))));

        let line = &document.layers["HATARVONALAK"][0];
        assert_eq!(
            line.geometry,
            Some(GeometryValue::LineString(vec![(0.0, 0.0), (5.0, 5.0)]))
        );

        let bare = &document.layers["RESZLETPONTOK"][1];
        assert_eq!(bare.gml_id, None);
        assert_eq!(bare.geometry, None);
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        let result = parse_gml_document(r#"<eing:X xmlns:eing="eing.foldhivatal.hu"/>"#);
        assert!(matches!(result, Err(GmlError::MalformedDocument(_))));
    }

    #[test]
    fn test_missing_metadata_is_rejected() {
        let result = parse_gml_document(
            r#"<gml:FeatureCollection xmlns:gml="http://www.opengis.net/gml"><gml:featureMembers/></gml:FeatureCollection>"#,
        );
        assert!(matches!(result, Err(GmlError::MalformedDocument(_))));
    }

    #[test]
    fn test_unparsable_markup() {
        assert!(matches!(
            parse_gml_document("<gml:FeatureCollection"),
            Err(GmlError::XmlTree(_))
        ));
    }

    #[test]
    fn test_unsupported_geometry_in_feature() {
        let text = DOCUMENT.replace(
            "<gml:LineString srsDimension=\"2\">\n          <gml:posList>0 0 5 5</gml:posList>\n        </gml:LineString>",
            "<gml:MultiCurve/>",
        );
        assert!(matches!(
            parse_gml_document(&text),
            Err(GmlError::UnsupportedGeometryType(name)) if name == "gml:MultiCurve"
        ));
    }
}
