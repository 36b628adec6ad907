//! Layer structure derived from the EING structural schema (`vazrajz.xsd`).
//!
//! Every top-level `<element>` in the `gml:_Feature` substitution group is a
//! layer. Its complex type lists the layer's fields in order; when the type
//! extends `eing:CommonAttributesType`, the common fields are placed first.
//! Each layer has exactly one field named `geometry` whose type selects the
//! layer's geometry shape.
//!
//! All type tokens are translated while the schema is built, so an unsupported
//! token fails here rather than in the middle of a conversion.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::{GmlError, Result};
use crate::model::{FieldDescriptor, FieldKind, LayerDescriptor, GEOMETRY_FIELD};
use crate::types::{attribute_type_for, geometry_shape_for};

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const COMMON_ATTRIBUTES_TYPE: &str = "CommonAttributesType";
const COMMON_ATTRIBUTES_BASE: &str = "eing:CommonAttributesType";
const FEATURE_SUBSTITUTION_GROUP: &str = "gml:_Feature";

/// The schema bundled with the library.
pub const BUNDLED_SCHEMA: &str = include_str!("../schema/vazrajz.xsd");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModel {
    pub supported_version: String,
    /// Layers in schema declaration order.
    pub layer_definitions: IndexMap<String, LayerDescriptor>,
}

impl SchemaModel {
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_SCHEMA)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(GmlError::SchemaNotFound(path.to_path_buf()));
        }
        debug!("Reading schema: {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let doc = Document::parse(text)?;
        let root = doc.root_element();
        if !is_xsd(root, "schema") {
            return Err(GmlError::schema("root element is not xs:schema"));
        }

        let supported_version = root
            .attribute("version")
            .ok_or_else(|| GmlError::schema("schema has no version attribute"))?
            .to_string();

        let complex_types: Vec<Node> = root
            .children()
            .filter(|n| is_xsd(*n, "complexType"))
            .collect();

        let common_type = find_complex_type(&complex_types, COMMON_ATTRIBUTES_TYPE)?;
        let common_fields = declared_fields(common_type)?;

        let mut layer_definitions = IndexMap::new();
        for element in root.children().filter(|n| is_xsd(*n, "element")) {
            if element.attribute("substitutionGroup") != Some(FEATURE_SUBSTITUTION_GROUP) {
                continue;
            }

            let layer_name = element
                .attribute("name")
                .ok_or_else(|| GmlError::schema("feature element without a name"))?;
            let type_ref = element.attribute("type").ok_or_else(|| {
                GmlError::schema(format!("feature element {} has no type", layer_name))
            })?;
            let type_name = type_ref.rsplit(':').next().unwrap_or(type_ref);

            let complex_type = find_complex_type(&complex_types, type_name)?;
            let mut fields = Vec::new();
            if extension_base(complex_type) == Some(COMMON_ATTRIBUTES_BASE) {
                fields.extend(common_fields.iter().cloned());
            }
            fields.extend(declared_fields(complex_type)?);

            let layer = build_layer(layer_name, fields)?;
            debug!(
                "Schema layer {}: {} fields, {:?}",
                layer.name,
                layer.fields.len(),
                layer.geometry_shape
            );
            layer_definitions.insert(layer_name.to_string(), layer);
        }

        Ok(Self {
            supported_version,
            layer_definitions,
        })
    }

    pub fn layer(&self, name: &str) -> Option<&LayerDescriptor> {
        self.layer_definitions.get(name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layer_definitions.keys().map(String::as_str)
    }
}

fn is_xsd(node: Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(XSD_NS)
        && node.tag_name().name() == name
}

fn xsd_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| is_xsd(*n, name))
}

fn find_complex_type<'a, 'input>(
    complex_types: &[Node<'a, 'input>],
    name: &str,
) -> Result<Node<'a, 'input>> {
    complex_types
        .iter()
        .copied()
        .find(|n| n.attribute("name") == Some(name))
        .ok_or_else(|| GmlError::schema(format!("complexType {} is not defined", name)))
}

fn extension_base<'a>(complex_type: Node<'a, '_>) -> Option<&'a str> {
    xsd_child(complex_type, "complexContent")
        .and_then(|content| xsd_child(content, "extension"))
        .and_then(|extension| extension.attribute("base"))
}

/// `(name, type)` pairs of `complexContent/extension/sequence/element`,
/// or of a plain `sequence` when the type has no complex content.
fn declared_fields(complex_type: Node) -> Result<Vec<(String, String)>> {
    let container = match xsd_child(complex_type, "complexContent") {
        Some(content) => xsd_child(content, "extension").ok_or_else(|| {
            GmlError::schema(format!(
                "complexType {} has complexContent without extension",
                complex_type.attribute("name").unwrap_or("?")
            ))
        })?,
        None => complex_type,
    };

    let Some(sequence) = xsd_child(container, "sequence") else {
        return Ok(Vec::new());
    };

    sequence
        .children()
        .filter(|n| is_xsd(*n, "element"))
        .map(|field| {
            let name = field.attribute("name");
            let ty = field.attribute("type");
            match (name, ty) {
                (Some(name), Some(ty)) => Ok((name.to_string(), ty.to_string())),
                _ => Err(GmlError::schema(format!(
                    "field of {} needs both name and type",
                    complex_type.attribute("name").unwrap_or("?")
                ))),
            }
        })
        .collect()
}

fn build_layer(name: &str, fields: Vec<(String, String)>) -> Result<LayerDescriptor> {
    let mut geometry_shape = None;
    let mut descriptors = Vec::with_capacity(fields.len());

    for (field_name, schema_type) in fields {
        let kind = if field_name == GEOMETRY_FIELD {
            let shape = geometry_shape_for(&schema_type)?;
            if geometry_shape.replace(shape).is_some() {
                return Err(GmlError::schema(format!(
                    "layer {} declares more than one geometry field",
                    name
                )));
            }
            FieldKind::Geometry(shape)
        } else {
            FieldKind::Attribute(attribute_type_for(&schema_type)?)
        };
        descriptors.push(FieldDescriptor {
            name: field_name,
            schema_type,
            kind,
        });
    }

    let geometry_shape = geometry_shape.ok_or_else(|| {
        GmlError::schema(format!("layer {} has no geometry field", name))
    })?;

    Ok(LayerDescriptor {
        name: name.to_string(),
        fields: descriptors,
        geometry_shape,
    })
}
