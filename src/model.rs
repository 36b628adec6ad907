use std::cmp::Ordering;
use std::fmt;

use crate::codec::format_coord;
use crate::types::{AttributeType, GeometryShape};

/// Name of the schema field that selects a layer's geometry shape.
pub const GEOMETRY_FIELD: &str = "geometry";
/// Attribute carrying a feature's own identifier.
pub const GEOBJ_ID_FIELD: &str = "GEOBJ_ID";
/// Attribute whose first-feature value orders layers on export.
pub const LAYER_ORDER_FIELD: &str = "RETEG_ID";

/// Keys of the metadata block written at the document root.
pub const METADATA_KEYS: [&str; 4] = ["gmlID", "gmlExportDate", "gmlGeobjIds", "xsdVersion"];
pub const XSD_VERSION_KEY: &str = "xsdVersion";
pub const GML_ID_KEY: &str = "gmlID";

pub type Coord = (f64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Attribute(AttributeType),
    Geometry(GeometryShape),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    /// Type token as written in the schema, e.g. `eing:long-or-empty`.
    pub schema_type: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub geometry_shape: GeometryShape,
}

impl LayerDescriptor {
    /// Non-geometry fields in declared order.
    pub fn attribute_fields(&self) -> impl Iterator<Item = (&FieldDescriptor, AttributeType)> {
        self.fields.iter().filter_map(|field| match field.kind {
            FieldKind::Attribute(ty) => Some((field, ty)),
            FieldKind::Geometry(_) => None,
        })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn of_point((x, y): Coord) -> Self {
        Self {
            min_x: x,
            max_x: x,
            min_y: y,
            max_y: y,
        }
    }

    pub fn expand(&mut self, (x, y): Coord) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn merge(&mut self, other: &Envelope) {
        self.expand((other.min_x, other.min_y));
        self.expand((other.max_x, other.max_y));
    }

    pub fn lower_corner(&self) -> Coord {
        (self.min_x, self.min_y)
    }

    pub fn upper_corner(&self) -> Coord {
        (self.max_x, self.max_y)
    }
}

/// A single geometry of one of the supported shapes.
///
/// Polygon rings are closed (first point == last point); the first ring is the
/// exterior, any further rings are holes.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryValue {
    Point(Coord),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
}

impl GeometryValue {
    pub fn shape(&self) -> GeometryShape {
        match self {
            GeometryValue::Point(_) => GeometryShape::Point,
            GeometryValue::LineString(_) => GeometryShape::LineString,
            GeometryValue::Polygon(_) => GeometryShape::Polygon,
        }
    }

    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            GeometryValue::Point(p) => Box::new(std::iter::once(*p)),
            GeometryValue::LineString(points) => Box::new(points.iter().copied()),
            GeometryValue::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
        }
    }

    /// `None` for an empty line string or polygon.
    pub fn envelope(&self) -> Option<Envelope> {
        let mut coords = self.coords();
        let mut envelope = Envelope::of_point(coords.next()?);
        for coord in coords {
            envelope.expand(coord);
        }
        Some(envelope)
    }
}

/// Attribute value as stored in the container.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl AttributeValue {
    /// Numbers order before text; numbers compare by value.
    pub fn compare(&self, other: &AttributeValue) -> Ordering {
        use AttributeValue::*;
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Integer(a), Real(b)) => (*a as f64).total_cmp(b),
            (Real(a), Integer(b)) => a.total_cmp(&(*b as f64)),
            (Real(a), Real(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            (Text(_), _) => Ordering::Greater,
            (_, Text(_)) => Ordering::Less,
        }
    }
}

/// Floats use the coordinate formatting, so `12.0` prints as `12`.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(v) => write!(f, "{}", v),
            AttributeValue::Real(v) => f.write_str(&format_coord(*v)),
            AttributeValue::Text(v) => f.write_str(v),
        }
    }
}

/// One feature read from a container layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub layer: String,
    /// Attributes in layer definition order; `None` marks a null value.
    pub attributes: Vec<(String, Option<AttributeValue>)>,
    pub geometry: Option<GeometryValue>,
}

impl FeatureRecord {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes
            .iter()
            .find(|(field, _)| field == name)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// Document-level metadata, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataBlock {
    pub entries: Vec<(String, Option<String>)>,
}

impl MetadataBlock {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }
}
