//! Translation of schema type tokens into storage and geometry kinds.

use gdal::vector::{OGRFieldType, OGRwkbGeometryType};

use crate::error::{GmlError, Result};

/// The geometry shapes a layer can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryShape {
    Point,
    LineString,
    Polygon,
}

/// Attribute storage types of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Text,
    Integer,
    Integer64,
    Real,
}

const GEOMETRY_TOKENS: &[(&str, GeometryShape)] = &[
    ("gml:PointPropertyType", GeometryShape::Point),
    ("gml:LineStringPropertyType", GeometryShape::LineString),
    ("gml:PolygonPropertyType", GeometryShape::Polygon),
];

const ATTRIBUTE_TOKENS: &[(&str, AttributeType)] = &[
    ("string", AttributeType::Text),
    ("eing:nonEmptyString", AttributeType::Text),
    ("int", AttributeType::Integer),
    ("eing:int-or-empty", AttributeType::Integer),
    ("long", AttributeType::Integer64),
    ("eing:long-or-empty", AttributeType::Integer64),
    ("decimal", AttributeType::Real),
    ("eing:decimal-or-empty", AttributeType::Real),
    ("eing:decimal-just-0", AttributeType::Real),
    ("double", AttributeType::Real),
    ("eing:double-or-empty", AttributeType::Real),
];

pub fn geometry_shape_for(token: &str) -> Result<GeometryShape> {
    GEOMETRY_TOKENS
        .iter()
        .find(|(known, _)| *known == token)
        .map(|(_, shape)| *shape)
        .ok_or_else(|| GmlError::UnsupportedGeometryType(token.to_string()))
}

pub fn attribute_type_for(token: &str) -> Result<AttributeType> {
    ATTRIBUTE_TOKENS
        .iter()
        .find(|(known, _)| *known == token)
        .map(|(_, ty)| *ty)
        .ok_or_else(|| GmlError::UnsupportedFieldType(token.to_string()))
}

impl GeometryShape {
    pub fn wkb_type(self) -> OGRwkbGeometryType::Type {
        match self {
            GeometryShape::Point => OGRwkbGeometryType::wkbPoint,
            GeometryShape::LineString => OGRwkbGeometryType::wkbLineString,
            GeometryShape::Polygon => OGRwkbGeometryType::wkbPolygon,
        }
    }

    /// Matches OGR's geometry names (`POINT`, `LINESTRING`, `POLYGON`), ignoring any Z/M suffix.
    pub fn from_ogr_name(name: &str) -> Result<Self> {
        let base = name.split_whitespace().next().unwrap_or(name);
        match base.to_ascii_uppercase().as_str() {
            "POINT" => Ok(GeometryShape::Point),
            "LINESTRING" => Ok(GeometryShape::LineString),
            "POLYGON" => Ok(GeometryShape::Polygon),
            _ => Err(GmlError::UnsupportedGeometryType(name.to_string())),
        }
    }
}

impl AttributeType {
    pub fn ogr_field_type(self) -> OGRFieldType::Type {
        match self {
            AttributeType::Text => OGRFieldType::OFTString,
            AttributeType::Integer => OGRFieldType::OFTInteger,
            AttributeType::Integer64 => OGRFieldType::OFTInteger64,
            AttributeType::Real => OGRFieldType::OFTReal,
        }
    }
}
