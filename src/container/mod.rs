//! GeoPackage access through GDAL/OGR.
//!
//! This module converts between GDAL's vector types and the crate's model;
//! [`ContainerReader`] and [`ContainerWriter`] build on it.

mod reader;
mod writer;

pub use reader::ContainerReader;
pub use writer::{ContainerWriter, LayerHandle};

use std::path::Path;

use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Feature, FieldValue, Geometry, OGRwkbGeometryType};
use gdal::{Dataset, DriverManager, Metadata};

use crate::codec::format_coord;
use crate::error::{GmlError, Result};
use crate::model::{AttributeValue, Coord, FeatureRecord, GeometryValue, MetadataBlock};
use crate::types::GeometryShape;
use crate::writer::EPSG_CODE;

pub const GPKG_DRIVER: &str = "GPKG";

/// Metadata items live in GDAL's default domain.
const METADATA_DOMAIN: &str = "";

pub fn open(path: &Path) -> Result<Dataset> {
    Ok(Dataset::open(path)?)
}

/// Creates a new, empty GeoPackage at `path`.
pub fn create(path: &Path) -> Result<Dataset> {
    let driver = DriverManager::get_driver_by_name(GPKG_DRIVER)?;
    Ok(driver.create_vector_only(path)?)
}

/// HD72 / EOV, the only reference system the converter handles.
pub fn eov_spatial_ref() -> Result<SpatialRef> {
    Ok(SpatialRef::from_epsg(EPSG_CODE)?)
}

pub fn read_metadata(dataset: &Dataset, keys: &[&str]) -> MetadataBlock {
    let mut metadata = MetadataBlock::default();
    for key in keys {
        metadata.insert(*key, dataset.metadata_item(key, METADATA_DOMAIN));
    }
    metadata
}

/// Entries without a value are skipped.
pub fn write_metadata(dataset: &mut Dataset, metadata: &MetadataBlock) -> Result<()> {
    for (key, value) in &metadata.entries {
        if let Some(value) = value {
            dataset.set_metadata_item(key, value, METADATA_DOMAIN)?;
        }
    }
    Ok(())
}

pub fn geometry_from_gdal(geometry: &Geometry) -> Result<GeometryValue> {
    match GeometryShape::from_ogr_name(&geometry.geometry_name())? {
        GeometryShape::Point => {
            if geometry.point_count() == 0 {
                return Err(GmlError::document("empty point geometry"));
            }
            let (x, y, _) = geometry.get_point(0);
            Ok(GeometryValue::Point((x, y)))
        }
        GeometryShape::LineString => Ok(GeometryValue::LineString(points_2d(geometry))),
        GeometryShape::Polygon => {
            let rings = (0..geometry.geometry_count())
                .map(|index| points_2d(&geometry.get_geometry(index)))
                .collect();
            Ok(GeometryValue::Polygon(rings))
        }
    }
}

fn points_2d(geometry: &Geometry) -> Vec<Coord> {
    let mut points = Vec::new();
    geometry.get_points(&mut points);
    points
        .into_iter()
        .map(|(x, y, _)| (x, y))
        .collect()
}

pub fn geometry_to_gdal(value: &GeometryValue) -> Result<Geometry> {
    match value {
        GeometryValue::Point(point) => {
            let mut geometry = Geometry::empty(OGRwkbGeometryType::wkbPoint)?;
            geometry.add_point_2d(*point);
            Ok(geometry)
        }
        GeometryValue::LineString(points) => {
            let mut geometry = Geometry::empty(OGRwkbGeometryType::wkbLineString)?;
            for point in points {
                geometry.add_point_2d(*point);
            }
            Ok(geometry)
        }
        GeometryValue::Polygon(rings) => {
            let mut geometry = Geometry::empty(OGRwkbGeometryType::wkbPolygon)?;
            for ring in rings {
                let mut linear_ring = Geometry::empty(OGRwkbGeometryType::wkbLinearRing)?;
                for point in ring {
                    linear_ring.add_point_2d(*point);
                }
                geometry.add_geometry(linear_ring)?;
            }
            Ok(geometry)
        }
    }
}

/// Scalars map directly; lists are joined with spaces, dates use ISO 8601.
pub fn attribute_from_gdal(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::IntegerValue(v) => AttributeValue::Integer(v.into()),
        FieldValue::Integer64Value(v) => AttributeValue::Integer(v),
        FieldValue::RealValue(v) => AttributeValue::Real(v),
        FieldValue::StringValue(v) => AttributeValue::Text(v),
        FieldValue::IntegerListValue(list) => AttributeValue::Text(join(list.iter())),
        FieldValue::Integer64ListValue(list) => AttributeValue::Text(join(list.iter())),
        FieldValue::RealListValue(list) => {
            AttributeValue::Text(join(list.iter().map(|v| format_coord(*v))))
        }
        FieldValue::StringListValue(list) => AttributeValue::Text(list.join(" ")),
        FieldValue::DateValue(date) => AttributeValue::Text(date.to_string()),
        FieldValue::DateTimeValue(datetime) => AttributeValue::Text(datetime.to_rfc3339()),
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|item| item.to_string()).collect::<Vec<_>>().join(" ")
}

pub fn feature_record(layer: &str, feature: &Feature) -> Result<FeatureRecord> {
    let attributes = feature
        .fields()
        .map(|(name, value)| (name, value.map(attribute_from_gdal)))
        .collect();
    let geometry = feature.geometry().map(geometry_from_gdal).transpose()?;

    Ok(FeatureRecord {
        layer: layer.to_string(),
        attributes,
        geometry,
    })
}
