use gdal::spatial_ref::SpatialRef;
use gdal::vector::{Feature, Layer, LayerAccess, LayerOptions, OGRFieldType};
use gdal::Dataset;
use tracing::debug;

use super::{eov_spatial_ref, geometry_to_gdal};
use crate::error::{GmlError, Result};
use crate::model::{GeometryValue, LayerDescriptor};
use crate::schema::SchemaModel;
use crate::types::AttributeType;

/// Creates schema-defined layers in a GeoPackage.
pub struct ContainerWriter<'s> {
    schema: &'s SchemaModel,
    srs: SpatialRef,
}

impl<'s> ContainerWriter<'s> {
    pub fn new(schema: &'s SchemaModel) -> Result<Self> {
        Ok(Self {
            schema,
            srs: eov_spatial_ref()?,
        })
    }

    /// Creates the layer `name` with the geometry type and attribute fields
    /// the schema declares for it.
    pub fn create_layer<'d>(
        &self,
        dataset: &'d mut Dataset,
        name: &str,
    ) -> Result<LayerHandle<'d, 's>> {
        let descriptor = self
            .schema
            .layer(name)
            .ok_or_else(|| GmlError::schema(format!("no layer named {} in schema", name)))?;

        let layer = dataset.create_layer(LayerOptions {
            name,
            srs: Some(&self.srs),
            ty: descriptor.geometry_shape.wkb_type(),
            ..Default::default()
        })?;

        let fields: Vec<(&str, OGRFieldType::Type)> = descriptor
            .attribute_fields()
            .map(|(field, ty)| (field.name.as_str(), ty.ogr_field_type()))
            .collect();
        layer.create_defn_fields(&fields)?;
        debug!("Created layer {} with {} fields", name, fields.len());

        Ok(LayerHandle {
            layer,
            descriptor,
            written: 0,
        })
    }
}

/// An open layer that accepts features in markup form.
pub struct LayerHandle<'d, 's> {
    layer: Layer<'d>,
    descriptor: &'s LayerDescriptor,
    written: u64,
}

impl LayerHandle<'_, '_> {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Stores one feature.
    ///
    /// `attributes` holds raw text values; `None` or blank text leaves the field
    /// unset and names the schema does not declare are ignored. Numbers are
    /// parsed from the trimmed text, text fields are stored as given.
    pub fn write_feature(
        &mut self,
        attributes: &[(String, Option<String>)],
        geometry: &GeometryValue,
    ) -> Result<()> {
        if geometry.shape() != self.descriptor.geometry_shape {
            return Err(GmlError::document(format!(
                "layer {} expects {:?} geometry, found {:?}",
                self.descriptor.name,
                self.descriptor.geometry_shape,
                geometry.shape()
            )));
        }

        let mut feature = Feature::new(self.layer.defn())?;
        for (name, value) in attributes {
            let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let Some(ty) = self.attribute_type(name) else {
                debug!("Ignoring undeclared field {}.{}", self.descriptor.name, name);
                continue;
            };
            let index = feature.field_index(name)?;
            let invalid = || GmlError::InvalidAttributeValue {
                layer: self.descriptor.name.clone(),
                field: name.clone(),
                value: value.to_string(),
            };
            match ty {
                AttributeType::Text => feature.set_field_string(index, value)?,
                AttributeType::Integer => feature
                    .set_field_integer(index, value.trim().parse().map_err(|_| invalid())?)?,
                AttributeType::Integer64 => feature
                    .set_field_integer64(index, value.trim().parse().map_err(|_| invalid())?)?,
                AttributeType::Real => feature
                    .set_field_double(index, value.trim().parse().map_err(|_| invalid())?)?,
            }
        }

        feature.set_geometry(geometry_to_gdal(geometry)?)?;
        feature.create(&self.layer)?;
        self.written += 1;
        Ok(())
    }

    /// Features written through this handle.
    pub fn feature_count(&self) -> u64 {
        self.written
    }

    fn attribute_type(&self, name: &str) -> Option<AttributeType> {
        self.descriptor
            .attribute_fields()
            .find(|(field, _)| field.name == name)
            .map(|(_, ty)| ty)
    }
}
