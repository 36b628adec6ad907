use std::cmp::Ordering;

use gdal::vector::LayerAccess;
use gdal::Dataset;
use tracing::debug;

use super::{attribute_from_gdal, feature_record, geometry_from_gdal, read_metadata};
use crate::error::Result;
use crate::model::{
    AttributeValue, Envelope, FeatureRecord, MetadataBlock, LAYER_ORDER_FIELD, METADATA_KEYS,
};

/// Read-only walk over an opened GeoPackage.
pub struct ContainerReader<'d> {
    dataset: &'d Dataset,
}

impl<'d> ContainerReader<'d> {
    pub fn new(dataset: &'d Dataset) -> Self {
        Self { dataset }
    }

    pub fn layer_count(&self) -> usize {
        self.dataset.layer_count()
    }

    pub fn layer_name(&self, index: usize) -> Result<String> {
        Ok(self.dataset.layer(index)?.name())
    }

    /// The fixed metadata keys; missing items come back as `None`.
    pub fn metadata(&self) -> MetadataBlock {
        read_metadata(self.dataset, &METADATA_KEYS)
    }

    /// Indices of the non-empty layers, ordered by the `RETEG_ID` of each
    /// layer's first feature, highest first.
    ///
    /// Layers without a value sort last; equal values keep the higher layer
    /// index first.
    pub fn sorted_layer_order(&self) -> Result<Vec<usize>> {
        let mut keyed: Vec<(Option<AttributeValue>, usize)> = Vec::new();

        for index in 0..self.dataset.layer_count() {
            let mut layer = self.dataset.layer(index)?;
            if layer.feature_count() == 0 {
                debug!("Layer {} is empty, left out of the order", layer.name());
                continue;
            }

            let key = layer.features().next().and_then(|feature| {
                feature
                    .fields()
                    .find(|(name, _)| name == LAYER_ORDER_FIELD)
                    .and_then(|(_, value)| value)
                    .map(attribute_from_gdal)
            });
            keyed.push((key, index));
        }

        keyed.sort_by(|(key_a, index_a), (key_b, index_b)| {
            compare_order_keys(key_b.as_ref(), key_a.as_ref()).then(index_b.cmp(index_a))
        });

        Ok(keyed.into_iter().map(|(_, index)| index).collect())
    }

    /// Streams the features of one layer into `visit`, stopping at the first error.
    /// Returns the number of features visited.
    pub fn try_for_each_feature<F>(&self, index: usize, mut visit: F) -> Result<u64>
    where
        F: FnMut(FeatureRecord) -> Result<()>,
    {
        let mut layer = self.dataset.layer(index)?;
        let name = layer.name();
        let mut count = 0;
        for feature in layer.features() {
            visit(feature_record(&name, &feature)?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Bounding box of every feature of every layer.
    ///
    /// Walks all geometries instead of asking OGR for layer extents, which
    /// come back with reduced precision.
    pub fn dataset_envelope(&self) -> Result<Option<Envelope>> {
        let mut envelope: Option<Envelope> = None;

        for index in 0..self.dataset.layer_count() {
            let mut layer = self.dataset.layer(index)?;
            for feature in layer.features() {
                let Some(geometry) = feature.geometry() else {
                    continue;
                };
                let Some(feature_envelope) = geometry_from_gdal(geometry)?.envelope() else {
                    continue;
                };
                match envelope.as_mut() {
                    Some(total) => total.merge(&feature_envelope),
                    None => envelope = Some(feature_envelope),
                }
            }
        }

        Ok(envelope)
    }
}

fn compare_order_keys(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.compare(b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
