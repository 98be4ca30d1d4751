//! Spatial extents for features.
//!
//! Geometry lives outside the core. A [`BoundsProvider`] turns a feature
//! into an optional [`Envelope`]; trees only store and union the results.

use arbor_types::Envelope;

use crate::object::RevFeature;

pub trait BoundsProvider: Send + Sync {
    fn bounds(&self, feature: &RevFeature) -> Option<Envelope>;
}

/// Provider for data without a spatial extent.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBounds;

impl BoundsProvider for NoBounds {
    fn bounds(&self, _feature: &RevFeature) -> Option<Envelope> {
        None
    }
}

impl<F> BoundsProvider for F
where
    F: Fn(&RevFeature) -> Option<Envelope> + Send + Sync,
{
    fn bounds(&self, feature: &RevFeature) -> Option<Envelope> {
        self(feature)
    }
}
