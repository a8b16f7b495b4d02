//! Imagery sources: the per-source capabilities the pipeline is generic over.
//!
//! Each source knows how to discover its scenes, how to bucket them, how to
//! sample them, and which samples are usable. The orchestrator composes
//! those steps without knowing which source it's driving.
//!
//! What actually differs between sources is small, and lives in a
//! [`SourceProfile`]. [`Source`] pairs a profile with a catalog and a
//! sampler and does the rest the same way for every source.

pub mod landsat;
pub mod sentinel1;

use async_trait::async_trait;

pub use landsat::Landsat;
pub use sentinel1::{OrbitDirection, Sentinel1};

use crate::cancel::CancelToken;
use crate::catalog::{DateWindow, SceneCatalog, SceneFilter};
use crate::error::{ProfileError, Result};
use crate::model::{Location, SampleResult, Scene, TemporalProfilePoint, TrendAxis, TrendQuery};
use crate::sampler::{BatchSampler, PixelSampler};
use crate::select::Selection;

/// What the orchestrator needs from an imagery source.
#[async_trait]
pub trait ImagerySource: Send + Sync {
    /// Short name for logs and output.
    fn name(&self) -> &'static str;

    /// Find candidate scenes for `query`, in ascending acquisition order.
    async fn discover(&self, query: &TrendQuery, cancel: &CancelToken) -> Result<Vec<Scene>>;

    /// How to reduce discovered scenes to one per bucket.
    fn select_bucket(&self, query: &TrendQuery) -> Selection;

    /// Read pixel values at `location` for every scene in `object_ids`.
    async fn sample(
        &self,
        location: Location,
        object_ids: &[i64],
        cancel: &CancelToken,
    ) -> Result<Vec<SampleResult>>;

    /// Band values at `location` for one scene, or the service's pick.
    async fn identify(
        &self,
        location: Location,
        object_id: Option<i64>,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<f64>>>;

    /// Whether a sampled point is clean enough to keep.
    fn is_usable(&self, _point: &TemporalProfilePoint) -> bool {
        true
    }
}

/// The source-specific part of an imagery source.
pub trait SourceProfile: Send + Sync {
    fn name(&self) -> &'static str;

    /// Catalog filter for `query`.
    fn filter(&self, query: &TrendQuery) -> SceneFilter;

    /// How to reduce discovered scenes to one per bucket.
    fn selection(&self, query: &TrendQuery) -> Selection;

    /// Whether a sampled point is clean enough to keep.
    fn is_usable(&self, _point: &TemporalProfilePoint) -> bool {
        true
    }
}

/// A [`SourceProfile`] backed by a scene catalog and a batch sampler.
pub struct Source<K, C, P> {
    profile: K,
    catalog: C,
    sampler: BatchSampler<P>,
}

impl<K, C, P> Source<K, C, P> {
    pub fn new(profile: K, catalog: C, sampler: BatchSampler<P>) -> Self {
        Self {
            profile,
            catalog,
            sampler,
        }
    }

    pub fn profile(&self) -> &K {
        &self.profile
    }

    pub fn sampler(&self) -> &BatchSampler<P> {
        &self.sampler
    }
}

#[async_trait]
impl<K, C, P> ImagerySource for Source<K, C, P>
where
    K: SourceProfile,
    C: SceneCatalog,
    P: PixelSampler,
{
    fn name(&self) -> &'static str {
        self.profile.name()
    }

    async fn discover(&self, query: &TrendQuery, cancel: &CancelToken) -> Result<Vec<Scene>> {
        let filter = self.profile.filter(query);
        cancel
            .run(self.catalog.find_scenes(&filter))
            .await?
            .map_err(ProfileError::CatalogQueryFailed)
    }

    fn select_bucket(&self, query: &TrendQuery) -> Selection {
        self.profile.selection(query)
    }

    async fn sample(
        &self,
        location: Location,
        object_ids: &[i64],
        cancel: &CancelToken,
    ) -> Result<Vec<SampleResult>> {
        self.sampler.sample(location, object_ids, cancel).await
    }

    async fn identify(
        &self,
        location: Location,
        object_id: Option<i64>,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<f64>>> {
        self.sampler.identify(location, object_id, cancel).await
    }

    fn is_usable(&self, point: &TemporalProfilePoint) -> bool {
        self.profile.is_usable(point)
    }
}

/// The catalog window a trend axis calls for.
pub fn window_for(axis: TrendAxis) -> DateWindow {
    match axis {
        TrendAxis::YearToYear { month } => DateWindow::Month(month),
        TrendAxis::MonthToMonth { year } => DateWindow::Year(year),
    }
}

/// The selection a trend axis calls for.
pub fn selection_for(axis: TrendAxis, min_year_spacing: Option<i16>) -> Selection {
    match axis {
        TrendAxis::YearToYear { month } => {
            Selection::year_to_year(month).with_min_year_spacing(min_year_spacing)
        }
        TrendAxis::MonthToMonth { .. } => Selection::month_to_month(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::catalog::tests::StalledCatalog;
    use crate::error::ServiceError;
    use crate::model::scene_on;
    use crate::sampler::tests::EchoSampler;
    use crate::select::Bucket;

    /// Rejects every query.
    struct FailingCatalog;

    #[async_trait]
    impl SceneCatalog for FailingCatalog {
        async fn find_scenes(
            &self,
            _filter: &SceneFilter,
        ) -> core::result::Result<Vec<Scene>, ServiceError> {
            Err(ServiceError::Remote {
                code: 500,
                message: "Error performing query operation".into(),
                details: vec![],
            })
        }
    }

    fn here() -> Location {
        Location::new(-105.0, 40.0)
    }

    fn landsat<C: SceneCatalog>(catalog: C) -> Source<Landsat, C, EchoSampler> {
        Source::new(
            Landsat::default(),
            catalog,
            BatchSampler::new(EchoSampler::default(), 20),
        )
    }

    #[tokio::test]
    async fn catalog_failure_is_a_catalog_error() {
        let err = landsat(FailingCatalog)
            .discover(&TrendQuery::year_to_year(here(), 6), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::CatalogQueryFailed(_)));
    }

    #[tokio::test]
    async fn cancelled_discovery_stops_waiting() {
        let source = landsat(StalledCatalog);
        let token = CancelToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel();
            })
        };

        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            source.discover(&TrendQuery::year_to_year(here(), 6), &token),
        )
        .await
        .unwrap();
        assert!(matches!(outcome, Err(ProfileError::Cancelled)));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn sampling_goes_through_the_batch_sampler() {
        let source = landsat(FailingCatalog);
        let results = source
            .sample(here(), &[4, 9], &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(source.sampler().inner().calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn profile_decides_name_selection_and_usability() {
        let source = landsat(FailingCatalog);
        let point = TemporalProfilePoint {
            scene: scene_on(1, "2020-06-10", 0.1),
            values: vec![Some(0.1), Some(8.0)],
        };

        assert_eq!(source.name(), "landsat");
        assert_eq!(
            source
                .select_bucket(&TrendQuery::month_to_month(here(), 2020))
                .bucket,
            Bucket::Month
        );
        assert!(!source.is_usable(&point));

        let sentinel = Source::new(
            Sentinel1::default(),
            FailingCatalog,
            BatchSampler::new(EchoSampler::default(), 20),
        );
        assert_eq!(sentinel.name(), "sentinel1");
        assert!(sentinel.is_usable(&point));
    }

    #[test]
    fn year_to_year_filters_by_month() {
        let axis = TrendAxis::YearToYear { month: 6 };
        assert_eq!(window_for(axis), DateWindow::Month(6));

        let selection = selection_for(axis, Some(2));
        assert_eq!(selection.bucket, Bucket::Year);
        assert_eq!(selection.target_month, Some(6));
        assert_eq!(selection.min_year_spacing, Some(2));
    }

    #[test]
    fn month_to_month_spans_one_year() {
        let axis = TrendAxis::MonthToMonth { year: 2021 };
        assert_eq!(window_for(axis), DateWindow::Year(2021));

        let selection = selection_for(axis, Some(2));
        assert_eq!(selection.bucket, Bucket::Month);
        assert_eq!(selection.target_month, None);
    }
}
