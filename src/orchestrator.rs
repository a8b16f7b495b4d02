//! Sampling orchestrator: the end-to-end temporal and spectral profile runs.
//!
//! A temporal profile run moves through these stages:
//!
//! ```text
//! Idle -> Discovering -> Selecting -> Sampling -> Merging -> Filtering -> Done
//! ```
//!
//! with `Cancelled` and `Failed` reachable from any of them. Every run gets
//! a fresh cancellation token; starting a run cancels the one before it.

use std::collections::HashMap;

use futures::future::try_join_all;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::band_values::mean_profile;
use crate::cancel::{CancelToken, InvocationSlot};
use crate::error::{ProfileError, Result};
use crate::model::{Location, SampleResult, Scene, TemporalProfilePoint, TrendQuery};
use crate::select::select;
use crate::source::ImagerySource;

/// Where a temporal profile run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Idle,
    Discovering,
    Selecting,
    Sampling,
    Merging,
    Filtering,
    Done,
    Cancelled,
    Failed,
}

impl Stage {
    /// Whether a caller should show a loading state.
    pub fn is_busy(self) -> bool {
        matches!(
            self,
            Self::Discovering | Self::Selecting | Self::Sampling | Self::Merging | Self::Filtering
        )
    }
}

/// Spectral profiles for several points in one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectralSampling {
    /// One band vector per input point, in input order.
    pub profiles: Vec<Vec<Option<f64>>>,

    /// Column-wise mean of `profiles`.
    pub mean: Vec<Option<f64>>,
}

/// Drives the sampling pipeline for one imagery source on behalf of one caller.
pub struct Orchestrator<S> {
    source: S,
    temporal: InvocationSlot,
    spectral: InvocationSlot,
    stage: watch::Sender<Stage>,
}

impl<S: ImagerySource> Orchestrator<S> {
    pub fn new(source: S) -> Self {
        let (stage, _) = watch::channel(Stage::Idle);
        Self {
            source,
            temporal: InvocationSlot::default(),
            spectral: InvocationSlot::default(),
            stage,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Follow the stage of the latest temporal profile run.
    pub fn stages(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    /// Cancel every run in flight.
    pub fn cancel(&self) {
        self.temporal.cancel();
        self.spectral.cancel();
    }

    /// Build a temporal profile: one quality-checked sample per time bucket,
    /// in ascending acquisition order.
    ///
    /// Supersedes any temporal profile run still in flight.
    pub async fn temporal_profile(&self, query: &TrendQuery) -> Result<Vec<TemporalProfilePoint>> {
        let token = self.temporal.begin();
        let span = info_span!(
            "temporal_profile",
            source = self.source.name(),
            run = %Uuid::new_v4(),
        );

        async {
            let outcome = self.run_temporal(query, &token).await;
            let terminal = match &outcome {
                Ok(_) => Stage::Done,
                Err(ProfileError::Cancelled) => Stage::Cancelled,
                Err(_) => Stage::Failed,
            };
            self.advance(&token, terminal);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_temporal(
        &self,
        query: &TrendQuery,
        token: &CancelToken,
    ) -> Result<Vec<TemporalProfilePoint>> {
        self.advance(token, Stage::Discovering);
        let scenes = self.source.discover(query, token).await?;
        if scenes.is_empty() {
            debug!("no scenes found");
            return Ok(Vec::new());
        }

        self.advance(token, Stage::Selecting);
        let selected = select(&scenes, &self.source.select_bucket(query));
        debug!(found = scenes.len(), selected = selected.len(), "selected scenes");

        self.advance(token, Stage::Sampling);
        let object_ids: Vec<i64> = selected.iter().map(Scene::object_id).collect();
        let samples = self.source.sample(query.location, &object_ids, token).await?;

        self.advance(token, Stage::Merging);
        let points = merge(selected, samples);

        self.advance(token, Stage::Filtering);
        let merged = points.len();
        let points: Vec<TemporalProfilePoint> = points
            .into_iter()
            .filter(|p| self.source.is_usable(p))
            .collect();
        debug!(
            kept = points.len(),
            dropped = merged - points.len(),
            "filtered samples"
        );

        // A run superseded after its last await still must not hand back stale data.
        if token.is_cancelled() {
            return Err(ProfileError::Cancelled);
        }

        Ok(points)
    }

    /// Discover scenes without sampling them.
    ///
    /// Shares the temporal profile's slot, so it supersedes a run in flight.
    pub async fn scenes(&self, query: &TrendQuery) -> Result<Vec<Scene>> {
        let token = self.temporal.begin();
        let span = info_span!("scenes", source = self.source.name(), run = %Uuid::new_v4());

        async {
            let scenes = self.source.discover(query, &token).await?;
            if token.is_cancelled() {
                return Err(ProfileError::Cancelled);
            }
            Ok(scenes)
        }
        .instrument(span)
        .await
    }

    /// Band values at `location` in one scene, or in the service's default pick.
    ///
    /// Supersedes any spectral run still in flight.
    pub async fn spectral_profile(
        &self,
        location: Location,
        object_id: Option<i64>,
    ) -> Result<Vec<Option<f64>>> {
        let token = self.spectral.begin();
        let span = info_span!(
            "spectral_profile",
            source = self.source.name(),
            run = %Uuid::new_v4(),
            ?object_id,
        );

        async {
            let values = self.source.identify(location, object_id, &token).await?;
            if token.is_cancelled() {
                return Err(ProfileError::Cancelled);
            }
            debug!(bands = values.len(), "spectral profile ready");
            Ok(values)
        }
        .instrument(span)
        .await
    }

    /// Spectral profiles for several points in one scene, plus their mean.
    ///
    /// Points are identified concurrently; any failure fails the whole call.
    pub async fn spectral_sampling(
        &self,
        locations: &[Location],
        object_id: Option<i64>,
    ) -> Result<SpectralSampling> {
        let token = self.spectral.begin();
        let span = info_span!(
            "spectral_sampling",
            source = self.source.name(),
            run = %Uuid::new_v4(),
            points = locations.len(),
        );

        async {
            let requests = locations
                .iter()
                .map(|&location| self.source.identify(location, object_id, &token));
            let profiles = try_join_all(requests).await?;
            if token.is_cancelled() {
                return Err(ProfileError::Cancelled);
            }

            let mean = mean_profile(&profiles);
            Ok(SpectralSampling { profiles, mean })
        }
        .instrument(span)
        .await
    }

    /// Publish a stage change, unless a newer run has taken over.
    fn advance(&self, token: &CancelToken, stage: Stage) {
        debug!(?stage, "stage");
        if self.temporal.is_current(token) {
            self.stage.send_replace(stage);
        }
    }
}

/// Join scenes with their samples on object id.
///
/// Keeps the scenes' order. Samples without a scene and scenes without a
/// sample are dropped; if a scene has several samples the first one wins.
pub fn merge(scenes: Vec<Scene>, samples: Vec<SampleResult>) -> Vec<TemporalProfilePoint> {
    let mut values_by_id: HashMap<i64, Vec<Option<f64>>> = HashMap::with_capacity(samples.len());
    for sample in samples {
        values_by_id
            .entry(sample.object_id)
            .or_insert(sample.values);
    }

    scenes
        .into_iter()
        .filter_map(|scene| {
            let values = values_by_id.remove(&scene.object_id())?;
            Some(TemporalProfilePoint { scene, values })
        })
        .collect()
}
