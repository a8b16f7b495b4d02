//! Batch sampling: reading pixel values for many scenes at one location.
//!
//! The sampling service accepts a limited number of scene ids per request,
//! so [`BatchSampler`] splits the id list into groups, sends every group at
//! once, and waits for all of them.

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::error::{ProfileError, Result, ServiceError};
use crate::model::{Location, SampleResult};

/// Ids per request the sampling service is assumed to accept.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Reads pixel values from a sampling service.
#[async_trait]
pub trait PixelSampler: Send + Sync {
    /// Sample `location` in each of `object_ids`.
    ///
    /// Results come back in whatever order the service chooses.
    async fn sample(
        &self,
        location: Location,
        object_ids: &[i64],
    ) -> core::result::Result<Vec<SampleResult>, ServiceError>;

    /// Band values at `location` in one scene, or in whichever scene the
    /// service's default mosaic rule picks when `object_id` is `None`.
    async fn identify(
        &self,
        location: Location,
        object_id: Option<i64>,
    ) -> core::result::Result<Vec<Option<f64>>, ServiceError>;
}

/// Split ids into consecutive groups of at most `size`.
///
/// # Panics
///
/// Panics if `size` is zero.
pub fn partition(object_ids: &[i64], size: usize) -> Vec<&[i64]> {
    object_ids.chunks(size).collect()
}

/// Fans sampling requests out over fixed-size id groups.
#[derive(Debug, Clone)]
pub struct BatchSampler<P> {
    sampler: P,
    batch_size: usize,
}

impl<P: PixelSampler> BatchSampler<P> {
    /// Wrap `sampler`, sending at most `batch_size` ids per request.
    /// A zero batch size falls back to [`DEFAULT_BATCH_SIZE`].
    pub fn new(sampler: P, batch_size: usize) -> Self {
        let batch_size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        Self {
            sampler,
            batch_size,
        }
    }

    pub fn inner(&self) -> &P {
        &self.sampler
    }

    /// Sample every id, one concurrent request per group.
    ///
    /// Any failed group fails the whole call. Output order follows group
    /// completion; join on `object_id`.
    pub async fn sample(
        &self,
        location: Location,
        object_ids: &[i64],
        cancel: &CancelToken,
    ) -> Result<Vec<SampleResult>> {
        if object_ids.is_empty() {
            return Ok(Vec::new());
        }

        let groups = partition(object_ids, self.batch_size);
        debug!(ids = object_ids.len(), groups = groups.len(), "sampling");

        let requests = groups
            .into_iter()
            .map(|ids| self.sampler.sample(location, ids));

        let results = cancel
            .run(try_join_all(requests))
            .await?
            .map_err(ProfileError::SampleRequestFailed)?;

        Ok(results.into_iter().flatten().collect())
    }

    /// Band values for one scene, or the service default.
    pub async fn identify(
        &self,
        location: Location,
        object_id: Option<i64>,
        cancel: &CancelToken,
    ) -> Result<Vec<Option<f64>>> {
        cancel
            .run(self.sampler.identify(location, object_id))
            .await?
            .map_err(ProfileError::SampleRequestFailed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::sync::Barrier;

    /// Echoes each id back with `[id]` as its values and records every request.
    #[derive(Default)]
    pub(crate) struct EchoSampler {
        pub calls: Mutex<Vec<Vec<i64>>>,
        pub fail_on: Option<i64>,
    }

    #[async_trait]
    impl PixelSampler for EchoSampler {
        async fn sample(
            &self,
            _location: Location,
            object_ids: &[i64],
        ) -> core::result::Result<Vec<SampleResult>, ServiceError> {
            self.calls.lock().unwrap().push(object_ids.to_vec());

            if let Some(bad) = self.fail_on
                && object_ids.contains(&bad)
            {
                return Err(ServiceError::Remote {
                    code: 500,
                    message: "boom".into(),
                    details: vec![],
                });
            }

            Ok(object_ids
                .iter()
                .map(|&id| SampleResult {
                    object_id: id,
                    values: vec![Some(id as f64)],
                })
                .collect())
        }

        async fn identify(
            &self,
            _location: Location,
            object_id: Option<i64>,
        ) -> core::result::Result<Vec<Option<f64>>, ServiceError> {
            Ok(vec![object_id.map(|id| id as f64)])
        }
    }

    /// Every request waits on a shared barrier, so requests only finish if
    /// they're all in flight together.
    struct BarrierSampler {
        barrier: Barrier,
    }

    #[async_trait]
    impl PixelSampler for BarrierSampler {
        async fn sample(
            &self,
            _location: Location,
            object_ids: &[i64],
        ) -> core::result::Result<Vec<SampleResult>, ServiceError> {
            self.barrier.wait().await;
            Ok(object_ids
                .iter()
                .map(|&id| SampleResult {
                    object_id: id,
                    values: vec![],
                })
                .collect())
        }

        async fn identify(
            &self,
            _location: Location,
            _object_id: Option<i64>,
        ) -> core::result::Result<Vec<Option<f64>>, ServiceError> {
            Ok(vec![])
        }
    }

    /// Never answers.
    pub(crate) struct StalledSampler;

    #[async_trait]
    impl PixelSampler for StalledSampler {
        async fn sample(
            &self,
            _location: Location,
            _object_ids: &[i64],
        ) -> core::result::Result<Vec<SampleResult>, ServiceError> {
            std::future::pending().await
        }

        async fn identify(
            &self,
            _location: Location,
            _object_id: Option<i64>,
        ) -> core::result::Result<Vec<Option<f64>>, ServiceError> {
            std::future::pending().await
        }
    }

    fn here() -> Location {
        Location::new(-105.0, 40.0)
    }

    #[test]
    fn partitions_into_fixed_groups() {
        let ids: Vec<i64> = (1..=45).collect();
        let groups = partition(&ids, 20);

        let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
        assert_eq!(sizes, [20, 20, 5]);

        let flattened: Vec<i64> = groups.concat();
        assert_eq!(flattened, ids);
    }

    #[test]
    fn partition_of_nothing_is_empty() {
        assert!(partition(&[], 20).is_empty());
    }

    #[tokio::test]
    async fn samples_every_id_exactly_once() {
        let sampler = BatchSampler::new(EchoSampler::default(), 20);
        let ids: Vec<i64> = (100..145).collect();

        let results = sampler
            .sample(here(), &ids, &CancelToken::new())
            .await
            .unwrap();

        let seen: HashSet<i64> = results.iter().map(|r| r.object_id).collect();
        assert_eq!(results.len(), ids.len());
        assert_eq!(seen, ids.iter().copied().collect());

        let calls = sampler.inner().calls.lock().unwrap();
        let mut sizes: Vec<usize> = calls.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, [5, 20, 20]);
    }

    #[tokio::test]
    async fn groups_are_requested_concurrently() {
        let sampler = BatchSampler::new(
            BarrierSampler {
                barrier: Barrier::new(3),
            },
            2,
        );

        let results = tokio::time::timeout(
            Duration::from_secs(2),
            sampler.sample(here(), &[1, 2, 3, 4, 5], &CancelToken::new()),
        )
        .await
        .expect("groups were not in flight together")
        .unwrap();

        assert_eq!(results.len(), 5);
    }

    #[tokio::test]
    async fn one_failed_group_fails_everything() {
        let sampler = BatchSampler::new(
            EchoSampler {
                fail_on: Some(25),
                ..EchoSampler::default()
            },
            20,
        );
        let ids: Vec<i64> = (1..=45).collect();

        let err = sampler
            .sample(here(), &ids, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProfileError::SampleRequestFailed(_)));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_groups() {
        let sampler = BatchSampler::new(StalledSampler, 20);
        let token = CancelToken::new();

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                token.cancel();
            })
        };

        let err = sampler
            .sample(here(), &[1, 2, 3], &token)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn empty_id_list_makes_no_requests() {
        let sampler = BatchSampler::new(EchoSampler::default(), 20);
        let results = sampler
            .sample(here(), &[], &CancelToken::new())
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(sampler.inner().calls.lock().unwrap().is_empty());
    }

    #[test]
    fn zero_batch_size_uses_default() {
        let sampler = BatchSampler::new(EchoSampler::default(), 0);
        assert_eq!(sampler.batch_size, DEFAULT_BATCH_SIZE);
    }
}
