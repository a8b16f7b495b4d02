//! Scene selection: one representative scene per time bucket.
//!
//! Input must already be in ascending acquisition order; the catalog
//! returns it that way and nothing here sorts.

use crate::model::Scene;

/// The time unit a bucket spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// One calendar year.
    Year,

    /// One calendar month within a year.
    Month,
}

/// How to reduce a scene list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub bucket: Bucket,

    /// Keep only scenes from this calendar month (1-12).
    pub target_month: Option<i8>,

    /// Minimum gap in years between accepted scenes.
    /// Only consulted for [`Bucket::Year`].
    pub min_year_spacing: Option<i16>,
}

impl Selection {
    /// One scene per year, all from `month`.
    pub fn year_to_year(month: i8) -> Self {
        Self {
            bucket: Bucket::Year,
            target_month: Some(month),
            min_year_spacing: None,
        }
    }

    /// One scene per month.
    pub fn month_to_month() -> Self {
        Self {
            bucket: Bucket::Month,
            target_month: None,
            min_year_spacing: None,
        }
    }

    #[must_use]
    pub fn with_min_year_spacing(mut self, spacing: Option<i16>) -> Self {
        self.min_year_spacing = spacing;
        self
    }

    fn same_bucket(&self, a: &Scene, b: &Scene) -> bool {
        match self.bucket {
            Bucket::Year => a.acquisition_year() == b.acquisition_year(),
            Bucket::Month => {
                a.acquisition_year() == b.acquisition_year()
                    && a.acquisition_month() == b.acquisition_month()
            }
        }
    }

    fn too_close(&self, candidate: &Scene, scene: &Scene) -> bool {
        match (self.bucket, self.min_year_spacing) {
            (Bucket::Year, Some(spacing)) => {
                scene.acquisition_year() - candidate.acquisition_year() < spacing
            }
            _ => false,
        }
    }
}

/// Reduce chronologically sorted scenes to at most one per bucket.
///
/// Within a bucket the least cloudy scene wins; on a tie the earlier one
/// stays. Scenes outside `target_month` are dropped before anything else.
/// With a year spacing, a scene fewer years after the last candidate than
/// the spacing is skipped outright, even from the candidate's own year.
pub fn select(scenes: &[Scene], selection: &Selection) -> Vec<Scene> {
    let mut candidates: Vec<Scene> = Vec::new();

    let in_month = |s: &&Scene| {
        selection
            .target_month
            .is_none_or(|m| s.acquisition_month() == m)
    };

    for scene in scenes.iter().filter(in_month) {
        let Some(last) = candidates.last_mut() else {
            candidates.push(scene.clone());
            continue;
        };

        if selection.too_close(last, scene) {
            continue;
        }

        if selection.same_bucket(last, scene) {
            if scene.cloud_cover() < last.cloud_cover() {
                *last = scene.clone();
            }
        } else {
            candidates.push(scene.clone());
        }
    }

    candidates
}
