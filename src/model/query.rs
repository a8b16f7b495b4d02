//! Trend queries: what a caller asks the pipeline for.

use serde::{Deserialize, Serialize};

use super::Location;

/// Which time axis a trend runs along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TrendAxis {
    /// One scene per year, all from the same calendar month.
    YearToYear { month: i8 },

    /// One scene per month within a single year.
    MonthToMonth { year: i16 },
}

/// A temporal profile request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    pub location: Location,
    pub axis: TrendAxis,

    /// Mission numbers to leave out (e.g. `7` for Landsat 7).
    /// Ignored by sources without missions.
    #[serde(default)]
    pub missions_to_exclude: Vec<u8>,
}

impl TrendQuery {
    pub fn year_to_year(location: Location, month: i8) -> Self {
        Self {
            location,
            axis: TrendAxis::YearToYear { month },
            missions_to_exclude: Vec::new(),
        }
    }

    pub fn month_to_month(location: Location, year: i16) -> Self {
        Self {
            location,
            axis: TrendAxis::MonthToMonth { year },
            missions_to_exclude: Vec::new(),
        }
    }

    #[must_use]
    pub fn excluding(mut self, missions: impl IntoIterator<Item = u8>) -> Self {
        self.missions_to_exclude.extend(missions);
        self
    }
}
