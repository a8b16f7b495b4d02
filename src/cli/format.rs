//! One-line summaries for CLI display.

use pixel_trend::model::{Scene, TemporalProfilePoint, TrendAxis, TrendQuery};

pub(super) fn describe_trend(
    source: &str,
    query: &TrendQuery,
    points: &[TemporalProfilePoint],
) -> String {
    let span = date_span(points.iter().map(|p| &p.scene));
    format!(
        "{source} trend at {} ({}): {}{span}",
        format_location(query),
        format_axis(query.axis),
        count(points.len(), "point"),
    )
}

pub(super) fn describe_spectral(
    source: &str,
    object_id: Option<i64>,
    values: &[Option<f64>],
) -> String {
    let scene = match object_id {
        Some(id) => format!("scene {id}"),
        None => "default scene".to_string(),
    };
    let missing = values.iter().filter(|v| v.is_none()).count();
    let mut summary = format!("{source} {scene}: {}", count(values.len(), "band"));
    if missing > 0 {
        summary.push_str(&format!(" ({missing} without data)"));
    }
    summary
}

pub(super) fn describe_scenes(source: &str, query: &TrendQuery, scenes: &[Scene]) -> String {
    let cloudy = scenes.iter().filter(|s| s.is_cloudy()).count();
    format!(
        "{source} scenes at {} ({}): {}, {cloudy} cloudy{}",
        format_location(query),
        format_axis(query.axis),
        count(scenes.len(), "scene"),
        date_span(scenes.iter()),
    )
}

fn format_location(query: &TrendQuery) -> String {
    format!("{}, {}", query.location.x, query.location.y)
}

fn format_axis(axis: TrendAxis) -> String {
    match axis {
        TrendAxis::YearToYear { month } => format!("month {month}, year to year"),
        TrendAxis::MonthToMonth { year } => format!("{year}, month to month"),
    }
}

fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("1 {noun}")
    } else {
        format!("{n} {noun}s")
    }
}

/// `", first to last"` over scenes in acquisition order, or nothing.
fn date_span<'a>(mut scenes: impl Iterator<Item = &'a Scene>) -> String {
    let Some(first) = scenes.next() else {
        return String::new();
    };
    match scenes.last() {
        Some(last) => format!(
            ", {} to {}",
            first.formatted_acquisition_date(),
            last.formatted_acquisition_date()
        ),
        None => format!(", {}", first.formatted_acquisition_date()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;
    use pixel_trend::model::{DEFAULT_CLOUDY_THRESHOLD, Location};

    fn scene(object_id: i64, millis: i64, cloud_cover: f64) -> Scene {
        let ts = Timestamp::from_millisecond(millis).unwrap();
        Scene::new(object_id, "", ts, cloud_cover, DEFAULT_CLOUDY_THRESHOLD)
    }

    // 2019-06-20 and 2020-06-10, midnight UTC.
    const JUNE_2019: i64 = 1_560_988_800_000;
    const JUNE_2020: i64 = 1_591_747_200_000;

    #[test]
    fn count_pluralizes() {
        assert_eq!(count(0, "point"), "0 points");
        assert_eq!(count(1, "point"), "1 point");
        assert_eq!(count(3, "scene"), "3 scenes");
    }

    #[test]
    fn date_span_for_none_one_and_several() {
        assert_eq!(date_span(std::iter::empty::<&Scene>()), "");

        let one = [scene(1, JUNE_2019, 0.1)];
        assert_eq!(date_span(one.iter()), ", 2019-06-20");

        let several = [
            scene(1, JUNE_2019, 0.1),
            scene(2, JUNE_2019 + 86_400_000, 0.1),
            scene(3, JUNE_2020, 0.2),
        ];
        assert_eq!(date_span(several.iter()), ", 2019-06-20 to 2020-06-10");
    }

    #[test]
    fn scene_summary_counts_cloudy() {
        let query = TrendQuery::year_to_year(Location::new(-105.0, 40.0), 6);
        let scenes = [scene(1, JUNE_2019, 0.4), scene(2, JUNE_2020, 0.1)];

        assert_eq!(
            describe_scenes("landsat", &query, &scenes),
            "landsat scenes at -105, 40 (month 6, year to year): \
             2 scenes, 1 cloudy, 2019-06-20 to 2020-06-10"
        );
    }

    #[test]
    fn spectral_summary_notes_missing_bands() {
        assert_eq!(
            describe_spectral("sentinel1", None, &[Some(0.1), None]),
            "sentinel1 default scene: 2 bands (1 without data)"
        );
        assert_eq!(
            describe_spectral("landsat", Some(42), &[Some(0.1)]),
            "landsat scene 42: 1 band"
        );
    }
}
