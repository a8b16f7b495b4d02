//! Band values: decoding raw sampling payloads into per-band numbers.
//!
//! The image service reports pixel values in more than one shape depending
//! on the endpoint and on whether the pixel has data. Those shapes are
//! decoded once at the service boundary into [`RawBandValues`], and
//! [`parse`] turns that into a vector of optional numbers.

/// Sentinel the service uses in place of a value string when a pixel has no data.
pub const NO_DATA: &str = "NoData";

/// A raw pixel value payload as returned by the sampling service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawBandValues {
    /// A single comma-and-space delimited string, e.g. `"120, 45, -999"`.
    Delimited(String),

    /// Individual tokens, some of which may be non-numeric no-data markers.
    TokenList(Vec<String>),

    /// Nothing usable came back.
    Empty,
}

impl RawBandValues {
    /// Decode the two fields an identify response carries.
    ///
    /// `value` wins when it's present and not the no-data sentinel;
    /// otherwise the first space-delimited entry of `fallback` is used.
    pub fn from_identify(value: Option<&str>, fallback: Option<&str>) -> Self {
        match (value, fallback) {
            (Some(v), _) if !v.is_empty() && v != NO_DATA => Self::Delimited(v.to_string()),
            (_, Some(tokens)) if !tokens.trim().is_empty() => Self::tokens(tokens),
            _ => Self::Empty,
        }
    }

    /// Split a whitespace-delimited string into a token list.
    pub fn tokens(raw: &str) -> Self {
        Self::TokenList(raw.split_whitespace().map(String::from).collect())
    }
}

/// Decode a raw payload into one entry per band.
///
/// Tokens that aren't numbers become `None`. A bad token never discards
/// the rest of the vector.
pub fn parse(raw: &RawBandValues) -> Vec<Option<f64>> {
    match raw {
        RawBandValues::Delimited(s) => s.split(", ").map(parse_token).collect(),
        RawBandValues::TokenList(tokens) => tokens.iter().map(|t| parse_token(t)).collect(),
        RawBandValues::Empty => Vec::new(),
    }
}

fn parse_token(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Column-wise mean of several band vectors.
///
/// Nulls are skipped per column; a column with no numbers at all is `None`.
/// The result is as long as the longest input.
pub fn mean_profile(profiles: &[Vec<Option<f64>>]) -> Vec<Option<f64>> {
    let width = profiles.iter().map(Vec::len).max().unwrap_or(0);

    (0..width)
        .map(|band| {
            let (sum, count) = profiles
                .iter()
                .filter_map(|p| p.get(band).copied().flatten())
                .fold((0.0, 0_u32), |(sum, count), v| (sum + v, count + 1));
            (count > 0).then(|| sum / f64::from(count))
        })
        .collect()
}
