//! Pixel quality: decoding the Landsat QA_PIXEL bitmask.
//!
//! Bit layout (Collection 2, Level-2):
//!
//! ```text
//! bit 0  fill
//! bit 1  dilated cloud
//! bit 2  cirrus
//! bit 3  cloud
//! bit 4  cloud shadow
//! bit 5  snow / ice
//! ```

pub const FILL: u32 = 0;
pub const DILATED_CLOUD: u32 = 1;
pub const CIRRUS: u32 = 2;
pub const CLOUD: u32 = 3;
pub const CLOUD_SHADOW: u32 = 4;
pub const SNOW: u32 = 5;

const REJECT_MASK: i64 = (1 << FILL)
    | (1 << DILATED_CLOUD)
    | (1 << CIRRUS)
    | (1 << CLOUD)
    | (1 << CLOUD_SHADOW)
    | (1 << SNOW);

/// Whether a QA band value describes a usable pixel.
///
/// True only when the fill bit and every contamination bit are clear.
/// Total over all integers.
pub fn is_clear(qa_band_value: i64) -> bool {
    qa_band_value & REJECT_MASK == 0
}

/// Apply [`is_clear`] to the QA band at the end of a band vector.
///
/// A missing or non-integral QA value means the pixel can't be vouched for.
#[allow(clippy::cast_possible_truncation)]
pub fn is_clear_pixel(values: &[Option<f64>]) -> bool {
    match values.last().copied().flatten() {
        Some(qa) if qa.fract() == 0.0 => is_clear(qa as i64),
        _ => false,
    }
}
