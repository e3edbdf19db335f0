//! Various utilities shared by the Wayfarer crates

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, cause it looks ugly
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

/// Rounds a float to the given number of decimal places.
///
/// The native parser emits raw IEEE floats; rounding them to a small fixed
/// precision keeps re-imports byte-stable across parser builds.
///
/// ```
/// use wayfarer_utils::round_places;
/// assert_eq!(round_places(0.123456, 4), 0.1235);
/// assert_eq!(round_places(-1.23449, 2), -1.23);
/// ```
pub fn round_places(value: f32, places: u32) -> f32 {
    let factor = 10f32.powi(places as i32);
    (value * factor).round() / factor
}

/// Strips the asset pack's `P_` placement prefix, if present.
///
/// ```
/// use wayfarer_utils::strip_placement_prefix;
/// assert_eq!(strip_placement_prefix("P_Wood"), "Wood");
/// assert_eq!(strip_placement_prefix("Wood"), "Wood");
/// ```
pub fn strip_placement_prefix(name: &str) -> &str {
    name.strip_prefix("P_").unwrap_or(name)
}
