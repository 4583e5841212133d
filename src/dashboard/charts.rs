//! Angular layout for the category donut chart.

use serde::Serialize;

use crate::dashboard::aggregation::CategoryTotals;

/// The angle, in degrees, at which the first segment starts (12 o'clock).
pub const REFERENCE_ANGLE: f64 = -90.0;

/// One category's slice of a radial chart, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// The category the segment represents.
    pub category: String,
    /// Where the segment starts.
    pub start_angle: f64,
    /// How far the segment extends from its start.
    pub sweep_angle: f64,
}

/// Lay out one segment per category around a circle.
///
/// Segments follow the order of `totals` starting at [REFERENCE_ANGLE], each
/// sweeping its share of 360 degrees. They are not sorted by size.
///
/// # Returns
/// The segments, or nothing when the categories sum to zero.
pub fn radial_layout(totals: &CategoryTotals) -> Vec<Segment> {
    let grand_total = totals.total();
    if grand_total <= 0.0 || !grand_total.is_finite() {
        return Vec::new();
    }

    let mut start_angle = REFERENCE_ANGLE;

    totals
        .iter()
        .map(|(category, total)| {
            let sweep_angle = total / grand_total * 360.0;
            let segment = Segment {
                category: category.to_owned(),
                start_angle,
                sweep_angle,
            };
            start_angle += sweep_angle;

            segment
        })
        .collect()
}
