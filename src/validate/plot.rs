//! Diagnostic plots (PNG)
//!
//! Charts are drawn without text so no font backend is needed.

use crate::{Error, Result};
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

const SIZE: (u32, u32) = (640, 480);

fn plot_error(e: impl std::fmt::Display) -> Error {
    Error::PlotError(e.to_string())
}

/// Padded `[min, max]` of the values; a degenerate span is widened to 1
fn padded_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Range<f64> {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    if hi - lo < f64::EPSILON {
        return (lo - 0.5)..(hi + 0.5);
    }
    let pad = (hi - lo) * 0.05;
    (lo - pad)..(hi + pad)
}

/// Scatter of actual (x) against predicted (y) with the identity line
///
/// # Errors
/// Returns [`Error::PlotError`] if the image cannot be rendered or saved
pub fn actual_vs_predicted(path: &Path, actual: &[f64], predicted: &[f64]) -> Result<()> {
    let x_range = padded_range(actual);
    let y_range = padded_range(predicted);

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .map_err(plot_error)?;

    let frame = vec![
        (x_range.start, y_range.start),
        (x_range.end, y_range.start),
        (x_range.end, y_range.end),
        (x_range.start, y_range.end),
        (x_range.start, y_range.start),
    ];
    chart
        .draw_series(std::iter::once(PathElement::new(frame, BLACK)))
        .map_err(plot_error)?;

    let lo = x_range.start.max(y_range.start);
    let hi = x_range.end.min(y_range.end);
    if lo < hi {
        chart
            .draw_series(std::iter::once(PathElement::new(vec![(lo, lo), (hi, hi)], RED)))
            .map_err(plot_error)?;
    }

    chart
        .draw_series(
            actual
                .iter()
                .zip(predicted)
                .map(|(&a, &p)| Circle::new((a, p), 3, BLUE.filled())),
        )
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    tracing::info!(path = %path.display(), points = actual.len(), "wrote scatter plot");
    Ok(())
}

/// Equal-width histogram bins `(left, right, count)` over the value span
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if hi - lo < f64::EPSILON {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0_usize; bins];
    for v in finite {
        // right edge belongs to the last bin
        let idx = (((v - lo) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (lo + width * i as f64, lo + width * (i + 1) as f64, c))
        .collect()
}

/// Histogram of predicted values
///
/// # Errors
/// Returns [`Error::PlotError`] if the image cannot be rendered or saved
#[allow(clippy::cast_precision_loss)]
pub fn predicted_distribution(path: &Path, values: &[f64], bins: usize) -> Result<()> {
    let histogram = histogram_bins(values, bins);
    let x_range = match (histogram.first(), histogram.last()) {
        (Some(first), Some(last)) => first.0..last.1,
        _ => 0.0..1.0,
    };
    let tallest = histogram.iter().map(|b| b.2).max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range, 0.0..tallest * 1.05)
        .map_err(plot_error)?;

    chart
        .draw_series(histogram.iter().map(|&(left, right, count)| {
            Rectangle::new([(left, 0.0), (right, count as f64)], BLUE.mix(0.6).filled())
        }))
        .map_err(plot_error)?;
    chart
        .draw_series(histogram.iter().map(|&(left, right, count)| {
            Rectangle::new([(left, 0.0), (right, count as f64)], BLACK)
        }))
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    tracing::info!(path = %path.display(), bins, "wrote histogram");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_every_value() {
        let values: Vec<f64> = (0..100).map(f64::from).collect();
        let bins = histogram_bins(&values, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 100);
        assert!(bins.iter().all(|b| b.2 == 10));
    }

    #[test]
    fn test_histogram_constant_values() {
        let bins = histogram_bins(&[0.5, 0.5, 0.5], 10);
        assert_eq!(bins.iter().map(|b| b.2).sum::<usize>(), 3);
        assert!(bins[0].0 < 0.5 && bins[9].1 > 0.5);
    }

    #[test]
    fn test_histogram_empty() {
        assert!(histogram_bins(&[], 10).is_empty());
        assert!(histogram_bins(&[f64::NAN], 10).is_empty());
    }

    #[test]
    fn test_padded_range_degenerate() {
        let range = padded_range(&[2.0, 2.0]);
        assert!(range.start < 2.0 && range.end > 2.0);
    }

    #[test]
    fn test_plots_written() {
        let dir = tempfile::tempdir().unwrap();
        let actual = [1.0, 2.0, 3.0, 4.0];
        let predicted = [1.1, 1.9, 3.2, 3.8];

        let scatter = dir.path().join("scatter.png");
        actual_vs_predicted(&scatter, &actual, &predicted).unwrap();
        assert!(scatter.metadata().unwrap().len() > 0);

        let hist = dir.path().join("hist.png");
        predicted_distribution(&hist, &predicted, 10).unwrap();
        assert!(hist.metadata().unwrap().len() > 0);
    }
}
