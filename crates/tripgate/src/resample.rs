//! Resampling onto the contract's uniform clock.
//!
//! A trip is resampled by laying a fixed-rate grid from its first sample
//! to its last and interpolating every column onto it: linear for numeric
//! fields, angular unwrap/interpolate/re-wrap for wrapped fields like
//! heading, forward-fill for categorical fields. Raw gaps wider than the
//! contract's `max_gap_seconds` invalidate the grid points they span;
//! nothing is ever interpolated across such a gap, and nothing is
//! extrapolated beyond the observed range.

use std::path::Path;

use tracing::debug;

use crate::contract::Contract;
use crate::error::{Error, Result};
use crate::table::{format_number, parse_cell, Table};

/// Tolerance for grid/sample time comparisons.
const TIME_EPSILON: f64 = 1e-9;

/// Resamples trip tables onto a uniform time grid.
#[derive(Debug, Clone)]
pub struct Resampler {
    rate_hz: u32,
    max_gap_seconds: f64,
    wrap_columns: Vec<String>,
}

impl Resampler {
    /// Create a resampler with explicit parameters.
    ///
    /// `wrap_columns` are treated as angles in degrees and unwrapped
    /// before interpolation.
    #[must_use]
    pub fn new(rate_hz: u32, max_gap_seconds: f64, wrap_columns: Vec<String>) -> Self {
        Self {
            rate_hz,
            max_gap_seconds,
            wrap_columns,
        }
    }

    /// Create a resampler from the contract's standardization policy.
    ///
    /// Wrapped columns are the contract fields declaring a wrap behavior.
    #[must_use]
    pub fn from_contract(contract: &Contract) -> Self {
        let wrap_columns = contract
            .fields
            .iter()
            .filter(|f| f.constraints.wrap_behavior.is_some())
            .map(|f| f.name.clone())
            .collect();
        Self::new(
            contract.standardization.target_rate_hz,
            contract.standardization.max_gap_seconds,
            wrap_columns,
        )
    }

    /// Override the target rate (experiments only; the contract rate is
    /// the standard).
    #[must_use]
    pub fn with_rate(mut self, rate_hz: u32) -> Self {
        self.rate_hz = rate_hz;
        self
    }

    /// The target rate in Hz.
    #[must_use]
    pub fn rate_hz(&self) -> u32 {
        self.rate_hz
    }

    /// Resample one trip table onto the uniform grid.
    ///
    /// Rows with missing or unparseable cells in the timestamp or any
    /// numeric column are dropped before gridding. The output keeps the
    /// input's column order; trips spanning no time resample to an empty
    /// table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SchemaViolation`] when the timestamp column is
    /// absent.
    pub fn resample(&self, table: &Table, timestamp_column: &str, path: &Path) -> Result<Table> {
        if !table.has_column(timestamp_column) {
            return Err(Error::schema(
                path,
                format!("missing required field(s): {timestamp_column}"),
            ));
        }

        // Classify every other column once: numeric ones interpolate,
        // the rest forward-fill.
        let numeric_columns: Vec<&String> = table
            .columns()
            .iter()
            .filter(|c| c.as_str() != timestamp_column && table.is_numeric_column(c))
            .collect();
        let categorical_columns: Vec<&String> = table
            .columns()
            .iter()
            .filter(|c| {
                c.as_str() != timestamp_column && !numeric_columns.contains(c)
            })
            .collect();

        let trip = CleanTrip::extract(table, timestamp_column, &numeric_columns, &categorical_columns);
        let mut out = Table::new(table.columns().to_vec());
        let Some(trip) = trip else {
            debug!(table = %path.display(), "trip spans no time; emitting empty table");
            return Ok(out);
        };

        // Pre-compute interpolation series; wrapped columns interpolate in
        // unwrapped space and wrap back per grid point.
        let series: Vec<(usize, Vec<f64>, bool)> = numeric_columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let wrapped = self.wrap_columns.iter().any(|w| w == *column);
                let values = if wrapped {
                    unwrap_degrees(&trip.numeric[i])
                } else {
                    trip.numeric[i].clone()
                };
                (i, values, wrapped)
            })
            .collect();

        let t0 = trip.times[0];
        let t_last = *trip.times.last().expect("non-empty by construction");
        let mut segment = 0usize;
        let mut dropped = 0usize;
        for k in 0u32.. {
            let t = t0 + f64::from(k) / f64::from(self.rate_hz);
            if t > t_last + TIME_EPSILON {
                break;
            }

            while segment + 1 < trip.times.len() && trip.times[segment + 1] <= t + TIME_EPSILON {
                segment += 1;
            }
            if !self.grid_point_valid(t, &trip.times, segment) {
                dropped += 1;
                continue;
            }

            let mut row = vec![String::new(); table.columns().len()];
            row[trip.timestamp_slot] = format_number(t);
            for (i, values, wrapped) in &series {
                let value = interpolate(t, &trip.times, values, segment);
                let value = if *wrapped { wrap_degrees(value) } else { value };
                row[trip.numeric_slots[*i]] = format_number(value);
            }
            for (i, slot) in trip.categorical_slots.iter().enumerate() {
                row[*slot] = trip.categorical[i][segment].clone();
            }
            out.push_row(row)?;
        }

        if dropped > 0 {
            debug!(
                table = %path.display(),
                dropped,
                max_gap_seconds = self.max_gap_seconds,
                "grid points dropped inside invalid windows"
            );
        }
        Ok(out)
    }

    /// A grid point is valid iff some adjacent raw pair spanning it stays
    /// within the gap bound. A point coinciding with a raw sample at the
    /// edge of a wide gap survives through its other neighbor.
    fn grid_point_valid(&self, t: f64, times: &[f64], segment: usize) -> bool {
        let bound = self.max_gap_seconds + TIME_EPSILON;
        if segment + 1 < times.len() && times[segment + 1] - times[segment] <= bound {
            return true;
        }
        segment > 0
            && (t - times[segment]).abs() <= TIME_EPSILON
            && times[segment] - times[segment - 1] <= bound
    }
}

/// A trip reduced to parsed, time-sorted arrays.
#[derive(Debug)]
struct CleanTrip {
    times: Vec<f64>,
    numeric: Vec<Vec<f64>>,
    categorical: Vec<Vec<String>>,
    timestamp_slot: usize,
    numeric_slots: Vec<usize>,
    categorical_slots: Vec<usize>,
}

impl CleanTrip {
    /// Parse and sort the usable rows; `None` if the trip spans no time.
    fn extract(
        table: &Table,
        timestamp_column: &str,
        numeric_columns: &[&String],
        categorical_columns: &[&String],
    ) -> Option<Self> {
        let timestamp_slot = table.column_index(timestamp_column)?;
        let numeric_slots: Vec<usize> = numeric_columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();
        let categorical_slots: Vec<usize> = categorical_columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();

        let mut rows: Vec<(f64, Vec<f64>, Vec<String>)> = Vec::new();
        'rows: for cells in table.rows() {
            let Some(t) = parse_cell(&cells[timestamp_slot]) else {
                continue;
            };
            let mut numeric_row = Vec::with_capacity(numeric_slots.len());
            for slot in &numeric_slots {
                match parse_cell(&cells[*slot]) {
                    Some(v) => numeric_row.push(v),
                    None => continue 'rows,
                }
            }
            let categorical_row = categorical_slots
                .iter()
                .map(|slot| cells[*slot].clone())
                .collect();
            rows.push((t, numeric_row, categorical_row));
        }

        rows.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let first = rows.first()?.0;
        let last = rows.last()?.0;
        if last <= first {
            return None;
        }

        let mut times = Vec::with_capacity(rows.len());
        let mut numeric = vec![Vec::with_capacity(rows.len()); numeric_slots.len()];
        let mut categorical = vec![Vec::with_capacity(rows.len()); categorical_slots.len()];
        for (t, numeric_row, categorical_row) in rows {
            times.push(t);
            for (i, v) in numeric_row.into_iter().enumerate() {
                numeric[i].push(v);
            }
            for (i, v) in categorical_row.into_iter().enumerate() {
                categorical[i].push(v);
            }
        }

        Some(Self {
            times,
            numeric,
            categorical,
            timestamp_slot,
            numeric_slots,
            categorical_slots,
        })
    }
}

/// Linear interpolation at `t` within the segment starting at `segment`.
fn interpolate(t: f64, times: &[f64], values: &[f64], segment: usize) -> f64 {
    if segment + 1 >= times.len() {
        return values[segment];
    }
    let (t0, t1) = (times[segment], times[segment + 1]);
    let span = t1 - t0;
    if span <= TIME_EPSILON {
        return values[segment];
    }
    let fraction = (t - t0) / span;
    values[segment] + (values[segment + 1] - values[segment]) * fraction
}

/// Unwrap a degree sequence into a continuous series.
///
/// Each successive delta is folded into (-180, 180] so interpolation never
/// crosses the 0/360 seam the long way round.
#[must_use]
pub fn unwrap_degrees(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut offset = 0.0;
    for (i, &value) in values.iter().enumerate() {
        if i == 0 {
            out.push(value);
            continue;
        }
        let previous = out[i - 1];
        let mut delta = value + offset - previous;
        while delta > 180.0 {
            offset -= 360.0;
            delta -= 360.0;
        }
        while delta <= -180.0 {
            offset += 360.0;
            delta += 360.0;
        }
        out.push(value + offset);
    }
    out
}

/// Wrap a degree value back into [0, 360).
#[must_use]
pub fn wrap_degrees(value: f64) -> f64 {
    value.rem_euclid(360.0)
}
