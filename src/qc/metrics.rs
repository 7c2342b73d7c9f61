//! Parsers for the text outputs of mosdepth and VerifyBamID2.
//!
//! Each parser comes in two forms: one over any [`BufRead`] (used directly
//! in tests) and a `read_*` wrapper that opens the file on disk.

use std::io;
use std::io::BufRead;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::formats::bed::RegionSet;

/// Label of the mosdepth summary row aggregating every region.
pub const TOTAL_REGION_LABEL: &str = "total_region";

/// Column of the mean depth in a mosdepth summary row.
pub const MEAN_DEPTH_COLUMN: usize = 3;

/// Columns of the 10× and 30× counts in a thresholds table produced with
/// `--thresholds 1,10,30`, used when the header is absent.
pub const DEFAULT_THRESHOLD_COLUMNS: (usize, usize) = (5, 6);

/// Column of FREEMIX in a `.selfSM` table whose header does not name it.
pub const FREEMIX_COLUMN: usize = 6;

/// Failures raised while parsing tool outputs and region sets.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A region set line is unusable.
    #[error("malformed region on line {line}: {reason}")]
    MalformedRegion {
        /// The 1-based line number.
        line: usize,

        /// What is wrong with it.
        reason: String,
    },

    /// The `total_region` row of a depth summary is unusable.
    #[error("malformed depth summary on line {line}: {reason}")]
    MalformedSummary {
        /// The 1-based line number.
        line: usize,

        /// What is wrong with it.
        reason: String,
    },

    /// A percentage was requested against an empty footprint.
    #[error("cannot compute coverage percentages over zero bases")]
    DivisionByZero,

    /// A contamination result table is unusable.
    #[error("malformed contamination result: {0}")]
    MalformedResult(String),

    /// The file could not be read.
    #[error(transparent)]
    Io(#[from] io::Error),
}

//============//
// Mean depth //
//============//

/// Finds the `total_region` row of a mosdepth summary and returns its mean
/// depth. Returns 0.0 when the row is absent: no coverage was observed.
pub fn parse_mean_depth<R: BufRead>(summary: R) -> Result<f64, MetricsError> {
    for (i, result) in summary.lines().enumerate() {
        let line = result?;
        let mut fields = line.split_whitespace();

        if fields.next() != Some(TOTAL_REGION_LABEL) {
            continue;
        }

        let raw = fields.nth(MEAN_DEPTH_COLUMN - 1).ok_or_else(|| {
            MetricsError::MalformedSummary {
                line: i + 1,
                reason: String::from("missing mean depth column"),
            }
        })?;

        return raw.parse().map_err(|_| MetricsError::MalformedSummary {
            line: i + 1,
            reason: format!("'{}' is not a valid mean depth", raw),
        });
    }

    debug!("No {} row found in depth summary.", TOTAL_REGION_LABEL);
    Ok(0.0)
}

/// Reads the mean depth from a mosdepth summary file.
pub fn read_mean_depth<P: AsRef<Path>>(src: P) -> Result<f64, MetricsError> {
    parse_mean_depth(crate::formats::open(src)?)
}

//==================//
// Region set bases //
//==================//

/// Sums `end - start` over a BED file, failing on the first malformed line.
pub fn sum_region_bases<R: BufRead>(region_set: R) -> Result<u64, MetricsError> {
    Ok(RegionSet::from_reader(region_set)?.total_bases())
}

//=======================//
// Threshold percentages //
//=======================//

/// Percent of the target footprint reaching 10× and 30×.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdPercentages {
    /// Percent of bases at or above 10×.
    pub pct_at_10x: f64,

    /// Percent of bases at or above 30×.
    pub pct_at_30x: f64,

    /// Data rows that were ignored because they were short or non-numeric.
    pub skipped_rows: usize,
}

/// Accumulates the 10× and 30× covered-base counts of a mosdepth thresholds
/// table and expresses them as percentages of `total_bases`. Malformed rows
/// are skipped and counted rather than failing the computation, so the
/// percentages under-count when rows are skipped.
pub fn compute_threshold_percentages<R: BufRead>(
    threshold_table: R,
    total_bases: u64,
) -> Result<ThresholdPercentages, MetricsError> {
    if total_bases == 0 {
        return Err(MetricsError::DivisionByZero);
    }

    let (mut col10, mut col30) = DEFAULT_THRESHOLD_COLUMNS;
    let mut covered10: u64 = 0;
    let mut covered30: u64 = 0;
    let mut skipped_rows = 0;

    for result in threshold_table.lines() {
        let line = result?;

        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with('#') {
            let header: Vec<&str> = line.split('\t').collect();
            if let (Some(a), Some(b)) = (
                header.iter().position(|h| h.eq_ignore_ascii_case("10X")),
                header.iter().position(|h| h.eq_ignore_ascii_case("30X")),
            ) {
                col10 = a;
                col30 = b;
            }
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let parsed = match (fields.get(col10), fields.get(col30)) {
            (Some(a), Some(b)) => a.trim().parse::<u64>().ok().zip(b.trim().parse::<u64>().ok()),
            _ => None,
        };

        match parsed {
            Some((a, b)) => {
                covered10 += a;
                covered30 += b;
            }
            None => skipped_rows += 1,
        }
    }

    Ok(ThresholdPercentages {
        pct_at_10x: percentage(covered10, total_bases),
        pct_at_30x: percentage(covered30, total_bases),
        skipped_rows,
    })
}

/// Computes threshold percentages from a (gzipped) thresholds table on disk.
pub fn read_threshold_percentages<P: AsRef<Path>>(
    src: P,
    total_bases: u64,
) -> Result<ThresholdPercentages, MetricsError> {
    compute_threshold_percentages(crate::formats::open(src)?, total_bases)
}

fn percentage(covered: u64, total: u64) -> f64 {
    (covered as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

//=========//
// FREEMIX //
//=========//

/// Extracts FREEMIX from the data row of a `.selfSM` table.
pub fn parse_contamination_table<R: BufRead>(result_table: R) -> Result<f64, MetricsError> {
    let mut rows = Vec::new();
    for result in result_table.lines() {
        let line = result?;
        if !line.trim().is_empty() {
            rows.push(line);
        }
    }

    if rows.len() < 2 {
        return Err(MetricsError::MalformedResult(format!(
            "expected a header and a data row, found {} row(s)",
            rows.len()
        )));
    }

    let column = rows[0]
        .split('\t')
        .position(|h| h.trim() == "FREEMIX")
        .unwrap_or(FREEMIX_COLUMN);

    let raw = rows[1].split('\t').nth(column).ok_or_else(|| {
        MetricsError::MalformedResult(format!("data row has no column {}", column))
    })?;

    raw.trim()
        .parse()
        .map_err(|_| MetricsError::MalformedResult(format!("'{}' is not a valid FREEMIX", raw)))
}

/// Reads FREEMIX from a `.selfSM` file. A file that does not exist yields
/// NaN; a file that exists but cannot be parsed is an error.
pub fn parse_contamination_result<P: AsRef<Path>>(src: P) -> Result<f64, MetricsError> {
    let path = src.as_ref();

    if !path.exists() {
        debug!("No contamination result at {}.", path.display());
        return Ok(f64::NAN);
    }

    parse_contamination_table(crate::formats::open(path)?)
}
