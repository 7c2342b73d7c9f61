//! Region sets stored as BED files (0-based, half-open intervals).

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

use crate::qc::metrics::MetricsError;

/// A single genomic interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    /// The reference sequence name.
    pub chrom: String,

    /// The 0-based start position (inclusive).
    pub start: u64,

    /// The 0-based end position (exclusive).
    pub end: u64,
}

impl Interval {
    /// Creates a new [`Interval`], ensuring that `start < end`.
    pub fn try_new<C: Into<String>>(chrom: C, start: u64, end: u64) -> Result<Self, String> {
        if end <= start {
            return Err(format!("end ({}) must be greater than start ({})", end, start));
        }

        Ok(Interval {
            chrom: chrom.into(),
            start,
            end,
        })
    }

    /// The number of bases covered by the interval.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the interval covers no bases. Always false for intervals built
    /// through [`Interval::try_new`].
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// An ordered list of intervals over which depth is measured.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegionSet {
    intervals: Vec<Interval>,
}

impl From<Vec<Interval>> for RegionSet {
    fn from(intervals: Vec<Interval>) -> Self {
        RegionSet { intervals }
    }
}

impl RegionSet {
    /// Parses a region set from BED-formatted text. Blank lines and `#`,
    /// `track` or `browser` header lines are ignored; anything else must
    /// have at least three columns with `start < end`.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MetricsError> {
        let mut intervals = Vec::new();

        for (i, result) in reader.lines().enumerate() {
            let line = result?;
            let line_no = i + 1;

            if is_header(&line) {
                continue;
            }

            let mut fields = line.split('\t');
            let (chrom, start, end) = match (fields.next(), fields.next(), fields.next()) {
                (Some(c), Some(s), Some(e)) => (c, s, e),
                _ => {
                    return Err(MetricsError::MalformedRegion {
                        line: line_no,
                        reason: String::from("expected at least three tab-separated columns"),
                    })
                }
            };

            let start = parse_bound(start, line_no)?;
            let end = parse_bound(end, line_no)?;

            let interval = Interval::try_new(chrom, start, end).map_err(|reason| {
                MetricsError::MalformedRegion {
                    line: line_no,
                    reason,
                }
            })?;

            intervals.push(interval);
        }

        Ok(RegionSet { intervals })
    }

    /// Reads a region set from a (possibly gzipped) BED file.
    pub fn read<P: AsRef<Path>>(src: P) -> Result<Self, MetricsError> {
        let reader = crate::formats::open(src)?;
        Self::from_reader(reader)
    }

    /// Writes the region set as a three-column BED file.
    pub fn write<P: AsRef<Path>>(&self, dst: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(dst)?);

        for interval in &self.intervals {
            writeln!(
                writer,
                "{}\t{}\t{}",
                interval.chrom, interval.start, interval.end
            )?;
        }

        writer.flush()
    }

    /// The intervals, in file order.
    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// The number of intervals.
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the region set has no intervals.
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The summed length of every interval.
    pub fn total_bases(&self) -> u64 {
        self.intervals.iter().map(Interval::len).sum()
    }
}

fn is_header(line: &str) -> bool {
    let line = line.trim();
    line.is_empty()
        || line.starts_with('#')
        || line.starts_with("track")
        || line.starts_with("browser")
}

fn parse_bound(raw: &str, line: usize) -> Result<u64, MetricsError> {
    raw.trim()
        .parse()
        .map_err(|_| MetricsError::MalformedRegion {
            line,
            reason: format!("'{}' is not a valid coordinate", raw),
        })
}
