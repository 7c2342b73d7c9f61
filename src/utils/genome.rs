//! Utilities related to the reference genome.
//!
//! Sex inference measures depth over the whole of chrX and chrY. Rather than
//! reading the sequence dictionary of the reference FASTA, the pipeline uses
//! the fixed GRCh38 chromosome lengths below.

use std::fmt;

use crate::formats::bed::Interval;
use crate::formats::bed::RegionSet;

/// The name of the reference genome the lengths below belong to.
pub const REFERENCE_GENOME: &str = "GRCh38";

/// A sex chromosome of the reference genome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SexChromosome {
    /// chrX.
    X,

    /// chrY.
    Y,
}

impl SexChromosome {
    /// Both sex chromosomes, X first.
    pub fn all() -> [SexChromosome; 2] {
        [SexChromosome::X, SexChromosome::Y]
    }

    /// The sequence name in the reference.
    pub fn name(&self) -> &'static str {
        match self {
            Self::X => "chrX",
            Self::Y => "chrY",
        }
    }

    /// The GRCh38 length in base pairs.
    pub fn length(&self) -> u64 {
        match self {
            Self::X => 156_040_895,
            Self::Y => 57_227_415,
        }
    }

    /// A region set made of the single interval spanning the chromosome.
    pub fn region_set(&self) -> RegionSet {
        RegionSet::from(vec![Interval {
            chrom: String::from(self.name()),
            start: 0,
            end: self.length(),
        }])
    }
}

impl fmt::Display for SexChromosome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_sex_chromosome_region_sets_span_the_chromosome() {
        let x = SexChromosome::X.region_set();
        assert_eq!(x.len(), 1);
        assert_eq!(x.total_bases(), 156_040_895);

        let y = SexChromosome::Y.region_set();
        assert_eq!(y.intervals()[0].chrom, "chrY");
        assert_eq!(y.total_bases(), 57_227_415);
    }
}
