//! Extensions to and utilities concerning [`PathBuf`]s.
//!
//! # Overview
//!
//! The external tools driven by `wesqc` name their outputs by gluing a fixed
//! suffix onto an output prefix (`results/NA06994` becomes
//! `results/NA06994.mosdepth.summary.txt`), and index files are named by
//! adding one more extension to the indexed file. [`PathBuf`] handles
//! neither directly, so this module provides both.
//!
//! ```
//! use std::path::PathBuf;
//! // Traits must be in scope to use them.
//! use wesqc::utils::pathbuf::AppendSuffix;
//!
//! assert_eq!(
//!     PathBuf::from("results/NA06994").append_suffix(".mosdepth.summary.txt"),
//!     PathBuf::from("results/NA06994.mosdepth.summary.txt"))
//! ```

use std::ffi::OsStr;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;

/// A trait that adds an [`append_suffix`][AppendSuffix::append_suffix]
/// method to paths, appending text to the final component verbatim.
pub trait AppendSuffix {
    /// Appends `suffix` to the last component of the path.
    fn append_suffix<S>(&self, suffix: S) -> PathBuf
    where
        S: AsRef<OsStr>;
}

impl AppendSuffix for Path {
    fn append_suffix<S>(&self, suffix: S) -> PathBuf
    where
        S: AsRef<OsStr>,
    {
        let mut path = self.as_os_str().to_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }
}

/// Derives index paths (`.bam.bai`, `.cram.crai`) from an alignment path.
pub trait AppendExtension {
    /// Adds `ext` after the existing extension. Fails when the path has no
    /// extension.
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use wesqc::utils::pathbuf::AppendExtension;
    ///
    /// let bam = PathBuf::from("results/NA06994.bam");
    /// let bai = bam.append_extension("bai").unwrap();
    /// assert_eq!(bai.file_name().unwrap(), "NA06994.bam.bai");
    /// ```
    fn append_extension<P>(self, ext: P) -> anyhow::Result<Self>
    where
        Self: Sized,
        P: AsRef<OsStr>;
}

impl AppendExtension for PathBuf {
    fn append_extension<P>(mut self, ext: P) -> anyhow::Result<Self>
    where
        P: AsRef<OsStr>,
    {
        let mut new_ext = match self.extension() {
            Some(ext) => ext.to_os_string(),
            None => bail!("path did not have an extension: {}", self.display()),
        };

        new_ext.push(".");
        new_ext.push(ext);

        self.set_extension(new_ext);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_append_suffix_to_prefix_without_extension() {
        let prefix = PathBuf::from("results/NA06994");
        assert_eq!(
            prefix.append_suffix(".thresholds.bed.gz"),
            PathBuf::from("results/NA06994.thresholds.bed.gz")
        );
    }

    #[test]
    pub fn test_append_extension_requires_an_extension() {
        assert_eq!(
            PathBuf::from("sample.cram").append_extension("crai").unwrap(),
            PathBuf::from("sample.cram.crai")
        );
        assert!(PathBuf::from("sample").append_extension("bai").is_err());
        assert_eq!(
            PathBuf::from("data/NA06994.alt_bwamem_GRCh38DH.exome.cram")
                .append_extension("crai")
                .unwrap(),
            PathBuf::from("data/NA06994.alt_bwamem_GRCh38DH.exome.cram.crai")
        );
    }
}
