//! The VerifyBamID2 resource bundle: the population-reference matrices the
//! contamination estimator needs, published at two marker resolutions.
//!
//! Files are named `1000g.phase3.<resolution>.b38.vcf.gz.dat.<kind>` and are
//! expected to already be present in the resource directory. Nothing here
//! downloads them.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

//============//
// Resolution //
//============//

/// The number of markers in a resource bundle.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Resolution {
    /// Roughly 10,000 markers. Faster, less precise.
    #[value(name = "10k")]
    #[serde(rename = "10k")]
    TenK,

    /// Roughly 100,000 markers.
    #[default]
    #[value(name = "100k")]
    #[serde(rename = "100k")]
    HundredK,
}

impl Resolution {
    /// Every supported resolution.
    pub fn all() -> [Resolution; 2] {
        [Resolution::TenK, Resolution::HundredK]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenK => write!(f, "10k"),
            Self::HundredK => write!(f, "100k"),
        }
    }
}

//===========//
// File kind //
//===========//

/// One of the four files making up a bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// The basis-U matrix (`.UD`).
    Ud,

    /// The basis-V matrix (`.V`).
    V,

    /// The marker sites (`.bed`).
    Bed,

    /// The per-site means (`.mu`).
    Mu,
}

impl ResourceKind {
    /// Every file kind, in the order they are listed to the user.
    pub fn all() -> [ResourceKind; 4] {
        [
            ResourceKind::Ud,
            ResourceKind::V,
            ResourceKind::Bed,
            ResourceKind::Mu,
        ]
    }

    /// The suffix appended to the bundle prefix.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Ud => "UD",
            Self::V => "V",
            Self::Bed => "bed",
            Self::Mu => "mu",
        }
    }

    /// The files both invocation forms of VerifyBamID2 rely on. The V matrix
    /// is only read through the SVD prefix, so the fallback can run without it.
    pub fn is_required(&self) -> bool {
        !matches!(self, Self::V)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

//========//
// Bundle //
//========//

/// A resource bundle of a given resolution rooted at a directory.
#[derive(Clone, Debug)]
pub struct ResourceBundle {
    directory: PathBuf,
    resolution: Resolution,
}

impl ResourceBundle {
    /// Creates a new [`ResourceBundle`].
    pub fn new<P: Into<PathBuf>>(directory: P, resolution: Resolution) -> Self {
        ResourceBundle {
            directory: directory.into(),
            resolution,
        }
    }

    /// Gets the resolution of the bundle.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Gets the directory the bundle lives in.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The common file name prefix shared by the four files.
    pub fn file_prefix(resolution: Resolution) -> String {
        format!("1000g.phase3.{}.b38.vcf.gz.dat", resolution)
    }

    /// The file name of one member of a bundle.
    pub fn file_name(resolution: Resolution, kind: ResourceKind) -> String {
        format!("{}.{}", Self::file_prefix(resolution), kind.suffix())
    }

    /// The combined prefix passed as `--SVDPrefix`.
    pub fn svd_prefix(&self) -> PathBuf {
        self.directory.join(Self::file_prefix(self.resolution))
    }

    /// The full path of one member of the bundle.
    pub fn path(&self, kind: ResourceKind) -> PathBuf {
        self.directory.join(Self::file_name(self.resolution, kind))
    }

    /// The members of the bundle that are not on disk.
    pub fn missing(&self) -> Vec<(ResourceKind, PathBuf)> {
        ResourceKind::all()
            .into_iter()
            .map(|kind| (kind, self.path(kind)))
            .filter(|(_, path)| !path.exists())
            .collect()
    }

    /// The required members of the bundle that are not on disk.
    pub fn missing_required(&self) -> Vec<PathBuf> {
        self.missing()
            .into_iter()
            .filter(|(kind, _)| kind.is_required())
            .map(|(_, path)| path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    pub fn test_file_names() {
        assert_eq!(
            ResourceBundle::file_name(Resolution::HundredK, ResourceKind::Ud),
            "1000g.phase3.100k.b38.vcf.gz.dat.UD"
        );
        assert_eq!(
            ResourceBundle::file_name(Resolution::TenK, ResourceKind::Mu),
            "1000g.phase3.10k.b38.vcf.gz.dat.mu"
        );

        let bundle = ResourceBundle::new("refs", Resolution::TenK);
        assert_eq!(
            bundle.svd_prefix(),
            PathBuf::from("refs/1000g.phase3.10k.b38.vcf.gz.dat")
        );
    }

    #[test]
    pub fn test_missing_v_matrix_is_not_required() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = ResourceBundle::new(dir.path(), Resolution::HundredK);

        assert_eq!(bundle.missing().len(), 4);
        assert_eq!(bundle.missing_required().len(), 3);

        for kind in [ResourceKind::Ud, ResourceKind::Bed, ResourceKind::Mu] {
            File::create(bundle.path(kind)).unwrap();
        }

        assert_eq!(bundle.missing(), vec![(ResourceKind::V, bundle.path(ResourceKind::V))]);
        assert!(bundle.missing_required().is_empty());
    }
}
