//! MD5 manifests in the format written by `md5sum`.
//!
//! Each line holds a 32-digit hex digest, whitespace, and a file name,
//! optionally prefixed by `*` (binary mode). Relative file names are resolved
//! against the directory holding the manifest.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use md5::Digest;
use md5::Md5;

const CHUNK_SIZE: usize = 4096;

/// One line of a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The expected lowercase hex digest.
    pub digest: String,

    /// The file the digest belongs to.
    pub path: PathBuf,
}

/// The result of checking a [`ManifestEntry`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    /// The digest matched.
    Valid,

    /// The digest did not match.
    Mismatch {
        /// The digest actually computed.
        actual: String,
    },

    /// The file does not exist.
    Missing,
}

impl Verification {
    /// Whether this counts as a problem.
    pub fn is_problem(&self) -> bool {
        !matches!(self, Verification::Valid)
    }
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verification::Valid => write!(f, "valid"),
            Verification::Mismatch { actual } => write!(f, "mismatch (got {})", actual),
            Verification::Missing => write!(f, "missing"),
        }
    }
}

/// Parses a manifest. Blank lines and `#` comments are ignored.
pub fn parse<R: BufRead>(reader: R, base: &Path) -> anyhow::Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    for (i, result) in reader.lines().enumerate() {
        let line = result?;
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (digest, name) = match line.split_once(char::is_whitespace) {
            Some((digest, name)) => (digest, name.trim_start()),
            None => bail!("manifest line {} has no file name", i + 1),
        };

        if digest.len() != 32 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            bail!("manifest line {} has an invalid MD5 digest: {}", i + 1, digest);
        }

        let name = name.strip_prefix('*').unwrap_or(name);
        entries.push(ManifestEntry {
            digest: digest.to_ascii_lowercase(),
            path: base.join(name),
        });
    }

    Ok(entries)
}

/// Reads the manifest at `path`.
pub fn read<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<ManifestEntry>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening manifest: {}", path.display()))?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    parse(BufReader::new(file), base)
        .with_context(|| format!("reading manifest: {}", path.display()))
}

/// Computes the lowercase hex MD5 digest of everything `reader` yields.
pub fn md5_digest<R: Read>(mut reader: R) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        match reader.read(&mut buffer)? {
            0 => break,
            n => hasher.update(&buffer[..n]),
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Checks one entry against the file on disk.
pub fn verify(entry: &ManifestEntry) -> anyhow::Result<Verification> {
    let file = match File::open(&entry.path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Verification::Missing),
        Err(e) => {
            return Err(e).with_context(|| format!("opening {}", entry.path.display()));
        }
    };

    let actual = md5_digest(BufReader::new(file))
        .with_context(|| format!("reading {}", entry.path.display()))?;

    if actual == entry.digest {
        Ok(Verification::Valid)
    } else {
        Ok(Verification::Mismatch { actual })
    }
}
