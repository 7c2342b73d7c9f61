//! Functionality related to the `wesqc check` command itself.

use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use clap::Args;
use prettytable::row;
use prettytable::Table;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::check::manifest;
use crate::resources::ResourceBundle;
use crate::resources::ResourceKind;
use crate::resources::Resolution;

//========================//
// Command-line arguments //
//========================//

/// Command line arguments for `wesqc check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// BAM or CRAM file to check for.
    #[arg(value_name = "BAM/CRAM")]
    alignment: Option<PathBuf>,

    /// Target-capture regions.
    #[arg(short = 'b', long, value_name = "PATH")]
    regions: Option<PathBuf>,

    /// Reference FASTA.
    #[arg(short = 'r', long = "reference", value_name = "PATH")]
    reference_fasta: Option<PathBuf>,

    /// Directory holding the VerifyBamID2 resource bundle.
    #[arg(long, value_name = "PATH", default_value = "data/references/verifybamid2")]
    resource_dir: PathBuf,

    /// Marker resolution of the resource bundle.
    #[arg(long, value_enum, default_value_t = Resolution::HundredK)]
    resolution: Resolution,

    /// An `md5sum`-style manifest to verify.
    #[arg(long = "md5", value_name = "PATH")]
    md5_manifest: Option<PathBuf>,
}

//==========//
// Findings //
//==========//

/// One file the check looked at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    /// What the file is.
    pub item: String,

    /// Where it was looked for.
    pub path: PathBuf,

    /// Whether the file exists.
    pub present: bool,

    /// Whether its absence prevents a run.
    pub required: bool,
}

impl Finding {
    fn new<S: Into<String>>(item: S, path: &Path, required: bool) -> Self {
        Finding {
            item: item.into(),
            path: path.to_path_buf(),
            present: path.exists(),
            required,
        }
    }

    /// Whether this counts as a problem.
    pub fn is_problem(&self) -> bool {
        self.required && !self.present
    }

    fn status(&self) -> &'static str {
        match (self.present, self.required) {
            (true, _) => "present",
            (false, true) => "MISSING",
            (false, false) => "missing (optional)",
        }
    }
}

/// Looks for the inputs named on the command line and every file of the
/// selected resource bundle. The V matrix is optional.
pub fn presence(args: &CheckArgs) -> Vec<Finding> {
    let mut findings = Vec::new();

    let inputs = [
        ("alignment file", &args.alignment),
        ("region set", &args.regions),
        ("reference FASTA", &args.reference_fasta),
    ];
    for (item, path) in inputs {
        if let Some(path) = path {
            findings.push(Finding::new(item, path, true));
        }
    }

    let bundle = ResourceBundle::new(&args.resource_dir, args.resolution);
    for kind in ResourceKind::all() {
        findings.push(Finding::new(
            format!("{} resource ({})", bundle.resolution(), kind),
            &bundle.path(kind),
            kind.is_required(),
        ));
    }

    findings
}

//==============//
// Main command //
//==============//

/// Main method for the `wesqc check` subcommand.
pub fn check(args: CheckArgs) -> anyhow::Result<()> {
    info!("Starting check command...");
    debug!("Arguments: {:?}", args);

    let findings = presence(&args);
    let mut problems = findings.iter().filter(|f| f.is_problem()).count();

    let mut table = Table::new();
    table.add_row(row!["Item", "Path", "Status"]);
    for finding in &findings {
        table.add_row(row![
            finding.item,
            finding.path.display(),
            finding.status()
        ]);
    }

    table.printstd();

    if let Some(path) = &args.md5_manifest {
        let mut checksums = Table::new();
        checksums.add_row(row!["Path", "Expected MD5", "Result"]);

        for entry in manifest::read(path)? {
            let verification = manifest::verify(&entry)?;
            if verification.is_problem() {
                warn!(
                    "  [*] {}: {}",
                    entry.path.display(),
                    verification
                );
                problems += 1;
            }

            checksums.add_row(row![entry.path.display(), entry.digest, verification]);
        }

        println!();
        checksums.printstd();
    }

    if problems > 0 {
        bail!("{} problem(s) found", problems);
    }

    info!("All checks passed.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn args(dir: &Path) -> CheckArgs {
        CheckArgs {
            alignment: Some(dir.join("NA06994.cram")),
            regions: Some(dir.join("targets.bed")),
            reference_fasta: None,
            resource_dir: dir.join("resources"),
            resolution: Resolution::TenK,
            md5_manifest: None,
        }
    }

    fn provision(dir: &Path, kinds: &[ResourceKind]) {
        fs::create_dir_all(dir.join("resources")).unwrap();
        for kind in kinds {
            let name = ResourceBundle::file_name(Resolution::TenK, *kind);
            fs::write(dir.join("resources").join(name), b"").unwrap();
        }
    }

    #[test]
    pub fn test_presence_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NA06994.cram"), b"").unwrap();
        provision(dir.path(), &[ResourceKind::Ud, ResourceKind::Bed]);

        let findings = presence(&args(dir.path()));
        let problems: Vec<&str> = findings
            .iter()
            .filter(|f| f.is_problem())
            .map(|f| f.item.as_str())
            .collect();

        assert_eq!(problems, vec!["region set", "10k resource (mu)"]);
        assert!(findings
            .iter()
            .any(|f| f.item == "10k resource (V)" && !f.required));
    }

    #[test]
    pub fn test_check_passes_with_everything_in_place() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NA06994.cram"), b"").unwrap();
        fs::write(dir.path().join("targets.bed"), b"").unwrap();
        provision(dir.path(), &ResourceKind::all());

        let manifest = dir.path().join("inputs.md5");
        fs::write(
            &manifest,
            "d41d8cd98f00b204e9800998ecf8427e  NA06994.cram\n",
        )
        .unwrap();

        let mut args = args(dir.path());
        args.md5_manifest = Some(manifest);

        check(args).unwrap();
    }

    #[test]
    pub fn test_check_fails_on_checksum_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("NA06994.cram"), b"not empty").unwrap();
        fs::write(dir.path().join("targets.bed"), b"").unwrap();
        provision(dir.path(), &ResourceKind::all());

        let manifest = dir.path().join("inputs.md5");
        fs::write(
            &manifest,
            "d41d8cd98f00b204e9800998ecf8427e  NA06994.cram\n",
        )
        .unwrap();

        let mut args = args(dir.path());
        args.md5_manifest = Some(manifest);

        let err = check(args).unwrap_err();
        assert_eq!(err.to_string(), "1 problem(s) found");
    }
}
