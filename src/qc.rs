//! The QC pipeline: its stages, the parsers they rely on, and the
//! orchestrator tying them together.

pub mod command;
pub mod contamination;
pub mod coverage;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod sex;

#[cfg(test)]
pub mod testing {
    //! Scratch inputs and fake tool outputs shared by the stage tests.

    use std::fs;
    use std::fs::File;
    use std::io;
    use std::io::Write;
    use std::path::Path;
    use std::path::PathBuf;

    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    use crate::config::PipelineConfig;
    use crate::resources::ResourceKind;
    use crate::tools::mosdepth;
    use crate::tools::testing::failed;
    use crate::tools::testing::succeeded;
    use crate::tools::verifybamid;
    use crate::tools::Invocation;
    use crate::tools::ToolOutput;
    use crate::utils::pathbuf::AppendSuffix;

    /// Target regions written by [`Sandbox`]: two 100 bp intervals.
    pub const TARGETS: &str = "chr1\t0\t100\nchr1\t100\t200\n";

    /// A temporary directory holding the inputs of a run and its config.
    pub struct Sandbox {
        pub dir: TempDir,
        pub config: PipelineConfig,
    }

    impl Sandbox {
        pub fn new() -> Self {
            Self::with_alignment("NA06994.bam")
        }

        pub fn with_alignment(name: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();

            let alignment = root.join(name);
            fs::write(&alignment, b"").unwrap();

            let regions = root.join("targets.bed");
            fs::write(&regions, TARGETS).unwrap();

            let reference = root.join("ref.fa");
            fs::write(&reference, ">chr1\nACGT\n").unwrap();

            let results = root.join("results");
            fs::create_dir_all(&results).unwrap();

            let mut config = PipelineConfig::new(alignment, regions, reference, results);
            config.resource_dir = root.join("resources");
            fs::create_dir_all(&config.resource_dir).unwrap();

            Sandbox { dir, config }
        }

        pub fn provision(&self, kinds: &[ResourceKind]) {
            let bundle = self.config.resource_bundle();
            for kind in kinds {
                fs::write(bundle.path(*kind), b"").unwrap();
            }
        }

        pub fn provision_all(&self) {
            self.provision(&ResourceKind::all());
        }
    }

    /// The output prefix of a mosdepth invocation.
    pub fn prefix_of(invocation: &Invocation) -> PathBuf {
        let args = invocation.args();
        PathBuf::from(&args[args.len() - 2])
    }

    pub fn write_summary(prefix: &Path, mean: f64) {
        let summary = format!(
            "chrom\tlength\tbases\tmean\tmin\tmax\n\
            chr1\t248956422\t0\t0.00\t0\t0\n\
            total_region\t0\t0\t{}\t0\t0\n",
            mean
        );
        fs::write(mosdepth::summary_path(prefix), summary).unwrap();
    }

    /// Writes a thresholds table with one 100 bp row per `(10x, 30x)` pair.
    pub fn write_thresholds(prefix: &Path, rows: &[(u64, u64)]) {
        let file = File::create(mosdepth::thresholds_path(prefix)).unwrap();
        let mut encoder = GzEncoder::new(file, Compression::default());

        writeln!(encoder, "#chrom\tstart\tend\tregion\t1X\t10X\t30X").unwrap();
        for (i, (at10, at30)) in rows.iter().enumerate() {
            let start = i * 100;
            writeln!(
                encoder,
                "chr1\t{}\t{}\tunknown\t100\t{}\t{}",
                start,
                start + 100,
                at10,
                at30
            )
            .unwrap();
        }

        encoder.finish().unwrap();
    }

    /// Stands in for mosdepth, writing the summary (and thresholds table).
    pub fn fake_mosdepth(
        invocation: &Invocation,
        mean: f64,
        rows: Option<&[(u64, u64)]>,
    ) -> io::Result<ToolOutput> {
        let prefix = prefix_of(invocation);
        write_summary(&prefix, mean);

        if let Some(rows) = rows {
            write_thresholds(&prefix, rows);
        }

        succeeded()
    }

    /// Stands in for all three mosdepth runs of a pipeline, picking the
    /// depth from the output prefix. The targets are fully covered.
    pub fn fake_depths(
        invocation: &Invocation,
        target: f64,
        x: f64,
        y: f64,
    ) -> io::Result<ToolOutput> {
        let prefix = prefix_of(invocation).to_string_lossy().into_owned();

        if prefix.ends_with(".chrX") {
            fake_mosdepth(invocation, x, None)
        } else if prefix.ends_with(".chrY") {
            fake_mosdepth(invocation, y, None)
        } else {
            fake_mosdepth(invocation, target, Some(&[(100, 100), (100, 100)]))
        }
    }

    /// Contents of the BAM files written by [`fake_samtools`].
    pub const FAKE_BAM: &str = "BAM\u{1}";

    /// Stands in for samtools: `view` writes its `-o` file, `index` writes
    /// the `.bai` next to the BAM.
    pub fn fake_samtools(invocation: &Invocation) -> io::Result<ToolOutput> {
        let args = invocation.args();

        if args[0] == "view" {
            let output = PathBuf::from(invocation.option_value("-o").unwrap());
            fs::write(output, FAKE_BAM).unwrap();
        } else {
            let bam = Path::new(args.last().unwrap());
            fs::write(bam.append_suffix(".bai"), "").unwrap();
        }

        succeeded()
    }

    /// Stands in for VerifyBamID2, optionally failing the `--SVDPrefix` form.
    pub fn fake_verifybamid(
        invocation: &Invocation,
        freemix: f64,
        fail_primary: bool,
    ) -> io::Result<ToolOutput> {
        if fail_primary && invocation.option_value("--SVDPrefix").is_some() {
            return failed("Error: unable to open SVD prefix files");
        }

        let output = PathBuf::from(invocation.option_value("--Output").unwrap());
        let table = format!(
            "#SEQ_ID\tRG\tCHIP_ID\t#SNPS\t#READS\tAVG_DP\tFREEMIX\tFREELK1\tFREELK0\n\
            NA06994\tNA\tNA\t9447\t120000\t12.7\t{}\t1000.0\t1010.0\n",
            freemix
        );
        fs::write(verifybamid::self_sm_path(&output), table).unwrap();

        succeeded()
    }
}
