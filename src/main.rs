use std::fs::File;
use std::sync::Mutex;

use clap::CommandFactory;
use clap::FromArgMatches;
use clap::Parser;
use clap::Subcommand;
use git_testament::git_testament;
use git_testament::render_testament;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use wesqc::check::command::CheckArgs;
use wesqc::errors;
use wesqc::errors::ExitCode;
use wesqc::list::command::ListArgs;
use wesqc::qc::command::RunArgs;

git_testament!(TESTAMENT);

#[derive(Parser)]
#[command(name = "wesqc", propagate_version = true)]
/// Quality control for whole-exome sequencing alignments.
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only errors are printed to the stderr stream.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// All available information, including debug information, is printed to
    /// stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs coverage, sex inference and contamination QC on an alignment.
    Run(RunArgs),

    /// Checks that the inputs and resource files are in place.
    Check(CheckArgs),

    /// Lists the resource files and sex chromosomes the pipeline relies on.
    List(ListArgs),
}

/// Installs the global subscriber. Events go to stderr and, when a run log is
/// given, to that file as well. Later calls are no-ops.
fn init_logging(level: Level, run_log: Option<File>) {
    let builder = tracing_subscriber::fmt().with_max_level(level);

    let _ = match run_log {
        Some(file) => builder
            .with_ansi(false)
            .with_writer(std::io::stderr.and(Mutex::new(file)))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}

fn main() {
    let version = render_testament!(TESTAMENT);
    let matches = Cli::command().version(version).get_matches();
    let cli = match Cli::from_arg_matches(&matches) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let result = match cli.command {
        Commands::Run(args) => {
            let config = args.into_config();
            wesqc::qc::command::open_run_log(&config).and_then(|log| {
                init_logging(level, Some(log));
                wesqc::qc::command::run(config)
            })
        }
        Commands::Check(args) => {
            init_logging(level, None);
            wesqc::check::command::check(args)
        }
        Commands::List(args) => {
            init_logging(level, None);
            wesqc::list::command::list(args)
        }
    };

    if let Err(err) = result {
        init_logging(level, None);
        errors::exit(format!("{:#}", err), ExitCode::from(&err));
    }
}
