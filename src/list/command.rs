//! Functionality related to the `wesqc list` command itself.

use anyhow::bail;
use clap::builder::PossibleValuesParser;
use clap::Args;
use num_format::Locale;
use num_format::ToFormattedString;
use prettytable::row;
use prettytable::Table;

use crate::resources::ResourceBundle;
use crate::resources::ResourceKind;
use crate::resources::Resolution;
use crate::utils::genome::SexChromosome;
use crate::utils::genome::REFERENCE_GENOME;

//========================//
// Command-line arguments //
//========================//

/// Command line arguments for `wesqc list`.
#[derive(Args)]
pub struct ListArgs {
    /// The subject which you want to list values for.
    #[arg(value_parser = PossibleValuesParser::new(["resources", "chromosomes"]))]
    subject: String,
}

//========//
// Tables //
//========//

/// The files of every resource bundle.
pub fn resources_table() -> Table {
    let mut table = Table::new();

    table.add_row(row!["Resolution", "Kind", "Required", "File name"]);
    for resolution in Resolution::all() {
        for kind in ResourceKind::all() {
            let required = if kind.is_required() { "yes" } else { "no" };
            table.add_row(row![
                resolution,
                kind,
                required,
                ResourceBundle::file_name(resolution, kind),
            ]);
        }
    }

    table
}

/// The sex chromosomes measured during sex inference.
pub fn chromosomes_table() -> Table {
    let mut table = Table::new();

    table.add_row(row!["Name", "Length (bp)", "Reference"]);
    for chromosome in SexChromosome::all() {
        table.add_row(row![
            chromosome.name(),
            chromosome.length().to_formatted_string(&Locale::en),
            REFERENCE_GENOME,
        ]);
    }

    table
}

//==============//
// Main command //
//==============//

/// Main method for the `wesqc list` subcommand.
pub fn list(args: ListArgs) -> anyhow::Result<()> {
    match args.subject.as_str() {
        "resources" => {
            resources_table().printstd();
            Ok(())
        }
        "chromosomes" => {
            chromosomes_table().printstd();
            Ok(())
        }
        s => bail!("Unsupported subject: {}", s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn test_resources_table_lists_every_file() {
        let table = resources_table();
        assert_eq!(table.len(), 1 + 2 * 4);

        let rendered = table.to_string();
        assert!(rendered.contains("1000g.phase3.10k.b38.vcf.gz.dat.UD"));
        assert!(rendered.contains("1000g.phase3.100k.b38.vcf.gz.dat.mu"));
    }

    #[test]
    pub fn test_chromosomes_table() {
        let rendered = chromosomes_table().to_string();
        assert!(rendered.contains("chrX"));
        assert!(rendered.contains("156,040,895"));
        assert!(rendered.contains("57,227,415"));
    }
}
