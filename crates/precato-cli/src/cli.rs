use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// One `--filter FIELD=VALUE` pair as typed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterArg {
    pub field: String,
    pub value: String,
}

pub fn parse_filter(raw: &str) -> Result<FilterArg, String> {
    let Some((field, value)) = raw.split_once('=') else {
        return Err("filter must use FIELD=VALUE format".to_string());
    };
    let field = field.trim();
    if field.is_empty() {
        return Err("filter field must not be empty".to_string());
    }
    Ok(FilterArg {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Extended help shown after `precato claims list --help`.
pub const CLAIMS_LIST_AFTER_HELP: &str = "\
How enrichment works:
  Every row on the page gets the running total of in-sequence claims for its
  debtor entity up to and including its position, the number of months the
  entity's monthly ceiling needs to cover that total, and a maturity band.

  Bands by months:  A+ <= 7, A <= 13, B+ <= 19, B <= 25, C+ <= 31, C <= 37,
                    D+ <= 43, D <= 49, E+ <= 55, E <= 60, F above 60

  When the ceiling table is missing or unreadable, rows are still listed and
  the derived fields are left empty. Each row's `status` says why.

Sortable fields:
  id, precatorio, ordem, organizacao, regime, ano_orc, situacao, valor

Filterable fields (case-insensitive substring match):
  precatorio, ordem, organizacao, regime, ano_orc, situacao, valor

Examples:
  precato claims list --filter organizacao=campinas --sort ordem
  precato claims list --page 2 --per-page 100 --json
  precato claims list --reference ./teto_repasse.csv
";

/// Extended help shown after `precato reference check --help`.
pub const REFERENCE_CHECK_AFTER_HELP: &str = "\
Reference table format:
  A delimited text file (`;`, tab, or `,`) with a header row. Columns are
  found by header text, ignoring case, accents, and line breaks:

    entity   header containing ENTE DEVEDOR or DEVEDOR, or exactly ENTE
    region   header containing ESTADO, or exactly UF (optional)
    ceiling  header containing TETO REPASSE or TETO

  Ceilings are annual amounts like `R$ 1.234.567,89` and are divided by 12.

Where the file is looked up:
  1. --reference <path>
  2. PRECATO_REFERENCE_PATH
  3. teto_repasse.csv inside the store home (PRECATO_HOME or ~/.precato)
";

#[derive(Debug, Parser)]
#[command(
    name = "precato",
    version,
    about = "ceiling-based accumulation and maturity bands for payment claims",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Browse claims enriched with cumulative totals and maturity bands
    #[command(arg_required_else_help = true)]
    Claims {
        #[command(subcommand)]
        command: ClaimsCommand,
    },
    /// Inspect the per-entity ceiling reference table
    #[command(arg_required_else_help = true)]
    Reference {
        #[command(subcommand)]
        command: ReferenceCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ClaimsCommand {
    /// List one page of claims with derived ceiling fields
    #[command(after_long_help = CLAIMS_LIST_AFTER_HELP)]
    List {
        /// Page number, starting at 1
        #[arg(long)]
        page: Option<i64>,
        /// Rows per page (1-1000, default 50)
        #[arg(long)]
        per_page: Option<i64>,
        /// Field to sort by (default id)
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction: asc or desc
        #[arg(long)]
        order: Option<String>,
        /// Substring filter as FIELD=VALUE; repeat for more fields
        #[arg(long = "filter", value_parser = parse_filter)]
        filters: Vec<FilterArg>,
        /// Ceiling reference table to use instead of the default location
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ReferenceCommand {
    /// Load the reference table and report what was kept and skipped
    #[command(after_long_help = REFERENCE_CHECK_AFTER_HELP)]
    Check {
        /// Ceiling reference table to use instead of the default location
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show how one entity name is matched against the reference table
    Resolve {
        /// Entity name as it appears on claims (e.g. "Campinas - SP")
        name: String,
        /// Ceiling reference table to use instead of the default location
        #[arg(long)]
        reference: Option<PathBuf>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::{ClaimsCommand, Commands, FilterArg, ReferenceCommand, parse_filter, parse_from};

    #[test]
    fn parse_command_paths() {
        let cases: [Vec<&str>; 9] = [
            vec!["precato", "claims", "list"],
            vec!["precato", "claims", "list", "--json"],
            vec!["precato", "claims", "list", "--page", "2", "--per-page", "10"],
            vec!["precato", "claims", "list", "--sort", "valor", "--order", "desc"],
            vec![
                "precato",
                "claims",
                "list",
                "--filter",
                "organizacao=itu",
                "--filter",
                "regime=especial",
            ],
            vec!["precato", "claims", "list", "--reference", "./teto.csv"],
            vec!["precato", "reference", "check"],
            vec!["precato", "reference", "check", "--json"],
            vec!["precato", "reference", "resolve", "Campinas - SP", "--json"],
        ];

        for case in cases {
            let parsed = parse_from(case.clone());
            assert!(parsed.is_ok(), "failed to parse: {case:?}");
        }
    }

    #[test]
    fn claims_list_collects_repeated_filters() {
        let parsed = parse_from([
            "precato",
            "claims",
            "list",
            "--filter",
            "organizacao=Itu - SP",
            "--filter",
            "ano_orc=2026",
        ]);
        assert!(parsed.is_ok());
        if let Ok(cli) = parsed {
            let Commands::Claims {
                command: ClaimsCommand::List { filters, .. },
            } = cli.command
            else {
                panic!("expected claims list");
            };
            assert_eq!(
                filters,
                vec![
                    FilterArg {
                        field: "organizacao".to_string(),
                        value: "Itu - SP".to_string(),
                    },
                    FilterArg {
                        field: "ano_orc".to_string(),
                        value: "2026".to_string(),
                    },
                ]
            );
        }
    }

    #[test]
    fn filter_without_separator_is_rejected() {
        assert!(parse_filter("organizacao").is_err());
        assert!(parse_filter("=itu").is_err());

        let parsed = parse_from(["precato", "claims", "list", "--filter", "itu"]);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn filter_value_may_contain_equals_sign() {
        let parsed = parse_filter("precatorio=a=b");
        assert!(parsed.is_ok());
        if let Ok(filter) = parsed {
            assert_eq!(filter.field, "precatorio");
            assert_eq!(filter.value, "a=b");
        }
    }

    #[test]
    fn reference_resolve_requires_a_name() {
        let parsed = parse_from(["precato", "reference", "resolve"]);
        assert!(parsed.is_err());
        if let Err(error) = parsed {
            assert_eq!(error.kind(), ErrorKind::MissingRequiredArgument);
        }

        let named = parse_from(["precato", "reference", "resolve", "Itu/SP"]);
        assert!(named.is_ok());
        if let Ok(cli) = named {
            assert!(matches!(
                cli.command,
                Commands::Reference {
                    command: ReferenceCommand::Resolve { ref name, json: false, .. }
                } if name == "Itu/SP"
            ));
        }
    }

    #[test]
    fn bare_group_commands_show_help() {
        for group in ["claims", "reference"] {
            let parsed = parse_from(["precato", group]);
            assert!(parsed.is_err());
            if let Err(error) = parsed {
                assert_eq!(
                    error.kind(),
                    ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                );
            }
        }
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(parse_from(["precato", "import", "create"]).is_err());
        assert!(parse_from(["precato", "claims", "delete"]).is_err());
    }
}
