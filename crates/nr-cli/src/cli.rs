//! Command-line argument definitions.

use std::path::PathBuf;

use clap::Parser;
use nr_core::NamingScheme;

/// Summarize a night of NINA imaging from its session logs.
///
/// Reads every `20*.log` file in the log directory, groups records into
/// nights (noon to noon) and reports exposures, targets, weather interruptions
/// and errors for one of them.
#[derive(Debug, Parser)]
#[command(name = "nina-report", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Night to report: 0 = last night, 1 = the night before, and so on.
    #[arg(short, long, default_value_t = 0)]
    pub night: usize,

    /// Directory containing the NINA log files.
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// Image file naming scheme (AMOS or skyimages).
    #[arg(short = 'o', long)]
    pub pattern: Option<NamingScheme>,

    /// Print or send nothing for a night without activity.
    #[arg(short, long)]
    pub silent: bool,

    /// Send the report to Pushover instead of printing it.
    #[arg(short = 'P', long, conflicts_with = "json")]
    pub pushover: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_short_flags() {
        let cli = Cli::try_parse_from([
            "nina-report", "-n", "2", "-p", "/logs", "-o", "skyimages", "-s", "-P",
        ])
        .unwrap();
        assert_eq!(cli.night, 2);
        assert_eq!(cli.path, Some(PathBuf::from("/logs")));
        assert_eq!(cli.pattern, Some(NamingScheme::SkyImages));
        assert!(cli.silent);
        assert!(cli.pushover);
        assert!(!cli.json);
    }

    #[test]
    fn defaults_to_last_night() {
        let cli = Cli::try_parse_from(["nina-report"]).unwrap();
        assert_eq!(cli.night, 0);
        assert!(cli.pattern.is_none());
    }

    #[test]
    fn rejects_unknown_pattern() {
        assert!(Cli::try_parse_from(["nina-report", "-o", "nightly"]).is_err());
    }

    #[test]
    fn pushover_and_json_conflict() {
        assert!(Cli::try_parse_from(["nina-report", "-P", "--json"]).is_err());
    }
}
