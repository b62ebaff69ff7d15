//! Command-line flags.

use std::path::PathBuf;

use clap::Parser;

/// Extract structured audit findings from PDF reports into per-company workbooks.
#[derive(Debug, Clone, Parser)]
#[command(name = "auditab", version, about)]
pub struct Args {
    /// Configuration file. Defaults to `auditab.toml` in the working
    /// directory when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory that receives the workbooks and the batch report.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Documents processed at once (capped at the number of API keys).
    #[arg(short = 'j', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// PDF files or directories containing them.
    #[arg(required = true, value_name = "PATH")]
    pub inputs: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_and_inputs_parse() {
        let args = Args::try_parse_from([
            "auditab", "-c", "ci.toml", "--output", "out", "-j", "4", "a.pdf", "reports/",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("ci.toml")));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(args.concurrency, Some(4));
        assert_eq!(args.inputs, [PathBuf::from("a.pdf"), PathBuf::from("reports/")]);
    }

    #[test]
    fn at_least_one_input_is_required() {
        assert!(Args::try_parse_from(["auditab"]).is_err());
    }
}
