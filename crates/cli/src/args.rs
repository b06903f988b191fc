//! Command line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use provisioner_core::RunMode;

/// Output format, selecting how far a run goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Request summary for downstream automation, no external calls.
    Json,
    /// Terraform document only, no external calls.
    Generate,
    /// Publish the document and track it through review and deployment.
    Terraform,
}

impl From<Format> for RunMode {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => RunMode::Json,
            Format::Generate => RunMode::Generate,
            Format::Terraform => RunMode::Terraform,
        }
    }
}

/// Provision an RDS database from a ServiceNow requested item.
#[derive(Debug, Parser)]
#[command(name = "rds-provision", version, about)]
pub struct Args {
    /// Exported requested item (JSON).
    #[arg(long, value_name = "FILE")]
    pub request: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Output file (json and generate formats).
    #[arg(long, value_name = "FILE")]
    pub outfile: Option<PathBuf>,

    /// Infrastructure repository name (terraform format).
    #[arg(long)]
    pub repo: Option<String>,

    /// Configuration file.
    #[arg(long, env = "RDSPROV_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines.
    #[arg(long)]
    pub log_json: bool,

    /// Write metrics in Prometheus text format when the run ends.
    #[arg(long, value_name = "FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Seed for port, schedule and password draws.
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Args {
    /// Check the flag combinations the chosen format needs.
    pub fn check(&self) -> Result<(), String> {
        match self.format {
            Format::Json | Format::Generate if self.outfile.is_none() => Err(format!(
                "outfile must be set if format is {}",
                self.format.label()
            )),
            Format::Terraform if self.repo.as_deref().unwrap_or("").is_empty() => {
                Err("repo must be set if format is 'terraform'".to_string())
            }
            _ => Ok(()),
        }
    }
}

impl Format {
    fn label(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Generate => "generate",
            Format::Terraform => "terraform",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_json() {
        let args =
            Args::try_parse_from(["rds-provision", "--request", "r.json", "--outfile", "o.json"])
                .unwrap();
        assert_eq!(args.format, Format::Json);
        assert!(args.check().is_ok());
    }

    #[test]
    fn test_json_needs_outfile() {
        let args = Args::try_parse_from(["rds-provision", "--request", "r.json"]).unwrap();
        assert_eq!(
            args.check().unwrap_err(),
            "outfile must be set if format is json"
        );
    }

    #[test]
    fn test_terraform_needs_repo() {
        let args = Args::try_parse_from([
            "rds-provision",
            "--request",
            "r.json",
            "--format",
            "terraform",
        ])
        .unwrap();
        assert!(args.check().is_err());

        let args = Args::try_parse_from([
            "rds-provision",
            "--request",
            "r.json",
            "--format",
            "terraform",
            "--repo",
            "grace-paas-rds",
            "--seed",
            "7",
        ])
        .unwrap();
        assert!(args.check().is_ok());
        assert_eq!(args.seed, Some(7));
        assert_eq!(RunMode::from(args.format), RunMode::Terraform);
    }

    #[test]
    fn test_request_is_required() {
        assert!(Args::try_parse_from(["rds-provision"]).is_err());
    }
}
