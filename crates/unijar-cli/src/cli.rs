use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use unijar_archive::CompressionMode;

#[derive(Parser)]
#[command(
    name = "unijar",
    about = "unijar: combine archives into one deterministic archive",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Merge input archives into one output archive
    Merge(MergeArgs),
    /// Show the effective policy, or which rule classifies given names
    Policy(PolicyArgs),
    /// List the entries of an archive
    List(ListArgs),
}

#[derive(Args)]
pub struct MergeArgs {
    /// Output archive path
    #[arg(short, long, required_unless_present = "dry_run")]
    pub output: Option<PathBuf>,
    /// Policy/config file (TOML)
    #[arg(long)]
    pub policy: Option<PathBuf>,
    /// Fail on any duplicate name the policy would otherwise keep-first
    #[arg(long)]
    pub no_duplicates: bool,
    /// Override the configured output compression
    #[arg(long)]
    pub compression: Option<CompressionArg>,
    /// Run the merge without writing an archive
    #[arg(long)]
    pub dry_run: bool,
    /// Input archives, in priority order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CompressionArg {
    Preserve,
    Deflate,
    Store,
}

impl From<CompressionArg> for CompressionMode {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Preserve => CompressionMode::Preserve,
            CompressionArg::Deflate => CompressionMode::Deflate,
            CompressionArg::Store => CompressionMode::Store,
        }
    }
}

#[derive(Args)]
pub struct PolicyArgs {
    /// Policy/config file (TOML)
    #[arg(long)]
    pub policy: Option<PathBuf>,
    #[arg(long)]
    pub no_duplicates: bool,
    /// Entry names to classify
    #[arg(long, num_args = 1..)]
    pub check: Vec<String>,
}

#[derive(Args)]
pub struct ListArgs {
    pub input: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_merge() {
        let cli = Cli::try_parse_from(["unijar", "merge", "-o", "out.jar", "a.jar", "b.jar"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.output, Some(PathBuf::from("out.jar")));
            assert_eq!(args.inputs, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
            assert!(!args.no_duplicates);
            assert!(args.compression.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_merge_options() {
        let cli = Cli::try_parse_from([
            "unijar", "merge", "--output", "o.jar", "--policy", "p.toml",
            "--no-duplicates", "--compression", "store", "a.jar",
        ])
        .unwrap();
        if let Command::Merge(args) = cli.command {
            assert_eq!(args.policy, Some(PathBuf::from("p.toml")));
            assert!(args.no_duplicates);
            assert_eq!(args.compression, Some(CompressionArg::Store));
            assert_eq!(CompressionMode::from(CompressionArg::Store), CompressionMode::Store);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_merge_requires_inputs() {
        assert!(Cli::try_parse_from(["unijar", "merge", "-o", "out.jar"]).is_err());
    }

    #[test]
    fn parse_merge_requires_output_unless_dry_run() {
        assert!(Cli::try_parse_from(["unijar", "merge", "a.jar"]).is_err());
        let cli = Cli::try_parse_from(["unijar", "merge", "--dry-run", "a.jar"]).unwrap();
        if let Command::Merge(args) = cli.command {
            assert!(args.dry_run);
            assert!(args.output.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_policy_check() {
        let cli = Cli::try_parse_from([
            "unijar", "policy", "--check", "META-INF/services/x", "A.class",
        ])
        .unwrap();
        if let Command::Policy(args) = cli.command {
            assert_eq!(args.check, vec!["META-INF/services/x", "A.class"]);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_list() {
        let cli = Cli::try_parse_from(["unijar", "list", "a.jar"]).unwrap();
        assert!(matches!(cli.command, Command::List(_)));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from(["unijar", "list", "a.jar", "--format", "json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
