use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tally_types::Address;

#[derive(Parser)]
#[command(
    name = "tally",
    about = "Tally: an append-only election ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the ledger configuration file
    #[arg(short, long, global = true, default_value = "tally.toml")]
    pub config: PathBuf,

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
    /// Write a starter configuration file
    Init(InitArgs),
    /// Create an election (authority only)
    CreateElection(CreateElectionArgs),
    /// Add a candidate before voting opens (authority only)
    AddCandidate(AddCandidateArgs),
    /// Register the caller as a voter
    Register(CallerArgs),
    /// Cast the caller's vote
    Vote(VoteArgs),
    /// Finalize an election after it ends (authority only)
    Finalize(ElectionCallerArgs),
    /// Suspend all mutations (authority only)
    Pause(CallerArgs),
    /// Resume mutations (authority only)
    Unpause(CallerArgs),
    /// List elections
    Elections,
    /// Show one election with its candidates
    Show(ElectionArg),
    /// Show election results
    Results(ResultsArgs),
    /// Show a voter's registration and ballot
    Voter(VoterArgs),
    /// Show receipt history
    Log(LogArgs),
    /// Verify receipt chain integrity and tallies
    Verify,
    /// Start the HTTP server
    ///
    /// Requests act as the address in the `x-tally-caller` header without
    /// further checks, so anyone who can reach the server can act as the
    /// authority. The default bind address is loopback; put an
    /// authenticating gateway in front before binding anything wider.
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InitArgs {
    #[arg(long)]
    pub authority: Address,
    #[arg(long)]
    pub journal: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<String>,
    /// Seconds between creating an election and the start of voting
    #[arg(long)]
    pub candidate_window: Option<u64>,
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CallerArgs {
    #[arg(long)]
    pub caller: Address,
}

#[derive(Args)]
pub struct CreateElectionArgs {
    #[arg(long)]
    pub caller: Address,
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long)]
    pub days: u64,
}

#[derive(Args)]
pub struct AddCandidateArgs {
    #[arg(long)]
    pub caller: Address,
    #[arg(short, long)]
    pub election: u64,
    #[arg(long)]
    pub name: String,
}

#[derive(Args)]
pub struct VoteArgs {
    #[arg(long)]
    pub caller: Address,
    #[arg(short, long)]
    pub election: u64,
    #[arg(long)]
    pub candidate: u64,
}

#[derive(Args)]
pub struct ElectionCallerArgs {
    #[arg(long)]
    pub caller: Address,
    #[arg(short, long)]
    pub election: u64,
}

#[derive(Args)]
pub struct ElectionArg {
    pub election: u64,
}

#[derive(Args)]
pub struct ResultsArgs {
    pub election: u64,
    /// Rank by votes instead of listing in candidate order
    #[arg(long)]
    pub ranked: bool,
}

#[derive(Args)]
pub struct VoterArgs {
    pub address: Address,
    #[arg(short, long)]
    pub election: Option<u64>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(short, long)]
    pub election: Option<u64>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address (default 127.0.0.1:7878)
    #[arg(long)]
    pub bind: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "0x0101010101010101010101010101010101010101";

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["tally", "init", "--authority", ADDR]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.authority, Address::from_bytes([1; 20]));
            assert!(!args.force);
        } else { panic!("wrong command"); }
        assert_eq!(cli.config, PathBuf::from("tally.toml"));
    }

    #[test]
    fn parse_init_requires_valid_authority() {
        assert!(Cli::try_parse_from(["tally", "init", "--authority", "0x12"]).is_err());
        assert!(Cli::try_parse_from(["tally", "init"]).is_err());
    }

    #[test]
    fn parse_create_election() {
        let cli = Cli::try_parse_from([
            "tally", "create-election", "--caller", ADDR, "--name", "Board", "--days", "7",
        ])
        .unwrap();
        if let Command::CreateElection(args) = cli.command {
            assert_eq!(args.name, "Board");
            assert_eq!(args.days, 7);
            assert_eq!(args.description, "");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_vote() {
        let cli = Cli::try_parse_from([
            "tally", "vote", "--caller", ADDR, "-e", "2", "--candidate", "3",
        ])
        .unwrap();
        if let Command::Vote(args) = cli.command {
            assert_eq!(args.election, 2);
            assert_eq!(args.candidate, 3);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_results_ranked() {
        let cli = Cli::try_parse_from(["tally", "results", "1", "--ranked"]).unwrap();
        if let Command::Results(args) = cli.command {
            assert!(args.ranked);
            assert_eq!(args.election, 1);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_log() {
        let cli = Cli::try_parse_from(["tally", "log", "--oneline", "-n", "5", "-e", "1"]).unwrap();
        if let Command::Log(args) = cli.command {
            assert!(args.oneline);
            assert_eq!(args.limit, 5);
            assert_eq!(args.election, Some(1));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_mutation_requires_caller() {
        assert!(Cli::try_parse_from(["tally", "register"]).is_err());
        assert!(Cli::try_parse_from(["tally", "pause"]).is_err());
    }

    #[test]
    fn parse_verify() {
        let cli = Cli::try_parse_from(["tally", "verify"]).unwrap();
        assert!(matches!(cli.command, Command::Verify));
    }

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["tally", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind.as_deref(), Some("0.0.0.0:8080"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn serve_help_mentions_caller_header() {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        let serve = cmd.find_subcommand_mut("serve").unwrap();
        let help = serve.render_long_help().to_string();
        assert!(help.contains("x-tally-caller"));
        assert!(help.contains("127.0.0.1:7878"));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "tally", "--verbose", "--format", "json", "--config", "/tmp/t.toml", "elections",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("/tmp/t.toml"));
    }
}
