use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::DateTime;
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use tally_journal::JournaledLedger;
use tally_ledger::{
    Candidate, LedgerReader, LedgerWriter, ProjectionBuilder, Receipt, StreamValidator,
    SystemClock,
};
use tally_server::handler::ReceiptView;
use tally_server::{ServerConfig, TallyServer};
use tally_types::{ElectionId, Timestamp};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let out = Output { format: cli.format };
    let config_path = cli.config.as_path();
    match cli.command {
        Command::Init(args) => cmd_init(config_path, args, out),
        Command::Serve(args) => cmd_serve(config_path, args),
        command => {
            let ledger = open_ledger(config_path)?;
            run_ledger_command(&ledger, command, out)
        }
    }
}

fn run_ledger_command(ledger: &JournaledLedger, command: Command, out: Output) -> anyhow::Result<()> {
    match command {
        Command::CreateElection(args) => {
            let (id, receipt) =
                ledger.create_election(&args.caller, &args.name, &args.description, args.days)?;
            out.receipt(&receipt, &format!("Created election {}", id.to_string().bold()))
        }
        Command::AddCandidate(args) => {
            let (id, receipt) =
                ledger.add_candidate(&args.caller, election_id(args.election)?, &args.name)?;
            out.receipt(&receipt, &format!("Added candidate {} \"{}\"", id.to_string().bold(), args.name))
        }
        Command::Register(args) => {
            let receipt = ledger.register_voter(&args.caller)?;
            out.receipt(&receipt, &format!("Registered voter {}", args.caller.to_string().cyan()))
        }
        Command::Vote(args) => {
            let election = election_id(args.election)?;
            let candidate = tally_types::CandidateId::new(args.candidate)?;
            let receipt = ledger.vote(&args.caller, election, candidate)?;
            out.receipt(&receipt, &format!("Vote recorded in election {election}"))
        }
        Command::Finalize(args) => {
            let election = election_id(args.election)?;
            let receipt = ledger.finalize_election(&args.caller, election)?;
            out.receipt(&receipt, &format!("Finalized election {election}"))
        }
        Command::Pause(args) => {
            let receipt = ledger.pause(&args.caller)?;
            out.receipt(&receipt, "Ledger paused")
        }
        Command::Unpause(args) => {
            let receipt = ledger.unpause(&args.caller)?;
            out.receipt(&receipt, "Ledger unpaused")
        }
        Command::Elections => cmd_elections(ledger, out),
        Command::Show(args) => cmd_show(ledger, election_id(args.election)?, out),
        Command::Results(args) => cmd_results(ledger, election_id(args.election)?, args.ranked, out),
        Command::Voter(args) => cmd_voter(ledger, args, out),
        Command::Log(args) => cmd_log(ledger, args, out),
        Command::Verify => cmd_verify(ledger, out),
        Command::Init(_) | Command::Serve(_) => unreachable!("handled before opening the ledger"),
    }
}

#[derive(Clone, Copy)]
struct Output {
    format: OutputFormat,
}

impl Output {
    fn json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    fn receipt(&self, receipt: &Receipt, message: &str) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => self.json(&ReceiptView::from(receipt)),
            OutputFormat::Text => {
                println!("{} {}", "✓".green().bold(), message);
                println!(
                    "  Receipt: {} {}",
                    format!("r#{}", receipt.seq).yellow(),
                    receipt.short_hash().dimmed()
                );
                Ok(())
            }
        }
    }
}

fn open_ledger(config_path: &Path) -> anyhow::Result<JournaledLedger> {
    let config = ServerConfig::load(config_path)
        .with_context(|| format!("loading {} (run `tally init` first)", config_path.display()))?;
    let journal = config.journal_path_relative_to(config_path);
    let ledger = JournaledLedger::open(
        &journal,
        config.journal_config(),
        config.ledger.clone(),
        Arc::new(SystemClock),
    )
    .with_context(|| format!("opening journal {}", journal.display()))?;
    let receipts = ledger.receipt_count()?;
    debug!(journal = %journal.display(), receipts, "ledger opened");
    Ok(ledger)
}

fn election_id(raw: u64) -> anyhow::Result<ElectionId> {
    Ok(ElectionId::new(raw)?)
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts.as_secs())
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn cmd_init(config_path: &Path, args: InitArgs, out: Output) -> anyhow::Result<()> {
    if config_path.exists() && !args.force {
        bail!("{} already exists (use --force to overwrite)", config_path.display());
    }
    let mut config = ServerConfig::new(args.authority);
    if let Some(journal) = args.journal {
        config.journal_path = journal;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    }
    if let Some(window) = args.candidate_window {
        config.ledger = config.ledger.with_candidate_window(window);
    }
    config.save(config_path)?;

    match out.format {
        OutputFormat::Json => out.json(&config),
        OutputFormat::Text => {
            println!("{} Wrote {}", "✓".green().bold(), config_path.display().to_string().bold());
            println!("  Authority: {}", config.ledger.authority.to_string().cyan());
            println!("  Journal: {}", config.journal_path.display());
            println!("  Candidate window: {}s", config.ledger.candidate_window_secs);
            Ok(())
        }
    }
}

fn cmd_elections(ledger: &JournaledLedger, out: Output) -> anyhow::Result<()> {
    let summaries = ProjectionBuilder::election_summaries(ledger)?;
    if out.format == OutputFormat::Json {
        return out.json(&summaries);
    }
    if summaries.is_empty() {
        println!("No elections.");
        return Ok(());
    }
    for s in &summaries {
        println!(
            "{}  {}  [{}]  {} candidate(s), {} vote(s)",
            format!("#{}", s.election.id).yellow().bold(),
            s.election.name.bold(),
            s.phase.to_string().cyan(),
            s.candidate_count,
            s.election.total_votes
        );
    }
    Ok(())
}

fn cmd_show(ledger: &JournaledLedger, id: ElectionId, out: Output) -> anyhow::Result<()> {
    let summary = ProjectionBuilder::election_summary(ledger, id)?;
    let candidates = (1..=summary.candidate_count)
        .filter_map(|n| tally_types::CandidateId::new(n).ok())
        .map(|cid| ledger.candidate(id, cid))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<Candidate>>();

    if out.format == OutputFormat::Json {
        return out.json(&serde_json::json!({ "election": summary, "candidates": candidates }));
    }

    let e = &summary.election;
    println!("Election {} {}", format!("#{}", e.id).yellow().bold(), e.name.bold());
    if !e.description.is_empty() {
        println!("  {}", e.description);
    }
    println!("  Phase: {}", summary.phase.to_string().cyan());
    println!("  Voting: {} .. {}", format_time(e.start_time), format_time(e.end_time));
    println!("  Total votes: {}", e.total_votes);
    for c in &candidates {
        println!("  {:>3}  {:<24} {}", c.id, c.name, c.vote_count);
    }
    Ok(())
}

fn cmd_results(ledger: &JournaledLedger, id: ElectionId, ranked: bool, out: Output) -> anyhow::Result<()> {
    if ranked {
        let standings = ProjectionBuilder::standings(ledger, id)?;
        if out.format == OutputFormat::Json {
            return out.json(&standings);
        }
        for row in &standings.rows {
            let share = format!("{}.{:02}%", row.share_bp / 100, row.share_bp % 100);
            let line = format!("{:>3}. {:<24} {:>8}  {:>7}", row.rank, row.name, row.vote_count, share);
            if standings.leaders.contains(&row.candidate_id) {
                println!("{}", line.green().bold());
            } else {
                println!("{line}");
            }
        }
        if let Some(winner) = standings.winner() {
            println!("Winner: candidate {}", winner.to_string().green().bold());
        }
        return Ok(());
    }

    let results = ledger.results(id)?;
    if out.format == OutputFormat::Json {
        return out.json(&results);
    }
    if results.is_empty() {
        println!("Election {id} has no candidates.");
    }
    for r in &results {
        println!("{:>3}  {:<24} {}", r.candidate_id, r.name, r.vote_count);
    }
    Ok(())
}

fn cmd_voter(ledger: &JournaledLedger, args: VoterArgs, out: Output) -> anyhow::Result<()> {
    let election = args.election.map(election_id).transpose()?;
    let status = ProjectionBuilder::voter_status(ledger, &args.address, election)?;
    if out.format == OutputFormat::Json {
        return out.json(&status);
    }

    println!("Voter {}", status.address.to_string().cyan());
    match status.registered_at {
        Some(at) if status.registered => println!("  Registered: {} ({})", "yes".green(), format_time(at)),
        _ => println!("  Registered: {}", "no".red()),
    }
    if let Some(id) = status.election_id {
        match status.vote {
            Some(vote) => println!(
                "  Election {id}: voted for candidate {} at {}",
                vote.candidate_id.to_string().bold(),
                format_time(vote.cast_at)
            ),
            None => println!("  Election {id}: {}", "has not voted".dimmed()),
        }
    }
    Ok(())
}

fn cmd_log(ledger: &JournaledLedger, args: LogArgs, out: Output) -> anyhow::Result<()> {
    let election = args.election.map(election_id).transpose()?;
    let index = ProjectionBuilder::audit_index(ledger, election)?;
    let skip = index.entries.len().saturating_sub(args.limit);
    let entries = &index.entries[skip..];

    if out.format == OutputFormat::Json {
        return out.json(&entries);
    }
    if entries.is_empty() {
        println!("No receipts.");
    }
    for entry in entries.iter().rev() {
        let seq = format!("r#{}", entry.seq).yellow();
        if args.oneline {
            println!("{} {} {}", seq, entry.receipt_hash[..12].dimmed(), entry.summary);
        } else {
            println!("{}  {}  {}", seq.bold(), entry.receipt_hash[..12].dimmed(), entry.command.cyan());
            println!("  Caller: {}", entry.caller);
            println!("  Time: {}", format_time(entry.timestamp));
            println!("  {}", entry.summary);
        }
    }
    Ok(())
}

fn cmd_verify(ledger: &JournaledLedger, out: Output) -> anyhow::Result<()> {
    let report = StreamValidator::validate(ledger)?;
    if out.format == OutputFormat::Json {
        out.json(&serde_json::json!({
            "valid": report.is_valid(),
            "receipts": report.receipt_count,
            "elections": report.election_count,
            "violations": report
                .violations
                .iter()
                .map(|v| serde_json::json!({
                    "seq": v.seq,
                    "kind": format!("{:?}", v.kind),
                    "description": v.description,
                }))
                .collect::<Vec<_>>(),
        }))?;
    } else {
        let mark = |ok: bool, good: &str, bad: &str| {
            if ok { good.green() } else { bad.red().bold() }
        };
        println!("Receipts: {}, elections: {}", report.receipt_count, report.election_count);
        println!("  Hash chain: {}", mark(report.hash_chain_valid, "valid", "broken"));
        println!("  Sequence: {}", mark(report.sequence_dense, "dense", "gapped"));
        println!("  Admin commands: {}", mark(report.admin_attributed, "attributed", "unattributed"));
        println!("  Tallies: {}", mark(report.tallies_consistent, "consistent", "inconsistent"));
        for v in &report.violations {
            println!("  {} r#{} {:?}: {}", "✗".red(), v.seq, v.kind, v.description);
        }
        if report.is_valid() {
            println!("{} Receipt chain integrity verified", "✓".green().bold());
        }
    }

    if !report.is_valid() {
        bail!("{} violation(s) found", report.violations.len());
    }
    Ok(())
}

fn cmd_serve(config_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = ServerConfig::load(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    config.journal_path = config.journal_path_relative_to(config_path);
    if let Some(bind) = args.bind {
        config.bind_addr = bind.parse().with_context(|| format!("invalid bind address {bind}"))?;
    }

    let server = TallyServer::open(config)?;
    info!(
        bind = %server.config().bind_addr,
        journal = %server.config().journal_path.display(),
        "starting server"
    );
    println!("Tally server on {}", server.config().bind_addr.to_string().bold());
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tally_types::Address;

    use super::*;

    const AUTHORITY: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn run(config: &Path, args: &[&str]) -> anyhow::Result<()> {
        use clap::Parser;
        let config = config.to_string_lossy().to_string();
        let mut argv = vec!["tally", "--config", config.as_str()];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    fn init(dir: &Path) -> PathBuf {
        let config = dir.join("tally.toml");
        run(&config, &["init", "--authority", AUTHORITY, "--candidate-window", "3600"]).unwrap();
        config
    }

    #[test]
    fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let config = init(dir.path());
        assert!(run(&config, &["init", "--authority", AUTHORITY]).is_err());
        run(&config, &["init", "--authority", AUTHORITY, "--force"]).unwrap();
    }

    #[test]
    fn commands_share_the_journal() {
        let dir = tempfile::tempdir().unwrap();
        let config = init(dir.path());

        run(&config, &["create-election", "--caller", AUTHORITY, "--name", "E1", "--days", "1"]).unwrap();
        run(&config, &["add-candidate", "--caller", AUTHORITY, "-e", "1", "--name", "Alice"]).unwrap();
        run(&config, &["register", "--caller", "0x0101010101010101010101010101010101010101"]).unwrap();
        run(&config, &["elections"]).unwrap();
        run(&config, &["show", "1"]).unwrap();
        run(&config, &["--format", "json", "results", "1", "--ranked"]).unwrap();
        run(&config, &["log", "--oneline"]).unwrap();
        run(&config, &["verify"]).unwrap();

        assert!(dir.path().join("tally.wal").exists());
        let ledger = open_ledger(&config).unwrap();
        assert_eq!(ledger.receipt_count().unwrap(), 3);
        assert!(ledger
            .voter(&Address::from_bytes([1; 20]))
            .unwrap()
            .is_some());
    }

    #[test]
    fn ledger_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let config = init(dir.path());
        let err = run(
            &config,
            &["create-election", "--caller", "0x0101010101010101010101010101010101010101", "--name", "E", "--days", "1"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("not the ledger authority"));
    }

    #[test]
    fn missing_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(&dir.path().join("absent.toml"), &["elections"]).unwrap_err();
        assert!(err.to_string().contains("tally init"));
    }

    #[test]
    fn time_formatting() {
        assert_eq!(format_time(Timestamp::from_secs(0)), "1970-01-01 00:00:00 UTC");
    }
}
