use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use connect4_solver::ai::{MoveScore, SearchStatus, Solver};
use connect4_solver::config::{AppConfig, OutputFormat};
use connect4_solver::game::{GameOutcome, Position, WIDTH};

/// Solve Connect Four positions read one move sequence per line.
///
/// A sequence lists the 1-based columns played so far, e.g. `4453`. Each
/// result line holds the sequence, its score for the player to move, the
/// number of explored nodes, the time taken in microseconds and the search
/// status.
#[derive(Parser)]
#[command(name = "connect4-solver", version, about = "Solve Connect Four positions")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Read sequences from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Override the time budget per position, in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,

    /// Override the maximum search depth
    #[arg(long)]
    depth: Option<usize>,

    /// Override the number of transposition cache slots
    #[arg(long)]
    cache_slots: Option<usize>,

    /// Disable the transposition cache
    #[arg(long)]
    no_cache: bool,

    /// Print one JSON object per position
    #[arg(long)]
    json: bool,

    /// Score every playable column instead of the position itself
    #[arg(long)]
    analyze: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    sequence: &'a str,
    score: i32,
    depth: usize,
    status: SearchStatus,
    nodes: u64,
    elapsed_us: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<GameOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    moves: Option<Vec<MoveScore>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::default(),
    };

    // Apply CLI overrides
    if let Some(ms) = cli.time_limit_ms {
        config.solver.time_limit_ms = Some(ms);
    }
    if let Some(depth) = cli.depth {
        config.solver.depth_limit = Some(depth);
    }
    if let Some(slots) = cli.cache_slots {
        config.solver.cache_slots = slots;
    }
    if cli.no_cache {
        config.solver.use_cache = false;
    }
    if cli.json {
        config.output.format = OutputFormat::Json;
    }
    config.validate().context("invalid command-line overrides")?;

    if cli.print_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("serializing configuration")?
        );
        return Ok(());
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.output.log_level.as_str()),
    )
    .init();
    log::debug!("effective configuration: {config:?}");

    let reader: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let mut solver = Solver::from_config(&config.solver);
    let mut out = BufWriter::new(io::stdout().lock());

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.context("reading input")?;
        let sequence = line.trim();
        if sequence.is_empty() {
            continue;
        }

        let position = match Position::from_sequence(sequence) {
            Ok(position) => position,
            Err(err) => {
                eprintln!(
                    "Line {}: invalid move {} \"{}\"",
                    line_no + 1,
                    err.index(),
                    sequence
                );
                log::debug!("line {} rejected: {err}", line_no + 1);
                continue;
            }
        };

        let report = if cli.analyze {
            analyze(&mut solver, &position, sequence)
        } else {
            solve(&mut solver, &position, sequence)
        };
        match config.output.format {
            OutputFormat::Json => {
                serde_json::to_writer(&mut out, &report).context("writing JSON output")?;
                writeln!(out)?;
            }
            OutputFormat::Text => writeln!(out, "{}", text_line(&report))?,
        }
        // Results can take a while each; show them as they arrive.
        out.flush()?;
    }

    Ok(())
}

fn solve<'a>(solver: &mut Solver, position: &Position, sequence: &'a str) -> Report<'a> {
    let solution = solver.solve(position);
    Report {
        sequence,
        score: solution.score,
        depth: solution.depth,
        status: solution.status,
        nodes: solution.nodes,
        elapsed_us: solution.elapsed.as_micros(),
        outcome: solution.outcome(position),
        moves: None,
    }
}

fn analyze<'a>(solver: &mut Solver, position: &Position, sequence: &'a str) -> Report<'a> {
    let start = Instant::now();
    let moves = solver.analyze(position);
    let elapsed = start.elapsed();

    let best = moves.iter().map(|m| m.score).max().unwrap_or(0);
    let status = combined_status(&moves);
    Report {
        sequence,
        score: best,
        depth: 0,
        status,
        nodes: solver.explored_node_count(),
        elapsed_us: elapsed.as_micros(),
        outcome: None,
        moves: Some(moves),
    }
}

/// Weakest status among the analyzed moves.
fn combined_status(moves: &[MoveScore]) -> SearchStatus {
    let rank = |status: SearchStatus| match status {
        SearchStatus::Exact => 0,
        SearchStatus::DepthLimited => 1,
        SearchStatus::TimedOut => 2,
    };
    moves
        .iter()
        .map(|m| m.status)
        .max_by_key(|&status| rank(status))
        .unwrap_or(SearchStatus::Exact)
}

fn status_label(status: SearchStatus) -> &'static str {
    match status {
        SearchStatus::Exact => "exact",
        SearchStatus::DepthLimited => "depth-limited",
        SearchStatus::TimedOut => "timed-out",
    }
}

fn text_line(report: &Report<'_>) -> String {
    match &report.moves {
        // One score per column, `-` for columns that cannot be played.
        Some(moves) => {
            let mut columns = vec!["-".to_string(); WIDTH];
            for m in moves {
                columns[m.column] = m.score.to_string();
            }
            format!(
                "{} {} {} {} {}",
                report.sequence,
                columns.join(" "),
                report.nodes,
                report.elapsed_us,
                status_label(report.status)
            )
        }
        None => format!(
            "{} {} {} {} {}",
            report.sequence,
            report.score,
            report.nodes,
            report.elapsed_us,
            status_label(report.status)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(moves: Option<Vec<MoveScore>>) -> Report<'static> {
        Report {
            sequence: "4453",
            score: 5,
            depth: 38,
            status: SearchStatus::Exact,
            nodes: 1234,
            elapsed_us: 56,
            outcome: None,
            moves,
        }
    }

    #[test]
    fn test_text_line_for_solve() {
        assert_eq!(text_line(&report(None)), "4453 5 1234 56 exact");
    }

    #[test]
    fn test_text_line_for_analysis_marks_full_columns() {
        let moves = vec![
            MoveScore { column: 0, score: -2, status: SearchStatus::Exact },
            MoveScore { column: 3, score: 5, status: SearchStatus::Exact },
        ];
        assert_eq!(
            text_line(&report(Some(moves))),
            "4453 -2 - - 5 - - - 1234 56 exact"
        );
    }

    #[test]
    fn test_combined_status_takes_weakest() {
        let moves = [
            MoveScore { column: 0, score: 0, status: SearchStatus::Exact },
            MoveScore { column: 1, score: 0, status: SearchStatus::TimedOut },
            MoveScore { column: 2, score: 0, status: SearchStatus::DepthLimited },
        ];
        assert_eq!(combined_status(&moves), SearchStatus::TimedOut);
        assert_eq!(combined_status(&[]), SearchStatus::Exact);
    }

    #[test]
    fn test_json_report_omits_missing_fields() {
        let json = serde_json::to_string(&report(None)).unwrap();
        assert!(json.contains(r#""status":"exact""#));
        assert!(!json.contains("moves"));
        assert!(!json.contains("outcome"));
    }

    #[test]
    fn test_cli_parses_overrides() {
        let cli = Cli::parse_from([
            "connect4-solver",
            "--depth",
            "8",
            "--no-cache",
            "--json",
        ]);
        assert_eq!(cli.depth, Some(8));
        assert!(cli.no_cache);
        assert!(cli.json);
        assert!(!cli.analyze);
    }
}
