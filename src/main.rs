use std::io::{self, BufRead, Write};

use thiserror::Error;

use phonics_engine::config::Config;
use phonics_engine::logging::init_tracing;
use phonics_engine::{Attempt, LearningEngine};

#[derive(Debug, Error)]
enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default)]
struct ReplaySummary {
    recorded: usize,
    skipped: usize,
}

/// Feeds JSON-lines attempts through the engine. Malformed lines and
/// rejected attempts are logged and skipped.
fn replay(engine: &LearningEngine, input: impl BufRead) -> Result<ReplaySummary, ReplayError> {
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let attempt: Attempt = match serde_json::from_str(&line) {
            Ok(attempt) => attempt,
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "skipping malformed attempt");
                summary.skipped += 1;
                continue;
            }
        };

        match engine.record(&attempt) {
            Ok(_) => summary.recorded += 1,
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "skipping rejected attempt");
                summary.skipped += 1;
            }
        }
    }

    Ok(summary)
}

fn run(config: &Config) -> Result<(), ReplayError> {
    let engine = LearningEngine::with_options(config.engine_options());

    let stdin = io::stdin();
    let summary = replay(&engine, stdin.lock())?;
    tracing::info!(
        recorded = summary.recorded,
        skipped = summary.skipped,
        learners = engine.learner_count(),
        "replay finished"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &engine.export())?;
    writeln!(out)?;
    Ok(())
}

fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = init_tracing(&config.log_level);

    tracing::info!(
        review_profile = config.review_profile.as_str(),
        sticky_mastery = config.sticky_mastery,
        "phonics-engine replay starting"
    );

    if let Err(err) = run(&config) {
        tracing::error!(error = %err, "replay failed");
        std::process::exit(1);
    }
}
