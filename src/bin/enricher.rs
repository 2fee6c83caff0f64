// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    sync::Arc,
};
use stats_enricher::{
    configuration::AppConfig,
    snapshot::Record,
    Enricher, RateEngine,
};

fn main() -> anyhow::Result<()> {
    let app_config = AppConfig::from_env();
    let config = app_config.load()?;

    // stdout carries the enriched documents
    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(io::stderr)
        .init();
    tracing::info!(
        rate_unit = tracing::field::debug(config.rate_unit),
        include_raw = config.include_raw,
        replay = app_config.input.is_some(),
        "starting",
    );

    // a recorded file is replayed at docker's `read` times, live stdin at the clock
    let replay = app_config.input.is_some();
    let input: Box<dyn BufRead> = match &app_config.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };
    let enricher = Enricher::new(Arc::new(RateEngine::new(config.rate_unit)));

    let stdout = io::stdout();
    let mut output = stdout.lock();
    for (number, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = match line.parse::<Record>() {
            Ok(record) => record,
            Err(error) => {
                tracing::warn!(
                    line = number + 1,
                    error = tracing::field::display(&error),
                    "skip malformed snapshot",
                );
                continue;
            },
        };
        let stats = if replay {
            match enricher.compute_recorded_stats(&record.container, &record.snapshot, config.include_raw) {
                Ok(stats) => stats,
                Err(error) => {
                    tracing::warn!(
                        line = number + 1,
                        error = tracing::field::display(&error),
                        "skip snapshot without read time",
                    );
                    continue;
                },
            }
        } else {
            enricher.compute_enriched_stats(&record.container, &record.snapshot, config.include_raw)
        };
        serde_json::to_writer(&mut output, &stats)?;
        writeln!(output)?;
    }
    output.flush()?;

    tracing::info!(keys = enricher.rates().len(), "done");
    Ok(())
}
