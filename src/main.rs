use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{NaiveDate, NaiveTime};
use clap::Parser;
use log::{error, info, warn};

use gpx_consolidator::{
    ClockZone, ConsolidateOptions, DEFAULT_DOCUMENT_NAME, DEFAULT_INPUT_DIR, DEFAULT_OUTPUT,
    FilterWindow, RunConfig, parse_clock_time, parse_filter_date,
};

/// Consolidate tracks and waypoints from multiple GPX files into one.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing GPX files
    #[arg(short, long, env = "GPX_CONSOLIDATOR_INPUT", default_value = DEFAULT_INPUT_DIR)]
    input: PathBuf,

    /// Output file path; refused if it already exists
    #[arg(short, long, env = "GPX_CONSOLIDATOR_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Only include points from this date (YYYY-MM-DD, ex: 2025-08-20)
    #[arg(long, value_parser = parse_filter_date)]
    filter_date: Option<NaiveDate>,

    /// Only include points at or after this time (HH:MM, ex: 06:00)
    #[arg(long, value_parser = parse_clock_time)]
    start_time: Option<NaiveTime>,

    /// Only include points at or before this time (HH:MM, ex: 20:00)
    #[arg(long, value_parser = parse_clock_time)]
    end_time: Option<NaiveTime>,

    /// Evaluate date and time filters in UTC instead of local time
    #[arg(long)]
    utc: bool,

    /// Metadata name of the consolidated document
    #[arg(long, default_value = DEFAULT_DOCUMENT_NAME)]
    name: String,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        let clock = if self.utc { ClockZone::Utc } else { ClockZone::Local };
        let filter =
            FilterWindow::new(self.filter_date, self.start_time, self.end_time).with_clock(clock);

        if let Some(date) = filter.date {
            info!("Filtering tracks to only include data from {date}");
        }
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => {
                info!("between {} and {}", start.format("%H:%M"), end.format("%H:%M"));
                if filter.time_range.is_some_and(|range| range.is_empty()) {
                    warn!("start time is after end time; no point can match");
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("both --start-time and --end-time are needed; time filter ignored");
            }
            (None, None) => {}
        }

        RunConfig {
            input_dir: self.input,
            output: self.output,
            options: ConsolidateOptions {
                filter,
                document_name: self.name,
                created_at: None,
            },
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let summary_json = cli.summary_json;
    let config = cli.into_config();

    match gpx_consolidator::run(&config) {
        Ok(summary) => {
            info!(
                "{} tracks ({} points) and {} waypoints written from {} files",
                summary.tracks_written,
                summary.points_written,
                summary.waypoints_written,
                summary.sources
            );
            if summary_json {
                match serde_json::to_string_pretty(&summary) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!("cannot encode summary: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
