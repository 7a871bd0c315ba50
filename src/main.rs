use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use radiorip::capture::process::ProcessRecorder;
use radiorip::capture::Session;
use radiorip::config::{Config, DEFAULT_BITRATE, DEFAULT_BUFFER_SECONDS, DEFAULT_FETCH_ATTEMPTS};
use radiorip::error::Error;
use radiorip::schedule::DEFAULT_SCHEDULE_URL;
use radiorip::station::STATIONS;

/// Record the program currently on air on an NHK radio station.
#[derive(Parser)]
#[command(version)]
pub struct Cli {
    /// Station code (NHK1, NHK2 or FM).
    #[arg(required_unless_present = "list_stations")]
    pub station: Option<String>,

    /// Directory the recording is written to while in progress.
    #[arg(long, env = "TMPDIR")]
    pub scratch_dir: Option<PathBuf>,

    /// Extra seconds recorded past the scheduled end.
    #[arg(long = "buffer", env = "RIPDIRU_BUFFER", default_value_t = DEFAULT_BUFFER_SECONDS)]
    pub buffer_seconds: i64,

    /// Directory finished recordings are moved to [default: ~/Music/Radiru].
    #[arg(long = "outdir", env = "RIPDIRU_OUTDIR")]
    pub out_dir: Option<PathBuf>,

    /// Target mp3 bitrate.
    #[arg(long, env = "RIPDIRU_BITRATE", default_value = DEFAULT_BITRATE)]
    pub bitrate: String,

    /// Schedule feed to look the program up in.
    #[arg(long, env = "RIPDIRU_SCHEDULE_URL", default_value = DEFAULT_SCHEDULE_URL)]
    pub schedule_url: String,

    /// How many times to try fetching the schedule.
    #[arg(long, env = "RIPDIRU_FETCH_ATTEMPTS", default_value_t = DEFAULT_FETCH_ATTEMPTS)]
    pub fetch_attempts: u32,

    /// Print what would be run without recording anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the known stations and exit.
    #[arg(long)]
    pub list_stations: bool,
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();

        Config {
            scratch_dir: self.scratch_dir.clone().unwrap_or(defaults.scratch_dir),
            buffer_seconds: self.buffer_seconds,
            out_dir: self.out_dir.clone().unwrap_or(defaults.out_dir),
            bitrate: self.bitrate.clone(),
            schedule_url: self.schedule_url.clone(),
            fetch_attempts: self.fetch_attempts,
        }
    }
}

pub fn main() -> ExitCode {
    // A missing .env file is normal.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if cli.list_stations {
        for station in STATIONS.iter() {
            println!(
                "{:<6} {:<7} {}",
                station.code,
                station.match_id,
                radiorip::capture::command::stream_url(station)
            );
        }
        return ExitCode::SUCCESS;
    }

    let config = cli.config();
    let station = cli.station.as_deref().unwrap_or_default();

    let result = if cli.dry_run {
        dry_run(&config, station).map(|_| None)
    } else {
        radiorip::rip(&config, station).map(Some)
    };

    match result {
        Ok(Some(path)) => {
            println!("Saved {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            if matches!(e, Error::UnknownStation(_)) {
                let codes: Vec<&str> = STATIONS.iter().map(|s| s.code).collect();
                println!("Usage: radiorip [{}]", codes.join("|"));
            }
            eprintln!("radiorip: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn dry_run(config: &Config, station: &str) -> Result<(), Error> {
    let (profile, program) = radiorip::now_playing(config, station)?;
    let mut session = Session::new(ProcessRecorder, config);
    let plan = session.plan(profile, &program)?;

    println!("{} ~ {} ({})", program.title, program.to.format("%H:%M"), program.info);
    println!("{} | {}", plan.capture, plan.transcode);
    println!("{}", session.destination(&program).display());

    Ok(())
}
