use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use laprs::config::AppConfig;
use laprs::database::Database;
use laprs::detection;
use laprs::logging::{self, LogLevel};
use laprs::models::{Detection, Lap};

/// laprs - Workout Structure Detection CLI
///
/// Infers the structure of interval workouts (warmup, efforts, recoveries,
/// cooldown) from recorded per-second activity streams and summarizes
/// repeated efforts into sets.
#[derive(Parser)]
#[command(name = "laprs")]
#[command(version = "0.1.0")]
#[command(about = "Workout structure detection CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Database file (overrides the configured path)
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recent activities with usable streams
    List {
        /// Number of activities to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Detect workout structure for one activity and persist its laps
    Detect {
        /// Activity to analyze
        #[arg(short, long)]
        activity: i64,

        /// Print the detection summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored structural laps for one activity
    Show {
        /// Activity to display
        #[arg(short, long)]
        activity: i64,
    },
}

#[derive(Tabled)]
struct ActivityRow {
    #[tabled(rename = "id")]
    activity_id: i64,
    #[tabled(rename = "date")]
    date: String,
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "sport")]
    sport: String,
    #[tabled(rename = "dist (km)")]
    distance: String,
    #[tabled(rename = "dur (min)")]
    duration: String,
}

#[derive(Tabled)]
struct LapRow {
    #[tabled(rename = "type")]
    lap_type: String,
    #[tabled(rename = "#")]
    index: u32,
    #[tabled(rename = "start")]
    start_idx: usize,
    #[tabled(rename = "end")]
    end_idx: usize,
    #[tabled(rename = "dur (s)")]
    duration: i64,
    #[tabled(rename = "dist (m)")]
    distance: String,
    #[tabled(rename = "pace (s/km)")]
    pace: String,
    #[tabled(rename = "avg HR")]
    avg_hr: String,
    #[tabled(rename = "grade (%)")]
    avg_grade: String,
}

impl LapRow {
    fn from_lap(lap: &Lap) -> Self {
        LapRow {
            lap_type: lap.lap_type.to_string(),
            index: lap.lap_index,
            start_idx: lap.start_idx,
            end_idx: lap.end_idx,
            duration: lap.duration_s,
            distance: fmt_opt(lap.distance_m, 1),
            pace: fmt_opt(lap.pace_s_per_km, 0),
            avg_hr: fmt_opt(lap.avg_hr, 0),
            avg_grade: fmt_opt(lap.avg_grade, 1),
        }
    }
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "-".to_string(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };
    if let Some(db_path) = cli.db {
        config.db_path = db_path;
    }

    match cli.verbose {
        0 => {}
        1 => config.logging.level = LogLevel::Debug,
        _ => config.logging.level = LogLevel::Trace,
    }
    logging::init_logging(&config.logging)?;

    match cli.command {
        Commands::List { limit } => cmd_list(&config, limit),
        Commands::Detect { activity, json } => cmd_detect(&config, activity, json),
        Commands::Show { activity } => cmd_show(&config, activity),
    }
}

fn cmd_list(config: &AppConfig, limit: usize) -> Result<()> {
    let db = Database::new(&config.db_path)?;
    let activities = db.list_recent_activities(limit)?;

    if activities.is_empty() {
        println!("{}", "No activities with usable streams found.".yellow());
        return Ok(());
    }

    let rows: Vec<ActivityRow> = activities
        .iter()
        .map(|a| ActivityRow {
            activity_id: a.activity_id,
            date: a
                .start_date_local
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
            name: a.name.clone().unwrap_or_default(),
            sport: a.sport_type.clone().unwrap_or_default(),
            distance: fmt_opt(a.distance_km, 2),
            duration: fmt_opt(a.duration_min, 1),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::sharp()));
    Ok(())
}

fn cmd_detect(config: &AppConfig, activity_id: i64, json: bool) -> Result<()> {
    let mut db = Database::new(&config.db_path)?;
    let points = db.load_stream_points(activity_id)?;

    let detection = detection::detect(activity_id, &points, &config.detection)?;
    if let Some(laps) = &detection.laps {
        db.replace_structural_laps(activity_id, laps)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&detection.summary)?);
        return Ok(());
    }

    print_detection(activity_id, &detection);
    Ok(())
}

fn print_detection(activity_id: i64, detection: &Detection) {
    let summary = &detection.summary;

    if let Some(note) = &summary.note {
        println!(
            "{}",
            format!("Activity {}: {}", activity_id, note).yellow()
        );
        return;
    }

    println!(
        "{}",
        format!("Activity {} structure", activity_id).green().bold()
    );
    if let Some(laps) = &detection.laps {
        let rows: Vec<LapRow> = laps.iter().map(LapRow::from_lap).collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    if !summary.sets.is_empty() {
        println!("\n{}", "Sets:".bold());
        for set in &summary.sets {
            println!("  {} × ~{}s", set.count, set.median_s);
        }
    }

    if let (Some(median), Some(mad)) = (summary.v_median, summary.v_mad) {
        println!(
            "\nbaseline: median {:.2} m/s, MAD {:.3} ({} efforts, {} recoveries)",
            median, mad, summary.effort_count, summary.recup_count
        );
    }
}

fn cmd_show(config: &AppConfig, activity_id: i64) -> Result<()> {
    let db = Database::new(&config.db_path)?;
    let laps = db.load_laps(activity_id)?;

    if laps.is_empty() {
        println!(
            "{}",
            format!("No structural laps stored for activity {}.", activity_id).yellow()
        );
        return Ok(());
    }

    let rows: Vec<LapRow> = laps.iter().map(LapRow::from_lap).collect();
    println!("{}", Table::new(rows).with(Style::sharp()));
    Ok(())
}
