//! HCAL-DIGI-PIPELINE - assemble the particle gun -> digitization 
//! -> reconstruction pipeline for the v12 HCal and write 
//! its configuration to disk.
//!

#[macro_use] extern crate log;

use std::path::PathBuf;
use std::process::exit;

use clap::{arg,
           command,
           Parser};
use colored::Colorize;

use hcal_dataclasses::process::Process;
use hcal_pipeline::{init_env_logger,
                    summarize};

/*************************************/

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Gain of the HGCROC chips
  #[arg(short, long, default_value_t = 0.5)]
  gain: f64,
  /// Energy of the neutrons shot by the particle gun [GeV]
  #[arg(short, long, default_value_t = 4.0)]
  energy: f64,
  /// Overwrite the number of events to process
  #[arg(short, long)]
  max_events: Option<u64>,
  /// Write the configuration to this file 
  #[arg(short, long, default_value = "hcal_digi_pipeline.toml")]
  output: String,
  /// Write the configuration additionally as json
  #[arg(long, default_value_t = false)]
  json: bool,
  /// Don't build a new pipeline, but read and 
  /// check an existing configuration file
  #[arg(long)]
  check: Option<PathBuf>,
  /// Enhance output to console
  #[arg(short, long, default_value_t = false)]
  verbose: bool,
}

/*************************************/

fn main() {
  init_env_logger();
  
  // welcome banner!
  println!("-----------------------------------------------");
  println!(" ** Welcome to hcal-digi-pipeline *****");
  println!(" .. basic 4GeV neutron gun -> HGCROC digitization");
  println!(" .. -> HCal reconstruction for the v12 detector");
  println!("-----------------------------------------------");
  
  let args = Args::parse();

  if let Some(path) = args.check {
    let filename = path.to_string_lossy().to_string();
    let process = match Process::from_toml(&filename) {
      Ok(process) => process,
      Err(err) => {
        error!("Unable to read {}! {}", filename, err);
        exit(1);
      }
    };
    println!("{}", summarize(&process));
    match process.validate() {
      Ok(_) => {
        println!("==> {} {}", filename, "is a valid pipeline!".green());
        exit(0);
      }
      Err(err) => {
        error!("{} is not a valid pipeline! {}", filename, err);
        exit(1);
      }
    }
  }

  if !args.gain.is_finite() || args.gain <= 0.0 {
    warn!("Gain of {} does not seem physical, will continue anyway!", args.gain);
  }
  let mut process = Process::hcal_digi_pipeline(args.gain, args.energy);
  if let Some(max_events) = args.max_events {
    info!("Will process {} events!", max_events);
    process.max_events = max_events;
  }
  if let Err(err) = process.validate() {
    error!("Pipeline is not valid! {}", err);
    exit(1);
  }
  println!("{}", summarize(&process));
  if args.verbose {
    for stage in &process.sequence {
      match serde_json::to_string_pretty(stage) {
        Ok(repr) => println!("{}", repr),
        Err(err) => error!("Can not represent {} as json! {err}", stage)
      }
    }
  }

  if let Err(err) = process.to_toml(&args.output) {
    error!("Unable to write {}! {}", args.output, err);
    exit(1);
  }
  if args.json {
    let json_file = args.output.trim_end_matches(".toml");
    if let Err(err) = process.to_json(json_file) {
      error!("Unable to write json! {}", err);
      exit(1);
    }
  }
  println!("==> Configuration for {} written to {}", process.pass_name, args.output.bold());
}
