//! Shared helpers for the hcal pipeline applications

use std::io::Write;

use colored::{
  Colorize,
  ColoredString,
};
use log::Level;

use hcal_dataclasses::process::Process;

/// Make sure that the loglevel is in color, even though not using pretty_env logger
pub fn color_log(level : &Level) -> ColoredString {
  match level {
    Level::Error    => String::from(" ERROR!").red(),
    Level::Warn     => String::from(" WARN  ").yellow(),
    Level::Info     => String::from(" Info  ").green(),
    Level::Debug    => String::from(" debug ").blue(),
    Level::Trace    => String::from(" trace ").cyan(),
  }
}

/// Set up the environmental (env) logger
/// with our format
///
/// Ensure that the lines and module paths
/// are printed in the logging output
pub fn init_env_logger() {
  env_logger::builder()
    .format(|buf, record| {
    writeln!( buf, "[{level}][{module_path}:{line}] {args}",
      level = color_log(&record.level()),
      module_path = record.module_path().unwrap_or("<unknown>"),
      line = record.line().unwrap_or(0),
      args = record.args()
      )
    }).init();
}

/// One line per stage, for the console
pub fn summarize(process : &Process) -> String {
  let mut summary = format!("==> Process {} (run {}, max events {})",
                            process.pass_name.bold(), process.run, process.max_events);
  for (k, stage) in process.sequence.iter().enumerate() {
    summary += &(format!("\n  -- [{}] {}", k, stage));
  }
  for provider in &process.conditions_providers {
    summary += &(format!("\n  -- {}", provider));
  }
  summary
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn summary_lists_all_stages() {
    let process = Process::hcal_digi_pipeline(0.5, 4.0);
    let summary = summarize(&process);
    for name in ["mySim", "myHcalDigis", "myHcalRecHits", "HcalGeometryProvider"] {
      assert!(summary.contains(name));
    }
  }
}
