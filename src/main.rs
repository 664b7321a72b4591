use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use log::{error, info, warn};
use serde::Deserialize;
use tokio::runtime::Builder;

use valve_schedule::config::Config;
use valve_schedule::io::gateway::hass::HomeAssistantGateway;
use valve_schedule::io::gateway::PublishGateway;
use valve_schedule::io::store::file::JsonFilePort;
use valve_schedule::io::store::{DocumentPort, SettingsStore};
use valve_schedule::logging::{init_logging, reload_log_level, FILTER_FILE};
use valve_schedule::schedule::grouping::EditableWeek;
use valve_schedule::schedule::ScheduleRow;
use valve_schedule::sync::ScheduleSync;
use valve_schedule::time_util::mytime::{RealTimeProvider, TimeProvider};

const CONFIG_FILE: &str = "valve_schedule.toml";

const USAGE: &str = "\
Usage: valve_schedule [--config <file>] <command>

Commands:
  devices                                   List the configured valves
  show <device>                             Show the last applied schedule of a valve
  apply <device> <rows.toml> [--merge] [--dry-run]
                                            Send a schedule to a valve and store it
  clear --yes                               Forget the stored schedules of every valve
  logging                                   Re-read logging.env and show the filter in effect";

#[derive(Debug, PartialEq)]
enum Command {
    Devices,
    Show { device: String },
    Apply { device: String, rows: PathBuf, merge: bool, dry_run: bool },
    Clear { confirmed: bool },
    Logging,
}

fn parse_args(args: &[String]) -> Result<(PathBuf, Command), String> {
    let mut config = PathBuf::from(CONFIG_FILE);
    let mut merge = false;
    let mut dry_run = false;
    let mut confirmed = false;
    let mut positional = Vec::new();

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config = args
                    .next()
                    .map(PathBuf::from)
                    .ok_or_else(|| "--config needs a file".to_owned())?
            }
            "--merge" => merge = true,
            "--dry-run" => dry_run = true,
            "--yes" => confirmed = true,
            flag if flag.starts_with("--") => return Err(format!("Unknown option {}", flag)),
            _ => positional.push(arg.as_str()),
        }
    }

    let command = match positional.as_slice() {
        ["devices"] => Command::Devices,
        ["show", device] => Command::Show {
            device: device.to_string(),
        },
        ["apply", device, rows] => Command::Apply {
            device: device.to_string(),
            rows: PathBuf::from(rows),
            merge,
            dry_run,
        },
        ["clear"] => Command::Clear { confirmed },
        ["logging"] => Command::Logging,
        [] => return Err("No command given".to_owned()),
        other => return Err(format!("Unrecognised command: {}", other.join(" "))),
    };
    Ok((config, command))
}

/// Rows edited outside of a UI, one entry per day group.
#[derive(Deserialize, Debug)]
struct RowsFile {
    merge_weekdays: Option<bool>,
    #[serde(default)]
    groups: Vec<GroupRows>,
}

#[derive(Deserialize, Debug)]
struct GroupRows {
    rows: Vec<ScheduleRow>,
}

fn read_rows(path: &Path) -> Result<RowsFile, String> {
    let s = fs::read_to_string(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    toml::from_str(&s).map_err(|e| format!("Failed to read rows from {:?}: {}", path, e))
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_file, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match Config::load(&config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let logging = init_logging(Path::new(FILTER_FILE)).expect("Failed to initialise logging");

    if command == Command::Logging {
        return match reload_log_level(&logging, Path::new(FILTER_FILE)) {
            Ok(filter) => {
                println!("Log filter: {}", filter);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_time()
        .enable_io()
        .build()
        .expect("Expected to be able to make runtime");

    let store = SettingsStore::new(
        JsonFilePort::new(config.get_store().get_file().clone()),
        RealTimeProvider::default(),
    );
    let gateway = HomeAssistantGateway::create(config.get_home_assistant());
    let sync = ScheduleSync::create(config.get_devices(), gateway, store);

    match rt.block_on(run(command, &config, &sync)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run<G, P, T>(command: Command, config: &Config, sync: &ScheduleSync<G, P, T>) -> Result<(), String>
where
    G: PublishGateway,
    P: DocumentPort,
    T: TimeProvider,
{
    match command {
        Command::Devices => {
            let document = sync.store().get().await;
            for device in config.get_devices() {
                let state = match document.get_device(device.get_id()) {
                    Some(_) => "saved",
                    None => "empty",
                };
                println!("{:<28} {:<28} {}", device.get_id(), device.get_name(), state);
            }
            Ok(())
        }
        Command::Show { device } => {
            let week = sync.restore(&device).await;
            if let Some(saved_at) = sync.store().get().await.get_saved_at() {
                println!("Last saved {}", saved_at);
            }
            print_week(&device, &week);
            Ok(())
        }
        Command::Apply {
            device,
            rows,
            merge,
            dry_run,
        } => {
            let rows_file = read_rows(&rows)?;
            let mut week = sync.restore(&device).await;
            week.set_merge(
                merge
                    || rows_file
                        .merge_weekdays
                        .unwrap_or(config.get_editor().should_merge_weekdays()),
            );
            for (group_index, group) in rows_file.groups.into_iter().enumerate() {
                if !week.set_group_rows(group_index, group.rows) {
                    warn!("Ignoring rows for group {}, there are only {}", group_index, week.groups().len());
                }
            }

            if dry_run {
                let schedule = sync.codec().encode(&device, &week.grouped_rows(), week.is_merged());
                let payload = serde_json::to_string_pretty(&schedule).map_err(|e| e.to_string())?;
                println!("{}", payload);
                return Ok(());
            }

            sync.apply(&device, &week).await.map_err(|e| e.to_string())?;
            info!("Changes saved for {}", device);
            print_week(&device, &week);
            Ok(())
        }
        Command::Clear { confirmed } => {
            if !confirmed {
                return Err("Clearing forgets the schedules of every valve, pass --yes to confirm".to_owned());
            }
            sync.clear().await.map_err(|e| e.to_string())
        }
        Command::Logging => Ok(()),
    }
}

fn print_week(device: &str, week: &EditableWeek) {
    println!("{}", device);
    for group in week.groups() {
        let rows = week.day_rows(group.first_day());
        let rows: Vec<String> = rows.iter().map(ScheduleRow::to_string).collect();
        println!("  {:<20} {}", group.label(), rows.join("  "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_owned).collect()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            parse_args(&args("show thermostat_kitchen")),
            Ok((PathBuf::from(CONFIG_FILE), Command::Show { device: "thermostat_kitchen".to_owned() }))
        );
        assert_eq!(
            parse_args(&args("--config other.toml apply thermostat_bath rows.toml --merge")),
            Ok((
                PathBuf::from("other.toml"),
                Command::Apply {
                    device: "thermostat_bath".to_owned(),
                    rows: PathBuf::from("rows.toml"),
                    merge: true,
                    dry_run: false,
                }
            ))
        );
        assert_eq!(
            parse_args(&args("clear")).map(|(_, c)| c),
            Ok(Command::Clear { confirmed: false })
        );
        assert_eq!(parse_args(&args("logging")).map(|(_, c)| c), Ok(Command::Logging));
        assert!(parse_args(&args("")).is_err());
        assert!(parse_args(&args("show")).is_err());
        assert!(parse_args(&args("devices --verbose")).is_err());
        assert!(parse_args(&args("--config")).is_err());
    }

    #[test]
    fn reads_rows_file() {
        let rows = read_rows(Path::new("test/rows.toml")).unwrap();
        assert_eq!(rows.merge_weekdays, Some(true));
        assert_eq!(rows.groups.len(), 2);
        assert_eq!(rows.groups[1].rows[0], ScheduleRow::new(6, 30, 20.5).unwrap());
    }
}
