use std::collections::{BTreeMap, HashMap};

use itertools::Itertools;
use log::{debug, warn};

use super::document::PersistedDocument;
use super::grouping::{expand_all, EditableWeek};
use super::{DayProgram, ScheduleRow, Transition, WeeklySchedule, Weekday, DAYS_PER_WEEK, TRANSITIONS_PER_DAY};

/// Rows used for any position the user has not filled in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefaultLadder {
    hours: [u8; TRANSITIONS_PER_DAY],
    temperatures: [f32; TRANSITIONS_PER_DAY],
}

impl DefaultLadder {
    pub const HOURS: [u8; TRANSITIONS_PER_DAY] = [6, 12, 18, 23];
    pub const TEMPERATURES: [f32; TRANSITIONS_PER_DAY] = [20.0, 21.0, 21.0, 16.0];

    pub fn standard() -> Self {
        Self {
            hours: Self::HOURS,
            temperatures: Self::TEMPERATURES,
        }
    }

    /// Standard hours, one temperature for the whole day.
    pub fn uniform(temperature: f32) -> Self {
        Self {
            hours: Self::HOURS,
            temperatures: [temperature; TRANSITIONS_PER_DAY],
        }
    }

    pub fn row(&self, position: usize) -> ScheduleRow {
        ScheduleRow {
            hour: self.hours[position],
            minute: 0,
            temperature: self.temperatures[position],
        }
    }

    /// Exactly four rows: the given rows by position, the ladder wherever one is missing.
    pub fn fill(&self, rows: &[ScheduleRow]) -> [ScheduleRow; TRANSITIONS_PER_DAY] {
        std::array::from_fn(|position| rows.get(position).copied().unwrap_or_else(|| self.row(position)))
    }
}

impl Default for DefaultLadder {
    fn default() -> Self {
        Self::standard()
    }
}

/// Translates between editable rows and the payload a valve understands.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCodec {
    device_defaults: HashMap<String, f32>,
}

impl ScheduleCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a single default temperature for a device instead of the standard ladder.
    pub fn with_device_default(mut self, device_id: &str, temperature: f32) -> Self {
        self.device_defaults.insert(device_id.to_owned(), temperature);
        self
    }

    pub fn ladder_for(&self, device_id: &str) -> DefaultLadder {
        match self.device_defaults.get(device_id) {
            Some(temperature) => DefaultLadder::uniform(*temperature),
            None => DefaultLadder::standard(),
        }
    }

    /// Build the full seven day schedule from the edited groups.
    /// Groups (or rows) that are missing are filled from the defaults for the device.
    /// Each day's transitions are sent in time order, so rows given out of order come back sorted.
    pub fn encode(&self, device_id: &str, grouped_rows: &[Vec<ScheduleRow>], merge_enabled: bool) -> WeeklySchedule {
        let ladder = self.ladder_for(device_id);
        let days = expand_all(grouped_rows, merge_enabled);

        let mut programs = BTreeMap::new();
        for day in Weekday::ALL {
            let rows = &days[day.position()];
            if rows.len() > TRANSITIONS_PER_DAY {
                warn!(
                    "{}: {} has {} rows, only the first {} are sent",
                    device_id,
                    day,
                    rows.len(),
                    TRANSITIONS_PER_DAY
                );
            }
            let transitions = ladder
                .fill(rows)
                .iter()
                .sorted_by_key(|row| row.minutes_of_day())
                .map(Transition::from_row)
                .collect_vec();
            programs.insert(day.slot_key(), DayProgram::new(day, transitions));
        }

        debug!("Encoded schedule for {} (merge: {})", device_id, merge_enabled);
        WeeklySchedule::new(programs)
    }

    /// Stored transitions for each calendar day, Monday first. Empty where nothing is stored.
    pub fn decode(&self, device_id: &str, document: &PersistedDocument) -> [Vec<Transition>; DAYS_PER_WEEK] {
        let mut days: [Vec<Transition>; DAYS_PER_WEEK] = Default::default();
        let Some(settings) = document.get_device(device_id) else {
            debug!("No stored schedule for {}", device_id);
            return days;
        };
        for day in Weekday::ALL {
            if let Some(program) = settings.get_schedule().get_day(day) {
                days[day.position()] = program.get_transitions().to_vec();
            }
        }
        days
    }

    /// Editable rows for one day, rebuilt from what was stored.
    pub fn restore_rows(&self, device_id: &str, transitions: &[Transition]) -> [ScheduleRow; TRANSITIONS_PER_DAY] {
        let ladder = self.ladder_for(device_id);
        std::array::from_fn(|position| {
            let default = ladder.row(position);
            let Some(transition) = transitions.get(position) else {
                return default;
            };
            let minutes = transition.get_transition_time().min(24 * 60 - 1);
            let temperature = transition
                .parse_setpoint()
                .and_then(|t| ScheduleRow::new(0, 0, t).ok())
                .map(|row| row.get_temperature())
                .unwrap_or_else(|| {
                    warn!(
                        "{}: unusable stored setpoint '{}', using {}",
                        device_id,
                        transition.get_heat_setpoint(),
                        default.get_temperature()
                    );
                    default.get_temperature()
                });
            ScheduleRow {
                hour: (minutes / 60) as u8,
                minute: (minutes % 60) as u8,
                temperature,
            }
        })
    }

    /// The editable week for a device, as it was last stored.
    pub fn restore_week(&self, device_id: &str, document: &PersistedDocument) -> EditableWeek {
        let decoded = self.decode(device_id, document);
        EditableWeek::from_days(std::array::from_fn(|position| {
            self.restore_rows(device_id, &decoded[position]).to_vec()
        }))
    }
}
