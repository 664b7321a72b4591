use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::EnumIter;

pub mod codec;
pub mod document;
pub mod grouping;

pub const DAYS_PER_WEEK: usize = 7;
pub const TRANSITIONS_PER_DAY: usize = 4;
/// The only program mode the valves accept for an autonomous weekly schedule.
pub const SCHEDULE_MODE: u8 = 1;

/// Day numbering used by the valve firmware, indexed by calendar position (Monday first).
/// The firmware does not count from Monday: a schedule sent with calendar numbering
/// runs every day's program on the wrong day.
pub const WIRE_DAY_CODES: [u8; DAYS_PER_WEEK] = [6, 7, 1, 2, 3, 4, 5];

pub const MIN_TEMPERATURE: f32 = 15.0;
pub const MAX_TEMPERATURE: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, strum_macros::Display)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; DAYS_PER_WEEK] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// 0 for Monday through 6 for Sunday.
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// Calendar day of week, Monday = 1.
    pub fn slot(&self) -> u8 {
        self.position() as u8 + 1
    }

    /// Key of this day within a [WeeklySchedule].
    pub fn slot_key(&self) -> String {
        self.slot().to_string()
    }

    pub fn wire_day_code(&self) -> u8 {
        WIRE_DAY_CODES[self.position()]
    }

    pub fn from_position(position: usize) -> Option<Weekday> {
        Self::ALL.get(position).copied()
    }

    pub fn from_slot(slot: u8) -> Option<Weekday> {
        match slot {
            0 => None,
            slot => Self::from_position(slot as usize - 1),
        }
    }
}

/// A single editable row: at hour:minute the valve changes to the given temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRow")]
pub struct ScheduleRow {
    hour: u8,
    minute: u8,
    temperature: f32,
}

impl ScheduleRow {
    pub fn new(hour: u8, minute: u8, temperature: f32) -> Result<Self, InvalidRow> {
        if hour > 23 {
            return Err(InvalidRow::Hour(hour));
        }
        if minute > 59 {
            return Err(InvalidRow::Minute(minute));
        }
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(InvalidRow::Temperature(temperature));
        }
        Ok(Self {
            hour,
            minute,
            temperature,
        })
    }

    pub fn get_hour(&self) -> u8 {
        self.hour
    }

    pub fn get_minute(&self) -> u8 {
        self.minute
    }

    pub fn get_temperature(&self) -> f32 {
        self.temperature
    }

    pub fn minutes_of_day(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

impl Display for ScheduleRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0>2}:{:0>2} {}°",
            self.hour,
            self.minute,
            format_setpoint(self.temperature)
        )
    }
}

#[derive(Deserialize)]
struct RawRow {
    hour: u8,
    minute: u8,
    temperature: f32,
}

impl TryFrom<RawRow> for ScheduleRow {
    type Error = InvalidRow;

    fn try_from(raw: RawRow) -> Result<Self, Self::Error> {
        ScheduleRow::new(raw.hour, raw.minute, raw.temperature)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidRow {
    Hour(u8),
    Minute(u8),
    Temperature(f32),
}

impl Display for InvalidRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidRow::Hour(hour) => write!(f, "Hour {} is not within 0-23", hour),
            InvalidRow::Minute(minute) => write!(f, "Minute {} is not within 0-59", minute),
            InvalidRow::Temperature(temp) => write!(
                f,
                "Temperature {} is not within {}-{}",
                temp, MIN_TEMPERATURE, MAX_TEMPERATURE
            ),
        }
    }
}

impl std::error::Error for InvalidRow {}

/// Shortest decimal rendering, the way the valve expects setpoints: 20.0 -> "20", 20.5 -> "20.5"
pub fn format_setpoint(temperature: f32) -> String {
    if temperature.fract() == 0.0 {
        format!("{:.0}", temperature)
    } else {
        format!("{}", temperature)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    #[serde(deserialize_with = "setpoint_string_or_number")]
    heat_setpoint: String,
    transition_time: u16,
}

impl Transition {
    pub fn new(heat_setpoint: String, transition_time: u16) -> Self {
        Self {
            heat_setpoint,
            transition_time,
        }
    }

    pub fn from_row(row: &ScheduleRow) -> Self {
        Self::new(format_setpoint(row.temperature), row.minutes_of_day())
    }

    pub fn get_heat_setpoint(&self) -> &str {
        &self.heat_setpoint
    }

    pub fn get_transition_time(&self) -> u16 {
        self.transition_time
    }

    /// The setpoint as a number, if it is one.
    pub fn parse_setpoint(&self) -> Option<f32> {
        self.heat_setpoint.trim().parse().ok()
    }
}

// Older documents were written with numeric setpoints.
fn setpoint_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Setpoint {
        Text(String),
        Number(f64),
    }

    Ok(match Setpoint::deserialize(deserializer)? {
        Setpoint::Text(s) => s,
        Setpoint::Number(n) => format_setpoint(n as f32),
    })
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DayProgram {
    dayofweek: u8,
    mode: u8,
    numoftrans: u8,
    transitions: Vec<Transition>,
}

impl DayProgram {
    pub fn new(day: Weekday, transitions: Vec<Transition>) -> Self {
        Self {
            dayofweek: day.wire_day_code(),
            mode: SCHEDULE_MODE,
            numoftrans: transitions.len() as u8,
            transitions,
        }
    }

    pub fn get_wire_day_code(&self) -> u8 {
        self.dayofweek
    }

    pub fn get_mode(&self) -> u8 {
        self.mode
    }

    pub fn get_transition_count(&self) -> u8 {
        self.numoftrans
    }

    pub fn get_transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

/// The payload published to a valve. Always holds all seven days, keyed "1" (Monday) to "7".
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WeeklySchedule {
    weekly_schedule: BTreeMap<String, DayProgram>,
}

impl WeeklySchedule {
    pub fn new(days: BTreeMap<String, DayProgram>) -> Self {
        Self {
            weekly_schedule: days,
        }
    }

    pub fn get_day(&self, day: Weekday) -> Option<&DayProgram> {
        self.weekly_schedule.get(&day.slot_key())
    }

    pub fn days(&self) -> &BTreeMap<String, DayProgram> {
        &self.weekly_schedule
    }
}
