use log::debug;

use super::{ScheduleRow, Weekday, DAYS_PER_WEEK};

/// Days edited together when Monday to Thursday are merged.
const MERGED_WEEKDAYS: [Weekday; 4] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
];

/// One block of rows the user edits, and the calendar days it is applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    index: usize,
    covered: Vec<Weekday>,
}

impl DayGroup {
    pub fn get_index(&self) -> usize {
        self.index
    }

    pub fn covered_days(&self) -> &[Weekday] {
        &self.covered
    }

    /// The day whose rows stand for the whole group.
    pub fn first_day(&self) -> Weekday {
        self.covered[0]
    }

    pub fn label(&self) -> String {
        match self.covered.as_slice() {
            [day] => day.to_string(),
            [first, .., last] => format!("{} - {}", first, last),
            [] => String::new(),
        }
    }
}

pub fn groups_for(merge_enabled: bool) -> Vec<DayGroup> {
    if !merge_enabled {
        return Weekday::ALL
            .iter()
            .enumerate()
            .map(|(index, day)| DayGroup {
                index,
                covered: vec![*day],
            })
            .collect();
    }

    let mut groups = vec![DayGroup {
        index: 0,
        covered: MERGED_WEEKDAYS.to_vec(),
    }];
    groups.extend(
        [Weekday::Friday, Weekday::Saturday, Weekday::Sunday]
            .into_iter()
            .enumerate()
            .map(|(i, day)| DayGroup {
                index: i + 1,
                covered: vec![day],
            }),
    );
    groups
}

/// The rows each covered day receives from the given group.
/// Every day of a merged group gets an identical copy, whatever it held before.
pub fn expand(
    group_index: usize,
    rows: &[ScheduleRow],
    merge_enabled: bool,
) -> Vec<(Weekday, Vec<ScheduleRow>)> {
    match groups_for(merge_enabled).into_iter().nth(group_index) {
        Some(group) => group
            .covered
            .into_iter()
            .map(|day| (day, rows.to_vec()))
            .collect(),
        None => {
            debug!("No day group {} (merge: {})", group_index, merge_enabled);
            Vec::new()
        }
    }
}

/// Expand every group into the seven calendar days, Monday first.
/// Days whose group was not supplied are left empty.
pub fn expand_all(grouped_rows: &[Vec<ScheduleRow>], merge_enabled: bool) -> [Vec<ScheduleRow>; DAYS_PER_WEEK] {
    let mut days: [Vec<ScheduleRow>; DAYS_PER_WEEK] = Default::default();
    for (group_index, rows) in grouped_rows.iter().enumerate() {
        for (day, rows) in expand(group_index, rows, merge_enabled) {
            days[day.position()] = rows;
        }
    }
    days
}

/// The editable state of one valve's week, independent of how it is displayed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditableWeek {
    days: [Vec<ScheduleRow>; DAYS_PER_WEEK],
    merge_weekdays: bool,
}

impl EditableWeek {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days(days: [Vec<ScheduleRow>; DAYS_PER_WEEK]) -> Self {
        Self {
            days,
            merge_weekdays: false,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.merge_weekdays
    }

    /// Merging keeps Monday and overwrites Tuesday to Thursday with Monday's rows.
    /// Un-merging keeps whatever each day currently holds.
    pub fn set_merge(&mut self, merge_weekdays: bool) {
        if merge_weekdays && !self.merge_weekdays {
            let monday = self.days[Weekday::Monday.position()].clone();
            for day in &MERGED_WEEKDAYS[1..] {
                self.days[day.position()] = monday.clone();
            }
        }
        self.merge_weekdays = merge_weekdays;
    }

    pub fn groups(&self) -> Vec<DayGroup> {
        groups_for(self.merge_weekdays)
    }

    pub fn day_rows(&self, day: Weekday) -> &[ScheduleRow] {
        &self.days[day.position()]
    }

    pub fn group_rows(&self, group_index: usize) -> Option<&[ScheduleRow]> {
        self.groups()
            .get(group_index)
            .map(|group| self.day_rows(group.first_day()))
    }

    /// Replace the rows of a group, writing them to every day it covers.
    /// Returns false if there is no such group.
    pub fn set_group_rows(&mut self, group_index: usize, rows: Vec<ScheduleRow>) -> bool {
        let expanded = expand(group_index, &rows, self.merge_weekdays);
        if expanded.is_empty() {
            return false;
        }
        for (day, rows) in expanded {
            self.days[day.position()] = rows;
        }
        true
    }

    /// Rows per group, in group order, ready for encoding.
    pub fn grouped_rows(&self) -> Vec<Vec<ScheduleRow>> {
        self.groups()
            .iter()
            .map(|group| self.day_rows(group.first_day()).to_vec())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(hour: u8, temperature: f32) -> ScheduleRow {
        ScheduleRow::new(hour, 0, temperature).unwrap()
    }

    #[test]
    fn unmerged_groups_are_single_days() {
        let groups = groups_for(false);
        assert_eq!(groups.len(), 7);
        for (i, group) in groups.iter().enumerate() {
            assert_eq!(group.get_index(), i);
            assert_eq!(group.covered_days(), &[Weekday::from_position(i).unwrap()]);
        }
    }

    #[test]
    fn merged_groups_cover_monday_to_thursday() {
        let groups = groups_for(true);
        assert_eq!(groups.len(), 4);
        assert_eq!(
            groups[0].covered_days(),
            &[Weekday::Monday, Weekday::Tuesday, Weekday::Wednesday, Weekday::Thursday]
        );
        assert_eq!(groups[0].label(), "Monday - Thursday");
        assert_eq!(groups[1].covered_days(), &[Weekday::Friday]);
        assert_eq!(groups[2].covered_days(), &[Weekday::Saturday]);
        assert_eq!(groups[3].covered_days(), &[Weekday::Sunday]);
        assert_eq!(groups[3].label(), "Sunday");
    }

    #[test]
    fn expand_copies_to_every_covered_day() {
        let rows = vec![row(7, 20.0)];
        let expanded = expand(0, &rows, true);
        assert_eq!(expanded.len(), 4);
        assert!(expanded.iter().all(|(_, r)| r == &rows));

        assert_eq!(expand(1, &rows, true), vec![(Weekday::Friday, rows.clone())]);
        assert_eq!(expand(1, &rows, false), vec![(Weekday::Tuesday, rows.clone())]);
        assert!(expand(4, &rows, true).is_empty());
        assert!(expand(7, &rows, false).is_empty());
    }

    #[test]
    fn expand_all_fills_seven_days() {
        let grouped = vec![vec![row(6, 20.0)], vec![row(7, 21.0)], vec![row(8, 22.0)], vec![row(9, 23.0)]];
        let days = expand_all(&grouped, true);
        for day in &days[0..4] {
            assert_eq!(day, &grouped[0]);
        }
        assert_eq!(days[4], grouped[1]);
        assert_eq!(days[5], grouped[2]);
        assert_eq!(days[6], grouped[3]);

        let partial = expand_all(&grouped[..1], false);
        assert_eq!(partial[0], grouped[0]);
        assert!(partial[1..].iter().all(|day| day.is_empty()));
    }

    #[test]
    fn merging_keeps_monday_and_overwrites_tuesday_to_thursday() {
        let mut days: [Vec<ScheduleRow>; DAYS_PER_WEEK] = Default::default();
        for (i, day) in days.iter_mut().enumerate() {
            *day = vec![row(i as u8, 20.0)];
        }
        let mut week = EditableWeek::from_days(days.clone());

        week.set_merge(true);
        assert!(week.is_merged());
        assert_eq!(week.day_rows(Weekday::Monday), days[0].as_slice());
        assert_eq!(week.day_rows(Weekday::Tuesday), days[0].as_slice());
        assert_eq!(week.day_rows(Weekday::Thursday), days[0].as_slice());
        assert_eq!(week.day_rows(Weekday::Friday), days[4].as_slice());

        // Un-merging does not bring the old values back.
        week.set_merge(false);
        assert_eq!(week.day_rows(Weekday::Wednesday), days[0].as_slice());
    }

    #[test]
    fn set_group_rows_follows_merge_state() {
        let mut week = EditableWeek::new();
        week.set_merge(true);
        assert!(week.set_group_rows(0, vec![row(5, 19.0)]));
        assert_eq!(week.day_rows(Weekday::Wednesday), &[row(5, 19.0)]);
        assert!(week.set_group_rows(3, vec![row(9, 22.0)]));
        assert_eq!(week.day_rows(Weekday::Sunday), &[row(9, 22.0)]);
        assert!(!week.set_group_rows(4, vec![row(9, 22.0)]));

        let grouped = week.grouped_rows();
        assert_eq!(grouped.len(), 4);
        assert_eq!(grouped[0], vec![row(5, 19.0)]);
        assert_eq!(week.group_rows(3), Some([row(9, 22.0)].as_slice()));
        assert_eq!(week.group_rows(4), None);
    }
}
