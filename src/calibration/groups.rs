use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::data::model::WellId;

// ---------------------------------------------------------------------------
// Group lines: "A1,A2 -> blank", "B1,B2 -> 2.0"
// ---------------------------------------------------------------------------

/// Separator between the well list and the value.
pub const SEPARATOR: &str = "->";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GroupLineError {
    #[error("invalid format; use 'W1,W2 -> value' where value is numeric or 'blank'")]
    MissingSeparator,
    #[error("no wells given before '->'")]
    NoWells,
    #[error("'{0}' is not a well id (expected A1..H12)")]
    InvalidWell(String),
    #[error("could not parse concentration '{0}'; expected a non-negative number or 'blank'")]
    InvalidConcentration(String),
}

/// What a group line declares.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupRole {
    Blank,
    Standard { concentration: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupLine {
    pub wells: Vec<WellId>,
    pub role: GroupRole,
}

/// Parse one `WELL[,WELL...] -> VALUE` line.
pub fn parse_group_line(line: &str) -> Result<GroupLine, GroupLineError> {
    let (left, right) = line
        .split_once(SEPARATOR)
        .ok_or(GroupLineError::MissingSeparator)?;

    let wells = left
        .split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.parse::<WellId>()
                .map_err(|_| GroupLineError::InvalidWell(w.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if wells.is_empty() {
        return Err(GroupLineError::NoWells);
    }

    let value = right.trim();
    let role = if value.eq_ignore_ascii_case("blank") {
        GroupRole::Blank
    } else {
        match value.parse::<f64>() {
            Ok(c) if c.is_finite() && c >= 0.0 => GroupRole::Standard { concentration: c },
            _ => return Err(GroupLineError::InvalidConcentration(value.to_string())),
        }
    };
    Ok(GroupLine { wells, role })
}

// ---------------------------------------------------------------------------
// GroupSet – blanks plus standards for one run
// ---------------------------------------------------------------------------

/// Wells of known concentration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandardGroup {
    pub wells: Vec<WellId>,
    pub concentration: f64,
}

/// All groups declared for a run. Groups are not required to be disjoint;
/// a well listed twice is counted twice.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupSet {
    pub blanks: Vec<WellId>,
    pub standards: Vec<StandardGroup>,
}

impl GroupSet {
    pub fn apply(&mut self, line: GroupLine) {
        match line.role {
            GroupRole::Blank => self.blanks.extend(line.wells),
            GroupRole::Standard { concentration } => self.standards.push(StandardGroup {
                wells: line.wells,
                concentration,
            }),
        }
    }

    /// Every well named by a blank or standard group.
    pub fn assigned(&self) -> BTreeSet<WellId> {
        self.blanks
            .iter()
            .chain(self.standards.iter().flat_map(|g| g.wells.iter()))
            .copied()
            .collect()
    }

    pub fn has_standards(&self) -> bool {
        !self.standards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn wells(names: &[&str]) -> Vec<WellId> {
        names.iter().map(|n| n.parse().unwrap()).collect()
    }

    #[test]
    fn blank_line_adds_all_wells_to_blanks() {
        let mut groups = GroupSet::default();
        groups.apply(parse_group_line("A1,A2 -> blank").unwrap());
        assert_eq!(groups.blanks, wells(&["A1", "A2"]));
        assert!(!groups.has_standards());
    }

    #[test]
    fn numeric_line_adds_a_standard() {
        let mut groups = GroupSet::default();
        groups.apply(parse_group_line("B1 -> 2.0").unwrap());
        assert_eq!(
            groups.standards,
            vec![StandardGroup {
                wells: wells(&["B1"]),
                concentration: 2.0
            }]
        );
    }

    #[test]
    fn wells_are_normalised() {
        let line = parse_group_line(" c01 , d2,, ->  BLANK ").unwrap();
        assert_eq!(line.wells, wells(&["C1", "D2"]));
        assert_eq!(line.role, GroupRole::Blank);
    }

    #[rstest]
    #[case("B1 -> abc", GroupLineError::InvalidConcentration("abc".into()))]
    #[case("B1 -> -1", GroupLineError::InvalidConcentration("-1".into()))]
    #[case("B1 -> ", GroupLineError::InvalidConcentration("".into()))]
    #[case("B1 2.0", GroupLineError::MissingSeparator)]
    #[case(" -> 2.0", GroupLineError::NoWells)]
    #[case("B1,Z9 -> 2.0", GroupLineError::InvalidWell("Z9".into()))]
    fn malformed_lines_are_rejected(#[case] line: &str, #[case] expected: GroupLineError) {
        assert_eq!(parse_group_line(line), Err(expected));
    }

    #[test]
    fn assigned_covers_blanks_and_standards() {
        let mut groups = GroupSet::default();
        groups.apply(parse_group_line("A1 -> blank").unwrap());
        groups.apply(parse_group_line("B1,B2 -> 1").unwrap());
        groups.apply(parse_group_line("B2,C1 -> 2").unwrap());
        let assigned: Vec<String> = groups.assigned().iter().map(ToString::to_string).collect();
        assert_eq!(assigned, ["A1", "B1", "B2", "C1"]);
    }
}
