// 🏁 Competition Record - event header plus grouped competitors

use crate::model::{EntityRef, PersonRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// START TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartType {
    #[default]
    Interval,
    Mass,
    Pursuit,
}

// ============================================================================
// COMPETITION
// ============================================================================

/// One event: header fields and the ordered start groups
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompetitionRecord {
    #[serde(rename = "ID")]
    pub id: String,
    pub race_date: NaiveDate,
    pub name: String,
    pub sector: String,
    /// Season label; the season's end year ("2019")
    pub season: String,
    pub geographical_scope: String,
    pub event_type: String,
    pub place: String,
    pub website: String,
    pub organizer: EntityRef,
    pub groups: Vec<GroupRecord>,
}

impl CompetitionRecord {
    pub fn competitor_count(&self) -> usize {
        self.groups.iter().map(|g| g.competitors.len()).sum()
    }
}

/// Competitors sharing one class
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRecord {
    /// Class label lives in `name` ("D 0-8")
    pub class: EntityRef,
    pub discipline: EntityRef,
    pub category: EntityRef,
    pub start_type: StartType,
    pub competitors: Vec<PersonRecord>,
}

impl GroupRecord {
    pub fn class_label(&self) -> &str {
        self.class.name.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let competition = CompetitionRecord {
            id: "1550000000000".to_string(),
            race_date: NaiveDate::from_ymd_opt(2019, 2, 17).unwrap(),
            name: "Serietävling".to_string(),
            season: "2019".to_string(),
            organizer: EntityRef::new(Some("Korsnäs IF SK".into()), Some("12563".into())),
            groups: vec![GroupRecord {
                class: EntityRef::named("D 0-8"),
                competitors: vec![PersonRecord::new("Tyra", "Kallur")],
                ..Default::default()
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&competition).unwrap();

        assert_eq!(json["ID"], "1550000000000");
        assert_eq!(json["RaceDate"], "2019-02-17");
        assert_eq!(json["Organizer"]["ID"], "12563");
        assert_eq!(json["Groups"][0]["Class"]["Name"], "D 0-8");
        assert_eq!(json["Groups"][0]["StartType"], "Interval");
        assert_eq!(json["Groups"][0]["Competitors"][0]["Surname"], "Kallur");
        assert_eq!(competition.competitor_count(), 1);
    }
}
