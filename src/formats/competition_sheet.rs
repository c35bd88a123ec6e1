// 🏁 Competition from a person sheet
// Any person file the person registry can read becomes one competition:
// header fields from settings, one group per class label.

use crate::classes::ClassFormatter;
use crate::config::CompetitionDefaults;
use crate::error::Result;
use crate::formats::{CompetitionReader, PersonReader, PersonRegistry};
use crate::model::{CompetitionRecord, EntityRef, GroupRecord, PersonRecord};
use crate::season::Season;
use chrono::{Local, Utc};
use std::path::{Path, PathBuf};

pub struct PersonSheetCompetitionReader {
    path: PathBuf,
    persons: Box<dyn PersonReader>,
    defaults: CompetitionDefaults,
}

impl PersonSheetCompetitionReader {
    /// `Ok(None)` when no person reader accepts the path
    pub fn open(path: &Path, registry: &PersonRegistry) -> Result<Option<Self>> {
        let Some(persons) = registry.try_get_reader(path)? else {
            return Ok(None);
        };
        Ok(Some(PersonSheetCompetitionReader {
            path: path.to_path_buf(),
            persons,
            defaults: registry.options().competition.clone(),
        }))
    }
}

impl CompetitionReader for PersonSheetCompetitionReader {
    fn competition(&mut self) -> Result<CompetitionRecord> {
        let season = Season::current();
        let persons = self
            .persons
            .persons()?
            .collect::<Result<Vec<PersonRecord>>>()
            .map_err(|e| {
                log::error!("{}: {}", self.path.display(), e);
                e
            })?;

        let competition = CompetitionRecord {
            id: Utc::now().timestamp_millis().to_string(),
            race_date: Local::now().date_naive(),
            name: self.defaults.name.clone(),
            sector: self.defaults.sector.clone(),
            season: season.to_year.to_string(),
            geographical_scope: self.defaults.geographical_scope.clone(),
            event_type: self.defaults.event_type.clone(),
            place: self.defaults.place.clone(),
            website: self.defaults.website.clone(),
            organizer: self.defaults.organizer.clone(),
            groups: group_by_class(persons, &season, &self.defaults),
        };
        log::info!(
            "Competition {}: {} groups, {} competitors",
            competition.id,
            competition.groups.len(),
            competition.competitor_count()
        );
        Ok(competition)
    }
}

/// Class label of a person, derived from birth date and sex when missing
fn class_label(person: &PersonRecord, season: &Season) -> Option<String> {
    if let Some(label) = person.class_label.as_deref().filter(|l| !l.trim().is_empty()) {
        return Some(label.to_string());
    }
    let date_of_birth = person.date_of_birth.date()?;
    Some(season.class_name(person.sex, date_of_birth, ClassFormatter::SWEDISH))
}

/// Group persons by class label, groups in order of first appearance
pub fn group_by_class(
    persons: Vec<PersonRecord>,
    season: &Season,
    defaults: &CompetitionDefaults,
) -> Vec<GroupRecord> {
    let mut groups: Vec<GroupRecord> = Vec::new();

    for mut person in persons {
        let label = class_label(&person, season);
        person.class_label = label.clone();

        let index = match groups
            .iter()
            .position(|g| g.class.name.as_deref() == label.as_deref())
        {
            Some(index) => index,
            None => {
                groups.push(GroupRecord {
                    class: EntityRef::new(label, None),
                    discipline: defaults.discipline.clone(),
                    category: defaults.category.clone(),
                    start_type: defaults.start_type,
                    competitors: Vec::new(),
                });
                groups.len() - 1
            }
        };
        groups[index].competitors.push(person);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FormatOptions;
    use crate::model::{DateOfBirth, Gender};
    use chrono::NaiveDate;
    use std::fs;

    fn child(first: &str, sex: Gender, born: (i32, u32, u32)) -> PersonRecord {
        let mut person = PersonRecord::new(first, "Kallur");
        person.sex = sex;
        person.date_of_birth =
            DateOfBirth::Date(NaiveDate::from_ymd_opt(born.0, born.1, born.2).unwrap());
        person
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let season = Season::ending(2019);
        let mut labelled = PersonRecord::new("Nils", "Berg");
        labelled.class_label = Some("H 12".to_string());

        let groups = group_by_class(
            vec![
                child("Tyra", Gender::Female, (2011, 9, 3)),
                labelled,
                child("Olle", Gender::Male, (2012, 1, 1)),
                child("Saga", Gender::Female, (2011, 1, 1)),
            ],
            &season,
            &CompetitionDefaults::default(),
        );

        let labels: Vec<&str> = groups.iter().map(|g| g.class_label()).collect();
        assert_eq!(labels, vec!["D 0-8", "H 12", "H 0-7"]);
        assert_eq!(groups[0].competitors.len(), 2);
        assert_eq!(groups[0].competitors[1].class_label.as_deref(), Some("D 0-8"));
        assert_eq!(groups[0].category.id.as_deref(), Some("Ung"));
        assert_eq!(groups[0].discipline.name.as_deref(), Some("Längdåkning"));
    }

    #[test]
    fn test_persons_without_class_or_birth_date_share_a_group() {
        let groups = group_by_class(
            vec![PersonRecord::new("A", "B"), PersonRecord::new("C", "D")],
            &Season::ending(2019),
            &CompetitionDefaults::default(),
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].class.name, None);
        assert_eq!(groups[0].competitors.len(), 2);
    }

    #[test]
    fn test_read_competition_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race.csv");
        fs::write(
            &path,
            "Förnamn,Efternamn,Sex,Class\nTyra,Kallur,L,D 0-8\nOlle,Berg,M,H 10\nSaga,Ek,L,D 0-8\n",
        )
        .unwrap();

        let registry = PersonRegistry::new(FormatOptions::default());
        let mut reader = PersonSheetCompetitionReader::open(&path, &registry)
            .unwrap()
            .unwrap();
        let competition = reader.competition().unwrap();

        assert_eq!(competition.name, "Serietävling");
        assert_eq!(competition.organizer.id.as_deref(), Some("12563"));
        assert_eq!(competition.season, Season::current().to_year.to_string());
        assert!(competition.id.parse::<i64>().is_ok());
        assert_eq!(competition.groups.len(), 2);
        assert_eq!(competition.competitor_count(), 3);
    }

    #[test]
    fn test_no_person_reader_means_no_competition_reader() {
        let registry = PersonRegistry::new(FormatOptions::default());
        let reader = PersonSheetCompetitionReader::open(Path::new("race.json"), &registry).unwrap();
        assert!(reader.is_none());
    }
}
