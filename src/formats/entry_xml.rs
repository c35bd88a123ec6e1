// 📨 Federation entry XML (SSFEntry_*.xml)
//
//   SSFEntry
//   ├── EventHeader  Id = competition id
//   ├── RaceHeader   Id = competition id + 2
//   └── Entry        Id = competition id + 2 + group index (one per group)
//       ├── Class, Discipline, RaceCategory, EntryFees
//       └── SingleEntry → Person (one per competitor)

use crate::classes::{ClassFormatter, CompetitionClass, GenderFormatter};
use crate::config::EntryDefaults;
use crate::error::{OrgDbError, Result};
use crate::formats::CompetitionWriter;
use crate::model::{CompetitionRecord, EntityRef, Gender, GroupRecord, PersonRecord};
use crate::season::Season;
use chrono::{Duration, Local};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// File names starting with this prefix are written as entry XML
pub const FILE_PREFIX: &str = "SSFEntry_";

pub const ENTRY_VERSION: &str = "1.4.0";
const SCHEMA_LOCATION: &str = "SSFEntries.xsd";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Nation written when a competitor has none
const DEFAULT_NATION: &str = "SWE";

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct EntryXmlWriter {
    path: PathBuf,
    entry: EntryDefaults,
}

impl EntryXmlWriter {
    pub fn create(path: &Path, entry: EntryDefaults) -> Self {
        EntryXmlWriter {
            path: path.to_path_buf(),
            entry,
        }
    }

    fn write_file(&self, competition: &CompetitionRecord) -> Result<()> {
        let competition_id: i64 = competition
            .id
            .trim()
            .parse()
            .map_err(|_| OrgDbError::invalid("competition ID", competition.id.as_str()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(&self.path)?);
        let mut xml = XmlOut::new(file);

        xml.declaration()?;
        xml.open(
            "SSFEntry",
            &[
                ("Version", ENTRY_VERSION),
                ("xsi:noNamespaceSchemaLocation", SCHEMA_LOCATION),
                ("xmlns:xsi", XSI_NAMESPACE),
            ],
        )?;
        write_event_header(&mut xml, competition, competition_id)?;
        write_race_header(&mut xml, competition, competition_id + 2)?;

        let now = Local::now().format(TIMESTAMP_FORMAT).to_string();
        for (i, group) in competition.groups.iter().enumerate() {
            let entry_id = competition_id + 2 + i as i64;
            self.write_entry(&mut xml, competition, group, entry_id, &now)?;
        }
        xml.close("SSFEntry")?;

        xml.into_inner().flush()?;
        log::info!(
            "{}: {} entries, {} competitors",
            self.path.display(),
            competition.groups.len(),
            competition.competitor_count()
        );
        Ok(())
    }

    fn write_entry<W: Write>(
        &self,
        xml: &mut XmlOut<W>,
        competition: &CompetitionRecord,
        group: &GroupRecord,
        entry_id: i64,
        now: &str,
    ) -> Result<()> {
        xml.open("Entry", &[("Id", entry_id.to_string().as_str())])?;

        let label = group.class_label();
        match parse_class_label(label) {
            Some(class) => {
                let class = class.normalized();
                xml.element(
                    "Class",
                    &[
                        ("FromAge", class.age_from.to_string().as_str()),
                        ("ToAge", class.age_to.to_string().as_str()),
                        ("Sex", GenderFormatter::FEDERATION.name(class.gender)),
                    ],
                    &class.name(),
                )?;
            }
            None => {
                log::warn!("Entry {}: Class {:?} has no age range", entry_id, label);
                xml.element("Class", &[], label)?;
            }
        }

        let discipline_id = self.entry.discipline.id.clone().unwrap_or_default();
        xml.element(
            "Discipline",
            &[
                ("Id", discipline_id.as_str()),
                ("Code", self.entry.discipline_code.as_str()),
            ],
            self.entry.discipline.name.as_deref().unwrap_or_default(),
        )?;

        let category_code = group.category.id.clone().unwrap_or_default();
        xml.element(
            "RaceCategory",
            &[("Code", category_code.as_str())],
            group.category.name.as_deref().unwrap_or_default(),
        )?;

        let deadline = competition.race_date - Duration::days(self.entry.deadline_days);
        xml.open("EntryFees", &[])?;
        xml.element(
            "DeadlineEntryFee",
            &[("Deadline", deadline.format(DATE_FORMAT).to_string().as_str())],
            &self.entry.fee.to_string(),
        )?;
        xml.close("EntryFees")?;

        for person in &group.competitors {
            xml.open("SingleEntry", &[("CreateDate", now), ("ModifyDate", now)])?;
            self.write_person(xml, person, &competition.organizer)?;
            xml.close("SingleEntry")?;
        }

        xml.close("Entry")
    }

    fn write_person<W: Write>(
        &self,
        xml: &mut XmlOut<W>,
        person: &PersonRecord,
        organizer: &EntityRef,
    ) -> Result<()> {
        let id = person.identifier.clone().unwrap_or_default();
        xml.open("Person", &[("Id", id.as_str())])?;
        xml.element("Lastname", &[], person.surname.as_deref().unwrap_or_default())?;
        xml.element("Firstname", &[], person.first_name.as_deref().unwrap_or_default())?;
        xml.element("Sex", &[], federation_sex(person.sex))?;

        let nation = person
            .nation
            .as_ref()
            .and_then(|n| n.name_or_id())
            .unwrap_or(DEFAULT_NATION);
        xml.element("Nation", &[], nation)?;

        if let Some(date) = person.date_of_birth.date() {
            xml.element("BirthDate", &[], &date.format(DATE_FORMAT).to_string())?;
        }

        let organization = person.organization.as_ref().unwrap_or(organizer);
        write_entity(xml, "Organization", organization)?;
        write_entity(xml, "District", &self.entry.district)?;

        xml.close("Person")
    }
}

impl CompetitionWriter for EntryXmlWriter {
    fn write(&mut self, competition: &CompetitionRecord) -> Result<()> {
        log::debug!("Writing: {}", self.path.display());
        self.write_file(competition).map_err(|e| {
            log::error!("Write failed: {}", self.path.display());
            OrgDbError::write(&self.path, e)
        })
    }
}

fn write_event_header<W: Write>(
    xml: &mut XmlOut<W>,
    competition: &CompetitionRecord,
    id: i64,
) -> Result<()> {
    let season = Season::parse(&competition.season).unwrap_or_else(Season::current);

    xml.open("EventHeader", &[("Id", id.to_string().as_str())])?;
    xml.element("EventName", &[], &competition.name)?;
    xml.element("Sector", &[], &competition.sector)?;
    xml.element(
        "Season",
        &[("Code", season.to_year.to_string().as_str())],
        &season.label,
    )?;
    xml.element("GeographicalScope", &[], &competition.geographical_scope)?;
    xml.element("EventType", &[], &competition.event_type)?;
    xml.element("Place", &[], &competition.place)?;
    xml.element("Website", &[], &competition.website)?;
    write_entity(xml, "Organizer", &competition.organizer)?;
    xml.close("EventHeader")
}

fn write_race_header<W: Write>(
    xml: &mut XmlOut<W>,
    competition: &CompetitionRecord,
    id: i64,
) -> Result<()> {
    xml.open("RaceHeader", &[("Id", id.to_string().as_str())])?;
    xml.element("RaceName", &[], &competition.name)?;
    xml.element(
        "RaceDate",
        &[],
        &competition.race_date.format(DATE_FORMAT).to_string(),
    )?;
    xml.close("RaceHeader")
}

/// `<Tag Id="id">name</Tag>`
fn write_entity<W: Write>(xml: &mut XmlOut<W>, tag: &str, entity: &EntityRef) -> Result<()> {
    let name = entity.name.as_deref().unwrap_or_default();
    match entity.id.as_deref() {
        Some(id) => xml.element(tag, &[("Id", id)], name),
        None => xml.element(tag, &[], name),
    }
}

fn federation_sex(sex: Gender) -> &'static str {
    match sex {
        Gender::Female => "L",
        _ => "M",
    }
}

// ============================================================================
// XML OUTPUT
// ============================================================================

/// Indented event writer with errors mapped into `OrgDbError`
struct XmlOut<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlOut<W> {
    fn new(inner: W) -> Self {
        XmlOut {
            writer: Writer::new_with_indent(inner, b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(OrgDbError::xml)
    }

    fn declaration(&mut self) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
    }

    fn start<'a>(tag: &'a str, attributes: &[(&str, &str)]) -> BytesStart<'a> {
        let mut start = BytesStart::new(tag);
        for attribute in attributes {
            start.push_attribute(*attribute);
        }
        start
    }

    fn open(&mut self, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(Self::start(tag, attributes)))
    }

    fn close(&mut self, tag: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(tag)))
    }

    /// `<tag ...>text</tag>`, or `<tag .../>` without text
    fn element(&mut self, tag: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        if text.is_empty() {
            return self.event(Event::Empty(Self::start(tag, attributes)));
        }
        self.open(tag, attributes)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.close(tag)
    }

    fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Swedish labels first, then the federation labels `export` writes
fn parse_class_label(label: &str) -> Option<CompetitionClass> {
    ClassFormatter::SWEDISH
        .parse(label)
        .or_else(|| ClassFormatter::FEDERATION.parse(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DateOfBirth;
    use chrono::NaiveDate;

    fn competition() -> CompetitionRecord {
        let mut tyra = PersonRecord::new("Tyra", "Kallur");
        tyra.identifier = Some("IID3262187".to_string());
        tyra.sex = Gender::Female;
        tyra.date_of_birth = DateOfBirth::Date(NaiveDate::from_ymd_opt(2011, 9, 3).unwrap());

        let mut olle = PersonRecord::new("Olle", "Berg");
        olle.sex = Gender::Male;
        olle.nation = Some(EntityRef::named("NOR"));
        olle.organization = Some(EntityRef::new(Some("Falu IK".into()), Some("100".into())));

        CompetitionRecord {
            id: "10025".to_string(),
            race_date: NaiveDate::from_ymd_opt(2019, 2, 17).unwrap(),
            name: "Korsnäsloppet".to_string(),
            sector: "CC".to_string(),
            season: "2019".to_string(),
            organizer: EntityRef::new(Some("Korsnäs IF SK".into()), Some("12563".into())),
            groups: vec![
                GroupRecord {
                    class: EntityRef::named("D 0-8"),
                    category: EntityRef::new(Some("Ungdom".into()), Some("Ung".into())),
                    competitors: vec![tyra],
                    ..Default::default()
                },
                GroupRecord {
                    class: EntityRef::named("H 10"),
                    competitors: vec![olle],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    fn write(competition: &CompetitionRecord) -> (tempfile::TempDir, Result<String>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("SSFEntry_race.xml");
        let result = EntryXmlWriter::create(&path, EntryDefaults::default())
            .write(competition)
            .map(|_| fs::read_to_string(&path).unwrap());
        (dir, result)
    }

    #[test]
    fn test_headers() {
        let (_dir, xml) = write(&competition());
        let xml = xml.unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("<SSFEntry Version=\"1.4.0\""));
        assert!(xml.contains("<EventHeader Id=\"10025\">"));
        assert!(xml.contains("<Season Code=\"2019\">2018/2019</Season>"));
        assert!(xml.contains("<Organizer Id=\"12563\">Korsnäs IF SK</Organizer>"));
        assert!(xml.contains("<RaceHeader Id=\"10027\">"));
        assert!(xml.contains("<RaceDate>2019-02-17</RaceDate>"));
    }

    #[test]
    fn test_entries() {
        let (_dir, xml) = write(&competition());
        let xml = xml.unwrap();

        assert!(xml.contains("<Entry Id=\"10027\">"));
        assert!(xml.contains("<Entry Id=\"10028\">"));
        assert!(xml.contains("<Class FromAge=\"0\" ToAge=\"8\" Sex=\"L\">D 0-8</Class>"));
        assert!(xml.contains("<Class FromAge=\"10\" ToAge=\"10\" Sex=\"M\">H 10</Class>"));
        assert!(xml.contains("<Discipline Id=\"29\" Code=\"L\">Intervallstart klassisk stil</Discipline>"));
        assert!(xml.contains("<RaceCategory Code=\"Ung\">Ungdom</RaceCategory>"));
        assert!(xml.contains("<DeadlineEntryFee Deadline=\"2019-02-12\">0</DeadlineEntryFee>"));
    }

    #[test]
    fn test_persons() {
        let (_dir, xml) = write(&competition());
        let xml = xml.unwrap();

        assert!(xml.contains("<Person Id=\"IID3262187\">"));
        assert!(xml.contains("<Lastname>Kallur</Lastname>"));
        assert!(xml.contains("<Sex>L</Sex>"));
        assert!(xml.contains("<Nation>SWE</Nation>"));
        assert!(xml.contains("<BirthDate>2011-09-03</BirthDate>"));
        assert!(xml.contains("<Organization Id=\"12563\">Korsnäs IF SK</Organization>"));
        assert!(xml.contains("<District Id=\"536\">Dalarnas Skidförbund</District>"));

        assert!(xml.contains("<Nation>NOR</Nation>"));
        assert!(xml.contains("<Organization Id=\"100\">Falu IK</Organization>"));
        assert_eq!(xml.matches("<SingleEntry ").count(), 2);
    }

    #[test]
    fn test_non_numeric_id_fails() {
        let mut competition = competition();
        competition.id = "race-1".to_string();

        let (_dir, result) = write(&competition);

        assert!(matches!(result, Err(OrgDbError::Write { .. })));
    }

    #[test]
    fn test_federation_class_labels() {
        let mut competition = competition();
        competition.groups[0].class = EntityRef::named("L 0-8");
        competition.groups[1].class = EntityRef::named("M 12");

        let (_dir, xml) = write(&competition);
        let xml = xml.unwrap();

        assert!(xml.contains("<Class FromAge=\"0\" ToAge=\"8\" Sex=\"L\">L 0-8</Class>"));
        assert!(xml.contains("<Class FromAge=\"12\" ToAge=\"12\" Sex=\"M\">M 12</Class>"));
    }

    #[test]
    fn test_unparsable_class_keeps_label() {
        let mut competition = competition();
        competition.groups[1].class = EntityRef::named("Öppen");

        let (_dir, xml) = write(&competition);

        assert!(xml.unwrap().contains("<Class>Öppen</Class>"));
    }
}
