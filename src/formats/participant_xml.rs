// 🪪 Federation participant XML (SSFPersons*.xml)
//
// <Person Id="..."> elements anywhere below the root, one person each.
// Child element names resolve like table headers; <Nation> and
// <Organization> carry the entity id in an `Id` attribute and the name as
// text. Unknown children (District, ...) are ignored.

use crate::error::{OrgDbError, Result};
use crate::formats::PersonReader;
use crate::model::{resolve_column, DateOfBirth, EntityRef, Gender, LogicalColumn, PersonRecord};
use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// File names containing this marker are read as participant XML
pub const FILE_MARKER: &str = "SSFPersons";

const PERSON_ELEMENT: &[u8] = b"Person";

pub struct ParticipantXmlReader {
    path: PathBuf,
    reader: Reader<BufReader<File>>,
    finished: bool,
}

impl ParticipantXmlReader {
    pub fn open(path: &Path) -> Result<Self> {
        let reader = Reader::from_file(path).map_err(OrgDbError::xml)?;
        log::debug!("Opened: {}", path.display());

        Ok(ParticipantXmlReader {
            path: path.to_path_buf(),
            reader,
            finished: false,
        })
    }

    /// Advance to the next <Person> and read it; `None` at end of document
    fn next_person(&mut self) -> Result<Option<PersonRecord>> {
        let decoder = self.reader.decoder();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == PERSON_ELEMENT => {
                    let mut person = PersonRecord::default();
                    person.identifier = attribute(e, b"Id", decoder).filter(|id| !id.is_empty());
                    self.read_person_body(&mut person)?;
                    if !person.is_empty() {
                        return Ok(Some(person));
                    }
                }
                Ok(Event::Empty(ref e)) if e.local_name().as_ref() == PERSON_ELEMENT => {
                    let mut person = PersonRecord::default();
                    person.identifier = attribute(e, b"Id", decoder).filter(|id| !id.is_empty());
                    if !person.is_empty() {
                        return Ok(Some(person));
                    }
                }
                Ok(Event::Eof) => return Ok(None),
                Err(e) => return Err(self.parse_error(e)),
                _ => {}
            }
        }
    }

    /// Consume events up to and including </Person>
    fn read_person_body(&mut self, person: &mut PersonRecord) -> Result<()> {
        let mut column: Option<LogicalColumn> = None;
        let mut text = String::new();
        let decoder = self.reader.decoder();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match self.reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    column = element_column(e);
                    text.clear();
                    if let Some(c) = column {
                        open_entity(person, c, e, decoder);
                    }
                }
                Ok(Event::Empty(ref e)) => {
                    if let Some(c) = element_column(e) {
                        open_entity(person, c, e, decoder);
                    }
                }
                Ok(Event::Text(ref e)) if column.is_some() => {
                    if let Ok(value) = e.decode() {
                        text.push_str(&value);
                    }
                }
                Ok(Event::CData(ref e)) if column.is_some() => {
                    text.push_str(&String::from_utf8_lossy(e));
                }
                Ok(Event::GeneralRef(ref e)) if column.is_some() => {
                    if let Ok(Some(ch)) = e.resolve_char_ref() {
                        text.push(ch);
                    } else if let Ok(name) = e.decode() {
                        if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(&name) {
                            text.push_str(resolved);
                        }
                    }
                }
                Ok(Event::End(ref e)) => {
                    if let Some(c) = column.take() {
                        set_text(person, c, text.trim());
                    }
                    text.clear();
                    if e.local_name().as_ref() == PERSON_ELEMENT {
                        return Ok(());
                    }
                }
                Ok(Event::Eof) => {
                    log::warn!("{}: Unterminated Person element", self.path.display());
                    return Ok(());
                }
                Err(e) => return Err(self.parse_error(e)),
                _ => {}
            }
        }
    }

    fn parse_error(&self, err: quick_xml::Error) -> OrgDbError {
        log::error!(
            "{}: XML error at position {}: {}",
            self.path.display(),
            self.reader.buffer_position(),
            err
        );
        OrgDbError::xml(err)
    }
}

impl PersonReader for ParticipantXmlReader {
    fn persons(&mut self) -> Result<Box<dyn Iterator<Item = Result<PersonRecord>> + '_>> {
        Ok(Box::new(std::iter::from_fn(move || {
            if self.finished {
                return None;
            }
            let next = self.next_person();
            if !matches!(next, Ok(Some(_))) {
                self.finished = true;
            }
            next.transpose()
        })))
    }
}

fn attribute(element: &BytesStart<'_>, name: &[u8], decoder: Decoder) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| match a.decode_and_unescape_value(decoder) {
            Ok(value) => value.trim().to_string(),
            Err(_) => String::from_utf8_lossy(&a.value).trim().to_string(),
        })
}

fn element_column(element: &BytesStart<'_>) -> Option<LogicalColumn> {
    std::str::from_utf8(element.local_name().as_ref())
        .ok()
        .and_then(resolve_column)
}

/// Entity elements start with their `Id` attribute; the name follows as text
fn open_entity(
    person: &mut PersonRecord,
    column: LogicalColumn,
    element: &BytesStart<'_>,
    decoder: Decoder,
) {
    let entity = EntityRef::new(None, attribute(element, b"Id", decoder));
    match column {
        LogicalColumn::Nation => person.nation = Some(entity),
        LogicalColumn::Organization => person.organization = Some(entity),
        _ => {}
    }
}

/// "M" is male, "F" or "L" female; anything else leaves sex unspecified
fn sex_from_token(token: &str) -> Option<Gender> {
    match token.to_lowercase().as_str() {
        "m" => Some(Gender::Male),
        "f" | "l" => Some(Gender::Female),
        _ => None,
    }
}

fn set_text(person: &mut PersonRecord, column: LogicalColumn, text: &str) {
    if text.is_empty() {
        return;
    }
    let value = Some(text.to_string());
    match column {
        LogicalColumn::Identifier => person.identifier = value,
        LogicalColumn::FirstName => person.first_name = value,
        LogicalColumn::Surname => person.surname = value,
        LogicalColumn::Phone => person.phone = value,
        LogicalColumn::Email => person.email = value,
        LogicalColumn::ClassLabel => person.class_label = value,
        LogicalColumn::Sex => {
            if let Some(sex) = sex_from_token(text) {
                person.sex = sex;
            }
        }
        LogicalColumn::DateOfBirth => {
            let dob = DateOfBirth::parse(text);
            if dob.is_defined() {
                person.date_of_birth = dob;
            }
        }
        LogicalColumn::Nation => name_entity(&mut person.nation, text),
        LogicalColumn::Organization => name_entity(&mut person.organization, text),
    }
}

fn name_entity(slot: &mut Option<EntityRef>, name: &str) {
    let entity = slot.get_or_insert_with(EntityRef::default);
    entity.name = Some(name.to_string());
}
