//! String table ↔ XML conversion
//!
//! Two layouts are understood:
//!
//! ```xml
//! <StblData>
//!     <TextStringDefinitions>
//!         <TextStringDefinition InstanceID="0x0000ABCD" TextString="Hello" />
//!     </TextStringDefinitions>
//! </StblData>
//! ```
//!
//! and the translator export, where the translated text sits in `<Dest>`:
//!
//! ```xml
//! <Translation>
//!     <Content>
//!         <Table instance="0012345678ABCDEF" group="80000000">
//!             <String id="0000ABCD"><Source>Hello</Source><Dest>Привет</Dest></String>
//!         </Table>
//!     </Content>
//! </Translation>
//! ```
//!
//! Only the first layout is written.

use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::{StringTable, read_stbl};
use crate::error::{Error, Result};
use crate::resource::{ResourceId, TYPE_STBL};

/// Convert a `.stbl` file to XML
///
/// # Errors
/// Returns an error if reading or conversion fails.
pub fn convert_stbl_to_xml<P: AsRef<Path>, Q: AsRef<Path>>(source: P, dest: Q) -> Result<()> {
    tracing::info!(
        "Converting STBL→XML: {:?} → {:?}",
        source.as_ref(),
        dest.as_ref()
    );

    let table = read_stbl(&source)?;
    std::fs::write(dest, to_xml(&table)?)?;

    tracing::info!("Conversion complete");
    Ok(())
}

/// Convert a string table to XML
///
/// # Errors
/// Returns an error if the XML writer fails.
pub fn to_xml(table: &StringTable) -> Result<String> {
    let mut output = Vec::new();
    let mut writer = Writer::new_with_indent(&mut output, b'\t', 1);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("StblData")))?;
    writer.write_event(Event::Start(BytesStart::new("TextStringDefinitions")))?;

    for (key, value) in table.iter() {
        let mut definition = BytesStart::new("TextStringDefinition");
        definition.push_attribute(("InstanceID", format!("0x{key:08X}").as_str()));
        definition.push_attribute(("TextString", value));
        writer.write_event(Event::Empty(definition))?;
    }

    writer.write_event(Event::End(BytesEnd::new("TextStringDefinitions")))?;
    writer.write_event(Event::End(BytesEnd::new("StblData")))?;

    let mut xml = String::from_utf8(output)?;
    xml.push('\n');
    Ok(xml)
}

fn parse_hex<T: TryFrom<u64>>(value: &str, what: &str) -> Result<T> {
    let digits = value
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u64::from_str_radix(digits, 16)
        .ok()
        .and_then(|parsed| T::try_from(parsed).ok())
        .ok_or_else(|| Error::XmlAttrError(format!("invalid {what} '{value}'")))
}

fn attribute(element: &BytesStart, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse either XML layout into a string table. Values are normalized with
/// [`super::normalize_text`].
///
/// For the translator export, the id of the first `<Table>` with an
/// `instance` attribute becomes the table id.
///
/// # Errors
/// Returns an error if the XML is malformed or an id attribute is not hex.
pub fn from_xml(content: &str) -> Result<StringTable> {
    let mut reader = Reader::from_str(content);
    // Keep whitespace inside <Dest>
    reader.trim_text(false);

    let mut table = StringTable::new();
    let mut buf = Vec::new();

    let mut string_id: Option<u32> = None;
    let mut dest: Option<String> = None;
    let mut in_dest = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"TextStringDefinition" => read_definition(&e, &mut table)?,
                b"Table" => read_table_id(&e, &mut table)?,
                b"String" => {
                    string_id = attribute(&e, b"id")?
                        .map(|id| parse_hex(&id, "string id"))
                        .transpose()?;
                    dest = None;
                }
                b"Dest" => {
                    in_dest = true;
                    dest = Some(String::new());
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"TextStringDefinition" => read_definition(&e, &mut table)?,
                b"Dest" => dest = Some(String::new()),
                _ => {}
            },
            Ok(Event::Text(e)) if in_dest => {
                let text = e.unescape().map_err(Error::XmlError)?;
                dest.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::CData(e)) if in_dest => {
                let text = String::from_utf8(e.into_inner().into_owned())?;
                dest.get_or_insert_with(String::new).push_str(&text);
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"Dest" => in_dest = false,
                b"String" => {
                    if let Some(id) = string_id.take() {
                        table.add(id, dest.take().as_deref().unwrap_or_default());
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(Error::XmlError(e)),
        }
        buf.clear();
    }

    tracing::debug!("Parsed {} strings from XML", table.len());
    Ok(table)
}

fn read_definition(element: &BytesStart, table: &mut StringTable) -> Result<()> {
    let Some(id) = attribute(element, b"InstanceID")? else {
        return Ok(());
    };
    let text = attribute(element, b"TextString")?.unwrap_or_default();
    table.add(parse_hex(&id, "InstanceID")?, &text);
    Ok(())
}

fn read_table_id(element: &BytesStart, table: &mut StringTable) -> Result<()> {
    if table.id.is_some() {
        return Ok(());
    }
    if let Some(instance) = attribute(element, b"instance")? {
        let group = match attribute(element, b"group")? {
            Some(group) if !group.is_empty() => parse_hex(&group, "group")?,
            _ => 0,
        };
        table.id = Some(ResourceId::new(
            group,
            parse_hex(&instance, "instance")?,
            TYPE_STBL,
        ));
    }
    Ok(())
}

/// Read either XML layout from a file.
pub fn read_stbl_xml<P: AsRef<Path>>(path: P) -> Result<StringTable> {
    let content = std::fs::read_to_string(path)?;
    from_xml(&content)
}
