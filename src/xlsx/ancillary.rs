// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::collections::BTreeMap;
use std::io::BufRead;

use log::debug;
use quick_xml::{
    events::{attributes::Attribute, Event},
    name::QName,
    Reader as XmlReader,
};

use super::{get_attribute, get_dimension, get_row_column, parse_cell_ref, read_string, XlsxError};

/// Hyperlink ranges larger than this only link their top left cell
const MAX_LINKED_CELLS: u64 = 65_536;

/// A `<Relationship>` of a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub typ: String,
    pub target: String,
    pub external: bool,
}

/// Per sheet data living outside of `<sheetData>`, read lazily
#[derive(Debug, Default)]
pub(crate) struct AncillaryIndex {
    pub relationships: Option<BTreeMap<Vec<u8>, Relationship>>,
    pub comments: Option<BTreeMap<(u32, u32), String>>,
    pub hyperlinks: Option<BTreeMap<(u32, u32), String>>,
}

/// A defined name pointing at a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Sheet name
    pub sheet: String,
    /// Row, starting at 1
    pub row: u32,
    /// Column, starting at 1
    pub column: u32,
}

pub(crate) fn read_relationships<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<BTreeMap<Vec<u8>, Relationship>, XlsxError> {
    let mut relationships = BTreeMap::new();
    let mut buf = Vec::with_capacity(64);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = Vec::new();
                let mut relationship = Relationship {
                    typ: String::new(),
                    target: String::new(),
                    external: false,
                };
                for a in e.attributes() {
                    match a.map_err(XlsxError::XmlAttr)? {
                        Attribute {
                            key: QName(b"Id"),
                            value: v,
                        } => id.extend_from_slice(&v),
                        Attribute {
                            key: QName(b"Target"),
                            value: v,
                        } => relationship.target = xml.decoder().decode(&v)?.into_owned(),
                        Attribute {
                            key: QName(b"Type"),
                            value: v,
                        } => relationship.typ = xml.decoder().decode(&v)?.into_owned(),
                        Attribute {
                            key: QName(b"TargetMode"),
                            value: v,
                        } => relationship.external = &*v == b"External",
                        _ => (),
                    }
                }
                relationships.insert(id, relationship);
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"Relationships" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("Relationships")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(relationships)
}

/// Path of a relationship target, relative to the folder of its source part
pub(crate) fn resolve_target(base_folder: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut parts: Vec<&str> = base_folder.split('/').filter(|p| !p.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "" | "." => (),
            ".." => {
                parts.pop();
            }
            p => parts.push(p),
        }
    }
    parts.join("/")
}

/// `xl/worksheets/sheet1.xml` → `xl/worksheets/_rels/sheet1.xml.rels`
pub(crate) fn rels_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((folder, file)) => format!("{folder}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

pub(crate) fn folder_of(part: &str) -> &str {
    part.rsplit_once('/').map_or("", |(folder, _)| folder)
}

/// Reads a comments part into (row, column) → text
pub(crate) fn read_comments<B: BufRead>(
    xml: &mut XmlReader<B>,
) -> Result<BTreeMap<(u32, u32), String>, XlsxError> {
    let mut comments = BTreeMap::new();
    let mut buf = Vec::with_capacity(1024);
    let mut position = None;
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"comment" => {
                position = match get_attribute(e.attributes(), QName(b"ref"))? {
                    Some(r) => Some(get_row_column(r)?),
                    None => return Err(XlsxError::UnexpectedNode("comment")),
                };
            }
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"text" => {
                let text = read_string(xml, e.name())?.unwrap_or_default();
                if let Some(pos) = position.take() {
                    comments.insert(pos, text);
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"comments" => break,
            Ok(Event::Eof) => return Err(XlsxError::XmlEof("comments")),
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(comments)
}

/// Reads the `<hyperlink>` elements of a worksheet into (row, column) → url
///
/// External targets come from the sheet relationships, in-document
/// locations are prefixed with `#`. Relationships to parts of the package
/// are not urls, the location is used instead when there is one.
pub(crate) fn read_hyperlinks<B: BufRead>(
    xml: &mut XmlReader<B>,
    relationships: &BTreeMap<Vec<u8>, Relationship>,
) -> Result<BTreeMap<(u32, u32), String>, XlsxError> {
    let mut hyperlinks = BTreeMap::new();
    let mut buf = Vec::with_capacity(1024);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"hyperlink" => {
                let mut range = None;
                let mut url = None;
                let mut location = None;
                for a in e.attributes() {
                    let a = a.map_err(XlsxError::XmlAttr)?;
                    match a.key {
                        QName(b"ref") => range = Some(get_dimension(&a.value)?),
                        QName(b"location") => {
                            location = Some(a.decode_and_unescape_value(xml.decoder())?.into_owned())
                        }
                        key if key.local_name().as_ref() == b"id" && key.prefix().is_some() => {
                            url = match relationships.get(&*a.value) {
                                Some(r) if r.external => Some(r.target.clone()),
                                Some(r) => {
                                    debug!("hyperlink to package part '{}' ignored", r.target);
                                    None
                                }
                                None => None,
                            };
                        }
                        _ => (),
                    }
                }
                let Some(range) = range else {
                    continue;
                };
                let Some(url) = url.or_else(|| location.map(|l| format!("#{l}"))) else {
                    debug!("hyperlink at {:?} has no target", range.start);
                    continue;
                };
                if range.len() > MAX_LINKED_CELLS {
                    hyperlinks.insert(range.start, url);
                    continue;
                }
                for row in range.start.0..=range.end.0 {
                    for col in range.start.1..=range.end.1 {
                        hyperlinks.insert((row, col), url.clone());
                    }
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"worksheet" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => (),
        }
    }
    Ok(hyperlinks)
}

/// Parses the formula of a defined name (`Sheet1!$C$5`, `'My sheet'!B2`)
///
/// Ranges, constants and formulas are not labels.
pub(crate) fn parse_label(formula: &str) -> Option<Label> {
    let (sheet, cell) = formula.trim().rsplit_once('!')?;
    let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
        Some(quoted) => quoted.replace("''", "'"),
        None => sheet.to_owned(),
    };
    if sheet.is_empty() {
        return None;
    }
    let (row, column) = parse_cell_ref(cell).ok()?;
    Some(Label { sheet, row, column })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::configure;

    fn reader(xml: &str) -> XmlReader<&[u8]> {
        let mut xml = XmlReader::from_reader(xml.as_bytes());
        configure(&mut xml);
        xml
    }

    #[test]
    fn test_relationships() {
        let rels = read_relationships(&mut reader(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
                <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments1.xml"/>
                <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
            </Relationships>"#,
        ))
        .unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[&b"rId1"[..]].typ.ends_with("/comments"));
        assert!(rels[&b"rId2"[..]].external);
    }

    #[test]
    fn test_paths() {
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/worksheets", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(rels_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
        assert_eq!(folder_of("xl/worksheets/sheet1.xml"), "xl/worksheets");
    }

    #[test]
    fn test_comments() {
        let comments = read_comments(&mut reader(
            r#"<comments><authors><author>me</author></authors><commentList>
                <comment ref="B2" authorId="0"><text><r><rPr><b/></rPr><t>me:</t></r><r><t xml:space="preserve"> note</t></r></text></comment>
                <comment ref="A1" authorId="0"><text><t>first</t></text></comment>
            </commentList></comments>"#,
        ))
        .unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[&(2, 2)], "me: note");
        assert_eq!(comments[&(1, 1)], "first");
    }

    #[test]
    fn test_hyperlinks() {
        let rels = BTreeMap::from([
            (
                b"rId3".to_vec(),
                Relationship {
                    typ: "hyperlink".to_owned(),
                    target: "https://example.com".to_owned(),
                    external: true,
                },
            ),
            (
                b"rId4".to_vec(),
                Relationship {
                    typ: "hyperlink".to_owned(),
                    target: "../media/image1.png".to_owned(),
                    external: false,
                },
            ),
        ]);
        let links = read_hyperlinks(
            &mut reader(
                r#"<worksheet><sheetData/><hyperlinks>
                    <hyperlink ref="A1:A2" r:id="rId3"/>
                    <hyperlink ref="C4" location="Sheet2!A1"/>
                    <hyperlink ref="D4"/>
                    <hyperlink ref="E5" r:id="rId4"/>
                    <hyperlink ref="F6" r:id="rId4" location="Sheet2!B2"/>
                </hyperlinks></worksheet>"#,
            ),
            &rels,
        )
        .unwrap();
        assert_eq!(links.len(), 4);
        assert_eq!(links[&(2, 1)], "https://example.com");
        assert_eq!(links[&(4, 3)], "#Sheet2!A1");
        // internal relationship targets are not urls
        assert!(!links.contains_key(&(5, 5)));
        assert_eq!(links[&(6, 6)], "#Sheet2!B2");
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            parse_label("Sheet1!$C$5"),
            Some(Label {
                sheet: "Sheet1".to_owned(),
                row: 5,
                column: 3
            })
        );
        assert_eq!(parse_label("'It''s mine'!B2").unwrap().sheet, "It's mine");
        assert_eq!(parse_label("Sheet1!$A$1:$B$2"), None);
        assert_eq!(parse_label("42"), None);
        assert_eq!(parse_label("Sheet1!#REF!"), None);
    }
}
