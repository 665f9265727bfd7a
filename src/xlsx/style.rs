// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::collections::BTreeMap;
use std::io::BufRead;

use quick_xml::{
    events::{attributes::Attribute, BytesStart, Event},
    name::QName,
    Reader as XmlReader,
};

use super::{get_attribute, XlsxError};
use crate::formats::{builtin_format_code, GENERAL_FORMAT};

/// Font emphasis of a cell style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Font {
    /// Bold
    pub bold: bool,
    /// Italic
    pub italic: bool,
    /// Underlined
    pub underline: bool,
}

impl Font {
    /// Is bold
    pub fn is_bold(&self) -> bool {
        self.bold
    }

    /// Is italic
    pub fn is_italic(&self) -> bool {
        self.italic
    }

    /// Is underlined
    pub fn is_underline(&self) -> bool {
        self.underline
    }
}

/// One `<xf>` of `<cellXfs>`
#[derive(Debug, Clone, Copy, Default)]
struct CellXf {
    num_fmt_id: u32,
    font_id: usize,
}

/// Number formats and fonts of the workbook, addressed by style index
#[derive(Debug, Default)]
pub(crate) struct StyleTable {
    /// Custom formats, overriding builtin ones
    number_formats: BTreeMap<u32, String>,
    fonts: Vec<Font>,
    xfs: Vec<CellXf>,
}

impl StyleTable {
    /// Reads `xl/styles.xml`
    pub(crate) fn read<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Self, XlsxError> {
        let mut styles = StyleTable::default();
        let mut buf = Vec::with_capacity(1024);
        let mut inner_buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"numFmts" => loop {
                    inner_buf.clear();
                    match xml.read_event_into(&mut inner_buf) {
                        Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"numFmt" => {
                            let mut id = None;
                            let mut format = String::new();
                            for a in e.attributes() {
                                let a = a.map_err(XlsxError::XmlAttr)?;
                                match a {
                                    Attribute {
                                        key: QName(b"numFmtId"),
                                        value: ref v,
                                    } => id = atoi_simd::parse::<u32>(v).ok(),
                                    Attribute {
                                        key: QName(b"formatCode"),
                                        ..
                                    } => {
                                        format = a
                                            .decode_and_unescape_value(xml.decoder())?
                                            .into_owned()
                                    }
                                    _ => (),
                                }
                            }
                            if let Some(id) = id {
                                styles.number_formats.insert(id, format);
                            }
                        }
                        Ok(Event::End(ref e)) if e.local_name().as_ref() == b"numFmts" => break,
                        Ok(Event::Eof) => return Err(XlsxError::XmlEof("numFmts")),
                        Err(e) => return Err(XlsxError::Xml(e)),
                        _ => (),
                    }
                },
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"fonts" => loop {
                    inner_buf.clear();
                    match xml.read_event_into(&mut inner_buf) {
                        Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"font" => {
                            let font = read_font(xml)?;
                            styles.fonts.push(font);
                        }
                        Ok(Event::End(ref e)) if e.local_name().as_ref() == b"fonts" => break,
                        Ok(Event::Eof) => return Err(XlsxError::XmlEof("fonts")),
                        Err(e) => return Err(XlsxError::Xml(e)),
                        _ => (),
                    }
                },
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"cellXfs" => loop {
                    inner_buf.clear();
                    match xml.read_event_into(&mut inner_buf) {
                        Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"xf" => {
                            let num_fmt_id = get_attribute(e.attributes(), QName(b"numFmtId"))?
                                .and_then(|v| atoi_simd::parse::<u32>(v).ok())
                                .unwrap_or(0);
                            let font_id = get_attribute(e.attributes(), QName(b"fontId"))?
                                .and_then(|v| atoi_simd::parse::<usize>(v).ok())
                                .unwrap_or(0);
                            styles.xfs.push(CellXf {
                                num_fmt_id,
                                font_id,
                            });
                        }
                        Ok(Event::End(ref e)) if e.local_name().as_ref() == b"cellXfs" => break,
                        Ok(Event::Eof) => return Err(XlsxError::XmlEof("cellXfs")),
                        Err(e) => return Err(XlsxError::Xml(e)),
                        _ => (),
                    }
                },
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"styleSheet" => break,
                Ok(Event::Eof) => break,
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(styles)
    }

    /// Number format code of a style
    ///
    /// Custom formats first, then the builtin table, then `General`.
    pub(crate) fn format_code(&self, style: usize) -> &str {
        let Some(xf) = self.xfs.get(style) else {
            return GENERAL_FORMAT;
        };
        self.number_formats
            .get(&xf.num_fmt_id)
            .map(String::as_str)
            .or_else(|| builtin_format_code(xf.num_fmt_id))
            .unwrap_or(GENERAL_FORMAT)
    }

    /// Font of a style, all flags off for style 0 or unknown styles
    pub(crate) fn font(&self, style: usize) -> Font {
        if style == 0 {
            return Font::default();
        }
        self.xfs
            .get(style)
            .and_then(|xf| self.fonts.get(xf.font_id))
            .copied()
            .unwrap_or_default()
    }

    pub(crate) fn len(&self) -> usize {
        self.xfs.len()
    }
}

/// Reads the emphasis children of a `<font>`
fn read_font<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Font, XlsxError> {
    let mut font = Font::default();
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        match xml.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"b" => font.bold = is_on(e, &[b"0", b"false"])?,
                b"i" => font.italic = is_on(e, &[b"0", b"false"])?,
                b"u" => font.underline = is_on(e, &[b"none"])?,
                _ => (),
            },
            Event::End(ref e) if e.local_name().as_ref() == b"font" => break,
            Event::Eof => return Err(XlsxError::XmlEof("font")),
            _ => (),
        }
    }
    Ok(font)
}

/// A flag element is on unless its `val` is one of `off`
fn is_on(e: &BytesStart<'_>, off: &[&[u8]]) -> Result<bool, XlsxError> {
    Ok(match get_attribute(e.attributes(), QName(b"val"))? {
        Some(val) => !off.contains(&val),
        None => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xlsx::configure;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="yyyy\-mm\-dd"/>
    <numFmt numFmtId="14" formatCode="dd/mm/yyyy"/>
  </numFmts>
  <fonts count="3">
    <font><sz val="11"/><name val="Calibri"/></font>
    <font><b/><sz val="11"/><name val="Calibri"/></font>
    <font><i/><u val="none"/><b val="0"/></font>
  </fonts>
  <cellXfs count="5">
    <xf numFmtId="0" fontId="0"/>
    <xf numFmtId="164" fontId="1" applyNumberFormat="1"><alignment horizontal="center"/></xf>
    <xf numFmtId="10" fontId="2"/>
    <xf numFmtId="14" fontId="0"/>
    <xf numFmtId="200" fontId="9"/>
  </cellXfs>
  <dxfs count="1"><dxf><font><b/></font><numFmt numFmtId="300" formatCode="0.0"/></dxf></dxfs>
</styleSheet>"#;

    fn styles() -> StyleTable {
        let mut xml = XmlReader::from_reader(STYLES.as_bytes());
        configure(&mut xml);
        StyleTable::read(&mut xml).unwrap()
    }

    #[test]
    fn test_format_resolution() {
        let styles = styles();
        assert_eq!(styles.len(), 5);
        assert_eq!(styles.format_code(0), "General");
        assert_eq!(styles.format_code(1), "yyyy\\-mm\\-dd");
        assert_eq!(styles.format_code(2), "0.00%");
        // custom formats override builtin ids
        assert_eq!(styles.format_code(3), "dd/mm/yyyy");
        // unknown ids and unknown styles fall back to General
        assert_eq!(styles.format_code(4), "General");
        assert_eq!(styles.format_code(42), "General");
        // stable across calls
        assert_eq!(styles.format_code(1), styles.format_code(1));
    }

    #[test]
    fn test_fonts() {
        let styles = styles();
        assert_eq!(styles.font(0), Font::default());
        assert!(styles.font(1).is_bold());
        let font = styles.font(2);
        assert!(font.is_italic());
        assert!(!font.is_underline());
        assert!(!font.is_bold());
        // dangling font id
        assert_eq!(styles.font(4), Font::default());
        assert_eq!(styles.font(99), Font::default());
    }
}
