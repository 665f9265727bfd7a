// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

use std::io::BufRead;

use quick_xml::{events::Event, Reader as XmlReader};

use super::{read_string, XlsxError};

/// Workbook-wide table of strings, addressed by position
#[derive(Debug, Default)]
pub(crate) struct SharedStrings {
    strings: Vec<String>,
}

impl SharedStrings {
    /// Reads `xl/sharedStrings.xml`
    ///
    /// Every `<si>` takes a slot, empty ones included, so that indexes
    /// stay aligned with the positions referenced by cells.
    pub(crate) fn read<B: BufRead>(xml: &mut XmlReader<B>) -> Result<Self, XlsxError> {
        let mut strings = Vec::new();
        let mut buf = Vec::with_capacity(1024);
        loop {
            buf.clear();
            match xml.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"si" => {
                    strings.push(read_string(xml, e.name())?.unwrap_or_default());
                }
                Ok(Event::End(ref e)) if e.local_name().as_ref() == b"sst" => break,
                Ok(Event::Eof) => return Err(XlsxError::XmlEof("sst")),
                Err(e) => return Err(XlsxError::Xml(e)),
                _ => (),
            }
        }
        Ok(SharedStrings { strings })
    }

    pub(crate) fn get(&self, index: usize) -> Result<&str, XlsxError> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(XlsxError::SharedStringIndex(index))
    }

    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }
}
