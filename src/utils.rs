// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Internal module providing handy function

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::BytesRef;

use crate::XlsxError;

macro_rules! from_err {
    ($from:ty, $to:tt, $var:tt) => {
        impl From<$from> for $to {
            fn from(e: $from) -> $to {
                $to::$var(e)
            }
        }
    };
}

/// Appends the text an entity reference (`&amp;`, `&#65;`, ...) stands for.
///
/// Unknown named entities are kept verbatim.
pub(crate) fn unescape_entity_to_buffer(
    entity: &BytesRef<'_>,
    buf: &mut String,
) -> Result<(), XlsxError> {
    if let Some(ch) = entity.resolve_char_ref()? {
        buf.push(ch);
        return Ok(());
    }
    let name = entity.decode()?;
    match resolve_predefined_entity(&name) {
        Some(s) => buf.push_str(s),
        None => {
            buf.push('&');
            buf.push_str(&name);
            buf.push(';');
        }
    }
    Ok(())
}
