#![no_main]
use libfuzzer_sys::fuzz_target;
use sheetgrid::{RowOptions, Xlsx, XlsxOptions};
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    for minimal_load in [false, true] {
        let options = XlsxOptions::new().minimal_load(minimal_load);
        let mut workbook = match Xlsx::new(Cursor::new(data), options) {
            Ok(workbook) => workbook,
            Err(_) => continue,
        };
        let sheets = workbook.sheet_names().len();
        for sheet in 1..=sheets {
            if let Ok(rows) = workbook.each_row(RowOptions::new().sheet(sheet)) {
                rows.take_while(Result::is_ok).count();
            }
            let _ = workbook.comments(sheet);
            let _ = workbook.formulas(sheet);
        }
        let _ = workbook.labels().len();
    }
});
