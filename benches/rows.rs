// SPDX-License-Identifier: MIT
//
// Copyright 2016-2025, Johann Tuffe.

//! Benchmarks of the two traversal strategies.
//!
//! The workbook is generated in memory: 20k rows of mixed numbers, strings,
//! dates and formulas.
//!
//! ```bash
//! cargo bench --bench rows
//! ```

use criterion::{criterion_group, criterion_main, Criterion};
use rust_xlsxwriter::{Format, Workbook};
use sheetgrid::{RowOptions, Xlsx, XlsxOptions};
use std::hint::black_box;
use std::io::Cursor;
use std::time::Duration;

const ROWS: u32 = 20_000;

fn generate() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    let sheet = workbook.add_worksheet();
    for row in 0..ROWS {
        sheet.write_number(row, 0, f64::from(row)).unwrap();
        sheet.write_string(row, 1, format!("item {}", row % 500)).unwrap();
        sheet
            .write_number_with_format(row, 2, 45_000.0 + f64::from(row % 365), &date)
            .unwrap();
        sheet
            .write_formula(row, 3, format!("=A{}*2", row + 1).as_str())
            .unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn count_cells(bytes: &[u8], options: XlsxOptions) -> usize {
    let mut xlsx = Xlsx::new(Cursor::new(bytes), options).unwrap();
    xlsx.each_row(RowOptions::new())
        .unwrap()
        .map(|r| r.unwrap().iter().flatten().count())
        .sum()
}

fn bench_rows(c: &mut Criterion) {
    let bytes = generate();
    let mut group = c.benchmark_group("rows");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("loaded", |b| {
        b.iter(|| black_box(count_cells(&bytes, XlsxOptions::new())))
    });
    group.bench_function("streaming", |b| {
        b.iter(|| black_box(count_cells(&bytes, XlsxOptions::new().minimal_load(true))))
    });
    group.bench_function("random_access", |b| {
        b.iter(|| {
            let mut xlsx = Xlsx::new(Cursor::new(&bytes[..]), XlsxOptions::new()).unwrap();
            let mut found = 0;
            for row in (1..=ROWS).step_by(97) {
                if xlsx.cell(row, 2, ()).unwrap().is_some() {
                    found += 1;
                }
            }
            black_box(found)
        })
    });
    group.finish();
}

criterion_group!(benches, bench_rows);
criterion_main!(benches);
