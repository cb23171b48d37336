use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::types::{RunResult, StatusReport};

pub fn print_run_summary(result: &RunResult) {
    println!("Source: {}", result.source_db.display());
    println!("Cleansed store: {}", result.cleansed_db.display());
    if let Some(path) = &result.snapshot {
        println!("Snapshot: {}", path.display());
    }
    if result.dry_run {
        println!("Dry run: no writes performed");
    }

    let mut table = Table::new();
    table.set_header(vec![header_cell("Stage"), header_cell("Records")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("Raw students"), Cell::new(result.raw_students)]);
    table.add_row(vec![
        Cell::new("New since last run"),
        Cell::new(result.delta_rows),
    ]);
    table.add_row(vec![
        Cell::new("Committed"),
        count_cell(result.records_committed, Color::Green),
    ]);
    table.add_row(vec![
        Cell::new("Quarantined"),
        count_cell(result.records_quarantined, Color::Yellow),
    ]);
    table.add_row(vec![
        Cell::new("Cleansed total"),
        Cell::new(result.total_cleansed),
    ]);
    table.add_row(vec![
        Cell::new("Quarantine total"),
        Cell::new(result.total_quarantined),
    ]);
    println!("{table}");

    if result.version_after == result.version_before {
        println!("Version: {} (unchanged)", result.version_before);
    } else {
        println!(
            "Version: {} -> {}",
            result.version_before, result.version_after
        );
    }
}

pub fn print_status(report: &StatusReport) {
    println!("Version: {}", report.version);
    let mut table = Table::new();
    table.set_header(vec![header_cell("Table"), header_cell("Rows")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table.add_row(vec![Cell::new("cleansed"), Cell::new(report.cleansed_rows)]);
    table.add_row(vec![
        Cell::new("quarantine"),
        count_cell(report.quarantine_rows, Color::Yellow),
    ]);
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        Cell::new(count).fg(Color::DarkGrey)
    }
}
