use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use shade_core::{BatchReport, ItemReport};
use shade_model::{Diagnostic, Severity};

pub fn print_summary(report: &BatchReport) {
    if report.dry_run {
        println!("Dry run: no files written");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Stage"),
        header_cell("Target"),
        header_cell("Status"),
        header_cell("Mappings"),
        header_cell("Gaps"),
        header_cell("Errors"),
        header_cell("Warnings"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 6, CellAlignment::Right);
    align_column(&mut table, 7, CellAlignment::Right);

    let mut total_mappings = 0usize;
    let mut total_errors = 0usize;
    let mut total_warnings = 0usize;
    for item in &report.items {
        let (errors, warnings) = count_severities(&item.diagnostics);
        total_mappings += item.mappings;
        total_errors += errors;
        total_warnings += warnings;
        table.add_row(vec![
            Cell::new(item.source.display()),
            Cell::new(item.stage),
            target_cell(item),
            status_cell(item),
            Cell::new(item.mappings),
            count_cell(item.gaps, Color::Yellow),
            count_cell(errors, Color::Red),
            count_cell(warnings, Color::Yellow),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(format!("{} items", report.total))
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        Cell::new(format!("{}/{}", report.succeeded, report.total)).add_attribute(Attribute::Bold),
        Cell::new(total_mappings).add_attribute(Attribute::Bold),
        count_cell(report.gaps, Color::Yellow).add_attribute(Attribute::Bold),
        count_cell(total_errors, Color::Red).add_attribute(Attribute::Bold),
        count_cell(total_warnings, Color::Yellow).add_attribute(Attribute::Bold),
    ]);
    println!("{table}");
    print_diagnostic_table(report);
    if report.cancelled {
        eprintln!("Batch was cancelled before every item ran.");
    }
}

fn print_diagnostic_table(report: &BatchReport) {
    let mut diagnostics: Vec<(&ItemReport, &Diagnostic)> = report.diagnostics().collect();
    if diagnostics.is_empty() {
        return;
    }
    // Errors first; the sort is stable so item order is kept within a
    // severity.
    diagnostics.sort_by_key(|(_, diagnostic)| diagnostic.severity);

    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Item"),
        header_cell("Severity"),
        header_cell("Origin"),
        header_cell("Location"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    for (item, diagnostic) in diagnostics {
        table.add_row(vec![
            Cell::new(item.label()),
            severity_cell(diagnostic.severity),
            Cell::new(diagnostic.origin),
            match &diagnostic.location {
                Some(location) => Cell::new(location),
                None => dim_cell("-"),
            },
            Cell::new(&diagnostic.message),
        ]);
    }
    println!();
    println!("Diagnostics:");
    println!("{table}");
}

fn count_severities(diagnostics: &[Diagnostic]) -> (usize, usize) {
    diagnostics
        .iter()
        .fold((0, 0), |(errors, warnings), diagnostic| match diagnostic.severity {
            Severity::Error => (errors + 1, warnings),
            Severity::Warning => (errors, warnings + 1),
            Severity::Info => (errors, warnings),
        })
}

fn target_cell(item: &ItemReport) -> Cell {
    Cell::new(format!("{}{}", item.target, item.variant))
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn status_cell(item: &ItemReport) -> Cell {
    if item.is_success() {
        Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("✗")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold)
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
        Severity::Info => dim_cell("INFO"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
