use std::collections::BTreeSet;
use std::time::Duration;

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

use crm_load::{LoadState, LoadUpdate, RecordSample};
use crm_map::Resolution;
use crm_model::{
    IssueSeverity, LoadResult, MappingConfiguration, MatchMethod, ObjectSummary, SourceDataset,
    TargetObject, TargetRecord, ValidationResult,
};

/// Longest cell text shown before truncation.
const MAX_CELL_WIDTH: usize = 120;

/// Row errors listed after a load.
const MAX_ERRORS_SHOWN: usize = 25;

pub fn print_dataset(dataset: &SourceDataset) {
    println!("File: {}", dataset.path.display());
    println!("Encoding: {}", dataset.encoding);
    println!("Rows: {}", dataset.total_rows);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Column"),
        header_cell("Type"),
        header_cell("Blank"),
        header_cell("Samples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for column in &dataset.columns {
        let samples: Vec<&str> = column
            .sample_values
            .iter()
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .take(3)
            .collect();
        table.add_row(vec![
            dim_cell(column.index + 1),
            Cell::new(&column.name).add_attribute(Attribute::Bold),
            Cell::new(column.inferred_type.as_str()),
            count_cell(column.null_count, Color::Yellow),
            if samples.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(truncate(&samples.join(", ")))
            },
        ]);
    }
    println!("{table}");
}

pub fn print_resolution(resolution: &Resolution, object: &TargetObject) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Field"),
        header_cell("Label"),
        header_cell("Confidence"),
        header_cell("Method"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 3, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);
    for mapping in &resolution.mappings {
        let label = object
            .field(&mapping.target_field)
            .map_or("-", |field| field.label.as_str());
        let mut field_cell = Cell::new(&mapping.target_field);
        if mapping.is_required {
            field_cell = field_cell.add_attribute(Attribute::Bold);
        }
        table.add_row(vec![
            Cell::new(&mapping.source_column),
            field_cell,
            Cell::new(label),
            confidence_cell(mapping.confidence),
            mapping.method.map_or_else(|| dim_cell("-"), method_cell),
        ]);
    }
    for column in &resolution.unmapped_columns {
        table.add_row(vec![
            Cell::new(column),
            dim_cell("(unmapped)"),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    println!("{table}");
    println!(
        "Mapped {} of {} columns (fuzzy {}, semantic {}, llm {})",
        resolution.mappings.len(),
        resolution.mappings.len() + resolution.unmapped_columns.len(),
        resolution.count(MatchMethod::Fuzzy),
        resolution.count(MatchMethod::Semantic),
        resolution.count(MatchMethod::Llm),
    );
}

pub fn print_validation(result: &ValidationResult) {
    if result.issues.is_empty() {
        println!("Mapping is valid.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Severity"),
        header_cell("Kind"),
        header_cell("Field"),
        header_cell("Column"),
        header_cell("Message"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Center);
    for issue in result.all_issues() {
        table.add_row(vec![
            severity_cell(issue.severity),
            Cell::new(issue.kind.as_str()),
            optional_cell(issue.field_name.as_deref()),
            optional_cell(issue.source_column.as_deref()),
            Cell::new(&issue.message),
        ]);
    }
    println!("{table}");
    println!(
        "{} error(s), {} warning(s)",
        result.error_count(),
        result.warning_count()
    );
}

/// Converted records, one row each, columns in field-name order.
pub fn print_records(records: &[TargetRecord]) {
    let columns: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.keys().map(String::as_str))
        .collect();
    if columns.is_empty() {
        println!("No values converted.");
        return;
    }
    let mut table = Table::new();
    let mut header = vec![header_cell("Row")];
    header.extend(columns.iter().map(|c| header_cell(c)));
    table.set_header(header);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (idx, record) in records.iter().enumerate() {
        let mut row = vec![dim_cell(idx + 1)];
        row.extend(columns.iter().map(|column| match record.get(*column) {
            Some(value) => Cell::new(truncate(&value.to_string())),
            None => dim_cell("-"),
        }));
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_load_result(object: &str, result: &LoadResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Object"),
        header_cell("Total"),
        header_cell("Successful"),
        header_cell("Failed"),
        header_cell("Success rate"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 1..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(object).fg(Color::Blue).add_attribute(Attribute::Bold),
        Cell::new(result.total_rows),
        count_cell(result.successful_rows, Color::Green),
        count_cell(result.failed_rows, Color::Red),
        Cell::new(format!("{:.1}%", result.success_rate() * 100.0)),
    ]);
    println!("{table}");

    if result.errors.is_empty() {
        return;
    }
    let mut errors = Table::new();
    errors.set_header(vec![header_cell("Row"), header_cell("Error")]);
    apply_table_style(&mut errors);
    align_column(&mut errors, 0, CellAlignment::Right);
    for error in result.errors.iter().take(MAX_ERRORS_SHOWN) {
        let row = if error.row == 0 {
            dim_cell("all")
        } else {
            Cell::new(error.row)
        };
        errors.add_row(vec![row, Cell::new(truncate(&error.error)).fg(Color::Red)]);
    }
    println!();
    println!("Errors:");
    println!("{errors}");
    if result.errors.len() > MAX_ERRORS_SHOWN {
        println!("... and {} more", result.errors.len() - MAX_ERRORS_SHOWN);
    }
}

pub fn print_objects(objects: &[&ObjectSummary]) {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Name"), header_cell("Label"), header_cell("Custom")]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Center);
    for object in objects {
        table.add_row(vec![
            Cell::new(&object.name),
            Cell::new(&object.label),
            if object.custom {
                Cell::new("✓").fg(Color::Green)
            } else {
                dim_cell("-")
            },
        ]);
    }
    println!("{table}");
    println!("{} object(s)", objects.len());
}

pub fn print_sample(object: &str, sample: &RecordSample) {
    if sample.records.is_empty() {
        println!("No {object} records found.");
        return;
    }
    let mut table = Table::new();
    table.set_header(sample.fields.iter().map(|field| header_cell(field)).collect::<Vec<_>>());
    apply_table_style(&mut table);
    for record in &sample.records {
        table.add_row(sample.fields.iter().map(|field| match record.get(field) {
            None | Some(serde_json::Value::Null) => dim_cell("-"),
            Some(serde_json::Value::String(text)) => Cell::new(truncate(text)),
            Some(other) => Cell::new(truncate(&other.to_string())),
        }));
    }
    println!("{table}");
    println!(
        "Showing {} of {} {object} record(s)",
        sample.records.len(),
        sample.total_size
    );
}

pub fn print_mappings(configs: &[MappingConfiguration]) {
    if configs.is_empty() {
        println!("No saved mappings.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Name"),
        header_cell("Object"),
        header_cell("Mappings"),
        header_cell("Modified"),
        header_cell("Description"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for config in configs {
        table.add_row(vec![
            Cell::new(&config.name).add_attribute(Attribute::Bold),
            Cell::new(&config.salesforce_object),
            Cell::new(config.mappings.len()),
            Cell::new(config.modified_date.format("%Y-%m-%d %H:%M")),
            optional_cell(Some(config.description.as_str()).filter(|d| !d.is_empty())),
        ]);
    }
    println!("{table}");
}

/// Terminal progress for a background load.
pub struct LoadProgressView {
    bar: ProgressBar,
}

impl LoadProgressView {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(200));
        Self { bar }
    }

    pub fn apply(&self, update: &LoadUpdate) {
        match update {
            LoadUpdate::State(state) => {
                if *state == LoadState::Polling {
                    self.bar.set_position(0);
                }
                self.bar.set_message(state.label());
            }
            LoadUpdate::Progress(progress) => {
                self.bar.set_position(progress.current as u64);
                self.bar.set_message(format!(
                    "{} ok, {} failed",
                    progress.successful, progress.failed
                ));
            }
            LoadUpdate::Status(message) => self.bar.set_message(message.clone()),
            LoadUpdate::Complete(result) => {
                self.bar.set_position(result.total_rows as u64);
                self.bar.finish_with_message("done");
            }
            LoadUpdate::Cancelled => self.bar.abandon_with_message("cancelled"),
            LoadUpdate::Error(error) => self.bar.abandon_with_message(error.clone()),
        }
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
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

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    cut.push_str("...");
    cut
}

fn confidence_cell(confidence: Option<f64>) -> Cell {
    match confidence {
        Some(score) => {
            let color = if score >= 0.9 {
                Color::Green
            } else if score >= 0.75 {
                Color::Yellow
            } else {
                Color::DarkYellow
            };
            Cell::new(format!("{:.0}%", score * 100.0)).fg(color)
        }
        None => dim_cell("-"),
    }
}

fn method_cell(method: MatchMethod) -> Cell {
    let color = match method {
        MatchMethod::Fuzzy => Color::Blue,
        MatchMethod::Semantic => Color::Magenta,
        MatchMethod::Llm => Color::Cyan,
    };
    Cell::new(method.as_str()).fg(color)
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn optional_cell(value: Option<&str>) -> Cell {
    value.map_or_else(|| dim_cell("-"), Cell::new)
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
