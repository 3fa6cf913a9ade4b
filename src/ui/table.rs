use tabled::{builder::Builder, settings::Style, Table, Tabled};
use crate::StorageStats;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &StorageStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Nodes", &stats.nodes.to_string());
    builder.add_row("Edges", &stats.edges.to_string());
    builder.add_row("Files", &stats.files.to_string());
    builder.add_row("Lines", &stats.lines.to_string());
    builder.add_row("Source locations", &stats.source_locations.to_string());
    builder.add_row("Errors", &stats.errors.to_string());
    builder.build()
}

/// Free-form table with a header row
pub fn records_table(headers: &[&str], records: Vec<Vec<String>>) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|header| header.to_string()));
    for record in records {
        builder.push_record(record);
    }
    builder.build().with(Style::rounded()).to_string()
}
