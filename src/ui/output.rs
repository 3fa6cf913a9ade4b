use crate::ui::{theme, Icons};
use crate::{StorageDiagnostic, StorageEdge};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().label.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().label.clone()), value);
}

/// `#12 call 3 -> 7`
pub fn edge_line(edge: &StorageEdge) -> String {
    format!(
        "{} {} {} -> {}",
        muted(&format!("#{}", edge.id)),
        edge.kind.as_str().style(theme().kind.clone()),
        edge.source_node_id,
        edge.target_node_id
    )
}

pub fn diagnostic(diagnostic: &StorageDiagnostic) {
    let icon = if diagnostic.fatal { Icons::FATAL } else { Icons::WARN };
    let location = format!("{}:{}:{}", diagnostic.file_path, diagnostic.line, diagnostic.column);
    println!(
        "{} {} {}: {}",
        icon,
        location.style(theme().path.clone()),
        diagnostic.severity().style(theme().severity(diagnostic.fatal).clone()),
        diagnostic.message
    );
}
