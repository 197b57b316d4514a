use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cells(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

pub fn conclusion_cell(conclusion: Option<&str>) -> Cell {
    match conclusion {
        Some("success") => Cell::new("success").fg(TableColor::Green),
        Some(failed @ ("failure" | "timed_out" | "startup_failure")) => {
            Cell::new(failed).fg(TableColor::Red)
        }
        Some(other) => Cell::new(other).fg(TableColor::Yellow),
        None => Cell::new("N/A").fg(TableColor::DarkGrey),
    }
}

/// Queue time: a minute is normal, five is worth a look.
pub fn color_coded_wait_cell(nanos: u64) -> Cell {
    let seconds = to_seconds(nanos);
    let cell = Cell::new(format_duration(seconds));
    if seconds <= 60.0 {
        cell.fg(TableColor::Green)
    } else if seconds <= 300.0 {
        cell.fg(TableColor::Yellow)
    } else {
        cell.fg(TableColor::Red)
    }
}

pub fn color_coded_duration_cell(nanos: u64) -> Cell {
    let seconds = to_seconds(nanos);
    let minutes = seconds / 60.0;
    let cell = Cell::new(format_duration(seconds));
    if minutes <= 10.0 {
        cell.fg(TableColor::Green)
    } else if minutes <= 15.0 {
        cell.fg(TableColor::Yellow)
    } else {
        cell.fg(TableColor::Red)
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_seconds(nanos: u64) -> f64 {
    nanos as f64 / NANOS_PER_SECOND
}

pub fn format_nanos(nanos: u64) -> String {
    format_duration(to_seconds(nanos))
}

fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else {
        format!("{:.1}min", seconds / 60.0)
    }
}
