use std::fmt::Write;
use std::path::Path;

use comfy_table::Cell;

use crate::run_data::WorkflowRun;
use crate::timeline::JobTiming;

use super::styling::{bright, bright_yellow, cyan, dim};
use super::tables::{
    color_coded_duration_cell, color_coded_wait_cell, conclusion_cell, create_table,
    format_nanos, header_cells,
};

/// Prints a per-job summary of the converted run to stdout.
///
/// One row per traced job in lane order, with queue time color coded
/// (green up to a minute, yellow up to five, red beyond) and run time coded
/// like the rest of the terminal output (green up to 10min, yellow up to 15).
pub fn print_summary(run: &WorkflowRun, timings: &[JobTiming], trace_path: &Path) {
    println!("{}", render_summary(run, timings, trace_path));
}

fn render_summary(run: &WorkflowRun, timings: &[JobTiming], trace_path: &Path) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{} {}", bright("📊"), bright("Overview").underlined());
    let longest_wait = timings.iter().map(|t| t.waiting_ns).max().unwrap_or(0);
    let _ = writeln!(
        output,
        "  {} {}\n  {} {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Run:"),
        cyan(&run.display_title),
        dim("Run number:"),
        bright_yellow(run.run_number),
        dim(format!("(attempt {})", run.run_attempt)),
        dim("Jobs traced:"),
        bright_yellow(timings.len()),
        dim("Longest wait:"),
        bright_yellow(format_nanos(longest_wait)),
        dim("Trace file:"),
        cyan(trace_path.display()),
    );

    if timings.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No jobs ran in this attempt."));
        return output;
    }

    let _ = writeln!(output, "{} {}", bright("🧵"), bright("Jobs").underlined());

    let mut table = create_table();
    table.set_header(header_cells(&[
        "Lane",
        "Job",
        "Conclusion",
        "Runner",
        "Waiting",
        "Running",
        "Steps",
    ]));

    for timing in timings {
        table.add_row(vec![
            Cell::new(timing.lane_index),
            Cell::new(&timing.name),
            conclusion_cell(timing.conclusion.as_deref()),
            Cell::new(&timing.runner),
            color_coded_wait_cell(timing.waiting_ns),
            color_coded_duration_cell(timing.running_ns),
            Cell::new(timing.steps),
        ]);
    }

    let _ = writeln!(output, "{table}");
    let _ = writeln!(
        output,
        "{}",
        dim("Open the trace file at https://ui.perfetto.dev")
    );

    output
}
