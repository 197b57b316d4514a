pub mod perfetto;
mod progress;
mod styling;
mod summary;
mod tables;
mod writer;

pub use progress::PhaseProgress;
use styling::{dim, magenta_bold};
pub use summary::print_summary;
pub use writer::write_trace;

/// Prints the `actions-trace` banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("⏱️ actions-trace"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("GitHub Actions runs as Perfetto traces")
    );
}
