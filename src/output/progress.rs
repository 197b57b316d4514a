use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Spinners for the two fetch phases: the run, then its jobs.
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_phase_1() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/2: Fetching workflow run").to_string());
        Self { pb }
    }

    pub fn finish_phase_1_start_phase_2(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 1/2: Fetched workflow run ✓").to_string());
        let pb = create_spinner(bright_yellow("Phase 2/2: Fetching jobs").to_string());
        Self { pb }
    }

    pub fn finish_phase_2(self) {
        self.pb
            .finish_with_message(bright_green("Phase 2/2: Fetched all jobs ✓").to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
