use console::{style, StyledObject};
use std::fmt::Display;

type Styled = StyledObject<String>;

fn styled(text: impl Display) -> Styled {
    style(text.to_string())
}

/// In-progress phases and counts.
pub fn bright_yellow(text: impl Display) -> Styled {
    styled(text).bright().yellow()
}

/// Completed phases.
pub fn bright_green(text: impl Display) -> Styled {
    styled(text).bright().green()
}

/// Names and paths taken from the run.
pub fn cyan(text: impl Display) -> Styled {
    styled(text).cyan()
}

pub fn dim(text: impl Display) -> Styled {
    styled(text).dim()
}

pub fn bright(text: impl Display) -> Styled {
    styled(text).bright()
}

pub fn magenta_bold(text: impl Display) -> Styled {
    styled(text).magenta().bold()
}
