use colored::{ColoredString, Colorize};

use crate::domain::entities::alert::AlertKind;

/// Points below the threshold at which a reading is shown as a warning.
const WARN_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Ok,
    Near,
    Breach,
}

fn level(value: f64, threshold: f64) -> Level {
    if value > threshold {
        Level::Breach
    } else if value > threshold - WARN_MARGIN {
        Level::Near
    } else {
        Level::Ok
    }
}

/// Usage bar of `width` cells, colored against `threshold`.
#[must_use]
pub fn usage_bar(value: f64, threshold: f64, width: usize) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);

    let bar_filled = "█".repeat(filled);
    let bar_empty = "░".repeat(empty);

    let colored_bar = match level(value, threshold) {
        Level::Breach => bar_filled.red().bold(),
        Level::Near => bar_filled.yellow(),
        Level::Ok => bar_filled.green(),
    };

    format!("{colored_bar}{bar_empty}")
}

#[must_use]
pub fn colorize_percent(value: f64, threshold: f64) -> ColoredString {
    let text = format!("{value:.1}%");
    match level(value, threshold) {
        Level::Breach => text.red().bold(),
        Level::Near => text.yellow(),
        Level::Ok => text.green(),
    }
}

#[must_use]
pub fn kind_badge(kind: AlertKind) -> String {
    let label = format!(" {} ", kind.as_str().to_uppercase());
    match kind {
        AlertKind::Cpu => format!("{}", label.on_red().white().bold()),
        AlertKind::Memory => format!("{}", label.on_yellow().black().bold()),
    }
}

pub fn print_section_header(title: &str) {
    println!("{}", title.bold().cyan());
    let display_width = title.chars().count();
    println!("{}", "─".repeat(display_width).cyan());
}
