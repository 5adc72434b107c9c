use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_CHARS: &str = "█▓░";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Create a progress bar that tracks how many path nodes, k-mers or records
/// have been processed. When the total is unknown the bar falls back to a
/// spinner that still tracks the item count.
pub fn count_progress_bar(
    label: impl Into<String>,
    unit_label: &str,
    total_items: Option<u64>,
) -> ProgressBar {
    let label = label.into();
    let pb = match total_items {
        Some(total) => {
            let pb = ProgressBar::new(total);
            let template = format!(
                "{{prefix:.bold.dim}} {{spinner:.green}} [{{elapsed_precise}}] {{wide_bar:.cyan/blue}} {{pos}}/{{len}} {unit_label} ({{eta}} @ {{per_sec}}) {{msg}}",
            );
            pb.set_style(style(&template).progress_chars(BAR_CHARS));
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            let template = format!(
                "{{prefix:.bold.dim}} {{spinner:.green}} [{{elapsed_precise}}] {{pos}} {unit_label} processed ({{per_sec}}) {{msg}}",
            );
            pb.set_style(style(&template));
            pb
        }
    };
    pb.set_prefix(label);
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}

/// Create a spinner for a phase without a meaningful item count.
pub fn spinner_progress(label: impl Into<String>, message: impl Into<String>) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(style("{prefix:.bold.dim} {spinner:.green} {msg} [{elapsed_precise}]"));
    pb.set_prefix(label.into());
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(75));
    pb
}
