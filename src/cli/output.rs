//! CLI output formatting utilities.

use crate::rag::ContextEntry;
use crate::store::FilmSummary;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one line of the film listing.
    pub fn film_info(film: &FilmSummary) {
        println!(
            "  {} {} ({}, {})",
            style("*").cyan(),
            style(&film.title).bold(),
            display_or_unknown(&film.release_date),
            format_runtime(film.runtime),
        );
        println!("    {}", style(&film.source).dim());
    }

    /// Print a ranked retrieval result.
    pub fn search_result(rank: usize, entry: &ContextEntry) {
        let meta = &entry.metadata;
        println!(
            "\n{} {}. {} (score: {:.4})",
            style(">>").green(),
            rank,
            style(&meta.title).bold(),
            entry.score
        );
        println!(
            "   {} | {}",
            display_or_unknown(&meta.release_date),
            format_runtime(meta.runtime)
        );
        if let Some(overview) = entry
            .text
            .lines()
            .find_map(|line| line.strip_prefix("Overview: "))
        {
            println!("   {}", content_preview(overview, 200));
        }
        println!("   {}", style(&meta.source).dim());
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        if let Ok(bar_style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("#>-"));
        }
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format a runtime in minutes as "1h 49m" or "93m".
fn format_runtime(minutes: u32) -> String {
    match (minutes / 60, minutes % 60) {
        (0, 0) => "runtime unknown".to_string(),
        (0, m) => format!("{}m", m),
        (h, m) => format!("{}h {}m", h, m),
    }
}

fn display_or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "date unknown"
    } else {
        value
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        content.to_string()
    } else {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(0), "runtime unknown");
        assert_eq!(format_runtime(93), "1h 33m");
        assert_eq!(format_runtime(45), "45m");
        assert_eq!(format_runtime(120), "2h 0m");
    }

    #[test]
    fn test_content_preview_respects_char_boundaries() {
        assert_eq!(content_preview("short", 10), "short");
        assert_eq!(content_preview("Amélie Poulain", 3), "Amé...");
    }
}
