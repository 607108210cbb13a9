// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Terminal presentation.
//!
//! Operator-facing output goes through here instead of through [`tracing`],
//! which is reserved for diagnostics enabled by `RUST_LOG`.

use console::{style, Emoji};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct Symbols;

impl Symbols {
    pub const SUCCESS: Emoji<'static, 'static> = Emoji("✔", "+");
    pub const ERROR: Emoji<'static, 'static> = Emoji("✖", "x");
    pub const WARNING: Emoji<'static, 'static> = Emoji("⚠", "!");
    pub const INFO: Emoji<'static, 'static> = Emoji("ℹ", "i");
    pub const ARROW: Emoji<'static, 'static> = Emoji("➜", ">");
    pub const STEP: Emoji<'static, 'static> = Emoji("⚡", "*");
}

pub fn print_banner(title: &str) {
    println!();
    println!("{}", style(title).bold().cyan());
    println!("{}", style("=".repeat(title.chars().count())).cyan());
}

pub fn print_header(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{} {} {}",
        Symbols::STEP,
        style(format!("[{step}/{total}]")).dim(),
        style(title).bold().underlined()
    );
}

pub fn print_success(message: &str) {
    println!("  {} {}", style(Symbols::SUCCESS).green(), message);
}

pub fn print_warning(message: &str) {
    println!("  {} {}", style(Symbols::WARNING).yellow(), message);
}

pub fn print_info(message: &str) {
    println!("  {} {}", style(Symbols::INFO).blue(), message);
}

pub fn print_next_step(message: &str) {
    println!("  {} {}", style(Symbols::ARROW).cyan(), message);
}

pub fn log_detail(key: &str, value: &str) {
    println!("    {}: {}", style(key).dim(), value);
}

/// Report fatal error on stderr.
pub fn print_fatal(message: &str) {
    eprintln!(
        "{} {} {}",
        style(Symbols::ERROR).red(),
        style("error:").red().bold(),
        message
    );
}

/// Spinner shown while a captured command runs.
///
/// Hidden automatically when stderr is not a terminal.
pub fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.yellow} {elapsed:.dim} {msg}") {
        bar.set_style(style);
    }
    bar.set_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
