//! Terminal output helpers

use colored::*;
use std::fmt::Display;

/// Styled status lines for command output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Only shown when verbose
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "·".cyan().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "ok".green().bold(), message);
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "warn".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "error".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!("\n{}\n{}", title.bold(), "─".repeat(title.chars().count()).dimmed());
    }

    /// Aligned `key: value` line
    pub fn field(&self, key: &str, value: impl Display) {
        println!("  {:<22} {}", format!("{key}:").dimmed(), value);
    }
}
