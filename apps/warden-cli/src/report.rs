// report.rs — Fatal diagnostics for policy errors.
//
// One line on stderr, "<Category>: <message>", then exit status 1. The
// category is red on non-Windows terminals.

use std::io::IsTerminal;

use crossterm::style::Stylize;
use warden_policy::{ErrorCategory, PolicyError};

/// Format a diagnostic line.
pub fn render(category: ErrorCategory, message: &str, color: bool) -> String {
    if color {
        format!("{}: {}", category.as_str().red(), message)
    } else {
        format!("{}: {}", category.as_str(), message)
    }
}

/// Print `err` and terminate the process with status 1.
pub fn fail(err: &PolicyError) -> ! {
    let color = cfg!(not(windows)) && std::io::stderr().is_terminal();
    eprintln!("{}", render(err.category(), &err.to_string(), color));
    std::process::exit(1)
}
