//! Terminal output for the CLI: coloured status lines and payload diffs.

use difference::{Changeset, Difference};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::schema::{RootFailure, SchemaDifference};

// ============================================================================
// STATUS LINES
// ============================================================================

pub fn print_ok(label: &str, detail: &str) {
    print_status(Color::Green, "ok", label, detail);
}

pub fn print_failure(label: &str, failure: &RootFailure) {
    print_status(
        Color::Red,
        "FAILED",
        label,
        &format!("root '{}': {}", failure.root, failure.error),
    );
}

pub fn print_error(label: &str, message: &str) {
    print_status(Color::Red, "error", label, message);
}

fn print_status(color: Color, status: &str, label: &str, detail: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    print!("{status:>6}");
    let _ = stdout.reset();
    println!(" {label}: {detail}");
}

// ============================================================================
// DIFFS
// ============================================================================

/// Prints a line diff of two payload renderings, headed by the first structural difference.
pub fn print_schema_diff(difference: &SchemaDifference, old: &str, new: &str) {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true));
    println!("--- {difference} ---");
    let _ = stdout.reset();

    let changeset = Changeset::new(old, new, "\n");
    for diff in &changeset.diffs {
        match diff {
            Difference::Same(x) => {
                let _ = stdout.reset();
                println!(" {x}");
            }
            Difference::Add(x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
                println!("+{x}");
            }
            Difference::Rem(x) => {
                let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Red)));
                println!("-{x}");
            }
        }
    }
    let _ = stdout.reset();
}
