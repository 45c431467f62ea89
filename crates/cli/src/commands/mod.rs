//! CLI subcommands.

pub mod confirm;
pub mod cost;
pub mod entries;
pub mod migrate;
pub mod seed;
pub mod valuation;

/// Print a value as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
