//! Output flushing: table results in the selected format, text buffers
//! verbatim or one line per command.
//!
//! Runs only after the batch committed; outputs from abandoned attempts
//! never reach here.

use std::fmt::Write as _;
use std::io::{self, Write};

use tabled::builder::Builder;
use tabled::settings::Style;

use nbctl_core::{CommandOutput, Table};

use crate::cli::OutputFormat;
use crate::error::CliError;

// ── Render dispatchers ───────────────────────────────────────────────

/// Render every command's output, in command order.
pub fn render(outputs: &[CommandOutput], format: OutputFormat, oneline: bool) -> Result<String, CliError> {
    let mut out = String::new();
    for output in outputs {
        if let Some(table) = &output.table {
            let rendered = render_table(table, format)?;
            if oneline {
                out.push_str(&escape_oneline(&rendered));
                out.push('\n');
            } else {
                out.push_str(&rendered);
                if !rendered.is_empty() && !rendered.ends_with('\n') {
                    out.push('\n');
                }
            }
        } else if oneline {
            out.push_str(&escape_oneline(&output.output));
            out.push('\n');
        } else {
            out.push_str(&output.output);
        }
    }
    Ok(out)
}

pub fn print_output(output: &str) -> Result<(), CliError> {
    if output.is_empty() {
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Chomp one trailing newline, then escape backslashes and newlines.
fn escape_oneline(text: &str) -> String {
    let text = text.strip_suffix('\n').unwrap_or(text);
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table(table: &Table, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::List => render_records(table),
        OutputFormat::Table => render_grid(table),
        OutputFormat::Json => serde_json::to_string_pretty(table)?,
        OutputFormat::JsonCompact => serde_json::to_string(table)?,
        OutputFormat::Yaml => serde_yaml::to_string(table)?,
    })
}

/// `heading : value` lines per record, records separated by a blank line.
fn render_records(table: &Table) -> String {
    let width = table.headings.iter().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for (i, row) in table.rows.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (heading, value) in table.headings.iter().zip(row) {
            let _ = writeln!(out, "{heading:<width$}: {value}");
        }
    }
    out
}

fn render_grid(table: &Table) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headings.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().cloned());
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text(output: &str) -> CommandOutput {
        CommandOutput {
            output: output.into(),
            table: None,
        }
    }

    fn switches() -> CommandOutput {
        let mut table = Table::new(["_uuid", "name"]);
        table.add_row(vec!["u1".into(), "sw0".into()]);
        table.add_row(vec!["u2".into(), "sw1".into()]);
        CommandOutput {
            output: String::new(),
            table: Some(table),
        }
    }

    #[test]
    fn text_is_written_verbatim_in_order() {
        let out = render(&[text("a\nb\n"), text(""), text("c\n")], OutputFormat::List, false).unwrap();
        assert_eq!(out, "a\nb\nc\n");
    }

    #[test]
    fn oneline_escapes_each_command_onto_one_line() {
        let out = render(&[text("a\nb\n"), text(""), text("back\\slash\n")], OutputFormat::List, true)
            .unwrap();
        assert_eq!(out, "a\\nb\n\nback\\\\slash\n");
    }

    #[test]
    fn list_format_aligns_headings() {
        let out = render(&[switches()], OutputFormat::List, false).unwrap();
        assert_eq!(out, "_uuid: u1\nname : sw0\n\n_uuid: u2\nname : sw1\n");
    }

    #[test]
    fn json_uses_headings_and_data() {
        let out = render(&[switches()], OutputFormat::JsonCompact, false).unwrap();
        assert_eq!(
            out,
            "{\"headings\":[\"_uuid\",\"name\"],\"data\":[[\"u1\",\"sw0\"],[\"u2\",\"sw1\"]]}\n"
        );
    }

    #[test]
    fn grid_contains_every_cell() {
        let out = render(&[switches()], OutputFormat::Table, false).unwrap();
        for cell in ["_uuid", "name", "u1", "sw0", "u2", "sw1"] {
            assert!(out.contains(cell), "missing {cell} in\n{out}");
        }
    }
}
