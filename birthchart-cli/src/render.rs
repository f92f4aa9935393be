use anyhow::{Result, bail};
use birthchart_core::RequestState;
use clap::ValueEnum;
use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The service's JSON body, pretty-printed.
    Json,
    /// Planet/Position/Sign/House table when the body has that shape.
    Table,
}

/// Print a successful chart; a failed request becomes the command's error.
pub fn render(state: &RequestState, format: OutputFormat) -> Result<()> {
    match state {
        RequestState::Succeeded(body) => {
            let table = match format {
                OutputFormat::Table => chart_table(body),
                OutputFormat::Json => None,
            };
            match table {
                Some(table) => print!("{table}"),
                None => println!("{}", serde_json::to_string_pretty(body)?),
            }
            Ok(())
        }
        RequestState::Failed(message) => bail!("{message}"),
        other => bail!("birth chart request did not complete (state: {other:?})"),
    }
}

/// Render chart entries carrying `sign` (plus optional `position` and
/// `house`) as a table. `None` if no entry has that shape.
pub fn chart_table(body: &Value) -> Option<String> {
    let entries = body.as_object()?;
    let rows: Vec<(&str, String, &str, String)> = entries
        .iter()
        .filter_map(|(name, entry)| {
            let sign = entry.get("sign")?.as_str()?;
            let position = entry.get("position").map(format_position).unwrap_or_default();
            let house = entry.get("house").map(|h| h.to_string()).unwrap_or_default();
            Some((name.as_str(), position, sign, house))
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    let rule = "=".repeat(55);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:<16}{:<10}{:<16}House", "Planet", "Position", "Sign");
    let _ = writeln!(out, "{rule}");
    for (name, position, sign, house) in rows {
        let _ = writeln!(out, "{name:<16}{position:<10}{sign:<16}{house}");
    }
    let _ = writeln!(out, "{rule}");
    Some(out)
}

/// Degrees as `D°MM'`; strings are shown as sent.
fn format_position(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(format_degrees).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_degrees(deg: f64) -> String {
    let d = deg.trunc();
    let m = ((deg - d) * 60.0).trunc();
    format!("{}°{:02}'", d as i64, m.abs() as i64)
}
