//! CLI Output Formatting.
//!
//! Renders command results as text tables or JSON.

use console::{measure_text_width, style};
use serde::Serialize;

use crate::cli::simulator::SimulationReport;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON format
    Json,
    /// Pretty JSON format
    JsonPretty,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-pretty" | "jsonpretty" => Ok(OutputFormat::JsonPretty),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT FORMATTER
// ═══════════════════════════════════════════════════════════════════════════════

/// Output formatter for CLI
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    /// Output format
    format: OutputFormat,
    /// Color enabled
    color: bool,
}

impl OutputFormatter {
    /// Create new formatter
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            color: true,
        }
    }

    /// Disable color
    pub fn without_color(mut self) -> Self {
        self.color = false;
        self
    }

    /// Get format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Check if output is JSON
    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json | OutputFormat::JsonPretty)
    }

    /// Serialize data as JSON in the configured style
    pub fn json<T: Serialize>(&self, data: &T) -> Result<String> {
        let output = if matches!(self.format, OutputFormat::JsonPretty) {
            serde_json::to_string_pretty(data)
        } else {
            serde_json::to_string(data)
        };
        output.map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Key-value lines, or a JSON object of them
    pub fn key_values(&self, pairs: &[(&str, String)]) -> Result<String> {
        if self.is_json() {
            let map: serde_json::Map<String, serde_json::Value> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                .collect();
            return self.json(&map);
        }

        let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let lines: Vec<String> = pairs
            .iter()
            .map(|(k, v)| {
                let key = format!("{:width$}", k, width = width);
                if self.color {
                    format!("{}  {}", style(key).bold(), v)
                } else {
                    format!("{}  {}", key, v)
                }
            })
            .collect();
        Ok(lines.join("\n"))
    }

    /// Text table
    pub fn table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        if headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = headers.iter().map(|h| measure_text_width(*h)).collect();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(measure_text_width(cell));
                }
            }
        }

        let pad = |cell: &str, width: usize| {
            let len = measure_text_width(cell);
            format!("{}{}", cell, " ".repeat(width.saturating_sub(len)))
        };

        let header: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| pad(*h, widths[i]))
            .collect();
        let header = header.join(" | ");

        let mut lines = Vec::with_capacity(rows.len() + 2);
        lines.push(if self.color {
            style(header).bold().to_string()
        } else {
            header
        });
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        lines.push(separator.join("-+-"));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
                .collect();
            lines.push(cells.join(" | "));
        }
        lines.join("\n")
    }

    /// Section header
    pub fn section(&self, title: &str) -> String {
        let header = format!("=== {} ===", title);
        if self.color {
            style(header).cyan().bold().to_string()
        } else {
            header
        }
    }

    /// Render a simulation report
    pub fn report(&self, report: &SimulationReport) -> Result<String> {
        if self.is_json() {
            return self.json(report);
        }

        let steps: Vec<Vec<String>> = report
            .steps
            .iter()
            .map(|s| {
                let status = match (&s.error, self.color) {
                    (None, true) => style("ok").green().to_string(),
                    (None, false) => "ok".to_string(),
                    (Some(e), true) => style(e).red().to_string(),
                    (Some(e), false) => e.clone(),
                };
                vec![s.index.to_string(), s.op.clone(), status]
            })
            .collect();

        let accounts: Vec<Vec<String>> = report
            .accounts
            .iter()
            .map(|a| {
                let collateral: Vec<String> = a
                    .collateral
                    .iter()
                    .map(|(symbol, amount)| format!("{} {}", amount, symbol))
                    .collect();
                vec![
                    a.label.clone(),
                    a.address.short(),
                    if collateral.is_empty() {
                        "-".to_string()
                    } else {
                        collateral.join(", ")
                    },
                    a.collateral_value_usd.clone(),
                    a.debt.clone(),
                    a.dsc_balance.clone(),
                    a.health_factor.clone(),
                ]
            })
            .collect();

        let events: Vec<Vec<String>> = report
            .events
            .iter()
            .enumerate()
            .map(|(i, e)| {
                vec![
                    i.to_string(),
                    e.event_type().to_string(),
                    e.account().short(),
                    e.amount().to_string(),
                ]
            })
            .collect();

        Ok([
            self.section("Steps"),
            self.table(&["#", "op", "result"], &steps),
            String::new(),
            self.section("Accounts"),
            self.table(
                &["user", "address", "collateral", "value (USD)", "debt", "DSC", "health"],
                &accounts,
            ),
            String::new(),
            self.section("Events"),
            self.table(&["#", "event", "account", "amount"], &events),
            String::new(),
            self.key_values(&[
                ("total debt", report.total_debt.clone()),
                ("total supply", report.total_supply.clone()),
                ("failed steps", report.failures().to_string()),
            ])?,
        ]
        .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::simulator::StepOutcome;

    fn report() -> SimulationReport {
        SimulationReport {
            steps: vec![
                StepOutcome {
                    index: 0,
                    op: "mint".into(),
                    ok: false,
                    error: Some("Amount must be more than zero".into()),
                    code: Some(2001),
                },
            ],
            accounts: Vec::new(),
            total_debt: "0".into(),
            total_supply: "0".into(),
            events: Vec::new(),
        }
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_table_alignment() {
        let formatter = OutputFormatter::new(OutputFormat::Text).without_color();
        let table = formatter.table(
            &["a", "bb"],
            &[vec!["long".into(), "x".into()], vec!["y".into(), "z".into()]],
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "a    | bb");
        assert_eq!(lines[1], "-----+---");
        assert_eq!(lines[2], "long | x ");
    }

    #[test]
    fn test_report_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let json = formatter.report(&report()).unwrap();
        let decoded: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, report());
    }

    #[test]
    fn test_report_text() {
        let formatter = OutputFormatter::new(OutputFormat::Text).without_color();
        let text = formatter.report(&report()).unwrap();
        assert!(text.contains("=== Steps ==="));
        assert!(text.contains("Amount must be more than zero"));
        assert!(text.contains("failed steps  1"));
    }
}
