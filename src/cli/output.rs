//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::error::{Diagnostic, Diagnostics, Severity};
use crate::planner::{Action, NodeRole, ResourceInstanceChange};
use crate::state::ChangeRecord;
use crate::value::{Marks, Path, Value};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Action a single execution node performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeSummary {
    /// Node role.
    pub role: NodeRole,
    /// Reduced action.
    pub action: Action,
}

/// Everything a plan or destroy run produced.
#[derive(Debug, Clone)]
pub struct PlanReport {
    /// Pass name shown as the heading.
    pub title: String,
    /// Final change, if any.
    pub change: Option<ResourceInstanceChange>,
    /// Per-node reductions of the change.
    pub nodes: Vec<NodeSummary>,
    /// Records in the changeset after the run.
    pub records: Vec<ChangeRecord>,
    /// Warnings and check results.
    pub diagnostics: Diagnostics,
}

/// Changeset row for table display.
#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Object")]
    generation: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Replace paths")]
    replace: String,
    #[tabled(rename = "Checksum")]
    checksum: String,
}

/// Node row for table display.
#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "Node")]
    role: String,
    #[tabled(rename = "Action")]
    action: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan report for display.
    #[must_use]
    pub fn format_report(&self, report: &PlanReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&ReportJson::from(report)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats a report as text.
    fn format_report_text(report: &PlanReport) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "\n{}", report.title.bold());

        match &report.change {
            None => {
                let _ = writeln!(output, "{} No change planned.", "✓".green());
            }
            Some(change) if change.action == Action::NoOp => {
                let _ = writeln!(
                    output,
                    "{} {} is up to date.",
                    "✓".green(),
                    change.display_addr()
                );
            }
            Some(change) => {
                let _ = writeln!(
                    output,
                    "{} {} will be {}",
                    Self::format_action(change.action),
                    change.display_addr(),
                    Self::describe_action(change.action)
                );
                if !change.required_replace.is_empty() {
                    let paths: Vec<String> =
                        change.required_replace.iter().map(Path::to_string).collect();
                    let _ = writeln!(output, "   forces replacement: {}", paths.join(", "));
                }
                let before = Self::render_value(&change.before, &change.before_marks);
                let after = Self::render_value(&change.after, &change.after_marks);
                let _ = writeln!(output, "   before: {before}");
                let _ = writeln!(output, "   after:  {after}");
            }
        }

        if !report.nodes.is_empty() {
            let rows: Vec<NodeRow> = report
                .nodes
                .iter()
                .map(|n| NodeRow {
                    role: n.role.to_string(),
                    action: Self::format_action(n.action),
                })
                .collect();
            output.push('\n');
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        if !report.records.is_empty() {
            let rows: Vec<RecordRow> = report
                .records
                .iter()
                .map(|r| RecordRow {
                    address: r.addr.to_string(),
                    generation: r.generation().to_string(),
                    action: r.action.to_string(),
                    replace: r
                        .required_replace
                        .iter()
                        .map(Path::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                    checksum: Self::truncate(&r.checksum, 12),
                })
                .collect();
            let _ = writeln!(output, "\nChangeset ({} recorded):", rows.len());
            output.push_str(&Table::new(rows).to_string());
            output.push('\n');
        }

        output.push_str(&Self::format_diagnostics_text(&report.diagnostics));
        output
    }

    /// Formats diagnostics for display.
    #[must_use]
    pub fn format_diagnostics(&self, diags: &Diagnostics) -> String {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<DiagnosticJson> = diags.iter().map(DiagnosticJson::from).collect();
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_diagnostics_text(diags),
        }
    }

    fn format_diagnostics_text(diags: &Diagnostics) -> String {
        let mut output = String::new();
        for diag in diags.iter() {
            let label = match diag.severity {
                Severity::Error => "Error:".red().bold(),
                Severity::Warning => "Warning:".yellow().bold(),
            };
            let _ = writeln!(output, "\n{label} {}", diag.summary);
            if !diag.detail.is_empty() {
                for line in diag.detail.lines() {
                    let _ = writeln!(output, "   {line}");
                }
            }
        }
        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "valid": result.is_valid(),
                    "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "warnings": if show_warnings { result.warnings.clone() } else { Vec::new() },
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Scenario is valid!\n", "✓".green())
                } else {
                    format!(
                        "{} Scenario has {} error(s):\n",
                        "✗".red(),
                        result.error_count()
                    )
                };
                for error in &result.errors {
                    let _ = writeln!(output, "   - {error}");
                }
                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats an action with color.
    fn format_action(action: Action) -> String {
        let text = format!("{} {action}", action.symbol().trim());
        match action {
            Action::Create => text.green().to_string(),
            Action::Update => text.yellow().to_string(),
            Action::Delete => text.red().to_string(),
            Action::CreateThenDelete | Action::DeleteThenCreate => text.magenta().to_string(),
            Action::NoOp => action.to_string().dimmed().to_string(),
        }
    }

    const fn describe_action(action: Action) -> &'static str {
        match action {
            Action::NoOp => "left unchanged",
            Action::Create => "created",
            Action::Update => "updated in-place",
            Action::Delete => "destroyed",
            Action::CreateThenDelete => "replaced, creating the new object first",
            Action::DeleteThenCreate => "replaced, destroying the old object first",
        }
    }

    /// Renders a value as compact JSON with unknown and sensitive parts
    /// replaced by placeholders.
    fn render_value(value: &Value, marks: &Marks) -> String {
        let rendered = value.map_paths(&Path::root(), &mut |path, v| {
            if marks.covers_sensitive(path) {
                Some(Value::string("(sensitive value)"))
            } else if !v.is_known() {
                Some(Value::string("(known after apply)"))
            } else {
                None
            }
        });
        rendered.to_json().to_string()
    }

    /// Truncates a string to a maximum length.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.len() <= max_len {
            s.to_string()
        } else {
            format!("{}...", &s[..max_len - 3])
        }
    }
}

// JSON serialization helpers

#[derive(Serialize)]
struct ReportJson<'a> {
    title: &'a str,
    action: Option<Action>,
    nodes: Vec<NodeJson>,
    changeset: &'a [ChangeRecord],
    diagnostics: Vec<DiagnosticJson<'a>>,
}

#[derive(Serialize)]
struct NodeJson {
    role: String,
    action: Action,
}

#[derive(Serialize)]
struct DiagnosticJson<'a> {
    severity: &'static str,
    fault: String,
    summary: &'a str,
    detail: &'a str,
}

impl<'a> From<&'a PlanReport> for ReportJson<'a> {
    fn from(report: &'a PlanReport) -> Self {
        Self {
            title: &report.title,
            action: report.change.as_ref().map(|c| c.action),
            nodes: report
                .nodes
                .iter()
                .map(|n| NodeJson {
                    role: n.role.to_string(),
                    action: n.action,
                })
                .collect(),
            changeset: &report.records,
            diagnostics: report.diagnostics.iter().map(DiagnosticJson::from).collect(),
        }
    }
}

impl<'a> From<&'a Diagnostic> for DiagnosticJson<'a> {
    fn from(diag: &'a Diagnostic) -> Self {
        Self {
            severity: match diag.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            },
            fault: diag.fault.to_string(),
            summary: &diag.summary,
            detail: &diag.detail,
        }
    }
}
