//! Output formatting for screenmap results.
//!
//! Two formats:
//! - Pretty: colored terminal output for human readability
//! - JSON: the camelCase record/response shapes, for programmatic consumption

use std::fmt::Write as _;

use colored::*;
use serde::Serialize;

use crate::model::{
    AnalysisRecord, AnalysisResult, CaptureResponse, CaptureStatus, Coverage, FlowKind,
    FrameworkDetection, Screen, ScreenshotStatus,
};

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Pretty,
    Json,
}

impl Format {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pretty" => Some(Format::Pretty),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Write any result as pretty-printed JSON on stdout.
pub fn write_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn write_analysis_pretty(source: &str, result: &AnalysisResult) {
    print!("{}", render_analysis(source, result));
}

pub fn write_record_pretty(record: &AnalysisRecord) {
    let source = format!("{}@{}", record.repo, record.branch);
    print!("{}", render_analysis(&source, &record.to_result()));
}

pub fn write_capture_pretty(response: &CaptureResponse) {
    print!("{}", render_capture(response));
}

fn header(out: &mut String) {
    let _ = writeln!(out);
    let _ = writeln!(out, "  {} v{}", "screenmap".cyan().bold(), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out);
}

/// Render an analysis for the terminal.
pub fn render_analysis(source: &str, result: &AnalysisResult) -> String {
    let mut out = String::new();
    header(&mut out);

    let _ = writeln!(out, "  {}{}", "Source:    ".dimmed(), source);
    let _ = writeln!(out, "  {}{}", "Commit:    ".dimmed(), result.commit_sha);
    let _ = writeln!(out, "  {}{}", "Analysis:  ".dimmed(), result.analysis_id);
    let _ = writeln!(out, "  {}{}", "Framework: ".dimmed(), framework_line(&result.framework));
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  {} screens, {} flows",
        result.screens.len().to_string().bold(),
        result.flows.len().to_string().bold()
    );
    let _ = writeln!(out);

    if !result.screens.is_empty() {
        let _ = writeln!(out, "  {}", "Screens".bold().underline());
        for screen in &result.screens {
            render_screen(&mut out, screen, result);
        }
        let _ = writeln!(out);
    }

    render_coverage(&mut out, &result.coverage);
    out
}

fn framework_line(detection: &FrameworkDetection) -> String {
    match detection.primary {
        Some(primary) => format!("{} (confidence {:.2})", primary, detection.confidence),
        None => {
            let candidates: Vec<String> = detection
                .detected
                .iter()
                .map(|c| format!("{}={}", c.framework, c.score))
                .collect();
            if candidates.is_empty() {
                "generic".to_string()
            } else {
                format!("generic (candidates: {})", candidates.join(", "))
            }
        }
    }
}

fn render_screen(out: &mut String, screen: &Screen, result: &AnalysisResult) {
    let status = match screen.screenshot_status {
        ScreenshotStatus::Ok => "●".green(),
        ScreenshotStatus::Error => "●".red(),
        ScreenshotStatus::Pending => "●".yellow(),
        ScreenshotStatus::None => "○".dimmed(),
    };
    let _ = writeln!(
        out,
        "  {} {:<28} {} {}",
        status,
        screen.route_path.bold(),
        screen.name,
        format!("[{}]", screen.kind).dimmed()
    );
    let _ = writeln!(out, "      {}", screen.source_file.dimmed());

    let mut counts = [0usize; 4];
    for id in &screen.flow_ids {
        if let Some(flow) = result.flows.iter().find(|f| &f.id == id) {
            let slot = match flow.kind {
                FlowKind::UiEvent => 0,
                FlowKind::FunctionCall => 1,
                FlowKind::ApiCall => 2,
                FlowKind::DbQuery => 3,
            };
            counts[slot] += 1;
        }
    }
    let _ = writeln!(
        out,
        "      flows: {} ui, {} fn, {} api, {} db",
        counts[0], counts[1], counts[2], counts[3]
    );
    if !screen.navigates_to.is_empty() {
        let targets: Vec<&str> = screen.navigates_to.iter().map(String::as_str).collect();
        let _ = writeln!(out, "      → {}", targets.join(", "));
    }
    if let Some(error) = &screen.screenshot_error {
        let _ = writeln!(out, "      {} {}", "screenshot:".red(), error);
    }
}

fn render_coverage(out: &mut String, coverage: &Coverage) {
    if !coverage.truncated && coverage.files_skipped.is_empty() && coverage.dangling_dropped.is_empty() {
        let _ = writeln!(out, "  {}", "✓ complete coverage".green());
        let _ = writeln!(out);
        return;
    }

    let _ = writeln!(out, "  {}", "Coverage".bold().underline());
    for truncation in &coverage.truncations {
        let _ = writeln!(
            out,
            "  {} {} limit {} reached ({})",
            "!".yellow(),
            truncation.limit,
            truncation.value,
            truncation.scope
        );
    }
    for skipped in &coverage.files_skipped {
        let _ = writeln!(out, "  {} skipped {}: {}", "-".dimmed(), skipped.path, skipped.reason);
    }
    if !coverage.dangling_dropped.is_empty() {
        let _ = writeln!(
            out,
            "  {} {} dangling references dropped",
            "!".yellow(),
            coverage.dangling_dropped.len()
        );
    }
    let _ = writeln!(out);
}

/// Render a capture response for the terminal.
pub fn render_capture(response: &CaptureResponse) -> String {
    let mut out = String::new();
    header(&mut out);

    for result in &response.results {
        match result.status {
            CaptureStatus::Ok => {
                let _ = writeln!(
                    out,
                    "  {} {} {}",
                    "✓".green(),
                    result.screen_id,
                    result.url.as_deref().unwrap_or("").dimmed()
                );
            }
            CaptureStatus::Error => {
                let _ = writeln!(
                    out,
                    "  {} {} {} {}",
                    "✗".red(),
                    result.screen_id,
                    result.error.as_deref().unwrap_or("unknown error"),
                    format!("({} attempts)", result.attempts).dimmed()
                );
            }
        }
    }
    if !response.results.is_empty() {
        let _ = writeln!(out);
    }

    let summary = format!(
        "{}/{} captured, {} up to date",
        response.captured, response.total, response.skipped
    );
    if response.failed() == 0 {
        let _ = writeln!(out, "  {}", summary.green());
    } else {
        let _ = writeln!(out, "  {} ({} failed)", summary.yellow(), response.failed());
    }
    let _ = writeln!(out);
    out
}
