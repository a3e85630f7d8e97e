pub mod json;
pub mod terminal;

use std::path::Path;

use shibfilter::report::{FilterReport, PolicyOutline, ReportSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

pub fn print_reports(reports: &[FilterReport], verbose: bool, format: OutputFormat, policy: &Path) {
    let summary = ReportSummary::from_reports(reports);

    match format {
        OutputFormat::Json => json::print_reports(reports, &summary, policy),
        OutputFormat::Terminal => terminal::print_reports(reports, &summary, verbose, policy),
    }
}

pub fn print_outline(outline: &PolicyOutline, format: OutputFormat, policy: &Path) {
    match format {
        OutputFormat::Json => json::print_outline(outline, policy),
        OutputFormat::Terminal => terminal::print_outline(outline, policy),
    }
}
