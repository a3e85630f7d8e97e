use std::path::Path;

use serde::Serialize;

use shibfilter::report::{FilterReport, PolicyOutline, ReportSummary};

#[derive(Serialize)]
struct JsonReport<'a> {
    policy: String,
    reports: &'a [FilterReport],
    summary: &'a ReportSummary,
}

#[derive(Serialize)]
struct JsonOutline<'a> {
    policy: String,
    valid: bool,
    outline: &'a PolicyOutline,
}

pub fn print_reports(reports: &[FilterReport], summary: &ReportSummary, policy: &Path) {
    emit(&JsonReport {
        policy: policy.display().to_string(),
        reports,
        summary,
    });
}

pub fn print_outline(outline: &PolicyOutline, policy: &Path) {
    emit(&JsonOutline {
        policy: policy.display().to_string(),
        valid: true,
        outline,
    });
}

fn emit<T: Serialize>(report: &T) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize JSON: {}", e),
    }
}
