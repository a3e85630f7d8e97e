use std::path::Path;

use colored::Colorize;

use shibfilter::filter::Tristate;
use shibfilter::report::{FilterReport, PolicyOutline, ReportSummary};

pub fn print_reports(reports: &[FilterReport], summary: &ReportSummary, verbose: bool, policy: &Path) {
    println!("{} {}", "Policy:".dimmed(), policy.display());

    for report in reports {
        println!("\n{}", format!("── {} ──", report.request).bold());

        if let Some(ref error) = report.error {
            println!("  {} {}", "ERROR".red().bold(), error);
            continue;
        }

        if verbose {
            for outcome in &report.policies {
                let verdict = match outcome.verdict {
                    Some(Tristate::True) => "TRUE".green().bold(),
                    Some(Tristate::False) => "FALSE".dimmed().bold(),
                    Some(Tristate::Fail) => "FAIL".yellow().bold(),
                    None => "ERROR".red().bold(),
                };
                let code = format!("[{}]", outcome.policy).dimmed();
                println!("  {} {}", verdict, code);
                if let Some(ref error) = outcome.error {
                    println!("       {} {}", "→".dimmed(), error.dimmed());
                }
            }
        }

        for (id, values) in &report.released {
            let values: Vec<String> = values.iter().map(ToString::to_string).collect();
            println!("  {} {} = {}", "RELEASE".green().bold(), id, values.join(", "));
            if verbose {
                if let Some(denied) = report.denied.get(id) {
                    let denied: Vec<String> = denied.iter().map(ToString::to_string).collect();
                    println!("       {} denied: {}", "↳".dimmed(), denied.join(", ").dimmed());
                }
            }
        }
        for id in &report.withheld {
            println!("  {} {}", "WITHHOLD".yellow().bold(), id);
        }
        if report.released.is_empty() && report.withheld.is_empty() {
            println!("  {}", "no attributes in request".dimmed());
        }
    }

    println!();
    print_summary(summary);
}

pub fn print_outline(outline: &PolicyOutline, policy: &Path) {
    println!("{} {}", "Policy:".dimmed(), policy.display());
    println!("\n{}", format!("── {} ──", outline.group).bold());

    for summary in &outline.policies {
        println!("  {} {}", "POLICY".green().bold(), summary.id);
        println!("       {} {}", "requires:".dimmed(), summary.requirement);
        for rule in &summary.rules {
            println!("       {} {}", "•".dimmed(), rule);
        }
    }

    println!();
    let line = format!(
        "Summary: {} policies | {} shared requirement rules | {} shared value rules | {} shared attribute rules",
        outline.policies.len(),
        outline.shared_requirement_rules,
        outline.shared_value_rules,
        outline.shared_attribute_rules,
    );
    println!("{}", line.green().bold());
}

fn print_summary(summary: &ReportSummary) {
    let line = format!(
        "Summary: {} requests | {} attributes released | {} withheld | {} errors",
        summary.requests, summary.released, summary.withheld, summary.errors,
    );

    if summary.errors > 0 {
        println!("{}", line.red().bold());
    } else if summary.released == 0 {
        println!("{}", line.yellow().bold());
    } else {
        println!("{}", line.green().bold());
    }
}
