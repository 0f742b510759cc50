//! Run summary printed to stdout.

use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use flashtex_sync::{RecordOutcome, SyncReport};

#[derive(Tabled)]
struct FailureRow {
    #[tabled(rename = "id")]
    external_id: String,
    #[tabled(rename = "fingerprint")]
    fingerprint: String,
    #[tabled(rename = "reason")]
    reason: String,
}

pub fn print(report: &SyncReport) {
    println!("{}", summary_line(report));

    let rows = failure_rows(report);
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn summary_line(report: &SyncReport) -> String {
    let failed = report.failed();
    let failed_label = format!("{failed} failed");
    let failed_label = if failed == 0 {
        failed_label.bright_black()
    } else {
        failed_label.red().bold()
    };
    format!(
        "{} created | {} updated | {} skipped | {} | {}",
        report.created().to_string().green(),
        report.updated().to_string().yellow(),
        report.skipped().to_string().bright_black(),
        failed_label,
        format_elapsed(report.elapsed()),
    )
}

fn failure_rows(report: &SyncReport) -> Vec<FailureRow> {
    report
        .failures()
        .filter_map(|result| match &result.outcome {
            RecordOutcome::Failed(reason) => Some(FailureRow {
                external_id: result.external_id.clone(),
                fingerprint: result.fingerprint.as_str().chars().take(12).collect(),
                reason: reason.to_string(),
            }),
            _ => None,
        })
        .collect()
}

fn format_elapsed(elapsed: chrono::Duration) -> String {
    let ms = elapsed.num_milliseconds().max(0);
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}
