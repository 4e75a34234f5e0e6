use crate::history::LastKnownGood;
use crate::scan::{CalculateSummary, CheckOutcome};
use crate::store::Digests;
use std::path::Path;

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn format_calculate_summary(summary: &CalculateSummary) -> Vec<String> {
    let mut lines = Vec::new();

    if summary.interrupted {
        lines.push("Interrupted - progress so far has been saved".to_string());
    }
    if summary.forced {
        lines.push("Force mode - existing checksums were overwritten".to_string());
    }

    let mut done = format!(
        "Done - calculated {} and skipped {} existing checksums",
        summary.calculated, summary.skipped
    );
    if summary.failed > 0 {
        done.push_str(&format!(" ({} could not be computed)", summary.failed));
    }
    lines.push(done);

    if summary.skipped > 0 {
        lines.push(
            "Rerun with --force to recalculate and overwrite existing checksums".to_string(),
        );
    }

    lines
}

pub fn format_check_outcome(outcome: &CheckOutcome) -> Vec<String> {
    let summary = match outcome {
        CheckOutcome::EmptyDatabase => return vec!["Database is empty - nothing to do".to_string()],
        CheckOutcome::Checked(summary) => summary,
    };

    let mut lines = Vec::new();
    if summary.interrupted {
        lines.push("Interrupted - progress so far has been saved".to_string());
    }

    lines.push(format!(
        "Done checking - found {} of {} files in database - {} OK, {} WRONG, {} skipped \
         due to last check OK and not older than {} days",
        summary.found(),
        summary.total_in_db,
        summary.ok,
        summary.wrong,
        summary.skipped_recent,
        summary.max_age_days
    ));

    if summary.wrong > 0 {
        lines.push("Rerun with --lastok to see when WRONG files were last seen OK".to_string());
    }

    lines
}

fn format_digests(digests: &Digests) -> String {
    digests
        .iter()
        .map(|(algorithm, digest)| format!("{}: {}", algorithm, digest.as_deref().unwrap_or("-")))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_last_known_good(entries: &[LastKnownGood<'_>]) -> Vec<String> {
    if entries.is_empty() {
        return vec!["No file has ever failed verification".to_string()];
    }

    entries
        .iter()
        .map(|entry| match entry {
            LastKnownGood::Seen {
                path,
                timestamp,
                digests,
            } => format!(
                "Last OK entry for {} was on {} ({})",
                path,
                timestamp,
                format_digests(digests)
            ),
            LastKnownGood::NeverOk { path } => format!("File {} was never OK", path),
        })
        .collect()
}

pub fn format_export(path: &Path, written: usize) -> Vec<String> {
    vec![format!(
        "Wrote {} checksums to {}",
        written,
        path.display()
    )]
}
