//! Human-readable report rendering.

use mailscope_core::model::{AccountEnumeration, PatternCheckBatch};
use mailscope_core::{AnalysisReport, EmailPattern, ProbeKind, ProbeOutcome, ProbePayload};

const MAX_LISTED_SITES: usize = 20;

pub fn report_text(report: &AnalysisReport) -> String {
    let mut out = Vec::new();
    out.push(format!("Domain: {}", report.resolved_domain));
    if let Some(email) = report.input.email.as_deref() {
        out.push(format!("Email:  {email}"));
    }

    for (kind, outcome) in &report.probes {
        out.push(String::new());
        match outcome {
            ProbeOutcome::Success(payload) => section(&mut out, *kind, payload),
            ProbeOutcome::Failure { message, .. } => {
                out.push(format!("{}: failed ({message})", title(*kind)));
            }
        }
    }

    if let Some(patterns) = &report.email_patterns {
        out.push(String::new());
        out.push(format!("Email patterns ({}):", patterns.len()));
        out.extend(patterns.iter().map(|p| format!("  {:<14} {}", p.label, p.email)));
    }
    if let Some(batch) = &report.pattern_checks {
        pattern_checks(&mut out, batch);
    }

    if let Some(outcome) = &report.mailbox_probe {
        out.push(String::new());
        out.push(match outcome {
            ProbeOutcome::Success(probe) => format!(
                "Mailbox probe: {} via {} ({} {})",
                probe.verdict, probe.mx_host, probe.target_code, probe.target_reply
            ),
            ProbeOutcome::Failure { message, .. } => format!("Mailbox probe: failed ({message})"),
        });
    }
    if let Some(outcome) = &report.mail_send {
        out.push(match outcome {
            ProbeOutcome::Success(receipt) => format!(
                "Training message: sent to {} ({} {})",
                receipt.recipient, receipt.code, receipt.reply
            ),
            ProbeOutcome::Failure { message, .. } => format!("Training message: failed ({message})"),
        });
    }

    let template = &report.training_template;
    out.push(String::new());
    out.push("Training template:".to_string());
    out.push(format!("  From:    {}", template.from));
    out.push(format!("  Subject: {}", template.subject));
    out.push(format!("  Preview: {}", template.preheader));

    out.push(String::new());
    if report.has_errors() {
        out.push(format!("Errors ({}):", report.meta.errors.len()));
        out.extend(
            report
                .meta
                .errors
                .iter()
                .map(|e| format!("  {}: {}", e.component, e.message)),
        );
    }
    out.push(format!("Completed in {:.2}s", report.meta.elapsed_seconds));

    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn title(kind: ProbeKind) -> &'static str {
    match kind {
        ProbeKind::Accounts => "Accounts",
        ProbeKind::Mx => "Mail exchangers",
        ProbeKind::TechStack => "Technology stack",
    }
}

fn section(out: &mut Vec<String>, kind: ProbeKind, payload: &ProbePayload) {
    match payload {
        ProbePayload::Mx(mx) => {
            out.push(format!("{}: {}", title(kind), mx.provider));
            out.extend(
                mx.records
                    .iter()
                    .map(|r| format!("  {:>5}  {}", r.preference, r.exchange)),
            );
            out.extend(mx.warnings.iter().map(|w| format!("  warning: {w}")));
        }
        ProbePayload::TechStack(stack) => {
            out.push(format!(
                "{}: {} detections",
                title(kind),
                stack.total_detections
            ));
            for category in &stack.categories {
                let names: Vec<&str> = category.groups.iter().map(|g| g.base.as_str()).collect();
                out.push(format!("  {} ({}): {}", category.name, category.count, names.join(", ")));
            }
        }
        ProbePayload::Accounts(accounts) => {
            out.push(format!("{}: {}", title(kind), account_totals(accounts)));
            account_sites(out, accounts);
        }
    }
}

fn account_totals(accounts: &AccountEnumeration) -> String {
    let t = &accounts.totals;
    format!(
        "{} used, {} not used, {} unknown of {} checked",
        t.positive, t.negative, t.unknown, t.checked
    )
}

fn account_sites(out: &mut Vec<String>, accounts: &AccountEnumeration) {
    for hit in accounts.positive.iter().take(MAX_LISTED_SITES) {
        let marker = if hit.requires_login { " (login)" } else { "" };
        out.push(format!("  + {}{marker}", hit.site));
    }
    if accounts.positive.len() > MAX_LISTED_SITES {
        out.push(format!(
            "  ... {} more",
            accounts.positive.len() - MAX_LISTED_SITES
        ));
    }
    if accounts.raw_output.is_some() {
        out.push("  (unparsed tool output kept in JSON report)".to_string());
    }
}

fn pattern_checks(out: &mut Vec<String>, batch: &PatternCheckBatch) {
    out.push(String::new());
    out.push(format!("Pattern checks ({}):", batch.checked_emails.len()));
    for check in &batch.results {
        out.push(match &check.outcome {
            ProbeOutcome::Success(accounts) => {
                format!("  {}: {}", check.email, account_totals(accounts))
            }
            ProbeOutcome::Failure { message, .. } => {
                format!("  {}: failed ({message})", check.email)
            }
        });
    }
}

pub fn patterns_text(patterns: &[EmailPattern]) -> String {
    let mut text: String = patterns
        .iter()
        .map(|p| format!("{:<14} {}\n", p.label, p.email))
        .collect();
    if text.is_empty() {
        text.push_str("no patterns (names contain no letters)\n");
    }
    text
}
