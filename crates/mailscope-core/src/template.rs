//! Neutral security-awareness email template.
//!
//! The template never impersonates a third-party brand: the sender is always
//! the analysed domain's own security team, and upstream findings only feed an
//! operator-facing context note.

use serde::{Deserialize, Serialize};

use crate::patterns::sanitize_name;

pub const DEFAULT_TRAINING_URL: &str = "https://www.google.com";
const FALLBACK_DOMAIN: &str = "example.com";
const SUBJECT: &str = "Action required: Verify your contact info by Friday";
const PREHEADER: &str = "This is part of our routine security awareness program.";
const EXERCISE_LINE: &str = "We are running a scheduled security awareness exercise. Please take a moment to confirm your preferred contact method and acknowledge the policy update.";
const DISCLAIMER: &str = "This simulation is for internal training only. If you did not expect this message, report it to the security team.";
const COMPLIANCE: &str = "Use only for authorized security awareness simulations. Do not impersonate third-party brands.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePlaceholders {
    pub training_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateNotes {
    pub context: Option<String>,
    pub placeholders: TemplatePlaceholders,
    pub compliance: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingTemplate {
    pub from: String,
    pub to_example: Option<String>,
    pub subject: String,
    pub preheader: String,
    pub body_text: String,
    pub body_html: String,
    pub notes: TemplateNotes,
}

/// Inputs available to the template. Everything is optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateContext<'a> {
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub domain: Option<&'a str>,
    pub provider: Option<&'a str>,
    pub technology_summary: Option<&'a str>,
    pub training_url: Option<&'a str>,
}

fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn full_name(first: &str, last: &str) -> String {
    match (first.is_empty(), last.is_empty()) {
        (false, false) => format!("{} {}", title_case(first), title_case(last)),
        (false, true) => title_case(first),
        (true, false) => title_case(last),
        (true, true) => String::new(),
    }
}

/// Build the template. Missing inputs degrade wording, never fail.
pub fn generate(ctx: &TemplateContext<'_>) -> TrainingTemplate {
    let first = sanitize_name(ctx.first_name.unwrap_or_default());
    let last = sanitize_name(ctx.last_name.unwrap_or_default());
    let domain = ctx.domain.filter(|d| !d.is_empty());
    let from_domain = domain.unwrap_or(FALLBACK_DOMAIN);
    let training_url = ctx.training_url.unwrap_or(DEFAULT_TRAINING_URL);

    let to_example = domain.map(|domain| {
        if ctx.first_name.is_some() || ctx.last_name.is_some() {
            let first = if first.is_empty() { "firstname" } else { first.as_str() };
            let last = if last.is_empty() { "lastname" } else { last.as_str() };
            format!("{first}.{last}@{domain}")
        } else {
            format!("firstname.lastname@{domain}")
        }
    });

    let recipient = full_name(&first, &last);
    let greeting = if recipient.is_empty() {
        "Hello,".to_string()
    } else {
        format!("Hi {recipient},")
    };

    let context = match (ctx.provider, ctx.technology_summary) {
        (Some(provider), _) => Some(format!("Detected mail provider: {provider}.")),
        (None, Some(_)) => Some("Technology context available from BuiltWith.".to_string()),
        (None, None) => None,
    };

    let body_text = [
        greeting.clone(),
        format!("\n{EXERCISE_LINE}"),
        format!("\nOpen the training portal (internal): {training_url}"),
        format!("\n{DISCLAIMER}"),
        "\nThanks,".to_string(),
        "Security Awareness Team".to_string(),
        from_domain.to_string(),
    ]
    .join("\n");

    let body_html = format!(
        "<p>{greeting}</p>\
         <p>{EXERCISE_LINE}</p>\
         <p>Open the training portal (internal): <a href=\"{training_url}\" target=\"_blank\" rel=\"noopener noreferrer\">Training portal</a></p>\
         <p style=\"font-size:12px;color:#999\">{DISCLAIMER}</p>\
         <p>Thanks,<br/>Security Awareness Team<br/>{from_domain}</p>"
    );

    TrainingTemplate {
        from: format!("Security Awareness <security@{from_domain}>"),
        to_example,
        subject: SUBJECT.to_string(),
        preheader: PREHEADER.to_string(),
        body_text,
        body_html,
        notes: TemplateNotes {
            context,
            placeholders: TemplatePlaceholders {
                training_link: "Use an authorized training URL (e.g., your LMS)".to_string(),
            },
            compliance: COMPLIANCE.to_string(),
        },
    }
}
