//! Technology-stack payload and normalization.
//!
//! Raw detections (name + categories) are grouped twice: by a derived base
//! name, and by category. Base names come from an ordered family table first,
//! then from stripping trailing version tokens.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const UNCATEGORIZED: &str = "Uncategorized";

/// One technology as reported by the upstream API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedTechnology {
    pub name: String,
    pub categories: Vec<String>,
}

impl DetectedTechnology {
    pub fn new<S: Into<String>>(name: impl Into<String>, categories: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            categories: categories.into_iter().map(Into::into).collect(),
        }
    }
}

/// A concrete detection name and how often it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyVariant {
    pub name: String,
    pub count: usize,
}

/// Detections sharing one base name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyGroup {
    pub base: String,
    pub count: usize,
    pub variants: Vec<TechnologyVariant>,
    pub categories: Vec<String>,
}

/// Groups filed under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    pub name: String,
    pub count: usize,
    pub groups: Vec<TechnologyGroup>,
}

/// Normalized technology stack for a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyStack {
    pub domain: String,
    pub total_detections: usize,
    pub groups: Vec<TechnologyGroup>,
    pub categories: Vec<CategoryGroup>,
}

impl TechnologyStack {
    /// Normalize raw detections into grouped form.
    pub fn normalize(domain: impl Into<String>, detections: &[DetectedTechnology]) -> Self {
        let detections: Vec<&DetectedTechnology> = detections
            .iter()
            .filter(|d| !d.name.trim().is_empty())
            .collect();

        let groups = build_groups(detections.iter().copied());

        let mut by_category: BTreeMap<String, Vec<&DetectedTechnology>> = BTreeMap::new();
        for &detection in &detections {
            for category in categories_of(detection) {
                by_category.entry(category).or_default().push(detection);
            }
        }
        let mut categories: Vec<CategoryGroup> = by_category
            .into_iter()
            .map(|(name, members)| CategoryGroup {
                name,
                count: members.len(),
                groups: build_groups(members.into_iter()),
            })
            .collect();
        categories.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));

        Self {
            domain: domain.into(),
            total_detections: detections.len(),
            groups,
            categories,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_detections == 0
    }

    pub fn group(&self, base: &str) -> Option<&TechnologyGroup> {
        self.groups.iter().find(|g| g.base == base)
    }

    /// One-line summary of the largest categories, if anything was detected.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let top: Vec<String> = self
            .categories
            .iter()
            .take(3)
            .map(|c| format!("{} ({})", c.name, c.count))
            .collect();
        Some(format!(
            "{} technologies across {} categories: {}",
            self.total_detections,
            self.categories.len(),
            top.join(", ")
        ))
    }
}

fn categories_of(detection: &DetectedTechnology) -> Vec<String> {
    let set: BTreeSet<String> = detection
        .categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();
    if set.is_empty() {
        vec![UNCATEGORIZED.to_string()]
    } else {
        set.into_iter().collect()
    }
}

fn build_groups<'a>(detections: impl Iterator<Item = &'a DetectedTechnology>) -> Vec<TechnologyGroup> {
    struct Acc {
        count: usize,
        variants: HashMap<String, usize>,
        categories: BTreeSet<String>,
    }

    let mut acc: HashMap<String, Acc> = HashMap::new();
    for detection in detections {
        let name = detection.name.trim();
        let entry = acc.entry(base_name(name)).or_insert_with(|| Acc {
            count: 0,
            variants: HashMap::new(),
            categories: BTreeSet::new(),
        });
        entry.count += 1;
        *entry.variants.entry(name.to_string()).or_insert(0) += 1;
        entry.categories.extend(categories_of(detection));
    }

    let mut groups: Vec<TechnologyGroup> = acc
        .into_iter()
        .map(|(base, acc)| {
            let mut variants: Vec<TechnologyVariant> = acc
                .variants
                .into_iter()
                .map(|(name, count)| TechnologyVariant { name, count })
                .collect();
            variants.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
            TechnologyGroup {
                base,
                count: acc.count,
                variants,
                categories: acc.categories.into_iter().collect(),
            }
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.base.cmp(&b.base)));
    groups
}

/// Ordered (pattern, base) family table; first match wins, case-insensitive.
const FAMILY_TABLE: &[(&str, &str)] = &[
    (r"^jquery[\s-]*ui\b", "jquery-ui"),
    (r"^jquery[\s-]*migrate\b", "jquery-migrate"),
    (r"^google[\s-]*analytics\b", "google-analytics"),
    (r"^universal[\s-]*analytics\b", "google-analytics"),
    (r"^(global[\s-]*site[\s-]*tag|gtag)\b", "google-analytics"),
    (r"^google[\s-]*tag[\s-]*manager\b", "google-tag-manager"),
    (r"^google[\s-]*font", "google-fonts"),
    (r"^font[\s-]*awesome\b", "font-awesome"),
    (r"^(twitter[\s-]*)?bootstrap\b", "bootstrap"),
    (r"^wordpress\b", "wordpress"),
    (r"^(microsoft[\s-]*)?asp\.?net\b", "asp-net"),
    (r"^php\b", "php"),
    (r"^apache(?:[\s-]*(?:http[\s-]*server|httpd)|\s+\d|$)", "apache"),
    (r"^nginx\b", "nginx"),
    (r"^cloudflare\b", "cloudflare"),
    (r"^react(?:[\s-]*js)?(?:\s+v?\d|$)", "react"),
];

fn family_table() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        FAMILY_TABLE
            .iter()
            .map(|(pattern, base)| {
                let re = Regex::new(&format!("(?i){pattern}")).expect("static family pattern");
                (re, *base)
            })
            .collect()
    })
}

fn version_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:[\s_/-]+v?\d[\w.\-]*)+$").expect("static regex")
    })
}

fn separators_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s_]+").expect("static regex"))
}

/// Derive the version-stripped, family-grouped base name of a technology.
///
/// `"jQuery 1.10.1"` and `"jQuery 2.0"` both map to `"jquery"`.
pub fn base_name(name: &str) -> String {
    let trimmed = name.trim();
    if let Some((_, base)) = family_table().iter().find(|(re, _)| re.is_match(trimmed)) {
        return (*base).to_string();
    }
    let stripped = version_suffix_re().replace(trimmed, "");
    let stripped = if stripped.trim().is_empty() {
        trimmed.to_string()
    } else {
        stripped.trim().to_string()
    };
    separators_re()
        .replace_all(&stripped.to_lowercase(), "-")
        .into_owned()
}
