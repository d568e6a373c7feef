//! Free-text form extraction and completeness checking.
//!
//! Extraction is two-pass: a line-anchored `LABEL: VALUE` pattern pass, then
//! a keyword fallback for fields the first pass left empty. No language
//! understanding, only pattern and keyword matching.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The five captured qualification fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Biodata,
    SourceInfo,
    BusinessType,
    Budget,
    StartPlan,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        Self::Biodata,
        Self::SourceInfo,
        Self::BusinessType,
        Self::Budget,
        Self::StartPlan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Biodata => "biodata",
            Self::SourceInfo => "source_info",
            Self::BusinessType => "business_type",
            Self::Budget => "budget",
            Self::StartPlan => "start_plan",
        }
    }

    /// User-facing label, used in the missing-field checklist and when
    /// rendering a fragment back to labeled lines.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::Biodata => "Nama & domisili",
            Self::SourceInfo => "Sumber info",
            Self::BusinessType => "Jenis bisnis",
            Self::Budget => "Budget",
            Self::StartPlan => "Rencana mulai",
        }
    }
}

/// A partial (or complete) set of form answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormPatch {
    pub biodata: Option<String>,
    pub source_info: Option<String>,
    pub business_type: Option<String>,
    pub budget: Option<String>,
    pub start_plan: Option<String>,
}

impl FormPatch {
    pub fn get(&self, field: FormField) -> Option<&str> {
        match field {
            FormField::Biodata => self.biodata.as_deref(),
            FormField::SourceInfo => self.source_info.as_deref(),
            FormField::BusinessType => self.business_type.as_deref(),
            FormField::Budget => self.budget.as_deref(),
            FormField::StartPlan => self.start_plan.as_deref(),
        }
    }

    fn set(&mut self, field: FormField, value: String) {
        let slot = match field {
            FormField::Biodata => &mut self.biodata,
            FormField::SourceInfo => &mut self.source_info,
            FormField::BusinessType => &mut self.business_type,
            FormField::Budget => &mut self.budget,
            FormField::StartPlan => &mut self.start_plan,
        };
        *slot = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        FormField::ALL.iter().all(|f| self.get(*f).is_none())
    }

    /// Field-wise merge: non-null values in `self` win, prior non-null
    /// values survive where `self` is null.
    pub fn merged_over(&self, existing: &FormPatch) -> FormPatch {
        let mut out = existing.clone();
        for field in FormField::ALL {
            if let Some(v) = self.get(field) {
                out.set(field, v.to_string());
            }
        }
        out
    }

    /// Fields still empty after merging.
    pub fn missing(&self) -> Vec<FormField> {
        FormField::ALL
            .into_iter()
            .filter(|f| self.get(*f).map_or(true, |v| v.trim().is_empty()))
            .collect()
    }

    /// Render back to labeled lines, the same shape `parse` consumes.
    pub fn render(&self) -> String {
        FormField::ALL
            .into_iter()
            .filter_map(|f| {
                self.get(f)
                    .map(|v| format!("{}: {}", f.display_label(), v))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Outcome of merging a parsed patch into the stored fragment.
#[derive(Debug, Clone)]
pub struct FormValidation {
    pub valid: bool,
    pub merged: FormPatch,
    pub missing: Vec<FormField>,
}

// Label alternatives per field for the line-anchored pass. Matched against
// the text before the first colon only, on word boundaries.
static LABEL_BIODATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(nama|biodata|domisili)\b").unwrap());
static LABEL_SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(sumber|source|dari|info)\b").unwrap());
static LABEL_BUSINESS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(jenis\s+bisnis|tipe\s+bisnis|bisnis)\b").unwrap());
static LABEL_BUDGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(budget|anggaran|modal|dana)\b").unwrap());
static LABEL_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(kapan|mulai|start|timeline|rencana)\b").unwrap());

// Budget amount fallback, most specific first: millions, billions, bare Rp.
static BUDGET_MILLIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:rp\.?\s*)?\d+(?:[.,]\d+)?\s*(?:juta|jt|million|m)\b").unwrap()
});
static BUDGET_BILLIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:rp\.?\s*)?\d+(?:[.,]\d+)?\s*(?:milyar|miliar|billion|b)\b").unwrap()
});
static BUDGET_PLAIN_RP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brp\.?\s*\d+(?:[.,]\d+)?\b").unwrap());

fn label_regex(field: FormField) -> &'static Regex {
    match field {
        FormField::Biodata => &LABEL_BIODATA,
        FormField::SourceInfo => &LABEL_SOURCE,
        FormField::BusinessType => &LABEL_BUSINESS,
        FormField::Budget => &LABEL_BUDGET,
        FormField::StartPlan => &LABEL_START,
    }
}

const SOURCE_KW: &[&str] = &[
    "instagram", "facebook", "google", "tiktok", "youtube", "referral", "teman", "iklan", "ads",
    "website", "event",
];

const BUSINESS_KW: &[&str] = &[
    "fnb", "f&b", "retail", "service", "jasa", "makanan", "minuman", "food", "beverage",
    "fashion", "kuliner",
];

const START_KW: &[&str] = &[
    "bulan",
    "month",
    "minggu",
    "week",
    "tahun",
    "year",
    "segera",
    "asap",
    "immediately",
    "q1",
    "q2",
    "q3",
    "q4",
];

/// Label words that signal the user is answering the form. Used by
/// `is_form_submission` and intent detection.
const FORM_KW: &[&str] = &[
    "nama", "biodata", "domisili", "sumber", "jenis bisnis", "tipe bisnis", "budget", "anggaran",
    "modal", "dana", "mulai", "timeline", "rencana",
];

/// Count distinct form keywords present in an already-lowercased text.
pub fn form_keyword_count(lower: &str) -> usize {
    FORM_KW.iter().filter(|kw| lower.contains(*kw)).count()
}

/// Extract form fields from free text.
pub fn parse(text: &str) -> FormPatch {
    let mut patch = FormPatch::default();

    // Pass 1: line-anchored `LABEL: VALUE`.
    for line in text.lines() {
        let Some((label_seg, value_seg)) = line.split_once(':') else {
            continue;
        };
        let value = value_seg.trim();
        if value.is_empty() {
            continue;
        }
        for field in FormField::ALL {
            if patch.get(field).is_some() {
                continue;
            }
            if label_regex(field).is_match(label_seg) {
                patch.set(field, value.to_string());
            }
        }
    }

    // Pass 2: keyword fallback for whatever is still empty.
    let lower = text.to_lowercase();

    if patch.source_info.is_none() {
        if let Some(sentence) = sentence_with_keyword(text, &lower, SOURCE_KW) {
            patch.source_info = Some(sentence);
        }
    }
    if patch.business_type.is_none() {
        if let Some(sentence) = sentence_with_keyword(text, &lower, BUSINESS_KW) {
            patch.business_type = Some(sentence);
        }
    }
    if patch.budget.is_none() {
        for pattern in [&*BUDGET_MILLIONS, &*BUDGET_BILLIONS, &*BUDGET_PLAIN_RP] {
            if let Some(m) = pattern.find(text) {
                patch.budget = Some(m.as_str().trim().to_string());
                break;
            }
        }
    }
    if patch.start_plan.is_none() {
        if let Some(sentence) = sentence_with_keyword(text, &lower, START_KW) {
            patch.start_plan = Some(sentence);
        }
    }

    patch
}

/// The trimmed sentence (split on `.!?\n`) containing the first keyword hit.
fn sentence_with_keyword(text: &str, lower: &str, keywords: &[&str]) -> Option<String> {
    let hit = keywords.iter().find(|kw| lower.contains(*kw))?;

    for sentence in text.split(['.', '!', '?', '\n']) {
        if sentence.to_lowercase().contains(hit) {
            let trimmed = sentence.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

/// Merge a parsed patch into the stored fragment and check completeness.
pub fn validate(partial: &FormPatch, existing: Option<&FormPatch>) -> FormValidation {
    let merged = match existing {
        Some(prior) => partial.merged_over(prior),
        None => partial.clone(),
    };
    let missing = merged.missing();
    FormValidation {
        valid: missing.is_empty(),
        merged,
        missing,
    }
}

/// Whether free text looks like a form submission at all.
pub fn is_form_submission(text: &str) -> bool {
    let lower = text.to_lowercase();
    if form_keyword_count(&lower) >= 2 {
        return true;
    }
    text.lines().any(|line| {
        line.split_once(':').is_some_and(|(label_seg, value_seg)| {
            !value_seg.trim().is_empty()
                && FormField::ALL
                    .iter()
                    .any(|f| label_regex(*f).is_match(label_seg))
        })
    })
}

/// User-visible checklist of what is still needed. Empty input, empty output.
pub fn explain_missing(missing: &[FormField]) -> String {
    if missing.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "Form kamu belum lengkap. Mohon lengkapi data berikut ya:\n",
    );
    for field in missing {
        out.push_str(&format!("- {}\n", field.display_label()));
    }
    out.push_str("\nBalas dengan format `Label: jawaban`, satu per baris.");
    out
}
