//! Extraction orchestrator - document analysis to typed fields.
//!
//! Walks the analysis payload section by section (amounts, dates,
//! entities, narrative), canonicalizes labels, parses values, resolves
//! scope, and deduplicates by field path keeping the highest-confidence
//! candidate. Malformed individual strings are skipped, never abort the
//! batch.

use indexmap::IndexMap;
use tracing::debug;

use crate::pipeline::canonical::{canonicalize_label, resolve_scope};
use crate::pipeline::values::{
    has_magnitude_suffix, parse_currency_value, parse_date_value, parse_percentage_value,
};
use crate::types::{
    analysis::DocumentAnalysis,
    field::{ExtractedField, FieldScope, FieldValue},
    options::ExtractOptions,
};

/// Label fragments that mark an amount as a percentage even without a
/// `%` in the value.
const PERCENT_LABEL_HINTS: &[&str] = &["ltv", "ltc", "profit", "margin", "yield", "return"];

/// Minimum executive-summary length worth keeping as a fact.
const MIN_SUMMARY_LEN: usize = 50;

/// Extract a deduplicated list of typed, scoped fields from one
/// document analysis.
///
/// Output contains at most one field per distinct path; on collision
/// the higher confidence wins and exact ties keep the first seen.
pub fn extract_fields(analysis: &DocumentAnalysis, options: &ExtractOptions) -> Vec<ExtractedField> {
    let mut fields = Vec::new();

    for raw in &analysis.key_amounts {
        match amount_field(raw, options) {
            Some(field) => fields.push(field),
            None => debug!(raw, "skipping malformed key amount"),
        }
    }

    for raw in &analysis.key_dates {
        match date_field(raw, options) {
            Some(field) => fields.push(field),
            None => debug!(raw, "skipping malformed key date"),
        }
    }

    fields.extend(entity_fields(analysis, options));
    fields.extend(narrative_fields(analysis, options));

    dedupe_by_path(fields)
}

/// Split a `"<label>: <value>"` string at the first colon.
///
/// Strings without a colon, or with nothing before it, are rejected.
fn split_labeled(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.find(':')?;
    let (label, rest) = raw.split_at(idx);
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Some((label, rest[1..].trim()))
}

fn amount_field(raw: &str, options: &ExtractOptions) -> Option<ExtractedField> {
    let (label, value_text) = split_labeled(raw)?;
    let canonical = canonicalize_label(label);
    let scope = resolve_scope(canonical.scope, options.has_project_context, options.category());

    let value = classify_amount(label, value_text);

    Some(
        ExtractedField::new(canonical.path, label, value)
            .with_canonical(canonical.is_canonical)
            .with_confidence(canonical.confidence)
            .with_scope(scope)
            .with_source_text(raw),
    )
}

/// Classify and parse an amount value.
///
/// Percentage when the value carries `%` or the label carries a ratio
/// hint; else currency on a symbol or magnitude suffix; else plain
/// number; else the raw string. Each classification falls through to
/// the next when its parser rejects the value.
fn classify_amount(label: &str, value_text: &str) -> FieldValue {
    let folded_label = label.to_lowercase();

    if value_text.contains('%')
        || PERCENT_LABEL_HINTS.iter().any(|hint| folded_label.contains(hint))
    {
        if let Some(pct) = parse_percentage_value(value_text) {
            return FieldValue::Percentage(pct);
        }
    }

    if value_text.contains(['£', '$', '€']) || has_magnitude_suffix(value_text) {
        if let Some(amount) = parse_currency_value(value_text) {
            return FieldValue::Currency(amount);
        }
    }

    if let Ok(number) = value_text.replace(',', "").trim().parse::<f64>() {
        return FieldValue::Number(number);
    }

    FieldValue::String(value_text.to_string())
}

fn date_field(raw: &str, options: &ExtractOptions) -> Option<ExtractedField> {
    let (label, value_text) = split_labeled(raw)?;
    let canonical = canonicalize_label(label);
    let scope = resolve_scope(canonical.scope, options.has_project_context, options.category());

    let value = match parse_date_value(value_text) {
        Some(date) => FieldValue::Date(date),
        None => FieldValue::String(value_text.to_string()),
    };

    Some(
        ExtractedField::new(canonical.path, label, value)
            .with_canonical(canonical.is_canonical)
            .with_confidence(canonical.confidence)
            .with_scope(scope)
            .with_source_text(raw),
    )
}

/// Entity-derived fields: only the first of each list produces a fact;
/// the full list survives in the source text for audit.
fn entity_fields(analysis: &DocumentAnalysis, options: &ExtractOptions) -> Vec<ExtractedField> {
    let entities = &analysis.entities;
    let mut fields = Vec::new();

    if let Some(company) = entities.companies.first() {
        fields.push(
            ExtractedField::new("company.name", "Company Name", FieldValue::String(company.clone()))
                .with_canonical(true)
                .with_confidence(0.7)
                .with_scope(FieldScope::Client)
                .with_source_text(entities.companies.join(", "))
                .with_tag("entity"),
        );
    }

    if let Some(person) = entities.people.first() {
        fields.push(
            ExtractedField::new(
                "contact.primaryName",
                "Primary Contact",
                FieldValue::String(person.clone()),
            )
            .with_canonical(true)
            .with_confidence(0.6)
            .with_scope(FieldScope::Client)
            .with_source_text(entities.people.join(", "))
            .with_tag("entity"),
        );
    }

    // A site address only means something against a project
    if options.has_project_context {
        if let Some(location) = entities.locations.first() {
            fields.push(
                ExtractedField::new(
                    "location.siteAddress",
                    "Site Address",
                    FieldValue::String(location.clone()),
                )
                .with_canonical(true)
                .with_confidence(0.6)
                .with_scope(FieldScope::Project)
                .with_source_text(entities.locations.join(", "))
                .with_tag("entity"),
            );
        }
    }

    fields
}

fn narrative_fields(analysis: &DocumentAnalysis, options: &ExtractOptions) -> Vec<ExtractedField> {
    let scope = if options.has_project_context {
        FieldScope::Project
    } else {
        FieldScope::Client
    };
    let mut fields = Vec::new();

    if let Some(summary) = &analysis.executive_summary {
        if summary.len() > MIN_SUMMARY_LEN {
            fields.push(
                ExtractedField::new(
                    "insights.executive_summary",
                    "Executive Summary",
                    FieldValue::Text(summary.clone()),
                )
                .with_canonical(true)
                .with_confidence(0.9)
                .with_scope(scope)
                .with_source_text(summary)
                .with_tag("narrative"),
            );
        }
    }

    if !analysis.key_terms.is_empty() {
        fields.push(
            ExtractedField::new(
                "insights.key_terms",
                "Key Terms",
                FieldValue::Array(analysis.key_terms.clone()),
            )
            .with_canonical(true)
            .with_confidence(0.8)
            .with_scope(scope)
            .with_source_text(analysis.key_terms.join(", "))
            .with_tag("narrative"),
        );
    }

    fields
}

/// Keep one field per path: the highest confidence, first seen on ties.
/// Insertion order of surviving fields is preserved.
fn dedupe_by_path(fields: Vec<ExtractedField>) -> Vec<ExtractedField> {
    let mut by_path: IndexMap<String, ExtractedField> = IndexMap::with_capacity(fields.len());

    for field in fields {
        match by_path.get(&field.field_path) {
            Some(existing) if field.confidence <= existing.confidence => {
                debug!(
                    field_path = %field.field_path,
                    kept = existing.confidence,
                    dropped = field.confidence,
                    "dropping duplicate field path"
                );
            }
            _ => {
                by_path.insert(field.field_path.clone(), field);
            }
        }
    }

    by_path.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::analysis::ExtractedEntities;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn project_options() -> ExtractOptions {
        ExtractOptions::new().with_project_context(true)
    }

    fn field<'a>(fields: &'a [ExtractedField], path: &str) -> &'a ExtractedField {
        fields
            .iter()
            .find(|f| f.field_path == path)
            .unwrap_or_else(|| panic!("missing field {path}"))
    }

    #[test]
    fn extracts_amounts_end_to_end() {
        let analysis = DocumentAnalysis::new()
            .with_key_amount("Loan Amount: £2,500,000")
            .with_key_amount("LTV: 65%");

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields.len(), 2);

        let loan = field(&fields, "financials.loanAmount");
        assert_eq!(loan.value, FieldValue::Currency(2_500_000.0));
        assert_eq!(loan.scope, FieldScope::Project);
        assert_eq!(loan.confidence, 0.95);
        assert_eq!(loan.source_text, "Loan Amount: £2,500,000");
        assert!(loan.is_canonical);

        let ltv = field(&fields, "financials.ltv");
        assert_eq!(ltv.value, FieldValue::Percentage(65.0));
        assert_eq!(ltv.value_type(), "percentage");
        assert_eq!(ltv.confidence, 0.95);
    }

    #[test]
    fn ratio_label_without_percent_sign_is_percentage() {
        let analysis = DocumentAnalysis::new().with_key_amount("Profit Margin: 0.18");
        let fields = extract_fields(&analysis, &project_options());
        // Bare fraction rescaled to the 0-100 scale
        assert_eq!(fields[0].value, FieldValue::Percentage(18.0));
    }

    #[test]
    fn ratio_label_with_currency_value_stays_currency() {
        // Label says "profit" but the value is plainly money
        let analysis = DocumentAnalysis::new().with_key_amount("Profit: £350,000");
        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields[0].value, FieldValue::Currency(350_000.0));
    }

    #[test]
    fn magnitude_suffix_without_symbol_is_currency() {
        let analysis = DocumentAnalysis::new().with_key_amount("GDV: 4.2m");
        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields[0].value, FieldValue::Currency(4_200_000.0));
    }

    #[test]
    fn plain_numbers_and_raw_strings() {
        let analysis = DocumentAnalysis::new()
            .with_key_amount("Number of Units: 24")
            .with_key_amount("Planning Status: granted with conditions");

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(
            field(&fields, "overview.numberOfUnits").value,
            FieldValue::Number(24.0)
        );
        assert_eq!(
            field(&fields, "overview.planningStatus").value,
            FieldValue::String("granted with conditions".into())
        );
    }

    #[test]
    fn malformed_strings_are_skipped_not_fatal() {
        let analysis = DocumentAnalysis::new()
            .with_key_amount("no colon here")
            .with_key_amount(": missing label")
            .with_key_amount("LTV: 65%");

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field_path, "financials.ltv");
    }

    #[test]
    fn dates_parse_or_degrade_to_string() {
        let analysis = DocumentAnalysis::new()
            .with_key_date("Completion Date: 25/12/2024")
            .with_key_date("Planning Decision: expected soon");

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(
            field(&fields, "timeline.completionDate").value,
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap())
        );
        assert_eq!(
            field(&fields, "timeline.planningDecision").value,
            FieldValue::String("expected soon".into())
        );
    }

    #[test]
    fn entities_take_first_only() {
        let analysis = DocumentAnalysis::new().with_entities(
            ExtractedEntities::new()
                .with_company("Acme Developments Ltd")
                .with_company("Second Co")
                .with_person("Jane Smith")
                .with_location("1 High Street, Leeds"),
        );

        let fields = extract_fields(&analysis, &project_options());

        let company = field(&fields, "company.name");
        assert_eq!(company.value, FieldValue::String("Acme Developments Ltd".into()));
        assert_eq!(company.scope, FieldScope::Client);
        assert_eq!(company.confidence, 0.7);
        // Remaining entities preserved in the source text only
        assert_eq!(company.source_text, "Acme Developments Ltd, Second Co");
        assert!(company.tags.contains(&"entity".to_string()));

        let contact = field(&fields, "contact.primaryName");
        assert_eq!(contact.confidence, 0.6);

        let site = field(&fields, "location.siteAddress");
        assert_eq!(site.scope, FieldScope::Project);
    }

    #[test]
    fn location_needs_project_context() {
        let analysis = DocumentAnalysis::new()
            .with_entities(ExtractedEntities::new().with_location("1 High Street"));

        let fields = extract_fields(&analysis, &ExtractOptions::new());
        assert!(fields.iter().all(|f| f.field_path != "location.siteAddress"));
    }

    #[test]
    fn narrative_fields_follow_project_context() {
        let summary = "A ground-up development of 24 apartments in central Leeds, \
                       fully funded to practical completion.";
        let analysis = DocumentAnalysis::new()
            .with_executive_summary(summary)
            .with_key_terms(["mezzanine", "personal guarantee"]);

        let fields = extract_fields(&analysis, &project_options());
        let exec = field(&fields, "insights.executive_summary");
        assert_eq!(exec.value_type(), "text");
        assert_eq!(exec.confidence, 0.9);
        assert_eq!(exec.scope, FieldScope::Project);

        let terms = field(&fields, "insights.key_terms");
        assert_eq!(
            terms.value,
            FieldValue::Array(vec!["mezzanine".into(), "personal guarantee".into()])
        );
        assert_eq!(terms.confidence, 0.8);

        // Without a project the same facts attach to the client
        let fields = extract_fields(&analysis, &ExtractOptions::new());
        assert_eq!(field(&fields, "insights.executive_summary").scope, FieldScope::Client);
    }

    #[test]
    fn short_summary_is_ignored() {
        let analysis = DocumentAnalysis::new().with_executive_summary("Too short.");
        let fields = extract_fields(&analysis, &project_options());
        assert!(fields.is_empty());
    }

    #[test]
    fn dedup_keeps_highest_confidence() {
        // Partial (0.80) and exact (0.95) matches landing on one path
        let analysis = DocumentAnalysis::new()
            .with_key_amount("Total Loan Amount Requested: £1m") // partial, 0.80
            .with_key_amount("Loan Amount: £2m"); // exact, 0.95

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields.len(), 1);
        let loan = &fields[0];
        assert_eq!(loan.field_path, "financials.loanAmount");
        assert_eq!(loan.confidence, 0.95);
        assert_eq!(loan.value, FieldValue::Currency(2_000_000.0));
    }

    #[test]
    fn dedup_ties_keep_first_seen() {
        let analysis = DocumentAnalysis::new()
            .with_key_amount("Loan Amount: £2m")
            .with_key_amount("Facility Amount: £3m"); // same path, same 0.95

        let fields = extract_fields(&analysis, &project_options());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].value, FieldValue::Currency(2_000_000.0));
        assert_eq!(fields[0].label, "Loan Amount");
    }

    #[test]
    fn empty_analysis_yields_no_fields() {
        assert!(extract_fields(&DocumentAnalysis::new(), &project_options()).is_empty());
    }

    #[test]
    fn source_text_is_always_the_original_string() {
        let analysis = DocumentAnalysis::new()
            .with_key_amount("Exit Fee: 1.5%")
            .with_key_date("Start Date: 01/06/2025");

        for f in extract_fields(&analysis, &project_options()) {
            assert!(["Exit Fee: 1.5%", "Start Date: 01/06/2025"].contains(&f.source_text.as_str()));
        }
    }

    proptest! {
        // The orchestrator never panics on arbitrary labeled strings,
        // and every emitted field keeps its original source text.
        #[test]
        fn labeled_strings_never_panic(label in "[a-zA-Z ]{0,30}", value in ".{0,30}") {
            let raw = format!("{label}: {value}");
            let analysis = DocumentAnalysis::new()
                .with_key_amount(raw.clone())
                .with_key_date(raw.clone());
            let fields = extract_fields(&analysis, &project_options());
            for f in fields {
                prop_assert_eq!(f.source_text.as_str(), raw.as_str());
            }
        }

        // At most one field per path, carrying the max confidence
        #[test]
        fn dedup_is_max_by_path(amounts in proptest::collection::vec("[a-z ]{1,12}: [0-9]{1,6}", 0..12)) {
            let mut analysis = DocumentAnalysis::new();
            for raw in &amounts {
                analysis = analysis.with_key_amount(raw.clone());
            }

            let mut undeduped = Vec::new();
            for raw in &amounts {
                if let Some(f) = amount_field(raw, &project_options()) {
                    undeduped.push(f);
                }
            }
            let fields = extract_fields(&analysis, &project_options());

            let mut seen = std::collections::HashSet::new();
            for f in &fields {
                prop_assert!(seen.insert(f.field_path.clone()));
                let max = undeduped
                    .iter()
                    .filter(|u| u.field_path == f.field_path)
                    .map(|u| u.confidence)
                    .fold(f32::MIN, f32::max);
                prop_assert_eq!(f.confidence, max);
            }
        }
    }
}
