//! Label canonicalization - free-text labels to canonical field paths.
//!
//! Maps a label like `"Gross Development Value"` onto a stable
//! dot-delimited path (`financials.gdv`), a scope hint, and a
//! confidence score. Unknown labels fall back to `extracted.<slug>`.
//!
//! The mapping table is an ordered slice, not a map: partial matching
//! scans it in declaration order and the first match wins, so the
//! order below is part of the contract.

use crate::types::field::FieldScope;

/// Scope hint carried by a table entry, resolved against document
/// context by [`resolve_scope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingScope {
    /// Always a client-level fact
    Client,
    /// Project-level when a project context exists, else client
    Project,
    /// Undetermined, resolved from the document category
    Context,
}

/// One entry of the label mapping table.
#[derive(Debug, Clone, Copy)]
pub struct LabelMapping {
    /// Case-folded label key matched against incoming labels
    pub key: &'static str,
    /// Canonical dot-delimited field path
    pub path: &'static str,
    /// Scope hint
    pub scope: MappingScope,
}

const fn project(key: &'static str, path: &'static str) -> LabelMapping {
    LabelMapping {
        key,
        path,
        scope: MappingScope::Project,
    }
}

const fn client(key: &'static str, path: &'static str) -> LabelMapping {
    LabelMapping {
        key,
        path,
        scope: MappingScope::Client,
    }
}

/// Known label mappings, grouped by domain. Declaration order is
/// significant for partial matching.
pub static LABEL_MAPPINGS: &[LabelMapping] = &[
    // Financials
    project("loan amount", "financials.loanAmount"),
    project("facility amount", "financials.loanAmount"),
    project("gross loan", "financials.grossLoan"),
    project("net loan", "financials.netLoan"),
    project("day one loan", "financials.dayOneLoan"),
    project("ltv", "financials.ltv"),
    project("loan to value", "financials.ltv"),
    project("ltc", "financials.ltc"),
    project("loan to cost", "financials.ltc"),
    project("ltgdv", "financials.ltgdv"),
    project("gdv", "financials.gdv"),
    project("gross development value", "financials.gdv"),
    project("purchase price", "financials.purchasePrice"),
    project("land cost", "financials.landCost"),
    project("build cost", "financials.buildCost"),
    project("construction cost", "financials.buildCost"),
    project("total development cost", "financials.totalDevelopmentCost"),
    project("tdc", "financials.totalDevelopmentCost"),
    project("profit on cost", "financials.profitOnCost"),
    project("profit", "financials.profit"),
    project("interest rate", "financials.interestRate"),
    project("arrangement fee", "financials.arrangementFee"),
    project("exit fee", "financials.exitFee"),
    project("equity", "financials.equity"),
    project("deposit", "financials.deposit"),
    project("valuation", "financials.valuation"),
    project("market value", "financials.marketValue"),
    project("rental income", "financials.rentalIncome"),
    project("yield", "financials.yield"),
    // Timeline
    project("start date", "timeline.startDate"),
    project("start on site", "timeline.startDate"),
    project("completion date", "timeline.completionDate"),
    project("practical completion", "timeline.practicalCompletion"),
    project("exchange date", "timeline.exchangeDate"),
    project("loan term", "timeline.loanTerm"),
    project("term", "timeline.loanTerm"),
    project("expiry date", "timeline.expiryDate"),
    project("valuation date", "timeline.valuationDate"),
    project("planning decision", "timeline.planningDecision"),
    // Location
    project("site address", "location.siteAddress"),
    project("address", "location.siteAddress"),
    project("postcode", "location.postcode"),
    project("city", "location.city"),
    project("region", "location.region"),
    project("local authority", "location.localAuthority"),
    // Overview
    project("project name", "overview.projectName"),
    project("development type", "overview.developmentType"),
    project("number of units", "overview.numberOfUnits"),
    project("units", "overview.numberOfUnits"),
    project("square footage", "overview.squareFootage"),
    project("planning status", "overview.planningStatus"),
    project("planning reference", "overview.planningReference"),
    // Company
    client("company name", "company.name"),
    client("company number", "company.registrationNumber"),
    client("registered address", "company.registeredAddress"),
    client("incorporation date", "company.incorporationDate"),
    client("sic code", "company.sicCode"),
    client("vat number", "company.vatNumber"),
    // Contact
    client("contact name", "contact.primaryName"),
    client("email", "contact.email"),
    client("phone", "contact.phone"),
    client("date of birth", "contact.dateOfBirth"),
    client("nationality", "contact.nationality"),
    client("national insurance number", "contact.nationalInsuranceNumber"),
    // Client financials
    client("net worth", "clientFinancials.netWorth"),
    client("annual income", "clientFinancials.annualIncome"),
    client("liquid assets", "clientFinancials.liquidAssets"),
    client("assets", "clientFinancials.assets"),
    client("liabilities", "clientFinancials.liabilities"),
    client("credit score", "clientFinancials.creditScore"),
    client("track record", "clientFinancials.trackRecord"),
];

/// Document categories whose unmapped facts belong to the client.
/// Matched case-insensitively as substrings of the document category.
pub static CLIENT_LEVEL_CATEGORIES: &[&str] = &[
    "kyc",
    "background",
    "corporate",
    "identity",
    "financial statement",
    "bank statement",
    "tax",
    "cv",
    "track record",
];

/// Result of canonicalizing a label.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalLabel {
    /// Canonical path, or `extracted.<slug>` when unmapped
    pub path: String,
    /// Whether the path matched a known schema field
    pub is_canonical: bool,
    /// Scope hint, for [`resolve_scope`]
    pub scope: MappingScope,
    /// Exact match 0.95, partial 0.80, fallback 0.50
    pub confidence: f32,
}

/// Canonicalize a free-text label.
///
/// Exact lookup first, then the first bidirectional substring match in
/// table order, then the slug fallback.
pub fn canonicalize_label(label: &str) -> CanonicalLabel {
    let folded = label.trim().to_lowercase();

    for mapping in LABEL_MAPPINGS {
        if folded == mapping.key {
            return CanonicalLabel {
                path: mapping.path.to_string(),
                is_canonical: true,
                scope: mapping.scope,
                confidence: 0.95,
            };
        }
    }

    for mapping in LABEL_MAPPINGS {
        if folded.contains(mapping.key) || mapping.key.contains(folded.as_str()) {
            return CanonicalLabel {
                path: mapping.path.to_string(),
                is_canonical: true,
                scope: mapping.scope,
                confidence: 0.80,
            };
        }
    }

    CanonicalLabel {
        path: format!("extracted.{}", slugify(&folded)),
        is_canonical: false,
        scope: MappingScope::Context,
        confidence: 0.50,
    }
}

/// Resolve a scope hint against the document context.
pub fn resolve_scope(
    scope: MappingScope,
    has_project_context: bool,
    document_category: Option<&str>,
) -> FieldScope {
    match scope {
        MappingScope::Client => FieldScope::Client,
        MappingScope::Project => {
            if has_project_context {
                FieldScope::Project
            } else {
                FieldScope::Client
            }
        }
        MappingScope::Context => {
            let folded = document_category.map(str::to_lowercase).unwrap_or_default();
            let client_level = CLIENT_LEVEL_CATEGORIES
                .iter()
                .any(|keyword| folded.contains(keyword));
            if client_level {
                FieldScope::Client
            } else if has_project_context {
                FieldScope::Project
            } else {
                FieldScope::Client
            }
        }
    }
}

/// Slug for unmapped labels: lowercased, non-alphanumeric-non-space
/// stripped, whitespace collapsed to underscores, truncated to 50.
fn slugify(folded: &str) -> String {
    let kept: String = folded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();

    let mut slug = kept.split_whitespace().collect::<Vec<_>>().join("_");
    slug.truncate(50);
    slug
}
