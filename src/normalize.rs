//! Metadata normalization.
//!
//! Turns loosely typed article records into canonical, upload-safe form.
//! Normalization is best-effort: every field has a coercion rule, values the
//! rule cannot salvage are reset to absent, and nothing short of a transport
//! failure or a structurally unanticipated value aborts the pass. Dropped
//! and rewritten fields are collected into a [`ValidationReport`] so callers
//! can tell the user what changed under them.
//!
//! # Example
//!
//! ```
//! use figlib::{merge, ArticleMetadata, Normalizer, StaticClient};
//! use serde_json::{json, Map};
//!
//! let client = StaticClient::new().with_category(1, "Physics");
//! let normalizer = Normalizer::new(&client);
//!
//! let mut meta = ArticleMetadata::default();
//! let mut partial = Map::new();
//! partial.insert("title".into(), json!("Adatom manipulation"));
//! partial.insert("categories".into(), json!(["Physics", 9]));
//! merge(&mut meta, &partial);
//!
//! let report = normalizer.validate(&mut meta).unwrap();
//! assert_eq!(meta.categories, Some(json!([1])));
//! assert_eq!(report.dropped_fields(), vec!["categories"]);
//! ```

use crate::client::FigshareClient;
use crate::utils::{loose_str, strip_bracket_layer, strip_enclosing_brackets, truncate_chars};
use crate::{ArticleError, ArticleMetadata, DefinedType, Result};
use itertools::Itertools;
use regex::Regex;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

/// References must carry this prefix to survive validation. `https://` URLs
/// are rejected too, a known compatibility quirk that is kept deliberately.
static REFERENCE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^http://").unwrap());

/// Sentinel separator the service uses to pack the funding list into one
/// string. Internally funding is a plain list; the sentinel only appears in
/// wire payloads.
pub const FUNDING_SEPARATOR: &str = ":_:";

/// Fields that live on the record but are never part of an upload payload.
const UPLOAD_IGNORE: [&str; 9] = [
    "id",
    "size",
    "version",
    "created_date",
    "modified_date",
    "published_date",
    "up_to_date",
    "status",
    "group_id",
];

/// What validation did to a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueAction {
    /// The field (or some of its elements) was discarded.
    Dropped,
    /// The field was kept but rewritten into canonical shape.
    Corrected,
}

/// One field's validation outcome, when it was not left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub action: IssueAction,
    pub detail: String,
}

/// Everything a validation pass dropped or rewrote.
///
/// An empty report means the record was already canonical.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    issues: Vec<FieldIssue>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    /// Names of fields that lost data, in field order.
    pub fn dropped_fields(&self) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter(|i| i.action == IssueAction::Dropped)
            .map(|i| i.field)
            .collect()
    }

    /// Names of fields that were rewritten without data loss.
    pub fn corrected_fields(&self) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter(|i| i.action == IssueAction::Corrected)
            .map(|i| i.field)
            .collect()
    }

    fn dropped(&mut self, field: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(field, %detail, "validation dropped metadata");
        self.issues.push(FieldIssue {
            field,
            action: IssueAction::Dropped,
            detail,
        });
    }

    fn corrected(&mut self, field: &'static str, detail: impl Into<String>) {
        let detail = detail.into();
        debug!(field, %detail, "validation rewrote metadata");
        self.issues.push(FieldIssue {
            field,
            action: IssueAction::Corrected,
            detail,
        });
    }
}

/// Copies known fields from a partial update onto a record.
///
/// Keys that are not article metadata fields are ignored, as are values that
/// are JSON null or the literal string `"None"`; an absent form widget must
/// not clobber an existing value.
pub fn merge(base: &mut ArticleMetadata, partial: &Map<String, Value>) {
    for (key, value) in partial {
        if value.is_null() || value.as_str() == Some("None") {
            continue;
        }
        if let Some(slot) = base.slot_mut(key) {
            *slot = Some(value.clone());
        }
    }
}

/// Validates records against the remote service's allow-lists.
///
/// Holds a borrowed [`FigshareClient`] and refetches the category and
/// license allow-lists on every pass; results are never cached between
/// passes. See the [module docs](self) for the per-field rules.
pub struct Normalizer<'a, C: FigshareClient> {
    client: &'a C,
}

impl<'a, C: FigshareClient> Normalizer<'a, C> {
    #[must_use]
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Coerces every field of `meta` into canonical form.
    ///
    /// Malformed values are reset to absent rather than failing the pass.
    /// The returned report lists each dropped or rewritten field. Errors
    /// are limited to transport failures from the allow-list fetches and
    /// structurally unanticipated author entries.
    pub fn validate(&self, meta: &mut ArticleMetadata) -> Result<ValidationReport> {
        let mut report = ValidationReport::default();

        check_title(meta, &mut report);
        check_description(meta, &mut report);
        check_tags(meta, &mut report);
        check_references(meta, &mut report);

        if meta.categories.is_some() {
            let allowed = self.category_allowlist()?;
            check_categories(meta, &allowed, &mut report);
        }

        check_authors(meta, &mut report)?;
        check_defined_type(meta, &mut report);
        check_funding(meta, &mut report);

        // The license list is fetched even for records with no license set.
        let allowed = self.license_allowlist()?;
        if meta.license.is_some() {
            check_license(meta, &allowed, &mut report);
        }

        Ok(report)
    }

    /// Validates, then builds the payload for a create or update call.
    ///
    /// Only non-absent fields appear; bookkeeping and sidecar fields never
    /// do. Funding is joined with [`FUNDING_SEPARATOR`] and capped at 2000
    /// characters on the way out.
    pub fn upload_dict(&self, meta: &mut ArticleMetadata) -> Result<Map<String, Value>> {
        self.validate(meta)?;

        let mut payload = Map::new();
        for field in ArticleMetadata::FIELDS {
            if UPLOAD_IGNORE.contains(&field) {
                continue;
            }
            let Some(value) = meta.get(field) else {
                continue;
            };
            if field == "funding" {
                payload.insert(field.into(), Value::String(wire_funding(value)));
            } else {
                payload.insert(field.into(), value.clone());
            }
        }
        Ok(payload)
    }

    fn category_allowlist(&self) -> Result<BTreeMap<i64, String>> {
        Ok(self
            .client
            .categories()?
            .into_iter()
            .map(|c| (c.id, c.title))
            .collect())
    }

    /// License allow-list keyed by the string form of the numeric value.
    fn license_allowlist(&self) -> Result<BTreeMap<String, String>> {
        Ok(self
            .client
            .licenses()?
            .into_iter()
            .map(|l| (l.value.to_string(), l.name))
            .collect())
    }
}

/// The funding list as it goes on the wire.
fn wire_funding(value: &Value) -> String {
    let joined = match value {
        Value::Array(items) => items.iter().map(loose_str).join(FUNDING_SEPARATOR),
        other => loose_str(other),
    };
    truncate_chars(&joined, 2000)
}

fn check_title(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.title.clone() else { return };

    let mut title = match &raw {
        Value::String(s) => s.clone(),
        // A stringified list keeps one layer of brackets; shed it.
        other => strip_bracket_layer(&loose_str(other)),
    };
    if title.chars().count() < 3 {
        title.push_str("000");
    }
    title = truncate_chars(&title, 500);

    let canonical = Value::String(title);
    if canonical != raw {
        report.corrected("title", "coerced to a 3..=500 character string");
    }
    meta.title = Some(canonical);
}

fn check_description(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.description.clone() else {
        return;
    };

    let descr = match &raw {
        Value::String(s) => s.clone(),
        other => strip_enclosing_brackets(&loose_str(other)),
    };

    let canonical = Value::String(descr);
    if canonical != raw {
        report.corrected("description", "coerced to a string");
    }
    meta.description = Some(canonical);
}

fn check_tags(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.tags.clone() else { return };

    let canonical = match &raw {
        Value::Array(items) => {
            let coerced = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(strip_bracket_layer(s)),
                    other => Value::String(loose_str(other)),
                })
                .collect();
            Value::Array(coerced)
        }
        scalar => {
            let tag = strip_bracket_layer(&loose_str(scalar));
            Value::Array(vec![Value::String(tag)])
        }
    };

    if canonical != raw {
        report.corrected("tags", "coerced to a list of strings");
    }
    meta.tags = Some(canonical);
}

fn check_references(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.references.clone() else {
        return;
    };

    let canonical = match &raw {
        Value::Array(items) => {
            let coerced: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(s) => strip_bracket_layer(s),
                    other => loose_str(other),
                })
                .collect();
            let kept: Vec<Value> = coerced
                .iter()
                .filter(|url| REFERENCE_PREFIX.is_match(url))
                .map(|url| Value::String(url.clone()))
                .collect();

            let dropped = coerced.len() - kept.len();
            if dropped > 0 {
                report.dropped(
                    "references",
                    format!("{dropped} reference(s) without the http:// prefix"),
                );
            }
            Value::Array(kept)
        }
        // A scalar reference is wrapped as-is; the URL filter only runs on
        // the list path.
        scalar => {
            let url = strip_bracket_layer(&loose_str(scalar));
            Value::Array(vec![Value::String(url)])
        }
    };

    if canonical != raw && report.issues.last().map(|i| i.field) != Some("references") {
        report.corrected("references", "coerced to a list of URLs");
    }
    meta.references = Some(canonical);
}

fn resolve_category(item: &Value, allowed: &BTreeMap<i64, String>) -> Option<i64> {
    match item {
        Value::Object(map) => map
            .get("id")
            .and_then(Value::as_i64)
            .filter(|id| allowed.contains_key(id)),
        Value::String(s) => {
            if let Ok(id) = s.parse::<i64>() {
                allowed.contains_key(&id).then_some(id)
            } else {
                allowed
                    .iter()
                    .find(|(_, title)| title.as_str() == s)
                    .map(|(id, _)| *id)
            }
        }
        Value::Number(n) => n.as_i64().filter(|id| allowed.contains_key(id)),
        _ => None,
    }
}

fn check_categories(
    meta: &mut ArticleMetadata,
    allowed: &BTreeMap<i64, String>,
    report: &mut ValidationReport,
) {
    let Some(raw) = meta.categories.clone() else {
        return;
    };

    let items: Vec<Value> = match &raw {
        Value::Array(items) => items.clone(),
        scalar => vec![scalar.clone()],
    };

    let mut kept = Vec::new();
    let mut dropped = 0usize;
    for item in &items {
        match resolve_category(item, allowed) {
            Some(id) => kept.push(Value::from(id)),
            None => dropped += 1,
        }
    }

    let canonical = Value::Array(kept);
    if dropped > 0 {
        report.dropped(
            "categories",
            format!("{dropped} entr(y/ies) not in the category allow-list"),
        );
    } else if canonical != raw {
        report.corrected("categories", "resolved to allow-list IDs");
    }
    meta.categories = Some(canonical);
}

fn author_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn check_authors(meta: &mut ArticleMetadata, report: &mut ValidationReport) -> Result<()> {
    let Some(raw) = meta.authors.clone() else {
        return Ok(());
    };

    let canonical: Option<Value> = match &raw {
        Value::Array(items) if !items.is_empty() => {
            let mut kept = Vec::new();
            let mut dropped = 0usize;
            for item in items {
                match item {
                    Value::Object(map) => {
                        if let Some(id_value) = map.get("id") {
                            match author_id(id_value) {
                                Some(id) => kept.push(json!({ "id": id })),
                                None => dropped += 1,
                            }
                        } else if let Some(Value::String(name)) = map.get("name") {
                            kept.push(json!({ "name": name }));
                        } else {
                            dropped += 1;
                        }
                    }
                    Value::String(s) => match s.parse::<i64>() {
                        Ok(id) => kept.push(json!({ "id": id })),
                        Err(_) => kept.push(json!({ "name": s })),
                    },
                    Value::Number(n) => match n.as_i64() {
                        Some(id) => kept.push(json!({ "id": id })),
                        None => dropped += 1,
                    },
                    other => {
                        return Err(ArticleError::InvalidFieldValue {
                            field: "authors".into(),
                            message: format!("unanticipated author entry: {other}"),
                        });
                    }
                }
            }
            if dropped > 0 {
                report.dropped("authors", format!("{dropped} unresolvable author entr(y/ies)"));
            }
            Some(Value::Array(kept))
        }
        // An empty author list carries no information; reset to absent.
        Value::Array(_) => None,
        Value::String(s) => Some(json!([{ "name": s }])),
        Value::Number(n) => n.as_i64().map(|id| json!([{ "id": id }])),
        other => {
            return Err(ArticleError::InvalidFieldValue {
                field: "authors".into(),
                message: format!("unanticipated authors value: {other}"),
            });
        }
    };

    if canonical.is_none() {
        report.dropped("authors", "no resolvable author entries");
    } else if canonical != Some(raw) && report.issues.last().map(|i| i.field) != Some("authors") {
        report.corrected("authors", "normalized to id/name references");
    }
    meta.authors = canonical;
    Ok(())
}

fn check_defined_type(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.defined_type.clone() else {
        return;
    };

    let resolved: Option<DefinedType> = match &raw {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_i64().and_then(DefinedType::from_index),
        _ => None,
    };

    let canonical = resolved.map(|t| Value::String(t.as_str().into()));
    match &canonical {
        None => report.dropped("defined_type", "not one of the ten defined types"),
        Some(value) if *value != raw => {
            report.corrected("defined_type", "resolved from type index");
        }
        Some(_) => {}
    }
    meta.defined_type = canonical;
}

fn check_funding(meta: &mut ArticleMetadata, report: &mut ValidationReport) {
    let Some(raw) = meta.funding.clone() else {
        return;
    };

    let parts: Vec<Value> = match &raw {
        Value::Array(items) => items
            .iter()
            .map(|item| Value::String(loose_str(item)))
            .collect(),
        scalar => loose_str(scalar)
            .split(FUNDING_SEPARATOR)
            .filter(|part| !part.is_empty())
            .map(|part| Value::String(part.to_string()))
            .collect(),
    };

    let canonical = Value::Array(parts);
    if canonical != raw {
        report.corrected("funding", "coerced to a list of grant strings");
    }
    meta.funding = Some(canonical);
}

fn check_license(
    meta: &mut ArticleMetadata,
    allowed: &BTreeMap<String, String>,
    report: &mut ValidationReport,
) {
    let Some(raw) = meta.license.clone() else {
        return;
    };

    let canonical: Option<String> = match &raw {
        Value::Object(map) => match map.get("value") {
            Some(Value::Number(n)) => n
                .as_i64()
                .map(|v| v.to_string())
                .filter(|key| allowed.contains_key(key)),
            Some(Value::String(s)) => allowed.contains_key(s).then(|| s.clone()),
            _ => None,
        },
        Value::String(s) => {
            if allowed.contains_key(s) {
                Some(s.clone())
            } else {
                // Not a license value; try the display names.
                allowed
                    .iter()
                    .find(|(_, name)| name.as_str() == s)
                    .map(|(value, _)| value.clone())
            }
        }
        Value::Number(n) => n
            .as_i64()
            .map(|v| v.to_string())
            .filter(|key| allowed.contains_key(key)),
        _ => None,
    };

    match &canonical {
        None => report.dropped("license", "not in the license allow-list"),
        Some(value) if Value::String(value.clone()) != raw => {
            report.corrected("license", "resolved to a license value");
        }
        Some(_) => {}
    }
    meta.license = canonical.map(Value::String);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Category, License, StaticClient};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::path::Path;

    fn test_client() -> StaticClient {
        StaticClient::new()
            .with_category(1, "Physics")
            .with_category(2, "Chemistry")
            .with_license(1, "CC BY")
            .with_license(2, "MIT")
    }

    fn messy_record() -> ArticleMetadata {
        let mut meta = ArticleMetadata::default();
        meta.title = Some(json!(["A title inside a list"]));
        meta.description = Some(json!(42));
        meta.tags = Some(json!("solo-tag"));
        meta.references = Some(json!(["http://doi.org/10.1/x", "https://doi.org/10.1/y"]));
        meta.categories = Some(json!(["Physics", "2", 3]));
        meta.authors = Some(json!([42, "3.14notanumber", {"id": "7"}]));
        meta.defined_type = Some(json!(3));
        meta.funding = Some(json!("EPSRC:_:ERC:_:"));
        meta.license = Some(json!("MIT"));
        meta.status = Some(json!("draft"));
        meta
    }

    #[test]
    fn test_validate_is_idempotent() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = messy_record();
        normalizer.validate(&mut meta).unwrap();
        let canonical = meta.clone();

        let report = normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta, canonical);
        assert!(report.is_clean(), "second pass reported {:?}", report.issues());
    }

    #[test]
    fn test_merge_skips_null_and_none_literal() {
        let mut base = ArticleMetadata::default();
        base.title = Some(json!("Kept"));
        base.funding = Some(json!(["EPSRC"]));

        let mut partial = Map::new();
        partial.insert("title".into(), Value::Null);
        partial.insert("funding".into(), json!("None"));
        partial.insert("description".into(), json!("added"));
        partial.insert("unknown_key".into(), json!("ignored"));
        merge(&mut base, &partial);

        assert_eq!(base.title, Some(json!("Kept")));
        assert_eq!(base.funding, Some(json!(["EPSRC"])));
        assert_eq!(base.description, Some(json!("added")));
    }

    #[test]
    fn test_upload_dict_omits_absent_and_bookkeeping_fields() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = messy_record();
        meta.id = Some(json!(901));
        meta.size = Some(json!(123456));
        meta.up_to_date = Some(json!(false));
        let payload = normalizer.upload_dict(&mut meta).unwrap();

        for value in payload.values() {
            assert!(!value.is_null());
        }
        for field in UPLOAD_IGNORE {
            assert!(!payload.contains_key(field), "{field} must not upload");
        }
        assert!(payload.contains_key("title"));
        assert!(payload.contains_key("categories"));
    }

    #[test]
    fn test_category_resolution_round_trip() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.categories = Some(json!(["Physics", "2", 3]));
        let report = normalizer.validate(&mut meta).unwrap();

        assert_eq!(meta.categories, Some(json!([1, 2])));
        assert_eq!(report.dropped_fields(), vec!["categories"]);
    }

    #[rstest]
    #[case(json!({"id": 1}), Some(1))]
    #[case(json!({"id": "2"}), None)] // string IDs in objects do not resolve
    #[case(json!("Chemistry"), Some(2))]
    #[case(json!("42"), None)]
    #[case(json!(2), Some(2))]
    #[case(json!(true), None)]
    fn test_resolve_category(#[case] input: Value, #[case] expected: Option<i64>) {
        let allowed: BTreeMap<i64, String> =
            [(1, "Physics".to_string()), (2, "Chemistry".to_string())].into();
        assert_eq!(resolve_category(&input, &allowed), expected);
    }

    #[test]
    fn test_author_shape_normalization() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.authors = Some(json!([42, "3.14notanumber", {"id": "7"}]));
        normalizer.validate(&mut meta).unwrap();

        assert_eq!(
            meta.authors,
            Some(json!([
                {"id": 42},
                {"name": "3.14notanumber"},
                {"id": 7}
            ]))
        );
    }

    #[test]
    fn test_author_scalars_and_empty_list() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.authors = Some(json!("Solo Author"));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.authors, Some(json!([{"name": "Solo Author"}])));

        meta.authors = Some(json!(314));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.authors, Some(json!([{"id": 314}])));

        meta.authors = Some(json!([]));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.authors, None);
    }

    #[test]
    fn test_boolean_author_entry_is_an_error() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.authors = Some(json!([true]));
        let err = normalizer.validate(&mut meta).unwrap_err();
        assert!(matches!(
            err,
            ArticleError::InvalidFieldValue { ref field, .. } if field == "authors"
        ));
    }

    #[test]
    fn test_title_length_clamp_and_pad() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.title = Some(json!("x".repeat(600)));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.title_str().map(|t| t.chars().count()), Some(500));

        // Current behavior: short titles are padded with literal digits.
        meta.title = Some(json!("ab"));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.title_str(), Some("ab000"));
    }

    #[test]
    fn test_license_resolution() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.license = Some(json!("MIT"));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.license, Some(json!("2")));

        meta.license = Some(json!("GPL"));
        let report = normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.license, None);
        assert_eq!(report.dropped_fields(), vec!["license"]);

        meta.license = Some(json!(1));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.license, Some(json!("1")));

        meta.license = Some(json!({"value": 2}));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.license, Some(json!("2")));
    }

    #[test]
    fn test_reference_filter_applies_to_lists_only() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.references = Some(json!(["http://a", "https://b", "ftp://c"]));
        let report = normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.references, Some(json!(["http://a"])));
        assert_eq!(report.dropped_fields(), vec!["references"]);

        // The scalar path wraps without filtering.
        meta.references = Some(json!("https://kept-anyway"));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.references, Some(json!(["https://kept-anyway"])));
    }

    #[rstest]
    #[case(json!("dataset"), Some(json!("dataset")))]
    #[case(json!(1), Some(json!("figure")))]
    #[case(json!(10), Some(json!("metadata")))]
    #[case(json!(11), None)]
    #[case(json!("journal"), None)]
    #[case(json!(2.5), None)]
    fn test_defined_type_resolution(#[case] input: Value, #[case] expected: Option<Value>) {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.defined_type = Some(input);
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.defined_type, expected);
    }

    #[test]
    fn test_funding_sentinel_round_trip() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.funding = Some(json!("EPSRC:_:ERC:_:"));
        normalizer.validate(&mut meta).unwrap();
        assert_eq!(meta.funding, Some(json!(["EPSRC", "ERC"])));

        let payload = normalizer.upload_dict(&mut meta).unwrap();
        assert_eq!(payload["funding"], json!("EPSRC:_:ERC"));
    }

    #[test]
    fn test_wire_funding_caps_at_2000_chars() {
        let grants: Vec<Value> = (0..30).map(|i| json!(format!("{i}-{}", "g".repeat(100)))).collect();
        let wire = wire_funding(&Value::Array(grants));
        assert_eq!(wire.chars().count(), 2000);
    }

    #[test]
    fn test_transport_errors_propagate() {
        struct DownClient;

        impl FigshareClient for DownClient {
            fn categories(&self) -> Result<Vec<Category>> {
                Err(ArticleError::Transport("503 from categories".into()))
            }
            fn licenses(&self) -> Result<Vec<License>> {
                Err(ArticleError::Transport("503 from licenses".into()))
            }
            fn get_article(&self, _: i64) -> Result<Map<String, Value>> {
                unreachable!()
            }
            fn public_modified_date(&self, _: i64) -> Result<String> {
                unreachable!()
            }
            fn create_article(&self, _: i64, _: &Map<String, Value>) -> Result<i64> {
                unreachable!()
            }
            fn update_article(&self, _: i64, _: &Map<String, Value>) -> Result<()> {
                unreachable!()
            }
            fn upload_file(&self, _: i64, _: &Path) -> Result<()> {
                unreachable!()
            }
        }

        let normalizer = Normalizer::new(&DownClient);
        let mut meta = ArticleMetadata::default();
        meta.categories = Some(json!([1]));
        let err = normalizer.validate(&mut meta).unwrap_err();
        assert!(matches!(err, ArticleError::Transport(msg) if msg.contains("categories")));

        // Even an empty record touches the license endpoint.
        let mut empty = ArticleMetadata::default();
        let err = normalizer.validate(&mut empty).unwrap_err();
        assert!(matches!(err, ArticleError::Transport(msg) if msg.contains("licenses")));
    }

    #[test]
    fn test_report_distinguishes_corrections_from_drops() {
        let client = test_client();
        let normalizer = Normalizer::new(&client);

        let mut meta = ArticleMetadata::default();
        meta.title = Some(json!(12));
        meta.tags = Some(json!("one-tag"));
        meta.license = Some(json!("GPL"));
        let report = normalizer.validate(&mut meta).unwrap();

        assert_eq!(report.corrected_fields(), vec!["title", "tags"]);
        assert_eq!(report.dropped_fields(), vec!["license"]);
        assert!(!report.is_clean());
    }
}
