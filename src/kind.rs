//! Article kinds and their custom-field schemas.
//!
//! Files from known scanning-tunneling-microscopy formats carry extra
//! instrument metadata next to the base Figshare fields. The kind is chosen
//! once, from the file extension, when a record is created; everything else
//! (custom-field allow-list, search-index schema, upload nesting) follows
//! from it. Adding a format means adding a variant and its two
//! tables here; no shared logic changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a custom field is indexed for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexFieldType {
    /// Exact-match identifier.
    Id,
    /// Tokenized, stemmed text.
    Text,
    /// Space-separated keyword terms.
    Keyword,
    /// Floating-point numeric.
    Numeric,
    /// RFC 3339 timestamp.
    Datetime,
    Boolean,
    /// Substring-matching n-grams.
    Ngram,
}

/// One `(field, type, stored)` row of an index schema.
pub type SchemaField = (&'static str, IndexFieldType, bool);

use IndexFieldType::*;

const TOPO_SCHEMA: &[SchemaField] = &[
    ("type", Id, true),
    ("vgap", Numeric, true),
    ("current", Numeric, true),
    ("xres", Numeric, true),
    ("yres", Numeric, true),
    ("xinc", Numeric, true),
    ("yinc", Numeric, true),
    ("xreal", Numeric, true),
    ("yreal", Numeric, true),
    ("unit", Id, true),
    ("unitxy", Id, true),
    ("date", Text, true),
    ("direction", Keyword, true),
    ("sample", Text, true),
    ("users", Keyword, true),
    ("substrate", Text, true),
    ("adsorbate", Text, true),
    ("prep", Text, true),
    ("notebook", Keyword, true),
    ("notes", Text, true),
];

const SPEC_SCHEMA: &[SchemaField] = &[
    ("type", Id, true),
    ("vgap", Numeric, true),
    ("current", Numeric, true),
    ("vres", Numeric, true),
    ("vinc", Numeric, true),
    ("vreal", Numeric, true),
    ("vstart", Numeric, true),
    ("unitv", Id, true),
    ("unit", Id, true),
    ("date", Text, true),
    ("direction", Keyword, true),
    ("sample", Text, true),
    ("users", Keyword, true),
    ("substrate", Text, true),
    ("adsorbate", Text, true),
    ("prep", Text, true),
    ("notebook", Keyword, true),
    ("notes", Text, true),
    ("vmod", Numeric, true),
    ("vsen", Numeric, true),
    ("freq", Numeric, true),
    ("tmeas", Numeric, true),
    ("phase", Numeric, true),
    ("harm", Numeric, true),
];

/// The base schema shared by every article, regardless of kind.
pub const BASE_SCHEMA: &[SchemaField] = &[
    ("id", Id, true),
    ("title", Text, true),
    ("description", Text, true),
    ("tags", Keyword, true),
    ("status", Id, true),
    ("location", Id, true),
];

/// The family an article record belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    /// A plain Figshare article with no instrument metadata.
    #[default]
    Figshare,
    /// An STM topography scan (Omicron flat or Zyvex file).
    StmTopography,
    /// An STM spectroscopy curve (I(V) and auxiliary-channel flat files).
    StmSpectroscopy,
}

impl ArticleKind {
    /// Chooses the kind from a file's extension.
    ///
    /// The instrument extensions contain dots and parentheses, so the match
    /// runs on the file-name suffix rather than [`Path::extension`].
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if name.ends_with(".Z_flat") || name.ends_with(".zad") {
            ArticleKind::StmTopography
        } else if name.ends_with(".I(V)_flat")
            || name.ends_with(".Aux1(V)_flat")
            || name.ends_with(".Aux2(V)_flat")
        {
            ArticleKind::StmSpectroscopy
        } else {
            ArticleKind::Figshare
        }
    }

    /// The short type tag used in tree views and index documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleKind::Figshare => "article",
            ArticleKind::StmTopography => "stm_topo",
            ArticleKind::StmSpectroscopy => "stm_spec",
        }
    }

    /// The kind's custom-field index schema (empty for plain articles).
    pub fn index_schema(&self) -> &'static [SchemaField] {
        match self {
            ArticleKind::Figshare => &[],
            ArticleKind::StmTopography => TOPO_SCHEMA,
            ArticleKind::StmSpectroscopy => SPEC_SCHEMA,
        }
    }

    /// The allow-list of custom-field names for this kind.
    pub fn custom_field_names(&self) -> impl Iterator<Item = &'static str> {
        self.index_schema().iter().map(|(name, _, _)| *name)
    }

    pub fn has_custom_fields(&self) -> bool {
        !self.index_schema().is_empty()
    }

    /// The full search schema: base article fields plus the kind's own.
    pub fn full_schema(&self) -> Vec<SchemaField> {
        let mut fields = BASE_SCHEMA.to_vec();
        fields.extend_from_slice(self.index_schema());
        fields
    }
}

impl std::fmt::Display for ArticleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("corral.Z_flat", ArticleKind::StmTopography)]
    #[case("tip.zad", ArticleKind::StmTopography)]
    #[case("curve.I(V)_flat", ArticleKind::StmSpectroscopy)]
    #[case("aux.Aux1(V)_flat", ArticleKind::StmSpectroscopy)]
    #[case("aux.Aux2(V)_flat", ArticleKind::StmSpectroscopy)]
    #[case("notes.txt", ArticleKind::Figshare)]
    #[case("no_extension", ArticleKind::Figshare)]
    fn test_kind_from_path(#[case] name: &str, #[case] expected: ArticleKind) {
        assert_eq!(ArticleKind::from_path(format!("/data/{name}")), expected);
    }

    #[test]
    fn test_plain_articles_have_no_custom_fields() {
        assert!(!ArticleKind::Figshare.has_custom_fields());
        assert_eq!(ArticleKind::Figshare.custom_field_names().count(), 0);
    }

    #[test]
    fn test_topography_schema_fields() {
        let names: Vec<_> = ArticleKind::StmTopography.custom_field_names().collect();
        assert_eq!(names.len(), 20);
        assert!(names.contains(&"vgap"));
        assert!(names.contains(&"notebook"));

        let (_, vgap_type, stored) = TOPO_SCHEMA[1];
        assert_eq!(vgap_type, IndexFieldType::Numeric);
        assert!(stored);
    }

    #[test]
    fn test_full_schema_prepends_base_fields() {
        let schema = ArticleKind::StmSpectroscopy.full_schema();
        assert_eq!(schema[0].0, "id");
        assert_eq!(schema.len(), BASE_SCHEMA.len() + SPEC_SCHEMA.len());
    }
}
