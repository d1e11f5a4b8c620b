//! Bringing proposed content into the canonical shape the pipeline works on.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::config::*;
use crate::content::{Cell, DraftContent, DraftRow, Language};

/// Turns content as an author or an import wrote it into canonical content.
pub trait Standardizer {
    fn standardize(&self, content: DraftContent) -> ContentResult<DraftContent>;
}

/// Leaves the content untouched, for content that is already canonical.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStandardizer;

impl Standardizer for NoopStandardizer {
    fn standardize(&self, content: DraftContent) -> ContentResult<DraftContent> {
        Ok(content)
    }
}

/// Resolves the common spellings of XLSForm columns and types, and gathers
/// `label::English`-style columns into localized columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct AliasStandardizer;

/// Columns that hold one value per translation.
pub const TRANSLATABLE_COLUMNS: [&str; 10] = [
    "label",
    "hint",
    "guidance_hint",
    "constraint_message",
    "required_message",
    "media::image",
    "media::audio",
    "media::video",
    "kobo--rank-constraint-message",
    "jr:constraintMsg",
];

const SURVEY_COLUMN_ALIASES: [(&str, &str); 8] = [
    ("image", "media::image"),
    ("audio", "media::audio"),
    ("video", "media::video"),
    ("relevance", "relevant"),
    ("constraint message", "constraint_message"),
    ("required message", "required_message"),
    ("read_only", "readonly"),
    ("calculate", "calculation"),
];

const CHOICE_COLUMN_ALIASES: [(&str, &str); 5] = [
    ("list name", "list_name"),
    ("value", "name"),
    ("image", "media::image"),
    ("audio", "media::audio"),
    ("video", "media::video"),
];

const SEPARATOR: &str = "::";

impl Standardizer for AliasStandardizer {
    fn standardize(&self, mut content: DraftContent) -> ContentResult<DraftContent> {
        let declared = content.translations.len();
        let translations = gather_translations(&content);
        if translations != content.translations {
            info!(
                "standardize: translations {:?} -> {:?}",
                content.translations, translations
            );
        }
        content.survey = content
            .survey
            .into_iter()
            .map(|r| {
                let r = rename_columns(r, &SURVEY_COLUMN_ALIASES);
                let r = resolve_type(r);
                localize(r, &translations, declared)
            })
            .collect();
        content.choices = content
            .choices
            .into_iter()
            .map(|r| {
                let r = rename_columns(r, &CHOICE_COLUMN_ALIASES);
                localize(r, &translations, declared)
            })
            .collect();
        content.translations = translations;
        Ok(content)
    }
}

fn is_translatable(column: &str) -> bool {
    TRANSLATABLE_COLUMNS.contains(&column)
}

// `label::English (en)` -> (`label`, `English (en)`).
fn split_translated_column(column: &str) -> Option<(&str, &str)> {
    let (base, language) = column.rsplit_once(SEPARATOR)?;
    if is_translatable(base) && !language.trim().is_empty() {
        Some((base, language.trim()))
    } else {
        None
    }
}

// The declared translations, followed by the ones found in column names.
// Plain translatable columns stand for the unnamed translation.
fn gather_translations(content: &DraftContent) -> Vec<Language> {
    let mut translations = content.translations.clone();
    let mut unnamed = false;
    for row in content.rows() {
        for (column, cell) in row.cells() {
            if let Some((_, language)) = split_translated_column(column) {
                let language = Some(language.to_string());
                if !translations.contains(&language) {
                    translations.push(language);
                }
            } else if is_translatable(column) && !matches!(cell, Cell::Localized(_)) {
                unnamed = true;
            }
        }
    }
    let needs_unnamed = translations.is_empty() || (unnamed && content.translations.is_empty());
    if needs_unnamed && !translations.contains(&None) {
        translations.insert(0, None);
    }
    translations
}

fn rename_columns(mut row: DraftRow, aliases: &[(&str, &str)]) -> DraftRow {
    for (alias, canonical) in aliases {
        if row.contains(canonical) {
            continue;
        }
        if let Some(cell) = row.remove(alias) {
            row.set(*canonical, cell);
        }
    }
    row
}

// `select one colors` -> `select_one` + `select_from_list_name: colors`,
// `begin group` -> `begin_group`...
fn resolve_type(mut row: DraftRow) -> DraftRow {
    let raw = match row.text("type") {
        Some(t) => t.to_string(),
        None => return row,
    };
    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let (row_type, list_name) = match tokens.as_slice() {
        ["select_one", list] | ["select", "one", list] | ["select1", list] => {
            ("select_one".to_string(), Some(list.to_string()))
        }
        ["select_multiple", list]
        | ["select", "multiple", list]
        | ["select", "all", "that", "apply", list] => {
            ("select_multiple".to_string(), Some(list.to_string()))
        }
        ["begin", structure] => (format!("begin_{}", structure), None),
        ["end", structure] => (format!("end_{}", structure), None),
        _ => (raw.trim().to_string(), None),
    };
    let row_type = match row_type.as_str() {
        "begin_matrix" => "begin_kobomatrix".to_string(),
        "end_matrix" => "end_kobomatrix".to_string(),
        _ => row_type,
    };
    if row_type != raw {
        debug!("resolve_type: {:?} -> {:?}", raw, row_type);
    }
    row.set("type", row_type);
    if let Some(list) = list_name {
        if !row.contains("select_from_list_name") {
            row.set("select_from_list_name", list);
        }
    }
    row
}

// Every translatable column ends up localized, one value per translation.
fn localize(mut row: DraftRow, translations: &[Language], declared: usize) -> DraftRow {
    let unnamed = translations.iter().position(Option::is_none).unwrap_or(0);
    let cells = row.cells_mut();
    let mut split: BTreeMap<String, Vec<(usize, String)>> = BTreeMap::new();

    let keys: Vec<String> = cells.keys().cloned().collect();
    for key in keys {
        if let Some((base, language)) = split_translated_column(&key) {
            let index = translations
                .iter()
                .position(|l| l.as_deref() == Some(language));
            if let (Some(index), Some(cell)) = (index, cells.remove(&key)) {
                if let Some(text) = cell.scalar_string() {
                    split.entry(base.to_string()).or_default().push((index, text));
                }
            }
        }
    }

    for (column, cell) in cells.iter_mut() {
        if !is_translatable(column) {
            continue;
        }
        match cell {
            Cell::Localized(values) => {
                // Only pad for the translations discovered in column names.
                if values.len() == declared && declared < translations.len() {
                    values.resize(translations.len(), None);
                }
            }
            scalar => {
                let mut values = vec![None; translations.len()];
                if let Some(slot) = values.get_mut(unnamed) {
                    *slot = scalar.scalar_string();
                }
                *scalar = Cell::Localized(values);
            }
        }
    }

    for (column, entries) in split {
        let cell = cells
            .entry(column)
            .or_insert_with(|| Cell::Localized(vec![None; translations.len()]));
        if let Cell::Localized(values) = cell {
            for (index, text) in entries {
                if let Some(slot) = values.get_mut(index) {
                    *slot = Some(text);
                }
            }
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Kuid;
    use serde_json::json;

    fn standardize(js: serde_json::Value) -> DraftContent {
        let content: DraftContent = serde_json::from_value(js).unwrap();
        AliasStandardizer.standardize(content).unwrap()
    }

    fn localized(vs: &[Option<&str>]) -> Cell {
        Cell::Localized(vs.iter().map(|v| v.map(str::to_string)).collect())
    }

    #[test]
    fn plain_labels_use_the_unnamed_translation() {
        let c = standardize(json!({
            "survey": [{"type": "text", "label": "Name", "$kuid": "k1"}]
        }));
        assert_eq!(c.translations, vec![None]);
        assert_eq!(c.survey[0].get("label"), Some(&localized(&[Some("Name")])));
        assert_eq!(c.survey[0].kuid(), Some(&Kuid::new("k1")));
    }

    #[test]
    fn translated_columns_are_gathered() {
        let c = standardize(json!({
            "survey": [
                {"type": "text", "label::English": "Name", "label::Français": "Nom"},
                {"type": "note", "label::English": "Hi", "hint::Français": "Salut"}
            ]
        }));
        assert_eq!(
            c.translations,
            vec![Some("English".to_string()), Some("Français".to_string())]
        );
        assert_eq!(
            c.survey[0].get("label"),
            Some(&localized(&[Some("Name"), Some("Nom")]))
        );
        assert_eq!(c.survey[1].get("label"), Some(&localized(&[Some("Hi"), None])));
        assert_eq!(
            c.survey[1].get("hint"),
            Some(&localized(&[None, Some("Salut")]))
        );
        assert!(!c.survey[0].contains("label::English"));
    }

    #[test]
    fn mixed_columns_put_the_unnamed_translation_first() {
        let c = standardize(json!({
            "survey": [{"type": "text", "label": "Name", "label::Français": "Nom"}]
        }));
        assert_eq!(c.translations, vec![None, Some("Français".to_string())]);
        assert_eq!(
            c.survey[0].get("label"),
            Some(&localized(&[Some("Name"), Some("Nom")]))
        );
    }

    #[test]
    fn declared_translations_are_kept() {
        let c = standardize(json!({
            "translations": ["c", null, "a"],
            "survey": [{"type": "text", "label": ["x", "y"]}]
        }));
        // Not padded: the reconciler decides what a misaligned column means.
        assert_eq!(c.translations.len(), 3);
        assert_eq!(c.survey[0].get("label"), Some(&localized(&[Some("x"), Some("y")])));
    }

    #[test]
    fn type_aliases() {
        let c = standardize(json!({
            "survey": [
                {"type": "select one colors"},
                {"type": "select_multiple  fruits"},
                {"type": "begin group"},
                {"type": "end group"},
                {"type": "begin rank"},
                {"type": "select_one yn", "select_from_list_name": "other"},
                {"type": "integer", "relevance": "${a} > 1", "image": "pic.png"}
            ],
            "choices": [{"list name": "colors", "value": "red", "label": "Red"}]
        }));
        let types: Vec<Option<&str>> = c.survey.iter().map(|r| r.row_type()).collect();
        assert_eq!(
            types,
            vec![
                Some("select_one"),
                Some("select_multiple"),
                Some("begin_group"),
                Some("end_group"),
                Some("begin_rank"),
                Some("select_one"),
                Some("integer")
            ]
        );
        assert_eq!(c.survey[0].text("select_from_list_name"), Some("colors"));
        assert_eq!(c.survey[1].text("select_from_list_name"), Some("fruits"));
        assert_eq!(c.survey[5].text("select_from_list_name"), Some("other"));
        assert_eq!(c.survey[6].text("relevant"), Some("${a} > 1"));
        assert_eq!(
            c.survey[6].get("media::image"),
            Some(&localized(&[Some("pic.png")]))
        );
        assert_eq!(c.choices[0].text("list_name"), Some("colors"));
        assert_eq!(c.choices[0].text("name"), Some("red"));
    }

    #[test]
    fn noop_changes_nothing() {
        let content: DraftContent = serde_json::from_value(json!({
            "survey": [{"type": "select one x", "label": "L"}]
        }))
        .unwrap();
        assert_eq!(NoopStandardizer.standardize(content.clone()).unwrap(), content);
    }
}
