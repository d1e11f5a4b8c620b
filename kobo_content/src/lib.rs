mod config;
mod content;

pub mod autoname;
pub mod builder;
pub mod kuid;
pub mod manual;
pub mod slug;
pub mod standardize;
pub mod translations;
pub mod widgets;

use log::{debug, info};

pub use crate::config::*;
pub use crate::content::*;
pub use crate::autoname::autoname;
pub use crate::kuid::{assign_kuids, KuidSource};
pub use crate::standardize::Standardizer;
pub use crate::translations::{check_alignment, update_translation_list};

// The save pipeline, one stage at a time. Every stage consumes its input and
// returns a new document, so a failure never leaves a half-transformed one.

/// Applies the standardizer to a copy of the proposed content.
pub fn standardize(
    content: &DraftContent,
    standardizer: &dyn Standardizer,
) -> ContentResult<DraftContent> {
    standardizer.standardize(content.clone())
}

/// Removes the survey rows without a type and the choices without a list.
pub fn strip_empty_rows<S: IdState>(mut content: Content<S>) -> Content<S> {
    let before = content.survey.len() + content.choices.len();
    content.survey.retain(|r| r.row_type().is_some());
    content
        .choices
        .retain(|r| r.scalar_string("list_name").is_some());
    let removed = before - content.survey.len() - content.choices.len();
    if removed > 0 {
        info!("strip_empty_rows: removed {} rows", removed);
    }
    content
}

/// Replaces the widgets of the survey by plain rows.
pub fn expand<S: IdState>(content: &Content<S>) -> ContentResult<DraftContent> {
    let survey = widgets::expand_widgets(&content.survey, &content.choices)?;
    debug!(
        "expand: {} survey rows -> {} survey rows",
        content.survey.len(),
        survey.len()
    );
    Ok(Content {
        schema: content.schema.clone(),
        survey,
        choices: content.choices.iter().cloned().map(Row::into_draft).collect(),
        settings: content.settings.clone(),
        translations: content.translations.clone(),
    })
}

/// Moves the derived names into `name` and drops the internal `$` columns.
pub fn replace_with_autofields<S: IdState>(content: Content<S>) -> XlsForm {
    XlsForm {
        survey: content
            .survey
            .into_iter()
            .map(|r| flatten_row(r, AUTONAME_KEY))
            .collect(),
        choices: content
            .choices
            .into_iter()
            .map(|r| flatten_row(r, AUTOVALUE_KEY))
            .collect(),
        settings: content.settings,
        translations: content.translations,
    }
}

fn flatten_row<S: IdState>(row: Row<S>, auto_key: &str) -> std::collections::BTreeMap<String, Cell> {
    let mut cells = row.into_cells();
    if let Some(auto) = cells.remove(auto_key) {
        cells.insert("name".to_string(), auto);
    }
    cells.retain(|k, _| !k.starts_with('$'));
    cells
}

/// Validates and normalizes proposed content before it is stored.
///
/// `previous_translations` is the translation list of the stored version,
/// if any. The proposed rows are still laid out for that list: they are
/// standardized against it, then moved to the proposed list.
pub fn save_content(
    proposed: &DraftContent,
    previous_translations: Option<&[Language]>,
    rules: &SaveRules,
    standardizer: &dyn Standardizer,
    kuids: &mut dyn KuidSource,
) -> ContentResult<Content> {
    info!(
        "save_content: {} survey rows, {} choices, translations {:?}",
        proposed.survey.len(),
        proposed.choices.len(),
        proposed.translations
    );
    let draft = match previous_translations {
        Some(old) if old != proposed.translations.as_slice() => {
            let working = Content {
                translations: old.to_vec(),
                ..proposed.clone()
            };
            let working = standardize(&working, standardizer)?;
            update_translation_list(working, &proposed.translations)?
        }
        _ => standardize(proposed, standardizer)?,
    };
    let draft = strip_empty_rows(draft);
    let content = assign_kuids(draft, kuids);
    let content = autoname(content, rules)?;
    check_alignment(&content)?;
    Ok(content)
}

/// Builds the structure handed to the XForm compiler from saved content.
pub fn export_xlsform<S: IdState>(
    content: &Content<S>,
    rules: &SaveRules,
    kuids: &mut dyn KuidSource,
) -> ContentResult<XlsForm> {
    let expanded = expand(content)?;
    // The generated rows have no kuid yet, so the rows that came from the
    // saved content keep their names.
    let expanded = autoname(expanded, rules)?;
    let expanded = assign_kuids(expanded, kuids);
    check_alignment(&expanded)?;
    Ok(replace_with_autofields(expanded))
}
