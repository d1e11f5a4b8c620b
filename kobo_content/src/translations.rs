//! Keeping localized columns in step with the list of translations.
//!
//! Localized values are positional: the i-th entry of every localized column
//! belongs to the i-th translation. Editing the translation list therefore
//! means rewriting every localized column the same way. Only the edits that
//! have an unambiguous rewrite are accepted.

use std::collections::HashSet;
use std::fmt::Display;

use log::{debug, info};
use snafu::prelude::*;

use crate::config::*;
use crate::content::{Content, IdState, Language};

/// How the new list of translations differs from the old one.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum TranslationChange {
    Equal,
    /// Same languages, in this new order.
    OutOfOrder(Vec<Language>),
    /// One language was renamed in place. The values do not move.
    Renamed {
        index: usize,
        from: Language,
        to: Language,
    },
    /// A language was inserted at the front.
    Added(Language),
    /// The last language was removed.
    Deleted(Language),
}

/// The rule broken by an edit of the translation list that cannot be applied.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TranslationRule {
    MultipleChanges,
    AddedNotFirst,
    SecondUnnamed,
    DeletedNotLast,
    DuplicateLanguage,
}

impl Display for TranslationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            TranslationRule::MultipleChanges => "only one translation can change at a time",
            TranslationRule::AddedNotFirst => "a new translation must be added first",
            TranslationRule::SecondUnnamed => "there can be only one unnamed translation",
            TranslationRule::DeletedNotLast => "only the last translation can be deleted",
            TranslationRule::DuplicateLanguage => "a translation cannot appear twice",
        };
        write!(f, "{}", msg)
    }
}

/// Classifies the edit from `old` to `new`.
pub fn compare_translations(old: &[Language], new: &[Language]) -> ContentResult<TranslationChange> {
    if old == new {
        return Ok(TranslationChange::Equal);
    }
    let unsupported = |rule: TranslationRule| {
        UnsupportedTranslationChangeSnafu {
            rule,
            old: old.to_vec(),
            new: new.to_vec(),
        }
        .fail()
    };

    let distinct: HashSet<&Language> = new.iter().collect();
    if distinct.len() != new.len() {
        let unnamed = new.iter().filter(|l| l.is_none()).count();
        if unnamed > 1 {
            return unsupported(TranslationRule::SecondUnnamed);
        }
        return unsupported(TranslationRule::DuplicateLanguage);
    }

    if old.len() == new.len() {
        let previous: HashSet<&Language> = old.iter().collect();
        if previous == distinct {
            return Ok(TranslationChange::OutOfOrder(new.to_vec()));
        }
        let differences: Vec<usize> = (0..new.len()).filter(|&i| old[i] != new[i]).collect();
        return match differences.as_slice() {
            [index] => Ok(TranslationChange::Renamed {
                index: *index,
                from: old[*index].clone(),
                to: new[*index].clone(),
            }),
            _ => unsupported(TranslationRule::MultipleChanges),
        };
    }

    if new.len() == old.len() + 1 {
        if new[1..] == *old {
            return Ok(TranslationChange::Added(new[0].clone()));
        }
        if is_single_insertion(old, new) {
            return unsupported(TranslationRule::AddedNotFirst);
        }
        return unsupported(TranslationRule::MultipleChanges);
    }

    if new.len() + 1 == old.len() {
        if old[..new.len()] == *new {
            return Ok(TranslationChange::Deleted(old[new.len()].clone()));
        }
        if is_single_insertion(new, old) {
            return unsupported(TranslationRule::DeletedNotLast);
        }
    }
    unsupported(TranslationRule::MultipleChanges)
}

// Whether `longer` is `shorter` with one element inserted somewhere.
fn is_single_insertion(shorter: &[Language], longer: &[Language]) -> bool {
    (0..longer.len()).any(|skip| {
        longer
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, l)| l)
            .eq(shorter.iter())
    })
}

/// Rewrites the translation list and every localized column according to `change`.
pub fn apply_translation_change<S: IdState>(
    mut content: Content<S>,
    change: &TranslationChange,
) -> ContentResult<Content<S>> {
    match change {
        TranslationChange::Equal => {}
        TranslationChange::OutOfOrder(order) => {
            for language in order.iter().rev() {
                content = prioritize_translation(content, language)?;
            }
        }
        TranslationChange::Renamed { index, to, .. } => {
            let known = content.translations.clone();
            let slot = content
                .translations
                .get_mut(*index)
                .context(UnknownTranslationSnafu {
                    language: to.clone(),
                    translations: known,
                })?;
            *slot = to.clone();
        }
        TranslationChange::Added(language) => {
            content.translations.insert(0, language.clone());
            for row in content.rows_mut() {
                for values in row.localized_mut() {
                    // The new language starts from an existing value so that
                    // nothing ends up blank.
                    let seed = match values.first() {
                        Some(Some(first)) => Some(first.clone()),
                        _ => values.iter().flatten().next().cloned(),
                    };
                    values.insert(0, seed);
                }
            }
        }
        TranslationChange::Deleted(_) => {
            content.translations.pop();
            let remaining = content.translations.len();
            for row in content.rows_mut() {
                for values in row.localized_mut() {
                    values.truncate(remaining);
                }
            }
        }
    }
    Ok(content)
}

/// Moves `language` to the front of the translations and of every localized column.
pub fn prioritize_translation<S: IdState>(
    mut content: Content<S>,
    language: &Language,
) -> ContentResult<Content<S>> {
    let index = content
        .translations
        .iter()
        .position(|l| l == language)
        .context(UnknownTranslationSnafu {
            language: language.clone(),
            translations: content.translations.clone(),
        })?;
    if index == 0 {
        return Ok(content);
    }
    debug!("prioritize_translation: {:?} from index {}", language, index);
    let moved = content.translations.remove(index);
    content.translations.insert(0, moved);
    for row in content.rows_mut() {
        for values in row.localized_mut() {
            if index < values.len() {
                let v = values.remove(index);
                values.insert(0, v);
            }
        }
    }
    Ok(content)
}

/// Checks that every localized column holds exactly one value per translation.
/// `end_*` rows are not checked.
pub fn check_alignment<S: IdState>(content: &Content<S>) -> ContentResult<()> {
    let expected = content.translations.len();
    for (sheet, rows) in [("survey", &content.survey), ("choices", &content.choices)] {
        for (index, row) in rows.iter().enumerate() {
            if row.is_end_row() {
                continue;
            }
            for (column, values) in row.localized() {
                ensure!(
                    values.len() == expected,
                    MisalignedColumnSnafu {
                        sheet,
                        index,
                        column,
                        expected,
                        found: values.len(),
                    }
                );
            }
        }
    }
    Ok(())
}

/// Moves `content` from its current translation list to `new`.
///
/// The content must be aligned with its current list. Nothing is rewritten
/// if the edit is not supported.
pub fn update_translation_list<S: IdState>(
    content: Content<S>,
    new: &[Language],
) -> ContentResult<Content<S>> {
    check_alignment(&content)?;
    let change = compare_translations(&content.translations, new)?;
    info!("update_translation_list: {:?}", change);
    apply_translation_change(content, &change)
}
