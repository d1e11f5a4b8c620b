//! Gives every row a valid and unique name.
//!
//! Survey rows receive `$autoname`, choices receive `$autovalue` (unique within
//! their list). Names the author wrote are kept whenever they are valid and
//! unique; everything else is derived from the label.

use log::{debug, info};
use snafu::prelude::*;

use crate::config::*;
use crate::content::{Cell, Content, IdState, Row, AUTONAME_KEY, AUTOVALUE_KEY};
use crate::slug::{is_valid_choice_value, is_valid_xml_tag, slugify, SlugOptions, UsedNames};

/// Names the survey rows and the choices of a content.
pub fn autoname<S: IdState>(mut content: Content<S>, rules: &SaveRules) -> ContentResult<Content<S>> {
    autoname_survey(&mut content.survey, AUTONAME_KEY, rules)?;
    autovalue_choices(&mut content.choices, AUTOVALUE_KEY, rules)?;
    Ok(content)
}

/// Writes a unique node name into the `destination` column of every survey
/// row, except the `end_*` rows.
pub fn autoname_survey<S: IdState>(
    rows: &mut [Row<S>],
    destination: &str,
    rules: &SaveRules,
) -> ContentResult<()> {
    let indices: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_end_row())
        .map(|(i, _)| i)
        .collect();
    let scope = Scope {
        name: "survey".to_string(),
        destination,
        accepts: is_valid_xml_tag,
    };
    name_rows(rows, &indices, &scope, rules)
}

/// Writes a unique value into the `destination` column of every choice,
/// separately for each list.
pub fn autovalue_choices<S: IdState>(
    rows: &mut [Row<S>],
    destination: &str,
    rules: &SaveRules,
) -> ContentResult<()> {
    let mut lists: Vec<(String, Vec<usize>)> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let list_name = match row.scalar_string("list_name") {
            Some(l) => l,
            None => continue,
        };
        match lists.iter_mut().find(|(l, _)| *l == list_name) {
            Some((_, indices)) => indices.push(idx),
            None => lists.push((list_name, vec![idx])),
        }
    }
    for (list_name, indices) in lists.iter() {
        // Choice values end up as option values, not element names, so
        // numeric values are fine as written.
        let scope = Scope {
            name: format!("choice list {:?}", list_name),
            destination,
            accepts: is_valid_choice_value,
        };
        name_rows(rows, indices, &scope, rules)?;
    }
    Ok(())
}

struct Scope<'a> {
    name: String,
    destination: &'a str,
    accepts: fn(&str) -> bool,
}

fn name_rows<S: IdState>(
    rows: &mut [Row<S>],
    indices: &[usize],
    scope: &Scope,
    rules: &SaveRules,
) -> ContentResult<()> {
    let options = rules.label_slug_options();
    let mut used = UsedNames::new();

    // Declared names go first. Rows that already have an identity were there
    // before the rows generated since, so they keep their names.
    let mut declared: Vec<(usize, String)> = indices
        .iter()
        .filter_map(|&i| declared_name(&rows[i], scope.destination).map(|n| (i, n)))
        .collect();
    declared.sort_by_key(|(i, _)| (rows[*i].kuid().is_none(), *i));
    let mut named = vec![false; rows.len()];
    for (idx, name) in declared {
        let final_name = claim_declared(&name, &mut used, scope, &options, rules)?;
        if final_name != name {
            info!(
                "name_rows: {}: renamed {:?} to {:?}",
                scope.name, name, final_name
            );
        }
        rows[idx].set(scope.destination, Cell::Text(final_name));
        named[idx] = true;
    }

    for &idx in indices.iter().filter(|&&i| !named[i]) {
        let seed = seed_text(&rows[idx]);
        let name = slugify(&seed, &used, &options);
        debug!("name_rows: {}: row {} named {:?}", scope.name, idx, name);
        used.claim(&name);
        rows[idx].set(scope.destination, Cell::Text(name));
    }

    ensure!(
        used.len() == indices.len(),
        NameCountMismatchSnafu {
            scope: scope.name.clone(),
            rows: indices.len(),
            unique: used.len(),
        }
    );
    Ok(())
}

// The name the author gave, or the one an earlier save derived.
fn declared_name<S: IdState>(row: &Row<S>, destination: &str) -> Option<String> {
    row.scalar_string("name")
        .or_else(|| row.scalar_string(destination))
        .map(|s| s.trim().to_string())
}

fn claim_declared(
    name: &str,
    used: &mut UsedNames,
    scope: &Scope,
    options: &SlugOptions,
    rules: &SaveRules,
) -> ContentResult<String> {
    let mut candidate = name.to_string();
    let mut attempts: u32 = 0;
    while used.contains(&candidate) || !(scope.accepts)(&candidate) {
        ensure!(
            attempts < rules.max_rename_attempts,
            NameConvergenceSnafu { name, attempts }
        );
        candidate = slugify(&candidate, used, options);
        attempts += 1;
    }
    used.claim(&candidate);
    Ok(candidate)
}

fn seed_text<S: IdState>(row: &Row<S>) -> String {
    if let Some(label) = row.get("label").and_then(Cell::first_text) {
        return label.to_string();
    }
    let kind = row
        .row_type()
        .map(str::to_string)
        .or_else(|| row.scalar_string("list_name"))
        .unwrap_or_default();
    let kuid = row.kuid().map(|k| k.to_string()).unwrap_or_default();
    format!("{}{}", kind, kuid)
}
