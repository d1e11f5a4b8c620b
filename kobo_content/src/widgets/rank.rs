use log::debug;
use snafu::prelude::*;

use super::*;

/// A rank widget: each level picks one item of the same list, and no item
/// may be picked twice.
pub(super) struct RankGroup {
    pub(super) opened_at: RowContext,
    item_list: String,
    constraint_message: Cell,
    previous_levels: Vec<String>,
    rows: Vec<DraftRow>,
}

impl RankGroup {
    pub(super) fn begin<S: IdState>(opening: &Row<S>, at: RowContext) -> ContentResult<RankGroup> {
        let name = widget_name(opening, WidgetKind::Rank, &at)?;
        let item_list = required_column(opening, RANK_ITEMS_COLUMN, WidgetKind::Rank, &at)?;
        let constraint_message = opening
            .get(RANK_CONSTRAINT_MESSAGE_COLUMN)
            .filter(|c| has_text(c))
            .cloned()
            .context(MissingWidgetColumnSnafu {
                kind: WidgetKind::Rank,
                column: RANK_CONSTRAINT_MESSAGE_COLUMN,
                row: at.clone(),
            })?;

        let mut group = begin_group(&name, "field-list");
        copy_column(opening, &mut group, "relevant");
        let mut header = DraftRow::new()
            .with("type", "note")
            .with("name", format!("{}_label", name));
        copy_column(opening, &mut header, "label");
        copy_column(opening, &mut header, "hint");

        Ok(RankGroup {
            opened_at: at,
            item_list,
            constraint_message,
            previous_levels: Vec::new(),
            rows: vec![group, header],
        })
    }

    pub(super) fn add_level(&mut self, mut row: DraftRow, at: RowContext) -> ContentResult<()> {
        let level = row.effective_name().context(MissingWidgetColumnSnafu {
            kind: WidgetKind::Rank,
            column: "name",
            row: at,
        })?;
        row.set("type", "select_one");
        row.set("select_from_list_name", self.item_list.clone());
        row.set("required", "true");
        if row.text("appearance").is_none() {
            row.set("appearance", "minimal");
        }
        if let Some(constraint) = level_constraint(&level, &self.previous_levels) {
            debug!("add_level: {}: {}", level, constraint);
            row.set("constraint", constraint);
            row.set("constraint_message", self.constraint_message.clone());
        }
        self.previous_levels.push(level);
        self.rows.push(row);
        Ok(())
    }

    pub(super) fn finish(mut self) -> Vec<DraftRow> {
        self.rows.push(end_group());
        self.rows
    }
}

// A level must differ from every level before it.
fn level_constraint(level: &str, previous: &[String]) -> Option<String> {
    if previous.is_empty() {
        return None;
    }
    Some(
        previous
            .iter()
            .map(|p| format!("${{{}}} != ${{{}}}", level, p))
            .collect::<Vec<_>>()
            .join(" and "),
    )
}
