//! Expansion of the kobo widgets into plain XLSForm rows.
//!
//! A widget is a block of survey rows opened by `begin_rank`, `begin_score` or
//! `begin_kobomatrix` and closed by the matching `end_*` row. The expander
//! walks the survey once, collecting the rows of the current widget and
//! replacing the whole block with the rows the widget generates.

use std::fmt::Display;

use log::debug;
use snafu::prelude::*;

use crate::config::*;
use crate::content::{Cell, DraftRow, IdState, Row, RowContext};

mod matrix;
mod rank;
mod score;

use matrix::MatrixGroup;
use rank::RankGroup;
use score::ScoreGroup;

/// The choice list ranked by a rank widget.
pub const RANK_ITEMS_COLUMN: &str = "kobo--rank-items";
pub const RANK_CONSTRAINT_MESSAGE_COLUMN: &str = "kobo--rank-constraint-message";
/// The choice list shared by all the rows of a score widget.
pub const SCORE_CHOICES_COLUMN: &str = "kobo--score-choices";
/// The choice list providing the rows of a matrix.
pub const MATRIX_LIST_COLUMN: &str = "kobo--matrix_list";

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WidgetKind {
    Rank,
    Score,
    Matrix,
}

impl WidgetKind {
    pub fn begin_type(&self) -> &'static str {
        match self {
            WidgetKind::Rank => "begin_rank",
            WidgetKind::Score => "begin_score",
            WidgetKind::Matrix => "begin_kobomatrix",
        }
    }

    pub fn end_type(&self) -> &'static str {
        match self {
            WidgetKind::Rank => "end_rank",
            WidgetKind::Score => "end_score",
            WidgetKind::Matrix => "end_kobomatrix",
        }
    }
}

impl Display for WidgetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WidgetKind::Rank => "rank",
            WidgetKind::Score => "score",
            WidgetKind::Matrix => "matrix",
        };
        write!(f, "{}", name)
    }
}

/// The role of a survey row for the expander.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WidgetRow {
    Begin(WidgetKind),
    End(WidgetKind),
    RankLevel,
    ScoreRow,
    /// `begin_group`, `end_repeat`...: structure outside of any widget.
    Structure,
    Other,
}

impl WidgetRow {
    pub fn of(row_type: Option<&str>) -> WidgetRow {
        match row_type {
            Some("begin_rank") => WidgetRow::Begin(WidgetKind::Rank),
            Some("end_rank") => WidgetRow::End(WidgetKind::Rank),
            Some("begin_score") => WidgetRow::Begin(WidgetKind::Score),
            Some("end_score") => WidgetRow::End(WidgetKind::Score),
            Some("begin_kobomatrix") => WidgetRow::Begin(WidgetKind::Matrix),
            Some("end_kobomatrix") => WidgetRow::End(WidgetKind::Matrix),
            Some("rank__level") => WidgetRow::RankLevel,
            Some("score__row") => WidgetRow::ScoreRow,
            Some(t) if t.starts_with("begin_") || t.starts_with("end_") => WidgetRow::Structure,
            _ => WidgetRow::Other,
        }
    }
}

// The widget being collected.
enum Collector {
    Rank(RankGroup),
    Score(ScoreGroup),
    Matrix(MatrixGroup),
}

impl Collector {
    fn begin<S: IdState>(
        kind: WidgetKind,
        opening: &Row<S>,
        at: RowContext,
        choices: &[Row<S>],
    ) -> ContentResult<Collector> {
        Ok(match kind {
            WidgetKind::Rank => Collector::Rank(RankGroup::begin(opening, at)?),
            WidgetKind::Score => Collector::Score(ScoreGroup::begin(opening, at)?),
            WidgetKind::Matrix => Collector::Matrix(MatrixGroup::begin(opening, at, choices)?),
        })
    }

    fn kind(&self) -> WidgetKind {
        match self {
            Collector::Rank(_) => WidgetKind::Rank,
            Collector::Score(_) => WidgetKind::Score,
            Collector::Matrix(_) => WidgetKind::Matrix,
        }
    }

    fn opened_at(&self) -> &RowContext {
        match self {
            Collector::Rank(g) => &g.opened_at,
            Collector::Score(g) => &g.opened_at,
            Collector::Matrix(g) => &g.opened_at,
        }
    }

    fn accepts(&self, role: WidgetRow) -> bool {
        matches!(
            (self, role),
            (Collector::Rank(_), WidgetRow::RankLevel)
                | (Collector::Score(_), WidgetRow::ScoreRow)
                | (Collector::Matrix(_), WidgetRow::Other)
        )
    }

    fn push(&mut self, row: DraftRow, at: RowContext) -> ContentResult<()> {
        match self {
            Collector::Rank(g) => g.add_level(row, at),
            Collector::Score(g) => g.add_row(row),
            Collector::Matrix(g) => g.add_column(row, at),
        }
    }

    fn finish(self) -> Vec<DraftRow> {
        match self {
            Collector::Rank(g) => g.finish(),
            Collector::Score(g) => g.finish(),
            Collector::Matrix(g) => g.finish(),
        }
    }
}

enum ExpanderState {
    Idle,
    Collecting(Collector),
}

/// Replaces every widget of `survey` by the rows it stands for.
///
/// Rows outside widgets are copied as they are. The rank levels and the score
/// rows keep their kuids, all the other generated rows have none.
pub fn expand_widgets<S: IdState>(
    survey: &[Row<S>],
    choices: &[Row<S>],
) -> ContentResult<Vec<DraftRow>> {
    let mut out: Vec<DraftRow> = Vec::with_capacity(survey.len());
    let mut state = ExpanderState::Idle;
    for (index, row) in survey.iter().enumerate() {
        let role = WidgetRow::of(row.row_type());
        let at = RowContext::of(index, row);
        state = match (state, role) {
            (ExpanderState::Idle, WidgetRow::Begin(kind)) => {
                debug!("expand_widgets: {} widget at {}", kind, at);
                ExpanderState::Collecting(Collector::begin(kind, row, at, choices)?)
            }
            (ExpanderState::Idle, WidgetRow::End(kind)) => {
                return UnmatchedWidgetEndSnafu { kind, row: at }.fail();
            }
            (ExpanderState::Idle, WidgetRow::RankLevel | WidgetRow::ScoreRow) => {
                return StrayWidgetRowSnafu { row: at }.fail();
            }
            (ExpanderState::Idle, WidgetRow::Structure | WidgetRow::Other) => {
                out.push(row.clone().into_draft());
                ExpanderState::Idle
            }
            (ExpanderState::Collecting(collector), WidgetRow::End(kind))
                if kind == collector.kind() =>
            {
                out.extend(collector.finish());
                ExpanderState::Idle
            }
            (ExpanderState::Collecting(collector), WidgetRow::Begin(_)) => {
                return NestedWidgetSnafu {
                    kind: collector.kind(),
                    row: at,
                    opened_at: collector.opened_at().clone(),
                }
                .fail();
            }
            (ExpanderState::Collecting(mut collector), role) if collector.accepts(role) => {
                collector.push(row.clone().into_draft(), at)?;
                ExpanderState::Collecting(collector)
            }
            (ExpanderState::Collecting(collector), _) => {
                return UnexpectedWidgetRowSnafu {
                    kind: collector.kind(),
                    row: at,
                    opened_at: collector.opened_at().clone(),
                }
                .fail();
            }
        };
    }
    if let ExpanderState::Collecting(collector) = state {
        return UnterminatedWidgetSnafu {
            kind: collector.kind(),
            opened_at: collector.opened_at().clone(),
        }
        .fail();
    }
    Ok(out)
}

// ******** Helpers shared by the widgets *********

/// The name of the widget, required to name the generated rows.
fn widget_name<S: IdState>(opening: &Row<S>, kind: WidgetKind, at: &RowContext) -> ContentResult<String> {
    opening.effective_name().context(MissingWidgetColumnSnafu {
        kind,
        column: "name",
        row: at.clone(),
    })
}

fn required_column<S: IdState>(
    opening: &Row<S>,
    column: &str,
    kind: WidgetKind,
    at: &RowContext,
) -> ContentResult<String> {
    opening.scalar_string(column).context(MissingWidgetColumnSnafu {
        kind,
        column,
        row: at.clone(),
    })
}

fn copy_column<S: IdState>(from: &Row<S>, to: &mut DraftRow, column: &str) {
    if let Some(cell) = from.get(column) {
        to.set(column, cell.clone());
    }
}

fn begin_group(name: &str, appearance: &str) -> DraftRow {
    DraftRow::new()
        .with("type", "begin_group")
        .with("name", name)
        .with("appearance", appearance)
}

fn end_group() -> DraftRow {
    DraftRow::new().with("type", "end_group")
}

fn has_text(cell: &Cell) -> bool {
    cell.first_text().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn row(cells: &[(&str, &str)]) -> DraftRow {
        cells
            .iter()
            .fold(DraftRow::new(), |r, (k, v)| r.with(*k, *v))
    }

    fn kind_of(res: ContentResult<Vec<DraftRow>>) -> String {
        match res {
            Ok(_) => "ok".to_string(),
            Err(e) => format!("{:?}", e)
                .split(|c: char| !c.is_alphanumeric())
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }

    #[test]
    fn plain_rows_pass_through() {
        let survey = vec![row(&[("type", "text"), ("name", "a")]), row(&[("type", "note")])];
        let out = expand_widgets(&survey, &[]).unwrap();
        assert_eq!(out, survey);
    }

    #[test]
    fn structural_errors() {
        let rank = row(&[
            ("type", "begin_rank"),
            ("name", "r"),
            (RANK_ITEMS_COLUMN, "items"),
            (RANK_CONSTRAINT_MESSAGE_COLUMN, "no"),
        ]);
        let end_rank = row(&[("type", "end_rank")]);
        let level = row(&[("type", "rank__level"), ("name", "l1")]);
        let text = row(&[("type", "text"), ("name", "t")]);

        assert_eq!(kind_of(expand_widgets(&[end_rank.clone()], &[])), "UnmatchedWidgetEnd");
        assert_eq!(kind_of(expand_widgets(&[level.clone()], &[])), "StrayWidgetRow");
        assert_eq!(kind_of(expand_widgets(&[rank.clone()], &[])), "UnterminatedWidget");
        assert_eq!(
            kind_of(expand_widgets(&[rank.clone(), rank.clone()], &[])),
            "NestedWidget"
        );
        assert_eq!(
            kind_of(expand_widgets(&[rank.clone(), text, end_rank.clone()], &[])),
            "UnexpectedWidgetRow"
        );
        assert_eq!(
            kind_of(expand_widgets(
                &[rank, level, row(&[("type", "end_score")]), end_rank],
                &[]
            )),
            "UnexpectedWidgetRow"
        );
    }

    #[test]
    fn matrix_bodies_reject_groups() {
        let choices = vec![row(&[("list_name", "ages"), ("name", "children")])];
        let survey = vec![
            row(&[("type", "begin_kobomatrix"), ("name", "m"), (MATRIX_LIST_COLUMN, "ages")]),
            row(&[("type", "begin_group"), ("name", "g")]),
            row(&[("type", "integer"), ("name", "count")]),
            row(&[("type", "end_group")]),
            row(&[("type", "end_kobomatrix")]),
        ];
        match expand_widgets(&survey, &choices) {
            Err(ContentError::UnexpectedWidgetRow { kind, row, opened_at }) => {
                assert_eq!(kind, WidgetKind::Matrix);
                assert_eq!(row.index, 1);
                assert_eq!(opened_at.index, 0);
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn missing_columns_name_the_row() {
        let survey = vec![
            row(&[("type", "text"), ("name", "before")]),
            row(&[("type", "begin_score"), ("name", "s")]),
            row(&[("type", "end_score")]),
        ];
        match expand_widgets(&survey, &[]) {
            Err(ContentError::MissingWidgetColumn { kind, column, row }) => {
                assert_eq!(kind, WidgetKind::Score);
                assert_eq!(column, SCORE_CHOICES_COLUMN);
                assert_eq!(row.index, 1);
            }
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn roles() {
        assert_eq!(WidgetRow::of(Some("begin_kobomatrix")), WidgetRow::Begin(WidgetKind::Matrix));
        assert_eq!(WidgetRow::of(Some("score__row")), WidgetRow::ScoreRow);
        assert_eq!(WidgetRow::of(Some("begin_group")), WidgetRow::Structure);
        assert_eq!(WidgetRow::of(Some("end_repeat")), WidgetRow::Structure);
        assert_eq!(WidgetRow::of(Some("integer")), WidgetRow::Other);
        assert_eq!(WidgetRow::of(None), WidgetRow::Other);
    }
}
