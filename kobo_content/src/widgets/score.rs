use super::*;

/// A score widget: several questions sharing one choice list, shown as a table.
pub(super) struct ScoreGroup {
    pub(super) opened_at: RowContext,
    choice_list: String,
    required: bool,
    rows: Vec<DraftRow>,
}

impl ScoreGroup {
    pub(super) fn begin<S: IdState>(opening: &Row<S>, at: RowContext) -> ContentResult<ScoreGroup> {
        let name = widget_name(opening, WidgetKind::Score, &at)?;
        let choice_list = required_column(opening, SCORE_CHOICES_COLUMN, WidgetKind::Score, &at)?;
        let required = opening.get("required").map_or(false, Cell::is_truthy);

        let mut group = begin_group(&name, "field-list");
        copy_column(opening, &mut group, "relevant");
        // The header row shows the choice labels once, above the rows.
        let mut header = DraftRow::new()
            .with("type", "select_one")
            .with("name", format!("{}_header", name))
            .with("select_from_list_name", choice_list.clone())
            .with("appearance", "label");
        if opening.get("label").map_or(false, has_text) {
            copy_column(opening, &mut header, "label");
        }
        copy_column(opening, &mut header, "hint");

        Ok(ScoreGroup {
            opened_at: at,
            choice_list,
            required,
            rows: vec![group, header],
        })
    }

    pub(super) fn add_row(&mut self, mut row: DraftRow) -> ContentResult<()> {
        row.set("type", "select_one");
        row.set("select_from_list_name", self.choice_list.clone());
        row.set("appearance", "list-nolabel");
        if self.required {
            row.set("required", "true");
        }
        self.rows.push(row);
        Ok(())
    }

    pub(super) fn finish(mut self) -> Vec<DraftRow> {
        self.rows.push(end_group());
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::row;
    use super::*;

    #[test]
    fn score_expansion() {
        let survey = vec![
            row(&[("type", "text"), ("name", "intro")]),
            row(&[
                ("type", "begin_score"),
                ("name", "sat"),
                ("label", "How satisfied are you with"),
                ("required", "yes"),
                (SCORE_CHOICES_COLUMN, "levels"),
            ]),
            row(&[("type", "score__row"), ("name", "food"), ("label", "the food")]),
            row(&[("type", "score__row"), ("name", "service"), ("label", "the service")]),
            row(&[("type", "end_score")]),
            row(&[("type", "text"), ("name", "outro")]),
        ];
        let out = expand_widgets(&survey, &[]).unwrap();
        let names: Vec<Option<&str>> = out.iter().map(|r| r.text("name")).collect();
        assert_eq!(
            names,
            vec![
                Some("intro"),
                Some("sat"),
                Some("sat_header"),
                Some("food"),
                Some("service"),
                None,
                Some("outro")
            ]
        );
        assert_eq!(out[2].text("appearance"), Some("label"));
        assert_eq!(out[2].text("label"), Some("How satisfied are you with"));
        assert_eq!(out[2].text("select_from_list_name"), Some("levels"));
        for r in &out[3..5] {
            assert_eq!(r.row_type(), Some("select_one"));
            assert_eq!(r.text("appearance"), Some("list-nolabel"));
            assert_eq!(r.text("required"), Some("true"));
        }
        assert_eq!(out[3].text("label"), Some("the food"));
        assert_eq!(out[5].row_type(), Some("end_group"));
    }

    #[test]
    fn optional_scores_stay_optional() {
        let survey = vec![
            row(&[("type", "begin_score"), ("name", "s"), (SCORE_CHOICES_COLUMN, "l")]),
            row(&[("type", "score__row"), ("name", "r")]),
            row(&[("type", "end_score")]),
        ];
        let out = expand_widgets(&survey, &[]).unwrap();
        assert!(!out[2].contains("required"));
    }
}
