use super::*;

const FIRST_COLUMN_WIDTH: u32 = 1;
const DEFAULT_COLUMN_WIDTH: u32 = 2;
const CAPTION_PREFIX: &str = "##### ";

// Columns holding expressions that may refer to other columns of the matrix.
const EXPRESSION_COLUMNS: [&str; 3] = ["relevant", "constraint", "required"];

struct MatrixItem {
    name: String,
    label: Option<Cell>,
}

struct MatrixColumn {
    name: String,
    width: u32,
    row: DraftRow,
}

/// A matrix widget: one line per item of a choice list, one cell per body row.
///
/// The body rows are the columns of the table. Every cell of the table is a
/// copy of its column, named `{matrix}_{item}_{column}`.
pub(super) struct MatrixGroup {
    pub(super) opened_at: RowContext,
    name: String,
    label: Option<Cell>,
    relevant: Option<Cell>,
    items: Vec<MatrixItem>,
    columns: Vec<MatrixColumn>,
}

impl MatrixGroup {
    pub(super) fn begin<S: IdState>(
        opening: &Row<S>,
        at: RowContext,
        choices: &[Row<S>],
    ) -> ContentResult<MatrixGroup> {
        let name = widget_name(opening, WidgetKind::Matrix, &at)?;
        let list_name = required_column(opening, MATRIX_LIST_COLUMN, WidgetKind::Matrix, &at)?;
        let items: Vec<MatrixItem> = choices
            .iter()
            .filter(|c| c.scalar_string("list_name").as_deref() == Some(list_name.as_str()))
            .filter_map(|c| {
                c.effective_value().map(|name| MatrixItem {
                    name,
                    label: c.get("label").cloned(),
                })
            })
            .collect();
        ensure!(
            !items.is_empty(),
            EmptyChoiceListSnafu {
                list_name,
                row: at.clone(),
            }
        );
        Ok(MatrixGroup {
            opened_at: at,
            name,
            label: opening.get("label").cloned(),
            relevant: opening.get("relevant").cloned(),
            items,
            columns: Vec::new(),
        })
    }

    pub(super) fn add_column(&mut self, row: DraftRow, at: RowContext) -> ContentResult<()> {
        let name = row.effective_name().context(MissingWidgetColumnSnafu {
            kind: WidgetKind::Matrix,
            column: "name",
            row: at,
        })?;
        let width = column_width(&row);
        self.columns.push(MatrixColumn { name, width, row });
        Ok(())
    }

    pub(super) fn finish(self) -> Vec<DraftRow> {
        let total = FIRST_COLUMN_WIDTH + self.columns.iter().map(|c| c.width).sum::<u32>();
        let full_width = format!("w{}", total);
        let first_width = format!("w{}", FIRST_COLUMN_WIDTH);
        let mut rows = Vec::new();

        let mut outer = begin_group(&self.name, &full_width);
        if let Some(label) = &self.label {
            outer.set("label", label.clone());
        }
        if let Some(relevant) = &self.relevant {
            outer.set("relevant", relevant.clone());
        }
        rows.push(outer);

        rows.push(begin_group(&format!("{}_header", self.name), &full_width));
        rows.push(note(
            format!("{}_header_note", self.name),
            &first_width,
            self.label.as_ref(),
        ));
        for column in self.columns.iter() {
            rows.push(note(
                format!("{}_header_{}", self.name, column.name),
                &format!("w{}", column.width),
                column.row.get("label"),
            ));
        }
        rows.push(end_group());

        for item in self.items.iter() {
            rows.push(begin_group(
                &format!("{}_{}", self.name, item.name),
                &full_width,
            ));
            rows.push(note(
                format!("{}_{}_note", self.name, item.name),
                &first_width,
                item.label.as_ref(),
            ));
            for column in self.columns.iter() {
                rows.push(self.cell(column, item));
            }
            rows.push(end_group());
        }

        rows.push(end_group());
        rows
    }

    fn cell(&self, column: &MatrixColumn, item: &MatrixItem) -> DraftRow {
        let mut row = DraftRow::new();
        for (key, value) in column.row.cells() {
            if key.starts_with('$') || matches!(key.as_str(), "name" | "label" | "appearance") {
                continue;
            }
            row.set(key.clone(), value.clone());
        }
        row.set("name", format!("{}_{}_{}", self.name, item.name, column.name));
        row.set("appearance", cell_appearance(&column.row, column.width));
        for key in EXPRESSION_COLUMNS {
            if let Some(expression) = row.text(key) {
                let rewritten = self.rewrite_references(expression, &item.name);
                row.set(key, rewritten);
            }
        }
        row
    }

    // References to a column of the matrix become references to the cell of
    // the same item. This is a plain substring replacement: `${col` also
    // matches the start of `${column_b}`.
    fn rewrite_references(&self, expression: &str, item: &str) -> String {
        let mut out = expression.to_string();
        for column in self.columns.iter() {
            out = out.replace(
                &format!("${{{}", column.name),
                &format!("${{{}_{}_{}", self.name, item, column.name),
            );
        }
        out
    }
}

fn note(name: String, appearance: &str, label: Option<&Cell>) -> DraftRow {
    let mut row = DraftRow::new()
        .with("type", "note")
        .with("name", name)
        .with("appearance", appearance);
    if let Some(label) = label {
        row.set("label", label.map_text(|t| format!("{}{}", CAPTION_PREFIX, t)));
    }
    row
}

fn width_token(token: &str) -> Option<u32> {
    token.strip_prefix('w').and_then(|n| n.parse().ok())
}

fn column_width(row: &DraftRow) -> u32 {
    row.text("appearance")
        .and_then(|a| a.split_whitespace().find_map(width_token))
        .unwrap_or(DEFAULT_COLUMN_WIDTH)
}

fn cell_appearance(row: &DraftRow, width: u32) -> String {
    let mut tokens = vec![format!("w{}", width)];
    if let Some(appearance) = row.text("appearance") {
        tokens.extend(
            appearance
                .split_whitespace()
                .filter(|t| width_token(t).is_none())
                .map(str::to_string),
        );
    }
    let is_select = row.row_type().map_or(false, |t| t.starts_with("select_"));
    if is_select && !tokens.iter().any(|t| t == "list-nolabel") {
        tokens.push("list-nolabel".to_string());
    }
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::super::tests::row;
    use super::*;

    fn choices() -> Vec<DraftRow> {
        vec![
            row(&[("list_name", "people"), ("name", "adult"), ("label", "Adults")]),
            row(&[("list_name", "people"), ("name", "child"), ("label", "Children")]),
            row(&[("list_name", "other"), ("name", "x")]),
        ]
    }

    fn matrix(body: Vec<DraftRow>) -> Vec<DraftRow> {
        let mut survey = vec![row(&[
            ("type", "begin_kobomatrix"),
            ("name", "hh"),
            ("label", "Household"),
            (MATRIX_LIST_COLUMN, "people"),
        ])];
        survey.extend(body);
        survey.push(row(&[("type", "end_kobomatrix")]));
        survey
    }

    fn find<'a>(rows: &'a [DraftRow], name: &str) -> &'a DraftRow {
        rows.iter()
            .find(|r| r.text("name") == Some(name))
            .unwrap_or_else(|| panic!("no row named {}", name))
    }

    #[test]
    fn matrix_layout() {
        let survey = matrix(vec![
            row(&[("type", "integer"), ("name", "count"), ("label", "How many")]),
            row(&[
                ("type", "select_one yn"),
                ("name", "works"),
                ("label", "Working"),
                ("appearance", "w3"),
            ]),
        ]);
        let out = expand_widgets(&survey, &choices()).unwrap();
        let names: Vec<Option<&str>> = out.iter().map(|r| r.text("name")).collect();
        assert_eq!(
            names,
            vec![
                Some("hh"),
                Some("hh_header"),
                Some("hh_header_note"),
                Some("hh_header_count"),
                Some("hh_header_works"),
                None,
                Some("hh_adult"),
                Some("hh_adult_note"),
                Some("hh_adult_count"),
                Some("hh_adult_works"),
                None,
                Some("hh_child"),
                Some("hh_child_note"),
                Some("hh_child_count"),
                Some("hh_child_works"),
                None,
                None
            ]
        );
        // 1 + 2 (default) + 3
        assert_eq!(out[0].text("appearance"), Some("w6"));
        assert_eq!(out[0].text("label"), Some("Household"));
        assert_eq!(find(&out, "hh_header_note").text("appearance"), Some("w1"));
        assert_eq!(find(&out, "hh_header_count").text("label"), Some("##### How many"));
        assert_eq!(find(&out, "hh_header_works").text("appearance"), Some("w3"));
        assert_eq!(find(&out, "hh_child_note").text("label"), Some("##### Children"));

        let count = find(&out, "hh_adult_count");
        assert_eq!(count.row_type(), Some("integer"));
        assert_eq!(count.text("appearance"), Some("w2"));
        assert!(!count.contains("label"));
        let works = find(&out, "hh_child_works");
        assert_eq!(works.text("appearance"), Some("w3 list-nolabel"));
        assert!(out.iter().all(|r| r.kuid().is_none()));
    }

    #[test]
    fn references_are_rewritten_per_item() {
        let survey = matrix(vec![
            row(&[("type", "integer"), ("name", "count")]),
            row(&[
                ("type", "text"),
                ("name", "names"),
                ("relevant", "${count} > 0"),
                ("constraint", "string-length(.) < ${count} * 20"),
            ]),
        ]);
        let out = expand_widgets(&survey, &choices()).unwrap();
        let names = find(&out, "hh_adult_names");
        assert_eq!(names.text("relevant"), Some("${hh_adult_count} > 0"));
        assert_eq!(
            names.text("constraint"),
            Some("string-length(.) < ${hh_adult_count} * 20")
        );
        assert_eq!(
            find(&out, "hh_child_names").text("relevant"),
            Some("${hh_child_count} > 0")
        );
    }

    #[test]
    fn prefix_references_are_also_rewritten() {
        // `${a` is a prefix of `${ab}`: the replacement is textual and
        // rewrites both references.
        let survey = matrix(vec![
            row(&[("type", "integer"), ("name", "a")]),
            row(&[("type", "text"), ("name", "x"), ("relevant", "${ab} = 1")]),
        ]);
        let out = expand_widgets(&survey, &choices()).unwrap();
        assert_eq!(
            find(&out, "hh_adult_x").text("relevant"),
            Some("${hh_adult_ab} = 1")
        );
    }

    #[test]
    fn empty_choice_list() {
        let mut survey = matrix(vec![row(&[("type", "integer"), ("name", "count")])]);
        survey[0].set(MATRIX_LIST_COLUMN, "nobody");
        assert!(matches!(
            expand_widgets(&survey, &choices()),
            Err(ContentError::EmptyChoiceList { .. })
        ));
    }
}
