use calamine::{open_workbook, DataType, Range, Reader, Xlsx};
use std::collections::BTreeMap;

use crate::compile::*;

/// Reads an XLSForm workbook. The survey sheet is required, the choices and
/// settings sheets are optional.
pub fn read_xlsform(path: &str, settings: &InputSettings) -> CompileResult<DraftContent> {
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let survey_name = settings
        .survey_worksheet_name
        .clone()
        .unwrap_or_else(|| "survey".to_string());
    let choices_name = settings
        .choices_worksheet_name
        .clone()
        .unwrap_or_else(|| "choices".to_string());
    let settings_name = settings
        .settings_worksheet_name
        .clone()
        .unwrap_or_else(|| "settings".to_string());
    debug!(
        "read_xlsform: path: {:?} worksheets: {:?}",
        path,
        workbook.sheet_names()
    );

    let survey_range = workbook
        .worksheet_range(&survey_name)
        .context(MissingWorksheetSnafu {
            name: survey_name.clone(),
            path,
        })?
        .context(OpeningExcelSnafu { path })?;
    let survey = read_rows(&survey_range)
        .into_iter()
        .map(Row::from_cells)
        .collect();

    let choices = match workbook.worksheet_range(&choices_name) {
        Some(r) => read_rows(&r.context(OpeningExcelSnafu { path })?)
            .into_iter()
            .map(Row::from_cells)
            .collect(),
        None => Vec::new(),
    };

    let settings = match workbook.worksheet_range(&settings_name) {
        Some(r) => read_rows(&r.context(OpeningExcelSnafu { path })?)
            .into_iter()
            .next()
            .map(|cells| {
                cells
                    .into_iter()
                    .filter_map(|(k, c)| serde_json::to_value(c).ok().map(|v| (k, v)))
                    .collect()
            })
            .unwrap_or_default(),
        None => BTreeMap::new(),
    };

    Ok(DraftContent {
        survey,
        choices,
        settings,
        ..Default::default()
    })
}

/// The rows of a sheet keyed by the header row. Empty cells are left out.
fn read_rows(range: &Range<DataType>) -> Vec<BTreeMap<String, Cell>> {
    let mut iter = range.rows();
    let header: Vec<Option<String>> = match iter.next() {
        Some(h) => h
            .iter()
            .map(|c| match c {
                DataType::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                _ => None,
            })
            .collect(),
        None => return Vec::new(),
    };
    debug!("read_rows: header: {:?}", header);

    let mut res = Vec::new();
    for row in iter {
        let cells: BTreeMap<String, Cell> = header
            .iter()
            .zip(row.iter())
            .filter_map(|(col, c)| match (col, cell_from_calamine(c)) {
                (Some(col), Some(cell)) => Some((col.clone(), cell)),
                _ => None,
            })
            .collect();
        if !cells.is_empty() {
            res.push(cells);
        }
    }
    res
}

fn cell_from_calamine(c: &DataType) -> Option<Cell> {
    match c {
        DataType::Empty => None,
        DataType::String(s) if s.trim().is_empty() => None,
        DataType::String(s) => Some(Cell::Text(s.clone())),
        DataType::Bool(b) => Some(Cell::Bool(*b)),
        DataType::Int(i) => Some(Cell::Number((*i).into())),
        DataType::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Some(Cell::Number((*f as i64).into()))
        }
        DataType::Float(f) | DataType::DateTime(f) => {
            serde_json::Number::from_f64(*f).map(Cell::Number)
        }
        x => {
            warn!("cell_from_calamine: skipping cell {:?}", x);
            None
        }
    }
}
