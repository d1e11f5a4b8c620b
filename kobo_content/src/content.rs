// ********* Content data structures ***********

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

/// The column holding the identity of a row.
pub const KUID_KEY: &str = "$kuid";
/// The column receiving the derived name of a survey row.
pub const AUTONAME_KEY: &str = "$autoname";
/// The column receiving the derived value of a choice row.
pub const AUTOVALUE_KEY: &str = "$autovalue";

/// A language of the form. `None` is the unnamed (default) translation.
pub type Language = Option<String>;

/// The stable identity of a row, retained across saves.
///
/// Names may change from one save to the next, the kuid does not.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kuid(String);

impl Kuid {
    pub fn new(token: impl Into<String>) -> Kuid {
        Kuid(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Kuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a row has been given its kuid yet.
pub trait IdState: Clone + fmt::Debug + PartialEq {
    fn kuid(&self) -> Option<&Kuid>;
}

/// A row that may or may not carry a kuid. Rows read back from a previous
/// save usually do, rows generated by the widget expander never do.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Unidentified(pub Option<Kuid>);

/// A row with its kuid assigned.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Identified(pub Kuid);

impl IdState for Unidentified {
    fn kuid(&self) -> Option<&Kuid> {
        self.0.as_ref()
    }
}

impl IdState for Identified {
    fn kuid(&self) -> Option<&Kuid> {
        Some(&self.0)
    }
}

/// The value of one column in one row.
///
/// JSON arrays are localized values (one entry per translation), everything
/// else is a scalar.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Localized(Vec<Option<String>>),
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl Cell {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_localized(&self) -> Option<&[Option<String>]> {
        match self {
            Cell::Localized(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// The scalar rendered as a string. Localized cells have no scalar form.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Localized(_) => None,
        }
    }

    /// The first non-blank text, in translation order for localized cells.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) if !s.trim().is_empty() => Some(s.as_str()),
            Cell::Localized(values) => values
                .iter()
                .flatten()
                .map(|s| s.as_str())
                .find(|s| !s.trim().is_empty()),
            _ => None,
        }
    }

    /// XLSForm accepts several spellings of "yes" in the `required` column.
    pub fn is_truthy(&self) -> bool {
        match self {
            Cell::Bool(b) => *b,
            Cell::Text(s) => matches!(
                s.trim().to_lowercase().as_str(),
                "true" | "yes" | "true()" | "1"
            ),
            Cell::Number(n) => n.as_i64() == Some(1),
            Cell::Localized(_) => false,
        }
    }

    /// Applies `f` to every text held by the cell, keeping missing translations missing.
    pub fn map_text(&self, f: impl Fn(&str) -> String) -> Cell {
        match self {
            Cell::Text(s) => Cell::Text(f(s)),
            Cell::Localized(values) => Cell::Localized(
                values
                    .iter()
                    .map(|v| v.as_ref().map(|s| f(s)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Cell {
        Cell::Text(s)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Cell {
        Cell::Bool(b)
    }
}

impl From<Vec<Option<String>>> for Cell {
    fn from(values: Vec<Option<String>>) -> Cell {
        Cell::Localized(values)
    }
}

/// One row of the `survey` or `choices` sheet.
#[derive(PartialEq, Debug, Clone)]
pub struct Row<S: IdState = Identified> {
    id: S,
    cells: BTreeMap<String, Cell>,
}

pub type DraftRow = Row<Unidentified>;

impl Row<Unidentified> {
    pub fn new() -> DraftRow {
        Row {
            id: Unidentified(None),
            cells: BTreeMap::new(),
        }
    }

    /// Builds a row from raw columns. A textual `$kuid` column becomes the row identity.
    pub fn from_cells(mut cells: BTreeMap<String, Cell>) -> DraftRow {
        let kuid = match cells.remove(KUID_KEY) {
            Some(Cell::Text(s)) if !s.is_empty() => Some(Kuid(s)),
            _ => None,
        };
        Row {
            id: Unidentified(kuid),
            cells,
        }
    }

    pub fn identify(self, kuid: Kuid) -> Row<Identified> {
        Row {
            id: Identified(kuid),
            cells: self.cells,
        }
    }
}

impl Default for Row<Unidentified> {
    fn default() -> Self {
        Row::new()
    }
}

impl<S: IdState> Row<S> {
    pub fn kuid(&self) -> Option<&Kuid> {
        self.id.kuid()
    }

    /// Builder-style setter.
    pub fn with(mut self, key: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.set(key, cell);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.cells.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    /// The value of a textual column, if present and not blank.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.cells
            .get(key)
            .and_then(Cell::as_text)
            .filter(|s| !s.trim().is_empty())
    }

    /// The value of a scalar column rendered as a string, if present and not blank.
    pub fn scalar_string(&self, key: &str) -> Option<String> {
        self.cells
            .get(key)
            .and_then(Cell::scalar_string)
            .filter(|s| !s.trim().is_empty())
    }

    pub fn set(&mut self, key: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.insert(key.into(), cell.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Cell> {
        self.cells.remove(key)
    }

    pub fn row_type(&self) -> Option<&str> {
        self.text("type").map(str::trim)
    }

    /// `end_group`, `end_repeat`, `end_rank`...: these rows close a structure
    /// and never carry a name or a label.
    pub fn is_end_row(&self) -> bool {
        self.row_type().map_or(false, |t| t.starts_with("end_"))
    }

    /// The name the rest of the form refers to this row by: the derived name
    /// when there is one, the declared name otherwise.
    pub fn effective_name(&self) -> Option<String> {
        self.scalar_string(AUTONAME_KEY)
            .or_else(|| self.scalar_string("name"))
    }

    /// Same as `effective_name`, for choices.
    pub fn effective_value(&self) -> Option<String> {
        self.scalar_string(AUTOVALUE_KEY)
            .or_else(|| self.scalar_string("name"))
    }

    pub fn cells(&self) -> &BTreeMap<String, Cell> {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut BTreeMap<String, Cell> {
        &mut self.cells
    }

    pub fn into_cells(self) -> BTreeMap<String, Cell> {
        self.cells
    }

    /// All the localized columns of this row, by column name.
    pub fn localized(&self) -> impl Iterator<Item = (&str, &[Option<String>])> {
        self.cells.iter().filter_map(|(k, v)| match v {
            Cell::Localized(values) => Some((k.as_str(), values.as_slice())),
            _ => None,
        })
    }

    pub fn localized_mut(&mut self) -> impl Iterator<Item = &mut Vec<Option<String>>> {
        self.cells.values_mut().filter_map(|v| match v {
            Cell::Localized(values) => Some(values),
            _ => None,
        })
    }

    /// Forgets that this row went through kuid assignment. The kuid itself is kept.
    pub fn into_draft(self) -> DraftRow {
        Row {
            id: Unidentified(self.id.kuid().cloned()),
            cells: self.cells,
        }
    }
}

impl<S: IdState> Serialize for Row<S> {
    fn serialize<Z: Serializer>(&self, serializer: Z) -> Result<Z::Ok, Z::Error> {
        let len = self.cells.len() + usize::from(self.kuid().is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(kuid) = self.kuid() {
            map.serialize_entry(KUID_KEY, kuid)?;
        }
        for (k, v) in self.cells.iter() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Row<Unidentified> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Null cells are the same as missing cells.
        let raw: BTreeMap<String, Option<Cell>> = BTreeMap::deserialize(deserializer)?;
        let cells = raw
            .into_iter()
            .filter_map(|(k, v)| v.map(|c| (k, c)))
            .collect();
        Ok(Row::from_cells(cells))
    }
}

impl<'de> Deserialize<'de> for Row<Identified> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let draft = Row::<Unidentified>::deserialize(deserializer)?;
        match draft.id.0 {
            Some(kuid) => Ok(Row {
                id: Identified(kuid),
                cells: draft.cells,
            }),
            None => Err(de::Error::custom("row is missing its $kuid")),
        }
    }
}

/// The editable document of a form.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Row<S>: Serialize",
    deserialize = "Row<S>: Deserialize<'de>"
))]
pub struct Content<S: IdState = Identified> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default)]
    pub survey: Vec<Row<S>>,
    #[serde(default)]
    pub choices: Vec<Row<S>>,
    #[serde(default, deserialize_with = "deserialize_settings")]
    pub settings: BTreeMap<String, JSValue>,
    #[serde(default)]
    pub translations: Vec<Language>,
}

pub type DraftContent = Content<Unidentified>;

impl<S: IdState> Default for Content<S> {
    fn default() -> Self {
        Content {
            schema: None,
            survey: Vec::new(),
            choices: Vec::new(),
            settings: BTreeMap::new(),
            translations: Vec::new(),
        }
    }
}

impl<S: IdState> Content<S> {
    /// Survey rows then choice rows.
    pub fn rows(&self) -> impl Iterator<Item = &Row<S>> {
        self.survey.iter().chain(self.choices.iter())
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut Row<S>> {
        self.survey.iter_mut().chain(self.choices.iter_mut())
    }

    pub fn into_draft(self) -> DraftContent {
        Content {
            schema: self.schema,
            survey: self.survey.into_iter().map(Row::into_draft).collect(),
            choices: self.choices.into_iter().map(Row::into_draft).collect(),
            settings: self.settings,
            translations: self.translations,
        }
    }
}

// Older documents store the settings sheet as a list holding a single row.
fn deserialize_settings<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, JSValue>, D::Error> {
    match JSValue::deserialize(deserializer)? {
        JSValue::Null => Ok(BTreeMap::new()),
        JSValue::Object(m) => Ok(m.into_iter().collect()),
        JSValue::Array(rows) => match rows.into_iter().next() {
            Some(JSValue::Object(m)) => Ok(m.into_iter().collect()),
            None => Ok(BTreeMap::new()),
            Some(x) => Err(de::Error::custom(format!(
                "settings row must be an object, got {}",
                x
            ))),
        },
        x => Err(de::Error::custom(format!(
            "settings must be an object, got {}",
            x
        ))),
    }
}

/// Points at a row in error messages.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RowContext {
    /// Position in the sheet, starting at 0.
    pub index: usize,
    pub row_type: Option<String>,
    pub name: Option<String>,
}

impl RowContext {
    pub fn of<S: IdState>(index: usize, row: &Row<S>) -> RowContext {
        RowContext {
            index,
            row_type: row.row_type().map(str::to_string),
            name: row.effective_name(),
        }
    }
}

impl Display for RowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}", self.index + 1)?;
        match (&self.row_type, &self.name) {
            (Some(t), Some(n)) => write!(f, " ({} {:?})", t, n),
            (Some(t), None) => write!(f, " ({})", t),
            (None, Some(n)) => write!(f, " ({:?})", n),
            (None, None) => Ok(()),
        }
    }
}

// ******** Output data structures *********

/// The flattened structure handed to the XForm compiler: widgets expanded,
/// every row named, internal `$` columns removed.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct XlsForm {
    pub survey: Vec<BTreeMap<String, Cell>>,
    pub choices: Vec<BTreeMap<String, Cell>>,
    pub settings: BTreeMap<String, JSValue>,
    pub translations: Vec<Language>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kuid_round_trips_through_the_row_map() {
        let js = json!({"$kuid": "abc123", "type": "text", "label": ["Name", null]});
        let row: Row<Identified> = serde_json::from_value(js.clone()).unwrap();
        assert_eq!(row.kuid(), Some(&Kuid::new("abc123")));
        assert!(!row.contains(KUID_KEY));
        assert_eq!(
            row.get("label"),
            Some(&Cell::Localized(vec![Some("Name".to_string()), None]))
        );
        assert_eq!(serde_json::to_value(&row).unwrap(), js);
    }

    #[test]
    fn identified_rows_require_a_kuid() {
        let res: Result<Row<Identified>, _> = serde_json::from_value(json!({"type": "text"}));
        assert!(res.is_err());
        let draft: DraftRow = serde_json::from_value(json!({"type": "text"})).unwrap();
        assert_eq!(draft.kuid(), None);
    }

    #[test]
    fn null_cells_are_dropped() {
        let row: DraftRow =
            serde_json::from_value(json!({"type": "note", "hint": null, "required": false}))
                .unwrap();
        assert!(!row.contains("hint"));
        assert_eq!(row.get("required"), Some(&Cell::Bool(false)));
    }

    #[test]
    fn settings_accept_the_list_form() {
        let content: DraftContent = serde_json::from_value(json!({
            "survey": [],
            "settings": [{"form_title": "Household"}]
        }))
        .unwrap();
        assert_eq!(content.settings.get("form_title"), Some(&json!("Household")));
    }

    #[test]
    fn first_text_skips_blank_translations() {
        let c = Cell::Localized(vec![None, Some(" ".to_string()), Some("Age".to_string())]);
        assert_eq!(c.first_text(), Some("Age"));
        assert_eq!(Cell::Text("".to_string()).first_text(), None);
    }

    #[test]
    fn row_context_display() {
        let row = DraftRow::new()
            .with("type", "begin_rank")
            .with("name", "fav");
        assert_eq!(
            RowContext::of(3, &row).to_string(),
            "row 4 (begin_rank \"fav\")"
        );
    }
}
