// ********* Configuration **********

use snafu::Snafu;

use crate::content::{Language, RowContext};
use crate::slug::SlugOptions;
use crate::translations::TranslationRule;
use crate::widgets::WidgetKind;

/// The knobs of the save pipeline.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SaveRules {
    /// Longest name the autonamer derives from a label. Longer names are
    /// shortened by keeping both ends.
    pub name_character_limit: usize,
    /// Width of the numeric suffix used to disambiguate names (`_001`).
    pub incrementor_padding: usize,
    /// Length of the kuids produced by the default random generator.
    pub kuid_length: usize,
    /// How many times a declared name may be re-slugified before giving up.
    pub max_rename_attempts: u32,
}

impl SaveRules {
    pub const DEFAULT_RULES: SaveRules = SaveRules {
        name_character_limit: 40,
        incrementor_padding: 3,
        kuid_length: 9,
        max_rename_attempts: 10,
    };

    /// The slug options used to turn labels into names.
    pub fn label_slug_options(&self) -> SlugOptions {
        SlugOptions {
            character_limit: Some(self.name_character_limit),
            incrementor_padding: self.incrementor_padding,
            ..SlugOptions::LABEL
        }
    }
}

impl Default for SaveRules {
    fn default() -> Self {
        SaveRules::DEFAULT_RULES
    }
}

// ********* Errors **********

/// Errors that prevent a save or an export from completing.
///
/// The whole operation fails: no partially transformed content is returned.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ContentError {
    #[snafu(display("the {kind} widget at {row} is missing the column {column:?}"))]
    MissingWidgetColumn {
        kind: WidgetKind,
        column: String,
        row: RowContext,
    },

    #[snafu(display("{row} is not allowed inside the {kind} widget opened at {opened_at}"))]
    UnexpectedWidgetRow {
        kind: WidgetKind,
        row: RowContext,
        opened_at: RowContext,
    },

    #[snafu(display("{row} opens a widget inside the {kind} widget opened at {opened_at}"))]
    NestedWidget {
        kind: WidgetKind,
        row: RowContext,
        opened_at: RowContext,
    },

    #[snafu(display("the {kind} widget opened at {opened_at} is never closed"))]
    UnterminatedWidget { kind: WidgetKind, opened_at: RowContext },

    #[snafu(display("{row} closes a {kind} widget that was never opened"))]
    UnmatchedWidgetEnd { kind: WidgetKind, row: RowContext },

    #[snafu(display("{row} can only appear inside a widget"))]
    StrayWidgetRow { row: RowContext },

    #[snafu(display("the matrix at {row} uses the choice list {list_name:?}, which has no choices"))]
    EmptyChoiceList { list_name: String, row: RowContext },

    #[snafu(display("could not find a unique name for {name:?} after {attempts} attempts"))]
    NameConvergence { name: String, attempts: u32 },

    #[snafu(display("{scope}: {rows} rows were named but only {unique} names are unique"))]
    NameCountMismatch {
        scope: String,
        rows: usize,
        unique: usize,
    },

    #[snafu(display("unsupported translation change ({rule}): {old:?} -> {new:?}"))]
    UnsupportedTranslationChange {
        rule: TranslationRule,
        old: Vec<Language>,
        new: Vec<Language>,
    },

    #[snafu(display("translation {language:?} is not one of {translations:?}"))]
    UnknownTranslation {
        language: Language,
        translations: Vec<Language>,
    },

    #[snafu(display(
        "{sheet} row {index}: column {column:?} has {found} values but there are {expected} translations"
    ))]
    MisalignedColumn {
        sheet: String,
        index: usize,
        column: String,
        expected: usize,
        found: usize,
    },

    #[snafu(display("invalid rules: {message}"))]
    InvalidRules { message: String },
}

pub type ContentResult<T> = Result<T, ContentError>;
