/*!

This is the long-form manual for `kobo_content` and `koboform`.

## The content document

Content is a JSON object with the sheets of an XLSForm:

```json
{
  "survey": [
    {"$kuid": "aX3kP0q9z", "type": "text", "name": "hh_head", "label": ["Head of household", "Chef de ménage"]}
  ],
  "choices": [
    {"$kuid": "bQ81mnz0a", "list_name": "yn", "name": "yes", "label": ["Yes", "Oui"]}
  ],
  "settings": {"form_title": "Household survey"},
  "translations": [null, "Français (fr)"]
}
```

* Array values are localized: one entry per translation, in the order of
  `translations`. `null` in `translations` is the unnamed (default) language.
* `$kuid` is the identity of a row. It survives renames and is kept from one
  save to the next.
* `$autoname` (survey) and `$autovalue` (choices) hold the names computed at
  save time. They are what the rest of the form refers to.

## Saving

Saving proposed content runs these stages:

1. standardize: `label::Français (fr)` columns become localized columns,
   `select one yn` becomes `select_one` with `select_from_list_name: yn`...
2. translations: if the list of translations changed since the last save, the
   localized columns are rewritten. The supported edits are: adding a language
   at the front, deleting the last one, renaming one, reordering. Anything else
   is rejected.
3. rows without a `type` (survey) or a `list_name` (choices) are dropped.
4. kuids are assigned to new rows.
5. names: valid and unique `name`s are kept, everything else gets a name
   derived from its label. Names are unique without regard to case.

## Widgets

Three composite question types are expanded when the form is compiled:

* `begin_rank` / `rank__level` / `end_rank`: each level selects one item of the
  `kobo--rank-items` list, and the same item cannot be selected twice. The
  `kobo--rank-constraint-message` column is shown when it is.
* `begin_score` / `score__row` / `end_score`: every row is a question answered
  with the `kobo--score-choices` list, displayed as a table.
* `begin_kobomatrix` / `end_kobomatrix`: one line per item of the
  `kobo--matrix_list` choice list, one column per row between the markers.
  Column widths come from `wN` appearances (2 by default). A reference such as
  `${count}` in a column expression is rewritten to the cell of the same line,
  `${matrix_item_count}`. The rewrite is textual: `${count` also matches the
  beginning of `${counter}`.

## Command line

```text
koboform --input form.xlsx --out form.json
koboform --input content.json --previous stored.json --output-type content
koboform --config job.json --reference expected.json
```

The configuration file uses the following format:

```json
{
  "inputSettings": {
    "provider": "xlsx",
    "filePath": "form.xlsx",
    "previousFilePath": "stored.json",
    "surveyWorksheetName": "survey"
  },
  "outputSettings": {"outputPath": "form.json", "outputType": "xlsform"},
  "rules": {"nameCharacterLimit": "40", "incrementorPadding": 3},
  "translations": [null, "Français (fr)"]
}
```

Command line arguments take precedence over the configuration file.
*/
