use log::{debug, info, warn};

use kobo_content::builder::Pipeline;
use kobo_content::*;
use snafu::{prelude::*, Snafu};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::compile::config_reader::*;
use crate::compile::io_common::*;

pub mod config_reader;
pub mod io_common;
pub mod io_json;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CompileError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Missing worksheet {name} in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON in {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Expected a positive integer for {field}"))]
    ParsingJsonNumber { field: String },
    #[snafu(display("Error serializing the output"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("No input file (use --input or inputSettings.filePath)"))]
    MissingInput {},
    #[snafu(display("Error processing {path}: {source}"))]
    Processing { source: ContentError, path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CompileResult<T> = Result<T, CompileError>;

/// The configuration file, if any, with the command line arguments applied on top.
pub fn build_config(args: &Args) -> CompileResult<CompileConfig> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => CompileConfig::default(),
    };
    if let Some(x) = &args.input {
        config.input_settings.file_path = Some(x.clone());
    }
    if let Some(x) = &args.input_type {
        config.input_settings.provider = Some(x.clone());
    }
    if let Some(x) = &args.previous {
        config.input_settings.previous_file_path = Some(x.clone());
    }
    if let Some(x) = &args.excel_worksheet_name {
        config.input_settings.survey_worksheet_name = Some(x.clone());
    }
    if let Some(x) = &args.out {
        config.output_settings.output_path = Some(x.clone());
    }
    if let Some(x) = &args.output_type {
        config.output_settings.output_type = Some(x.clone());
    }
    if let Some(x) = &args.translations {
        config.translations = Some(parse_translations(x));
    }
    Ok(config)
}

pub fn read_input(config: &CompileConfig) -> CompileResult<DraftContent> {
    let input = config
        .input_settings
        .file_path
        .clone()
        .context(MissingInputSnafu {})?;
    let provider = config
        .input_settings
        .provider
        .clone()
        .unwrap_or_else(|| infer_provider(&input).to_string());
    info!("read_input: reading {} as {}", simplify_file_name(&input), provider);
    let mut proposed = match provider.as_str() {
        "json" => io_json::read_content(&input)?,
        "xlsx" => io_xlsx::read_xlsform(&input, &config.input_settings)?,
        x => whatever!("Unknown input type {:?} (expected json or xlsx)", x),
    };
    if let Some(translations) = &config.translations {
        proposed.translations = translations.clone();
    }
    Ok(proposed)
}

/// Runs the pipeline described by the configuration and returns the output document.
pub fn compile_content(config: &CompileConfig) -> CompileResult<JSValue> {
    let rules = validate_rules(&config.rules)?;
    let proposed = read_input(config)?;
    let path = config.input_settings.file_path.clone().unwrap_or_default();
    let previous: Option<DraftContent> = match &config.input_settings.previous_file_path {
        Some(p) => Some(io_json::read_content(p)?),
        None => None,
    };
    debug!(
        "compile_content: previous translations: {:?}",
        previous.as_ref().map(|p| &p.translations)
    );

    let mut pipeline = Pipeline::new(&rules).context(ProcessingSnafu { path: path.clone() })?;
    let output_type = config
        .output_settings
        .output_type
        .as_deref()
        .unwrap_or("xlsform");
    let js = match output_type {
        "content" => {
            let saved = pipeline
                .save(&proposed, previous.as_ref())
                .context(ProcessingSnafu { path })?;
            serde_json::to_value(&saved).context(SerializingJsonSnafu {})?
        }
        "xlsform" => {
            let compiled = pipeline
                .compile(&proposed, previous.as_ref())
                .context(ProcessingSnafu { path })?;
            serde_json::to_value(&compiled.xlsform).context(SerializingJsonSnafu {})?
        }
        x => whatever!("Unknown output type {:?} (expected xlsform or content)", x),
    };
    Ok(js)
}

pub fn run(args: &Args) -> CompileResult<()> {
    let config = build_config(args)?;
    info!("config: {:?}", config);
    let js = compile_content(&config)?;
    let pretty_js = serde_json::to_string_pretty(&js).context(SerializingJsonSnafu {})?;
    io_json::write_output(&pretty_js, config.output_settings.output_path.as_deref())?;

    // The reference output, if provided for comparison
    if let Some(reference_p) = &args.reference {
        check_reference(reference_p, &pretty_js)?;
    }
    Ok(())
}

pub fn check_reference(path: &str, pretty_js: &str) -> CompileResult<()> {
    let reference = read_reference(path)?;
    let pretty_js_ref = serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
    if pretty_js_ref != pretty_js {
        warn!("Found differences with the reference output");
        print_diff(pretty_js_ref.as_str(), pretty_js, "\n");
        whatever!("Difference detected between the output and the reference {}", path)
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn data_path(name: &str) -> String {
        format!("{}/tests/data/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn json_config(output_type: &str) -> CompileConfig {
        CompileConfig {
            input_settings: InputSettings {
                file_path: Some(data_path("household.json")),
                ..Default::default()
            },
            output_settings: OutputSettings {
                output_type: Some(output_type.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn rows<'a>(js: &'a JSValue, sheet: &str) -> &'a Vec<JSValue> {
        js[sheet].as_array().unwrap()
    }

    fn find<'a>(js: &'a JSValue, name: &str) -> &'a JSValue {
        rows(js, "survey")
            .iter()
            .find(|r| r["name"] == name)
            .unwrap_or_else(|| panic!("no row named {}", name))
    }

    #[test]
    fn household_form_compiles() {
        let _ = env_logger::builder().is_test(true).try_init();
        let js = compile_content(&json_config("xlsform")).unwrap();
        let survey = rows(&js, "survey");

        let mut names = HashSet::new();
        for row in survey {
            let obj = row.as_object().unwrap();
            assert!(obj.keys().all(|k| !k.starts_with('$')), "{:?}", row);
            let t = row["type"].as_str().unwrap();
            assert!(!t.contains("rank") && !t.contains("score") && !t.contains("kobomatrix"));
            if let Some(name) = row["name"].as_str() {
                assert!(names.insert(name.to_lowercase()), "duplicate name {}", name);
            } else {
                assert!(t.starts_with("end_"), "{:?}", row);
            }
            for value in obj.values() {
                if let Some(values) = value.as_array() {
                    assert_eq!(values.len(), 2, "{:?}", row);
                }
            }
        }

        assert_eq!(
            find(&js, "Name_of_the_head_of_household")["type"],
            "text"
        );
        assert_eq!(
            find(&js, "second")["constraint"],
            "${second} != ${first}"
        );
        assert_eq!(find(&js, "water")["required"], "true");
        let school = find(&js, "people_children_school");
        assert_eq!(school["relevant"], "${people_children_count} > 0");
        assert_eq!(school["appearance"], "w1 list-nolabel");
        assert_eq!(find(&js, "people")["appearance"], "w4");
        assert_eq!(
            find(&js, "people_header_count")["label"][1],
            "##### Nombre"
        );
        assert_eq!(js["settings"]["form_title"], "Household survey");
    }

    #[test]
    fn adding_a_translation_from_the_config() {
        let config = read_config(&data_path("household_config.json")).unwrap();
        let js = compile_content(&config).unwrap();
        assert_eq!(
            js["translations"],
            serde_json::json!(["English (en)", null, "Français (fr)"])
        );
        let first = &rows(&js, "survey")[0];
        assert_eq!(
            first["label"],
            serde_json::json!([
                "Name of the head of household",
                "Name of the head of household",
                "Nom du chef de ménage"
            ])
        );
        assert!(first["$kuid"].is_string());
        assert_eq!(first["$autoname"], "Name_of_the_head_of_household");
    }

    #[test]
    fn unsupported_translation_edits_fail() {
        let mut config = json_config("content");
        config.input_settings.previous_file_path = Some(data_path("household.json"));
        config.translations = Some(vec![Some("Français (fr)".to_string())]);
        match compile_content(&config) {
            Err(CompileError::Processing {
                source: ContentError::UnsupportedTranslationChange { .. },
                ..
            }) => {}
            x => panic!("unexpected result {:?}", x),
        }
    }

    #[test]
    fn unknown_output_type() {
        assert!(compile_content(&json_config("pdf")).is_err());
    }

    #[test]
    fn reference_check() {
        let path = data_path("household.json");
        let js = read_reference(&path).unwrap();
        let pretty_js = serde_json::to_string_pretty(&js).unwrap();
        assert!(check_reference(&path, &pretty_js).is_ok());
        assert!(check_reference(&path, "{}").is_err());
    }
}
