use crate::compile::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::fs;
use std::path::Path;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputSettings {
    pub provider: Option<String>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "previousFilePath")]
    pub previous_file_path: Option<String>,
    #[serde(rename = "surveyWorksheetName")]
    pub survey_worksheet_name: Option<String>,
    #[serde(rename = "choicesWorksheetName")]
    pub choices_worksheet_name: Option<String>,
    #[serde(rename = "settingsWorksheetName")]
    pub settings_worksheet_name: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
    #[serde(rename = "outputType")]
    pub output_type: Option<String>,
}

/// The rules as written in the configuration file. Numbers may be written as
/// strings.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(rename = "nameCharacterLimit")]
    pub name_character_limit: Option<JSValue>,
    #[serde(rename = "incrementorPadding")]
    pub incrementor_padding: Option<JSValue>,
    #[serde(rename = "kuidLength")]
    pub kuid_length: Option<JSValue>,
    #[serde(rename = "maxRenameAttempts")]
    pub max_rename_attempts: Option<JSValue>,
}

#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileConfig {
    #[serde(rename = "inputSettings", default)]
    pub input_settings: InputSettings,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub rules: RulesConfig,
    /// The new list of translations, if it differs from the one in the input.
    pub translations: Option<Vec<Language>>,
}

/// Reads a configuration file. Relative input paths are resolved against the
/// directory of the configuration file.
pub fn read_config(path: &str) -> CompileResult<CompileConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: CompileConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    let root = Path::new(path).parent().context(MissingParentDirSnafu { path })?;
    config.input_settings.file_path = config
        .input_settings
        .file_path
        .map(|p| resolve(root, &p));
    config.input_settings.previous_file_path = config
        .input_settings
        .previous_file_path
        .map(|p| resolve(root, &p));
    debug!("read_config: {:?}", config);
    Ok(config)
}

fn resolve(root: &Path, path: &str) -> String {
    if Path::new(path).is_absolute() {
        path.to_string()
    } else {
        root.join(path).to_string_lossy().to_string()
    }
}

pub fn read_reference(path: &str) -> CompileResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

pub fn validate_rules(rules: &RulesConfig) -> CompileResult<SaveRules> {
    let defaults = SaveRules::DEFAULT_RULES;
    let res = SaveRules {
        name_character_limit: read_js_int(&rules.name_character_limit, "nameCharacterLimit")?
            .unwrap_or(defaults.name_character_limit),
        incrementor_padding: read_js_int(&rules.incrementor_padding, "incrementorPadding")?
            .unwrap_or(defaults.incrementor_padding),
        kuid_length: read_js_int(&rules.kuid_length, "kuidLength")?.unwrap_or(defaults.kuid_length),
        max_rename_attempts: match read_js_int(&rules.max_rename_attempts, "maxRenameAttempts")? {
            Some(x) => match u32::try_from(x) {
                Ok(x) => x,
                Err(_) => whatever!("maxRenameAttempts is too large: {}", x),
            },
            None => defaults.max_rename_attempts,
        },
    };
    Ok(res)
}

fn read_js_int(x: &Option<JSValue>, field: &str) -> CompileResult<Option<usize>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| Some(x as usize))
            .context(ParsingJsonNumberSnafu { field }),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .map(Some)
            .context(ParsingJsonNumberSnafu { field }),
        _ => None.context(ParsingJsonNumberSnafu { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rules_accept_numbers_and_strings() {
        let rules: RulesConfig = serde_json::from_value(json!({
            "nameCharacterLimit": "30",
            "incrementorPadding": 2
        }))
        .unwrap();
        let rules = validate_rules(&rules).unwrap();
        assert_eq!(rules.name_character_limit, 30);
        assert_eq!(rules.incrementor_padding, 2);
        assert_eq!(rules.kuid_length, SaveRules::DEFAULT_RULES.kuid_length);
    }

    #[test]
    fn rules_reject_garbage() {
        let rules: RulesConfig =
            serde_json::from_value(json!({"kuidLength": "nine"})).unwrap();
        assert!(matches!(
            validate_rules(&rules),
            Err(CompileError::ParsingJsonNumber { .. })
        ));
    }

    #[test]
    fn config_paths_are_relative_to_the_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data/household_config.json");
        let config = read_config(path).unwrap();
        let input = config.input_settings.file_path.unwrap();
        assert!(input.ends_with("tests/data/household.json"));
        assert!(Path::new(&input).exists());
        assert_eq!(config.output_settings.output_type.as_deref(), Some("content"));
        assert_eq!(
            config.translations,
            Some(vec![
                Some("English (en)".to_string()),
                None,
                Some("Français (fr)".to_string())
            ])
        );
    }
}
