use kobo_content::Language;
use std::path::Path;

/// The file name without its directories, for the logs.
pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

pub fn infer_provider(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") => "xlsx",
        _ => "json",
    }
}

/// Translation names as written on the command line. '-' and 'null' stand
/// for the unnamed translation.
pub fn parse_translations(names: &[String]) -> Vec<Language> {
    names
        .iter()
        .map(|s| match s.trim() {
            "-" | "null" => None,
            x => Some(x.to_string()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn providers() {
        assert_eq!(infer_provider("forms/household.XLSX"), "xlsx");
        assert_eq!(infer_provider("household.json"), "json");
        assert_eq!(infer_provider("household"), "json");
    }

    #[test]
    fn translation_names() {
        let names = vec!["English (en)".to_string(), "-".to_string(), " null".to_string()];
        assert_eq!(
            parse_translations(&names),
            vec![Some("English (en)".to_string()), None, None]
        );
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/data/form.json"), "form.json");
        assert_eq!(simplify_file_name(""), "");
    }
}
