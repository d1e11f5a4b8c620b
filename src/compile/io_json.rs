use crate::compile::*;

use std::fs;

/// Reads a content document. The document may also be wrapped in an object
/// under the `content` key, the way the form service exports assets.
pub fn read_content(path: &str) -> CompileResult<DraftContent> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    if let Some(inner) = js.get_mut("content") {
        if inner.is_object() {
            debug!("read_content: unwrapping the content of {}", simplify_file_name(path));
            js = inner.take();
        }
    }
    let content: DraftContent = serde_json::from_value(js).context(ParsingJsonSnafu { path })?;
    info!(
        "read_content: {}: {} survey rows, {} choices, translations {:?}",
        simplify_file_name(path),
        content.survey.len(),
        content.choices.len(),
        content.translations
    );
    Ok(content)
}

pub fn write_output(pretty_js: &str, path: Option<&str>) -> CompileResult<()> {
    match path {
        None | Some("") | Some("stdout") => {
            println!("{}", pretty_js);
        }
        Some(p) => {
            debug!("write_output: writing to {}", p);
            fs::write(p, pretty_js).context(WritingOutputSnafu { path: p })?;
        }
    }
    Ok(())
}
