use clap::Parser;

/// Saves and compiles KoBo questionnaire content into XLSForm structures.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the job. See the manual of the kobo_content
    /// crate for the format. The other arguments override what it specifies.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference output in JSON format. If provided, koboform will check that
    /// its output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) Where the output is written in JSON format.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) The proposed content: a content JSON document or an XLSForm workbook.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (json or xlsx, guessed from the extension by default) The type of the input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (file path, optional) The content currently stored, in JSON format. Its translations are
    /// the ones the input is aligned with.
    #[clap(short, long, value_parser)]
    pub previous: Option<String>,

    /// (list of comma-separated values or not specified) The new list of translations. Use '-' for
    /// the unnamed translation.
    #[clap(long, value_parser, value_delimiter = ',')]
    pub translations: Option<Vec<String>>,

    /// (xlsform (default) or content) What to write: the compiled form or the saved content.
    #[clap(long, value_parser)]
    pub output_type: Option<String>,

    /// (default survey) When using an Excel file, the name of the worksheet holding the survey.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
