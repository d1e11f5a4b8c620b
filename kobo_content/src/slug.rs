//! Turning free text into node names.

use std::collections::HashSet;

use log::debug;

/// How a slug over the character limit is shortened.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum ShortenMethod {
    /// Keep the beginning.
    Truncate,
    /// Keep the beginning and the end, so that long labels differing only in
    /// their last words still produce different names.
    Ends,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct SlugOptions {
    pub join_with: char,
    pub lr_strip: bool,
    pub lower_case: bool,
    pub replace_non_word: bool,
    pub character_limit: Option<usize>,
    pub shorten_method: ShortenMethod,
    /// Prefix names starting with a digit with an underscore.
    pub valid_xml_tag: bool,
    pub incrementor_padding: usize,
}

impl SlugOptions {
    pub const DEFAULT: SlugOptions = SlugOptions {
        join_with: '_',
        lr_strip: true,
        lower_case: true,
        replace_non_word: true,
        character_limit: None,
        shorten_method: ShortenMethod::Truncate,
        valid_xml_tag: false,
        incrementor_padding: 3,
    };

    /// The options used when a name is derived from a label.
    pub const LABEL: SlugOptions = SlugOptions {
        lower_case: false,
        character_limit: Some(40),
        shorten_method: ShortenMethod::Ends,
        valid_xml_tag: true,
        ..SlugOptions::DEFAULT
    };
}

impl Default for SlugOptions {
    fn default() -> Self {
        SlugOptions::DEFAULT
    }
}

/// The names already taken in a scope. Comparison ignores case.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct UsedNames {
    names: HashSet<String>,
}

impl UsedNames {
    pub fn new() -> UsedNames {
        UsedNames::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(&name.to_lowercase())
    }

    /// Returns false if the name was already taken.
    pub fn claim(&mut self, name: &str) -> bool {
        self.names.insert(name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<T: AsRef<str>> FromIterator<T> for UsedNames {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        UsedNames {
            names: iter
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }
}

// Number of input bytes fed to the hash fallback.
const HASH_INPUT_BYTES: usize = 64;
const HASH_WIDTH: usize = 7;

/// Derives a name from `text` that is not in `used_names`.
///
/// The result is deterministic given the text, the used names and the options.
/// It does not claim the name: the caller decides when a name is taken.
pub fn slugify(text: &str, used_names: &UsedNames, options: &SlugOptions) -> String {
    let mut base = normalize(text, options);
    if base.is_empty() {
        base = hashed_name(text);
    }
    if let Some(limit) = options.character_limit {
        base = shorten(base, limit, options);
    }
    if options.valid_xml_tag && base.starts_with(|c: char| c.is_ascii_digit()) {
        base = format!("_{}", base);
    }
    let name = disambiguate(base, used_names, options);
    debug!("slugify: {:?} -> {:?}", text, name);
    name
}

/// Whether `name` can be used as an XML element name.
pub fn is_valid_xml_tag(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    }
}

/// Choice values may start with a digit but otherwise follow the name alphabet.
pub fn is_valid_choice_value(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

fn normalize(text: &str, options: &SlugOptions) -> String {
    let join = options.join_with;
    let mut s = if options.lr_strip {
        text.trim().to_string()
    } else {
        text.to_string()
    };
    if options.lower_case {
        s = s.to_lowercase();
    }
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        let replaced = if c.is_whitespace()
            || (options.replace_non_word && !(c.is_ascii_alphanumeric() || c == '_'))
        {
            join
        } else {
            c
        };
        if replaced == join && out.ends_with(join) {
            continue;
        }
        out.push(replaced);
    }
    out.trim_matches(join).to_string()
}

// Scripts with no ASCII word characters slugify to nothing.
fn hashed_name(text: &str) -> String {
    let mut end = text.len().min(HASH_INPUT_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let digest = sha256::digest(text[..end].to_string());
    format!("h{}", &digest[..HASH_WIDTH])
}

fn shorten(name: String, limit: usize, options: &SlugOptions) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= limit {
        return name;
    }
    match options.shorten_method {
        ShortenMethod::Truncate => chars[..limit].iter().collect(),
        ShortenMethod::Ends => {
            let keep = (limit / 2).saturating_sub(1).max(1);
            let head: String = chars[..keep].iter().collect();
            let tail: String = chars[chars.len() - keep..].iter().collect();
            format!("{}{}{}", head, options.join_with, tail)
        }
    }
}

fn disambiguate(base: String, used_names: &UsedNames, options: &SlugOptions) -> String {
    let mut candidate = base.clone();
    let mut counter: u64 = 0;
    while used_names.contains(&candidate) {
        counter += 1;
        candidate = format!(
            "{}{}{:0width$}",
            base,
            options.join_with,
            counter,
            width = options.incrementor_padding
        );
    }
    candidate
}
