use log::info;
use snafu::prelude::*;

pub use crate::config::*;
use crate::content::*;
use crate::kuid::{KuidSource, RandomKuids};
use crate::standardize::{AliasStandardizer, Standardizer};

/// Saved content and the form compiled from it.
#[derive(PartialEq, Debug, Clone)]
pub struct Compiled {
    pub content: Content,
    pub xlsform: XlsForm,
}

/// Runs the save pipeline with a given configuration.
///
/// By default, the content is standardized with the `AliasStandardizer` and
/// new rows get random kuids.
///
/// ```
/// pub use kobo_content::builder::Pipeline;
/// pub use kobo_content::kuid::SequentialKuids;
/// pub use kobo_content::{DraftContent, DraftRow, SaveRules};
/// # use kobo_content::ContentError;
///
/// let mut pipeline = Pipeline::new(&SaveRules::DEFAULT_RULES)?
///     .kuids(Box::new(SequentialKuids::new("k")))?;
///
/// let mut proposed = DraftContent::default();
/// proposed
///     .survey
///     .push(DraftRow::new().with("type", "text").with("label", "First name"));
///
/// let saved = pipeline.save(&proposed, None::<&DraftContent>)?;
/// assert_eq!(saved.survey[0].text("$autoname"), Some("First_name"));
///
/// let form = pipeline.to_xlsform(&saved)?;
/// assert_eq!(form.survey[0]["name"].as_text(), Some("First_name"));
///
/// # Ok::<(), ContentError>(())
/// ```
pub struct Pipeline {
    pub(crate) _rules: SaveRules,
    pub(crate) _standardizer: Box<dyn Standardizer>,
    pub(crate) _kuids: Box<dyn KuidSource>,
}

impl Pipeline {
    pub fn new(rules: &SaveRules) -> ContentResult<Pipeline> {
        ensure!(
            rules.name_character_limit >= 4,
            InvalidRulesSnafu {
                message: format!(
                    "name_character_limit must be at least 4, got {}",
                    rules.name_character_limit
                ),
            }
        );
        ensure!(
            rules.kuid_length > 0,
            InvalidRulesSnafu {
                message: "kuid_length must be positive",
            }
        );
        Ok(Pipeline {
            _rules: rules.clone(),
            _standardizer: Box::new(AliasStandardizer),
            _kuids: Box::new(RandomKuids::new(rules.kuid_length)),
        })
    }

    pub fn standardizer(self, standardizer: Box<dyn Standardizer>) -> ContentResult<Pipeline> {
        Ok(Pipeline {
            _standardizer: standardizer,
            ..self
        })
    }

    pub fn kuids(self, kuids: Box<dyn KuidSource>) -> ContentResult<Pipeline> {
        Ok(Pipeline {
            _kuids: kuids,
            ..self
        })
    }

    pub fn rules(&self) -> &SaveRules {
        &self._rules
    }

    /// Saves proposed content.
    ///
    /// previous: the content currently stored, if any. Its translations are
    /// the list the proposed rows are aligned with.
    pub fn save<S: IdState>(
        &mut self,
        proposed: &DraftContent,
        previous: Option<&Content<S>>,
    ) -> ContentResult<Content> {
        crate::save_content(
            proposed,
            previous.map(|p| p.translations.as_slice()),
            &self._rules,
            self._standardizer.as_ref(),
            self._kuids.as_mut(),
        )
    }

    /// Flattens saved content into the structure handed to the XForm compiler.
    pub fn to_xlsform(&mut self, content: &Content) -> ContentResult<XlsForm> {
        crate::export_xlsform(content, &self._rules, self._kuids.as_mut())
    }

    pub fn compile<S: IdState>(
        &mut self,
        proposed: &DraftContent,
        previous: Option<&Content<S>>,
    ) -> ContentResult<Compiled> {
        let content = self.save(proposed, previous)?;
        let xlsform = self.to_xlsform(&content)?;
        info!(
            "compile: {} saved rows, {} form rows",
            content.survey.len(),
            xlsform.survey.len()
        );
        Ok(Compiled { content, xlsform })
    }
}
