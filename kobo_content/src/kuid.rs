//! Row identities.

use std::collections::HashSet;

use log::{debug, info};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::content::{Content, IdState, Identified, Kuid, Row, Unidentified};

/// Hands out new kuids.
pub trait KuidSource {
    fn next_kuid(&mut self) -> Kuid;
}

/// Random alphanumeric tokens, the production source.
#[derive(Debug, Clone)]
pub struct RandomKuids {
    length: usize,
}

impl RandomKuids {
    pub fn new(length: usize) -> RandomKuids {
        RandomKuids { length }
    }
}

impl KuidSource for RandomKuids {
    fn next_kuid(&mut self) -> Kuid {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect();
        Kuid::new(token)
    }
}

/// `{prefix}0`, `{prefix}1`, ... for reproducible outputs.
#[derive(Debug, Clone)]
pub struct SequentialKuids {
    prefix: String,
    next: u64,
}

impl SequentialKuids {
    pub fn new(prefix: impl Into<String>) -> SequentialKuids {
        SequentialKuids {
            prefix: prefix.into(),
            next: 0,
        }
    }
}

impl KuidSource for SequentialKuids {
    fn next_kuid(&mut self) -> Kuid {
        let kuid = Kuid::new(format!("{}{}", self.prefix, self.next));
        self.next += 1;
        kuid
    }
}

/// Gives every row a kuid.
///
/// Kuids already present are kept. When several rows share a kuid, the first
/// one (survey before choices, then document order) keeps it and the others
/// get a fresh one.
pub fn assign_kuids(
    content: Content<Unidentified>,
    source: &mut dyn KuidSource,
) -> Content<Identified> {
    let reserved: HashSet<Kuid> = content.rows().filter_map(|r| r.kuid().cloned()).collect();
    let mut claimed: HashSet<Kuid> = HashSet::new();
    let mut issued: usize = 0;

    let mut identify = |row: Row<Unidentified>| -> Row<Identified> {
        let kuid = match row.kuid() {
            Some(k) if !claimed.contains(k) => k.clone(),
            previous => {
                if let Some(k) = previous {
                    debug!("assign_kuids: duplicate kuid {}", k);
                }
                let mut k = source.next_kuid();
                while reserved.contains(&k) || claimed.contains(&k) {
                    k = source.next_kuid();
                }
                issued += 1;
                k
            }
        };
        claimed.insert(kuid.clone());
        row.identify(kuid)
    };

    let survey: Vec<Row<Identified>> = content.survey.into_iter().map(&mut identify).collect();
    let choices: Vec<Row<Identified>> = content.choices.into_iter().map(&mut identify).collect();
    info!("assign_kuids: issued {} new kuids", issued);
    Content {
        schema: content.schema,
        survey,
        choices,
        settings: content.settings,
        translations: content.translations,
    }
}

/// The kuids of a content, in document order.
pub fn kuids<S: IdState>(content: &Content<S>) -> Vec<Kuid> {
    content.rows().filter_map(|r| r.kuid().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{DraftContent, DraftRow};

    fn draft(rows: Vec<DraftRow>) -> DraftContent {
        DraftContent {
            survey: rows,
            ..Default::default()
        }
    }

    #[test]
    fn existing_kuids_are_kept() {
        let rows = vec![
            DraftRow::from_cells(
                vec![("$kuid".to_string(), "keep".into())]
                    .into_iter()
                    .collect(),
            ),
            DraftRow::new().with("type", "text"),
        ];
        let content = assign_kuids(draft(rows), &mut SequentialKuids::new("k"));
        assert_eq!(kuids(&content), vec![Kuid::new("keep"), Kuid::new("k0")]);
    }

    #[test]
    fn duplicates_are_reissued() {
        let dup = DraftRow::from_cells(vec![("$kuid".to_string(), "k0".into())].into_iter().collect());
        let content = assign_kuids(
            draft(vec![dup.clone(), dup, DraftRow::new()]),
            &mut SequentialKuids::new("k"),
        );
        // k0 is reserved by the input, so the generator skips it.
        assert_eq!(
            kuids(&content),
            vec![Kuid::new("k0"), Kuid::new("k1"), Kuid::new("k2")]
        );
    }

    #[test]
    fn random_kuids_have_the_requested_length() {
        let mut source = RandomKuids::new(9);
        let a = source.next_kuid();
        assert_eq!(a.as_str().len(), 9);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, source.next_kuid());
    }
}
