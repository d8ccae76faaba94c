use serde::Serialize;

use crate::config::AuthorMode;

/// One entry of the structured author list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorEntry {
    pub name: String,
    pub is_primary: bool,
}

/// Author representation of a proposal. Serialised under `proposer_name`
/// for the name forms and under `proposers` for the structured list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Authors {
    #[serde(rename = "proposer_name")]
    Name(String),
    #[serde(rename = "proposers")]
    Structured(Vec<AuthorEntry>),
}

impl Authors {
    pub fn field_name(&self) -> &'static str {
        match self {
            Authors::Name(_) => "proposer_name",
            Authors::Structured(_) => "proposers",
        }
    }
}

pub fn aggregate_authors<S: AsRef<str>>(primary: &str, contributors: &[S], mode: AuthorMode) -> Authors {
    match mode {
        AuthorMode::Single => Authors::Name(primary.to_string()),
        AuthorMode::Merged => {
            let names: Vec<&str> = std::iter::once(primary)
                .chain(contributors.iter().map(AsRef::as_ref))
                .collect();
            Authors::Name(names.join(", "))
        }
        AuthorMode::Structured => {
            let mut entries = Vec::with_capacity(contributors.len() + 1);
            entries.push(AuthorEntry {
                name: primary.to_string(),
                is_primary: true,
            });
            entries.extend(contributors.iter().map(|c| AuthorEntry {
                name: c.as_ref().to_string(),
                is_primary: false,
            }));
            Authors::Structured(entries)
        }
    }
}
