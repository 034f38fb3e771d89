use std::collections::BTreeMap;

use serde::Serialize;

use super::Statement;

/// JSON view of a statement as emitted by `spirallogic parse` and `run --json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementAst {
    /// `family.verb`.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub args: BTreeMap<String, String>,
    pub anchors: Vec<String>,
    pub voice: Option<String>,
    pub bandwidth: Option<String>,
    pub memory_pack: Vec<String>,
    /// Set once the statement has been audited.
    pub hashbrown: Option<String>,
}

impl StatementAst {
    pub fn new(statement: &Statement) -> Self {
        Self {
            kind: statement.keyword(),
            name: statement.subject.clone(),
            args: statement.args.clone(),
            anchors: statement.anchors.iter().map(ToString::to_string).collect(),
            voice: statement.voice.as_ref().map(ToString::to_string),
            bandwidth: statement.bandwidth.map(|b| b.to_string()),
            memory_pack: statement.memory_refs.iter().map(|c| format!("card:{c}")).collect(),
            hashbrown: None,
        }
    }

    pub fn with_hashbrown(mut self, hashbrown: impl Into<String>) -> Self {
        self.hashbrown = Some(hashbrown.into());
        self
    }
}
