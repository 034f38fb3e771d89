//! Safety anchors: the session grant set and the intent policy that gates dispatch.
//!
//! Grants are monotonic for the life of a session. There is no revoke statement;
//! only [`SessionAnchorState::clear`] (session reset) drops them. Containment is
//! tracked separately because it can be cleared by the surrounding shell without
//! touching the other grants.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::syntax::{AnchorKind, AnchorMode, AnchorRef, Family, IntentTag, Statement};

/// A statement's required anchors were not all granted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required anchors: {}", AnchorList(.missing))]
pub struct AnchorError {
    pub missing: BTreeSet<AnchorRef>,
}

struct AnchorList<'a>(&'a BTreeSet<AnchorRef>);

impl fmt::Display for AnchorList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

/// Anchors currently granted to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionAnchorState {
    granted: BTreeSet<AnchorRef>,
    containment: bool,
}

impl SessionAnchorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a grant. Returns false if an identical anchor was already granted.
    pub fn grant(&mut self, anchor: AnchorRef) -> bool {
        self.granted.insert(anchor)
    }

    pub fn granted(&self) -> &BTreeSet<AnchorRef> {
        &self.granted
    }

    /// True when some grant satisfies `required`.
    pub fn satisfies(&self, required: &AnchorRef) -> bool {
        self.granted.iter().any(|g| g.satisfies(required))
    }

    pub fn containment_active(&self) -> bool {
        self.containment
    }

    pub fn engage_containment(&mut self) {
        self.containment = true;
    }

    pub fn clear_containment(&mut self) {
        self.containment = false;
    }

    /// Drop every grant and leave containment. Used on session reset.
    pub fn clear(&mut self) {
        self.granted.clear();
        self.containment = false;
    }
}

/// Intent tag → required anchors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorPolicy {
    table: BTreeMap<IntentTag, BTreeSet<AnchorRef>>,
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        let consent = AnchorRef::new(AnchorKind::Consent, AnchorMode::Explicit);
        let review = AnchorRef::new(AnchorKind::Review, AnchorMode::Human);
        let mut table = BTreeMap::new();
        table.insert(IntentTag::Healing, BTreeSet::from([consent]));
        table.insert(IntentTag::Therapeutic, BTreeSet::from([consent]));
        table.insert(IntentTag::Crisis, BTreeSet::from([consent, review]));
        table.insert(IntentTag::General, BTreeSet::new());
        Self { table }
    }
}

impl AnchorPolicy {
    pub fn empty() -> Self {
        Self { table: BTreeMap::new() }
    }

    /// Builder-style helper to set the requirement for one intent tag.
    pub fn with_rule(
        mut self,
        tag: IntentTag,
        anchors: impl IntoIterator<Item = AnchorRef>,
    ) -> Self {
        self.table.insert(tag, anchors.into_iter().collect());
        self
    }

    /// Requirement for a tag. Tags without a rule require nothing.
    pub fn required(&self, tag: IntentTag) -> BTreeSet<AnchorRef> {
        self.table.get(&tag).cloned().unwrap_or_default()
    }
}

/// Validates statements against the session grant set and applies anchor statements.
#[derive(Debug, Clone, Default)]
pub struct AnchorEngine {
    policy: AnchorPolicy,
}

impl AnchorEngine {
    pub fn new(policy: AnchorPolicy) -> Self {
        Self { policy }
    }

    /// Everything `statement` needs granted before it may proceed.
    ///
    /// Anchor statements grant rather than require, so they need nothing. The
    /// intent policy only gates dispatching statements; `ritual.complete` and
    /// `ritual.fail` need just the anchors they declare.
    pub fn required_for(&self, statement: &Statement) -> BTreeSet<AnchorRef> {
        if statement.family == Family::Anchor {
            return BTreeSet::new();
        }
        let mut required = match statement.intent {
            Some(tag) if statement.is_dispatch() => self.policy.required(tag),
            _ => BTreeSet::new(),
        };
        required.extend(statement.anchors.iter().copied());
        required
    }

    pub fn check(
        &self,
        statement: &Statement,
        state: &SessionAnchorState,
    ) -> Result<(), AnchorError> {
        let missing: BTreeSet<AnchorRef> = self
            .required_for(statement)
            .into_iter()
            .filter(|required| !state.satisfies(required))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnchorError { missing })
        }
    }

    /// Apply an `anchor.require` / `anchor.engage` statement. Returns the newly granted anchors.
    pub fn apply(&self, statement: &Statement, state: &mut SessionAnchorState) -> Vec<AnchorRef> {
        if statement.family != Family::Anchor {
            return Vec::new();
        }
        let granted: Vec<AnchorRef> =
            statement.anchors.iter().copied().filter(|a| state.grant(*a)).collect();
        if statement.engages_containment() && !state.containment_active() {
            state.engage_containment();
            info!("safe containment engaged");
        }
        granted
    }
}
