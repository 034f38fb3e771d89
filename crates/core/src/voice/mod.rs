//! Voice routing: persona tokens → opaque handles for the external responder.
//!
//! The router only validates personas against the configured allow-set. While
//! containment is active every resolution yields the containment handle, and
//! the handle records that it was substituted so the audit trail can show it.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::anchors::SessionAnchorState;
use crate::syntax::PersonaRef;

mod responder;

pub use responder::{ScriptedResponder, VoiceResponder};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown persona '{persona}'")]
pub struct UnknownPersonaError {
    pub persona: String,
}

/// Handle passed to the voice responder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceHandle {
    /// Handle name: the persona token, or the containment handle.
    pub name: String,
    /// Persona the statement asked for.
    pub requested: PersonaRef,
    /// True when containment replaced the requested persona.
    pub substituted: bool,
}

impl fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct VoiceRouter {
    personas: BTreeSet<PersonaRef>,
    containment_handle: String,
}

impl VoiceRouter {
    pub fn new(
        personas: impl IntoIterator<Item = PersonaRef>,
        containment_handle: impl Into<String>,
    ) -> Self {
        Self {
            personas: personas.into_iter().collect(),
            containment_handle: containment_handle.into(),
        }
    }

    pub fn personas(&self) -> &BTreeSet<PersonaRef> {
        &self.personas
    }

    pub fn containment_handle(&self) -> &str {
        &self.containment_handle
    }

    /// Check a persona against the allow-set without routing it.
    pub fn validate(&self, persona: &PersonaRef) -> Result<(), UnknownPersonaError> {
        if self.personas.contains(persona) {
            Ok(())
        } else {
            Err(UnknownPersonaError { persona: persona.to_string() })
        }
    }

    /// Resolve a persona to a handle, substituting the containment handle when
    /// containment is active.
    pub fn resolve(
        &self,
        persona: &PersonaRef,
        anchors: &SessionAnchorState,
    ) -> Result<VoiceHandle, UnknownPersonaError> {
        if anchors.containment_active() {
            debug!(
                requested = %persona,
                handle = %self.containment_handle,
                "containment substitution"
            );
            return Ok(VoiceHandle {
                name: self.containment_handle.clone(),
                requested: persona.clone(),
                substituted: true,
            });
        }
        self.validate(persona)?;
        Ok(VoiceHandle {
            name: persona.to_string(),
            requested: persona.clone(),
            substituted: false,
        })
    }
}
