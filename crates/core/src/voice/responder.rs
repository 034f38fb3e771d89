use std::collections::BTreeMap;

use crate::error::DispatchError;
use crate::voice::VoiceHandle;

/// External response generator. The interpreter never inspects the returned text.
pub trait VoiceResponder {
    fn respond(
        &self,
        handle: &VoiceHandle,
        args: &BTreeMap<String, String>,
    ) -> Result<String, DispatchError>;
}

/// Fixed acknowledgement per handle. Lets the CLI run programs end to end and
/// lets tests script collaborator failures.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    replies: BTreeMap<String, String>,
    failures: BTreeMap<String, DispatchError>,
}

impl ScriptedResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, handle: impl Into<String>, text: impl Into<String>) -> Self {
        self.replies.insert(handle.into(), text.into());
        self
    }

    /// Make every dispatch to `handle` fail with `error`.
    pub fn with_failure(mut self, handle: impl Into<String>, error: DispatchError) -> Self {
        self.failures.insert(handle.into(), error);
        self
    }
}

impl VoiceResponder for ScriptedResponder {
    fn respond(
        &self,
        handle: &VoiceHandle,
        _args: &BTreeMap<String, String>,
    ) -> Result<String, DispatchError> {
        if let Some(err) = self.failures.get(&handle.name) {
            return Err(err.clone());
        }
        Ok(self
            .replies
            .get(&handle.name)
            .cloned()
            .unwrap_or_else(|| format!("{} is present.", handle.name)))
    }
}
