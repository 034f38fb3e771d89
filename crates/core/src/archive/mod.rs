//! Archive accessor: resolves memory-card references through an external archive.
//!
//! The accessor owns the selector contract, not the lookup itself:
//! - results come back in request order, each reference's cards in the order the
//!   archive reported them;
//! - bounded selectors (`latest-N`, `top-K-relevant`) never yield more than the bound;
//! - a literal id that matches nothing is a [`NotFoundError`], while a selector
//!   that matches nothing yields no cards.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{DispatchError, RitualError};
use crate::syntax::CardRef;

mod memory;

pub use memory::InMemoryArchive;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("memory card '{card}' not found")]
pub struct NotFoundError {
    pub card: String,
}

/// One stored memory card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    pub id: String,
    pub topic: String,
    pub content: String,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl CardRecord {
    pub fn new(
        id: impl Into<String>,
        topic: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A card together with the reference that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedCard {
    pub requested: CardRef,
    pub card: CardRecord,
}

/// External memory store.
///
/// `topic` is the dispatching statement's topic; archives use it for the
/// relevance selectors and may ignore it otherwise.
pub trait MemoryArchive {
    fn lookup(&self, selector: &CardRef, topic: &str) -> Result<Vec<CardRecord>, DispatchError>;
}

/// Relevance score of a card for a topic: the number of topic words found in the
/// card's topic or content. Shared by the bundled archives.
pub fn relevance(card: &CardRecord, topic: &str) -> usize {
    let haystack = format!("{} {}", card.topic, card.content).to_lowercase();
    topic_words(topic).filter(|word| haystack.contains(word.as_str())).count()
}

fn topic_words(topic: &str) -> impl Iterator<Item = String> + '_ {
    topic
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
}

/// Rank `cards` by relevance, dropping irrelevant ones. Ties keep input order.
pub fn rank_by_relevance(cards: Vec<CardRecord>, topic: &str) -> Vec<CardRecord> {
    let mut scored: Vec<(usize, CardRecord)> = cards
        .into_iter()
        .map(|card| (relevance(&card, topic), card))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, card)| card).collect()
}

pub struct ArchiveAccessor<'a> {
    archive: &'a dyn MemoryArchive,
}

impl<'a> ArchiveAccessor<'a> {
    pub fn new(archive: &'a dyn MemoryArchive) -> Self {
        Self { archive }
    }

    pub fn resolve(
        &self,
        refs: &[CardRef],
        topic: &str,
    ) -> Result<Vec<ResolvedCard>, RitualError> {
        let mut resolved = Vec::new();
        for card_ref in refs {
            let mut cards = self.archive.lookup(card_ref, topic)?;
            if let CardRef::Id(id) = card_ref {
                if cards.is_empty() {
                    return Err(NotFoundError { card: id.clone() }.into());
                }
            }
            if let Some(limit) = card_ref.limit() {
                if cards.len() > limit {
                    warn!(
                        selector = %card_ref,
                        returned = cards.len(),
                        limit,
                        "archive returned more cards than requested; truncating"
                    );
                    cards.truncate(limit);
                }
            }
            debug!(selector = %card_ref, count = cards.len(), "resolved memory reference");
            resolved.extend(
                cards.into_iter().map(|card| ResolvedCard { requested: card_ref.clone(), card }),
            );
        }
        Ok(resolved)
    }
}
