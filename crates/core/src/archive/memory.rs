use crate::archive::{rank_by_relevance, CardRecord, MemoryArchive};
use crate::error::DispatchError;
use crate::syntax::CardRef;

/// Vec-backed archive. Cards are kept in insertion order; `latest-N` walks
/// them newest first.
#[derive(Debug, Clone, Default)]
pub struct InMemoryArchive {
    cards: Vec<CardRecord>,
}

impl InMemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, card: CardRecord) {
        self.cards.push(card);
    }

    pub fn with_card(mut self, card: CardRecord) -> Self {
        self.insert(card);
        self
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl MemoryArchive for InMemoryArchive {
    fn lookup(&self, selector: &CardRef, topic: &str) -> Result<Vec<CardRecord>, DispatchError> {
        let cards = match selector {
            CardRef::Id(id) => self.cards.iter().filter(|c| &c.id == id).take(1).cloned().collect(),
            CardRef::Latest(n) => self.cards.iter().rev().take(*n).cloned().collect(),
            CardRef::TopicRelevant => rank_by_relevance(self.cards.clone(), topic),
            CardRef::TopRelevant(k) => {
                rank_by_relevance(self.cards.clone(), topic).into_iter().take(*k).collect()
            }
        };
        Ok(cards)
    }
}
