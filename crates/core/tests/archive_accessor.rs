use spiral_core::archive::{
    rank_by_relevance, relevance, ArchiveAccessor, CardRecord, InMemoryArchive, MemoryArchive,
};
use spiral_core::error::{DispatchError, ErrorKind, RitualError};
use spiral_core::syntax::CardRef;

fn archive_with(count: usize) -> InMemoryArchive {
    let mut archive = InMemoryArchive::new();
    for n in 1..=count {
        archive.insert(CardRecord::new(format!("c{n}"), "daily", format!("entry {n}")));
    }
    archive
}

fn ids(cards: &[spiral_core::archive::ResolvedCard]) -> Vec<&str> {
    cards.iter().map(|c| c.card.id.as_str()).collect()
}

#[test]
fn latest_returns_newest_first_up_to_the_bound() {
    let archive = archive_with(5);
    let accessor = ArchiveAccessor::new(&archive);
    let cards = accessor.resolve(&[CardRef::Latest(3)], "").unwrap();
    assert_eq!(ids(&cards), ["c5", "c4", "c3"]);
}

#[test]
fn latest_with_fewer_cards_returns_what_exists() {
    let archive = archive_with(1);
    let accessor = ArchiveAccessor::new(&archive);
    let cards = accessor.resolve(&[CardRef::Latest(3)], "").unwrap();
    assert_eq!(ids(&cards), ["c1"]);
}

#[test]
fn missing_literal_id_is_not_found() {
    let archive = archive_with(2);
    let accessor = ArchiveAccessor::new(&archive);
    let err = accessor.resolve(&[CardRef::Id("ghost".into())], "").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "memory card 'ghost' not found");
}

#[test]
fn empty_selector_result_is_not_an_error() {
    let archive = InMemoryArchive::new();
    let accessor = ArchiveAccessor::new(&archive);
    let cards = accessor.resolve(&[CardRef::TopicRelevant, CardRef::Latest(2)], "grief").unwrap();
    assert!(cards.is_empty());
}

#[test]
fn results_keep_request_order() {
    let archive = archive_with(4);
    let accessor = ArchiveAccessor::new(&archive);
    let refs = [CardRef::Id("c2".into()), CardRef::Latest(1), CardRef::Id("c1".into())];
    let cards = accessor.resolve(&refs, "").unwrap();
    assert_eq!(ids(&cards), ["c2", "c4", "c1"]);
    assert_eq!(cards[1].requested, CardRef::Latest(1));
}

#[test]
fn relevance_selectors_rank_by_topic_overlap() {
    let archive = InMemoryArchive::new()
        .with_card(CardRecord::new("walk", "exercise", "a long walk by the river"))
        .with_card(CardRecord::new("grief", "grief", "missing an old friend, grief and loss"))
        .with_card(CardRecord::new("loss", "journal", "thinking about loss"));
    let accessor = ArchiveAccessor::new(&archive);

    let top = accessor.resolve(&[CardRef::TopRelevant(1)], "grief and loss").unwrap();
    assert_eq!(ids(&top), ["grief"]);

    let all = accessor.resolve(&[CardRef::TopicRelevant], "grief and loss").unwrap();
    assert_eq!(ids(&all), ["grief", "loss"]);
}

#[test]
fn relevance_ignores_short_words_and_case() {
    let card = CardRecord::new("x", "Grief", "on a hill");
    assert_eq!(relevance(&card, "GRIEF on a"), 1);
    let ranked = rank_by_relevance(vec![card], "weather");
    assert!(ranked.is_empty());
}

/// Archive that ignores the requested bound.
struct GreedyArchive;

impl MemoryArchive for GreedyArchive {
    fn lookup(&self, _selector: &CardRef, _topic: &str) -> Result<Vec<CardRecord>, DispatchError> {
        Ok((1..=10).map(|n| CardRecord::new(format!("g{n}"), "t", "c")).collect())
    }
}

#[test]
fn oversized_archive_results_are_truncated_to_the_bound() {
    let archive = GreedyArchive;
    let accessor = ArchiveAccessor::new(&archive);
    let cards = accessor.resolve(&[CardRef::Latest(2), CardRef::TopRelevant(3)], "t").unwrap();
    assert_eq!(ids(&cards), ["g1", "g2", "g1", "g2", "g3"]);
}

struct OfflineArchive;

impl MemoryArchive for OfflineArchive {
    fn lookup(&self, _selector: &CardRef, _topic: &str) -> Result<Vec<CardRecord>, DispatchError> {
        Err(DispatchError::Failed("archive offline".into()))
    }
}

#[test]
fn archive_failure_surfaces_as_collaborator_failure() {
    let archive = OfflineArchive;
    let accessor = ArchiveAccessor::new(&archive);
    let err = accessor.resolve(&[CardRef::Latest(1)], "").unwrap_err();
    assert!(matches!(err, RitualError::Dispatch(DispatchError::Failed(_))));
    assert_eq!(err.kind(), ErrorKind::CollaboratorFailed);
}
