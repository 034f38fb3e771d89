use spiral_core::syntax::{
    parse, parse_program, serialize, AnchorKind, AnchorMode, AnchorRef, CardRef, Family,
    IntentTag, Level, Statement, Verb,
};

fn parse_ok(line: &str) -> Statement {
    parse(line).expect("parse").expect("statement")
}

#[test]
fn parses_quoted_subject_with_tail_pairs() {
    let stmt = parse_ok(r#"ritual.engage "healing_session" | voice:@healer, depth:2, gentle"#);
    assert_eq!(stmt.family, Family::Ritual);
    assert_eq!(stmt.verb, Verb::Engage);
    assert_eq!(stmt.subject, "healing_session");
    assert_eq!(stmt.voice.as_ref().map(|v| v.as_str()), Some("@healer"));
    assert_eq!(stmt.args.get("depth").map(String::as_str), Some("2"));
    assert_eq!(stmt.args.get("gentle").map(String::as_str), Some("true"));
    assert!(!stmt.args.contains_key("voice"), "voice is lifted out of args");
    assert_eq!(stmt.intent, Some(IntentTag::Healing));
}

#[test]
fn quoted_segments_keep_punctuation_verbatim() {
    let stmt = parse_ok(r#"ritual.engage "a, b | c [d]: e" | note:"x, y | z""#);
    assert_eq!(stmt.subject, "a, b | c [d]: e");
    assert_eq!(stmt.args.get("note").map(String::as_str), Some("x, y | z"));
}

#[test]
fn quoted_segments_support_escapes() {
    let stmt = parse_ok(r#"ritual.fail "say \"enough\" \\ rest" | reason:"tired""#);
    assert_eq!(stmt.subject, r#"say "enough" \ rest"#);
    assert_eq!(stmt.args.get("reason").map(String::as_str), Some("tired"));
}

#[test]
fn whitespace_outside_quotes_is_insignificant() {
    let spaced = parse_ok(r#"   ritual.engage   "x"   |   a:1 ,   b   "#);
    let tight = parse_ok(r#"ritual.engage "x"|a:1,b"#);
    assert_eq!(spaced, tight);
}

#[test]
fn bracketed_list_populates_memory_refs() {
    let stmt =
        parse_ok("archive.access [card:latest-3, top-2-relevant, card:topic-relevant, card:abc]");
    assert_eq!(
        stmt.memory_refs,
        vec![
            CardRef::Latest(3),
            CardRef::TopRelevant(2),
            CardRef::TopicRelevant,
            CardRef::Id("abc".to_string()),
        ]
    );
}

#[test]
fn directives_populate_typed_fields() {
    assert_eq!(parse_ok(r#"bandwidth.set "low""#).bandwidth, Some(Level::Low));
    assert_eq!(
        parse_ok(r#"voice.use "@sage""#).voice.map(|v| v.to_string()),
        Some("@sage".to_string())
    );

    let anchor = parse_ok(r#"anchor.require "consent:explicit""#);
    assert!(anchor.anchors.contains(&AnchorRef::new(AnchorKind::Consent, AnchorMode::Explicit)));

    let containment = parse_ok(r#"anchor.engage "safe_containment""#);
    assert!(containment.engages_containment());
    let plain = parse_ok(r#"anchor.require "safe_containment""#);
    assert!(!plain.engages_containment());
}

#[test]
fn anchor_mode_defaults_to_explicit() {
    let stmt = parse_ok(r#"anchor.require "review""#);
    let only = stmt.anchors.iter().next().copied().expect("one anchor");
    assert_eq!(only, AnchorRef::new(AnchorKind::Review, AnchorMode::Explicit));
}

#[test]
fn comments_and_blank_lines_produce_nothing() {
    for line in ["", "   ", "# a comment", "   // another comment", "\t#x"] {
        assert!(parse(line).expect("parse").is_none(), "line {line:?}");
    }
}

#[test]
fn intent_is_classified_once_and_can_be_overridden() {
    assert_eq!(parse_ok(r#"ritual.engage "Crisis healing""#).intent, Some(IntentTag::Crisis));
    assert_eq!(parse_ok(r#"ritual.engage "therapy hour""#).intent, Some(IntentTag::Therapeutic));
    assert_eq!(parse_ok(r#"ritual.engage "walk""#).intent, Some(IntentTag::General));
    assert_eq!(
        parse_ok(r#"ritual.engage "walk" | intent:healing"#).intent,
        Some(IntentTag::Healing)
    );
    assert_eq!(parse_ok(r#"voice.use "@healer""#).intent, None);
}

#[test]
fn intent_matches_whole_words_only() {
    assert_eq!(parse_ok(r#"ritual.engage "health check""#).intent, Some(IntentTag::General));
    assert_eq!(parse_ok(r#"ritual.engage "therapist notes""#).intent, Some(IntentTag::General));
    assert_eq!(parse_ok(r#"ritual.engage "crisisplan""#).intent, Some(IntentTag::General));
    assert_eq!(parse_ok(r#"ritual.engage "self-healing""#).intent, Some(IntentTag::Healing));
    assert_eq!(
        parse_ok(r#"companion.summon "Therapeutic_walk""#).intent,
        Some(IntentTag::Therapeutic)
    );
}

#[test]
fn unknown_family_names_token_and_column() {
    let err = parse(r#"dance.engage "x""#).unwrap_err();
    assert_eq!(err.token, "dance");
    assert_eq!(err.column, 1);
    assert!(err.message.contains("unknown family"));
}

#[test]
fn unknown_verb_names_token_and_column() {
    let err = parse(r#"  ritual.dance "x""#).unwrap_err();
    assert_eq!(err.token, "dance");
    assert_eq!(err.column, 10);

    // A real verb that the family does not accept is still unknown.
    let err = parse(r#"voice.engage "x""#).unwrap_err();
    assert_eq!(err.token, "engage");
    assert_eq!(err.column, 7);
}

#[test]
fn trailing_tokens_are_rejected() {
    let err = parse(r#"ritual.engage "x" extra"#).unwrap_err();
    assert_eq!(err.token, "extra");
    assert_eq!(err.column, 19);
}

#[test]
fn unterminated_quote_is_reported_at_the_quote() {
    let err = parse(r#"ritual.engage "open"#).unwrap_err();
    assert_eq!(err.column, 15);
}

#[test]
fn malformed_statements_are_rejected() {
    let cases = [
        "archive.access",
        "archive.access [card:latest-0]",
        "archive.access [card:a card:b]",
        "archive.access [card:a",
        r#"voice.use "sage""#,
        r#"voice.use"#,
        r#"bandwidth.set "extreme""#,
        r#"anchor.require "trust""#,
        r#"ritual.engage "x" |"#,
        r#"ritual.engage "x" | voice:@a, voice:@b"#,
        r#"ritual.engage "x" | k:1, k:2"#,
        r#"ritual.engage "x" | intent:joy"#,
        r#"ritual.engage "x" | bandwidth:max"#,
        "ritual",
    ];
    for line in cases {
        assert!(parse(line).is_err(), "expected syntax error for {line:?}");
    }
}

#[test]
fn serialize_round_trips_parsed_statements() {
    let lines = [
        r#"ritual.engage "healing_session" | voice:@healer, depth:2, gentle"#,
        r#"ritual.complete "healing_session""#,
        r#"ritual.fail "x" | reason:"tired \"today\"""#,
        r#"ritual.engage "with \\ backslash" | bandwidth:high"#,
        r#"archive.access [card:latest-3, top-2-relevant, "odd id", "latest-9"]"#,
        r#"archive.access "reflection" [card:topic-relevant] | topic:grief"#,
        r#"anchor.require "consent:human" | anchor:review:human"#,
        r#"anchor.engage "safe_containment""#,
        r#"bandwidth.set "high""#,
        r#"voice.use "@sage""#,
        r#"companion.summon "crisis line" | intent:general, note:"a, b | c", empty:"""#,
        r#"ritual.engage "x" | anchor:consent, anchor:review:implicit"#,
    ];
    for line in lines {
        let first = parse_ok(line);
        let text = serialize(&first);
        let second = parse_ok(&text);
        assert_eq!(first, second, "round trip of {line:?} via {text:?}");
        assert_eq!(serialize(&second), text, "canonical form is stable for {line:?}");
    }
}

#[test]
fn quoted_card_ids_stay_literal() {
    let stmt = parse_ok(r#"archive.access ["latest-9", card:"top-1-relevant"]"#);
    assert_eq!(
        stmt.memory_refs,
        vec![CardRef::Id("latest-9".to_string()), CardRef::Id("top-1-relevant".to_string())]
    );
}

#[test]
fn parse_program_reports_line_numbers() {
    let program = "// header\nvoice.use \"@sage\"\n\nritual.dance \"x\"\nritual.engage \"y\"\n";
    let parsed = parse_program(program);
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[0].line, 2);
    assert!(parsed[0].result.is_ok());
    let err = parsed[1].result.as_ref().unwrap_err();
    assert_eq!(parsed[1].line, 4);
    assert_eq!(err.line, Some(4));
    assert!(err.to_string().contains("line 4"));
    assert_eq!(parsed[2].line, 5);
}
