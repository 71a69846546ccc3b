use super::scoring::{classify_text, proximity_term, select_best, text_term, timing_term, TextMatch};
use super::window::search_window;
use super::{reconcile, reconcile_with_duration, PreparedCandidate, SegmentProbe};
use crate::alignment::normalize::normalize_text;
use crate::config::ReconcileParams;
use crate::types::{AlignmentCandidate, MatchQuality, SegmentType, SourceSegment};

fn segments(texts: &[&str]) -> Vec<SourceSegment> {
    texts
        .iter()
        .enumerate()
        .map(|(position, text)| SourceSegment {
            id: format!("s{}", position + 1),
            text: text.to_string(),
            segment_type: SegmentType::Sentence,
            position,
        })
        .collect()
}

fn candidates(rows: &[(&str, f64, f64)]) -> Vec<AlignmentCandidate> {
    rows.iter()
        .map(|&(text, begin_time, end_time)| AlignmentCandidate {
            text: text.to_string(),
            begin_time,
            end_time,
        })
        .collect()
}

fn prepare(candidates: &[AlignmentCandidate]) -> Vec<PreparedCandidate<'_>> {
    candidates
        .iter()
        .map(|candidate| PreparedCandidate {
            candidate,
            normalized: normalize_text(&candidate.text),
        })
        .collect()
}

fn spans(aligned: &[crate::types::AlignedSegment]) -> Vec<(f64, f64)> {
    aligned.iter().map(|s| (s.start_time, s.end_time)).collect()
}

#[test]
fn in_order_exact_candidates_match_one_to_one() {
    let source = segments(&[
        "The quick brown fox.",
        "Jumps over the lazy dog.",
        "It barked twice.",
        "Then silence fell.",
        "Morning came slowly.",
    ]);
    let aligned_candidates = candidates(&[
        ("the quick brown fox.", 0.5, 10.0),
        ("jumps over the lazy dog.", 10.5, 20.0),
        ("it barked twice.", 20.5, 45.0),
        ("then silence fell.", 45.5, 70.0),
        ("morning came slowly.", 70.5, 100.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(
        spans(&aligned),
        vec![
            (0.5, 10.0),
            (10.5, 20.0),
            (20.5, 45.0),
            (45.5, 70.0),
            (70.5, 100.0)
        ]
    );
    assert!(aligned.iter().all(|s| s.quality == MatchQuality::Exact));
    assert_eq!(aligned[1].duration_ms, 9500);
}

#[test]
fn identity_is_preserved_verbatim() {
    let source = segments(&["  Hello,   World ", "Second line"]);
    let aligned_candidates = candidates(&[("hello, world", 0.2, 1.0), ("second line", 1.1, 2.0)]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    for (input, output) in source.iter().zip(aligned.iter()) {
        assert_eq!(input.id, output.id);
        assert_eq!(input.text, output.text);
        assert_eq!(input.segment_type, output.segment_type);
    }
}

#[test]
fn repeated_text_far_apart_maps_to_matching_occurrences() {
    let source = segments(&[
        "Hello world",
        "The first chapter begins",
        "It was a quiet morning",
        "Nobody expected visitors",
        "Then the bell rang",
        "Hello world",
    ]);
    let aligned_candidates = candidates(&[
        ("hello world", 2.0, 3.0),
        ("the first chapter begins", 4.0, 6.0),
        ("it was a quiet morning", 10.0, 15.0),
        ("nobody expected visitors", 18.0, 25.0),
        ("then the bell rang", 28.0, 35.0),
        ("hello world", 40.0, 41.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(aligned[0].id, "s1");
    assert_eq!((aligned[0].start_time, aligned[0].end_time), (2.0, 3.0));
    assert_eq!(aligned[5].id, "s6");
    assert_eq!((aligned[5].start_time, aligned[5].end_time), (40.0, 41.0));
}

#[test]
fn repeated_title_inside_one_window_is_not_swapped() {
    // Table of contents entry followed by the chapter heading it points to.
    let source = segments(&["Chapter One", "Chapter Two", "Chapter One", "It was dark"]);
    let aligned_candidates = candidates(&[
        ("chapter one", 1.0, 2.0),
        ("chapter two", 2.5, 3.5),
        ("chapter one", 14.0, 15.0),
        ("it was dark", 15.5, 30.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(
        spans(&aligned),
        vec![(1.0, 2.0), (2.5, 3.5), (14.0, 15.0), (15.5, 30.0)]
    );
}

#[test]
fn unmatched_segment_falls_back_to_next_unused_candidate() {
    let source = segments(&["Alpha beta", "Gamma delta", "Epsilon"]);
    let aligned_candidates = candidates(&[
        ("alpha beta", 0.5, 1.5),
        ("zzz", 1.6, 2.5),
        ("epsilon", 2.6, 3.5),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(aligned[1].quality, MatchQuality::Fallback);
    assert_eq!((aligned[1].start_time, aligned[1].end_time), (1.6, 2.5));
    assert_eq!(aligned[2].quality, MatchQuality::Exact);
    assert_eq!((aligned[2].start_time, aligned[2].end_time), (2.6, 3.5));
}

#[test]
fn fallback_skips_candidates_with_already_emitted_span() {
    let source = segments(&["Alpha beta", "Gamma delta", "Epsilon"]);
    let aligned_candidates = candidates(&[
        ("alpha beta", 0.5, 1.5),
        ("alpha beta", 0.5, 1.5),
        ("zzz", 1.6, 2.5),
        ("epsilon", 2.6, 3.5),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!((aligned[0].start_time, aligned[0].end_time), (0.5, 1.5));
    assert_eq!(aligned[1].quality, MatchQuality::Fallback);
    assert_eq!((aligned[1].start_time, aligned[1].end_time), (1.6, 2.5));
    assert_eq!((aligned[2].start_time, aligned[2].end_time), (2.6, 3.5));
}

#[test]
fn exhausted_candidates_reuse_the_last_one() {
    let source = segments(&["Alpha beta", "Gamma delta", "Epsilon zeta"]);
    let aligned_candidates = candidates(&[("alpha beta", 0.5, 1.5)]);

    // Explicit duration keeps the early ceiling (15% of the audio) above 0.5 s.
    let aligned = reconcile_with_duration(
        &source,
        &aligned_candidates,
        Some(60.0),
        &ReconcileParams::default(),
    );

    assert_eq!(aligned.len(), 3);
    assert_eq!(aligned[0].quality, MatchQuality::Exact);
    for segment in &aligned[1..] {
        assert_eq!(segment.quality, MatchQuality::Reused);
        assert_eq!((segment.start_time, segment.end_time), (0.5, 1.5));
    }
}

#[test]
fn no_candidates_yields_placeholders_for_every_segment() {
    let source = segments(&["One", "Two", "Three"]);

    let aligned = reconcile(&source, &[], &ReconcileParams::default());

    assert_eq!(aligned.len(), 3);
    for segment in &aligned {
        assert_eq!(segment.quality, MatchQuality::Placeholder);
        assert_eq!(segment.start_time, 0.0);
        assert_eq!(segment.end_time, 0.0);
        assert_eq!(segment.duration_ms, 0);
    }
}

#[test]
fn cardinality_holds_for_any_candidate_count() {
    let source = segments(&["Alpha", "Beta", "Gamma", "Delta"]);
    let pool = [
        ("alpha", 0.1, 0.9),
        ("beta", 1.0, 1.9),
        ("gamma", 2.0, 2.9),
        ("delta", 3.0, 3.9),
        ("epsilon", 4.0, 4.9),
        ("zeta", 5.0, 5.9),
    ];
    for count in 0..=pool.len() {
        let aligned_candidates = candidates(&pool[..count]);
        let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());
        assert_eq!(aligned.len(), source.len(), "candidate count {count}");
    }
}

#[test]
fn merged_candidate_serves_both_absorbed_segments() {
    let source = segments(&["Hello there.", "General Kenobi.", "You are a bold one."]);
    let aligned_candidates = candidates(&[
        ("hello there. general kenobi.", 0.5, 3.0),
        ("you are a bold one.", 3.2, 5.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(aligned[0].quality, MatchQuality::Partial);
    assert_eq!(aligned[1].quality, MatchQuality::Partial);
    assert_eq!((aligned[1].start_time, aligned[1].end_time), (0.5, 3.0));
    assert_eq!(aligned[2].quality, MatchQuality::Exact);
    assert_eq!((aligned[2].start_time, aligned[2].end_time), (3.2, 5.0));
}

#[test]
fn split_candidates_are_spanned_as_one_segment() {
    let source = segments(&[
        "A tale",
        "It was the best of times, it was the worst of times.",
        "Everything changed.",
    ]);
    let aligned_candidates = candidates(&[
        ("a tale", 0.2, 0.8),
        ("it was the best of times,", 1.0, 3.0),
        ("it was the worst of times.", 3.1, 5.0),
        ("everything changed.", 5.5, 12.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(aligned[1].quality, MatchQuality::Partial);
    assert_eq!((aligned[1].start_time, aligned[1].end_time), (1.0, 5.0));
    assert_eq!(aligned[2].quality, MatchQuality::Exact);
    assert_eq!((aligned[2].start_time, aligned[2].end_time), (5.5, 12.0));
}

#[test]
fn invalid_explicit_duration_falls_back_to_derived() {
    let source = segments(&["Alpha beta", "Gamma delta"]);
    let aligned_candidates = candidates(&[("alpha beta", 0.5, 1.5), ("gamma delta", 1.6, 2.5)]);

    let with_invalid = reconcile_with_duration(
        &source,
        &aligned_candidates,
        Some(f64::NAN),
        &ReconcileParams::default(),
    );
    let derived = reconcile(&source, &aligned_candidates, &ReconcileParams::default());
    assert_eq!(with_invalid, derived);
}

#[test]
fn classify_text_tiers() {
    let params = ReconcileParams::default();
    let raw = candidates(&[
        ("hello world", 0.0, 1.0),
        ("hello world and more", 1.0, 2.0),
        ("hello", 2.0, 3.0),
        ("world peace hello", 3.0, 4.0),
        ("nothing shared", 4.0, 5.0),
        ("", 5.0, 6.0),
    ]);
    let prepared = prepare(&raw);

    assert_eq!(
        classify_text(&params, "hello world", &prepared, 0),
        (TextMatch::Exact, 0)
    );
    match classify_text(&params, "hello world", &prepared, 1) {
        (TextMatch::Superset { extra_ratio }, 1) => {
            assert!((extra_ratio - 9.0 / 20.0).abs() < 1e-9)
        }
        other => panic!("expected superset, got {other:?}"),
    }
    match classify_text(&params, "hello world", &prepared, 2) {
        (TextMatch::Subset { coverage }, 2) => assert!((coverage - 5.0 / 11.0).abs() < 1e-9),
        other => panic!("expected subset, got {other:?}"),
    }
    match classify_text(&params, "hello world", &prepared, 3) {
        (TextMatch::Overlap { jaccard }, 3) => assert!((jaccard - 2.0 / 3.0).abs() < 1e-9),
        other => panic!("expected overlap, got {other:?}"),
    }
    assert_eq!(
        classify_text(&params, "hello world", &prepared, 4),
        (TextMatch::None, 4)
    );
    assert_eq!(
        classify_text(&params, "hello world", &prepared, 5),
        (TextMatch::None, 5)
    );
    assert_eq!(classify_text(&params, "", &prepared, 0), (TextMatch::None, 0));
}

#[test]
fn text_term_orders_tiers() {
    let params = ReconcileParams::default();
    let early = SegmentProbe::new(&params, 0, 10, "hello world", 100.0);
    let late = SegmentProbe::new(&params, 9, 10, "hello world", 100.0);

    assert_eq!(text_term(&params, &early, TextMatch::Exact), Some(150.0));
    assert_eq!(text_term(&params, &late, TextMatch::Exact), Some(100.0));

    let superset = text_term(&params, &late, TextMatch::Superset { extra_ratio: 0.5 })
        .expect("superset scores");
    let subset =
        text_term(&params, &late, TextMatch::Subset { coverage: 0.5 }).expect("subset scores");
    assert!((superset - 60.0).abs() < 1e-9);
    assert!((subset - 30.0).abs() < 1e-9);
    assert!(superset > subset);
    assert_eq!(text_term(&params, &late, TextMatch::None), None);
}

#[test]
fn no_overlap_vetoes_even_a_perfectly_timed_candidate() {
    let params = ReconcileParams::default();
    let raw = candidates(&[("something else", 50.0, 51.0)]);
    let prepared = prepare(&raw);
    let probe = SegmentProbe::new(&params, 5, 10, "hello world", 100.0);

    let best = select_best(&params, &probe, &prepared, &[0], 0).expect("window not empty");
    assert_eq!(best.text_match, TextMatch::None);
    assert_eq!(best.score.total, params.no_overlap_score);
}

#[test]
fn proximity_rewards_early_candidates_at_or_before_own_index() {
    let params = ReconcileParams::default();
    let early = SegmentProbe::new(&params, 2, 10, "some text", 100.0);
    let late = SegmentProbe::new(&params, 8, 10, "some text", 100.0);

    let at_own = proximity_term(&params, &early, 2, 2);
    let ahead = proximity_term(&params, &early, 4, 2);
    assert!((at_own - 35.0).abs() < 1e-9);
    assert!((ahead - (20.0 - 8.0 - 10.0)).abs() < 1e-9);

    assert!((proximity_term(&params, &late, 8, 8) - 20.0).abs() < 1e-9);
    assert_eq!(proximity_term(&params, &late, 20, 8), 0.0);
}

#[test]
fn timing_rejects_early_candidates_past_ceiling() {
    let params = ReconcileParams::default();
    // 200 s of audio: ceiling is min(20, 30) = 20.
    let early = SegmentProbe::new(&params, 0, 10, "opening line", 200.0);
    assert!((early.early_ceiling - 20.0).abs() < 1e-9);

    assert!(timing_term(&params, &early, 25.0) < -400.0);
    let in_sub_band = timing_term(&params, &early, 7.0);
    let in_band = timing_term(&params, &early, 12.0);
    assert!(in_sub_band > in_band);

    let late = SegmentProbe::new(&params, 9, 10, "closing line", 200.0);
    assert!((timing_term(&params, &late, 180.0) - 30.0).abs() < 1e-9);
    assert_eq!(timing_term(&params, &late, 100.0), 0.0);
}

#[test]
fn window_extends_backwards_for_early_segments() {
    let params = ReconcileParams::default();
    let raw = (0..40)
        .map(|i| (format!("line {i}"), i as f64 * 2.0 + 20.0, i as f64 * 2.0 + 21.0))
        .collect::<Vec<_>>();
    let raw = raw
        .iter()
        .map(|(text, begin, end)| (text.as_str(), *begin, *end))
        .collect::<Vec<_>>();
    let raw = candidates(&raw);
    let prepared = prepare(&raw);

    let very_early = SegmentProbe::new(&params, 5, 100, "abc", 100.0);
    assert_eq!(
        search_window(&params, &very_early, 12, &prepared),
        (0..17).collect::<Vec<_>>()
    );

    let early = SegmentProbe::new(&params, 20, 100, "abc", 100.0);
    assert_eq!(
        search_window(&params, &early, 12, &prepared),
        (2..17).collect::<Vec<_>>()
    );

    let normal = SegmentProbe::new(&params, 50, 100, "abc", 100.0);
    assert_eq!(
        search_window(&params, &normal, 12, &prepared),
        (10..17).collect::<Vec<_>>()
    );
    assert_eq!(
        search_window(&params, &normal, 39, &prepared),
        (37..40).collect::<Vec<_>>()
    );
}

#[test]
fn window_force_includes_early_range_for_non_trivial_text() {
    let params = ReconcileParams::default();
    let raw = candidates(&[
        ("a", 0.0, 1.0),
        ("b", 1.0, 2.0),
        ("c", 2.0, 3.0),
        ("d", 3.0, 4.0),
        ("e", 4.0, 5.0),
        ("f", 5.0, 6.0),
        ("g", 6.0, 7.0),
        ("h", 7.5, 8.0),
        ("i", 9.5, 10.0),
    ]);
    let prepared = prepare(&raw);

    let long_text = SegmentProbe::new(&params, 0, 10, "opening words", 100.0);
    assert_eq!(
        search_window(&params, &long_text, 0, &prepared),
        vec![0, 1, 2, 3, 4, 6, 7]
    );

    let short_text = SegmentProbe::new(&params, 0, 10, "title", 100.0);
    assert_eq!(
        search_window(&params, &short_text, 0, &prepared),
        vec![0, 1, 2, 3, 4]
    );
}

#[test]
fn fragment_inside_a_word_is_vetoed() {
    let params = ReconcileParams::default();
    let raw = candidates(&[("ego", 0.0, 1.0), ("he", 1.0, 2.0), ("category.", 2.0, 3.0)]);
    let prepared = prepare(&raw);

    assert_eq!(
        classify_text(&params, "the category", &prepared, 0),
        (TextMatch::None, 0)
    );
    assert_eq!(
        classify_text(&params, "the category", &prepared, 1),
        (TextMatch::None, 1)
    );
    assert!(matches!(
        classify_text(&params, "the category", &prepared, 2),
        (TextMatch::Subset { .. }, 2)
    ));
}

#[test]
fn candidate_sharing_no_whole_word_falls_back() {
    let source = segments(&[
        "Morning broke",
        "Birds were singing",
        "The farmer woke",
        "He fed the goats",
        "The category",
        "Rain began falling",
        "Mud covered everything",
        "Night came early",
        "Stars appeared",
        "Everyone slept",
    ]);
    let aligned_candidates = candidates(&[
        ("morning broke", 0.5, 9.0),
        ("birds were singing", 10.0, 19.0),
        ("the farmer woke", 20.0, 29.0),
        ("he fed the goats", 30.0, 39.0),
        ("ego", 50.0, 59.0),
        ("rain began falling", 60.0, 69.0),
        ("mud covered everything", 70.0, 79.0),
        ("night came early", 80.0, 89.0),
        ("stars appeared", 90.0, 95.0),
        ("everyone slept", 96.0, 100.0),
    ]);

    let aligned = reconcile(&source, &aligned_candidates, &ReconcileParams::default());

    assert_eq!(aligned.len(), 10);
    assert_eq!(aligned[4].id, "s5");
    assert_eq!(aligned[4].quality, MatchQuality::Fallback);
    assert_eq!(aligned[5].quality, MatchQuality::Exact);
    assert_eq!((aligned[5].start_time, aligned[5].end_time), (60.0, 69.0));
}
