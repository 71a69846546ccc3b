use crate::alignment::normalize::ends_with_terminal_punctuation;
use crate::config::WordTimingParams;
use crate::types::{duration_ms, AlignedSegment, WordRef, WordTiming};

/// Length-derived allocation weight of one word.
///
/// Very short words are floored and 3-4 character words boosted so function
/// words like "a" or "the" are not squeezed to nothing.
pub fn word_weight(text: &str) -> f64 {
    let char_count = text.trim().chars().count();
    let count = char_count as f64;
    match char_count {
        0..=2 => count.max(1.5),
        3..=4 => count * 1.2,
        _ => count,
    }
}

/// Distribute a sentence's span over its child words.
///
/// Words are laid out from the sentence start with `word_padding` between
/// neighbours plus `punctuation_pause` after clause-ending words. The last
/// word ends at its own computed end rather than being stretched to the
/// sentence end. When the sentence is too short to give every word
/// `min_word_duration` after padding, words are packed back to back by raw
/// character count instead.
pub fn propagate(
    sentence: &AlignedSegment,
    words: &[WordRef],
    params: &WordTimingParams,
) -> Vec<WordTiming> {
    if words.is_empty() {
        return Vec::new();
    }

    let start = if sentence.start_time.is_finite() {
        sentence.start_time
    } else {
        0.0
    };
    let sentence_duration = sentence.end_time - start;
    let sentence_duration = if sentence_duration.is_finite() && sentence_duration > 0.0 {
        sentence_duration
    } else {
        0.0
    };

    let punctuated = words
        .iter()
        .map(|word| ends_with_terminal_punctuation(&word.text))
        .collect::<Vec<_>>();
    let punctuated_count = punctuated.iter().filter(|p| **p).count();
    let word_count = words.len();
    let usable = sentence_duration
        - (word_count - 1) as f64 * params.word_padding
        - punctuated_count as f64 * params.punctuation_pause;

    if usable > 0.0 && usable >= word_count as f64 * params.min_word_duration {
        let weights = words
            .iter()
            .map(|word| word_weight(&word.text))
            .collect::<Vec<_>>();
        let durations = allocate_with_floor(&weights, usable, params.min_word_duration);
        let gaps = punctuated
            .iter()
            .map(|&p| {
                if p {
                    params.word_padding + params.punctuation_pause
                } else {
                    params.word_padding
                }
            })
            .collect::<Vec<_>>();
        return lay_out(sentence, words, start, &durations, &gaps);
    }

    tracing::debug!(
        sentence_id = sentence.id.as_str(),
        word_count,
        sentence_duration = format!("{:.3}", sentence_duration),
        usable = format!("{:.3}", usable),
        "word_timing: sentence too short for padded layout, packing words"
    );
    let char_counts = words
        .iter()
        .map(|word| word.text.trim().chars().count().max(1) as f64)
        .collect::<Vec<_>>();
    let total_chars = char_counts.iter().sum::<f64>();
    let durations = char_counts
        .iter()
        .map(|count| {
            (sentence_duration * count / total_chars).max(params.fallback_min_word_duration)
        })
        .collect::<Vec<_>>();
    lay_out(sentence, words, start, &durations, &vec![0.0; word_count])
}

/// Proportional split of `budget` where no share drops below `floor`.
///
/// Words whose share would fall under the floor are pinned to it and the
/// rest is re-split among the others, so the shares always sum to `budget`.
/// Callers guarantee `budget >= weights.len() * floor`.
fn allocate_with_floor(weights: &[f64], budget: f64, floor: f64) -> Vec<f64> {
    let mut pinned = vec![false; weights.len()];
    loop {
        let pinned_count = pinned.iter().filter(|p| **p).count();
        let free_budget = budget - pinned_count as f64 * floor;
        let free_weight = weights
            .iter()
            .zip(&pinned)
            .filter(|(_, p)| !**p)
            .map(|(w, _)| *w)
            .sum::<f64>();

        let mut changed = false;
        for (weight, pin) in weights.iter().zip(pinned.iter_mut()) {
            if !*pin && free_budget * weight / free_weight < floor {
                *pin = true;
                changed = true;
            }
        }
        if !changed {
            return weights
                .iter()
                .zip(&pinned)
                .map(|(weight, pin)| {
                    if *pin {
                        floor
                    } else {
                        free_budget * weight / free_weight
                    }
                })
                .collect();
        }
    }
}

fn lay_out(
    sentence: &AlignedSegment,
    words: &[WordRef],
    start: f64,
    durations: &[f64],
    gaps: &[f64],
) -> Vec<WordTiming> {
    let mut cursor = start;
    words
        .iter()
        .zip(durations.iter().zip(gaps))
        .map(|(word, (&duration, &gap))| {
            let word_start = cursor;
            let word_end = word_start + duration;
            cursor = word_end + gap;
            WordTiming {
                id: word.id.clone(),
                parent_id: sentence.id.clone(),
                text: word.text.clone(),
                start_time: word_start,
                end_time: word_end,
                duration_ms: duration_ms(word_start, word_end),
            }
        })
        .collect()
}
