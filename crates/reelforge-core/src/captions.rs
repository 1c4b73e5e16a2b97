use rand::Rng;
use rand::rngs::StdRng;

use crate::error::{ReelforgeError, Result};
use crate::types::TimedWord;

/// Estimated seconds of speech per character of a word.
const SECONDS_PER_CHAR: f64 = 0.08;
/// Extra pause after a sentence-ending word.
const SENTENCE_PAUSE: f64 = 0.3;
/// Extra pause after a comma.
const COMMA_PAUSE: f64 = 0.15;

/// How caption display intervals are derived from narration text.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionPolicy {
    /// Per-word estimate proportional to character length, with punctuation
    /// pauses and a small jitter, rescaled to the true audio duration.
    VariableRate,
    /// Constant words-per-second with successive words overlapping by a
    /// fraction of their display interval.
    FixedRate {
        words_per_second: f64,
        overlap_fraction: f64,
    },
}

impl Default for CaptionPolicy {
    fn default() -> Self {
        CaptionPolicy::VariableRate
    }
}

/// Produce timed caption entries for `text` spoken over `duration` seconds.
///
/// Whatever the per-word estimates come out to, the whole sequence is rescaled
/// so the first word starts at 0 and the final word ends exactly at
/// `duration`, preserving relative pacing.
pub fn time_captions(
    text: &str,
    duration: f64,
    policy: &CaptionPolicy,
    rng: &mut StdRng,
) -> Result<Vec<TimedWord>> {
    if duration <= 0.0 || !duration.is_finite() {
        return Err(ReelforgeError::InvalidDuration { seconds: duration });
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Err(ReelforgeError::Validation {
            field: "text",
            reason: "narration text contains no words".to_string(),
        });
    }

    let mut timed = match policy {
        CaptionPolicy::VariableRate => variable_rate(&words, rng),
        CaptionPolicy::FixedRate {
            words_per_second,
            overlap_fraction,
        } => fixed_rate(&words, *words_per_second, *overlap_fraction)?,
    };

    rescale_to(&mut timed, duration);
    Ok(timed)
}

fn variable_rate(words: &[&str], rng: &mut StdRng) -> Vec<TimedWord> {
    let mut clock = 0.0;
    let mut timed = Vec::with_capacity(words.len());
    for word in words {
        let mut base = word.chars().count() as f64 * SECONDS_PER_CHAR;
        if word.contains(['.', '!', '?']) {
            base += SENTENCE_PAUSE;
        } else if word.contains(',') {
            base += COMMA_PAUSE;
        }
        let length = base * rng.gen_range(0.9..=1.1);
        timed.push(TimedWord {
            text: (*word).to_string(),
            start: clock,
            end: clock + length,
        });
        clock += length;
    }
    timed
}

fn fixed_rate(words: &[&str], rate: f64, overlap: f64) -> Result<Vec<TimedWord>> {
    if rate <= 0.0 {
        return Err(ReelforgeError::Validation {
            field: "words_per_second",
            reason: format!("rate must be positive, got {rate}"),
        });
    }
    if !(0.0..1.0).contains(&overlap) {
        return Err(ReelforgeError::Validation {
            field: "overlap_fraction",
            reason: format!("overlap must be in [0, 1), got {overlap}"),
        });
    }

    let word_len = 1.0 / rate;
    let step = word_len * (1.0 - overlap);
    let timed = words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let start = i as f64 * step;
            TimedWord {
                text: (*word).to_string(),
                start,
                end: start + word_len,
            }
        })
        .collect();
    Ok(timed)
}

fn rescale_to(timed: &mut [TimedWord], duration: f64) {
    let last_end = timed.last().map(|w| w.end).unwrap_or(0.0);
    if last_end <= 0.0 {
        return;
    }
    let scale = duration / last_end;
    for word in timed {
        word.start *= scale;
        word.end *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    const EPS: f64 = 1e-9;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn hello_world_spans_exact_duration() {
        let timed = time_captions("Hello world", 2.0, &CaptionPolicy::VariableRate, &mut rng())
            .unwrap();
        assert_eq!(timed.len(), 2);
        assert!(timed[0].start.abs() < EPS);
        assert!((timed[1].end - 2.0).abs() < EPS);
    }

    #[test]
    fn starts_are_monotone_and_final_end_is_exact() {
        let text = "BREAKING: the market shifted, again. Nobody saw it coming!";
        let timed =
            time_captions(text, 12.5, &CaptionPolicy::VariableRate, &mut rng()).unwrap();
        assert!(timed[0].start.abs() < EPS);
        assert!((timed.last().unwrap().end - 12.5).abs() < EPS);
        for pair in timed.windows(2) {
            assert!(pair[1].start >= pair[0].start);
        }
        for word in &timed {
            assert!(word.end > word.start);
        }
    }

    #[test]
    fn single_word_spans_full_duration() {
        let timed =
            time_captions("Hello", 3.0, &CaptionPolicy::VariableRate, &mut rng()).unwrap();
        assert_eq!(timed.len(), 1);
        assert!(timed[0].start.abs() < EPS);
        assert!((timed[0].end - 3.0).abs() < EPS);
    }

    #[test]
    fn sentence_end_gets_a_longer_share() {
        // "hi." carries a sentence pause; even with jitter in [0.9, 1.1] its
        // rescaled interval must beat the bare "hi".
        let timed =
            time_captions("hi. hi", 2.0, &CaptionPolicy::VariableRate, &mut rng()).unwrap();
        let first = timed[0].end - timed[0].start;
        let second = timed[1].end - timed[1].start;
        assert!(first > second);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err =
            time_captions("Hello world", 0.0, &CaptionPolicy::VariableRate, &mut rng())
                .unwrap_err();
        assert!(matches!(err, ReelforgeError::InvalidDuration { .. }));
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = time_captions("   ", 2.0, &CaptionPolicy::VariableRate, &mut rng())
            .unwrap_err();
        assert!(matches!(err, ReelforgeError::Validation { .. }));
    }

    #[test]
    fn fixed_rate_overlaps_successive_words() {
        let policy = CaptionPolicy::FixedRate {
            words_per_second: 2.5,
            overlap_fraction: 0.2,
        };
        let timed = time_captions("one two three four five", 2.0, &policy, &mut rng()).unwrap();
        assert_eq!(timed.len(), 5);
        assert!(timed[0].start.abs() < EPS);
        assert!((timed.last().unwrap().end - 2.0).abs() < EPS);
        // Each word should still be on screen when the next appears.
        for pair in timed.windows(2) {
            assert!(pair[1].start < pair[0].end);
        }
    }

    #[test]
    fn fixed_rate_rejects_bad_parameters() {
        let bad_rate = CaptionPolicy::FixedRate {
            words_per_second: 0.0,
            overlap_fraction: 0.2,
        };
        assert!(time_captions("a b", 1.0, &bad_rate, &mut rng()).is_err());

        let bad_overlap = CaptionPolicy::FixedRate {
            words_per_second: 2.5,
            overlap_fraction: 1.0,
        };
        assert!(time_captions("a b", 1.0, &bad_overlap, &mut rng()).is_err());
    }

    #[test]
    fn same_seed_gives_same_timings() {
        let a = time_captions("a few words here", 4.0, &CaptionPolicy::VariableRate, &mut rng())
            .unwrap();
        let b = time_captions("a few words here", 4.0, &CaptionPolicy::VariableRate, &mut rng())
            .unwrap();
        assert_eq!(a, b);
    }
}
