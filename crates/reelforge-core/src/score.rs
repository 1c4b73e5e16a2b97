use std::path::Path;

use chrono::Utc;

use crate::error::Result;
use crate::types::{DurationFlag, QualityReport, Script};

/// Attention words counted toward the hook score.
pub const POWER_WORDS: [&str; 9] = [
    "breaking",
    "exclusive",
    "shocking",
    "revealed",
    "secret",
    "amazing",
    "unbelievable",
    "game-changing",
    "revolutionary",
];

/// Short-form engagement sweet spot in seconds.
pub const OPTIMAL_DURATION: (f64, f64) = (30.0, 45.0);

/// Placeholder engagement estimate until a trained model replaces it.
pub const PREDICTED_SCORE: f64 = 8.5;

/// Hook strength on a 0-10 scale: base 5, plus one per power word hit, plus
/// one each for a question mark and a digit, clamped at 10.
pub fn hook_strength(hook: &str) -> u8 {
    let lowered = hook.to_lowercase();
    let mut score: u8 = 5;
    for word in POWER_WORDS {
        if lowered.contains(word) {
            score += 1;
        }
    }
    if hook.contains('?') {
        score += 1;
    }
    if hook.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    score.min(10)
}

/// Heuristic quality report for a finished build.
pub fn score_script(
    script: &Script,
    duration: f64,
    has_music: bool,
    formats_created: Vec<String>,
) -> QualityReport {
    let duration_flag = if duration >= OPTIMAL_DURATION.0 && duration <= OPTIMAL_DURATION.1 {
        DurationFlag::Optimal
    } else {
        DurationFlag::Adjust
    };

    QualityReport {
        hook_strength: hook_strength(&script.hook),
        information_density: script.main_points.len(),
        duration_flag,
        predicted_score: PREDICTED_SCORE,
        has_subtitles: true,
        has_music,
        hashtags: script.hashtags.clone(),
        formats_created,
        timestamp: Utc::now(),
    }
}

/// Write the report next to the rendered video as pretty-printed JSON.
pub async fn save_report(report: &QualityReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
