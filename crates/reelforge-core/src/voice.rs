use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{ReelforgeError, Result};

/// Narration shorter than this (trimmed) is replaced by the fallback text
/// before synthesis.
pub const MIN_SCRIPT_CHARS: usize = 5;
pub const FALLBACK_NARRATION: &str =
    "This is an AI generated video about trending topics. Follow for more updates!";

pub const DEFAULT_VOICE: &str = "en-IN-NeerjaNeural";

/// Neural voices known to work well for short-form narration.
pub const VOICES: [&str; 4] = [
    "en-IN-NeerjaNeural",
    "en-IN-PrabhatNeural",
    "en-GB-RyanNeural",
    "en-GB-LibbyNeural",
];

#[derive(Debug, Clone)]
pub struct SynthesizedVoice {
    pub audio_path: PathBuf,
    pub duration: f64,
}

/// Seam over the text-to-speech service.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &str, output: &Path)
    -> Result<SynthesizedVoice>;
}

/// Synthesizer backed by the `edge-tts` command-line tool.
pub struct EdgeTts {
    /// Optional speaking-rate modifier, e.g. "-10%".
    pub rate: Option<String>,
}

impl EdgeTts {
    pub fn new(rate: Option<String>) -> Self {
        Self { rate }
    }
}

#[async_trait]
impl SpeechSynthesizer for EdgeTts {
    async fn synthesize(
        &self,
        text: &str,
        voice: &str,
        output: &Path,
    ) -> Result<SynthesizedVoice> {
        let text = effective_text(text);

        let mut cmd = Command::new("edge-tts");
        cmd.arg("--voice")
            .arg(voice)
            .arg("--text")
            .arg(text)
            .arg("--write-media")
            .arg(output);
        if let Some(rate) = &self.rate {
            cmd.arg("--rate").arg(rate);
        }

        let result = cmd.output().await?;
        if !result.status.success() {
            return Err(ReelforgeError::Synthesis {
                reason: String::from_utf8_lossy(&result.stderr).to_string(),
            });
        }

        let duration = probe_duration(output)
            .await
            .map_err(|e| ReelforgeError::Synthesis {
                reason: format!("could not determine narration duration: {e}"),
            })?;
        if duration <= 0.0 {
            return Err(ReelforgeError::Synthesis {
                reason: format!("synthesized audio has zero duration: {}", output.display()),
            });
        }

        Ok(SynthesizedVoice {
            audio_path: output.to_path_buf(),
            duration,
        })
    }
}

/// Substitute the stock fallback when the narration is too short to speak.
pub fn effective_text(text: &str) -> &str {
    if text.trim().chars().count() < MIN_SCRIPT_CHARS {
        FALLBACK_NARRATION
    } else {
        text
    }
}

/// Duration of a media file in seconds, via ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(ReelforgeError::Render {
            reason: format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ReelforgeError::Render {
            reason: format!("ffprobe returned no duration for {}", path.display()),
        }
    })
}

fn parse_probe_output(stdout: &str) -> Option<f64> {
    stdout.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_replaced_by_fallback() {
        assert_eq!(effective_text("hi"), FALLBACK_NARRATION);
        assert_eq!(effective_text("   a  "), FALLBACK_NARRATION);
        assert_eq!(effective_text(""), FALLBACK_NARRATION);
    }

    #[test]
    fn real_text_passes_through() {
        let text = "Breaking news about artificial intelligence.";
        assert_eq!(effective_text(text), text);
    }

    #[test]
    fn probe_output_parses_plain_float() {
        assert_eq!(parse_probe_output("34.217324\n"), Some(34.217324));
        assert_eq!(parse_probe_output("garbage"), None);
        assert_eq!(parse_probe_output(""), None);
    }
}
