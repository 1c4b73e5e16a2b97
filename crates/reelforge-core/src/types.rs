use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReelforgeError, Result};

/// Default title used when upstream automation sends none.
pub const DEFAULT_TITLE: &str = "AI News Update";

/// A normalized, validated video script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub title: String,
    pub hook: String,
    pub main_points: Vec<String>,
    pub cta: String,
    pub voiceover: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub target_duration: Option<f64>,
}

/// Wire form posted by upstream automation. Fields mirror the nested JSON
/// layout the workflow engine produces.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptPayload {
    #[serde(default)]
    pub video_details: VideoDetails,
    #[serde(default)]
    pub script_components: ScriptComponents,
    #[serde(default)]
    pub voiceover: String,
    #[serde(default)]
    pub voiceover_script: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoDetails {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScriptComponents {
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub main_points: Vec<String>,
    #[serde(default)]
    pub cta: String,
}

impl Script {
    /// Normalize an incoming JSON payload into a validated `Script`.
    ///
    /// The upstream workflow sometimes wraps the real payload under a
    /// `content` field (as a JSON string) or under a numeric `"0"` key, so
    /// both forms are unwrapped before deserialization.
    pub fn from_payload_value(value: serde_json::Value) -> Result<Script> {
        let unwrapped = unwrap_payload(value)?;
        let payload: ScriptPayload = serde_json::from_value(unwrapped)?;
        Script::from_payload(payload)
    }

    pub fn from_payload(payload: ScriptPayload) -> Result<Script> {
        let components = payload.script_components;

        let mut voiceover = payload.voiceover.trim().to_string();
        if voiceover.is_empty() {
            voiceover = payload.voiceover_script.trim().to_string();
        }
        if voiceover.is_empty() {
            voiceover = format!(
                "{} {} {}",
                components.hook,
                components.main_points.join(" "),
                components.cta
            )
            .trim()
            .to_string();
        }

        let title = if payload.video_details.title.trim().is_empty() {
            DEFAULT_TITLE.to_string()
        } else {
            payload.video_details.title.trim().to_string()
        };

        let script = Script {
            title,
            hook: components.hook,
            main_points: components.main_points,
            cta: components.cta,
            voiceover,
            hashtags: payload.hashtags,
            target_duration: payload.duration,
        };
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.voiceover.trim().is_empty() {
            return Err(ReelforgeError::Validation {
                field: "voiceover",
                reason: "narration text is empty".to_string(),
            });
        }
        if self.main_points.is_empty() {
            return Err(ReelforgeError::Validation {
                field: "main_points",
                reason: "at least one main point is required".to_string(),
            });
        }
        Ok(())
    }
}

fn unwrap_payload(value: serde_json::Value) -> Result<serde_json::Value> {
    if let serde_json::Value::Object(map) = &value {
        if let Some(serde_json::Value::String(inner)) = map.get("content") {
            return Ok(serde_json::from_str(inner)?);
        }
        if let Some(inner) = map.get("0") {
            return Ok(inner.clone());
        }
    }
    Ok(value)
}

/// One word with its on-screen display interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedWord {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Narrative role of a time window in the final video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Hook,
    Point { index: usize },
    Cta,
}

/// A contiguous window of the final video assigned one narrative role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: f64,
    pub duration: f64,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A downloaded, cached stock clip assigned to a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FootageAsset {
    pub local_path: PathBuf,
    pub source_query: String,
    pub cache_key: String,
}

/// Output aspect presets. Reels is the primary vertical format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoFormat {
    Reels,
    Square,
    Landscape,
}

impl VideoFormat {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoFormat::Reels => (1080, 1920),
            VideoFormat::Square => (1080, 1080),
            VideoFormat::Landscape => (1920, 1080),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoFormat::Reels => "reels",
            VideoFormat::Square => "square",
            VideoFormat::Landscape => "landscape",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationFlag {
    Optimal,
    Adjust,
}

/// Heuristic quality annotations written next to each rendered video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub hook_strength: u8,
    pub information_density: usize,
    pub duration_flag: DurationFlag,
    /// Fixed placeholder carried over from the source system; not derived
    /// from the other fields.
    pub predicted_score: f64,
    pub has_subtitles: bool,
    pub has_music: bool,
    pub hashtags: Vec<String>,
    pub formats_created: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// A finished render plus its sidecar artifacts.
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub thumbnail: PathBuf,
    pub report: QualityReport,
}
