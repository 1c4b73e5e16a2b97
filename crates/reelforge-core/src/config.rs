use std::path::PathBuf;

use crate::cache::default_cache_root;
use crate::captions::CaptionPolicy;
use crate::footage::PEXELS_KEY_ENV;
use crate::segments::SegmentPolicy;
use crate::subtitles::CaptionStyle;
use crate::types::VideoFormat;
use crate::voice::DEFAULT_VOICE;

/// Environment-level settings shared by every build in a process.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Optional background music track mixed under the narration.
    pub music_path: Option<PathBuf>,
    pub pexels_api_key: Option<String>,
    /// Seed for caption jitter; fixed seed makes builds reproducible.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output/videos"),
            cache_dir: default_cache_root(),
            music_path: None,
            pexels_api_key: None,
            seed: 0,
        }
    }
}

impl PipelineConfig {
    /// Config from the process environment: API key from `PEXELS_API_KEY`,
    /// seed from the wall clock.
    pub fn from_env() -> Self {
        Self {
            pexels_api_key: std::env::var(PEXELS_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty()),
            seed: chrono::Utc::now().timestamp_millis() as u64,
            ..Self::default()
        }
    }
}

/// Per-render knobs: one profile per output format.
#[derive(Debug, Clone)]
pub struct RenderProfile {
    pub format: VideoFormat,
    pub fps: u32,
    /// Seconds of overlap between adjacent segments.
    pub crossfade: f64,
    /// Background music level relative to narration.
    pub music_gain: f64,
    /// Maximum Ken Burns zoom factor reached at the end of a segment.
    pub ken_burns_zoom: f64,
    /// Where in the video the thumbnail frame is grabbed.
    pub thumbnail_offset: f64,
    pub voice: String,
    pub caption_policy: CaptionPolicy,
    pub segment_policy: SegmentPolicy,
    pub caption_style: CaptionStyle,
}

impl Default for RenderProfile {
    fn default() -> Self {
        Self {
            format: VideoFormat::Reels,
            fps: 30,
            crossfade: 0.5,
            music_gain: 0.1,
            ken_burns_zoom: 1.1,
            thumbnail_offset: 2.0,
            voice: DEFAULT_VOICE.to_string(),
            caption_policy: CaptionPolicy::default(),
            segment_policy: SegmentPolicy::default(),
            caption_style: CaptionStyle::default(),
        }
    }
}

impl RenderProfile {
    pub fn for_format(format: VideoFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }
}
