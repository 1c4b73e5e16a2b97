//! Reelforge Core Library
//!
//! Core functionality for assembling short vertical videos: voice synthesis,
//! caption timing, segment planning, stock footage selection, and ffmpeg
//! timeline rendering.

pub mod cache;
pub mod captions;
pub mod compose;
pub mod config;
pub mod error;
pub mod footage;
pub mod pipeline;
pub mod score;
pub mod segments;
pub mod subtitles;
pub mod types;
pub mod voice;

// Re-export commonly used items at crate root
pub use cache::FootageCache;
pub use captions::{CaptionPolicy, time_captions};
pub use compose::{Timeline, assemble_timeline, render_timeline, rendered_duration};
pub use config::{PipelineConfig, RenderProfile};
pub use error::{ReelforgeError, Result};
pub use footage::{FootageProvider, PexelsClient, assign_queries, fetch_assets};
pub use pipeline::{PipelineDeps, build_all_formats, build_video};
pub use score::{hook_strength, save_report, score_script};
pub use segments::{SegmentPolicy, plan_segments};
pub use types::{
    FootageAsset, QualityReport, RenderedVideo, Script, Segment, SegmentKind, TimedWord,
    VideoFormat,
};
pub use voice::{EdgeTts, SpeechSynthesizer, SynthesizedVoice};
