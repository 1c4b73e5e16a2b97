use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use crate::cache::FootageCache;
use crate::captions::time_captions;
use crate::compose::{assemble_timeline, render_timeline, rendered_duration, write_thumbnail};
use crate::config::{PipelineConfig, RenderProfile};
use crate::error::{ReelforgeError, Result};
use crate::footage::{FootageProvider, PexelsClient, assign_queries, fetch_assets};
use crate::score::{save_report, score_script};
use crate::segments::plan_segments;
use crate::types::{RenderedVideo, Script, VideoFormat};
use crate::voice::{EdgeTts, SpeechSynthesizer};

/// External services a build talks to, behind trait objects so tests can
/// substitute stubs.
#[derive(Clone)]
pub struct PipelineDeps {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub provider: Arc<dyn FootageProvider>,
    pub cache: Arc<FootageCache>,
}

impl PipelineDeps {
    /// Production wiring: edge-tts narration, Pexels footage, on-disk cache.
    pub fn from_config(config: &PipelineConfig, rate: Option<String>) -> Result<Self> {
        Ok(Self {
            synthesizer: Arc::new(EdgeTts::new(rate)),
            provider: Arc::new(PexelsClient::new(config.pexels_api_key.clone())),
            cache: Arc::new(FootageCache::open(&config.cache_dir)?),
        })
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(ReelforgeError::Cancelled)
    } else {
        Ok(())
    }
}

/// Run the full assembly for one output format.
///
/// Stages: narration synthesis, caption timing, segment planning, footage
/// fetch, timeline render, thumbnail, quality report. The cancellation token
/// is checked between stages; a fired token stops the build at the next
/// boundary with `Cancelled`.
pub async fn build_video(
    script: &Script,
    profile: &RenderProfile,
    config: &PipelineConfig,
    deps: &PipelineDeps,
    cancel: &CancellationToken,
) -> Result<RenderedVideo> {
    ensure_live(cancel)?;
    script.validate()?;

    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let format_name = profile.format.name();
    let workdir = config.output_dir.join("work");
    tokio::fs::create_dir_all(&workdir).await?;
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let voice_path = workdir.join(format!("voice_{format_name}_{stamp}.mp3"));
    tracing::info!(voice = %profile.voice, "synthesizing narration");
    let narration = deps
        .synthesizer
        .synthesize(&script.voiceover, &profile.voice, &voice_path)
        .await?;
    ensure_live(cancel)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let captions = time_captions(
        &script.voiceover,
        narration.duration,
        &profile.caption_policy,
        &mut rng,
    )?;
    let segments = plan_segments(
        narration.duration,
        script.main_points.len(),
        &profile.segment_policy,
    )?;
    ensure_live(cancel)?;

    let queries = assign_queries(&segments);
    tracing::info!(count = queries.len(), "fetching stock footage");
    let assets = fetch_assets(
        Arc::clone(&deps.provider),
        Arc::clone(&deps.cache),
        &queries,
    )
    .await;
    ensure_live(cancel)?;

    let timeline = assemble_timeline(&segments, script, &assets, captions, profile.crossfade);
    let out_len = rendered_duration(&timeline.base, timeline.crossfade);

    let output = config
        .output_dir
        .join(format!("video_{format_name}_{stamp}.mp4"));
    tracing::info!(output = %output.display(), seconds = out_len, "rendering timeline");
    render_timeline(
        &timeline,
        profile,
        &narration.audio_path,
        config.music_path.as_deref(),
        &workdir,
        &output,
    )
    .await?;
    ensure_live(cancel)?;

    let thumbnail = config
        .output_dir
        .join(format!("thumbnail_{format_name}_{stamp}.jpg"));
    write_thumbnail(&output, &thumbnail, profile.thumbnail_offset, out_len).await?;

    let report = score_script(
        script,
        out_len,
        config.music_path.is_some(),
        vec![format_name.to_string()],
    );
    let report_path = config
        .output_dir
        .join(format!("quality_report_{format_name}_{stamp}.json"));
    save_report(&report, &report_path).await?;

    // Narration is re-synthesized per build; drop the temp audio.
    if let Err(err) = tokio::fs::remove_file(&narration.audio_path).await {
        tracing::debug!(%err, "could not remove narration temp file");
    }

    Ok(RenderedVideo {
        path: output,
        thumbnail,
        report,
    })
}

/// Build the standard distribution set (vertical plus square), keyed by
/// format name. Fails on the first format that fails.
pub async fn build_all_formats(
    script: &Script,
    config: &PipelineConfig,
    deps: &PipelineDeps,
    cancel: &CancellationToken,
) -> Result<BTreeMap<String, RenderedVideo>> {
    let mut videos = BTreeMap::new();
    for format in [VideoFormat::Reels, VideoFormat::Square] {
        let profile = RenderProfile::for_format(format);
        let rendered = build_video(script, &profile, config, deps, cancel).await?;
        videos.insert(format.name().to_string(), rendered);
    }
    Ok(videos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footage::FootageHit;
    use crate::voice::SynthesizedVoice;
    use async_trait::async_trait;
    use std::path::Path;

    struct StubSynth;

    #[async_trait]
    impl SpeechSynthesizer for StubSynth {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &str,
            output: &Path,
        ) -> Result<SynthesizedVoice> {
            Ok(SynthesizedVoice {
                audio_path: output.to_path_buf(),
                duration: 30.0,
            })
        }
    }

    struct NoFootage;

    #[async_trait]
    impl FootageProvider for NoFootage {
        async fn search(&self, _q: &str, _c: u32, _o: &str) -> Result<Vec<FootageHit>> {
            Ok(Vec::new())
        }

        async fn download(&self, _url: &str, _dest: &Path) -> Result<()> {
            Ok(())
        }
    }

    fn stub_deps(cache_dir: &Path) -> PipelineDeps {
        PipelineDeps {
            synthesizer: Arc::new(StubSynth),
            provider: Arc::new(NoFootage),
            cache: Arc::new(FootageCache::open(cache_dir).unwrap()),
        }
    }

    fn sample_script() -> Script {
        Script {
            title: "Test".to_string(),
            hook: "Breaking!".to_string(),
            main_points: vec!["one".to_string(), "two".to_string()],
            cta: "Follow!".to_string(),
            voiceover: "Breaking! One thing. Two things. Follow!".to_string(),
            hashtags: vec![],
            target_duration: None,
        }
    }

    #[tokio::test]
    async fn fired_token_stops_the_build_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join("cache"),
            ..PipelineConfig::default()
        };
        let deps = stub_deps(&config.cache_dir);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = build_video(
            &sample_script(),
            &RenderProfile::default(),
            &config,
            &deps,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReelforgeError::Cancelled));
        // Nothing was written.
        assert!(!config.output_dir.exists());
    }

    #[tokio::test]
    async fn invalid_script_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().join("out"),
            cache_dir: dir.path().join("cache"),
            ..PipelineConfig::default()
        };
        let deps = stub_deps(&config.cache_dir);

        let mut script = sample_script();
        script.main_points.clear();

        let err = build_video(
            &script,
            &RenderProfile::default(),
            &config,
            &deps,
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReelforgeError::Validation { .. }));
    }
}
