use std::path::{Path, PathBuf};
use std::sync::Once;

use tokio::process::Command;

use crate::config::RenderProfile;
use crate::error::{ReelforgeError, Result};
use crate::subtitles::{self, CaptionStyle, TextOverlay};
use crate::types::{FootageAsset, Script, Segment, SegmentKind, TimedWord};

/// Overlay copy is clipped so lower thirds stay readable.
const OVERLAY_MAX_CHARS: usize = 60;

/// Fallback background gradient, dark blue-gray into deep purple.
pub const GRADIENT_TOP: Rgb = Rgb(20, 20, 30);
pub const GRADIENT_BOTTOM: Rgb = Rgb(80, 0, 130);

/// Substitute when the configured caption font is not installed.
const FALLBACK_FONT: &str = "Arial";

static FONT_FALLBACK: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_ffmpeg(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Visual source for one segment's base layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSource {
    Footage(PathBuf),
    Gradient { top: Rgb, bottom: Rgb },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaseLayer {
    pub start: f64,
    pub duration: f64,
    pub source: LayerSource,
}

/// Ordered set of layers ready for one ffmpeg invocation.
#[derive(Debug, Clone)]
pub struct Timeline {
    pub base: Vec<BaseLayer>,
    pub overlays: Vec<TextOverlay>,
    pub captions: Vec<TimedWord>,
    pub crossfade: f64,
}

/// Final output length: segment durations minus the crossfade overlaps.
pub fn rendered_duration(base: &[BaseLayer], crossfade: f64) -> f64 {
    let total: f64 = base.iter().map(|l| l.duration).sum();
    let overlaps = base.len().saturating_sub(1) as f64 * crossfade;
    total - overlaps
}

/// Start offset (in output time) for each crossfade transition.
pub fn xfade_offsets(base: &[BaseLayer], crossfade: f64) -> Vec<f64> {
    let mut offsets = Vec::new();
    let mut out_len = 0.0;
    for (i, layer) in base.iter().enumerate() {
        out_len += layer.duration;
        if i > 0 {
            out_len -= crossfade;
        }
        if i + 1 < base.len() {
            offsets.push(out_len - crossfade);
        }
    }
    offsets
}

/// Pair each planner segment with its footage (or the gradient fallback) and
/// attach segment copy and captions.
pub fn assemble_timeline(
    segments: &[Segment],
    script: &Script,
    assets: &[Option<FootageAsset>],
    captions: Vec<TimedWord>,
    crossfade: f64,
) -> Timeline {
    let base = segments
        .iter()
        .enumerate()
        .map(|(i, segment)| BaseLayer {
            start: segment.start,
            duration: segment.duration,
            source: match assets.get(i).and_then(Option::as_ref) {
                Some(asset) => LayerSource::Footage(asset.local_path.clone()),
                None => LayerSource::Gradient {
                    top: GRADIENT_TOP,
                    bottom: GRADIENT_BOTTOM,
                },
            },
        })
        .collect();

    let overlays = segments
        .iter()
        .filter_map(|segment| {
            let text = match segment.kind {
                SegmentKind::Hook => script.hook.as_str(),
                SegmentKind::Point { index } => {
                    script.main_points.get(index).map(String::as_str)?
                }
                SegmentKind::Cta => script.cta.as_str(),
            };
            let text = truncate_overlay(text);
            if text.is_empty() {
                return None;
            }
            Some(TextOverlay {
                text,
                start: segment.start,
                end: segment.end(),
                kind: segment.kind,
            })
        })
        .collect();

    Timeline {
        base,
        overlays,
        captions,
        crossfade,
    }
}

fn truncate_overlay(text: &str) -> String {
    text.trim().chars().take(OVERLAY_MAX_CHARS).collect()
}

/// Build the full ffmpeg argument vector for a timeline render.
///
/// Video: per-segment scale/crop to the target aspect with a slow Ken Burns
/// zoom (gradient sources for segments without footage), joined by symmetric
/// crossfades, then the ASS text track burned in. Audio: narration trimmed
/// to the output length, with background music looped/trimmed underneath at
/// a fixed low gain.
pub fn compile_render(
    timeline: &Timeline,
    profile: &RenderProfile,
    narration: &Path,
    music: Option<&Path>,
    subtitle_path: &Path,
    output: &Path,
) -> Vec<String> {
    let (width, height) = profile.format.dimensions();
    let fps = profile.fps;
    let out_len = rendered_duration(&timeline.base, timeline.crossfade);

    let mut args: Vec<String> = vec!["-y".into()];

    for layer in &timeline.base {
        match &layer.source {
            LayerSource::Footage(path) => {
                args.push("-stream_loop".into());
                args.push("-1".into());
                args.push("-i".into());
                args.push(path.to_string_lossy().into_owned());
            }
            LayerSource::Gradient { top, bottom } => {
                args.push("-f".into());
                args.push("lavfi".into());
                args.push("-i".into());
                args.push(format!(
                    "gradients=s={width}x{height}:c0={}:c1={}:d={}",
                    top.to_ffmpeg(),
                    bottom.to_ffmpeg(),
                    layer.duration,
                ));
            }
        }
    }

    let narration_index = timeline.base.len();
    args.push("-i".into());
    args.push(narration.to_string_lossy().into_owned());

    let music_index = music.map(|path| {
        args.push("-stream_loop".into());
        args.push("-1".into());
        args.push("-i".into());
        args.push(path.to_string_lossy().into_owned());
        narration_index + 1
    });

    let mut filters: Vec<String> = Vec::new();
    for (i, layer) in timeline.base.iter().enumerate() {
        let frames = (layer.duration * fps as f64).round().max(1.0) as u64;
        let zoom_range = profile.ken_burns_zoom - 1.0;
        match &layer.source {
            LayerSource::Footage(_) => {
                filters.push(format!(
                    "[{i}:v]trim=duration={dur},setpts=PTS-STARTPTS,\
                     scale={width}:{height}:force_original_aspect_ratio=increase,\
                     crop={width}:{height},\
                     zoompan=z='min(1+{zoom_range}*in/{frames},{zmax})':d=1:s={width}x{height}:fps={fps},\
                     setsar=1[v{i}]",
                    dur = layer.duration,
                    zmax = profile.ken_burns_zoom,
                ));
            }
            LayerSource::Gradient { .. } => {
                filters.push(format!(
                    "[{i}:v]trim=duration={dur},setpts=PTS-STARTPTS,fps={fps},setsar=1[v{i}]",
                    dur = layer.duration,
                ));
            }
        }
    }

    let offsets = xfade_offsets(&timeline.base, timeline.crossfade);
    let mut current = "v0".to_string();
    for (k, offset) in offsets.iter().enumerate() {
        let next_label = format!("x{}", k + 1);
        filters.push(format!(
            "[{current}][v{}]xfade=transition=fade:duration={}:offset={offset:.4}[{next_label}]",
            k + 1,
            timeline.crossfade,
        ));
        current = next_label;
    }

    filters.push(format!(
        "[{current}]ass='{}'[outv]",
        escape_filter_path(subtitle_path),
    ));

    match music_index {
        Some(mi) => {
            filters.push(format!(
                "[{narration_index}:a]atrim=duration={out_len:.4},asetpts=PTS-STARTPTS[voice]"
            ));
            filters.push(format!(
                "[{mi}:a]atrim=duration={out_len:.4},asetpts=PTS-STARTPTS,volume={}[bgm]",
                profile.music_gain,
            ));
            filters.push(
                "[voice][bgm]amix=inputs=2:duration=first:normalize=0[outa]".to_string(),
            );
        }
        None => {
            filters.push(format!(
                "[{narration_index}:a]atrim=duration={out_len:.4},asetpts=PTS-STARTPTS[outa]"
            ));
        }
    }

    args.push("-filter_complex".into());
    args.push(filters.join(";"));
    args.push("-map".into());
    args.push("[outv]".into());
    args.push("-map".into());
    args.push("[outa]".into());
    args.push("-c:v".into());
    args.push("libx264".into());
    args.push("-preset".into());
    args.push("medium".into());
    args.push("-crf".into());
    args.push("18".into());
    args.push("-c:a".into());
    args.push("aac".into());
    args.push("-b:a".into());
    args.push("192k".into());
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(output.to_string_lossy().into_owned());

    args
}

fn escape_filter_path(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "\\'")
}

/// Caption style with the font checked against the installed set; an
/// unavailable font drops to the fallback with a single logged warning
/// instead of letting libass substitute silently.
async fn resolve_caption_style(style: &CaptionStyle) -> CaptionStyle {
    if style.font_name == FALLBACK_FONT || font_installed(&style.font_name).await {
        return style.clone();
    }
    FONT_FALLBACK.call_once(|| {
        tracing::warn!(
            font = %style.font_name,
            fallback = FALLBACK_FONT,
            "configured caption font is not installed"
        );
    });
    CaptionStyle {
        font_name: FALLBACK_FONT.to_string(),
        ..style.clone()
    }
}

async fn font_installed(name: &str) -> bool {
    match Command::new("fc-list").arg(":").arg("family").output().await {
        Ok(out) if out.status.success() => {
            font_listed(&String::from_utf8_lossy(&out.stdout), name)
        }
        // No fontconfig on this system; let the renderer resolve the name.
        _ => true,
    }
}

fn font_listed(families: &str, name: &str) -> bool {
    families
        .lines()
        .flat_map(|line| line.split(','))
        .any(|family| family.trim().eq_ignore_ascii_case(name))
}

/// Write the text track and run the compiled ffmpeg invocation.
pub async fn render_timeline(
    timeline: &Timeline,
    profile: &RenderProfile,
    narration: &Path,
    music: Option<&Path>,
    workdir: &Path,
    output: &Path,
) -> Result<()> {
    let (width, height) = profile.format.dimensions();
    let style = resolve_caption_style(&profile.caption_style).await;
    let subtitle_path = workdir.join("overlays.ass");
    let ass = subtitles::build_ass(&timeline.overlays, &timeline.captions, &style, width, height);
    tokio::fs::write(&subtitle_path, ass).await?;

    let args = compile_render(timeline, profile, narration, music, &subtitle_path, output);
    let result = Command::new("ffmpeg").args(&args).output().await?;
    if !result.status.success() {
        return Err(ReelforgeError::Render {
            reason: String::from_utf8_lossy(&result.stderr).to_string(),
        });
    }
    Ok(())
}

/// Grab a single thumbnail frame, clamped into range for short videos.
pub async fn write_thumbnail(video: &Path, thumbnail: &Path, offset: f64, total: f64) -> Result<()> {
    let seek = offset.min(total / 2.0).max(0.0);
    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-ss")
        .arg(format!("{seek:.2}"))
        .arg("-i")
        .arg(video)
        .arg("-frames:v")
        .arg("1")
        .arg("-q:v")
        .arg("2")
        .arg(thumbnail)
        .output()
        .await?;
    if !result.status.success() {
        return Err(ReelforgeError::Render {
            reason: format!(
                "thumbnail extraction failed: {}",
                String::from_utf8_lossy(&result.stderr)
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderProfile;
    use crate::segments::{SegmentPolicy, plan_segments};

    const EPS: f64 = 1e-9;

    fn gradient_layer(start: f64, duration: f64) -> BaseLayer {
        BaseLayer {
            start,
            duration,
            source: LayerSource::Gradient {
                top: GRADIENT_TOP,
                bottom: GRADIENT_BOTTOM,
            },
        }
    }

    fn sample_script() -> Script {
        Script {
            title: "Test".to_string(),
            hook: "Breaking news!".to_string(),
            main_points: vec!["First point".to_string(), "Second point".to_string()],
            cta: "Follow!".to_string(),
            voiceover: "Breaking news! First point. Second point. Follow!".to_string(),
            hashtags: vec![],
            target_duration: None,
        }
    }

    #[test]
    fn rendered_duration_subtracts_overlaps() {
        let base = vec![
            gradient_layer(0.0, 3.0),
            gradient_layer(3.0, 10.0),
            gradient_layer(13.0, 3.0),
        ];
        assert!((rendered_duration(&base, 0.5) - 15.0).abs() < EPS);
        assert!((rendered_duration(&base[..1], 0.5) - 3.0).abs() < EPS);
    }

    #[test]
    fn xfade_offsets_walk_the_output_clock() {
        let base = vec![
            gradient_layer(0.0, 3.0),
            gradient_layer(3.0, 10.0),
            gradient_layer(13.0, 3.0),
        ];
        let offsets = xfade_offsets(&base, 0.5);
        assert_eq!(offsets.len(), 2);
        assert!((offsets[0] - 2.5).abs() < EPS);
        // 3 + 10 - 0.5 (first overlap) - 0.5 (lead-in) = 12.0
        assert!((offsets[1] - 12.0).abs() < EPS);
    }

    #[test]
    fn timeline_uses_gradient_where_no_asset() {
        let segments = plan_segments(35.0, 2, &SegmentPolicy::Proportional).unwrap();
        let assets = vec![
            None,
            Some(FootageAsset {
                local_path: PathBuf::from("/cache/clip.mp4"),
                source_query: "neon lights".to_string(),
                cache_key: "abc".to_string(),
            }),
            None,
            None,
        ];
        let timeline = assemble_timeline(&segments, &sample_script(), &assets, vec![], 0.5);
        assert_eq!(timeline.base.len(), 4);
        assert!(matches!(
            timeline.base[0].source,
            LayerSource::Gradient { .. }
        ));
        assert!(matches!(timeline.base[1].source, LayerSource::Footage(_)));
        assert!(matches!(
            timeline.base[3].source,
            LayerSource::Gradient { .. }
        ));
    }

    #[test]
    fn timeline_overlays_follow_segment_windows() {
        let segments = plan_segments(35.0, 2, &SegmentPolicy::Proportional).unwrap();
        let assets = vec![None; segments.len()];
        let timeline = assemble_timeline(&segments, &sample_script(), &assets, vec![], 0.5);
        assert_eq!(timeline.overlays.len(), 4);
        assert_eq!(timeline.overlays[0].text, "Breaking news!");
        assert!((timeline.overlays[0].start - 0.0).abs() < EPS);
        assert!((timeline.overlays[0].end - 3.0).abs() < EPS);
        assert_eq!(timeline.overlays[3].kind, SegmentKind::Cta);
        assert!((timeline.overlays[3].end - 35.0).abs() < EPS);
    }

    #[test]
    fn long_overlay_text_is_clipped() {
        let long = "x".repeat(200);
        assert_eq!(truncate_overlay(&long).chars().count(), OVERLAY_MAX_CHARS);
    }

    #[test]
    fn compile_includes_encoder_and_subtitle_track() {
        let timeline = Timeline {
            base: vec![gradient_layer(0.0, 3.0), gradient_layer(3.0, 5.0)],
            overlays: vec![],
            captions: vec![],
            crossfade: 0.5,
        };
        let profile = RenderProfile::default();
        let args = compile_render(
            &timeline,
            &profile,
            Path::new("/tmp/voice.mp3"),
            None,
            Path::new("/tmp/overlays.ass"),
            Path::new("/tmp/out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("libx264"));
        assert!(joined.contains("ass='/tmp/overlays.ass'"));
        assert!(joined.contains("xfade=transition=fade:duration=0.5"));
        assert!(joined.contains("gradients=s=1080x1920"));
        assert!(joined.contains("+faststart"));
        // Narration is input index 2 (after the two gradient sources).
        assert!(joined.contains("[2:a]atrim"));
    }

    #[test]
    fn single_segment_render_has_no_crossfade() {
        let timeline = Timeline {
            base: vec![gradient_layer(0.0, 10.0)],
            overlays: vec![],
            captions: vec![],
            crossfade: 0.5,
        };
        let args = compile_render(
            &timeline,
            &RenderProfile::default(),
            Path::new("/tmp/voice.mp3"),
            None,
            Path::new("/tmp/overlays.ass"),
            Path::new("/tmp/out.mp4"),
        );
        let joined = args.join(" ");
        assert!(!joined.contains("xfade"));
        assert!(joined.contains("[v0]ass="));
    }

    #[test]
    fn music_is_attenuated_and_mixed() {
        let timeline = Timeline {
            base: vec![gradient_layer(0.0, 10.0)],
            overlays: vec![],
            captions: vec![],
            crossfade: 0.5,
        };
        let args = compile_render(
            &timeline,
            &RenderProfile::default(),
            Path::new("/tmp/voice.mp3"),
            Some(Path::new("/tmp/music.mp3")),
            Path::new("/tmp/overlays.ass"),
            Path::new("/tmp/out.mp4"),
        );
        let joined = args.join(" ");
        assert!(joined.contains("volume=0.1"));
        assert!(joined.contains("amix=inputs=2"));
        // Music keeps narration: both labels feed the mix.
        assert!(joined.contains("[voice][bgm]"));
    }

    #[test]
    fn font_lookup_matches_family_lists() {
        let listing = "DejaVu Sans,DejaVu Sans Book\nLiberation Mono\nNoto Sans\n";
        assert!(font_listed(listing, "Liberation Mono"));
        assert!(font_listed(listing, "dejavu sans"));
        assert!(!font_listed(listing, "Impact"));
    }
}
