use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;

use reelforge_core::captions::CaptionPolicy;
use reelforge_core::compose::{rendered_duration, write_thumbnail};
use reelforge_core::config::{PipelineConfig, RenderProfile};
use reelforge_core::footage::{assign_queries, fetch_assets};
use reelforge_core::pipeline::PipelineDeps;
use reelforge_core::score::{save_report, score_script};
use reelforge_core::segments::{SegmentPolicy, plan_segments};
use reelforge_core::types::{DurationFlag, Script, VideoFormat};
use reelforge_core::voice::{DEFAULT_VOICE, VOICES};
use reelforge_core::{assemble_timeline, render_timeline, time_captions};

use rand::SeedableRng;
use rand::rngs::StdRng;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", secs / 60.0, secs % 60.0)
    }
}

/// CLI wrapper for VideoFormat (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliFormat {
    #[default]
    Reels,
    Square,
    Landscape,
}

impl From<CliFormat> for VideoFormat {
    fn from(cli: CliFormat) -> Self {
        match cli {
            CliFormat::Reels => VideoFormat::Reels,
            CliFormat::Square => VideoFormat::Square,
            CliFormat::Landscape => VideoFormat::Landscape,
        }
    }
}

#[derive(Parser)]
#[command(name = "reelforge")]
#[command(
    about = "Assemble a short vertical video from a script: narration, captions, stock footage, and ffmpeg rendering"
)]
struct Cli {
    /// Path to the script JSON (workflow payload or plain script object)
    script: PathBuf,

    /// Output aspect preset
    #[arg(short, long, default_value = "reels")]
    format: CliFormat,

    /// Background music track mixed under the narration
    #[arg(short, long)]
    music: Option<PathBuf>,

    /// Neural voice name, e.g. "en-GB-RyanNeural"
    #[arg(short, long, default_value = DEFAULT_VOICE)]
    voice: String,

    /// Speaking-rate modifier passed to the synthesizer, e.g. "-10%"
    #[arg(long)]
    rate: Option<String>,

    /// Seed for caption timing jitter (omit for a wall-clock seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Give each main point a fixed length instead of an even split
    #[arg(long)]
    seconds_per_point: Option<f64>,

    /// Time captions at a constant words-per-second instead of per-word
    /// estimates
    #[arg(long)]
    caption_rate: Option<f64>,

    /// Where rendered videos and reports land
    #[arg(short, long, default_value = "output/videos")]
    output_dir: PathBuf,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let raw = fs::read_to_string(&cli.script)
        .await
        .with_context(|| format!("reading script file {}", cli.script.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw).context("script is not JSON")?;
    let script = Script::from_payload_value(value)?;

    let mut config = PipelineConfig::from_env();
    config.output_dir = cli.output_dir;
    config.music_path = cli.music;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut profile = RenderProfile::for_format(cli.format.into());
    profile.voice = cli.voice;
    if let Some(seconds_per_point) = cli.seconds_per_point {
        profile.segment_policy = SegmentPolicy::Fixed { seconds_per_point };
    }
    if let Some(words_per_second) = cli.caption_rate {
        profile.caption_policy = CaptionPolicy::FixedRate {
            words_per_second,
            overlap_fraction: 0.2,
        };
    }

    let deps = PipelineDeps::from_config(&config, cli.rate)?;

    println!(
        "\n{}  {}\n",
        style("reelforge").cyan().bold(),
        style("Video Assembler").dim()
    );
    println!(
        "{} {} {}",
        style("✓").green().bold(),
        style(&script.title).bold(),
        style(format!("({} points)", script.main_points.len())).dim()
    );
    if config.pexels_api_key.is_none() {
        println!(
            "{} {}",
            style("!").yellow().bold(),
            style("no PEXELS_API_KEY set, segments will use gradient backgrounds").dim()
        );
    }
    if !VOICES.contains(&profile.voice.as_str()) {
        println!(
            "{} {}",
            style("!").yellow().bold(),
            style(format!(
                "voice \"{}\" is outside the known set, synthesis may fail",
                profile.voice
            ))
            .dim()
        );
    }

    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let format_name = profile.format.name();

    let workdir = config.output_dir.join("work");
    fs::create_dir_all(&workdir).await?;
    fs::create_dir_all(&config.output_dir).await?;

    // Step 1: Narration
    let step_start = Instant::now();
    let spinner = create_spinner("Synthesizing narration...");
    let voice_path = workdir.join(format!("voice_{format_name}_{stamp}.mp3"));
    let narration = deps
        .synthesizer
        .synthesize(&script.voiceover, &profile.voice, &voice_path)
        .await?;
    spinner.finish_with_message(format!(
        "{} Narration: {:.1}s, {} {}",
        style("✓").green().bold(),
        narration.duration,
        style(&profile.voice).yellow(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 2: Captions and segments
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
    println!(
        "{} Planned {} segments, {} caption words",
        style("✓").green().bold(),
        segments.len(),
        captions.len()
    );

    // Step 3: Footage
    let step_start = Instant::now();
    let spinner = create_spinner("Fetching stock footage...");
    let queries = assign_queries(&segments);
    let assets = fetch_assets(
        Arc::clone(&deps.provider),
        Arc::clone(&deps.cache),
        &queries,
    )
    .await;
    let found = assets.iter().filter(|a| a.is_some()).count();
    spinner.finish_with_message(format!(
        "{} Footage: {}/{} clips, rest use gradients {}",
        style("✓").green().bold(),
        found,
        assets.len(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 4: Render
    let step_start = Instant::now();
    let spinner = create_spinner("Rendering timeline with ffmpeg...");
    let timeline = assemble_timeline(&segments, &script, &assets, captions, profile.crossfade);
    let out_len = rendered_duration(&timeline.base, timeline.crossfade);
    let output = config
        .output_dir
        .join(format!("video_{format_name}_{stamp}.mp4"));
    render_timeline(
        &timeline,
        &profile,
        &narration.audio_path,
        config.music_path.as_deref(),
        &workdir,
        &output,
    )
    .await?;
    spinner.finish_with_message(format!(
        "{} Rendered: {:.1}s {} {}",
        style("✓").green().bold(),
        out_len,
        style(format_name).yellow(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 5: Thumbnail and quality report
    let thumbnail = config
        .output_dir
        .join(format!("thumbnail_{format_name}_{stamp}.jpg"));
    write_thumbnail(&output, &thumbnail, profile.thumbnail_offset, out_len).await?;

    let report = score_script(
        &script,
        out_len,
        config.music_path.is_some(),
        vec![format_name.to_string()],
    );
    let report_path = config
        .output_dir
        .join(format!("quality_report_{format_name}_{stamp}.json"));
    save_report(&report, &report_path).await?;

    let duration_note = match report.duration_flag {
        DurationFlag::Optimal => style("optimal").green(),
        DurationFlag::Adjust => style("adjust").yellow(),
    };
    println!(
        "{} Quality: hook {}/10, duration {}",
        style("✓").green().bold(),
        report.hook_strength,
        duration_note
    );

    let _ = fs::remove_file(&narration.audio_path).await;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );
    println!(
        "{} {}",
        style("Saved:").dim(),
        style(output.display()).cyan()
    );
    println!(
        "{} {}",
        style("Thumbnail:").dim(),
        style(thumbnail.display()).cyan()
    );
    println!(
        "{} {}",
        style("Report:").dim(),
        style(report_path.display()).cyan()
    );

    Ok(())
}
