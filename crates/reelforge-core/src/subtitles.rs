use std::fmt::Write as _;

use crate::types::{SegmentKind, TimedWord};

/// Styling for the burned-in text track.
#[derive(Debug, Clone)]
pub struct CaptionStyle {
    pub font_name: String,
    pub caption_font_size: u32,
    pub overlay_font_size: u32,
    /// ASS colors are &HAABBGGRR. Captions alternate between these two by
    /// word index parity.
    pub highlight_even: String,
    pub highlight_odd: String,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            caption_font_size: 60,
            overlay_font_size: 72,
            // Yellow and cyan.
            highlight_even: "&H0000FFFF".to_string(),
            highlight_odd: "&H00FFFF00".to_string(),
        }
    }
}

/// A segment-level text overlay (hook / point / CTA copy).
#[derive(Debug, Clone, PartialEq)]
pub struct TextOverlay {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub kind: SegmentKind,
}

/// Render overlays and per-word captions as one ASS subtitle track.
///
/// Captions sit in the bottom third of the frame; overlays are centered
/// except the CTA, which drops to the lower area like the source layouts.
pub fn build_ass(
    overlays: &[TextOverlay],
    captions: &[TimedWord],
    style: &CaptionStyle,
    width: u32,
    height: u32,
) -> String {
    let mut out = String::new();
    let caption_margin = height / 6;

    let _ = writeln!(out, "[Script Info]");
    let _ = writeln!(out, "ScriptType: v4.00+");
    let _ = writeln!(out, "PlayResX: {width}");
    let _ = writeln!(out, "PlayResY: {height}");
    let _ = writeln!(out, "WrapStyle: 0");
    let _ = writeln!(out);
    let _ = writeln!(out, "[V4+ Styles]");
    let _ = writeln!(
        out,
        "Format: Name, Fontname, Fontsize, PrimaryColour, OutlineColour, Bold, Outline, Shadow, Alignment, MarginL, MarginR, MarginV"
    );
    let _ = writeln!(
        out,
        "Style: Overlay,{font},{size},&H00FFFFFF,&H00000000,1,3,0,5,40,40,0",
        font = style.font_name,
        size = style.overlay_font_size,
    );
    let _ = writeln!(
        out,
        "Style: CaptionEven,{font},{size},{color},&H00000000,1,3,0,2,40,40,{margin}",
        font = style.font_name,
        size = style.caption_font_size,
        color = style.highlight_even,
        margin = caption_margin,
    );
    let _ = writeln!(
        out,
        "Style: CaptionOdd,{font},{size},{color},&H00000000,1,3,0,2,40,40,{margin}",
        font = style.font_name,
        size = style.caption_font_size,
        color = style.highlight_odd,
        margin = caption_margin,
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "[Events]");
    let _ = writeln!(out, "Format: Layer, Start, End, Style, Text");

    for overlay in overlays {
        let position = match overlay.kind {
            SegmentKind::Cta => "{\\an2\\fad(300,300)}",
            _ => "{\\fad(300,300)}",
        };
        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},Overlay,{}{}",
            format_timestamp(overlay.start),
            format_timestamp(overlay.end),
            position,
            escape_text(&overlay.text),
        );
    }

    for (index, word) in captions.iter().enumerate() {
        let ass_style = if index % 2 == 0 {
            "CaptionEven"
        } else {
            "CaptionOdd"
        };
        let _ = writeln!(
            out,
            "Dialogue: 1,{},{},{},{}",
            format_timestamp(word.start),
            format_timestamp(word.end),
            ass_style,
            escape_text(&word.text.to_uppercase()),
        );
    }

    out
}

/// ASS timestamps are `H:MM:SS.CS` (centiseconds).
pub fn format_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours}:{mins:02}:{secs:02}.{cs:02}")
}

/// Braces would open ASS override blocks; newlines must become soft breaks.
fn escape_text(text: &str) -> String {
    text.replace('{', "(").replace('}', ")").replace('\n', "\\N")
}
