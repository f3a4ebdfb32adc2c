use std::path::Path;
use tokio::fs;
use tracing::info;

use crate::error::{Result, SubdubError};
use crate::segment::TimedSegment;

/// Generate an SRT subtitle file from segments, in the order given.
///
/// Overwrites `output_path`. Segment text is trimmed; multi-line text is kept as-is,
/// which is how bilingual cues are written.
pub async fn write_srt<P: AsRef<Path>>(segments: &[TimedSegment], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    fs::write(output_path, render_srt(segments)).await?;

    info!("SRT file generated with {} cues", segments.len());
    Ok(())
}

/// Render segments as SubRip text. No sorting or merging happens here.
pub fn render_srt(segments: &[TimedSegment]) -> String {
    let mut srt_content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(segment.start),
            format_timestamp(segment.end),
            segment.text.trim()
        ));
    }

    srt_content
}

/// Format time in seconds to SRT time format (HH:MM:SS,mmm).
///
/// The value is first resolved to whole microseconds, then truncated to milliseconds,
/// so `1.9999` gives `00:00:01,999` while `59.999` is not dragged down by float error.
pub fn format_timestamp(seconds: f64) -> String {
    let total_micros = (seconds.max(0.0) * 1_000_000.0).round() as u64;
    let total_milliseconds = total_micros / 1_000;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Zip English and Chinese segments into two-line cues timed like the English side.
pub fn merge_bilingual(english: &[TimedSegment], chinese: &[TimedSegment]) -> Result<Vec<TimedSegment>> {
    if english.len() != chinese.len() {
        return Err(SubdubError::Consistency(format!(
            "cannot merge {} English segments with {} Chinese segments",
            english.len(),
            chinese.len()
        )));
    }

    Ok(english
        .iter()
        .zip(chinese)
        .map(|(en, zh)| en.with_text(format!("{}\n{}", en.text.trim(), zh.text.trim())))
        .collect())
}
