use serde_json::Value;

use crate::exporter::identity::{FRONTMATTER_DELIMITER, IDENTITY_FIELD};
use crate::exporter::source::{MeetingRecord, SpeakerChannel, TranscriptSegment};

const NO_SUMMARY: &str = "*No summary available.*";

pub fn format_offset(seconds: Option<f64>) -> String {
    let Some(seconds) = seconds else {
        return "[??:??]".to_string();
    };
    let total = seconds.max(0.0) as u64;
    format!("[{:02}:{:02}]", total / 60, total % 60)
}

fn speaker_label(speaker: Option<&SpeakerChannel>) -> Option<&'static str> {
    match speaker? {
        SpeakerChannel::Mic => Some("You"),
        SpeakerChannel::System => Some("Others"),
        SpeakerChannel::Other(_) => None,
    }
}

/// Pull the Markdown body out of a stored summary payload.
///
/// Meetily stores a JSON object; its `markdown` field wins, then
/// `summary`. Payloads that are not JSON are rendered verbatim.
pub fn summary_text(payload: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(Value::Object(map)) => ["markdown", "summary"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .unwrap_or(payload)
            .to_string(),
        Ok(Value::String(text)) => text,
        Ok(other) => other.to_string(),
        Err(_) => payload.to_string(),
    }
}

pub fn render_document(meeting: &MeetingRecord, transcript: &[TranscriptSegment]) -> String {
    let mut blocks = Vec::with_capacity(5 + transcript.len() * 2);
    blocks.push(format!(
        "{FRONTMATTER_DELIMITER}\n{IDENTITY_FIELD} {}\n{FRONTMATTER_DELIMITER}\n",
        meeting.id
    ));
    blocks.push("## Summary\n".to_string());
    blocks.push(match meeting.summary.as_deref() {
        Some(payload) if !payload.is_empty() => summary_text(payload),
        _ => NO_SUMMARY.to_string(),
    });
    blocks.push(format!("\n{FRONTMATTER_DELIMITER}\n"));
    blocks.push("## Transcript\n".to_string());

    for segment in transcript {
        let time = format_offset(segment.offset_seconds);
        blocks.push(match speaker_label(segment.speaker.as_ref()) {
            Some(label) => format!("{time} ({label}) {}", segment.text),
            None => format!("{time} {}", segment.text),
        });
        blocks.push(String::new());
    }

    let mut out = blocks.join("\n");
    out.push('\n');
    out
}
