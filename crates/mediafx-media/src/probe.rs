//! FFprobe duration lookup.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probe a media file for its container duration in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    // Check FFprobe exists
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ffprobe_failed(
            "FFprobe failed",
            Some(String::from_utf8_lossy(&output.stderr).to_string()),
        ));
    }

    parse_duration_json(&output.stdout)
}

fn parse_duration_json(raw: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(raw)?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| MediaError::ffprobe_failed("No duration in FFprobe output", None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        let raw = br#"{"format": {"duration": "12.345000", "size": "1024"}}"#;
        let duration = parse_duration_json(raw).unwrap();
        assert!((duration - 12.345).abs() < 1e-9);
    }

    #[test]
    fn test_parse_missing_duration() {
        let raw = br#"{"format": {}}"#;
        assert!(parse_duration_json(raw).is_err());
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(parse_duration_json(b"not json").is_err());
    }
}
