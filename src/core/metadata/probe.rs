//! Video container probing through ffprobe.

use crate::error::MetadataError;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Reads the creation time of a video or audio container.
pub trait VideoProbe: Send + Sync {
    /// `Ok(None)` when the container has no creation-time tag
    fn creation_time(&self, path: &Path) -> Result<Option<NaiveDateTime>, MetadataError>;
}

/// Probe backed by the `ffprobe` binary
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    #[serde(default)]
    tags: Option<ProbeTags>,
}

#[derive(Debug, Deserialize)]
struct ProbeTags {
    #[serde(default)]
    creation_time: Option<String>,
}

impl VideoProbe for FfprobeProbe {
    fn creation_time(&self, path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
        let program = self.program.display().to_string();

        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .output()
            .map_err(|e| MetadataError::ProbeSpawn {
                program: program.clone(),
                path: path.to_path_buf(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(MetadataError::ProbeFailed {
                program,
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: ProbeOutput =
            serde_json::from_slice(&output.stdout).map_err(|e| MetadataError::ProbeOutput {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(parsed
            .format
            .and_then(|f| f.tags)
            .and_then(|t| t.creation_time)
            .and_then(|raw| parse_creation_time(&raw)))
    }
}

/// Parse an ISO-8601 container timestamp.
///
/// Offsets are dropped rather than converted: the wall-clock value is kept as
/// written by the device, the same way EXIF times are used.
pub fn parse_creation_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
        return Some(with_offset.naive_local());
    }
    [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
    ]
    .iter()
    .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ffprobe_utc_timestamp() {
        let parsed = parse_creation_time("2024-05-01T10:20:30.000000Z").unwrap();
        assert_eq!(parsed.format("%Y%m%d %H%M%S").to_string(), "20240501 102030");
    }

    #[test]
    fn parses_timestamp_without_zone() {
        assert!(parse_creation_time("2024-05-01T10:20:30").is_some());
        assert!(parse_creation_time("2024-05-01 10:20:30").is_some());
    }

    #[test]
    fn keeps_wall_clock_of_offset_timestamps() {
        let parsed = parse_creation_time("2024-05-01T10:20:30+02:00").unwrap();
        assert_eq!(parsed.format("%H%M%S").to_string(), "102030");
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_creation_time("yesterday").is_none());
    }

    #[test]
    fn probe_output_without_tags_parses() {
        let parsed: ProbeOutput = serde_json::from_str(r#"{"format": {"filename": "a.mp4"}}"#).unwrap();
        assert!(parsed.format.and_then(|f| f.tags).is_none());
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let probe = FfprobeProbe::new("/nonexistent/bin/ffprobe");
        let result = probe.creation_time(Path::new("/inbox/clip.mp4"));
        assert!(matches!(result, Err(MetadataError::ProbeSpawn { .. })));
    }
}
