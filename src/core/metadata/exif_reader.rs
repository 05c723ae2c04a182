//! EXIF timestamp and GPS extraction using kamadak-exif.

use super::Coordinates;
use ::exif::{Exif, Field, In, Reader, Tag, Value};
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Fields read from an EXIF block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExifFields {
    pub captured_at: Option<NaiveDateTime>,
    pub coordinates: Option<Coordinates>,
}

/// Read the capture time and position from a photo.
///
/// Returns `None` when the file cannot be opened or has no EXIF block.
pub fn read_exif(path: &Path) -> Option<ExifFields> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "no readable EXIF");
            return None;
        }
    };

    Some(ExifFields {
        captured_at: read_timestamp(&exif),
        coordinates: read_gps(&exif),
    })
}

fn read_timestamp(exif: &Exif) -> Option<NaiveDateTime> {
    [Tag::DateTimeOriginal, Tag::DateTime]
        .into_iter()
        .filter_map(|tag| exif.get_field(tag, In::PRIMARY))
        .find_map(|field| ascii_value(field).and_then(|s| parse_exif_datetime(&s)))
}

/// Parse an EXIF timestamp (`YYYY:MM:DD HH:MM:SS`).
///
/// Dash-separated dates and trailing sub-second digits are accepted too.
pub fn parse_exif_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim_matches(|c: char| c == '"' || c == '\0' || c.is_whitespace());
    ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y:%m:%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
}

/// A malformed GPS block yields `None`; it never hides the timestamp.
fn read_gps(exif: &Exif) -> Option<Coordinates> {
    let latitude = signed_degrees(exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, 'S')?;
    let longitude = signed_degrees(exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, 'W')?;
    Coordinates::new(latitude, longitude)
}

fn signed_degrees(exif: &Exif, value_tag: Tag, ref_tag: Tag, negative: char) -> Option<f64> {
    let field = exif.get_field(value_tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    if parts.len() < 3 || parts.iter().any(|r| r.denom == 0) {
        return None;
    }

    let decimal = dms_to_decimal(parts[0].to_f64(), parts[1].to_f64(), parts[2].to_f64());

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(ascii_value)
        .and_then(|s| s.trim().chars().next());

    Some(apply_hemisphere(decimal, hemisphere, negative))
}

/// Degrees/minutes/seconds to decimal degrees: `d + m/60 + s/3600`
pub fn dms_to_decimal(degrees: f64, minutes: f64, seconds: f64) -> f64 {
    degrees + minutes / 60.0 + seconds / 3600.0
}

fn apply_hemisphere(decimal: f64, hemisphere: Option<char>, negative: char) -> f64 {
    match hemisphere {
        Some(c) if c.eq_ignore_ascii_case(&negative) => -decimal,
        _ => decimal,
    }
}

fn ascii_value(field: &Field) -> Option<String> {
    let Value::Ascii(ref values) = field.value else {
        return None;
    };
    let bytes = values.first()?;
    let text = std::str::from_utf8(bytes).ok()?.trim_end_matches('\0').trim();
    (!text.is_empty()).then(|| text.to_string())
}
