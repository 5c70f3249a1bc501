//! Bundle directory names and artifact filenames.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Ordering;

/// `strftime` layout of the timestamp part of a bundle name.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const LABEL_MAX: usize = 64;

/// Parsed bundle directory name: `<YYYYmmdd_HHMMSS>` or `<YYYYmmdd_HHMMSS>_<n>`
/// when several bundles were created within the same second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleName {
    pub created: NaiveDateTime,
    pub sequence: u32,
}

impl BundleName {
    pub fn new(created: DateTime<Utc>, sequence: u32) -> Self {
        Self {
            created: created.naive_utc(),
            sequence,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let (stamp, sequence) = match name.get(15..) {
            Some("") => (name, 0),
            Some(rest) => {
                let n = rest.strip_prefix('_')?.parse::<u32>().ok()?;
                if n == 0 {
                    return None;
                }
                (&name[..15], n)
            }
            None => return None,
        };
        let created = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
        Some(Self { created, sequence })
    }

    pub fn render(&self) -> String {
        let stamp = self.created.format(TIMESTAMP_FORMAT);
        if self.sequence == 0 {
            stamp.to_string()
        } else {
            format!("{}_{}", stamp, self.sequence)
        }
    }
}

impl PartialOrd for BundleName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BundleName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.created
            .cmp(&other.created)
            .then(self.sequence.cmp(&other.sequence))
    }
}

/// Makes a label safe for use inside a filename.
///
/// - Replaces path separators, control characters and whitespace with `_`
/// - Collapses consecutive underscores
/// - Trims leading/trailing dots and underscores
/// - Limits length to 64 bytes
pub fn sanitize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut prev_underscore = false;
    for c in label.chars() {
        let replacement = if c == '/' || c == '\\' || c.is_control() || c.is_whitespace() {
            '_'
        } else {
            c
        };
        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(LABEL_MAX);
    while take > 0 && !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    match &trimmed[..take] {
        "" => "item".to_string(),
        s => s.to_string(),
    }
}

/// Artifact filename: zero-padded 1-based position, sanitized label, extension.
pub fn artifact_filename(position: usize, label: &str, extension: &str) -> String {
    format!("{:02}_{}.{}", position, sanitize_label(label), extension)
}

/// True if `name` is a plain directory component (no separators, not `.`/`..`).
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}
