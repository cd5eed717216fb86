use chrono::{DateTime, Datelike, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 8;

/// Build an object key of the form `prefix/yyyy/mm/dd/<suffix>-<name>`.
///
/// The date partition comes from the supplied timestamp, the suffix is
/// random, and the filename is sanitized so the key is safe to embed in
/// URLs without escaping.
pub fn object_key(prefix: &str, filename: &str, now: DateTime<Utc>) -> String {
    let safe_name = sanitize_filename(filename);
    let suffix = random_suffix();

    format!(
        "{}/{}/{:02}/{:02}/{}-{}",
        prefix,
        now.year(),
        now.month(),
        now.day(),
        suffix,
        safe_name
    )
}

/// Replace every character outside `[A-Za-z0-9._-]` with an underscore.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "file".to_string()
    } else {
        sanitized
    }
}

fn random_suffix() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(SUFFIX_LEN)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Derive the thumbnail key for an original key: the original's path
/// relative to `prefix` is re-rooted under `prefix/thumbs/`.
///
/// Keys outside the prefix fall back to just their basename so a thumbnail
/// key can still be produced for legacy objects.
pub fn thumb_key_for(prefix: &str, key: &str) -> String {
    match key
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some(rest) if !rest.is_empty() => format!("{}/thumbs/{}", prefix, rest),
        _ => {
            let basename = key.rsplit('/').next().unwrap_or(key);
            format!("{}/thumbs/{}", prefix, basename)
        }
    }
}
