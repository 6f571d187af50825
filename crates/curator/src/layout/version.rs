use chrono::{DateTime, NaiveDateTime, Utc};
use std::cmp::Ordering;

/// Suffix marking a base version as a snapshot (e.g. `2.2-SNAPSHOT`).
pub const SNAPSHOT_SUFFIX: &str = "-SNAPSHOT";

/// Format of the timestamp embedded in a timestamped snapshot version,
/// e.g. `2.2-20061118.060401-2`.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%d.%H%M%S";

/// Whether a base version uses the snapshot scheme.
pub fn is_snapshot(version: &str) -> bool {
    version.ends_with(SNAPSHOT_SUFFIX)
}

/// The release version a snapshot corresponds to (`2.3-SNAPSHOT` -> `2.3`).
///
/// Returns `None` for non-snapshot versions.
pub fn release_version(version: &str) -> Option<&str> {
    version.strip_suffix(SNAPSHOT_SUFFIX)
}

/// A parsed concrete version: the identity of one physical build.
///
/// For timestamped snapshots the raw token has the form
/// `<base-without-SNAPSHOT>-<yyyyMMdd.HHmmss>-<buildNumber>`. For plain
/// releases, and for the unexploded `-SNAPSHOT` alias files inside a
/// snapshot directory, the token equals the base version itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken {
    /// Concrete version string exactly as it appears in filenames.
    pub raw: String,
    /// The base version of the owning directory.
    pub base: String,
    /// Timestamp encoded in the token, when timestamped.
    pub timestamp: Option<DateTime<Utc>>,
    /// Build number encoded in the token, when timestamped.
    pub build_number: Option<u32>,
}

impl VersionToken {
    /// A plain (non-timestamped) token equal to the base version.
    pub fn plain(base: &str) -> Self {
        Self {
            raw: base.to_string(),
            base: base.to_string(),
            timestamp: None,
            build_number: None,
        }
    }

    pub fn is_timestamped(&self) -> bool {
        self.timestamp.is_some()
    }

    /// Match a concrete version token at the start of `rest` (the filename
    /// with its `<project>-` prefix already removed), given the owning
    /// directory's base version. Returns the token and the number of bytes
    /// consumed, or `None` when `rest` does not start with a version that
    /// belongs to this directory.
    pub fn match_prefix(rest: &str, base_version: &str) -> Option<(Self, usize)> {
        if let Some(stem) = release_version(base_version) {
            if let Some(parsed) = Self::match_timestamped(rest, stem, base_version) {
                return Some(parsed);
            }
        }
        if rest.starts_with(base_version) && boundary_ok(rest, base_version.len()) {
            return Some((Self::plain(base_version), base_version.len()));
        }
        None
    }

    fn match_timestamped(rest: &str, stem: &str, base_version: &str) -> Option<(Self, usize)> {
        let tail = rest.strip_prefix(stem)?.strip_prefix('-')?;

        // yyyyMMdd.HHmmss is always 15 bytes
        if tail.len() < 15 || !tail.is_char_boundary(15) {
            return None;
        }
        let (stamp, after_stamp) = tail.split_at(15);
        let naive = NaiveDateTime::parse_from_str(stamp, SNAPSHOT_TIMESTAMP_FORMAT).ok()?;

        let after_dash = after_stamp.strip_prefix('-')?;
        let digits: String = after_dash.chars().take_while(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        let build_number: u32 = digits.parse().ok()?;

        let consumed = stem.len() + 1 + 15 + 1 + digits.len();
        if !boundary_ok(rest, consumed) {
            return None;
        }
        Some((
            Self {
                raw: rest[..consumed].to_string(),
                base: base_version.to_string(),
                timestamp: Some(naive.and_utc()),
                build_number: Some(build_number),
            },
            consumed,
        ))
    }

    /// Parse a complete concrete version string (no surrounding filename).
    pub fn parse(concrete: &str, base_version: &str) -> Option<Self> {
        match Self::match_prefix(concrete, base_version) {
            Some((token, consumed)) if consumed == concrete.len() => Some(token),
            _ => None,
        }
    }
}

/// A version token must be followed by a classifier (`-`) or extension (`.`)
/// boundary inside a filename, never by arbitrary text.
fn boundary_ok(rest: &str, consumed: usize) -> bool {
    match rest.as_bytes().get(consumed) {
        None => true,
        Some(b'-') | Some(b'.') => true,
        _ => false,
    }
}

/// Maven-style version comparison.
///
/// Segments split on `.` and `-` compare numerically when both sides are
/// numeric, lexically (case-insensitive) otherwise, with numeric segments
/// ranking above qualifiers. A version that extends the other with a
/// qualifier sorts before it (`2.3-SNAPSHOT` < `2.3`), while a numeric
/// extension sorts after (`2.3.1` > `2.3`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let left: Vec<&str> = split_segments(a);
    let right: Vec<&str> = split_segments(b);
    let len = left.len().max(right.len());

    for i in 0..len {
        match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) => {
                let ord = compare_segment(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(l), None) => return trailing_order(l),
            (None, Some(r)) => return trailing_order(r).reverse(),
            (None, None) => unreachable!(),
        }
    }
    Ordering::Equal
}

fn split_segments(version: &str) -> Vec<&str> {
    version.split(['.', '-']).filter(|s| !s.is_empty()).collect()
}

fn compare_segment(l: &str, r: &str) -> Ordering {
    match (l.parse::<u64>(), r.parse::<u64>()) {
        (Ok(ln), Ok(rn)) => ln.cmp(&rn),
        // numeric segments rank above qualifiers: 2.3.1 > 2.3-alpha
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => l.to_ascii_lowercase().cmp(&r.to_ascii_lowercase()),
    }
}

/// Ordering contributed by the first extra segment when one version is a
/// prefix of the other: `2.3.1` > `2.3` but `2.3-SNAPSHOT` < `2.3`.
fn trailing_order(extra: &str) -> Ordering {
    if extra.parse::<u64>().is_ok() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}
