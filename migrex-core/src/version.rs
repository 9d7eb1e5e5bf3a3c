use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// Dotted version string compared segment-wise.
///
/// Segments that parse as integers compare numerically, so `10.2` sorts
/// above `9.8`. A segment that fails to parse on either side falls back to
/// a string compare of the raw text. Missing trailing segments count as
/// zero, making `7` and `7.0` equal.
#[derive(Debug, Clone)]
pub struct VersionNumber {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    raw: String,
    num: Option<u64>,
}

impl Segment {
    fn parse(raw: &str) -> Self {
        Segment {
            raw: raw.to_owned(),
            num: raw.parse::<u64>().ok(),
        }
    }

    fn zero() -> Self {
        Segment {
            raw: "0".to_owned(),
            num: Some(0),
        }
    }
}

impl VersionNumber {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return VersionNumber {
                segments: Vec::new(),
            };
        }
        VersionNumber {
            segments: trimmed.split('.').map(Segment::parse).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this version sits at or above `floor`.
    pub fn at_least(&self, floor: &VersionNumber) -> bool {
        self.cmp(floor) != Ordering::Less
    }
}

// Equality pads missing segments like the ordering does, so `7` == `7.0`.
impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionNumber {}

impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let zero = Segment::zero();
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            let ordering = match (a.num, b.num) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => a.raw.cmp(&b.raw),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for VersionNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.raw)?;
            first = false;
        }
        Ok(())
    }
}
