/// Parsed dotted caller path ("main.outer.nested").
///
/// The dotted string is the only structural signal the extractors give us;
/// every piece of parent inference goes through this type so the string
/// slicing lives in one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerPath {
    segments: Vec<String>,
}

impl CallerPath {
    /// Parses a dotted caller string into its segments
    pub fn parse(caller: &str) -> Self {
        Self {
            segments: caller.split('.').map(str::to_string).collect(),
        }
    }

    /// Number of dotted segments
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment: the object/function the chain is rooted at
    pub fn base_object(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    /// Last segment of the path
    pub fn last_segment(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Parent node id for a multi-segment caller.
    ///
    /// `"A.B"` calling `C` means method `B` of `A` made the call, so the
    /// parent id is the caller string itself ("A.B" = caller "A" + method
    /// "B"). Returns None for single-segment callers (top-level calls).
    pub fn parent_id(&self) -> Option<String> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(self.segments.join("."))
    }

    /// All segments, in order
    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

/// Splits a node id into segments. Ids share the dotted encoding with
/// caller paths ("{caller}.{method}").
pub fn id_segments(node_id: &str) -> Vec<&str> {
    node_id.split('.').collect()
}

/// Dotted suffixes of a node id that can identify a parent, shortest
/// first. For "a.b.c.d" these are the segment runs just before the method
/// segment: ["c"], ["b", "c"].
pub fn parent_suffixes(node_id: &str) -> Vec<String> {
    let parts = id_segments(node_id);
    let n = parts.len();
    if n <= 2 {
        return Vec::new();
    }
    (1..=n - 2)
        .map(|len| parts[n - 1 - len..n - 1].join("."))
        .collect()
}
