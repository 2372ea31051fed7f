// origin.rs — Trusted origin prefixes and how they match caller frames.
//
// An allowed origin is written in dotted package notation ("app.trusted")
// or as a path fragment ("app/trusted"). Both are stored as a list of
// segments plus the host-path rendering ("app/trusted" on Unix,
// "app\trusted" on Windows).
//
// Matching a caller frame:
// - Segment (default): the segments must appear as a contiguous run of the
//   frame path's components. The last segment may also match the file stem
//   of the final component, so "app.trusted" covers "app/trusted.rs".
// - Substring: the rendered string occurs anywhere in the frame path. This
//   accepts "app/trusted_evil/x" for "app/trusted" and exists only for
//   policies that depend on the old behavior.

use std::fmt;
use std::path::{Path, MAIN_SEPARATOR};

use serde::{Deserialize, Serialize};

/// How allowed origins are compared against caller frame paths.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Whole path components only.
    #[default]
    Segment,
    /// Raw substring containment.
    Substring,
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Segment => write!(f, "segment"),
            MatchMode::Substring => write!(f, "substring"),
        }
    }
}

/// A normalized trusted origin prefix.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OriginPath {
    segments: Vec<String>,
    rendered: String,
}

impl OriginPath {
    /// Normalize a dotted or path-like origin.
    ///
    /// Dots become the native separator in a single pass; a string without
    /// dots keeps its rendering as written.
    pub fn new(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split('.').filter(|p| !p.is_empty()).collect();
        let separator = MAIN_SEPARATOR.to_string();
        let rendered = parts.join(separator.as_str());
        let segments = split_components(&rendered)
            .map(str::to_string)
            .collect();
        Self { segments, rendered }
    }

    /// The host-path form, e.g. `app/trusted`.
    pub fn as_str(&self) -> &str {
        &self.rendered
    }

    /// The individual path segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Check whether a caller frame's origin path falls under this prefix.
    pub fn matches(&self, frame: &Path, mode: MatchMode) -> bool {
        let frame = frame.to_string_lossy();
        match mode {
            MatchMode::Substring => frame.contains(self.rendered.as_str()),
            MatchMode::Segment => self.matches_segments(&frame),
        }
    }

    fn matches_segments(&self, frame: &str) -> bool {
        if self.segments.is_empty() {
            return false;
        }
        let components: Vec<&str> = split_components(frame).collect();
        let width = self.segments.len();
        if components.len() < width {
            return false;
        }

        (0..=components.len() - width).any(|start| {
            self.segments.iter().enumerate().all(|(offset, segment)| {
                let index = start + offset;
                let component = components[index];
                if component == segment {
                    return true;
                }
                // Last allowed segment against the file itself: compare stems.
                offset == width - 1
                    && index == components.len() - 1
                    && file_stem(component) == Some(segment.as_str())
            })
        })
    }
}

impl fmt::Display for OriginPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl From<&str> for OriginPath {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Split on both separators so Windows-style frame paths match on any host.
fn split_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|c| !c.is_empty())
}

/// Strips only the final extension: `trusted.evil.rs` has stem `trusted.evil`.
fn file_stem(component: &str) -> Option<&str> {
    match component.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => Some(stem),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(path: &str) -> String {
        path.replace('/', &MAIN_SEPARATOR.to_string())
    }

    #[test]
    fn dotted_origin_becomes_host_path() {
        let origin = OriginPath::new("pkg.sub");
        assert_eq!(origin.as_str(), native("pkg/sub"));
        assert_eq!(origin.segments(), &["pkg".to_string(), "sub".to_string()]);
    }

    #[test]
    fn path_like_origin_is_not_renormalized() {
        let origin = OriginPath::new("app/trusted");
        assert_eq!(origin.as_str(), "app/trusted");
        assert_eq!(origin.segments().len(), 2);
    }

    #[test]
    fn segment_mode_matches_nested_frame() {
        let origin = OriginPath::new("app.trusted");
        assert!(origin.matches(Path::new("/srv/app/trusted/x.rs"), MatchMode::Segment));
        assert!(origin.matches(Path::new("app/trusted/deep/y.rs"), MatchMode::Segment));
    }

    #[test]
    fn segment_mode_matches_module_file() {
        let origin = OriginPath::new("app.trusted");
        assert!(origin.matches(Path::new("/srv/app/trusted.rs"), MatchMode::Segment));
        assert!(!origin.matches(Path::new("/srv/app/trusted_evil.rs"), MatchMode::Segment));
    }

    #[test]
    fn segment_mode_rejects_multi_extension_lookalike() {
        let origin = OriginPath::new("trusted");
        assert!(!origin.matches(Path::new("/srv/trusted.evil.rs"), MatchMode::Segment));
        assert!(origin.matches(Path::new("/srv/trusted.rs"), MatchMode::Segment));
    }

    #[test]
    fn segment_mode_rejects_lookalike_directory() {
        let origin = OriginPath::new("app.trusted");
        assert!(!origin.matches(
            Path::new("/srv/app/trusted_evil/x.rs"),
            MatchMode::Segment
        ));
        assert!(!origin.matches(Path::new("/srv/app/untrusted/y.rs"), MatchMode::Segment));
    }

    #[test]
    fn substring_mode_keeps_legacy_false_positive() {
        let origin = OriginPath::new("app/trusted");
        assert!(origin.matches(
            Path::new("/srv/app/trusted_evil/x.rs"),
            MatchMode::Substring
        ));
    }

    #[test]
    fn windows_separators_in_frame_path() {
        let origin = OriginPath::new("app.trusted");
        assert!(origin.matches(
            Path::new(r"C:\srv\app\trusted\x.rs"),
            MatchMode::Segment
        ));
    }

    #[test]
    fn empty_origin_never_matches_segments() {
        let origin = OriginPath::new("");
        assert!(origin.segments().is_empty());
        assert!(!origin.matches(Path::new("/anything"), MatchMode::Segment));
        assert!(origin.matches(Path::new("/anything"), MatchMode::Substring));
    }

    #[test]
    fn match_mode_parses_from_snake_case() {
        let mode: MatchMode = serde_json::from_str("\"substring\"").unwrap();
        assert_eq!(mode, MatchMode::Substring);
        assert_eq!(MatchMode::default(), MatchMode::Segment);
    }
}
