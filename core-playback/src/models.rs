//! # Playback Data Model
//!
//! Inputs read from collaborators ([`Range`], [`VideoSource`], [`SourceEntry`],
//! [`Selection`]) and the values derived from them ([`Clip`], [`Playlist`]),
//! plus the scheduler's externally visible status.
//!
//! Everything here is immutable once built. A [`Playlist`] is rebuilt from
//! scratch on every input change; clips from different playlists are only
//! comparable through their [`ClipKey`].

use crate::error::{PlaybackError, Result};
use crate::locator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Ranges
// ============================================================================

/// A labeled time range of one video, as produced by the tagging workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub id: String,
    pub video_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    #[serde(default)]
    pub labels: BTreeSet<String>,
}

impl Range {
    /// Creates a range, rejecting bounds that do not form a non-empty interval.
    pub fn new<I, S>(
        id: impl Into<String>,
        video_id: impl Into<String>,
        start_sec: f64,
        end_sec: f64,
        labels: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let range = Self {
            id: id.into(),
            video_id: video_id.into(),
            start_sec,
            end_sec,
            labels: labels.into_iter().map(Into::into).collect(),
        };
        range.validate()?;
        Ok(range)
    }

    /// Checks `end_sec > start_sec` with both bounds finite.
    ///
    /// Ranges arriving through serde bypass [`Range::new`], so the clip index
    /// calls this again before using one.
    pub fn validate(&self) -> Result<()> {
        let finite = self.start_sec.is_finite() && self.end_sec.is_finite();
        if !finite || self.end_sec <= self.start_sec {
            return Err(PlaybackError::InvalidRange {
                id: self.id.clone(),
                start_sec: self.start_sec,
                end_sec: self.end_sec,
            });
        }
        Ok(())
    }

    pub fn duration_sec(&self) -> f64 {
        self.end_sec - self.start_sec
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Which backend family plays a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Media URL played by a native media element.
    Direct,
    /// Third-party player addressed by a video identifier.
    Embedded,
}

impl SourceKind {
    /// Classifies a raw locator.
    pub fn detect(locator: &str) -> Self {
        if locator::is_embedded_locator(locator) {
            SourceKind::Embedded
        } else {
            SourceKind::Direct
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Direct => "direct",
            SourceKind::Embedded => "embedded",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a backend actually loads for a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackTarget {
    Url(String),
    EmbedId(String),
}

/// A playable video as registered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSource {
    pub id: String,
    pub kind: SourceKind,
    pub locator: String,
    /// Identifier supplied by the host, used instead of parsing `locator`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embed_id: Option<String>,
}

impl VideoSource {
    pub fn new(id: impl Into<String>, kind: SourceKind, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            locator: locator.into(),
            embed_id: None,
        }
    }

    /// A direct media-URL source.
    pub fn direct(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(id, SourceKind::Direct, url)
    }

    /// An embedded-player source; the identifier is parsed from `locator`.
    pub fn embedded(id: impl Into<String>, locator: impl Into<String>) -> Self {
        Self::new(id, SourceKind::Embedded, locator)
    }

    /// A source whose kind is inferred from the locator.
    pub fn detect(id: impl Into<String>, locator: impl Into<String>) -> Self {
        let locator = locator.into();
        let kind = SourceKind::detect(&locator);
        Self::new(id, kind, locator)
    }

    pub fn with_embed_id(mut self, embed_id: impl Into<String>) -> Self {
        self.embed_id = Some(embed_id.into());
        self
    }

    /// Resolves what the matching backend should load.
    ///
    /// # Errors
    ///
    /// [`PlaybackError::InvalidLocator`] when a direct source has a blank URL or
    /// no embed identifier can be obtained for an embedded source.
    pub fn resolve_target(&self) -> Result<PlaybackTarget> {
        match self.kind {
            SourceKind::Direct => {
                let url = self.locator.trim();
                if url.is_empty() {
                    return Err(PlaybackError::InvalidLocator(format!(
                        "source {} has no media URL",
                        self.id
                    )));
                }
                Ok(PlaybackTarget::Url(url.to_string()))
            }
            SourceKind::Embedded => self
                .embed_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .or_else(|| locator::parse_embed_id(&self.locator))
                .map(PlaybackTarget::EmbedId)
                .ok_or_else(|| {
                    PlaybackError::InvalidLocator(format!(
                        "no embed id in locator of source {}",
                        self.id
                    ))
                }),
        }
    }
}

/// A source together with its placement in a multi-video sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub source: VideoSource,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub offset_sec: Option<f64>,
}

impl SourceEntry {
    pub fn new(source: VideoSource) -> Self {
        Self {
            source,
            order: None,
            offset_sec: None,
        }
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_offset(mut self, offset_sec: f64) -> Self {
        self.offset_sec = Some(offset_sec);
        self
    }
}

impl From<VideoSource> for SourceEntry {
    fn from(source: VideoSource) -> Self {
        Self::new(source)
    }
}

// ============================================================================
// Selection
// ============================================================================

/// How selected labels combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Every selected label must be present.
    All,
    /// At least one selected label must be present.
    #[default]
    Any,
}

impl MatchMode {
    pub fn toggled(self) -> Self {
        match self {
            MatchMode::All => MatchMode::Any,
            MatchMode::Any => MatchMode::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::All => "all",
            MatchMode::Any => "any",
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The active label filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub labels: BTreeSet<String>,
    #[serde(default)]
    pub mode: MatchMode,
}

impl Selection {
    pub fn new<I, S>(labels: I, mode: MatchMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            mode,
        }
    }

    pub fn any<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels, MatchMode::Any)
    }

    pub fn all<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(labels, MatchMode::All)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Adds the label if absent, removes it otherwise. Returns whether it is
    /// now selected.
    pub fn toggle(&mut self, label: &str) -> bool {
        if self.labels.remove(label) {
            false
        } else {
            self.labels.insert(label.to_string());
            true
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    /// Drops selected labels missing from the label catalog.
    pub fn retain_known<'a, I>(&mut self, known: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let known: BTreeSet<&str> = known.into_iter().collect();
        self.labels.retain(|label| known.contains(label.as_str()));
    }

    /// Whether a label set satisfies this selection. An empty selection
    /// matches nothing.
    pub fn matches(&self, labels: &BTreeSet<String>) -> bool {
        if self.labels.is_empty() {
            return false;
        }
        match self.mode {
            MatchMode::All => self.labels.iter().all(|label| labels.contains(label)),
            MatchMode::Any => self.labels.iter().any(|label| labels.contains(label)),
        }
    }
}

// ============================================================================
// Clips and playlists
// ============================================================================

/// Identity of a clip that survives playlist regeneration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClipKey {
    pub video_id: String,
    pub range_id: String,
}

impl fmt::Display for ClipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.video_id, self.range_id)
    }
}

/// A range scheduled for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub range_id: String,
    pub video_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub labels: BTreeSet<String>,
    pub source: VideoSource,
    pub sort_key: f64,
}

impl Clip {
    pub fn key(&self) -> ClipKey {
        ClipKey {
            video_id: self.video_id.clone(),
            range_id: self.range_id.clone(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind
    }

    /// One-line description for clip lists, numbered from 1.
    ///
    /// ```
    /// # use core_playback::models::{Clip, VideoSource};
    /// let clip = Clip {
    ///     range_id: "r1".into(),
    ///     video_id: "v1".into(),
    ///     start_sec: 10.0,
    ///     end_sec: 15.0,
    ///     labels: ["A".to_string(), "B".to_string()].into(),
    ///     source: VideoSource::direct("v1", "https://cdn.example.com/v1.mp4"),
    ///     sort_key: 10.0,
    /// };
    /// assert_eq!(clip.summary(0), "#1 [10.0s - 15.0s] A, B");
    /// ```
    pub fn summary(&self, position: usize) -> String {
        let labels = self
            .labels
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "#{} [{:.1}s - {:.1}s] {}",
            position + 1,
            self.start_sec,
            self.end_sec,
            labels
        )
    }
}

/// Ordered, immutable clip sequence. Cloning shares the underlying slice.
#[derive(Debug, Clone)]
pub struct Playlist {
    clips: Arc<[Clip]>,
    stride_overflow: bool,
}

impl Playlist {
    pub(crate) fn new(clips: Vec<Clip>, stride_overflow: bool) -> Self {
        Self {
            clips: clips.into(),
            stride_overflow,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Clip> {
        self.clips.get(index)
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Clip> {
        self.clips.iter()
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 == self.clips.len()
    }

    /// Index of the clip with the given identity.
    pub fn position_of(&self, key: &ClipKey) -> Option<usize> {
        self.clips
            .iter()
            .position(|clip| clip.video_id == key.video_id && clip.range_id == key.range_id)
    }

    /// `true` when some clip's `offset + start` reached the order stride, so
    /// clips of different videos may interleave.
    pub fn stride_overflow(&self) -> bool {
        self.stride_overflow
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> IntoIterator for &'a Playlist {
    type Item = &'a Clip;
    type IntoIter = std::slice::Iter<'a, Clip>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Scheduler status
// ============================================================================

/// Segment scheduler state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Seeking,
    Playing,
    AdvancePending,
    Finished,
}

impl PlaybackState {
    /// States in which a clip is current.
    pub fn has_current_clip(&self) -> bool {
        matches!(
            self,
            PlaybackState::Seeking | PlaybackState::Playing | PlaybackState::AdvancePending
        )
    }
}

/// Read-only snapshot for UI binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub state: PlaybackState,
    pub current_index: Option<usize>,
    pub playlist_len: usize,
}
