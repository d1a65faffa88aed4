//! # Playlist Inputs
//!
//! Collaborator traits supplying the scheduler's inputs, and the glue that
//! gathers them for a project.
//!
//! Range storage and the video registry live outside this crate. A host wires
//! them in by implementing [`RangeFeed`] and [`SourceRegistry`]; failures in
//! either are reported as [`PlaybackError::Collaborator`].

use crate::error::{PlaybackError, Result};
use crate::models::{Range, SourceEntry, VideoSource};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, instrument, warn};

/// Labeled ranges stored for a video.
#[async_trait]
pub trait RangeFeed: Send + Sync {
    async fn ranges_for(&self, video_id: &str) -> Result<Vec<Range>>;
}

/// Resolves a video identifier to its playable source.
#[async_trait]
pub trait SourceRegistry: Send + Sync {
    /// `Ok(None)` when the video is unknown.
    async fn resolve(&self, video_id: &str) -> Result<Option<VideoSource>>;
}

/// A video's membership in a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectVideo {
    pub video_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset_sec: Option<f64>,
}

impl ProjectVideo {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
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

/// Everything `set_playlist` needs apart from the selection.
#[derive(Debug, Clone, Default)]
pub struct PlaylistInputs {
    pub ranges: Vec<Range>,
    pub sources: HashMap<String, SourceEntry>,
}

impl PlaylistInputs {
    /// Labels present on at least one range, sorted.
    pub fn labels(&self) -> BTreeSet<String> {
        self.ranges
            .iter()
            .flat_map(|range| range.labels.iter().cloned())
            .collect()
    }
}

/// Loads ranges and sources for every video of a project concurrently.
///
/// Videos the registry does not know are skipped. A video listed twice is
/// only gathered once, using its first membership.
#[instrument(skip_all, fields(videos = videos.len()))]
pub async fn gather(
    feed: &dyn RangeFeed,
    registry: &dyn SourceRegistry,
    videos: &[ProjectVideo],
) -> Result<PlaylistInputs> {
    let mut seen = HashSet::new();
    let unique: Vec<&ProjectVideo> = videos
        .iter()
        .filter(|video| {
            let first = seen.insert(video.video_id.as_str());
            if !first {
                debug!(video = %video.video_id, "Ignoring repeated project membership");
            }
            first
        })
        .collect();

    let loaded = try_join_all(unique.into_iter().map(|video| async move {
        let (source, ranges) = futures::try_join!(
            registry.resolve(&video.video_id),
            feed.ranges_for(&video.video_id)
        )?;
        Ok::<_, PlaybackError>((video, source, ranges))
    }))
    .await?;

    let mut inputs = PlaylistInputs::default();
    for (video, source, ranges) in loaded {
        let Some(source) = source else {
            warn!(video = %video.video_id, "Video not found in registry, skipping");
            continue;
        };

        let mut entry = SourceEntry::new(source);
        entry.order = video.order;
        entry.offset_sec = video.offset_sec;
        inputs.sources.insert(video.video_id.clone(), entry);

        inputs
            .ranges
            .extend(ranges.into_iter().map(|mut range| {
                range.video_id = video.video_id.clone();
                range
            }));
    }

    debug!(
        ranges = inputs.ranges.len(),
        sources = inputs.sources.len(),
        "Playlist inputs gathered"
    );
    Ok(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;

    struct MemoryFeed(HashMap<String, Vec<Range>>);

    #[async_trait]
    impl RangeFeed for MemoryFeed {
        async fn ranges_for(&self, video_id: &str) -> Result<Vec<Range>> {
            Ok(self.0.get(video_id).cloned().unwrap_or_default())
        }
    }

    struct MemoryRegistry(HashMap<String, VideoSource>);

    #[async_trait]
    impl SourceRegistry for MemoryRegistry {
        async fn resolve(&self, video_id: &str) -> Result<Option<VideoSource>> {
            Ok(self.0.get(video_id).cloned())
        }
    }

    struct BrokenRegistry;

    #[async_trait]
    impl SourceRegistry for BrokenRegistry {
        async fn resolve(&self, _video_id: &str) -> Result<Option<VideoSource>> {
            Err(PlaybackError::Collaborator("registry offline".into()))
        }
    }

    fn feed() -> MemoryFeed {
        MemoryFeed(HashMap::from([
            (
                "v1".to_string(),
                vec![Range::new("r1", "v1", 10.0, 15.0, ["A"]).unwrap()],
            ),
            (
                "v2".to_string(),
                vec![Range::new("r2", "v2", 1.0, 4.0, ["B"]).unwrap()],
            ),
        ]))
    }

    fn registry() -> MemoryRegistry {
        MemoryRegistry(HashMap::from([
            (
                "v1".to_string(),
                VideoSource::direct("v1", "https://cdn.example.com/v1.mp4"),
            ),
            (
                "v2".to_string(),
                VideoSource::embedded("v2", "https://youtu.be/abc"),
            ),
        ]))
    }

    #[tokio::test]
    async fn gathers_sources_with_membership() {
        let videos = [
            ProjectVideo::new("v1").with_order(1),
            ProjectVideo::new("v2").with_order(0).with_offset(3.0),
        ];
        let inputs = gather(&feed(), &registry(), &videos).await.unwrap();

        assert_eq!(inputs.ranges.len(), 2);
        assert_eq!(inputs.sources["v1"].order, Some(1));
        assert_eq!(inputs.sources["v2"].offset_sec, Some(3.0));
        assert_eq!(inputs.sources["v2"].source.kind, SourceKind::Embedded);
        assert_eq!(inputs.labels().into_iter().collect::<Vec<_>>(), ["A", "B"]);
    }

    #[tokio::test]
    async fn unknown_videos_are_skipped() {
        let videos = [ProjectVideo::new("v1"), ProjectVideo::new("ghost")];
        let inputs = gather(&feed(), &registry(), &videos).await.unwrap();

        assert_eq!(inputs.sources.len(), 1);
        assert!(inputs.ranges.iter().all(|range| range.video_id == "v1"));
    }

    #[tokio::test]
    async fn repeated_membership_is_gathered_once() {
        let videos = [ProjectVideo::new("v1"), ProjectVideo::new("v1").with_order(9)];
        let inputs = gather(&feed(), &registry(), &videos).await.unwrap();

        assert_eq!(inputs.ranges.len(), 1);
        assert_eq!(inputs.sources["v1"].order, None);
    }

    #[tokio::test]
    async fn collaborator_failure_propagates() {
        let err = gather(&feed(), &BrokenRegistry, &[ProjectVideo::new("v1")])
            .await
            .unwrap_err();
        assert!(matches!(err, PlaybackError::Collaborator(_)));
    }

    #[test]
    fn project_video_json_omits_unset_fields() {
        let json = serde_json::to_string(&ProjectVideo::new("v1")).unwrap();
        assert_eq!(json, r#"{"video_id":"v1"}"#);
    }
}
