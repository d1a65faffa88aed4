//! # Clip Index
//!
//! Builds the ordered, filtered playlist from labeled ranges.
//!
//! Clips are ordered by a single numeric key:
//!
//! ```text
//! sort_key = offset_sec + start_sec + order * order_stride
//! ```
//!
//! so clips group by their video's position in the sequence first and by
//! start time within a video second. The grouping only holds while
//! `offset_sec + start_sec` stays below `order_stride`; a playlist that breaks
//! that assumption is still built, but flagged through
//! [`Playlist::stride_overflow`] and logged.

use crate::config::SchedulerConfig;
use crate::models::{Clip, Playlist, Range, Selection, SourceEntry};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Stateless playlist builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipIndex {
    order_stride: f64,
}

impl Default for ClipIndex {
    fn default() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }
}

impl ClipIndex {
    pub fn new(order_stride: f64) -> Self {
        Self { order_stride }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::new(config.order_stride)
    }

    /// Sort key of a range start within a sequenced source.
    pub fn sort_key(&self, entry: &SourceEntry, start_sec: f64) -> f64 {
        let (within_video, order) = self.placement(entry, start_sec);
        within_video + order * self.order_stride
    }

    fn placement(&self, entry: &SourceEntry, start_sec: f64) -> (f64, f64) {
        let offset = entry.offset_sec.filter(|o| o.is_finite()).unwrap_or(0.0);
        let order = entry.order.unwrap_or(0) as f64;
        (offset + start_sec, order)
    }

    /// Builds the playlist for a selection.
    ///
    /// Ranges whose video has no registered source, and ranges with invalid
    /// bounds, are left out. An empty label selection yields an empty
    /// playlist. The result is sorted by sort key, then range id, then video id.
    #[instrument(
        skip_all,
        fields(ranges = ranges.len(), labels = selection.labels.len(), mode = %selection.mode)
    )]
    pub fn build(
        &self,
        ranges: &[Range],
        selection: &Selection,
        sources: &HashMap<String, SourceEntry>,
    ) -> Playlist {
        if selection.is_empty() {
            debug!("Empty label selection, playlist is empty");
            return Playlist::empty();
        }

        let mut stride_overflow = false;
        let mut clips = Vec::new();

        for range in ranges {
            if !selection.matches(&range.labels) {
                continue;
            }
            if let Err(e) = range.validate() {
                warn!(range = %range.id, error = %e, "Skipping invalid range");
                continue;
            }
            let Some(entry) = sources.get(&range.video_id) else {
                debug!(range = %range.id, video = %range.video_id, "No source for range, skipping");
                continue;
            };

            let (within_video, order) = self.placement(entry, range.start_sec);
            if within_video.abs() >= self.order_stride {
                stride_overflow = true;
            }

            clips.push(Clip {
                range_id: range.id.clone(),
                video_id: range.video_id.clone(),
                start_sec: range.start_sec,
                end_sec: range.end_sec,
                labels: range.labels.clone(),
                source: entry.source.clone(),
                sort_key: within_video + order * self.order_stride,
            });
        }

        clips.sort_by(|a, b| {
            a.sort_key
                .total_cmp(&b.sort_key)
                .then_with(|| a.range_id.cmp(&b.range_id))
                .then_with(|| a.video_id.cmp(&b.video_id))
        });

        if stride_overflow {
            warn!(
                stride = self.order_stride,
                "Clip position exceeds order stride, videos may interleave"
            );
        }

        debug!(clips = clips.len(), "Playlist built");
        Playlist::new(clips, stride_overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoSource;

    fn sources(entries: &[(&str, Option<i64>, Option<f64>)]) -> HashMap<String, SourceEntry> {
        entries
            .iter()
            .map(|(id, order, offset)| {
                let mut entry =
                    SourceEntry::new(VideoSource::direct(*id, format!("https://cdn/{id}.mp4")));
                entry.order = *order;
                entry.offset_sec = *offset;
                (id.to_string(), entry)
            })
            .collect()
    }

    fn range(id: &str, video: &str, start: f64, end: f64, labels: &[&str]) -> Range {
        Range::new(id, video, start, end, labels.iter().copied()).unwrap()
    }

    #[test]
    fn orders_by_start_within_a_video() {
        let ranges = vec![
            range("r1", "v1", 10.0, 15.0, &["A"]),
            range("r2", "v1", 2.0, 4.0, &["A"]),
        ];
        let playlist =
            ClipIndex::default().build(&ranges, &Selection::any(["A"]), &sources(&[("v1", None, None)]));

        let ids: Vec<_> = playlist.iter().map(|c| c.range_id.as_str()).collect();
        assert_eq!(ids, ["r2", "r1"]);
    }

    #[test]
    fn orders_videos_by_sequence_position() {
        let ranges = vec![
            range("a", "first", 500.0, 510.0, &["A"]),
            range("b", "second", 1.0, 3.0, &["A"]),
        ];
        let srcs = sources(&[("first", Some(0), None), ("second", Some(1), None)]);
        let playlist = ClipIndex::default().build(&ranges, &Selection::any(["A"]), &srcs);

        let ids: Vec<_> = playlist.iter().map(|c| c.range_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(playlist.get(1).unwrap().sort_key, 1_000_001.0);
        assert!(!playlist.stride_overflow());
    }

    #[test]
    fn ties_break_by_range_id() {
        let ranges = vec![
            range("r9", "v1", 5.0, 6.0, &["A"]),
            range("r1", "v1", 5.0, 7.0, &["A"]),
        ];
        let playlist =
            ClipIndex::default().build(&ranges, &Selection::any(["A"]), &sources(&[("v1", None, None)]));
        assert_eq!(playlist.get(0).unwrap().range_id, "r1");
    }

    #[test]
    fn skips_ranges_without_source() {
        let ranges = vec![
            range("r1", "v1", 0.0, 1.0, &["A"]),
            range("r2", "gone", 0.0, 1.0, &["A"]),
        ];
        let playlist =
            ClipIndex::default().build(&ranges, &Selection::any(["A"]), &sources(&[("v1", None, None)]));
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn skips_invalid_ranges_from_the_feed() {
        let bad = Range {
            id: "bad".into(),
            video_id: "v1".into(),
            start_sec: 8.0,
            end_sec: 3.0,
            labels: ["A".to_string()].into(),
        };
        let playlist =
            ClipIndex::default().build(&[bad], &Selection::any(["A"]), &sources(&[("v1", None, None)]));
        assert!(playlist.is_empty());
    }

    #[test]
    fn flags_stride_overflow() {
        let ranges = vec![
            range("late", "first", 1_500_000.0, 1_500_010.0, &["A"]),
            range("early", "second", 1.0, 2.0, &["A"]),
        ];
        let srcs = sources(&[("first", Some(0), None), ("second", Some(1), None)]);
        let playlist = ClipIndex::default().build(&ranges, &Selection::any(["A"]), &srcs);

        assert!(playlist.stride_overflow());
        // The key is preserved as-is: the second video's clip sorts first.
        assert_eq!(playlist.get(0).unwrap().range_id, "early");
    }

    #[test]
    fn sort_key_applies_offset_and_order() {
        let index = ClipIndex::new(1000.0);
        let entry = SourceEntry::new(VideoSource::direct("v", "u"))
            .with_order(2)
            .with_offset(30.0);
        assert_eq!(index.sort_key(&entry, 5.0), 2035.0);
    }
}
