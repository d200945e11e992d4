//! Segment statistics, progress snapshots and the run result.
//!
//! The welder keeps two histograms over segment length, one for the source
//! file and one for the target, bucketed by a fixed set of thresholds. The
//! progress snapshot bundles the histograms with the running counters and
//! file sizes and is handed to the progress callback; the final snapshot is
//! embedded in the run result.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bucket thresholds for the segment-length histograms (mm). Segments of
/// at least the last threshold fall into an overflow bucket.
pub const SEGMENT_STATISTIC_LENGTHS: [f64; 12] = [
    0.002, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 20.0, 50.0, 100.0,
];

/// One histogram bucket: `[min_mm, max_mm)`, or `[min_mm, ∞)` for the
/// overflow bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentBucket {
    pub min_mm: f64,
    /// Upper bound; `None` marks the overflow bucket.
    pub max_mm: Option<f64>,
    pub count: u64,
}

/// Source and target segment-length histograms with totals.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentStatistics {
    source: Vec<SegmentBucket>,
    target: Vec<SegmentBucket>,
    total_length_source: f64,
    total_length_target: f64,
    total_count_source: u64,
    total_count_target: u64,
}

impl Default for SegmentStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl SegmentStatistics {
    /// Create empty histograms over [`SEGMENT_STATISTIC_LENGTHS`].
    pub fn new() -> Self {
        let mut buckets = Vec::with_capacity(SEGMENT_STATISTIC_LENGTHS.len() + 1);
        let mut min = 0.0;
        for &max in SEGMENT_STATISTIC_LENGTHS.iter() {
            buckets.push(SegmentBucket {
                min_mm: min,
                max_mm: Some(max),
                count: 0,
            });
            min = max;
        }
        buckets.push(SegmentBucket {
            min_mm: min,
            max_mm: None,
            count: 0,
        });
        Self {
            source: buckets.clone(),
            target: buckets,
            total_length_source: 0.0,
            total_length_target: 0.0,
            total_count_source: 0,
            total_count_target: 0,
        }
    }

    /// Record a source segment. Non-positive lengths are ignored.
    pub fn update_source(&mut self, length_mm: f64) {
        if length_mm <= 0.0 {
            return;
        }
        self.total_count_source += 1;
        self.total_length_source += length_mm;
        Self::bucket_for(&mut self.source, length_mm).count += 1;
    }

    /// Record a target segment. Non-positive lengths are ignored.
    pub fn update_target(&mut self, length_mm: f64) {
        if length_mm <= 0.0 {
            return;
        }
        self.total_count_target += 1;
        self.total_length_target += length_mm;
        Self::bucket_for(&mut self.target, length_mm).count += 1;
    }

    fn bucket_for(buckets: &mut [SegmentBucket], length_mm: f64) -> &mut SegmentBucket {
        let idx = buckets
            .iter()
            .position(|b| match b.max_mm {
                Some(max) => b.min_mm <= length_mm && length_mm < max,
                None => true,
            })
            .unwrap_or(buckets.len() - 1);
        &mut buckets[idx]
    }

    /// Source-side buckets.
    pub fn source_buckets(&self) -> &[SegmentBucket] {
        &self.source
    }

    /// Target-side buckets.
    pub fn target_buckets(&self) -> &[SegmentBucket] {
        &self.target
    }

    /// Total source segment count.
    pub fn total_count_source(&self) -> u64 {
        self.total_count_source
    }

    /// Total target segment count.
    pub fn total_count_target(&self) -> u64 {
        self.total_count_target
    }

    /// Summed source segment length (mm).
    pub fn total_length_source(&self) -> f64 {
        self.total_length_source
    }

    /// Summed target segment length (mm).
    pub fn total_length_target(&self) -> f64 {
        self.total_length_target
    }

    /// Render the side-by-side histogram table: one row per bucket with
    /// source and target counts and the percent change, then totals rows.
    pub fn to_table(&self) -> String {
        const MM_COL: usize = 10;
        const LABEL_COL: usize = 4;
        const COUNT_COL: usize = 9;
        const PERCENT_COL: usize = 9;
        const TOTALS_LABEL: usize = 22;

        let table_width = MM_COL * 2 + LABEL_COL + COUNT_COL * 2 + PERCENT_COL;
        let mut out = String::new();

        out.push_str(&format!(
            "{:^mm$}{:label$}{:^mm$}{:>count$}{:>count$}{:>percent$}\n",
            "Min",
            "",
            "Max",
            "Source",
            "Target",
            "Change",
            mm = MM_COL,
            label = LABEL_COL,
            count = COUNT_COL,
            percent = PERCENT_COL
        ));
        out.push_str(&"-".repeat(table_width));
        out.push('\n');

        for (src, tgt) in self.source.iter().zip(self.target.iter()) {
            let change = percent_change_string(src.count, tgt.count);
            match src.max_mm {
                Some(max) => out.push_str(&format!(
                    "{:>mm$}{:^label$}{:>mm$}{:>count$}{:>count$}{:>percent$}\n",
                    format!("{:.3}mm", src.min_mm),
                    "to",
                    format!("{:.3}mm", max),
                    src.count,
                    tgt.count,
                    change,
                    mm = MM_COL,
                    label = LABEL_COL,
                    count = COUNT_COL,
                    percent = PERCENT_COL
                )),
                None => out.push_str(&format!(
                    "{:>mm$}{:^label$}{:>mm$}{:>count$}{:>count$}{:>percent$}\n",
                    "",
                    ">=",
                    format!("{:.3}mm", src.min_mm),
                    src.count,
                    tgt.count,
                    change,
                    mm = MM_COL,
                    label = LABEL_COL,
                    count = COUNT_COL,
                    percent = PERCENT_COL
                )),
            }
        }

        out.push_str(&"-".repeat(table_width));
        out.push('\n');

        if (self.total_length_source - self.total_length_target).abs() < 0.001 {
            out.push_str(&format!(
                "{:>width$}{:.>rest$}\n",
                "Total distance:",
                format!("{:.3}mm", self.total_length_source),
                width = TOTALS_LABEL,
                rest = table_width - TOTALS_LABEL
            ));
        } else {
            out.push_str(&format!(
                "{:>width$}{:.>rest$}\n",
                "Total distance source:",
                format!("{:.3}mm", self.total_length_source),
                width = TOTALS_LABEL,
                rest = table_width - TOTALS_LABEL
            ));
            out.push_str(&format!(
                "{:>width$}{:.>rest$}\n",
                "Total distance target:",
                format!("{:.3}mm", self.total_length_target),
                width = TOTALS_LABEL,
                rest = table_width - TOTALS_LABEL
            ));
        }
        out.push_str(&format!(
            "{:>width$}{:.>rest$}\n",
            "Total count source:",
            self.total_count_source,
            width = TOTALS_LABEL,
            rest = table_width - TOTALS_LABEL
        ));
        out.push_str(&format!(
            "{:>width$}{:.>rest$}\n",
            "Total count target:",
            self.total_count_target,
            width = TOTALS_LABEL,
            rest = table_width - TOTALS_LABEL
        ));
        out.push_str(&format!(
            "{:>width$}{:.>rest$}",
            "Total percent change:",
            percent_change_string(self.total_count_source, self.total_count_target),
            width = TOTALS_LABEL,
            rest = table_width - TOTALS_LABEL
        ));

        out
    }
}

/// Percent change from `source` to `target` as a display string.
fn percent_change_string(source: u64, target: u64) -> String {
    if source == 0 {
        return String::from("0.0%");
    }
    let change = (target as f64 - source as f64) / source as f64 * 100.0;
    format!("{:.1}%", change)
}

/// A snapshot of the welder's progress, handed to the progress callback and
/// embedded in the final result.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Progress {
    /// Percent of the source file consumed, 0-100.
    pub percent_complete: f64,
    pub seconds_elapsed: f64,
    /// Linear extrapolation from the bytes consumed so far.
    pub seconds_remaining: f64,
    /// Lines carrying a command word.
    pub gcodes_processed: u64,
    /// All source lines read.
    pub lines_processed: u64,
    /// Motion commands absorbed into arcs.
    pub points_compressed: u64,
    pub arcs_created: u64,
    pub source_file_size: u64,
    pub source_file_position: u64,
    pub target_file_size: u64,
    /// Source bytes per target byte.
    pub compression_ratio: f64,
    /// Percent reduction in file size.
    pub compression_percent: f64,
    #[serde(default)]
    pub statistics: SegmentStatistics,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1}% complete in {:.2} seconds with {:.2} seconds remaining.",
            self.percent_complete, self.seconds_elapsed, self.seconds_remaining
        )?;
        write!(
            f,
            " Gcodes processed: {}, current line: {}, points compressed: {}, arcs created: {}",
            self.gcodes_processed, self.lines_processed, self.points_compressed, self.arcs_created
        )?;
        write!(
            f,
            ", compression ratio: {:.2}, size reduction: {:.1}%",
            self.compression_ratio, self.compression_percent
        )
    }
}

/// The record returned by a welding run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WeldResult {
    /// The run completed without a fatal error (cancellation included).
    pub success: bool,
    /// The progress callback asked to stop.
    pub cancelled: bool,
    /// Human-readable outcome description.
    pub message: String,
    /// Final progress snapshot, statistics included.
    pub progress: Progress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_boundaries() {
        let mut stats = SegmentStatistics::new();
        stats.update_source(0.001); // [0, 0.002)
        stats.update_source(0.002); // [0.002, 0.005)
        stats.update_source(0.05); // [0.05, 0.1)
        stats.update_source(99.0); // [50, 100)
        stats.update_source(100.0); // overflow
        stats.update_source(5000.0); // overflow

        let buckets = stats.source_buckets();
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 1);
        assert_eq!(buckets[3].count, 1);
        assert_eq!(buckets[11].count, 1);
        assert_eq!(buckets[12].count, 2);
    }

    #[test]
    fn test_totals_match_bucket_sums() {
        let mut stats = SegmentStatistics::new();
        for i in 1..100 {
            stats.update_source(i as f64 * 0.37);
            stats.update_target(i as f64 * 0.11);
        }
        let source_sum: u64 = stats.source_buckets().iter().map(|b| b.count).sum();
        let target_sum: u64 = stats.target_buckets().iter().map(|b| b.count).sum();
        assert_eq!(source_sum, stats.total_count_source());
        assert_eq!(target_sum, stats.total_count_target());
    }

    #[test]
    fn test_non_positive_lengths_ignored() {
        let mut stats = SegmentStatistics::new();
        stats.update_source(0.0);
        stats.update_source(-1.0);
        assert_eq!(stats.total_count_source(), 0);
        assert!(stats.total_length_source() == 0.0);
    }

    #[test]
    fn test_table_renders() {
        let mut stats = SegmentStatistics::new();
        stats.update_source(0.3);
        stats.update_source(0.4);
        stats.update_target(0.7);

        let table = stats.to_table();
        assert!(table.contains("Source"));
        assert!(table.contains("Target"));
        assert!(table.contains(">="));
        assert!(table.contains("Total count source:"));
        // Distances differ, so both totals rows are present.
        assert!(table.contains("Total distance source:"));
        assert!(table.contains("Total distance target:"));
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(percent_change_string(100, 50), "-50.0%");
        assert_eq!(percent_change_string(0, 10), "0.0%");
        assert_eq!(percent_change_string(10, 10), "0.0%");
    }

    #[test]
    fn test_progress_display() {
        let progress = Progress {
            percent_complete: 50.0,
            arcs_created: 3,
            ..Progress::default()
        };
        let line = progress.to_string();
        assert!(line.contains("50.0% complete"));
        assert!(line.contains("arcs created: 3"));
    }
}
