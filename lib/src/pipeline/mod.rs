//! Welder pipeline - orchestrates the streaming transformation.
//!
//! The pipeline reads the source file line by line and feeds each line
//! through parser → position tracker → arc candidate, deciding at every
//! step whether to extend the candidate, commit it as a single `G2`/`G3`,
//! or pass the line through verbatim:
//!
//! ```text
//! source file → line reader → parser → position tracker
//!             → {arc candidate, unwritten buffer} → output writer → target file
//! ```
//!
//! Commands whose fate is undecided (they may be absorbed into an arc or
//! flushed verbatim) wait in the unwritten buffer. The buffer only grows
//! while a candidate is active, so memory stays bounded regardless of the
//! file size.
//!
//! # Example
//!
//! ```rust,ignore
//! use arc_welder::{Welder, WelderConfig};
//!
//! let result = Welder::new("print.gcode", "print.aw.gcode", WelderConfig::default())
//!     .with_progress(|p| { println!("{}", p); true })
//!     .process();
//! println!("{}", result.message);
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::WelderConfig;
use crate::fitting::{AddOutcome, SegmentedArc};
use crate::gcode::{parse_line, OutputWriter, ParsedCommand, PositionTracker, PositionUpdate};
use crate::geometry::Arc;
use crate::stats::{Progress, SegmentStatistics, WeldResult};
use crate::{Error, Result, VERSION};

/// Feedrate difference treated as a change when deciding whether an arc
/// needs an `F` word (mm/min).
const FEEDRATE_TOLERANCE: f64 = 1e-6;

/// The progress callback: receives a snapshot, returns `true` to continue
/// or `false` to cancel the run.
type ProgressCallback<'a> = Box<dyn FnMut(&Progress) -> bool + 'a>;

/// A source command waiting for the commit/flush decision.
#[derive(Debug)]
enum UnwrittenCommand {
    /// A linear move the current candidate spans.
    Motion {
        text: String,
        /// Cartesian length of the move (mm), for the target statistics
        /// when the move is flushed verbatim.
        length: f64,
        /// Feedrate in effect after the move (mm/min).
        feedrate: f64,
    },
    /// A comment or blank line riding along inside the candidate's span.
    Passive { text: String },
}

/// The arc welder: a one-pass streaming transformation from a source
/// G-code file to a target file with runs of linear moves replaced by
/// arcs.
pub struct Welder<'a> {
    source_path: PathBuf,
    target_path: PathBuf,
    config: WelderConfig,
    callback: Option<ProgressCallback<'a>>,

    tracker: PositionTracker,
    current_arc: SegmentedArc,
    unwritten: Vec<UnwrittenCommand>,
    writer: Option<OutputWriter>,
    statistics: SegmentStatistics,

    /// Extruder mode in effect for the moves of the current candidate.
    /// Mode changes close the candidate, so this cannot flip mid-run; it
    /// is captured at accept time because the tracker may already have
    /// interpreted the very command that closes the run.
    arc_absolute_e: bool,
    /// Feedrate in effect after the last written motion, zero before any.
    last_feedrate_written: f64,

    lines_processed: u64,
    gcodes_processed: u64,
    points_compressed: u64,
    arcs_created: u64,
    source_file_size: u64,
    source_file_position: u64,

    header_written: bool,
    cancelled: bool,
    start_time: Instant,
    next_notify_seconds: f64,
}

impl<'a> Welder<'a> {
    /// Create a welder for the given source and target paths.
    pub fn new(
        source: impl AsRef<Path>,
        target: impl AsRef<Path>,
        config: WelderConfig,
    ) -> Self {
        let tracker = PositionTracker::new(config.g90_g91_influences_extruder);
        let current_arc = SegmentedArc::new(&config);
        let unwritten = Vec::with_capacity(config.buffer_size);
        Self {
            source_path: source.as_ref().to_path_buf(),
            target_path: target.as_ref().to_path_buf(),
            config,
            callback: None,
            tracker,
            current_arc,
            unwritten,
            writer: None,
            statistics: SegmentStatistics::new(),
            arc_absolute_e: true,
            last_feedrate_written: 0.0,
            lines_processed: 0,
            gcodes_processed: 0,
            points_compressed: 0,
            arcs_created: 0,
            source_file_size: 0,
            source_file_position: 0,
            header_written: false,
            cancelled: false,
            start_time: Instant::now(),
            next_notify_seconds: 0.0,
        }
    }

    /// Attach a progress callback. It is invoked at most once per
    /// configured notification period; returning `false` cancels the run.
    pub fn with_progress(mut self, callback: impl FnMut(&Progress) -> bool + 'a) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Run the transformation.
    ///
    /// I/O failures are fatal and reported with `success == false` (the
    /// partial target file is removed). Cancellation through the callback
    /// is a non-error outcome: `success` stays `true`, `cancelled` is set
    /// and the partial target is kept, ending on a flushed boundary.
    pub fn process(mut self) -> WeldResult {
        if let Err(e) = self.config.validate() {
            return WeldResult {
                success: false,
                cancelled: false,
                message: e.to_string(),
                progress: Progress::default(),
            };
        }

        info!(
            "arc-welder {}: welding {} -> {} (resolution {}mm)",
            VERSION,
            self.source_path.display(),
            self.target_path.display(),
            self.config.resolution_mm
        );
        self.start_time = Instant::now();

        match self.run() {
            Ok(()) => {
                let progress = self.snapshot(self.start_time.elapsed().as_secs_f64());
                if let Some(cb) = self.callback.as_mut() {
                    cb(&progress);
                }
                let message = if self.cancelled {
                    format!(
                        "Arc welding cancelled after {} lines",
                        self.lines_processed
                    )
                } else {
                    format!(
                        "Arc welding succeeded: {} arcs created, {} points compressed, compression ratio {:.2}",
                        self.arcs_created, self.points_compressed, progress.compression_ratio
                    )
                };
                info!("{}", message);
                WeldResult {
                    success: true,
                    cancelled: self.cancelled,
                    message,
                    progress,
                }
            }
            Err(e) => {
                // Drop the writer to release the handle, then discard the
                // partial target.
                self.writer = None;
                let _ = std::fs::remove_file(&self.target_path);
                let message = format!("Arc welding failed: {}", e);
                WeldResult {
                    success: false,
                    cancelled: false,
                    message,
                    progress: self.snapshot(self.start_time.elapsed().as_secs_f64()),
                }
            }
        }
    }

    fn run(&mut self) -> Result<()> {
        let source = File::open(&self.source_path).map_err(|e| {
            Error::Source(format!("cannot open {}: {}", self.source_path.display(), e))
        })?;
        self.source_file_size = source
            .metadata()
            .map_err(|e| {
                Error::Source(format!("cannot stat {}: {}", self.source_path.display(), e))
            })?
            .len();
        let mut reader = BufReader::new(source);

        self.writer = Some(OutputWriter::create(&self.target_path).map_err(|e| {
            Error::Target(format!(
                "cannot create {}: {}",
                self.target_path.display(),
                e
            ))
        })?);

        let mut line = String::new();
        loop {
            line.clear();
            let bytes = reader.read_line(&mut line).map_err(|e| {
                Error::Source(format!("cannot read {}: {}", self.source_path.display(), e))
            })?;
            if bytes == 0 {
                break;
            }
            if self.lines_processed == 0 {
                if let Some(w) = self.writer.as_mut() {
                    w.set_crlf(line.ends_with("\r\n"));
                }
            }
            self.source_file_position += bytes as u64;
            self.lines_processed += 1;

            let text = line.trim_end_matches(['\r', '\n']);
            self.process_line(text)?;

            if !self.maybe_notify() {
                self.cancelled = true;
                self.flush_unwritten()?;
                self.current_arc.abort();
                break;
            }
        }

        if !self.cancelled {
            self.ensure_header()?;
            self.commit_or_flush()?;
        }
        if let Some(w) = self.writer.as_mut() {
            w.finish()?;
        }
        Ok(())
    }

    /// Route one source line: candidate motion, interrupting command, or
    /// passive text.
    fn process_line(&mut self, text: &str) -> Result<()> {
        let cmd = parse_line(text);
        if cmd.command.is_some() {
            self.gcodes_processed += 1;
        }
        if cmd.malformed {
            warn!(
                "line {}: unparseable gcode passed through verbatim: {}",
                self.lines_processed, text
            );
        }

        let update = self.tracker.apply(&cmd);
        if update.is_motion {
            self.statistics
                .update_source(update.pre.distance_xyz(&update.post));
        }

        // Only planar linear moves can join an arc. Everything else with a
        // command word (mode changes, input arcs, E- or F-only moves, tool
        // changes, temperatures...) interrupts the run; pure text rides
        // along in the buffer.
        if cmd.is_linear_move() && (cmd.has_parameter('X') || cmd.has_parameter('Y')) {
            self.feed_motion(&cmd, &update)
        } else if cmd.command.is_some() {
            self.commit_or_flush()?;
            self.write_through(&cmd, &update)
        } else if !self.current_arc.is_empty() {
            self.unwritten.push(UnwrittenCommand::Passive {
                text: text.to_string(),
            });
            Ok(())
        } else {
            self.write_line_direct(text)
        }
    }

    /// Offer a linear move to the candidate; on rejection commit or flush,
    /// then restart the candidate at the move.
    fn feed_motion(&mut self, cmd: &ParsedCommand, update: &PositionUpdate) -> Result<()> {
        if self.current_arc.is_empty() {
            // The candidate starts where the machine currently is.
            self.current_arc.try_add_point(update.pre, 0.0);
        }

        match self.current_arc.try_add_point(update.post, update.e_relative) {
            AddOutcome::Accepted => {
                self.arc_absolute_e = self.tracker.state().absolute_e;
                self.buffer_motion(cmd, update);
                if self.unwritten.len() >= self.config.buffer_size {
                    debug!(
                        "line {}: unwritten buffer reached {} commands, closing the candidate",
                        self.lines_processed, self.config.buffer_size
                    );
                    self.commit_or_flush()?;
                }
                Ok(())
            }
            AddOutcome::Rejected(reason) => {
                debug!(
                    "line {}: candidate closed ({} points): {}",
                    self.lines_processed,
                    self.current_arc.len(),
                    reason
                );
                self.commit_or_flush()?;

                self.current_arc.try_add_point(update.pre, 0.0);
                match self.current_arc.try_add_point(update.post, update.e_relative) {
                    AddOutcome::Accepted => {
                        self.arc_absolute_e = self.tracker.state().absolute_e;
                        self.buffer_motion(cmd, update);
                        Ok(())
                    }
                    AddOutcome::Rejected(_) => {
                        // Degenerate even on a fresh candidate (zero-length
                        // chord, Z change): plain pass-through.
                        self.current_arc.abort();
                        self.write_through(cmd, update)
                    }
                }
            }
        }
    }

    fn buffer_motion(&mut self, cmd: &ParsedCommand, update: &PositionUpdate) {
        self.unwritten.push(UnwrittenCommand::Motion {
            text: cmd.text.clone(),
            length: update.pre.distance_xyz(&update.post),
            feedrate: update.post.f,
        });
    }

    /// Commit the candidate as an arc when it is a valid shape, otherwise
    /// flush the buffered commands verbatim. Either way the candidate and
    /// the buffer end up empty.
    fn commit_or_flush(&mut self) -> Result<()> {
        match self.current_arc.pop_arc() {
            Some(arc) => self.commit_arc(&arc),
            None => {
                self.current_arc.abort();
                self.flush_unwritten()
            }
        }
    }

    /// Emit a committed arc: interleaved passive lines first in their
    /// original order, then the single `G2`/`G3` replacing the absorbed
    /// moves.
    fn commit_arc(&mut self, arc: &Arc) -> Result<()> {
        let mut absorbed: u64 = 0;
        for entry in std::mem::take(&mut self.unwritten) {
            match entry {
                UnwrittenCommand::Passive { text } => self.write_line_direct(&text)?,
                UnwrittenCommand::Motion { .. } => absorbed += 1,
            }
        }

        // In absolute mode the machine integrates the absolute end value
        // identically, so no G92 prefix is needed.
        let e_word = if arc.e_relative != 0.0 {
            Some(if self.arc_absolute_e {
                arc.end.e
            } else {
                arc.e_relative
            })
        } else {
            None
        };
        let f_word = (arc.feedrate > 0.0
            && (arc.feedrate - self.last_feedrate_written).abs() > FEEDRATE_TOLERANCE)
            .then_some(arc.feedrate);

        self.write_line_direct(&arc.to_gcode(e_word, f_word))?;
        if arc.feedrate > 0.0 {
            self.last_feedrate_written = arc.feedrate;
        }

        self.arcs_created += 1;
        self.points_compressed += absorbed;
        self.statistics.update_target(arc.length());
        debug!(
            "arc {}: {} moves -> {} r={:.3}mm sweep={:.1}deg",
            self.arcs_created,
            absorbed,
            arc.direction,
            arc.radius(),
            arc.sweep_radians.to_degrees()
        );
        Ok(())
    }

    /// Write every buffered command verbatim, in order.
    fn flush_unwritten(&mut self) -> Result<()> {
        for entry in std::mem::take(&mut self.unwritten) {
            match entry {
                UnwrittenCommand::Passive { text } => self.write_line_direct(&text)?,
                UnwrittenCommand::Motion {
                    text,
                    length,
                    feedrate,
                } => {
                    self.write_line_direct(&text)?;
                    self.statistics.update_target(length);
                    if feedrate > 0.0 {
                        self.last_feedrate_written = feedrate;
                    }
                }
            }
        }
        Ok(())
    }

    /// Pass a non-candidate command straight through.
    fn write_through(&mut self, cmd: &ParsedCommand, update: &PositionUpdate) -> Result<()> {
        self.write_line_direct(&cmd.text)?;
        if update.is_motion {
            self.statistics
                .update_target(update.pre.distance_xyz(&update.post));
            if update.post.f > 0.0 {
                self.last_feedrate_written = update.post.f;
            }
        }
        Ok(())
    }

    fn write_line_direct(&mut self, text: &str) -> Result<()> {
        self.ensure_header()?;
        if let Some(w) = self.writer.as_mut() {
            w.write_line(text).map_err(|e| {
                Error::Target(format!(
                    "cannot write {}: {}",
                    self.target_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Write the tool header once, before the first output line.
    fn ensure_header(&mut self) -> Result<()> {
        if self.header_written {
            return Ok(());
        }
        self.header_written = true;
        let header = format!(
            "; Postprocessed by arc-welder {} (resolution mm={}, max radius mm={})",
            VERSION, self.config.resolution_mm, self.config.max_radius_mm
        );
        if let Some(w) = self.writer.as_mut() {
            w.write_line(&header).map_err(|e| {
                Error::Target(format!(
                    "cannot write {}: {}",
                    self.target_path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Invoke the progress callback when the notification period is due.
    /// Returns `false` when the callback asks to cancel.
    fn maybe_notify(&mut self) -> bool {
        if self.callback.is_none() {
            return true;
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed < self.next_notify_seconds {
            return true;
        }
        self.next_notify_seconds = elapsed + self.config.notification_period_seconds;
        let snapshot = self.snapshot(elapsed);
        match self.callback.as_mut() {
            Some(cb) => cb(&snapshot),
            None => true,
        }
    }

    /// Build a progress snapshot for the given elapsed time.
    fn snapshot(&self, seconds_elapsed: f64) -> Progress {
        let percent_complete = if self.source_file_size > 0 {
            self.source_file_position as f64 / self.source_file_size as f64 * 100.0
        } else {
            100.0
        };
        let seconds_remaining = if percent_complete > 0.0 {
            seconds_elapsed * (100.0 - percent_complete) / percent_complete
        } else {
            0.0
        };
        let target_file_size = self.writer.as_ref().map_or(0, |w| w.bytes_written());
        let compression_ratio = if target_file_size > 0 {
            self.source_file_position as f64 / target_file_size as f64
        } else {
            0.0
        };
        let compression_percent = if self.source_file_position > 0 {
            (1.0 - target_file_size as f64 / self.source_file_position as f64) * 100.0
        } else {
            0.0
        };

        Progress {
            percent_complete,
            seconds_elapsed,
            seconds_remaining,
            gcodes_processed: self.gcodes_processed,
            lines_processed: self.lines_processed,
            points_compressed: self.points_compressed,
            arcs_created: self.arcs_created,
            source_file_size: self.source_file_size,
            source_file_position: self.source_file_position,
            target_file_size,
            compression_ratio,
            compression_percent,
            statistics: self.statistics.clone(),
        }
    }
}
