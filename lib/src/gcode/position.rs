//! Machine state tracking.
//!
//! The tracker interprets each parsed command and maintains the authoritative
//! machine state: XYZE position, feedrate, absolute/relative modes and units.
//! It reports the pre- and post-command positions so the welder can reason
//! about the move a command produced.
//!
//! Recognised commands: `G0`/`G1` (and `G2`/`G3` endpoints), `G90`/`G91`,
//! `G92`, `M82`/`M83`, `G20`/`G21`. Anything else leaves the state unchanged.

use crate::config::MM_PER_INCH;
use crate::geometry::Point;

use super::ParsedCommand;

/// The machine state the tracker maintains.
///
/// The position always carries millimetres internally; while `G20` is active
/// interpreted parameters are scaled by 25.4 on the way in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MachineState {
    /// Current position, extruder position and feedrate.
    pub position: Point,
    /// XYZ words are absolute (`G90`) rather than relative (`G91`).
    pub absolute_xyz: bool,
    /// E words are absolute (`M82`) rather than relative (`M83`).
    pub absolute_e: bool,
    /// Units are millimetres (`G21`) rather than inches (`G20`).
    pub units_mm: bool,
}

impl Default for MachineState {
    fn default() -> Self {
        Self {
            position: Point::default(),
            absolute_xyz: true,
            absolute_e: true,
            units_mm: true,
        }
    }
}

/// What a single command did to the machine state.
#[derive(Clone, Copy, Debug)]
pub struct PositionUpdate {
    /// Position before the command.
    pub pre: Point,
    /// Position after the command.
    pub post: Point,
    /// Extruder advance produced by the command (mm of filament). Zero for
    /// anything that is not a motion.
    pub e_relative: f64,
    /// The command was a motion (`G0`-`G3`).
    pub is_motion: bool,
    /// The command changed a positioning mode, the units, or redefined the
    /// position (`G90`/`G91`/`G92`/`M82`/`M83`/`G20`/`G21`).
    pub is_mode_change: bool,
}

/// Maintains the machine state as commands are consumed.
#[derive(Clone, Debug)]
pub struct PositionTracker {
    state: MachineState,
    g90_g91_influences_extruder: bool,
}

impl PositionTracker {
    /// Create a tracker in the default state: absolute XYZ and E,
    /// millimetre units, position at the origin.
    pub fn new(g90_g91_influences_extruder: bool) -> Self {
        Self {
            state: MachineState::default(),
            g90_g91_influences_extruder,
        }
    }

    /// The current machine state.
    #[inline]
    pub fn state(&self) -> &MachineState {
        &self.state
    }

    /// Interpret one command, updating the state and reporting the change.
    pub fn apply(&mut self, cmd: &ParsedCommand) -> PositionUpdate {
        let pre = self.state.position;
        let mut is_motion = false;
        let mut is_mode_change = false;

        if let Some(word) = cmd.command {
            match (word.letter, word.number) {
                ('G', 0) | ('G', 1) | ('G', 2) | ('G', 3) => {
                    self.apply_move(cmd);
                    is_motion = true;
                }
                ('G', 20) => {
                    self.state.units_mm = false;
                    is_mode_change = true;
                }
                ('G', 21) => {
                    self.state.units_mm = true;
                    is_mode_change = true;
                }
                ('G', 90) => {
                    self.state.absolute_xyz = true;
                    if self.g90_g91_influences_extruder {
                        self.state.absolute_e = true;
                    }
                    is_mode_change = true;
                }
                ('G', 91) => {
                    self.state.absolute_xyz = false;
                    if self.g90_g91_influences_extruder {
                        self.state.absolute_e = false;
                    }
                    is_mode_change = true;
                }
                ('G', 92) => {
                    self.apply_set_position(cmd);
                    is_mode_change = true;
                }
                ('M', 82) => {
                    self.state.absolute_e = true;
                    is_mode_change = true;
                }
                ('M', 83) => {
                    self.state.absolute_e = false;
                    is_mode_change = true;
                }
                _ => {}
            }
        }

        let post = self.state.position;
        PositionUpdate {
            pre,
            post,
            e_relative: if is_motion { post.e - pre.e } else { 0.0 },
            is_motion,
            is_mode_change,
        }
    }

    /// Interpreted parameter value in millimetres.
    #[inline]
    fn to_mm(&self, value: f64) -> f64 {
        if self.state.units_mm {
            value
        } else {
            value * MM_PER_INCH
        }
    }

    fn apply_move(&mut self, cmd: &ParsedCommand) {
        let absolute_xyz = self.state.absolute_xyz;
        let absolute_e = self.state.absolute_e;

        if let Some(x) = cmd.parameter('X') {
            let x = self.to_mm(x);
            self.state.position.x = if absolute_xyz {
                x
            } else {
                self.state.position.x + x
            };
        }
        if let Some(y) = cmd.parameter('Y') {
            let y = self.to_mm(y);
            self.state.position.y = if absolute_xyz {
                y
            } else {
                self.state.position.y + y
            };
        }
        if let Some(z) = cmd.parameter('Z') {
            let z = self.to_mm(z);
            self.state.position.z = if absolute_xyz {
                z
            } else {
                self.state.position.z + z
            };
        }
        if let Some(e) = cmd.parameter('E') {
            let e = self.to_mm(e);
            self.state.position.e = if absolute_e {
                e
            } else {
                self.state.position.e + e
            };
        }
        if let Some(f) = cmd.parameter('F') {
            self.state.position.f = self.to_mm(f);
        }
    }

    /// `G92`: redefine the current position for the named axes, without
    /// motion. A `G92` with no axis words leaves the position unchanged.
    fn apply_set_position(&mut self, cmd: &ParsedCommand) {
        if let Some(x) = cmd.parameter('X') {
            self.state.position.x = self.to_mm(x);
        }
        if let Some(y) = cmd.parameter('Y') {
            self.state.position.y = self.to_mm(y);
        }
        if let Some(z) = cmd.parameter('Z') {
            self.state.position.z = self.to_mm(z);
        }
        if let Some(e) = cmd.parameter('E') {
            self.state.position.e = self.to_mm(e);
        }
    }
}
