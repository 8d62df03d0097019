//! TL-010: Pose synthesis from op-code lines to pose table and target sequence.
//!
//! Runs over a private snapshot of the registry: Place ops move containers
//! and later ops in the same run see the new pose, while the caller's
//! registry is never touched. A bad op yields an `error_pose<N>` entry and
//! the run continues.

use super::error::{Diagnostic, Stage, TaskError};
use super::orientation::{
    orientation_from_quaternion, round3, Euler, DEFAULT_PLACE_ORIENTATION,
};
use super::registry::{parse_floats, Registry, IDENTITY_QUATERNION};
use super::scanner::split_top_level;
use super::types::{ContainerRecord, PoseDocument, PoseEntry, Target};
use tracing::{debug, warn};

/// Wrist rotation that tips the held container.
pub const POUR_TILT: f64 = 1.57;
/// Wrist rotation that brings it back upright.
pub const POUR_RETURN: f64 = -1.57;

pub const GRASP: &str = "grasp";
pub const RELEASE: &str = "release";

/// A parsed op-code line.
#[derive(Debug, Clone, PartialEq)]
pub enum OpCode {
    Pick {
        container: String,
    },
    Place {
        container: String,
        position: [f64; 3],
        orientation: Option<Vec<f64>>,
    },
    Pour {
        origin: String,
        destination: String,
        volume: Option<String>,
    },
}

/// Parse one op-code line. Op names match case-insensitively.
pub fn parse_op(line: &str) -> Result<OpCode, String> {
    let line = line.trim();
    let (name, content) = line
        .split_once('(')
        .and_then(|(name, rest)| rest.strip_suffix(')').map(|c| (name.trim(), c.trim())))
        .ok_or_else(|| format!("Error: Unknown op-code '{}'", line))?;

    match name.to_lowercase().as_str() {
        "pick" => Ok(OpCode::Pick {
            container: content.to_string(),
        }),
        "place" => {
            let args = split_top_level(content, ',');
            if args.len() < 2 {
                return Err(format!("Error: Insufficient arguments for Place in '{}'", line));
            }
            let position = match parse_floats(args[1]) {
                Some(p) if p.len() == 3 => [p[0], p[1], p[2]],
                _ => return Err(format!("Error: Invalid position format in '{}'", line)),
            };
            let orientation = match args.get(2) {
                Some(raw) => {
                    let parsed = parse_floats(raw);
                    if parsed.is_none() {
                        warn!(op = %line, "invalid orientation format, using default");
                    }
                    parsed
                }
                None => None,
            };
            Ok(OpCode::Place {
                container: args[0].to_string(),
                position,
                orientation,
            })
        }
        "pour" => {
            let args = split_top_level(content, ',');
            if args.len() < 2 {
                return Err(format!("Error: Insufficient arguments for pour in '{}'", line));
            }
            Ok(OpCode::Pour {
                origin: args[0].to_string(),
                destination: args[1].to_string(),
                volume: args.get(2).map(|v| v.to_string()),
            })
        }
        _ => Err(format!("Error: Unknown op-code '{}'", line)),
    }
}

/// Euler angles for a stored orientation. Anything but a quaternion is
/// read as the identity quaternion.
fn stored_euler(record: &ContainerRecord) -> Euler {
    let q = match record.orientation.as_slice() {
        &[x, y, z, w] => [x, y, z, w],
        _ => IDENTITY_QUATERNION,
    };
    orientation_from_quaternion(q)
}

/// Orientation requested by a Place: Euler triple, quaternion, or default.
/// Returns the angles to emit and the value to store on the record.
fn place_orientation(requested: Option<&[f64]>) -> (Euler, Vec<f64>) {
    match requested {
        Some(&[roll, pitch, yaw]) => (Euler::new(roll, pitch, yaw), vec![roll, pitch, yaw]),
        Some(&[x, y, z, w]) => (orientation_from_quaternion([x, y, z, w]), vec![x, y, z, w]),
        _ => {
            let d = DEFAULT_PLACE_ORIENTATION;
            (d, vec![d.roll, d.pitch, d.yaw])
        }
    }
}

/// Result of one synthesis run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub document: PoseDocument,
    pub diagnostics: Vec<Diagnostic>,
}

/// Stateful walker over an op-code stream.
pub struct Synthesizer {
    registry: Registry,
    counter: u32,
    synthesis: Synthesis,
}

impl Synthesizer {
    /// Start a run on a snapshot of `registry`.
    pub fn new(registry: &Registry) -> Self {
        Self {
            registry: registry.snapshot(),
            counter: 1,
            synthesis: Synthesis::default(),
        }
    }

    /// Container state as seen by the run so far.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Process one op-code line. Blank lines are ignored.
    pub fn apply(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        match parse_op(line) {
            Ok(op) => self.apply_op(op),
            Err(message) => self.error_pose(message, TaskError::UnknownOpCode(line.to_string())),
        }
    }

    pub fn apply_op(&mut self, op: OpCode) {
        match op {
            OpCode::Pick { container } => {
                let Some(record) = self.registry.get(&container) else {
                    return self.missing(&container);
                };
                let position = record.position;
                let euler = stored_euler(record);
                self.pose(position, euler, &[Target::Action(GRASP.to_string())]);
            }
            OpCode::Place {
                container,
                position,
                orientation,
            } => {
                let Some(record) = self.registry.get_mut(&container) else {
                    return self.missing(&container);
                };
                let (euler, stored) = place_orientation(orientation.as_deref());
                record.position = position;
                record.orientation = stored;
                debug!(container = %container, ?position, "container moved");
                self.pose(position, euler, &[Target::Action(RELEASE.to_string())]);
            }
            OpCode::Pour {
                origin,
                destination,
                volume,
            } => {
                let Some(record) = self.registry.get(&destination) else {
                    return self.missing(&destination);
                };
                debug!(origin = %origin, destination = %destination, volume = ?volume, "pour");
                let position = record.position;
                let euler = stored_euler(record);
                self.pose(
                    position,
                    euler,
                    &[Target::Rotation(POUR_TILT), Target::Rotation(POUR_RETURN)],
                );
            }
        }
    }

    fn next_index(&mut self) -> u32 {
        let n = self.counter;
        self.counter += 1;
        n
    }

    fn pose(&mut self, position: [f64; 3], e: Euler, actions: &[Target]) {
        let label = format!("pose{}", self.next_index());
        self.synthesis.document.poses.insert(
            label.clone(),
            PoseEntry::Pose {
                x: round3(position[0]),
                y: round3(position[1]),
                z: round3(position[2]),
                roll: round3(e.roll),
                pitch: round3(e.pitch),
                yaw: round3(e.yaw),
            },
        );
        let targets = &mut self.synthesis.document.targets;
        targets.push(Target::Pose(label));
        targets.extend_from_slice(actions);
    }

    fn missing(&mut self, id: &str) {
        self.error_pose(
            format!("Error: Container {} not found.", id),
            TaskError::ContainerNotFound(id.to_string()),
        );
    }

    fn error_pose(&mut self, message: String, error: TaskError) {
        warn!(error = %error, "{}", message);
        let label = format!("error_pose{}", self.next_index());
        self.synthesis
            .document
            .poses
            .insert(label, PoseEntry::Error { error: message });
        self.synthesis
            .diagnostics
            .push(Diagnostic::new(Stage::Synthesize, error));
    }

    pub fn finish(self) -> Synthesis {
        self.synthesis
    }
}

/// Run a full op-code stream against a snapshot of `registry`.
pub fn synthesize<'a>(lines: impl IntoIterator<Item = &'a str>, registry: &Registry) -> Synthesis {
    let mut synth = Synthesizer::new(registry);
    for line in lines {
        synth.apply(line);
    }
    synth.finish()
}

/// Same as [`synthesize`] over newline-separated op-code text.
pub fn synthesize_text(text: &str, registry: &Registry) -> Synthesis {
    synthesize(text.lines(), registry)
}
