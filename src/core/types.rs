//! TL-001: Shared types for the instruction → pose pipeline.
//!
//! Literal values produced by the parser, commands, registry records, and the
//! pose document consumed by the downstream motion executor. Output types
//! derive Serialize and render to YAML or JSON in insertion order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved container id for a descriptor that matched nothing.
pub const UNKNOWN_CONTAINER: &str = "unknown";

/// Reserved container id for "the container currently in use".
pub const ACTIVE_CONTAINER: &str = "active_container";

/// Value marking an unconstrained descriptor field.
pub const NULL_SENTINEL: &str = "null";

/// Pour volume meaning "everything in the origin container".
pub const POUR_ALL: &str = "all";

// ============================================================================
// Literal values
// ============================================================================

/// A parsed literal argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    /// Tuple `(..)` or list `[..]`; both keep element order.
    Seq(Vec<Value>),
    /// Mapping `{..}` with normalized keys in first-seen order.
    Map(IndexMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// True for the "null" sentinel string (any case).
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Str(s) if s.trim().eq_ignore_ascii_case(NULL_SENTINEL))
    }

    /// Numeric view; ints widen to f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Plain text form used for criteria comparison and op-code arguments.
    /// Strings are unquoted; sequences render as `(a,b,c)`.
    pub fn to_plain(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(f) => float_literal(*f),
            Self::Str(s) => s.clone(),
            Self::Seq(items) => {
                let inner: Vec<String> = items.iter().map(Value::to_plain).collect();
                format!("({})", inner.join(","))
            }
            Self::Map(_) => self.to_string(),
        }
    }
}

/// Positional float text that always carries a `.` (`1e16` renders as
/// `10000000000000000.0`), so it re-parses as a float.
fn float_literal(x: f64) -> String {
    let text = x.to_string();
    if x.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

/// Literal source form: re-parsing it yields an equal value.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", float_literal(*x)),
            Self::Str(s) => write!(f, "\"{}\"", s),
            Self::Seq(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// One call-expression found in instruction text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub name: String,
    pub params: IndexMap<String, Value>,
}

impl Command {
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

/// A command whose container descriptors have been replaced by ids.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedCommand {
    Pick {
        container: String,
    },
    Place {
        container: String,
        location: Option<Value>,
        orientation: Option<Value>,
    },
    Pour {
        origin: String,
        destination: String,
        volume: Value,
    },
}

// ============================================================================
// Registry
// ============================================================================

/// A known container with mutable physical state.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerRecord {
    pub id: String,
    pub aruco_id: String,
    pub position: [f64; 3],
    /// Quaternion (x, y, z, w) as loaded, or roll/pitch/yaw after a Place.
    pub orientation: Vec<f64>,
    pub container_type: String,
    pub size: String,
    pub content_name: String,
    pub content_volume: String,
    pub content_color: String,
    pub active_status: String,
    pub landmark: String,
}

impl ContainerRecord {
    /// Look up a descriptor field by name. Unknown fields yield None.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "id" => Some(&self.id),
            "aruco_id" => Some(&self.aruco_id),
            "type" => Some(&self.container_type),
            "size" => Some(&self.size),
            "content_name" => Some(&self.content_name),
            "content_volume" => Some(&self.content_volume),
            "content_color" => Some(&self.content_color),
            "active_status" => Some(&self.active_status),
            "landmark" => Some(&self.landmark),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.active_status.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1" | "active"
        )
    }
}

/// Fields a container descriptor may constrain.
pub const DESCRIPTOR_FIELDS: [&str; 6] = [
    "type",
    "size",
    "content_name",
    "content_color",
    "content_volume",
    "landmark",
];

// ============================================================================
// Pose document
// ============================================================================

/// A labeled 6-DOF pose, or a placeholder describing why none was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PoseEntry {
    Pose {
        x: f64,
        y: f64,
        z: f64,
        roll: f64,
        pitch: f64,
        yaw: f64,
    },
    Error {
        error: String,
    },
}

impl PoseEntry {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// One element of the executor's target sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Target {
    /// Reference to a pose label.
    Pose(String),
    /// Symbolic gripper action ("grasp" / "release").
    Action(String),
    /// Wrist rotation in radians.
    Rotation(f64),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pose(s) | Self::Action(s) => write!(f, "{}", s),
            Self::Rotation(r) => write!(f, "{}", r),
        }
    }
}

/// Final output handed to the motion executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoseDocument {
    #[serde(rename = "Poses")]
    pub poses: IndexMap<String, PoseEntry>,
    pub targets: Vec<Target>,
}

impl PoseDocument {
    pub fn error_count(&self) -> usize {
        self.poses.values().filter(|p| p.is_error()).count()
    }
}

// ============================================================================
// Configuration enums
// ============================================================================

/// How to resolve a descriptor that matches several containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Take the first match in registry order.
    #[default]
    FirstMatch,
    /// Treat the descriptor as unresolved.
    Unresolved,
}

/// Output document encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}
