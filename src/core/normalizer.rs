//! TL-009: Canonical op-code lines for resolved commands.
//!
//! - `Pick(<id>)`
//! - `Place(<id>,(x,y,z)[,(orientation)])`
//! - `pour(<origin>,<destination>[,<volume>])`, volume omitted when "all"

use super::types::{ResolvedCommand, Value, POUR_ALL};

/// Render one resolved command as an op-code line.
pub fn normalize(cmd: &ResolvedCommand) -> String {
    match cmd {
        ResolvedCommand::Pick { container } => format!("Pick({})", container),
        ResolvedCommand::Place {
            container,
            location,
            orientation,
        } => {
            let location = location
                .as_ref()
                .map_or_else(|| "none".to_string(), Value::to_plain);
            match orientation {
                Some(o) => format!("Place({},{},{})", container, location, o.to_plain()),
                None => format!("Place({},{})", container, location),
            }
        }
        ResolvedCommand::Pour {
            origin,
            destination,
            volume,
        } => match volume_arg(volume) {
            Some(v) => format!("pour({},{},{})", origin, destination, v),
            None => format!("pour({},{})", origin, destination),
        },
    }
}

fn volume_arg(volume: &Value) -> Option<String> {
    match volume {
        Value::Str(s) if s.trim().eq_ignore_ascii_case(POUR_ALL) => None,
        other => Some(other.to_plain()),
    }
}

/// Render a command stream, one op-code per line.
pub fn normalize_all(commands: &[ResolvedCommand]) -> Vec<String> {
    commands.iter().map(normalize).collect()
}
