//! TL-008: Container resolution.
//!
//! Matches partial container descriptors (`{type: beaker, content_color:
//! blue, ...}`) against the registry. Every non-null criterion must equal the
//! record's field case-insensitively. Zero matches resolve to `unknown`, one
//! match to its id, several to the first in registry order (or `unknown`
//! under [`AmbiguityPolicy::Unresolved`]); ambiguity is always reported.

use super::error::{Diagnostic, Stage, TaskError};
use super::registry::Registry;
use super::types::*;
use tracing::{debug, warn};

/// Outcome of resolving one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Matched(String),
    /// Several records matched; `id` is what the policy selected.
    Ambiguous { id: String, candidates: Vec<String> },
    /// Descriptor asked for the active container and nothing concrete matched.
    Active,
    Unresolved,
}

impl Resolution {
    pub fn id(&self) -> &str {
        match self {
            Self::Matched(id) | Self::Ambiguous { id, .. } => id,
            Self::Active => ACTIVE_CONTAINER,
            Self::Unresolved => UNKNOWN_CONTAINER,
        }
    }

    /// Concrete registry id, if one was selected.
    pub fn concrete_id(&self) -> Option<&str> {
        match self.id() {
            UNKNOWN_CONTAINER | ACTIVE_CONTAINER => None,
            id => Some(id),
        }
    }
}

/// Criteria from a descriptor: known fields whose value is not "null".
///
/// A bare string descriptor is shorthand for `{type: <string>}`. Any other
/// shape carries no usable criteria.
pub fn criteria(descriptor: &Value) -> Option<Vec<(&'static str, String)>> {
    match descriptor {
        Value::Map(map) => Some(
            DESCRIPTOR_FIELDS
                .iter()
                .filter_map(|&field| {
                    map.get(field)
                        .filter(|v| !v.is_null())
                        .map(|v| (field, v.to_plain()))
                })
                .collect(),
        ),
        Value::Str(s) if s.trim().eq_ignore_ascii_case(NULL_SENTINEL) => Some(Vec::new()),
        Value::Str(s) => Some(vec![("type", s.trim().to_string())]),
        _ => None,
    }
}

fn wants_active(descriptor: &Value) -> bool {
    let type_field = match descriptor {
        Value::Map(map) => map.get("type").and_then(Value::as_str),
        Value::Str(s) => Some(s.as_str()),
        _ => None,
    };
    type_field.is_some_and(|t| t.trim().eq_ignore_ascii_case("active container"))
}

fn field_matches(record: &ContainerRecord, field: &str, expected: &str) -> bool {
    record
        .field(field)
        .is_some_and(|actual| actual.trim().to_lowercase() == expected.trim().to_lowercase())
}

/// Resolve a descriptor against the registry.
pub fn resolve_container(
    descriptor: &Value,
    registry: &Registry,
    policy: AmbiguityPolicy,
) -> Resolution {
    let Some(criteria) = criteria(descriptor) else {
        debug!(descriptor = %descriptor, "descriptor has no usable shape");
        return Resolution::Unresolved;
    };

    let candidates: Vec<String> = registry
        .iter()
        .filter(|record| {
            criteria
                .iter()
                .all(|(field, expected)| field_matches(record, field, expected))
        })
        .map(|record| record.id.clone())
        .collect();

    match candidates.len() {
        0 if wants_active(descriptor) => Resolution::Active,
        0 => Resolution::Unresolved,
        1 => Resolution::Matched(candidates[0].clone()),
        _ => {
            let id = match policy {
                AmbiguityPolicy::FirstMatch => candidates[0].clone(),
                AmbiguityPolicy::Unresolved => UNKNOWN_CONTAINER.to_string(),
            };
            Resolution::Ambiguous { id, candidates }
        }
    }
}

/// Commands with container ids in place of descriptors.
#[derive(Debug, Default)]
pub struct ResolvedBatch {
    pub commands: Vec<ResolvedCommand>,
    /// Concrete container ids referenced, in order of appearance.
    pub relevant_ids: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

struct Resolver<'a> {
    registry: &'a Registry,
    policy: AmbiguityPolicy,
    batch: ResolvedBatch,
}

impl Resolver<'_> {
    fn container(&mut self, command: &str, field: &str, descriptor: Option<&Value>) -> String {
        let Some(descriptor) = descriptor else {
            warn!(command, field, "container descriptor missing");
            self.report(TaskError::UnresolvedContainer {
                descriptor: format!("{}.{} (missing)", command, field),
            });
            return UNKNOWN_CONTAINER.to_string();
        };

        let resolution = resolve_container(descriptor, self.registry, self.policy);
        match &resolution {
            Resolution::Unresolved => {
                warn!(command, field, descriptor = %descriptor, "no matching container");
                self.report(TaskError::UnresolvedContainer {
                    descriptor: descriptor.to_string(),
                });
            }
            Resolution::Ambiguous { id, candidates } => {
                warn!(command, field, selected = %id, candidates = candidates.len(), "ambiguous container");
                self.report(TaskError::AmbiguousContainer {
                    descriptor: descriptor.to_string(),
                    candidates: candidates.clone(),
                });
            }
            Resolution::Matched(id) => debug!(command, field, container = %id, "container resolved"),
            Resolution::Active => debug!(command, field, "active container requested"),
        }
        if let Some(id) = resolution.concrete_id() {
            self.batch.relevant_ids.push(id.to_string());
        }
        resolution.id().to_string()
    }

    fn report(&mut self, error: TaskError) {
        self.batch.diagnostics.push(Diagnostic::new(Stage::Resolve, error));
    }

    fn command(&mut self, cmd: &Command) -> Option<ResolvedCommand> {
        let name = cmd.name.to_lowercase();
        match name.as_str() {
            "pick" => Some(ResolvedCommand::Pick {
                container: self.container("pick", "container", cmd.param("container")),
            }),
            "place" => {
                let container = self.container("place", "container", cmd.param("container"));
                Some(ResolvedCommand::Place {
                    container,
                    location: non_null(cmd.param("destination_location").or(cmd.param("location"))),
                    orientation: non_null(
                        cmd.param("orientation")
                            .or(cmd.param("destination_orientation")),
                    ),
                })
            }
            "pour" => {
                let origin = self.container("pour", "original_container", cmd.param("original_container"));
                let default_destination = Value::Str("active container".to_string());
                let destination = self.container(
                    "pour",
                    "destination_container",
                    Some(cmd.param("destination_container").unwrap_or(&default_destination)),
                );
                Some(ResolvedCommand::Pour {
                    origin,
                    destination,
                    volume: cmd
                        .param("volume")
                        .cloned()
                        .unwrap_or_else(|| Value::Str(POUR_ALL.to_string())),
                })
            }
            _ => {
                warn!(command = %cmd.name, "unrecognized command skipped");
                self.report(TaskError::UnknownCommand(cmd.name.clone()));
                None
            }
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value
        .filter(|v| !v.is_null() && !matches!(v, Value::Str(s) if s.trim().eq_ignore_ascii_case("none")))
        .cloned()
}

/// Resolve every command's container fields, in order.
pub fn resolve_commands(
    commands: &[Command],
    registry: &Registry,
    policy: AmbiguityPolicy,
) -> ResolvedBatch {
    let mut resolver = Resolver {
        registry,
        policy,
        batch: ResolvedBatch::default(),
    };
    for cmd in commands {
        if let Some(resolved) = resolver.command(cmd) {
            resolver.batch.commands.push(resolved);
        }
    }
    resolver.batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::parse_value;
    use proptest::prelude::*;

    fn record(id: &str, kind: &str, color: &str, name: &str) -> ContainerRecord {
        ContainerRecord {
            id: id.to_string(),
            aruco_id: "0".to_string(),
            position: [0.0, 0.0, 0.0],
            orientation: vec![0.0, 0.0, 0.0, 1.0],
            container_type: kind.to_string(),
            size: String::new(),
            content_name: name.to_string(),
            content_volume: "50".to_string(),
            content_color: color.to_string(),
            active_status: "False".to_string(),
            landmark: "null".to_string(),
        }
    }

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.insert(record("B1", "beaker", "blue", "copper sulphate solution"));
        reg.insert(record("B2", "beaker", "clear", "distilled water"));
        reg.insert(record("B3", "Beaker", "Clear", "ethanol"));
        reg.insert(record("F1", "flask", "clear", "distilled water"));
        reg
    }

    fn desc(text: &str) -> Value {
        parse_value(text).unwrap()
    }

    #[test]
    fn test_tl008_single_match() {
        let mut reg = Registry::new();
        reg.insert(record("B1", "beaker", "blue", "x"));
        let r = resolve_container(&desc("{type: beaker, content_color: blue}"), &reg, AmbiguityPolicy::FirstMatch);
        assert_eq!(r, Resolution::Matched("B1".to_string()));
    }

    #[test]
    fn test_tl008_empty_registry_unknown() {
        let r = resolve_container(&desc("{type: beaker}"), &Registry::new(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r, Resolution::Unresolved);
        assert_eq!(r.id(), "unknown");
    }

    #[test]
    fn test_tl008_nulls_are_unconstrained() {
        let d = desc(r#"{type: "beaker", size: null, content_name: "copper sulphate solution", content_color: "blue", content_volume: null, landmark: null}"#);
        let r = resolve_container(&d, &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r.id(), "B1");
        assert_eq!(criteria(&d).unwrap().len(), 3);
    }

    #[test]
    fn test_tl008_case_insensitive() {
        let r = resolve_container(
            &desc("{type: BEAKER, content_name: Ethanol}"),
            &registry(),
            AmbiguityPolicy::FirstMatch,
        );
        assert_eq!(r.id(), "B3");
    }

    #[test]
    fn test_tl008_ambiguous_first_match() {
        let r = resolve_container(&desc("{type: beaker, content_color: clear}"), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(
            r,
            Resolution::Ambiguous {
                id: "B2".to_string(),
                candidates: vec!["B2".to_string(), "B3".to_string()],
            }
        );
    }

    #[test]
    fn test_tl008_ambiguous_unresolved_policy() {
        let r = resolve_container(&desc("{type: beaker}"), &registry(), AmbiguityPolicy::Unresolved);
        assert_eq!(r.id(), "unknown");
        assert!(r.concrete_id().is_none());
    }

    #[test]
    fn test_tl008_active_container() {
        let r = resolve_container(&desc("{type: 'active container'}"), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r, Resolution::Active);
        assert_eq!(r.id(), "active_container");
        let r = resolve_container(&Value::Str("Active Container".into()), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r, Resolution::Active);
    }

    #[test]
    fn test_tl008_active_prefers_concrete_match() {
        let mut reg = registry();
        reg.insert(record("AC", "active container", "null", "null"));
        let r = resolve_container(&desc("{type: active container}"), &reg, AmbiguityPolicy::FirstMatch);
        assert_eq!(r.id(), "AC");
    }

    #[test]
    fn test_tl008_unknown_field_ignored_size_constrains() {
        let r = resolve_container(&desc("{type: flask, shape: round}"), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r.id(), "F1");
        let r = resolve_container(&desc("{type: flask, size: 250ml}"), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r.id(), "unknown");
    }

    #[test]
    fn test_tl008_non_mapping_descriptor() {
        let r = resolve_container(&Value::Int(3), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r, Resolution::Unresolved);
    }

    #[test]
    fn test_tl008_numeric_criterion() {
        let r = resolve_container(&desc("{type: flask, content_volume: 50}"), &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(r.id(), "F1");
    }

    fn cmd(name: &str, params: &[(&str, &str)]) -> Command {
        Command {
            name: name.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), parse_value(v).unwrap()))
                .collect(),
        }
    }

    #[test]
    fn test_tl008_resolve_commands() {
        let commands = vec![
            cmd("Pick", &[("container", "{type: beaker, content_color: blue}")]),
            cmd(
                "place",
                &[
                    ("container", "{type: beaker, content_color: blue}"),
                    ("destination_location", "(1, 2, 3)"),
                    ("landmark", "null"),
                ],
            ),
            cmd("pour", &[("original_container", "{type: flask}")]),
            cmd("wave", &[]),
        ];
        let batch = resolve_commands(&commands, &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(batch.commands.len(), 3);
        assert_eq!(batch.commands[0], ResolvedCommand::Pick { container: "B1".to_string() });
        assert_eq!(
            batch.commands[2],
            ResolvedCommand::Pour {
                origin: "F1".to_string(),
                destination: "active_container".to_string(),
                volume: Value::Str("all".to_string()),
            }
        );
        assert_eq!(batch.relevant_ids, vec!["B1", "B1", "F1"]);
        assert_eq!(batch.diagnostics.len(), 1);
        assert!(matches!(batch.diagnostics[0].error, TaskError::UnknownCommand(ref n) if n == "wave"));
    }

    #[test]
    fn test_tl008_place_none_location() {
        let commands = vec![cmd(
            "place",
            &[("container", "{type: flask}"), ("destination_location", "none")],
        )];
        let batch = resolve_commands(&commands, &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(
            batch.commands[0],
            ResolvedCommand::Place {
                container: "F1".to_string(),
                location: None,
                orientation: None,
            }
        );
    }

    #[test]
    fn test_tl008_missing_container_param() {
        let batch = resolve_commands(&[cmd("pick", &[])], &registry(), AmbiguityPolicy::FirstMatch);
        assert_eq!(batch.commands[0], ResolvedCommand::Pick { container: "unknown".to_string() });
        assert!(matches!(batch.diagnostics[0].error, TaskError::UnresolvedContainer { .. }));
    }

    #[test]
    fn test_tl008_ambiguity_reported() {
        let batch = resolve_commands(
            &[cmd("pick", &[("container", "{type: beaker}")])],
            &registry(),
            AmbiguityPolicy::FirstMatch,
        );
        assert_eq!(batch.commands[0], ResolvedCommand::Pick { container: "B1".to_string() });
        assert!(matches!(
            &batch.diagnostics[0].error,
            TaskError::AmbiguousContainer { candidates, .. } if candidates.len() == 3
        ));
    }

    proptest! {
        #[test]
        fn test_tl008_criteria_order_independent(perm in Just(vec![0usize, 1, 2]).prop_shuffle()) {
            let fields = [
                ("type", "beaker"),
                ("content_color", "clear"),
                ("content_name", "distilled water"),
            ];
            let body: Vec<String> = perm
                .iter()
                .map(|&i| format!("{}: \"{}\"", fields[i].0, fields[i].1))
                .collect();
            let d = desc(&format!("{{{}}}", body.join(", ")));
            let r = resolve_container(&d, &registry(), AmbiguityPolicy::FirstMatch);
            prop_assert_eq!(r.id(), "B2");
        }
    }
}
