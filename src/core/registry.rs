//! TL-006: Container registry: CSV load, lookup, per-run snapshots.
//!
//! One row per container. `position` is `[x, y, z]`, `orientation` is a
//! quaternion `[x, y, z, w]` (or three Euler angles). Malformed pose cells
//! fall back to the origin / identity quaternion with a warning; an unreadable
//! source is the only fatal error in the pipeline.

use super::error::TaskError;
use super::types::{ContainerRecord, ACTIVE_CONTAINER};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_POSITION: [f64; 3] = [0.0, 0.0, 0.0];
pub const IDENTITY_QUATERNION: [f64; 4] = [0.0, 0.0, 0.0, 1.0];

/// Ordered set of known containers, keyed by unique id in load order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    containers: IndexMap<String, ContainerRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry CSV from disk.
    pub fn load_csv(path: &Path) -> Result<Self, TaskError> {
        let file = std::fs::File::open(path)
            .map_err(|e| TaskError::RegistryLoad(format!("cannot open {}: {}", path.display(), e)))?;
        let registry = Self::from_reader(file)?;
        debug!(path = %path.display(), containers = registry.len(), "registry loaded");
        Ok(registry)
    }

    /// Load a registry from any CSV source with a header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TaskError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|e| TaskError::RegistryLoad(format!("cannot read header row: {}", e)))?
            .clone();
        if !headers.iter().any(|h| h == "id") {
            return Err(TaskError::RegistryLoad("missing 'id' column".to_string()));
        }

        let mut registry = Self::new();
        for (idx, row) in reader.records().enumerate() {
            let row = row
                .map_err(|e| TaskError::RegistryLoad(format!("cannot read row {}: {}", idx + 1, e)))?;
            let get = |col: &str| -> Option<String> {
                headers
                    .iter()
                    .position(|h| h == col)
                    .and_then(|i| row.get(i))
                    .map(str::to_string)
            };

            let Some(id) = get("id").filter(|s| !s.is_empty()) else {
                warn!(row = idx + 1, "registry row without id skipped");
                continue;
            };
            let position = match parse_floats(&get("position").unwrap_or_default()) {
                Some(p) if p.len() == 3 => [p[0], p[1], p[2]],
                _ => {
                    warn!(container = %id, "invalid position format, using origin");
                    DEFAULT_POSITION
                }
            };
            let orientation = match parse_floats(&get("orientation").unwrap_or_default()) {
                Some(o) if !o.is_empty() => o,
                _ => {
                    warn!(container = %id, "invalid orientation format, using identity quaternion");
                    IDENTITY_QUATERNION.to_vec()
                }
            };

            let record = ContainerRecord {
                id: id.clone(),
                aruco_id: get("aruco_id").unwrap_or_else(|| "unknown".to_string()),
                position,
                orientation,
                container_type: get("type").unwrap_or_else(|| "unknown".to_string()),
                size: get("size").unwrap_or_default(),
                content_name: get("content_name").unwrap_or_else(null),
                content_volume: get("content_volume").unwrap_or_else(null),
                content_color: get("content_color").unwrap_or_else(null),
                active_status: get("active_status").unwrap_or_else(null),
                landmark: get("landmark").unwrap_or_else(null),
            };
            if !registry.insert(record) {
                warn!(container = %id, "duplicate container id, keeping first row");
            }
        }
        Ok(registry)
    }

    /// Add a record. Returns false (and keeps the existing one) on a duplicate id.
    pub fn insert(&mut self, record: ContainerRecord) -> bool {
        if self.containers.contains_key(&record.id) {
            return false;
        }
        self.containers.insert(record.id.clone(), record);
        true
    }

    /// Independent copy for one synthesis run.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Records in load order.
    pub fn iter(&self) -> impl Iterator<Item = &ContainerRecord> {
        self.containers.values()
    }

    /// Find a container by id. The reserved active id, unless a record
    /// literally carries it, maps to the first record flagged active.
    pub fn get(&self, id: &str) -> Option<&ContainerRecord> {
        if id == ACTIVE_CONTAINER && !self.containers.contains_key(id) {
            return self.containers.values().find(|c| c.is_active());
        }
        self.containers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut ContainerRecord> {
        if id == ACTIVE_CONTAINER && !self.containers.contains_key(id) {
            return self.containers.values_mut().find(|c| c.is_active());
        }
        self.containers.get_mut(id)
    }
}

fn null() -> String {
    "null".to_string()
}

/// Parse `[a, b, c]` / `(a, b, c)` / `a, b, c` into floats.
pub fn parse_floats(text: &str) -> Option<Vec<f64>> {
    let inner = text
        .trim()
        .trim_start_matches(['[', '('])
        .trim_end_matches([']', ')']);
    if inner.trim().is_empty() {
        return None;
    }
    inner
        .split(',')
        .map(|part| part.trim().parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
id,position,orientation,type,aruco_id,content_name,content_volume,content_color,active_status,landmark
B1,\"[0.5, 0.1, 0.2]\",\"[0, 0, 0, 1]\",beaker,11,copper sulphate solution,50,blue,False,shelf
B2,\"[1, 2, 3]\",\"[0, 0, 0.7071, 0.7071]\",beaker,12,distilled water,100,clear,True,null
F1,\"[bad]\",\"[]\",flask,13,null,null,null,False,null
";

    #[test]
    fn test_tl006_load_from_reader() {
        let reg = Registry::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(reg.len(), 3);
        let b1 = reg.get("B1").unwrap();
        assert_eq!(b1.position, [0.5, 0.1, 0.2]);
        assert_eq!(b1.orientation, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(b1.container_type, "beaker");
        assert_eq!(b1.content_color, "blue");
        assert_eq!(b1.aruco_id, "11");
        assert_eq!(b1.size, "");
    }

    #[test]
    fn test_tl006_malformed_pose_defaults() {
        let reg = Registry::from_reader(CSV.as_bytes()).unwrap();
        let f1 = reg.get("F1").unwrap();
        assert_eq!(f1.position, DEFAULT_POSITION);
        assert_eq!(f1.orientation, IDENTITY_QUATERNION.to_vec());
    }

    #[test]
    fn test_tl006_load_order_preserved() {
        let reg = Registry::from_reader(CSV.as_bytes()).unwrap();
        let ids: Vec<&str> = reg.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B2", "F1"]);
    }

    #[test]
    fn test_tl006_missing_columns_default() {
        let reg = Registry::from_reader("id,position\nX,\"[1,1,1]\"\n".as_bytes()).unwrap();
        let x = reg.get("X").unwrap();
        assert_eq!(x.container_type, "unknown");
        assert_eq!(x.aruco_id, "unknown");
        assert_eq!(x.content_name, "null");
        assert_eq!(x.orientation, IDENTITY_QUATERNION.to_vec());
    }

    #[test]
    fn test_tl006_duplicate_id_keeps_first() {
        let csv = "id,position,type\nA,\"[1,1,1]\",beaker\nA,\"[2,2,2]\",flask\n";
        let reg = Registry::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("A").unwrap().container_type, "beaker");
    }

    #[test]
    fn test_tl006_missing_id_column_is_fatal() {
        let err = Registry::from_reader("name,position\nA,\"[1,1,1]\"\n".as_bytes()).unwrap_err();
        assert!(matches!(err, TaskError::RegistryLoad(ref m) if m.contains("'id'")));
    }

    #[test]
    fn test_tl006_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("containers.csv");
        std::fs::write(&path, CSV).unwrap();
        let reg = Registry::load_csv(&path).unwrap();
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn test_tl006_load_csv_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Registry::load_csv(&dir.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("cannot load container registry"));
    }

    #[test]
    fn test_tl006_active_lookup() {
        let reg = Registry::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(reg.get(ACTIVE_CONTAINER).unwrap().id, "B2");
        let empty = Registry::new();
        assert!(empty.get(ACTIVE_CONTAINER).is_none());
    }

    #[test]
    fn test_tl006_literal_active_id_wins() {
        let csv = "id,position,type,active_status\n\
                   A1,\"[1,1,1]\",beaker,True\n\
                   active_container,\"[2,2,2]\",flask,False\n";
        let mut reg = Registry::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(reg.get(ACTIVE_CONTAINER).unwrap().position, [2.0, 2.0, 2.0]);
        assert_eq!(reg.get_mut(ACTIVE_CONTAINER).unwrap().container_type, "flask");
    }

    #[test]
    fn test_tl006_short_rows_use_defaults() {
        let csv = "id,position,orientation,type,content_color\n\
                   B1,\"[1,2,3]\",\"[0,0,0,1]\",beaker\n\
                   B2,\"[4,5,6]\",\"[0,0,0,1]\",flask,red\n\
                   B3\n";
        let reg = Registry::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(reg.len(), 3);
        let b1 = reg.get("B1").unwrap();
        assert_eq!(b1.position, [1.0, 2.0, 3.0]);
        assert_eq!(b1.container_type, "beaker");
        assert_eq!(b1.content_color, "null");
        assert_eq!(reg.get("B2").unwrap().content_color, "red");
        let b3 = reg.get("B3").unwrap();
        assert_eq!(b3.position, DEFAULT_POSITION);
        assert_eq!(b3.container_type, "unknown");
    }

    #[test]
    fn test_tl006_snapshot_isolated() {
        let reg = Registry::from_reader(CSV.as_bytes()).unwrap();
        let mut snap = reg.snapshot();
        snap.get_mut("B1").unwrap().position = [9.0, 9.0, 9.0];
        assert_eq!(reg.get("B1").unwrap().position, [0.5, 0.1, 0.2]);
        assert_eq!(snap.get("B1").unwrap().position, [9.0, 9.0, 9.0]);
    }

    #[test]
    fn test_tl006_parse_floats() {
        assert_eq!(parse_floats("[1, 2.5, -3]"), Some(vec![1.0, 2.5, -3.0]));
        assert_eq!(parse_floats("(0,0,1)"), Some(vec![0.0, 0.0, 1.0]));
        assert_eq!(parse_floats("[1, x]"), None);
        assert_eq!(parse_floats("[]"), None);
    }
}
