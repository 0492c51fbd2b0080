//! Reference-point configuration. An explicit structure selected by
//! an explicit mode flag; which distance columns a run gets is fully
//! determined by (config, mode) and nothing else.

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use kstring::KString;
use serde::Deserialize;

use crate::config_file::LoadConfigFile;
use crate::distance::ReferencePoint;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeshReferences {
    pub center: ReferencePoint,
    /// Access points by name; names are conventionally upper case
    /// and become part of the column title.
    pub access_points: BTreeMap<KString, ReferencePoint>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationConfig {
    /// The single reference point used outside mesh mode.
    pub ref_point: Option<ReferencePoint>,
    /// Center and access points for mesh mode.
    pub mesh: Option<MeshReferences>,
}

impl LoadConfigFile for EvaluationConfig {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMode {
    /// One `DISTANCE` column against `ref_point`.
    Single,
    /// `DISTANCE_CENTER` plus one `DISTANCE_AP_<NAME>` column per
    /// configured access point.
    Mesh,
}

impl EvaluationConfig {
    /// The named distance columns the chosen mode asks for. Fails if
    /// the config file lacks the section the mode needs.
    pub fn distance_columns(&self, mode: DistanceMode) -> Result<Vec<(KString, ReferencePoint)>> {
        match mode {
            DistanceMode::Single => {
                let Some(point) = self.ref_point else {
                    bail!("config has no `ref_point` section, required outside mesh mode")
                };
                Ok(vec![(KString::from_static("DISTANCE"), point)])
            }
            DistanceMode::Mesh => {
                let Some(mesh) = &self.mesh else {
                    bail!("config has no `mesh` section, required in mesh mode")
                };
                let mut columns = vec![(KString::from_static("DISTANCE_CENTER"), mesh.center)];
                for (name, point) in &mesh.access_points {
                    columns.push((KString::from(format!("DISTANCE_AP_{name}")), *point));
                }
                Ok(columns)
            }
        }
    }
}
