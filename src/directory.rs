// src/directory.rs
//! Business units and their divisions.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{io_context, ResolutionError, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: String,
    pub name: String,
    pub divisions: Vec<Division>,
}

impl BusinessUnit {
    fn division(&self, name_or_id: &str) -> Option<&Division> {
        let wanted = name_or_id.trim();
        self.divisions
            .iter()
            .find(|d| d.id == wanted || d.name.eq_ignore_ascii_case(wanted))
    }
}

/// A (business unit, division) pair with canonical names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUnit {
    pub business_unit: String,
    pub division: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrgDirectory {
    units: Vec<BusinessUnit>,
}

impl Default for OrgDirectory {
    fn default() -> Self {
        let catalogue: [(&str, &[&str]); 6] = [
            (
                "Next Generation Infrastructure",
                &["Cloud & Digital Services", "Data Driven Infrastructure", "Defense Solutions"],
            ),
            ("IP's", &["AMAN", "Image Links", "AccuLab"]),
            ("ERP", &["Oracle Fusion", "Oracle Technologies & DB"]),
            ("Enterprise Solutions", &["Data & AI"]),
            (
                "Back Office & Support",
                &["Human Resources", "Supply Chain", "PMO", "R&D", "Finance"],
            ),
            ("Sales", &["Jordan Sales", "Saudi Sales"]),
        ];

        let mut division_id = 0;
        let units = catalogue
            .iter()
            .enumerate()
            .map(|(index, (name, divisions))| BusinessUnit {
                id: (index + 1).to_string(),
                name: name.to_string(),
                divisions: divisions
                    .iter()
                    .map(|division| {
                        division_id += 1;
                        Division {
                            id: division_id.to_string(),
                            name: division.to_string(),
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { units }
    }
}

impl OrgDirectory {
    pub fn new(units: Vec<BusinessUnit>) -> Self {
        Self { units }
    }

    /// Loads a catalogue from a JSON array of business units.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let json_string = fs::read_to_string(path)
            .map_err(|e| io_context(e, format!("reading directory {}", path.display())))?;
        let directory: OrgDirectory = serde_json::from_str(&json_string)?;
        info!(
            "Loaded {} business unit(s) from {}",
            directory.units.len(),
            path.display()
        );
        Ok(directory)
    }

    pub fn units(&self) -> &[BusinessUnit] {
        &self.units
    }

    /// Finds a business unit by id or case-insensitive name.
    pub fn business_unit(&self, name_or_id: &str) -> Result<&BusinessUnit, ResolutionError> {
        let wanted = name_or_id.trim();
        self.units
            .iter()
            .find(|u| u.id == wanted || u.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ResolutionError::UnknownBusinessUnit {
                name: name_or_id.to_string(),
            })
    }

    /// Resolves a pair to canonical names. The division must belong to the unit.
    pub fn resolve(
        &self,
        business_unit: &str,
        division: &str,
    ) -> Result<ResolvedUnit, ResolutionError> {
        let unit = self.business_unit(business_unit)?;
        let found = unit
            .division(division)
            .ok_or_else(|| ResolutionError::UnknownDivision {
                business_unit: unit.name.clone(),
                division: division.to_string(),
            })?;
        Ok(ResolvedUnit {
            business_unit: unit.name.clone(),
            division: found.name.clone(),
        })
    }
}
