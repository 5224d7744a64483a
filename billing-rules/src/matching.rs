use shared_types::{Facility, Insurer};
use std::collections::HashMap;

use crate::normalize::{facility_key, insurer_key};

/// Resolves Pergamo `Sede` strings to facility ids.
#[derive(Debug, Default)]
pub struct FacilityDirectory {
    by_name: HashMap<String, i64>,
}

impl FacilityDirectory {
    pub fn from_facilities(facilities: &[Facility]) -> Self {
        let by_name = facilities
            .iter()
            .map(|f| (facility_key(&f.nombre), f.id))
            .collect();
        Self { by_name }
    }

    pub fn resolve(&self, sede: Option<&str>) -> Option<i64> {
        let key = facility_key(sede?);
        if key.is_empty() {
            return None;
        }
        self.by_name.get(&key).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsurerEntry {
    pub nombre: String,
    pub codigo: String,
}

/// Resolves free-text insurer names to the internal display name and code.
#[derive(Debug, Default)]
pub struct InsurerDirectory {
    by_name: HashMap<String, InsurerEntry>,
}

impl InsurerDirectory {
    pub fn from_insurers(insurers: &[Insurer]) -> Self {
        let by_name = insurers
            .iter()
            .map(|i| {
                (
                    insurer_key(&i.nombre_pergamo),
                    InsurerEntry {
                        nombre: i.nombre.clone(),
                        codigo: i.codigo.clone(),
                    },
                )
            })
            .collect();
        Self { by_name }
    }

    pub fn resolve(&self, raw: &str) -> Option<&InsurerEntry> {
        self.by_name.get(&insurer_key(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility(id: i64, nombre: &str) -> Facility {
        Facility {
            id,
            nombre: nombre.to_string(),
            ciudad: None,
            activo: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_facility_match_is_uppercase_trimmed_exact() {
        let directory =
            FacilityDirectory::from_facilities(&[facility(1, "Sede Norte"), facility(2, "CENTRO")]);

        assert_eq!(directory.resolve(Some(" sede norte ")), Some(1));
        assert_eq!(directory.resolve(Some("Centro")), Some(2));
        assert_eq!(directory.resolve(Some("Sede  Norte")), None);
        assert_eq!(directory.resolve(Some("Norte")), None);
        assert_eq!(directory.resolve(Some("  ")), None);
        assert_eq!(directory.resolve(None), None);
    }

    #[test]
    fn test_insurer_match_is_loose() {
        let directory = InsurerDirectory::from_insurers(&[Insurer {
            id: 1,
            nombre_pergamo: "NUEVA EPS S.A.".to_string(),
            nombre: "Nueva EPS".to_string(),
            codigo: "NEP".to_string(),
            created_at: 0,
            updated_at: 0,
        }]);

        let entry = directory.resolve("  nueva  eps s.a.").unwrap();
        assert_eq!(entry.codigo, "NEP");
        assert!(directory.resolve("SANITAS").is_none());
    }
}
