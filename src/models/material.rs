//! Material kinds and the resolver from kind to backing table.
//!
//! Liquids, solids, equipment and lab items live in four tables of the same
//! shape whose quantity column (and unit) differ. Request items and debts
//! reference a material by `(kind, id)`; nothing else in the crate names a
//! material table directly.

use sea_orm::entity::prelude::*;
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const INVALID_MATERIAL_KIND: &str = "Tipo de material inválido";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    #[sea_orm(string_value = "liquid")]
    Liquid,
    #[sea_orm(string_value = "solid")]
    Solid,
    #[sea_orm(string_value = "equipment")]
    Equipment,
    #[sea_orm(string_value = "lab")]
    Lab,
}

/// Where a material kind's stock lives
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StockTarget {
    pub table: &'static str,
    pub quantity_column: &'static str,
    pub unit: &'static str,
    /// Reagent tables carry hazard descriptor columns
    pub has_hazards: bool,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 4] = [
        MaterialKind::Liquid,
        MaterialKind::Solid,
        MaterialKind::Equipment,
        MaterialKind::Lab,
    ];

    /// Parse a type tag; anything unknown is a 400
    pub fn from_tag(tag: &str) -> crate::error::Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "liquid" => Ok(MaterialKind::Liquid),
            "solid" => Ok(MaterialKind::Solid),
            "equipment" => Ok(MaterialKind::Equipment),
            "lab" => Ok(MaterialKind::Lab),
            _ => Err(AppError::BadRequest(INVALID_MATERIAL_KIND.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MaterialKind::Liquid => "liquid",
            MaterialKind::Solid => "solid",
            MaterialKind::Equipment => "equipment",
            MaterialKind::Lab => "lab",
        }
    }

    pub fn resolve(self) -> StockTarget {
        match self {
            MaterialKind::Liquid => StockTarget {
                table: "liquid_materials",
                quantity_column: "quantity_ml",
                unit: "mL",
                has_hazards: true,
            },
            MaterialKind::Solid => StockTarget {
                table: "solid_materials",
                quantity_column: "quantity_g",
                unit: "g",
                has_hazards: true,
            },
            MaterialKind::Equipment => StockTarget {
                table: "equipment_materials",
                quantity_column: "quantity_units",
                unit: "pza",
                has_hazards: false,
            },
            MaterialKind::Lab => StockTarget {
                table: "lab_materials",
                quantity_column: "quantity_units",
                unit: "pza",
                has_hazards: false,
            },
        }
    }
}

impl std::fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw row selected from any material table with the quantity column aliased
#[derive(Debug, Clone, FromQueryResult)]
pub struct MaterialRow {
    pub id: i64,
    pub name: String,
    pub quantity: i32,
    pub physical_hazards: Option<String>,
    pub health_hazards: Option<String>,
    pub environmental_hazards: Option<String>,
}

/// Hazard descriptors, each a semicolon-delimited tag list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hazards {
    pub physical: Vec<String>,
    pub health: Vec<String>,
    pub environmental: Vec<String>,
}

impl Hazards {
    pub fn parse(physical: Option<&str>, health: Option<&str>, environmental: Option<&str>) -> Self {
        Self {
            physical: split_tags(physical),
            health: split_tags(health),
            environmental: split_tags(environmental),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.physical.is_empty() && self.health.is_empty() && self.environmental.is_empty()
    }
}

/// Split a `;` list, dropping blanks
pub fn split_tags(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(';')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

/// Inverse of [`split_tags`]; empty lists are stored as NULL
pub fn join_tags(tags: &[String]) -> Option<String> {
    let joined = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(";");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// A material as exposed by the API
#[derive(Debug, Clone, Serialize)]
pub struct Material {
    pub id: i64,
    pub kind: MaterialKind,
    pub name: String,
    pub quantity: i32,
    pub unit: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazards: Option<Hazards>,
}

impl Material {
    pub fn from_row(kind: MaterialKind, row: MaterialRow) -> Self {
        let target = kind.resolve();
        let hazards = target.has_hazards.then(|| {
            Hazards::parse(
                row.physical_hazards.as_deref(),
                row.health_hazards.as_deref(),
                row.environmental_hazards.as_deref(),
            )
        });
        Self {
            id: row.id,
            kind,
            name: row.name,
            quantity: row.quantity,
            unit: target.unit,
            hazards,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_tag_accepts_all_kinds() {
        for kind in MaterialKind::ALL {
            assert_eq!(MaterialKind::from_tag(kind.as_str()).unwrap(), kind);
        }
        assert_eq!(MaterialKind::from_tag("SOLID").unwrap(), MaterialKind::Solid);
    }

    #[test]
    fn test_from_tag_rejects_unknown() {
        let err = MaterialKind::from_tag("gas").unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert_eq!(msg, INVALID_MATERIAL_KIND),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_resolver_targets() {
        assert_eq!(MaterialKind::Liquid.resolve().quantity_column, "quantity_ml");
        assert_eq!(MaterialKind::Solid.resolve().unit, "g");
        assert!(MaterialKind::Solid.resolve().has_hazards);
        assert!(!MaterialKind::Equipment.resolve().has_hazards);

        let tables: std::collections::HashSet<_> =
            MaterialKind::ALL.iter().map(|k| k.resolve().table).collect();
        assert_eq!(tables.len(), 4);
    }

    #[test]
    fn test_tag_lists() {
        let tags = split_tags(Some("flammable; corrosive;;"));
        assert_eq!(tags, vec!["flammable", "corrosive"]);
        assert_eq!(join_tags(&tags).as_deref(), Some("flammable;corrosive"));
        assert_eq!(join_tags(&[]), None);
        assert!(split_tags(None).is_empty());
    }

    #[test]
    fn test_material_from_row_hides_hazards_for_equipment() {
        let row = MaterialRow {
            id: 1,
            name: "Microscopio".to_string(),
            quantity: 5,
            physical_hazards: None,
            health_hazards: None,
            environmental_hazards: None,
        };
        let material = Material::from_row(MaterialKind::Equipment, row.clone());
        assert!(material.hazards.is_none());
        assert_eq!(material.unit, "pza");

        let reagent = Material::from_row(MaterialKind::Liquid, row);
        assert!(reagent.hazards.unwrap().is_empty());
    }
}
