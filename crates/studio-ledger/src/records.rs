//! Owner aggregates and the records nested inside them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Number of material entries a wand consumes.
///
/// Crafting takes the first entries of the owner's material list in list
/// order, whatever their descriptions. There is no recipe concept.
pub const WAND_MATERIAL_COUNT: usize = 2;

/// Quantity of every freshly crafted wand.
pub const WAND_QUANTITY: u64 = 1;

/// A quantity of a named raw resource held by one owner.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Material {
    pub description: String,
    pub quantity: u64,
    /// Id of the owner whose aggregate contains this entry.
    pub owner: String,
}

impl Material {
    pub fn new(description: impl Into<String>, quantity: u64, owner: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            quantity,
            owner: owner.into(),
        }
    }
}

/// A crafted good: a frozen copy of the materials consumed to make it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Wand {
    pub materials: Vec<Material>,
    pub quantity: u64,
    pub owner: String,
}

/// Aggregate root: everything one owner holds, stored under its id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub materials: Vec<Material>,
    pub wands: Vec<Wand>,
}

/// Why a withdrawal could not be served.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shortfall {
    /// No entry carries the description.
    Missing,
    /// The first entry for the description holds only `available`.
    Insufficient { available: u64 },
}

impl Owner {
    /// A freshly registered owner with empty collections.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            materials: Vec::new(),
            wands: Vec::new(),
        }
    }

    /// Total quantity held per description, across duplicate entries.
    pub fn inventory(&self) -> BTreeMap<String, u64> {
        let mut totals = BTreeMap::new();
        for material in &self.materials {
            let total: &mut u64 = totals.entry(material.description.clone()).or_default();
            *total = total.saturating_add(material.quantity);
        }
        totals
    }

    /// Total quantity held for one description.
    pub fn total_quantity(&self, description: &str) -> u64 {
        self.materials
            .iter()
            .filter(|m| m.description == description)
            .fold(0u64, |acc, m| acc.saturating_add(m.quantity))
    }

    /// Verify the structural rules every persisted owner satisfies.
    ///
    /// - the id is non-empty
    /// - every material and wand names this owner in its `owner` field
    /// - every description is non-empty
    /// - every wand has a positive quantity
    pub fn check_consistency(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("owner id is empty".into());
        }

        for (index, material) in self.materials.iter().enumerate() {
            check_material(&self.id, material).map_err(|e| format!("material #{index}: {e}"))?;
        }

        for (index, wand) in self.wands.iter().enumerate() {
            if wand.owner != self.id {
                return Err(format!(
                    "wand #{index}: owner {:?} does not match {:?}",
                    wand.owner, self.id
                ));
            }
            if wand.quantity == 0 {
                return Err(format!("wand #{index}: quantity is zero"));
            }
            for material in &wand.materials {
                check_material(&self.id, material).map_err(|e| format!("wand #{index}: {e}"))?;
            }
        }

        Ok(())
    }

    /// Take `quantity` out of the first entry for `description`. Later
    /// entries with the same description are never consulted. The entry stays
    /// in the list even when it drops to zero.
    pub(crate) fn withdraw(&mut self, description: &str, quantity: u64) -> Result<(), Shortfall> {
        let entry = self
            .materials
            .iter_mut()
            .find(|m| m.description == description)
            .ok_or(Shortfall::Missing)?;
        if entry.quantity < quantity {
            return Err(Shortfall::Insufficient {
                available: entry.quantity,
            });
        }
        entry.quantity -= quantity;
        Ok(())
    }

    /// Add `quantity` to the first entry for `description`, or append a new
    /// entry owned by this owner. Returns `None` on overflow, leaving the
    /// owner untouched.
    pub(crate) fn deposit(&mut self, description: &str, quantity: u64) -> Option<()> {
        if let Some(existing) = self
            .materials
            .iter_mut()
            .find(|m| m.description == description)
        {
            existing.quantity = existing.quantity.checked_add(quantity)?;
            return Some(());
        }
        self.materials
            .push(Material::new(description, quantity, self.id.clone()));
        Some(())
    }

    /// Consume the first [`WAND_MATERIAL_COUNT`] material entries into a new
    /// wand appended to this owner. On failure returns the number of entries
    /// available and leaves the owner untouched.
    pub(crate) fn craft_wand(&mut self) -> Result<&Wand, usize> {
        if self.materials.len() < WAND_MATERIAL_COUNT {
            return Err(self.materials.len());
        }

        let consumed: Vec<Material> = self.materials.drain(..WAND_MATERIAL_COUNT).collect();
        self.wands.push(Wand {
            materials: consumed,
            quantity: WAND_QUANTITY,
            owner: self.id.clone(),
        });
        Ok(&self.wands[self.wands.len() - 1])
    }
}

fn check_material(owner: &str, material: &Material) -> Result<(), String> {
    if material.owner != owner {
        return Err(format!(
            "material {:?} names owner {:?}, expected {:?}",
            material.description, material.owner, owner
        ));
    }
    if material.description.is_empty() {
        return Err("material description is empty".into());
    }
    Ok(())
}
