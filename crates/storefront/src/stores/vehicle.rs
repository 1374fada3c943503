//! The visitor's vehicle, used to filter the catalog by compatibility.

use autoparts_core::{MakeId, ModelId};
use serde::{Deserialize, Serialize};

use super::PersistedStore;

/// A (possibly partial) vehicle selection: make, then model, then year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedVehicle {
    #[serde(default)]
    pub make_id: Option<MakeId>,
    #[serde(default)]
    pub make_name: Option<String>,
    #[serde(default)]
    pub model_id: Option<ModelId>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
}

impl SelectedVehicle {
    /// `Toyota Corolla 2015`, skipping missing parts.
    #[must_use]
    pub fn label(&self) -> String {
        let year = self.year.map(|y| y.to_string());
        [
            self.make_name.as_deref(),
            self.model_name.as_deref(),
            year.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Whether make, model and year are all chosen.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.make_id.is_some() && self.model_id.is_some() && self.year.is_some()
    }

    fn same_vehicle(&self, other: &Self) -> bool {
        self.make_id == other.make_id && self.model_id == other.model_id && self.year == other.year
    }
}

/// Vehicle state persisted under `autoparts-vehicle`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleStore {
    #[serde(default)]
    selected: Option<SelectedVehicle>,
    #[serde(default)]
    saved: Vec<SelectedVehicle>,
}

impl PersistedStore for VehicleStore {
    const KEY: &'static str = "autoparts-vehicle";
    const VERSION: u32 = 1;
}

impl VehicleStore {
    #[must_use]
    pub const fn selected(&self) -> Option<&SelectedVehicle> {
        self.selected.as_ref()
    }

    #[must_use]
    pub fn saved(&self) -> &[SelectedVehicle] {
        &self.saved
    }

    /// Replace the selection.
    pub fn set_vehicle(&mut self, vehicle: Option<SelectedVehicle>) {
        self.selected = vehicle;
    }

    pub fn clear_vehicle(&mut self) {
        self.selected = None;
    }

    /// Save a vehicle unless one with the same make, model and year exists.
    ///
    /// Returns whether it was added.
    pub fn add_saved(&mut self, vehicle: SelectedVehicle) -> bool {
        if self.saved.iter().any(|v| v.same_vehicle(&vehicle)) {
            return false;
        }
        self.saved.push(vehicle);
        true
    }

    /// Remove a saved vehicle by position. Out-of-range indexes are ignored.
    pub fn remove_saved(&mut self, index: usize) {
        if index < self.saved.len() {
            self.saved.remove(index);
        }
    }

    /// Label of the selection, or empty when nothing is selected.
    #[must_use]
    pub fn selected_label(&self) -> String {
        self.selected
            .as_ref()
            .map(SelectedVehicle::label)
            .unwrap_or_default()
    }
}
