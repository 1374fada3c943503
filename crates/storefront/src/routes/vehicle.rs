//! Vehicle selector handlers.
//!
//! The selection narrows the catalog to compatible parts. Saved vehicles are
//! kept for one-click switching.

use askama::Template;
use askama_web::WebTemplate;
use autoparts_core::{MakeId, ModelId};
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Datelike;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::SelectOption;
use crate::api::VehicleModel;
use crate::catalog::ProductFilters;
use crate::error::{AppError, Result};
use crate::flash;
use crate::state::AppState;
use crate::stores::{self, SelectedVehicle, VehicleStore};

/// Oldest model year offered when no model is chosen.
const EARLIEST_YEAR: i32 = 1980;

// =============================================================================
// Selector view
// =============================================================================

#[derive(Debug, Clone)]
pub struct SavedVehicleView {
    pub index: usize,
    pub label: String,
}

/// Make/model/year dropdowns with the current selection preselected.
#[derive(Debug, Clone, Default)]
pub struct VehicleSelector {
    pub makes: Vec<SelectOption>,
    pub models: Vec<SelectOption>,
    pub years: Vec<SelectOption>,
    pub label: Option<String>,
    pub is_complete: bool,
    pub saved: Vec<SavedVehicleView>,
}

impl VehicleSelector {
    /// Fetch makes (and models for the selected make) and mark the selection.
    ///
    /// API failures leave the lists empty.
    pub async fn load(state: &AppState, selected: Option<&SelectedVehicle>) -> Self {
        let selected = selected.cloned().unwrap_or_default();

        let makes = state.api().vehicle_makes().await.unwrap_or_else(|e| {
            tracing::error!("Failed to fetch vehicle makes: {e}");
            Vec::new()
        });
        let models = match selected.make_id {
            Some(make) => state.api().vehicle_models(make).await.unwrap_or_else(|e| {
                tracing::error!("Failed to fetch vehicle models: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let chosen_model = selected
            .model_id
            .and_then(|id| models.iter().find(|m| m.id == id));

        let label = selected.label();
        Self {
            makes: makes
                .iter()
                .map(|m| SelectOption::new(m.id, m.name.clone(), Some(m.id) == selected.make_id))
                .collect(),
            models: model_options(&models, selected.model_id),
            years: year_options(chosen_model, selected.year),
            label: (!label.is_empty()).then_some(label),
            is_complete: selected.is_complete(),
            saved: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_saved(mut self, store: &VehicleStore) -> Self {
        self.saved = store
            .saved()
            .iter()
            .enumerate()
            .map(|(index, vehicle)| SavedVehicleView {
                index,
                label: vehicle.label(),
            })
            .collect();
        self
    }
}

fn model_options(models: &[VehicleModel], selected: Option<ModelId>) -> Vec<SelectOption> {
    models
        .iter()
        .map(|m| {
            SelectOption::new(
                m.id,
                format!("{} ({})", m.name, m.year_range()),
                Some(m.id) == selected,
            )
        })
        .collect()
}

/// Production years of the chosen model, or every year back to 1980.
fn year_options(model: Option<&VehicleModel>, selected: Option<i32>) -> Vec<SelectOption> {
    let years: Vec<i32> = model.map_or_else(
        || (EARLIEST_YEAR..=chrono::Utc::now().year()).rev().collect(),
        |m| m.years().collect(),
    );
    years
        .into_iter()
        .map(|year| SelectOption::new(year, year.to_string(), Some(year) == selected))
        .collect()
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ModelsQuery {
    pub make: Option<MakeId>,
}

#[derive(Template, WebTemplate)]
#[template(path = "partials/vehicle_models.html")]
pub struct VehicleModelsTemplate {
    pub models: Vec<SelectOption>,
}

/// Model options for the chosen make.
#[instrument(skip(state))]
pub async fn models(
    State(state): State<AppState>,
    Query(query): Query<ModelsQuery>,
) -> Result<impl IntoResponse> {
    let models = match query.make {
        Some(make) => state.api().vehicle_models(make).await?,
        None => Vec::new(),
    };
    Ok(VehicleModelsTemplate {
        models: model_options(&models, None),
    })
}

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub make: MakeId,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub model: Option<ModelId>,
    #[serde(default, deserialize_with = "crate::catalog::empty_as_none")]
    pub year: Option<i32>,
}

/// Select a vehicle and show compatible parts.
#[instrument(skip(state, session))]
pub async fn select(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SelectForm>,
) -> Result<Response> {
    let makes = state.api().vehicle_makes().await?;
    let Some(make) = makes.into_iter().find(|m| m.id == form.make) else {
        return Err(AppError::BadRequest("Unknown vehicle make".to_string()));
    };

    let model = match form.model {
        Some(model_id) => state
            .api()
            .vehicle_models(make.id)
            .await?
            .into_iter()
            .find(|m| m.id == model_id),
        None => None,
    };

    let vehicle = SelectedVehicle {
        make_id: Some(make.id),
        make_name: Some(make.name),
        model_id: model.as_ref().map(|m| m.id),
        model_name: model.map(|m| m.name),
        year: form.year,
    };

    let mut store = stores::load::<VehicleStore>(&session).await;
    let filters = ProductFilters::from_vehicle(&vehicle);
    store.set_vehicle(Some(vehicle));
    stores::save(&session, &store).await?;

    Ok(Redirect::to(&format!("/search?{}", filters.query_string())).into_response())
}

#[instrument(skip(session))]
pub async fn clear(session: Session) -> Result<Redirect> {
    let mut store = stores::load::<VehicleStore>(&session).await;
    store.clear_vehicle();
    stores::save(&session, &store).await?;
    Ok(Redirect::to("/search"))
}

/// Keep the current selection in the saved list.
#[instrument(skip(session))]
pub async fn save(session: Session) -> Result<Redirect> {
    let mut store = stores::load::<VehicleStore>(&session).await;
    let Some(selected) = store.selected().cloned() else {
        flash::error(&session, "Choose a vehicle first").await?;
        return Ok(Redirect::to("/"));
    };

    let label = selected.label();
    if store.add_saved(selected) {
        stores::save(&session, &store).await?;
        flash::success(&session, format!("Saved {label}")).await?;
    } else {
        flash::push(&session, flash::FlashLevel::Info, format!("{label} is already saved")).await?;
    }
    Ok(Redirect::to("/"))
}

#[instrument(skip(session))]
pub async fn select_saved(session: Session, Path(index): Path<usize>) -> Result<Redirect> {
    let mut store = stores::load::<VehicleStore>(&session).await;
    let Some(vehicle) = store.saved().get(index).cloned() else {
        return Err(AppError::NotFound(format!("saved vehicle {index}")));
    };

    let filters = ProductFilters::from_vehicle(&vehicle);
    store.set_vehicle(Some(vehicle));
    stores::save(&session, &store).await?;
    Ok(Redirect::to(&format!("/search?{}", filters.query_string())))
}

#[instrument(skip(session))]
pub async fn remove_saved(session: Session, Path(index): Path<usize>) -> Result<Redirect> {
    let mut store = stores::load::<VehicleStore>(&session).await;
    store.remove_saved(index);
    stores::save(&session, &store).await?;
    Ok(Redirect::to("/"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn corolla() -> VehicleModel {
        serde_json::from_value(serde_json::json!({
            "id": 4, "name": "Corolla", "year_from": 2014, "year_to": 2016
        }))
        .unwrap()
    }

    #[test]
    fn test_year_options_follow_model() {
        let years = year_options(Some(&corolla()), Some(2015));
        let values: Vec<&str> = years.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["2016", "2015", "2014"]);
        assert!(years[1].selected);
    }

    #[test]
    fn test_year_options_without_model() {
        let years = year_options(None, None);
        assert_eq!(years.last().unwrap().value, EARLIEST_YEAR.to_string());
        assert!(years.iter().all(|o| !o.selected));
    }

    #[test]
    fn test_model_options_label_years() {
        let options = model_options(&[corolla()], Some(ModelId::new(4)));
        assert_eq!(options[0].label, "Corolla (2014-2016)");
        assert!(options[0].selected);
    }
}
