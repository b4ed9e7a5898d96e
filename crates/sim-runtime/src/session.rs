//! The backtest session: single owner of parameters, history, KPIs, playback
//! cursor and the local preset list.

use crate::horizon::{build_annual, build_history, rng_for};
use crate::playback::PlaybackController;
use crate::BacktestConfig;
use persistence::PresetStore;
use sim_core::{
    find_scenario, AnnualPoint, Granularity, KpiSummary, ParameterSet, Preset, PresetId,
    ProjectionPoint, MAX_MONTHS,
};
use std::fmt;
use tracing::{debug, info, warn};

/// User-facing outcome of an action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Success(m) | Notice::Error(m) => m,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What the current view shows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Visible<'a> {
    /// Months up to and including the cursor.
    Monthly(&'a [ProjectionPoint]),
    /// The complete annual roll-up.
    Annual(&'a [AnnualPoint]),
}

impl Visible<'_> {
    pub fn len(&self) -> usize {
        match self {
            Visible::Monthly(points) => points.len(),
            Visible::Annual(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Interactive backtest state.
///
/// Every parameter change regenerates the whole history and the KPIs. The
/// playback cursor is independent of the parameters and is never moved by a
/// regeneration.
#[derive(Debug)]
pub struct BacktestSession {
    config: BacktestConfig,
    params: ParameterSet,
    history: Vec<ProjectionPoint>,
    annual: Vec<AnnualPoint>,
    kpis: KpiSummary,
    playback: PlaybackController,
    presets: Vec<Preset>,
}

impl BacktestSession {
    pub fn new(config: BacktestConfig, params: ParameterSet) -> Self {
        let playback = PlaybackController::new(MAX_MONTHS).with_speed(config.speed_ms);
        let history = build_history(&params, &mut rng_for(config.rng_seed));
        let annual = build_annual(&history);
        let kpis = sim_econ::analyze(&params, &history);
        Self {
            config,
            params,
            history,
            annual,
            kpis,
            playback,
            presets: Vec::new(),
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    /// Replace the parameter set and regenerate everything derived from it.
    pub fn set_parameters(&mut self, params: ParameterSet) {
        self.params = params;
        self.regenerate();
    }

    /// Edit the current parameters in place, then regenerate.
    pub fn update_parameters(&mut self, edit: impl FnOnce(&mut ParameterSet)) {
        edit(&mut self.params);
        self.regenerate();
    }

    fn regenerate(&mut self) {
        self.history = build_history(&self.params, &mut rng_for(self.config.rng_seed));
        self.annual = build_annual(&self.history);
        self.kpis = sim_econ::analyze(&self.params, &self.history);
        debug!(
            name = %self.params.name,
            break_even = self.kpis.break_even_sentinel(),
            "history regenerated"
        );
    }

    /// Load one of the built-in scenarios by name.
    pub fn load_scenario(&mut self, name: &str) -> Notice {
        match find_scenario(name) {
            Some(params) => {
                let label = params.name.clone();
                self.set_parameters(params);
                Notice::Success(format!("Loaded scenario \"{label}\""))
            }
            None => Notice::Error(format!("Unknown scenario \"{}\"", name.trim())),
        }
    }

    /// Load a preset from the locally cached list.
    pub fn load_preset(&mut self, id: PresetId) -> Notice {
        match self.presets.iter().find(|p| p.id == id) {
            Some(preset) => {
                let name = preset.name.clone();
                self.set_parameters(preset.parameters.clone());
                Notice::Success(format!("Loaded preset \"{name}\""))
            }
            None => Notice::Error(format!("Preset {id} is not in the loaded list")),
        }
    }

    pub fn history(&self) -> &[ProjectionPoint] {
        &self.history
    }

    pub fn annual(&self) -> &[AnnualPoint] {
        &self.annual
    }

    pub fn kpis(&self) -> &KpiSummary {
        &self.kpis
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackController {
        &mut self.playback
    }

    pub fn set_granularity(&mut self, granularity: Granularity) {
        self.playback.set_granularity(granularity);
    }

    /// Points revealed by the current view and cursor.
    pub fn visible(&self) -> Visible<'_> {
        match self.playback.granularity() {
            Granularity::Monthly => {
                let end = (self.playback.current_month() + 1).min(self.history.len());
                Visible::Monthly(&self.history[..end])
            }
            Granularity::Annual => Visible::Annual(&self.annual),
        }
    }

    /// Point under the cursor.
    pub fn current_point(&self) -> Option<&ProjectionPoint> {
        self.history.get(self.playback.current_month())
    }

    /// Profit summed from month 1 through the cursor.
    pub fn cumulative_profit_at_cursor(&self) -> f64 {
        let end = (self.playback.current_month() + 1).min(self.history.len());
        self.history[..end].iter().map(|p| p.profit).sum()
    }

    /// JSON document of the full monthly history.
    pub fn export_json(&self) -> anyhow::Result<String> {
        data_pipeline::export_history_json(&self.history)
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    /// Replace the local preset list with the store's. A failure empties it.
    pub async fn refresh_presets<S: PresetStore>(&mut self, store: &S) -> Notice {
        match store.list().await {
            Ok(presets) => {
                self.presets = presets;
                Notice::Success(format!("Loaded {} presets", self.presets.len()))
            }
            Err(e) => {
                warn!(error = %e, "failed to list presets");
                self.presets.clear();
                Notice::Error(format!("Failed to load presets: {e:#}"))
            }
        }
    }

    /// Save the current parameters under `name`, then refresh the list.
    pub async fn save_preset<S: PresetStore>(&mut self, store: &S, name: &str) -> Notice {
        let name = name.trim();
        if name.is_empty() {
            return Notice::Error("Enter a name for the preset".to_string());
        }
        match store.create(name, &self.params).await {
            Ok(preset) => {
                info!(id = %preset.id, name, "preset saved");
                self.refresh_presets(store).await;
                Notice::Success(format!("Saved preset \"{name}\""))
            }
            Err(e) => {
                warn!(error = %e, name, "failed to save preset");
                Notice::Error(format!("Failed to save preset: {e:#}"))
            }
        }
    }

    /// Delete a preset, then refresh the list.
    pub async fn delete_preset<S: PresetStore>(&mut self, store: &S, id: PresetId) -> Notice {
        match store.delete(id).await {
            Ok(()) => {
                info!(%id, "preset deleted");
                self.refresh_presets(store).await;
                Notice::Success(format!("Deleted preset {id}"))
            }
            Err(e) => {
                warn!(error = %e, %id, "failed to delete preset");
                Notice::Error(format!("Failed to delete preset: {e:#}"))
            }
        }
    }
}

impl Default for BacktestSession {
    fn default() -> Self {
        Self::new(BacktestConfig::default(), ParameterSet::default())
    }
}
