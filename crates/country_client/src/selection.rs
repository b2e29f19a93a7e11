//! Cascading region → country → border selection.
//!
//! Every field change applies its clears synchronously and hands back a
//! future for the fetch that repopulates the downstream list. Each cascading
//! field carries a generation counter; a fetch chain captures it on start and
//! its result (or error) is applied only if no newer change happened since.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use shared::{
    domain::{CountryCode, Region, SelectionState, SmallCountry},
    error::{ErrorCode, StepError},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::gateway::{CountryGateway, GatewayError};

/// Derived list a fetch chain repopulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    Countries,
    Borders,
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStep::Countries => f.write_str("countries"),
            CascadeStep::Borders => f.write_str("borders"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeOutcome {
    Applied,
    /// A newer change on the same field won; the result was dropped.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("country {0} is not in the current region's list")]
    CountryNotAvailable(CountryCode),
    #[error("country {0} is not a border of the selected country")]
    BorderNotAvailable(CountryCode),
}

impl SelectionError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::NotAvailable
    }
}

#[derive(Debug, Error)]
pub enum CascadeError {
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("{step} lookup failed: {source}")]
    Gateway {
        step: CascadeStep,
        #[source]
        source: GatewayError,
    },
}

#[derive(Debug, Clone)]
pub enum SelectionEvent {
    StateChanged(SelectionState),
    CountriesUpdated(Vec<SmallCountry>),
    BordersUpdated(Vec<SmallCountry>),
    StepFailed { step: CascadeStep, error: StepError },
    Superseded { step: CascadeStep },
}

/// What the presentation layer renders.
#[derive(Debug, Clone, Default)]
pub struct SelectionSnapshot {
    pub state: SelectionState,
    pub countries: Vec<SmallCountry>,
    pub borders: Vec<SmallCountry>,
    pub countries_error: Option<StepError>,
    pub borders_error: Option<StepError>,
}

#[derive(Default)]
struct SelectionInner {
    state: SelectionState,
    countries: Vec<SmallCountry>,
    borders: Vec<SmallCountry>,
    countries_error: Option<StepError>,
    borders_error: Option<StepError>,
    region_generation: u64,
    country_generation: u64,
    /// Generations the current lists were fetched for.
    countries_loaded_for: u64,
    borders_loaded_for: u64,
}

impl SelectionInner {
    fn generation(&self, step: CascadeStep) -> u64 {
        match step {
            CascadeStep::Countries => self.region_generation,
            CascadeStep::Borders => self.country_generation,
        }
    }

    fn slots(
        &mut self,
        step: CascadeStep,
    ) -> (&mut Vec<SmallCountry>, &mut Option<StepError>, &mut u64) {
        match step {
            CascadeStep::Countries => (
                &mut self.countries,
                &mut self.countries_error,
                &mut self.countries_loaded_for,
            ),
            CascadeStep::Borders => (
                &mut self.borders,
                &mut self.borders_error,
                &mut self.borders_loaded_for,
            ),
        }
    }

    /// The countries list only counts once it was fetched for the current region.
    fn country_available(&self, code: &CountryCode) -> bool {
        self.countries_loaded_for == self.region_generation
            && self.countries.iter().any(|c| &c.cca3 == code)
    }

    fn border_available(&self, code: &CountryCode) -> bool {
        self.borders_loaded_for == self.country_generation
            && self.borders.iter().any(|c| &c.cca3 == code)
    }

    /// Starts a new country generation; the borders list keeps its prior
    /// value until the next fetch chain settles.
    fn begin_country(&mut self, country: Option<CountryCode>) {
        self.state.country = country;
        self.state.border = None;
        self.borders_error = None;
        self.country_generation += 1;
    }

    /// Forgets the selected country together with everything derived from it.
    fn reset_country(&mut self) {
        self.begin_country(None);
        self.borders.clear();
        self.borders_loaded_for = self.country_generation;
    }
}

enum CountryPlan {
    Rejected(SelectionError),
    Cleared,
    Fetch { token: u64, code: CountryCode },
}

pub struct SelectionController {
    gateway: Arc<dyn CountryGateway>,
    inner: Mutex<SelectionInner>,
    events: broadcast::Sender<SelectionEvent>,
}

impl SelectionController {
    pub fn new(gateway: Arc<dyn CountryGateway>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            gateway,
            inner: Mutex::new(SelectionInner::default()),
            events,
        })
    }

    pub fn regions(&self) -> Vec<Region> {
        Region::ALL.to_vec()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SelectionEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        let inner = self.lock();
        SelectionSnapshot {
            state: inner.state.clone(),
            countries: inner.countries.clone(),
            borders: inner.borders.clone(),
            countries_error: inner.countries_error.clone(),
            borders_error: inner.borders_error.clone(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.lock().state.is_complete()
    }

    /// Selects `region` and clears every field below it before returning.
    /// The returned future fetches the region's countries.
    pub fn on_region_changed(
        self: &Arc<Self>,
        region: Option<Region>,
    ) -> impl Future<Output = Result<CascadeOutcome, CascadeError>> + Send + 'static {
        let (token, state) = {
            let mut inner = self.lock();
            inner.state.region = region;
            inner.reset_country();
            inner.countries_error = None;
            inner.region_generation += 1;
            if region.is_none() {
                inner.countries.clear();
                inner.countries_loaded_for = inner.region_generation;
            }
            (inner.region_generation, inner.state.clone())
        };
        debug!(region = ?region, token, "region changed");
        self.emit(SelectionEvent::StateChanged(state));
        self.emit(SelectionEvent::BordersUpdated(Vec::new()));
        if region.is_none() {
            self.emit(SelectionEvent::CountriesUpdated(Vec::new()));
        }

        let controller = Arc::clone(self);
        async move {
            let Some(region) = region else {
                return Ok(CascadeOutcome::Applied);
            };
            let result = controller.gateway.countries_by_region(Some(region)).await;
            controller.settle(CascadeStep::Countries, token, result)
        }
    }

    /// Selects `country` and clears the border before returning. The returned
    /// future fetches the country's record and then all of its neighbours.
    /// A country is only accepted from a list fetched for the current region.
    pub fn on_country_changed(
        self: &Arc<Self>,
        country: Option<CountryCode>,
    ) -> impl Future<Output = Result<CascadeOutcome, CascadeError>> + Send + 'static {
        let plan = self.begin_country_change(country);
        let controller = Arc::clone(self);
        async move {
            let (token, code) = match plan {
                CountryPlan::Rejected(err) => return Err(CascadeError::from(err)),
                CountryPlan::Cleared => return Ok(CascadeOutcome::Applied),
                CountryPlan::Fetch { token, code } => (token, code),
            };

            let record = match controller.gateway.country_by_alpha_code(&code).await {
                Ok(record) => record,
                Err(err) => return controller.settle(CascadeStep::Borders, token, Err(err)),
            };
            if !controller.is_current(CascadeStep::Borders, token) {
                return Ok(controller.superseded(CascadeStep::Borders, token));
            }

            let result = controller
                .gateway
                .country_borders_by_codes(&record.borders)
                .await;
            controller.settle(CascadeStep::Borders, token, result)
        }
    }

    pub fn on_border_changed(&self, border: Option<CountryCode>) -> Result<(), SelectionError> {
        let state = {
            let mut inner = self.lock();
            if let Some(code) = &border {
                if !inner.border_available(code) {
                    return Err(SelectionError::BorderNotAvailable(code.clone()));
                }
            }
            inner.state.border = border;
            inner.state.clone()
        };
        self.emit(SelectionEvent::StateChanged(state));
        Ok(())
    }

    fn begin_country_change(&self, country: Option<CountryCode>) -> CountryPlan {
        let cleared = country.is_none();
        let (plan, state) = {
            let mut inner = self.lock();
            if let Some(code) = &country {
                if !inner.country_available(code) {
                    return CountryPlan::Rejected(SelectionError::CountryNotAvailable(
                        code.clone(),
                    ));
                }
            }
            if cleared {
                inner.reset_country();
            } else {
                inner.begin_country(country.clone());
            }
            let plan = match country {
                Some(code) => CountryPlan::Fetch {
                    token: inner.country_generation,
                    code,
                },
                None => CountryPlan::Cleared,
            };
            (plan, inner.state.clone())
        };
        debug!(country = ?state.country, "country changed");
        self.emit(SelectionEvent::StateChanged(state));
        if cleared {
            self.emit(SelectionEvent::BordersUpdated(Vec::new()));
        }
        plan
    }

    fn settle(
        &self,
        step: CascadeStep,
        token: u64,
        result: Result<Vec<SmallCountry>, GatewayError>,
    ) -> Result<CascadeOutcome, CascadeError> {
        let mut inner = self.lock();
        if inner.generation(step) != token {
            drop(inner);
            return Ok(self.superseded(step, token));
        }

        let (list, error_slot, loaded_for) = inner.slots(step);
        match result {
            Ok(countries) => {
                *list = countries.clone();
                *error_slot = None;
                *loaded_for = token;
                drop(inner);
                info!(%step, count = countries.len(), "applied lookup result");
                self.emit(match step {
                    CascadeStep::Countries => SelectionEvent::CountriesUpdated(countries),
                    CascadeStep::Borders => SelectionEvent::BordersUpdated(countries),
                });
                Ok(CascadeOutcome::Applied)
            }
            Err(source) => {
                let error = StepError::new(source.code(), source.to_string());
                *error_slot = Some(error.clone());
                drop(inner);
                warn!(%step, code = error.code.as_str(), error = %source, "lookup failed");
                self.emit(SelectionEvent::StepFailed { step, error });
                Err(CascadeError::Gateway { step, source })
            }
        }
    }

    fn superseded(&self, step: CascadeStep, token: u64) -> CascadeOutcome {
        debug!(%step, token, "discarding superseded lookup");
        self.emit(SelectionEvent::Superseded { step });
        CascadeOutcome::Superseded
    }

    fn is_current(&self, step: CascadeStep, token: u64) -> bool {
        self.lock().generation(step) == token
    }

    fn emit(&self, event: SelectionEvent) {
        // No subscribers is fine; snapshot() stays authoritative.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, SelectionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
