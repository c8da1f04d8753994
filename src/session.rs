// 🔁 Session State Machine - One transition function for every user action
// Dropdown edits, Apply, chart-area clicks and Download all flow through `step`

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::dataset::Dataset;
use crate::engine::{self, ChartSeries, RenderError, NO_DATA_MESSAGE};
use crate::export::{self, ExportError};
use crate::filters::{FilterChange, FilterSelection};

// ============================================================================
// EVENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// First paint of the page with the default selection
    PageLoaded,

    /// A dropdown value changed; never redraws the chart
    FilterChanged { change: FilterChange },

    /// The "Apply" button
    ApplyPressed,

    /// Click on the chart region; refreshes without recomputing
    ChartAreaReactivated,

    /// The "Download" button
    ExportPressed,
}

// ============================================================================
// SESSION STATE
// ============================================================================

/// Everything one browser session sees
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub selection: FilterSelection,

    /// Current legal financial years, sentinel last (empty while a dimension is unset)
    pub financial_year_options: Vec<String>,

    pub classification_label: String,

    /// Last successfully rendered chart; kept while hidden
    pub chart: Option<ChartSeries>,

    pub chart_visible: bool,

    /// Text for the error region; empty when there is nothing to say
    pub error_text: String,
}

impl SessionState {
    pub fn new(dataset: &Dataset) -> Self {
        let selection = FilterSelection::default();
        SessionState {
            financial_year_options: selection.financial_year_options(dataset),
            classification_label: selection.classification_label(),
            selection,
            chart: None,
            chart_visible: false,
            error_text: String::new(),
        }
    }

    /// Snapshot for the page, with the chart drawn when it is visible
    pub fn view(&self) -> SessionView {
        let chart = self.chart.as_ref().filter(|_| self.chart_visible);
        let svg = chart.and_then(|series| match export::render_svg(series) {
            Ok(svg) => Some(svg),
            Err(e) => {
                log::error!("chart drawing failed: {}", e);
                None
            }
        });

        SessionView {
            selection: self.selection.clone(),
            financial_year_options: self.financial_year_options.clone(),
            classification_label: self.classification_label.clone(),
            chart_visible: self.chart_visible,
            error_text: self.error_text.clone(),
            chart: chart.cloned(),
            svg,
        }
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub selection: FilterSelection,
    pub financial_year_options: Vec<String>,
    pub classification_label: String,
    pub chart_visible: bool,
    pub error_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}

/// Result of one event: the next state and, for Download, the file bytes
#[derive(Debug)]
pub struct Transition {
    pub state: SessionState,
    pub download: Option<Result<Vec<u8>, ExportError>>,
}

impl Transition {
    fn to(state: SessionState) -> Self {
        Transition { state, download: None }
    }
}

// ============================================================================
// TRANSITION FUNCTION
// ============================================================================

pub fn step(dataset: &Dataset, state: &SessionState, event: Event) -> Transition {
    let mut next = state.clone();

    match event {
        Event::PageLoaded => {
            // Only a successful render changes anything on first paint
            if let Ok(series) = engine::render(dataset, &next.selection) {
                show(&mut next, series);
            }
            Transition::to(next)
        }

        Event::FilterChanged { change } => {
            log::debug!("filter changed: {}", change.field_name());
            let refresh = change.refreshes_financial_years();
            next.selection.apply(change);

            next.classification_label = next.selection.classification_label();
            if refresh {
                next.financial_year_options = next.selection.financial_year_options(dataset);
            }
            Transition::to(next)
        }

        Event::ApplyPressed => {
            match engine::render(dataset, &next.selection) {
                Ok(series) => show(&mut next, series),
                Err(RenderError::IncompleteSelection) => {
                    next.chart_visible = false;
                    next.error_text.clear();
                }
                Err(RenderError::NoDataForCombination) => {
                    log::info!("no data for selection {:?}", next.selection);
                    next.chart_visible = false;
                    next.error_text = NO_DATA_MESSAGE.to_string();
                }
                Err(e @ RenderError::UnknownUnit(_)) => {
                    log::warn!("{}", e);
                    next.chart_visible = false;
                    next.error_text = e.to_string();
                }
            }
            Transition::to(next)
        }

        Event::ChartAreaReactivated => {
            next.error_text.clear();
            Transition::to(next)
        }

        Event::ExportPressed => {
            let download = export::export_chart(state.chart.as_ref());
            Transition {
                state: next,
                download: Some(download),
            }
        }
    }
}

fn show(state: &mut SessionState, series: ChartSeries) {
    state.chart = Some(series);
    state.chart_visible = true;
    state.error_text.clear();
}

// ============================================================================
// SESSION STORE
// ============================================================================

/// Sessions idle longer than this are dropped
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound on open sessions; the least recently seen one goes first
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

struct SessionEntry {
    state: SessionState,
    last_seen: Instant,
}

/// Per-session state keyed by a random id; sessions never see each other
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_limits(DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Open a session and give it its first paint
    pub fn create(&self, dataset: &Dataset) -> (Uuid, SessionState) {
        let id = Uuid::new_v4();
        let state = step(dataset, &SessionState::new(dataset), Event::PageLoaded).state;
        let now = Instant::now();

        let mut sessions = self.lock();
        self.evict(&mut sessions, now);
        sessions.insert(
            id,
            SessionEntry {
                state: state.clone(),
                last_seen: now,
            },
        );
        log::debug!("session {} opened", id);

        (id, state)
    }

    pub fn get(&self, id: &Uuid) -> Option<SessionState> {
        self.lock().get(id).map(|entry| entry.state.clone())
    }

    /// Run one event against a session; `None` if the session is unknown or expired
    pub fn dispatch(&self, dataset: &Dataset, id: &Uuid, event: Event) -> Option<Transition> {
        let now = Instant::now();
        let mut sessions = self.lock();
        self.expire_idle(&mut sessions, now);
        let entry = sessions.get_mut(id)?;

        let transition = step(dataset, &entry.state, event);
        entry.state = transition.state.clone();
        entry.last_seen = now;

        Some(transition)
    }

    /// Close a session explicitly; false if it was not open
    pub fn remove(&self, id: &Uuid) -> bool {
        self.lock().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn expire_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_seen) < self.idle_timeout);
        if sessions.len() < before {
            log::debug!("expired {} idle sessions", before - sessions.len());
        }
    }

    /// Make room for one more session
    fn evict(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        self.expire_idle(sessions, now);

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            log::debug!("session {} evicted (store full)", oldest);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, SessionEntry>> {
        // State is replaced wholesale, so a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
