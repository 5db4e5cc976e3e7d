use crate::query::DisplayValue;
use crate::settings::Settings;
use crate::timer::{RefreshTimer, TimerState};
use std::collections::HashMap;
use std::time::SystemTime;

/// State for one visible key
#[derive(Debug)]
pub struct ButtonSession {
    /// Distinguishes this appearance of the key from earlier ones with the same context
    generation: u64,
    context: String,
    action: String,
    settings: Settings,
    display_value: DisplayValue,
    last_updated: Option<SystemTime>,
    timer: Option<RefreshTimer>,
    /// A query is running for this key
    in_flight: bool,
    /// Another refresh was requested while one was in flight
    pending: bool,
}

impl ButtonSession {
    pub fn new(
        generation: u64,
        context: impl Into<String>,
        action: impl Into<String>,
        settings: Settings,
    ) -> Self {
        Self {
            generation,
            context: context.into(),
            action: action.into(),
            settings,
            display_value: DisplayValue::Empty,
            last_updated: None,
            timer: None,
            in_flight: false,
            pending: false,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn set_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    pub fn display_value(&self) -> &DisplayValue {
        &self.display_value
    }

    pub fn last_updated(&self) -> Option<SystemTime> {
        self.last_updated
    }

    pub fn timer_state(&self) -> TimerState {
        match &self.timer {
            Some(timer) => TimerState::Active {
                period: timer.period(),
            },
            None => TimerState::Idle,
        }
    }

    /// Replace the running timer; the previous one (if any) is cancelled
    pub fn set_timer(&mut self, timer: RefreshTimer) {
        self.timer = Some(timer);
    }

    /// Cancel the running timer. Returns false if there was none.
    pub fn stop_timer(&mut self) -> bool {
        self.timer.take().is_some()
    }

    /// Ticks from a timer that has since been replaced are ignored
    pub fn is_current_timer(&self, timer_id: u64) -> bool {
        self.timer.as_ref().is_some_and(|t| t.id() == timer_id)
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight
    }

    /// Claim the key for a new query. Returns false when one is already
    /// running; the request is then remembered and replayed once it finishes.
    pub fn begin_refresh(&mut self) -> bool {
        if self.in_flight {
            self.pending = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Store the outcome of a query. Returns true if a follow-up refresh is due.
    pub fn finish_refresh(&mut self, value: DisplayValue) -> bool {
        self.display_value = value;
        self.last_updated = Some(SystemTime::now());
        self.in_flight = false;
        std::mem::take(&mut self.pending)
    }
}

/// Sessions for every visible key, by context
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, ButtonSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session, dropping (and so stopping) any previous one for the same key
    pub fn insert(&mut self, session: ButtonSession) -> Option<ButtonSession> {
        self.sessions.insert(session.context.clone(), session)
    }

    pub fn remove(&mut self, context: &str) -> Option<ButtonSession> {
        self.sessions.remove(context)
    }

    pub fn get(&self, context: &str) -> Option<&ButtonSession> {
        self.sessions.get(context)
    }

    pub fn get_mut(&mut self, context: &str) -> Option<&mut ButtonSession> {
        self.sessions.get_mut(context)
    }

    pub fn contexts(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_timers(&self) -> usize {
        self.sessions.values().filter(|s| s.timer.is_some()).count()
    }
}
