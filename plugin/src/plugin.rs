//! Event dispatch and the per-key refresh cycle.

use crate::config::PluginConfig;
use crate::error::{FetchError, PluginError};
use crate::protocol::{ActionEvent, ContextEvent, HostCommand, HostEvent, InspectorMessage};
use crate::query::{DisplayValue, build_client, fetch_display_value};
use crate::render::FaceRenderer;
use crate::session::{ButtonSession, SessionRegistry};
use crate::settings::Settings;
use crate::timer::RefreshTimer;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use reqwest::Client;

/// Messages the plugin sends to itself
#[derive(Debug)]
pub enum Internal {
    /// A key's refresh timer fired
    Tick { context: String, timer_id: u64 },
    /// A query finished. `generation` identifies the session that started it.
    Completed {
        context: String,
        generation: u64,
        result: Result<DisplayValue, FetchError>,
    },
}

pub struct Plugin {
    config: PluginConfig,
    client: Client,
    renderer: FaceRenderer,
    sessions: SessionRegistry,
    commands: mpsc::UnboundedSender<HostCommand>,
    internal_tx: mpsc::UnboundedSender<Internal>,
    next_timer_id: u64,
    next_generation: u64,
}

impl Plugin {
    /// Build the plugin. Commands for the host are written to `commands`;
    /// the returned receiver must be fed back through [`Plugin::handle_internal`].
    pub fn new(
        config: PluginConfig,
        commands: mpsc::UnboundedSender<HostCommand>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Internal>), PluginError> {
        let client = build_client(config.request_timeout())
            .map_err(|e| PluginError::HttpClient(e.to_string()))?;
        let renderer = FaceRenderer::from_config(&config)?;
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let plugin = Self {
            config,
            client,
            renderer,
            sessions: SessionRegistry::new(),
            commands,
            internal_tx,
            next_timer_id: 0,
            next_generation: 0,
        };
        Ok((plugin, internal_rx))
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Drive the plugin until `shutdown` is cancelled
    pub async fn run(
        mut self,
        mut internal_rx: mpsc::UnboundedReceiver<Internal>,
        mut events: mpsc::UnboundedReceiver<HostEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping plugin");
                    break;
                }
                Some(event) = events.recv() => self.handle_event(event),
                Some(message) = internal_rx.recv() => self.handle_internal(message),
                else => break,
            }
        }

        info!(keys = self.sessions.len(), "Plugin stopped");
    }

    pub fn handle_event(&mut self, event: HostEvent) {
        trace!(context = event.context(), "Handling host event");
        match event {
            HostEvent::WillAppear(event) => self.on_will_appear(event),
            HostEvent::WillDisappear(event) => self.on_will_disappear(event),
            HostEvent::KeyDown(_) => {}
            HostEvent::KeyUp(event) => self.on_key_up(event),
            HostEvent::DidReceiveSettings(event) => self.on_did_receive_settings(event),
            HostEvent::SendToPlugin(message) => self.on_send_to_plugin(message),
            HostEvent::PropertyInspectorDidAppear(ContextEvent { context, .. }) => {
                debug!(context = %context, "Property inspector opened");
            }
            HostEvent::PropertyInspectorDidDisappear(ContextEvent { context, .. }) => {
                debug!(context = %context, "Property inspector closed");
            }
            HostEvent::SystemDidWakeUp => self.on_system_wake(),
            HostEvent::Other => {}
        }
    }

    pub fn handle_internal(&mut self, message: Internal) {
        match message {
            Internal::Tick { context, timer_id } => {
                let current = self
                    .sessions
                    .get(&context)
                    .is_some_and(|s| s.is_current_timer(timer_id));
                if current {
                    self.refresh(&context);
                } else {
                    debug!(context = %context, timer_id, "Ignoring tick from a stopped timer");
                }
            }
            Internal::Completed {
                context,
                generation,
                result,
            } => self.on_refresh_completed(context, generation, result),
        }
    }

    fn on_will_appear(&mut self, event: ActionEvent) {
        let ActionEvent {
            action,
            context,
            payload,
            ..
        } = event;
        info!(context = %context, coordinates = ?payload.coordinates, "Key appeared");

        let has_url = payload.settings.url().is_some();
        self.open_session(&context, action, payload.settings);
        self.arm_timer(&context);

        if has_url {
            self.refresh(&context);
        }
    }

    fn on_will_disappear(&mut self, event: ActionEvent) {
        if let Some(session) = self.sessions.remove(&event.context) {
            info!(
                context = %event.context,
                action = session.action(),
                "Key disappeared, refresh stopped"
            );
        }
    }

    fn on_key_up(&mut self, event: ActionEvent) {
        if self.sessions.get(&event.context).is_none() {
            warn!(context = %event.context, "Key press for a key that never appeared");
            self.open_session(&event.context, event.action, event.payload.settings);
        }
        self.refresh(&event.context);
    }

    fn on_did_receive_settings(&mut self, event: ActionEvent) {
        let ActionEvent {
            action,
            context,
            payload,
            ..
        } = event;
        debug!(context = %context, settings = ?payload.settings, "Settings received");

        let has_url = payload.settings.url().is_some();
        match self.sessions.get_mut(&context) {
            Some(session) => session.set_settings(payload.settings),
            None => self.open_session(&context, action, payload.settings),
        }
        self.arm_timer(&context);

        if has_url {
            self.refresh(&context);
        }
    }

    fn on_send_to_plugin(&mut self, message: InspectorMessage) {
        let Some((key, value)) = message.setting_change() else {
            debug!(context = %message.context, "Inspector message without a setting change");
            return;
        };

        let Some(session) = self.sessions.get_mut(&message.context) else {
            warn!(context = %message.context, key, "Setting change for an unknown key");
            return;
        };

        if !session.settings_mut().apply(key, value.clone()) {
            debug!(context = %message.context, key, "Ignoring empty setting value");
            return;
        }
        info!(context = %message.context, key, "Setting changed from inspector");

        let persisted = HostCommand::set_settings(&message.context, session.settings().clone());
        let has_url = session.settings().url().is_some();
        self.send(persisted);
        self.arm_timer(&message.context);

        if has_url {
            self.refresh(&message.context);
        }
    }

    fn on_system_wake(&mut self) {
        let contexts = self.sessions.contexts();
        info!(keys = contexts.len(), "System woke up, refreshing all keys");

        for context in contexts {
            let has_url = self
                .sessions
                .get(&context)
                .is_some_and(|s| s.settings().url().is_some());
            if has_url {
                self.refresh(&context);
            }
        }
    }

    /// Track a newly visible key, replacing any session left under the same context
    fn open_session(&mut self, context: &str, action: String, settings: Settings) {
        self.next_generation += 1;
        self.sessions.insert(ButtonSession::new(
            self.next_generation,
            context,
            action,
            settings,
        ));
    }

    /// Start, restart or stop the key's timer to match its current settings
    fn arm_timer(&mut self, context: &str) {
        let min_interval = self.config.min_interval();
        let Some(session) = self.sessions.get_mut(context) else {
            return;
        };

        match session.settings().interval_period() {
            Some(period) => {
                let period = period.max(min_interval);
                self.next_timer_id += 1;
                let timer = RefreshTimer::start(
                    context.to_string(),
                    self.next_timer_id,
                    period,
                    self.internal_tx.clone(),
                );
                session.set_timer(timer);
                info!(
                    context,
                    interval_secs = period.as_secs_f64(),
                    "Refresh timer started"
                );
            }
            None => {
                if session.stop_timer() {
                    info!(context, "Refresh timer stopped, no interval configured");
                }
            }
        }
    }

    /// Run one refresh cycle for a key, unless one is already in flight
    fn refresh(&mut self, context: &str) {
        let Some(session) = self.sessions.get_mut(context) else {
            return;
        };
        if !session.begin_refresh() {
            debug!(context, "Refresh already in flight, queued a follow-up");
            return;
        }

        let settings = session.settings().clone();
        let generation = session.generation();
        self.send(HostCommand::set_title(context, ""));

        let client = self.client.clone();
        let default_url = self.config.default_url.clone();
        let results = self.internal_tx.clone();
        let context = context.to_string();

        debug!(context = %context, url = settings.url().unwrap_or(&default_url), "Fetching value");
        tokio::spawn(async move {
            let result = fetch_display_value(&client, &settings, &default_url).await;
            let _ = results.send(Internal::Completed {
                context,
                generation,
                result,
            });
        });
    }

    fn on_refresh_completed(
        &mut self,
        context: String,
        generation: u64,
        result: Result<DisplayValue, FetchError>,
    ) {
        let Some(session) = self
            .sessions
            .get_mut(&context)
            .filter(|s| s.generation() == generation)
        else {
            debug!(context = %context, generation, "Discarding result for a key that is no longer visible");
            return;
        };

        let (value, alert) = match result {
            Ok(value) => {
                info!(context = %context, value = %value, "Value fetched");
                (value, false)
            }
            Err(e) => {
                warn!(
                    context = %context,
                    error = %e,
                    error_category = e.category(),
                    "Failed to fetch value"
                );
                (DisplayValue::from_error(&e), true)
            }
        };

        let follow_up = session.finish_refresh(value.clone());
        self.push_face(&context, &value);
        if alert {
            self.send(HostCommand::show_alert(&context));
        }

        if follow_up {
            self.refresh(&context);
        }
    }

    fn push_face(&self, context: &str, value: &DisplayValue) {
        match self.renderer.render_data_uri(&value.to_string()) {
            Ok(image) => self.send(HostCommand::set_image(context, image)),
            Err(e) => error!(context, error = %e, "Failed to render key image"),
        }
    }

    fn send(&self, command: HostCommand) {
        if self.commands.send(command).is_err() {
            warn!("Host connection closed, dropping command");
        }
    }
}
