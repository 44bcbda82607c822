use std::time::{Duration, Instant};

use iced::{Color, Element, Subscription, Task};
use iced_layershell::build_pattern::daemon;
use iced_layershell::settings::{LayerShellSettings, StartMode};
use iced_layershell::to_layer_message;

use crate::api::Api;
use crate::audio::{AudioPlayer, Sound};
use crate::config::{self, Config};
use crate::grace::DisconnectWatchdog;
use crate::http::{self, HttpResponse};
use crate::ipc::{self, RealtimeKey};
use crate::notify::{presentation, ToastStack};
use crate::realtime::{ConnectionState, RealtimeUpdate};
use crate::state::{CounterState, Reaction};
use crate::surface::{panel_settings, toast_settings};
use crate::theme::{self, Palette, ThemeMode};
use crate::views::toasts;
use crate::{events, realtime, util};

pub(crate) type IcedId = iced_layershell::reexport::IcedId;

/// Drives toast expiry, the disconnect grace timer and the validation
/// reminder.
const TICK_MS: u64 = 250;

#[derive(Debug, Default)]
pub(crate) struct LoginForm {
    pub initials: String,
    pub logout_elsewhere: bool,
}

pub(crate) struct Counter {
    pub(crate) config: Config,
    pub(crate) state: CounterState,
    pub(crate) connection: ConnectionState,
    pub(crate) attempts: u32,
    pub(crate) login: LoginForm,
    pub(crate) toasts: ToastStack,
    pub(crate) colors: Palette,
    api: Api,
    http: reqwest::blocking::Client,
    watchdog: DisconnectWatchdog,
    audio: AudioPlayer,
    panel_id: Option<IcedId>,
    panel_visible: bool,
    /// Toast id to surface id, in stack order.
    toast_surfaces: Vec<(u64, IcedId)>,
    theme_mode: ThemeMode,
    target_output: Option<String>,
}

#[to_layer_message(multi)]
#[derive(Debug, Clone)]
pub(crate) enum Message {
    TogglePanel,
    Tick,
    Realtime(RealtimeUpdate),
    // Quick actions
    CallNext,
    ValidatePatient,
    PausePatient,
    RecallPatient,
    CallSpecific(i64),
    // One-shot HTTP completions
    TokenResponse(HttpResponse),
    InitResponse(HttpResponse),
    ListResponse(HttpResponse),
    PatientResponse(HttpResponse),
    StaffResponse(HttpResponse),
    LoginResponse(HttpResponse),
    LogoutResponse(HttpResponse),
    RecallResponse(HttpResponse),
    // Staff session
    InitialsChanged(String),
    LogoutElsewhereToggled(bool),
    SubmitLogin,
    LoginAs(String),
    Logout,
    // Toasts
    ToastDismissed(u64),
    DismissToasts,
    TestNotification,
    // Misc
    Keyboard(iced::keyboard::Event),
    AltKey(String),
    ThemeSet(ThemeMode),
}

/// Map a key press to a message. Escape clears the toast stack; Alt plus a
/// letter goes through the configured shortcut table.
fn hotkey(key: &iced::keyboard::Key, modifiers: iced::keyboard::Modifiers) -> Option<Message> {
    match key {
        iced::keyboard::Key::Named(iced::keyboard::key::Named::Escape) => {
            Some(Message::DismissToasts)
        }
        iced::keyboard::Key::Character(c) if modifiers.alt() => {
            Some(Message::AltKey(c.to_lowercase()))
        }
        _ => None,
    }
}

pub(crate) fn run() -> Result<(), iced_layershell::Error> {
    tracing::info!(
        "pharma-counter v{} ({}) starting",
        env!("PHARMA_COUNTER_VERSION"),
        env!("PHARMA_COUNTER_COMMIT")
    );

    let settings = LayerShellSettings {
        start_mode: StartMode::Background,
        ..Default::default()
    };

    daemon(Counter::new, Counter::namespace, Counter::update, Counter::view)
        .style(Counter::style)
        .subscription(Counter::subscription)
        .layer_settings(settings)
        .run()
}

impl Counter {
    fn new() -> (Self, Task<Message>) {
        let config = match config::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("config unusable, falling back to defaults: {e}");
                Config::default()
            }
        };
        // Seed a config file on first run so there is something to edit.
        if !config::config_file_path().exists() {
            if let Err(e) = config::save(&config) {
                tracing::warn!("could not write default config: {e}");
            }
        }

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .unwrap_or_else(|e| {
                tracing::error!("http client builder failed: {e}");
                reqwest::blocking::Client::new()
            });

        let target_output = std::env::var("PHARMA_COUNTER_SCREEN")
            .ok()
            .filter(|s| !s.is_empty());
        if let Some(ref name) = target_output {
            tracing::info!("target screen: {name} (from PHARMA_COUNTER_SCREEN)");
        }

        let theme_mode = ThemeMode::Dark;
        let api = Api::new(&config.web_url);
        let state = CounterState::new(config.counter_id, config.validate_reminder());
        let watchdog = DisconnectWatchdog::new(config.grace());
        let toasts = ToastStack::new(config.toast_duration());
        let audio = AudioPlayer::new(config.sound_volume);

        let (id, open_task) = Message::layershell_open(panel_settings(target_output.as_deref()));
        tracing::info!("panel surface opened ({id})");

        let token_request = api.request_app_token(&config.app_secret);
        let token_task = Task::perform(
            http::execute(http.clone(), token_request),
            Message::TokenResponse,
        );

        (
            Self {
                config,
                state,
                connection: ConnectionState::Disconnected,
                attempts: 0,
                login: LoginForm::default(),
                toasts,
                colors: theme::resolve(theme_mode),
                api,
                http,
                watchdog,
                audio,
                panel_id: Some(id),
                panel_visible: true,
                toast_surfaces: Vec::new(),
                theme_mode,
                target_output,
            },
            Task::batch([open_task, token_task]),
        )
    }

    fn namespace() -> String {
        String::from("pharma-counter")
    }

    fn request(
        &self,
        request: crate::http::ApiRequest,
        wrap: fn(HttpResponse) -> Message,
    ) -> Task<Message> {
        Task::perform(http::execute(self.http.clone(), request), wrap)
    }

    /// Re-sync the bootstrap state after connecting (or reconnecting): the
    /// list and the bound patient may have moved while we were blind.
    fn refresh_tasks(&self) -> Task<Message> {
        Task::batch([
            self.request(self.api.patients_list(), Message::ListResponse),
            self.request(
                self.api.patient_on_counter(self.config.counter_id),
                Message::PatientResponse,
            ),
        ])
    }

    fn show_toast(&mut self, origin: &str, message: String) -> Task<Message> {
        let style = presentation(origin);
        self.audio.play(style.sound.into());
        let height = toasts::estimated_height(&message);
        self.toasts.add(style, message, height, Instant::now());
        self.sync_toast_surfaces()
    }

    /// Recreate every toast surface at its freshly computed offset. Add and
    /// remove both go through here so positions never drift.
    fn sync_toast_surfaces(&mut self) -> Task<Message> {
        let mut tasks: Vec<Task<Message>> = self
            .toast_surfaces
            .drain(..)
            .map(|(_, surface_id)| Task::done(Message::RemoveWindow(surface_id)))
            .collect();
        for placement in self.toasts.placements() {
            let (surface_id, task) =
                Message::layershell_open(toast_settings(&placement, self.target_output.as_deref()));
            self.toast_surfaces.push((placement.id, surface_id));
            tasks.push(task);
        }
        Task::batch(tasks)
    }

    fn handle_reactions(&mut self, reactions: Vec<Reaction>) -> Task<Message> {
        let mut tasks = Vec::new();
        for reaction in reactions {
            match reaction {
                Reaction::Toast { origin, message } => tasks.push(self.show_toast(&origin, message)),
                // The panel switches to the login view on its own.
                Reaction::LoggedOut => {}
                Reaction::PatientAlreadyTaken => self.audio.play(Sound::AlreadyTaken),
            }
        }
        Task::batch(tasks)
    }

    fn server_unreachable(&mut self) -> Task<Message> {
        self.show_toast("connection", "Le serveur est inaccessible.".to_string())
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        let now = Instant::now();
        match message {
            Message::TogglePanel => {
                if self.panel_visible {
                    self.panel_visible = false;
                    if let Some(id) = self.panel_id.take() {
                        Task::done(Message::RemoveWindow(id))
                    } else {
                        Task::none()
                    }
                } else {
                    let (id, task) =
                        Message::layershell_open(panel_settings(self.target_output.as_deref()));
                    self.panel_id = Some(id);
                    self.panel_visible = true;
                    task
                }
            }
            Message::Tick => {
                let mut tasks = Vec::new();
                if !self.toasts.expire(now).is_empty() {
                    tasks.push(self.sync_toast_surfaces());
                }
                if let Some(attempts) = self.watchdog.poll(now) {
                    tracing::warn!("still disconnected after grace ({attempts} attempts)");
                    if self.config.notify.connection {
                        tasks.push(self.show_toast(
                            "socket_connection_false",
                            "La connexion temps réel a été perdue. Tentative de reconnexion... \
                             La liste des patients ne s'affichera plus en temps réel, mais les \
                             boutons fonctionnent toujours."
                                .to_string(),
                        ));
                    }
                }
                if let Some(reaction) = self.state.poll_validate_reminder(now) {
                    tasks.push(self.handle_reactions(vec![reaction]));
                }
                Task::batch(tasks)
            }
            Message::Realtime(update) => match update {
                RealtimeUpdate::StateChanged {
                    state,
                    attempts,
                    notify,
                } => {
                    self.connection = state;
                    self.attempts = attempts;
                    if state == ConnectionState::Connected {
                        let announce = self.watchdog.on_connected();
                        let mut tasks = vec![self.refresh_tasks()];
                        if announce && notify && self.config.notify.connection {
                            tasks.push(self.show_toast(
                                "socket_connection_true",
                                "La connexion temps réel est (r)établie !".to_string(),
                            ));
                        }
                        Task::batch(tasks)
                    } else {
                        Task::none()
                    }
                }
                RealtimeUpdate::ConnectionLost { attempts } => {
                    self.watchdog.on_connection_lost(attempts, now);
                    Task::none()
                }
                RealtimeUpdate::Event(event) => {
                    let reactions = self.state.apply_event(event, &self.config.notify, now);
                    self.handle_reactions(reactions)
                }
            },
            Message::CallNext => self.request(
                self.api.call_next(self.config.counter_id),
                Message::PatientResponse,
            ),
            Message::ValidatePatient => match self.state.current_patient_id() {
                Some(patient_id) => self.request(
                    self.api.validate_patient(self.config.counter_id, patient_id),
                    Message::PatientResponse,
                ),
                None => Task::none(),
            },
            Message::PausePatient => match self.state.current_patient_id() {
                Some(patient_id) => self.request(
                    self.api.pause_patient(self.config.counter_id, patient_id),
                    Message::PatientResponse,
                ),
                None => Task::none(),
            },
            Message::RecallPatient => self.request(
                self.api.relaunch_patient_call(self.config.counter_id),
                Message::RecallResponse,
            ),
            Message::CallSpecific(patient_id) => self.request(
                self.api
                    .call_specific_patient(self.config.counter_id, patient_id),
                Message::PatientResponse,
            ),
            Message::TokenResponse(response) => {
                if response.is_transport_failure() {
                    return self.server_unreachable();
                }
                let token = response
                    .json()
                    .and_then(|v| v.get("token").and_then(|t| t.as_str().map(String::from)));
                match (response.status, token) {
                    (200, Some(token)) => {
                        self.api.set_app_token(token);
                        tracing::info!("app token acquired");
                        Task::batch([
                            self.request(
                                self.api.init_app(self.config.counter_id),
                                Message::InitResponse,
                            ),
                            self.request(
                                self.api.staff_on_counter(self.config.counter_id),
                                Message::StaffResponse,
                            ),
                            self.refresh_tasks(),
                        ])
                    }
                    (status, _) => {
                        tracing::error!("app token refused (status {status})");
                        self.server_unreachable()
                    }
                }
            }
            Message::InitResponse(response) => {
                if response.status == 200 {
                    if let Some(active) = response
                        .json()
                        .and_then(|v| v.get("autocalling").and_then(|a| a.as_bool()))
                    {
                        self.state.auto_calling = active;
                    }
                } else {
                    tracing::warn!("init_app failed (status {})", response.status);
                }
                Task::none()
            }
            Message::ListResponse(response) => {
                if response.status == 200 {
                    match serde_json::from_str::<Vec<events::Patient>>(&response.body) {
                        Ok(patients) => self.state.waiting = patients,
                        Err(e) => tracing::warn!("undecodable patient list: {e}"),
                    }
                } else {
                    tracing::warn!("patient list fetch failed (status {})", response.status);
                }
                Task::none()
            }
            Message::PatientResponse(response) => {
                if response.is_transport_failure() {
                    return self.server_unreachable();
                }
                let reactions = self.state.apply_patient_response(
                    response.status,
                    &response.body,
                    &self.config.notify,
                    now,
                );
                self.handle_reactions(reactions)
            }
            Message::StaffResponse(response) => {
                if response.is_transport_failure() {
                    return self.server_unreachable();
                }
                let reactions = self.state.apply_staff_response(response.status, &response.body);
                self.handle_reactions(reactions)
            }
            Message::LoginResponse(response) => {
                if response.is_transport_failure() {
                    return self.server_unreachable();
                }
                if response.is_success() {
                    // The server owns the binding; re-read it instead of
                    // trusting our own form.
                    self.request(
                        self.api.staff_on_counter(self.config.counter_id),
                        Message::StaffResponse,
                    )
                } else {
                    tracing::warn!("login refused (status {})", response.status);
                    Task::none()
                }
            }
            Message::LogoutResponse(response) => {
                if !response.is_success() && !response.is_transport_failure() {
                    tracing::warn!("logout failed (status {})", response.status);
                }
                self.state.staff = None;
                Task::none()
            }
            Message::RecallResponse(response) => {
                if response.is_transport_failure() {
                    return self.server_unreachable();
                }
                Task::none()
            }
            Message::InitialsChanged(value) => {
                self.login.initials = value;
                Task::none()
            }
            Message::LogoutElsewhereToggled(value) => {
                self.login.logout_elsewhere = value;
                Task::none()
            }
            Message::SubmitLogin => {
                let initials = self.login.initials.trim().to_string();
                if initials.is_empty() {
                    return Task::none();
                }
                self.login.initials.clear();
                self.request(
                    self.api.login_staff(
                        self.config.counter_id,
                        &initials,
                        self.login.logout_elsewhere,
                    ),
                    Message::LoginResponse,
                )
            }
            Message::LoginAs(initials) => {
                let initials = initials.trim().to_string();
                if initials.is_empty() {
                    return Task::none();
                }
                self.request(
                    self.api.login_staff(self.config.counter_id, &initials, false),
                    Message::LoginResponse,
                )
            }
            Message::Logout => self.request(
                self.api.logout_staff(self.config.counter_id),
                Message::LogoutResponse,
            ),
            Message::ToastDismissed(id) => {
                self.toasts.remove(id);
                self.sync_toast_surfaces()
            }
            Message::DismissToasts => {
                if self.toasts.is_empty() {
                    return Task::none();
                }
                let ids: Vec<u64> = self.toasts.placements().iter().map(|p| p.id).collect();
                for id in ids {
                    self.toasts.remove(id);
                }
                self.sync_toast_surfaces()
            }
            Message::TestNotification => self.show_toast(
                "test_notification",
                "Si vous voyez ceci, tout fonctionne.".to_string(),
            ),
            Message::Keyboard(iced::keyboard::Event::KeyPressed { key, modifiers, .. }) => {
                match hotkey(&key, modifiers) {
                    Some(message) => Task::done(message),
                    None => Task::none(),
                }
            }
            Message::AltKey(key) => {
                let shortcuts = self.config.shortcuts.clone();
                let matches =
                    |binding: &str| util::shortcut_key(binding).as_deref() == Some(key.as_str());
                if matches(&shortcuts.next_patient) {
                    Task::done(Message::CallNext)
                } else if matches(&shortcuts.validate_patient) {
                    Task::done(Message::ValidatePatient)
                } else if matches(&shortcuts.pause_patient) {
                    Task::done(Message::PausePatient)
                } else if matches(&shortcuts.recall_patient) {
                    Task::done(Message::RecallPatient)
                } else if matches(&shortcuts.logout) {
                    Task::done(Message::Logout)
                } else {
                    Task::none()
                }
            }
            Message::ThemeSet(mode) => {
                self.theme_mode = mode;
                self.colors = theme::resolve(mode);
                tracing::info!("theme -> {mode:?}");
                Task::none()
            }
            _ => Task::none(),
        }
    }

    fn view(&self, window_id: IcedId) -> Element<'_, Message> {
        if let Some(&(toast_id, _)) = self
            .toast_surfaces
            .iter()
            .find(|(_, surface_id)| *surface_id == window_id)
        {
            if let Some(toast) = self.toasts.get(toast_id) {
                return self.view_toast(toast);
            }
        }
        if self.state.is_logged_in() {
            self.view_panel()
        } else {
            self.view_login()
        }
    }

    fn subscription(state: &Self) -> Subscription<Message> {
        let realtime_key = RealtimeKey {
            url: realtime::transport::channel_url(&state.config.web_url),
            client_name: state.config.client_name(),
        };
        Subscription::batch([
            Subscription::run(ipc::socket_listener),
            Subscription::run_with(TICK_MS, ipc::tick_stream),
            Subscription::run_with(realtime_key, ipc::realtime_stream),
            iced::keyboard::listen().map(Message::Keyboard),
        ])
    }

    fn style(&self, _theme: &iced::Theme) -> iced::theme::Style {
        iced::theme::Style {
            background_color: Color::TRANSPARENT,
            text_color: self.colors.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iced::keyboard::key::Named;
    use iced::keyboard::{Key, Modifiers};

    #[test]
    fn escape_clears_the_toast_stack() {
        let message = hotkey(&Key::Named(Named::Escape), Modifiers::empty());
        assert!(matches!(message, Some(Message::DismissToasts)));
    }

    #[test]
    fn alt_letter_goes_through_the_shortcut_table() {
        let message = hotkey(&Key::Character("S".into()), Modifiers::ALT);
        assert!(matches!(message, Some(Message::AltKey(ref k)) if k == "s"));
    }

    #[test]
    fn plain_characters_are_ignored() {
        assert!(hotkey(&Key::Character("s".into()), Modifiers::empty()).is_none());
        assert!(hotkey(&Key::Named(Named::Enter), Modifiers::empty()).is_none());
    }
}
