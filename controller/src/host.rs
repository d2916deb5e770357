use std::{
    net::SocketAddr,
    sync::{atomic::AtomicBool, Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use rumqttc::{AsyncClient, ClientError, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use serde::{Deserialize, Serialize};
use tokio::{
    net::TcpListener,
    sync::{mpsc, oneshot},
    time::{Interval, MissedTickBehavior},
};
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use thermorelay_common::{
    config::{ControllerConfig, NetworkConfig},
    Command, ConfigStore, Connectivity, Controller, Effect, LinkAction, RelayActuator,
    RemoteCommand, RuntimeConfig, SettingUpdate, Settings, StatusView, TemperatureSensor,
    TickStatus, AVAILABILITY_OFFLINE, AVAILABILITY_ONLINE, TOPIC_AVAILABILITY, TOPIC_COMMAND,
    TOPIC_STATE, TOPIC_TEMPERATURE,
};

use crate::{
    clock::ZonedClock,
    drivers::{LoggingTransmitter, SimulatedRoom},
    page::render_status_page,
    store::{AppStore, FileRecordStore},
};

const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(30);
const MQTT_CHANNEL_CAPACITY: usize = 64;
const WEB_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
struct AppState {
    requests: mpsc::Sender<WebRequest>,
}

struct WebRequest {
    commands: Vec<Command>,
    reply: oneshot::Sender<StatusView>,
}

#[derive(Debug)]
enum LinkEvent {
    Up,
    Down(String),
    Message { topic: String, payload: Vec<u8> },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsForm {
    target_temp: Option<String>,
    delta_temp: Option<String>,
    frost_protection_temp: Option<String>,
    start_hour: Option<String>,
    start_min: Option<String>,
    end_hour: Option<String>,
    end_min: Option<String>,
}

impl SettingsForm {
    fn into_commands(self) -> Vec<Command> {
        let temp = |raw: Option<String>, update: fn(f32) -> SettingUpdate| {
            raw.and_then(|value| value.trim().parse::<f32>().ok())
                .map(update)
        };
        let clock = |raw: Option<String>, update: fn(f64) -> SettingUpdate| {
            raw.and_then(|value| value.trim().parse::<f64>().ok())
                .map(update)
        };

        [
            temp(self.target_temp, SettingUpdate::TargetTemp),
            temp(self.delta_temp, SettingUpdate::DeltaTemp),
            temp(self.frost_protection_temp, SettingUpdate::FrostProtectionTemp),
            clock(self.start_hour, SettingUpdate::StartHour),
            clock(self.start_min, SettingUpdate::StartMin),
            clock(self.end_hour, SettingUpdate::EndHour),
            clock(self.end_min, SettingUpdate::EndMin),
        ]
        .into_iter()
        .flatten()
        .map(Command::Setting)
        .collect()
    }
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let store = AppStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        RuntimeConfig::default()
    });
    runtime.sanitize();
    apply_env_overrides(&mut runtime.network);

    let mut settings_store = ConfigStore::new(store.settings_store());
    let settings = load_settings(&mut settings_store);

    let heater = Arc::new(AtomicBool::new(false));
    let relay = RelayActuator::new(
        LoggingTransmitter::new(runtime.rf.clone(), heater.clone()),
        Duration::from_millis(runtime.controller.settle_ms),
    );
    let controller = Controller::new(settings, relay, runtime.controller.sample_interval_ms);
    let clock = ZonedClock::new(&runtime.timezone);
    info!(
        "wall clock {} (utc offset {})",
        clock.timezone(),
        clock.offset()
    );

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options(&runtime.network), MQTT_CHANNEL_CAPACITY);
    let link = Connectivity::new(runtime.controller.reconnect_interval_ms);
    let (link_tx, link_rx) = mpsc::channel(MQTT_CHANNEL_CAPACITY);
    let (request_tx, request_rx) = mpsc::channel(WEB_CHANNEL_CAPACITY);
    spawn_mqtt_loop(eventloop, link_tx, link.retry_interval());

    let scheduler = Scheduler {
        controller,
        sensor: SimulatedRoom::new(&runtime.simulation, heater),
        settings_store,
        clock,
        link,
        mqtt,
        max_payload_bytes: runtime.controller.max_payload_bytes,
    };
    tokio::spawn(scheduler.run(runtime.controller.clone(), link_rx, request_rx));

    let web_root = format!("{}/web", env!("CARGO_MANIFEST_DIR"));
    let app = Router::new()
        .route("/", get(handle_index))
        .route("/mode/toggle", post(handle_toggle_mode))
        .route("/relay/toggle", post(handle_toggle_relay))
        .route("/settings", post(handle_update_settings))
        .route("/api/status", get(handle_get_status))
        .nest_service("/static", ServeDir::new(web_root))
        .with_state(AppState {
            requests: request_tx,
        });

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn apply_env_overrides(network: &mut NetworkConfig) {
    if let Ok(host) = std::env::var("MQTT_HOST") {
        network.mqtt_host = host;
    }
    if let Some(port) = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
    {
        network.mqtt_port = port;
    }
    if let Ok(user) = std::env::var("MQTT_USER") {
        network.mqtt_user = user;
    }
    if let Ok(pass) = std::env::var("MQTT_PASS") {
        network.mqtt_pass = pass;
    }
}

fn load_settings(store: &mut ConfigStore<FileRecordStore>) -> Settings {
    match store.load() {
        Ok(loaded) => {
            if !loaded.found {
                info!("no stored settings, using defaults");
            }
            for field in &loaded.repaired {
                warn!("stored {} out of range, using default", field.as_str());
            }
            loaded.settings
        }
        Err(err) => {
            warn!("failed to load stored settings: {err}");
            Settings::default()
        }
    }
}

fn mqtt_options(network: &NetworkConfig) -> MqttOptions {
    let mut options = MqttOptions::new(
        network.client_id.clone(),
        network.mqtt_host.clone(),
        network.mqtt_port,
    );
    options.set_keep_alive(MQTT_KEEP_ALIVE);
    options.set_last_will(LastWill::new(
        TOPIC_AVAILABILITY,
        AVAILABILITY_OFFLINE,
        QoS::AtLeastOnce,
        true,
    ));
    if !network.mqtt_user.is_empty() {
        options.set_credentials(network.mqtt_user.clone(), network.mqtt_pass.clone());
    }
    options
}

/// Drives the rumqttc event loop and forwards what matters to the scheduler.
/// After an error the next poll reconnects, so waiting here sets the retry rate.
fn spawn_mqtt_loop(mut eventloop: EventLoop, events: mpsc::Sender<LinkEvent>, retry: Duration) {
    tokio::spawn(async move {
        loop {
            let event = match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => LinkEvent::Up,
                Ok(Event::Incoming(Incoming::Publish(message))) => LinkEvent::Message {
                    topic: message.topic,
                    payload: message.payload.to_vec(),
                },
                Ok(_) => continue,
                Err(err) => {
                    if events.send(LinkEvent::Down(err.to_string())).await.is_err() {
                        break;
                    }
                    tokio::time::sleep(retry).await;
                    continue;
                }
            };

            if events.send(event).await.is_err() {
                break;
            }
        }
    });
}

/// Outbound half of the broker connection. Calls only queue the request for
/// the event loop and never wait on the network.
trait Broker {
    fn publish(&self, topic: &str, retain: bool, payload: Vec<u8>) -> Result<(), ClientError>;
    fn subscribe(&self, topic: &str) -> Result<(), ClientError>;
}

impl Broker for AsyncClient {
    fn publish(&self, topic: &str, retain: bool, payload: Vec<u8>) -> Result<(), ClientError> {
        self.try_publish(topic, QoS::AtLeastOnce, retain, payload)
    }

    fn subscribe(&self, topic: &str) -> Result<(), ClientError> {
        self.try_subscribe(topic, QoS::AtLeastOnce)
    }
}

/// Sole owner of the controller. Every mutation, whether from a timer, the
/// broker or the web surface, runs to completion inside [`Scheduler::run`].
struct Scheduler<B = AsyncClient> {
    controller: Controller<LoggingTransmitter>,
    sensor: SimulatedRoom,
    settings_store: ConfigStore<FileRecordStore>,
    clock: ZonedClock,
    link: Connectivity,
    mqtt: B,
    max_payload_bytes: usize,
}

impl<B: Broker> Scheduler<B> {
    async fn run(
        mut self,
        timing: ControllerConfig,
        mut link_events: mpsc::Receiver<LinkEvent>,
        mut requests: mpsc::Receiver<WebRequest>,
    ) {
        let mut sample = interval_ms(timing.sample_interval_ms);
        let mut publish = interval_ms(timing.publish_interval_ms);
        let mut resync = interval_ms(timing.time_resync_interval_ms);
        resync.reset();

        loop {
            tokio::select! {
                _ = sample.tick() => self.sample_and_control(),
                _ = publish.tick() => self.publish_snapshot(),
                _ = resync.tick() => self.resync_clock(),
                Some(event) = link_events.recv() => self.handle_link_event(event),
                Some(request) = requests.recv() => self.handle_web_request(request),
            }
        }
    }

    fn sample_and_control(&mut self) {
        let sample = self.sensor.read_celsius();
        let now = self.clock.now();
        let outcome = self.controller.tick(sample, now, monotonic_ms());

        match outcome.status {
            TickStatus::NoReading => warn!("no temperature reading, relay held"),
            TickStatus::Evaluated(decision) => debug!("policy: {}", decision.as_str()),
            TickStatus::Manual => {}
        }
        if outcome.relay_changed {
            self.log_relay_status();
        }
        self.execute(outcome.effects());
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Up => {
                for action in self.link.on_connected() {
                    match action {
                        LinkAction::AnnounceOnline => {
                            if let Err(err) = self.mqtt.publish(
                                TOPIC_AVAILABILITY,
                                true,
                                AVAILABILITY_ONLINE.as_bytes().to_vec(),
                            ) {
                                warn!("availability publish failed: {err}");
                            }
                        }
                        LinkAction::SubscribeCommands => {
                            if let Err(err) = self.mqtt.subscribe(TOPIC_COMMAND) {
                                warn!("subscribe to {TOPIC_COMMAND} failed: {err}");
                            }
                        }
                        LinkAction::PublishSnapshot => self.publish_snapshot(),
                    }
                }
                info!("mqtt connected (reconnects: {})", self.link.reconnects());
            }
            LinkEvent::Down(err) => {
                let now_ms = monotonic_ms();
                if self.link.on_lost(now_ms) {
                    warn!("mqtt connection lost: {err}");
                } else {
                    debug!(
                        "mqtt still offline after {}ms: {err}",
                        self.link.offline_for_ms(now_ms)
                    );
                }
            }
            LinkEvent::Message { topic, payload } => {
                if topic != TOPIC_COMMAND {
                    debug!("ignoring message on {topic}");
                    return;
                }
                match RemoteCommand::parse(&payload, self.max_payload_bytes) {
                    Ok(command) => self.apply_commands(command.into_commands(), "mqtt"),
                    Err(err) => warn!("dropping command on {topic}: {err}"),
                }
            }
        }
    }

    fn handle_web_request(&mut self, request: WebRequest) {
        self.apply_commands(request.commands, "web");
        // The handler may have gone away; nothing to do about it here.
        let _ = request.reply.send(self.status_view());
    }

    fn apply_commands(&mut self, commands: Vec<Command>, source: &str) {
        if commands.is_empty() {
            return;
        }

        let outcome = self.controller.apply(&commands, self.clock.now());
        for field in &outcome.rejected {
            warn!("{source}: rejected out-of-range {}", field.as_str());
        }
        if outcome.relay_ignored > 0 {
            info!("{source}: relay command ignored in AUTO mode");
        }
        if outcome.mode_changed {
            info!("{source}: mode is now {}", self.controller.mode().as_str());
        }
        if outcome.relay_changed {
            self.log_relay_status();
        }
        self.execute(outcome.effects());
    }

    fn execute(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::PersistSettings => {
                    // The record write is blocking file I/O.
                    let persisted = tokio::task::block_in_place(|| {
                        self.settings_store.persist(self.controller.settings())
                    });
                    if let Err(err) = persisted {
                        warn!("failed to persist settings: {err}");
                    }
                }
                Effect::PublishState => self.publish_state(),
            }
        }
    }

    fn publish_snapshot(&self) {
        self.publish_state();
        self.publish_temperature();
    }

    fn publish_state(&self) {
        if !self.link.is_connected() {
            return;
        }
        match serde_json::to_vec(&self.controller.state_payload()) {
            Ok(body) => {
                if let Err(err) = self.mqtt.publish(TOPIC_STATE, true, body) {
                    warn!("state publish failed: {err}");
                }
            }
            Err(err) => warn!("state serialization failed: {err}"),
        }
    }

    fn publish_temperature(&self) {
        if !self.link.is_connected() {
            return;
        }
        let Some(payload) = self.controller.temperature_payload() else {
            return;
        };
        if let Err(err) = self
            .mqtt
            .publish(TOPIC_TEMPERATURE, false, payload.into_bytes())
        {
            warn!("temperature publish failed: {err}");
        }
    }

    fn resync_clock(&mut self) {
        if self.clock.resync() {
            info!(
                "utc offset for {} is now {}",
                self.clock.timezone(),
                self.clock.offset()
            );
        }
    }

    fn status_view(&self) -> StatusView {
        self.controller.status(
            self.clock.now(),
            monotonic_ms(),
            &self.link,
            self.clock.timezone(),
        )
    }

    fn log_relay_status(&self) {
        let temp = self
            .controller
            .reading()
            .map(|reading| format!("{:.2}°C", reading.celsius))
            .unwrap_or_else(|| "n/a".to_string());
        let relay = self.controller.relay();
        info!(
            "relay {} (mode {}, temp {}, last on period {}s, rf frames {})",
            self.controller.state_payload().state,
            self.controller.mode().as_str(),
            temp,
            relay.history().last_on_period_secs,
            relay.transmitter().sent_frames()
        );
    }
}

async fn handle_index(State(state): State<AppState>) -> Response {
    render(&state, Vec::new()).await
}

async fn handle_toggle_mode(State(state): State<AppState>) -> Response {
    render(&state, vec![Command::ToggleMode]).await
}

async fn handle_toggle_relay(State(state): State<AppState>) -> Response {
    render(&state, vec![Command::ToggleRelay]).await
}

async fn handle_update_settings(
    State(state): State<AppState>,
    Form(form): Form<SettingsForm>,
) -> Response {
    render(&state, form.into_commands()).await
}

async fn handle_get_status(State(state): State<AppState>) -> Response {
    match dispatch(&state, Vec::new()).await {
        Ok(view) => Json(view).into_response(),
        Err(response) => response,
    }
}

async fn render(state: &AppState, commands: Vec<Command>) -> Response {
    match dispatch(state, commands).await {
        Ok(view) => Html(render_status_page(&view)).into_response(),
        Err(response) => response,
    }
}

async fn dispatch(state: &AppState, commands: Vec<Command>) -> Result<StatusView, Response> {
    let (reply, view) = oneshot::channel();
    if state
        .requests
        .send(WebRequest { commands, reply })
        .await
        .is_err()
    {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Controller loop is not running",
        ));
    }
    view.await.map_err(|_| {
        error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Controller loop dropped the request",
        )
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn interval_ms(ms: u64) -> Interval {
    let mut interval = tokio::time::interval(Duration::from_millis(ms));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use thermorelay_common::{
        config::{RfHardwareConfig, SimulationConfig},
        ControlMode,
    };

    use super::*;

    fn form(pairs: &[(&str, &str)]) -> SettingsForm {
        let mut form = SettingsForm::default();
        for (key, value) in pairs {
            let value = Some((*value).to_string());
            match *key {
                "target_temp" => form.target_temp = value,
                "delta_temp" => form.delta_temp = value,
                "frost_protection_temp" => form.frost_protection_temp = value,
                "start_hour" => form.start_hour = value,
                "start_min" => form.start_min = value,
                "end_hour" => form.end_hour = value,
                "end_min" => form.end_min = value,
                _ => unreachable!("unknown form field {key}"),
            }
        }
        form
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Publish {
            topic: String,
            retain: bool,
            payload: String,
        },
        Subscribe(String),
    }

    #[derive(Default)]
    struct RecordingBroker {
        sent: std::sync::Mutex<Vec<Sent>>,
    }

    impl RecordingBroker {
        fn take(&self) -> Vec<Sent> {
            std::mem::take(&mut *self.sent.lock().unwrap())
        }
    }

    impl Broker for RecordingBroker {
        fn publish(&self, topic: &str, retain: bool, payload: Vec<u8>) -> Result<(), ClientError> {
            self.sent.lock().unwrap().push(Sent::Publish {
                topic: topic.to_string(),
                retain,
                payload: String::from_utf8(payload).unwrap(),
            });
            Ok(())
        }

        fn subscribe(&self, topic: &str) -> Result<(), ClientError> {
            self.sent
                .lock()
                .unwrap()
                .push(Sent::Subscribe(topic.to_string()));
            Ok(())
        }
    }

    fn scheduler(name: &str) -> (Scheduler<RecordingBroker>, std::path::PathBuf) {
        let dir = std::env::temp_dir().join(format!(
            "thermorelay-host-{}-{name}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);

        let heater = Arc::new(AtomicBool::new(false));
        let relay = RelayActuator::new(
            LoggingTransmitter::new(RfHardwareConfig::default(), heater.clone()),
            Duration::ZERO,
        );
        let scheduler = Scheduler {
            controller: Controller::new(Settings::default(), relay, 2_000),
            sensor: SimulatedRoom::new(&SimulationConfig::default(), heater),
            settings_store: ConfigStore::new(AppStore::in_dir(&dir).settings_store()),
            clock: ZonedClock::new("Europe/Berlin"),
            link: Connectivity::new(5_000),
            mqtt: RecordingBroker::default(),
            max_payload_bytes: 512,
        };
        (scheduler, dir)
    }

    #[test]
    fn settings_form_skips_blank_and_garbage_fields() {
        let commands = form(&[
            ("target_temp", " 22.5 "),
            ("delta_temp", ""),
            ("frost_protection_temp", "cold"),
            ("start_hour", "7"),
            ("end_min", "45"),
        ])
        .into_commands();

        assert_eq!(
            commands,
            vec![
                Command::Setting(SettingUpdate::TargetTemp(22.5)),
                Command::Setting(SettingUpdate::StartHour(7.0)),
                Command::Setting(SettingUpdate::EndMin(45.0)),
            ]
        );
    }

    #[test]
    fn web_toggles_go_through_the_scheduler() {
        let (mut scheduler, dir) = scheduler("web-toggles");

        let (reply, mut view) = oneshot::channel();
        scheduler.handle_web_request(WebRequest {
            commands: vec![Command::ToggleMode, Command::ToggleRelay],
            reply,
        });
        let view = view.try_recv().unwrap();

        assert_eq!(view.mode, "MANUAL");
        assert!(view.relay_on);
        assert_eq!(scheduler.controller.mode(), ControlMode::Manual);
        assert_eq!(scheduler.controller.relay().transmitter().arm_count(), 1);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn mqtt_batch_persists_once_and_malformed_is_dropped() {
        let (mut scheduler, dir) = scheduler("mqtt-batch");

        scheduler.handle_link_event(LinkEvent::Message {
            topic: TOPIC_COMMAND.to_string(),
            payload: br#"{"target_temp":19.0,"delta_temp":1.5,"end_hour":21}"#.to_vec(),
        });
        scheduler.handle_link_event(LinkEvent::Message {
            topic: TOPIC_COMMAND.to_string(),
            payload: br#"{"target_temp":"warm","delta_temp":3}"#.to_vec(),
        });

        assert_eq!(scheduler.settings_store.writes(), 1);
        assert_eq!(scheduler.controller.settings().target_temp, 19.0);
        assert_eq!(scheduler.controller.settings().delta_temp, 1.5);
        assert_eq!(scheduler.controller.settings().end_hour, 21);
        assert_eq!(
            std::fs::read(dir.join("settings.bin")).unwrap().len(),
            thermorelay_common::record::RECORD_LEN
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn persisting_from_inside_the_runtime_keeps_it_running() {
        let (mut scheduler, dir) = scheduler("persist-in-runtime");

        let other = tokio::spawn(async { 7 });
        scheduler.handle_link_event(LinkEvent::Message {
            topic: TOPIC_COMMAND.to_string(),
            payload: br#"{"mode":"MANUAL","start_hour":7.0,"end_min":30.5}"#.to_vec(),
        });

        assert_eq!(other.await.unwrap(), 7);
        assert_eq!(scheduler.settings_store.writes(), 1);
        assert_eq!(scheduler.controller.mode(), ControlMode::Manual);
        assert_eq!(scheduler.controller.settings().start_hour, 7);
        assert_eq!(scheduler.controller.settings().end_min, 0);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn connect_and_loss_track_link_state() {
        let (mut scheduler, dir) = scheduler("link");

        scheduler.handle_link_event(LinkEvent::Up);
        assert!(scheduler.link.is_connected());

        scheduler.handle_link_event(LinkEvent::Down("connection reset".to_string()));
        scheduler.handle_link_event(LinkEvent::Up);

        assert_eq!(scheduler.link.reconnects(), 1);
        assert_eq!(scheduler.link.losses(), 1);
        assert!(scheduler.status_view().mqtt_connected);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reconnect_announces_subscribes_and_republishes() {
        let (mut scheduler, dir) = scheduler("reconnect-traffic");

        scheduler.handle_link_event(LinkEvent::Up);
        scheduler.handle_link_event(LinkEvent::Down("connection reset".to_string()));
        scheduler.mqtt.take();

        // Offline: the reading is taken but nothing goes out.
        scheduler.sample_and_control();
        assert_eq!(scheduler.mqtt.take(), Vec::new());

        scheduler.handle_link_event(LinkEvent::Up);
        let sent = scheduler.mqtt.take();

        assert_eq!(sent.len(), 4);
        assert_eq!(
            sent[0],
            Sent::Publish {
                topic: TOPIC_AVAILABILITY.to_string(),
                retain: true,
                payload: AVAILABILITY_ONLINE.to_string(),
            }
        );
        assert_eq!(sent[1], Sent::Subscribe(TOPIC_COMMAND.to_string()));
        let Sent::Publish {
            topic,
            retain,
            payload,
        } = &sent[2]
        else {
            panic!("expected state publish, got {:?}", sent[2]);
        };
        assert_eq!(topic, TOPIC_STATE);
        assert!(retain);
        let state: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(state["mode"], "AUTO");
        assert_eq!(
            sent[3],
            Sent::Publish {
                topic: TOPIC_TEMPERATURE.to_string(),
                retain: false,
                payload: "18.00".to_string(),
            }
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
