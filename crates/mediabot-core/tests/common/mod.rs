#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mediabot_core::access::LockState;
use mediabot_core::commands::{BotContext, CommandTable};
use mediabot_core::config::{Config, ConfigStore};
use mediabot_core::control::ProcessControl;
use mediabot_core::player::{Backend, Player, SharedPlayer};
use mediabot_core::processor::CommandProcessor;
use mediabot_core::services::{Service, ServiceManager};
use mediabot_core::streamer::Streamer;
use mediabot_core::track::{Track, TrackList};
use mediabot_core::translator::StaticTranslator;
use mediabot_core::transport::{MessageTarget, Transport, User};
use mediabot_core::workers::Workers;
use mediabot_core::{Error, Result};
use tempfile::TempDir;

#[derive(Default)]
pub struct RecordingTransport {
    messages: Mutex<Vec<(String, MessageTarget)>>,
    nickname: Mutex<String>,
    status: Mutex<String>,
    voice: AtomicBool,
}

impl RecordingTransport {
    pub fn messages(&self) -> Vec<(String, MessageTarget)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn channel(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(_, t)| *t == MessageTarget::Channel)
            .map(|(m, _)| m)
            .collect()
    }

    pub fn sent_to(&self, user: &User) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(_, t)| matches!(t, MessageTarget::User(u) if u.identity == user.identity))
            .map(|(m, _)| m)
            .collect()
    }

    pub fn nickname(&self) -> String {
        self.nickname.lock().unwrap().clone()
    }

    pub fn status(&self) -> String {
        self.status.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn send_message(&self, text: &str, target: MessageTarget) {
        self.messages.lock().unwrap().push((text.to_string(), target));
    }

    fn change_nickname(&self, nickname: &str) {
        *self.nickname.lock().unwrap() = nickname.to_string();
    }

    fn change_status_text(&self, text: &str) {
        *self.status.lock().unwrap() = text.to_string();
    }

    fn enable_voice_transmission(&self) {
        self.voice.store(true, Ordering::SeqCst);
    }

    fn disable_voice_transmission(&self) {
        self.voice.store(false, Ordering::SeqCst);
    }

    fn is_voice_transmission_enabled(&self) -> bool {
        self.voice.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeBackend {
    played: Mutex<Vec<String>>,
    position: Mutex<f64>,
    volume: Mutex<f32>,
}

impl FakeBackend {
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock().unwrap()
    }
}

impl Backend for FakeBackend {
    fn play(&self, track: &Track) {
        self.played.lock().unwrap().push(track.url.clone());
        *self.position.lock().unwrap() = 0.0;
    }
    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
    fn set_volume(&self, level: f32) {
        *self.volume.lock().unwrap() = level;
    }
    fn set_rate(&self, _rate: f64) {}
    fn position(&self) -> Option<f64> {
        Some(*self.position.lock().unwrap())
    }
    fn set_position(&self, fraction: f64) {
        *self.position.lock().unwrap() = fraction;
    }
}

/// Answers "jazz" with two stations and "broken" with a service failure.
pub struct CatalogService {
    name: &'static str,
}

impl CatalogService {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

#[async_trait]
impl Service for CatalogService {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(&self, query: &str) -> Result<TrackList> {
        match query {
            "jazz" => Ok(vec![
                Track::named("Jazz FM", "http://jazz/fm"),
                Track::named("Jazz 24", "http://jazz/24"),
            ]),
            "broken" => Err(Error::Service("upstream timeout".into())),
            _ => Err(Error::NothingFound),
        }
    }
}

/// http urls resolve to one track; local paths need admin.
pub struct FakeStreamer;

#[async_trait]
impl Streamer for FakeStreamer {
    async fn get(&self, url: &str, is_admin: bool) -> Result<TrackList> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(vec![Track::new(url)]);
        }
        if url.starts_with('/') {
            if !is_admin {
                return Err(Error::IncorrectProtocol);
            }
            return Err(Error::PathNotFound);
        }
        if url.starts_with("dead://") {
            return Err(Error::Service("no stream".into()));
        }
        Err(Error::IncorrectProtocol)
    }
}

#[derive(Default)]
pub struct RecordingControl {
    quit: AtomicBool,
    restart: AtomicBool,
}

impl RecordingControl {
    pub fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::SeqCst)
    }

    pub fn restart_requested(&self) -> bool {
        self.restart.load(Ordering::SeqCst)
    }
}

impl ProcessControl for RecordingControl {
    fn quit(&self) {
        self.quit.store(true, Ordering::SeqCst);
    }

    fn restart(&self) {
        self.restart.store(true, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub processor: Arc<CommandProcessor>,
    pub transport: Arc<RecordingTransport>,
    pub backend: Arc<FakeBackend>,
    pub control: Arc<RecordingControl>,
    pub translator: Arc<StaticTranslator>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_table(CommandTable::standard())
    }

    pub fn with_table(table: CommandTable) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.users.admins = vec!["alice".into()];
        config.users.banned_users = vec!["mallory".into()];
        config.services.default = "catalog".into();

        let backend = Arc::new(FakeBackend::default());
        let transport = Arc::new(RecordingTransport::default());
        let control = Arc::new(RecordingControl::default());
        let translator = Arc::new(StaticTranslator::default());
        let available: Vec<Arc<dyn Service>> = vec![
            Arc::new(CatalogService::new("catalog")),
            Arc::new(CatalogService::new("backup")),
        ];
        let services = ServiceManager::new(available, &config.services.default).unwrap();

        let ctx = BotContext {
            player: Player::new(backend.clone(), &config.player).shared(),
            locks: Arc::new(LockState::default()),
            services: Arc::new(services),
            streamer: Arc::new(FakeStreamer),
            transport: transport.clone(),
            translator: translator.clone(),
            control: control.clone(),
            workers: Workers::new(2, transport.clone()),
            max_volume: config.player.max_volume,
            config: Arc::new(ConfigStore::new(config, dir.path().join("config.toml"))),
        };
        let processor = Arc::new(CommandProcessor::new(Arc::new(ctx), table));
        Self {
            processor,
            transport,
            backend,
            control,
            translator,
            dir,
        }
    }

    pub async fn send(&self, message: &str, user: &User) -> Option<String> {
        self.processor.dispatch(message, user).await
    }

    pub async fn wait_idle(&self) {
        self.processor.context().workers.wait_idle().await;
    }

    pub fn player(&self) -> &SharedPlayer {
        &self.processor.context().player
    }

    pub fn config(&self) -> &ConfigStore {
        &self.processor.context().config
    }

    /// Start playing `n` numbered tracks from the first.
    pub async fn load(&self, n: usize) {
        self.player().lock().await.play(tracks(n), 0).unwrap();
    }
}

pub fn tracks(n: usize) -> TrackList {
    (1..=n)
        .map(|i| Track::named(format!("track {i}"), format!("http://host/{i}")))
        .collect()
}

pub fn bob() -> User {
    User::new("Bob", "bob")
}

pub fn alice() -> User {
    User::new("Alice", "alice").admin()
}

pub fn mallory() -> User {
    User::new("Mallory", "mallory")
}
