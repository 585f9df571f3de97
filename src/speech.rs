//! Speech adapter
//!
//! Speaks assistant replies. With a speech key configured, audio comes from
//! the remote synthesizer and goes to an `AudioOutput`; otherwise (or when
//! the remote call fails) an on-device `LocalVoice` is used. Without a
//! local voice, speaking is a no-op. Only one utterance plays at a time.

use crate::elevenlabs::SpeechSynthesizer;
use crate::logging;
use crate::settings::{SecretSlot, SettingsStore};
use async_trait::async_trait;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::process::{Child, Command};

/// Speaking rate for the on-device voice, relative to normal
pub const LOCAL_VOICE_RATE: f32 = 0.9;

const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// On-device synthesis
#[async_trait]
pub trait LocalVoice: Send + Sync {
    fn is_available(&self) -> bool;
    /// Start speaking; resolves once playback has started
    async fn speak(&self, text: &str, rate: f32) -> Result<(), Box<dyn Error + Send + Sync>>;
    fn cancel(&self);
    fn is_playing(&self) -> bool;
}

/// Playback of encoded audio from the remote synthesizer
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Start playback; resolves once playback has started
    async fn play(&self, audio: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>>;
    fn stop(&self);
    fn is_playing(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Remote,
    Local,
}

pub struct SpeechAdapter {
    settings: Arc<SettingsStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    voice: Option<Arc<dyn LocalVoice>>,
    active: Mutex<Option<Channel>>,
}

impl SpeechAdapter {
    pub fn new(
        settings: Arc<SettingsStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        output: Arc<dyn AudioOutput>,
        voice: Option<Arc<dyn LocalVoice>>,
    ) -> Self {
        Self {
            settings,
            synthesizer,
            output,
            voice,
            active: Mutex::new(None),
        }
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<Channel>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_speaking(&self) -> bool {
        match *self.active() {
            Some(Channel::Remote) => self.output.is_playing(),
            Some(Channel::Local) => self.voice.as_ref().map(|v| v.is_playing()).unwrap_or(false),
            None => false,
        }
    }

    /// Halt whatever is playing. Safe to call when nothing is.
    pub fn stop(&self) {
        let channel = self.active().take();
        match channel {
            Some(Channel::Remote) => self.output.stop(),
            Some(Channel::Local) => {
                if let Some(voice) = &self.voice {
                    voice.cancel();
                }
            }
            None => {}
        }
    }

    /// Speak `text`, interrupting any current utterance. Failures are logged
    /// and fall through to the next option; nothing is returned to the caller.
    pub async fn speak(&self, text: &str) {
        self.stop();
        if text.trim().is_empty() {
            return;
        }

        let api_key = match self.settings.secret(SecretSlot::Speech) {
            Ok(key) => key,
            Err(e) => {
                logging::log_error(None, &format!("Could not read speech key: {}", e));
                None
            }
        };

        if let Some(key) = api_key {
            match self.speak_remote(&key, text).await {
                Ok(()) => {
                    *self.active() = Some(Channel::Remote);
                    return;
                }
                Err(e) => logging::log_speech(&format!("Remote synthesis failed, using local voice: {}", e)),
            }
        }

        self.speak_locally(text).await;
    }

    async fn speak_remote(&self, api_key: &str, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        let audio = self.synthesizer.synthesize(api_key, text).await?;
        logging::log_speech(&format!("Synthesized {} bytes", audio.len()));
        self.output.play(audio).await
    }

    async fn speak_locally(&self, text: &str) {
        let Some(voice) = self.voice.as_ref().filter(|v| v.is_available()) else {
            logging::log_speech("No local voice available, skipping");
            return;
        };
        match voice.speak(text, LOCAL_VOICE_RATE).await {
            Ok(()) => *self.active() = Some(Channel::Local),
            Err(e) => logging::log_error(None, &format!("Local voice failed: {}", e)),
        }
    }
}

// ============ Process-backed implementations ============

/// Look a program up on PATH
fn find_program(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn child_running(child: &Mutex<Option<Child>>) -> bool {
    let mut guard = child.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    match guard.as_mut() {
        Some(c) => matches!(c.try_wait(), Ok(None)),
        None => false,
    }
}

fn kill_child(child: &Mutex<Option<Child>>) {
    let mut guard = child.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(mut c) = guard.take() {
        // Already exited is fine
        let _ = c.start_kill();
    }
}

/// Speaks through `say` (macOS) or `espeak` (elsewhere) if installed
pub struct SystemVoice {
    program: Option<PathBuf>,
    child: Mutex<Option<Child>>,
}

impl Default for SystemVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemVoice {
    pub fn new() -> Self {
        let program = ["say", "espeak-ng", "espeak"].iter().find_map(|p| find_program(p));
        Self {
            program,
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LocalVoice for SystemVoice {
    fn is_available(&self) -> bool {
        self.program.is_some()
    }

    async fn speak(&self, text: &str, rate: f32) -> Result<(), Box<dyn Error + Send + Sync>> {
        let program = self.program.as_ref().ok_or("No system voice installed")?;
        let words_per_minute = (BASE_WORDS_PER_MINUTE * rate).round().to_string();
        let rate_flag = if program.ends_with("say") { "-r" } else { "-s" };

        let child = Command::new(program)
            .arg(rate_flag)
            .arg(words_per_minute)
            .arg(text)
            .kill_on_drop(true)
            .spawn()?;

        kill_child(&self.child);
        *self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(child);
        Ok(())
    }

    fn cancel(&self) {
        kill_child(&self.child);
    }

    fn is_playing(&self) -> bool {
        child_running(&self.child)
    }
}

/// Writes audio to a file and plays it with `afplay`, `mpg123` or `ffplay`
/// when one is installed
pub struct FileAudioOutput {
    path: PathBuf,
    player: Option<PathBuf>,
    child: Mutex<Option<Child>>,
}

impl FileAudioOutput {
    pub fn new(dir: &Path) -> Self {
        let player = ["afplay", "mpg123", "ffplay"].iter().find_map(|p| find_program(p));
        Self {
            path: dir.join("last-utterance.mp3"),
            player,
            child: Mutex::new(None),
        }
    }
}

#[async_trait]
impl AudioOutput for FileAudioOutput {
    async fn play(&self, audio: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>> {
        tokio::fs::write(&self.path, &audio).await?;
        let player = self.player.as_ref().ok_or("No audio player installed")?;

        let mut command = Command::new(player);
        if player.ends_with("ffplay") {
            command.args(["-nodisp", "-autoexit", "-loglevel", "quiet"]);
        } else if player.ends_with("mpg123") {
            command.arg("-q");
        }
        let child = command.arg(&self.path).kill_on_drop(true).spawn()?;

        kill_child(&self.child);
        *self.child.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(child);
        Ok(())
    }

    fn stop(&self) {
        kill_child(&self.child);
    }

    fn is_playing(&self) -> bool {
        child_running(&self.child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct FakeSynth {
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeSynth {
        async fn synthesize(&self, _api_key: &str, _text: &str) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err("Voice API error (401)".into())
            } else {
                Ok(vec![0xFF, 0xFB, 0x90])
            }
        }
    }

    #[derive(Default)]
    struct FakeOutput {
        playing: AtomicBool,
        plays: AtomicUsize,
        stops: AtomicUsize,
    }

    #[async_trait]
    impl AudioOutput for FakeOutput {
        async fn play(&self, _audio: Vec<u8>) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct FakeVoice {
        spoken: Mutex<Vec<(String, f32)>>,
        playing: AtomicBool,
        cancels: AtomicUsize,
    }

    #[async_trait]
    impl LocalVoice for FakeVoice {
        fn is_available(&self) -> bool {
            true
        }

        async fn speak(&self, text: &str, rate: f32) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.spoken.lock().unwrap().push((text.to_string(), rate));
            self.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
            self.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::SeqCst)
        }
    }

    struct Rig {
        adapter: SpeechAdapter,
        synth: Arc<FakeSynth>,
        output: Arc<FakeOutput>,
        voice: Arc<FakeVoice>,
    }

    fn rig(with_key: bool, synth_fails: bool, with_voice: bool) -> Rig {
        let settings = SettingsStore::new(Arc::new(Database::open_in_memory().unwrap()));
        if with_key {
            settings.set_secret(SecretSlot::Speech, "xi-test").unwrap();
        }
        let synth = Arc::new(FakeSynth {
            fail: synth_fails,
            calls: AtomicUsize::new(0),
        });
        let output = Arc::new(FakeOutput::default());
        let voice = Arc::new(FakeVoice::default());
        let local: Option<Arc<dyn LocalVoice>> = if with_voice { Some(voice.clone()) } else { None };
        let adapter = SpeechAdapter::new(Arc::new(settings), synth.clone(), output.clone(), local);
        Rig {
            adapter,
            synth,
            output,
            voice,
        }
    }

    #[test]
    fn test_stop_when_idle_is_harmless() {
        let rig = rig(true, false, true);
        rig.adapter.stop();
        rig.adapter.stop();
        assert!(!rig.adapter.is_speaking());
        assert_eq!(rig.output.stops.load(Ordering::SeqCst), 0);
        assert_eq!(rig.voice.cancels.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_remote_voice_with_key() {
        let rig = rig(true, false, true);
        rig.adapter.speak("Breathe in.").await;
        assert!(rig.adapter.is_speaking());
        assert_eq!(rig.output.plays.load(Ordering::SeqCst), 1);
        assert!(rig.voice.spoken.lock().unwrap().is_empty());

        rig.adapter.stop();
        assert!(!rig.adapter.is_speaking());
        assert_eq!(rig.output.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_speak_interrupts_current_utterance() {
        let rig = rig(true, false, true);
        rig.adapter.speak("First").await;
        rig.adapter.speak("Second").await;
        assert_eq!(rig.output.stops.load(Ordering::SeqCst), 1);
        assert_eq!(rig.output.plays.load(Ordering::SeqCst), 2);
        assert!(rig.adapter.is_speaking());
    }

    #[tokio::test]
    async fn test_local_voice_without_key() {
        let rig = rig(false, false, true);
        rig.adapter.speak("Hello there").await;
        assert_eq!(rig.synth.calls.load(Ordering::SeqCst), 0);
        let spoken = rig.voice.spoken.lock().unwrap().clone();
        assert_eq!(spoken, vec![("Hello there".to_string(), LOCAL_VOICE_RATE)]);
        assert!(rig.adapter.is_speaking());
    }

    #[tokio::test]
    async fn test_remote_failure_falls_back_to_local() {
        let rig = rig(true, true, true);
        rig.adapter.speak("Hello there").await;
        assert_eq!(rig.synth.calls.load(Ordering::SeqCst), 1);
        assert_eq!(rig.output.plays.load(Ordering::SeqCst), 0);
        assert_eq!(rig.voice.spoken.lock().unwrap().len(), 1);

        rig.adapter.stop();
        assert_eq!(rig.voice.cancels.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_voice_at_all_is_noop() {
        let rig = rig(false, false, false);
        rig.adapter.speak("Hello there").await;
        assert!(!rig.adapter.is_speaking());
        rig.adapter.stop();
    }
}
