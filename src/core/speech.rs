//! Optional voice input.
//!
//! Recognition runs behind the [`SpeechInput`] trait so the chat loop works
//! identically with or without a recognizer. [`CommandSpeechInput`] shells out
//! to a user-configured program that records one utterance and prints the
//! transcript on stdout.

use std::fmt;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Exit status a recognizer uses to report that microphone access was denied
/// (`EX_NOPERM` from sysexits.h).
pub const EXIT_PERMISSION_DENIED: i32 = 77;
pub const SPEECH_LANGUAGE: &str = "en-US";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechErrorKind {
    PermissionDenied,
    NoSpeech,
    Unavailable,
    Other(String),
}

impl SpeechErrorKind {
    pub fn user_message(&self) -> String {
        match self {
            SpeechErrorKind::PermissionDenied => {
                "Microphone access was denied. Allow microphone access and try again.".to_string()
            }
            SpeechErrorKind::NoSpeech => "No speech was detected. Please try again.".to_string(),
            SpeechErrorKind::Unavailable => {
                "Voice input is not available. Set speech_command in the config to enable it."
                    .to_string()
            }
            SpeechErrorKind::Other(detail) => format!("Speech recognition failed: {detail}"),
        }
    }
}

impl fmt::Display for SpeechErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Transcript(String),
    Error(SpeechErrorKind),
    Ended,
}

/// Delivers events for one recognition pass, tagged with the pass id so a
/// late event from a stopped pass can be told apart.
#[derive(Clone)]
pub struct SpeechSink {
    pass: u64,
    tx: mpsc::UnboundedSender<(u64, SpeechEvent)>,
}

impl SpeechSink {
    pub fn emit(&self, event: SpeechEvent) {
        let _ = self.tx.send((self.pass, event));
    }
}

pub trait SpeechInput: Send + Sync {
    fn is_available(&self) -> bool;

    /// Begin a single, non-continuous recognition pass.
    fn start(&self, sink: SpeechSink) -> Result<(), SpeechErrorKind>;

    fn stop(&self);
}

/// What the UI should do after a speech event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechUpdate {
    /// Replace the pending input with this text.
    Transcript(String),
    Failed(String),
    Ended,
}

pub struct SpeechAdapter {
    input: Arc<dyn SpeechInput>,
    listening: bool,
    pass: u64,
    tx: mpsc::UnboundedSender<(u64, SpeechEvent)>,
    rx: mpsc::UnboundedReceiver<(u64, SpeechEvent)>,
}

impl SpeechAdapter {
    pub fn new(input: Arc<dyn SpeechInput>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            input,
            listening: false,
            pass: 0,
            tx,
            rx,
        }
    }

    pub fn is_available(&self) -> bool {
        self.input.is_available()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn start_listening(&mut self) -> Result<(), SpeechErrorKind> {
        if !self.input.is_available() {
            return Err(SpeechErrorKind::Unavailable);
        }
        if self.listening {
            return Ok(());
        }
        self.pass += 1;
        let sink = SpeechSink {
            pass: self.pass,
            tx: self.tx.clone(),
        };
        self.input.start(sink)?;
        self.listening = true;
        tracing::debug!(pass = self.pass, "speech recognition started");
        Ok(())
    }

    pub fn stop_listening(&mut self) {
        if !self.listening {
            return;
        }
        self.input.stop();
        self.listening = false;
    }

    pub fn toggle(&mut self) -> Result<(), SpeechErrorKind> {
        if self.listening {
            self.stop_listening();
            Ok(())
        } else {
            self.start_listening()
        }
    }

    /// Drain one pending event without blocking.
    pub fn poll(&mut self) -> Option<SpeechUpdate> {
        while let Ok((pass, event)) = self.rx.try_recv() {
            if let Some(update) = self.handle(pass, event) {
                return Some(update);
            }
        }
        None
    }

    fn handle(&mut self, pass: u64, event: SpeechEvent) -> Option<SpeechUpdate> {
        if pass != self.pass {
            tracing::debug!(pass, current = self.pass, "ignoring event from an old speech pass");
            return None;
        }
        let was_listening = self.listening;
        self.listening = false;
        match event {
            SpeechEvent::Transcript(text) => Some(SpeechUpdate::Transcript(text)),
            SpeechEvent::Error(kind) => {
                tracing::warn!(error = ?kind, "speech recognition error");
                Some(SpeechUpdate::Failed(kind.user_message()))
            }
            SpeechEvent::Ended if was_listening => Some(SpeechUpdate::Ended),
            SpeechEvent::Ended => None,
        }
    }
}

/// Speech input backed by an external recognizer command.
pub struct CommandSpeechInput {
    command: Option<Vec<String>>,
    active: Mutex<Option<CancellationToken>>,
}

impl CommandSpeechInput {
    pub fn new(command: Option<&str>) -> Self {
        let command = command
            .map(|line| {
                line.split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty());
        Self {
            command,
            active: Mutex::new(None),
        }
    }
}

impl SpeechInput for CommandSpeechInput {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    fn start(&self, sink: SpeechSink) -> Result<(), SpeechErrorKind> {
        let Some(words) = self.command.clone() else {
            return Err(SpeechErrorKind::Unavailable);
        };
        let token = CancellationToken::new();
        if let Ok(mut active) = self.active.lock() {
            if let Some(previous) = active.replace(token.clone()) {
                previous.cancel();
            }
        }

        let mut command = tokio::process::Command::new(&words[0]);
        command
            .args(&words[1..])
            .env("CHATPDF_SPEECH_LANG", SPEECH_LANGUAGE)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let child = command.spawn().map_err(|err| match err.kind() {
            std::io::ErrorKind::PermissionDenied => SpeechErrorKind::PermissionDenied,
            std::io::ErrorKind::NotFound => {
                SpeechErrorKind::Other(format!("recognizer '{}' not found", words[0]))
            }
            _ => SpeechErrorKind::Other(err.to_string()),
        })?;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    sink.emit(SpeechEvent::Ended);
                }
                output = child.wait_with_output() => {
                    match output {
                        Ok(output) => {
                            let stdout = String::from_utf8_lossy(&output.stdout);
                            let stderr = String::from_utf8_lossy(&output.stderr);
                            sink.emit(classify_output(output.status.code(), &stdout, &stderr));
                        }
                        Err(err) => {
                            sink.emit(SpeechEvent::Error(SpeechErrorKind::Other(err.to_string())));
                        }
                    }
                    sink.emit(SpeechEvent::Ended);
                }
            }
        });
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut active) = self.active.lock() {
            if let Some(token) = active.take() {
                token.cancel();
            }
        }
    }
}

/// Turn a finished recognizer run into a single event.
pub fn classify_output(code: Option<i32>, stdout: &str, stderr: &str) -> SpeechEvent {
    let transcript = stdout.trim();
    match code {
        Some(0) if !transcript.is_empty() => SpeechEvent::Transcript(transcript.to_string()),
        Some(0) => SpeechEvent::Error(SpeechErrorKind::NoSpeech),
        Some(EXIT_PERMISSION_DENIED) => SpeechEvent::Error(SpeechErrorKind::PermissionDenied),
        _ => {
            let lowered = stderr.to_ascii_lowercase();
            if lowered.contains("permission denied") || lowered.contains("not-allowed") {
                SpeechEvent::Error(SpeechErrorKind::PermissionDenied)
            } else if lowered.contains("no-speech") || lowered.contains("no speech") {
                SpeechEvent::Error(SpeechErrorKind::NoSpeech)
            } else {
                let detail = stderr.trim();
                let detail = if detail.is_empty() {
                    match code {
                        Some(code) => format!("recognizer exited with status {code}"),
                        None => "recognizer was terminated by a signal".to_string(),
                    }
                } else {
                    detail.lines().last().unwrap_or(detail).to_string()
                };
                SpeechEvent::Error(SpeechErrorKind::Other(detail))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Recognizer fake that hands the sink back to the test.
    #[derive(Default)]
    struct ScriptedInput {
        sinks: Mutex<Vec<SpeechSink>>,
        stops: AtomicUsize,
    }

    impl SpeechInput for ScriptedInput {
        fn is_available(&self) -> bool {
            true
        }

        fn start(&self, sink: SpeechSink) -> Result<(), SpeechErrorKind> {
            self.sinks.lock().unwrap().push(sink);
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl ScriptedInput {
        fn last_sink(&self) -> SpeechSink {
            self.sinks.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[test]
    fn transcript_clears_listening() {
        let input = Arc::new(ScriptedInput::default());
        let mut adapter = SpeechAdapter::new(input.clone());

        adapter.start_listening().unwrap();
        assert!(adapter.is_listening());
        input
            .last_sink()
            .emit(SpeechEvent::Transcript("what is chapter two".into()));

        assert_eq!(
            adapter.poll(),
            Some(SpeechUpdate::Transcript("what is chapter two".into()))
        );
        assert!(!adapter.is_listening());
    }

    #[test]
    fn errors_map_to_distinct_messages() {
        let input = Arc::new(ScriptedInput::default());
        let mut adapter = SpeechAdapter::new(input.clone());

        let mut messages = Vec::new();
        for kind in [
            SpeechErrorKind::PermissionDenied,
            SpeechErrorKind::NoSpeech,
            SpeechErrorKind::Other("boom".into()),
        ] {
            adapter.start_listening().unwrap();
            input.last_sink().emit(SpeechEvent::Error(kind));
            match adapter.poll() {
                Some(SpeechUpdate::Failed(message)) => messages.push(message),
                other => panic!("unexpected update: {other:?}"),
            }
            assert!(!adapter.is_listening());
        }
        messages.dedup();
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn stop_is_idempotent() {
        let input = Arc::new(ScriptedInput::default());
        let mut adapter = SpeechAdapter::new(input.clone());

        adapter.stop_listening();
        assert_eq!(input.stops.load(Ordering::SeqCst), 0);

        adapter.start_listening().unwrap();
        adapter.stop_listening();
        adapter.stop_listening();
        assert_eq!(input.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_from_a_stopped_pass_are_ignored() {
        let input = Arc::new(ScriptedInput::default());
        let mut adapter = SpeechAdapter::new(input.clone());

        adapter.start_listening().unwrap();
        let old = input.last_sink();
        adapter.stop_listening();
        adapter.start_listening().unwrap();

        old.emit(SpeechEvent::Transcript("late".into()));
        assert_eq!(adapter.poll(), None);
        assert!(adapter.is_listening());
    }

    #[test]
    fn missing_command_means_unavailable() {
        let mut adapter = SpeechAdapter::new(Arc::new(CommandSpeechInput::new(None)));
        assert!(!adapter.is_available());
        assert_eq!(adapter.start_listening(), Err(SpeechErrorKind::Unavailable));

        let blank = CommandSpeechInput::new(Some("   "));
        assert!(!blank.is_available());
    }

    #[test]
    fn recognizer_output_is_classified() {
        assert_eq!(
            classify_output(Some(0), "  hello there \n", ""),
            SpeechEvent::Transcript("hello there".into())
        );
        assert_eq!(
            classify_output(Some(0), "\n", ""),
            SpeechEvent::Error(SpeechErrorKind::NoSpeech)
        );
        assert_eq!(
            classify_output(Some(EXIT_PERMISSION_DENIED), "", ""),
            SpeechEvent::Error(SpeechErrorKind::PermissionDenied)
        );
        assert_eq!(
            classify_output(Some(1), "", "error: not-allowed"),
            SpeechEvent::Error(SpeechErrorKind::PermissionDenied)
        );
        assert!(matches!(
            classify_output(Some(2), "", "device busy\n"),
            SpeechEvent::Error(SpeechErrorKind::Other(detail)) if detail == "device busy"
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_transcript_reaches_adapter() {
        let input = Arc::new(CommandSpeechInput::new(Some("echo summarize the introduction")));
        let mut adapter = SpeechAdapter::new(input);
        adapter.start_listening().unwrap();

        let mut update = None;
        for _ in 0..100 {
            update = adapter.poll();
            if update.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            update,
            Some(SpeechUpdate::Transcript("summarize the introduction".into()))
        );
    }
}
