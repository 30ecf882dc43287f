//! Optional voice input and output around the text conversation.
//!
//! Speech is always best-effort: an unavailable or failing adapter falls
//! back to the text path and never blocks a session.

use tracing::{debug, warn};

use crate::error::ChatError;

/// Speech-to-text adapter.
pub trait SpeechInput: Send {
    fn is_available(&self) -> bool;

    /// Listen for one utterance. `Ok(None)` means nothing was heard.
    fn listen(&mut self) -> Result<Option<String>, ChatError>;
}

/// Text-to-speech adapter.
pub trait SpeechOutput: Send {
    fn is_available(&self) -> bool;

    fn speak(&mut self, text: &str) -> Result<(), ChatError>;
}

/// Pairs optional speech adapters with the text reader.
#[derive(Default)]
pub struct SpeechBridge {
    input: Option<Box<dyn SpeechInput>>,
    output: Option<Box<dyn SpeechOutput>>,
}

impl SpeechBridge {
    /// A bridge with no adapters; everything goes through text.
    pub fn text_only() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: Box<dyn SpeechInput>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_output(mut self, output: Box<dyn SpeechOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn voice_enabled(&self) -> bool {
        self.input.as_ref().is_some_and(|i| i.is_available())
    }

    /// Read one patient turn: voice when available and it hears something,
    /// otherwise `text_fallback`.
    pub fn read_turn<F>(&mut self, text_fallback: F) -> Option<String>
    where
        F: FnOnce() -> Option<String>,
    {
        if let Some(input) = self.input.as_mut().filter(|i| i.is_available()) {
            match input.listen() {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    debug!(chars = text.len(), "Heard patient turn");
                    return Some(text);
                }
                Ok(_) => debug!("Nothing heard, reading text"),
                Err(e) => warn!(error = %e, "Speech input failed, reading text"),
            }
        }
        text_fallback()
    }

    /// Speak `text` if an output adapter is available.
    pub fn announce(&mut self, text: &str) {
        let Some(output) = self.output.as_mut().filter(|o| o.is_available()) else {
            return;
        };
        if let Err(e) = output.speak(text) {
            warn!(error = %e, "Speech output failed");
        }
    }
}

impl std::fmt::Debug for SpeechBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechBridge")
            .field("input", &self.input.is_some())
            .field("output", &self.output.is_some())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    struct ScriptedInput {
        available: bool,
        heard: VecDeque<Result<Option<String>, ChatError>>,
    }

    impl SpeechInput for ScriptedInput {
        fn is_available(&self) -> bool {
            self.available
        }

        fn listen(&mut self) -> Result<Option<String>, ChatError> {
            self.heard.pop_front().unwrap_or(Ok(None))
        }
    }

    struct RecordingOutput {
        spoken: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl SpeechOutput for RecordingOutput {
        fn is_available(&self) -> bool {
            true
        }

        fn speak(&mut self, text: &str) -> Result<(), ChatError> {
            if self.fail {
                return Err(ChatError::Speech("no audio device".to_string()));
            }
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn input(available: bool, heard: Vec<Result<Option<String>, ChatError>>) -> Box<ScriptedInput> {
        Box::new(ScriptedInput {
            available,
            heard: heard.into(),
        })
    }

    #[test]
    fn test_text_only_reads_text() {
        let mut bridge = SpeechBridge::text_only();
        assert!(!bridge.voice_enabled());
        assert_eq!(
            bridge.read_turn(|| Some("typed".to_string())),
            Some("typed".to_string())
        );
    }

    #[test]
    fn test_voice_preferred_when_heard() {
        let mut bridge =
            SpeechBridge::text_only().with_input(input(true, vec![Ok(Some("spoken".to_string()))]));
        assert!(bridge.voice_enabled());
        let turn = bridge.read_turn(|| panic!("text reader should not be used"));
        assert_eq!(turn, Some("spoken".to_string()));
    }

    #[test]
    fn test_voice_failure_falls_back_to_text() {
        let mut bridge = SpeechBridge::text_only().with_input(input(
            true,
            vec![
                Err(ChatError::Speech("mic busy".to_string())),
                Ok(Some("   ".to_string())),
            ],
        ));
        assert_eq!(bridge.read_turn(|| Some("a".to_string())), Some("a".to_string()));
        assert_eq!(bridge.read_turn(|| Some("b".to_string())), Some("b".to_string()));
    }

    #[test]
    fn test_unavailable_input_is_skipped() {
        let mut bridge = SpeechBridge::text_only()
            .with_input(input(false, vec![Ok(Some("never".to_string()))]));
        assert!(!bridge.voice_enabled());
        assert_eq!(bridge.read_turn(|| None), None);
    }

    #[test]
    fn test_announce_best_effort() {
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let mut bridge = SpeechBridge::text_only().with_output(Box::new(RecordingOutput {
            spoken: Arc::clone(&spoken),
            fail: false,
        }));
        bridge.announce("Hello");
        assert_eq!(*spoken.lock().unwrap(), vec!["Hello".to_string()]);

        let mut failing = SpeechBridge::text_only().with_output(Box::new(RecordingOutput {
            spoken: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }));
        failing.announce("Hello");
        SpeechBridge::text_only().announce("nobody listening");
    }
}
