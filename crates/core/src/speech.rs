//! Speech input and output collaborators
//!
//! Audio capture and synthesis live outside this crate. Input is modelled as
//! a line source (stdin in the CLI), output as a sink that prints each reply
//! and optionally pipes it to an external synthesiser command.

use std::collections::VecDeque;
use std::io::{self, BufRead};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use tracing::{debug, warn};

// ============================================================================
// Output
// ============================================================================

/// Speak one reply.
///
/// Shared between the foreground loop and timer tasks, so implementations
/// must tolerate concurrent calls. Failures are swallowed inside `say`.
pub trait SpeechOutput: Send + Sync {
    fn say(&self, text: &str);
}

/// Prints replies to stdout, optionally voicing them through a command
/// such as `espeak` (the text is passed as the last argument).
pub struct ConsoleSpeaker {
    tts_command: Option<Vec<String>>,
}

impl ConsoleSpeaker {
    pub fn new() -> Self {
        Self { tts_command: None }
    }

    /// `command` is split on whitespace: "espeak -s 150" works
    pub fn with_tts(command: &str) -> Self {
        let parts: Vec<String> = command.split_whitespace().map(String::from).collect();
        Self {
            tts_command: if parts.is_empty() { None } else { Some(parts) },
        }
    }

    fn voice(&self, parts: &[String], text: &str) {
        let Some((program, args)) = parts.split_first() else {
            return;
        };
        let result = Command::new(program)
            .args(args)
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(%status, program = %program, "speech synthesiser failed"),
            Err(e) => warn!(program = %program, "could not run speech synthesiser: {}", e),
        }
    }
}

impl Default for ConsoleSpeaker {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechOutput for ConsoleSpeaker {
    fn say(&self, text: &str) {
        println!("Dadu: {}", text);
        if let Some(ref parts) = self.tts_command {
            self.voice(parts, text);
        }
    }
}

/// Keeps every spoken line in memory
#[derive(Default)]
pub struct RecordingSpeaker {
    lines: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl SpeechOutput for RecordingSpeaker {
    fn say(&self, text: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(text.to_string());
        }
    }
}

// ============================================================================
// Input
// ============================================================================

/// Result of one listen attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Utterance(String),
    /// Nothing usable was captured; try again
    Unrecognized,
    /// The input source is gone
    Closed,
}

pub trait SpeechInput {
    /// Block until the next utterance. Returned text is lowercase.
    fn listen(&mut self) -> Heard;
}

/// Reads one utterance per line
pub struct LineListener<R> {
    reader: R,
}

impl<R: BufRead> LineListener<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

/// Classify one `read_line` result
fn heard_line(read: io::Result<usize>, line: &str) -> Heard {
    match read {
        Ok(0) => Heard::Closed,
        Ok(_) => {
            let text = line.trim().to_lowercase();
            if text.is_empty() {
                Heard::Unrecognized
            } else {
                debug!(utterance = %text, "heard");
                Heard::Utterance(text)
            }
        }
        Err(e) => {
            warn!("input capture failed: {}", e);
            Heard::Unrecognized
        }
    }
}

impl<R: BufRead> SpeechInput for LineListener<R> {
    fn listen(&mut self) -> Heard {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line);
        heard_line(read, &line)
    }
}

/// Reads stdin one line at a time without holding its lock between
/// utterances, so credential and location prompts can still read from it.
#[derive(Debug, Default)]
pub struct StdinListener;

impl SpeechInput for StdinListener {
    fn listen(&mut self) -> Heard {
        let mut line = String::new();
        let read = io::stdin().read_line(&mut line);
        heard_line(read, &line)
    }
}

/// Replays a fixed list of utterances, then reports closed
pub struct ScriptedListener {
    queue: VecDeque<Heard>,
}

impl ScriptedListener {
    pub fn new<I, S>(utterances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: utterances
                .into_iter()
                .map(|u| Heard::Utterance(u.into().to_lowercase()))
                .collect(),
        }
    }
}

impl SpeechInput for ScriptedListener {
    fn listen(&mut self) -> Heard {
        self.queue.pop_front().unwrap_or(Heard::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_listener() {
        let input = "Dadu\n\n  What's The Time  \n";
        let mut listener = LineListener::new(input.as_bytes());
        assert_eq!(listener.listen(), Heard::Utterance("dadu".to_string()));
        assert_eq!(listener.listen(), Heard::Unrecognized);
        assert_eq!(listener.listen(), Heard::Utterance("what's the time".to_string()));
        assert_eq!(listener.listen(), Heard::Closed);
    }

    #[test]
    fn test_recording_speaker() {
        let speaker = RecordingSpeaker::new();
        speaker.say("one");
        speaker.say("two");
        assert_eq!(speaker.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_missing_synthesiser_is_swallowed() {
        let speaker = ConsoleSpeaker::with_tts("definitely-not-a-real-tts-binary -q");
        speaker.say("still fine");
    }

    #[test]
    fn test_scripted_listener() {
        let mut listener = ScriptedListener::new(["Tell me a JOKE"]);
        assert_eq!(listener.listen(), Heard::Utterance("tell me a joke".to_string()));
        assert_eq!(listener.listen(), Heard::Closed);
    }
}
