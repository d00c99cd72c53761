//! Conversational front end, independent of the message transport.
//!
//! Free text goes to a `DialogueEngine`. After the user asks to guess a symbol,
//! the next image is classified and answered with the category name.

use log::{debug, error};
use serde::{Deserialize, Serialize};
use std::{
    error, fmt,
    path::{Path, PathBuf},
};

use crate::classifier::{Classifier, Labels};
use crate::dataset::{VectorizeError, Vectorizer};
use crate::feedforward::ProcessError;

pub const START_COMMAND: &str = "/start";
pub const GUESS_COMMAND: &str = "guess sign";
pub const INFO_COMMAND: &str = "tell me about signs";

pub const GREETING: &str = "Hi! I'm the cartographer bot.\n\
    Type \"guess sign\" and I'll try to recognize a map symbol from a picture,\n\
    or \"tell me about signs\" to just chat about map symbols.";
pub const AWAITING_IMAGE: &str = "Ok, send me a picture of a map symbol.";
pub const INFO_MODE: &str =
    "Let's talk about map symbols. Try \"Hello\" or \"What can you do\".";
pub const NOT_UNDERSTOOD: &str =
    "I didn't quite get that. Could you rephrase, or name the symbol you want to know about?";
pub const IMAGE_NOT_REQUESTED: &str =
    "If you want me to guess a symbol from a picture, type \"guess sign\" first.";
pub const NOT_RECOGNIZED: &str = "I couldn't recognize this symbol with confidence.";
pub const IMAGE_FAILED: &str = "Something went wrong while processing the image.";

/// Produces a reply for free text, or nothing if it has no answer.
pub trait DialogueEngine {
    fn respond(&mut self, text: &str) -> Option<String>;
}

/// One pattern/reply pair of a `ScriptedDialogue`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueRule {
    /// Words to match, case and punctuation ignored. A trailing `*` matches one or more words.
    pub pattern: String,
    /// Reply text, `{star}` is replaced with the words matched by `*`.
    pub reply: String,
}

impl DialogueRule {
    pub fn new<P: Into<String>, R: Into<String>>(pattern: P, reply: R) -> Self {
        Self {
            pattern: pattern.into(),
            reply: reply.into(),
        }
    }
}

/// Rule-based dialogue engine, first matching rule wins.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDialogue {
    rules: Vec<(Vec<String>, String)>,
}

impl ScriptedDialogue {
    pub fn new<I: IntoIterator<Item = DialogueRule>>(rules: I) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|rule| (normalize(&rule.pattern, true), rule.reply))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Upper-cased words with punctuation stripped. `*` survives when `wildcards` is set.
fn normalize(text: &str, wildcards: bool) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || (wildcards && *c == '*'))
                .flat_map(char::to_uppercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Words captured by the pattern's trailing `*`, or `None` if `words` don't match.
fn capture<'a>(pattern: &[String], words: &'a [String]) -> Option<&'a [String]> {
    match pattern.split_last() {
        Some((last, head)) if last == "*" => {
            if words.len() > head.len() && words[..head.len()] == *head {
                Some(&words[head.len()..])
            } else {
                None
            }
        }
        _ if pattern == words => Some(&[]),
        _ => None,
    }
}

impl DialogueEngine for ScriptedDialogue {
    fn respond(&mut self, text: &str) -> Option<String> {
        let words = normalize(text, false);
        self.rules.iter().find_map(|(pattern, reply)| {
            capture(pattern, &words).map(|star| reply.replace("{star}", &star.join(" ").to_lowercase()))
        })
    }
}

/// Incoming chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Text(String),
    /// Picture already stored locally.
    Image(PathBuf),
}

/// Classifies image files into category names.
pub struct Recognizer<V> {
    vectorizer: V,
    labels: Labels,
}

impl<V: Vectorizer> Recognizer<V> {
    pub fn new(vectorizer: V, labels: Labels) -> Self {
        Self { vectorizer, labels }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// # Returns
    /// * `Ok(Some(name))` for a confidently recognized category;
    /// * `Ok(None)` if the classifier is unsure;
    /// * `Err(RecognizeError)` if the image can't be read or doesn't fit the network.
    pub fn recognize<C: Classifier + ?Sized>(
        &self,
        classifier: &mut C,
        path: &Path,
    ) -> Result<Option<&str>, RecognizeError> {
        let input = self
            .vectorizer
            .vectorize(path)
            .map_err(RecognizeError::Vectorize)?;
        let prediction = classifier.predict(&input).map_err(RecognizeError::Process)?;
        debug!("{} classified as {:?}", path.display(), prediction);
        Ok(self.labels.describe(prediction))
    }
}

/// Conversation state of one chat.
pub struct ChatSession<D> {
    dialogue: D,
    awaiting_image: bool,
}

impl<D: DialogueEngine> ChatSession<D> {
    pub fn new(dialogue: D) -> Self {
        Self {
            dialogue,
            awaiting_image: false,
        }
    }

    /// Whether the next image will be classified.
    pub fn awaiting_image(&self) -> bool {
        self.awaiting_image
    }

    /// Answers one message. Requests one at a time: `classifier` is used exclusively.
    pub fn reply<C, V>(
        &mut self,
        message: &Incoming,
        classifier: &mut C,
        recognizer: &Recognizer<V>,
    ) -> String
    where
        C: Classifier + ?Sized,
        V: Vectorizer,
    {
        match message {
            Incoming::Text(text) => self.reply_text(text.trim()),
            Incoming::Image(path) => self.reply_image(path, classifier, recognizer),
        }
    }

    fn reply_text(&mut self, text: &str) -> String {
        if text.eq_ignore_ascii_case(START_COMMAND) {
            return GREETING.to_owned();
        }
        if text.eq_ignore_ascii_case(GUESS_COMMAND) {
            self.awaiting_image = true;
            return AWAITING_IMAGE.to_owned();
        }
        if text.eq_ignore_ascii_case(INFO_COMMAND) {
            self.awaiting_image = false;
            return INFO_MODE.to_owned();
        }

        match self.dialogue.respond(text) {
            Some(answer) if !answer.trim().is_empty() => answer,
            _ => NOT_UNDERSTOOD.to_owned(),
        }
    }

    fn reply_image<C, V>(&mut self, path: &Path, classifier: &mut C, recognizer: &Recognizer<V>) -> String
    where
        C: Classifier + ?Sized,
        V: Vectorizer,
    {
        if !self.awaiting_image {
            return IMAGE_NOT_REQUESTED.to_owned();
        }

        match recognizer.recognize(classifier, path) {
            Ok(recognized) => {
                self.awaiting_image = false;
                match recognized {
                    Some(name) => format!("Looks like this symbol is: {}.", name),
                    None => NOT_RECOGNIZED.to_owned(),
                }
            }
            Err(e) => {
                error!("failed to process image {}: {}", path.display(), e);
                IMAGE_FAILED.to_owned()
            }
        }
    }
}

#[derive(Debug)]
pub enum RecognizeError {
    Vectorize(VectorizeError),
    Process(ProcessError),
}

impl fmt::Display for RecognizeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            RecognizeError::Vectorize(e) => write!(f, "{}", e),
            RecognizeError::Process(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for RecognizeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RecognizeError::Vectorize(e) => Some(e),
            RecognizeError::Process(e) => Some(e),
        }
    }
}
