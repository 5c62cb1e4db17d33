//! Agent Reply Schema and Normalizer
//!
//! The avatar frontend consumes a strict JSON shape: segmented speech with
//! a facial expression and an animation per segment, optional assets, and
//! follow-up suggestions. Model output is free-form text, so it goes
//! through two parse stages before it reaches the client:
//!
//! 1. strict: the whole text is a JSON object
//! 2. recovery: the largest balanced `{...}` span that parses as an object
//!
//! If both fail the client still receives a speakable safety payload.
//! `messages` and `suggestions` are always present in the result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Facial expressions supported by the avatar rig
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FacialExpression {
    #[default]
    Default,
    Smile,
    FunnyFace,
    Sad,
    Surprised,
    Angry,
    Crazy,
}

impl FacialExpression {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Smile => "smile",
            Self::FunnyFace => "funnyFace",
            Self::Sad => "sad",
            Self::Surprised => "surprised",
            Self::Angry => "angry",
            Self::Crazy => "crazy",
        }
    }
}

impl From<String> for FacialExpression {
    fn from(s: String) -> Self {
        match s.as_str() {
            "smile" => Self::Smile,
            "funnyFace" => Self::FunnyFace,
            "sad" => Self::Sad,
            "surprised" => Self::Surprised,
            "angry" => Self::Angry,
            "crazy" => Self::Crazy,
            _ => Self::Default,
        }
    }
}

impl From<FacialExpression> for String {
    fn from(e: FacialExpression) -> Self {
        e.as_str().to_string()
    }
}

/// Body animations supported by the avatar rig
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Animation {
    Talking0,
    Talking1,
    Talking2,
    #[default]
    StandingIdle,
    Laughing,
    Angry,
    Crying,
    Terrified,
    RumbaDancing,
}

impl Animation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Talking0 => "Talking_0",
            Self::Talking1 => "Talking_1",
            Self::Talking2 => "Talking_2",
            Self::StandingIdle => "Standing Idle",
            Self::Laughing => "Laughing",
            Self::Angry => "Angry",
            Self::Crying => "Crying",
            Self::Terrified => "Terrified",
            Self::RumbaDancing => "Rumba Dancing",
        }
    }
}

impl From<String> for Animation {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Talking_0" => Self::Talking0,
            "Talking_1" => Self::Talking1,
            "Talking_2" => Self::Talking2,
            "Laughing" => Self::Laughing,
            "Angry" => Self::Angry,
            "Crying" => Self::Crying,
            "Terrified" => Self::Terrified,
            "Rumba Dancing" => Self::RumbaDancing,
            _ => Self::StandingIdle,
        }
    }
}

impl From<Animation> for String {
    fn from(a: Animation) -> Self {
        a.as_str().to_string()
    }
}

/// A link shown alongside a speech segment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAsset {
    /// youtube, blog, docs or image
    #[serde(rename = "type")]
    pub kind: String,

    pub url: String,

    #[serde(default)]
    pub caption: String,
}

/// One spoken segment
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplySegment {
    #[serde(default)]
    pub text: String,

    #[serde(rename = "facialExpression", default)]
    pub facial_expression: FacialExpression,

    #[serde(default)]
    pub animation: Animation,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Vec<ReplyAsset>>,
}

impl ReplySegment {
    pub fn new(
        text: impl Into<String>,
        facial_expression: FacialExpression,
        animation: Animation,
    ) -> Self {
        Self {
            text: text.into(),
            facial_expression,
            animation,
            assets: None,
        }
    }
}

/// Reply payload consumed by the avatar frontend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_response: Option<String>,

    #[serde(default)]
    pub messages: Vec<ReplySegment>,

    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Set only on the parse-failure payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Unparsed model output, for diagnostics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,

    /// Any other top-level fields the model produced
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const PARSE_FAILURE_TEXT: &str = "I'm sorry, let me try that again. What was your question?";
const PARSE_FAILURE_TAG: &str = "JSON Parse Error";

impl AgentReply {
    /// Reply with a single segment and nothing else
    pub fn single(segment: ReplySegment) -> Self {
        Self {
            html_response: None,
            messages: vec![segment],
            suggestions: Vec::new(),
            error: None,
            raw_response: None,
            extra: Map::new(),
        }
    }

    /// Payload for model output that no parse stage could recover
    pub fn parse_failure(raw: &str) -> Self {
        let mut reply = Self::single(ReplySegment::new(
            PARSE_FAILURE_TEXT,
            FacialExpression::Sad,
            Animation::Talking0,
        ));
        reply.error = Some(PARSE_FAILURE_TAG.into());
        reply.raw_response = Some(raw.to_string());
        reply
    }

    /// Payload for any other failure while producing a reply
    pub fn fatal(err: &dyn std::fmt::Display) -> Self {
        Self::single(ReplySegment::new(
            format!("Error: {err}"),
            FacialExpression::Sad,
            Animation::Talking0,
        ))
    }
}

/// Normalize raw model output into an [`AgentReply`].
///
/// Never fails: unrecoverable output becomes [`AgentReply::parse_failure`].
pub fn normalize_reply(raw: &str) -> AgentReply {
    match parse_strict(raw) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::debug!(error = %err, "Strict reply parse failed, attempting recovery");
            recover(raw).unwrap_or_else(|| {
                tracing::warn!("Model output contained no recoverable JSON object");
                AgentReply::parse_failure(raw)
            })
        }
    }
}

fn parse_strict(raw: &str) -> Result<AgentReply> {
    let value: Value = serde_json::from_str(raw)?;
    into_reply(value, raw)
}

fn recover(raw: &str) -> Option<AgentReply> {
    let mut spans = balanced_spans(raw);
    spans.sort_by_key(|span| std::cmp::Reverse(span.len()));
    spans
        .into_iter()
        .find_map(|span| serde_json::from_str::<Value>(span).ok().and_then(|v| into_reply(v, raw).ok()))
}

/// Backfill `messages`/`suggestions` without touching present fields, then
/// read the object into the typed schema.
fn into_reply(value: Value, raw: &str) -> Result<AgentReply> {
    let Value::Object(mut map) = value else {
        return Err(AgentError::Parse("reply is not a JSON object".into()));
    };

    if map.get("messages").is_none_or(Value::is_null) {
        let segment = ReplySegment::new(raw, FacialExpression::Default, Animation::Talking2);
        map.insert("messages".into(), serde_json::to_value(vec![segment])?);
    }
    if map.get("suggestions").is_none_or(Value::is_null) {
        map.insert("suggestions".into(), Value::Array(Vec::new()));
    }

    Ok(serde_json::from_value(Value::Object(map))?)
}

/// Top-level balanced `{...}` spans in `text`.
///
/// Braces inside JSON strings are ignored. An opening brace that is never
/// closed does not hide the objects after it: a closed span counts as
/// top-level when every brace enclosing it stays unclosed. One pass, no
/// recursion.
pub fn balanced_spans(text: &str) -> Vec<&str> {
    // (start, end, enclosing open brace)
    let mut closed: Vec<(usize, usize, Option<usize>)> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' if !open.is_empty() => in_string = true,
            '{' => open.push(i),
            '}' => {
                if let Some(start) = open.pop() {
                    closed.push((start, i, open.last().copied()));
                }
            }
            _ => {}
        }
    }

    // Whatever is left on `open` never closed; it stays sorted by position.
    closed
        .into_iter()
        .filter(|&(_, _, parent)| parent.is_none_or(|p| open.binary_search(&p).is_ok()))
        .map(|(start, end, _)| &text[start..=end])
        .collect()
}
