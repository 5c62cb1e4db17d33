//! System Prompt Loading
//!
//! The persona text lives in a template file outside the binary. The first
//! candidate that exists wins; the fixed format block is appended to it.

use std::path::{Path, PathBuf};

use agent_core::{AgentError, Result};

/// Output contract appended to every system prompt
pub const FORMAT_INSTRUCTIONS: &str = r#"
IMPORTANT: SPEECH AND ANIMATION SYNCHRONIZATION
1. SPEECH RULE: If a segment in "messages" contains text longer than 2 words, you MUST use one of the talking animations: "Talking_0", "Talking_1", or "Talking_2".
2. NON-VERBAL RULE: Only use "Laughing", "Angry", "Crying", "Terrified", or "Standing Idle" for short exclamations or emotional beats, OR if the text specifically describes a non-verbal reaction.
3. TEACHING TONE: When explaining a topic, prefer "Talking_1" (expressive) and "Talking_2" (casual).
4. VARIETY: NEVER use the same animation for two consecutive segments.

AVAILABLE ANIMATIONS (EXACT NAMES):
- "Talking_0", "Talking_1", "Talking_2", "Standing Idle", "Laughing", "Angry", "Crying", "Terrified", "Rumba Dancing"

AVAILABLE FACIAL EXPRESSIONS:
- "default", "smile", "funnyFace", "sad", "surprised", "angry", "crazy"

CRITICAL: RESPONSE FORMAT
{
    "html_response": "<Tailwind styled chat bubble HTML>",
    "messages": [
        {
          "text": "Check out this blog on Medium about SUI.",
          "facialExpression": "smile",
          "animation": "Talking_1",
          "assets": [
            { "type": "blog", "url": "https://medium.com/...", "caption": "Deep Dive into SUI" },
            { "type": "docs", "url": "https://docs.sui.io/...", "caption": "Official SUI Documentation" }
          ]
        }
    ],
    "suggestions": ["...", "..."]
}

RULES:
- ASSET CATEGORIES: Use 'youtube' for videos, 'blog' for Medium/GeeksForGeeks/Dev.to, 'docs' for official technical documentation, and 'image' for visual aids.
- ACTUAL LINKS ONLY: Use the real URLs provided in the [SEARCHED ASSETS] context. Do NOT make up URLs.
- ASSET QUOTA: Prefer a mix (e.g., 1 video + 1 blog OR 1 image + 1 docs). Provide at least 2 distinct assets when assets are allowed.
- SUGGESTIONS: Provide 2-3 short, clickable questions in the "suggestions" array, each under 8 words.
- CLEAN UI: Keep each asset 'caption' between 3 and 5 words.
- SEGMENTATION: Attach assets to the message segment they relate to.
- NO IDLE DURING SPEECH: Spoken text MUST use a "Talking_" animation.
- EMOTION: Match facialExpression and animation to the tone of the text.
"#;

/// Ordered template candidates
#[derive(Clone, Debug)]
pub struct PromptSource {
    candidates: Vec<PathBuf>,
}

impl PromptSource {
    pub fn new(dir: impl AsRef<Path>, primary: &str, fallback: &str) -> Self {
        let dir = dir.as_ref();
        Self {
            candidates: vec![dir.join(primary), dir.join(fallback)],
        }
    }

    /// First existing candidate, if any
    pub fn resolve(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
    }

    /// Read the template and append [`FORMAT_INSTRUCTIONS`]
    pub fn load(&self) -> Result<String> {
        let path = self.resolve().ok_or_else(|| {
            let tried: Vec<String> = self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            AgentError::Config(format!("no system prompt template found (tried {})", tried.join(", ")))
        })?;

        let mut prompt = std::fs::read_to_string(path)?;
        prompt.push_str(FORMAT_INSTRUCTIONS);
        tracing::debug!(path = %path.display(), "Loaded system prompt");
        Ok(prompt)
    }
}
