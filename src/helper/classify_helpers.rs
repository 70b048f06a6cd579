use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Content excerpt sent to the external classifier is capped to bound
/// request cost and latency.
pub const EXCERPT_CHAR_BUDGET: usize = 2000;

const DEFAULT_GEMINI_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Error, Debug)]
pub enum AiError {
    #[error("classification service credentials are missing")]
    MissingCredentials,
    #[error("classification service transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("classification service returned a malformed response")]
    MalformedResponse,
}

/// External AI collaborator: prompt in, raw response text out. Kept as a
/// trait so tests substitute deterministic fakes for the network client.
#[async_trait]
pub trait AiCollaborator: Send + Sync {
    async fn classify(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("FATAL: Failed to build the HTTP client for classification.");
        GeminiClient {
            http,
            api_key,
            endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
        }
    }
}

#[async_trait]
impl AiCollaborator for GeminiClient {
    async fn classify(&self, prompt: &str) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::MissingCredentials);
        }
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: GenerateContentResponse = response.json().await?;

        payload
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(AiError::MalformedResponse)
    }
}

/// Categories/tags for a post: AI-assisted with a deterministic keyword
/// fallback. `classify` is total: any collaborator failure routes to the
/// fallback, never to the caller.
pub struct TagClassifier {
    ai: Option<Arc<dyn AiCollaborator>>,
}

impl TagClassifier {
    pub fn new(ai: Option<Arc<dyn AiCollaborator>>) -> Self {
        TagClassifier { ai }
    }

    /// Classifier with no collaborator: fallback only.
    pub fn disabled() -> Self {
        TagClassifier { ai: None }
    }

    pub async fn classify(&self, content: &str) -> Classification {
        let ai = match &self.ai {
            Some(ai) => ai,
            None => return fallback_classification(content),
        };

        let prompt = build_prompt(content);
        match ai.classify(&prompt).await {
            Ok(raw) => match extract_classification(&raw) {
                Some(result) => result,
                None => {
                    log::warn!("Classifier returned no usable JSON; using keyword fallback.");
                    fallback_classification(content)
                }
            },
            Err(e) => {
                log::warn!("Classification collaborator failed ({}); using keyword fallback.", e);
                fallback_classification(content)
            }
        }
    }
}

fn build_prompt(content: &str) -> String {
    let excerpt: String = content.chars().take(EXCERPT_CHAR_BUDGET).collect();
    format!(
        "Analyze this blog post and generate exactly 3 categories and 5 tags.\n\n\
         Return ONLY valid JSON in this exact format:\n\
         {{\"categories\": [\"category1\", \"category2\", \"category3\"], \
         \"tags\": [\"tag1\", \"tag2\", \"tag3\", \"tag4\", \"tag5\"]}}\n\n\
         Blog post content:\n{excerpt}"
    )
}

/// Scans the raw response for the outermost `{...}` substring and parses
/// it. Models tend to wrap JSON in prose or code fences; everything outside
/// the braces is ignored. An object without both lists is no use and is
/// treated as absent.
fn extract_classification(raw: &str) -> Option<Classification> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    let parsed: Classification = serde_json::from_str(&raw[start..=end]).ok()?;
    if parsed.categories.is_empty() || parsed.tags.is_empty() {
        return None;
    }
    Some(parsed)
}

const CATEGORY_RULES: &[(&str, &[&str])] = &[
    ("Technology", &["code", "programming", "python", "javascript", "web"]),
    ("Tutorial", &["tutorial", "guide", "how to"]),
    ("Opinion", &["opinion", "thoughts", "perspective"]),
];

const CANDIDATE_TAGS: &[&str] = &[
    "web", "development", "python", "javascript", "tutorial", "guide", "tips", "tricks",
];

/// Keyword-rule heuristic: total and deterministic. Same input, same
/// output, never fails.
pub fn fallback_classification(content: &str) -> Classification {
    let content_lower = content.to_lowercase();

    let mut categories: Vec<String> = CATEGORY_RULES
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| content_lower.contains(k)))
        .map(|(label, _)| label.to_string())
        .collect();
    if categories.is_empty() {
        categories = vec!["General".to_string(), "Blog".to_string()];
    }

    let mut tags: Vec<String> = CANDIDATE_TAGS
        .iter()
        .filter(|word| content_lower.contains(*word))
        .take(5)
        .map(|word| word.to_string())
        .collect();
    if tags.is_empty() {
        tags = vec!["blog".to_string(), "article".to_string(), "post".to_string()];
    }

    Classification { categories, tags }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedAi {
        response: Result<String, ()>,
    }

    #[async_trait]
    impl AiCollaborator for ScriptedAi {
        async fn classify(&self, _prompt: &str) -> Result<String, AiError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(AiError::MalformedResponse),
            }
        }
    }

    #[test]
    fn fallback_maps_keywords_to_categories() {
        let result = fallback_classification("A python programming tutorial for the web");
        assert_eq!(result.categories, vec!["Technology", "Tutorial"]);
        assert_eq!(result.tags, vec!["web", "python", "tutorial"]);
    }

    #[test]
    fn fallback_defaults_when_nothing_matches() {
        let result = fallback_classification("Sourdough starter maintenance notes");
        assert_eq!(result.categories, vec!["General", "Blog"]);
        assert_eq!(result.tags, vec!["blog", "article", "post"]);
    }

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_classification("my thoughts on javascript guide tips");
        let b = fallback_classification("my thoughts on javascript guide tips");
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_caps_tags_at_five() {
        let result = fallback_classification(
            "web development python javascript tutorial guide tips tricks",
        );
        assert_eq!(result.tags.len(), 5);
    }

    #[test]
    fn extracts_json_from_chatty_response() {
        let raw = "Sure! Here you go:\n```json\n\
                   {\"categories\": [\"A\", \"B\", \"C\"], \"tags\": [\"t1\", \"t2\", \"t3\", \"t4\", \"t5\"]}\n\
                   ```\nLet me know if you need anything else.";
        let parsed = extract_classification(raw).expect("json found");
        assert_eq!(parsed.categories.len(), 3);
        assert_eq!(parsed.tags.len(), 5);
    }

    #[test]
    fn rejects_responses_without_usable_json() {
        assert!(extract_classification("no json here").is_none());
        assert!(extract_classification("{\"categories\": [], \"tags\": []}").is_none());
        assert!(extract_classification("{not json}").is_none());
    }

    #[test]
    fn build_prompt_truncates_to_budget() {
        // A filler character the template text itself never contains.
        let long_content = "ж".repeat(EXCERPT_CHAR_BUDGET * 2);
        let prompt = build_prompt(&long_content);
        let excerpt_chars = prompt.chars().filter(|c| *c == 'ж').count();
        assert_eq!(excerpt_chars, EXCERPT_CHAR_BUDGET);
    }

    #[test]
    fn build_prompt_keeps_short_content_whole() {
        let prompt = build_prompt("a tiny post");
        assert!(prompt.ends_with("a tiny post"));
    }

    #[actix_web::test]
    async fn collaborator_failure_falls_back_to_non_empty_result() {
        let classifier = TagClassifier::new(Some(Arc::new(ScriptedAi { response: Err(()) })));
        let result = classifier.classify("anything at all").await;
        assert!(!result.categories.is_empty());
        assert!(!result.tags.is_empty());
    }

    #[actix_web::test]
    async fn garbage_response_falls_back() {
        let classifier = TagClassifier::new(Some(Arc::new(ScriptedAi {
            response: Ok("I could not classify that, sorry.".to_string()),
        })));
        let result = classifier.classify("a python tutorial").await;
        assert_eq!(result.categories, vec!["Technology", "Tutorial"]);
    }

    #[actix_web::test]
    async fn well_formed_response_wins_over_fallback() {
        let classifier = TagClassifier::new(Some(Arc::new(ScriptedAi {
            response: Ok(
                "{\"categories\": [\"Systems\", \"Rust\", \"Safety\"], \
                 \"tags\": [\"a\", \"b\", \"c\", \"d\", \"e\"]}"
                    .to_string(),
            ),
        })));
        let result = classifier.classify("a python tutorial").await;
        assert_eq!(result.categories, vec!["Systems", "Rust", "Safety"]);
    }

    #[actix_web::test]
    async fn disabled_classifier_uses_fallback() {
        let result = TagClassifier::disabled().classify("web tips").await;
        assert_eq!(result.categories, vec!["Technology"]);
        assert_eq!(result.tags, vec!["web", "tips"]);
    }
}
