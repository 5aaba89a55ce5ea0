use super::{parse_plan, system_prompt, Planner, PlannerError, UnavailableReason};
use crate::config::PlannerSettings;
use crate::orchestration::plan::Plan;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Planner backed by an OpenAI-compatible `chat/completions` endpoint.
pub struct ChatPlanner {
    settings: PlannerSettings,
    system_prompt: String,
    agent: ureq::Agent,
}

impl ChatPlanner {
    pub fn new(settings: &PlannerSettings, capabilities: &Map<String, Value>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build();
        Self {
            settings: settings.clone(),
            system_prompt: system_prompt(capabilities),
            agent,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn complete(&self, text: &str) -> Result<String, PlannerError> {
        let api_key = self.settings.api_key.trim();
        if api_key.is_empty() {
            return Err(PlannerError::unavailable(
                UnavailableReason::MissingCredentials,
            ));
        }
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };
        let body =
            serde_json::to_value(&request).map_err(|e| PlannerError::Failed(e.to_string()))?;

        let response = self
            .agent
            .post(&self.endpoint())
            .set("Authorization", &format!("Bearer {api_key}"))
            .send_json(body)
            .map_err(request_error)?;
        let reply = response.into_json::<ChatResponse>().map_err(|err| {
            if is_timeout_io(&err) {
                PlannerError::unavailable(UnavailableReason::Timeout)
            } else {
                PlannerError::InvalidOutput(err.to_string())
            }
        })?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| PlannerError::InvalidOutput("empty completion".to_string()))
    }
}

impl Planner for ChatPlanner {
    fn plan(&self, text: &str) -> Result<Plan, PlannerError> {
        let content = self.complete(text)?;
        parse_plan(&content)
    }
}

fn request_error(err: ureq::Error) -> PlannerError {
    match err {
        ureq::Error::Status(code, response) => {
            let body = response.into_string().unwrap_or_default();
            PlannerError::Failed(format!("status {code}: {}", body.trim()))
        }
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<io::Error>())
                .is_some_and(is_timeout_io)
                || transport.to_string().contains("timed out");
            if timed_out {
                PlannerError::unavailable(UnavailableReason::Timeout)
            } else {
                PlannerError::Failed(transport.to_string())
            }
        }
    }
}

fn is_timeout_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_unavailable_without_a_request() {
        let settings = PlannerSettings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..PlannerSettings::default()
        };
        let planner = ChatPlanner::new(&settings, &Map::new());
        let err = planner.plan("status").expect_err("no key");
        assert!(matches!(
            err,
            PlannerError::Unavailable {
                reason: UnavailableReason::MissingCredentials
            }
        ));
    }

    #[test]
    fn endpoint_drops_trailing_slash() {
        let settings = PlannerSettings {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..PlannerSettings::default()
        };
        let planner = ChatPlanner::new(&settings, &Map::new());
        assert_eq!(planner.endpoint(), "http://localhost:8080/v1/chat/completions");
    }
}
