use crate::error::{AppError, AppResult};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

pub mod client;

pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

pub const CANNED_RESPONSES: [&str; 10] = [
    "I can help you organize your notes better. Would you like some tips?",
    "That's an interesting point. Have you considered looking at it from another perspective?",
    "I've analyzed your notes and found some patterns. Would you like me to elaborate?",
    "Let me think about that... Based on your notes, I'd suggest focusing on the key points mentioned earlier.",
    "I can summarize this note for you if you'd like. Just let me know!",
    "Great question! Based on the content in your note, I would suggest exploring this topic further.",
    "I noticed you've been working on this for a while. Would you like me to help you brainstorm some new ideas?",
    "This looks like an important project. I can help you break it down into manageable tasks if you'd like.",
    "I see you're taking meeting notes. Would you like me to help format them in a more structured way?",
    "Your notes are well-organized. To further improve them, consider adding headings to separate different topics.",
];

/// Turns one prompt into one reply. A real service can sit behind this
/// without touching the callers.
pub trait ResponseStrategy: Send + Sync {
    fn respond(&self, prompt: &str) -> AppResult<String>;
}

/// Uniform pick from a fixed list; the prompt is ignored.
#[derive(Debug, Clone)]
pub struct CannedResponses {
    responses: Vec<String>,
}

impl CannedResponses {
    pub fn new(responses: Vec<String>) -> Self {
        Self { responses }
    }
}

impl Default for CannedResponses {
    fn default() -> Self {
        Self::new(CANNED_RESPONSES.iter().map(|s| s.to_string()).collect())
    }
}

impl ResponseStrategy for CannedResponses {
    fn respond(&self, _prompt: &str) -> AppResult<String> {
        if self.responses.is_empty() {
            return Err(AppError::Assistant("no canned responses configured".to_string()));
        }
        let index = rand::rng().random_range(0..self.responses.len());
        Ok(self.responses[index].clone())
    }
}

#[derive(Clone)]
pub struct Assistant {
    strategy: Arc<dyn ResponseStrategy>,
    delay: Duration,
    timeout: Duration,
}

impl Assistant {
    pub fn new(strategy: Arc<dyn ResponseStrategy>, delay: Duration, timeout: Duration) -> Self {
        Self {
            strategy,
            delay,
            timeout,
        }
    }

    pub async fn get_response(&self, prompt: &str) -> AppResult<String> {
        let delayed = async {
            tokio::time::sleep(self.delay).await;
            self.strategy.respond(prompt)
        };
        match tokio::time::timeout(self.timeout, delayed).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Assistant(format!(
                "no response within {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// One retry, then the fixed apology. Never fails.
    pub async fn reply_or_apology(&self, prompt: &str) -> String {
        for attempt in 1..=2 {
            match self.get_response(prompt).await {
                Ok(reply) => return reply,
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "assistant request failed");
                }
            }
        }
        APOLOGY.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Assistant, CannedResponses, ResponseStrategy, APOLOGY, CANNED_RESPONSES};
    use crate::error::{AppError, AppResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Flaky {
        calls: AtomicUsize,
        failures: usize,
    }

    impl ResponseStrategy for Flaky {
        fn respond(&self, prompt: &str) -> AppResult<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err(AppError::Assistant("boom".to_string()))
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    fn instant(strategy: Arc<dyn ResponseStrategy>) -> Assistant {
        Assistant::new(strategy, Duration::ZERO, Duration::from_secs(5))
    }

    #[test]
    fn canned_responses_come_from_the_fixed_list() {
        let canned = CannedResponses::default();
        for _ in 0..50 {
            let reply = canned.respond("anything").expect("list is not empty");
            assert!(CANNED_RESPONSES.contains(&reply.as_str()));
        }
    }

    #[test]
    fn empty_canned_list_is_an_error() {
        let canned = CannedResponses::new(Vec::new());
        assert!(canned.respond("hi").is_err());
    }

    #[tokio::test]
    async fn get_response_returns_strategy_reply() {
        let assistant = instant(Arc::new(CannedResponses::new(vec!["only".to_string()])));
        let reply = assistant.get_response("ignored").await.expect("should reply");
        assert_eq!(reply, "only");
    }

    #[tokio::test]
    async fn get_response_times_out() {
        let assistant = Assistant::new(
            Arc::new(CannedResponses::default()),
            Duration::from_millis(200),
            Duration::from_millis(10),
        );
        let error = assistant
            .get_response("slow")
            .await
            .expect_err("delay exceeds timeout");
        assert!(error.to_string().starts_with("ASSISTANT_FAILED"));
    }

    #[tokio::test]
    async fn single_failure_is_retried() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: 1,
        });
        let assistant = instant(flaky.clone());
        assert_eq!(assistant.reply_or_apology("hi").await, "echo: hi");
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_failure_falls_back_to_apology() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            failures: usize::MAX,
        });
        let assistant = instant(flaky.clone());
        assert_eq!(assistant.reply_or_apology("hi").await, APOLOGY);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }
}
