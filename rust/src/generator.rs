use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::credentials::CredentialPool;
use crate::error::GenerationError;
use crate::idea_store::{IdeaRecord, IdeaStore};
use crate::prompt::build_prompt;
use crate::provider::TextProvider;
use crate::selector::Selection;
use crate::RECENT_IDEAS_LIMIT;

const MAX_ATTEMPTS: usize = 2;

pub struct IdeaGenerator {
    provider: Arc<dyn TextProvider>,
    store: Arc<dyn IdeaStore>,
    credentials: CredentialPool,
    thinking_budget: u32,
}

impl IdeaGenerator {
    pub fn new(
        provider: Arc<dyn TextProvider>,
        store: Arc<dyn IdeaStore>,
        credentials: CredentialPool,
        thinking_budget: u32,
    ) -> Self {
        Self {
            provider,
            store,
            credentials,
            thinking_budget,
        }
    }

    pub fn store(&self) -> &Arc<dyn IdeaStore> {
        &self.store
    }

    /// Generates one idea, retrying once with a freshly drawn credential.
    /// Only a successful attempt writes to the store.
    pub async fn generate(&self, selection: &Selection) -> Result<IdeaRecord, GenerationError> {
        if self.credentials.is_empty() {
            return Err(GenerationError::Configuration);
        }

        let recent: Vec<String> = self
            .store
            .list()
            .await
            .into_iter()
            .take(RECENT_IDEAS_LIMIT)
            .map(|idea| idea.text)
            .collect();
        let prompt = build_prompt(
            &selection.domain,
            &selection.subdomain,
            &selection.missing_piece,
            &recent,
        );

        let mut text = None;
        for attempt in 1..=MAX_ATTEMPTS {
            let credential = self.credentials.next()?;
            info!(
                "generating idea for {} / {} with {} (attempt {attempt})",
                selection.domain, selection.subdomain, credential.name
            );

            match self
                .provider
                .generate_text(credential, &prompt, self.thinking_budget)
                .await
            {
                Ok(Some(raw)) => {
                    let normalized = normalize_idea_text(&raw);
                    if normalized.is_empty() {
                        warn!("provider returned blank text on attempt {attempt}");
                        continue;
                    }
                    text = Some(normalized);
                    break;
                }
                Ok(None) => warn!("provider returned no text on attempt {attempt}"),
                Err(err) => warn!("provider call failed on attempt {attempt}: {err}"),
            }
        }

        let Some(text) = text else {
            return Err(GenerationError::Exhausted {
                attempts: MAX_ATTEMPTS,
            });
        };

        let now = Utc::now();
        let record = IdeaRecord {
            id: now.format("%Y%m%d_%H%M%S_%3f").to_string(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            domain: selection.domain.clone(),
            subdomain: selection.subdomain.clone(),
            missing_piece: selection.missing_piece.clone(),
            text,
            tags: build_tags(&selection.domain, &selection.subdomain),
        };

        self.store.append(&record).await?;
        Ok(record)
    }
}

/// Collapses every whitespace run, line breaks included, into one space.
pub fn normalize_idea_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn build_tags(domain: &str, subdomain: &str) -> String {
    format!("({domain}) ({subdomain})")
}

#[cfg(test)]
mod tests {
    use super::{build_tags, normalize_idea_text, IdeaGenerator};
    use crate::credentials::{Credential, CredentialPool};
    use crate::error::{GenerationError, ProviderError, StoreError};
    use crate::idea_store::{IdeaRecord, IdeaStore};
    use crate::provider::TextProvider;
    use crate::selector::Selection;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Scripted = Result<Option<String>, ProviderError>;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<Scripted>>,
        prompts: Mutex<Vec<String>>,
        budgets: Mutex<Vec<u32>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
                budgets: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().expect("prompts lock").len()
        }
    }

    #[async_trait]
    impl TextProvider for ScriptedProvider {
        async fn generate_text(
            &self,
            _credential: &Credential,
            prompt: &str,
            thinking_budget: u32,
        ) -> Result<Option<String>, ProviderError> {
            self.prompts.lock().expect("prompts lock").push(prompt.to_string());
            self.budgets.lock().expect("budgets lock").push(thinking_budget);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or(Ok(None))
        }
    }

    #[derive(Default)]
    struct RecordingStore {
        existing: Vec<IdeaRecord>,
        appended: Mutex<Vec<IdeaRecord>>,
        fail_append: bool,
    }

    #[async_trait]
    impl IdeaStore for RecordingStore {
        async fn append(&self, record: &IdeaRecord) -> Result<(), StoreError> {
            if self.fail_append {
                return Err(StoreError::Lock);
            }
            self.appended.lock().expect("append lock").push(record.clone());
            Ok(())
        }

        async fn fetch_all(&self) -> Result<Vec<IdeaRecord>, StoreError> {
            Ok(self.existing.clone())
        }
    }

    fn pool() -> CredentialPool {
        CredentialPool::new(vec![
            Credential::new("GEMINI_API_KEY_1", "one"),
            Credential::new("GEMINI_API_KEY_2", "two"),
        ])
    }

    fn selection() -> Selection {
        Selection {
            domain: "CRM".to_string(),
            subdomain: "Lead Management".to_string(),
            missing_piece: "AI-powered".to_string(),
        }
    }

    fn api_error() -> ProviderError {
        ProviderError::Api {
            status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            body: "quota".to_string(),
        }
    }

    #[test]
    fn normalizes_line_breaks_and_runs() {
        assert_eq!(normalize_idea_text("line one\n\nline   two"), "line one line two");
        assert_eq!(normalize_idea_text("  \t padded \r\n "), "padded");
    }

    #[test]
    fn tags_wrap_domain_and_subdomain() {
        assert_eq!(build_tags("CRM", "Lead Management"), "(CRM) (Lead Management)");
    }

    #[tokio::test]
    async fn retry_after_failure_persists_exactly_once() {
        let provider = ScriptedProvider::new(vec![
            Err(api_error()),
            Ok(Some("A lead\nscoring   platform.".to_string())),
        ]);
        let store = Arc::new(RecordingStore::default());
        let generator = IdeaGenerator::new(provider.clone(), store.clone(), pool(), 1000);

        let record = generator.generate(&selection()).await.expect("generate");

        assert_eq!(record.text, "A lead scoring platform.");
        assert_eq!(record.tags, "(CRM) (Lead Management)");
        assert_eq!(record.missing_piece, "AI-powered");
        assert!(record.timestamp.ends_with('Z'));
        assert_eq!(provider.calls(), 2);
        let appended = store.appended.lock().expect("append lock");
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0], record);
    }

    #[tokio::test]
    async fn two_failures_store_nothing() {
        let provider = ScriptedProvider::new(vec![Err(api_error()), Ok(None)]);
        let store = Arc::new(RecordingStore::default());
        let generator = IdeaGenerator::new(provider.clone(), store.clone(), pool(), 1000);

        let err = generator.generate(&selection()).await.expect_err("must fail");

        assert!(matches!(err, GenerationError::Exhausted { attempts: 2 }));
        assert_eq!(provider.calls(), 2);
        assert!(store.appended.lock().expect("append lock").is_empty());
    }

    #[tokio::test]
    async fn blank_text_counts_as_failed_attempt() {
        let provider = ScriptedProvider::new(vec![
            Ok(Some(" \n ".to_string())),
            Ok(Some("Second try works.".to_string())),
        ]);
        let store = Arc::new(RecordingStore::default());
        let generator = IdeaGenerator::new(provider.clone(), store.clone(), pool(), 1000);

        let record = generator.generate(&selection()).await.expect("generate");
        assert_eq!(record.text, "Second try works.");
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn success_on_first_attempt_calls_provider_once() {
        let provider = ScriptedProvider::new(vec![Ok(Some("Only once.".to_string()))]);
        let store = Arc::new(RecordingStore::default());
        let generator = IdeaGenerator::new(provider.clone(), store.clone(), pool(), 640);

        generator.generate(&selection()).await.expect("generate");
        assert_eq!(provider.calls(), 1);
        assert_eq!(*provider.budgets.lock().expect("budgets lock"), vec![640]);
    }

    #[tokio::test]
    async fn empty_pool_is_configuration_error_without_provider_call() {
        let provider = ScriptedProvider::new(vec![Ok(Some("unused".to_string()))]);
        let store = Arc::new(RecordingStore::default());
        let generator =
            IdeaGenerator::new(provider.clone(), store.clone(), CredentialPool::default(), 1000);

        let err = generator.generate(&selection()).await.expect_err("must fail");
        assert!(matches!(err, GenerationError::Configuration));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn store_write_failure_is_propagated() {
        let provider = ScriptedProvider::new(vec![Ok(Some("Idea.".to_string()))]);
        let store = Arc::new(RecordingStore {
            fail_append: true,
            ..RecordingStore::default()
        });
        let generator = IdeaGenerator::new(provider.clone(), store, pool(), 1000);

        let err = generator.generate(&selection()).await.expect_err("must fail");
        assert!(matches!(err, GenerationError::Store(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn prompt_lists_only_eight_most_recent_ideas() {
        let existing: Vec<IdeaRecord> = (0..10)
            .map(|i| IdeaRecord {
                id: i.to_string(),
                timestamp: format!("t{i}"),
                domain: "CRM".to_string(),
                subdomain: "Lead Management".to_string(),
                missing_piece: "AI-powered".to_string(),
                text: format!("existing idea {i}"),
                tags: String::new(),
            })
            .collect();
        let provider = ScriptedProvider::new(vec![Ok(Some("New.".to_string()))]);
        let store = Arc::new(RecordingStore {
            existing,
            ..RecordingStore::default()
        });
        let generator = IdeaGenerator::new(provider.clone(), store, pool(), 1000);

        generator.generate(&selection()).await.expect("generate");

        let prompts = provider.prompts.lock().expect("prompts lock");
        assert!(prompts[0].contains("- existing idea 7"));
        assert!(!prompts[0].contains("- existing idea 8"));
    }
}
