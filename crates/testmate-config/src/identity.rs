//! Anonymous user id and crash-report consent

use crate::resolver::ConfigurationResolver;
use crate::values::SentryConsent;
use serde_json::Value;
use sha2::{Digest, Sha256};
use testmate_settings::{Scope, Setting};

/// Question shown when asking for crash-report consent
pub const CONSENT_MESSAGE: &str = "TestMate can send anonymous error reports to help fix crashes. \
     Nothing is sent without your consent. May it send them?";

/// Answers offered with [`CONSENT_MESSAGE`]
pub const CONSENT_OPTIONS: [&str; 4] = ["Sure! I love this extension", "Yes", "No", "Never!"];

/// Asks the user a multiple-choice question
#[async_trait::async_trait]
pub trait ConsentPrompt: Send + Sync {
    /// Index into `options` of the chosen answer; `None` if dismissed
    async fn ask(&self, message: &str, options: &[&str]) -> Option<usize>;
}

fn consent_for_answer(answer: &str) -> Option<SentryConsent> {
    match answer {
        "Sure! I love this extension" | "Yes" => Some(SentryConsent::Enable),
        "No" | "Never!" => Some(SentryConsent::Disable3),
        _ => None,
    }
}

impl ConfigurationResolver {
    /// `log.userId`, generated and stored globally on first use
    #[must_use]
    pub fn get_or_create_user_id(&self) -> String {
        if let Some(id) = self
            .resolve_as::<Option<String>>(Setting::LogUserId)
            .flatten()
            .filter(|id| !id.is_empty())
        {
            return id;
        }

        let id = generate_user_id();
        tracing::info!(user_id = %id, "generated user id");
        self.persist(Setting::LogUserId, Scope::Global, Some(Value::from(id.clone())));
        id
    }

    /// Ask for crash-report consent unless the user has already decided
    ///
    /// Returns the consent in effect afterwards. A dismissed prompt changes
    /// nothing.
    pub async fn ask_sentry_consent(&self, prompt: &dyn ConsentPrompt) -> SentryConsent {
        let current = self.sentry_consent();
        if !current.should_ask() {
            return current;
        }

        let answer = prompt
            .ask(CONSENT_MESSAGE, &CONSENT_OPTIONS)
            .await
            .and_then(|index| CONSENT_OPTIONS.get(index).copied());
        let Some(decided) = answer.and_then(consent_for_answer) else {
            tracing::debug!("consent prompt dismissed");
            return current;
        };

        tracing::info!(consent = %decided, "crash-report consent recorded");
        self.persist(
            Setting::LogSentry,
            Scope::Global,
            Some(Value::from(decided.as_str())),
        );
        decided
    }
}

fn generate_user_id() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "user".to_string());
    let domain = std::env::var("USERDOMAIN").unwrap_or_default();
    let seed = format!(
        "{user}{domain}{}{}",
        std::process::id(),
        chrono::Utc::now().timestamp_millis()
    );
    hex::encode(Sha256::digest(seed.as_bytes()))
}
