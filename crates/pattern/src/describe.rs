use crate::pattern::Pattern;
use crate::prompts;
use std::collections::HashMap;
use std::time::Duration;
use storyline_graph::Cluster;
use storyline_syntax::{CollaboratorError, LanguageConfig};
use thiserror::Error;

/// External natural-language generator consulted by [`Describer`].
pub trait DescriptionGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, CollaboratorError>;
}

#[derive(Debug, Error)]
pub enum DescribeError {
    /// The generator failed on every attempt the retry policy allows.
    #[error("description generation exhausted after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        source: CollaboratorError,
    },
}

/// Bounded retry with exponential backoff.
///
/// Generation failures surface as [`DescribeError::Exhausted`] once the
/// allowed attempts are spent; the analysis result itself is unaffected,
/// only the description is missing.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Generates and caches pattern descriptions.
///
/// Each pattern is described at most once: the first successful result is
/// cached under the pattern's stable id and returned on later calls.
pub struct Describer<'a> {
    generator: &'a dyn DescriptionGenerator,
    policy: RetryPolicy,
    cache: HashMap<String, String>,
}

impl<'a> Describer<'a> {
    #[must_use]
    pub fn new(generator: &'a dyn DescriptionGenerator) -> Self {
        Self::with_policy(generator, RetryPolicy::default())
    }

    #[must_use]
    pub fn with_policy(generator: &'a dyn DescriptionGenerator, policy: RetryPolicy) -> Self {
        Self {
            generator,
            policy,
            cache: HashMap::new(),
        }
    }

    /// Describe one pattern.
    pub fn describe(
        &mut self,
        pattern: &Pattern,
        cluster: &Cluster,
        config: &LanguageConfig,
    ) -> Result<String, DescribeError> {
        let key = pattern.id(cluster);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let prompt = prompts::for_pattern(pattern, cluster, config);
        let description = self.generate_with_retry(&prompt)?;
        self.cache.insert(key, description.clone());
        Ok(description)
    }

    /// Summarize several already-described groups into one description. A
    /// single description is passed through untouched.
    pub fn describe_group(&self, descriptions: &[String]) -> Result<String, DescribeError> {
        if let [single] = descriptions {
            return Ok(single.clone());
        }
        self.generate_with_retry(&prompts::for_group(descriptions))
    }

    /// Cached descriptions, keyed by pattern id.
    #[must_use]
    pub fn cache(&self) -> &HashMap<String, String> {
        &self.cache
    }

    fn generate_with_retry(&self, prompt: &str) -> Result<String, DescribeError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last = None;
        for attempt in 0..attempts {
            match self.generator.generate(prompt) {
                Ok(text) => return Ok(text),
                Err(err) => {
                    log::warn!("description attempt {} failed: {err}", attempt + 1);
                    last = Some(err);
                    if attempt + 1 < attempts {
                        std::thread::sleep(self.policy.delay(attempt));
                    }
                }
            }
        }
        Err(DescribeError::Exhausted {
            attempts,
            source: last.unwrap_or_else(|| CollaboratorError::new("generator returned nothing")),
        })
    }
}
