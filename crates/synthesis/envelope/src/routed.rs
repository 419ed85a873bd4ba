use crate::envelope::ResilientEnvelope;
use crate::error::EnvelopeError;
use std::sync::Arc;
use synthesis_oracle::{GenerateOptions, GenerativeOracle, OraclePrompt, OracleResult};

/// A named oracle endpoint.
#[derive(Clone)]
pub struct OracleRoute {
    pub name: String,
    pub oracle: Arc<dyn GenerativeOracle>,
}

impl OracleRoute {
    pub fn new(name: impl Into<String>, oracle: Arc<dyn GenerativeOracle>) -> Self {
        Self {
            name: name.into(),
            oracle,
        }
    }
}

impl std::fmt::Debug for OracleRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleRoute").field("name", &self.name).finish()
    }
}

/// Oracle client bound to an envelope, with an optional fallback route.
#[derive(Clone)]
pub struct RoutedOracle {
    envelope: Arc<ResilientEnvelope>,
    primary: OracleRoute,
    secondary: Option<OracleRoute>,
}

impl RoutedOracle {
    pub fn new(envelope: Arc<ResilientEnvelope>, primary: OracleRoute) -> Self {
        Self {
            envelope,
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: OracleRoute) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn envelope(&self) -> &Arc<ResilientEnvelope> {
        &self.envelope
    }

    /// Generate through the envelope, falling back on quota exhaustion
    /// when a secondary route is configured.
    pub async fn generate(
        &self,
        operation: &str,
        prompt: &OraclePrompt,
        options: &GenerateOptions,
    ) -> Result<OracleResult, EnvelopeError> {
        match &self.secondary {
            None => {
                let oracle = &self.primary.oracle;
                self.envelope
                    .execute(&self.primary.name, operation, move || {
                        oracle.generate(prompt, options)
                    })
                    .await
            }
            Some(secondary) => {
                let primary = &self.primary;
                self.envelope
                    .execute_with_fallback(&primary.name, &secondary.name, operation, move |route| {
                        let target = if route == primary.name {
                            &primary.oracle
                        } else {
                            &secondary.oracle
                        };
                        target.generate(prompt, options)
                    })
                    .await
            }
        }
    }
}

impl std::fmt::Debug for RoutedOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutedOracle")
            .field("primary", &self.primary)
            .field("secondary", &self.secondary)
            .finish()
    }
}
