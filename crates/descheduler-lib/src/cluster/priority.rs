//! Priority threshold resolution

use crate::config::StrategyParams;
use crate::strategy::PriorityResolver;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::scheduling::v1::PriorityClass;
use kube::{Api, Client};
use tracing::debug;

/// Priority of system-critical pods; the cutoff when nothing is configured
pub const SYSTEM_CRITICAL_PRIORITY: i32 = 2_000_000_000;

/// Where the effective priority cutoff comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrioritySource<'a> {
    Value(i32),
    ClassName(&'a str),
    Default,
}

impl<'a> PrioritySource<'a> {
    pub fn from_params(params: &'a StrategyParams) -> Self {
        if let Some(value) = params.threshold_priority {
            return PrioritySource::Value(value);
        }
        match params.threshold_priority_class_name.as_deref() {
            Some(name) if !name.is_empty() => PrioritySource::ClassName(name),
            _ => PrioritySource::Default,
        }
    }
}

/// Resolves named priority classes against the API server
pub struct KubePriorityResolver {
    client: Client,
}

impl KubePriorityResolver {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriorityResolver for KubePriorityResolver {
    async fn resolve(&self, params: &StrategyParams) -> Result<i32> {
        match PrioritySource::from_params(params) {
            PrioritySource::Value(value) => Ok(value),
            PrioritySource::Default => Ok(SYSTEM_CRITICAL_PRIORITY),
            PrioritySource::ClassName(name) => {
                let classes: Api<PriorityClass> = Api::all(self.client.clone());
                let class = classes
                    .get(name)
                    .await
                    .with_context(|| format!("Failed to get priority class {name}"))?;
                debug!(priority_class = %name, value = class.value, "Resolved priority class");
                Ok(class.value)
            }
        }
    }
}
