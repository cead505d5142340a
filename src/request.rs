use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::debug;

use crate::classify::{classify_configuration, SecretValue};
use crate::config::{self, RawInputs};
use crate::domains::{self, InvalidDomainError};
use crate::policy::PolicySource;

pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";
pub const DEFAULT_CPU_UNITS: u32 = 512;
pub const DEFAULT_MEMORY_MIB: u32 = 1024;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("{0} context variable is required")]
    MissingRequiredInput(String),

    #[error(transparent)]
    InvalidDomain(#[from] InvalidDomainError),

    #[error("{field} has to be a positive integer, got `{value}`")]
    InvalidInteger { field: String, value: String },

    #[error("{} has to be a JSON object of strings: {0}", config::PROJECT_ENV)]
    MalformedEnvironment(String),
}

/// Everything the provisioning backend needs for one deployment. Built once
/// by `build` and handed over by value.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRequest {
    /// `None` selects the account's default network.
    pub vpc_id: Option<String>,
    pub health_check_path: String,
    pub cpu_units: Option<u32>,
    pub memory_mib: Option<u32>,
    /// Primary domain first, the rest are additional domains.
    pub domains: Vec<String>,
    pub domain_zone: Option<String>,
    pub cluster_name: Option<String>,
    pub plain_variables: BTreeMap<String, String>,
    pub secret_variables: BTreeMap<String, SecretValue>,
    pub policy_statements: Vec<PolicySource>,
    pub project_root_directory: PathBuf,
}

impl DeploymentRequest {
    pub fn primary_domain(&self) -> Option<&str> {
        return self.domains.first().map(String::as_str);
    }

    pub fn additional_domains(&self) -> &[String] {
        return self.domains.get(1..).unwrap_or(&[]);
    }

    pub fn effective_cpu_units(&self) -> u32 {
        return self.cpu_units.unwrap_or(DEFAULT_CPU_UNITS);
    }

    pub fn effective_memory_mib(&self) -> u32 {
        return self.memory_mib.unwrap_or(DEFAULT_MEMORY_MIB);
    }
}

/// Validates and normalizes raw inputs. Pure: no I/O, nothing is contacted.
pub fn build(inputs: &RawInputs) -> Result<DeploymentRequest, Error> {
    let project_root_directory = match non_blank(&inputs.hereya_project_root_dir) {
        Some(dir) => PathBuf::from(dir),
        None => {
            return Err(Error::MissingRequiredInput(String::from(
                config::PROJECT_ROOT_DIR,
            )))
        }
    };

    let cpu_units = parse_positive(config::CPU, non_blank(&inputs.cpu))?;
    let memory_mib = parse_positive(config::MEMORY_MIB, non_blank(&inputs.memory_mib))?;

    let domains = domains::parse_domain_list(inputs.custom_domain.as_deref());
    let domain_zone = match non_blank(&inputs.custom_domain_zone) {
        Some(zone) => Some(zone.to_string()),
        None => domains::derive_zone(domains.first().map(String::as_str))?,
    };

    let entries = parse_environment(non_blank(&inputs.hereya_project_env))?;
    let classified = classify_configuration(entries);
    let policy_statements = classified
        .policy
        .into_iter()
        .map(|(key, document)| PolicySource::new(key, document))
        .collect::<Vec<_>>();

    debug!(
        domains = domains.len(),
        plain = classified.plain.len(),
        secrets = ?classified.secret.keys().collect::<Vec<_>>(),
        policies = policy_statements.len(),
        "built deployment request"
    );

    return Ok(DeploymentRequest {
        vpc_id: non_blank(&inputs.vpc_id).map(String::from),
        health_check_path: non_blank(&inputs.health_check_path)
            .unwrap_or(DEFAULT_HEALTH_CHECK_PATH)
            .to_string(),
        cpu_units,
        memory_mib,
        domains,
        domain_zone,
        cluster_name: non_blank(&inputs.cluster_name).map(String::from),
        plain_variables: classified.plain,
        secret_variables: classified.secret,
        policy_statements,
        project_root_directory,
    });
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    return value.as_deref().filter(|value| !value.trim().is_empty());
}

fn parse_positive(field: &str, value: Option<&str>) -> Result<Option<u32>, Error> {
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };

    match value.trim().parse::<u32>() {
        Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
        _ => Err(Error::InvalidInteger {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_environment(raw: Option<&str>) -> Result<BTreeMap<String, String>, Error> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(BTreeMap::new()),
    };

    match serde_json::from_str(raw) {
        Ok(entries) => Ok(entries),
        Err(error) => Err(Error::MalformedEnvironment(error.to_string())),
    }
}
