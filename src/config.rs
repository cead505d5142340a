use serde::{Deserialize, Serialize};
use std::{env, fs, io, path::PathBuf};
use validator::{Validate, ValidationError};

pub const VPC_ID: &str = "vpcId";
pub const HEALTH_CHECK_PATH: &str = "healthCheckPath";
pub const CPU: &str = "cpu";
pub const MEMORY_MIB: &str = "memoryMiB";
pub const CUSTOM_DOMAIN: &str = "customDomain";
pub const CUSTOM_DOMAIN_ZONE: &str = "customDomainZone";
pub const CLUSTER_NAME: &str = "clusterName";
pub const PROJECT_ENV: &str = "hereyaProjectEnv";
pub const PROJECT_ROOT_DIR: &str = "hereyaProjectRootDir";

pub const STACK_NAME: &str = "STACK_NAME";
pub const DEFAULT_ACCOUNT: &str = "CDK_DEFAULT_ACCOUNT";
pub const DEFAULT_REGION: &str = "CDK_DEFAULT_REGION";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Validation errors: {0}")]
    ValidationError(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// Deployment inputs exactly as they arrive from the environment or an inputs
/// file. Nothing here is interpreted yet; see `request::build`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawInputs {
    pub vpc_id: Option<String>,
    pub health_check_path: Option<String>,
    pub cpu: Option<String>,
    #[serde(rename = "memoryMiB")]
    pub memory_mib: Option<String>,
    pub custom_domain: Option<String>,
    pub custom_domain_zone: Option<String>,
    pub cluster_name: Option<String>,
    pub hereya_project_env: Option<String>,
    pub hereya_project_root_dir: Option<String>,
}

impl RawInputs {
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut inputs = RawInputs::default();
        for (key, value) in vars {
            let slot = match key.as_ref() {
                VPC_ID => &mut inputs.vpc_id,
                HEALTH_CHECK_PATH => &mut inputs.health_check_path,
                CPU => &mut inputs.cpu,
                MEMORY_MIB => &mut inputs.memory_mib,
                CUSTOM_DOMAIN => &mut inputs.custom_domain,
                CUSTOM_DOMAIN_ZONE => &mut inputs.custom_domain_zone,
                CLUSTER_NAME => &mut inputs.cluster_name,
                PROJECT_ENV => &mut inputs.hereya_project_env,
                PROJECT_ROOT_DIR => &mut inputs.hereya_project_root_dir,
                _ => continue,
            };
            *slot = Some(value.into());
        }

        return inputs;
    }

    pub fn from_env() -> Self {
        return Self::from_vars(process_vars());
    }

    /// Non-blank values in `overrides` replace the ones in `self`. A blank
    /// override counts as absent and keeps the existing value.
    pub fn merged_with(self, overrides: RawInputs) -> Self {
        return Self {
            vpc_id: prefer(overrides.vpc_id, self.vpc_id),
            health_check_path: prefer(overrides.health_check_path, self.health_check_path),
            cpu: prefer(overrides.cpu, self.cpu),
            memory_mib: prefer(overrides.memory_mib, self.memory_mib),
            custom_domain: prefer(overrides.custom_domain, self.custom_domain),
            custom_domain_zone: prefer(overrides.custom_domain_zone, self.custom_domain_zone),
            cluster_name: prefer(overrides.cluster_name, self.cluster_name),
            hereya_project_env: prefer(overrides.hereya_project_env, self.hereya_project_env),
            hereya_project_root_dir: prefer(
                overrides.hereya_project_root_dir,
                self.hereya_project_root_dir,
            ),
        };
    }
}

fn prefer(value: Option<String>, fallback: Option<String>) -> Option<String> {
    return value.filter(|value| !value.trim().is_empty()).or(fallback);
}

/// Where the stack lives. Only the provisioning and lookup side needs this,
/// the request builder never sees it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct StackSettings {
    #[validate(length(min = 1))]
    pub stack_name: String,

    #[validate(custom = "validate_account")]
    pub account: Option<String>,

    #[validate(custom = "validate_region")]
    pub region: Option<String>,
}

impl StackSettings {
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut settings = StackSettings::default();
        for (key, value) in vars {
            match key.as_ref() {
                STACK_NAME => settings.stack_name = value.into(),
                DEFAULT_ACCOUNT => settings.account = Some(value.into()),
                DEFAULT_REGION => settings.region = Some(value.into()),
                _ => (),
            }
        }

        match settings.validate() {
            Ok(_) => (),
            Err(error) => return Err(Error::ValidationError(error.to_string())),
        }

        return Ok(settings);
    }

    pub fn from_env() -> Result<Self, Error> {
        return Self::from_vars(process_vars());
    }
}

pub fn parse(path: &PathBuf) -> Result<RawInputs, Error> {
    let contents = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    let inputs: RawInputs = match serde_yaml::from_str(&contents) {
        Ok(data) => Ok(data),
        Err(error) => Err(Error::ParsingError(error.to_string())),
    }?;

    return Ok(inputs);
}

// Non-unicode variables can't be any of ours, skip them instead of panicking.
fn process_vars() -> impl Iterator<Item = (String, String)> {
    env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn validate_account(account: &str) -> Result<(), ValidationError> {
    if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new(
            "The account id has to consist of exactly twelve digits",
        ));
    }

    return Ok(());
}

fn validate_region(region: &str) -> Result<(), ValidationError> {
    let parts: Vec<&str> = region.split('-').collect();
    let (number, name) = match parts.split_last() {
        Some(split) => split,
        None => return Err(ValidationError::new("The region cannot be empty")),
    };

    let well_formed = name.len() >= 2
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && name
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase()));
    if !well_formed {
        return Err(ValidationError::new(
            "The region has to look like `eu-west-1`",
        ));
    }

    return Ok(());
}
