use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::StackSettings;
use crate::policy::MalformedPolicyError;
use crate::request::DeploymentRequest;
use crate::writer;

pub const CONTAINER_PORT: u16 = 8080;
pub const MIN_HEALTHY_PERCENT: u32 = 50;
pub const MAX_HEALTHY_PERCENT: u32 = 200;

pub const SERVICE_URL_OUTPUT: &str = "ServiceUrl";
pub const ADDITIONAL_SERVICE_URLS_OUTPUT: &str = "AdditionalServiceUrls";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    MalformedPolicy(#[from] MalformedPolicyError),

    #[error(transparent)]
    Writer(#[from] writer::Error),
}

/// Takes a finished request and turns it into a running service.
#[async_trait]
pub trait ProvisioningBackend {
    async fn provision(
        &self,
        settings: &StackSettings,
        request: DeploymentRequest,
    ) -> Result<ServiceEndpoint, Error>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Network {
    Default,
    Vpc { id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlan {
    pub cpu: u32,
    pub memory_limit_mib: u32,
    pub container_port: u16,
    pub assign_public_ip: bool,
    pub image_directory: PathBuf,
    pub environment: BTreeMap<String, String>,
    /// Container variable name to secret store name.
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerPlan {
    pub public: bool,
    pub health_check_path: String,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsPlan {
    pub hosted_zone: String,
    pub certificate_domain: String,
    pub subject_alternative_names: Vec<String>,
    /// Alias records pointing at the load balancer, one per additional domain.
    pub alias_records: Vec<String>,
}

/// What will be provisioned for one request. Secret values are never part
/// of a plan, only the names they are stored under.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPlan {
    pub stack_name: String,
    pub account: Option<String>,
    pub region: Option<String>,
    pub network: Network,
    pub cluster_name: Option<String>,
    pub task: TaskPlan,
    pub load_balancer: LoadBalancerPlan,
    pub dns: Option<DnsPlan>,
    pub task_role_statements: Vec<Value>,
}

impl DeploymentPlan {
    pub fn render(
        settings: &StackSettings,
        request: &DeploymentRequest,
    ) -> Result<Self, MalformedPolicyError> {
        let mut task_role_statements = vec![];
        for source in &request.policy_statements {
            task_role_statements.extend(source.statements()?);
        }

        let mut environment = BTreeMap::new();
        environment.insert(String::from("PORT"), CONTAINER_PORT.to_string());
        environment.extend(request.plain_variables.clone());

        let secrets = request
            .secret_variables
            .keys()
            .map(|key| (key.clone(), secret_name(&settings.stack_name, key)))
            .collect();

        let dns = match (&request.domain_zone, request.primary_domain()) {
            (Some(zone), Some(primary)) => Some(DnsPlan {
                hosted_zone: zone.clone(),
                certificate_domain: primary.to_string(),
                subject_alternative_names: request.additional_domains().to_vec(),
                alias_records: request.additional_domains().to_vec(),
            }),
            _ => None,
        };

        let network = match &request.vpc_id {
            Some(id) => Network::Vpc { id: id.clone() },
            None => Network::Default,
        };

        return Ok(Self {
            stack_name: settings.stack_name.clone(),
            account: settings.account.clone(),
            region: settings.region.clone(),
            network,
            cluster_name: request.cluster_name.clone(),
            task: TaskPlan {
                cpu: request.effective_cpu_units(),
                memory_limit_mib: request.effective_memory_mib(),
                container_port: CONTAINER_PORT,
                assign_public_ip: true,
                image_directory: request.project_root_directory.clone(),
                environment,
                secrets,
            },
            load_balancer: LoadBalancerPlan {
                public: true,
                health_check_path: request.health_check_path.clone(),
                min_healthy_percent: MIN_HEALTHY_PERCENT,
                max_healthy_percent: MAX_HEALTHY_PERCENT,
            },
            dns,
            task_role_statements,
        });
    }
}

/// Name a secret is stored under in the secret manager.
pub fn secret_name(stack_name: &str, key: &str) -> String {
    return format!("/{}/{}", stack_name, key);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    pub service_url: Option<String>,
    pub additional_service_urls: Vec<String>,
}

impl ServiceEndpoint {
    /// URLs a plan resolves to. Without a hosted zone the service is only
    /// reachable through the load balancer name, which is unknown until the
    /// stack exists.
    pub fn expected(plan: &DeploymentPlan, load_balancer_dns: Option<&str>) -> Self {
        match &plan.dns {
            Some(dns) => Self {
                service_url: Some(format!("https://{}", dns.certificate_domain)),
                additional_service_urls: dns
                    .alias_records
                    .iter()
                    .map(|domain| format!("https://{}", domain))
                    .collect(),
            },
            None => Self {
                service_url: load_balancer_dns.map(|dns| format!("http://{}", dns)),
                additional_service_urls: vec![],
            },
        }
    }

    pub fn from_outputs(outputs: &BTreeMap<String, String>) -> Self {
        let additional_service_urls = match outputs.get(ADDITIONAL_SERVICE_URLS_OUTPUT) {
            Some(urls) => urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(String::from)
                .collect(),
            None => vec![],
        };

        return Self {
            service_url: outputs.get(SERVICE_URL_OUTPUT).cloned(),
            additional_service_urls,
        };
    }
}

/// Renders the plan and writes it to disk for an external deployer.
///
/// The plan only names secrets, their values have to reach the secret store
/// out of band (see `SecretValue::expose`).
pub struct ManifestBackend {
    path: PathBuf,
}

impl ManifestBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        return Self { path: path.into() };
    }
}

#[async_trait]
impl ProvisioningBackend for ManifestBackend {
    async fn provision(
        &self,
        settings: &StackSettings,
        request: DeploymentRequest,
    ) -> Result<ServiceEndpoint, Error> {
        let plan = DeploymentPlan::render(settings, &request)?;
        writer::write_plan(&self.path, &plan)?;

        info!(
            stack = %plan.stack_name,
            path = %self.path.display(),
            secrets = plan.task.secrets.len(),
            statements = plan.task_role_statements.len(),
            "wrote deployment plan"
        );

        return Ok(ServiceEndpoint::expected(&plan, None));
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::config::RawInputs;
    use crate::request::build;

    fn settings() -> StackSettings {
        StackSettings {
            stack_name: String::from("web"),
            account: None,
            region: Some(String::from("eu-west-1")),
        }
    }

    fn request(vars: &[(&str, &str)]) -> DeploymentRequest {
        let mut vars = vars.to_vec();
        vars.push(("hereyaProjectRootDir", "/srv/app"));
        build(&RawInputs::from_vars(vars)).unwrap()
    }

    #[test]
    fn renders_defaults_without_domains() {
        let plan = DeploymentPlan::render(&settings(), &request(&[])).unwrap();

        assert_eq!(Network::Default, plan.network);
        assert_eq!(512, plan.task.cpu);
        assert_eq!(1024, plan.task.memory_limit_mib);
        assert_eq!(8080, plan.task.container_port);
        assert_eq!("8080", plan.task.environment["PORT"]);
        assert_eq!("/", plan.load_balancer.health_check_path);
        assert_eq!(50, plan.load_balancer.min_healthy_percent);
        assert_eq!(200, plan.load_balancer.max_healthy_percent);
        assert_eq!(None, plan.dns);
    }

    #[test]
    fn renders_domains_secrets_and_policies() {
        let plan = DeploymentPlan::render(
            &settings(),
            &request(&[
                ("vpcId", "vpc-1"),
                ("customDomain", "app.example.com,www.example.com,api.example.com"),
                (
                    "hereyaProjectEnv",
                    r#"{"PORT":"9000","TOKEN":"secret://t0k3n","IAM_POLICY_S3":"{\"Statement\":[{\"Effect\":\"Allow\"}]}"}"#,
                ),
            ]),
        )
        .unwrap();

        assert_eq!(
            Network::Vpc {
                id: String::from("vpc-1")
            },
            plan.network
        );
        assert_eq!("9000", plan.task.environment["PORT"]);
        assert_eq!("/web/TOKEN", plan.task.secrets["TOKEN"]);
        assert_eq!(vec![json!({"Effect": "Allow"})], plan.task_role_statements);

        let dns = plan.dns.unwrap();
        assert_eq!("example.com", dns.hosted_zone);
        assert_eq!("app.example.com", dns.certificate_domain);
        assert_eq!(
            vec!["www.example.com", "api.example.com"],
            dns.subject_alternative_names
        );
        assert_eq!(dns.subject_alternative_names, dns.alias_records);
    }

    #[test]
    fn malformed_policy_fails_rendering() {
        let result = DeploymentPlan::render(
            &settings(),
            &request(&[("hereyaProjectEnv", r#"{"iamPolicyBroken":"{...}"}"#)]),
        );

        assert_eq!("iamPolicyBroken", result.unwrap_err().key);
    }

    #[test]
    fn expected_endpoint_with_domains() {
        let plan = DeploymentPlan::render(
            &settings(),
            &request(&[("customDomain", "app.example.com,www.example.com")]),
        )
        .unwrap();

        let endpoint = ServiceEndpoint::expected(&plan, Some("lb-1.elb.amazonaws.com"));
        assert_eq!(Some(String::from("https://app.example.com")), endpoint.service_url);
        assert_eq!(
            vec![String::from("https://www.example.com")],
            endpoint.additional_service_urls
        );
    }

    #[test]
    fn expected_endpoint_without_domains() {
        let plan = DeploymentPlan::render(&settings(), &request(&[])).unwrap();

        let endpoint = ServiceEndpoint::expected(&plan, Some("lb-1.elb.amazonaws.com"));
        assert_eq!(
            Some(String::from("http://lb-1.elb.amazonaws.com")),
            endpoint.service_url
        );
        assert_eq!(true, endpoint.additional_service_urls.is_empty());
        assert_eq!(None, ServiceEndpoint::expected(&plan, None).service_url);
    }

    #[test]
    fn endpoint_from_stack_outputs() {
        let mut outputs = BTreeMap::new();
        outputs.insert(
            String::from("ServiceUrl"),
            String::from("https://app.example.com"),
        );
        outputs.insert(
            String::from("AdditionalServiceUrls"),
            String::from("https://a.example.com,https://b.example.com"),
        );

        let endpoint = ServiceEndpoint::from_outputs(&outputs);
        assert_eq!(Some(String::from("https://app.example.com")), endpoint.service_url);
        assert_eq!(2, endpoint.additional_service_urls.len());
        assert_eq!(ServiceEndpoint::default(), ServiceEndpoint::from_outputs(&BTreeMap::new()));
    }

    #[tokio::test]
    async fn manifest_backend_writes_plan_without_secret_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plan.json");
        let backend = ManifestBackend::new(&path);

        let endpoint = backend
            .provision(
                &settings(),
                request(&[
                    ("customDomain", "app.example.com"),
                    ("hereyaProjectEnv", r#"{"DB_PASSWORD":"secret://hunter2"}"#),
                ]),
            )
            .await
            .unwrap();

        assert_eq!(Some(String::from("https://app.example.com")), endpoint.service_url);

        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(false, contents.contains("hunter2"));
        assert_eq!(true, contents.contains("/web/DB_PASSWORD"));
    }

    #[tokio::test]
    async fn manifest_backend_reports_malformed_policy() {
        let dir = tempdir().unwrap();
        let backend = ManifestBackend::new(dir.path().join("plan.json"));

        let result = backend
            .provision(
                &settings(),
                request(&[("hereyaProjectEnv", r#"{"IAM_POLICY_X":"[]"}"#)]),
            )
            .await;

        match result.err().unwrap() {
            Error::MalformedPolicy(_) => {}
            _ => panic!("Expected `MalformedPolicy` error"),
        }
        assert_eq!(false, dir.path().join("plan.json").exists());
    }
}
