use std::collections::BTreeMap;

use aws_config::meta::region::RegionProviderChain;
use aws_types::region::Region;
use tracing::{debug, warn};

use crate::config::StackSettings;
use crate::plan::ServiceEndpoint;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Service error ocurred: {0}.")]
    ServiceError(String),

    #[error("Stack not found: {0}")]
    NotFoundError(String),
}

/// A deployed stack whose outputs carry the service URLs.
pub struct Stack {
    pub stack_name: String,

    client: aws_sdk_cloudformation::Client,
}

impl Stack {
    pub async fn new(settings: &StackSettings) -> Self {
        let region = RegionProviderChain::first_try(settings.region.clone().map(Region::new))
            .or_default_provider();

        let sdk_config = aws_config::from_env().region(region).load().await;
        let client = aws_sdk_cloudformation::Client::new(&sdk_config);

        return Self {
            stack_name: settings.stack_name.clone(),
            client,
        };
    }

    pub async fn get_outputs(&self) -> Result<BTreeMap<String, String>, Error> {
        let result = self
            .client
            .describe_stacks()
            .stack_name(&self.stack_name)
            .send()
            .await;

        let result = match result {
            Ok(data) => data,
            Err(err) => {
                let err = aws_sdk_cloudformation::Error::from(err);
                return Err(Error::ServiceError(err.to_string()));
            }
        };

        let stacks = result.stacks().unwrap_or(&[]);
        let stack = match stacks.first() {
            Some(stack) => stack,
            None => return Err(Error::NotFoundError(self.stack_name.clone())),
        };

        let mut outputs = BTreeMap::new();
        for output in stack.outputs().unwrap_or(&[]) {
            match (output.output_key(), output.output_value()) {
                (Some(key), Some(value)) => {
                    outputs.insert(key.to_string(), value.to_string());
                }
                _ => warn!(stack = %self.stack_name, "skipping incomplete stack output"),
            }
        }

        debug!(stack = %self.stack_name, outputs = outputs.len(), "fetched stack outputs");
        return Ok(outputs);
    }

    pub async fn endpoint(&self) -> Result<ServiceEndpoint, Error> {
        let outputs = self.get_outputs().await?;
        return Ok(ServiceEndpoint::from_outputs(&outputs));
    }
}
