use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::plan::{DeploymentPlan, ServiceEndpoint};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Unable to write {path}: {message}")]
    Io { path: String, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub fn write_plan(path: &Path, plan: &DeploymentPlan) -> Result<(), Error> {
    return write_json(path, plan);
}

pub fn write_endpoint(path: &Path, endpoint: &ServiceEndpoint) -> Result<(), Error> {
    return write_json(path, endpoint);
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
    let file_contents = match serde_json::to_string_pretty(value) {
        Ok(contents) => contents,
        Err(error) => return Err(Error::Serialization(error.to_string())),
    };

    match fs::write(path, file_contents) {
        Ok(_) => Ok(()),
        Err(error) => Err(Error::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }),
    }
}
