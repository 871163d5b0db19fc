use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use jsonschema::JSONSchema;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Job request fails schema validation")]
    Validation,

    #[error("Job request is not valid JSON")]
    Decode,

    #[error("Job request JSON has an unexpected shape")]
    Deserialisation,

    #[error("Can't read job request")]
    Read,
}

/// A job request message dropped by the orchestrator, plus the schema it must satisfy
pub struct Message {
    pub path: PathBuf,
    pub compiled_schema: JSONSchema,
}

impl Message {
    pub fn read(&self) -> Result<JobRequest, RequestError> {
        let json: Value = self.parse_untyped_json()?;

        match self.validate(&json) {
            Ok(_) => {
                info!("Job request is valid");
                self.parse_json(json)
            }
            Err(err) => {
                warn!("Job request fails validation");
                Err(err)
            }
        }
    }

    fn validate(&self, json: &Value) -> Result<(), RequestError> {
        info!("Validating raw job request against JSON schema");
        match self.compiled_schema.validate(json) {
            Ok(_) => Ok(()),
            Err(errors) => {
                for error in errors {
                    warn!("Validation error: {error}");
                }
                Err(RequestError::Validation)
            }
        }
    }

    fn read_file(&self) -> Result<String, RequestError> {
        let path: &Path = self.path.as_path();
        info!("Reading job request at {}", path.display());
        fs::read_to_string(path).map_err(|err| {
            warn!("Can't read job request at path {}: {}", path.display(), err);
            RequestError::Read
        })
    }

    fn parse_json(&self, value: Value) -> Result<JobRequest, RequestError> {
        info!("Deserialising valid JSON into typed job request");
        serde_json::from_value::<JobRequest>(value)
            .map_err(|_| RequestError::Deserialisation)
    }

    fn parse_untyped_json(&self) -> Result<Value, RequestError> {
        info!("Parsing JSON into untyped structure");
        let json_string = self.read_file()?;
        serde_json::from_str::<Value>(&json_string).map_err(|_| RequestError::Decode)
    }
}

/// The external tools a job request can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Sortmerna,
    Kneaddata,
    Trim,
    Shogun,
}

impl fmt::Display for ToolKind {
    /// program name, used in step and error messages
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ToolKind::Sortmerna => write!(f, "Sortmerna"),
            ToolKind::Kneaddata => write!(f, "KneadData"),
            ToolKind::Trim => write!(f, "Atropos"),
            ToolKind::Shogun => write!(f, "Shogun"),
        }
    }
}

/// Raw per-sample FASTQ inputs of the artifact the job runs on
#[derive(Debug, Deserialize, Serialize)]
pub struct InputFiles {
    pub raw_forward_seqs: Vec<PathBuf>,
    #[serde(default)]
    pub raw_reverse_seqs: Vec<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct JobRequest {
    pub job_id: String,
    pub tool: ToolKind,
    pub parameters: BTreeMap<String, String>,
    pub files: InputFiles,
    pub mapping_file: PathBuf,
}
