use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use jsonschema::{JSONSchema, SchemaResolver, SchemaResolverError};
use serde_json::Value;
use url::Url;

/// Compile the job request schema shipped in the schema directory
pub fn load_schema(schema_dir: &Path) -> Result<JSONSchema> {
    let schema_json = read_json_from_path(&schema_dir.join("job.json"))?;
    let resolver = LocalResolver { schema_dir: PathBuf::from(schema_dir) };
    JSONSchema::options()
        .with_resolver(resolver)
        .compile(&schema_json)
        .map_err(|err| anyhow!("invalid job request schema: {err}"))
}

fn read_json_from_path(path: &Path) -> Result<Value> {
    let json_string = fs::read_to_string(path)
        .with_context(|| format!("can't read schema at {}", path.display()))?;
    serde_json::from_str(&json_string)
        .with_context(|| format!("invalid JSON in {}", path.display()))
}

/*
The job schema contains relative references to other schema files in the same
directory, using a local json-schema: scheme
*/
struct LocalResolver {
    schema_dir: PathBuf,
}

impl SchemaResolver for LocalResolver {
    fn resolve(
        &self,
        _root_schema: &Value,
        url: &Url,
        _original_reference: &str,
    ) -> Result<Arc<Value>, SchemaResolverError> {
        match url.scheme() {
            "json-schema" => {
                let local_schema_path: PathBuf = self.schema_dir.join(url.path());
                Ok(Arc::new(read_json_from_path(local_schema_path.as_path())?))
            }
            _ => Err(anyhow!("scheme is not supported")),
        }
    }
}
