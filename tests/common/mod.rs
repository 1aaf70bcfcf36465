//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test context builder for file-backed pipeline runs
pub struct TestContextBuilder {
    temp_dir: TempDir,
    chunk_size: u64,
    visibility_timeout: Option<String>,
    objects: Vec<(String, String, Vec<u8>)>,
}

impl TestContextBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            chunk_size: 10,
            visibility_timeout: None,
            objects: Vec::new(),
        })
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Spool visibility timeout, as a humantime string such as "1s"
    pub fn with_visibility_timeout(mut self, timeout: &str) -> Self {
        self.visibility_timeout = Some(timeout.to_string());
        self
    }

    /// Add a source object to the file store
    pub fn with_object(mut self, bucket: &str, key: &str, body: impl AsRef<[u8]>) -> Self {
        self.objects
            .push((bucket.to_string(), key.to_string(), body.as_ref().to_vec()));
        self
    }

    pub fn build(self) -> Result<TestContext> {
        let root = self.temp_dir.path();
        let objects_dir = root.join("objects");
        let spool_dir = root.join("spool");
        fs::create_dir_all(&objects_dir)?;
        fs::create_dir_all(&spool_dir)?;

        for (bucket, key, body) in &self.objects {
            let path = objects_dir.join(bucket).join(key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, body)?;
        }

        let config_path = root.join("chunkfan.toml");
        let mut config = format!(
            r#"chunk_size = {}

[results]
bucket = "results"
prefix = "results"

[storage]
backend = "file"
base_dir = "{}"

[queue]
backend = "spool"
spool_dir = "{}"
"#,
            self.chunk_size,
            toml_path(&objects_dir),
            toml_path(&spool_dir),
        );
        if let Some(timeout) = &self.visibility_timeout {
            config.push_str(&format!("visibility_timeout = \"{}\"\n", timeout));
        }
        fs::write(&config_path, config)?;

        Ok(TestContext {
            temp_dir: self.temp_dir,
            objects_dir,
            spool_dir,
            config_path,
        })
    }
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

/// A temporary file store, spool queue and matching config file
pub struct TestContext {
    temp_dir: TempDir,
    pub objects_dir: PathBuf,
    pub spool_dir: PathBuf,
    pub config_path: PathBuf,
}

impl TestContext {
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path of an object in the file store
    pub fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.objects_dir.join(bucket).join(key)
    }

    pub fn read_result(&self, location: &str) -> Result<serde_json::Value> {
        let content = fs::read(self.object_path("results", location))?;
        Ok(serde_json::from_slice(&content)?)
    }

    /// Write a file under the context root and return its path
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, content)?;
        Ok(path)
    }

    pub fn config(&self) -> Result<chunkfan::PipelineConfig> {
        Ok(chunkfan::PipelineConfig::from_file(&self.config_path)?)
    }
}

/// S3 notification naming one object
pub fn s3_notification(bucket: &str, key: &str) -> String {
    serde_json::json!({
        "Records": [{
            "eventSource": "aws:s3",
            "s3": {"bucket": {"name": bucket}, "object": {"key": key}}
        }]
    })
    .to_string()
}

/// SQS event carrying raw message bodies
pub fn sqs_event(bodies: &[(&str, &str)]) -> String {
    let records: Vec<_> = bodies
        .iter()
        .map(|(id, body)| {
            serde_json::json!({
                "messageId": id,
                "receiptHandle": format!("rh-{}", id),
                "body": body,
                "attributes": {"ApproximateReceiveCount": "1"},
                "messageAttributes": {}
            })
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}
