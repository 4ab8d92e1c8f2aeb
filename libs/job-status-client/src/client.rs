// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Supervisor client used by a running job

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::header::{EXPIRES, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::environment::JobEnvironment;
use crate::error::{ComError, Result};
use crate::module::DependencyResult;

/// File name the supervisor receives for every uploaded result
const RESULT_FILE_NAME: &str = "result.json";

/// Content type of the uploaded result
const RESULT_CONTENT_TYPE: &str = "application/json";

/// Lifecycle label of a client
///
/// Only informational: nothing stops `status()` or `done()` from being
/// called again after `Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    /// Constructed, initial status reported, dependencies resolved
    Ready,
    /// The result has been handed to the supervisor
    Done,
}

/// Client for reporting job progress and exchanging results
///
/// A value of this type only exists after the initial status report and
/// every dependency download have succeeded.
///
/// Downloaded dependency files belong to the caller. They survive the
/// client unless [`JobStatusClient::cleanup`] is called.
#[derive(Debug)]
pub struct JobStatusClient {
    http: Client,
    env: JobEnvironment,
    status_endpoint: String,
    results: BTreeMap<String, DependencyResult>,
    phase: JobPhase,
}

impl JobStatusClient {
    /// Load the job environment from the process and connect
    pub async fn from_env() -> Result<Self> {
        Self::new(JobEnvironment::from_env()?).await
    }

    /// Create a client with a default HTTP client
    pub async fn new(env: JobEnvironment) -> Result<Self> {
        let http = Client::builder().build()?;
        Self::with_http_client(env, http).await
    }

    /// Create a client on top of an existing HTTP client
    ///
    /// Reports `0% initializing` to the supervisor (unless in debug mode)
    /// and resolves every declared dependency in order.
    pub async fn with_http_client(env: JobEnvironment, http: Client) -> Result<Self> {
        let status_endpoint = env.status_endpoint();
        let dependencies = env.dependencies().to_vec();

        let mut client = Self {
            http,
            env,
            status_endpoint,
            results: BTreeMap::new(),
            phase: JobPhase::Ready,
        };

        if !client.is_debug() {
            client.report(0, "initializing").await?;
        }

        for name in dependencies {
            match client.resolve_dependency(&name).await {
                Ok(result) => {
                    client.results.insert(name, result);
                }
                Err(e) => {
                    // Don't leave earlier downloads behind for a client
                    // the caller never gets to see.
                    if let Err(cleanup_err) = client.cleanup().await {
                        tracing::warn!(
                            job_id = %client.env.job_id(),
                            error = %cleanup_err,
                            "Failed to remove module results after aborted initialization"
                        );
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(
            job_id = %client.env.job_id(),
            dependencies = client.results.len(),
            debug = client.is_debug(),
            "Job status client initialized"
        );

        Ok(client)
    }

    /// Resolve the result of an upstream module
    ///
    /// In debug mode the raw result reference is returned without any
    /// network access. Otherwise the result is streamed into a new
    /// temporary file which is left on disk for the caller.
    pub async fn resolve_dependency(&self, name: &str) -> Result<DependencyResult> {
        let module = self
            .env
            .module(name)
            .ok_or_else(|| ComError::ModuleNotFound(name.to_string()))?;

        if !module.is_completed() {
            return Err(ComError::ModuleNotReady {
                module: name.to_string(),
                status: module.status.clone(),
            });
        }

        // A completed module without a result has nothing to hand over yet
        let result_ref = module
            .result
            .as_deref()
            .ok_or_else(|| ComError::ModuleNotReady {
                module: name.to_string(),
                status: module.status.clone(),
            })?;

        if self.is_debug() {
            return Ok(DependencyResult::Reference(result_ref.to_string()));
        }

        tracing::debug!(module = %name, url = %result_ref, "Downloading module result");

        let response = self.http.get(result_ref).send().await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(
                module = %name,
                url = %result_ref,
                status = %response.status(),
                "Module result download failed"
            );
            return Err(ComError::download_failed(response).await);
        }

        let path = self.stream_to_temp_file(response).await?;
        tracing::debug!(module = %name, path = %path.display(), "Module result downloaded");

        Ok(DependencyResult::Downloaded(path))
    }

    /// Write a response body into a fresh temporary file that outlives us
    async fn stream_to_temp_file(&self, response: reqwest::Response) -> Result<PathBuf> {
        let prefix = format!("{}-", self.unique_module_string());
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile()?
            .into_parts();

        // temp_path removes the file on drop until it is kept, so an early
        // return below cleans up after itself.
        let mut file = File::from_std(file);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        drop(file);

        let path = temp_path.keep().map_err(|e| e.error)?;
        Ok(path)
    }

    /// Resolved result of a declared dependency
    pub fn dependency(&self, name: &str) -> Option<&DependencyResult> {
        self.results.get(name)
    }

    /// All resolved dependency results, keyed by module name
    pub fn dependencies(&self) -> &BTreeMap<String, DependencyResult> {
        &self.results
    }

    /// Look up a job parameter
    ///
    /// Falsy values (`null`, `false`, `0`, `""`, `[]`, `{}`) are reported as
    /// absent, which is what existing jobs rely on. Use
    /// [`JobStatusClient::get_raw`] to tell the two apart.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_raw(key).filter(|value| is_truthy(value))
    }

    /// Look up a job parameter exactly as it was supplied
    pub fn get_raw(&self, key: &str) -> Option<&Value> {
        self.env.config().get(key)
    }

    /// Report progress to the supervisor
    ///
    /// Progress is passed through as given; it need not be monotonic.
    pub async fn status(&self, progress: u8, message: &str) -> Result<()> {
        if self.is_debug() {
            return Ok(());
        }
        self.report(progress, message).await
    }

    /// Upload the job result
    ///
    /// Reports `100% uploading`, then posts the file to the result resource.
    /// No final status is sent afterwards; callers wanting one follow up
    /// with `status(100, "done")`.
    pub async fn done(&mut self, result_file: impl AsRef<Path>) -> Result<()> {
        if !self.is_debug() {
            self.report(100, "uploading").await?;
            self.upload_result(result_file.as_ref()).await?;
        }
        self.phase = JobPhase::Done;
        Ok(())
    }

    async fn upload_result(&self, result_file: &Path) -> Result<()> {
        let contents = tokio::fs::read(result_file).await?;
        let size = contents.len();

        let mut headers = HeaderMap::new();
        headers.insert(EXPIRES, HeaderValue::from_static("0"));
        let part = Part::bytes(contents)
            .file_name(RESULT_FILE_NAME)
            .mime_str(RESULT_CONTENT_TYPE)?
            .headers(headers);
        let form = Form::new().part("file", part);

        let url = self.env.result_endpoint();
        tracing::debug!(url = %url, path = %result_file.display(), size, "Uploading result");

        let response = self.http.post(&url).multipart(form).send().await?;
        if response.status() != StatusCode::OK {
            tracing::warn!(url = %url, status = %response.status(), "Result upload failed");
            return Err(ComError::status_failed("upload result", response).await);
        }

        tracing::info!(job_id = %self.env.job_id(), size, "Result uploaded");
        Ok(())
    }

    async fn report(&self, progress: u8, message: &str) -> Result<()> {
        tracing::debug!(
            job_id = %self.env.job_id(),
            progress,
            status_message = %message,
            "Reporting status"
        );

        let response = self
            .http
            .patch(&self.status_endpoint)
            .form(&[("progress", progress.to_string()), ("message", message.to_string())])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            tracing::warn!(
                url = %self.status_endpoint,
                status = %response.status(),
                "Status update failed"
            );
            return Err(ComError::status_failed("update status", response).await);
        }

        Ok(())
    }

    /// Delete every downloaded dependency file and forget all results
    ///
    /// Files that are already gone are not an error. All files are
    /// attempted; the first failure is returned.
    pub async fn cleanup(&mut self) -> Result<()> {
        let mut first_err = None;

        for (name, result) in std::mem::take(&mut self.results) {
            let DependencyResult::Downloaded(path) = result else {
                continue;
            };
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(module = %name, path = %path.display(), "Removed module result")
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(
                        module = %name,
                        path = %path.display(),
                        error = %e,
                        "Failed to remove module result"
                    );
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.env.is_debug()
    }

    /// Job id made safe for use in file names (`/` becomes `_`)
    pub fn unique_module_string(&self) -> String {
        self.env.unique_id()
    }

    pub fn job_id(&self) -> &str {
        self.env.job_id()
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_truthiness() {
        for falsy in [
            json!(null),
            json!(false),
            json!(0),
            json!(0.0),
            json!(""),
            json!([]),
            json!({}),
        ] {
            assert!(!is_truthy(&falsy), "{} should be falsy", falsy);
        }

        for truthy in [
            json!(true),
            json!(1),
            json!(-1),
            json!(0.5),
            json!("0"),
            json!([0]),
            json!({"a": null}),
        ] {
            assert!(is_truthy(&truthy), "{} should be truthy", truthy);
        }
    }
}
