// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Job environment loaded from the variables the orchestrator injects
//!
//! | Variable         | Format                                  | Required |
//! |------------------|-----------------------------------------|----------|
//! | `JOB_ID`         | string                                  | yes      |
//! | `DEPENDENCIES`   | JSON array of module names              | yes      |
//! | `STATUS_URL`     | supervisor base URL                     | yes      |
//! | `PARAMETER`      | JSON object                             | yes      |
//! | `MODULE_RESULTS` | JSON object: name -> `{status, result}` | yes      |
//! | `DEBUG_MODE`     | `true`, `1` or `yes` to enable          | no       |

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ComError, Result};
use crate::module::ModuleInfo;

pub const JOB_ID_VAR: &str = "JOB_ID";
pub const DEPENDENCIES_VAR: &str = "DEPENDENCIES";
pub const STATUS_URL_VAR: &str = "STATUS_URL";
pub const PARAMETER_VAR: &str = "PARAMETER";
pub const MODULE_RESULTS_VAR: &str = "MODULE_RESULTS";
pub const DEBUG_MODE_VAR: &str = "DEBUG_MODE";

/// Everything a job learns about itself at start-up
///
/// Immutable once loaded.
#[derive(Clone, Debug)]
pub struct JobEnvironment {
    job_id: String,
    dependencies: Vec<String>,
    status_url: String,
    config: Map<String, Value>,
    modules: BTreeMap<String, ModuleInfo>,
    debug: bool,
}

impl JobEnvironment {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load through an arbitrary variable lookup
    ///
    /// Variables are checked in a fixed order and the first one missing or
    /// malformed is reported.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Accepts "true", "1", "yes" (case-insensitive) as true, anything else as false
        let debug = lookup(DEBUG_MODE_VAR)
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let job_id = required(&lookup, JOB_ID_VAR)?;
        let dependencies: Vec<String> = required_json(&lookup, DEPENDENCIES_VAR)?;
        let status_url = required(&lookup, STATUS_URL_VAR)?;
        let config: Map<String, Value> = required_json(&lookup, PARAMETER_VAR)?;
        let modules: BTreeMap<String, ModuleInfo> = required_json(&lookup, MODULE_RESULTS_VAR)?;

        Ok(Self {
            job_id,
            dependencies,
            status_url,
            config,
            modules,
            debug,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Declared dependency names, in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    pub fn module(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules.get(name)
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Status resource of this job: `{STATUS_URL}/{JOB_ID}`
    pub fn status_endpoint(&self) -> String {
        format!("{}/{}", self.status_url.trim_end_matches('/'), self.job_id)
    }

    /// Result upload resource: `{STATUS_URL}/{JOB_ID}/result`
    pub fn result_endpoint(&self) -> String {
        format!("{}/result", self.status_endpoint())
    }

    /// Job id made safe for use as a file name component
    pub fn unique_id(&self) -> String {
        self.job_id.replace('/', "_")
    }
}

fn required<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or_else(|| ComError::missing_var(name))
}

fn required_json<F, T>(lookup: &F, name: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: DeserializeOwned,
{
    let raw = required(lookup, name)?;
    serde_json::from_str(&raw).map_err(|e| ComError::malformed_var(name, e))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::module::ModuleStatus;

    fn base_vars() -> HashMap<&'static str, String> {
        HashMap::from([
            (JOB_ID_VAR, "job1".to_string()),
            (DEPENDENCIES_VAR, r#"["dep1"]"#.to_string()),
            (STATUS_URL_VAR, "http://status".to_string()),
            (PARAMETER_VAR, r#"{"threshold": 3}"#.to_string()),
            (
                MODULE_RESULTS_VAR,
                r#"{"dep1": {"status": "COMPLETED", "result": "http://x/r"}}"#.to_string(),
            ),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<JobEnvironment> {
        JobEnvironment::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_loads_all_variables() {
        let env = load(&base_vars()).expect("environment should load");
        assert_eq!(env.job_id(), "job1");
        assert_eq!(env.dependencies(), ["dep1".to_string()]);
        assert_eq!(env.config().get("threshold"), Some(&Value::from(3)));
        let dep = env.module("dep1").expect("dep1 present");
        assert_eq!(dep.status, ModuleStatus::Completed);
        assert!(!env.is_debug());
    }

    #[test]
    fn test_any_missing_required_variable_is_unconfigured() {
        for name in [
            JOB_ID_VAR,
            DEPENDENCIES_VAR,
            STATUS_URL_VAR,
            PARAMETER_VAR,
            MODULE_RESULTS_VAR,
        ] {
            let mut vars = base_vars();
            vars.remove(name);
            match load(&vars) {
                Err(ComError::Unconfigured(msg)) => {
                    assert!(msg.contains(name), "message {:?} should name {}", msg, name)
                }
                other => panic!("expected Unconfigured for missing {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_malformed_json_is_unconfigured() {
        for name in [DEPENDENCIES_VAR, PARAMETER_VAR, MODULE_RESULTS_VAR] {
            let mut vars = base_vars();
            vars.insert(name, "not json".to_string());
            assert!(
                matches!(load(&vars), Err(ComError::Unconfigured(_))),
                "malformed {} should be rejected",
                name
            );
        }

        // PARAMETER must be an object, not just valid JSON
        let mut vars = base_vars();
        vars.insert(PARAMETER_VAR, "[1, 2]".to_string());
        assert!(matches!(load(&vars), Err(ComError::Unconfigured(_))));
    }

    #[test]
    fn test_unfinished_modules_need_no_result() {
        let mut vars = base_vars();
        vars.insert(
            MODULE_RESULTS_VAR,
            r#"{"dep1": {"status": "PENDING", "result": null}, "other": {"status": "RUNNING"}}"#
                .to_string(),
        );
        let env = load(&vars).expect("environment should load");
        assert_eq!(env.module("dep1").and_then(|m| m.result.as_ref()), None);
        assert_eq!(
            env.module("other").map(|m| &m.status),
            Some(&ModuleStatus::Running)
        );
    }

    #[test]
    fn test_debug_mode_parsing() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("yes", true),
            ("false", false),
            ("0", false),
            ("", false),
        ] {
            let mut vars = base_vars();
            vars.insert(DEBUG_MODE_VAR, value.to_string());
            let env = load(&vars).expect("environment should load");
            assert_eq!(env.is_debug(), expected, "DEBUG_MODE={:?}", value);
        }
    }

    #[test]
    fn test_endpoints() {
        let env = load(&base_vars()).expect("environment should load");
        assert_eq!(env.status_endpoint(), "http://status/job1");
        assert_eq!(env.result_endpoint(), "http://status/job1/result");

        let mut vars = base_vars();
        vars.insert(STATUS_URL_VAR, "http://status/jobs/".to_string());
        let env = load(&vars).expect("environment should load");
        assert_eq!(env.status_endpoint(), "http://status/jobs/job1");
    }

    #[test]
    fn test_unique_id_replaces_path_separators() {
        let mut vars = base_vars();
        vars.insert(JOB_ID_VAR, "a/b/c".to_string());
        let env = load(&vars).expect("environment should load");
        assert_eq!(env.unique_id(), "a_b_c");
    }
}
