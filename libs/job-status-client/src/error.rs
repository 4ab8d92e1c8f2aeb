// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for job-status-client

use thiserror::Error;

use crate::module::ModuleStatus;

/// Errors surfaced by the job status client
///
/// None of these are retried internally. A job that hits one is expected
/// to fail and be restarted as a whole by the orchestrator.
#[derive(Error, Debug)]
pub enum ComError {
    /// A required environment variable is missing or malformed
    #[error("{0}")]
    Unconfigured(String),

    /// The dependency is not listed in MODULE_RESULTS
    #[error("Failed to find module {0}")]
    ModuleNotFound(String),

    /// The dependency exists but has not completed yet
    #[error("Failed to find result for module {module} (status {status})")]
    ModuleNotReady { module: String, status: ModuleStatus },

    /// Fetching a dependency result returned a non-200 status
    #[error("Failed to download: {status} [{body}]")]
    DownloadFailed { status: u16, body: String },

    /// A status update or the result upload returned a non-200 status
    #[error("Failed to {action}: {status} [{body}]")]
    StatusFailed {
        action: &'static str,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// IO error while writing a download or reading the result file
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ComError {
    pub(crate) fn missing_var(name: &str) -> Self {
        ComError::Unconfigured(format!("No {} environment variable found", name))
    }

    pub(crate) fn malformed_var(name: &str, err: serde_json::Error) -> Self {
        ComError::Unconfigured(format!("Invalid {} environment variable: {}", name, err))
    }

    /// Consume a non-success response into the error it represents
    pub(crate) async fn status_failed(action: &'static str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response_text(response).await;
        ComError::StatusFailed {
            action,
            status,
            body,
        }
    }

    pub(crate) async fn download_failed(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response_text(response).await;
        ComError::DownloadFailed { status, body }
    }
}

async fn response_text(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
}

pub type Result<T, E = ComError> = std::result::Result<T, E>;
