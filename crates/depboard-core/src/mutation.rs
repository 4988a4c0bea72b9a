//! Single-field edits written back to the tracker. Inputs are checked
//! against the configured option set before anything goes over the wire.

use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::config::{Config, FieldConfig, FieldsConfig};
use crate::error::{DashError, Result};
use crate::tracker::queries;
use crate::tracker::wire::{ItemHandleData, UpdateItemFieldData};
use crate::tracker::TrackerClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Status,
    Size,
    Priority,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Status => "status",
            Field::Size => "size",
            Field::Priority => "priority",
        }
    }

    pub fn config(self, fields: &FieldsConfig) -> &FieldConfig {
        match self {
            Field::Status => &fields.status,
            Field::Size => &fields.size,
            Field::Priority => &fields.priority,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Field::Status),
            "size" => Ok(Field::Size),
            "priority" => Ok(Field::Priority),
            _ => Err(DashError::UnknownField(s.to_string())),
        }
    }
}

/// Ids needed for the write, resolved from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpdate {
    pub field: Field,
    pub field_id: String,
    pub option_id: String,
}

/// Resolve `field` and `value` against the configured options. Pure; no
/// network access.
pub fn validate(config: &Config, field: &str, value: &str) -> Result<ValidatedUpdate> {
    let field: Field = field.parse()?;
    let fc = field.config(&config.fields);
    let option_id = fc
        .option_id(value)
        .ok_or_else(|| DashError::UnknownValue(value.to_string()))?;
    if fc.id.trim().is_empty() {
        return Err(DashError::InvalidConfig(format!(
            "fields.{field}.id is not set"
        )));
    }
    Ok(ValidatedUpdate {
        field,
        field_id: fc.id.clone(),
        option_id: option_id.to_string(),
    })
}

/// `{ok:true}` or `{ok:false, error}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationOutcome {
    pub fn success() -> Self {
        Self { ok: true, error: None }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct MutationGateway {
    client: TrackerClient,
    config: Config,
}

impl MutationGateway {
    pub fn new(client: TrackerClient, config: Config) -> Self {
        Self { client, config }
    }

    /// Validate, find the issue's item in the configured project, then issue
    /// exactly one field write.
    pub async fn apply(&self, issue_number: u64, field: &str, value: &str) -> Result<()> {
        let update = validate(&self.config, field, value)?;
        if self.config.project.id.trim().is_empty() {
            return Err(DashError::InvalidConfig("project.id is not set".to_string()));
        }

        let handle: ItemHandleData = self
            .client
            .graphql(
                queries::ITEM_HANDLE,
                json!({
                    "owner": self.config.repository.owner,
                    "name": self.config.repository.name,
                    "number": issue_number,
                }),
            )
            .await?;
        let item = handle
            .item_in_project(self.config.project.number)
            .ok_or(DashError::IssueNotInProject(issue_number))?;

        let written: UpdateItemFieldData = self
            .client
            .graphql(
                queries::UPDATE_ITEM_FIELD,
                json!({
                    "project": self.config.project.id,
                    "item": item,
                    "field": update.field_id,
                    "option": update.option_id,
                }),
            )
            .await?;
        if written.update.is_none() {
            return Err(DashError::EmptyResponse);
        }

        tracing::info!(issue = issue_number, field = %update.field, value, "field updated");
        Ok(())
    }

    pub async fn update(&self, issue_number: u64, field: &str, value: &str) -> MutationOutcome {
        match self.apply(issue_number, field, value).await {
            Ok(()) => MutationOutcome::success(),
            Err(e) => {
                tracing::warn!(issue = issue_number, field, value, error = %e, "field update rejected");
                MutationOutcome::failure(e)
            }
        }
    }
}
