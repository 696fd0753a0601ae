//! Wire DTOs for the Postmark API.
//!
//! # Design
//! All bodies use Postmark's PascalCase field names. Request types only
//! derive `Serialize` and response types only derive `Deserialize`, except
//! where a type travels both ways. The mock-server crate defines its own
//! copies; the integration tests catch any drift between the two.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Templates
// ---------------------------------------------------------------------------

/// A template as stored by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub template_id: u64,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub html_body: Option<String>,
    #[serde(default)]
    pub text_body: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    pub active: bool,
}

/// Body for creating a template or fully replacing an existing one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplatePayload {
    pub name: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One entry of a template listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateSummary {
    pub template_id: u64,
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub active: bool,
}

/// One page of templates plus the size of the whole collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateList {
    pub total_count: u64,
    pub templates: Vec<TemplateSummary>,
}

/// Content to check with the provider's template validator.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateValidation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub test_render_model: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationReport {
    pub all_content_is_valid: bool,
    #[serde(default)]
    pub subject: Option<ContentValidation>,
    #[serde(default)]
    pub html_body: Option<ContentValidation>,
    #[serde(default)]
    pub text_body: Option<ContentValidation>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentValidation {
    pub content_is_valid: bool,
    #[serde(default)]
    pub validation_errors: Vec<ValidationError>,
    #[serde(default)]
    pub rendered_content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidationError {
    pub message: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub character_position: Option<u32>,
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

/// A single outgoing message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Email {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_stream: Option<String>,
    #[serde(flatten)]
    pub body: EmailBody,
}

impl Email {
    /// A message whose subject and bodies are given inline.
    pub fn inline(
        from: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: Option<String>,
        text_body: Option<String>,
    ) -> Self {
        Self::with_body(
            from,
            to,
            EmailBody::Inline(InlineContent {
                subject: subject.into(),
                html_body,
                text_body,
            }),
        )
    }

    /// A message rendered remotely from a stored template.
    pub fn from_template(
        from: impl Into<String>,
        to: impl Into<String>,
        template: TemplateRef,
        model: BTreeMap<String, String>,
    ) -> Self {
        Self::with_body(
            from,
            to,
            EmailBody::Template(TemplateContent {
                template,
                template_model: model,
            }),
        )
    }

    fn with_body(from: impl Into<String>, to: impl Into<String>, body: EmailBody) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            cc: None,
            bcc: None,
            reply_to: None,
            tag: None,
            message_stream: None,
            body,
        }
    }
}

/// Either inline content or a template reference; flattened into `Email`.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EmailBody {
    Inline(InlineContent),
    Template(TemplateContent),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct InlineContent {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateContent {
    #[serde(flatten)]
    pub template: TemplateRef,
    pub template_model: BTreeMap<String, String>,
}

/// Serialized as `"TemplateId": n` or `"TemplateAlias": "..."`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TemplateRef {
    #[serde(rename = "TemplateId")]
    Id(u64),
    #[serde(rename = "TemplateAlias")]
    Alias(String),
}

/// Provider acknowledgement for one message.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SendResponse {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub submitted_at: Option<DateTime<FixedOffset>>,
    #[serde(rename = "MessageID", default)]
    pub message_id: String,
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
}

impl SendResponse {
    pub fn is_accepted(&self) -> bool {
        self.error_code == 0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BatchEnvelope<'a> {
    pub messages: &'a [Email],
}

// ---------------------------------------------------------------------------
// Bounces
// ---------------------------------------------------------------------------

/// A delivery failure recorded by the provider. Read-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bounce {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    pub email: String,
    pub bounced_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub can_activate: bool,
    #[serde(default)]
    pub inactive: bool,
    #[serde(default)]
    pub subject: String,
    #[serde(rename = "MessageID", default)]
    pub message_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BounceList {
    pub total_count: u64,
    pub bounces: Vec<Bounce>,
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// `ErrorCode`/`Message` pair carried by mutating responses.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorEnvelope {
    #[serde(default)]
    pub error_code: i64,
    #[serde(default)]
    pub message: String,
}

/// Create/update response: the envelope plus the template's id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct TemplateEnvelope {
    #[serde(default)]
    pub template_id: Option<u64>,
    #[serde(flatten)]
    pub envelope: ErrorEnvelope,
}
