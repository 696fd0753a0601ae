//! Synchronous client for the Postmark transactional-email API.
//!
//! # Overview
//! Covers template management (create, get, update, delete, list,
//! validate), email dispatch (single and batch with templates) and bounce
//! listing. Each call is one blocking HTTP exchange; nothing is cached,
//! retried or persisted.
//!
//! # Design
//! - `PostmarkClient` holds only immutable state: base URL, server token
//!   and a `Transport`. It is safe to share when the transport is.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), so the I/O boundary is explicit
//!   and every step can be tested without a network.
//! - Create, update, delete and single send check the `ErrorCode` envelope.
//!   Get, list, validate, batch send and bounces succeed on HTTP 200 alone;
//!   batch send hands back one outcome per message.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.
//!
//! # Example
//! ```no_run
//! use postmark_core::{ClientConfig, PostmarkClient};
//!
//! let config = ClientConfig::from_env()?;
//! let client = PostmarkClient::new(&config);
//! for template in client.list_templates(0, 20)?.templates {
//!     println!("{} {}", template.template_id, template.name);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bounces;
pub mod client;
pub mod config;
mod email;
pub mod error;
pub mod http;
mod templates;
pub mod transport;
pub mod types;

pub use client::PostmarkClient;
pub use config::{ClientConfig, ConfigError};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{
    Bounce, BounceList, ContentValidation, Email, EmailBody, InlineContent, SendResponse, Template,
    TemplateContent, TemplateList, TemplatePayload, TemplateRef, TemplateSummary,
    TemplateValidation, ValidationError, ValidationReport,
};
