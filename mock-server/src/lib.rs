//! In-memory stand-in for the Postmark HTTP API.
//!
//! Serves the template, email and bounce endpoints the client uses, with
//! Postmark's PascalCase bodies and error envelopes. Unknown template ids
//! answer 422 with code 1101, as Postmark does. Two behaviours are
//! deliberately pinned to HTTP 200 with a non-zero `ErrorCode`: creating a
//! template whose alias is taken (1105) and sending to an inactive
//! recipient (406).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SERVER_TOKEN: &str = "mock-server-token";
pub const TOKEN_HEADER: &str = "x-postmark-server-token";

pub const INVALID_EMAIL_REQUEST: i64 = 300;
pub const INACTIVE_RECIPIENT: i64 = 406;
pub const TEMPLATE_NOT_FOUND: i64 = 1101;
pub const ALIAS_IN_USE: i64 = 1105;
pub const INVALID_TEMPLATE: i64 = 1120;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    pub template_id: u64,
    pub name: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub alias: Option<String>,
    pub active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateInput {
    pub name: String,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub alias: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bounce {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "MessageID")]
    pub message_id: String,
    pub description: String,
    pub details: String,
    pub email: String,
    pub bounced_at: String,
    pub inactive: bool,
    pub can_activate: bool,
    pub subject: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailInput {
    pub from: String,
    pub to: String,
    pub subject: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub template_id: Option<u64>,
    pub template_alias: Option<String>,
    #[serde(default)]
    pub template_model: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BatchInput {
    pub messages: Vec<EmailInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValidateInput {
    pub subject: Option<String>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    #[serde(default)]
    pub test_render_model: HashMap<String, String>,
}

#[derive(Deserialize)]
pub struct Paging {
    pub offset: usize,
    pub count: usize,
}

#[derive(Default)]
pub struct MockState {
    templates: BTreeMap<u64, Template>,
    next_id: u64,
    bounces: Vec<Bounce>,
}

impl MockState {
    fn alias_taken(&self, alias: Option<&str>, except: Option<u64>) -> bool {
        let Some(alias) = alias else { return false };
        self.templates
            .values()
            .any(|t| t.alias.as_deref() == Some(alias) && Some(t.template_id) != except)
    }

    fn is_inactive(&self, recipient: &str) -> bool {
        self.bounces
            .iter()
            .any(|b| b.inactive && b.email.eq_ignore_ascii_case(recipient))
    }

    fn find_template(&self, input: &EmailInput) -> Option<&Template> {
        match (input.template_id, input.template_alias.as_deref()) {
            (Some(id), _) => self.templates.get(&id),
            (None, Some(alias)) => self
                .templates
                .values()
                .find(|t| t.alias.as_deref() == Some(alias)),
            (None, None) => None,
        }
    }
}

pub type Db = Arc<RwLock<MockState>>;

/// Bounces every fresh server starts with. `inactive@example.com` is
/// suppressed, so sends to it are rejected with code 406.
pub fn seed_bounces() -> Vec<Bounce> {
    let bounce = |id: i64, kind: &str, email: &str, inactive: bool| Bounce {
        id,
        kind: kind.to_string(),
        message_id: Uuid::new_v4().to_string(),
        description: format!("{kind} reported by the receiving server"),
        details: "smtp; 550 5.1.1 user unknown".to_string(),
        email: email.to_string(),
        bounced_at: "2024-03-01T10:15:30.1234567-05:00".to_string(),
        inactive,
        can_activate: true,
        subject: "Welcome aboard".to_string(),
    };
    vec![
        bounce(1001, "HardBounce", "inactive@example.com", true),
        bounce(1002, "SoftBounce", "soft@example.com", false),
        bounce(1003, "Transient", "transient@example.com", false),
    ]
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(MockState {
        templates: BTreeMap::new(),
        next_id: 1,
        bounces: seed_bounces(),
    }));
    Router::new()
        .route("/templates", get(list_templates).post(create_template))
        .route("/templates/validate", post(validate_template))
        .route(
            "/templates/{id}",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/email", post(send_email))
        .route("/email/batchWithTemplates", post(send_batch))
        .route("/bounces", get(list_bounces))
        .layer(middleware::from_fn(require_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn envelope(status: StatusCode, code: i64, message: impl Into<String>) -> Response {
    let body = json!({ "ErrorCode": code, "Message": message.into() });
    (status, Json(body)).into_response()
}

fn template_not_found(id: u64) -> Response {
    envelope(
        StatusCode::UNPROCESSABLE_ENTITY,
        TEMPLATE_NOT_FOUND,
        format!("The Template's 'TemplateId' ({id}) associated with this request is not valid or was not found."),
    )
}

async fn require_token(request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    match token.as_deref() {
        None => envelope(
            StatusCode::UNAUTHORIZED,
            10,
            "No Account or Server API tokens were supplied in the HTTP headers.",
        ),
        Some(token) if token != SERVER_TOKEN => envelope(
            StatusCode::UNAUTHORIZED,
            10,
            "Request does not contain a valid Server API token.",
        ),
        Some(_) => next.run(request).await,
    }
}

fn check_template_input(input: &TemplateInput) -> Result<(), Response> {
    if input.name.trim().is_empty() || input.subject.trim().is_empty() {
        return Err(envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_TEMPLATE,
            "Name and Subject are required.",
        ));
    }
    if input.html_body.is_none() && input.text_body.is_none() {
        return Err(envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_TEMPLATE,
            "Either HtmlBody or TextBody is required.",
        ));
    }
    Ok(())
}

// --- templates ---

async fn create_template(State(db): State<Db>, Json(input): Json<TemplateInput>) -> Response {
    if let Err(rejection) = check_template_input(&input) {
        return rejection;
    }
    let mut state = db.write().await;
    if state.alias_taken(input.alias.as_deref(), None) {
        return envelope(
            StatusCode::OK,
            ALIAS_IN_USE,
            "This alias is already in use by another template.",
        );
    }
    let id = state.next_id;
    state.next_id += 1;
    let template = Template {
        template_id: id,
        name: input.name,
        subject: input.subject,
        html_body: input.html_body,
        text_body: input.text_body,
        alias: input.alias,
        active: true,
    };
    tracing::debug!(template_id = id, name = %template.name, "template stored");
    let body = json!({
        "TemplateId": id,
        "Name": template.name,
        "Alias": template.alias,
        "Active": true,
    });
    state.templates.insert(id, template);
    Json(body).into_response()
}

async fn update_template(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<TemplateInput>,
) -> Response {
    if let Err(rejection) = check_template_input(&input) {
        return rejection;
    }
    let mut state = db.write().await;
    if !state.templates.contains_key(&id) {
        return template_not_found(id);
    }
    if state.alias_taken(input.alias.as_deref(), Some(id)) {
        return envelope(
            StatusCode::OK,
            ALIAS_IN_USE,
            "This alias is already in use by another template.",
        );
    }
    let Some(template) = state.templates.get_mut(&id) else {
        return template_not_found(id);
    };
    template.name = input.name;
    template.subject = input.subject;
    template.html_body = input.html_body;
    template.text_body = input.text_body;
    template.alias = input.alias;
    Json(json!({
        "TemplateId": id,
        "Name": template.name,
        "Alias": template.alias,
        "Active": template.active,
    }))
    .into_response()
}

async fn delete_template(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    match db.write().await.templates.remove(&id) {
        Some(_) => envelope(StatusCode::OK, 0, format!("Template {id} removed.")),
        None => template_not_found(id),
    }
}

async fn get_template(State(db): State<Db>, Path(id): Path<u64>) -> Response {
    match db.read().await.templates.get(&id) {
        Some(template) => Json(template.clone()).into_response(),
        None => template_not_found(id),
    }
}

async fn list_templates(State(db): State<Db>, Query(paging): Query<Paging>) -> Response {
    let state = db.read().await;
    let templates: Vec<_> = state
        .templates
        .values()
        .skip(paging.offset)
        .take(paging.count)
        .map(|t| {
            json!({
                "TemplateId": t.template_id,
                "Name": t.name,
                "Subject": t.subject,
                "Alias": t.alias,
                "Active": t.active,
            })
        })
        .collect();
    Json(json!({ "TotalCount": state.templates.len(), "Templates": templates })).into_response()
}

async fn validate_template(Json(input): Json<ValidateInput>) -> Response {
    if input.subject.is_none() && input.html_body.is_none() && input.text_body.is_none() {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_TEMPLATE,
            "At least one of Subject, HtmlBody or TextBody is required.",
        );
    }
    let check = |content: &Option<String>| {
        content
            .as_deref()
            .map(|content| render(content, &input.test_render_model))
    };
    let parts = [
        ("Subject", check(&input.subject)),
        ("HtmlBody", check(&input.html_body)),
        ("TextBody", check(&input.text_body)),
    ];

    let mut body = serde_json::Map::new();
    let mut all_valid = true;
    for (key, part) in parts {
        let Some(part) = part else { continue };
        all_valid &= part.errors.is_empty();
        body.insert(key.to_string(), part.to_json());
    }
    body.insert("AllContentIsValid".to_string(), json!(all_valid));
    Json(serde_json::Value::Object(body)).into_response()
}

struct Rendered {
    content: String,
    errors: Vec<(String, usize, usize)>,
}

impl Rendered {
    fn to_json(&self) -> serde_json::Value {
        let errors: Vec<_> = self
            .errors
            .iter()
            .map(|(message, line, position)| {
                json!({ "Message": message, "Line": line, "CharacterPosition": position })
            })
            .collect();
        if self.errors.is_empty() {
            json!({ "ContentIsValid": true, "ValidationErrors": errors, "RenderedContent": self.content })
        } else {
            json!({ "ContentIsValid": false, "ValidationErrors": errors })
        }
    }
}

/// 1-based line and character position of byte offset `at`.
fn position(content: &str, at: usize) -> (usize, usize) {
    let before = &content[..at];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().unwrap_or("").chars().count() + 1;
    (line, column)
}

/// Substitute `{{ key }}` from `model`; unknown keys render empty.
fn render(content: &str, model: &HashMap<String, String>) -> Rendered {
    let mut out = String::with_capacity(content.len());
    let mut errors = Vec::new();
    let stray_close = |from: usize, text: &str, errors: &mut Vec<(String, usize, usize)>| {
        if let Some(at) = text.find("}}") {
            let (line, column) = position(content, from + at);
            errors.push(("Unexpected '}}' without matching '{{'".to_string(), line, column));
        }
    };

    let mut cursor = 0;
    while let Some(start) = content[cursor..].find("{{").map(|i| cursor + i) {
        stray_close(cursor, &content[cursor..start], &mut errors);
        out.push_str(&content[cursor..start]);
        let inner = start + 2;
        match content[inner..].find("}}") {
            Some(len) => {
                let key = content[inner..inner + len].trim();
                out.push_str(model.get(key).map(String::as_str).unwrap_or(""));
                cursor = inner + len + 2;
            }
            None => {
                let (line, column) = position(content, start);
                errors.push(("Unclosed '{{' tag".to_string(), line, column));
                cursor = content.len();
            }
        }
    }
    stray_close(cursor, &content[cursor..], &mut errors);
    out.push_str(&content[cursor..]);

    Rendered {
        content: out,
        errors,
    }
}

// --- email ---

fn accepted(to: &str) -> serde_json::Value {
    json!({
        "To": to,
        "SubmittedAt": chrono::Utc::now().to_rfc3339(),
        "MessageID": Uuid::new_v4().to_string(),
        "ErrorCode": 0,
        "Message": "OK",
    })
}

fn rejected(to: &str, code: i64, message: &str) -> serde_json::Value {
    json!({ "To": to, "ErrorCode": code, "Message": message })
}

const INACTIVE_MESSAGE: &str =
    "You tried to send to recipient(s) that have been marked as inactive.";

async fn send_email(State(db): State<Db>, Json(input): Json<EmailInput>) -> Response {
    if input.from.trim().is_empty() || input.to.trim().is_empty() {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_EMAIL_REQUEST,
            "Invalid 'From' or 'To' address.",
        );
    }
    if input.subject.is_none() || (input.html_body.is_none() && input.text_body.is_none()) {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_EMAIL_REQUEST,
            "Provide Subject and either HtmlBody or TextBody.",
        );
    }
    if db.read().await.is_inactive(&input.to) {
        return Json(rejected(&input.to, INACTIVE_RECIPIENT, INACTIVE_MESSAGE)).into_response();
    }
    tracing::debug!(to = %input.to, "email accepted");
    Json(accepted(&input.to)).into_response()
}

async fn send_batch(State(db): State<Db>, Json(input): Json<BatchInput>) -> Response {
    if input.messages.is_empty() {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_EMAIL_REQUEST,
            "Messages must contain at least one message.",
        );
    }
    if input.messages.iter().any(|m| m.from.trim().is_empty()) {
        return envelope(
            StatusCode::UNPROCESSABLE_ENTITY,
            INVALID_EMAIL_REQUEST,
            "Invalid 'From' address.",
        );
    }

    let state = db.read().await;
    let outcomes: Vec<_> = input
        .messages
        .iter()
        .map(|message| {
            if state.find_template(message).is_none() {
                rejected(
                    &message.to,
                    TEMPLATE_NOT_FOUND,
                    "The Template's 'TemplateId' associated with this request is not valid or was not found.",
                )
            } else if state.is_inactive(&message.to) {
                rejected(&message.to, INACTIVE_RECIPIENT, INACTIVE_MESSAGE)
            } else {
                accepted(&message.to)
            }
        })
        .collect();
    Json(outcomes).into_response()
}

// --- bounces ---

async fn list_bounces(State(db): State<Db>, Query(paging): Query<Paging>) -> Response {
    let state = db.read().await;
    let bounces: Vec<_> = state
        .bounces
        .iter()
        .skip(paging.offset)
        .take(paging.count)
        .cloned()
        .collect();
    Json(json!({ "TotalCount": state.bounces.len(), "Bounces": bounces })).into_response()
}
