//! Template management: create, get, update, delete, list, validate.
//!
//! Create, update and delete answer with an error envelope and succeed only
//! on `ErrorCode == 0`. Get, list and validate succeed on HTTP 200 alone.

use crate::client::{check_envelope, parse_json, PostmarkClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{
    ErrorEnvelope, Template, TemplateEnvelope, TemplateList, TemplatePayload, TemplateValidation,
    ValidationReport,
};

impl<T> PostmarkClient<T> {
    pub fn build_create_template(&self, payload: &TemplatePayload) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, "/templates", Some(payload))
    }

    pub fn build_update_template(
        &self,
        id: u64,
        payload: &TemplatePayload,
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Put, &format!("/templates/{id}"), Some(payload))
    }

    pub fn build_delete_template(&self, id: u64) -> HttpRequest {
        self.build_bodyless(HttpMethod::Delete, &format!("/templates/{id}"))
    }

    pub fn build_get_template(&self, id: u64) -> HttpRequest {
        self.build_bodyless(HttpMethod::Get, &format!("/templates/{id}"))
    }

    pub fn build_list_templates(&self, offset: u32, count: u32) -> HttpRequest {
        self.build_bodyless(
            HttpMethod::Get,
            &format!("/templates?offset={offset}&count={count}"),
        )
    }

    pub fn build_validate_template(
        &self,
        validation: &TemplateValidation,
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, "/templates/validate", Some(validation))
    }

    /// Returns the id the provider assigned.
    pub fn parse_create_template(&self, response: HttpResponse) -> Result<u64, ApiError> {
        let envelope: TemplateEnvelope = parse_json(response)?;
        check_envelope(&envelope.envelope)?;
        envelope
            .template_id
            .ok_or_else(|| ApiError::Decoding("create response carries no TemplateId".to_string()))
    }

    pub fn parse_update_template(&self, response: HttpResponse) -> Result<(), ApiError> {
        let envelope: TemplateEnvelope = parse_json(response)?;
        check_envelope(&envelope.envelope)
    }

    pub fn parse_delete_template(&self, response: HttpResponse) -> Result<(), ApiError> {
        let envelope: ErrorEnvelope = parse_json(response)?;
        check_envelope(&envelope)
    }

    pub fn parse_get_template(&self, response: HttpResponse) -> Result<Template, ApiError> {
        parse_json(response)
    }

    pub fn parse_list_templates(&self, response: HttpResponse) -> Result<TemplateList, ApiError> {
        parse_json(response)
    }

    pub fn parse_validate_template(
        &self,
        response: HttpResponse,
    ) -> Result<ValidationReport, ApiError> {
        parse_json(response)
    }
}

impl<T: Transport> PostmarkClient<T> {
    pub fn create_template(&self, payload: &TemplatePayload) -> Result<u64, ApiError> {
        let response = self.dispatch(self.build_create_template(payload)?)?;
        let id = self.parse_create_template(response)?;
        tracing::info!(template_id = id, name = %payload.name, "template created");
        Ok(id)
    }

    /// Full replacement of the template stored under `id`.
    pub fn update_template(&self, id: u64, payload: &TemplatePayload) -> Result<(), ApiError> {
        let response = self.dispatch(self.build_update_template(id, payload)?)?;
        self.parse_update_template(response)
    }

    pub fn delete_template(&self, id: u64) -> Result<(), ApiError> {
        let response = self.dispatch(self.build_delete_template(id))?;
        self.parse_delete_template(response)?;
        tracing::info!(template_id = id, "template deleted");
        Ok(())
    }

    pub fn get_template(&self, id: u64) -> Result<Template, ApiError> {
        let response = self.dispatch(self.build_get_template(id))?;
        self.parse_get_template(response)
    }

    /// One page of templates. Advance `offset` by `count` for the next page.
    pub fn list_templates(&self, offset: u32, count: u32) -> Result<TemplateList, ApiError> {
        let response = self.dispatch(self.build_list_templates(offset, count))?;
        self.parse_list_templates(response)
    }

    /// A report with `AllContentIsValid == false` is still `Ok`.
    pub fn validate_template(
        &self,
        validation: &TemplateValidation,
    ) -> Result<ValidationReport, ApiError> {
        let response = self.dispatch(self.build_validate_template(validation)?)?;
        self.parse_validate_template(response)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::tests::client;
    use crate::config::ClientConfig;

    fn payload() -> TemplatePayload {
        TemplatePayload {
            name: "Test Template".to_string(),
            subject: "Hello, {{name}}!".to_string(),
            html_body: Some("<html><body>Hello, {{name}}!</body></html>".to_string()),
            text_body: Some("Hello, {{name}}!".to_string()),
            alias: None,
        }
    }

    #[test]
    fn build_create_template_produces_correct_request() {
        let req = client().build_create_template(&payload()).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/templates");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["Name"], "Test Template");
        assert_eq!(body["Subject"], "Hello, {{name}}!");
        assert!(body.get("Alias").is_none());
    }

    #[test]
    fn build_update_and_delete_use_id_path() {
        let req = client().build_update_template(7, &payload()).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/templates/7");
        assert!(req.body.is_some());

        let req = client().build_delete_template(7);
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/templates/7");
        assert!(req.body.is_none());

        let req = client().build_get_template(7);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/templates/7");
    }

    #[test]
    fn build_list_templates_passes_paging() {
        let req = client().build_list_templates(40, 20);
        assert_eq!(req.url, "http://localhost:3000/templates?offset=40&count=20");
    }

    #[test]
    fn build_validate_template_includes_render_model() {
        let validation = TemplateValidation {
            subject: Some("Hi {{name}}".to_string()),
            test_render_model: BTreeMap::from([("name".to_string(), "Ada".to_string())]),
            ..Default::default()
        };
        let req = client().build_validate_template(&validation).unwrap();
        assert_eq!(req.url, "http://localhost:3000/templates/validate");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["TestRenderModel"]["name"], "Ada");
        assert!(body.get("HtmlBody").is_none());
    }

    #[test]
    fn parse_create_template_returns_id() {
        let resp = HttpResponse::new(
            200,
            r#"{"TemplateId":36274083,"Name":"Test Template","Active":true,"ErrorCode":0,"Message":"OK"}"#,
        );
        assert_eq!(client().parse_create_template(resp).unwrap(), 36274083);
    }

    #[test]
    fn parse_create_template_envelope_rejection() {
        let resp = HttpResponse::new(200, r#"{"ErrorCode":1105,"Message":"Alias already in use"}"#);
        let err = client().parse_create_template(resp).unwrap_err();
        match err {
            ApiError::RemoteRejection { code, message } => {
                assert_eq!(code, 1105);
                assert_eq!(message, "Alias already in use");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_create_template_without_id_is_decoding_error() {
        let err = client()
            .parse_create_template(HttpResponse::new(200, "{}"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));

        let resp = HttpResponse::new(200, r#"{"ErrorCode":0,"Message":"OK"}"#);
        let err = client().parse_create_template(resp).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn parse_delete_template_success_and_not_found() {
        let ok = HttpResponse::new(200, r#"{"ErrorCode":0,"Message":"Template 7 removed."}"#);
        assert!(client().parse_delete_template(ok).is_ok());

        let missing = HttpResponse::new(
            422,
            r#"{"ErrorCode":1101,"Message":"The Template's 'TemplateId' is not valid or was not found."}"#,
        );
        let err = client().parse_delete_template(missing).unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedStatus { status: 422, .. }));
        assert!(err.is_not_found());
    }

    #[test]
    fn parse_get_template_ignores_envelope() {
        let resp = HttpResponse::new(
            200,
            r#"{"TemplateId":7,"Name":"n","Subject":"s","HtmlBody":null,"TextBody":"t","Alias":null,"Active":true,"AssociatedServerId":1}"#,
        );
        let template = client().parse_get_template(resp).unwrap();
        assert_eq!(template.template_id, 7);
        assert_eq!(template.html_body, None);
        assert_eq!(template.text_body.as_deref(), Some("t"));
    }

    #[test]
    fn parse_list_templates_decodes_page() {
        let resp = HttpResponse::new(
            200,
            r#"{"TotalCount":2,"Templates":[{"TemplateId":1,"Name":"a","Active":true},{"TemplateId":2,"Name":"b","Subject":"s","Alias":"b-alias","Active":false}]}"#,
        );
        let page = client().parse_list_templates(resp).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.templates.len(), 2);
        assert_eq!(page.templates[0].subject, "");
        assert_eq!(page.templates[1].alias.as_deref(), Some("b-alias"));
    }

    #[test]
    fn parse_validate_template_keeps_invalid_report() {
        let resp = HttpResponse::new(
            200,
            r#"{"AllContentIsValid":false,"Subject":{"ContentIsValid":false,"ValidationErrors":[{"Message":"Unclosed tag","Line":1,"CharacterPosition":4}]}}"#,
        );
        let report = client().parse_validate_template(resp).unwrap();
        assert!(!report.all_content_is_valid);
        let subject = report.subject.unwrap();
        assert_eq!(subject.validation_errors[0].line, Some(1));
        assert!(report.html_body.is_none());
    }

    #[test]
    fn create_template_goes_through_transport() {
        let seen = RefCell::new(Vec::new());
        let transport = |req: &HttpRequest| -> Result<HttpResponse, ApiError> {
            seen.borrow_mut().push((req.method, req.url.clone()));
            Ok(HttpResponse::new(200, r#"{"TemplateId":9,"ErrorCode":0,"Message":""}"#))
        };
        let config = ClientConfig::new("tok").with_base_url("http://mock");
        let client = PostmarkClient::with_transport(&config, transport);

        assert_eq!(client.create_template(&payload()).unwrap(), 9);
        assert_eq!(
            seen.borrow().as_slice(),
            &[(HttpMethod::Post, "http://mock/templates".to_string())]
        );
    }
}
