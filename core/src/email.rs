//! Email dispatch: single send and batch send with templates.

use crate::client::{check_envelope, parse_json, PostmarkClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::{BatchEnvelope, Email, ErrorEnvelope, SendResponse};

impl<T> PostmarkClient<T> {
    pub fn build_send_email(&self, email: &Email) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Post, "/email", Some(email))
    }

    pub fn build_send_batch(&self, emails: &[Email]) -> Result<HttpRequest, ApiError> {
        let envelope = BatchEnvelope { messages: emails };
        self.build_request(HttpMethod::Post, "/email/batchWithTemplates", Some(&envelope))
    }

    /// A 200 response with a non-zero `ErrorCode` is a `RemoteRejection`.
    pub fn parse_send_email(&self, response: HttpResponse) -> Result<SendResponse, ApiError> {
        let sent: SendResponse = parse_json(response)?;
        check_envelope(&ErrorEnvelope {
            error_code: sent.error_code,
            message: sent.message.clone(),
        })?;
        if sent.message_id.is_empty() {
            return Err(ApiError::Decoding(
                "send response carries no MessageID".to_string(),
            ));
        }
        Ok(sent)
    }

    /// One entry per submitted message, in submission order. Entries with a
    /// non-zero `ErrorCode` were rejected individually; the call still
    /// succeeds.
    pub fn parse_send_batch(&self, response: HttpResponse) -> Result<Vec<SendResponse>, ApiError> {
        parse_json(response)
    }
}

impl<T: Transport> PostmarkClient<T> {
    pub fn send_email(&self, email: &Email) -> Result<SendResponse, ApiError> {
        let response = self.dispatch(self.build_send_email(email)?)?;
        let sent = self.parse_send_email(response)?;
        tracing::info!(to = %sent.to, message_id = %sent.message_id, "email sent");
        Ok(sent)
    }

    pub fn send_batch(&self, emails: &[Email]) -> Result<Vec<SendResponse>, ApiError> {
        let response = self.dispatch(self.build_send_batch(emails)?)?;
        let outcomes = self.parse_send_batch(response)?;
        let rejected = outcomes.iter().filter(|o| !o.is_accepted()).count();
        if rejected > 0 {
            tracing::warn!(submitted = emails.len(), rejected, "batch partially rejected");
        } else {
            tracing::info!(submitted = emails.len(), "batch sent");
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::client::tests::client;
    use crate::types::TemplateRef;

    fn welcome(to: &str) -> Email {
        let model = BTreeMap::from([("name".to_string(), "Ada".to_string())]);
        Email::from_template("sender@example.com", to, TemplateRef::Id(36274083), model)
    }

    #[test]
    fn build_send_email_produces_correct_request() {
        let email = Email::inline(
            "sender@example.com",
            "receiver@example.com",
            "Hello",
            Some("<b>Hello</b>".to_string()),
            Some("Hello".to_string()),
        );
        let req = client().build_send_email(&email).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "http://localhost:3000/email");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["From"], "sender@example.com");
        assert_eq!(body["HtmlBody"], "<b>Hello</b>");
    }

    #[test]
    fn build_send_batch_wraps_messages_in_order() {
        let emails = vec![welcome("a@example.com"), welcome("b@example.com")];
        let req = client().build_send_batch(&emails).unwrap();
        assert_eq!(req.url, "http://localhost:3000/email/batchWithTemplates");
        let body: serde_json::Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        let messages = body["Messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["To"], "a@example.com");
        assert_eq!(messages[1]["To"], "b@example.com");
        assert_eq!(messages[1]["TemplateModel"]["name"], "Ada");
    }

    #[test]
    fn parse_send_email_success() {
        let resp = HttpResponse::new(
            200,
            r#"{"To":"receiver@example.com","SubmittedAt":"2014-02-17T07:25:01.4178645-05:00","MessageID":"0a129aee-e1cd-480d-b08d-4f48548ff48d","ErrorCode":0,"Message":"OK"}"#,
        );
        let sent = client().parse_send_email(resp).unwrap();
        assert_eq!(sent.to, "receiver@example.com");
        assert_eq!(sent.message_id, "0a129aee-e1cd-480d-b08d-4f48548ff48d");
        assert!(sent.submitted_at.is_some());
    }

    #[test]
    fn parse_send_email_rejection() {
        let resp = HttpResponse::new(
            200,
            r#"{"ErrorCode":406,"Message":"You tried to send to a recipient that has been marked as inactive."}"#,
        );
        let err = client().parse_send_email(resp).unwrap_err();
        assert!(matches!(err, ApiError::RemoteRejection { code: 406, .. }));
    }

    #[test]
    fn parse_send_email_without_message_id_is_decoding_error() {
        let err = client()
            .parse_send_email(HttpResponse::new(200, "{}"))
            .unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));

        let resp = HttpResponse::new(200, r#"{"To":"receiver@example.com","ErrorCode":0,"Message":"OK"}"#);
        let err = client().parse_send_email(resp).unwrap_err();
        assert!(matches!(err, ApiError::Decoding(_)));
    }

    #[test]
    fn parse_send_batch_surfaces_per_message_outcomes() {
        let resp = HttpResponse::new(
            200,
            r#"[
                {"ErrorCode":0,"Message":"OK","MessageID":"b7bc2f4a-e38e-4336-af7d-e6c392c2f817","SubmittedAt":"2010-11-26T12:01:05.1794748-05:00","To":"a@example.com"},
                {"ErrorCode":406,"Message":"You tried to send to a recipient that has been marked as inactive."}
            ]"#,
        );
        let outcomes = client().parse_send_batch(resp).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_accepted());
        assert!(!outcomes[1].is_accepted());
        assert_eq!(outcomes[1].error_code, 406);
    }

    #[test]
    fn parse_send_batch_bad_request() {
        let resp = HttpResponse::new(422, r#"{"ErrorCode":300,"Message":"Invalid 'From' address."}"#);
        let err = client().parse_send_batch(resp).unwrap_err();
        match err {
            ApiError::UnexpectedStatus { status, body } => {
                assert_eq!(status, 422);
                assert!(body.contains("Invalid 'From' address."));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
