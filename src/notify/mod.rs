//! Outgoing email.
//!
//! Messages go to an HTTP mail relay when one is configured. Without a relay they are
//! logged and reported back as simulated.

mod digest;

pub use digest::{render_digest, Digest};

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::EmailSettings;
use crate::errors::AppError;
use crate::models::SendEmailJsRequest;

/// Longest upstream error body echoed into an error message.
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// A message ready for delivery.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
}

/// Result of a delivery attempt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub to: String,
    pub subject: String,
    pub simulated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayReply {
    #[serde(default, alias = "messageId")]
    id: Option<String>,
}

pub struct EmailService {
    http: reqwest::Client,
    settings: EmailSettings,
}

impl EmailService {
    pub fn new(settings: EmailSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn is_simulated(&self) -> bool {
        self.settings.relay_url.is_none()
    }

    /// Deliver a message through the relay, or log it when none is configured.
    pub async fn send(&self, message: &EmailMessage) -> Result<Delivery, AppError> {
        if !is_valid_email(&message.to) {
            return Err(AppError::Validation(format!(
                "Invalid recipient address: {}",
                message.to
            )));
        }

        let Some(relay_url) = &self.settings.relay_url else {
            tracing::info!(
                to = %message.to,
                subject = %message.subject,
                "No mail relay configured, email not sent"
            );
            return Ok(Delivery {
                to: message.to.clone(),
                subject: message.subject.clone(),
                simulated: true,
                message_id: None,
            });
        };

        let mut request = self.http.post(relay_url).json(&json!({
            "from": self.settings.from_address,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
            "html": message.html,
        }));
        if let Some(token) = &self.settings.relay_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Mail relay returned {}: {:.len$}",
                status,
                body,
                len = ERROR_BODY_PREVIEW_CHARS
            )));
        }

        let message_id = serde_json::from_str::<RelayReply>(&body)
            .ok()
            .and_then(|reply| reply.id);
        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");

        Ok(Delivery {
            to: message.to.clone(),
            subject: message.subject.clone(),
            simulated: false,
            message_id,
        })
    }

    /// Forward a template send to the EmailJS REST API.
    pub async fn send_emailjs(&self, request: &SendEmailJsRequest) -> Result<String, AppError> {
        let mut payload = json!({
            "service_id": request.service_id,
            "template_id": request.template_id,
            "user_id": request.user_id,
            "template_params": request.template_params,
        });
        if let Some(token) = &request.access_token {
            payload["accessToken"] = json!(token);
        }

        let response = self
            .http
            .post(&self.settings.emailjs_url)
            .json(&payload)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            tracing::warn!(%status, "EmailJS rejected template send");
            return Err(AppError::Upstream(format!(
                "EmailJS returned {}: {:.len$}",
                status,
                body,
                len = ERROR_BODY_PREVIEW_CHARS
            )));
        }

        Ok(body)
    }
}

/// Loose address check: one `@`, a non-empty local part and a dotted domain.
pub fn is_valid_email(address: &str) -> bool {
    let address = address.trim();
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.contains(char::is_whitespace)
        && domain
            .split('.')
            .filter(|part| !part.is_empty())
            .count()
            >= 2
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("analyst@arquimea.com"));
        assert!(is_valid_email(" a.b@mod.gov.uk "));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
    }

    #[tokio::test]
    async fn test_send_without_relay_is_simulated() {
        let service = EmailService::new(EmailSettings::default()).unwrap();
        assert!(service.is_simulated());

        let delivery = service
            .send(&EmailMessage {
                to: "analyst@arquimea.com".into(),
                subject: "Test".into(),
                text: "Hello".into(),
                html: None,
            })
            .await
            .unwrap();
        assert!(delivery.simulated);
        assert_eq!(delivery.to, "analyst@arquimea.com");
    }

    #[tokio::test]
    async fn test_send_rejects_bad_recipient() {
        let service = EmailService::new(EmailSettings::default()).unwrap();
        let err = service
            .send(&EmailMessage {
                to: "nobody".into(),
                subject: "Test".into(),
                text: String::new(),
                html: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
