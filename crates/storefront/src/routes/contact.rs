//! Contact form handler.
//!
//! Messages are relayed to the store inbox through Resend with the sender as
//! `Reply-To`. Nothing is stored.

use axum::{Json, extract::State};
use serde::Deserialize;
use tracing::instrument;

use oakhouse_core::Email;

use crate::error::{AppError, Result};
use crate::routes::MessageResponse;
use crate::routes::extract::ApiJson;
use crate::services::email::ContactMessage;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 5000;

/// Body of `POST /api/contact`.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

impl ContactRequest {
    fn validate(self) -> Result<ContactMessage> {
        let email = Email::parse(&self.email)
            .map_err(|_| AppError::BadRequest("Please enter a valid email address".to_string()))?;

        let name = self.name.trim();
        let message = self.message.trim();
        if name.is_empty() || message.is_empty() {
            return Err(AppError::BadRequest(
                "Name and message are required".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::BadRequest(format!(
                "Message must be at most {MAX_MESSAGE_LEN} characters"
            )));
        }

        Ok(ContactMessage {
            name: name.to_string(),
            email: email.to_string(),
            subject: self
                .subject
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            message: message.to_string(),
        })
    }
}

/// POST /api/contact
#[instrument(skip(state, body))]
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ContactRequest>,
) -> Result<Json<MessageResponse>> {
    let message = body.validate()?;
    state.email().send_contact(&message).await?;

    tracing::info!("Contact message relayed");
    Ok(Json(MessageResponse::new(
        "Thanks for your message, we'll get back to you soon",
    )))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(email: &str, message: &str) -> ContactRequest {
        ContactRequest {
            name: " Nino ".to_string(),
            email: email.to_string(),
            subject: Some("   ".to_string()),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_validate_trims_and_drops_blank_subject() {
        let message = request("Nino@Example.com", " Do you ship to Batumi? ")
            .validate()
            .unwrap();
        assert_eq!(message.name, "Nino");
        assert_eq!(message.message, "Do you ship to Batumi?");
        assert!(message.subject.is_none());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        assert!(matches!(
            request("not-an-email", "hi").validate(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request("nino@example.com", "   ").validate(),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            request("nino@example.com", &"x".repeat(MAX_MESSAGE_LEN + 1)).validate(),
            Err(AppError::BadRequest(_))
        ));
    }
}
