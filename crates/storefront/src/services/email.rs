//! Transactional email via the Resend API.
//!
//! Every message is rendered from an HTML and a plain text Askama template
//! and sent as one Resend email with both bodies.

use askama::Template;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use oakhouse_core::Money;

use crate::config::ResendConfig;
use crate::models::{Order, OrderItem};

/// Resend API endpoint.
const SEND_URL: &str = "https://api.resend.com/emails";

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Invalid API key format.
    #[error("Invalid API key: {0}")]
    InvalidKey(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Template)]
#[template(path = "email/verification.html")]
struct VerificationHtml<'a> {
    name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/verification.txt")]
struct VerificationText<'a> {
    name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    name: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    name: &'a str,
    link: &'a str,
}

/// One line of the order confirmation, pre-formatted.
struct ConfirmationLine {
    name: String,
    quantity: i32,
    total: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    name: &'a str,
    order_id: String,
    lines: &'a [ConfirmationLine],
    total: String,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    name: &'a str,
    order_id: String,
    lines: &'a [ConfirmationLine],
    total: String,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.html")]
struct ContactHtml<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "email/contact.txt")]
struct ContactText<'a> {
    name: &'a str,
    email: &'a str,
    subject: &'a str,
    message: &'a str,
}

/// A message submitted through the contact form.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

/// Body of `POST /emails`.
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

/// Resend client for transactional email.
#[derive(Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    from: String,
    store_inbox: String,
}

impl EmailClient {
    /// Create a new Resend client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ResendConfig) -> Result<Self, EmailError> {
        let mut headers = HeaderMap::new();
        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| EmailError::InvalidKey(e.to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            from: config.from.clone(),
            store_inbox: config.store_inbox.clone(),
        })
    }

    /// Send the email verification link.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or Resend rejects the message.
    pub async fn send_verification(&self, to: &str, name: &str, link: &str) -> Result<(), EmailError> {
        let html = VerificationHtml { name, link }.render()?;
        let text = VerificationText { name, link }.render()?;
        self.send(to, "Verify your Oakhouse account", &html, &text, None)
            .await
    }

    /// Send the password reset link.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or Resend rejects the message.
    pub async fn send_password_reset(
        &self,
        to: &str,
        name: &str,
        link: &str,
    ) -> Result<(), EmailError> {
        let html = PasswordResetHtml { name, link }.render()?;
        let text = PasswordResetText { name, link }.render()?;
        self.send(to, "Reset your Oakhouse password", &html, &text, None)
            .await
    }

    /// Send the receipt for a paid order.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or Resend rejects the message.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        name: &str,
        order: &Order,
        items: &[OrderItem],
        link: &str,
    ) -> Result<(), EmailError> {
        let lines = confirmation_lines(items);
        let total = Money::gel(order.total_price).to_string();
        let subject = format!("Your Oakhouse order #{}", order.id);

        let html = OrderConfirmationHtml {
            name,
            order_id: order.id.to_string(),
            lines: &lines,
            total: total.clone(),
            link,
        }
        .render()?;
        let text = OrderConfirmationText {
            name,
            order_id: order.id.to_string(),
            lines: &lines,
            total,
            link,
        }
        .render()?;

        self.send(to, &subject, &html, &text, None).await
    }

    /// Forward a contact form message to the store inbox.
    ///
    /// Replies go straight to the sender.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or Resend rejects the message.
    pub async fn send_contact(&self, message: &ContactMessage) -> Result<(), EmailError> {
        let subject = message
            .subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("New message");

        let html = ContactHtml {
            name: &message.name,
            email: &message.email,
            subject,
            message: &message.message,
        }
        .render()?;
        let text = ContactText {
            name: &message.name,
            email: &message.email,
            subject,
            message: &message.message,
        }
        .render()?;

        let full_subject = format!("[Contact] {subject}");
        self.send(
            &self.store_inbox,
            &full_subject,
            &html,
            &text,
            Some(&message.email),
        )
        .await
    }

    #[instrument(skip(self, html, text), fields(to = %to))]
    async fn send(
        &self,
        to: &str,
        subject: &str,
        html: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<(), EmailError> {
        let body = SendRequest {
            from: &self.from,
            to: [to],
            subject,
            html,
            text,
            reply_to,
        };

        let response = self.client.post(SEND_URL).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

fn confirmation_lines(items: &[OrderItem]) -> Vec<ConfirmationLine> {
    items
        .iter()
        .map(|item| ConfirmationLine {
            name: item.name.clone(),
            quantity: item.quantity,
            total: Money::gel(item.price * rust_decimal::Decimal::from(item.quantity)).to_string(),
        })
        .collect()
}
