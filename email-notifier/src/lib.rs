pub mod notifier;
pub mod sendgrid;

pub use notifier::*;
pub use sendgrid::SendGridClient;

use async_trait::async_trait;
use subwatch_core::CoreError;

/// Provider-reported result of a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryStatus {
    pub status_code: u16,
}

/// Outbound email delivery. Implementations make exactly one attempt per call.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, subject: &str, html_content: &str) -> Result<DeliveryStatus, CoreError>;
}

#[cfg(test)]
mod tests;
