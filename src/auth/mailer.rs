use async_trait::async_trait;

use crate::auth::AuthError;
use crate::models::identity::LoginCodePurpose;

/// Delivery of sign-up confirmation and magic links.
#[async_trait]
pub trait LinkMailer: Send + Sync {
    async fn send_link(
        &self,
        email: &str,
        purpose: LoginCodePurpose,
        link: &str,
    ) -> Result<(), AuthError>;
}

/// Writes links to the log instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl LinkMailer for LogMailer {
    async fn send_link(
        &self,
        email: &str,
        purpose: LoginCodePurpose,
        link: &str,
    ) -> Result<(), AuthError> {
        tracing::info!(email = %email, purpose = ?purpose, "Sign-in link issued");
        tracing::debug!(email = %email, link = %link, "Sign-in link");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_link_stays_out_of_info_logs() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(LogMailer.send_link(
                "jo@example.com",
                LoginCodePurpose::MagicLink,
                "http://localhost:3000/auth/callback?code=secret-code",
            ))
            .unwrap();
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Sign-in link issued"));
        assert!(!output.contains("secret-code"));
    }
}
