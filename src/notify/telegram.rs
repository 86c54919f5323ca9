//! Telegram Bot API notifier

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Notification, Notifier};
use crate::config::NotifierConfig;

/// Pending messages beyond this are dropped
const QUEUE_CAPACITY: usize = 256;

/// Upper bound on draining the queue at shutdown
const DRAIN_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

/// Sends notifications through a background delivery task
pub struct TelegramNotifier {
    tx: Mutex<Option<mpsc::Sender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TelegramNotifier {
    /// Spawn the delivery task on the current tokio runtime
    pub fn spawn(config: &NotifierConfig, token: &str, chat_id: &str) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            });
        let url = send_message_url(&config.api_url, token);
        let chat_id = chat_id.to_string();

        let task = tokio::spawn(async move {
            Self::run_delivery(rx, client, url, chat_id).await;
        });

        Self {
            tx: Mutex::new(Some(tx)),
            task: Mutex::new(Some(task)),
        }
    }

    /// Deliver queued messages until every sender is dropped
    async fn run_delivery(
        mut rx: mpsc::Receiver<String>,
        client: Client,
        url: String,
        chat_id: String,
    ) {
        while let Some(text) = rx.recv().await {
            let body = SendMessage {
                chat_id: &chat_id,
                text: &text,
                parse_mode: "Markdown",
            };
            match client.post(&url).json(&body).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!("Telegram message delivered");
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    tracing::error!(%status, detail = %detail, "Telegram rejected message");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to send Telegram message");
                }
            }
        }
        tracing::debug!("Telegram delivery task stopped");
    }
}

fn send_message_url(api_url: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn notify(&self, notification: Notification) {
        let tx = match self.tx.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(tx) = tx else {
            tracing::warn!("Notifier shut down, notification dropped");
            return;
        };
        if let Err(e) = tx.try_send(notification.render()) {
            tracing::warn!(error = %e, "Notification dropped");
        }
    }

    /// Close the queue and wait for the delivery task to send what is left
    async fn shutdown(&self) {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let task = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(_) => None,
        };
        let Some(task) = task else {
            return;
        };

        match tokio::time::timeout(DRAIN_TIMEOUT, task).await {
            Ok(Ok(())) => tracing::debug!("Notification queue drained"),
            Ok(Err(e)) => tracing::error!(error = %e, "Telegram delivery task failed"),
            Err(_) => tracing::warn!("Timed out draining notifications, pending messages dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_send_message_url() {
        assert_eq!(
            send_message_url("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn test_payload_shape() {
        let body = SendMessage {
            chat_id: "42",
            text: "hello",
            parse_mode: "Markdown",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["chat_id"], "42");
        assert_eq!(json["parse_mode"], "Markdown");
    }

    /// One-shot HTTP endpoint that captures the first request
    async fn capture_one_request() -> (String, tokio::sync::oneshot::Receiver<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if String::from_utf8_lossy(&buf).contains("STOP LOSS HIT") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\n{}")
                .await
                .unwrap();
            let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
        });

        (format!("http://{}", addr), rx)
    }

    #[tokio::test]
    async fn test_shutdown_delivers_queued_message() {
        let (api_url, request) = capture_one_request().await;
        let config = NotifierConfig {
            api_url,
            timeout_secs: 5,
            ..NotifierConfig::default()
        };
        let notifier = TelegramNotifier::spawn(&config, "123:abc", "42");
        notifier.notify(Notification::StopLoss {
            symbol: "BTCUSDT".into(),
            price: dec!(90),
        });
        notifier.shutdown().await;

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage"));
        assert!(request.contains("STOP LOSS HIT"));
        assert!(request.contains("\"chat_id\":\"42\""));
    }

    #[tokio::test]
    async fn test_notify_after_shutdown_is_dropped() {
        let config = NotifierConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..NotifierConfig::default()
        };
        let notifier = TelegramNotifier::spawn(&config, "token", "chat");
        notifier.shutdown().await;
        notifier.notify(Notification::StopLoss {
            symbol: "BTCUSDT".into(),
            price: dec!(90),
        });
        notifier.shutdown().await;
    }

    #[tokio::test]
    async fn test_notify_unreachable_endpoint_does_not_fail() {
        let config = NotifierConfig {
            api_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 1,
            ..NotifierConfig::default()
        };
        let notifier = TelegramNotifier::spawn(&config, "token", "chat");
        notifier.notify(Notification::StopLoss {
            symbol: "BTCUSDT".into(),
            price: dec!(90),
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
