//! Vision Scan Client
//!
//! Sends a receipt photo to an OpenAI-compatible chat-completions endpoint
//! and decodes the structured answer.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::extract::parse_scan_response;
use super::image::ReceiptImage;
use super::ScannedReceipt;
use crate::config::ScanConfig;
use crate::domain::{DomainError, DomainResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Instructions sent with every image
pub const RECEIPT_PROMPT: &str = r#"Analise esta imagem de uma nota fiscal/cupom fiscal de supermercado ou mercado brasileiro e extraia as seguintes informações em formato JSON:

1. "items": array de produtos com:
   - "name": nome do produto (limpo, sem códigos)
   - "quantity": quantidade (número, default 1)
   - "unit_price": preço unitário em reais (número decimal)
   - "total_price": preço total do item (número decimal)

2. "total_amount": valor total da compra em reais (número decimal)

3. "market": nome do estabelecimento/mercado (string ou null)

4. "payment_method": forma de pagamento identificada - pode ser: "Dinheiro", "Débito", "Crédito", "PIX", "VR", "VA" ou null se não identificado

5. "purchase_date": data da compra no formato "YYYY-MM-DD" ou null se não identificada

IMPORTANTE:
- Retorne APENAS o JSON válido, sem markdown ou texto adicional
- Use números decimais para preços (ex: 12.99, não "R$ 12,99")
- Se não conseguir identificar algum campo, use null
- Para itens, tente extrair o máximo possível mesmo que alguns campos estejam incompletos
- Ignore linhas que são códigos de barras, totais parciais, ou informações fiscais"#;

/// Image in, structured receipt guess out
#[async_trait]
pub trait ScanAdapter: Send + Sync {
    async fn scan(&self, image: &ReceiptImage) -> DomainResult<ScannedReceipt>;
}

pub struct VisionScanClient {
    client: reqwest::Client,
    config: ScanConfig,
}

impl VisionScanClient {
    pub fn new(config: ScanConfig) -> DomainResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(DomainError::InvalidInput("Scan API key not configured".to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Chat-completions payload: prompt text plus the inline image
    pub fn request_body(&self, image: &ReceiptImage) -> Value {
        json!({
            "model": self.config.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": RECEIPT_PROMPT },
                    { "type": "image_url", "image_url": { "url": image.to_data_url() } }
                ]
            }],
            "max_tokens": self.config.max_tokens,
        })
    }
}

/// Text of the first choice of a chat-completions response
fn message_content(response: &Value) -> Option<&str> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
}

#[async_trait]
impl ScanAdapter for VisionScanClient {
    async fn scan(&self, image: &ReceiptImage) -> DomainResult<ScannedReceipt> {
        if image.len() > self.config.max_image_bytes {
            return Err(DomainError::InvalidInput("Imagem muito grande.".to_string()));
        }
        log::info!("Processing receipt image ({} bytes, {})", image.len(), image.mime());

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(image))
            .send()
            .await
            .map_err(|e| DomainError::scan(format!("Scan request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::scan(format!("Scan response unreadable: {}", e)))?;

        if !status.is_success() {
            log::error!("Vision API error {}: {}", status, body);
            return Err(DomainError::scan_with_raw(
                format!("Failed to process image with AI ({})", status),
                body,
            ));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| DomainError::scan_with_raw(format!("Invalid AI response: {}", e), body.as_str()))?;
        let Some(content) = message_content(&parsed) else {
            return Err(DomainError::scan_with_raw("No response from AI", body));
        };

        let scanned = parse_scan_response(content)?;
        log::info!("Receipt scanned, {} items found", scanned.item_count());
        Ok(scanned)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    use super::*;
    use crate::scan::MAX_IMAGE_BYTES;

    fn config() -> ScanConfig {
        ScanConfig {
            api_key: "secret".to_string(),
            ..ScanConfig::default()
        }
    }

    #[test]
    fn test_request_body_carries_image_and_limits() {
        let client = VisionScanClient::new(config()).unwrap();
        let image = ReceiptImage::from_bytes(vec![0xff, 0xd8, 0xff], "image/jpeg", MAX_IMAGE_BYTES).unwrap();

        let body = client.request_body(&image);

        assert_eq!(body["model"], client.config().model.as_str());
        assert_eq!(body["max_tokens"], 4096);
        let content = &body["messages"][0]["content"];
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["image_url"]["url"], "data:image/jpeg;base64,/9j/");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        assert!(VisionScanClient::new(ScanConfig::default()).is_err());
    }

    /// Serve one canned HTTP response on a local port; returns the endpoint URL
    async fn serve_once(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/v1/chat/completions", addr)
    }

    /// Drain headers and the `Content-Length` body so the client sees a clean exchange
    async fn read_request(socket: &mut TcpStream) {
        let mut received = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                return;
            }
            received.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&received);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if received.len() >= head_end + 4 + length {
                    return;
                }
            }
        }
    }

    async fn scan_against(status: &'static str, body: String) -> DomainResult<ScannedReceipt> {
        let endpoint = serve_once(status, body).await;
        let client = VisionScanClient::new(ScanConfig { endpoint, ..config() }).unwrap();
        let image = ReceiptImage::from_bytes(vec![0xff, 0xd8, 0xff], "image/jpeg", MAX_IMAGE_BYTES).unwrap();
        client.scan(&image).await
    }

    fn completion(content: &str) -> String {
        json!({ "choices": [{ "message": { "content": content } }] }).to_string()
    }

    #[tokio::test]
    async fn test_server_error_keeps_raw_body() {
        let err = scan_against("500 Internal Server Error", "boom".to_string()).await.unwrap_err();

        match err {
            DomainError::Scan { message, raw } => {
                assert!(message.contains("500"));
                assert_eq!(raw.as_deref(), Some("boom"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_scan_error() {
        let body = completion("");
        let err = scan_against("200 OK", body.clone()).await.unwrap_err();

        assert_eq!(err, DomainError::scan_with_raw("No response from AI", body));
    }

    #[tokio::test]
    async fn test_answer_without_json_keeps_raw_text() {
        let err = scan_against("200 OK", completion("Não consegui ler a nota.")).await.unwrap_err();

        assert_eq!(
            err,
            DomainError::scan_with_raw("No JSON found in response", "Não consegui ler a nota.")
        );
    }

    #[tokio::test]
    async fn test_json_inside_prose_is_decoded() {
        let content = r#"Claro! Aqui está: {"items": [{"name": "Arroz", "quantity": 1, "unit_price": 25.9, "total_price": 25.9}, {"name": "Feijão", "quantity": 2, "unit_price": 8.5, "total_price": 17.0}], "total_amount": 42.9, "market": "Extra"} Qualquer dúvida, avise."#;

        let scanned = scan_against("200 OK", completion(content)).await.unwrap();

        assert_eq!(scanned.item_count(), 2);
        assert_eq!(scanned.total_amount, Some(42.9));
        assert_eq!(scanned.market.as_deref(), Some("Extra"));
    }

    #[test]
    fn test_message_content() {
        let response = json!({ "choices": [{ "message": { "content": "{\"items\": []}" } }] });
        assert_eq!(message_content(&response), Some("{\"items\": []}"));

        let empty = json!({ "choices": [{ "message": { "content": "  " } }] });
        assert_eq!(message_content(&empty), None);
        assert_eq!(message_content(&json!({ "choices": [] })), None);
    }
}
