//! HTTP client for a Plate Recognizer compatible `plate-reader` endpoint.

use anyhow::{anyhow, Result};
use rand::Rng;

use super::{PlateRecognizer, RecognitionResponse};
use crate::config::RecognizerSettings;
use crate::error::RecognitionError;

const UPLOAD_FILE_NAME: &str = "plate.jpg";

/// Blocking client; one request per plate crop.
pub struct PlateRecognizerClient {
    agent: ureq::Agent,
    url: String,
    token: String,
    regions: Vec<String>,
}

impl PlateRecognizerClient {
    pub fn new(settings: &RecognizerSettings) -> Result<Self> {
        let token = settings
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| anyhow!("plate recognizer token is required"))?;
        let agent = ureq::AgentBuilder::new()
            .timeout(settings.timeout)
            .build();
        Ok(Self {
            agent,
            url: settings.url.clone(),
            token,
            regions: settings.regions.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PlateRecognizer for PlateRecognizerClient {
    fn recognize(&self, image_bytes: &[u8]) -> Result<RecognitionResponse, RecognitionError> {
        let boundary = multipart_boundary();
        let body = multipart_body(&boundary, &self.regions, image_bytes);
        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Token {}", self.token))
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={}", boundary),
            )
            .send_bytes(&body);

        match response {
            Ok(resp) => {
                let text = resp
                    .into_string()
                    .map_err(|e| RecognitionError::Transport(e.to_string()))?;
                RecognitionResponse::from_json(&text)
            }
            Err(ureq::Error::Status(status, resp)) => Err(RecognitionError::Status {
                status,
                body: resp.into_string().unwrap_or_default(),
            }),
            Err(err) => Err(RecognitionError::Transport(err.to_string())),
        }
    }
}

fn multipart_boundary() -> String {
    format!("helmetwatch-{:016x}", rand::thread_rng().gen::<u64>())
}

/// `multipart/form-data` body with one `regions` field per region and the
/// image as the `upload` file part.
fn multipart_body(boundary: &str, regions: &[String], image_bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(image_bytes.len() + 256 + regions.len() * 96);
    for region in regions {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"regions\"\r\n\r\n{}\r\n",
                boundary, region
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"upload\"; filename=\"{}\"\r\nContent-Type: image/jpeg\r\n\r\n",
            boundary, UPLOAD_FILE_NAME
        )
        .as_bytes(),
    );
    body.extend_from_slice(image_bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_carries_regions_and_upload() {
        let regions = vec!["mx".to_string(), "in".to_string()];
        let body = multipart_body("b0", &regions, b"JPEGDATA");
        let text = String::from_utf8_lossy(&body);
        assert_eq!(text.matches("name=\"regions\"").count(), 2);
        assert!(text.contains("\r\n\r\nmx\r\n"));
        assert!(text.contains("\r\n\r\nin\r\n"));
        assert!(text.contains("name=\"upload\"; filename=\"plate.jpg\""));
        assert!(text.contains("JPEGDATA\r\n--b0--\r\n"));
        assert!(text.starts_with("--b0\r\n"));
    }

    #[test]
    fn boundaries_differ_between_requests() {
        assert_ne!(multipart_boundary(), multipart_boundary());
    }

    #[test]
    fn client_requires_a_token() {
        let settings = RecognizerSettings {
            token: None,
            ..RecognizerSettings::default()
        };
        assert!(PlateRecognizerClient::new(&settings).is_err());
    }
}
