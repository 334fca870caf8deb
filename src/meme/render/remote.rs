//! Remote captioning service (imgflip `caption_image`).

use std::time::Duration;

use async_trait::async_trait;
use rand::{rngs::StdRng, seq::SliceRandom};
use reqwest::{multipart::Form, Client};
use serde::Deserialize;

use crate::meme::{
    error::{MemeError, MemeResult},
    templates::remote_pool,
    types::{CaptionRecord, ImageContent, RenderMethod, RenderResult},
};
use crate::settings::MemeSettings;

use super::{layout::SEGMENT_BREAK, RenderStrategy};

#[derive(Debug, Deserialize)]
struct CaptionResponse {
    success: bool,
    #[serde(default)]
    data: Option<CaptionData>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionData {
    url: String,
}

pub struct RemoteCaptioner {
    client: Client,
    endpoint: String,
    username: String,
    password: String,
}

impl RemoteCaptioner {
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> MemeResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
        })
    }

    pub fn from_settings(settings: &MemeSettings) -> MemeResult<Self> {
        let (username, password) = settings.imgflip_credentials();
        Self::new(
            settings.imgflip_endpoint.clone(),
            username,
            password,
            settings.request_timeout(),
        )
    }
}

/// Top and bottom text. Only the first break splits; later breaks become
/// spaces in the bottom segment.
pub fn split_segments(text: &str) -> (String, String) {
    match text.split_once(SEGMENT_BREAK) {
        Some((top, bottom)) => {
            let top = top.trim();
            let bottom = bottom.replace(SEGMENT_BREAK, " ").trim().to_string();
            if top.is_empty() {
                (bottom, String::new())
            } else {
                (top.to_string(), bottom)
            }
        }
        None => (text.trim().to_string(), String::new()),
    }
}

#[async_trait]
impl RenderStrategy for RemoteCaptioner {
    fn method(&self) -> RenderMethod {
        RenderMethod::RemoteService
    }

    async fn produce(&self, record: &CaptionRecord, rng: &mut StdRng) -> MemeResult<RenderResult> {
        let template = remote_pool(record.tone)
            .choose(rng)
            .ok_or_else(|| MemeError::Config(format!("no remote templates for {}", record.tone.as_str())))?;
        let (text0, text1) = split_segments(&record.text);

        let form = Form::new()
            .text("template_id", template.id)
            .text("username", self.username.clone())
            .text("password", self.password.clone())
            .text("text0", text0)
            .text("text1", text1);

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MemeError::service(
                Some(status.as_u16()),
                format!("caption service rejected {}", template.name),
            ));
        }

        let parsed: CaptionResponse = serde_json::from_str(&body)
            .map_err(|err| MemeError::service(None, format!("malformed caption response: {err}")))?;

        match (parsed.success, parsed.data) {
            (true, Some(data)) if !data.url.trim().is_empty() => Ok(RenderResult {
                content: ImageContent::RemoteUrl(data.url),
                method: RenderMethod::RemoteService,
                source: record.clone(),
            }),
            _ => Err(MemeError::service(
                None,
                parsed
                    .error_message
                    .unwrap_or_else(|| "caption service reported failure".into()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::types::{SubTone, Tone};
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn record(text: &str) -> CaptionRecord {
        CaptionRecord {
            text: text.into(),
            tone: Tone::Roast,
            sub_tone: SubTone::Roast,
            template_id: "facepalm".into(),
            is_generated: false,
        }
    }

    fn captioner(server: &MockServer) -> RemoteCaptioner {
        RemoteCaptioner::new(
            format!("{}/caption_image", server.uri()),
            "imgflip_hubot",
            "imgflip_hubot",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn segments_split_on_first_break() {
        assert_eq!(
            split_segments("Goal completed | dopamine activated"),
            ("Goal completed".to_string(), "dopamine activated".to_string())
        );
        assert_eq!(
            split_segments("a|b|c"),
            ("a".to_string(), "b c".to_string())
        );
        assert_eq!(split_segments("no break"), ("no break".to_string(), String::new()));
        assert_eq!(split_segments("|only bottom"), ("only bottom".to_string(), String::new()));
    }

    #[tokio::test]
    async fn success_returns_hosted_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/caption_image"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "url": "https://i.imgflip.com/abc.jpg", "page_url": "https://imgflip.com/i/abc" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = captioner(&server)
            .produce(&record("3/10? | Even my plant is more productive"), &mut StdRng::seed_from_u64(2))
            .await
            .unwrap();

        assert_eq!(result.method, RenderMethod::RemoteService);
        assert_eq!(result.remote_url(), Some("https://i.imgflip.com/abc.jpg"));

        let requests: Vec<Request> = server.received_requests().await.unwrap_or_default();
        let body = String::from_utf8_lossy(&requests[0].body).to_string();
        assert!(body.contains("name=\"template_id\""));
        assert!(body.contains("name=\"text0\""));
        assert!(body.contains("Even my plant is more productive"));
        assert!(body.contains("imgflip_hubot"));
    }

    #[tokio::test]
    async fn reported_failure_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "error_message": "No texts specified."
            })))
            .mount(&server)
            .await;

        let err = captioner(&server)
            .produce(&record("hi"), &mut StdRng::seed_from_u64(2))
            .await
            .unwrap_err();
        assert!(matches!(err, MemeError::Service { ref message, .. } if message == "No texts specified."));
    }

    #[tokio::test]
    async fn non_success_status_is_a_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = captioner(&server)
            .produce(&record("hi"), &mut StdRng::seed_from_u64(2))
            .await
            .unwrap_err();
        assert!(matches!(err, MemeError::Service { status: Some(502), .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_service_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let captioner = RemoteCaptioner::new(
            format!("http://127.0.0.1:{port}/caption_image"),
            "imgflip_hubot",
            "imgflip_hubot",
            Duration::from_secs(5),
        )
        .unwrap();

        let err = captioner
            .produce(&record("hi"), &mut StdRng::seed_from_u64(2))
            .await
            .unwrap_err();
        assert!(matches!(err, MemeError::Service { status: None, .. }));
    }
}
