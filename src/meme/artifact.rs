//! Download and share helpers for a finished reward.

use std::{
    io::Cursor,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::NaiveDate;
use image::ImageFormat;
use reqwest::Client;

use crate::db::format_date;
use crate::progress::CompletionSnapshot;
use crate::settings::DEFAULT_DOWNLOAD_PREFIX;

use super::{
    error::{MemeError, MemeResult},
    types::{ImageContent, RenderResult},
};

/// `<prefix>-<YYYY-MM-DD>.png`, falling back to the default prefix when blank.
pub fn download_filename(prefix: &str, date: NaiveDate) -> String {
    let prefix = prefix.trim();
    let prefix = if prefix.is_empty() {
        DEFAULT_DOWNLOAD_PREFIX
    } else {
        prefix
    };
    format!("{prefix}-{}.png", format_date(date))
}

/// PNG bytes for the reward. Remote images are fetched and re-encoded.
pub async fn encode_png(reward: &RenderResult, client: &Client, timeout: Duration) -> MemeResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match &reward.content {
        ImageContent::Raster(image) => image.write_to(&mut out, ImageFormat::Png)?,
        ImageContent::RemoteUrl(url) => {
            let bytes = tokio::time::timeout(timeout, fetch(client, url))
                .await
                .map_err(|_| MemeError::Timeout(timeout))??;
            image::load_from_memory(&bytes)?.write_to(&mut out, ImageFormat::Png)?;
        }
    }
    Ok(out.into_inner())
}

async fn fetch(client: &Client, url: &str) -> MemeResult<Vec<u8>> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(MemeError::service(
            Some(status.as_u16()),
            format!("image download failed for {url}"),
        ));
    }
    Ok(response.bytes().await?.to_vec())
}

pub async fn save_reward(
    reward: &RenderResult,
    dir: &Path,
    prefix: &str,
    date: NaiveDate,
    client: &Client,
    timeout: Duration,
) -> MemeResult<PathBuf> {
    let bytes = encode_png(reward, client, timeout).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(download_filename(prefix, date));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

/// Short blurb for sharing alongside the image.
pub fn share_text(reward: &RenderResult, snapshot: &CompletionSnapshot) -> String {
    let mut text = format!(
        "{} ({}/{} tasks done today)",
        reward.source.text, snapshot.completed, snapshot.total
    );
    if let Some(url) = reward.remote_url() {
        text.push(' ');
        text.push_str(url);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meme::types::{CaptionRecord, RenderMethod, SubTone, Tone};
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reward(content: ImageContent) -> RenderResult {
        RenderResult {
            content,
            method: RenderMethod::LocalComposition,
            source: CaptionRecord {
                text: "Crushed it! Clean kitchen".into(),
                tone: Tone::Praise,
                sub_tone: SubTone::Perfect,
                template_id: "success_kid".into(),
                is_generated: false,
            },
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    #[test]
    fn filename_uses_iso_date() {
        assert_eq!(download_filename("my-daily-meme", date()), "my-daily-meme-2024-05-17.png");
        assert_eq!(download_filename("  ", date()), "my-daily-meme-2024-05-17.png");
    }

    #[tokio::test]
    async fn raster_rewards_are_written_as_png() {
        let dir = TempDir::new().unwrap();
        let image = RgbaImage::from_pixel(500, 500, Rgba([1, 2, 3, 255]));
        let path = save_reward(
            &reward(ImageContent::Raster(image)),
            &dir.path().join("out"),
            "reward",
            date(),
            &Client::new(),
            Duration::from_secs(1),
        )
        .await
        .unwrap();

        assert_eq!(path.file_name().unwrap(), "reward-2024-05-17.png");
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (500, 500));
    }

    #[tokio::test]
    async fn remote_rewards_are_downloaded_and_reencoded() {
        let mut jpeg = Cursor::new(Vec::new());
        image::RgbImage::from_pixel(40, 30, image::Rgb([200, 10, 10]))
            .write_to(&mut jpeg, ImageFormat::Jpeg)
            .unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/abc.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg.into_inner()))
            .mount(&server)
            .await;

        let url = format!("{}/abc.jpg", server.uri());
        let bytes = encode_png(
            &reward(ImageContent::RemoteUrl(url)),
            &Client::new(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[tokio::test]
    async fn missing_remote_image_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = encode_png(
            &reward(ImageContent::RemoteUrl(format!("{}/gone.jpg", server.uri()))),
            &Client::new(),
            Duration::from_secs(5),
        )
        .await;
        assert!(matches!(result, Err(MemeError::Service { status: Some(404), .. })));
    }

    #[test]
    fn share_text_mentions_counts_and_url() {
        let raster = reward(ImageContent::Raster(RgbaImage::new(1, 1)));
        assert_eq!(
            share_text(&raster, &CompletionSnapshot::new(5, 5)),
            "Crushed it! Clean kitchen (5/5 tasks done today)"
        );

        let remote = reward(ImageContent::RemoteUrl("https://i.imgflip.com/x.jpg".into()));
        assert!(share_text(&remote, &CompletionSnapshot::new(1, 3)).ends_with("https://i.imgflip.com/x.jpg"));
    }
}
