use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::shared::constants::IMG2IMG_PATH;
use crate::transform::domain::image_transformer::{
    GenerationParams, ImageTransformer, ResizeMode, TransformError,
};

/// Blocking client for an AUTOMATIC1111-compatible `img2img` endpoint.
///
/// The webui must be started with `--api` for the endpoint to exist.
pub struct Img2ImgClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    params: GenerationParams,
    timeout: Duration,
}

#[derive(Serialize)]
struct Img2ImgRequest<'a> {
    init_images: Vec<String>,
    denoising_strength: f64,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    negative_prompt: Option<&'a str>,
    seed: i64,
    steps: u32,
    cfg_scale: f64,
    width: u32,
    height: u32,
    resize_mode: ResizeMode,
    sampler_index: &'a str,
    restore_faces: bool,
    tiling: bool,
    script_args: Vec<serde_json::Value>,
    sd_vae: &'a str,
}

#[derive(Deserialize)]
struct Img2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

impl Img2ImgClient {
    /// `backend_url` is the webui root, e.g. `http://127.0.0.1:7860`.
    pub fn new(
        backend_url: &str,
        params: GenerationParams,
        timeout: Duration,
    ) -> Result<Self, TransformError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransformError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}{IMG2IMG_PATH}", backend_url.trim_end_matches('/')),
            params,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, source_png: &[u8]) -> Img2ImgRequest<'_> {
        let p = &self.params;
        Img2ImgRequest {
            init_images: vec![STANDARD.encode(source_png)],
            denoising_strength: p.denoising_strength,
            prompt: &p.prompt,
            negative_prompt: (!p.negative_prompt.is_empty()).then_some(p.negative_prompt.as_str()),
            seed: p.seed,
            steps: p.steps,
            cfg_scale: p.cfg_scale,
            width: p.width,
            height: p.height,
            resize_mode: p.resize_mode,
            sampler_index: &p.sampler,
            restore_faces: p.restore_faces,
            tiling: p.tiling,
            script_args: Vec::new(),
            sd_vae: &p.vae,
        }
    }

    fn classify(&self, err: reqwest::Error) -> TransformError {
        if err.is_timeout() {
            TransformError::Timeout(self.timeout)
        } else {
            TransformError::Transport(err.to_string())
        }
    }
}

impl ImageTransformer for Img2ImgClient {
    fn transform(&self, source_png: &[u8]) -> Result<Vec<u8>, TransformError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(source_png))
            .send()
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        log::debug!("Backend response: {status}");
        if !status.is_success() {
            return Err(TransformError::Status {
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(|e| self.classify(e))?;
        first_image(&text)
    }
}

/// Extracts and decodes the first image of an `img2img` response body.
fn first_image(body: &str) -> Result<Vec<u8>, TransformError> {
    let parsed: Img2ImgResponse =
        serde_json::from_str(body).map_err(|e| TransformError::MalformedResponse(e.to_string()))?;
    let encoded = parsed
        .images
        .into_iter()
        .next()
        .filter(|s| !s.is_empty())
        .ok_or(TransformError::EmptyResponse)?;

    // Some backends prefix a data URL header
    let payload = match encoded.split_once(',') {
        Some((header, data)) if header.starts_with("data:") => data,
        _ => encoded.as_str(),
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| TransformError::Base64(e.to_string()))
}
