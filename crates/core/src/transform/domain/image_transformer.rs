use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_PROMPT, DEFAULT_SAMPLER, DEFAULT_VAE};

/// Everything that can go wrong between handing a frame to the backend and
/// holding a decodable image. The loop treats all variants the same way;
/// they exist for diagnostics.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("image backend did not answer within {0:?}")]
    Timeout(Duration),
    #[error("image backend request failed: {0}")]
    Transport(String),
    #[error("image backend returned HTTP {status}")]
    Status { status: u16 },
    #[error("image backend response was not valid JSON: {0}")]
    MalformedResponse(String),
    #[error("image backend returned no images")]
    EmptyResponse,
    #[error("image backend returned invalid base64: {0}")]
    Base64(String),
    #[error("returned image could not be decoded: {0}")]
    Decode(String),
    #[error("source frame could not be encoded: {0}")]
    Encode(String),
}

/// How the backend fits the source image to the requested output size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeMode {
    Stretch,
    Crop,
    Pad,
    LatentUpscale,
}

impl ResizeMode {
    /// Numeric code used on the wire.
    pub fn code(self) -> u8 {
        match self {
            ResizeMode::Stretch => 0,
            ResizeMode::Crop => 1,
            ResizeMode::Pad => 2,
            ResizeMode::LatentUpscale => 3,
        }
    }
}

impl Serialize for ResizeMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl std::str::FromStr for ResizeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stretch" => Ok(ResizeMode::Stretch),
            "crop" => Ok(ResizeMode::Crop),
            "pad" => Ok(ResizeMode::Pad),
            "latent-upscale" => Ok(ResizeMode::LatentUpscale),
            other => Err(format!(
                "resize mode must be one of: stretch, crop, pad, latent-upscale, got '{other}'"
            )),
        }
    }
}

/// Generation settings sent alongside every source image.
///
/// `width`/`height` should match a resolution the model was trained on
/// (512x512, 768x512, ...). This is not validated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// 0.0 keeps the source image, 1.0 ignores it.
    pub denoising_strength: f64,
    pub prompt: String,
    pub negative_prompt: String,
    /// -1 picks a random seed per request.
    pub seed: i64,
    pub steps: u32,
    pub cfg_scale: f64,
    pub width: u32,
    pub height: u32,
    pub resize_mode: ResizeMode,
    pub sampler: String,
    pub restore_faces: bool,
    pub tiling: bool,
    pub vae: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            denoising_strength: 0.45,
            prompt: DEFAULT_PROMPT.to_string(),
            negative_prompt: String::new(),
            seed: -1,
            steps: 9,
            cfg_scale: 12.0,
            width: 768,
            height: 512,
            resize_mode: ResizeMode::Pad,
            sampler: DEFAULT_SAMPLER.to_string(),
            restore_faces: false,
            tiling: false,
            vae: DEFAULT_VAE.to_string(),
        }
    }
}

/// External image-generation backend.
///
/// Takes an encoded source image (PNG) and returns the encoded result.
/// Implementations block until the result arrives or their timeout expires.
pub trait ImageTransformer {
    fn transform(&self, source_png: &[u8]) -> Result<Vec<u8>, TransformError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stretch", ResizeMode::Stretch, 0)]
    #[case("crop", ResizeMode::Crop, 1)]
    #[case("pad", ResizeMode::Pad, 2)]
    #[case("latent-upscale", ResizeMode::LatentUpscale, 3)]
    fn test_resize_mode_names_and_codes(
        #[case] name: &str,
        #[case] mode: ResizeMode,
        #[case] code: u8,
    ) {
        assert_eq!(name.parse::<ResizeMode>().unwrap(), mode);
        assert_eq!(mode.code(), code);
        assert_eq!(serde_json::to_string(&mode).unwrap(), code.to_string());
    }

    #[test]
    fn test_unknown_resize_mode_rejected() {
        assert!("zoom".parse::<ResizeMode>().is_err());
    }

    #[test]
    fn test_partial_params_keep_defaults() {
        let params: GenerationParams =
            serde_json::from_str(r#"{"prompt": "ghosts", "resize_mode": "crop"}"#).unwrap();
        assert_eq!(params.prompt, "ghosts");
        assert_eq!(params.resize_mode, ResizeMode::Crop);
        assert_eq!(params.steps, 9);
        assert_eq!(params.seed, -1);
        assert_eq!((params.width, params.height), (768, 512));
    }
}
