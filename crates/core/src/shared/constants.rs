pub const SEETA_MODEL_NAME: &str = "seeta_fd_frontal_v1.0.bin";
pub const SEETA_MODEL_URL: &str =
    "https://github.com/atomashpolskiy/rustface/raw/master/model/seeta_fd_frontal_v1.0.bin";

/// Application directory name under the platform cache/config dirs.
pub const APP_DIR_NAME: &str = "Haunted Mirror";

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:7860";
pub const IMG2IMG_PATH: &str = "/sdapi/v1/img2img";

pub const DEFAULT_PROMPT: &str = "spooky scary skeletons";
pub const DEFAULT_SAMPLER: &str = "DPM++ 2M Karras";
pub const DEFAULT_VAE: &str = "Automatic";

pub const DEFAULT_LIGHTING_BAUD: u32 = 9600;

/// Suffixes for the before/after pair written per successful cycle.
pub const ORIGINAL_SUFFIX: &str = "_orig.png";
pub const TRANSFORMED_SUFFIX: &str = "_spooky.png";
