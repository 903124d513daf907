//! Build-time compression into a tagged container
//!
//! The base level is flattened to RGBA8, classified, optionally repacked and
//! handed to the universal encoder on a worker pool that lives only for the
//! duration of the call.

use tracing::{debug, error, info};

use crate::channels::{classify, repack_rg_to_ra, Classification, UsedChannels};
use crate::codec::{ConfigError, EncodeError, EncoderParams, SelectorCodebook, UniversalEncoder};
use crate::container;
use crate::image::SourceImage;

/// Fixed compression policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressorParams {
    pub max_endpoint_clusters: u32,
    pub max_selector_clusters: u32,
    pub multithreading: bool,
    /// Worker pool size
    pub threads: usize,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            max_endpoint_clusters: 512,
            max_selector_clusters: 512,
            multithreading: true,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl CompressorParams {
    /// Encoder settings for one classified image
    fn encoder_params(&self, classification: &Classification) -> EncoderParams {
        let hints = classification.hints;
        EncoderParams {
            max_endpoint_clusters: self.max_endpoint_clusters,
            max_selector_clusters: self.max_selector_clusters,
            // The repacked alpha plane carries the second channel
            force_alpha: hints.force_alpha || hints.repack_rg_to_ra,
            check_for_alpha: false,
            split_rg_to_color_alpha: hints.split_rg_planes,
            ..EncoderParams::default()
        }
    }
}

/// Compression errors
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("Encoder failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Invalid encoder settings: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to create worker pool: {0}")]
    JobPool(#[from] rayon::ThreadPoolBuildError),
}

/// Compressor bound to a shared selector codebook
pub struct Compressor<'cb> {
    codebook: &'cb SelectorCodebook,
    params: CompressorParams,
}

impl<'cb> Compressor<'cb> {
    pub fn new(codebook: &'cb SelectorCodebook) -> Self {
        Self::with_params(codebook, CompressorParams::default())
    }

    pub fn with_params(codebook: &'cb SelectorCodebook, params: CompressorParams) -> Self {
        Self { codebook, params }
    }

    pub fn params(&self) -> &CompressorParams {
        &self.params
    }

    /// Compress `image` into a container; an empty buffer means failure
    pub fn compress(&self, image: &SourceImage, channels: UsedChannels) -> Vec<u8> {
        match self.try_compress(image, channels) {
            Ok(container) => container,
            Err(e) => {
                error!("Texture compression failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Compress `image` into a container, reporting the cause on failure
    pub fn try_compress(
        &self,
        image: &SourceImage,
        channels: UsedChannels,
    ) -> Result<Vec<u8>, CompressError> {
        let classification = classify(channels);

        if image.has_mipmaps() {
            debug!(
                "Discarding {} supplied mip levels; only the base level is compressed",
                image.mipmaps().len()
            );
        }

        let mut rgba = image.to_rgba8();
        if classification.hints.repack_rg_to_ra {
            repack_rg_to_ra(&mut rgba);
        }

        let params = self.params.encoder_params(&classification);
        let encoder = UniversalEncoder::new(params, self.codebook)?;

        let threads = if self.params.multithreading {
            self.params.threads.max(1)
        } else {
            1
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("texbridge-encode-{}", i))
            .build()?;

        let payload = pool.install(|| encoder.encode(std::slice::from_ref(&rgba)))?;

        info!(
            "Compressed {}x{} {:?} texture as {} ({} bytes, {} threads)",
            rgba.width(),
            rgba.height(),
            channels,
            classification.tag,
            payload.len(),
            threads
        );

        Ok(container::pack(classification.tag, &payload))
    }
}
