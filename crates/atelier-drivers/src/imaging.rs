//! Native image transformations on the `image` crate.
//!
//! Handles the shipped core image skills. The output encoding follows the
//! output path's extension, so conversions are just re-encodes.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use tracing::debug;

use atelier_skills::types::{ParamMap, Skill};

use crate::errors::DriverError;
use crate::{Driver, ProgressFn, read_f64};

/// Driver for the native image skills.
#[derive(Debug, Default)]
pub struct ImageDriver;

#[async_trait]
impl Driver for ImageDriver {
    fn id(&self) -> &'static str {
        "image"
    }

    fn supports(&self, skill: &Skill) -> bool {
        skill.driver == self.id()
    }

    async fn execute(
        &self,
        input: &Path,
        output: &Path,
        skill: &Skill,
        params: &ParamMap,
        progress: Option<ProgressFn>,
    ) -> Result<(), DriverError> {
        if let Some(progress) = &progress {
            progress(0.1);
        }
        let mut img = image::open(input)?;

        match skill.id.as_str() {
            "resize" => {
                let percent = read_f64(params, "percent", 100.0);
                if percent <= 0.0 {
                    return Err(DriverError::InvalidParam(
                        "resize percent must be greater than 0".to_string(),
                    ));
                }
                let width = ((f64::from(img.width()) * percent / 100.0).round() as u32).max(1);
                let height = ((f64::from(img.height()) * percent / 100.0).round() as u32).max(1);
                img = img.resize_exact(width, height, FilterType::Lanczos3);
            }
            "grayscale" => {
                img = img.grayscale();
            }
            "blur" => {
                let radius = read_f64(params, "radius", 2.0);
                img = img.blur(radius as f32);
            }
            // Re-encode only: the work happens in the save step below.
            "compress" | "convert_to_jpeg" | "convert_to_png" => {}
            other => return Err(DriverError::UnknownSkill(other.to_string())),
        }

        if let Some(progress) = &progress {
            progress(0.6);
        }

        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" => {
                let quality = read_f64(params, "quality", 90.0).clamp(40.0, 100.0) as u8;
                let writer = BufWriter::new(File::create(output)?);
                let encoder = JpegEncoder::new_with_quality(writer, quality);
                // JPEG has no alpha channel.
                img.to_rgb8().write_with_encoder(encoder)?;
            }
            "png" => {
                let compression = if skill.id == "compress" {
                    CompressionType::Best
                } else {
                    CompressionType::Default
                };
                let writer = BufWriter::new(File::create(output)?);
                let encoder = PngEncoder::new_with_quality(writer, compression, PngFilterType::Adaptive);
                img.write_with_encoder(encoder)?;
            }
            _ => img.save(output)?,
        }

        if let Some(progress) = &progress {
            progress(1.0);
        }
        debug!(skill = %skill.id, output = %output.display(), "Image skill applied");
        Ok(())
    }
}
