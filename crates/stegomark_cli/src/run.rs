use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::Arc;

use anyhow::{bail, Context};
use stegomark_client::features::{
    ImageWatermarkEmbed, ImageWatermarkEmbedParams, ImageWatermarkExtract,
    ImageWatermarkExtractParams, MessageEmbed, MessageEmbedParams, MessageExtract,
    MessageExtractParams, VideoWatermarkEmbed, VideoWatermarkEmbedParams, VideoWatermarkExtract,
    VideoWatermarkExtractParams,
};
use stegomark_client::{
    decode_data_url, extension_for_mime, ChannelProgressSink, Client, ClientConfig, Feature,
    JobEvent, JobStatus, SelectedFile,
};
use stegomark_logging::{stego_info, stego_warn};
use tokio::runtime::Handle;

use crate::cli::Command;

pub fn execute(runtime: Handle, config: ClientConfig, command: Command) -> anyhow::Result<()> {
    let (sink, events) = ChannelProgressSink::channel();
    let client = Client::new(config, runtime)?.with_progress_sink(Arc::new(sink));
    let jobs = Jobs { client, events };

    match command {
        Command::EmbedMessage {
            cover,
            message,
            password,
            output,
        } => {
            let params = MessageEmbedParams {
                message,
                use_encryption: password.is_some(),
                password: password.unwrap_or_default(),
            };
            let result = jobs.run::<MessageEmbed>(&[("cover_image", cover.as_path())], params)?;
            println!(
                "embedded {} characters using {}/{} bits ({:.2}%), encrypted={}",
                result.message_length,
                result.bits_used,
                result.capacity,
                result.usage_percent,
                result.encrypted
            );
            println!("psnr={:.2} dB ssim={:.4}", result.psnr, result.ssim);
            save(output, &result.stego_image, "stego")?;
        }
        Command::ExtractMessage { image, password } => {
            let params = MessageExtractParams {
                password: password.unwrap_or_default(),
            };
            let result = jobs.run::<MessageExtract>(&[("stego_image", image.as_path())], params)?;
            println!("message ({} characters):", result.length);
            println!("{}", result.message);
        }
        Command::EmbedWatermark {
            host,
            watermark,
            alpha,
            arnold_iterations,
            output,
        } => {
            let params = ImageWatermarkEmbedParams {
                alpha,
                arnold_iterations,
            };
            let result = jobs.run::<ImageWatermarkEmbed>(
                &[("host_image", host.as_path()), ("watermark_image", watermark.as_path())],
                params,
            )?;
            println!(
                "watermark {} embedded in {} blocks (alpha={}, arnold={})",
                result.watermark_size, result.blocks_used, result.alpha, result.arnold_iterations
            );
            println!("psnr={:.2} dB ssim={:.4}", result.psnr, result.ssim);
            save(output, &result.watermarked_image, "watermarked")?;
        }
        Command::ExtractWatermark {
            watermarked,
            original,
            original_watermark,
            watermark_size,
            arnold_iterations,
            output,
        } => {
            let mut inputs = vec![
                ("watermarked_image", watermarked.as_path()),
                ("original_image", original.as_path()),
            ];
            if let Some(path) = &original_watermark {
                inputs.push(("original_watermark", path.as_path()));
            }
            let params = ImageWatermarkExtractParams {
                watermark_size,
                arnold_iterations,
            };
            let result = jobs.run::<ImageWatermarkExtract>(&inputs, params)?;
            match result.nc {
                Some(nc) => println!("extracted {0}x{0} watermark, nc={nc:.4}", result.size),
                None => println!("extracted {0}x{0} watermark", result.size),
            }
            save(output, &result.extracted_watermark, "watermark")?;
        }
        Command::EmbedVideo {
            video,
            watermark,
            alpha,
            frame_skip,
            arnold_iterations,
            no_scene_detection,
            scene_threshold,
            output,
        } => {
            let params = VideoWatermarkEmbedParams {
                alpha,
                frame_skip,
                arnold_iterations,
                use_scene_detection: !no_scene_detection,
                scene_threshold,
            };
            let result = jobs.run::<VideoWatermarkEmbed>(
                &[("video", video.as_path()), ("watermark", watermark.as_path())],
                params,
            )?;
            println!(
                "watermarked {}/{} frames of {} video at {:.2} fps",
                result.watermarked_frames, result.total_frames, result.resolution, result.fps
            );
            if let Some(detected) = result.scene_changes_detected {
                println!(
                    "scene changes: {} detected, {} watermarked",
                    detected,
                    result.scene_changes_watermarked.unwrap_or(0)
                );
            }
            if let Some(improvement) = &result.efficiency_improvement {
                println!("efficiency: {improvement}");
            }
            save(output, &result.watermarked_video, "watermarked")?;
        }
        Command::ExtractVideo {
            watermarked,
            original,
            frame_number,
            watermark_size,
            arnold_iterations,
            output,
        } => {
            let params = VideoWatermarkExtractParams {
                frame_number,
                watermark_size,
                arnold_iterations,
            };
            let result = jobs.run::<VideoWatermarkExtract>(
                &[("watermarked_video", watermarked.as_path()), ("original_video", original.as_path())],
                params,
            )?;
            println!(
                "extracted {0}x{0} watermark from frame {1}",
                result.watermark_size, result.frame_number
            );
            save(output, &result.extracted_watermark, "watermark")?;
        }
    }
    Ok(())
}

struct Jobs {
    client: Client,
    events: Receiver<JobEvent>,
}

impl Jobs {
    /// Submit one job and block until it settles, echoing progress.
    fn run<F: Feature>(&self, inputs: &[(&str, &Path)], params: F::Params) -> anyhow::Result<F::Output> {
        let mut adapter = self.client.adapter::<F>();
        for (slot, path) in inputs {
            adapter.select(slot, SelectedFile::from_path(*path))?;
        }
        let job_id = adapter
            .submit(&params)
            .with_context(|| format!("cannot submit {} job", F::NAME))?;

        loop {
            match self.events.recv() {
                Ok(JobEvent::Progress { job_id: id, event }) if id == job_id => {
                    println!("[{:>5.1}%] {}: {}", event.progress, event.stage, event.message);
                }
                Ok(JobEvent::Settled { job_id: id, .. }) if id == job_id => break,
                Ok(_) => {}
                Err(_) => bail!("progress channel closed before the job settled"),
            }
        }

        let state = adapter.state();
        match state.status() {
            JobStatus::Succeeded => {
                stego_info!("{} job {} succeeded", F::NAME, job_id);
                adapter
                    .result()
                    .context("job succeeded without a result")?
                    .context("unexpected result shape")
            }
            status => {
                let message = state
                    .error()
                    .map(|error| error.message.clone())
                    .unwrap_or_else(|| format!("job ended as {status:?}"));
                stego_warn!("{} job {} did not succeed: {}", F::NAME, job_id, message);
                bail!("{} failed: {}", F::NAME, message)
            }
        }
    }
}

/// Write a returned data URL to `output`, adding the extension its MIME implies.
fn save(output: Option<PathBuf>, data_url: &str, what: &str) -> anyhow::Result<()> {
    let Some(output) = output else {
        return Ok(());
    };
    if data_url.is_empty() {
        bail!("server returned no {what} payload");
    }
    let decoded = decode_data_url(data_url).with_context(|| format!("cannot decode {what} payload"))?;
    let path = if output.extension().is_some() {
        output
    } else {
        output.with_extension(extension_for_mime(&decoded.mime))
    };
    std::fs::write(&path, &decoded.bytes)
        .with_context(|| format!("cannot write {}", path.display()))?;
    println!("saved {what} to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::save;

    #[test]
    fn save_appends_extension_from_mime() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("result");

        save(Some(target.clone()), "data:image/png;base64,iVBORw==", "stego").unwrap();

        let written = std::fs::read(dir.path().join("result.png")).unwrap();
        assert_eq!(written, b"\x89PNG");
    }

    #[test]
    fn missing_payload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(save(Some(dir.path().join("out.png")), "", "stego").is_err());
        assert!(save(None, "", "stego").is_ok());
    }
}
