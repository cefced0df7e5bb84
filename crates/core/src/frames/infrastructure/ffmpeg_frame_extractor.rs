use std::path::Path;

use crate::frames::domain::frame_extractor::{FrameExtractError, FrameExtractor};
use crate::frames::domain::frame_sample::{FrameSample, SampleDecision, SampleSchedule};
use crate::shared::artifact_layout::ArtifactLayout;
use crate::shared::cancellation::CancellationToken;

/// `AV_NOPTS_VALUE`: the stream carries no start time.
const NO_PTS: i64 = i64::MIN;

/// Samples stills by decoding the video once via ffmpeg-next and saving the
/// first frame at or after each interval boundary as JPEG.
pub struct FfmpegFrameExtractor;

impl FfmpegFrameExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegFrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameExtractor for FfmpegFrameExtractor {
    fn extract(
        &self,
        video: &Path,
        interval_seconds: u32,
        layout: &ArtifactLayout,
        cancel: &CancellationToken,
    ) -> Result<Vec<FrameSample>, FrameExtractError> {
        let open_error = |e: ffmpeg_next::Error| FrameExtractError::Open {
            path: video.to_path_buf(),
            message: e.to_string(),
        };
        ffmpeg_next::init().map_err(open_error)?;
        let mut ictx = ffmpeg_next::format::input(video).map_err(open_error)?;

        let (stream_index, time_base, start_pts, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| FrameExtractError::NoVideoStream(video.to_path_buf()))?;
            let start_pts = match stream.start_time() {
                NO_PTS => 0,
                pts => pts,
            };
            (
                stream.index(),
                f64::from(stream.time_base()),
                start_pts,
                stream.parameters(),
            )
        };
        let origin_seconds = start_pts as f64 * time_base;
        if origin_seconds != 0.0 {
            log::debug!("Video stream starts at {origin_seconds:.3}s; sampling from there");
        }

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(parameters)
            .map_err(decode_error)?;
        let mut decoder = codec_ctx.decoder().video().map_err(decode_error)?;
        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(decode_error)?;

        std::fs::create_dir_all(layout.root()).map_err(|e| FrameExtractError::Write {
            path: layout.root().to_path_buf(),
            source: image::ImageError::IoError(e),
        })?;

        let mut sink = FrameSink {
            scaler,
            schedule: SampleSchedule::starting_at(interval_seconds, origin_seconds),
            samples: Vec::new(),
            layout,
            width,
            height,
            time_base,
        };

        for (stream, packet) in ictx.packets() {
            if cancel.is_cancelled() {
                return Err(FrameExtractError::Cancelled);
            }
            if stream.index() != stream_index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }
            sink.drain(&mut decoder)?;
        }
        let _ = decoder.send_eof();
        sink.drain(&mut decoder)?;

        log::info!(
            "Frame extraction complete: {} frames from {} (next target {}s)",
            sink.samples.len(),
            video.display(),
            sink.schedule.next_target()
        );
        Ok(sink.samples)
    }
}

struct FrameSink<'a> {
    scaler: ffmpeg_next::software::scaling::Context,
    schedule: SampleSchedule,
    samples: Vec<FrameSample>,
    layout: &'a ArtifactLayout,
    width: u32,
    height: u32,
    time_base: f64,
}

impl FrameSink<'_> {
    fn drain(
        &mut self,
        decoder: &mut ffmpeg_next::decoder::Video,
    ) -> Result<(), FrameExtractError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while decoder.receive_frame(&mut decoded).is_ok() {
            let Some(pts) = decoded.timestamp().or_else(|| decoded.pts()) else {
                continue;
            };
            let stream_seconds = pts as f64 * self.time_base;
            if let SampleDecision::Capture {
                timestamp_seconds,
                missed,
            } = self.schedule.offer(stream_seconds)
            {
                for gap in missed {
                    log::warn!("Failed to extract frame at {gap}s");
                }
                self.save(&decoded, timestamp_seconds)?;
            }
        }
        Ok(())
    }

    fn save(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        timestamp_seconds: u32,
    ) -> Result<(), FrameExtractError> {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut rgb_frame).map_err(decode_error)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let img = image::RgbImage::from_raw(self.width, self.height, pixels)
            .ok_or_else(|| FrameExtractError::Decode("frame buffer size mismatch".to_string()))?;

        let path = self.layout.frame_path(timestamp_seconds);
        img.save_with_format(&path, image::ImageFormat::Jpeg)
            .map_err(|source| FrameExtractError::Write {
                path: path.clone(),
                source,
            })?;

        self.samples.push(FrameSample {
            timestamp_seconds,
            image_path: path,
        });
        if self.samples.len() % 10 == 0 {
            log::info!("Extracted {} frames", self.samples.len());
        }
        Ok(())
    }
}

fn decode_error(e: ffmpeg_next::Error) -> FrameExtractError {
    FrameExtractError::Decode(e.to_string())
}

/// Copies the RGB plane into a tightly packed buffer, dropping row padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::infrastructure::frame_catalog::FrameCatalog;

    /// Encodes `seconds * fps` grey frames to an MPEG-4 file.
    fn create_test_video(path: &Path, seconds: usize, fps: i32) {
        ffmpeg_next::init().unwrap();
        let (width, height) = (64u32, 48u32);

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();
        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }
        let mut encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let write_packets = |encoder: &mut ffmpeg_next::encoder::Video,
                                 octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..seconds * fps as usize {
            let mut frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::YUV420P,
                width,
                height,
            );
            for plane in 0..3 {
                frame.data_mut(plane).fill(((i * 7) % 256) as u8);
            }
            frame.set_pts(Some(i as i64));
            encoder.send_frame(&frame).unwrap();
            write_packets(&mut encoder, &mut octx);
        }
        encoder.send_eof().unwrap();
        write_packets(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    #[test]
    fn test_extracts_one_frame_per_interval() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        create_test_video(&video, 25, 5);
        let layout = ArtifactLayout::new(dir.path().join("output_clip"));

        let samples = FfmpegFrameExtractor::new()
            .extract(&video, 10, &layout, &CancellationToken::new())
            .unwrap();

        let ts: Vec<u32> = samples.iter().map(|s| s.timestamp_seconds).collect();
        assert_eq!(ts, vec![0, 10, 20]);
        assert!(layout.frame_path(10).is_file());
        let img = image::open(layout.frame_path(20)).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));

        let catalog = FrameCatalog::new(layout, 10);
        assert_eq!(catalog.max_timestamp().unwrap(), Some(20));
    }

    #[test]
    fn test_cancelled_extraction_stops() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip.mp4");
        create_test_video(&video, 2, 5);
        let token = CancellationToken::new();
        token.cancel();

        let result = FfmpegFrameExtractor::new().extract(
            &video,
            10,
            &ArtifactLayout::new(dir.path().join("out")),
            &token,
        );
        assert!(matches!(result, Err(FrameExtractError::Cancelled)));
    }

    #[test]
    fn test_nonexistent_video_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FfmpegFrameExtractor::new().extract(
            Path::new("/nonexistent/clip.mp4"),
            10,
            &ArtifactLayout::new(dir.path()),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(FrameExtractError::Open { .. })));
    }
}
