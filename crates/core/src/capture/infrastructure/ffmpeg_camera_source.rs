use crate::capture::domain::frame_source::FrameSource;
use crate::error::{BoxError, CaptureError};
use crate::shared::frame::Frame;

/// Maps a bare device index ("0") to its V4L2 node; anything else is passed
/// to ffmpeg untouched (a path, an RTSP URL, ...).
pub fn parse_device_index(device: &str) -> String {
    match device.trim().parse::<u32>() {
        Ok(index) => format!("/dev/video{index}"),
        Err(_) => device.to_string(),
    }
}

/// Live capture through libavdevice.
///
/// Opens the device once and decodes frames on demand, converting each one
/// to packed RGB24.
pub struct FfmpegCameraSource {
    device: String,
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
}

// Safety: the source is owned by a CameraSession and only read while its
// mutex is held. The raw pointers inside ffmpeg types never cross threads
// concurrently.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    pub fn open(device: &str) -> Result<Self, CaptureError> {
        let url = parse_device_index(device);
        Self::open_url(&url).map_err(|source| CaptureError::Open {
            device: url.clone(),
            source,
        })
    }

    fn open_url(url: &str) -> Result<Self, BoxError> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let ictx = ffmpeg_next::format::input(url)?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;
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
        )?;

        log::info!("Opened capture device {url} ({width}x{height})");
        Ok(Self {
            device: url.to_string(),
            ictx,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            frame_index: 0,
        })
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, BoxError> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb)?;

        let pixels = extract_rgb_pixels(&rgb, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn next_frame(&mut self) -> Result<Frame, BoxError> {
        if let Some(frame) = self.try_receive()? {
            return Ok(frame);
        }
        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                return Err("capture device returned no more packets".into());
            };
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }
            if let Some(frame) = self.try_receive()? {
                return Ok(frame);
            }
        }
    }
}

impl FrameSource for FfmpegCameraSource {
    fn read(&mut self) -> Result<Frame, CaptureError> {
        self.next_frame().map_err(CaptureError::Read)
    }
}

impl Drop for FfmpegCameraSource {
    fn drop(&mut self) {
        log::info!("Released capture device {}", self.device);
    }
}

/// Copies an ffmpeg RGB24 frame into a tightly packed buffer, dropping the
/// per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
