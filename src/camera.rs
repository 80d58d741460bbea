use crate::{error::CameraError, types::Frame};

#[cfg(feature = "camera-nokhwa")]
pub use self::native::{CameraDevice, NokhwaCamera, available_cameras};

/// Acquires the camera. Opening may fail with `PermissionDenied`.
pub trait CameraSource: Send {
    fn open(&mut self) -> Result<Box<dyn MediaStream>, CameraError>;
}

/// A live camera stream owned by exactly one holder.
pub trait MediaStream: Send {
    /// Newest frame captured since the last call, if any.
    fn latest_frame(&mut self) -> Option<Frame>;

    /// Stops every track. Calling it again is a no-op.
    fn stop(&mut self);
}

#[cfg(feature = "camera-nokhwa")]
mod native {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    use crossbeam_channel::{Receiver, Sender, bounded};
    use nokhwa::{
        Camera, NokhwaError,
        pixel_format::RgbFormat,
        query,
        utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    };

    use super::{CameraSource, MediaStream};
    use crate::{error::CameraError, types::Frame};

    #[derive(Clone, Debug)]
    pub struct CameraDevice {
        pub index: u32,
        pub label: String,
    }

    pub fn available_cameras() -> Result<Vec<CameraDevice>, CameraError> {
        let cameras = query(ApiBackend::Auto).map_err(camera_error)?;
        Ok(cameras
            .into_iter()
            .filter_map(|info| match info.index() {
                CameraIndex::Index(index) => Some(CameraDevice {
                    index: *index,
                    label: info.human_name(),
                }),
                CameraIndex::String(_) => None,
            })
            .collect())
    }

    fn camera_error(err: NokhwaError) -> CameraError {
        let message = err.to_string();
        let lower = message.to_lowercase();
        if lower.contains("permission") || lower.contains("denied") || lower.contains("authoriz")
        {
            CameraError::PermissionDenied
        } else {
            CameraError::Backend(message)
        }
    }

    fn build_camera(index: u32) -> Result<Camera, CameraError> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(camera_error)?;
        camera.open_stream().map_err(camera_error)?;
        Ok(camera)
    }

    /// Camera at a fixed device index.
    #[derive(Clone, Debug)]
    pub struct NokhwaCamera {
        index: u32,
    }

    impl NokhwaCamera {
        pub fn new(index: u32) -> Self {
            Self { index }
        }
    }

    impl CameraSource for NokhwaCamera {
        fn open(&mut self) -> Result<Box<dyn MediaStream>, CameraError> {
            if available_cameras()?.is_empty() {
                return Err(CameraError::NoDevice);
            }
            // Fail fast before spawning the capture thread.
            let camera = build_camera(self.index)?;
            drop(camera);

            let (frame_tx, frame_rx) = bounded(1);
            let stop = Arc::new(AtomicBool::new(false));
            let index = self.index;
            let stop_flag = stop.clone();
            let handle = thread::spawn(move || capture_loop(index, frame_tx, stop_flag));

            log::info!("camera {index} streaming");
            Ok(Box::new(CaptureStream {
                frame_rx,
                stop,
                handle: Some(handle),
            }))
        }
    }

    fn capture_loop(index: u32, frame_tx: Sender<Frame>, stop: Arc<AtomicBool>) {
        let mut camera = match build_camera(index) {
            Ok(camera) => camera,
            Err(err) => {
                log::error!("failed to open camera {index}: {err}");
                return;
            }
        };

        while !stop.load(Ordering::Relaxed) {
            let buffer = match camera.frame() {
                Ok(buffer) => buffer,
                Err(err) => {
                    log::warn!("camera frame read failed: {err}");
                    continue;
                }
            };
            let decoded = match buffer.decode_image::<RgbFormat>() {
                Ok(img) => img,
                Err(err) => {
                    log::warn!("failed to decode camera frame: {err}");
                    continue;
                }
            };

            let (width, height) = decoded.dimensions();
            let rgb = decoded.into_raw();
            if rgb.is_empty() {
                continue;
            }
            let mut rgba = Vec::with_capacity(rgb.len() / 3 * 4);
            for px in rgb.chunks_exact(3) {
                rgba.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }

            // Newest frame wins; a full slot means the consumer is behind.
            let _ = frame_tx.try_send(Frame::new(rgba, width, height));
        }

        if let Err(err) = camera.stop_stream() {
            log::warn!("failed to stop camera {index}: {err}");
        }
    }

    struct CaptureStream {
        frame_rx: Receiver<Frame>,
        stop: Arc<AtomicBool>,
        handle: Option<thread::JoinHandle<()>>,
    }

    impl MediaStream for CaptureStream {
        fn latest_frame(&mut self) -> Option<Frame> {
            self.frame_rx.try_iter().last()
        }

        fn stop(&mut self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = self.handle.take() {
                let _ = handle.join();
                log::info!("camera released");
            }
        }
    }

    impl Drop for CaptureStream {
        fn drop(&mut self) {
            self.stop();
        }
    }
}
