//! Microphone Capture
//!
//! cpal input stream owned by a dedicated worker thread. cpal streams are
//! not Send, so the stream lives on the worker and the handle talks to it
//! over a command channel.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use super::buffer::SampleBuffer;

/// Capture configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Preferred input device name (None = system default)
    pub device: Option<String>,
    /// Maximum buffered duration in seconds
    pub max_duration_secs: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: None,
            max_duration_secs: 60,
        }
    }
}

enum CaptureCommand {
    Start,
    Stop,
    Shutdown,
}

/// Error raised by the input stream while recording
#[derive(Debug, Clone)]
pub struct StreamFault {
    pub message: String,
    pub is_disconnection: bool,
}

/// Capture errors
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("No default input device")]
    NoDefaultDevice,

    #[error("Input device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to query device config: {0}")]
    ConfigError(String),

    #[error("Failed to build input stream: {0}")]
    StreamError(String),

    #[error("Capture worker is gone")]
    WorkerGone,
}

/// Audio input device information
#[derive(Debug, Clone)]
pub struct InputDevice {
    pub name: String,
    pub is_default: bool,
}

/// Handle to a microphone capture worker
pub struct MicCapture {
    command_tx: Mutex<mpsc::Sender<CaptureCommand>>,
    buffer: Arc<Mutex<SampleBuffer>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    is_recording: Arc<Mutex<bool>>,
    device_sample_rate: u32,
    last_fault: Arc<Mutex<Option<StreamFault>>>,
}

impl MicCapture {
    /// Open the configured (or default) input device and spawn the worker
    pub fn open(config: CaptureConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();

        let device = match &config.device {
            Some(name) => host
                .input_devices()
                .map_err(|e| CaptureError::ConfigError(e.to_string()))?
                .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.clone()))?,
            None => host
                .default_input_device()
                .ok_or(CaptureError::NoDefaultDevice)?,
        };

        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?;

        let device_sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let stream_config = cpal::StreamConfig {
            channels: supported.channels(),
            sample_rate: supported.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        tracing::info!(
            "Audio input: {} ({}Hz, {} channels)",
            device.name().unwrap_or_else(|_| "unknown".into()),
            device_sample_rate,
            channels
        );

        let capacity = device_sample_rate as usize * config.max_duration_secs.max(1) as usize;
        let buffer = Arc::new(Mutex::new(SampleBuffer::new(capacity)));
        let is_recording = Arc::new(Mutex::new(false));
        let last_fault: Arc<Mutex<Option<StreamFault>>> = Arc::new(Mutex::new(None));

        let (command_tx, command_rx) = mpsc::channel::<CaptureCommand>();

        let buffer_for_worker = buffer.clone();
        let recording_for_worker = is_recording.clone();
        let fault_for_worker = last_fault.clone();

        let worker = std::thread::spawn(move || {
            let mut stream: Option<cpal::Stream> = None;

            loop {
                match command_rx.recv() {
                    Ok(CaptureCommand::Start) => {
                        if stream.is_some() {
                            continue;
                        }
                        *fault_for_worker.lock() = None;

                        let buffer_cb = buffer_for_worker.clone();
                        let fault_cb = fault_for_worker.clone();
                        let recording_cb = recording_for_worker.clone();

                        let built = device.build_input_stream(
                            &stream_config,
                            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                                // Downmix to mono by averaging interleaved channels
                                let mono: Vec<f32> = if channels > 1 {
                                    data.chunks(channels)
                                        .map(|frame| {
                                            frame.iter().sum::<f32>() / channels as f32
                                        })
                                        .collect()
                                } else {
                                    data.to_vec()
                                };
                                buffer_cb.lock().push(&mono);
                            },
                            move |err| {
                                let message = err.to_string();
                                tracing::error!("Audio stream error: {}", message);

                                let is_disconnection = message.contains("disconnected")
                                    || message.contains("device")
                                    || message.contains("DeviceNotAvailable")
                                    || message.contains("lost");

                                *fault_cb.lock() = Some(StreamFault {
                                    message,
                                    is_disconnection,
                                });
                                if is_disconnection {
                                    *recording_cb.lock() = false;
                                }
                            },
                            None,
                        );

                        match built {
                            Ok(s) => {
                                if s.play().is_ok() {
                                    *recording_for_worker.lock() = true;
                                    stream = Some(s);
                                    tracing::info!("Audio capture started");
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to build audio stream: {}", e);
                                *fault_for_worker.lock() = Some(StreamFault {
                                    message: e.to_string(),
                                    is_disconnection: true,
                                });
                            }
                        }
                    }
                    Ok(CaptureCommand::Stop) => {
                        stream = None;
                        *recording_for_worker.lock() = false;
                        tracing::info!("Audio capture stopped");
                    }
                    Ok(CaptureCommand::Shutdown) | Err(_) => {
                        drop(stream.take());
                        *recording_for_worker.lock() = false;
                        break;
                    }
                }
            }
        });

        Ok(Self {
            command_tx: Mutex::new(command_tx),
            buffer,
            worker: Mutex::new(Some(worker)),
            is_recording,
            device_sample_rate,
            last_fault,
        })
    }

    /// List available input devices
    pub fn list_devices() -> Result<Vec<InputDevice>, CaptureError> {
        let host = cpal::default_host();
        let default_name = host
            .default_input_device()
            .and_then(|d| d.name().ok());

        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?
            .filter_map(|device| {
                let name = device.name().ok()?;
                Some(InputDevice {
                    is_default: Some(&name) == default_name.as_ref(),
                    name,
                })
            })
            .collect();

        Ok(devices)
    }

    /// Start recording
    pub fn start(&self) -> Result<(), CaptureError> {
        self.command_tx
            .lock()
            .send(CaptureCommand::Start)
            .map_err(|_| CaptureError::WorkerGone)?;

        // Give the worker a moment to spin up the stream
        std::thread::sleep(std::time::Duration::from_millis(50));
        Ok(())
    }

    /// Stop recording and take the captured samples with the device rate
    pub fn stop(&self) -> Result<(Vec<f32>, u32), CaptureError> {
        self.command_tx
            .lock()
            .send(CaptureCommand::Stop)
            .map_err(|_| CaptureError::WorkerGone)?;

        std::thread::sleep(std::time::Duration::from_millis(50));

        let samples = self.buffer.lock().drain();
        tracing::info!(
            "Capture finished: {} samples at {}Hz",
            samples.len(),
            self.device_sample_rate
        );

        Ok((samples, self.device_sample_rate))
    }

    /// Whether recording is in progress
    pub fn is_recording(&self) -> bool {
        *self.is_recording.lock()
    }

    /// Sample rate the device delivers
    pub fn device_sample_rate(&self) -> u32 {
        self.device_sample_rate
    }

    /// Last stream fault, if any (e.g. microphone unplugged)
    pub fn last_fault(&self) -> Option<StreamFault> {
        self.last_fault.lock().clone()
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        let _ = self.command_tx.lock().send(CaptureCommand::Shutdown);
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}
