//! Audio Format Utilities
//!
//! Conversion, encoding, and level measurement.

use rubato::{FftFixedIn, Resampler};
use std::io::Cursor;

/// Sample rate expected by the speech API
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;

/// Convert f32 samples in [-1.0, 1.0] to little-endian 16-bit PCM bytes
pub fn pcm16_bytes(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Encode mono samples as an in-memory 16-bit PCM WAV file
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in samples {
            let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            writer.write_sample(value)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

/// Audio duration in milliseconds for a given sample count
pub fn duration_ms(sample_count: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (sample_count as u64 * 1000) / sample_rate as u64
}

/// Scale samples so the loudest peak sits at +/-1.0
pub fn normalize(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, f32::max);

    if peak > 0.0 && peak != 1.0 {
        let scale = 1.0 / peak;
        for sample in samples.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Root-mean-square level of the samples
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Energy-based speech check: true if the RMS level clears the threshold
pub fn has_speech(samples: &[f32], threshold: f32) -> bool {
    rms_level(samples) > threshold
}

/// Resample mono audio between sample rates using an FFT resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    const CHUNK_SIZE: usize = 1024;

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        2, // sub_chunks
        1, // mono
    )
    .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let mut output = Vec::with_capacity(
        (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize + CHUNK_SIZE,
    );

    for chunk in samples.chunks(CHUNK_SIZE) {
        let mut frame = chunk.to_vec();
        if frame.len() < CHUNK_SIZE {
            frame.resize(CHUNK_SIZE, 0.0);
        }

        match resampler.process(&[frame], None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    output.extend_from_slice(channel);
                }
            }
            Err(e) => {
                tracing::warn!("Resampling error: {}", e);
            }
        }
    }

    tracing::debug!(
        "Resampled {} samples ({}Hz) to {} samples ({}Hz)",
        samples.len(),
        from_rate,
        output.len(),
        to_rate
    );

    Ok(output)
}
