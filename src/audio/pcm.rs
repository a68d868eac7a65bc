//! PCM16 and base64 conversions for the realtime wire format
//!
//! Samples travel as signed 16-bit little-endian PCM, base64-encoded.
//! Float samples are in [-1.0, 1.0].

use anyhow::{Context, Result};
use base64::Engine;

/// Convert float samples to PCM16 (clamped, scaled by 32767, truncated)
pub fn f32_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
        .collect()
}

/// Convert PCM16 samples to floats (divided by 32768)
pub fn pcm16_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / 32768.0).collect()
}

pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Little-endian byte pairs to samples; a trailing odd byte is dropped
pub fn bytes_to_pcm16(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(data)
        .context("Invalid base64 audio payload")
}

/// Average interleaved channels into a mono signal
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Linear-interpolation resampling of a mono signal
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = ((samples.len() as f64) / ratio).floor() as usize;
    let last = samples.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            samples[idx] + (samples[next] - samples[idx]) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_to_pcm16_clamps() {
        assert_eq!(f32_to_pcm16(&[0.0, 1.0, -1.0, 2.0, -3.0]), vec![0, 32767, -32767, 32767, -32767]);
    }

    #[test]
    fn test_pcm16_to_f32_range() {
        let floats = pcm16_to_f32(&[i16::MIN, 0, i16::MAX]);
        assert_eq!(floats[0], -1.0);
        assert_eq!(floats[1], 0.0);
        assert!(floats[2] < 1.0 && floats[2] > 0.999);
    }

    #[test]
    fn test_bytes_little_endian() {
        assert_eq!(pcm16_to_bytes(&[1, -2]), vec![0x01, 0x00, 0xFE, 0xFF]);
        assert_eq!(bytes_to_pcm16(&[0x01, 0x00, 0xFE, 0xFF, 0x07]), vec![1, -2]);
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert!(decode_base64("not base64!!").is_err());
    }

    #[test]
    fn test_downmix_stereo() {
        assert_eq!(downmix_to_mono(&[0.5, -0.5, 1.0, 0.0], 2), vec![0.0, 0.5]);
        assert_eq!(downmix_to_mono(&[0.25], 1), vec![0.25]);
    }

    #[test]
    fn test_resample_halves_length() {
        let samples: Vec<f32> = (0..480).map(|i| i as f32 / 480.0).collect();
        let out = resample_linear(&samples, 48000, 24000);
        assert_eq!(out.len(), 240);
        assert!((out[10] - samples[20]).abs() < 1e-6);
    }

    #[test]
    fn test_resample_upsamples_with_interpolation() {
        let out = resample_linear(&[0.0, 1.0], 16000, 32000);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }
}
