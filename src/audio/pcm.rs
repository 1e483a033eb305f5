//! PCM sample conversions

use crate::error::AudioError;

/// Convert a float sample to signed 16-bit, saturating at full scale
#[inline]
pub fn float_to_s16(value: f32) -> i16 {
    let scaled = value * 32768.0;
    if scaled >= i16::MAX as f32 {
        i16::MAX
    } else if scaled <= i16::MIN as f32 {
        i16::MIN
    } else {
        scaled.round() as i16
    }
}

/// Convert a signed 16-bit sample to float in [-1, 1)
#[inline]
pub fn s16_to_float(value: i16) -> f32 {
    value as f32 / 32768.0
}

/// Average an interleaved stereo block down to mono
pub fn downmix_stereo(interleaved: &[f32], mono: &mut Vec<f32>) -> Result<(), AudioError> {
    if interleaved.len() % 2 != 0 {
        return Err(AudioError::OddStereoBlock(interleaved.len()));
    }
    mono.clear();
    mono.extend(
        interleaved
            .chunks_exact(2)
            .map(|pair| pair[0] * 0.5 + pair[1] * 0.5),
    );
    Ok(())
}

/// Decode little-endian PCM16 mono bytes into float samples
pub fn pcm16_to_mono(bytes: &[u8], out: &mut Vec<f32>) -> Result<(), AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddPcmBuffer(bytes.len()));
    }
    out.clear();
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|b| s16_to_float(i16::from_le_bytes([b[0], b[1]]))),
    );
    Ok(())
}

/// Decode little-endian PCM16 mono bytes into duplicated stereo frames
pub fn pcm16_to_stereo(bytes: &[u8], out: &mut Vec<[f32; 2]>) -> Result<(), AudioError> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddPcmBuffer(bytes.len()));
    }
    out.clear();
    out.extend(bytes.chunks_exact(2).map(|b| {
        let value = s16_to_float(i16::from_le_bytes([b[0], b[1]]));
        [value, value]
    }));
    Ok(())
}

/// Write PCM16 samples as little-endian bytes into `out`
pub fn s16_to_bytes(samples: &[i16], out: &mut [u8]) {
    for (dst, sample) in out.chunks_exact_mut(2).zip(samples) {
        dst.copy_from_slice(&sample.to_le_bytes());
    }
}

/// Mean absolute amplitude of a block
pub fn mean_abs_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|s| s.abs() as f64).sum();
    (sum / samples.len() as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_to_s16_saturates() {
        assert_eq!(float_to_s16(0.0), 0);
        assert_eq!(float_to_s16(1.0), i16::MAX);
        assert_eq!(float_to_s16(-1.0), i16::MIN);
        assert_eq!(float_to_s16(4.0), i16::MAX);
        assert_eq!(float_to_s16(0.5), 16384);
    }

    #[test]
    fn test_downmix() {
        let mut mono = Vec::new();
        downmix_stereo(&[1.0, 0.0, 0.5, 0.5, -1.0, 1.0], &mut mono).unwrap();
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);

        assert!(downmix_stereo(&[1.0, 0.0, 0.5], &mut mono).is_err());
    }

    #[test]
    fn test_pcm16_decoding() {
        let mut bytes = [0u8; 4];
        s16_to_bytes(&[16384, -16384], &mut bytes);

        let mut mono = Vec::new();
        pcm16_to_mono(&bytes, &mut mono).unwrap();
        assert_eq!(mono, vec![0.5, -0.5]);

        let mut stereo = Vec::new();
        pcm16_to_stereo(&bytes, &mut stereo).unwrap();
        assert_eq!(stereo, vec![[0.5, 0.5], [-0.5, -0.5]]);

        assert!(pcm16_to_mono(&bytes[..3], &mut mono).is_err());
    }

    #[test]
    fn test_mean_abs_amplitude() {
        assert_eq!(mean_abs_amplitude(&[]), 0.0);
        assert!((mean_abs_amplitude(&[0.5, -0.5, 0.25, -0.25]) - 0.375).abs() < 1e-6);
    }
}
