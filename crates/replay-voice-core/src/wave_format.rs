//! Wave format descriptor
//!
//! Describes PCM audio layout in the shape of the host's `WAVEFORMATEX`.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Format-kind identifier for `WAVEFORMATEX` described streams (`SPDFID_WaveFormatEx`)
pub const WAVE_FORMAT_EX_ID: Uuid = Uuid::from_u128(0xC31A_DBAE_527F_4FF5_A230_F62B_B61F_F70C);

/// Wave format tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatTag {
    /// Integer PCM (`WAVE_FORMAT_PCM`)
    Pcm,
    /// 32-bit float samples (`WAVE_FORMAT_IEEE_FLOAT`)
    IeeeFloat,
    /// Any other registered tag
    Other(u16),
}

impl FormatTag {
    /// Raw `wFormatTag` value
    #[must_use]
    pub const fn raw(self) -> u16 {
        match self {
            Self::Pcm => 1,
            Self::IeeeFloat => 3,
            Self::Other(tag) => tag,
        }
    }

    /// Decode a raw `wFormatTag` value
    #[must_use]
    pub const fn from_raw(raw: u16) -> Self {
        match raw {
            1 => Self::Pcm,
            3 => Self::IeeeFloat,
            other => Self::Other(other),
        }
    }
}

/// Audio layout descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaveFormat {
    /// Sample encoding
    pub tag: FormatTag,
    /// Number of interleaved channels
    pub channels: u16,
    /// Samples per second per channel
    pub sample_rate: u32,
    /// Bytes per second of audio
    pub avg_bytes_per_sec: u32,
    /// Bytes per sample frame
    pub block_align: u16,
    /// Bits per sample per channel
    pub bits_per_sample: u16,
    /// Size of format-specific trailing data
    pub extra_size: u16,
}

impl WaveFormat {
    /// Size of the packed `WAVEFORMATEX` layout in bytes
    pub const ENCODED_LEN: usize = 18;

    /// The single format this engine produces: 16 kHz, 16-bit, mono PCM
    #[must_use]
    pub const fn canonical() -> Self {
        let block_align = crate::CANONICAL_CHANNELS * crate::CANONICAL_BITS_PER_SAMPLE / 8;
        Self {
            tag: FormatTag::Pcm,
            channels: crate::CANONICAL_CHANNELS,
            sample_rate: crate::CANONICAL_SAMPLE_RATE,
            avg_bytes_per_sec: crate::CANONICAL_SAMPLE_RATE * block_align as u32,
            block_align,
            bits_per_sample: crate::CANONICAL_BITS_PER_SAMPLE,
            extra_size: 0,
        }
    }

    /// Build a PCM descriptor with derived byte rates
    ///
    /// # Errors
    ///
    /// Returns an error if a frame does not fill whole bytes or a derived
    /// field overflows its `WAVEFORMATEX` width
    pub fn pcm(channels: u16, sample_rate: u32, bits_per_sample: u16) -> EngineResult<Self> {
        let frame_bits = u32::from(channels) * u32::from(bits_per_sample);
        if frame_bits % 8 != 0 {
            return Err(EngineError::invalid_input(format!(
                "{channels} channel(s) of {bits_per_sample}-bit samples do not fill whole bytes"
            )));
        }

        let block_align = u16::try_from(frame_bits / 8).map_err(|_| {
            EngineError::invalid_input(format!(
                "Block alignment of {} bytes overflows",
                frame_bits / 8
            ))
        })?;
        let avg_bytes_per_sec = sample_rate.checked_mul(u32::from(block_align)).ok_or_else(|| {
            EngineError::invalid_input(format!(
                "{sample_rate} Hz at {block_align} bytes per frame overflows the byte rate"
            ))
        })?;

        Ok(Self {
            tag: FormatTag::Pcm,
            channels,
            sample_rate,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            extra_size: 0,
        })
    }

    /// Check the derived-field invariants.
    ///
    /// Only PCM carries them; other tags are accepted as-is.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        if self.tag != FormatTag::Pcm {
            return true;
        }
        u32::from(self.block_align) * 8
            == u32::from(self.channels) * u32::from(self.bits_per_sample)
            && u64::from(self.avg_bytes_per_sec)
                == u64::from(self.sample_rate) * u64::from(self.block_align)
    }

    /// Encode as packed little-endian `WAVEFORMATEX`
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..2].copy_from_slice(&self.tag.raw().to_le_bytes());
        out[2..4].copy_from_slice(&self.channels.to_le_bytes());
        out[4..8].copy_from_slice(&self.sample_rate.to_le_bytes());
        out[8..12].copy_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        out[12..14].copy_from_slice(&self.block_align.to_le_bytes());
        out[14..16].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        out[16..18].copy_from_slice(&self.extra_size.to_le_bytes());
        out
    }

    /// Decode a packed little-endian `WAVEFORMATEX`
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 18 bytes are supplied
    pub fn from_le_bytes(bytes: &[u8]) -> EngineResult<Self> {
        if bytes.len() < Self::ENCODED_LEN {
            return Err(EngineError::invalid_input(format!(
                "WAVEFORMATEX needs {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            )));
        }
        let u16_at = |i: usize| u16::from_le_bytes([bytes[i], bytes[i + 1]]);
        let u32_at =
            |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);

        Ok(Self {
            tag: FormatTag::from_raw(u16_at(0)),
            channels: u16_at(2),
            sample_rate: u32_at(4),
            avg_bytes_per_sec: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
            extra_size: u16_at(16),
        })
    }
}

impl Default for WaveFormat {
    fn default() -> Self {
        Self::canonical()
    }
}

impl std::fmt::Display for WaveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wFormatTag={}, nSamplesPerSec={}, nChannels={}, nAvgBytesPerSec={}, nBlockAlign={}, wBitsPerSample={}, cbSize={}",
            self.tag.raw(),
            self.sample_rate,
            self.channels,
            self.avg_bytes_per_sec,
            self.block_align,
            self.bits_per_sample,
            self.extra_size
        )
    }
}
