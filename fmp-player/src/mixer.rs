//! Mixer capability
//!
//! Volume is always expressed on the mixer's own 0-100 *requested* scale.
//! Mapping that onto a hardware range is the mixer's business.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{Error, Result};

/// Volume/mute endpoint
///
/// Errors are transient (device busy, endpoint gone) and never fatal; callers
/// drop the requested change.
#[async_trait]
pub trait MixerCapability: Send + Sync {
    /// Requested volume, 0-100
    async fn volume(&self) -> Result<u8>;

    async fn set_volume(&self, volume: u8) -> Result<()>;

    async fn mute(&self) -> Result<bool>;

    async fn set_mute(&self, mute: bool) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
struct MixerLevels {
    requested: u8,
    raw: u8,
    muted: bool,
}

/// Software mixer with a configurable output range
///
/// A requested volume `v` maps to the raw level
/// `round(v * (max - min) / 100 + min)`, so a small speaker can be kept in a
/// usable band without producers knowing about it.
pub struct SoftwareMixer {
    min_volume: u8,
    max_volume: u8,
    levels: Mutex<MixerLevels>,
}

impl SoftwareMixer {
    pub fn new(min_volume: u8, max_volume: u8) -> Result<Self> {
        if min_volume > max_volume || max_volume > 100 {
            return Err(Error::Config(format!(
                "invalid mixer range {}..={}",
                min_volume, max_volume
            )));
        }
        Ok(Self {
            min_volume,
            max_volume,
            levels: Mutex::new(MixerLevels {
                requested: 100,
                raw: max_volume,
                muted: false,
            }),
        })
    }

    /// Raw output level the requested volume maps to
    pub fn scale(&self, requested: u8) -> u8 {
        let span = f64::from(self.max_volume - self.min_volume);
        (f64::from(requested) * span / 100.0 + f64::from(self.min_volume)).round() as u8
    }

    /// Raw level currently applied (ignores mute)
    pub async fn raw_volume(&self) -> u8 {
        self.levels.lock().await.raw
    }
}

impl Default for SoftwareMixer {
    fn default() -> Self {
        Self {
            min_volume: 0,
            max_volume: 100,
            levels: Mutex::new(MixerLevels {
                requested: 100,
                raw: 100,
                muted: false,
            }),
        }
    }
}

#[async_trait]
impl MixerCapability for SoftwareMixer {
    async fn volume(&self) -> Result<u8> {
        Ok(self.levels.lock().await.requested)
    }

    async fn set_volume(&self, volume: u8) -> Result<()> {
        if volume > 100 {
            return Err(Error::Mixer(format!("{} is not a valid volume level", volume)));
        }
        let raw = self.scale(volume);
        let mut levels = self.levels.lock().await;
        levels.requested = volume;
        levels.raw = raw;
        debug!("Actual volume level: {}", raw);
        Ok(())
    }

    async fn mute(&self) -> Result<bool> {
        Ok(self.levels.lock().await.muted)
    }

    async fn set_mute(&self, mute: bool) -> Result<()> {
        self.levels.lock().await.muted = mute;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_full_range_is_identity() {
        let mixer = SoftwareMixer::default();
        mixer.set_volume(65).await.unwrap();
        assert_eq!(mixer.volume().await.unwrap(), 65);
        assert_eq!(mixer.raw_volume().await, 65);
    }

    #[tokio::test]
    async fn test_scaled_range() {
        let mixer = SoftwareMixer::new(40, 90).unwrap();
        assert_eq!(mixer.scale(0), 40);
        assert_eq!(mixer.scale(100), 90);
        assert_eq!(mixer.scale(50), 65);
        assert_eq!(mixer.scale(33), 57); // 16.5 + 40 rounds up

        mixer.set_volume(50).await.unwrap();
        // Requested scale is what callers see
        assert_eq!(mixer.volume().await.unwrap(), 50);
        assert_eq!(mixer.raw_volume().await, 65);
    }

    #[tokio::test]
    async fn test_rejects_out_of_range() {
        let mixer = SoftwareMixer::default();
        mixer.set_volume(30).await.unwrap();
        assert!(matches!(mixer.set_volume(101).await, Err(Error::Mixer(_))));
        assert_eq!(mixer.volume().await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_mute_keeps_raw_level() {
        let mixer = SoftwareMixer::default();
        mixer.set_volume(50).await.unwrap();

        mixer.set_mute(true).await.unwrap();
        assert!(mixer.mute().await.unwrap());
        assert_eq!(mixer.raw_volume().await, 50);

        mixer.set_mute(false).await.unwrap();
        assert!(!mixer.mute().await.unwrap());
        assert_eq!(mixer.volume().await.unwrap(), 50);
    }

    #[test]
    fn test_invalid_range() {
        assert!(SoftwareMixer::new(60, 50).is_err());
        assert!(SoftwareMixer::new(0, 101).is_err());
    }
}
