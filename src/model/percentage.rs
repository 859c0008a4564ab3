use snafu::Snafu;

use super::*;

/// A reported completion percentage, always finite and within `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Percentage(f64);

impl Percentage {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 100.0;

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Percentage {
    type Error = ParsePercentage;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            return NotFiniteSnafu { value }.fail();
        }

        if !(Self::MIN..=Self::MAX).contains(&value) {
            return OutOfRangeSnafu { value }.fail();
        }

        Ok(Percentage(value))
    }
}

impl<'de> Deserialize<'de> for Percentage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Percentage::try_from(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Snafu)]
pub enum ParsePercentage {
    #[snafu(display("completion percentage must be a finite number, got {value}"))]
    NotFinite { value: f64 },

    #[snafu(display("completion percentage must be between 0 and 100, got {value}"))]
    OutOfRange { value: f64 },
}
