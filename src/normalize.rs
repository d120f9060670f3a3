//! Z-score normalization with offline feature statistics.
//!
//! Statistics are computed offline over the whole library and loaded once.
//! Every sample in the index is already normalized with them, so each
//! query has to be normalized the same way before searching.
//!
//! # Text format
//!
//! ```text
//! Means:
//! 0.01,0.32,...
//! Std_Devs:
//! 0.12,0.05,...
//! Max X and Z velocity:
//! 4.92,6.02
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MatchingError, Result};
use crate::feature::FeatureVector;

/// Per-feature mean and standard deviation plus planar speed bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct NormalizationStats {
    means: Vec<f64>,
    std_devs: Vec<f64>,
    max_planar_velocity: [f64; 2],
}

impl NormalizationStats {
    /// Create statistics for `dim` features.
    ///
    /// # Errors
    ///
    /// Returns an error if either vector's length differs from `dim`, if any
    /// value is not finite, or if any standard deviation is zero.
    pub fn new(
        means: Vec<f64>,
        std_devs: Vec<f64>,
        max_planar_velocity: [f64; 2],
        dim: usize,
    ) -> Result<Self> {
        let stats = Self {
            means,
            std_devs,
            max_planar_velocity,
        };
        stats.validate(dim)?;
        Ok(stats)
    }

    /// Parse the offline tool's text format.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::MalformedStats`] when a header or value line
    /// is missing or unparsable, and any error of [`NormalizationStats::new`].
    pub fn parse(text: &str, dim: usize) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).enumerate();

        let (line, header) = next_record_line(&mut lines, "means header")?;
        expect_header(line, header, "Means:")?;
        let (line, values) = next_record_line(&mut lines, "means")?;
        let means = parse_values(line, values)?;

        let (line, header) = next_record_line(&mut lines, "std dev header")?;
        expect_header(line, header, "Std_Devs:")?;
        let (line, values) = next_record_line(&mut lines, "std devs")?;
        let std_devs = parse_values(line, values)?;

        let (line, header) = next_record_line(&mut lines, "max velocity header")?;
        expect_header(line, header, "Max X")?;
        let (line, values) = next_record_line(&mut lines, "max velocities")?;
        let max = parse_values(line, values)?;
        if max.len() != 2 {
            return Err(MatchingError::malformed_stats(
                line,
                format!("expected 2 max velocities, got {}", max.len()),
            ));
        }

        let stats = Self::new(means, std_devs, [max[0], max[1]], dim)?;
        log::info!("Loaded normalization statistics for {dim} features");
        Ok(stats)
    }

    /// Decode the JSON record `{ "means", "stdDevs", "maxPlanarVelocity" }`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::Json`] on a decoding failure and any error of
    /// [`NormalizationStats::new`].
    #[cfg(feature = "serde")]
    pub fn from_json(text: &str, dim: usize) -> Result<Self> {
        let stats: Self = serde_json::from_str(text)?;
        stats.validate(dim)?;
        log::info!("Loaded normalization statistics for {dim} features");
        Ok(stats)
    }

    fn validate(&self, dim: usize) -> Result<()> {
        if self.means.len() != dim {
            return Err(MatchingError::dimension_mismatch("means", dim, self.means.len()));
        }
        if self.std_devs.len() != dim {
            return Err(MatchingError::dimension_mismatch(
                "std_devs",
                dim,
                self.std_devs.len(),
            ));
        }
        if let Some(index) = self.means.iter().position(|m| !m.is_finite()) {
            return Err(MatchingError::NonFiniteStat {
                field: "means",
                index,
            });
        }
        if let Some(index) = self.std_devs.iter().position(|s| !s.is_finite()) {
            return Err(MatchingError::NonFiniteStat {
                field: "std_devs",
                index,
            });
        }
        if let Some(index) = self.std_devs.iter().position(|&s| s == 0.0) {
            return Err(MatchingError::ZeroVariance { index });
        }
        if let Some(index) = self.max_planar_velocity.iter().position(|v| !v.is_finite()) {
            return Err(MatchingError::NonFiniteStat {
                field: "max_planar_velocity",
                index,
            });
        }
        Ok(())
    }

    /// Number of features covered.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.means.len()
    }

    /// Per-feature means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-feature standard deviations.
    #[must_use]
    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }

    /// Largest planar speeds `[x, z]` seen in the library.
    #[must_use]
    pub const fn max_planar_velocity(&self) -> [f64; 2] {
        self.max_planar_velocity
    }

    /// Scale a raw feature vector: `(raw - mean) / std_dev`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::DimensionMismatch`] if `raw` has the wrong length.
    pub fn normalize(&self, raw: &FeatureVector) -> Result<FeatureVector> {
        self.check_len(raw)?;
        Ok(raw
            .as_slice()
            .iter()
            .zip(&self.means)
            .zip(&self.std_devs)
            .map(|((x, mean), std)| (x - mean) / std)
            .collect::<Vec<_>>()
            .into())
    }

    /// Undo [`NormalizationStats::normalize`].
    ///
    /// # Errors
    ///
    /// Returns [`MatchingError::DimensionMismatch`] if `normalized` has the
    /// wrong length.
    pub fn denormalize(&self, normalized: &FeatureVector) -> Result<FeatureVector> {
        self.check_len(normalized)?;
        Ok(normalized
            .as_slice()
            .iter()
            .zip(&self.means)
            .zip(&self.std_devs)
            .map(|((z, mean), std)| z * std + mean)
            .collect::<Vec<_>>()
            .into())
    }

    fn check_len(&self, v: &FeatureVector) -> Result<()> {
        if v.len() == self.dim() {
            Ok(())
        } else {
            Err(MatchingError::dimension_mismatch("normalize", self.dim(), v.len()))
        }
    }
}

fn next_record_line<'a>(
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
    expect: &str,
) -> Result<(usize, &'a str)> {
    lines
        .next()
        .ok_or_else(|| MatchingError::malformed_stats(0, format!("missing {expect}")))
}

fn expect_header(line: usize, text: &str, prefix: &str) -> Result<()> {
    if text.starts_with(prefix) {
        Ok(())
    } else {
        Err(MatchingError::malformed_stats(
            line,
            format!("expected line starting with '{prefix}'"),
        ))
    }
}

fn parse_values(line: usize, text: &str) -> Result<Vec<f64>> {
    text.split(',')
        .map(|field| {
            field.trim().parse::<f64>().map_err(|e| {
                MatchingError::malformed_stats(line, format!("'{}': {e}", field.trim()))
            })
        })
        .collect()
}
