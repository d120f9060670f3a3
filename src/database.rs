//! Loading precomputed database samples.
//!
//! The offline tool writes one text file per clip. Each non-empty line holds
//! the normalized feature values of one frame, comma separated, optionally
//! followed by the frame index:
//!
//! ```text
//! -0.41,0.03,...,1.92
//! -0.40,0.05,...,1.90,17
//! ```
//!
//! Rows without a frame index are numbered from [`DEFAULT_FIRST_FRAME`]
//! because the first frame of a clip has no predecessor to difference
//! velocities against.

use crate::error::{MatchingError, Result};
use crate::kdtree::{KdTree, Sample};

/// Frame number of the first row when rows carry no frame index.
pub const DEFAULT_FIRST_FRAME: usize = 1;

/// Parse one clip's sample rows, numbering frames from [`DEFAULT_FIRST_FRAME`].
///
/// # Errors
///
/// Returns [`MatchingError::MalformedSamples`] for a row with the wrong
/// number of values, an unparsable or non-finite value, or an invalid frame
/// index.
pub fn parse_sample_rows(text: &str, clip: usize, dim: usize) -> Result<Vec<Sample>> {
    parse_sample_rows_from(text, clip, dim, DEFAULT_FIRST_FRAME)
}

/// Parse one clip's sample rows, numbering implicit frames from `first_frame`.
///
/// # Errors
///
/// Same as [`parse_sample_rows`].
pub fn parse_sample_rows_from(
    text: &str,
    clip: usize,
    dim: usize,
    first_frame: usize,
) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for (row, line) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
        let mut values = line
            .split(',')
            .map(|field| {
                let field = field.trim();
                match field.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    Ok(_) => Err(MatchingError::malformed_samples(
                        clip,
                        row,
                        format!("non-finite value '{field}'"),
                    )),
                    Err(e) => Err(MatchingError::malformed_samples(clip, row, format!("'{field}': {e}"))),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let frame = if values.len() == dim {
            first_frame + row
        } else if values.len() == dim + 1 {
            let raw = values.pop().unwrap_or_default();
            frame_index(raw).ok_or_else(|| {
                MatchingError::malformed_samples(clip, row, format!("invalid frame index {raw}"))
            })?
        } else {
            return Err(MatchingError::malformed_samples(
                clip,
                row,
                format!("expected {dim} or {} values, got {}", dim + 1, values.len()),
            ));
        };

        samples.push(Sample::new(values, clip, frame));
    }

    log::debug!("Parsed {} samples for clip {clip}", samples.len());
    Ok(samples)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn frame_index(raw: f64) -> Option<usize> {
    (raw >= 0.0 && raw.fract() == 0.0 && raw <= f64::from(u32::MAX)).then(|| raw as usize)
}

/// Build a KD-tree from per-clip sample files; clip ids follow the order of
/// `clips`.
///
/// # Errors
///
/// Returns any parse error of [`parse_sample_rows`].
pub fn build_index<'a>(dim: usize, clips: impl IntoIterator<Item = &'a str>) -> Result<KdTree> {
    let mut index = KdTree::new(dim);
    for (clip, text) in clips.into_iter().enumerate() {
        index.extend(parse_sample_rows(text, clip, dim)?)?;
    }
    log::info!("Loaded {} database samples", index.len());
    index.build()?;
    Ok(index)
}
