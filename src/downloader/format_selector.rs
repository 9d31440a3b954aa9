// FormatSelector - budget-constrained variant selection
//
// Walks a VariantSet from the best rendition down and returns the first one
// whose probed size fits the budget. Handles:
// - Declaration order as the quality order (ascending resolution)
// - Manifests that break that order (falls back to resolution order)
// - Probe failures (counted as "does not fit", never fatal)

use super::errors::DownloadError;
use super::models::{Variant, VariantSet};
use super::traits::ContentLengthProbe;

/// Budget-aware variant selector
pub struct FormatSelector;

impl FormatSelector {
    /// Pick the best variant whose size is at most `budget` bytes.
    ///
    /// Returns the variant and its index in `variants`. Each candidate is
    /// probed at most once; when nothing fits, every candidate has been
    /// probed exactly once and `NoFit` is returned.
    pub async fn select_best_fitting(
        variants: &VariantSet,
        budget: u64,
        probe: &dyn ContentLengthProbe,
    ) -> Result<(Variant, usize), DownloadError> {
        if variants.is_empty() {
            return Err(DownloadError::NoVariantsFound);
        }

        for index in Self::scan_order(variants) {
            let Some(candidate) = variants.get(index) else {
                continue;
            };

            match probe.probe(&candidate.url).await {
                Ok(size) if size <= budget => {
                    tracing::info!(
                        "Selected {} ({}) at index {}",
                        candidate,
                        Self::format_size(size),
                        index
                    );
                    return Ok((candidate.clone(), index));
                }
                Ok(size) => {
                    tracing::debug!(
                        "{}p is {}, over budget of {}",
                        candidate.resolution,
                        Self::format_size(size),
                        Self::format_size(budget)
                    );
                }
                Err(e) => {
                    tracing::warn!("Probe failed for {}p, skipping: {}", candidate.resolution, e);
                }
            }
        }

        Err(DownloadError::NoFit { budget })
    }

    /// Indices in the order candidates are tried, best first.
    ///
    /// Declaration order is trusted when resolution is ascending; otherwise
    /// candidates are tried by resolution, highest first, with ties going
    /// to the later declaration.
    pub fn scan_order(variants: &VariantSet) -> Vec<usize> {
        let mut order: Vec<usize> = (0..variants.len()).rev().collect();

        if !variants.is_quality_ascending() {
            tracing::warn!("Manifest variants are not in ascending resolution, reordering");
            let slice = variants.as_slice();
            // stable sort keeps the higher index first among equal resolutions
            order.sort_by(|&a, &b| slice[b].resolution.cmp(&slice[a].resolution));
        }

        order
    }

    /// Format a byte count for display
    pub fn format_size(bytes: u64) -> String {
        let mb = bytes as f64 / 1_000_000.0;
        if mb >= 1.0 {
            format!("{:.2} MB", mb)
        } else {
            format!("{:.0} KB", bytes as f64 / 1000.0)
        }
    }
}
