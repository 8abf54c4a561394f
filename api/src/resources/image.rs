use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{dataset::DatasetId, object_id};

object_id!(
    /// Server id of an `Image`.
    ImageId,
    "Image"
);

/// The images created by importing a single file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Import {
    pub path: String,
    pub dataset: DatasetId,
    pub images: Vec<ImageId>,
}

static RX_IMPORTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Image:(\d+(?:,\d+)*)\s*$").expect("regex is well-formed"));

/// Collects the image ids printed by `omero import`. A multi-series file prints several
/// comma separated ids on one line.
pub(crate) fn parse_imported(stdout: &str) -> Vec<ImageId> {
    RX_IMPORTED
        .captures_iter(stdout)
        .flat_map(|captures| {
            captures[1]
                .split(',')
                .filter_map(|id| id.parse().ok())
                .map(ImageId)
                .collect::<Vec<_>>()
        })
        .collect()
}
