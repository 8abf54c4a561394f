use serde::{Deserialize, Serialize};

use super::object_id;

object_id!(
    /// Server id of a `Dataset`.
    DatasetId,
    "Dataset"
);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Dataset {
    pub id: DatasetId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct NewDataset<'request> {
    pub name: &'request str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'request str>,
}
