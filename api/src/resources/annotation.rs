use serde::{Deserialize, Serialize};

use super::object_id;

object_id!(
    /// Server id of a `TagAnnotation`.
    TagId,
    "TagAnnotation"
);

object_id!(
    /// Server id of a `MapAnnotation`.
    MapAnnotationId,
    "MapAnnotation"
);

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MapAnnotation {
    pub id: MapAnnotationId,
    pub namespace: Option<String>,
    pub pairs: Vec<(String, String)>,
}

/// A map annotation to create. The namespace is passed to the server verbatim: it may be
/// absent, a URI, or any other string (including a malformed URI).
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct NewMapAnnotation<'request> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'request str>,

    /// Key/value pairs, kept in order.
    pub pairs: &'request [(&'request str, &'request str)],
}
