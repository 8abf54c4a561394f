use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

use super::{
    annotation::{MapAnnotationId, TagId},
    dataset::DatasetId,
    image::ImageId,
    object_id,
    project::ProjectId,
    ObjectId,
};

object_id!(
    /// Server id of any link object. The kind is carried by [`Link`].
    LinkId,
    "Link"
);

/// An object that annotations can be attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationTarget {
    Project(ProjectId),
    Dataset(DatasetId),
    Image(ImageId),
}

impl AnnotationTarget {
    /// Name of the link class for this kind of parent, e.g. `DatasetAnnotationLink`.
    pub fn link_kind(&self) -> &'static str {
        match self {
            AnnotationTarget::Project(_) => "ProjectAnnotationLink",
            AnnotationTarget::Dataset(_) => "DatasetAnnotationLink",
            AnnotationTarget::Image(_) => "ImageAnnotationLink",
        }
    }

    pub fn reference(&self) -> String {
        match self {
            AnnotationTarget::Project(id) => id.reference(),
            AnnotationTarget::Dataset(id) => id.reference(),
            AnnotationTarget::Image(id) => id.reference(),
        }
    }
}

impl From<ProjectId> for AnnotationTarget {
    fn from(id: ProjectId) -> Self {
        AnnotationTarget::Project(id)
    }
}

impl From<DatasetId> for AnnotationTarget {
    fn from(id: DatasetId) -> Self {
        AnnotationTarget::Dataset(id)
    }
}

impl From<ImageId> for AnnotationTarget {
    fn from(id: ImageId) -> Self {
        AnnotationTarget::Image(id)
    }
}

/// An annotation that can be linked to an [`AnnotationTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationRef {
    Tag(TagId),
    Map(MapAnnotationId),
}

impl AnnotationRef {
    pub fn reference(&self) -> String {
        match self {
            AnnotationRef::Tag(id) => id.reference(),
            AnnotationRef::Map(id) => id.reference(),
        }
    }
}

impl From<TagId> for AnnotationRef {
    fn from(id: TagId) -> Self {
        AnnotationRef::Tag(id)
    }
}

impl From<MapAnnotationId> for AnnotationRef {
    fn from(id: MapAnnotationId) -> Self {
        AnnotationRef::Map(id)
    }
}

/// A created parent→child link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub kind: &'static str,
    pub id: LinkId,
    pub parent: String,
    pub child: String,
}

impl Display for Link {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            formatter,
            "{}:{} ({} -> {})",
            self.kind, self.id.0, self.parent, self.child
        )
    }
}
