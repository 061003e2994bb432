//! Document handle
//!
//! The analyzer never touches PDF objects directly. It asks a
//! [`DocumentSource`] for page geometry, page annotations and the global
//! named-destination table. [`LopdfSource`] is the production
//! implementation; tests can supply their own.

mod content;
mod fonts;
mod lopdf_source;
mod tables;

pub use lopdf_source::LopdfSource;

use crate::error::Result;
use crate::geometry::PageGeometry;
use serde::{Deserialize, Serialize};

/// Read access to a parsed document
pub trait DocumentSource {
    fn page_count(&self) -> u32;

    /// Geometry of a 1-based page
    fn page_geometry(&self, page: u32) -> Result<PageGeometry>;

    /// Annotations of a 1-based page, in `/Annots` order
    fn page_annotations(&self, page: u32) -> Result<Vec<Annotation>>;

    /// The document-level named destination table
    fn named_destinations(&self) -> Result<Vec<(String, ResolvedTarget)>>;
}

/// Where a named destination points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    /// 1-based page, when the destination array names a known page
    pub page: Option<u32>,
}

/// One entry of a page's annotation list
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// `/Subtype` without the leading slash, e.g. `Link`
    pub subtype: String,
    /// Link target, when the annotation carries one
    pub target: Option<LinkTarget>,
}

impl Annotation {
    pub fn link(target: LinkTarget) -> Self {
        Self {
            subtype: "Link".to_string(),
            target: Some(target),
        }
    }

    pub fn is_link(&self) -> bool {
        self.subtype == "Link"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    Internal(Destination),
    External(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Destination {
    /// Lookup by name in the destination table
    Named(String),
    /// Direct page/position reference, e.g. `[page /XYZ left top zoom]`
    Explicit,
}
