//! Keynote Show Structure
//!
//! The document root points at the show, whose slide tree lists the slide
//! nodes in presentation order. That order is the canonical slide ordinal.

use crate::iwa::Result;
use crate::iwa::archive::ArchiveId;
use crate::iwa::ref_graph::ObjectGraph;
use crate::iwa::typed::{DocumentArchive, ShowArchive, SlideNodeArchive};

/// The show of a decoded document graph
#[derive(Debug, Clone, Copy)]
pub struct KeynoteShow<'a> {
    graph: &'a ObjectGraph,
    show: &'a ShowArchive,
}

/// One slide-tree position and the node found there
#[derive(Debug)]
pub struct SlideNodeEntry<'a> {
    /// Position in the slide tree, from 0
    pub ordinal: usize,
    pub node_id: ArchiveId,
    /// The node, or why it could not be resolved
    pub node: Result<&'a SlideNodeArchive>,
}

impl<'a> KeynoteShow<'a> {
    /// Follow the document root to its show
    pub fn from_graph(graph: &'a ObjectGraph) -> Result<Self> {
        let (_, document) = graph.find_first::<DocumentArchive>()?;
        let show = graph.next_object_of_type::<ShowArchive>(document.show)?;
        Ok(Self { graph, show })
    }

    pub fn show(&self) -> &'a ShowArchive {
        self.show
    }

    /// Number of entries in the slide tree, resolvable or not
    pub fn slide_count(&self) -> usize {
        self.show.slide_tree.slides.len()
    }

    /// Slide nodes in tree order
    pub fn slide_nodes(&self) -> impl Iterator<Item = SlideNodeEntry<'a>> + 'a {
        let graph = self.graph;
        self.show
            .slide_tree
            .slides
            .iter()
            .enumerate()
            .map(move |(ordinal, &node_id)| SlideNodeEntry {
                ordinal,
                node_id,
                node: graph.next_object_of_type::<SlideNodeArchive>(node_id),
            })
    }
}
