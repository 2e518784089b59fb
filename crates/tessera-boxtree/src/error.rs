//! Errors raised while building a box tree.

use tessera_dom::{NodeId, TextError};
use thiserror::Error;

/// A fatal box-construction failure.
///
/// Malformed styles never end up here: they degrade with a warning. These
/// variants mean the content tree and its text index disagree, so no box tree
/// can be trusted.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Extracting the text of a node failed.
    #[error("cannot extract text of node {node}")]
    Text {
        /// The node whose text was requested.
        node: NodeId,
        /// What went wrong in the text index.
        #[source]
        source: TextError,
    },
    /// A node has no range in the text index (it was not attached when the
    /// index was built).
    #[error("node {0} is missing from the document text index")]
    MissingNode(NodeId),
    /// Build options could not be parsed.
    #[error("invalid build options")]
    Options(#[from] serde_json::Error),
}
