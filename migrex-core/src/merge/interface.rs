//! Interface shaping ahead of the replace-all write.

use std::collections::HashSet;

use migrex_model::{Endpoint, InterfaceKind, InterfaceSpec};

use crate::merge::text;

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTOR_CHARS: usize = 512;

/// Interface candidate still carrying its raw descriptor list.
#[derive(Debug, Clone)]
pub struct InterfaceDraft {
    pub kind: InterfaceKind,
    pub name: String,
    /// Raw descriptors (JDBC URLs, link definitions); joined distinct into
    /// the persisted descriptor column.
    pub descriptors: Vec<String>,
    pub endpoints: Vec<Endpoint>,
}

impl InterfaceDraft {
    pub fn finalize(self) -> InterfaceSpec {
        InterfaceSpec {
            kind: self.kind,
            name: text::clamp(self.name.trim(), MAX_NAME_CHARS),
            full_descriptor: text::distinct_join(&self.descriptors, MAX_DESCRIPTOR_CHARS),
            endpoints: self.endpoints,
        }
    }
}

/// Finalizes a batch, dropping drafts whose descriptor another draft in the
/// batch already carries. Interface rows are replaced wholesale on every
/// scan, so dedup only has to look within the batch.
pub fn finalize_interfaces(drafts: Vec<InterfaceDraft>) -> Vec<InterfaceSpec> {
    let mut seen = HashSet::new();
    let mut specs = Vec::new();
    for draft in drafts {
        let spec = draft.finalize();
        if seen.insert(spec.full_descriptor.clone()) {
            specs.push(spec);
        }
    }
    specs
}
