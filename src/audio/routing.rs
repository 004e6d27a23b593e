// Ownership wrapper around engine nodes. Each wrapped node remembers which
// other wrapped nodes feed it, so a whole chain can be torn down starting
// from any node in it (usually the one closest to the output).
//
// Inputs are only walked for teardown; they never take part in rendering.
// The graph must stay acyclic. That is on the caller, nothing checks it.

use super::backend::{AudioBackend, NodeKind, Sink};
use super::ids::NodeHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    Node(NodeId),
    Output,
}

#[derive(Debug)]
struct RoutingNode {
    handle: NodeHandle,
    inputs: Vec<NodeId>,
    outputs: Vec<Destination>,
}

#[derive(Debug, Default)]
pub struct RoutingGraph {
    nodes: Vec<Option<RoutingNode>>, // slab, freed slots are reused
    free: Vec<usize>,
}

impl RoutingGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine node and wraps it.
    pub fn create<B: AudioBackend>(&mut self, backend: &mut B, kind: NodeKind) -> NodeId {
        let handle = backend.create_node(kind);
        self.add(handle)
    }

    pub fn add(&mut self, handle: NodeHandle) -> NodeId {
        let node = RoutingNode { handle, inputs: Vec::new(), outputs: Vec::new() };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    pub fn handle(&self, id: NodeId) -> Option<NodeHandle> {
        self.node(id).map(|n| n.handle)
    }

    pub fn inputs(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.inputs.as_slice()).unwrap_or(&[])
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| !n.outputs.is_empty())
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node(&self, id: NodeId) -> Option<&RoutingNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut RoutingNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// One-way connection `from -> to`. The destination records `from` as
    /// one of its inputs. A node may feed several destinations.
    pub fn connect_to<B: AudioBackend>(&mut self, backend: &mut B, from: NodeId, to: Destination) {
        let Some(from_handle) = self.handle(from) else {
            log::warn!(target: "audio::routing", "connect from unknown node {:?}", from);
            return;
        };
        let sink = match to {
            Destination::Output => Sink::Output,
            Destination::Node(dest) => match self.node_mut(dest) {
                Some(d) => {
                    d.inputs.push(from);
                    Sink::Node(d.handle)
                }
                None => {
                    log::warn!(target: "audio::routing", "connect to unknown node {:?}", dest);
                    return;
                }
            },
        };
        backend.connect(from_handle, sink);
        if let Some(n) = self.node_mut(from) {
            n.outputs.push(to);
        }
    }

    /// Depth-first: disconnects everything upstream of `id`, then `id`'s own
    /// outputs. Calling it again on a disconnected node does nothing.
    pub fn disconnect_all<B: AudioBackend>(&mut self, backend: &mut B, id: NodeId) {
        let Some(node) = self.node_mut(id) else { return };
        let inputs = std::mem::take(&mut node.inputs);
        for input in inputs {
            self.disconnect_all(backend, input);
        }
        let Some(node) = self.node_mut(id) else { return };
        if node.outputs.is_empty() {
            return;
        }
        let outputs = std::mem::take(&mut node.outputs);
        let handle = node.handle;
        backend.disconnect(handle);
        // edges are gone; forget them on the downstream side too
        for dest in outputs {
            if let Destination::Node(d) = dest {
                if let Some(d) = self.node_mut(d) {
                    d.inputs.retain(|i| *i != id);
                }
            }
        }
    }

    /// Tears down everything upstream of `id`, then releases those nodes and
    /// `id` itself on the engine side.
    pub fn remove<B: AudioBackend>(&mut self, backend: &mut B, id: NodeId) {
        let mut chain = Vec::new();
        self.collect_upstream(id, &mut chain);
        self.disconnect_all(backend, id);
        for n in chain {
            if let Some(node) = self.nodes.get_mut(n.0).and_then(Option::take) {
                backend.release_node(node.handle);
                self.free.push(n.0);
            }
        }
    }

    fn collect_upstream(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if out.contains(&id) {
            return;
        }
        out.push(id);
        for input in self.inputs(id) {
            self.collect_upstream(*input, out);
        }
    }
}
