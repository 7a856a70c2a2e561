use crate::block::BlockInstance;
use crate::flow::FlowController;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct SubPageInstance {
    pub name: String,
    pub blocks: Vec<BlockInstance>,
}

/// A mounted page. Dropping it (or calling [`PageInstance::unmount`]) tears down
/// every block, ends the flow, and cancels pending waits.
#[derive(Debug)]
pub struct PageInstance {
    name: String,
    blocks: Vec<BlockInstance>,
    subpages: Vec<SubPageInstance>,
    flow: Option<Arc<FlowController>>,
    scope: CancellationToken,
}

impl PageInstance {
    pub(crate) fn new(
        name: String,
        blocks: Vec<BlockInstance>,
        subpages: Vec<SubPageInstance>,
        flow: Option<Arc<FlowController>>,
        scope: CancellationToken,
    ) -> Self {
        Self {
            name,
            blocks,
            subpages,
            flow,
            scope,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks placed directly on the page.
    pub fn blocks(&self) -> &[BlockInstance] {
        &self.blocks
    }

    pub fn subpages(&self) -> &[SubPageInstance] {
        &self.subpages
    }

    pub fn flow(&self) -> Option<&Arc<FlowController>> {
        self.flow.as_ref()
    }

    /// The subpage the flow is showing, if this is an active flow page.
    pub fn current_subpage(&self) -> Option<&SubPageInstance> {
        let index = self.flow.as_ref()?.current_index()?;
        self.subpages.get(index)
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for PageInstance {
    fn drop(&mut self) {
        for block in self.blocks.iter().chain(self.subpages.iter().flat_map(|s| &s.blocks)) {
            block.teardown();
        }
        if let Some(flow) = &self.flow {
            flow.terminate();
        }
        self.scope.cancel();
        tracing::debug!(page = %self.name, "Page unmounted");
    }
}
