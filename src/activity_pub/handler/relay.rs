use tracing::debug;

use crate::activity_pub::dispatch::{DispatchRegistry, Handler};
use crate::activity_pub::model::NodeRef;
use crate::error::Result;

/// Wrapping activities (Accept, Reject, Undo, Create, Update, Delete).
///
/// The wrapper itself carries no state; the handler of the embedded object
/// decides what the wrapper means for it.
pub struct RelayHandler;

impl Handler for RelayHandler {
    fn process_incoming_request(&self, dispatch: &DispatchRegistry, wrapper: NodeRef<'_>) -> Result<()> {
        wrapper.check_origin(wrapper.actor_id())?;
        let Some(object) = wrapper.object() else {
            debug!(
                target: "apub",
                id = wrapper.id(),
                kind = %wrapper.activity_type(),
                object = wrapper.object_id(),
                "no embedded object, ignoring"
            );
            return Ok(());
        };
        dispatch.handler_for(object)?.activity(wrapper, object)
    }
}
