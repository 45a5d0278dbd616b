use crate::activity_pub::dispatch::Handler;

/// Types we recognise but take no action on.
pub struct PassiveHandler;

impl Handler for PassiveHandler {}
