use minicbor::{Decode, Encode};

/// Transport level routing category of a delivery target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
#[cbor(index_only)]
pub enum DeliveryQueue {
    #[n(0)]
    Inbox,
    #[n(1)]
    SharedInbox,
}

/// Delivery ordering tier. Lower ranks drain first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
#[cbor(index_only)]
pub enum Priority {
    #[n(0)]
    Top,
    #[n(1)]
    High,
    #[n(2)]
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::Top => 0,
            Priority::High => 1,
            Priority::Low => 2,
        }
    }
}

/// Where and how urgently an outbound activity should be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Encode, Decode)]
pub struct InstancePath {
    #[n(0)]
    url: String,
    #[n(1)]
    queue: DeliveryQueue,
    #[n(2)]
    priority: Priority,
}

impl InstancePath {
    pub fn new(url: impl Into<String>, queue: DeliveryQueue, priority: Priority) -> InstancePath {
        InstancePath {
            url: url.into(),
            queue,
            priority,
        }
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn queue(&self) -> DeliveryQueue {
        self.queue
    }
    pub fn priority(&self) -> Priority {
        self.priority
    }
}
