//! Typed variants of the Activity Streams vocabulary we federate with.

use std::fmt::Display;

use jiff::Timestamp;

use super::raw::RawObject;

/// Every protocol type tag this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActivityType {
    Accept,
    Add,
    Block,
    Create,
    Delete,
    Document,
    Follow,
    Image,
    Like,
    Note,
    Notification,
    Person,
    Reject,
    Remove,
    Tombstone,
    Undo,
    Update,
}

impl ActivityType {
    pub const ALL: [ActivityType; 17] = [
        ActivityType::Accept,
        ActivityType::Add,
        ActivityType::Block,
        ActivityType::Create,
        ActivityType::Delete,
        ActivityType::Document,
        ActivityType::Follow,
        ActivityType::Image,
        ActivityType::Like,
        ActivityType::Note,
        ActivityType::Notification,
        ActivityType::Person,
        ActivityType::Reject,
        ActivityType::Remove,
        ActivityType::Tombstone,
        ActivityType::Undo,
        ActivityType::Update,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActivityType::Accept => "Accept",
            ActivityType::Add => "Add",
            ActivityType::Block => "Block",
            ActivityType::Create => "Create",
            ActivityType::Delete => "Delete",
            ActivityType::Document => "Document",
            ActivityType::Follow => "Follow",
            ActivityType::Image => "Image",
            ActivityType::Like => "Like",
            ActivityType::Note => "Note",
            ActivityType::Notification => "SocialAppNotification",
            ActivityType::Person => "Person",
            ActivityType::Reject => "Reject",
            ActivityType::Remove => "Remove",
            ActivityType::Tombstone => "Tombstone",
            ActivityType::Undo => "Undo",
            ActivityType::Update => "Update",
        }
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type specific payload of a decoded node.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityKind {
    Accept(Activity),
    Add(Activity),
    Block(Activity),
    Create(Activity),
    Delete(Activity),
    Document(Document),
    Follow(Activity),
    Image(Document),
    Like(Activity),
    Note(Note),
    Notification(Notification),
    Person(Person),
    Reject(Activity),
    Remove(Activity),
    Tombstone(Tombstone),
    Undo(Activity),
    Update(Activity),
}

impl ActivityKind {
    pub fn empty(ty: ActivityType) -> ActivityKind {
        match ty {
            ActivityType::Accept => ActivityKind::Accept(Activity::default()),
            ActivityType::Add => ActivityKind::Add(Activity::default()),
            ActivityType::Block => ActivityKind::Block(Activity::default()),
            ActivityType::Create => ActivityKind::Create(Activity::default()),
            ActivityType::Delete => ActivityKind::Delete(Activity::default()),
            ActivityType::Document => ActivityKind::Document(Document::default()),
            ActivityType::Follow => ActivityKind::Follow(Activity::default()),
            ActivityType::Image => ActivityKind::Image(Document::default()),
            ActivityType::Like => ActivityKind::Like(Activity::default()),
            ActivityType::Note => ActivityKind::Note(Note::default()),
            ActivityType::Notification => ActivityKind::Notification(Notification::default()),
            ActivityType::Person => ActivityKind::Person(Person::default()),
            ActivityType::Reject => ActivityKind::Reject(Activity::default()),
            ActivityType::Remove => ActivityKind::Remove(Activity::default()),
            ActivityType::Tombstone => ActivityKind::Tombstone(Tombstone::default()),
            ActivityType::Undo => ActivityKind::Undo(Activity::default()),
            ActivityType::Update => ActivityKind::Update(Activity::default()),
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        match self {
            ActivityKind::Accept(_) => ActivityType::Accept,
            ActivityKind::Add(_) => ActivityType::Add,
            ActivityKind::Block(_) => ActivityType::Block,
            ActivityKind::Create(_) => ActivityType::Create,
            ActivityKind::Delete(_) => ActivityType::Delete,
            ActivityKind::Document(_) => ActivityType::Document,
            ActivityKind::Follow(_) => ActivityType::Follow,
            ActivityKind::Image(_) => ActivityType::Image,
            ActivityKind::Like(_) => ActivityType::Like,
            ActivityKind::Note(_) => ActivityType::Note,
            ActivityKind::Notification(_) => ActivityType::Notification,
            ActivityKind::Person(_) => ActivityType::Person,
            ActivityKind::Reject(_) => ActivityType::Reject,
            ActivityKind::Remove(_) => ActivityType::Remove,
            ActivityKind::Tombstone(_) => ActivityType::Tombstone,
            ActivityKind::Undo(_) => ActivityType::Undo,
            ActivityKind::Update(_) => ActivityType::Update,
        }
    }

    /// The activity payload, for variants describing an action.
    pub fn as_activity(&self) -> Option<&Activity> {
        match self {
            ActivityKind::Accept(a)
            | ActivityKind::Add(a)
            | ActivityKind::Block(a)
            | ActivityKind::Create(a)
            | ActivityKind::Delete(a)
            | ActivityKind::Follow(a)
            | ActivityKind::Like(a)
            | ActivityKind::Reject(a)
            | ActivityKind::Remove(a)
            | ActivityKind::Undo(a)
            | ActivityKind::Update(a) => Some(a),
            _ => None,
        }
    }

    pub(crate) fn as_activity_mut(&mut self) -> Option<&mut Activity> {
        match self {
            ActivityKind::Accept(a)
            | ActivityKind::Add(a)
            | ActivityKind::Block(a)
            | ActivityKind::Create(a)
            | ActivityKind::Delete(a)
            | ActivityKind::Follow(a)
            | ActivityKind::Like(a)
            | ActivityKind::Reject(a)
            | ActivityKind::Remove(a)
            | ActivityKind::Undo(a)
            | ActivityKind::Update(a) => Some(a),
            _ => None,
        }
    }

    /// Populate the payload from the keys this variant consumes. Unknown keys
    /// are ignored.
    pub(crate) fn import(&mut self, raw: &RawObject<'_>) {
        match self {
            ActivityKind::Document(d) | ActivityKind::Image(d) => d.import(raw),
            ActivityKind::Note(n) => n.import(raw),
            ActivityKind::Notification(n) => n.import(raw),
            ActivityKind::Person(p) => p.import(raw),
            ActivityKind::Tombstone(t) => t.import(raw),
            kind => {
                if let Some(a) = kind.as_activity_mut() {
                    a.import(raw);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Activity {
    pub object_id: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub published: Option<Timestamp>,
}

impl Activity {
    fn import(&mut self, raw: &RawObject<'_>) {
        self.object_id = raw.get_node_iri("object").unwrap_or_default().to_string();
        self.to = raw.get_str_array("to");
        self.cc = raw.get_str_array("cc");
        self.published = parse_timestamp(raw, "published");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Note {
    pub content: String,
    pub summary: Option<String>,
    pub attributed_to: String,
    pub in_reply_to: Option<String>,
    pub published: Option<Timestamp>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub sensitive: bool,
}

impl Note {
    fn import(&mut self, raw: &RawObject<'_>) {
        // Remote HTML is never trusted as is.
        self.content = raw.get_str("content").map(ammonia::clean).unwrap_or_default();
        self.summary = raw.get_str("summary").map(ammonia::clean);
        self.attributed_to = raw
            .get_node_iri("attributedTo")
            .unwrap_or_default()
            .to_string();
        self.in_reply_to = raw.get_node_iri("inReplyTo").map(str::to_string);
        self.published = parse_timestamp(raw, "published");
        self.to = raw.get_str_array("to");
        self.cc = raw.get_str_array("cc");
        self.sensitive = raw.get_bool("sensitive").unwrap_or(false);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Person {
    pub preferred_username: String,
    pub name: Option<String>,
    pub inbox: String,
    pub shared_inbox: Option<String>,
    pub outbox: Option<String>,
    pub followers: Option<String>,
    pub following: Option<String>,
}

impl Person {
    fn import(&mut self, raw: &RawObject<'_>) {
        self.preferred_username = raw.get_string("preferredUsername").unwrap_or_default();
        self.name = raw.get_string("name");
        self.inbox = raw.get_node_iri("inbox").unwrap_or_default().to_string();
        self.shared_inbox = raw.get_endpoint("sharedInbox").map(str::to_string);
        self.outbox = raw.get_node_iri("outbox").map(str::to_string);
        self.followers = raw.get_node_iri("followers").map(str::to_string);
        self.following = raw.get_node_iri("following").map(str::to_string);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub media_type: Option<String>,
    pub url: Option<String>,
    pub name: Option<String>,
}

impl Document {
    fn import(&mut self, raw: &RawObject<'_>) {
        self.media_type = raw.get_string("mediaType");
        self.url = raw.get_node_iri("url").map(str::to_string);
        self.name = raw.get_string("name");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tombstone {
    pub former_type: Option<String>,
    pub deleted: Option<Timestamp>,
}

impl Tombstone {
    fn import(&mut self, raw: &RawObject<'_>) {
        self.former_type = raw.get_string("formerType");
        self.deleted = parse_timestamp(raw, "deleted");
    }
}

/// Internal notification stream entry, never federated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Notification {
    pub summary: String,
}

impl Notification {
    fn import(&mut self, raw: &RawObject<'_>) {
        self.summary = raw.get_string("summary").unwrap_or_default();
    }
}

fn parse_timestamp(raw: &RawObject<'_>, prop: &str) -> Option<Timestamp> {
    raw.get_str(prop).and_then(|s| s.parse().ok())
}
