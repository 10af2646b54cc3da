mod event;
mod extension;
mod fragment;

pub use event::{NetworkEvent, Notification};
pub use extension::Extension;
pub use fragment::{FetchedFragment, FragmentSequence, FragmentUrl, OutputArtifact};

#[cfg(test)]
pub(crate) use event::tests as event_fixtures;
