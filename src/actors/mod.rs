mod message;
mod pipeline_actor;

use crossbeam_channel::{Receiver, Sender};
pub use message::*;
pub use pipeline_actor::PipelineActor;

use miette::Result;

pub trait Actor<From, To> {
    fn set_receive_channel(&mut self, channel: Receiver<From>);

    fn set_send_channel(&mut self, channel: Sender<To>);

    fn run(self) -> Result<()>;
}
