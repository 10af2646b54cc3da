use crossbeam_channel::{Receiver, Sender};
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use tracing::{debug, error, info};

use crate::{pipeline::Pipeline, source::EventSource};

use super::{Actor, RunReport, RunRequest};

/// The single worker running the grabs, one request after the other.
///
/// Every request works on a fresh snapshot of the session, taken when
/// the request is processed rather than when it was made.
#[derive(Debug)]
pub struct PipelineActor<'a> {
    source: &'a dyn EventSource,
    pipeline: &'a Pipeline<'a>,

    receive_channel: Option<Receiver<RunRequest>>,
    send_channel: Option<Sender<RunReport>>,
}

impl Actor<RunRequest, RunReport> for PipelineActor<'_> {
    fn set_receive_channel(&mut self, channel: Receiver<RunRequest>) {
        self.receive_channel = Some(channel);
    }

    fn set_send_channel(&mut self, channel: Sender<RunReport>) {
        self.send_channel = Some(channel);
    }

    fn run(mut self) -> Result<()> {
        let receive_channel = self
            .receive_channel
            .take()
            .ok_or_else(|| miette!("Receive channel not set"))?;

        let send_channel = self
            .send_channel
            .take()
            .ok_or_else(|| miette!("Send channel not set"))?;

        debug!("Actor started, waiting for a run request");

        for RunRequest { id } in receive_channel {
            info!("Run #{id} started");

            let outcome = self.grab();
            if let Err(report) = &outcome {
                error!("Run #{id} aborted: {report:?}");
            }

            send_channel
                .send(RunReport { id, outcome })
                .into_diagnostic()
                .wrap_err("Could not send message")?;

            debug!("Iteration completed. Waiting for next run request");
        }

        debug!("All iterations completed. Stopping the actor.");
        Ok(())
    }
}

impl<'a> PipelineActor<'a> {
    pub fn new(source: &'a dyn EventSource, pipeline: &'a Pipeline<'a>) -> Self {
        Self {
            source,
            pipeline,
            receive_channel: None,
            send_channel: None,
        }
    }

    fn grab(&self) -> Result<crate::pipeline::RunOutcome> {
        let snapshot = self
            .source
            .snapshot()
            .wrap_err("Could not capture the browser session")?;

        self.pipeline.run(&snapshot.events, &snapshot.location)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use assert_matches::assert_matches;
    use crossbeam_channel::unbounded;
    use time::UtcOffset;

    use super::*;
    use crate::{
        location::LocationContext,
        outside::fake::FakeRemuxer,
        pipeline::RunOutcome,
        settings::Settings,
        source::SessionSnapshot,
        types::event_fixtures::response,
    };

    /// Serves the prepared snapshots in order, then fails
    #[derive(Debug)]
    struct ScriptedSource(Mutex<Vec<SessionSnapshot>>);

    impl EventSource for ScriptedSource {
        fn snapshot(&self) -> Result<SessionSnapshot> {
            let mut snapshots = self.0.lock().unwrap();
            if snapshots.is_empty() {
                Err(miette!("browser is gone"))
            } else {
                Ok(snapshots.remove(0))
            }
        }
    }

    #[test]
    fn one_report_per_request() {
        let root = tempfile::tempdir().unwrap();
        let settings = Settings {
            output_root: root.path().to_path_buf(),
            ..Settings::default()
        };
        let remuxer = FakeRemuxer::succeeding();
        let pipeline = Pipeline::new(&settings, &remuxer, UtcOffset::UTC).unwrap();
        let source = ScriptedSource(Mutex::new(vec![
            SessionSnapshot::default(),
            SessionSnapshot {
                events: vec![response("https://cdn.example/app.js")],
                location: LocationContext(None),
            },
        ]));

        let mut actor = PipelineActor::new(&source, &pipeline);
        let (requests, receive) = unbounded();
        let (send, reports) = unbounded();
        actor.set_receive_channel(receive);
        actor.set_send_channel(send);

        for id in 1..=3 {
            requests.send(RunRequest { id }).unwrap();
        }
        drop(requests);
        actor.run().unwrap();

        let reports: Vec<_> = reports.iter().collect();
        assert_eq!(reports.iter().map(|r| r.id).collect::<Vec<_>>(), [1, 2, 3]);
        assert_matches!(reports[0].outcome, Ok(RunOutcome::NoFragmentsFound));
        assert_matches!(reports[1].outcome, Ok(RunOutcome::NoFragmentsFound));
        assert!(reports[2].outcome.is_err());
    }

    #[test]
    fn channels_must_be_connected() {
        let remuxer = FakeRemuxer::succeeding();
        let pipeline = Pipeline::new(&Settings::default(), &remuxer, UtcOffset::UTC).unwrap();
        let source = ScriptedSource(Mutex::new(vec![]));

        assert!(PipelineActor::new(&source, &pipeline).run().is_err());
    }
}
