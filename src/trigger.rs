use std::io::BufRead;

use crossbeam_channel::{Sender, TrySendError};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, info, warn};

use crate::actors::RunRequest;

/// Listen for the operator's triggers: every line read is one trigger,
/// `q` or `quit` (or the end of the input) stops listening.
///
/// The request channel is expected to be bounded: when it is full, a grab is
/// already waiting behind the running one and the trigger is ignored.
///
/// Returns the number of requests that were queued.
pub fn listen<R: BufRead>(input: R, requests: &Sender<RunRequest>) -> Result<u64> {
    let mut next_id = 1;

    for line in input.lines() {
        let line = line.into_diagnostic().wrap_err("Could not read the trigger input")?;

        if matches!(line.trim(), "q" | "quit") {
            debug!("Quit requested");
            break;
        }

        info!("Trigger received!");
        match requests.try_send(RunRequest { id: next_id }) {
            Ok(()) => {
                debug!("Run #{next_id} queued");
                next_id += 1;
            }
            Err(TrySendError::Full(_)) => {
                warn!("A grab is already waiting for the current one to finish, trigger ignored");
            }
            Err(TrySendError::Disconnected(_)) => {
                warn!("The worker has stopped, no more grabs can be made");
                break;
            }
        }
    }

    Ok(next_id - 1)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crossbeam_channel::bounded;

    use super::*;

    #[test]
    fn one_request_per_line() {
        let (send, receive) = bounded(10);
        let queued = listen(Cursor::new("\n\nf4\n"), &send).unwrap();

        assert_eq!(queued, 3);
        assert_eq!(
            receive.try_iter().collect::<Vec<_>>(),
            [1, 2, 3].map(|id| RunRequest { id })
        );
    }

    #[test]
    fn quit_stops_listening() {
        let (send, receive) = bounded(10);
        let queued = listen(Cursor::new("\nquit\n\n"), &send).unwrap();

        assert_eq!(queued, 1);
        assert_eq!(receive.try_iter().count(), 1);
    }

    #[test]
    fn extra_triggers_are_ignored_while_one_is_waiting() {
        let (send, receive) = bounded(1);
        let queued = listen(Cursor::new("\n\n\n"), &send).unwrap();

        assert_eq!(queued, 1);
        assert_eq!(receive.try_iter().collect::<Vec<_>>(), [RunRequest { id: 1 }]);
    }

    #[test]
    fn stop_when_the_worker_is_gone() {
        let (send, receive) = bounded(1);
        drop(receive);

        assert_eq!(listen(Cursor::new("\n\n"), &send).unwrap(), 0);
    }
}
