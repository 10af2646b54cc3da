mod actors;
mod cli;
mod concat;
mod fetcher;
mod io;
mod locator;
mod location;
mod logging;
mod outside;
mod pipeline;
mod sequencer;
mod settings;
mod source;
mod trigger;
mod types;

use std::thread::{Builder, Scope, ScopedJoinHandle};

use actors::{Actor, PipelineActor, RunReport, RunRequest};
use clap::Parser;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use indoc::printdoc;
use miette::{miette, IntoDiagnostic, Result, WrapErr};
use outside::Ffmpeg;
use pipeline::Pipeline;
use source::{EventSource, PerformanceLog};
use time::UtcOffset;
use tracing::{error, info, warn};

use crate::{cli::Args, settings::Settings};

fn main() -> Result<()> {
    let args = Args::parse();

    // Read before any thread exists
    let local_offset = logging::local_offset();
    let offset = local_offset.unwrap_or(UtcOffset::UTC);
    logging::init_logging(args.log_level(), offset)?;
    if local_offset.is_none() {
        warn!("Could not get the local time offset, using UTC");
    }

    let settings = Settings::load(args.config.as_deref())?;
    let ffmpeg = Ffmpeg::new(&settings.ffmpeg)
        .wrap_err_with(|| format!("'{}' is needed to merge the fragments", settings.ffmpeg))?;
    let source = PerformanceLog::new(&args.capture, args.page_url.clone());
    let pipeline = Pipeline::new(&settings, &ffmpeg, offset)?;

    if args.once {
        return grab_once(&source, &pipeline);
    }

    printdoc! {"
        Instructions:
        1. Open the page with the video in the browser, with its performance log being recorded to
           {capture}
        2. Play the video until it is fully loaded.
        3. Come back here and press Enter to grab it. Type 'q' then Enter to quit.

        ", capture = args.capture.display()
    };
    info!("Waiting for triggers");

    let (runs, successes) = std::thread::scope(|scope| -> Result<(usize, usize)> {
        let (requests, reports, worker) = load_actors(scope, &source, &pipeline)?;

        let listener = Builder::new()
            .name("trigger".to_string())
            .spawn_scoped(scope, move || {
                let stdin = std::io::stdin();
                // The request sender is dropped on return, letting the worker stop
                trigger::listen(stdin.lock(), &requests)
            })
            .into_diagnostic()?;

        let mut runs = 0;
        let mut successes = 0;
        for RunReport { id, outcome } in reports {
            runs += 1;
            match outcome {
                Ok(outcome) if outcome.is_success() => {
                    successes += 1;
                    info!("Run #{id} done: {outcome}");
                }
                Ok(outcome) => error!("Run #{id} failed: {outcome}"),
                Err(report) => error!("Run #{id} failed: {report:?}"),
            }
        }

        join(listener)?;
        join(worker)?;
        Ok((runs, successes))
    })?;

    info!("{runs} grabs done, {successes} successful");
    Ok(())
}

/// Run the pipeline a single time, failing if it did not produce a video
fn grab_once(source: &dyn EventSource, pipeline: &Pipeline) -> Result<()> {
    let snapshot = source.snapshot()?;
    let outcome = pipeline.run(&snapshot.events, &snapshot.location)?;

    if outcome.is_success() {
        info!("Done: {outcome}");
        Ok(())
    } else {
        Err(miette!("Grab failed: {outcome}"))
    }
}

/// Start the worker in the scope and return its input and output channels.
///
/// At most one request waits while another is processed,
/// so runs never overlap in the same folder.
fn load_actors<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    source: &'env dyn EventSource,
    pipeline: &'env Pipeline<'env>,
) -> Result<(
    Sender<RunRequest>,
    Receiver<RunReport>,
    ScopedJoinHandle<'scope, Result<()>>,
)> {
    let mut actor = PipelineActor::new(source, pipeline);

    let (input, receive) = bounded(1);
    actor.set_receive_channel(receive);

    let (send, output) = unbounded();
    actor.set_send_channel(send);

    let worker = Builder::new()
        .name("pipeline".to_string())
        .spawn_scoped(scope, move || actor.run())
        .into_diagnostic()
        .wrap_err("Could not start the pipeline worker")?;

    Ok((input, output, worker))
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    let name = handle.thread().name().unwrap_or("?").to_string();
    handle
        .join()
        .map_err(|_| miette!("Thread '{name}' panicked"))?
}
