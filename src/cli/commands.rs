//! Handlers for the `download` and `info` subcommands

use tracing::{debug, info};
use uuid::Uuid;

use super::args::DownloadArgs;
use super::display::DownloadProgress;
use crate::error::Result;
use crate::supervisor::{CommandRequest, InvocationOptions, InvocationResult, Supervisor, VideoInfo};

/// Translate download arguments into a tool request
pub fn build_download_request(args: &DownloadArgs) -> CommandRequest {
    let mut request = CommandRequest::new(&args.url);
    if let Some(format) = &args.format {
        request.add_option_with("--format", format);
    }
    if let Some(output) = &args.output {
        request.add_option_with("--output", output);
    }
    if args.ffmpeg {
        request.add_option_with("--downloader", "ffmpeg");
    }
    apply_extra_args(&mut request, &args.extra);
    request
}

/// Group raw `--option value...` tokens into request options.
///
/// Tokens before the first option are ignored.
pub fn apply_extra_args(request: &mut CommandRequest, extra: &[String]) {
    let mut current: Option<(&str, Vec<&str>)> = None;
    for token in extra {
        if token.starts_with('-') {
            if let Some((option, values)) = current.take() {
                push_option(request, option, &values);
            }
            current = Some((token.as_str(), Vec::new()));
        } else if let Some((_, values)) = current.as_mut() {
            values.push(token.as_str());
        } else {
            debug!("Ignoring stray argument {}", token);
        }
    }
    if let Some((option, values)) = current {
        push_option(request, option, &values);
    }
}

fn push_option(request: &mut CommandRequest, option: &str, values: &[&str]) {
    if values.is_empty() {
        request.add_option(option);
    }
    for value in values {
        request.add_option_with(option, value);
    }
}

/// Run a download with a progress bar. Ctrl-C cancels the invocation.
pub async fn run_download(supervisor: &Supervisor, args: DownloadArgs) -> Result<InvocationResult> {
    let id = args
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let request = build_download_request(&args);
    let (options, mut samples) = InvocationOptions::new()
        .with_id(id.clone())
        .with_progress_channel();

    let progress = DownloadProgress::new(&args.url);
    let render = async {
        while let Some(sample) = samples.recv().await {
            progress.update(&sample);
        }
    };

    let execution = supervisor.execute(request, options);
    tokio::pin!(execution);

    let run = async {
        tokio::select! {
            result = &mut execution => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupt received, canceling {}", id);
                supervisor.cancel(&id).await;
                (&mut execution).await
            }
        }
    };
    // The channel closes when the execution drops its listener.
    let (result, ()) = tokio::join!(run, render);

    match &result {
        Ok(outcome) => progress.finish(format!("done in {:.1?}", outcome.elapsed)),
        Err(e) if e.is_canceled() => progress.abandon("canceled"),
        Err(_) => progress.abandon("failed"),
    }
    result
}

/// Fetch and render metadata for `url`
pub async fn run_info(supervisor: &Supervisor, url: &str, compact: bool) -> anyhow::Result<String> {
    let info: VideoInfo = supervisor.get_info(url).await?;
    let rendered = if compact {
        serde_json::to_string(&info)?
    } else {
        serde_json::to_string_pretty(&info)?
    };
    Ok(rendered)
}
