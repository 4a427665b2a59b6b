use super::*;
use crate::config::SupervisorConfig;
use crate::subprocess::ProgressSample;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;

use crate::tracker::{DiagnosticStream, ProcessInspector, SysinfoInspector};

/// A fake tool: a shell script run by `/bin/sh` as the interpreter
struct FakeTool {
    dir: TempDir,
    script: PathBuf,
}

impl FakeTool {
    fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("yt-dlp");
        std::fs::write(&script, body).unwrap();
        Self { dir, script }
    }

    fn layout(&self) -> RuntimeLayout {
        let config = SupervisorConfig {
            interpreter: Some(PathBuf::from("/bin/sh")),
            tool: Some(self.script.clone()),
            temp_dir: Some(self.dir.path().join("tmp")),
            poll_interval_ms: 20,
            ..SupervisorConfig::with_base_dir(self.dir.path())
        };
        RuntimeLayout::from_config(&config)
    }

    fn supervisor(&self) -> Supervisor {
        Supervisor::with_layout(self.layout())
    }
}

/// One `terminate` call, with whether the tool itself was still alive then
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Termination {
    pid: u32,
    parent_alive: bool,
}

/// Real process table access that records every kill
#[derive(Clone, Default)]
struct RecordingInspector {
    inner: SysinfoInspector,
    parent: Arc<std::sync::Mutex<Option<u32>>>,
    terminations: Arc<std::sync::Mutex<Vec<Termination>>>,
}

impl RecordingInspector {
    fn terminations(&self) -> Vec<Termination> {
        self.terminations.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ProcessInspector for RecordingInspector {
    async fn children_of(&self, pid: u32) -> Vec<u32> {
        self.parent.lock().unwrap().get_or_insert(pid);
        self.inner.children_of(pid).await
    }

    async fn is_alive(&self, pid: u32) -> bool {
        self.inner.is_alive(pid).await
    }

    async fn open_diagnostic_stream(&self, pid: u32) -> std::io::Result<DiagnosticStream> {
        self.inner.open_diagnostic_stream(pid).await
    }

    async fn terminate(&self, pid: u32) -> bool {
        let parent = *self.parent.lock().unwrap();
        let parent_alive = match parent {
            Some(parent) => self.inner.is_alive(parent).await,
            None => false,
        };
        self.terminations
            .lock()
            .unwrap()
            .push(Termination { pid, parent_alive });
        self.inner.terminate(pid).await
    }
}

/// Cancel a tool blocked on a child process and report what was killed
async fn cancel_with_child(request: CommandRequest) -> (u32, Vec<Termination>) {
    let tool = FakeTool::new("sh -c 'sleep 30'\nexec sleep 30\n");
    let inspector = RecordingInspector::default();
    let supervisor = tool
        .supervisor()
        .with_inspector(Arc::new(inspector.clone()));
    let (options, started) = started_signal();

    let run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.execute(request, options.with_id("child")).await })
    };
    started.await.unwrap();
    let parent = supervisor.registry().get("child").unwrap().pid().unwrap();

    let mut child = None;
    for _ in 0..100 {
        child = SysinfoInspector.children_of(parent).await.first().copied();
        if child.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let child = child.expect("tool never started its child");

    assert!(supervisor.cancel("child").await);
    let err = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("canceled invocation did not finish")
        .unwrap()
        .unwrap_err();
    assert!(err.is_canceled());
    (child, inspector.terminations())
}

fn started_signal() -> (InvocationOptions, oneshot::Receiver<String>) {
    let (tx, rx) = oneshot::channel();
    let options = InvocationOptions::new().on_start(move |id| {
        let _ = tx.send(id.to_string());
    });
    (options, rx)
}

#[tokio::test]
async fn test_successful_invocation_returns_output_verbatim() {
    let tool = FakeTool::new("printf '{\"title\":\"x\"}\\n'\n");
    let supervisor = tool.supervisor();
    let mut request = CommandRequest::new("https://example.com/v");
    request.add_option("--dump-json");

    let result = supervisor
        .execute(request, InvocationOptions::new())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.command.contains(&"--dump-json".to_string()));
    assert!(result.success());
    assert_eq!(result.stdout, "{\"title\":\"x\"}\n");
    assert_eq!(result.stderr, "");
    assert_eq!(supervisor.active_count(), 0);
}

#[tokio::test]
async fn test_argv_contains_managed_options() {
    let tool = FakeTool::new("for a in \"$@\"; do printf '%s\\n' \"$a\"; done\n");
    let supervisor = tool.supervisor();

    let result = supervisor
        .execute(CommandRequest::new("https://example.com/v"), InvocationOptions::new())
        .await
        .unwrap();

    assert_eq!(result.command[0], "/bin/sh");
    assert_eq!(result.command[1], tool.script.display().to_string());
    let echoed: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(echoed, &result.command[2..]);
    assert_eq!(echoed.first(), Some(&"--no-cache-dir"));
    assert_eq!(echoed[1], "--ffmpeg-location");
    assert_eq!(echoed.last(), Some(&"https://example.com/v"));
}

#[tokio::test]
async fn test_environment_is_prepared() {
    let tool = FakeTool::new(
        "echo \"$HOME\"\necho \"$PYTHONHOME\"\necho \"$TMPDIR\"\necho \"$PATH\"\necho \"$SSL_CERT_FILE\"\n",
    );
    let layout = tool.layout();
    let result = Supervisor::with_layout(layout.clone())
        .execute(CommandRequest::new("u"), InvocationOptions::new())
        .await
        .unwrap();

    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines[0], layout.python_home.display().to_string());
    assert_eq!(lines[0], lines[1]);
    assert_eq!(lines[2], layout.temp_dir.display().to_string());
    assert!(lines[3].ends_with(&format!(":{}", layout.bin_dir.display())));
    assert_eq!(lines[4], layout.cert_file.display().to_string());
}

#[tokio::test]
async fn test_failure_carries_stderr() {
    let tool = FakeTool::new("echo boom >&2\nexit 1\n");
    let supervisor = tool.supervisor();

    let err = supervisor
        .execute(CommandRequest::new("u"), InvocationOptions::new().with_id("fails"))
        .await
        .unwrap_err();

    match err {
        SupervisorError::ToolExecution { exit_code, stderr } => {
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr, "boom\n");
        }
        other => panic!("expected ToolExecution, got {other:?}"),
    }
    assert!(!supervisor.is_running("fails"));
}

#[tokio::test]
async fn test_dump_json_with_ignore_errors_tolerates_failure() {
    let tool = FakeTool::new("printf '{\"id\":\"a\"}\\n'\necho 'ERROR: entry 2' >&2\nexit 1\n");
    let mut request = CommandRequest::new("playlist");
    request.add_option("--dump-json").add_option("--ignore-errors");

    let result = tool
        .supervisor()
        .execute(request, InvocationOptions::new())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stdout, "{\"id\":\"a\"}\n");
    assert_eq!(result.stderr, "ERROR: entry 2\n");
}

#[tokio::test]
async fn test_tolerance_requires_output() {
    let tool = FakeTool::new("echo nothing found >&2\nexit 1\n");
    let mut request = CommandRequest::new("playlist");
    request.add_option("--dump-json").add_option("--ignore-errors");

    let err = tool
        .supervisor()
        .execute(request, InvocationOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::ToolExecution { .. }));
}

#[tokio::test]
async fn test_progress_lines_delivered_in_order() {
    let tool = FakeTool::new(
        "i=0\nwhile [ $i -lt 50 ]; do\n  echo \"[download]  $i.0% of 10MiB ETA 00:$((50 - i))\"\n  i=$((i + 1))\ndone\n",
    );
    let (options, mut rx) = InvocationOptions::new().with_progress_channel();

    tool.supervisor()
        .execute(CommandRequest::new("u"), options)
        .await
        .unwrap();

    let mut samples: Vec<ProgressSample> = Vec::new();
    while let Ok(sample) = rx.try_recv() {
        samples.push(sample);
    }
    assert_eq!(samples.len(), 50);
    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.percent, i as f32);
        assert_eq!(sample.eta_seconds, 50 - i as i64);
    }
}

#[tokio::test]
async fn test_hooks_fire_with_id_and_result() {
    let tool = FakeTool::new("echo ok\n");
    let started = Arc::new(std::sync::Mutex::new(None));
    let ended = Arc::new(std::sync::Mutex::new(None));
    let (s, e) = (Arc::clone(&started), Arc::clone(&ended));

    let result = tool
        .supervisor()
        .execute(
            CommandRequest::new("u"),
            InvocationOptions::new()
                .on_start(move |id| *s.lock().unwrap() = Some(id.to_string()))
                .on_end(move |r| *e.lock().unwrap() = Some(r.clone())),
        )
        .await
        .unwrap();

    let started_id = started.lock().unwrap().clone().unwrap();
    assert!(Uuid::parse_str(&started_id).is_ok(), "generated id {started_id}");
    assert_eq!(started_id, result.id);
    assert_eq!(ended.lock().unwrap().as_ref(), Some(&result));
}

#[tokio::test]
async fn test_duplicate_identifier_is_rejected() {
    let tool = FakeTool::new("exec sleep 5\n");
    let supervisor = tool.supervisor();
    let (options, started) = started_signal();

    let first = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .execute(CommandRequest::new("u"), options.with_id("dup"))
                .await
        })
    };
    started.await.unwrap();

    let err = supervisor
        .execute(CommandRequest::new("u"), InvocationOptions::new().with_id("dup"))
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::DuplicateIdentifier(ref id) if id == "dup"));
    assert_eq!(supervisor.active_count(), 1);

    assert!(supervisor.cancel("dup").await);
    assert!(first.await.unwrap().unwrap_err().is_canceled());
}

#[tokio::test]
async fn test_cancel_unknown_identifier() {
    let tool = FakeTool::new("true\n");
    assert!(!tool.supervisor().cancel("nope").await);
}

#[tokio::test]
async fn test_cancel_live_invocation() {
    let tool = FakeTool::new("echo starting\nexec sleep 30\n");
    let supervisor = tool.supervisor();
    let (options, started) = started_signal();

    let run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .execute(CommandRequest::new("u"), options.with_id("live"))
                .await
        })
    };
    started.await.unwrap();
    assert!(supervisor.is_running("live"));

    assert!(supervisor.cancel("live").await);
    assert!(!supervisor.is_running("live"));

    let err = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("canceled invocation did not finish")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Canceled(ref id) if id == "live"));
    assert_eq!(supervisor.active_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_exit_reports_false() {
    // The background sleep keeps the pipes open after the tool exits
    let tool = FakeTool::new("sleep 1 &\necho started\nexit 0\n");
    let supervisor = tool.supervisor();
    let (options, started) = started_signal();

    let run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .execute(CommandRequest::new("u"), options.with_id("exited"))
                .await
        })
    };
    started.await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!supervisor.cancel("exited").await);
    assert!(supervisor.is_running("exited"));

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.exit_code, 0);
    assert!(!supervisor.is_running("exited"));
}

#[tokio::test]
async fn test_registry_tracks_concurrent_invocations() {
    let supervisor = FakeTool::new("true\n").supervisor();
    let tools: Vec<FakeTool> = (0..3)
        .map(|i| FakeTool::new(&format!("echo tool-{i}\nsleep 1\necho tool-{i}-done\n")))
        .collect();

    let mut runs = Vec::new();
    let mut signals = Vec::new();
    for (i, tool) in tools.iter().enumerate() {
        let (options, started) = started_signal();
        signals.push(started);
        let worker = Supervisor::with_layout(tool.layout()).with_registry(Arc::clone(supervisor.registry()));
        runs.push(tokio::spawn(async move {
            worker
                .execute(CommandRequest::new("u"), options.with_id(format!("job-{i}")))
                .await
        }));
    }
    for started in signals {
        started.await.unwrap();
    }
    assert_eq!(supervisor.active_count(), 3);

    for (i, run) in runs.into_iter().enumerate() {
        let result = run.await.unwrap().unwrap();
        assert_eq!(result.id, format!("job-{i}"));
        assert_eq!(result.stdout, format!("tool-{i}\ntool-{i}-done\n"));
    }
    assert_eq!(supervisor.active_count(), 0);
}

#[tokio::test]
async fn test_global_layout_required() {
    let supervisor = Supervisor::new();
    let err = supervisor
        .execute(CommandRequest::new("u"), InvocationOptions::new().with_id("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::NotInitialized));
    assert_eq!(supervisor.active_count(), 0);
}

#[tokio::test]
async fn test_spawn_failure_releases_identifier() {
    let tool = FakeTool::new("true\n");
    let mut layout = tool.layout();
    layout.interpreter = PathBuf::from("/nonexistent/python-interpreter");
    let supervisor = Supervisor::with_layout(layout);

    let err = supervisor
        .execute(CommandRequest::new("u"), InvocationOptions::new().with_id("nospawn"))
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::ProcessStart { .. }));
    assert!(!supervisor.is_running("nospawn"));
}

#[tokio::test]
async fn test_dropped_execution_destroys_process() {
    let tool = FakeTool::new("sleep 30\n");
    let supervisor = tool.supervisor();
    let (options, started) = started_signal();

    let run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move {
            supervisor
                .execute(CommandRequest::new("u"), options.with_id("dropped"))
                .await
        })
    };
    started.await.unwrap();
    let pid = supervisor.registry().get("dropped").unwrap().pid().unwrap();

    run.abort();
    let _ = run.await;
    assert!(!supervisor.is_running("dropped"));

    let inspector = SysinfoInspector::new();
    let mut alive = true;
    for _ in 0..40 {
        if !inspector.is_alive(pid).await {
            alive = false;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(!alive, "pid {pid} survived a dropped invocation");
}

#[tokio::test]
async fn test_get_info_decodes_metadata() {
    let tool = FakeTool::new(
        "case \" $* \" in *' --dump-json '*) ;; *) exit 2 ;; esac\nprintf '{\"id\":\"abc\",\"title\":\"Clip\",\"duration\":12.5,\"extra\":true}\\n'\n",
    );
    let info = tool.supervisor().get_info("https://example.com/v").await.unwrap();
    assert_eq!(info.id.as_deref(), Some("abc"));
    assert_eq!(info.title.as_deref(), Some("Clip"));
    assert_eq!(info.duration, Some(12.5));
}

#[tokio::test]
async fn test_get_info_decode_failure() {
    let tool = FakeTool::new("echo 'not json'\necho 'WARNING: odd' >&2\n");
    let err = tool.supervisor().get_info("u").await.unwrap_err();
    match err {
        SupervisorError::MetadataDecode { stderr, .. } => assert_eq!(stderr, "WARNING: odd\n"),
        other => panic!("expected MetadataDecode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_ffmpeg_downloader_runs_tracker_to_completion() {
    let tool = FakeTool::new("sh -c 'sleep 0.3'\necho merged\n");
    let mut request = CommandRequest::new("u");
    request.add_option_with("--downloader", "ffmpeg");

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        tool.supervisor().execute(request, InvocationOptions::new()),
    )
    .await
    .expect("tracker kept the invocation alive")
    .unwrap();
    assert_eq!(result.stdout, "merged\n");
}

#[tokio::test]
async fn test_cancel_with_subsidiary() {
    let tool = FakeTool::new("sh -c 'sleep 30'\nexec sleep 30\n");
    let supervisor = tool.supervisor();
    let (options, started) = started_signal();
    let mut request = CommandRequest::new("u");
    request.add_option_with("--downloader", "ffmpeg");

    let run = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.execute(request, options.with_id("ff")).await })
    };
    started.await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(supervisor.cancel("ff").await);
    let err = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("canceled invocation did not finish")
        .unwrap()
        .unwrap_err();
    assert!(err.is_canceled());
}

#[tokio::test]
async fn test_cancel_kills_tracked_subsidiary_before_tool() {
    let mut request = CommandRequest::new("u");
    request.add_option_with("--downloader", "ffmpeg");

    let (child, terminations) = cancel_with_child(request).await;
    assert_eq!(
        terminations.first(),
        Some(&Termination {
            pid: child,
            parent_alive: true
        })
    );
}

#[tokio::test]
async fn test_cancel_kills_child_without_tracker() {
    let (child, terminations) = cancel_with_child(CommandRequest::new("u")).await;
    assert_eq!(
        terminations,
        vec![Termination {
            pid: child,
            parent_alive: true
        }]
    );
}
