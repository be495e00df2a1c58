use std::{path::Path, time::Duration};

use cutout_queue::{
    api::{
        service::JobService,
        worker::{Processed, Worker},
    },
    config::PipelineConfig,
    domain::{codec, entity::JobStatus, error::ToolExecutionError},
    infrastructure::{
        memory::MemoryStore,
        tool::{CommandToolRunner, ToolConfig, ToolRunner},
        workspace::Workspace,
    },
};

/// Copies the input and appends a marker, like a tool that edits the image.
#[derive(Clone)]
struct Stamp;

#[async_trait::async_trait]
impl ToolRunner for Stamp {
    async fn run(&self, input: &Path, output: &Path) -> Result<(), ToolExecutionError> {
        let mut bytes = tokio::fs::read(input).await.unwrap();
        bytes.extend_from_slice(b"|stamped");
        tokio::fs::write(output, bytes).await.unwrap();
        Ok(())
    }
}

fn shell_tool(script: &str) -> CommandToolRunner {
    CommandToolRunner::new(ToolConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
    })
}

async fn setup<T: ToolRunner>(
    tool: T,
    dir: &Path,
) -> (
    JobService<MemoryStore, MemoryStore>,
    Worker<MemoryStore, MemoryStore, T>,
) {
    let store = MemoryStore::new();
    let config = PipelineConfig {
        workspace_dir: dir.to_owned(),
        ..PipelineConfig::default()
    };
    let workspace = Workspace::open(&config.workspace_dir).await.unwrap();

    let service = JobService::new(store.clone(), store.clone(), config.clone());
    let worker = Worker::new("it", store.clone(), store, tool, workspace, config);

    (service, worker)
}

fn leftovers(dir: &Path, job_id: &str) -> Vec<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(job_id))
        .collect()
}

#[tokio::test]
async fn completed_result_carries_tool_output_and_reads_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let (service, worker) =
        setup(shell_tool(r#"{ printf 'cut:'; cat "$0"; } > "$1""#), dir.path()).await;

    let image_a = codec::encode_image(b"image-a", "image/jpeg");
    let job_id = service.submit(&image_a).await.unwrap();
    assert_eq!(service.poll(&job_id).await.unwrap(), JobStatus::Pending);

    worker.process_next().await.unwrap();

    let first = service.poll(&job_id).await.unwrap();
    let second = service.poll(&job_id).await.unwrap();
    match &first {
        JobStatus::Completed { image } => {
            assert!(image.starts_with("data:image/png;base64,"));
            assert_eq!(codec::decode_image(image).unwrap(), b"cut:image-a");
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert_eq!(first, second);
    assert!(leftovers(dir.path(), &job_id).is_empty());
}

#[tokio::test]
async fn failing_tool_reports_error_and_leaves_no_files() {
    let dir = tempfile::tempdir().unwrap();
    let (service, worker) = setup(
        shell_tool(r#"echo "no foreground found" >&2; exit 1"#),
        dir.path(),
    )
    .await;

    let job_id = service
        .submit(&codec::encode_image(b"image-b", "image/png"))
        .await
        .unwrap();
    worker.process_next().await.unwrap();

    match service.poll(&job_id).await.unwrap() {
        JobStatus::Failed { error } => {
            assert!(!error.is_empty());
            assert!(error.contains("no foreground found"));
        }
        other => panic!("unexpected status: {other:?}"),
    }
    assert!(leftovers(dir.path(), &job_id).is_empty());
}

#[tokio::test]
async fn missing_tool_binary_is_a_failed_result() {
    let dir = tempfile::tempdir().unwrap();
    let tool = CommandToolRunner::new(ToolConfig {
        program: "/nonexistent/rembg".to_string(),
        args: vec!["i".to_string()],
    });
    let (service, worker) = setup(tool, dir.path()).await;

    let job_id = service
        .submit(&codec::encode_image(b"x", "image/png"))
        .await
        .unwrap();
    worker.process_next().await.unwrap();

    assert!(matches!(
        service.poll(&job_id).await.unwrap(),
        JobStatus::Failed { .. }
    ));
    assert!(leftovers(dir.path(), &job_id).is_empty());
}

#[tokio::test]
async fn single_worker_processes_in_submission_order() {
    let dir = tempfile::tempdir().unwrap();
    let (service, worker) = setup(Stamp, dir.path()).await;

    let first = service
        .submit(&codec::encode_image(b"1", "image/png"))
        .await
        .unwrap();
    let second = service
        .submit(&codec::encode_image(b"2", "image/png"))
        .await
        .unwrap();

    assert_eq!(
        worker.process_next().await.unwrap(),
        Processed::Completed {
            job_id: first,
            stored: true
        }
    );
    assert_eq!(
        worker.process_next().await.unwrap(),
        Processed::Completed {
            job_id: second,
            stored: true
        }
    );
}

#[tokio::test(start_paused = true)]
async fn results_revert_to_pending_after_retention() {
    let dir = tempfile::tempdir().unwrap();
    let (service, worker) = setup(Stamp, dir.path()).await;

    let job_id = service
        .submit(&codec::encode_image(b"old", "image/png"))
        .await
        .unwrap();
    worker.process_next().await.unwrap();
    assert!(matches!(
        service.poll(&job_id).await.unwrap(),
        JobStatus::Completed { .. }
    ));

    tokio::time::advance(Duration::from_secs(3600)).await;

    assert_eq!(service.poll(&job_id).await.unwrap(), JobStatus::Pending);
}

#[tokio::test]
async fn competing_workers_process_every_job_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    let config = PipelineConfig {
        workspace_dir: dir.path().to_owned(),
        ..PipelineConfig::default()
    };
    let workspace = Workspace::open(dir.path()).await.unwrap();
    let service = JobService::new(store.clone(), store.clone(), config.clone());

    let mut job_ids = Vec::new();
    for n in 0..6u8 {
        job_ids.push(
            service
                .submit(&codec::encode_image(&[n], "image/png"))
                .await
                .unwrap(),
        );
    }

    let consumers: Vec<_> = (0..2)
        .map(|n| {
            let worker = Worker::new(
                format!("worker-{}", n),
                store.clone(),
                store.clone(),
                Stamp,
                workspace.clone(),
                config.clone(),
            );
            tokio::spawn(async move {
                let mut done = Vec::new();
                for _ in 0..3 {
                    if let Processed::Completed { job_id, .. } = worker.process_next().await.unwrap() {
                        done.push(job_id);
                    }
                }
                done
            })
        })
        .collect();

    let mut processed = Vec::new();
    for consumer in consumers {
        processed.extend(consumer.await.unwrap());
    }
    processed.sort();
    job_ids.sort();
    assert_eq!(processed, job_ids);
    assert_eq!(store.queue_len().unwrap(), 0);
}

#[tokio::test]
async fn running_worker_picks_up_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let (service, worker) = setup(Stamp, dir.path()).await;
    let handle = tokio::spawn(async move { worker.run().await });

    let job_id = service
        .submit(&codec::encode_image(b"live", "image/png"))
        .await
        .unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = service.poll(&job_id).await.unwrap();
            if !status.is_pending() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    match status {
        JobStatus::Completed { image } => {
            assert_eq!(codec::decode_image(&image).unwrap(), b"live|stamped")
        }
        other => panic!("unexpected status: {other:?}"),
    }

    handle.abort();
}
