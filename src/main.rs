use anyhow::{Context, Result};
use clap::Parser;
use cutout_queue::{
    api::{service::JobService, worker::Worker},
    config::{self, Command, PipelineConfig},
    domain::{codec, entity::JobStatus},
    infrastructure::{
        redis_store::{RedisJobQueue, RedisResultStore},
        tool::CommandToolRunner,
        workspace::Workspace,
    },
};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::parse();

    config::configure_tracing();

    let client = redis::Client::open(config.redis_url.as_str()).context("invalid REDIS_URL")?;
    let pipeline = config.pipeline();

    match config.command {
        Command::Worker { workers } => run_workers(&client, pipeline, workers).await,
        Command::Submit { file, media_type } => {
            let service = facade(&client, pipeline).await?;
            submit(&service, &file, &media_type).await
        }
        Command::Poll { job_id, output } => {
            let service = facade(&client, pipeline).await?;
            poll(&service, &job_id, output).await
        }
    }
}

/// One connection serves both sides; the facade never pops.
async fn facade(
    client: &redis::Client,
    pipeline: PipelineConfig,
) -> Result<JobService<RedisJobQueue, RedisResultStore>> {
    let conn = client
        .get_multiplexed_async_connection()
        .await
        .context("failed to connect to Redis")?;

    let queue = RedisJobQueue::new(conn.clone(), pipeline.queue_name.clone());
    let results = RedisResultStore::new(conn);

    Ok(JobService::new(queue, results, pipeline))
}

async fn run_workers(
    client: &redis::Client,
    pipeline: PipelineConfig,
    workers: usize,
) -> Result<()> {
    let results = RedisResultStore::connect(client).await?;
    let workspace = Workspace::open(&pipeline.workspace_dir)
        .await
        .context("failed to create workspace directory")?;
    let tool = CommandToolRunner::new(pipeline.tool.clone());

    let mut handles = Vec::with_capacity(workers.max(1));
    for n in 0..workers.max(1) {
        // Own connection per consumer; BRPOP holds it while waiting.
        let queue = RedisJobQueue::connect(client, pipeline.queue_name.clone()).await?;
        let worker = Worker::new(
            format!("worker-{}", n),
            queue,
            results.clone(),
            tool.clone(),
            workspace.clone(),
            pipeline.clone(),
        );

        info!(worker = %worker.name(), "Starting worker");
        handles.push(tokio::spawn(async move { worker.run().await }));
    }

    tokio::select! {
        _ = futures::future::select_all(handles) => {
            error!("Worker exited");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted");
        }
    }

    info!("Exiting");

    Ok(())
}

async fn submit(
    service: &JobService<RedisJobQueue, RedisResultStore>,
    file: &Path,
    media_type: &str,
) -> Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;

    let job_id = service
        .submit(&codec::encode_image(&bytes, media_type))
        .await?;

    println!("{}", job_id);

    Ok(())
}

async fn poll(
    service: &JobService<RedisJobQueue, RedisResultStore>,
    job_id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let status = service.poll(job_id).await?;

    if let (JobStatus::Completed { image }, Some(path)) = (&status, &output) {
        let bytes = codec::decode_image(image)?;
        tokio::fs::write(path, bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(job_id = %job_id, path = %path.display(), "Wrote result image");
    }

    println!("{}", serde_json::to_string(&status)?);

    Ok(())
}
