// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 边缘哨兵 (Edge Sentinel)
///
/// 边缘视频流水线: 采集 → 检测 → 录像/云台跟踪 → 推流/上传
///
/// 系统架构:
/// 1. 采集线程:     帧源 → 各槽位 + 录像写入
/// 2. 检测线程:     每N帧调用推理服务
/// 3. 推流线程:     标注 + JPEG + base64, 限速推送
/// 4. 录像管理线程: 滞回录像 + 云台自动跟踪
/// 5. 上传线程:     转码 + 上传
/// 6. 连接维护线程: 指数退避重连
/// 7. 指令接收线程: 手动模式 / 录像 / 云台指令
/// 主线程: 等待退出信号,有限时间内回收线程
use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use edge_sentinel::capture::{CaptureLoop, ImageFolderSource};
use edge_sentinel::control::{CommandIngress, ControlAuthority};
use edge_sentinel::detection::{DetectionStage, HttpDetector};
use edge_sentinel::ptz::{open_serial, PtzArbiter, PtzSettings};
use edge_sentinel::recording::{HysteresisParams, MjpegRecorder, RecordingController, RecordingManager};
use edge_sentinel::transport::{
    Annotator, BackoffPolicy, ConnectionSupervisor, TransmitStage, Transport, WsTransport,
};
use edge_sentinel::upload::{
    FfmpegTranscoder, HttpStorage, LocalArchive, StorageClient, Transcoder, UploadQueue, Uploader,
};
use edge_sentinel::{PipelineContext, SentinelConfig, Workers};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// 线程回收超时
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 边缘哨兵参数
#[derive(Parser, Debug)]
#[command(author, version, about = "边缘哨兵 - 边缘视频监控流水线", long_about = None)]
struct Args {
    /// 配置文件 (不存在时自动创建)
    #[arg(short, long, default_value = "sentinel_config.json")]
    config: PathBuf,

    /// 覆盖远端服务器地址 (ws:// 或 wss://)
    #[arg(short, long)]
    url: Option<String>,

    /// 覆盖图片帧源目录
    #[arg(short, long)]
    images: Option<PathBuf>,

    /// 覆盖云台串口设备 (同时启用云台)
    #[arg(short, long)]
    serial: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .init();

    let args = Args::parse();
    let mut config = SentinelConfig::load(&args.config)
        .with_context(|| format!("加载配置失败: {}", args.config.display()))?;
    if let Some(url) = args.url {
        config.connection.server_url = url;
    }
    if let Some(dir) = args.images {
        config.capture.source_dir = dir;
    }
    if let Some(device) = args.serial {
        config.ptz.serial_device = device;
        config.ptz.enabled = true;
    }
    config.validate().context("配置参数不合法")?;

    info!("🚀 边缘哨兵启动");
    config.print_summary();

    // ========== 共享组件 ==========
    let authority = Arc::new(ControlAuthority::new());
    let transport: Arc<dyn Transport> = Arc::new(WsTransport::new(config.connection.server_url.clone()));
    let uploads = UploadQueue::new();

    let recorder = Arc::new(RecordingController::new(
        HysteresisParams {
            required_frames: config.recording.required_frames,
            cooldown: config.recording.cooldown(),
            min_duration: config.recording.min_duration(),
        },
        config.recording.jpeg_quality,
        Box::new(MjpegRecorder::new(config.recording.output_dir.clone())),
        authority.clone(),
        transport.clone(),
        uploads.clone(),
    ));

    let ptz = if config.ptz.enabled {
        match open_serial(&config.ptz.serial_device, config.ptz.baud_rate, config.ptz.address) {
            Ok(actuator) => Some(Arc::new(PtzArbiter::new(
                Box::new(actuator),
                authority.clone(),
                transport.clone(),
                PtzSettings::from_config(&config.ptz, config.detection.recording_threshold),
            ))),
            Err(e) => {
                warn!("⚠️  云台不可用,继续运行: {}", e);
                None
            }
        }
    } else {
        None
    };

    let ctx = Arc::new(PipelineContext::new(
        authority,
        transport.clone(),
        recorder.clone(),
        ptz,
        uploads.clone(),
    ));

    let shutdown = ctx.shutdown.clone();
    ctrlc::set_handler(move || {
        info!("🛑 收到退出信号");
        shutdown.trigger();
    })
    .context("无法注册 Ctrl+C 处理")?;

    // ========== 启动工作线程 ==========
    let mut workers = Workers::new(ctx.shutdown.clone());

    let capture_ctx = ctx.clone();
    let capture_cfg = config.capture.clone();
    let detect_every = config.detection.detect_every;
    workers.spawn("capture", move || {
        let source = ImageFolderSource::new(capture_cfg.source_dir, capture_cfg.width, capture_cfg.height);
        CaptureLoop::new(source, capture_cfg.fps, detect_every).run(&capture_ctx);
    })?;

    let detect_ctx = ctx.clone();
    let detection_cfg = config.detection.clone();
    workers.spawn("detection", move || {
        let detector = HttpDetector::new(
            detection_cfg.endpoint,
            Duration::from_secs_f64(detection_cfg.request_timeout_secs),
            detection_cfg.jpeg_quality,
        );
        DetectionStage::new(detector, detection_cfg.display_threshold).run(&detect_ctx);
    })?;

    let annotator = match &config.transmit.font_path {
        Some(path) => Annotator::with_font_file(path).unwrap_or_else(|e| {
            warn!("⚠️  标签字体不可用,只绘制检测框: {}", e);
            Annotator::default()
        }),
        None => Annotator::default(),
    };
    let transmit_ctx = ctx.clone();
    let transmit_cfg = config.transmit.clone();
    workers.spawn("transmit", move || {
        TransmitStage::new(transmit_cfg.max_fps, transmit_cfg.jpeg_quality, annotator).run(&transmit_ctx);
    })?;

    let manager_ctx = ctx.clone();
    let manager = RecordingManager::new(
        config.detection.recording_threshold,
        config.recording.cooldown().max(Duration::from_secs(1)),
    );
    workers.spawn("recording", move || manager.run(&manager_ctx))?;

    if config.upload.enabled {
        let storage: Box<dyn StorageClient> = match &config.upload.endpoint {
            Some(endpoint) => Box::new(HttpStorage::new(
                endpoint.clone(),
                config.upload.auth_token.clone(),
                Duration::from_secs_f64(config.upload.request_timeout_secs),
            )),
            None => Box::new(LocalArchive::new(config.upload.archive_dir.clone())),
        };
        let transcoder: Option<Box<dyn Transcoder>> = config.upload.transcode.then(|| {
            Box::new(FfmpegTranscoder::new(config.upload.ffmpeg_path.clone(), config.capture.fps))
                as Box<dyn Transcoder>
        });
        let upload_ctx = ctx.clone();
        workers.spawn("uploader", move || {
            Uploader::new(storage, transcoder).run(
                &upload_ctx.uploads,
                &upload_ctx.shutdown,
                Duration::from_millis(200),
            );
        })?;
    }

    let poll = Duration::from_secs_f64(config.connection.poll_interval_secs);
    let connection_ctx = ctx.clone();
    let policy = BackoffPolicy::from_config(&config.connection);
    workers.spawn("connection", move || {
        ConnectionSupervisor::new(connection_ctx.transport.clone(), policy, poll)
            .run(&connection_ctx.shutdown);
    })?;

    let ingress_ctx = ctx.clone();
    workers.spawn("ingress", move || {
        CommandIngress::new(Duration::from_millis(100)).run(&ingress_ctx);
    })?;

    info!("✅ {}个工作线程已启动,按 Ctrl+C 退出", workers.len());

    // ========== 等待退出 ==========
    while ctx.is_running() {
        ctx.shutdown.sleep(Duration::from_millis(200));
    }

    info!("🛑 正在停止...");
    let stuck = workers.join_all(JOIN_TIMEOUT);
    if !stuck.is_empty() {
        error!("❌ {}个线程未能按时退出: {}", stuck.len(), stuck.join(", "));
    }
    recorder.finalize();
    if uploads.pending() > 0 {
        warn!("⚠️  {}个录像未上传,保留在本地", uploads.pending());
    }
    transport.disconnect();
    info!("👋 已退出");
    Ok(())
}
