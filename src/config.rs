// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 系统配置 - 通过JSON文件调整参数

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, SentinelError};

/// 采集参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub source_dir: PathBuf, // 图片目录 (循环播放)
    pub fps: f64,            // 采集帧率
    pub width: u32,          // 输出宽度 (0 = 保持原尺寸)
    pub height: u32,         // 输出高度 (0 = 保持原尺寸)
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("frames"),
            fps: 20.0,
            width: 640,
            height: 480,
        }
    }
}

/// 检测参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub endpoint: String,          // 推理服务地址
    pub detect_every: u32,         // 每N帧检测一次
    pub display_threshold: f32,    // 显示置信度阈值
    pub recording_threshold: f32,  // 录像/跟踪置信度阈值 (高于显示阈值)
    pub request_timeout_secs: f64, // 推理请求超时
    pub jpeg_quality: u8,          // 上传给推理服务的JPEG质量
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://127.0.0.1:8000/detect"),
            detect_every: 3,
            display_threshold: 0.25,
            recording_threshold: 0.6,
            request_timeout_secs: 2.0,
            jpeg_quality: 85,
        }
    }
}

/// 录像参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    pub output_dir: PathBuf,
    pub required_frames: u32,  // 连续高置信度帧数 K
    pub cooldown_secs: f64,    // 无检测多久后停止
    pub min_duration_secs: f64, // 最短录像时长
    pub jpeg_quality: u8,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            output_dir: default_data_dir().join("recordings"),
            required_frames: 3,
            cooldown_secs: 5.0,
            min_duration_secs: 3.0,
            jpeg_quality: 80,
        }
    }
}

impl RecordingConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }

    pub fn min_duration(&self) -> Duration {
        Duration::from_secs_f64(self.min_duration_secs)
    }
}

/// 云台参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PtzConfig {
    pub enabled: bool,
    pub serial_device: String,
    pub baud_rate: u32,
    pub address: u8,
    pub speed: u8,                   // 0x00..=0x3F
    pub pulse_secs: f64,             // 单次脉冲持续时间
    pub cooldown_secs: f64,          // 自动跟踪指令最小间隔
    pub tracked_class: u32,          // 跟踪目标类别 (0 = person)
}

impl Default for PtzConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            serial_device: String::from("/dev/ttyUSB0"),
            baud_rate: 9600,
            address: 0x01,
            speed: 0x20,
            pulse_secs: 0.2,
            cooldown_secs: 0.5,
            tracked_class: 0,
        }
    }
}

impl PtzConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_secs_f64(self.pulse_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }
}

/// 推流参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitConfig {
    pub max_fps: f64,
    pub jpeg_quality: u8,
    pub font_path: Option<PathBuf>, // 标签字体 (为空则只画框)
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            max_fps: 10.0,
            jpeg_quality: 70,
            font_path: None,
        }
    }
}

/// 连接参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub server_url: String,
    pub backoff_base_secs: f64,
    pub backoff_max_secs: f64,
    pub backoff_multiplier: f64,
    pub poll_interval_secs: f64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            server_url: String::from("ws://127.0.0.1:5000/ws"),
            backoff_base_secs: 1.0,
            backoff_max_secs: 30.0,
            backoff_multiplier: 2.0,
            poll_interval_secs: 1.0,
        }
    }
}

/// 上传参数
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub enabled: bool,
    /// HTTP PUT 基础地址; 为空时复制到 archive_dir
    pub endpoint: Option<String>,
    pub auth_token: Option<String>,
    pub archive_dir: PathBuf,
    pub transcode: bool,
    pub ffmpeg_path: String,
    pub request_timeout_secs: f64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            auth_token: None,
            archive_dir: default_data_dir().join("archive"),
            transcode: true,
            ffmpeg_path: String::from("ffmpeg"),
            request_timeout_secs: 60.0,
        }
    }
}

/// 数字卫兵完整配置
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    pub capture: CaptureConfig,
    pub detection: DetectionConfig,
    pub recording: RecordingConfig,
    pub ptz: PtzConfig,
    pub transmit: TransmitConfig,
    pub connection: ConnectionConfig,
    pub upload: UploadConfig,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("edge-sentinel")
}

/// 秒数字段必须能转换为 Duration (有限、非负、不溢出)
fn check_secs(field: &str, secs: f64, positive: bool) -> Result<()> {
    let ok = Duration::try_from_secs_f64(secs).is_ok() && (!positive || secs > 0.0);
    if ok {
        Ok(())
    } else if positive {
        Err(SentinelError::Config(format!("{} must be a finite value > 0", field)))
    } else {
        Err(SentinelError::Config(format!("{} must be a finite value >= 0", field)))
    }
}

impl SentinelConfig {
    /// 从JSON文件加载配置; 文件不存在时写入默认配置
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(json) => {
                let config: Self = serde_json::from_str(&json)?;
                info!("✅ 配置已从 {} 加载", path.display());
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("⚠️  默认配置写入失败: {}", e);
                }
                Ok(config)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 参数合法性检查
    pub fn validate(&self) -> Result<()> {
        let d = &self.detection;
        if d.detect_every == 0 {
            return Err(SentinelError::Config("detection.detect_every must be >= 1".into()));
        }
        if !(0.0..=1.0).contains(&d.display_threshold)
            || !(0.0..=1.0).contains(&d.recording_threshold)
        {
            return Err(SentinelError::Config("thresholds must be within [0, 1]".into()));
        }
        if d.recording_threshold < d.display_threshold {
            return Err(SentinelError::Config(
                "detection.recording_threshold must not be below display_threshold".into(),
            ));
        }
        if self.recording.required_frames == 0 {
            return Err(SentinelError::Config("recording.required_frames must be >= 1".into()));
        }
        check_secs("recording.cooldown_secs", self.recording.cooldown_secs, false)?;
        check_secs("recording.min_duration_secs", self.recording.min_duration_secs, false)?;
        check_secs("detection.request_timeout_secs", d.request_timeout_secs, true)?;
        check_secs("upload.request_timeout_secs", self.upload.request_timeout_secs, true)?;
        check_secs("ptz.pulse_secs", self.ptz.pulse_secs, true)?;
        check_secs("ptz.cooldown_secs", self.ptz.cooldown_secs, true)?;
        check_secs("connection.poll_interval_secs", self.connection.poll_interval_secs, true)?;
        check_secs("connection.backoff_base_secs", self.connection.backoff_base_secs, true)?;
        check_secs("connection.backoff_max_secs", self.connection.backoff_max_secs, true)?;
        if !(self.capture.fps > 0.0 && self.capture.fps.is_finite())
            || !(self.transmit.max_fps > 0.0 && self.transmit.max_fps.is_finite())
        {
            return Err(SentinelError::Config("frame rates must be finite and > 0".into()));
        }
        if self.ptz.speed > 0x3F {
            return Err(SentinelError::Config("ptz.speed must be <= 0x3F".into()));
        }
        let c = &self.connection;
        if c.backoff_max_secs < c.backoff_base_secs {
            return Err(SentinelError::Config("connection backoff range is invalid".into()));
        }
        if !(c.backoff_multiplier >= 1.0 && c.backoff_multiplier.is_finite()) {
            return Err(SentinelError::Config("connection.backoff_multiplier must be >= 1".into()));
        }
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前配置:");
        info!("  检测服务: {}", self.detection.endpoint);
        info!(
            "  检测间隔: 每{}帧 | 显示阈值 {:.2} | 录像阈值 {:.2}",
            self.detection.detect_every,
            self.detection.display_threshold,
            self.detection.recording_threshold
        );
        info!(
            "  录像: K={} | 冷却 {:.1}s | 最短 {:.1}s | 目录 {}",
            self.recording.required_frames,
            self.recording.cooldown_secs,
            self.recording.min_duration_secs,
            self.recording.output_dir.display()
        );
        info!(
            "  云台: {} | 设备 {} | 间隔 {:.1}s",
            if self.ptz.enabled { "启用" } else { "禁用" },
            self.ptz.serial_device,
            self.ptz.cooldown_secs
        );
        info!("  服务器: {}", self.connection.server_url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_is_valid() {
        let config = SentinelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recording.required_frames, 3);
        assert_eq!(config.ptz.cooldown(), Duration::from_millis(500));
    }

    #[test]
    fn rejects_recording_threshold_below_display() {
        let mut config = SentinelConfig::default();
        config.detection.recording_threshold = 0.1;
        assert!(matches!(config.validate(), Err(SentinelError::Config(_))));
    }

    #[test]
    fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        let config = SentinelConfig::load(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.detection.detect_every, 3);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        fs::write(&path, r#"{ "recording": { "cooldown_secs": 8.0 } }"#).unwrap();
        let config = SentinelConfig::load(&path).unwrap();
        assert_eq!(config.recording.cooldown_secs, 8.0);
        assert_eq!(config.recording.required_frames, 3);
        assert_eq!(config.transmit.max_fps, 10.0);
    }

    #[test]
    fn rejects_durations_that_cannot_become_timeouts() {
        let mut config = SentinelConfig::default();
        config.detection.request_timeout_secs = -1.0;
        assert!(matches!(config.validate(), Err(SentinelError::Config(m)) if m.contains("detection.request_timeout_secs")));

        let mut config = SentinelConfig::default();
        config.upload.request_timeout_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.ptz.pulse_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.connection.poll_interval_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = SentinelConfig::default();
        config.recording.cooldown_secs = 1e300;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_rejects_negative_timeout_in_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sentinel.json");
        fs::write(&path, r#"{ "detection": { "request_timeout_secs": -1 } }"#).unwrap();
        assert!(matches!(SentinelConfig::load(&path), Err(SentinelError::Config(_))));
    }
}
