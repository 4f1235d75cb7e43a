// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! Pelco-D 串口执行器
//!
//! 帧格式: `[0xFF, addr, cmd1, cmd2, data1, data2, checksum]`,
//! checksum = (addr + cmd1 + cmd2 + data1 + data2) mod 256。
//! data1 = 水平速度, data2 = 垂直速度 (0x00..=0x3F)。

use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

use super::Direction;
use crate::error::{Result, SentinelError};

pub const SYNC: u8 = 0xFF;
pub const MAX_SPEED: u8 = 0x3F;

const WRITE_TIMEOUT: Duration = Duration::from_millis(200);

/// 云台执行器: 开始朝某方向运动 / 停止
pub trait Actuator: Send {
    fn start_move(&mut self, direction: Direction, speed: u8) -> Result<()>;

    fn stop(&mut self) -> Result<()>;
}

/// 方向 → cmd2
pub fn command_byte(direction: Direction) -> u8 {
    match direction {
        Direction::Right => 0x02,
        Direction::Left => 0x04,
        Direction::Up => 0x08,
        Direction::Down => 0x10,
        Direction::UpLeft => 0x0C,
        Direction::UpRight => 0x0A,
        Direction::DownLeft => 0x14,
        Direction::DownRight => 0x12,
        Direction::Stop => 0x00,
    }
}

pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// 组装一帧 (不限制速度范围)
pub fn frame(address: u8, cmd1: u8, cmd2: u8, data1: u8, data2: u8) -> [u8; 7] {
    let body = [address, cmd1, cmd2, data1, data2];
    [SYNC, address, cmd1, cmd2, data1, data2, checksum(&body)]
}

/// 方向指令帧: 水平分量使用 data1, 垂直分量使用 data2
pub fn move_frame(address: u8, direction: Direction, speed: u8) -> [u8; 7] {
    let speed = speed.min(MAX_SPEED);
    let (pan, tilt) = match direction {
        Direction::Left | Direction::Right => (speed, 0),
        Direction::Up | Direction::Down => (0, speed),
        Direction::Stop => (0, 0),
        _ => (speed, speed),
    };
    frame(address, 0x00, command_byte(direction), pan, tilt)
}

pub fn stop_frame(address: u8) -> [u8; 7] {
    frame(address, 0x00, 0x00, 0x00, 0x00)
}

pub struct PelcoD<W: Write + Send> {
    port: W,
    address: u8,
}

impl<W: Write + Send> PelcoD<W> {
    pub fn new(port: W, address: u8) -> Self {
        Self { port, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn into_inner(self) -> W {
        self.port
    }

    fn write_frame(&mut self, frame: &[u8; 7]) -> Result<()> {
        debug!("PTZ帧: {:02X?}", frame);
        self.port
            .write_all(frame)
            .and_then(|_| self.port.flush())
            .map_err(|e| SentinelError::Actuator(format!("串口写入失败: {}", e)))
    }
}

impl<W: Write + Send> Actuator for PelcoD<W> {
    fn start_move(&mut self, direction: Direction, speed: u8) -> Result<()> {
        let frame = move_frame(self.address, direction, speed);
        self.write_frame(&frame)
    }

    fn stop(&mut self) -> Result<()> {
        let frame = stop_frame(self.address);
        self.write_frame(&frame)
    }
}

/// 打开串口 (8N1)
pub fn open_serial(
    device: &str,
    baud_rate: u32,
    address: u8,
) -> Result<PelcoD<Box<dyn serialport::SerialPort>>> {
    let port = serialport::new(device, baud_rate)
        .timeout(WRITE_TIMEOUT)
        .open()
        .map_err(|e| SentinelError::Actuator(format!("无法打开串口 {}: {}", device, e)))?;
    info!("🎛️  云台串口已打开: {} @ {} baud, 地址 {:#04x}", device, baud_rate, address);
    Ok(PelcoD::new(port, address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_wraps_modulo_256() {
        let f = frame(0x01, 0x00, 0x04, 0xFF, 0x00);
        assert_eq!(f, [0xFF, 0x01, 0x00, 0x04, 0xFF, 0x00, 0x04]);
    }

    #[test]
    fn stop_frame_is_all_zero_commands() {
        assert_eq!(stop_frame(0x01), [0xFF, 0x01, 0x00, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn move_frames_put_speed_on_the_right_axis() {
        assert_eq!(move_frame(1, Direction::Left, 0x20), [0xFF, 1, 0, 0x04, 0x20, 0, 0x25]);
        assert_eq!(move_frame(1, Direction::Down, 0x20), [0xFF, 1, 0, 0x10, 0, 0x20, 0x31]);
        // 超出范围的速度被限制到 0x3F
        assert_eq!(move_frame(1, Direction::UpRight, 0xFF)[4..6], [0x3F, 0x3F]);
    }

    #[test]
    fn writes_frames_to_the_port() {
        let mut pelco = PelcoD::new(Vec::new(), 0x02);
        pelco.start_move(Direction::Right, 0x10).unwrap();
        pelco.stop().unwrap();
        let written = pelco.into_inner();
        assert_eq!(written.len(), 14);
        assert_eq!(&written[..7], &[0xFF, 0x02, 0x00, 0x02, 0x10, 0x00, 0x14]);
        assert_eq!(&written[7..], &stop_frame(0x02));
    }
}
