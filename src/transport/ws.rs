// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! WebSocket 传输实现
//!
//! 每个连接由一个独立的 I/O 线程独占socket:
//! - 发送: 事件序列化后进入有界队列,调用方不等待socket
//! - 接收: I/O 线程用很短的读超时轮询,入站事件经通道交给指令线程

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use super::events::{InboundEvent, OutboundEvent};
use super::Transport;
use crate::error::{Result, SentinelError};

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// I/O 线程的读超时 (也是发送的最大排队延迟)
const IO_POLL: Duration = Duration::from_millis(5);
/// 写超时, 防止半开连接卡住 I/O 线程
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);
/// 待发送事件上限, 满了直接报错丢弃
const OUTBOUND_CAPACITY: usize = 32;

/// 一次连接的 I/O 线程及其通道
struct Session {
    outbound: Sender<String>,
    inbound: Receiver<InboundEvent>,
    alive: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Session {
    fn shutdown(self) {
        self.alive.store(false, Ordering::SeqCst);
        drop(self.outbound);
        if self.handle.join().is_err() {
            warn!("⚠️  WebSocket I/O 线程panic");
        }
    }
}

pub struct WsTransport {
    url: String,
    session: Mutex<Option<Session>>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// 只在通道操作期间持锁,从不跨越socket读写
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn configure_stream(stream: &MaybeTlsStream<TcpStream>) -> std::io::Result<()> {
    let tcp = match stream {
        MaybeTlsStream::Plain(s) => s,
        MaybeTlsStream::Rustls(s) => s.get_ref(),
        _ => return Ok(()),
    };
    tcp.set_read_timeout(Some(IO_POLL))?;
    tcp.set_write_timeout(Some(WRITE_TIMEOUT))?;
    tcp.set_nodelay(true)
}

/// I/O 线程: 先写空发送队列,再做一次短超时读取
fn io_loop(
    mut socket: Socket,
    outbound: Receiver<String>,
    inbound: Sender<InboundEvent>,
    alive: Arc<AtomicBool>,
) {
    'io: while alive.load(Ordering::SeqCst) {
        loop {
            match outbound.try_recv() {
                Ok(text) => {
                    if let Err(e) = socket.send(Message::Text(text)) {
                        warn!("⚠️  发送失败,断开连接: {}", e);
                        break 'io;
                    }
                }
                Err(crossbeam_channel::TryRecvError::Empty) => break,
                Err(crossbeam_channel::TryRecvError::Disconnected) => break 'io,
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundEvent>(&text) {
                Ok(event) => {
                    // 接收端只在传输对象销毁时消失
                    let _ = inbound.send(event);
                }
                Err(e) => warn!("⚠️  无法解析的入站事件 ({}): {}", e, text),
            },
            Ok(Message::Close(frame)) => {
                info!("🔌 服务器关闭连接: {:?}", frame);
                break 'io;
            }
            // ping/pong 由 tungstenite 自动处理
            Ok(_) => {}
            Err(tungstenite::Error::Io(e))
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                ) => {}
            Err(e) => {
                warn!("⚠️  读取失败,断开连接: {}", e);
                break 'io;
            }
        }
    }

    alive.store(false, Ordering::SeqCst);
    // 尽力发送关闭帧,失败无所谓
    let _ = socket.close(None);
    let _ = socket.flush();
    debug!("WebSocket I/O 线程退出");
}

impl Transport for WsTransport {
    fn connect(&self) -> Result<()> {
        let (socket, response) = tungstenite::connect(self.url.as_str())?;
        configure_stream(socket.get_ref())?;

        let (outbound_tx, outbound_rx) = bounded(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = unbounded();
        let alive = Arc::new(AtomicBool::new(true));
        let io_alive = alive.clone();
        let handle = std::thread::Builder::new()
            .name("ws-io".into())
            .spawn(move || io_loop(socket, outbound_rx, inbound_tx, io_alive))?;

        let previous = self.lock().replace(Session {
            outbound: outbound_tx,
            inbound: inbound_rx,
            alive,
            handle,
        });
        if let Some(old) = previous {
            old.shutdown();
        }
        info!(status = %response.status(), "🔗 已连接到 {}", self.url);
        Ok(())
    }

    fn disconnect(&self) {
        let session = self.lock().take();
        if let Some(session) = session {
            session.shutdown();
        }
    }

    fn is_connected(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|s| s.alive.load(Ordering::SeqCst))
    }

    fn send(&self, event: &OutboundEvent) -> Result<()> {
        let text = serde_json::to_string(event)?;
        let guard = self.lock();
        let session = guard
            .as_ref()
            .filter(|s| s.alive.load(Ordering::SeqCst))
            .ok_or(SentinelError::NotConnected)?;
        match session.outbound.try_send(text) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(SentinelError::Transport(format!(
                "发送队列已满,丢弃 {}",
                event.name()
            ))),
            Err(TrySendError::Disconnected(_)) => Err(SentinelError::NotConnected),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<InboundEvent>> {
        let (inbound, alive) = {
            let guard = self.lock();
            let session = guard.as_ref().ok_or(SentinelError::NotConnected)?;
            (session.inbound.clone(), session.alive.clone())
        };
        match inbound.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) if alive.load(Ordering::SeqCst) => Ok(None),
            Err(_) => Err(SentinelError::NotConnected),
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}
