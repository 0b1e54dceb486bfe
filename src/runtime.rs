//! 큐 런타임
//!
//! 큐 하나당 전용 스레드 하나가 컨트롤러를 독점 소유
//! 커맨드 채널과 샘플링 틱 채널을 select로 번갈아 처리
//! 정책은 스텝마다 액션으로 응답해야 루프가 전진함

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, select, unbounded, Sender};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::env::{EnvBridge, PolicyHandle};
use crate::error::{Error, Result};
use crate::link::LinkHandle;
use crate::packet::Packet;
use crate::queue::{EnqueueOutcome, QueueController};
use crate::sampler::SamplingScheduler;
use crate::stats::QueueStats;

/// 큐 스레드로 보내는 커맨드
pub enum QueueCommand {
    /// 패킷 admission
    Enqueue(Packet),

    /// 선두 패킷 service, 결과 회신
    Dequeue(Sender<Option<Packet>>),

    /// 큐 해체
    Shutdown,
}

/// 큐 런타임 핸들
///
/// drop 시 자동으로 해체 (브리지 done 스텝 포함)
pub struct QueueRuntime {
    /// 커맨드 송신
    cmd_tx: Sender<QueueCommand>,

    /// 통계 스냅샷 핸들
    stats: Arc<RwLock<QueueStats>>,

    /// 큐 스레드 핸들
    handle: Option<JoinHandle<()>>,
}

impl QueueRuntime {
    /// 큐 스레드 기동
    ///
    /// 반환된 PolicyHandle을 외부 정책(또는 전송 계층)에 넘긴다
    pub fn spawn(config: Config, link: LinkHandle) -> Result<(Self, PolicyHandle)> {
        let (bridge, policy_handle) = EnvBridge::new(&config);
        let scheduler = SamplingScheduler::from_config(&config);
        let mut controller = QueueController::new(config, link, bridge);
        let stats = controller.stats_handle();

        let (cmd_tx, cmd_rx) = unbounded::<QueueCommand>();
        let ticker = scheduler.ticker();

        let handle = std::thread::Builder::new()
            .name("rlq-queue".into())
            .spawn(move || {
                loop {
                    select! {
                        recv(cmd_rx) -> cmd => match cmd {
                            Ok(QueueCommand::Enqueue(packet)) => {
                                if controller.enqueue(packet) == EnqueueOutcome::TailDrop {
                                    debug!("tail drop 발생");
                                }
                            }
                            Ok(QueueCommand::Dequeue(reply)) => {
                                let _ = reply.send(controller.dequeue());
                            }
                            // Shutdown 또는 핸들 전부 drop → 해체
                            Ok(QueueCommand::Shutdown) | Err(_) => break,
                        },
                        recv(ticker) -> tick => match tick {
                            Ok(_) => controller.on_sample_tick(),
                            Err(_) => break,
                        },
                    }
                }

                controller.teardown();
                info!("큐 런타임 종료: {}", controller.stats().summary());
            })
            .map_err(Error::Io)?;

        let runtime = Self {
            cmd_tx,
            stats,
            handle: Some(handle),
        };
        Ok((runtime, policy_handle))
    }

    /// 패킷 admission 요청 (비동기: 결과는 통계로 확인)
    pub fn enqueue(&self, packet: Packet) -> Result<()> {
        self.cmd_tx
            .send(QueueCommand::Enqueue(packet))
            .map_err(|_| Error::ChannelError)
    }

    /// 선두 패킷 service 요청 (결과 대기)
    pub fn dequeue(&self) -> Result<Option<Packet>> {
        let (reply_tx, reply_rx) = bounded(1);
        self.cmd_tx
            .send(QueueCommand::Dequeue(reply_tx))
            .map_err(|_| Error::ChannelError)?;
        reply_rx.recv().map_err(|_| Error::ChannelError)
    }

    /// 통계 스냅샷
    pub fn stats(&self) -> QueueStats {
        self.stats.read().clone()
    }

    /// 큐 해체: done 스텝을 보낸 뒤 스레드 합류
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let _ = self.cmd_tx.send(QueueCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for QueueRuntime {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
