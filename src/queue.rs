//! 큐 컨트롤러
//!
//! - admission: 현재 드롭 확률로 추첨 후 FIFO 삽입
//! - service: FIFO 선두 제거, 서비스 바이트 적립
//! - 큐를 바꾸는 모든 이벤트 후 상태 갱신 경로 실행 (메트릭 → 브리지 → 스텝)

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use crate::config::Config;
use crate::env::{EnvBridge, Environment};
use crate::error::Error;
use crate::link::LinkHandle;
use crate::metrics::MetricEstimator;
use crate::packet::Packet;
use crate::stats::QueueStats;

/// admission 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// FIFO에 삽입됨
    Enqueued,

    /// 드롭 확률 추첨으로 거부
    PolicyDrop,

    /// 큐 가득 참으로 거부
    TailDrop,
}

/// RL 제어 큐 디시플린
///
/// QueueState를 독점 소유하며 큐 스레드에서만 접근
pub struct QueueController {
    /// 설정
    config: Config,

    /// FIFO 패킷 시퀀스
    queue: VecDeque<Packet>,

    /// 점유 바이트
    occupancy_bytes: u64,

    /// 메트릭 추정기
    metrics: MetricEstimator,

    /// 환경 브리지 (큐 인스턴스별 소유)
    bridge: EnvBridge,

    /// 통계 (스냅샷 공유용)
    stats: Arc<RwLock<QueueStats>>,

    /// 드롭 추첨용 RNG
    rng: StdRng,
}

impl QueueController {
    /// 새 큐 컨트롤러 생성
    ///
    /// 링크 용량과 브리지는 생성 시점에 주입 (런타임 탐색 없음)
    pub fn new(config: Config, link: LinkHandle, bridge: EnvBridge) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let stats = Arc::new(RwLock::new(QueueStats::new(config.stats_window_size)));

        Self {
            metrics: MetricEstimator::new(link),
            queue: VecDeque::with_capacity(config.max_queue_packets.min(1024)),
            occupancy_bytes: 0,
            bridge,
            stats,
            rng,
            config,
        }
    }

    /// 통계 스냅샷 핸들
    pub fn stats_handle(&self) -> Arc<RwLock<QueueStats>> {
        self.stats.clone()
    }

    /// admission: 삽입 전에 드롭 추첨
    ///
    /// 추첨값 ≤ 드롭 확률이면 정책 드롭, 큐가 가득이면 tail drop
    /// 어느 결과든 상태 갱신 경로를 실행
    pub fn enqueue(&mut self, packet: Packet) -> EnqueueOutcome {
        let probability = self.bridge.drop_probability();
        let draw: f64 = self.rng.gen();

        let outcome = if probability > 0.0 && draw <= probability {
            self.stats.write().record_policy_drop();
            debug!("정책 드롭: p={:.3}, draw={:.3}", probability, draw);
            EnqueueOutcome::PolicyDrop
        } else if self.queue.len() >= self.config.max_queue_packets {
            self.stats.write().record_tail_drop();
            debug!("tail drop: 큐 길이 {}", self.queue.len());
            EnqueueOutcome::TailDrop
        } else {
            self.occupancy_bytes += packet.len as u64;
            self.stats.write().record_enqueue(packet.len);
            self.queue.push_back(packet);
            EnqueueOutcome::Enqueued
        };

        self.refresh();
        outcome
    }

    /// service: FIFO 선두 제거
    ///
    /// 빈 큐는 에러가 아니라 None
    pub fn dequeue(&mut self) -> Option<Packet> {
        let packet = self.queue.pop_front();

        if let Some(ref packet) = packet {
            self.occupancy_bytes -= packet.len as u64;
            self.metrics.record_serviced(packet.len);
            self.stats.write().record_dequeue(packet.len, packet.sojourn());
        }

        self.refresh();
        packet
    }

    /// 선두 패킷 열람 (상태 갱신 없음)
    pub fn peek(&self) -> Option<&Packet> {
        self.queue.front()
    }

    /// 샘플링 틱: 사용률 갱신 후 상태 갱신 경로 실행
    ///
    /// 패킷 이벤트가 없어도 정책은 이 경로로 스텝을 받음
    pub fn on_sample_tick(&mut self) {
        self.metrics.sample_utilization(self.config.sample_interval());
        self.refresh();
    }

    /// 상태 갱신 경로: 메트릭 재계산 → 브리지 발행 → 제어 스텝
    ///
    /// 잘못된 액션은 스텝 거부로 기록하고 계속 진행
    /// 끊긴 정책 채널은 통지만 중단 (큐는 계속 동작)
    fn refresh(&mut self) {
        if self.bridge.is_terminal() {
            return;
        }

        let delay_ms = self.metrics.queue_delay_ms(self.occupancy_bytes);
        let utilization = self.metrics.utilization();
        self.bridge.publish_state(delay_ms, utilization);

        match self.bridge.step() {
            Ok(_) => {
                self.stats.write().record_step(self.bridge.reward());
            }
            Err(Error::InvalidAction { action, .. }) => {
                self.stats.write().record_rejected_step();
                warn!("스텝 거부: 액션 {}", action);
            }
            Err(Error::BridgeClosed) => {
                warn!("정책 채널 종료: 이후 스텝 통지 중단");
            }
            Err(e) => {
                warn!("스텝 실패: {}", e);
            }
        }
    }

    /// 큐 해체: 브리지를 닫아 대기 중인 정책을 깨움
    pub fn teardown(&mut self) {
        self.bridge.close();
    }

    /// 현재 점유 (패킷 수, 바이트)
    pub fn occupancy(&self) -> (usize, u64) {
        (self.queue.len(), self.occupancy_bytes)
    }

    /// 큐 길이
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// 큐 비어 있는지
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// 현재 드롭 확률
    pub fn drop_probability(&self) -> f64 {
        self.bridge.drop_probability()
    }

    /// 통계 복사
    pub fn stats(&self) -> QueueStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::PolicyHandle;
    use crate::link::StaticLink;
    use crate::policy::Action;

    fn controller_with(
        config: Config,
        capacity_mbps: f64,
    ) -> (QueueController, PolicyHandle) {
        let (bridge, handle) = EnvBridge::new(&config);
        let link = Arc::new(StaticLink::from_mbps(capacity_mbps));
        (QueueController::new(config, link, bridge), handle)
    }

    fn seeded_config() -> Config {
        Config {
            rng_seed: Some(42),
            ..Config::default()
        }
    }

    /// 스텝마다 블로킹하므로 액션을 미리 채워둔다
    fn preload_actions(handle: &PolicyHandle, action: Action, count: usize) {
        for _ in 0..count {
            handle.send_action(action.index()).unwrap();
        }
    }

    #[test]
    fn test_enqueue_accepted_when_probability_zero() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 1);

        let outcome = controller.enqueue(Packet::with_len(1, 1000));
        assert_eq!(outcome, EnqueueOutcome::Enqueued);
        assert_eq!(controller.occupancy(), (1, 1000));

        // 스텝이 통지되었는지 확인
        let event = handle.try_recv_step().unwrap();
        assert_eq!(event.seq, 1);
    }

    #[test]
    fn test_enqueue_dropped_when_probability_one() {
        let config = Config {
            initial_drop_probability: 1.0,
            ..seeded_config()
        };
        let (mut controller, handle) = controller_with(config, 10.0);
        preload_actions(&handle, Action::Hold, 1);

        let outcome = controller.enqueue(Packet::with_len(1, 1000));
        assert_eq!(outcome, EnqueueOutcome::PolicyDrop);
        assert!(controller.is_empty());
        assert_eq!(controller.stats().policy_drops, 1);
    }

    #[test]
    fn test_tail_drop_at_capacity() {
        let config = Config {
            max_queue_packets: 2,
            ..seeded_config()
        };
        let (mut controller, handle) = controller_with(config, 10.0);
        preload_actions(&handle, Action::Hold, 3);

        assert_eq!(controller.enqueue(Packet::with_len(1, 100)), EnqueueOutcome::Enqueued);
        assert_eq!(controller.enqueue(Packet::with_len(2, 100)), EnqueueOutcome::Enqueued);
        assert_eq!(controller.enqueue(Packet::with_len(3, 100)), EnqueueOutcome::TailDrop);
        assert_eq!(controller.stats().tail_drops, 1);
        assert_eq!(controller.occupancy(), (2, 200));
    }

    #[test]
    fn test_empty_dequeue_reports_zero_metrics() {
        // 빈 큐 + 10Mbps: dequeue는 None, 지연 0, 사용률 0
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 1);

        assert!(controller.dequeue().is_none());

        let event = handle.try_recv_step().unwrap();
        assert_eq!(event.observation.queue_delay, 0.0);
        assert_eq!(event.observation.link_utilization, 0.0);
    }

    #[test]
    fn test_enqueue_delay_observation() {
        // 1000바이트 @ 1Mbps = 8ms → 기준 100ms 정규화 0.08
        let (mut controller, handle) = controller_with(seeded_config(), 1.0);
        preload_actions(&handle, Action::Hold, 1);

        controller.enqueue(Packet::with_len(1, 1000));

        let event = handle.try_recv_step().unwrap();
        assert!((event.observation.queue_delay - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_fifo_order() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 5);

        controller.enqueue(Packet::with_len(1, 100));
        controller.enqueue(Packet::with_len(2, 100));
        controller.enqueue(Packet::with_len(3, 100));

        assert_eq!(controller.dequeue().unwrap().id, 1);
        assert_eq!(controller.dequeue().unwrap().id, 2);
        assert_eq!(controller.occupancy(), (1, 100));
    }

    #[test]
    fn test_peek_is_idempotent() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 1);

        controller.enqueue(Packet::with_len(1, 500));
        while handle.try_recv_step().is_some() {}

        // peek은 몇 번을 해도 점유/스텝에 영향 없음
        for _ in 0..10 {
            assert_eq!(controller.peek().unwrap().id, 1);
        }
        assert_eq!(controller.occupancy(), (1, 500));
        assert!(handle.try_recv_step().is_none());
    }

    #[test]
    fn test_rejected_step_keeps_probability() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);

        // 액션 7: 스텝 거부, 드롭 확률 유지
        handle.send_action(7).unwrap();
        controller.enqueue(Packet::with_len(1, 100));

        assert_eq!(controller.drop_probability(), 0.0);
        assert_eq!(controller.stats().rejected_steps, 1);
        assert_eq!(controller.stats().steps, 0);
    }

    #[test]
    fn test_action_updates_admission_probability() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);

        // +0.1 두 번 → 0.2
        preload_actions(&handle, Action::LargeIncrease, 2);
        controller.enqueue(Packet::with_len(1, 100));
        controller.enqueue(Packet::with_len(2, 100));

        assert!((controller.drop_probability() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_queue_survives_policy_disconnect() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        drop(handle);

        // 채널이 끊겨도 admission/service는 계속 동작
        assert_eq!(controller.enqueue(Packet::with_len(1, 100)), EnqueueOutcome::Enqueued);
        assert_eq!(controller.dequeue().unwrap().id, 1);
    }

    #[test]
    fn test_sample_tick_notifies_idle_queue() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 2);

        controller.on_sample_tick();
        controller.on_sample_tick();

        assert_eq!(handle.try_recv_step().unwrap().seq, 1);
        assert_eq!(handle.try_recv_step().unwrap().seq, 2);
        assert_eq!(controller.stats().steps, 2);
    }

    #[test]
    fn test_utilization_reflects_serviced_bytes() {
        // 10Mbps, 20ms 주기 = 25,000바이트가 100%
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        preload_actions(&handle, Action::Hold, 4);

        controller.enqueue(Packet::with_len(1, 12_500));
        controller.dequeue();
        controller.on_sample_tick();

        while let Some(event) = handle.try_recv_step() {
            if event.seq == 3 {
                assert!((event.observation.link_utilization - 0.5).abs() < 1e-9);
                return;
            }
        }
        panic!("틱 스텝이 통지되지 않음");
    }

    #[test]
    fn test_teardown_sends_done() {
        let (mut controller, handle) = controller_with(seeded_config(), 10.0);
        controller.teardown();

        let event = handle.try_recv_step().unwrap();
        assert!(event.done);
    }

    #[test]
    fn test_empirical_drop_rate_converges() {
        // p=0.3, 시드 고정: 경험적 드롭률이 p로 수렴
        let config = Config {
            initial_drop_probability: 0.3,
            max_queue_packets: usize::MAX,
            ..seeded_config()
        };
        let (mut controller, handle) = controller_with(config, 10.0);

        let attempts = 10_000;
        preload_actions(&handle, Action::Hold, attempts);
        for i in 0..attempts {
            controller.enqueue(Packet::with_len(i as u64, 100));
        }

        let rate = controller.stats().policy_drop_rate();
        assert!(
            (rate - 0.3).abs() < 0.02,
            "드롭률 {}이 0.3에서 벗어남",
            rate
        );
    }
}
