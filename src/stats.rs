//! 큐 통계

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// 큐별 통계
///
/// 큐 스레드가 기록하고, 스냅샷은 런타임 핸들로 복사해 읽음
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 수락된 패킷 수
    pub enqueued_packets: u64,

    /// 수락된 바이트
    pub enqueued_bytes: u64,

    /// 서비스된 패킷 수
    pub dequeued_packets: u64,

    /// 서비스된 바이트
    pub dequeued_bytes: u64,

    /// 정책 드롭 수 (드롭 확률 추첨)
    pub policy_drops: u64,

    /// tail drop 수 (큐 가득 참)
    pub tail_drops: u64,

    /// 통지된 스텝 수
    pub steps: u64,

    /// 거부된 스텝 수 (잘못된 액션)
    pub rejected_steps: u64,

    /// 최근 보상 기록
    rewards: VecDeque<f64>,

    /// 최근 큐 소요시간 기록 (마이크로초)
    sojourns_us: VecDeque<u64>,

    /// 윈도우 크기
    window_size: usize,
}

impl QueueStats {
    pub fn new(window_size: usize) -> Self {
        Self {
            start_time: Instant::now(),
            enqueued_packets: 0,
            enqueued_bytes: 0,
            dequeued_packets: 0,
            dequeued_bytes: 0,
            policy_drops: 0,
            tail_drops: 0,
            steps: 0,
            rejected_steps: 0,
            rewards: VecDeque::with_capacity(window_size),
            sojourns_us: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// 수락 기록
    pub fn record_enqueue(&mut self, bytes: usize) {
        self.enqueued_packets += 1;
        self.enqueued_bytes += bytes as u64;
    }

    /// 정책 드롭 기록
    pub fn record_policy_drop(&mut self) {
        self.policy_drops += 1;
    }

    /// tail drop 기록
    pub fn record_tail_drop(&mut self) {
        self.tail_drops += 1;
    }

    /// 서비스 기록
    pub fn record_dequeue(&mut self, bytes: usize, sojourn: Duration) {
        self.dequeued_packets += 1;
        self.dequeued_bytes += bytes as u64;

        if self.sojourns_us.len() >= self.window_size {
            self.sojourns_us.pop_front();
        }
        self.sojourns_us.push_back(sojourn.as_micros() as u64);
    }

    /// 스텝 기록
    pub fn record_step(&mut self, reward: f64) {
        self.steps += 1;

        if self.rewards.len() >= self.window_size {
            self.rewards.pop_front();
        }
        self.rewards.push_back(reward);
    }

    /// 거부된 스텝 기록
    pub fn record_rejected_step(&mut self) {
        self.rejected_steps += 1;
    }

    /// 총 도착 패킷 수 (수락 + 드롭)
    pub fn total_arrivals(&self) -> u64 {
        self.enqueued_packets + self.policy_drops + self.tail_drops
    }

    /// 경험적 정책 드롭률
    pub fn policy_drop_rate(&self) -> f64 {
        let arrivals = self.total_arrivals();
        if arrivals == 0 {
            return 0.0;
        }
        self.policy_drops as f64 / arrivals as f64
    }

    /// 최근 평균 보상
    pub fn average_reward(&self) -> Option<f64> {
        if self.rewards.is_empty() {
            return None;
        }
        Some(self.rewards.iter().sum::<f64>() / self.rewards.len() as f64)
    }

    /// 최근 평균 소요시간 (마이크로초)
    pub fn average_sojourn_us(&self) -> Option<u64> {
        if self.sojourns_us.is_empty() {
            return None;
        }
        Some(self.sojourns_us.iter().sum::<u64>() / self.sojourns_us.len() as u64)
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | In: {} pkts | Out: {} pkts | Drops: {} policy + {} tail ({:.2}%) | Steps: {} ({} rejected) | Reward: {:.3}",
            self.elapsed().as_secs_f64(),
            self.enqueued_packets,
            self.dequeued_packets,
            self.policy_drops,
            self.tail_drops,
            self.policy_drop_rate() * 100.0,
            self.steps,
            self.rejected_steps,
            self.average_reward().unwrap_or(0.0),
        )
    }

    /// 통계 리셋
    pub fn reset(&mut self) {
        *self = Self::new(self.window_size);
    }
}

impl Default for QueueStats {
    fn default() -> Self {
        Self::new(100)
    }
}
