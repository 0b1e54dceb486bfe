//! 샘플링 스케줄러
//!
//! 고정 주기 타이머. 패킷 도착과 무관하게 상태 갱신 경로를 강제해
//! 유휴 큐에서도 정책이 제한 시간 내에 스텝을 받도록 보장
//! 매 발화 후 무조건 재무장, 취소는 큐 해체 시에만

use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;

use crate::config::Config;
use crate::DEFAULT_SAMPLE_INTERVAL_MS;

/// 고정 주기 샘플링 스케줄러
#[derive(Debug, Clone)]
pub struct SamplingScheduler {
    /// 발화 주기
    period: Duration,

    /// 다음 발화 시각 (시뮬레이션 시간 기준)
    next_fire: Duration,
}

impl SamplingScheduler {
    /// 새 스케줄러 생성
    ///
    /// 0 주기는 기본값으로 대체 (타이머가 멈추면 안 됨)
    pub fn new(period: Duration) -> Self {
        let period = if period.is_zero() {
            Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS)
        } else {
            period
        };

        Self {
            period,
            next_fire: period,
        }
    }

    /// 설정에서 생성
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sample_interval())
    }

    /// 발화 주기
    pub fn period(&self) -> Duration {
        self.period
    }

    /// 다음 발화 시각
    pub fn next_fire(&self) -> Duration {
        self.next_fire
    }

    /// 시뮬레이션 시간 폴링: 경과한 발화 횟수 반환
    ///
    /// 이산 이벤트 타임라인이 건너뛴 발화도 빠짐없이 세고,
    /// 재무장은 무조건 수행
    pub fn poll(&mut self, now: Duration) -> u32 {
        let mut fires = 0;
        while now >= self.next_fire {
            fires += 1;
            self.next_fire += self.period;
        }
        fires
    }

    /// 실시간 구동용 틱 채널
    ///
    /// 채널을 drop하면 타이머 취소
    pub fn ticker(&self) -> Receiver<Instant> {
        crossbeam_channel::tick(self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fire_at_period() {
        let mut scheduler = SamplingScheduler::new(Duration::from_millis(20));
        assert_eq!(scheduler.poll(Duration::from_millis(19)), 0);
        assert_eq!(scheduler.poll(Duration::from_millis(20)), 1);
    }

    #[test]
    fn test_rearms_unconditionally() {
        let mut scheduler = SamplingScheduler::new(Duration::from_millis(20));
        scheduler.poll(Duration::from_millis(20));
        assert_eq!(scheduler.next_fire(), Duration::from_millis(40));

        scheduler.poll(Duration::from_millis(40));
        assert_eq!(scheduler.next_fire(), Duration::from_millis(60));
    }

    #[test]
    fn test_late_poll_counts_missed_fires() {
        // 100ms 경과 = 20ms 발화 5회
        let mut scheduler = SamplingScheduler::new(Duration::from_millis(20));
        assert_eq!(scheduler.poll(Duration::from_millis(100)), 5);
        assert_eq!(scheduler.next_fire(), Duration::from_millis(120));
    }

    #[test]
    fn test_zero_period_falls_back_to_default() {
        let scheduler = SamplingScheduler::new(Duration::ZERO);
        assert_eq!(
            scheduler.period(),
            Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS)
        );
    }
}
