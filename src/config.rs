//! 큐 제어 설정

use std::time::Duration;

use crate::{DEFAULT_MAX_QUEUE_PACKETS, DEFAULT_SAMPLE_INTERVAL_MS};

/// RLQ 큐 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 큐 최대 길이 (패킷 수)
    /// 초과 도착 패킷은 tail drop
    pub max_queue_packets: usize,

    /// 샘플링 주기 (밀리초)
    /// 패킷 이벤트가 없어도 이 주기로 스텝 통지
    pub sample_interval_ms: u64,

    /// 드롭 확률 미세 조정 폭 (액션 1, 2)
    pub small_step: f64,

    /// 드롭 확률 대폭 조정 폭 (액션 3, 4)
    pub large_step: f64,

    /// 초기 드롭 확률 (0.0 ~ 1.0)
    pub initial_drop_probability: f64,

    /// 지연 관측 정규화 기준 (밀리초)
    /// 이 값 이상의 지연은 관측값 1.0으로 포화
    pub delay_reference_ms: f64,

    /// 보상/소요시간 기록 윈도우 (샘플 수)
    pub stats_window_size: usize,

    /// 드롭 추첨용 RNG 시드 (None이면 엔트로피 시드)
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_queue_packets: DEFAULT_MAX_QUEUE_PACKETS,
            sample_interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            small_step: 0.01,                 // 액션 1/2
            large_step: 0.1,                  // 액션 3/4
            initial_drop_probability: 0.0,    // 드롭 없이 시작
            delay_reference_ms: 100.0,        // 10Mbps 병목에서 큐 가득 참 수준
            stats_window_size: 100,           // 샘플 100개 기준
            rng_seed: None,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 샘플링 주기를 Duration으로
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// 저지연 링크용 설정
    /// 얕은 큐와 빠른 샘플링으로 지연 변화에 민감하게 반응
    pub fn low_latency() -> Self {
        Self {
            max_queue_packets: 50,
            sample_interval_ms: 10,
            small_step: 0.01,
            large_step: 0.1,
            initial_drop_probability: 0.0,
            delay_reference_ms: 20.0,
            stats_window_size: 200,
            rng_seed: None,
        }
    }

    /// 깊은 버퍼용 설정 (bufferbloat 환경)
    pub fn deep_buffer() -> Self {
        Self {
            max_queue_packets: 500,
            sample_interval_ms: 20,
            small_step: 0.01,
            large_step: 0.1,
            initial_drop_probability: 0.0,
            delay_reference_ms: 500.0,
            stats_window_size: 100,
            rng_seed: None,
        }
    }

    /// 저속 링크용 설정
    /// 패킷 하나의 전송 시간이 길어 샘플링을 느리게, 조정 폭을 크게
    pub fn slow_link() -> Self {
        Self {
            max_queue_packets: 100,
            sample_interval_ms: 50,
            small_step: 0.02,
            large_step: 0.2,
            initial_drop_probability: 0.0,
            delay_reference_ms: 1000.0,
            stats_window_size: 50,
            rng_seed: None,
        }
    }
}
