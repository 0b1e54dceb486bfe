//! 큐 메트릭 추정
//!
//! - 큐잉 지연: 현재 점유 바이트를 링크 용량으로 나눈 값
//! - 링크 사용률: 샘플링 주기 동안 서비스된 바이트의 비율 (주기마다 리셋)

use std::time::Duration;

use tracing::debug;

use crate::link::LinkHandle;

/// 지연/사용률 추정기
pub struct MetricEstimator {
    /// 부착된 링크
    link: LinkHandle,

    /// 마지막 샘플 이후 서비스된 바이트
    serviced_bytes: u64,

    /// 마지막 샘플링 시점의 사용률
    /// 틱 사이의 이벤트 갱신은 이 값을 재사용
    last_utilization: f64,
}

impl MetricEstimator {
    /// 새 추정기 생성
    pub fn new(link: LinkHandle) -> Self {
        Self {
            link,
            serviced_bytes: 0,
            last_utilization: 0.0,
        }
    }

    /// 큐잉 지연 계산 (초)
    ///
    /// delay = occupancy_bytes × 8 / capacity_bps
    /// 용량 미상/0이면 0 반환 (제어 루프는 멈추지 않음)
    pub fn queue_delay_secs(&self, occupancy_bytes: u64) -> f64 {
        match self.link.capacity_bps() {
            Some(capacity) if capacity > 0 => (occupancy_bytes as f64 * 8.0) / capacity as f64,
            _ => {
                debug!("링크 용량 미상: 지연 0으로 강등");
                0.0
            }
        }
    }

    /// 큐잉 지연 계산 (밀리초)
    pub fn queue_delay_ms(&self, occupancy_bytes: u64) -> f64 {
        self.queue_delay_secs(occupancy_bytes) * 1000.0
    }

    /// 서비스(dequeue)된 바이트 적립
    pub fn record_serviced(&mut self, bytes: usize) {
        self.serviced_bytes += bytes as u64;
    }

    /// 샘플링 틱: 주기 동안의 사용률 계산 후 적산기 리셋
    ///
    /// utilization = serviced_bytes × 8 / (capacity_bps × interval)
    /// [0,1]로 클램프. 누적이 아닌 비율이 되도록 매 주기 리셋
    pub fn sample_utilization(&mut self, interval: Duration) -> f64 {
        let serviced = std::mem::take(&mut self.serviced_bytes);

        let utilization = match self.link.capacity_bps() {
            Some(capacity) if capacity > 0 && !interval.is_zero() => {
                let capacity_bits = capacity as f64 * interval.as_secs_f64();
                ((serviced as f64 * 8.0) / capacity_bits).clamp(0.0, 1.0)
            }
            _ => 0.0,
        };

        self.last_utilization = utilization;
        utilization
    }

    /// 마지막 샘플링 시점의 사용률
    pub fn utilization(&self) -> f64 {
        self.last_utilization
    }
}
