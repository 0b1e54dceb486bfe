//! 보상 모델
//!
//! reward = (utilization² − 0.5) + (2 / (1 + delay_ms/5) − 1.5)
//! 사용률이 높을수록, 지연이 낮을수록 보상이 큼

use tracing::error;

use crate::error::{Error, Result};

/// (사용률, 지연) → 스칼라 보상
#[derive(Debug, Clone, Default)]
pub struct RewardModel;

impl RewardModel {
    /// 새 보상 모델
    pub fn new() -> Self {
        Self
    }

    /// 보상 계산. NaN/∞이면 에러
    fn try_compute(&self, utilization: f64, delay_ms: f64) -> Result<f64> {
        let reward = (utilization.powi(2) - 0.5) + (2.0 / (1.0 + delay_ms / 5.0) - 1.5);
        if reward.is_finite() {
            Ok(reward)
        } else {
            Err(Error::NonFiniteReward {
                utilization,
                delay_ms,
            })
        }
    }

    /// 보상 계산
    ///
    /// 비정상 값(잘못 설정된 링크의 음수 지연 등)은 0으로 대체하고 보고만 함
    /// 제어 루프를 멈추는 것보다 강등이 우선
    pub fn compute(&self, utilization: f64, delay_ms: f64) -> f64 {
        match self.try_compute(utilization, delay_ms) {
            Ok(reward) => reward,
            Err(e) => {
                error!("보상 계산 실패, 0으로 대체: {}", e);
                0.0
            }
        }
    }
}
