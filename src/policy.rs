//! 드롭 정책 상태
//!
//! 정책이 영향을 줄 수 있는 유일한 상태: 드롭 확률
//! 액션은 확률을 증감시키고 [0,1]로 포화 클램프

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::ACTION_COUNT;

/// 이산 액션 {0..4}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum Action {
    /// 변경 없음
    Hold = 0,

    /// 드롭 확률 +small_step (기본 0.01)
    SmallIncrease = 1,

    /// 드롭 확률 -small_step
    SmallDecrease = 2,

    /// 드롭 확률 +large_step (기본 0.1)
    LargeIncrease = 3,

    /// 드롭 확률 -large_step
    LargeDecrease = 4,
}

impl Action {
    /// 인덱스에서 액션 변환
    ///
    /// 범위 밖 인덱스는 계약 위반: InvalidAction
    pub fn from_index(index: u32) -> Result<Self> {
        match index {
            0 => Ok(Action::Hold),
            1 => Ok(Action::SmallIncrease),
            2 => Ok(Action::SmallDecrease),
            3 => Ok(Action::LargeIncrease),
            4 => Ok(Action::LargeDecrease),
            _ => Err(Error::InvalidAction {
                action: index,
                max: ACTION_COUNT,
            }),
        }
    }

    /// 액션 인덱스
    pub fn index(&self) -> u32 {
        *self as u32
    }
}

/// 드롭 확률 상태
///
/// 큐 수명 동안 유지됨
#[derive(Debug, Clone)]
pub struct DropPolicyState {
    /// 현재 드롭 확률 (0.0 ~ 1.0)
    drop_probability: f64,

    /// 미세 조정 폭
    small_step: f64,

    /// 대폭 조정 폭
    large_step: f64,
}

impl DropPolicyState {
    /// 새 정책 상태 생성
    pub fn new(initial: f64, small_step: f64, large_step: f64) -> Self {
        Self {
            drop_probability: initial.clamp(0.0, 1.0),
            small_step,
            large_step,
        }
    }

    /// 액션 적용
    ///
    /// 포화 클램프: 1.0 초과/0.0 미만으로 절대 벗어나지 않음
    pub fn apply(&mut self, action: Action) {
        let previous = self.drop_probability;

        let next = match action {
            Action::Hold => previous,
            Action::SmallIncrease => previous + self.small_step,
            Action::SmallDecrease => previous - self.small_step,
            Action::LargeIncrease => previous + self.large_step,
            Action::LargeDecrease => previous - self.large_step,
        };

        // 조정 폭이 오염된 경우 이전 값 유지
        if !next.is_finite() {
            warn!("드롭 확률 갱신 결과가 비정상: {} -> {}", previous, next);
            return;
        }

        self.drop_probability = next.clamp(0.0, 1.0);
    }

    /// 현재 드롭 확률
    pub fn probability(&self) -> f64 {
        self.drop_probability
    }

    /// 초기 상태로 리셋
    pub fn reset(&mut self, initial: f64) {
        self.drop_probability = initial.clamp(0.0, 1.0);
    }
}
