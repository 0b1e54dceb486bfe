//! 환경 브리지
//!
//! 큐 상태를 gym 스타일 계약으로 외부 정책에 노출
//! - Observe: 관측 ⟨지연, 사용률, 드롭확률⟩ 직렬화 + 스텝 통지
//! - Act: 액션 인덱스 검증 후 드롭 확률에 반영
//! 두 단계 사이에서 큐의 타임라인은 정지 (유일한 블로킹 지점)
//!
//! 브리지는 큐 인스턴스마다 명시적으로 소유됨 (전역 싱글턴 없음)

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::policy::{Action, DropPolicyState};
use crate::reward::RewardModel;
use crate::{ACTION_COUNT, OBSERVATION_DIM};

/// 관측 벡터
///
/// 각 값은 [0,1] 정규화, 요청마다 새로 생성되는 값 객체
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// 정규화된 큐잉 지연
    pub queue_delay: f64,

    /// 링크 사용률
    pub link_utilization: f64,

    /// 현재 드롭 확률
    pub drop_probability: f64,
}

impl Observation {
    /// 고정 순서 배열로 변환 ⟨지연, 사용률, 드롭확률⟩
    pub fn to_array(&self) -> [f64; OBSERVATION_DIM] {
        [self.queue_delay, self.link_utilization, self.drop_probability]
    }

    /// 전송용 f32 배열
    pub fn to_f32_array(&self) -> [f32; OBSERVATION_DIM] {
        [
            self.queue_delay as f32,
            self.link_utilization as f32,
            self.drop_probability as f32,
        ]
    }
}

/// 관측 공간 서술자 (box [0,1]^3)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpace {
    /// 하한
    pub low: f32,

    /// 상한
    pub high: f32,

    /// 형상
    pub shape: Vec<u32>,
}

/// 액션 공간 서술자 (discrete n)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    /// 이산 액션 수
    pub n: u32,
}

/// 정책에 전달되는 스텝 이벤트
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepEvent {
    /// 스텝 일련번호
    pub seq: u64,

    /// 현재 관측
    pub observation: Observation,

    /// 현재 보상
    pub reward: f64,

    /// 에피소드 종료 신호 (큐 해체 시에만 true)
    pub done: bool,
}

/// gym 스타일 환경 계약
///
/// 다섯 개의 가상 훅 대신 네 메서드 하나의 인터페이스로 통합
pub trait Environment {
    /// 현재 관측 (요청마다 새로 생성)
    fn observe(&self) -> Observation;

    /// 액션 인덱스 검증 후 적용
    fn act(&mut self, action_index: u32) -> Result<Action>;

    /// 현재 보상
    fn reward(&self) -> f64;

    /// 에피소드 종료 여부 (해체 전까지 항상 false)
    fn is_terminal(&self) -> bool;
}

/// 정책측 핸들
///
/// 스텝 수신 + 액션 송신. 외부 전송 계층이 이 핸들을 감싼다
pub struct PolicyHandle {
    /// 스텝 이벤트 수신
    step_rx: Receiver<StepEvent>,

    /// 액션 인덱스 송신
    action_tx: Sender<u32>,
}

impl PolicyHandle {
    /// 다음 스텝 대기 (블로킹)
    pub fn recv_step(&self) -> Result<StepEvent> {
        self.step_rx.recv().map_err(|_| Error::BridgeClosed)
    }

    /// 타임아웃 포함 스텝 대기
    pub fn recv_step_timeout(&self, timeout: std::time::Duration) -> Result<StepEvent> {
        self.step_rx
            .recv_timeout(timeout)
            .map_err(|_| Error::BridgeClosed)
    }

    /// 대기 없이 스텝 확인
    pub fn try_recv_step(&self) -> Option<StepEvent> {
        self.step_rx.try_recv().ok()
    }

    /// 액션 송신
    pub fn send_action(&self, action_index: u32) -> Result<()> {
        self.action_tx
            .send(action_index)
            .map_err(|_| Error::BridgeClosed)
    }
}

/// 환경 브리지
///
/// 큐 컨트롤러가 소유하며 정책 채널과 드롭 정책 상태를 관리
pub struct EnvBridge {
    /// 지연 정규화 기준 (밀리초)
    delay_reference_ms: f64,

    /// 마지막 발행된 지연 (밀리초, 원시값)
    delay_ms: f64,

    /// 마지막 발행된 사용률
    utilization: f64,

    /// 드롭 정책 상태 (정책이 영향 주는 유일한 상태)
    policy: DropPolicyState,

    /// 보상 모델
    reward_model: RewardModel,

    /// 현재 보상
    reward: f64,

    /// 스텝 이벤트 송신
    step_tx: Sender<StepEvent>,

    /// 액션 수신
    action_rx: Receiver<u32>,

    /// 스텝 일련번호
    steps: u64,

    /// 에피소드 종료 플래그
    terminal: bool,
}

impl EnvBridge {
    /// 브리지와 정책 핸들 쌍 생성
    pub fn new(config: &Config) -> (Self, PolicyHandle) {
        let (step_tx, step_rx) = unbounded();
        let (action_tx, action_rx) = unbounded();

        let bridge = Self {
            delay_reference_ms: config.delay_reference_ms,
            delay_ms: 0.0,
            utilization: 0.0,
            policy: DropPolicyState::new(
                config.initial_drop_probability,
                config.small_step,
                config.large_step,
            ),
            reward_model: RewardModel::new(),
            reward: 0.0,
            step_tx,
            action_rx,
            steps: 0,
            terminal: false,
        };

        let handle = PolicyHandle { step_rx, action_tx };
        (bridge, handle)
    }

    /// 관측 공간 서술자
    pub fn observation_space() -> ObservationSpace {
        ObservationSpace {
            low: 0.0,
            high: 1.0,
            shape: vec![OBSERVATION_DIM as u32],
        }
    }

    /// 액션 공간 서술자
    pub fn action_space() -> ActionSpace {
        ActionSpace { n: ACTION_COUNT }
    }

    /// 새 큐 상태 발행
    ///
    /// 관측 원시값을 갱신하고 보상을 재계산
    pub fn publish_state(&mut self, delay_ms: f64, utilization: f64) {
        self.delay_ms = delay_ms;
        self.utilization = utilization;
        self.reward = self.reward_model.compute(utilization, delay_ms);
    }

    /// 현재 드롭 확률
    pub fn drop_probability(&self) -> f64 {
        self.policy.probability()
    }

    /// 지금까지 통지된 스텝 수
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// 한 제어 스텝 수행: Observe → Act
    ///
    /// 스텝 이벤트를 보내고 정책의 액션이 도착할 때까지 블로킹
    /// 잘못된 액션이면 스텝 거부 (드롭 확률 유지), 채널이 끊기면 터미널 전환
    pub fn step(&mut self) -> Result<Action> {
        if self.terminal {
            return Err(Error::BridgeClosed);
        }

        self.steps += 1;
        let event = StepEvent {
            seq: self.steps,
            observation: self.observe(),
            reward: self.reward,
            done: false,
        };

        if self.step_tx.send(event).is_err() {
            self.terminal = true;
            return Err(Error::BridgeClosed);
        }

        // 유일한 블로킹 지점: 정책 응답 대기
        let action_index = match self.action_rx.recv() {
            Ok(index) => index,
            Err(_) => {
                self.terminal = true;
                return Err(Error::BridgeClosed);
            }
        };

        self.act(action_index)
    }

    /// 큐 해체: 마지막 done 스텝을 보내 대기 중인 정책을 깨움
    pub fn close(&mut self) {
        if self.terminal {
            return;
        }
        self.terminal = true;

        let event = StepEvent {
            seq: self.steps + 1,
            observation: self.observe(),
            reward: self.reward,
            done: true,
        };
        // 정책이 이미 떠났으면 무시
        let _ = self.step_tx.send(event);
        debug!("브리지 종료, 총 {} 스텝", self.steps);
    }
}

impl Environment for EnvBridge {
    fn observe(&self) -> Observation {
        let queue_delay = if self.delay_reference_ms > 0.0 {
            (self.delay_ms / self.delay_reference_ms).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Observation {
            queue_delay,
            link_utilization: self.utilization.clamp(0.0, 1.0),
            drop_probability: self.policy.probability(),
        }
    }

    fn act(&mut self, action_index: u32) -> Result<Action> {
        let action = match Action::from_index(action_index) {
            Ok(action) => action,
            Err(e) => {
                // 스텝 거부: 이전 드롭 확률 유지
                warn!("액션 거부: {}", e);
                return Err(e);
            }
        };

        self.policy.apply(action);
        Ok(action)
    }

    fn reward(&self) -> f64 {
        self.reward
    }

    fn is_terminal(&self) -> bool {
        self.terminal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_pair() -> (EnvBridge, PolicyHandle) {
        EnvBridge::new(&Config::default())
    }

    #[test]
    fn test_spaces() {
        let obs_space = EnvBridge::observation_space();
        assert_eq!(obs_space.shape, vec![3]);
        assert_eq!(obs_space.low, 0.0);
        assert_eq!(obs_space.high, 1.0);
        assert_eq!(EnvBridge::action_space().n, 5);
    }

    #[test]
    fn test_observation_normalization() {
        // 기준 100ms에서 50ms → 0.5
        let (mut bridge, _handle) = bridge_pair();
        bridge.publish_state(50.0, 0.25);

        let obs = bridge.observe();
        assert!((obs.queue_delay - 0.5).abs() < 1e-12);
        assert!((obs.link_utilization - 0.25).abs() < 1e-12);
        assert_eq!(obs.drop_probability, 0.0);
    }

    #[test]
    fn test_observation_delay_saturates() {
        let (mut bridge, _handle) = bridge_pair();
        bridge.publish_state(5000.0, 0.0);
        assert_eq!(bridge.observe().queue_delay, 1.0);
    }

    #[test]
    fn test_step_applies_action() {
        let (mut bridge, handle) = bridge_pair();
        bridge.publish_state(0.0, 1.0);

        // 액션 3 = +0.1
        handle.send_action(3).unwrap();
        let action = bridge.step().unwrap();
        assert_eq!(action, Action::LargeIncrease);
        assert!((bridge.drop_probability() - 0.1).abs() < 1e-12);

        // 발행된 스텝 이벤트 확인
        let event = handle.recv_step().unwrap();
        assert_eq!(event.seq, 1);
        assert!(!event.done);
        assert!((event.reward - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_action_rejects_step() {
        // 액션 7: 스텝 거부, 드롭 확률 유지, 보상 그대로
        let (mut bridge, handle) = bridge_pair();
        bridge.publish_state(10.0, 0.5);
        let reward_before = bridge.reward();

        handle.send_action(7).unwrap();
        let err = bridge.step().unwrap_err();
        assert!(matches!(err, Error::InvalidAction { action: 7, .. }));
        assert_eq!(bridge.drop_probability(), 0.0);
        assert_eq!(bridge.reward(), reward_before);
        assert!(!bridge.is_terminal());
    }

    #[test]
    fn test_policy_handle_dropped() {
        let (mut bridge, handle) = bridge_pair();
        drop(handle);

        let err = bridge.step().unwrap_err();
        assert!(matches!(err, Error::BridgeClosed));
        assert!(bridge.is_terminal());
    }

    #[test]
    fn test_close_sends_done_event() {
        let (mut bridge, handle) = bridge_pair();
        bridge.close();

        let event = handle.recv_step().unwrap();
        assert!(event.done);
        assert!(bridge.is_terminal());

        // 종료 후 스텝은 거부
        assert!(matches!(bridge.step().unwrap_err(), Error::BridgeClosed));
    }

    #[test]
    fn test_observation_is_fresh_value_object() {
        let (mut bridge, handle) = bridge_pair();
        bridge.publish_state(30.0, 0.6);

        let first = bridge.observe();
        let second = bridge.observe();
        assert_eq!(first, second);

        // 액션이 확률을 바꾸면 다음 관측에 반영
        handle.send_action(1).unwrap();
        bridge.step().unwrap();
        assert!((bridge.observe().drop_probability - 0.01).abs() < 1e-12);
    }
}
