//! # RLQ (Reinforcement Learning Queue)
//!
//! 강화학습 정책이 드롭 확률을 제어하는 AQM 큐 디시플린 코어
//!
//! ## 핵심 특징
//! - **확률적 드롭**: 고정 공식 대신 외부 정책이 조정하는 드롭 확률로 admission 결정
//! - **Gym 계약**: 관측 ⟨지연, 사용률, 드롭확률⟩ / 이산 액션 5종 / 스칼라 보상
//! - **고정 주기 샘플링**: 패킷 이벤트와 무관하게 20ms마다 상태 갱신 및 스텝 통지
//! - **단일 스레드 제어 루프**: 큐 상태는 큐 스레드가 독점 소유, 락 없음
//! - **우아한 성능 저하**: 용량 미상/잘못된 액션에도 제어 루프는 멈추지 않음
//! - **큐 다중화**: 병목 링크당 큐 하나, 큐 간 공유 상태 없음

pub mod config;
pub mod env;
pub mod error;
pub mod link;
pub mod message;
pub mod metrics;
pub mod packet;
pub mod policy;
pub mod queue;
pub mod reward;
pub mod runtime;
pub mod sampler;
pub mod stats;

pub use config::Config;
pub use env::{
    ActionSpace, EnvBridge, Environment, Observation, ObservationSpace, PolicyHandle, StepEvent,
};
pub use error::{Error, Result};
pub use link::{DetachedLink, LinkAttachment, StaticLink};
pub use message::{ActionMessage, HelloAckMessage, HelloMessage, Message, StepMessage};
pub use metrics::MetricEstimator;
pub use packet::{Packet, PacketId};
pub use policy::{Action, DropPolicyState};
pub use queue::{EnqueueOutcome, QueueController};
pub use reward::RewardModel;
pub use runtime::{QueueCommand, QueueRuntime};
pub use sampler::SamplingScheduler;
pub use stats::QueueStats;

/// 프로토콜 버전
pub const PROTOCOL_VERSION: u8 = 1;

/// 매직 넘버 (프레임 식별용)
pub const MAGIC_NUMBER: u32 = 0x524C5150; // "RLQP"

/// 관측 벡터 차원 ⟨지연, 사용률, 드롭확률⟩
pub const OBSERVATION_DIM: usize = 3;

/// 이산 액션 수 {유지, ±0.01, ±0.1}
pub const ACTION_COUNT: u32 = 5;

/// 기본 샘플링 주기 (밀리초)
pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 20;

/// 기본 큐 최대 길이 (패킷 수)
pub const DEFAULT_MAX_QUEUE_PACKETS: usize = 100;
