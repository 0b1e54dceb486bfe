//! 에러 타입 정의

use thiserror::Error;

/// RLQ 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("유효하지 않은 매직 넘버: expected {expected:08X}, got {got:08X}")]
    InvalidMagicNumber { expected: u32, got: u32 },

    #[error("유효하지 않은 프로토콜 버전: expected {expected}, got {got}")]
    InvalidVersion { expected: u8, got: u8 },

    #[error("CRC 불일치: expected {expected:08X}, got {got:08X}")]
    CrcMismatch { expected: u32, got: u32 },

    #[error("잘린 프레임: expected {expected} bytes, got {got}")]
    TruncatedFrame { expected: usize, got: usize },

    #[error("유효하지 않은 액션 인덱스: {action} (허용 범위 0..{max})")]
    InvalidAction { action: u32, max: u32 },

    #[error("비정상 보상값: utilization={utilization}, delay_ms={delay_ms}")]
    NonFiniteReward { utilization: f64, delay_ms: f64 },

    #[error("정책 채널 종료")]
    BridgeClosed,

    #[error("채널 에러")]
    ChannelError,

    #[error("메시지 타입 불일치: expected {expected}, got {got}")]
    MessageTypeMismatch { expected: String, got: String },
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
