//! 정책 채널 메시지 정의
//!
//! 관측/액션/보상/에피소드 종료가 프로세스 경계를 넘을 때 쓰는 프레임
//! 전송 계층 자체는 외부 협력자이며 여기서는 인코딩만 정의

use serde::{Deserialize, Serialize};

use crate::env::{ActionSpace, ObservationSpace, StepEvent};
use crate::error::{Error, Result};
use crate::{MAGIC_NUMBER, OBSERVATION_DIM, PROTOCOL_VERSION};

/// 메시지 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// 연결 초기화 (정책 → 큐)
    Hello = 1,

    /// 연결 초기화 응답: 공간 서술자 광고 (큐 → 정책)
    HelloAck = 2,

    /// 스텝 통지: 관측 + 보상 + 종료 신호 (큐 → 정책)
    Step = 3,

    /// 액션 (정책 → 큐)
    Action = 4,

    /// 연결 종료
    Close = 5,
}

/// 메시지 헤더
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageHeader {
    /// 매직 넘버
    pub magic: u32,

    /// 프로토콜 버전
    pub version: u8,

    /// 메시지 타입
    pub msg_type: MessageType,

    /// 페이로드 길이 (헤더 제외)
    pub payload_len: u32,

    /// 페이로드 CRC32
    pub crc32: u32,
}

impl MessageHeader {
    pub fn new(msg_type: MessageType, payload: &[u8]) -> Self {
        Self {
            magic: MAGIC_NUMBER,
            version: PROTOCOL_VERSION,
            msg_type,
            payload_len: payload.len() as u32,
            crc32: crc32fast::hash(payload),
        }
    }
}

/// 헤더 + 페이로드로 프레임 조립
fn encode_frame(msg_type: MessageType, payload: Vec<u8>) -> Vec<u8> {
    let header = MessageHeader::new(msg_type, &payload);
    let header_bytes = bincode::serialize(&header).unwrap_or_default();

    let mut buf = Vec::with_capacity(header_bytes.len() + payload.len());
    buf.extend_from_slice(&header_bytes);
    buf.extend_from_slice(&payload);
    buf
}

/// 프레임 분해: 헤더 검증 후 페이로드 슬라이스 반환
///
/// 매직/버전/CRC가 어긋나면 해당 에러로 거부
fn decode_frame(bytes: &[u8]) -> Result<(MessageHeader, &[u8])> {
    // bincode는 앞에서부터 읽으므로 헤더 먼저 파싱
    let header: MessageHeader = bincode::deserialize(bytes)?;

    if header.magic != MAGIC_NUMBER {
        return Err(Error::InvalidMagicNumber {
            expected: MAGIC_NUMBER,
            got: header.magic,
        });
    }
    if header.version != PROTOCOL_VERSION {
        return Err(Error::InvalidVersion {
            expected: PROTOCOL_VERSION,
            got: header.version,
        });
    }

    // 헤더를 재직렬화해서 실제 크기 확인
    let header_size = bincode::serialize(&header)?.len();
    let end = header_size + header.payload_len as usize;
    if bytes.len() < end {
        return Err(Error::TruncatedFrame {
            expected: end,
            got: bytes.len(),
        });
    }

    let payload = &bytes[header_size..end];
    let crc = crc32fast::hash(payload);
    if crc != header.crc32 {
        return Err(Error::CrcMismatch {
            expected: header.crc32,
            got: crc,
        });
    }

    Ok((header, payload))
}

fn expect_type(header: &MessageHeader, expected: MessageType) -> Result<()> {
    if header.msg_type != expected {
        return Err(Error::MessageTypeMismatch {
            expected: format!("{:?}", expected),
            got: format!("{:?}", header.msg_type),
        });
    }
    Ok(())
}

/// 연결 초기화 메시지 (정책 → 큐)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloMessage {
    /// 정책측 프로토콜 버전
    pub protocol_version: u8,

    /// 대상 큐 ID
    pub queue_id: u64,

    /// 타임스탬프 (microseconds since epoch)
    pub timestamp_us: u64,
}

impl HelloMessage {
    pub fn new(queue_id: u64) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            queue_id,
            timestamp_us: timestamp_us(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(
            MessageType::Hello,
            bincode::serialize(self).unwrap_or_default(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = decode_frame(bytes)?;
        expect_type(&header, MessageType::Hello)?;
        Ok(bincode::deserialize(payload)?)
    }
}

/// 연결 초기화 응답 (큐 → 정책)
///
/// 관측/액션 공간과 샘플링 주기를 광고
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloAckMessage {
    /// 큐측 프로토콜 버전
    pub protocol_version: u8,

    /// 큐 ID
    pub queue_id: u64,

    /// 관측 공간 서술자
    pub observation_space: ObservationSpace,

    /// 액션 공간 서술자
    pub action_space: ActionSpace,

    /// 샘플링 주기 (밀리초)
    pub sample_interval_ms: u64,
}

impl HelloAckMessage {
    pub fn new(
        queue_id: u64,
        observation_space: ObservationSpace,
        action_space: ActionSpace,
        sample_interval_ms: u64,
    ) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            queue_id,
            observation_space,
            action_space,
            sample_interval_ms,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(
            MessageType::HelloAck,
            bincode::serialize(self).unwrap_or_default(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = decode_frame(bytes)?;
        expect_type(&header, MessageType::HelloAck)?;
        Ok(bincode::deserialize(payload)?)
    }
}

/// 스텝 메시지 (큐 → 정책)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepMessage {
    /// 큐 ID
    pub queue_id: u64,

    /// 스텝 일련번호
    pub seq: u64,

    /// 관측 ⟨지연, 사용률, 드롭확률⟩
    pub observation: [f32; OBSERVATION_DIM],

    /// 보상
    pub reward: f32,

    /// 에피소드 종료 신호
    pub done: bool,

    /// 타임스탬프 (microseconds since epoch)
    pub timestamp_us: u64,
}

impl StepMessage {
    /// 스텝 이벤트에서 생성
    pub fn from_event(queue_id: u64, event: &StepEvent) -> Self {
        Self {
            queue_id,
            seq: event.seq,
            observation: event.observation.to_f32_array(),
            reward: event.reward as f32,
            done: event.done,
            timestamp_us: timestamp_us(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(
            MessageType::Step,
            bincode::serialize(self).unwrap_or_default(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = decode_frame(bytes)?;
        expect_type(&header, MessageType::Step)?;
        Ok(bincode::deserialize(payload)?)
    }
}

/// 액션 메시지 (정책 → 큐)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMessage {
    /// 큐 ID
    pub queue_id: u64,

    /// 응답 대상 스텝 일련번호
    pub seq: u64,

    /// 액션 인덱스 (0..5)
    pub action: u32,
}

impl ActionMessage {
    pub fn new(queue_id: u64, seq: u64, action: u32) -> Self {
        Self {
            queue_id,
            seq,
            action,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_frame(
            MessageType::Action,
            bincode::serialize(self).unwrap_or_default(),
        )
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = decode_frame(bytes)?;
        expect_type(&header, MessageType::Action)?;
        Ok(bincode::deserialize(payload)?)
    }
}

/// 통합 메시지 enum
#[derive(Debug, Clone)]
pub enum Message {
    Hello(HelloMessage),
    HelloAck(HelloAckMessage),
    Step(StepMessage),
    Action(ActionMessage),
    Close,
}

impl Message {
    /// 메시지 타입 반환
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::Hello(_) => MessageType::Hello,
            Message::HelloAck(_) => MessageType::HelloAck,
            Message::Step(_) => MessageType::Step,
            Message::Action(_) => MessageType::Action,
            Message::Close => MessageType::Close,
        }
    }

    /// 프레임으로 인코딩
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Message::Hello(m) => m.to_bytes(),
            Message::HelloAck(m) => m.to_bytes(),
            Message::Step(m) => m.to_bytes(),
            Message::Action(m) => m.to_bytes(),
            Message::Close => encode_frame(MessageType::Close, Vec::new()),
        }
    }

    /// 프레임에서 디코딩
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (header, payload) = decode_frame(bytes)?;
        match header.msg_type {
            MessageType::Hello => Ok(Message::Hello(bincode::deserialize(payload)?)),
            MessageType::HelloAck => Ok(Message::HelloAck(bincode::deserialize(payload)?)),
            MessageType::Step => Ok(Message::Step(bincode::deserialize(payload)?)),
            MessageType::Action => Ok(Message::Action(bincode::deserialize(payload)?)),
            MessageType::Close => Ok(Message::Close),
        }
    }
}

/// 현재 시각 (microseconds since epoch)
fn timestamp_us() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
