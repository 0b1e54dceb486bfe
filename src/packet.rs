//! 패킷 정의
//!
//! 컨트롤러는 페이로드를 들여다보지 않는다
//! 바이트 길이만 admission/지연 계산에 사용

use std::time::Instant;

use bytes::Bytes;

/// 패킷 ID (64비트)
pub type PacketId = u64;

/// 큐에 들어가는 패킷 단위
#[derive(Debug, Clone)]
pub struct Packet {
    /// 패킷 ID
    pub id: PacketId,

    /// 바이트 길이
    /// 페이로드 없는 패킷도 길이는 유효해야 함
    pub len: usize,

    /// 불투명 페이로드
    pub payload: Bytes,

    /// 도착 시각 (소요시간 통계용)
    pub arrived_at: Instant,
}

impl Packet {
    /// 길이만 지정한 패킷 생성 (시뮬레이션용)
    pub fn with_len(id: PacketId, len: usize) -> Self {
        Self {
            id,
            len,
            payload: Bytes::new(),
            arrived_at: Instant::now(),
        }
    }

    /// 페이로드에서 패킷 생성
    pub fn from_payload(id: PacketId, payload: Bytes) -> Self {
        Self {
            id,
            len: payload.len(),
            payload,
            arrived_at: Instant::now(),
        }
    }

    /// 큐 내 소요시간
    pub fn sojourn(&self) -> std::time::Duration {
        self.arrived_at.elapsed()
    }
}
