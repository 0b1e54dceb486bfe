//! RLQ 시뮬레이션 드라이버
//!
//! 병목 링크 큐 + 합성 트래픽 + 내장 정책으로 제어 루프 전체를 구동
//! - 도착: 고정 속도 합성 트래픽 (패킷/초)
//! - 서비스: 링크 용량에 맞춰 페이싱된 dequeue
//! - 정책: PI 휴리스틱 또는 무작위 (외부 RL 정책 자리)
//!
//! 사용법:
//!   cargo run --release --bin rlq-sim -- [OPTIONS]
//!
//! 예시:
//!   # 10Mbps 병목, 1500pps 도착
//!   cargo run --release --bin rlq-sim -- --rate 10 --pps 1500
//!
//!   # 무작위 정책, 30초 실행
//!   cargo run --release --bin rlq-sim -- --policy random --duration 30

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use rlq::{Config, Packet, PolicyHandle, QueueRuntime, StaticLink};

/// 시뮬레이션 설정
struct SimConfig {
    /// 병목 링크 용량 (Mbps)
    rate_mbps: f64,

    /// 패킷 크기 (바이트)
    packet_size: usize,

    /// 도착 속도 (패킷/초)
    arrival_pps: u64,

    /// 실행 시간 (초)
    duration_secs: u64,

    /// 내장 정책 종류
    policy: PolicyKind,

    /// RNG 시드
    seed: Option<u64>,

    /// 큐 설정
    config: Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PolicyKind {
    /// PI 컨트롤러 휴리스틱
    Pi,

    /// 무작위 액션
    Random,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rate_mbps: 10.0,
            packet_size: 1000,
            arrival_pps: 1500,
            duration_secs: 10,
            policy: PolicyKind::Pi,
            seed: None,
            config: Config::default(),
        }
    }
}

fn parse_args() -> SimConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut sim = SimConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rate" | "-r" => {
                if i + 1 < args.len() {
                    sim.rate_mbps = args[i + 1].parse().expect("유효한 Mbps 필요");
                    i += 1;
                }
            }
            "--packet-size" | "-p" => {
                if i + 1 < args.len() {
                    sim.packet_size = args[i + 1].parse().expect("유효한 바이트 수 필요");
                    i += 1;
                }
            }
            "--pps" => {
                if i + 1 < args.len() {
                    sim.arrival_pps = args[i + 1].parse().expect("유효한 pps 필요");
                    i += 1;
                }
            }
            "--duration" | "-d" => {
                if i + 1 < args.len() {
                    sim.duration_secs = args[i + 1].parse().expect("유효한 초 필요");
                    i += 1;
                }
            }
            "--interval" => {
                if i + 1 < args.len() {
                    sim.config.sample_interval_ms =
                        args[i + 1].parse().expect("유효한 밀리초 필요");
                    i += 1;
                }
            }
            "--policy" => {
                if i + 1 < args.len() {
                    sim.policy = match args[i + 1].as_str() {
                        "pi" => PolicyKind::Pi,
                        "random" => PolicyKind::Random,
                        other => panic!("알 수 없는 정책: {}", other),
                    };
                    i += 1;
                }
            }
            "--seed" => {
                if i + 1 < args.len() {
                    let seed: u64 = args[i + 1].parse().expect("유효한 시드 필요");
                    sim.seed = Some(seed);
                    sim.config.rng_seed = Some(seed);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => {
                eprintln!("알 수 없는 옵션: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    sim
}

fn print_usage() {
    println!("RLQ 시뮬레이션 드라이버");
    println!();
    println!("옵션:");
    println!("  --rate, -r <MBPS>        병목 링크 용량 (기본 10)");
    println!("  --packet-size, -p <B>    패킷 크기 (기본 1000)");
    println!("  --pps <N>                도착 속도 패킷/초 (기본 1500)");
    println!("  --duration, -d <SEC>     실행 시간 (기본 10)");
    println!("  --interval <MS>          샘플링 주기 (기본 20)");
    println!("  --policy <pi|random>     내장 정책 (기본 pi)");
    println!("  --seed <N>               RNG 시드");
}

/// PI 휴리스틱 정책
///
/// 지연이 목표를 넘으면 드롭 확률을 올리고, 낮으면 내림
struct PiPolicy {
    /// 목표 지연 (정규화 관측값 기준)
    target: f64,

    /// 비례 이득
    alpha: f64,

    /// 미분 이득
    beta: f64,

    /// 직전 관측 지연
    delay_old: f64,
}

impl PiPolicy {
    fn new() -> Self {
        Self {
            target: 0.15, // 기준 100ms에서 15ms
            alpha: 0.125,
            beta: 1.25,
            delay_old: 0.0,
        }
    }

    /// 관측에서 액션 인덱스 결정
    fn decide(&mut self, delay: f64) -> u32 {
        let control = self.alpha * (delay - self.target) + self.beta * (delay - self.delay_old);
        self.delay_old = delay;

        if control > 0.05 {
            3 // +0.1
        } else if control > 0.005 {
            1 // +0.01
        } else if control < -0.05 {
            4 // -0.1
        } else if control < -0.005 {
            2 // -0.01
        } else {
            0
        }
    }
}

/// 정책 스레드: 스텝을 받아 액션으로 응답
fn run_policy(handle: PolicyHandle, kind: PolicyKind, seed: Option<u64>) -> u64 {
    let mut pi = PiPolicy::new();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut steps = 0u64;

    loop {
        let event = match handle.recv_step() {
            Ok(event) => event,
            Err(_) => break,
        };

        if event.done {
            info!("에피소드 종료 신호 수신 (총 {} 스텝)", event.seq);
            break;
        }

        steps += 1;
        let action = match kind {
            PolicyKind::Pi => pi.decide(event.observation.queue_delay),
            PolicyKind::Random => rng.gen_range(0..rlq::ACTION_COUNT),
        };

        if handle.send_action(action).is_err() {
            warn!("액션 송신 실패: 큐가 이미 종료됨");
            break;
        }
    }

    steps
}

fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("로깅 초기화 실패");

    let sim = parse_args();
    info!(
        "RLQ 시뮬레이션 시작: {}Mbps, {}B 패킷, {}pps, {}초, 정책 {:?}",
        sim.rate_mbps, sim.packet_size, sim.arrival_pps, sim.duration_secs, sim.policy
    );

    let link = Arc::new(StaticLink::from_mbps(sim.rate_mbps));
    let (runtime, policy_handle) =
        QueueRuntime::spawn(sim.config.clone(), link).expect("큐 런타임 기동 실패");
    let runtime = Arc::new(runtime);

    let running = Arc::new(AtomicBool::new(true));
    let next_packet_id = Arc::new(AtomicU64::new(1));

    // 정책 스레드
    let policy_kind = sim.policy;
    let policy_seed = sim.seed;
    let policy_thread =
        std::thread::spawn(move || run_policy(policy_handle, policy_kind, policy_seed));

    // 도착 스레드: 고정 속도 합성 트래픽
    let arrival_runtime = runtime.clone();
    let arrival_running = running.clone();
    let arrival_interval = Duration::from_secs_f64(1.0 / sim.arrival_pps as f64);
    let packet_size = sim.packet_size;
    let arrival_ids = next_packet_id.clone();
    let arrival_thread = std::thread::spawn(move || {
        while arrival_running.load(Ordering::Relaxed) {
            let id = arrival_ids.fetch_add(1, Ordering::Relaxed);
            if arrival_runtime
                .enqueue(Packet::with_len(id, packet_size))
                .is_err()
            {
                break;
            }
            std::thread::sleep(arrival_interval);
        }
    });

    // 서비스 스레드: 링크 용량에 맞춰 페이싱
    let service_runtime = runtime.clone();
    let service_running = running.clone();
    let capacity_bps = sim.rate_mbps * 1_000_000.0;
    let service_thread = std::thread::spawn(move || {
        while service_running.load(Ordering::Relaxed) {
            match service_runtime.dequeue() {
                Ok(Some(packet)) => {
                    // 패킷 전송 시간만큼 대기
                    let tx_time = packet.len as f64 * 8.0 / capacity_bps;
                    std::thread::sleep(Duration::from_secs_f64(tx_time));
                }
                Ok(None) => std::thread::sleep(Duration::from_millis(1)),
                Err(_) => break,
            }
        }
    });

    // 1초마다 통계 출력
    let deadline = Instant::now() + Duration::from_secs(sim.duration_secs);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_secs(1));
        info!("{}", runtime.stats().summary());
    }

    // 종료: 트래픽 정지 → 큐 해체 → 정책 합류
    running.store(false, Ordering::Relaxed);
    let _ = arrival_thread.join();
    let _ = service_thread.join();

    let final_stats = runtime.stats();
    drop(runtime); // 해체: done 스텝 송신

    let policy_steps = policy_thread.join().unwrap_or(0);
    info!("최종: {}", final_stats.summary());
    info!("정책이 처리한 스텝: {}", policy_steps);
}
