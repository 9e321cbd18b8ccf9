//! トラッキング結果の外部送信（OSC over UDP）。
//!
//! フレームごとに1人1バンドルを送る。バンドルには関節ごとに
//! `/kicass/body/<tracking_id>/<JointName>` のメッセージが入る。
//! 引数: tracking_state(0=NotTracked, 1=Inferred, 2=Tracked), x, y, z（カメラ空間, メートル）

use anyhow::{Context, Result};
use rosc::{encoder, OscBundle, OscMessage, OscPacket, OscTime, OscType};
use std::net::UdpSocket;

use crate::config::OscConfig;
use crate::pose::{Body, Joint, JointType, TrackingState};

pub const ADDRESS_PREFIX: &str = "/kicass/body";

/// トラッキング済みの人物を受け取る送信先
pub trait BodySink {
    fn send_body(&mut self, body: &Body) -> Result<()>;
}

impl<T: BodySink + ?Sized> BodySink for &mut T {
    fn send_body(&mut self, body: &Body) -> Result<()> {
        (**self).send_body(body)
    }
}

/// 何も送らない
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl BodySink for NoopSink {
    fn send_body(&mut self, _body: &Body) -> Result<()> {
        Ok(())
    }
}

impl<T: BodySink> BodySink for Option<T> {
    fn send_body(&mut self, body: &Body) -> Result<()> {
        match self {
            Some(sink) => sink.send_body(body),
            None => Ok(()),
        }
    }
}

fn tracking_state_code(state: TrackingState) -> i32 {
    match state {
        TrackingState::NotTracked => 0,
        TrackingState::Inferred => 1,
        TrackingState::Tracked => 2,
    }
}

/// 関節1つ分のOSCメッセージを構築
pub fn build_joint_message(tracking_id: u64, joint: &Joint) -> OscMessage {
    OscMessage {
        addr: format!("{}/{}/{}", ADDRESS_PREFIX, tracking_id, joint.joint_type.name()),
        args: vec![
            OscType::Int(tracking_state_code(joint.tracking_state)),
            OscType::Float(joint.position.x),
            OscType::Float(joint.position.y),
            OscType::Float(joint.position.z),
        ],
    }
}

/// 1人分のバンドルを構築。`joints` が Some ならその関節だけ入れる。
pub fn build_body_bundle(body: &Body, joints: Option<&[JointType]>) -> OscBundle {
    let content = body
        .joints
        .values()
        .filter(|j| joints.map_or(true, |filter| filter.contains(&j.joint_type)))
        .map(|j| OscPacket::Message(build_joint_message(body.tracking_id, j)))
        .collect();
    OscBundle {
        // 即時実行
        timetag: OscTime::from((0, 1)),
        content,
    }
}

/// OSCパケットをバイト列にエンコード
pub fn encode_packet(packet: &OscPacket) -> Result<Vec<u8>> {
    let encoded = encoder::encode(packet)?;
    Ok(encoded)
}

/// 複数の宛先へ送るOSC送信クライアント
pub struct OscSender {
    socket: UdpSocket,
    targets: Vec<String>,
    joints: Option<Vec<JointType>>,
}

impl OscSender {
    pub fn new(targets: Vec<String>, joints: Option<Vec<JointType>>) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").context("failed to bind OSC socket")?;
        Ok(Self { socket, targets, joints })
    }

    pub fn from_config(config: &OscConfig) -> Result<Self> {
        Self::new(config.targets.clone(), config.joint_filter()?)
    }

}

impl BodySink for OscSender {
    /// 全宛先に送る。失敗した宛先があっても残りには送る。
    fn send_body(&mut self, body: &Body) -> Result<()> {
        let bundle = build_body_bundle(body, self.joints.as_deref());
        if bundle.content.is_empty() {
            return Ok(());
        }
        let data = encode_packet(&OscPacket::Bundle(bundle))?;

        let mut failed = Vec::new();
        for target in &self.targets {
            if let Err(e) = self.socket.send_to(&data, target) {
                failed.push(format!("{}: {}", target, e));
            }
        }
        if !failed.is_empty() {
            anyhow::bail!("OSC send failed: {}", failed.join(", "));
        }
        Ok(())
    }
}
