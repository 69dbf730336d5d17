use crate::config::DisplayConfig;
use crate::pose::LandmarkFrame;
use crate::render::{DisplayMapping, OverlayFrame};
use crate::tracker::TickOutcome;
use crate::transform::WorldTransform;

/// 変換を書き込むシーングラフ上のノード
pub trait SceneNode {
    fn apply_transform(&mut self, transform: &WorldTransform);
}

/// WorldTransform 自体をノードとして使う（テスト・ヘッドレス用）
impl SceneNode for WorldTransform {
    fn apply_transform(&mut self, transform: &WorldTransform) {
        *self = *transform;
    }
}

/// デバッグオーバーレイの描画先
pub trait DebugOverlay {
    fn draw(&mut self, overlay: &OverlayFrame);
    fn clear(&mut self);
}

/// 最後に描いたオーバーレイを保持するだけの描画先
#[derive(Debug, Default)]
pub struct RecordingOverlay {
    pub last: Option<OverlayFrame>,
}

impl DebugOverlay for RecordingOverlay {
    fn draw(&mut self, overlay: &OverlayFrame) {
        self.last = Some(overlay.clone());
    }

    fn clear(&mut self) {
        self.last = None;
    }
}

/// ティック結果をノードとオーバーレイへ書き出す
///
/// 自身の状態は持たない。更新されなかったティックではオーバーレイを消す。
pub struct SceneSync {
    display: DisplayConfig,
}

impl SceneSync {
    pub fn new(display: DisplayConfig) -> Self {
        Self { display }
    }

    pub fn apply<N, O>(&self, outcome: &TickOutcome, frame: Option<&LandmarkFrame>, node: &mut N, overlay: &mut O)
    where
        N: SceneNode + ?Sized,
        O: DebugOverlay + ?Sized,
    {
        node.apply_transform(outcome.transform());

        match (outcome, frame) {
            (TickOutcome::Updated { anchor_view, .. }, Some(frame)) => {
                let mapping = DisplayMapping::from_config(&self.display, frame.image_width, frame.image_height);
                let drawing = OverlayFrame::skeleton(frame, &mapping, self.display.overlay_confidence_min)
                    .with_anchor(*anchor_view, &mapping);
                overlay.draw(&drawing);
            }
            _ => overlay.clear(),
        }
    }
}
