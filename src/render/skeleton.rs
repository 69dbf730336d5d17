use crate::pose::KeypointIndex;

/// デバッグ描画する骨格の接続 (開始キーポイント, 終了キーポイント)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 12] = [
    // 上半身
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    // 下半身
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
];

/// アンカー十字の腕の長さ（表示ピクセル）
pub const ANCHOR_ARM_PX: f32 = 10.0;
