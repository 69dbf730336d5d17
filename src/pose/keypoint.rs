use serde::Deserialize;

/// MoveNet の 17 キーポイント（関節名の閉じた語彙）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointIndex; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// ランドマーク名 (e.g. "left_shoulder")
    pub fn name(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
        }
    }

    /// 名前から関節を引く。語彙にない名前は None
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|idx| idx.name() == name)
    }

    /// 左右を入れ替えた関節（鼻はそのまま）
    pub fn mirrored(self) -> Self {
        match self {
            Self::Nose => Self::Nose,
            Self::LeftEye => Self::RightEye,
            Self::RightEye => Self::LeftEye,
            Self::LeftEar => Self::RightEar,
            Self::RightEar => Self::LeftEar,
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftWrist => Self::RightWrist,
            Self::RightWrist => Self::LeftWrist,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftAnkle => Self::RightAnkle,
            Self::RightAnkle => Self::LeftAnkle,
        }
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X座標（元画像のピクセル）
    pub x: f32,
    /// Y座標（元画像のピクセル）
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub score: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, score: f32) -> Self {
        Self { x, y, score }
    }

    /// 信頼度が閾値を超えているか（閾値ちょうどは不採用）
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.score > threshold
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.score.is_finite()
    }
}

/// ランドマークソースから届く名前付きの生データ
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

/// 1ティック分のランドマーク集合
///
/// 関節ごとに高々1点。毎ティック新しく作られ、フレーム間の同一性はない。
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    keypoints: [Option<Keypoint>; KeypointIndex::COUNT],
    pub image_width: u32,
    pub image_height: u32,
}

impl LandmarkFrame {
    /// 空のフレーム
    pub fn new(image_width: u32, image_height: u32) -> Self {
        Self {
            keypoints: [None; KeypointIndex::COUNT],
            image_width,
            image_height,
        }
    }

    /// 名前付きランドマーク列から作成
    ///
    /// 語彙外の名前と非有限値は無視する。同名が複数あれば最初のものを採用。
    pub fn from_landmarks<'a, I>(landmarks: I, image_width: u32, image_height: u32) -> Self
    where
        I: IntoIterator<Item = &'a Landmark>,
    {
        let mut frame = Self::new(image_width, image_height);
        for lm in landmarks {
            let Some(index) = KeypointIndex::from_name(&lm.name) else {
                continue;
            };
            let kp = Keypoint::new(lm.x, lm.y, lm.score);
            if !kp.is_finite() {
                continue;
            }
            let slot = &mut frame.keypoints[index as usize];
            if slot.is_none() {
                *slot = Some(kp);
            }
        }
        frame
    }

    /// キーポイントを設定（上書き）
    pub fn with(mut self, index: KeypointIndex, keypoint: Keypoint) -> Self {
        self.keypoints[index as usize] = Some(keypoint);
        self
    }

    pub fn get(&self, index: KeypointIndex) -> Option<&Keypoint> {
        self.keypoints[index as usize].as_ref()
    }

    /// 閾値を超える信頼度で存在するキーポイント
    pub fn confident(&self, index: KeypointIndex, threshold: f32) -> Option<&Keypoint> {
        self.get(index).filter(|kp| kp.is_valid(threshold))
    }

    /// 存在するキーポイントを (関節, 点) で列挙
    pub fn iter(&self) -> impl Iterator<Item = (KeypointIndex, &Keypoint)> {
        KeypointIndex::ALL
            .into_iter()
            .zip(self.keypoints.iter())
            .filter_map(|(idx, kp)| kp.as_ref().map(|kp| (idx, kp)))
    }

    pub fn len(&self) -> usize {
        self.keypoints.iter().filter(|kp| kp.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 画像サイズが有効か
    pub fn has_valid_size(&self) -> bool {
        self.image_width > 0 && self.image_height > 0
    }

    /// 縦の中心線で反転し、左右の関節名を入れ替えたフレーム
    pub fn mirrored(&self) -> Self {
        let w = self.image_width as f32;
        let mut mirrored = Self::new(self.image_width, self.image_height);
        for (idx, kp) in self.iter() {
            mirrored.keypoints[idx.mirrored() as usize] = Some(Keypoint::new(w - kp.x, kp.y, kp.score));
        }
        mirrored
    }
}
