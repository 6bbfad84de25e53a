use serde::Serialize;

/// Asymmetry scalars of the most recently completed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DirectionMetrics {
    /// Front intensity minus left intensity.
    pub diff_front_left: f32,
    /// Front intensity minus right intensity.
    pub diff_front_right: f32,
    /// Front intensity minus back intensity, only when the back channel is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff_front_back: Option<f32>,
}

/// Band intensity of each channel that fed a [`DirectionMetrics`] value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ChannelIntensities {
    pub front: f32,
    pub left: f32,
    pub right: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back: Option<f32>,
}

impl ChannelIntensities {
    pub fn metrics(&self) -> DirectionMetrics {
        DirectionMetrics {
            diff_front_left: self.front - self.left,
            diff_front_right: self.front - self.right,
            diff_front_back: self.back.map(|back| self.front - back),
        }
    }
}

/// Snapshot handed to consumers of the frame-completion signal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FrameReport {
    /// Zero-based index of the completed frame.
    pub frame: u64,
    pub metrics: DirectionMetrics,
    pub intensities: ChannelIntensities,
}
