pub mod blazepose;

pub use blazepose::BlazePoseEstimator;

use anyhow::Result;

/// Joints the dataset records, with their indices in the 33-landmark
/// single-pose topology (MediaPipe ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Joint {
    LeftShoulder,
    RightShoulder,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub fn landmark_index(self) -> usize {
        match self {
            Joint::LeftShoulder => 11,
            Joint::RightShoulder => 12,
            Joint::LeftHip => 23,
            Joint::RightHip => 24,
            Joint::LeftKnee => 25,
            Joint::RightKnee => 26,
            Joint::LeftAnkle => 27,
            Joint::RightAnkle => 28,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Joint::LeftShoulder => "LEFT_SHOULDER",
            Joint::RightShoulder => "RIGHT_SHOULDER",
            Joint::LeftHip => "LEFT_HIP",
            Joint::RightHip => "RIGHT_HIP",
            Joint::LeftKnee => "LEFT_KNEE",
            Joint::RightKnee => "RIGHT_KNEE",
            Joint::LeftAnkle => "LEFT_ANKLE",
            Joint::RightAnkle => "RIGHT_ANKLE",
        }
    }
}

/// The eight joint connections recorded per frame, in column order. The list
/// is fixed and identical for every video; the duplicate hip-to-hip pair at
/// the end matches the dataset layout downstream models were trained
/// against.
pub const CONNECTIONS: [(Joint, Joint); 8] = [
    (Joint::LeftHip, Joint::RightHip),
    (Joint::LeftHip, Joint::LeftKnee),
    (Joint::LeftKnee, Joint::LeftAnkle),
    (Joint::RightHip, Joint::RightKnee),
    (Joint::RightKnee, Joint::RightAnkle),
    (Joint::LeftShoulder, Joint::LeftHip),
    (Joint::RightShoulder, Joint::RightHip),
    (Joint::LeftHip, Joint::RightHip),
];

pub const LANDMARK_COUNT: usize = 33;

/// One estimated joint position, normalized to `[0, 1]` over the frame the
/// estimator was given.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

/// A full set of landmarks for one detected pose.
#[derive(Debug, Clone)]
pub struct PoseLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl PoseLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn get(&self, joint: Joint) -> Landmark {
        self.points[joint.landmark_index()]
    }
}

/// A packed RGB24 frame handed to an estimator.
#[derive(Debug, Clone)]
pub struct RgbFrame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Single-pose estimation over one frame: zero or one pose. "No pose in this
/// frame" is a normal outcome and comes back as `Ok(None)`.
pub trait PoseEstimator {
    fn estimate(&mut self, frame: &RgbFrame) -> Result<Option<PoseLandmarks>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_landmark_indices_match_topology() {
        assert_eq!(Joint::LeftShoulder.landmark_index(), 11);
        assert_eq!(Joint::RightShoulder.landmark_index(), 12);
        assert_eq!(Joint::LeftHip.landmark_index(), 23);
        assert_eq!(Joint::RightAnkle.landmark_index(), 28);
    }

    #[test]
    fn test_connection_order_is_fixed() {
        assert_eq!(CONNECTIONS.len(), 8);
        assert_eq!(CONNECTIONS[0], (Joint::LeftHip, Joint::RightHip));
        assert_eq!(CONNECTIONS[2], (Joint::LeftKnee, Joint::LeftAnkle));
        // The hip pair repeats as the final column group.
        assert_eq!(CONNECTIONS[7], CONNECTIONS[0]);
    }

    #[test]
    fn test_pose_landmarks_lookup() {
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        points[23] = Landmark { x: 0.25, y: 0.75 };
        let pose = PoseLandmarks::new(points);
        assert_eq!(pose.get(Joint::LeftHip), Landmark { x: 0.25, y: 0.75 });
        assert_eq!(pose.get(Joint::RightHip), Landmark::default());
    }
}
