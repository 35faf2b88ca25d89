use serde::{Deserialize, Serialize};

/// Axis-aligned detection box in image pixel coordinates.
///
/// Serialized on the wire as the 4-array `[x1, y1, x2, y2]` produced by the
/// detector. A degenerate box (zero width or height) has area 0 and never
/// causes a division error in [`DetectionBox::iou`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct DetectionBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl DetectionBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) * 0.5, (self.y0 + self.y1) * 0.5)
    }

    /// Intersection over union, in [0, 1]. Returns 0 when the union area is 0.
    pub fn iou(&self, other: &Self) -> f32 {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);

        let inter = DetectionBox::new(x0, y0, x1, y1).area();
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    /// Center of `other` in this box's unit frame: `((cx-x0)/w, (cy-y0)/h)`.
    /// Returns `None` for a degenerate box, where the frame is undefined.
    pub fn relative_center(&self, other: &Self) -> Option<(f32, f32)> {
        let w = self.width();
        let h = self.height();
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let (cx, cy) = other.center();
        Some(((cx - self.x0) / w, (cy - self.y0) / h))
    }
}

impl From<[f32; 4]> for DetectionBox {
    fn from(v: [f32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<DetectionBox> for [f32; 4] {
    fn from(b: DetectionBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}
