use synthgen_core::Real;

/// Axis aligned box in normalized camera-view space (y grows upward).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox2D {
    pub min_x: Real,
    pub min_y: Real,
    pub max_x: Real,
    pub max_y: Real,
}

impl BoundingBox2D {
    /// The whole image plane.
    pub const FRAME: BoundingBox2D = BoundingBox2D {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 1.0,
        max_y: 1.0,
    };

    pub fn new(min_x: Real, min_y: Real, max_x: Real, max_y: Real) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn width(&self) -> Real {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> Real {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn area(&self) -> Real {
        self.width() * self.height()
    }

    pub fn center(&self) -> (Real, Real) {
        ((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }

    pub fn clamped(&self) -> Self {
        Self {
            min_x: self.min_x.clamp(0.0, 1.0),
            min_y: self.min_y.clamp(0.0, 1.0),
            max_x: self.max_x.clamp(0.0, 1.0),
            max_y: self.max_y.clamp(0.0, 1.0),
        }
    }

    pub fn contains(&self, other: &BoundingBox2D) -> bool {
        self.min_x <= other.min_x
            && self.min_y <= other.min_y
            && self.max_x >= other.max_x
            && self.max_y >= other.max_y
    }

    /// Closed-interval overlap on both axes; touching boxes overlap.
    pub fn overlaps(&self, other: &BoundingBox2D) -> bool {
        overlaps_1d((self.min_x, self.max_x), (other.min_x, other.max_x))
            && overlaps_1d((self.min_y, self.max_y), (other.min_y, other.max_y))
    }

    pub fn overlaps_frame(&self) -> bool {
        self.overlaps(&Self::FRAME)
    }

    /// Converts to image convention (y grows downward) center/size form.
    pub fn to_yolo(&self) -> YoloBox {
        let (center_x, center_y) = self.center();
        YoloBox {
            center_x,
            center_y: 1.0 - center_y,
            width: self.width(),
            height: self.height(),
        }
    }
}

fn overlaps_1d(a: (Real, Real), b: (Real, Real)) -> bool {
    a.1 >= b.0 && b.1 >= a.0
}

/// Running min/max over projected points.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoxAccumulator {
    bounds: Option<BoundingBox2D>,
    count: usize,
}

impl BoxAccumulator {
    pub fn add(&mut self, x: Real, y: Real) {
        self.count += 1;
        self.bounds = Some(match self.bounds {
            None => BoundingBox2D::new(x, y, x, y),
            Some(b) => BoundingBox2D::new(b.min_x.min(x), b.min_y.min(y), b.max_x.max(x), b.max_y.max(y)),
        });
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn finish(&self) -> Option<BoundingBox2D> {
        self.bounds
    }
}

/// YOLO box: normalized center and size, image y axis pointing down.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloBox {
    pub center_x: Real,
    pub center_y: Real,
    pub width: Real,
    pub height: Real,
}
