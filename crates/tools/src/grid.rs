use glam::Vec3;

/// Snapping grid. A size of zero or less disables snapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    size: f32,
}

impl Grid {
    pub fn new(size: f32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn set_size(&mut self, size: f32) {
        self.size = size;
    }

    pub fn is_enabled(&self) -> bool {
        self.size > 0.0
    }

    /// Step used for keyboard nudges: the grid size, or one unit when
    /// snapping is off.
    pub fn step(&self) -> f32 {
        if self.is_enabled() { self.size } else { 1.0 }
    }

    /// Round a position to the nearest grid point.
    pub fn snap(&self, point: Vec3) -> Vec3 {
        if !self.is_enabled() {
            return point;
        }
        (point / self.size).round() * self.size
    }

    /// Round a translation to a whole number of grid steps per axis.
    pub fn snap_delta(&self, delta: Vec3) -> Vec3 {
        self.snap(delta)
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(16.0)
    }
}
