// Curve sampling over an evenly spaced titrant volume grid, plus landmark points.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::engine::{compute_ph, compute_ph_curve};
use crate::{Result, Scenario, TitrationError, TitrationType};

/// Display range for pH axes.
pub const PH_DISPLAY_RANGE: (f64, f64) = (0.0, 14.0);

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeGrid {
    /// First titrant volume (L).
    pub start: f64,
    /// Last titrant volume (L), included in the grid.
    pub end: f64,
    pub num_points: usize,
}

impl Default for VolumeGrid {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.1,
            num_points: 500,
        }
    }
}

impl VolumeGrid {
    pub fn new(start: f64, end: f64, num_points: usize) -> Result<Self> {
        let grid = Self {
            start,
            end,
            num_points,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.end.is_finite() {
            return Err(TitrationError::InvalidParameter(format!(
                "volume range must be finite, got {}..{}",
                self.start, self.end
            )));
        }
        if self.start < 0.0 {
            return Err(TitrationError::InvalidParameter(format!(
                "volume range must start at or above zero, got {}",
                self.start
            )));
        }
        if self.end <= self.start {
            return Err(TitrationError::InvalidParameter(format!(
                "volume range end {} must exceed start {}",
                self.end, self.start
            )));
        }
        if self.num_points < 2 {
            return Err(TitrationError::InvalidParameter(format!(
                "a curve needs at least 2 points, got {}",
                self.num_points
            )));
        }
        Ok(())
    }

    /// Evenly spaced volumes from `start` to `end` inclusive.
    pub fn volumes(&self) -> Result<Array1<f64>> {
        self.validate()?;
        Ok(Array1::linspace(self.start, self.end, self.num_points))
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SamplePoint {
    /// Titrant volume added (L).
    pub titrant_volume: f64,
    pub ph: f64,
}

impl SamplePoint {
    /// pH clamped to the conventional 0-14 display range.
    pub fn display_ph(&self) -> f64 {
        self.ph.clamp(PH_DISPLAY_RANGE.0, PH_DISPLAY_RANGE.1)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Curve {
    pub titration_type: TitrationType,
    pub points: Vec<SamplePoint>,
}

impl Curve {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.titrant_volume).collect()
    }

    pub fn ph_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.ph).collect()
    }

    pub fn display_ph_values(&self) -> Vec<f64> {
        self.points.iter().map(SamplePoint::display_ph).collect()
    }
}

/// Equivalence and half-equivalence points of a scenario.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Landmarks {
    pub equivalence_volume: f64,
    pub ph_at_equivalence: f64,
    pub half_equivalence_volume: f64,
    pub ph_at_half_equivalence: f64,
}

/// Sample the pH curve of `scenario` over `grid`.
pub fn build_curve(scenario: &Scenario, grid: &VolumeGrid) -> Result<Curve> {
    let volumes = grid.volumes()?;
    let volumes = volumes.to_vec();
    let ph = compute_ph_curve(&volumes, scenario)?;
    let points = volumes
        .into_iter()
        .zip(ph)
        .map(|(titrant_volume, ph)| SamplePoint { titrant_volume, ph })
        .collect();
    Ok(Curve {
        titration_type: scenario.titration_type(),
        points,
    })
}

pub fn landmarks(scenario: &Scenario) -> Result<Landmarks> {
    let equivalence_volume = scenario.equivalence_volume();
    let half_equivalence_volume = scenario.half_equivalence_volume();
    Ok(Landmarks {
        equivalence_volume,
        ph_at_equivalence: compute_ph(equivalence_volume, scenario)?,
        half_equivalence_volume,
        ph_at_half_equivalence: compute_ph(half_equivalence_volume, scenario)?,
    })
}
