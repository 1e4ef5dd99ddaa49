// pH engine: per-point equilibrium chemistry for the four titration types.
//
// Each titration type has its own handler covering the three regions. All
// logarithms and square roots go through `p_value`/`checked_sqrt`, which
// surface a non-positive argument as `TitrationError::Domain` instead of NaN.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{Result, Scenario, TitrationError, TitrationType, NEUTRAL_PH, PKW};

/// Relative tolerance used to decide that titrant moles match analyte moles.
pub const EQUIVALENCE_RTOL: f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    BeforeEquivalence,
    Equivalence,
    AfterEquivalence,
}

impl Region {
    /// Classify a point by comparing titrant moles with analyte moles.
    ///
    /// The equivalence test runs first so that the before/after branches only
    /// ever see a strictly positive mole difference.
    pub fn classify(moles_titrant: f64, moles_initial: f64) -> Region {
        let scale = moles_titrant.abs().max(moles_initial.abs());
        if (moles_titrant - moles_initial).abs() <= EQUIVALENCE_RTOL * scale {
            Region::Equivalence
        } else if moles_titrant < moles_initial {
            Region::BeforeEquivalence
        } else {
            Region::AfterEquivalence
        }
    }
}

/// Mole bookkeeping for one titrant volume.
#[derive(Clone, Copy, Debug)]
struct Mixture {
    moles_initial: f64,
    moles_titrant: f64,
    total_volume: f64,
    region: Region,
}

impl Mixture {
    fn new(volume: f64, scenario: &Scenario) -> Self {
        let moles_initial = scenario.moles_initial();
        let moles_titrant = scenario.titrant_concentration() * volume;
        Self {
            moles_initial,
            moles_titrant,
            total_volume: scenario.initial_volume() + volume,
            region: Region::classify(moles_titrant, moles_initial),
        }
    }

    /// Concentration of unreacted analyte before equivalence.
    fn excess_analyte(&self) -> f64 {
        (self.moles_initial - self.moles_titrant) / self.total_volume
    }

    /// Concentration of excess titrant after equivalence.
    fn excess_titrant(&self) -> f64 {
        (self.moles_titrant - self.moles_initial) / self.total_volume
    }

    /// Conjugate-to-weak-species ratio in the buffer region.
    fn buffer_ratio(&self) -> f64 {
        self.moles_titrant / (self.moles_initial - self.moles_titrant)
    }

    fn is_start(&self) -> bool {
        self.moles_titrant <= 0.0
    }
}

/// pH of the mixture after adding `volume` liters of titrant.
pub fn compute_ph(volume: f64, scenario: &Scenario) -> Result<f64> {
    if !volume.is_finite() || volume < 0.0 {
        return Err(TitrationError::InvalidParameter(format!(
            "titrant volume must be finite and non-negative, got {volume}"
        )));
    }
    let mix = Mixture::new(volume, scenario);
    match scenario.titration_type() {
        TitrationType::StrongAcidStrongBase => strong_acid_strong_base(&mix),
        TitrationType::StrongBaseStrongAcid => strong_base_strong_acid(&mix),
        TitrationType::WeakAcidStrongBase => weak_acid_strong_base(&mix, scenario),
        TitrationType::WeakBaseStrongAcid => weak_base_strong_acid(&mix, scenario),
    }
}

/// Element-wise [`compute_ph`] over an ordered series of titrant volumes.
///
/// Fails on the first invalid point; no partial curve is returned.
pub fn compute_ph_curve(volumes: &[f64], scenario: &Scenario) -> Result<Vec<f64>> {
    #[cfg(feature = "parallel")]
    {
        volumes
            .par_iter()
            .map(|&volume| compute_ph(volume, scenario))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        volumes
            .iter()
            .map(|&volume| compute_ph(volume, scenario))
            .collect()
    }
}

fn strong_acid_strong_base(mix: &Mixture) -> Result<f64> {
    match mix.region {
        Region::BeforeEquivalence => {
            Ok(p_value("excess [H+]", mix.excess_analyte())?.min(NEUTRAL_PH))
        }
        Region::Equivalence => Ok(NEUTRAL_PH),
        Region::AfterEquivalence => {
            Ok((PKW - p_value("excess [OH-]", mix.excess_titrant())?).max(NEUTRAL_PH))
        }
    }
}

fn strong_base_strong_acid(mix: &Mixture) -> Result<f64> {
    match mix.region {
        Region::BeforeEquivalence => {
            Ok((PKW - p_value("excess [OH-]", mix.excess_analyte())?).max(NEUTRAL_PH))
        }
        Region::Equivalence => Ok(NEUTRAL_PH),
        Region::AfterEquivalence => {
            Ok(p_value("excess [H+]", mix.excess_titrant())?.min(NEUTRAL_PH))
        }
    }
}

// Weak-species regions are bounded by the neighbouring landmarks: the buffer
// approximation never drops below the undissociated starting pH nor passes the
// hydrolysis pH, and excess titrant never pulls pH back across equivalence.
// Scenario validation keeps pKa strictly between the two landmark pH values,
// so the bounds never touch the half-equivalence point.

fn weak_acid_strong_base(mix: &Mixture, scenario: &Scenario) -> Result<f64> {
    let (pka, ka, kb) = dissociation_constants(scenario)?;
    let start = {
        let h = checked_sqrt("Ka * C", ka * scenario.initial_concentration())?;
        p_value("[H+]", h)?
    };
    let equivalence = {
        let oh = checked_sqrt("Kb * C", kb * scenario.conjugate_at_equivalence())?;
        PKW - p_value("[OH-]", oh)?
    };
    match mix.region {
        Region::BeforeEquivalence if mix.is_start() => Ok(start),
        Region::BeforeEquivalence => {
            let buffer = pka - p_value("[A-]/[HA]", mix.buffer_ratio())?;
            Ok(buffer.max(start).min(equivalence))
        }
        Region::Equivalence => Ok(equivalence),
        Region::AfterEquivalence => {
            let excess = PKW - p_value("excess [OH-]", mix.excess_titrant())?;
            Ok(excess.max(equivalence))
        }
    }
}

fn weak_base_strong_acid(mix: &Mixture, scenario: &Scenario) -> Result<f64> {
    let (pka, ka, kb) = dissociation_constants(scenario)?;
    let start = {
        let oh = checked_sqrt("Kb * C", kb * scenario.initial_concentration())?;
        PKW - p_value("[OH-]", oh)?
    };
    let equivalence = {
        let h = checked_sqrt("Ka * C", ka * scenario.conjugate_at_equivalence())?;
        p_value("[H+]", h)?
    };
    match mix.region {
        Region::BeforeEquivalence if mix.is_start() => Ok(start),
        Region::BeforeEquivalence => {
            let pkb = PKW - pka;
            let poh = pkb - p_value("[BH+]/[B]", mix.buffer_ratio())?;
            Ok((PKW - poh).min(start).max(equivalence))
        }
        Region::Equivalence => Ok(equivalence),
        Region::AfterEquivalence => {
            let excess = p_value("excess [H+]", mix.excess_titrant())?;
            Ok(excess.min(equivalence))
        }
    }
}

fn dissociation_constants(scenario: &Scenario) -> Result<(f64, f64, f64)> {
    match (scenario.pka(), scenario.ka(), scenario.kb()) {
        (Some(pka), Some(ka), Some(kb)) => Ok((pka, ka, kb)),
        _ => Err(TitrationError::InvalidScenario(format!(
            "pKa is required for {}",
            scenario.titration_type()
        ))),
    }
}

/// `-log10(value)`, defined only for strictly positive finite values.
fn p_value(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(-value.log10())
    } else {
        Err(TitrationError::Domain { quantity, value })
    }
}

fn checked_sqrt(quantity: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value.sqrt())
    } else {
        Err(TitrationError::Domain { quantity, value })
    }
}
