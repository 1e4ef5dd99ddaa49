// Titration scenario model: the analyte, the titrant and, for weak species, the pKa.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TitrationError, KW, PKW};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TitrationType {
    WeakAcidStrongBase,
    WeakBaseStrongAcid,
    StrongAcidStrongBase,
    StrongBaseStrongAcid,
}

impl TitrationType {
    pub const ALL: [TitrationType; 4] = [
        TitrationType::WeakAcidStrongBase,
        TitrationType::WeakBaseStrongAcid,
        TitrationType::StrongAcidStrongBase,
        TitrationType::StrongBaseStrongAcid,
    ];

    /// Whether the analyte is a weak species and therefore needs a pKa.
    pub fn is_weak(self) -> bool {
        matches!(
            self,
            TitrationType::WeakAcidStrongBase | TitrationType::WeakBaseStrongAcid
        )
    }

    /// Whether the analyte in the flask is an acid (pH rises as titrant is added).
    pub fn analyte_is_acid(self) -> bool {
        matches!(
            self,
            TitrationType::WeakAcidStrongBase | TitrationType::StrongAcidStrongBase
        )
    }

    pub fn analyte_name(self) -> &'static str {
        if self.analyte_is_acid() {
            "acid"
        } else {
            "base"
        }
    }

    pub fn titrant_name(self) -> &'static str {
        if self.analyte_is_acid() {
            "base"
        } else {
            "acid"
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TitrationType::WeakAcidStrongBase => "Weak Acid with Strong Base",
            TitrationType::WeakBaseStrongAcid => "Weak Base with Strong Acid",
            TitrationType::StrongAcidStrongBase => "Strong Acid with Strong Base",
            TitrationType::StrongBaseStrongAcid => "Strong Base with Strong Acid",
        }
    }
}

impl fmt::Display for TitrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unvalidated scenario fields as they appear on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ScenarioFields {
    titration_type: TitrationType,
    initial_volume: f64,
    initial_concentration: f64,
    titrant_concentration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pka: Option<f64>,
}

/// An immutable titration setup.
///
/// Volumes are in liters and concentrations in mol/L. A `Scenario` can only
/// be built through [`Scenario::new`] (or deserialization, which runs the same
/// checks), so every value satisfies:
///
/// * volume and both concentrations are finite and strictly positive;
/// * `pka` is present for weak titrations and absent otherwise;
/// * for weak titrations, pKa lies strictly between the starting pH and the
///   equivalence pH (see [`Scenario::pka_range`]), and every equilibrium
///   product the pH engine takes a root of is finite and positive.
///
/// For [`TitrationType::WeakBaseStrongAcid`] the pKa is that of the base's
/// conjugate acid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScenarioFields", into = "ScenarioFields")]
pub struct Scenario {
    titration_type: TitrationType,
    initial_volume: f64,
    initial_concentration: f64,
    titrant_concentration: f64,
    pka: Option<f64>,
}

impl Scenario {
    pub fn new(
        titration_type: TitrationType,
        initial_volume: f64,
        initial_concentration: f64,
        titrant_concentration: f64,
        pka: Option<f64>,
    ) -> Result<Self> {
        require_positive("initial volume", initial_volume)?;
        require_positive("initial concentration", initial_concentration)?;
        require_positive("titrant concentration", titrant_concentration)?;
        match (titration_type.is_weak(), pka) {
            (true, None) => {
                return Err(TitrationError::InvalidScenario(format!(
                    "pKa is required for {titration_type}"
                )))
            }
            (true, Some(value)) if !value.is_finite() => {
                return Err(TitrationError::InvalidScenario(format!(
                    "pKa must be finite, got {value}"
                )))
            }
            (false, Some(_)) => {
                return Err(TitrationError::InvalidScenario(format!(
                    "pKa does not apply to {titration_type}"
                )))
            }
            _ => {}
        }
        let scenario = Self {
            titration_type,
            initial_volume,
            initial_concentration,
            titrant_concentration,
            pka,
        };
        if let Some(value) = pka {
            scenario.validate_weak(value)?;
        }
        Ok(scenario)
    }

    /// Open interval of pKa values for which the buffer region lies between
    /// the starting pH and the equivalence pH. `None` for strong titrations.
    ///
    /// For a weak acid this is `-log10(C) < pKa < 14 + log10(C_conj)`, with
    /// `C_conj` the conjugate concentration at equivalence. A weak base uses
    /// the mirrored bounds on the conjugate acid's pKa.
    pub fn pka_range(&self) -> Option<(f64, f64)> {
        let analyte = self.initial_concentration.log10();
        let conjugate = self.conjugate_at_equivalence().log10();
        match self.titration_type {
            TitrationType::WeakAcidStrongBase => Some((-analyte, PKW + conjugate)),
            TitrationType::WeakBaseStrongAcid => Some((-conjugate, PKW + analyte)),
            TitrationType::StrongAcidStrongBase | TitrationType::StrongBaseStrongAcid => None,
        }
    }

    fn validate_weak(&self, pka: f64) -> Result<()> {
        let Some((low, high)) = self.pka_range() else {
            return Ok(());
        };
        if !(low < pka && pka < high) {
            return Err(TitrationError::InvalidScenario(format!(
                "pKa {pka} is outside ({low:.3}, {high:.3}) for these concentrations"
            )));
        }
        let (Some(ka), Some(kb)) = (self.ka(), self.kb()) else {
            return Ok(());
        };
        let conjugate = self.conjugate_at_equivalence();
        let (start, equivalence) = if self.titration_type.analyte_is_acid() {
            (ka * self.initial_concentration, kb * conjugate)
        } else {
            (kb * self.initial_concentration, ka * conjugate)
        };
        require_positive("Ka", ka)?;
        require_positive("Kb", kb)?;
        require_positive("starting equilibrium product", start)?;
        require_positive("equivalence equilibrium product", equivalence)
    }

    /// Convenience constructor for the two strong/strong titrations.
    pub fn strong(
        titration_type: TitrationType,
        initial_volume: f64,
        initial_concentration: f64,
        titrant_concentration: f64,
    ) -> Result<Self> {
        Self::new(
            titration_type,
            initial_volume,
            initial_concentration,
            titrant_concentration,
            None,
        )
    }

    pub fn titration_type(&self) -> TitrationType {
        self.titration_type
    }

    pub fn initial_volume(&self) -> f64 {
        self.initial_volume
    }

    pub fn initial_concentration(&self) -> f64 {
        self.initial_concentration
    }

    pub fn titrant_concentration(&self) -> f64 {
        self.titrant_concentration
    }

    pub fn pka(&self) -> Option<f64> {
        self.pka
    }

    /// Acid dissociation constant, `10^-pKa`.
    pub fn ka(&self) -> Option<f64> {
        self.pka.map(|pka| 10f64.powf(-pka))
    }

    /// Base dissociation constant of the conjugate pair, `Kw / Ka`.
    pub fn kb(&self) -> Option<f64> {
        self.ka().map(|ka| KW / ka)
    }

    pub fn moles_initial(&self) -> f64 {
        self.initial_concentration * self.initial_volume
    }

    /// Titrant volume at which titrant moles equal analyte moles.
    pub fn equivalence_volume(&self) -> f64 {
        self.moles_initial() / self.titrant_concentration
    }

    pub fn half_equivalence_volume(&self) -> f64 {
        self.equivalence_volume() / 2.0
    }

    /// Concentration of the conjugate species at the exact equivalence volume.
    pub fn conjugate_at_equivalence(&self) -> f64 {
        self.moles_initial() / (self.initial_volume + self.equivalence_volume())
    }
}

impl TryFrom<ScenarioFields> for Scenario {
    type Error = TitrationError;

    fn try_from(fields: ScenarioFields) -> Result<Self> {
        Scenario::new(
            fields.titration_type,
            fields.initial_volume,
            fields.initial_concentration,
            fields.titrant_concentration,
            fields.pka,
        )
    }
}

impl From<Scenario> for ScenarioFields {
    fn from(scenario: Scenario) -> Self {
        ScenarioFields {
            titration_type: scenario.titration_type,
            initial_volume: scenario.initial_volume,
            initial_concentration: scenario.initial_concentration,
            titrant_concentration: scenario.titrant_concentration,
            pka: scenario.pka,
        }
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TitrationError::InvalidScenario(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_equivalence_quantities() {
        let scenario =
            Scenario::strong(TitrationType::StrongAcidStrongBase, 0.05, 0.1, 0.2).unwrap();
        assert_relative_eq!(scenario.moles_initial(), 0.005, max_relative = 1e-12);
        assert_relative_eq!(scenario.equivalence_volume(), 0.025, max_relative = 1e-12);
        assert_relative_eq!(scenario.half_equivalence_volume(), 0.0125, max_relative = 1e-12);
    }

    #[test]
    fn test_dissociation_constants() {
        let scenario =
            Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, Some(4.0)).unwrap();
        assert_relative_eq!(scenario.ka().unwrap(), 1e-4, max_relative = 1e-12);
        assert_relative_eq!(scenario.kb().unwrap(), 1e-10, max_relative = 1e-12);

        let strong =
            Scenario::strong(TitrationType::StrongBaseStrongAcid, 0.05, 0.1, 0.1).unwrap();
        assert!(strong.ka().is_none());
    }

    #[test]
    fn test_rejects_non_positive_fields() {
        for (volume, conc, titrant) in [
            (0.0, 0.1, 0.1),
            (-0.05, 0.1, 0.1),
            (0.05, 0.0, 0.1),
            (0.05, 0.1, -1.0),
            (f64::NAN, 0.1, 0.1),
            (0.05, f64::INFINITY, 0.1),
        ] {
            let err = Scenario::strong(TitrationType::StrongAcidStrongBase, volume, conc, titrant)
                .unwrap_err();
            assert!(matches!(err, TitrationError::InvalidScenario(_)), "{err}");
        }
    }

    #[test]
    fn test_weak_types_require_pka() {
        let err =
            Scenario::new(TitrationType::WeakBaseStrongAcid, 0.05, 0.1, 0.1, None).unwrap_err();
        assert!(err.to_string().contains("pKa is required"));

        let err = Scenario::new(
            TitrationType::WeakAcidStrongBase,
            0.05,
            0.1,
            0.1,
            Some(f64::NAN),
        )
        .unwrap_err();
        assert!(matches!(err, TitrationError::InvalidScenario(_)));
    }

    #[test]
    fn test_strong_types_reject_pka() {
        let err = Scenario::new(TitrationType::StrongAcidStrongBase, 0.05, 0.1, 0.1, Some(4.0))
            .unwrap_err();
        assert!(err.to_string().contains("does not apply"));
    }

    #[test]
    fn test_pka_range_follows_concentrations() {
        // C = 0.1 and C_conj = 0.05 at equivalence.
        let acid =
            Scenario::new(TitrationType::WeakAcidStrongBase, 0.05, 0.1, 0.1, Some(4.76)).unwrap();
        let (low, high) = acid.pka_range().unwrap();
        assert_relative_eq!(low, 1.0, max_relative = 1e-12);
        assert_relative_eq!(high, 14.0 + 0.05f64.log10(), max_relative = 1e-12);

        let base =
            Scenario::new(TitrationType::WeakBaseStrongAcid, 0.05, 0.1, 0.1, Some(9.25)).unwrap();
        let (low, high) = base.pka_range().unwrap();
        assert_relative_eq!(low, -(0.05f64.log10()), max_relative = 1e-12);
        assert_relative_eq!(high, 13.0, max_relative = 1e-12);

        let strong =
            Scenario::strong(TitrationType::StrongAcidStrongBase, 0.05, 0.1, 0.1).unwrap();
        assert!(strong.pka_range().is_none());
    }

    #[test]
    fn test_rejects_pka_outside_buffer_range() {
        for (kind, pka) in [
            (TitrationType::WeakAcidStrongBase, 0.5),
            (TitrationType::WeakAcidStrongBase, 13.0),
            (TitrationType::WeakBaseStrongAcid, 1.0),
            (TitrationType::WeakBaseStrongAcid, 13.5),
            (TitrationType::WeakAcidStrongBase, 400.0),
            (TitrationType::WeakBaseStrongAcid, -400.0),
        ] {
            let err = Scenario::new(kind, 0.05, 0.1, 0.1, Some(pka)).unwrap_err();
            assert!(matches!(err, TitrationError::InvalidScenario(_)), "{kind} pKa {pka}: {err}");
        }
    }

    #[test]
    fn test_rejects_overflowing_equilibrium_products() {
        // The range check passes, but Ka * C overflows to infinity.
        let err = Scenario::new(TitrationType::WeakAcidStrongBase, 1.0, 1e200, 1e200, Some(-150.0))
            .unwrap_err();
        assert!(matches!(err, TitrationError::InvalidScenario(_)), "{err}");
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"titration_type":"WeakAcidStrongBase","initial_volume":0.05,
            "initial_concentration":0.1,"titrant_concentration":0.1,"pka":4.76}"#;
        let scenario: Scenario = serde_json::from_str(ok).unwrap();
        assert_eq!(scenario.pka(), Some(4.76));

        let out_of_range = r#"{"titration_type":"WeakAcidStrongBase","initial_volume":0.05,
            "initial_concentration":0.1,"titrant_concentration":0.1,"pka":400.0}"#;
        assert!(serde_json::from_str::<Scenario>(out_of_range).is_err());

        let missing_pka = r#"{"titration_type":"WeakAcidStrongBase","initial_volume":0.05,
            "initial_concentration":0.1,"titrant_concentration":0.1}"#;
        assert!(serde_json::from_str::<Scenario>(missing_pka).is_err());

        let negative = r#"{"titration_type":"StrongAcidStrongBase","initial_volume":-1.0,
            "initial_concentration":0.1,"titrant_concentration":0.1}"#;
        assert!(serde_json::from_str::<Scenario>(negative).is_err());
    }

    #[test]
    fn test_serialize_omits_absent_pka() {
        let scenario =
            Scenario::strong(TitrationType::StrongAcidStrongBase, 0.05, 0.1, 0.1).unwrap();
        let json = serde_json::to_string(&scenario).unwrap();
        assert!(!json.contains("pka"));
        assert!(json.contains("\"titration_type\":\"StrongAcidStrongBase\""));
    }
}
