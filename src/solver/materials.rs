//! Uniaxial stress-strain laws.

use crate::error::{Result, StructeasyError};

/// A uniaxial material with trial and committed state
pub trait UniaxialMaterial {
    fn name(&self) -> &'static str;

    fn set_trial_strain(&mut self, strain: f64);

    fn stress(&self) -> f64;

    fn tangent(&self) -> f64;

    /// Accepts the trial state as the new committed state
    fn commit_state(&mut self);
}

/// Parameters of a uniaxial material, as registered in an engine
#[derive(Debug, Clone, PartialEq)]
pub enum UniaxialMaterialDef {
    /// Linear elastic
    Elastic { e: f64 },
    /// Elastic perfectly plastic, yielding at `epsy` in tension and compression
    ElasticPP { e: f64, epsy: f64 },
    /// Bilinear steel with kinematic hardening ratio `b`
    Steel01 { fy: f64, e0: f64, b: f64 },
}

impl UniaxialMaterialDef {
    pub fn validate(&self) -> Result<()> {
        let check = |ok: bool, message: &str| {
            if ok {
                Ok(())
            } else {
                Err(StructeasyError::Solver(format!(
                    "{} material: {message}",
                    self.type_name()
                )))
            }
        };

        match *self {
            UniaxialMaterialDef::Elastic { e } => check(e > 0.0, "E must be positive"),
            UniaxialMaterialDef::ElasticPP { e, epsy } => {
                check(e > 0.0, "E must be positive")?;
                check(epsy > 0.0, "epsy must be positive")
            }
            UniaxialMaterialDef::Steel01 { fy, e0, b } => {
                check(fy > 0.0, "fy must be positive")?;
                check(e0 > 0.0, "E0 must be positive")?;
                check((0.0..1.0).contains(&b), "b must be in [0, 1)")
            }
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            UniaxialMaterialDef::Elastic { .. } => "Elastic",
            UniaxialMaterialDef::ElasticPP { .. } => "ElasticPP",
            UniaxialMaterialDef::Steel01 { .. } => "Steel01",
        }
    }

    /// A fresh material in its virgin state
    pub fn instantiate(&self) -> Box<dyn UniaxialMaterial> {
        match *self {
            UniaxialMaterialDef::Elastic { e } => Box::new(Elastic::new(e)),
            UniaxialMaterialDef::ElasticPP { e, epsy } => Box::new(ElasticPP::new(e, epsy)),
            UniaxialMaterialDef::Steel01 { fy, e0, b } => Box::new(Steel01::new(fy, e0, b)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Elastic {
    e: f64,
    strain: f64,
}

impl Elastic {
    pub fn new(e: f64) -> Elastic {
        Elastic { e, strain: 0.0 }
    }
}

impl UniaxialMaterial for Elastic {
    fn name(&self) -> &'static str {
        "Elastic"
    }

    fn set_trial_strain(&mut self, strain: f64) {
        self.strain = strain;
    }

    fn stress(&self) -> f64 {
        self.e * self.strain
    }

    fn tangent(&self) -> f64 {
        self.e
    }

    fn commit_state(&mut self) {}
}

#[derive(Debug, Clone)]
pub struct ElasticPP {
    e: f64,
    fy: f64,
    committed_plastic_strain: f64,
    trial_strain: f64,
    trial_stress: f64,
    trial_tangent: f64,
}

impl ElasticPP {
    pub fn new(e: f64, epsy: f64) -> ElasticPP {
        ElasticPP {
            e,
            fy: e * epsy,
            committed_plastic_strain: 0.0,
            trial_strain: 0.0,
            trial_stress: 0.0,
            trial_tangent: e,
        }
    }
}

impl UniaxialMaterial for ElasticPP {
    fn name(&self) -> &'static str {
        "ElasticPP"
    }

    fn set_trial_strain(&mut self, strain: f64) {
        let elastic = self.e * (strain - self.committed_plastic_strain);
        self.trial_strain = strain;

        if elastic > self.fy {
            self.trial_stress = self.fy;
            self.trial_tangent = 0.0;
        } else if elastic < -self.fy {
            self.trial_stress = -self.fy;
            self.trial_tangent = 0.0;
        } else {
            self.trial_stress = elastic;
            self.trial_tangent = self.e;
        }
    }

    fn stress(&self) -> f64 {
        self.trial_stress
    }

    fn tangent(&self) -> f64 {
        self.trial_tangent
    }

    fn commit_state(&mut self) {
        self.committed_plastic_strain = self.trial_strain - self.trial_stress / self.e;
    }
}

/// Bilinear kinematic hardening
///
/// The stress is bounded by two lines of slope `b * e0` passing through
/// `(±fy / e0, ±fy)`; inside the band the response is elastic with slope `e0`.
#[derive(Debug, Clone)]
pub struct Steel01 {
    fy: f64,
    e0: f64,
    b: f64,
    committed_strain: f64,
    committed_stress: f64,
    trial_strain: f64,
    trial_stress: f64,
    trial_tangent: f64,
}

impl Steel01 {
    pub fn new(fy: f64, e0: f64, b: f64) -> Steel01 {
        Steel01 {
            fy,
            e0,
            b,
            committed_strain: 0.0,
            committed_stress: 0.0,
            trial_strain: 0.0,
            trial_stress: 0.0,
            trial_tangent: e0,
        }
    }
}

impl UniaxialMaterial for Steel01 {
    fn name(&self) -> &'static str {
        "Steel01"
    }

    fn set_trial_strain(&mut self, strain: f64) {
        let hardening = self.b * self.e0;
        let offset = (1.0 - self.b) * self.fy;
        let upper = hardening * strain + offset;
        let lower = hardening * strain - offset;

        let elastic = self.committed_stress + self.e0 * (strain - self.committed_strain);
        self.trial_strain = strain;

        if elastic > upper {
            self.trial_stress = upper;
            self.trial_tangent = hardening;
        } else if elastic < lower {
            self.trial_stress = lower;
            self.trial_tangent = hardening;
        } else {
            self.trial_stress = elastic;
            self.trial_tangent = self.e0;
        }
    }

    fn stress(&self) -> f64 {
        self.trial_stress
    }

    fn tangent(&self) -> f64 {
        self.trial_tangent
    }

    fn commit_state(&mut self) {
        self.committed_strain = self.trial_strain;
        self.committed_stress = self.trial_stress;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn drive(material: &mut dyn UniaxialMaterial, strain: f64) -> f64 {
        material.set_trial_strain(strain);
        material.commit_state();
        material.stress()
    }

    #[test]
    fn test_elastic() {
        let mut m = Elastic::new(200.0);
        assert_relative_eq!(drive(&mut m, 0.01), 2.0);
        assert_relative_eq!(drive(&mut m, -0.02), -4.0);
        assert_relative_eq!(m.tangent(), 200.0);
    }

    #[test]
    fn test_elastic_pp_yields_and_unloads() {
        let mut m = ElasticPP::new(1000.0, 0.002);
        assert_relative_eq!(drive(&mut m, 0.001), 1.0);
        assert_relative_eq!(drive(&mut m, 0.005), 2.0);
        assert_relative_eq!(m.tangent(), 0.0);
        // elastic unloading from 0.005 with plastic strain 0.003
        assert_relative_eq!(drive(&mut m, 0.004), 1.0, epsilon = 1e-12);
        assert_relative_eq!(drive(&mut m, 0.0), -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_steel01_monotonic() {
        let mut m = Steel01::new(300.0, 200_000.0, 0.01);
        assert_relative_eq!(drive(&mut m, 0.001), 200.0, epsilon = 1e-9);
        // fy + b E0 (eps - eps_y)
        let expected = 300.0 + 0.01 * 200_000.0 * (0.01 - 0.0015);
        assert_relative_eq!(drive(&mut m, 0.01), expected, epsilon = 1e-9);
        assert_relative_eq!(m.tangent(), 2000.0);
    }

    #[test]
    fn test_steel01_kinematic_reversal() {
        let mut m = Steel01::new(300.0, 200_000.0, 0.0);
        drive(&mut m, 0.01);
        // elastic range after reversal is 2 fy
        assert_relative_eq!(drive(&mut m, 0.01 - 0.002), -100.0, epsilon = 1e-9);
        assert_relative_eq!(drive(&mut m, 0.0), -300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_uncommitted_trial_is_discarded() {
        let mut m = Steel01::new(300.0, 200_000.0, 0.0);
        m.set_trial_strain(0.01);
        // no commit: a new trial starts from the virgin state again
        m.set_trial_strain(0.001);
        assert_relative_eq!(m.stress(), 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_instances_match_definitions() {
        let defs = [
            UniaxialMaterialDef::Elastic { e: 10.0 },
            UniaxialMaterialDef::ElasticPP { e: 10.0, epsy: 0.1 },
            UniaxialMaterialDef::Steel01 { fy: 1.0, e0: 10.0, b: 0.1 },
        ];
        for def in defs {
            let material = def.instantiate();
            assert_eq!(material.name(), def.type_name());
            assert_eq!(material.stress(), 0.0);
            assert_eq!(material.tangent(), 10.0);
        }
    }

    #[test]
    fn test_validate() {
        let steel = |b| UniaxialMaterialDef::Steel01 { fy: 300.0, e0: 2e5, b };
        assert!(steel(0.02).validate().is_ok());
        assert!(steel(1.5).validate().is_err());
        assert!(UniaxialMaterialDef::Elastic { e: -1.0 }.validate().is_err());
        let err = UniaxialMaterialDef::ElasticPP { e: 1.0, epsy: 0.0 }
            .validate()
            .unwrap_err();
        assert!(format!("{err}").contains("ElasticPP"));
    }
}
