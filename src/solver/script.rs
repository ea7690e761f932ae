use std::io::Write;

use super::engine::AnalysisEngine;
use crate::error::{Result, StructeasyError};

/// Records the forwarded commands as an OpenSees Tcl script
///
/// The script is meant to be run by the external solver; material tests need
/// answers back from the solver and are not supported here.
pub struct TclScriptEngine<W: Write> {
    out: W,
    dimension: Option<(usize, usize)>,
}

impl<W: Write> TclScriptEngine<W> {
    pub fn new(out: W) -> TclScriptEngine<W> {
        TclScriptEngine {
            out,
            dimension: None,
        }
    }

    pub fn comment(&mut self, text: &str) -> Result<()> {
        for line in text.lines() {
            writeln!(self.out, "# {line}")?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn unsupported(command: &str) -> StructeasyError {
        StructeasyError::Solver(format!(
            "{command} needs a live solver and cannot be recorded in a script"
        ))
    }
}

impl<W: Write> AnalysisEngine for TclScriptEngine<W> {
    fn wipe(&mut self) -> Result<()> {
        self.dimension = None;
        writeln!(self.out, "wipe")?;
        Ok(())
    }

    fn model_basic(&mut self, ndm: usize, ndf: usize) -> Result<()> {
        self.dimension = Some((ndm, ndf));
        writeln!(self.out, "model basic -ndm {ndm} -ndf {ndf}")?;
        Ok(())
    }

    fn dimension(&self) -> Option<(usize, usize)> {
        self.dimension
    }

    fn node(&mut self, tag: i32, coords: &[f64]) -> Result<()> {
        let coords: Vec<String> = coords.iter().map(|c| format!("{c:?}")).collect();
        writeln!(self.out, "node {tag} {}", coords.join(" "))?;
        Ok(())
    }

    fn test_uniaxial_material(&mut self, _mat_tag: i32) -> Result<()> {
        Err(Self::unsupported("testUniaxialMaterial"))
    }

    fn set_strain(&mut self, _strain: f64) -> Result<()> {
        Err(Self::unsupported("setStrain"))
    }

    fn get_stress(&self) -> Result<f64> {
        Err(Self::unsupported("getStress"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_output() {
        let mut engine = TclScriptEngine::new(Vec::new());
        engine.comment("portal frame").unwrap();
        engine.wipe().unwrap();
        engine.model_basic(3, 6).unwrap();
        engine.node(1, &[0.0, 2.5, -1.0]).unwrap();

        let script = String::from_utf8(engine.into_inner()).unwrap();
        assert_eq!(
            script,
            "# portal frame\nwipe\nmodel basic -ndm 3 -ndf 6\nnode 1 0.0 2.5 -1.0\n"
        );
    }

    #[test]
    fn test_material_testing_unsupported() {
        let mut engine = TclScriptEngine::new(Vec::new());
        assert!(engine.test_uniaxial_material(1).is_err());
        assert!(engine.get_stress().is_err());
    }
}
