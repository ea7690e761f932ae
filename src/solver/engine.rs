use crate::error::Result;

/// The commands structeasy forwards to a structural analysis engine
///
/// Names follow the OpenSees interpreter commands they stand for.
pub trait AnalysisEngine {
    /// Destroys every object of the current model
    fn wipe(&mut self) -> Result<()>;

    /// Starts a basic model builder with `ndm` dimensions and `ndf` degrees of
    /// freedom per node
    fn model_basic(&mut self, ndm: usize, ndf: usize) -> Result<()>;

    /// `(ndm, ndf)` of the current model, `None` before `model_basic`
    fn dimension(&self) -> Option<(usize, usize)>;

    fn node(&mut self, tag: i32, coords: &[f64]) -> Result<()>;

    /// Selects a uniaxial material for strain driven testing
    fn test_uniaxial_material(&mut self, mat_tag: i32) -> Result<()>;

    /// Imposes (and commits) a strain on the material under test
    fn set_strain(&mut self, strain: f64) -> Result<()>;

    fn get_stress(&self) -> Result<f64>;
}
