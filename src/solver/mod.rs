//! Glue over a structural analysis engine.
//!
//! The functions here only forward calls to an [`AnalysisEngine`]: start a
//! 2D or 3D model, create the imported nodes, and drive a uniaxial material
//! through a strain history.

mod domain;
mod engine;
mod materials;
mod script;

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::{
    datatypes::NodeMap,
    error::{Result, StructeasyError},
    post_processor::{line_chart_svg, ChartLabels},
};

pub use domain::Domain;
pub use engine::AnalysisEngine;
pub use materials::{Elastic, ElasticPP, Steel01, UniaxialMaterial, UniaxialMaterialDef};
pub use script::TclScriptEngine;

/// Model space of an analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDimension {
    /// 2 dimensions, 3 degrees of freedom per node
    TwoD,
    /// 3 dimensions, 6 degrees of freedom per node
    ThreeD,
}

impl ModelDimension {
    pub fn ndm(&self) -> usize {
        match self {
            ModelDimension::TwoD => 2,
            ModelDimension::ThreeD => 3,
        }
    }

    pub fn ndf(&self) -> usize {
        match self {
            ModelDimension::TwoD => 3,
            ModelDimension::ThreeD => 6,
        }
    }
}

impl FromStr for ModelDimension {
    type Err = StructeasyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "2d" => Ok(ModelDimension::TwoD),
            "3d" => Ok(ModelDimension::ThreeD),
            other => Err(StructeasyError::InvalidArgument(format!(
                "not valid model type '{other}', try \"2d\" or \"3d\""
            ))),
        }
    }
}

impl Display for ModelDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelDimension::TwoD => write!(f, "2d"),
            ModelDimension::ThreeD => write!(f, "3d"),
        }
    }
}

/// Wipes the engine and starts a basic model
///
/// # Arguments
/// * `engine` - The analysis engine
/// * `typology` - `"2d"` or `"3d"`
///
/// # Returns
/// The model dimension, or an invalid argument error for any other typology
pub fn start_model<E: AnalysisEngine + ?Sized>(
    engine: &mut E,
    typology: &str,
) -> Result<ModelDimension> {
    let dimension: ModelDimension = typology.parse()?;

    engine.wipe()?;
    engine.model_basic(dimension.ndm(), dimension.ndf())?;

    info!("{dimension} model initialized");
    Ok(dimension)
}

/// Creates one engine node per entry of `nodes`
///
/// Each node passes as many coordinates as the model has dimensions; a 2D
/// node in a 3D model lies on `z = 0`.
///
/// # Arguments
/// * `engine` - An engine with a started model
/// * `nodes` - The node map
pub fn create_nodes<E: AnalysisEngine + ?Sized>(engine: &mut E, nodes: &NodeMap) -> Result<()> {
    let (ndm, _) = engine.dimension().ok_or_else(|| {
        StructeasyError::Solver("Model not initialized; call start_model first".to_owned())
    })?;
    if ndm > 3 {
        return Err(StructeasyError::Solver(format!(
            "Cannot place nodes in a {ndm} dimensional model"
        )));
    }

    let dropped_z = nodes
        .values()
        .filter(|n| ndm < 3 && n.z.map_or(false, |z| z != 0.0))
        .count();
    if dropped_z > 0 {
        warn!("{dropped_z} nodes have a z coordinate that the {ndm}d model ignores");
    }

    let bar = ProgressBar::new(nodes.len() as u64);
    for (id, node) in nodes {
        bar.inc(1);
        let position = node.position();
        engine.node(*id, &position.as_slice()[..ndm])?;
    }
    bar.finish_and_clear();

    info!("structure nodes generated in the analysis model ({})", nodes.len());
    Ok(())
}

#[derive(Debug, Clone)]
pub struct MaterialTestOptions {
    pub title: String,
    /// Stresses are divided by this factor, e.g. to change units
    pub scale_stress: f64,
    /// Where to write the stress-strain chart
    pub output: Option<PathBuf>,
}

impl Default for MaterialTestOptions {
    fn default() -> Self {
        MaterialTestOptions {
            title: "Stress-Strain Behavior".to_owned(),
            scale_stress: 1.0,
            output: None,
        }
    }
}

/// Response of a uniaxial material to a strain history
#[derive(Debug, Clone, PartialEq)]
pub struct StressStrainCurve {
    pub mat_tag: i32,
    pub title: String,
    pub strain: Vec<f64>,
    pub stress: Vec<f64>,
}

impl StressStrainCurve {
    pub fn plot_title(&self) -> String {
        format!("{} | Material Tag: {}", self.title, self.mat_tag)
    }

    /// Largest absolute stress of the curve
    pub fn peak_stress(&self) -> f64 {
        self.stress.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }

    pub fn to_svg(&self) -> Result<String> {
        let title = self.plot_title();
        line_chart_svg(
            &self.strain,
            &self.stress,
            &ChartLabels {
                title: &title,
                x_label: "Strain",
                y_label: "Stress",
            },
        )
    }

    pub fn write_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_svg()?)?;
        info!("wrote stress-strain plot to {}", path.display());
        Ok(())
    }
}

/// Drives a uniaxial material through `strain`
///
/// # Arguments
/// * `engine` - An engine knowing the material
/// * `mat_tag` - The material tag
/// * `strain` - The imposed strains, in order
/// * `options` - Title and stress scale
///
/// # Returns
/// The stress-strain curve, stresses divided by `options.scale_stress`
pub fn run_material_test<E: AnalysisEngine + ?Sized>(
    engine: &mut E,
    mat_tag: i32,
    strain: &[f64],
    options: &MaterialTestOptions,
) -> Result<StressStrainCurve> {
    if options.scale_stress == 0.0 || !options.scale_stress.is_finite() {
        return Err(StructeasyError::InvalidArgument(format!(
            "scale_stress must be a finite non-zero number, got {}",
            options.scale_stress
        )));
    }

    engine.test_uniaxial_material(mat_tag)?;

    let mut stress: Vec<f64> = Vec::with_capacity(strain.len());
    for eps in strain {
        engine.set_strain(*eps)?;
        stress.push(engine.get_stress()? / options.scale_stress);
    }

    Ok(StressStrainCurve {
        mat_tag,
        title: options.title.clone(),
        strain: strain.to_vec(),
        stress,
    })
}

/// Tests a material and plots its stress-strain curve
///
/// Failures are logged with a hint instead of being returned.
///
/// # Returns
/// The curve, or `None` when the test or the plot failed
pub fn material_tester<E: AnalysisEngine + ?Sized>(
    engine: &mut E,
    mat_tag: i32,
    strain: &[f64],
    options: &MaterialTestOptions,
) -> Option<StressStrainCurve> {
    let result = run_material_test(engine, mat_tag, strain, options).and_then(|curve| {
        if let Some(output) = &options.output {
            curve.write_svg(output)?;
        }
        Ok(curve)
    });

    match result {
        Ok(curve) => Some(curve),
        Err(err) => {
            warn!("please check material and engine definition or the plot output: {err}");
            None
        }
    }
}

/// Longest strain history [`cyclic_strain_history`] builds
pub const MAX_STRAIN_STEPS: usize = 1_000_000;

/// Cyclic strain protocol `0 -> +a -> -a -> 0` for each amplitude
///
/// # Arguments
/// * `amplitudes` - Peak strains, one cycle each
/// * `steps` - Increments between 0 and a peak
///
/// # Returns
/// The strain history, or an invalid argument error when it would hold more
/// than `MAX_STRAIN_STEPS` values
pub fn cyclic_strain_history(amplitudes: &[f64], steps: usize) -> Result<Vec<f64>> {
    let steps = steps.max(1);
    let length = steps
        .checked_mul(4)
        .and_then(|per_cycle| per_cycle.checked_mul(amplitudes.len()))
        .and_then(|n| n.checked_add(1))
        .filter(|n| *n <= MAX_STRAIN_STEPS)
        .ok_or_else(|| {
            StructeasyError::InvalidArgument(format!(
                "{} cycles of {steps} steps exceed {MAX_STRAIN_STEPS} strain values",
                amplitudes.len()
            ))
        })?;

    let mut history = Vec::with_capacity(length);
    history.push(0.0);

    for amplitude in amplitudes {
        let increment = amplitude / steps as f64;
        let mut current = 0.0;
        for (count, direction) in [(steps, 1.0), (2 * steps, -1.0), (steps, 1.0)] {
            for _ in 0..count {
                current += direction * increment;
                history.push(current);
            }
        }
    }

    Ok(history)
}
