use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::{debug, info, warn};

use super::geo::uses_gmsh_only;
use super::{parse_geo, parse_msh, GeometryModel, ImportBackend, ImportOptions};
use crate::error::{Result, StructeasyError};

/// An open geometry, read natively or through the gmsh executable
///
/// Scratch files written by gmsh live in a temporary directory owned by the
/// session and are removed when the session is dropped, whichever way the
/// import ends.
#[derive(Debug)]
pub struct GmshSession {
    model: GeometryModel,
    source: PathBuf,
    _scratch: Option<TempDir>,
}

impl GmshSession {
    /// Opens a geometry file
    ///
    /// # Arguments
    /// * `geometry_file` - The path to the geometry
    /// * `options` - Backend selection and gmsh executable
    pub fn open(geometry_file: &Path, options: &ImportOptions) -> Result<GmshSession> {
        let extension = geometry_file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let use_gmsh = match (options.backend, extension.as_str()) {
            (ImportBackend::Gmsh, _) => true,
            (_, "msh") => false,
            (ImportBackend::Native, "geo") => false,
            (ImportBackend::Auto, "geo") => {
                let contents = read_geometry(geometry_file)?;
                match parse_geo(&contents) {
                    Ok(report) if !report.requires_gmsh => {
                        return Ok(GmshSession::native(geometry_file, report.model));
                    }
                    Ok(_) => info!(
                        "{} uses statements the native reader cannot evaluate, running gmsh",
                        geometry_file.display()
                    ),
                    Err(err) if uses_gmsh_only(&contents) => info!(
                        "native reader failed on {} ({err}), running gmsh",
                        geometry_file.display()
                    ),
                    Err(err) => return Err(err),
                }
                true
            }
            (ImportBackend::Native, other) => {
                return Err(StructeasyError::Input(format!(
                    "Unrecognized geometry filetype '{other}' for the native reader"
                )))
            }
            (ImportBackend::Auto, _) => true,
        };

        if use_gmsh {
            return GmshSession::through_gmsh(geometry_file, &options.gmsh_executable);
        }

        let contents = read_geometry(geometry_file)?;
        let model = if extension == "msh" {
            parse_msh(&contents)?
        } else {
            let report = parse_geo(&contents)?;
            if report.requires_gmsh {
                warn!(
                    "{} needs gmsh to be read completely; the imported model may be incomplete",
                    geometry_file.display()
                );
            }
            report.model
        };

        Ok(GmshSession::native(geometry_file, model))
    }

    fn native(source: &Path, model: GeometryModel) -> GmshSession {
        debug!("opened {} natively", source.display());
        GmshSession {
            model,
            source: source.to_path_buf(),
            _scratch: None,
        }
    }

    fn through_gmsh(source: &Path, executable: &Path) -> Result<GmshSession> {
        let scratch = tempfile::Builder::new().prefix("structeasy-").tempdir()?;
        let mesh_file = scratch.path().join("model.msh");

        run_gmsh(executable, source, &mesh_file)?;

        let model = parse_msh(&read_geometry(&mesh_file)?)?;
        debug!("opened {} through gmsh", source.display());

        Ok(GmshSession {
            model,
            source: source.to_path_buf(),
            _scratch: Some(scratch),
        })
    }

    pub fn model(&self) -> &GeometryModel {
        &self.model
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

impl Drop for GmshSession {
    fn drop(&mut self) {
        debug!("closed session for {}", self.source.display());
    }
}

fn read_geometry(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| {
        StructeasyError::Input(format!(
            "Unable to open geometry file {}: {err}",
            path.display()
        ))
    })
}

/// Runs gmsh to write the 1D mesh and entities of a geometry
///
/// # Arguments
/// * `executable` - The gmsh executable
/// * `input` - The geometry file
/// * `output` - The `.msh` file to write
fn run_gmsh(executable: &Path, input: &Path, output: &Path) -> Result<()> {
    info!("running gmsh on {}...", input.display());

    let result = match Command::new(executable)
        .arg(input)
        .arg("-1")
        .arg("-format")
        .arg("msh41")
        .arg("-o")
        .arg(output)
        .output()
    {
        Ok(out) => out,
        Err(err) => {
            return Err(StructeasyError::Mesh(format!(
                "Gmsh failed to start ({}): {err}",
                executable.display()
            )));
        }
    };

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(StructeasyError::Mesh(format!(
            "Gmsh exited with {}: {}",
            result.status,
            stderr.trim()
        )));
    }

    Ok(())
}
