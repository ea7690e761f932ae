//! Plotly figure model and standalone HTML output.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, StructeasyError};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const PLOT_DIV: &str = "structeasy-plot";

/// One color for the whole trace, or one per point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Color {
    Single(String),
    PerPoint(Vec<String>),
}

impl From<&str> for Color {
    fn from(value: &str) -> Self {
        Color::Single(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub size: u32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub color: Color,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub color: Color,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
}

/// A `scatter3d` trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scatter3d {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// `null` entries for 2D nodes
    pub z: Vec<Option<f64>>,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<Line>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textfont: Option<Font>,
    pub showlegend: bool,
}

impl Scatter3d {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<Option<f64>>, mode: &str) -> Scatter3d {
        Scatter3d {
            kind: "scatter3d",
            name: None,
            x,
            y,
            z,
            mode: mode.to_owned(),
            marker: None,
            line: None,
            text: None,
            textposition: None,
            textfont: None,
            showlegend: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisTitle {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: AxisTitle,
    pub backgroundcolor: String,
    pub tickfont: Font,
}

impl Axis {
    fn titled(title: &str) -> Axis {
        Axis {
            title: AxisTitle {
                text: title.to_owned(),
            },
            backgroundcolor: "#f0f0f0".to_owned(),
            tickfont: Font {
                color: "darkgrey".into(),
                size: Some(12),
                family: Some("Arial".to_owned()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub zaxis: Axis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub l: u32,
    pub r: u32,
    pub b: u32,
    pub t: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub scene: Scene,
    pub width: u32,
    pub height: u32,
    pub margin: Margin,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            scene: Scene {
                xaxis: Axis::titled("X axis"),
                yaxis: Axis::titled("Y axis"),
                zaxis: Axis::titled("Z axis"),
            },
            width: 800,
            height: 600,
            margin: Margin {
                l: 0,
                r: 0,
                b: 0,
                t: 0,
            },
        }
    }
}

/// A 3D scene: traces plus layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Scatter3d>,
    pub layout: Layout,
}

impl Figure {
    pub fn new(data: Vec<Scatter3d>) -> Figure {
        Figure {
            data,
            layout: Layout::default(),
        }
    }

    /// Standalone HTML page drawing the figure with plotly.js
    pub fn to_html(&self) -> Result<String> {
        let data = to_script_json(&self.data)?;
        let layout = to_script_json(&self.layout)?;

        Ok(format!(
            "<!DOCTYPE html>\n\
            <html>\n\
            <head>\n\
            <meta charset=\"utf-8\" />\n\
            <script src=\"{PLOTLY_CDN}\" charset=\"utf-8\"></script>\n\
            </head>\n\
            <body>\n\
            <div id=\"{PLOT_DIV}\" style=\"width:{width}px;height:{height}px;\"></div>\n\
            <script type=\"text/javascript\">\n\
            Plotly.newPlot(\"{PLOT_DIV}\", {data}, {layout});\n\
            </script>\n\
            </body>\n\
            </html>\n",
            width = self.layout.width,
            height = self.layout.height,
        ))
    }

    pub fn write_html(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_html()?)?;
        info!("wrote plot to {}", path.display());
        Ok(())
    }

    /// Opens the figure in a browser, `opener` or the platform default
    ///
    /// The page is written to the temporary directory first; the file stays
    /// there so the browser can load it after this returns.
    pub fn show(&self, opener: Option<&Path>) -> Result<PathBuf> {
        let file_name = format!("structeasy-plot-{}.html", std::process::id());
        let path = std::env::temp_dir().join(file_name);
        self.write_html(&path)?;
        open_in_browser(&path, opener)?;
        Ok(path)
    }
}

/// JSON safe to embed in a `<script>` element
fn to_script_json<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)
        .map_err(|err| StructeasyError::Plot(format!("Failed to serialize figure: {err}")))?;
    Ok(json.replace("</", "<\\/"))
}

fn open_in_browser(path: &Path, opener: Option<&Path>) -> Result<()> {
    let mut command = if let Some(opener) = opener {
        Command::new(opener)
    } else if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/C").arg("start").arg("");
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };

    let mut child = command
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| {
            StructeasyError::Plot(format!(
                "Unable to open {} in a browser: {err}",
                path.display()
            ))
        })?;

    // some openers block until the browser exits; reap them in the background
    std::thread::spawn(move || {
        if let Err(err) = child.wait() {
            debug!("browser opener did not exit cleanly: {err}");
        }
    });
    Ok(())
}
