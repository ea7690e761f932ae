//! 3D visualization of node and element maps.

mod chart;
mod colors;
mod figure;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::info;

use crate::{
    datatypes::{ElementMap, NodeMap, UNGROUPED_TAG},
    error::Result,
};

pub use chart::{line_chart_svg, ChartLabels};
pub use colors::{rainbow, rainbow_ramp};
pub use figure::{Axis, Color, Figure, Font, Layout, Line, Marker, Scatter3d};

const NODE_COLOR: &str = "red";
const ELEMENT_COLOR: &str = "black";

#[derive(Debug, Clone)]
pub struct PlotOptions {
    /// Label nodes and elements with their ids
    pub show_numbers: bool,
    /// Add the physical tag to the labels
    pub show_tags: bool,
    /// One color per physical tag instead of red nodes and black elements
    pub color_by_tag: bool,
    pub save_html: bool,
    pub filename: PathBuf,
    pub show_legend: bool,
    /// Open the plot in the browser
    pub show: bool,
    /// Program that opens the page, the platform default when `None`
    pub browser: Option<PathBuf>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            show_numbers: false,
            show_tags: false,
            color_by_tag: false,
            save_html: false,
            filename: PathBuf::from("plot.html"),
            show_legend: false,
            show: true,
            browser: None,
        }
    }
}

/// Assigns a rainbow color to every physical tag in use
///
/// Tags are ordered ascending; `UNGROUPED_TAG` gets no color.
pub fn tag_colors(nodes: &NodeMap, elements: &ElementMap) -> BTreeMap<i32, String> {
    let tags: BTreeSet<i32> = nodes
        .values()
        .map(|n| n.tag)
        .chain(elements.values().map(|e| e.tag))
        .filter(|tag| *tag != UNGROUPED_TAG)
        .collect();

    tags.iter()
        .copied()
        .zip(rainbow_ramp(tags.len()))
        .collect()
}

fn label(id: i32, tag: i32, show_tags: bool) -> String {
    if show_tags {
        format!("{id}<br>Tag: {tag}")
    } else {
        id.to_string()
    }
}

/// Builds the 3D scene of a model
///
/// The figure holds one point trace for all nodes and one line trace per
/// element, preceded by a midpoint label trace when numbers or tags are
/// shown. The figure is opened when `options.show` is set and written to
/// `options.filename` when `options.save_html` is set.
///
/// # Arguments
/// * `nodes` - The node map
/// * `elements` - The element map
/// * `options` - Labels, colors and output
///
/// # Returns
/// The figure
pub fn plot_model(nodes: &NodeMap, elements: &ElementMap, options: &PlotOptions) -> Result<Figure> {
    let color_map = if options.color_by_tag {
        tag_colors(nodes, elements)
    } else {
        BTreeMap::new()
    };
    let labelled = options.show_numbers || options.show_tags;

    // Nodes
    let node_color: Vec<String> = nodes
        .values()
        .map(|node| {
            color_map
                .get(&node.tag)
                .cloned()
                .unwrap_or_else(|| NODE_COLOR.to_owned())
        })
        .collect();

    let mut node_trace = Scatter3d::new(
        nodes.values().map(|n| n.x).collect(),
        nodes.values().map(|n| n.y).collect(),
        nodes.values().map(|n| n.z).collect(),
        if labelled { "markers+text" } else { "markers" },
    );
    node_trace.name = Some("Nodes".to_owned());
    node_trace.marker = Some(Marker {
        size: 8,
        color: Color::PerPoint(node_color.clone()),
    });
    if options.show_numbers {
        node_trace.text = Some(
            nodes
                .iter()
                .map(|(id, node)| label(*id, node.tag, options.show_tags))
                .collect(),
        );
    }
    node_trace.textposition = Some("middle right".to_owned());
    node_trace.textfont = Some(Font {
        color: Color::PerPoint(node_color),
        size: None,
        family: None,
    });
    node_trace.showlegend = options.show_legend;

    let mut traces = vec![node_trace];

    // Elements
    for (id, element) in elements {
        let color = color_map
            .get(&element.tag)
            .cloned()
            .unwrap_or_else(|| ELEMENT_COLOR.to_owned());

        if labelled {
            let text = label(*id, element.tag, options.show_tags);
            let mid = element.midpoint();

            let mut mid_trace = Scatter3d::new(vec![mid.x], vec![mid.y], vec![Some(mid.z)], "text");
            mid_trace.text = Some(vec![text]);
            mid_trace.textposition = Some("top center".to_owned());
            mid_trace.textfont = Some(Font {
                color: Color::Single(color.clone()),
                size: None,
                family: None,
            });
            mid_trace.showlegend = false;
            traces.push(mid_trace);
        }

        let mut element_trace = Scatter3d::new(
            element.nodes.iter().map(|n| n.x).collect(),
            element.nodes.iter().map(|n| n.y).collect(),
            element.nodes.iter().map(|n| n.z).collect(),
            "lines",
        );
        element_trace.name = Some(format!("Element {id}"));
        element_trace.line = Some(Line {
            color: Color::Single(color),
            width: 4,
        });
        element_trace.showlegend = options.show_legend;
        traces.push(element_trace);
    }

    let figure = Figure::new(traces);

    if options.save_html {
        figure.write_html(&options.filename)?;
    }

    if options.show {
        let path = figure.show(options.browser.as_deref())?;
        info!("opened plot {}", path.display());
    }

    Ok(figure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{Element, Node};

    fn model() -> (NodeMap, ElementMap) {
        let mut nodes = NodeMap::new();
        nodes.insert(1, Node::new(1, 0.0, 0.0, Some(0.0), 4));
        nodes.insert(2, Node::new(2, 3.0, 4.0, Some(0.0), UNGROUPED_TAG));
        nodes.insert(3, Node::new(3, 3.0, 4.0, Some(2.0), 2));

        let mut elements = ElementMap::new();
        elements.insert(
            1,
            Element::new(1, vec![nodes[&1].clone(), nodes[&2].clone()], UNGROUPED_TAG).unwrap(),
        );
        elements.insert(
            2,
            Element::new(2, vec![nodes[&2].clone(), nodes[&3].clone()], 4).unwrap(),
        );
        (nodes, elements)
    }

    fn quiet() -> PlotOptions {
        PlotOptions {
            show: false,
            ..PlotOptions::default()
        }
    }

    #[test]
    fn test_two_tags_give_two_colors() {
        let (nodes, elements) = model();
        let colors = tag_colors(&nodes, &elements);
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.keys().copied().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(colors[&2], "rgb(127,0,255)");
        assert_eq!(colors[&4], "rgb(255,0,0)");
    }

    #[test]
    fn test_default_colors() {
        let (nodes, elements) = model();
        let figure = plot_model(&nodes, &elements, &quiet()).unwrap();

        assert_eq!(figure.data.len(), 3);
        let node_trace = &figure.data[0];
        assert_eq!(node_trace.mode, "markers");
        assert!(node_trace.text.is_none());
        assert_eq!(
            node_trace.marker.as_ref().unwrap().color,
            Color::PerPoint(vec!["red".to_owned(); 3])
        );
        assert_eq!(figure.data[1].line.as_ref().unwrap().color, Color::Single("black".into()));
    }

    #[test]
    fn test_color_by_tag() {
        let (nodes, elements) = model();
        let options = PlotOptions {
            color_by_tag: true,
            ..quiet()
        };
        let figure = plot_model(&nodes, &elements, &options).unwrap();

        let node_colors = &figure.data[0].marker.as_ref().unwrap().color;
        assert_eq!(
            *node_colors,
            Color::PerPoint(vec![
                "rgb(255,0,0)".to_owned(),
                "red".to_owned(),
                "rgb(127,0,255)".to_owned()
            ])
        );
        // untagged element stays black, element tagged 4 shares node 1's color
        assert_eq!(figure.data[1].line.as_ref().unwrap().color, Color::Single("black".into()));
        assert_eq!(
            figure.data[2].line.as_ref().unwrap().color,
            Color::Single("rgb(255,0,0)".into())
        );
    }

    #[test]
    fn test_labels_add_midpoint_traces() {
        let (nodes, elements) = model();
        let options = PlotOptions {
            show_numbers: true,
            show_tags: true,
            ..quiet()
        };
        let figure = plot_model(&nodes, &elements, &options).unwrap();

        // node trace, then (label, line) per element
        assert_eq!(figure.data.len(), 5);
        assert_eq!(figure.data[0].mode, "markers+text");
        assert_eq!(figure.data[0].text.as_ref().unwrap()[0], "1<br>Tag: 4");

        let label = &figure.data[1];
        assert_eq!(label.mode, "text");
        assert_eq!(label.text.as_ref().unwrap()[0], "1<br>Tag: -1");
        assert_eq!((label.x[0], label.y[0], label.z[0]), (1.5, 2.0, Some(0.0)));
        assert_eq!(figure.data[2].mode, "lines");
    }

    #[test]
    fn test_tags_without_numbers_label_elements_only() {
        let (nodes, elements) = model();
        let options = PlotOptions {
            show_tags: true,
            ..quiet()
        };
        let figure = plot_model(&nodes, &elements, &options).unwrap();
        assert!(figure.data[0].text.is_none());
        assert_eq!(figure.data[1].text.as_ref().unwrap()[0], "1<br>Tag: -1");
    }

    #[test]
    fn test_legend_flag() {
        let (nodes, elements) = model();
        let options = PlotOptions {
            show_legend: true,
            show_numbers: true,
            ..quiet()
        };
        let figure = plot_model(&nodes, &elements, &options).unwrap();
        assert!(figure.data[0].showlegend);
        assert!(!figure.data[1].showlegend);
        assert!(figure.data[2].showlegend);
    }
}
