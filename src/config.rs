use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Space between a group's box and the union of its children.
    pub group_padding: f32,
    /// Minimum distance between parallel segments sharing a corridor.
    pub nudge_gap: f32,
    pub bend_penalty: f32,
    /// A turn only counts as a bend when both axis offsets exceed this.
    pub bend_threshold: f32,
    pub max_search_steps: usize,
    pub max_solver_iterations: usize,
    /// Coordinates closer than this share a nudging bucket.
    pub bucket_tolerance: f32,
    pub collinear_tolerance: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            group_padding: 12.0,
            nudge_gap: 4.0,
            bend_penalty: 1000.0,
            bend_threshold: 1.0,
            max_search_steps: 500_000,
            max_solver_iterations: 4000,
            bucket_tolerance: 0.1,
            collinear_tolerance: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
    /// Margin around the drawing.
    pub margin: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
            margin: 24.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub router: RouterConfig,
    pub theme: Theme,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            router: RouterConfig::default(),
            theme,
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    primary_color: Option<String>,
    primary_text_color: Option<String>,
    primary_border_color: Option<String>,
    line_color: Option<String>,
    cluster_bkg: Option<String>,
    cluster_border: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    group_padding: Option<f32>,
    nudge_gap: Option<f32>,
    bend_penalty: Option<f32>,
    bend_threshold: Option<f32>,
    max_search_steps: Option<usize>,
    max_solver_iterations: Option<usize>,
    bucket_tolerance: Option<f32>,
    collinear_tolerance: Option<f32>,
    background: Option<String>,
    width: Option<f32>,
    height: Option<f32>,
    margin: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Merges a JSON5 config document onto the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::by_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme `{theme_name}`"))?;
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.primary_color {
            config.theme.primary_color = v;
        }
        if let Some(v) = vars.primary_text_color {
            config.theme.primary_text_color = v;
        }
        if let Some(v) = vars.primary_border_color {
            config.theme.primary_border_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.cluster_bkg {
            config.theme.cluster_background = v;
        }
        if let Some(v) = vars.cluster_border {
            config.theme.cluster_border = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v.clone();
            config.render.background = v;
        }
    }

    let router = &mut config.router;
    if let Some(v) = parsed.group_padding {
        router.group_padding = v;
    }
    if let Some(v) = parsed.nudge_gap {
        router.nudge_gap = v;
    }
    if let Some(v) = parsed.bend_penalty {
        router.bend_penalty = v;
    }
    if let Some(v) = parsed.bend_threshold {
        router.bend_threshold = v;
    }
    if let Some(v) = parsed.max_search_steps {
        router.max_search_steps = v;
    }
    if let Some(v) = parsed.max_solver_iterations {
        router.max_solver_iterations = v;
    }
    if let Some(v) = parsed.bucket_tolerance {
        router.bucket_tolerance = v;
    }
    if let Some(v) = parsed.collinear_tolerance {
        router.collinear_tolerance = v;
    }

    if let Some(v) = parsed.background {
        config.render.background = v;
    }
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }
    if let Some(v) = parsed.margin {
        config.render.margin = v;
    }

    Ok(config)
}
